//! Pipeline stages for upload-and-import.
//!
//! Each submodule owns one step, so each can be tested against an in-memory
//! [`crate::api::DriveApi`] without touching the others.
//!
//! ## Data Flow
//!
//! ```text
//! source ──▶ chunker ──▶ coordinator ──▶ uploader × N ──▶ finish ──▶ import
//! (bytes)    (ranges)    (session)       (checksum+retry)           (poll)
//! ```
//!
//! 1. [`source`]   : random-access reads of the file being transferred
//! 2. [`chunker`]  : contiguous byte ranges covering the file
//! 3. [`coordinator`] : prepare, bounded worker pool, barrier, finish
//! 4. [`uploader`] : one chunk with its Adler-32 [`checksum`] and [`retry`]
//! 5. [`import`]   : submit the conversion task and poll it to completion

pub mod checksum;
pub mod chunker;
pub mod coordinator;
pub mod import;
pub mod retry;
pub mod session;
pub mod source;
pub mod uploader;
