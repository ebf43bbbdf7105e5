//! Pipeline integration tests against an instrumented in-memory drive.
//!
//! Tests that exercise backoff or poll intervals run on a paused tokio clock,
//! so those waits cost no wall time. The file-backed ones use the real clock,
//! since blocking file reads would let a paused clock jump ahead.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use async_trait::async_trait;
use drive_import::api::{
    ChunkAck, ImportRequest, ImportTaskResult, PartUpload, PrepareRequest, PrepareResponse,
};
use bytes::Bytes;
use drive_import::api::CONNECTIVITY_CODE;
use drive_import::pipeline::chunker::ByteRange;
use drive_import::{
    adler32, transfer, ApiError, ChunkSource, Destination, DriveApi, FileSource, ImportErrorCode,
    MemorySource, Phase, ProgressCallback, ProgressEvent, TransferConfig, TransferError,
    TransferPipeline,
};
use std::collections::{HashMap, VecDeque};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MIB: u64 = 1024 * 1024;

// ── Fake drive ───────────────────────────────────────────────────────────────

/// How a chunk sequence number misbehaves.
#[derive(Clone)]
enum PartFault {
    /// Fail every attempt with this error.
    Always(ApiError),
    /// Fail the first `n` attempts with this error, then succeed.
    FirstN(u32, ApiError),
}

#[derive(Default)]
struct FakeDrive {
    block_size: u64,
    prepare_error: Option<ApiError>,
    finish_error: Option<ApiError>,
    part_faults: HashMap<u32, PartFault>,
    poll_script: Mutex<VecDeque<Result<ImportTaskResult, ApiError>>>,
    /// Answer once the script is exhausted.
    poll_default: Option<ImportTaskResult>,

    // ── Instrumentation ──
    prepared: Mutex<Vec<PrepareRequest>>,
    parts: Mutex<Vec<(u32, u32, usize)>>,
    attempts: Mutex<HashMap<u32, u32>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    parts_ok: AtomicU32,
    finishes: Mutex<Vec<(String, u32, usize)>>,
    parts_ok_at_finish: AtomicU32,
    imports: Mutex<Vec<ImportRequest>>,
    polls: AtomicU32,
}

impl FakeDrive {
    fn new(block_size: u64) -> Self {
        Self {
            block_size,
            ..Default::default()
        }
    }

    fn polls(mut self, script: Vec<Result<ImportTaskResult, ApiError>>) -> Self {
        self.poll_script = Mutex::new(script.into());
        self
    }

    fn poll_default(mut self, result: ImportTaskResult) -> Self {
        self.poll_default = Some(result);
        self
    }

    fn fault(mut self, seq: u32, fault: PartFault) -> Self {
        self.part_faults.insert(seq, fault);
        self
    }

    fn attempts_for(&self, seq: u32) -> u32 {
        self.attempts.lock().unwrap().get(&seq).copied().unwrap_or(0)
    }

    fn finish_count(&self) -> usize {
        self.finishes.lock().unwrap().len()
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn prepare(&self, request: &PrepareRequest) -> Result<PrepareResponse, ApiError> {
        self.prepared.lock().unwrap().push(request.clone());
        if let Some(ref e) = self.prepare_error {
            return Err(e.clone());
        }
        Ok(PrepareResponse {
            upload_id: "up-1".into(),
            block_size: self.block_size,
            block_num: request.size.div_ceil(self.block_size) as u32,
        })
    }

    async fn upload_part(&self, part: &PartUpload) -> Result<ChunkAck, ApiError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let n = attempts.entry(part.seq).or_insert(0);
            *n += 1;
            *n
        };
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        tokio::time::sleep(Duration::from_millis(50)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match self.part_faults.get(&part.seq) {
            Some(PartFault::Always(e)) => return Err(e.clone()),
            Some(PartFault::FirstN(n, e)) if attempt <= *n => return Err(e.clone()),
            _ => {}
        }

        self.parts
            .lock()
            .unwrap()
            .push((part.seq, part.checksum, part.size()));
        self.parts_ok.fetch_add(1, Ordering::SeqCst);
        Ok(ChunkAck {
            seq: part.seq,
            checksum: part.checksum,
        })
    }

    async fn finish(
        &self,
        upload_id: &str,
        total_chunks: u32,
        acks: &[ChunkAck],
    ) -> Result<String, ApiError> {
        self.parts_ok_at_finish
            .store(self.parts_ok.load(Ordering::SeqCst), Ordering::SeqCst);
        self.finishes
            .lock()
            .unwrap()
            .push((upload_id.to_string(), total_chunks, acks.len()));
        match self.finish_error {
            Some(ref e) => Err(e.clone()),
            None => Ok("boxcnFILE".into()),
        }
    }

    async fn submit_import(&self, request: &ImportRequest) -> Result<String, ApiError> {
        self.imports.lock().unwrap().push(request.clone());
        Ok("tkt-1".into())
    }

    async fn poll_import(&self, _ticket: &str) -> Result<ImportTaskResult, ApiError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if let Some(next) = self.poll_script.lock().unwrap().pop_front() {
            return next;
        }
        self.poll_default
            .clone()
            .ok_or_else(|| ApiError::Decode("poll script exhausted".into()))
    }
}

// ── Test helpers ─────────────────────────────────────────────────────────────

fn processing() -> ImportTaskResult {
    ImportTaskResult {
        ticket: "tkt-1".into(),
        job_status: 2,
        ..Default::default()
    }
}

fn done() -> ImportTaskResult {
    ImportTaskResult {
        ticket: "tkt-1".into(),
        doc_type: "sheet".into(),
        job_status: 0,
        token: "shtcnDOC".into(),
        url: "https://example.feishu.cn/sheets/shtcnDOC".into(),
        ..Default::default()
    }
}

fn http(status: u16) -> ApiError {
    ApiError::Http {
        status,
        body: String::new(),
    }
}

/// Deterministic, non-repeating payload so checksums differ per chunk.
fn payload(len: u64) -> Vec<u8> {
    (0..len).map(|i| (i.wrapping_mul(31) % 251) as u8).collect()
}

fn recorder() -> (ProgressCallback, Arc<Mutex<Vec<ProgressEvent>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let cb: ProgressCallback = Arc::new(move |e: &ProgressEvent| {
        sink.lock().unwrap().push(e.clone());
    });
    (cb, events)
}

async fn run(
    drive: Arc<FakeDrive>,
    bytes: Vec<u8>,
    file_name: &str,
) -> (Result<drive_import::TransferOutput, TransferError>, Vec<ProgressEvent>) {
    let config = TransferConfig::builder().build().unwrap();
    run_with(drive, bytes, file_name, config).await
}

async fn run_with(
    drive: Arc<FakeDrive>,
    bytes: Vec<u8>,
    file_name: &str,
    config: TransferConfig,
) -> (Result<drive_import::TransferOutput, TransferError>, Vec<ProgressEvent>) {
    run_source(drive, Arc::new(MemorySource::new(bytes)), file_name, config).await
}

async fn run_source(
    drive: Arc<FakeDrive>,
    source: Arc<dyn ChunkSource>,
    file_name: &str,
    config: TransferConfig,
) -> (Result<drive_import::TransferOutput, TransferError>, Vec<ProgressEvent>) {
    let (cb, events) = recorder();
    let pipeline = TransferPipeline::new(drive, config);
    let result = pipeline
        .run(source, file_name, &Destination::folder("fldcnDEST"), Some(cb))
        .await;
    let events = events.lock().unwrap().clone();
    (result, events)
}

/// In-memory source whose read of one range fails like a vanished file.
struct UnreadableRange {
    inner: MemorySource,
    fail_at: u64,
}

#[async_trait]
impl ChunkSource for UnreadableRange {
    fn len(&self) -> u64 {
        self.inner.len()
    }

    async fn read_range(&self, range: ByteRange) -> Result<Bytes, TransferError> {
        if range.start == self.fail_at {
            return Err(TransferError::FileRead {
                path: PathBuf::from("ledger.csv"),
                source: std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "file shrank"),
            });
        }
        self.inner.read_range(range).await
    }
}

// ── Happy path ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn ten_mib_file_uploads_as_three_chunks_and_converts() {
    let bytes = payload(10 * MIB);
    let drive = Arc::new(FakeDrive::new(4 * MIB).polls(vec![Ok(processing()), Ok(done())]));

    let (result, events) = run(Arc::clone(&drive), bytes.clone(), "WSD2715 明细.xlsx").await;
    let out = result.expect("transfer should succeed");

    assert_eq!(out.file_token, "boxcnFILE");
    assert_eq!(out.result_handle, "shtcnDOC");
    assert_eq!(out.doc_type, "sheet");
    assert!(out.warnings.is_empty());
    assert_eq!(out.stats.total_chunks, 3);
    assert_eq!(out.stats.file_size, 10 * MIB);
    assert_eq!(out.stats.polls, 2);

    // Chunks 4 MiB, 4 MiB, 2 MiB, each with the checksum of its own bytes.
    let mut parts = drive.parts.lock().unwrap().clone();
    parts.sort_by_key(|p| p.0);
    let sizes: Vec<usize> = parts.iter().map(|p| p.2).collect();
    assert_eq!(sizes, vec![4 * MIB as usize, 4 * MIB as usize, 2 * MIB as usize]);
    for (seq, checksum, _) in &parts {
        let start = *seq as usize * 4 * MIB as usize;
        let end = (start + 4 * MIB as usize).min(bytes.len());
        assert_eq!(*checksum, adler32(&bytes[start..end]), "chunk {seq}");
    }

    // One finish with every ack, then one import with the stem and extension.
    assert_eq!(
        drive.finishes.lock().unwrap().as_slice(),
        &[("up-1".to_string(), 3, 3)]
    );
    let imports = drive.imports.lock().unwrap();
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].file_name, "WSD2715 明细");
    assert_eq!(imports[0].file_extension, "xlsx");
    assert_eq!(imports[0].target_type, "sheet");
    assert_eq!(imports[0].file_token, "boxcnFILE");
    assert_eq!(imports[0].point.mount_key, "fldcnDEST");
    assert_eq!(imports[0].point.mount_type, 1);

    let prepared = drive.prepared.lock().unwrap();
    assert_eq!(prepared[0].size, 10 * MIB);
    assert_eq!(prepared[0].parent_type, "explorer");

    // Event order: session, 3 chunks, upload finished, submitted, polling, completed.
    let phases: Vec<Phase> = events.iter().map(|e| e.phase).collect();
    assert_eq!(
        phases,
        vec![
            Phase::SessionCreated,
            Phase::Uploading,
            Phase::Uploading,
            Phase::Uploading,
            Phase::UploadFinished,
            Phase::ConversionSubmitted,
            Phase::Converting,
            Phase::Completed,
        ]
    );
    let mut seqs: Vec<u32> = events.iter().filter_map(|e| e.sequence).collect();
    seqs.sort_unstable();
    assert_eq!(seqs, vec![0, 1, 2]);
    assert!((events.last().unwrap().percent - 100.0).abs() < f32::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn finish_only_after_every_chunk_succeeded() {
    let drive = Arc::new(
        FakeDrive::new(1024)
            .fault(3, PartFault::FirstN(2, http(503)))
            .fault(7, PartFault::FirstN(1, ApiError::Transport("reset".into())))
            .poll_default(done()),
    );
    let (result, _) = run(Arc::clone(&drive), payload(10 * 1024), "a.csv").await;
    let out = result.unwrap();

    assert_eq!(drive.finish_count(), 1);
    assert_eq!(drive.parts_ok_at_finish.load(Ordering::SeqCst), 10);
    assert_eq!(drive.attempts_for(3), 3);
    assert_eq!(drive.attempts_for(7), 2);
    assert_eq!(out.stats.chunk_retries, 3);
}

// ── Concurrency ──────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn at_most_three_chunk_uploads_in_flight() {
    let drive = Arc::new(FakeDrive::new(1024).poll_default(done()));
    let (result, _) = run(Arc::clone(&drive), payload(20 * 1024), "big.csv").await;
    result.unwrap();

    assert_eq!(drive.parts.lock().unwrap().len(), 20);
    assert_eq!(drive.max_in_flight.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn concurrency_setting_bounds_the_pool() {
    let drive = Arc::new(FakeDrive::new(1024).poll_default(done()));
    let config = TransferConfig::builder()
        .upload_concurrency(1)
        .build()
        .unwrap();
    let (result, _) = run_with(Arc::clone(&drive), payload(5 * 1024), "seq.csv", config).await;
    result.unwrap();
    assert_eq!(drive.max_in_flight.load(Ordering::SeqCst), 1);
}

// ── Chunk failures ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn always_transient_chunk_is_attempted_exactly_three_times() {
    let drive = Arc::new(FakeDrive::new(1024).fault(1, PartFault::Always(http(503))));
    let (result, events) = run(Arc::clone(&drive), payload(3 * 1024), "a.csv").await;

    match result {
        Err(TransferError::ChunkUpload {
            sequence, attempts, ..
        }) => {
            assert_eq!(sequence, 1);
            assert_eq!(attempts, 3);
        }
        other => panic!("expected ChunkUpload, got {other:?}"),
    }
    assert_eq!(drive.attempts_for(1), 3);
    assert_eq!(drive.finish_count(), 0);
    assert_eq!(events.last().unwrap().phase, Phase::Failed);
}

#[tokio::test(start_paused = true)]
async fn permanent_failure_of_chunk_five_aborts_without_finish() {
    let drive = Arc::new(FakeDrive::new(1024).fault(5, PartFault::Always(http(400))));
    let (result, _) = run(Arc::clone(&drive), payload(10 * 1024), "a.csv").await;

    match result {
        Err(TransferError::ChunkUpload {
            sequence,
            failed,
            attempts,
            ..
        }) => {
            assert_eq!(sequence, 5);
            assert_eq!(failed, vec![5]);
            assert_eq!(attempts, 1);
        }
        other => panic!("expected ChunkUpload, got {other:?}"),
    }
    assert_eq!(drive.attempts_for(5), 1);
    assert_eq!(drive.finish_count(), 0);
    assert!(drive.imports.lock().unwrap().is_empty());
    // Cancellation stops new claims: the tail of the file is never sent.
    assert_eq!(drive.attempts_for(9), 0);
}

#[tokio::test(start_paused = true)]
async fn source_read_failure_is_returned_unchanged() {
    // Chunk 0 is backing off after a 503 when chunk 2 turns out unreadable.
    let drive = Arc::new(FakeDrive::new(4).fault(0, PartFault::Always(http(503))));
    let source = Arc::new(UnreadableRange {
        inner: MemorySource::new(payload(12)),
        fail_at: 8,
    });
    let config = TransferConfig::builder().build().unwrap();
    let (result, events) = run_source(Arc::clone(&drive), source, "ledger.csv", config).await;

    match result {
        Err(TransferError::FileRead { path, source }) => {
            assert_eq!(path, PathBuf::from("ledger.csv"));
            assert_eq!(source.kind(), std::io::ErrorKind::UnexpectedEof);
        }
        other => panic!("expected FileRead, got {other:?}"),
    }
    assert_eq!(drive.attempts_for(0), 1);
    assert_eq!(drive.attempts_for(2), 0);
    assert_eq!(drive.finish_count(), 0);
    assert_eq!(events.last().unwrap().phase, Phase::Failed);
}

#[tokio::test(start_paused = true)]
async fn upload_failure_before_read_failure_stays_chunk_upload() {
    // Chunk 0 fails for good while 1 and 2 back off, so the unreadable
    // chunk 3 is never claimed.
    let drive = Arc::new(
        FakeDrive::new(4)
            .fault(0, PartFault::Always(http(400)))
            .fault(1, PartFault::FirstN(1, http(503)))
            .fault(2, PartFault::FirstN(1, http(503))),
    );
    let source = Arc::new(UnreadableRange {
        inner: MemorySource::new(payload(16)),
        fail_at: 12,
    });
    let config = TransferConfig::builder().build().unwrap();
    let (result, _) = run_source(Arc::clone(&drive), source, "ledger.csv", config).await;

    match result {
        Err(TransferError::ChunkUpload {
            sequence,
            failed,
            attempts,
            detail,
        }) => {
            assert_eq!(sequence, 0);
            assert_eq!(failed, vec![0, 1, 2]);
            assert_eq!(attempts, 1);
            assert!(detail.contains("400"), "got {detail}");
        }
        other => panic!("expected ChunkUpload, got {other:?}"),
    }
    assert_eq!(drive.attempts_for(3), 0);
    assert_eq!(drive.finish_count(), 0);
}

// ── Session failures ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn prepare_failure_is_session_create() {
    let mut fake = FakeDrive::new(1024);
    fake.prepare_error = Some(http(403));
    let drive = Arc::new(fake);
    let (result, _) = run(Arc::clone(&drive), payload(2048), "a.csv").await;

    assert!(matches!(result, Err(TransferError::SessionCreate { .. })));
    assert!(drive.parts.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn finish_failure_is_session_finish_and_skips_import() {
    let mut fake = FakeDrive::new(1024);
    fake.finish_error = Some(ApiError::Application {
        code: 1061002,
        msg: "params error".into(),
    });
    let drive = Arc::new(fake);
    let (result, _) = run(Arc::clone(&drive), payload(2048), "a.csv").await;

    match result {
        Err(TransferError::SessionFinish { session_id, .. }) => assert_eq!(session_id, "up-1"),
        other => panic!("expected SessionFinish, got {other:?}"),
    }
    assert_eq!(drive.finish_count(), 1);
    assert!(drive.imports.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn empty_file_is_rejected_before_prepare() {
    let drive = Arc::new(FakeDrive::new(1024));
    let (result, _) = run(Arc::clone(&drive), Vec::new(), "a.csv").await;
    assert!(matches!(result, Err(TransferError::InvalidInput(_))));
    assert!(drive.prepared.lock().unwrap().is_empty());
}

// ── Conversion ───────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn endless_processing_times_out_after_thirty_polls() {
    let script = (0..31).map(|_| Ok(processing())).collect();
    let drive = Arc::new(FakeDrive::new(1024).polls(script));
    let (result, events) = run(Arc::clone(&drive), payload(1024), "a.xlsx").await;

    match result {
        Err(TransferError::ConversionTimeout { ticket, attempts }) => {
            assert_eq!(ticket, "tkt-1");
            assert_eq!(attempts, 30);
        }
        other => panic!("expected ConversionTimeout, got {other:?}"),
    }
    assert_eq!(drive.polls.load(Ordering::SeqCst), 30);
    let ticks = events.iter().filter(|e| e.phase == Phase::Converting).count();
    assert_eq!(ticks, 30);
}

#[tokio::test(start_paused = true)]
async fn code_115_is_file_too_large() {
    let failed = ImportTaskResult {
        job_status: 115,
        job_error_msg: "file size exceed limit".into(),
        ..Default::default()
    };
    let drive = Arc::new(FakeDrive::new(1024).polls(vec![Ok(processing()), Ok(failed)]));
    let (result, events) = run(Arc::clone(&drive), payload(1024), "a.xlsx").await;

    match result {
        Err(TransferError::Conversion {
            code,
            kind,
            message,
        }) => {
            assert_eq!(code, 115);
            assert_eq!(kind, ImportErrorCode::FileTooLarge);
            assert_eq!(message, "导入文件过大");
        }
        other => panic!("expected Conversion, got {other:?}"),
    }
    assert_eq!(events.last().unwrap().phase, Phase::Failed);
}

#[tokio::test(start_paused = true)]
async fn network_failures_while_polling_do_not_consume_attempts() {
    let drive = Arc::new(FakeDrive::new(1024).polls(vec![
        Err(ApiError::Transport("connection reset".into())),
        Err(http(502)),
        Ok(processing()),
        Ok(done()),
    ]));
    let config = TransferConfig::builder()
        .max_poll_attempts(2)
        .build()
        .unwrap();
    let (result, _) = run_with(Arc::clone(&drive), payload(1024), "a.xlsx", config).await;

    let out = result.expect("two answered polls fit the ceiling");
    assert_eq!(out.stats.polls, 2);
    assert_eq!(drive.polls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn three_consecutive_network_failures_are_a_connectivity_conversion_error() {
    let drive = Arc::new(FakeDrive::new(1024).polls(vec![
        Ok(processing()),
        Err(ApiError::Timeout { secs: 10 }),
        Err(http(503)),
        Err(http(429)),
        Ok(done()),
    ]));
    let (result, _) = run(Arc::clone(&drive), payload(1024), "a.xlsx").await;

    let err = result.unwrap_err();
    assert!(err.is_retryable_transfer());
    match err {
        TransferError::Conversion {
            code,
            kind,
            message,
        } => {
            assert_eq!(code, CONNECTIVITY_CODE);
            assert_eq!(kind, ImportErrorCode::Connectivity);
            assert!(message.contains("tkt-1"), "got {message}");
            assert!(message.contains("3 consecutive"), "got {message}");
        }
        other => panic!("expected Conversion, got {other:?}"),
    }
    assert_eq!(drive.polls.load(Ordering::SeqCst), 4);
}

#[tokio::test(start_paused = true)]
async fn rejected_status_query_is_task_query() {
    let drive = Arc::new(FakeDrive::new(1024).polls(vec![Err(http(403))]));
    let (result, _) = run(Arc::clone(&drive), payload(1024), "a.xlsx").await;
    assert!(matches!(result, Err(TransferError::TaskQuery { .. })));
    assert_eq!(drive.polls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn success_notices_become_warnings() {
    let mut result = done();
    result.extra = vec!["1".into(), "4".into()];
    let drive = Arc::new(FakeDrive::new(1024).polls(vec![Ok(result)]));
    let (out, _) = run(Arc::clone(&drive), payload(1024), "a.xlsx").await;
    assert_eq!(out.unwrap().warnings, vec!["1".to_string(), "4".to_string()]);
}

// ── File-backed entry point ──────────────────────────────────────────────────

#[tokio::test]
async fn transfer_reads_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.csv");
    let bytes = payload(3000);
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&bytes)
        .unwrap();

    let drive = Arc::new(FakeDrive::new(1024).poll_default(done()));
    let config = TransferConfig::builder()
        .api(Arc::clone(&drive) as Arc<dyn DriveApi>)
        .build()
        .unwrap();

    let out = transfer(&path, &Destination::default(), &config)
        .await
        .unwrap();
    assert_eq!(out.stats.total_chunks, 3);
    assert_eq!(drive.imports.lock().unwrap()[0].file_name, "ledger");

    let mut parts = drive.parts.lock().unwrap().clone();
    parts.sort_by_key(|p| p.0);
    assert_eq!(parts[2], (2, adler32(&bytes[2048..]), 952));
}

#[tokio::test]
async fn file_truncated_after_open_fails_with_file_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ledger.csv");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&payload(3000))
        .unwrap();

    let source = FileSource::open(&path).await.unwrap();
    std::fs::OpenOptions::new()
        .write(true)
        .open(&path)
        .unwrap()
        .set_len(1500)
        .unwrap();

    let drive = Arc::new(FakeDrive::new(1024).poll_default(done()));
    let config = TransferConfig::builder().build().unwrap();
    let (result, _) = run_source(Arc::clone(&drive), Arc::new(source), "ledger.csv", config).await;

    match result {
        Err(TransferError::FileRead { path: failed, .. }) => assert_eq!(failed, path),
        other => panic!("expected FileRead, got {other:?}"),
    }
    assert_eq!(drive.finish_count(), 0);
    assert!(drive.imports.lock().unwrap().is_empty());
}

#[tokio::test]
async fn transfer_of_missing_file_is_file_not_found() {
    let config = TransferConfig::default();
    let result = transfer("/definitely/not/here.xlsx", &Destination::default(), &config).await;
    assert!(matches!(result, Err(TransferError::FileNotFound { .. })));
}
