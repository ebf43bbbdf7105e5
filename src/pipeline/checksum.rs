//! Adler-32 checksum, as verified server-side for every uploaded chunk.
//!
//! The service recomputes Adler-32 over the bytes it received and rejects
//! the part if the value sent alongside differs, so this must be bit-exact
//! with RFC 1950. The modulo is deferred across runs of [`NMAX`] bytes, the
//! longest run for which `b` cannot overflow a `u32`; that keeps the inner
//! loop to two additions per byte.

/// Largest prime smaller than 2^16.
const MOD_ADLER: u32 = 65_521;

/// Bytes that can be summed before `b` may overflow `u32`.
const NMAX: usize = 5_552;

/// Incremental Adler-32 state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32 {
    a: u32,
    b: u32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Adler32 {
    pub fn new() -> Self {
        Self { a: 1, b: 0 }
    }

    /// Feed more bytes.
    pub fn update(&mut self, bytes: &[u8]) {
        let (mut a, mut b) = (self.a, self.b);
        for block in bytes.chunks(NMAX) {
            for &x in block {
                a += u32::from(x);
                b += a;
            }
            a %= MOD_ADLER;
            b %= MOD_ADLER;
        }
        self.a = a;
        self.b = b;
    }

    /// The checksum of everything fed so far.
    pub fn finish(&self) -> u32 {
        (self.b << 16) | self.a
    }
}

/// One-shot Adler-32 of `bytes`.
///
/// `adler32(&[]) == 1`.
pub fn adler32(bytes: &[u8]) -> u32 {
    let mut state = Adler32::new();
    state.update(bytes);
    state.finish()
}
