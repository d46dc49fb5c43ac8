/// Size of the transmit buffer. Only the first [`crate::transmit::FRAME_LEN`]
/// bytes go out per write.
pub const TX_BUFFER_LEN: usize = 1024;

const PATTERN: [u8; 88] = [
    0x00, 0xFF, 0xFF, 0x00, 0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0xFF, 0x00,
    0xFF, 0x00, 0xFF, 0xFF, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0xFF, 0xFF,
    0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0xFF, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0x00, 0xFF, 0xFF, 0xFF, 0x00, 0xFF, 0xFF, 0x00,
    0xFF, 0xFF, 0xFF, 0xFF, 0x00, 0xFF, 0xFF, 0xFF, 0x00, 0x00, 0xFF, 0x00, 0x00, 0xFF, 0xFF,
    0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0xFF, 0x00, 0x00,
];
/// Whole copies of the pattern that fit below offset 937; the tail stays zero.
const PATTERN_REPEATS: usize = 11;

/// The fixed byte sequence written on every cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxBuffer([u8; TX_BUFFER_LEN]);

impl TxBuffer {
    pub const fn new() -> Self {
        let mut buf = [0u8; TX_BUFFER_LEN];
        let mut i = 0;
        while i < PATTERN.len() * PATTERN_REPEATS {
            buf[i] = PATTERN[i % PATTERN.len()];
            i += 1;
        }
        Self(buf)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Leading `len` bytes, clamped to the buffer size.
    pub fn frame(&self, len: usize) -> &[u8] {
        &self.0[..len.min(TX_BUFFER_LEN)]
    }
}

impl Default for TxBuffer {
    fn default() -> Self {
        Self::new()
    }
}
