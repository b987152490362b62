//! Test fixtures for generating document data.

use bytes::Bytes;

/// Deterministic document bytes for `seed`.
///
/// The first byte is `0xff`, so the result is never valid UTF-8 and matches
/// the binary documents the server tests deliver base64 encoded.
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut state = seed;
    let mut data: Vec<u8> = std::iter::repeat_with(|| {
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        state.to_le_bytes()
    })
    .flatten()
    .take(len)
    .collect();

    if let Some(first) = data.first_mut() {
        *first = 0xff;
    }
    Bytes::from(data)
}
