//! Test fixtures for generating test data.

use bytes::Bytes;
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;

/// Generate deterministic test data based on a seed.
///
/// The first byte is forced to `0xff` so the result is never valid UTF-8 and
/// always travels base64 encoded.
pub fn seeded_bytes(seed: u64, len: usize) -> Bytes {
    let mut data = vec![0u8; len];
    let mut state = seed;

    for chunk in data.chunks_mut(8) {
        // Simple LCG for deterministic data
        state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        let bytes = state.to_le_bytes();
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte = bytes[i % 8];
        }
    }
    if let Some(first) = data.first_mut() {
        *first = 0xff;
    }

    Bytes::from(data)
}

/// Build a zip archive holding `files` (name, content) and `dirs`.
#[allow(dead_code)]
pub fn zip_archive(files: &[(&str, &[u8])], dirs: &[&str]) -> Bytes {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for dir in dirs {
        writer
            .add_directory(*dir, SimpleFileOptions::default())
            .expect("Failed to add directory");
    }
    for (name, content) in files {
        writer
            .start_file(*name, SimpleFileOptions::default())
            .expect("Failed to start file");
        writer.write_all(content).expect("Failed to write file");
    }
    Bytes::from(
        writer
            .finish()
            .expect("Failed to finish archive")
            .into_inner(),
    )
}

/// "Göteborg" in UTF-8.
#[allow(dead_code)]
pub const GOTEBORG_UTF8: &[u8] = "Göteborg".as_bytes();

/// "Göteborg" in Latin-1, which is not valid UTF-8.
#[allow(dead_code)]
pub const GOTEBORG_LATIN1: &[u8] = b"G\xf6teborg";
