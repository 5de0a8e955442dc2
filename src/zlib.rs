//! Bulk and streaming zlib coding on top of `flate2`.
//!
//! `inflate_stream` is the one operation the pack decoder needs that a plain
//! `ZlibDecoder<&[u8]>` doesn't expose directly: the exact number of
//! compressed bytes consumed, since a pack concatenates independent zlib
//! streams back to back with no outer length field.

use flate2::bufread::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Read;

use crate::error::{GitError, Result};

/// Inflate a buffer that is known to hold exactly one zlib stream, failing
/// with `Corrupt` on any decoder error (truncated stream, bad checksum,
/// garbage input). `read_to_end` already grows the output buffer itself, so
/// there is no "buffer short" case to retry.
pub fn inflate_all(input: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(input);
    let mut out = Vec::with_capacity(input.len().max(16) * 4);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| GitError::Corrupt(format!("zlib inflate: {e}")))?;
    Ok(out)
}

/// Deflate `input` at the default compression level.
pub fn deflate(input: &[u8]) -> Result<Vec<u8>> {
    use std::io::Write;
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(input)
        .map_err(|e| GitError::Corrupt(format!("zlib deflate: {e}")))?;
    encoder
        .finish()
        .map_err(|e| GitError::Corrupt(format!("zlib deflate: {e}")))
}

/// DEFLATE's documented worst-case expansion (stored blocks) is about
/// 1032:1; a declared size past that relative to the bytes actually on hand
/// cannot be genuine and is rejected before it is used to size an
/// allocation.
const MAX_INFLATE_EXPANSION_RATIO: usize = 1032;

/// Inflate a single zlib stream living at the front of `input`, stopping at
/// its end-of-stream marker. Returns the decoded bytes (sized to
/// `expected_out`) and the exact number of input bytes the stream consumed,
/// so the caller can advance a cursor to the next concatenated record.
pub fn inflate_stream(input: &[u8], expected_out: usize) -> Result<(Vec<u8>, usize)> {
    let max_plausible = input.len().saturating_mul(MAX_INFLATE_EXPANSION_RATIO);
    if expected_out > max_plausible {
        return Err(GitError::Corrupt(format!(
            "declared uncompressed size {expected_out} cannot come from the {} bytes remaining",
            input.len()
        )));
    }

    let mut decoder = ZlibDecoder::new(input);
    let mut out = vec![0u8; expected_out];
    decoder
        .read_exact(&mut out)
        .map_err(|e| GitError::Corrupt(format!("zlib stream: {e}")))?;

    // Drive the decoder to its end-of-stream marker so `total_in` reflects
    // the whole compressed record, not just the bytes needed to fill `out`.
    let mut sink = [0u8; 1];
    loop {
        match decoder.read(&mut sink) {
            Ok(0) => break,
            Ok(_) => continue,
            Err(e) => return Err(GitError::Corrupt(format!("zlib stream trailer: {e}"))),
        }
    }

    let consumed = decoder.total_in() as usize;
    Ok((out, consumed))
}
