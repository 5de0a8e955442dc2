//! Smart-HTTP wire framing: length-prefixed ("pkt-line") encode/decode, ref
//! discovery, the `want ... done` request body, and side-band stripping.

use crate::error::{GitError, Result};

/// One decoded pkt-line: either a flush (`0000`) or a payload slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PktLine<'a> {
    Flush,
    Data(&'a [u8]),
}

/// Parse every pkt-line out of `input` in order. A line's 4-hex-digit
/// prefix gives the *total* line length (prefix included); `0000` is a
/// flush separator with no payload.
pub fn parse_lines(input: &[u8]) -> Result<Vec<PktLine<'_>>> {
    let mut lines = Vec::new();
    let mut cursor = 0usize;

    while cursor < input.len() {
        let prefix = input
            .get(cursor..cursor + 4)
            .ok_or_else(|| GitError::BadFrame("truncated pkt-line length prefix".into()))?;

        let prefix_str = std::str::from_utf8(prefix)
            .map_err(|_| GitError::BadFrame("pkt-line length prefix is not ASCII".into()))?;
        let total_len = usize::from_str_radix(prefix_str, 16)
            .map_err(|_| GitError::BadFrame(format!("invalid pkt-line length prefix '{prefix_str}'")))?;

        if total_len == 0 {
            lines.push(PktLine::Flush);
            cursor += 4;
            continue;
        }

        if total_len < 4 {
            return Err(GitError::BadFrame(format!(
                "pkt-line length {total_len} is smaller than the prefix itself"
            )));
        }

        let end = cursor
            .checked_add(total_len)
            .filter(|&end| end <= input.len())
            .ok_or_else(|| GitError::BadFrame("pkt-line claims a length past the buffer".into()))?;

        lines.push(PktLine::Data(&input[cursor + 4..end]));
        cursor = end;
    }

    Ok(lines)
}

/// Encode a single payload as a pkt-line (`HHHH` + payload).
pub fn encode_line(payload: &[u8]) -> Vec<u8> {
    let total_len = payload.len() + 4;
    let mut out = format!("{total_len:04x}").into_bytes();
    out.extend_from_slice(payload);
    out
}

/// The `0000` flush separator.
pub fn flush_line() -> Vec<u8> {
    b"0000".to_vec()
}

/// Parse a ref-discovery response, returning HEAD's 40-hex advertised id.
///
/// The response is a service-announcement block terminated by the first
/// flush, followed by the ref list; HEAD is the first ref line after that
/// flush, and its payload begins with the 40-hex id.
pub fn parse_head_ref(response: &[u8]) -> Result<String> {
    let lines = parse_lines(response)?;

    let mut past_first_flush = false;
    for line in lines {
        match line {
            PktLine::Flush if !past_first_flush => past_first_flush = true,
            PktLine::Flush => continue,
            PktLine::Data(payload) if past_first_flush => {
                let text = std::str::from_utf8(payload)
                    .map_err(|_| GitError::BadFrame("ref line is not UTF-8".into()))?;
                let hex_id = text
                    .get(..40)
                    .ok_or_else(|| GitError::BadFrame("ref line shorter than a 40-hex id".into()))?;
                if !hex_id.bytes().all(|b| b.is_ascii_hexdigit()) {
                    return Err(GitError::BadFrame("ref line does not start with a hex id".into()));
                }
                return Ok(hex_id.to_ascii_lowercase());
            }
            PktLine::Data(_) => continue,
        }
    }

    Err(GitError::NotFound("no ref line after service announcement".into()))
}

/// Build the exact 63-byte `want <id>\n` / flush / `done\n` request body.
pub fn build_want_request(id_hex: &str) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&encode_line(format!("want {id_hex}\n").as_bytes()));
    body.extend_from_slice(&flush_line());
    body.extend_from_slice(&encode_line(b"done\n"));
    body
}

/// Strip the side-band framing from an upload-pack response, returning raw
/// packfile bytes. Channel 1 carries pack data, channel 2 progress
/// (forwarded to `tracing::info!`), channel 3 a server error (forwarded to
/// `tracing::warn!`, not treated as fatal by itself). Lines that are
/// neither side-band nor flush (e.g. the leading `NAK`) are skipped.
///
/// Falls back to a raw search for the `"PACK"` magic if no channel-1
/// payload was collected, since some servers omit the multiplexing.
pub fn strip_side_band(response: &[u8]) -> Result<Vec<u8>> {
    let mut pack = Vec::new();

    // A malformed or non-multiplexed response (e.g. raw pack bytes with no
    // pkt-line framing at all) fails to parse as pkt-lines; that's not fatal
    // here, it just means the channel-1 collection below finds nothing and
    // the raw search below takes over.
    if let Ok(lines) = parse_lines(response) {
        for line in lines {
            if let PktLine::Data(payload) = line {
                if let Some((&channel, data)) = payload.split_first() {
                    match channel {
                        1 => pack.extend_from_slice(data),
                        2 => {
                            if let Ok(msg) = std::str::from_utf8(data) {
                                tracing::info!(remote = msg.trim_end(), "upload-pack progress");
                            }
                        }
                        3 => {
                            if let Ok(msg) = std::str::from_utf8(data) {
                                tracing::warn!(remote = msg.trim_end(), "upload-pack reported an error");
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    if !pack.is_empty() {
        return Ok(pack);
    }

    match find_subslice(response, b"PACK") {
        Some(idx) => Ok(response[idx..].to_vec()),
        None => Err(GitError::NoPack),
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_simple_lines() {
        let lines = parse_lines(b"0007abc0000").unwrap();
        assert_eq!(lines, vec![PktLine::Data(b"abc"), PktLine::Flush]);
    }

    #[test]
    fn bad_hex_prefix_is_bad_frame() {
        assert!(parse_lines(b"000gabc").is_err());
    }

    #[test]
    fn want_request_is_the_exact_63_byte_sequence() {
        let id = "0123456789abcdef0123456789abcdef01234567";
        let body = build_want_request(id);
        assert_eq!(body.len(), 63);
        assert_eq!(
            body,
            b"0032want 0123456789abcdef0123456789abcdef01234567\n00000009done\n"
        );
    }

    #[test]
    fn parse_head_ref_from_service_announcement() {
        let mut response = Vec::new();
        response.extend_from_slice(&encode_line(b"# service=git-upload-pack\n"));
        response.extend_from_slice(&flush_line());
        let head_id = "6c073b08f7987018cbb2cb9a5747c84913b3608e";
        let ref_line = format!("{head_id} HEAD\0capabilities^{{}}\n");
        response.extend_from_slice(&encode_line(ref_line.as_bytes()));
        response.extend_from_slice(&flush_line());

        let parsed = parse_head_ref(&response).unwrap();
        assert_eq!(parsed, head_id);
    }

    #[test]
    fn strip_side_band_collects_channel_one_only() {
        let mut response = Vec::new();
        response.extend_from_slice(&encode_line(b"\x01PACKDATA"));
        response.extend_from_slice(&encode_line(b"\x02progress message\n"));
        response.extend_from_slice(&encode_line(b"\x01MORE"));
        response.extend_from_slice(&flush_line());

        let pack = strip_side_band(&response).unwrap();
        assert_eq!(pack, b"PACKDATAMORE");
    }

    #[test]
    fn strip_side_band_falls_back_to_raw_pack_search() {
        let mut response = Vec::new();
        response.extend_from_slice(b"0008NAK\n"); // already a complete pkt-line
        response.extend_from_slice(b"PACKtrailing-bytes");

        let pack = strip_side_band(&response).unwrap();
        assert_eq!(pack, b"PACKtrailing-bytes");
    }

    #[test]
    fn strip_side_band_with_no_pack_anywhere_fails() {
        let response = b"0008NAK\n".to_vec();
        assert!(matches!(strip_side_band(&response), Err(GitError::NoPack)));
    }
}
