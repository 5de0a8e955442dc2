//! Pack-format decoder: variable-length object headers, streaming
//! inflation that reports bytes consumed, and delta reconstruction against
//! a base object already present in the object store.

use crate::error::{GitError, Result};
use crate::hex;
use crate::object::{frame, ObjectStore, ObjectType};
use crate::zlib;

const PACK_MAGIC: &[u8; 4] = b"PACK";

/// Outcome of decoding a whole pack image.
#[derive(Debug, Default, Clone, Copy)]
pub struct DecodeStats {
    pub objects_written: usize,
    pub deltas_resolved: usize,
}

/// A small bounds-checked cursor over the pack image. Every read fails with
/// `Corrupt` instead of panicking when the declared size would run past the
/// remaining bytes, per the "duck-typed size fields" note in the design.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| GitError::Corrupt("pack truncated".into()))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| GitError::Corrupt("pack truncated".into()))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn advance(&mut self, n: usize) -> Result<()> {
        self.take(n).map(|_| ())
    }
}

/// Decode a pack kind code into the object type it persists as, where
/// applicable (kinds 6/7 are deltas and have no direct `ObjectType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackKind {
    NonDelta(ObjectType),
    RefDelta,
    OfsDelta,
}

fn decode_kind(code: u8) -> Result<PackKind> {
    match code {
        1 => Ok(PackKind::NonDelta(ObjectType::Commit)),
        2 => Ok(PackKind::NonDelta(ObjectType::Tree)),
        3 => Ok(PackKind::NonDelta(ObjectType::Blob)),
        4 => Ok(PackKind::NonDelta(ObjectType::Tag)),
        6 => Ok(PackKind::OfsDelta),
        7 => Ok(PackKind::RefDelta),
        other => Err(GitError::Unsupported(format!("pack object kind {other}"))),
    }
}

/// First byte's bits 6-4 are the kind, bits 3-0 the low bits of size; each
/// continuation byte (bit 7 set) contributes seven more bits at shifts
/// 4, 11, 18, ...
fn read_object_header(cursor: &mut Cursor) -> Result<(PackKind, usize)> {
    let first = cursor.take_u8()?;
    let kind = decode_kind((first >> 4) & 0b111)?;
    let mut size = (first & 0b1111) as usize;
    let mut shift = 4;
    let mut more = first & 0b1000_0000 != 0;

    while more {
        let byte = cursor.take_u8()?;
        size |= ((byte & 0b0111_1111) as usize) << shift;
        shift += 7;
        more = byte & 0b1000_0000 != 0;
    }

    Ok((kind, size))
}

/// Decode a whole pack image, writing every object it contains (resolving
/// ref-deltas against bases already in `store`) and returning counters for
/// the clone driver's progress output.
pub fn decode(image: &[u8], store: &ObjectStore) -> Result<DecodeStats> {
    let mut cursor = Cursor::new(image);

    if cursor.take(4)? != PACK_MAGIC {
        return Err(GitError::Corrupt("pack magic is not 'PACK'".into()));
    }

    let version = u32::from_be_bytes(cursor.take(4)?.try_into().unwrap());
    if version != 2 {
        return Err(GitError::Unsupported(format!("pack version {version}")));
    }

    let count = u32::from_be_bytes(cursor.take(4)?.try_into().unwrap());

    let mut stats = DecodeStats::default();

    for index in 0..count {
        let (kind, declared_size) = read_object_header(&mut cursor)?;

        match kind {
            PackKind::OfsDelta => {
                return Err(GitError::Unsupported(
                    "offset-delta (OBJ_OFS_DELTA) objects are not supported".into(),
                ));
            }
            PackKind::RefDelta => {
                let base_digest = cursor.take(20)?;
                let base_hex = hex::encode(base_digest);

                let (inflated, consumed) = zlib::inflate_stream(&image[cursor.pos..], declared_size)?;
                cursor.advance(consumed)?;

                tracing::trace!(object = index, base = %base_hex, size = declared_size, "pack: ref-delta");

                let base = store
                    .read(&base_hex)
                    .map_err(|_| GitError::MissingBase(base_hex.clone()))?;

                let reconstructed = apply_delta(&base.body, &inflated)?;
                store.write_framed(base.typ, &reconstructed)?;
                stats.deltas_resolved += 1;
            }
            PackKind::NonDelta(typ) => {
                let (inflated, consumed) = zlib::inflate_stream(&image[cursor.pos..], declared_size)?;
                cursor.advance(consumed)?;

                tracing::trace!(object = index, kind = %typ, size = declared_size, "pack: object");

                store.write(&frame(typ, &inflated))?;
                stats.objects_written += 1;
            }
        }
    }

    Ok(stats)
}

/// Read a delta-stream varint: low seven bits per byte, bit 7 = continue,
/// little-endian accumulation (distinct from the object-header encoding,
/// which packs its first 4 bits into the leading byte).
fn read_delta_varint(data: &[u8], pos: &mut usize) -> Result<usize> {
    let mut value = 0usize;
    let mut shift = 0;
    loop {
        let byte = *data
            .get(*pos)
            .ok_or_else(|| GitError::Corrupt("delta stream truncated reading varint".into()))?;
        *pos += 1;
        value |= ((byte & 0x7f) as usize) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
}

/// Apply a delta instruction stream to `base`, producing the reconstructed
/// target bytes. Every copy/insert is bounds-checked against `base` and the
/// declared target size; any violation is `Corrupt`.
pub fn apply_delta(base: &[u8], delta: &[u8]) -> Result<Vec<u8>> {
    let mut pos = 0usize;
    let src_size = read_delta_varint(delta, &mut pos)?;
    let tgt_size = read_delta_varint(delta, &mut pos)?;

    if src_size != base.len() {
        return Err(GitError::Corrupt(format!(
            "delta source size {src_size} does not match base length {}",
            base.len()
        )));
    }

    let mut out = Vec::with_capacity(tgt_size);

    while pos < delta.len() {
        let cmd = delta[pos];
        pos += 1;

        if cmd == 0 {
            // reserved, no-op
            continue;
        }

        if cmd & 0x80 == 0 {
            // INSERT: low 7 bits are a literal byte count in [1, 127]
            let n = cmd as usize;
            let end = pos
                .checked_add(n)
                .filter(|&end| end <= delta.len())
                .ok_or_else(|| GitError::Corrupt("delta insert runs past end of stream".into()))?;
            out.extend_from_slice(&delta[pos..end]);
            pos = end;
        } else {
            // COPY: bits 0-3 select offset bytes present, bits 4-6 select size bytes
            let mut offset = 0usize;
            for i in 0..4 {
                if cmd & (1 << i) != 0 {
                    let byte = *delta
                        .get(pos)
                        .ok_or_else(|| GitError::Corrupt("delta copy offset truncated".into()))?;
                    pos += 1;
                    offset |= (byte as usize) << (8 * i);
                }
            }

            let mut size = 0usize;
            for i in 0..3 {
                if cmd & (1 << (4 + i)) != 0 {
                    let byte = *delta
                        .get(pos)
                        .ok_or_else(|| GitError::Corrupt("delta copy size truncated".into()))?;
                    pos += 1;
                    size |= (byte as usize) << (8 * i);
                }
            }
            if size == 0 {
                size = 0x10000;
            }

            let end = offset
                .checked_add(size)
                .filter(|&end| end <= base.len())
                .ok_or_else(|| GitError::Corrupt("delta copy reads outside base object".into()))?;
            out.extend_from_slice(&base[offset..end]);
        }
    }

    if out.len() != tgt_size {
        return Err(GitError::Corrupt(format!(
            "delta produced {} bytes, expected {tgt_size}",
            out.len()
        )));
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectType;
    use tempfile::TempDir;

    #[test]
    fn delta_application_copy_and_insert() {
        let base = b"AAAABBBB";
        // varints: src_size=8, tgt_size=12
        let mut delta = vec![8, 12];
        // COPY offset=0 size=4 -> cmd bits: offset byte0 present (bit0), size byte0 present (bit4)
        delta.push(0b0001_0001);
        delta.push(0); // offset byte0 = 0
        delta.push(4); // size byte0 = 4
        // INSERT "CCCC"
        delta.push(4);
        delta.extend_from_slice(b"CCCC");
        // COPY offset=4 size=4
        delta.push(0b0001_0001);
        delta.push(4);
        delta.push(4);

        let result = apply_delta(base, &delta).unwrap();
        assert_eq!(result, b"AAAACCCCBBBB");
    }

    #[test]
    fn delta_rejects_mismatched_source_size() {
        let base = b"AAAA";
        let delta = vec![8, 4]; // claims src_size=8 but base is 4 bytes
        assert!(apply_delta(base, &delta).is_err());
    }

    #[test]
    fn delta_rejects_out_of_range_copy() {
        let base = b"AAAA";
        let mut delta = vec![4, 4];
        delta.push(0b0001_0001); // COPY offset byte0, size byte0
        delta.push(10); // offset = 10, out of range
        delta.push(4);
        assert!(apply_delta(base, &delta).is_err());
    }

    fn header_byte(kind: u8, size: usize) -> Vec<u8> {
        let mut bytes = Vec::new();
        let mut first = (kind << 4) | (size as u8 & 0xf);
        let mut rest = size >> 4;
        if rest > 0 {
            first |= 0x80;
        }
        bytes.push(first);
        while rest > 0 {
            let mut b = (rest & 0x7f) as u8;
            rest >>= 7;
            if rest > 0 {
                b |= 0x80;
            }
            bytes.push(b);
        }
        bytes
    }

    #[test]
    fn decode_mini_pack_with_single_blob() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join(".git"));

        let mut image = Vec::new();
        image.extend_from_slice(PACK_MAGIC);
        image.extend_from_slice(&2u32.to_be_bytes());
        image.extend_from_slice(&1u32.to_be_bytes());
        image.extend_from_slice(&header_byte(3, 2)); // kind blob, size 2
        image.extend_from_slice(&zlib::deflate(b"hi").unwrap());
        image.extend_from_slice(&[0u8; 20]); // trailer, not verified

        let stats = decode(&image, &store).unwrap();
        assert_eq!(stats.objects_written, 1);
        assert_eq!(stats.deltas_resolved, 0);

        let id = hex::encode(&{
            use sha1::{Digest, Sha1};
            let mut h = Sha1::new();
            h.update(b"blob 2\0hi");
            let out: [u8; 20] = h.finalize().into();
            out
        });

        let obj = store.read(&id).unwrap();
        assert_eq!(obj.typ, ObjectType::Blob);
        assert_eq!(obj.body, b"hi");
    }

    #[test]
    fn rejects_bad_magic() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join(".git"));
        let image = b"NOPE0000";
        assert!(decode(image, &store).is_err());
    }

    #[test]
    fn rejects_unsupported_version() {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join(".git"));
        let mut image = Vec::new();
        image.extend_from_slice(PACK_MAGIC);
        image.extend_from_slice(&3u32.to_be_bytes());
        image.extend_from_slice(&0u32.to_be_bytes());
        assert!(decode(&image, &store).is_err());
    }
}
