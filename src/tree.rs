//! Tree-body encode/decode: `<mode> <name>\0<20-byte hash>` entries,
//! concatenated with no separator, ordered lexicographically by name.

use crate::error::{GitError, Result};

pub const MODE_DIR: &str = "40000";
pub const MODE_FILE: &str = "100644";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub mode: String,
    pub name: String,
    pub hash: [u8; 20],
}

impl TreeEntry {
    pub fn is_dir(&self) -> bool {
        self.mode == MODE_DIR
    }
}

/// Parse every entry out of a tree object's body. Any mode other than
/// `40000` is treated as a regular file by the caller (checkout does not
/// distinguish executable bits, symlinks or gitlinks).
pub fn parse_entries(body: &[u8]) -> Result<Vec<TreeEntry>> {
    let mut entries = Vec::new();
    let mut cursor = 0usize;

    while cursor < body.len() {
        let nul = body[cursor..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| GitError::BadHeader("tree entry missing NUL after name".into()))?
            + cursor;

        let header = std::str::from_utf8(&body[cursor..nul])
            .map_err(|_| GitError::BadHeader("tree entry mode/name is not UTF-8".into()))?;
        let (mode, name) = header
            .split_once(' ')
            .ok_or_else(|| GitError::BadHeader(format!("tree entry '{header}' has no space")))?;

        let hash_start = nul + 1;
        let hash_end = hash_start + 20;
        let hash_bytes = body
            .get(hash_start..hash_end)
            .ok_or_else(|| GitError::BadHeader("tree entry truncated before 20-byte hash".into()))?;

        let mut hash = [0u8; 20];
        hash.copy_from_slice(hash_bytes);

        entries.push(TreeEntry {
            mode: mode.to_string(),
            name: name.to_string(),
            hash,
        });

        cursor = hash_end;
    }

    Ok(entries)
}

/// Build a tree body from entries, enforcing the ordering invariant
/// (strict lexicographic order of raw name bytes, no duplicates).
pub fn build_body(mut entries: Vec<TreeEntry>) -> Result<Vec<u8>> {
    entries.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));

    for pair in entries.windows(2) {
        if pair[0].name == pair[1].name {
            return Err(GitError::Corrupt(format!(
                "duplicate tree entry name '{}'",
                pair[0].name
            )));
        }
    }

    let mut body = Vec::new();
    for entry in &entries {
        body.extend_from_slice(entry.mode.as_bytes());
        body.push(b' ');
        body.extend_from_slice(entry.name.as_bytes());
        body.push(0);
        body.extend_from_slice(&entry.hash);
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(mode: &str, name: &str, byte: u8) -> TreeEntry {
        TreeEntry {
            mode: mode.to_string(),
            name: name.to_string(),
            hash: [byte; 20],
        }
    }

    #[test]
    fn build_then_parse_round_trips_and_sorts() {
        let entries = vec![
            entry(MODE_FILE, "zeta.txt", 2),
            entry(MODE_DIR, "alpha", 1),
            entry(MODE_FILE, "beta.txt", 3),
        ];
        let body = build_body(entries).unwrap();
        let parsed = parse_entries(&body).unwrap();

        let names: Vec<&str> = parsed.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alpha", "beta.txt", "zeta.txt"]);
        assert!(parsed[0].is_dir());
        assert!(!parsed[1].is_dir());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let entries = vec![entry(MODE_FILE, "dup", 1), entry(MODE_FILE, "dup", 2)];
        assert!(build_body(entries).is_err());
    }

    #[test]
    fn parse_truncated_entry_is_bad_header() {
        let mut body = MODE_FILE.as_bytes().to_vec();
        body.push(b' ');
        body.extend_from_slice(b"name");
        body.push(0);
        body.extend_from_slice(&[0u8; 10]); // too few hash bytes
        assert!(parse_entries(&body).is_err());
    }
}
