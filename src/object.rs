//! Content-addressed object store: canonical framing, hashing, zlib coding,
//! sharded on-disk layout, and a uniform read/write pipeline.

use std::fmt;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

use crate::error::{GitError, Result};
use crate::hex;
use crate::zlib;

/// One of the four object kinds the framing recognizes. Tags are accepted
/// but not otherwise exercised by this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectType {
    Commit,
    Tree,
    Blob,
    Tag,
}

impl ObjectType {
    fn as_str(self) -> &'static str {
        match self {
            ObjectType::Commit => "commit",
            ObjectType::Tree => "tree",
            ObjectType::Blob => "blob",
            ObjectType::Tag => "tag",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "commit" => Ok(ObjectType::Commit),
            "tree" => Ok(ObjectType::Tree),
            "blob" => Ok(ObjectType::Blob),
            "tag" => Ok(ObjectType::Tag),
            other => Err(GitError::BadHeader(format!("unknown object kind '{other}'"))),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded object: its kind and its body, as read back from the store.
pub struct Object {
    pub typ: ObjectType,
    pub body: Vec<u8>,
}

/// Build the canonical `<kind> <size>\0<body>` framing used both as the
/// hash input and as the pre-compression on-disk form.
pub fn frame(typ: ObjectType, body: &[u8]) -> Vec<u8> {
    let mut framed = Vec::with_capacity(body.len() + 16);
    framed.extend_from_slice(typ.as_str().as_bytes());
    framed.push(b' ');
    framed.extend_from_slice(body.len().to_string().as_bytes());
    framed.push(0);
    framed.extend_from_slice(body);
    framed
}

/// SHA-1 over already-framed bytes, as lowercase hex.
pub fn hash_framed(framed: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(framed);
    hex::encode(&hasher.finalize())
}

/// A content-addressed object store rooted at `<root>/objects`.
///
/// `root` is normally `.git` but is kept configurable so the same type backs
/// both in-place porcelain commands and a freshly `init`-ed clone target.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    /// An object store rooted at `<repo_root>/objects` (i.e. `repo_root` is
    /// the `.git` directory).
    pub fn new(repo_root: impl Into<PathBuf>) -> Self {
        Self {
            root: repo_root.into().join("objects"),
        }
    }

    /// The conventional store for the current directory: `.git/objects`.
    pub fn in_current_dir() -> Self {
        Self::new(".git")
    }

    pub fn path_for(&self, id_hex: &str) -> PathBuf {
        self.root.join(&id_hex[..2]).join(&id_hex[2..])
    }

    /// Resolve, slurp, inflate and parse the object named by `id_hex`.
    pub fn read(&self, id_hex: &str) -> Result<Object> {
        let path = self.path_for(id_hex);
        let compressed = fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => GitError::NotFound(format!("object {id_hex}")),
            _ => GitError::Io(e),
        })?;

        let framed = zlib::inflate_all(&compressed)?;

        let nul = framed
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| GitError::BadHeader(format!("object {id_hex} has no NUL separator")))?;

        let header = std::str::from_utf8(&framed[..nul])
            .map_err(|_| GitError::BadHeader(format!("object {id_hex} header is not UTF-8")))?;

        let (typ_str, size_str) = header
            .split_once(' ')
            .ok_or_else(|| GitError::BadHeader(format!("object {id_hex} header '{header}' has no space")))?;

        let typ = ObjectType::parse(typ_str)?;
        let declared_size: usize = size_str
            .parse()
            .map_err(|_| GitError::BadHeader(format!("object {id_hex} has non-numeric size '{size_str}'")))?;

        let body = &framed[nul + 1..];
        if body.len() != declared_size {
            return Err(GitError::BadHeader(format!(
                "object {id_hex} declares size {declared_size} but body is {} bytes",
                body.len()
            )));
        }

        Ok(Object {
            typ,
            body: body.to_vec(),
        })
    }

    /// Compute the id of already-framed bytes, deflate them and write them
    /// at the path their id derives to. A write of an id that already
    /// exists on disk is a no-op success.
    pub fn write(&self, framed: &[u8]) -> Result<String> {
        let id_hex = hash_framed(framed);
        let path = self.path_for(&id_hex);

        if path.exists() {
            return Ok(id_hex);
        }

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }

        let compressed = zlib::deflate(framed)?;

        // Write to a sibling temp file first and rename into place so a
        // concurrent reader never observes a partially written object.
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, &compressed)?;
        fs::rename(&tmp_path, &path)?;

        tracing::trace!(id = %id_hex, bytes = compressed.len(), "wrote object");

        Ok(id_hex)
    }

    /// Frame `body` as `typ` and write it.
    pub fn write_framed(&self, typ: ObjectType, body: &[u8]) -> Result<String> {
        self.write(&frame(typ, body))
    }

    /// Read a file from the working tree, frame it as a blob and write it.
    pub fn write_blob_from_path(&self, path: impl AsRef<Path>) -> Result<String> {
        let mut file = fs::File::open(path.as_ref())?;
        let mut body = Vec::new();
        file.read_to_end(&mut body)?;
        self.write_framed(ObjectType::Blob, &body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ObjectStore) {
        let dir = TempDir::new().unwrap();
        let store = ObjectStore::new(dir.path().join(".git"));
        (dir, store)
    }

    #[test]
    fn blob_round_trip_matches_known_hash() {
        let (_dir, store) = store();
        let framed = frame(ObjectType::Blob, b"hello");
        let id = store.write(&framed).unwrap();
        assert_eq!(id, "ce013625030ba8dba906f756967f9e9ca394464a");

        let path = store.path_for(&id);
        assert!(path.exists());
        assert_eq!(path.file_name().unwrap().to_str().unwrap().len(), 38);

        let obj = store.read(&id).unwrap();
        assert_eq!(obj.typ, ObjectType::Blob);
        assert_eq!(obj.body, b"hello");
    }

    #[test]
    fn empty_blob_hash() {
        let (_dir, store) = store();
        let id = store.write(&frame(ObjectType::Blob, b"")).unwrap();
        assert_eq!(id, "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391");
    }

    #[test]
    fn write_is_idempotent() {
        let (_dir, store) = store();
        let framed = frame(ObjectType::Tree, b"some tree bytes");
        let id1 = store.write(&framed).unwrap();
        let id2 = store.write(&framed).unwrap();
        assert_eq!(id1, id2);
    }

    #[test]
    fn read_missing_object_is_not_found() {
        let (_dir, store) = store();
        let err = store.read("0000000000000000000000000000000000000f").unwrap_err();
        assert!(matches!(err, GitError::NotFound(_)));
    }

    #[test]
    fn path_is_pure_function_of_id() {
        let (_dir, store) = store();
        let id = "ce013625030ba8dba906f756967f9e9ca394464a";
        let path = store.path_for(id);
        assert!(path.ends_with("ce/013625030ba8dba906f756967f9e9ca394464a"));
    }
}
