use anyhow::Context;
use std::path::Path;

use crate::object::{frame, ObjectStore, ObjectType};

/// `git hash-object`: compute a blob's id and, with `-w`, persist it.
pub fn invoke(path: impl AsRef<Path>, write: bool) -> anyhow::Result<String> {
    let store = ObjectStore::in_current_dir();

    if write {
        store
            .write_blob_from_path(path.as_ref())
            .with_context(|| format!("hashing and writing {}", path.as_ref().display()))
    } else {
        let body = std::fs::read(path.as_ref())
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        let framed = frame(ObjectType::Blob, &body);
        Ok(crate::object::hash_framed(&framed))
    }
}
