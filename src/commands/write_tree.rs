use anyhow::Context;
use std::fs;
use std::path::Path;

use crate::hex;
use crate::object::ObjectStore;
use crate::tree::{self, TreeEntry, MODE_DIR, MODE_FILE};

/// `git write-tree`: hash the working directory into a tree object.
pub fn invoke() -> anyhow::Result<String> {
    let store = ObjectStore::in_current_dir();
    let Some(hash) = write_tree_for(&store, Path::new(".")).context("construct root tree object")?
    else {
        anyhow::bail!("asked to make tree object for empty tree");
    };
    Ok(hash)
}

fn write_tree_for(store: &ObjectStore, path: &Path) -> anyhow::Result<Option<String>> {
    let mut dir_entries = Vec::new();
    let dir = fs::read_dir(path).context("opening a directory")?;

    for entry in dir {
        let entry = entry.with_context(|| format!("bad directory entry in {}", path.display()))?;
        let file_name = entry.file_name();
        let metadata = entry.metadata().context("metadata for directory entry")?;

        if file_name == ".git" || file_name == "target" {
            continue;
        }

        dir_entries.push((entry, file_name, metadata));
    }

    dir_entries.sort_unstable_by(|a, b| a.1.cmp(&b.1));

    let mut entries = Vec::new();
    for (entry, file_name, metadata) in dir_entries {
        let name = file_name
            .to_str()
            .with_context(|| format!("non-UTF-8 file name under {}", path.display()))?
            .to_string();

        let (mode, hash_hex) = if metadata.is_dir() {
            match write_tree_for(store, &entry.path())? {
                Some(hash_hex) => (MODE_DIR, hash_hex),
                None => continue, // empty directory, skip it
            }
        } else {
            let hash_hex = store
                .write_blob_from_path(entry.path())
                .with_context(|| format!("hashing {}", entry.path().display()))?;
            (MODE_FILE, hash_hex)
        };

        let mut hash = [0u8; 20];
        hash.copy_from_slice(&hex::decode(&hash_hex)?);
        entries.push(TreeEntry {
            mode: mode.to_string(),
            name,
            hash,
        });
    }

    if entries.is_empty() {
        return Ok(None);
    }

    let body = tree::build_body(entries)?;
    let hash_hex = store.write_framed(crate::object::ObjectType::Tree, &body)?;
    Ok(Some(hash_hex))
}
