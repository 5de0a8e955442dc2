use anyhow::Context;
use std::path::PathBuf;

use crate::hex;
use crate::object::{ObjectStore, ObjectType};
use crate::tree;

/// `git ls-tree`: list a tree object's entries, optionally recursing and
/// optionally showing only names.
pub fn invoke(hash: &str, recurse: bool, name_only: bool) -> anyhow::Result<()> {
    let store = ObjectStore::in_current_dir();
    list_tree(&store, hash, recurse, name_only, None)
}

fn list_tree(
    store: &ObjectStore,
    hash: &str,
    recurse: bool,
    name_only: bool,
    path_prefix: Option<&str>,
) -> anyhow::Result<()> {
    let object = store.read(hash).with_context(|| format!("reading tree {hash}"))?;
    anyhow::ensure!(
        object.typ == ObjectType::Tree,
        "incorrect object type '{}'",
        object.typ
    );

    for entry in tree::parse_entries(&object.body).context("parsing tree entries")? {
        let entry_hash = hex::encode(&entry.hash);

        if recurse && entry.is_dir() {
            list_tree(store, &entry_hash, recurse, name_only, Some(&entry.name))?;
            continue;
        }

        let mut name = PathBuf::from(&entry.name);
        if let Some(prefix) = path_prefix {
            name = PathBuf::from(prefix).join(name);
        }

        if name_only {
            println!("{}", name.display());
        } else {
            let kind = if entry.is_dir() { ObjectType::Tree } else { ObjectType::Blob };
            let mode: u32 = entry.mode.parse().context("incorrect file mode - not a number")?;
            println!("{mode:06} {kind} {entry_hash}\t{}", name.display());
        }
    }

    Ok(())
}
