use anyhow::Context;
use std::fmt::Write as _;

use crate::object::{frame, ObjectStore, ObjectType};

const AUTHOR_NAME: &str = "rgit";
const AUTHOR_EMAIL: &str = "rgit@localhost";

/// `git commit-tree`: synthesize and store a commit pointing at `tree_hash`.
pub fn invoke(tree_hash: &str, message: &str, parent_hash: Option<String>) -> anyhow::Result<String> {
    let store = ObjectStore::in_current_dir();

    // the tree must already exist; this also surfaces a clear error instead
    // of silently writing a commit that points nowhere
    store
        .read(tree_hash)
        .with_context(|| format!("tree object does not exist: {tree_hash}"))?;

    let mut commit = String::new();
    writeln!(commit, "tree {tree_hash}")?;
    if let Some(parent_hash) = parent_hash {
        writeln!(commit, "parent {parent_hash}")?;
    }

    let time = std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .context("current system time is before UNIX epoch")?;

    writeln!(
        commit,
        "author {AUTHOR_NAME} <{AUTHOR_EMAIL}> {} +0000",
        time.as_secs()
    )?;
    writeln!(
        commit,
        "committer {AUTHOR_NAME} <{AUTHOR_EMAIL}> {} +0000",
        time.as_secs()
    )?;
    writeln!(commit)?;
    write!(commit, "{message}")?;

    let framed = frame(ObjectType::Commit, commit.as_bytes());
    store.write(&framed).map_err(Into::into)
}
