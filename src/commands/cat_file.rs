use anyhow::Context;
use std::io::Write;

use crate::object::ObjectStore;

/// `git cat-file`: show an object's type, size, or pretty-printed content.
pub fn invoke(hash: &str, type_only: bool, size_only: bool) -> anyhow::Result<()> {
    let store = ObjectStore::in_current_dir();
    let object = store.read(hash).with_context(|| format!("reading object {hash}"))?;

    if type_only {
        println!("{}", object.typ);
        return Ok(());
    }

    if size_only {
        println!("{}", object.body.len());
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    stdout
        .write_all(&object.body)
        .context("streaming object content to stdout")?;
    Ok(())
}
