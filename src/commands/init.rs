use anyhow::Context;
use std::path::Path;

use crate::repo;

/// `git init`: create the `.git/` skeleton in the current directory.
pub fn invoke() -> anyhow::Result<()> {
    repo::create_skeleton(Path::new(".")).context("creating git directories")?;
    println!("Initialized git directory");
    Ok(())
}
