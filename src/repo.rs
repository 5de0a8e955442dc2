//! Repository skeleton creation, shared by the `init` command and the first
//! step of `clone`.

use std::fs;
use std::path::Path;

use crate::error::Result;

/// Create `<root>/.git/{objects,refs/heads,refs/tags}` and a default HEAD
/// pointing at `refs/heads/main`.
pub fn create_skeleton(root: &Path) -> Result<()> {
    let git_dir = root.join(".git");
    fs::create_dir_all(git_dir.join("objects"))?;
    fs::create_dir_all(git_dir.join("refs").join("heads"))?;
    fs::create_dir_all(git_dir.join("refs").join("tags"))?;
    fs::write(git_dir.join("HEAD"), "ref: refs/heads/main\n")?;
    Ok(())
}
