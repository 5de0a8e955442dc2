use anyhow::Context;
use std::fs;
use std::path::{Path, PathBuf};

use crate::hex;
use crate::http::HttpClient;
use crate::object::{ObjectStore, ObjectType};
use crate::pack;
use crate::repo;
use crate::transport;
use crate::tree;

/// `git clone <url> [dir]`: discover refs, fetch the pack, decode it and
/// materialize the working directory for HEAD's tree.
pub fn invoke(repository_url: &str, dir: Option<PathBuf>) -> anyhow::Result<()> {
    let repository_url = repository_url.trim_end_matches('/').to_string();

    let dir = match dir {
        Some(dir) => dir,
        None => PathBuf::from(default_dir_name(&repository_url)?),
    };

    fs::create_dir_all(&dir).with_context(|| format!("creating directory {}", dir.display()))?;
    repo::create_skeleton(&dir)
        .with_context(|| format!("initializing git directory in {}", dir.display()))?;

    println!("Cloning into '{}'...", dir.display());
    tracing::info!(url = %repository_url, dir = %dir.display(), "clone: starting");

    run_clone(&repository_url, &dir)
}

fn run_clone(repository_url: &str, dir: &Path) -> anyhow::Result<()> {
    let http = HttpClient::new().context("building http client")?;
    let store = ObjectStore::new(dir.join(".git"));

    let refs_response = http
        .get_refs(repository_url)
        .context("discovering refs")?;
    let head_hash = transport::parse_head_ref(&refs_response).context("parsing HEAD ref")?;
    tracing::info!(head = %head_hash, "clone: discovered HEAD");

    let want_body = transport::build_want_request(&head_hash);
    let raw_response = http
        .post_upload_pack(repository_url, want_body)
        .context("fetching pack")?;
    let pack_bytes = transport::strip_side_band(&raw_response).context("extracting packfile")?;

    let stats = pack::decode(&pack_bytes, &store).context("decoding pack")?;
    println!("Received objects: {}", stats.objects_written);
    println!("Resolved deltas: {}", stats.deltas_resolved);
    tracing::info!(
        objects = stats.objects_written,
        deltas = stats.deltas_resolved,
        "clone: pack decoded"
    );

    let head_tree_hash = resolve_head_tree(&store, &head_hash)?;
    checkout_tree(&store, dir, &head_tree_hash)
        .with_context(|| format!("materializing working directory in {}", dir.display()))?;

    tracing::info!("clone: checkout complete");
    Ok(())
}

fn default_dir_name(repository_url: &str) -> anyhow::Result<String> {
    let mut name = repository_url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .context("could not determine output directory from the repository url")?
        .to_string();
    if let Some(stripped) = name.strip_suffix(".git") {
        name = stripped.to_string();
    }
    Ok(name)
}

fn resolve_head_tree(store: &ObjectStore, head_hash: &str) -> anyhow::Result<String> {
    let commit = store
        .read(head_hash)
        .with_context(|| format!("reading HEAD commit {head_hash}"))?;
    anyhow::ensure!(
        commit.typ == ObjectType::Commit,
        "HEAD {head_hash} does not point at a commit"
    );

    let text = std::str::from_utf8(&commit.body).context("commit body is not UTF-8")?;
    let first_line = text
        .lines()
        .next()
        .context("commit object has no content")?;
    let tree_hash = first_line
        .strip_prefix("tree ")
        .with_context(|| format!("commit {head_hash} does not start with 'tree <hash>'"))?;

    anyhow::ensure!(tree_hash.len() == 40, "malformed tree hash in commit {head_hash}");
    Ok(tree_hash.to_string())
}

fn checkout_tree(store: &ObjectStore, target_dir: &Path, tree_hash: &str) -> anyhow::Result<()> {
    let object = store
        .read(tree_hash)
        .with_context(|| format!("reading tree {tree_hash}"))?;
    anyhow::ensure!(object.typ == ObjectType::Tree, "object {tree_hash} is not a tree");

    for entry in tree::parse_entries(&object.body).context("parsing tree entries")? {
        let entry_hash = hex::encode(&entry.hash);
        let entry_path = target_dir.join(&entry.name);

        if entry.is_dir() {
            fs::create_dir_all(&entry_path)
                .with_context(|| format!("creating directory {}", entry_path.display()))?;
            checkout_tree(store, &entry_path, &entry_hash)?;
        } else {
            let blob = store
                .read(&entry_hash)
                .with_context(|| format!("reading blob {entry_hash}"))?;
            fs::write(&entry_path, &blob.body)
                .with_context(|| format!("writing {}", entry_path.display()))?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dir_name_strips_dot_git_and_trailing_slash() {
        assert_eq!(
            default_dir_name("https://example.com/foo/bar.git").unwrap(),
            "bar"
        );
        assert_eq!(
            default_dir_name("https://example.com/foo/bar").unwrap(),
            "bar"
        );
    }

    #[test]
    fn checkout_tree_materializes_nested_blobs() {
        let tmp = tempfile::TempDir::new().unwrap();
        let store = ObjectStore::new(tmp.path().join(".git"));

        let file_id = store
            .write_framed(ObjectType::Blob, b"contents")
            .unwrap();
        let mut file_hash = [0u8; 20];
        file_hash.copy_from_slice(&hex::decode(&file_id).unwrap());

        let inner_body = tree::build_body(vec![tree::TreeEntry {
            mode: tree::MODE_FILE.to_string(),
            name: "file.txt".to_string(),
            hash: file_hash,
        }])
        .unwrap();
        let inner_tree_id = store.write_framed(ObjectType::Tree, &inner_body).unwrap();
        let mut inner_tree_hash = [0u8; 20];
        inner_tree_hash.copy_from_slice(&hex::decode(&inner_tree_id).unwrap());

        let root_body = tree::build_body(vec![tree::TreeEntry {
            mode: tree::MODE_DIR.to_string(),
            name: "subdir".to_string(),
            hash: inner_tree_hash,
        }])
        .unwrap();
        let root_tree_id = store.write_framed(ObjectType::Tree, &root_body).unwrap();

        let checkout_dir = tmp.path().join("work");
        fs::create_dir_all(&checkout_dir).unwrap();
        checkout_tree(&store, &checkout_dir, &root_tree_id).unwrap();

        let written = fs::read(checkout_dir.join("subdir").join("file.txt")).unwrap();
        assert_eq!(written, b"contents");
    }
}
