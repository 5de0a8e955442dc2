//! The HTTPS collaborator the core consumes: GET (with redirects) and POST
//! (with a custom content type and body), surfacing the response body as a
//! contiguous buffer and the status code.

use crate::error::{GitError, Result};

const USER_AGENT: &str = concat!("rgit/", env!("CARGO_PKG_VERSION"));

pub struct HttpClient {
    client: reqwest::blocking::Client,
}

/// Normalize `repository_url` to the `<url>.git` form the wire protocol
/// endpoints hang off, whether or not the caller already included the
/// `.git` suffix.
fn dot_git_base(repository_url: &str) -> String {
    let trimmed = repository_url
        .trim_end_matches('/')
        .trim_end_matches(".git");
    format!("{trimmed}.git")
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| GitError::Corrupt(format!("building http client: {e}")))?;
        Ok(Self { client })
    }

    /// `GET <url>.git/info/refs?service=git-upload-pack`, following redirects.
    pub fn get_refs(&self, repository_url: &str) -> Result<Vec<u8>> {
        let url = format!("{}/info/refs?service=git-upload-pack", dot_git_base(repository_url));
        let resp = self
            .client
            .get(&url)
            .send()
            .map_err(|e| GitError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(GitError::Corrupt(format!(
                "GET {url} returned status {}",
                resp.status()
            )));
        }

        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| GitError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }

    /// `POST <url>.git/git-upload-pack` with the want/done body, returning
    /// the raw (still side-band-framed) response bytes.
    pub fn post_upload_pack(&self, repository_url: &str, body: Vec<u8>) -> Result<Vec<u8>> {
        let url = format!("{}/git-upload-pack", dot_git_base(repository_url));
        let resp = self
            .client
            .post(&url)
            .header("Content-Type", "application/x-git-upload-pack-request")
            .body(body)
            .send()
            .map_err(|e| GitError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;

        if resp.status() != reqwest::StatusCode::OK {
            return Err(GitError::Corrupt(format!(
                "POST {url} returned status {}",
                resp.status()
            )));
        }

        resp.bytes()
            .map(|b| b.to_vec())
            .map_err(|e| GitError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))
    }
}
