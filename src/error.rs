use thiserror::Error;

/// Typed failure modes shared by the object store, pack decoder and wire
/// framing (C1-C6). CLI-facing code wraps these in `anyhow::Result` the way
/// the original commands already did, so a caller gets `.context(...)`
/// ergonomics without the library losing a matchable error type.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("bad hex input: {0}")]
    BadHex(String),

    #[error("bad object header: {0}")]
    BadHeader(String),

    #[error("bad pkt-line frame: {0}")]
    BadFrame(String),

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("missing delta base: {0}")]
    MissingBase(String),

    #[error("no packfile found in response")]
    NoPack,
}

pub type Result<T> = std::result::Result<T, GitError>;
