use thiserror::Error;

/// Fatal parse failures. End-of-input is not an error; readers signal it as
/// `Ok(None)`.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("i/o error reading log stream")]
    Io(#[from] std::io::Error),
    #[error("malformed json record")]
    Json(#[from] serde_json::Error),
    #[error("line does not match combined log format: {0:?}")]
    Grammar(String),
    #[error("unparseable timestamp: {0:?}")]
    Timestamp(String),
}
