/// Core error type for the chaff optimizer.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("parse error at line {line}, column {col}: {message}")]
    Parse {
        line: usize,
        col: usize,
        message: String,
    },

    #[error("malformed generated-functions marker: {0}")]
    Marker(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
