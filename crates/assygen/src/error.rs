use thiserror::Error;

#[derive(Error, Debug)]
pub enum GerberError {
    #[error("parse error: {0}")]
    ParseError(String),

    #[error("line {line}: {reason}")]
    LineDecode { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GerberError {
    /// Attach a source line number to a parse error raised below the line driver.
    pub fn at_line(self, line: usize) -> Self {
        match self {
            GerberError::ParseError(reason) => GerberError::LineDecode { line, reason },
            other => other,
        }
    }
}
