// file: src/error.rs
// description: Custom error types and result type aliases
// reference: https://docs.rs/thiserror

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConversionError>;

#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Notebook file not found: {0}")]
    NotFound(PathBuf),

    /// Never returned from a conversion; asset failures are logged and the
    /// reference is left untouched.
    #[error("Asset reference '{reference}' cannot be resolved: {reason}")]
    AssetUnresolvable { reference: String, reason: String },

    #[error("Frontmatter serialization error: {0}")]
    Serialization(String),

    #[error("Frontmatter parse error: {0}")]
    FrontmatterParse(String),

    #[error("Notebook export failed for {path}: {message}")]
    Notebook { path: PathBuf, message: String },

    #[error("Markdown rendering error: {0}")]
    Render(String),

    #[error("Repository metadata error: {0}")]
    Repository(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("File operation failed for {path}: {source}")]
    FileOperation {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ConversionError {
    pub fn file_operation(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileOperation {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = ConversionError::NotFound(PathBuf::from("missing.ipynb"));
        assert_eq!(err.to_string(), "Notebook file not found: missing.ipynb");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ConversionError = io_err.into();
        assert!(matches!(err, ConversionError::Io(_)));
    }
}
