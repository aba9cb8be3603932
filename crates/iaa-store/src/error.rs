use iaa_kernel::IaaError;

/// Errors from loading or writing corpus data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{path}: I/O error: {message}")]
    Io { path: String, message: String },

    /// `location` is a path, optionally suffixed with `:<line>`.
    #[error("{location}: parse error: {message}")]
    Parse { location: String, message: String },

    #[error("layout error: {0}")]
    Layout(String),

    #[error("schema error: {0}")]
    Schema(String),

    #[error("corrupted input: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Config(#[from] IaaError),
}

impl StoreError {
    pub(crate) fn io(path: &std::path::Path, error: impl std::fmt::Display) -> Self {
        Self::Io {
            path: path.display().to_string(),
            message: error.to_string(),
        }
    }
}
