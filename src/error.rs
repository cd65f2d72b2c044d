use std::error::Error as StdError;

/// Errors raised by the tag registry, the save coordinator and config loading.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid color {0:?}")]
    InvalidColor(String),

    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Opaque failure reported by a persistence backend.
///
/// The coordinator never retries or rolls back on this error; it is handed
/// straight back to whoever triggered the commit.
#[derive(Debug, thiserror::Error)]
#[error("failed to persist {target}: {reason}")]
pub struct PersistError {
    target: String,
    reason: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl PersistError {
    pub fn new(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { target: target.into(), reason: reason.into(), source: None }
    }

    pub fn with_source(
        target: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            target: target.into(),
            reason: source.to_string(),
            source: Some(Box::new(source)),
        }
    }

    /// The document the failed write was for.
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}
