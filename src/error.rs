//! Error taxonomy for the corpus engine.
//!
//! Fetch failures are reported per file through the load observer (see
//! [`crate::fetch::FetchError`]) and never abort a batch.
//!
//! Cache write failures never appear here: they are recovered inside the
//! cache and at worst cost a missed optimization. Parse errors are caught
//! per text during search and never surface as an [`EngineError`].

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration could not be read, parsed, or validated.
    #[error("configuration error: {0}")]
    Config(String),

    /// A load was requested that resolves to zero files.
    #[error("no repositories selected, or the selected repositories have no files")]
    NoSelection,

    /// Search was invoked before any text loaded successfully.
    #[error("no texts loaded; load at least one repository before searching")]
    NoTextsLoaded,

    #[error("search query is empty")]
    EmptyQuery,

    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
