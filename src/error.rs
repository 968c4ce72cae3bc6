use thiserror::Error;

/// Errors surfaced by the timing core and the record grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    /// A level code was resolved against a chapter that does not own it.
    /// Recoverable: re-resolve the right chapter and try again.
    #[error("level {code} belongs to chapter {owner}, not chapter {chapter}")]
    WrongChapter {
        code: String,
        chapter: u8,
        owner: u8,
    },

    /// A timer operation was called out of order.
    #[error("{0}")]
    BadState(&'static str),

    /// Serialization was attempted on an entity with nothing recorded.
    /// Expected during saves; the caller omits the entity from the output.
    #[error("nothing recorded for {0}")]
    Empty(String),

    /// A chapter-name lookup did not match any known chapter.
    #[error("unknown chapter: {0}")]
    NotFound(String),

    /// A level code matched neither the episode nor the flat naming scheme.
    #[error("unrecognized level code: {0}")]
    UnknownCode(String),
}
