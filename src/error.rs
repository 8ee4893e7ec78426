// error.rs
use std::io;
use thiserror::Error;

/// Error types produced by walker configuration, pattern compilation,
/// and filesystem resource acquisition.
///
/// `MatchError` is deliberately *not* propagated out of `read` — per the
/// external-matcher contract it is logged and treated as "did not match"
/// for the offending entry, so it only appears here for callers that want
/// to observe it via logging configuration, not as a `Result::Err` variant
/// returned from `read`.
#[derive(Error, Debug)]
pub enum WalkerError {
    /// Invalid enum string in behaviors, malformed integer, or conflicting
    /// path/filepath entity configuration.
    #[error("invalid walker configuration: {0}")]
    Config(String),

    /// The pattern failed to compile, or the regex engine rejected partial
    /// matching in a mode where it was required.
    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),

    /// OS failure opening the directory walker, initializing the device
    /// set, or stating an entry.
    #[error("resource error: {0}")]
    Resource(#[from] io::Error),

    /// Walkdir-level traversal failure (permission denied on readdir,
    /// broken symlink loop reported by the OS, etc).
    #[error("traversal error: {0}")]
    Walkdir(#[from] walkdir::Error),
}
