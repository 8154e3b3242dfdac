//! Guard error types returned by [`InstanceGuard::acquire`](crate::InstanceGuard::acquire).

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::liveness::Unverifiable;

/// Fatal startup errors. Expected contention is not an error, see
/// [`Acquired::AlreadyRunning`](crate::Acquired::AlreadyRunning).
#[derive(Debug, Error)]
pub enum GuardError {
    #[error("failed to open guard file {}", .path.display())]
    Open { path: PathBuf, source: io::Error },

    #[error("failed to read guard file {}", .path.display())]
    Read { path: PathBuf, source: io::Error },

    /// Content is neither empty nor a positive process identifier. The operator has to fix it.
    #[error("guard file {} is corrupted, {content:?} is not a process identifier", .path.display())]
    Malformed { path: PathBuf, content: String },

    #[error("failed to truncate stale guard file {}", .path.display())]
    Truncate { path: PathBuf, source: io::Error },

    #[error("failed to write process identifier to guard file {}", .path.display())]
    Write { path: PathBuf, source: io::Error },

    /// Only returned under [`UnverifiablePolicy::Refuse`](crate::UnverifiablePolicy::Refuse).
    #[error("guard file names process {pid} whose liveness cannot be verified: {reason}")]
    Unverifiable { pid: u32, reason: Unverifiable },
}
