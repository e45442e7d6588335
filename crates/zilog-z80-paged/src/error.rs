//! Error types.

use std::io;

use thiserror::Error;

/// A streamed transfer between memory and an external reader or writer
/// stopped early.
#[derive(Debug, Error)]
pub enum TransferError {
    /// The reader or writer failed.
    #[error("transfer aborted after {transferred} of {requested} bytes")]
    Io {
        transferred: usize,
        requested: usize,
        #[source]
        source: io::Error,
    },
    /// The reader ran dry before `requested` bytes arrived.
    #[error("unexpected end of input after {transferred} of {requested} bytes")]
    Truncated { transferred: usize, requested: usize },
}

impl TransferError {
    /// Bytes moved before the transfer stopped.
    #[must_use]
    pub const fn transferred(&self) -> usize {
        match self {
            Self::Io { transferred, .. } | Self::Truncated { transferred, .. } => *transferred,
        }
    }
}
