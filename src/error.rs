//! Errors returned by this crate.

/// The error returned by [`sync_wait`](crate::sync_wait) when the operation
/// it waited for did not complete with a value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum WaitError<E> {
    /// The operation completed with an error.
    #[error("operation failed: {0:?}")]
    Failed(E),

    /// The operation completed with the done signal.
    #[error("operation was cancelled")]
    Cancelled,
}

impl<E> WaitError<E> {
    /// Returns `true` if the operation was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the operation's error, if it failed.
    #[must_use]
    pub fn into_failed(self) -> Option<E> {
        match self {
            Self::Failed(error) => Some(error),
            Self::Cancelled => None,
        }
    }
}
