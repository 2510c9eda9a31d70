use thiserror::Error;

/// Errors that can occur in the integration layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The durable item backend failed a read or write.
    #[error("backend error: {0}")]
    Backend(String),

    /// The shared lock store could not be reached or rejected a command.
    /// Distinct from a denied acquisition, which is not an error.
    #[error("lock store error: {0}")]
    LockStore(String),

    #[error("internal error: {0}")]
    Internal(String),
}
