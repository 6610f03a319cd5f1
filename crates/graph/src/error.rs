use thiserror::Error;

/// Failures surfaced by the graph store adapter.
///
/// Connection and query failures are transient from the caller's point of
/// view: the query itself was valid, so both are retryable. A malformed row
/// means the graph holds data outside the closed vocabulary and retrying
/// will not help.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("graph store connection failed: {0}")]
    Connection(String),

    #[error("graph query failed: {0}")]
    QueryFailed(String),

    #[error("malformed row from graph store: {0}")]
    MalformedRow(String),
}

impl GraphError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, GraphError::Connection(_) | GraphError::QueryFailed(_))
    }
}
