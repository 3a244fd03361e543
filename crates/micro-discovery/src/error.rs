//! Error types for fleet discovery.

use thiserror::Error;

/// Result type alias for discovery operations.
pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

/// Errors raised while talking to the fleet.
///
/// Neither variant is fatal: a transport failure empties the snapshot for
/// one cycle, a decode failure drops one reply.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("undecodable stats response: {0}")]
    Decode(String),
}
