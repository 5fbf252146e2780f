//! Error taxonomy surfaced by the DHT façade.
//!
//! RPC-level failures (timeouts) are absorbed into the iterative lookup and
//! never reach a caller directly — a peer that times out is treated exactly
//! like one that returned an empty result. Only [`Dht::put`] and
//! [`Dht::get`] surface [`DhtError`], so retries can be targeted at the
//! right condition.
//!
//! [`Dht::put`]: crate::dht::Dht::put
//! [`Dht::get`]: crate::dht::Dht::get

use thiserror::Error;

use crate::id::Id;

/// Failure kinds a caller of the DHT façade can distinguish and act on.
#[derive(Debug, Error)]
pub enum DhtError {
    /// `discover` returned an empty shortlist: this node knows no live peers.
    #[error("no peers available to route through")]
    NoPeers,

    /// `get` converged without locating the key or a reference to it.
    #[error("key not found after lookup converged")]
    NotFound,

    /// The primary STORE RPC failed during `put`.
    #[error("store failed at primary peer {primary}")]
    StoreFailed {
        /// The peer selected as primary for the key.
        primary: Id,
    },
}

/// Convenience alias for the façade's fallible operations.
pub type DhtResult<T> = Result<T, DhtError>;
