//! Kademlia-style distributed hash table.
//!
//! This crate implements the routing and lookup engine of a Kademlia DHT:
//! the XOR identifier space, k-bucket routing table, iterative `discover`
//! lookup, a primary-plus-reference replicated store built on top of it,
//! and the single-peer bootstrap protocol. Transport, wire encoding and
//! peer discovery above "the caller supplies one address" are left to the
//! embedding application; see [`peer::Peer`] for the seam.

pub mod config;
pub mod dht;
pub mod discover;
pub mod error;
pub mod id;
pub mod node;
pub mod peer;
pub mod routing;
pub mod sim;
pub mod storage;

pub use config::Config;
pub use dht::Dht;
pub use error::{DhtError, DhtResult};
pub use id::Id;
pub use node::Node;
pub use peer::{Peer, PeerHandle};
