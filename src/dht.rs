//! Namespaced `put`/`get` built on `discover`, with primary-plus-reference
//! replication.
//!
//! A thin, purpose-specific handle wrapping a `Node` and a namespace, rather
//! than a bag of construction knobs.

use tracing::warn;

use crate::discover::{self, Discovered, LookupMode};
use crate::error::{DhtError, DhtResult};
use crate::id::Id;
use crate::node::Node;
use crate::peer::FindValueOutcome;

/// A namespaced view over a node's participation in the DHT.
pub struct Dht<'a> {
    node: &'a Node,
    namespace: Id,
}

impl<'a> Dht<'a> {
    /// Scopes `node` to the sub-DHT identified by hashing `namespace`.
    pub fn new(node: &'a Node, namespace: &str) -> Dht<'a> {
        Dht { node, namespace: Id::hash(namespace.as_bytes()) }
    }

    /// Stores `value` under `key`.
    ///
    /// Fails with [`DhtError::NoPeers`] if `discover` returns an empty
    /// shortlist, and with [`DhtError::StoreFailed`] if the primary rejects
    /// the STORE. A failure to replicate to any of the remaining k−1 peers
    /// is logged and does not fail the call.
    pub fn put(&self, key: &str, value: Vec<u8>) -> DhtResult<()> {
        let key_hash = Id::hash(key.as_bytes());
        let shortlist = match discover::discover(self.node, key_hash, LookupMode::Nodes) {
            Discovered::Peers(peers) => peers,
            Discovered::Value(_) | Discovered::Reference(_) => {
                unreachable!("a node lookup never resolves to a value or reference")
            }
        };

        let primary = shortlist.first().cloned().ok_or(DhtError::NoPeers)?;
        let self_handle = self.node.handle();

        if self.node.config().use_references {
            if !primary.store(self_handle.clone(), self.namespace, key_hash, value) {
                return Err(DhtError::StoreFailed { primary: primary.id() });
            }
            for backup in &shortlist[1..] {
                if !backup.reference(self_handle.clone(), self.namespace, key_hash, primary.clone()) {
                    warn!(peer = %backup.id(), key = %key_hash, "reference replication failed, continuing");
                }
            }
        } else {
            if !primary.store(self_handle.clone(), self.namespace, key_hash, value.clone()) {
                return Err(DhtError::StoreFailed { primary: primary.id() });
            }
            for replica in &shortlist[1..] {
                if !replica.store(self_handle.clone(), self.namespace, key_hash, value.clone()) {
                    warn!(peer = %replica.id(), key = %key_hash, "replication failed, continuing");
                }
            }
        }

        Ok(())
    }

    /// Retrieves the value stored under `key`.
    ///
    /// Fails with [`DhtError::NotFound`] if `discover` converges without
    /// locating the value or a reference to it, including the second hop
    /// to the reference's target.
    pub fn get(&self, key: &str) -> DhtResult<Vec<u8>> {
        let key_hash = Id::hash(key.as_bytes());
        let mode = LookupMode::Value { namespace: self.namespace, key_hash };

        match discover::discover(self.node, key_hash, mode) {
            Discovered::Value(value) => Ok(value),
            Discovered::Reference(holder) => {
                match holder.find_value(self.node.handle(), self.namespace, key_hash) {
                    FindValueOutcome::Value(value) => Ok(value),
                    FindValueOutcome::Reference(_) | FindValueOutcome::Closer(_) => Err(DhtError::NotFound),
                }
            }
            Discovered::Peers(_) => Err(DhtError::NotFound),
        }
    }
}
