//! A node: identifier, routing table, local store and configuration bound
//! together, implementing the [`Peer`] RPC surface and the bootstrap
//! protocol.
//!
//! An `Arc`-shared resource bundle reached through a thin handle: rather
//! than a node holding an `Arc` to its own peers and they to it (an honest
//! reference cycle), every handle is a `Weak`-backed reference resolved
//! lazily, so the graph has no strong cycles to leak. A node derives a
//! [`PeerHandle`] pointing back at itself the same way a transport-backed
//! node would derive a reply address from an inbound connection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use tracing::{debug, info};

use crate::config::Config;
use crate::discover::{self, Discovered, LookupMode};
use crate::id::Id;
use crate::peer::{FindValueOutcome, Peer, PeerHandle};
use crate::routing::Table;
use crate::storage::Storage;

/// A participant in the DHT: an identifier, a routing table, a local store,
/// and the network constants it was configured with.
pub struct Node {
    id: Id,
    config: Config,
    table: Table,
    storage: Storage,
    responsive: AtomicBool,
    self_ref: OnceLock<Weak<Node>>,
}

impl Node {
    /// Constructs a node whose identifier is the hash of `name`, with
    /// default configuration.
    pub fn new(name: &str) -> Arc<Node> {
        Node::with_config(name, Config::default())
    }

    /// Constructs a node with explicit configuration.
    pub fn with_config(name: &str, config: Config) -> Arc<Node> {
        let id = Id::hash(name.as_bytes());
        let node = Arc::new(Node {
            id,
            table: Table::new(id, config.k),
            storage: Storage::new(),
            config,
            responsive: AtomicBool::new(true),
            self_ref: OnceLock::new(),
        });
        let _ = node.self_ref.set(Arc::downgrade(&node));
        info!(id = %id, "node constructed");
        node
    }

    /// This node's identifier.
    pub fn id(&self) -> Id {
        self.id
    }

    /// This node's configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// This node's routing table.
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// This node's local store.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    /// A [`PeerHandle`] pointing back at this node, suitable for passing to
    /// another peer's RPCs as the caller, or for including in a routing
    /// table's `closest_to` results.
    pub fn handle(&self) -> PeerHandle {
        let weak = self
            .self_ref
            .get()
            .expect("self_ref is always set in with_config before the node is handed out");
        let strong = weak.upgrade().expect("node handle outlived its own Arc");
        PeerHandle::new(strong as Arc<dyn Peer>)
    }

    /// Toggles whether this node answers PING, STORE and REFERENCE. Used by
    /// tests to simulate an unresponsive peer; FIND_NODE and FIND_VALUE are
    /// unaffected by this flag since their failure mode is the deadline
    /// enforced around `discover`'s parallel queries, not node-level
    /// liveness.
    pub fn set_responsive(&self, responsive: bool) {
        self.responsive.store(responsive, Ordering::SeqCst);
    }

    /// Populates this node's routing table from a single known peer.
    pub fn bootstrap(&self, known: PeerHandle) {
        self.table.add_contact(known.clone(), &self.handle());

        let found = known.find_node(self.handle(), self.id, self.config.k);
        for peer in &found {
            self.table.add_contact(peer.clone(), &self.handle());
        }
        debug!(via = %known.id(), discovered = found.len(), "bootstrap seeded from known peer");

        // Further populate distant buckets by looking ourselves up across
        // the wider network: asking for our own id returns the peers best
        // positioned to be future neighbours in that bucket region.
        if let Discovered::Peers(peers) = discover::discover(self, self.id, LookupMode::Nodes) {
            for peer in &peers {
                self.table.add_contact(peer.clone(), &self.handle());
            }
        }
    }
}

impl Peer for Node {
    fn id(&self) -> Id {
        self.id
    }

    fn ping(&self, caller: PeerHandle) -> bool {
        self.table.add_contact(caller, &self.handle());
        self.responsive.load(Ordering::SeqCst)
    }

    fn find_node(&self, caller: PeerHandle, target: Id, limit: usize) -> Vec<PeerHandle> {
        self.table.add_contact(caller, &self.handle());
        self.table.closest_to(&target, limit as i64, &self.handle())
    }

    fn find_value(&self, caller: PeerHandle, namespace: Id, key_hash: Id) -> FindValueOutcome {
        self.table.add_contact(caller, &self.handle());
        if let Some(value) = self.storage.fetch_value(&namespace, &key_hash) {
            FindValueOutcome::Value(value)
        } else if let Some(holder) = self.storage.fetch_reference(&namespace, &key_hash) {
            FindValueOutcome::Reference(holder)
        } else {
            let closer = self.table.closest_to(&key_hash, self.config.k as i64, &self.handle());
            FindValueOutcome::Closer(closer)
        }
    }

    fn store(&self, caller: PeerHandle, namespace: Id, key_hash: Id, value: Vec<u8>) -> bool {
        self.table.add_contact(caller, &self.handle());
        if !self.responsive.load(Ordering::SeqCst) {
            return false;
        }
        self.storage.store(namespace, key_hash, value);
        true
    }

    fn reference(&self, caller: PeerHandle, namespace: Id, key_hash: Id, primary: PeerHandle) -> bool {
        self.table.add_contact(caller, &self.handle());
        if !self.responsive.load(Ordering::SeqCst) {
            return false;
        }
        self.storage.reference(namespace, key_hash, primary);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_node_has_empty_table() {
        let node = Node::new("alpha");
        assert!(node.table().is_empty());
    }

    #[test]
    fn handle_roundtrips_to_the_same_id() {
        let node = Node::new("alpha");
        assert_eq!(node.handle().id(), node.id());
    }

    #[test]
    fn bootstrap_populates_table_from_a_single_peer() {
        let seed = Node::new("seed");
        let joiner = Node::new("joiner");

        joiner.bootstrap(seed.handle());
        assert!(joiner.table().len() >= 1);
    }

    #[test]
    fn unresponsive_node_fails_ping_store_and_reference() {
        let node = Node::new("victim");
        let caller = Node::new("caller");
        node.set_responsive(false);

        assert!(!node.ping(caller.handle()));
        assert!(!node.store(caller.handle(), Id::random(), Id::random(), b"x".to_vec()));
    }
}
