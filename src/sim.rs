//! In-process test/simulation harness.
//!
//! An omniscient "central" registry node is useful purely to wire up test
//! fixtures, and must never survive into the production core as a global:
//! it lives in its own module, implements the same [`Peer`] trait as a
//! regular [`Node`] (a "central" node and a regular node differ only in how
//! `closest_to` is computed), and is never constructed except by tests that
//! inject it explicitly.
//!
//! `Central` is a genuine participant, not an inert seed: every bootstrapped
//! node retains it as an ordinary routable contact at `Id::ZERO` (`bootstrap`
//! adds whatever peer it is given — §4.7 does not carve out an exception for
//! the seed), so it can legitimately land in a `discover` shortlist and be
//! asked to STORE or REFERENCE like any other peer. Refusing those writes
//! while still being routable would make it a storage/replication slot that
//! silently swallows writes; instead it answers them out of its own
//! [`Storage`], the same way `original_source/python-quickstart/DHT.py`'s
//! `Central` inherits `BaseNode`'s `add`/`reference` rather than overriding
//! them away.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock, Weak};

use crate::id::Id;
use crate::node::Node;
use crate::peer::{FindValueOutcome, Peer, PeerHandle};
use crate::storage::Storage;

/// An omniscient registry of every node registered with it, standing in
/// for whatever out-of-band bootstrap-node discovery mechanism a real
/// deployment would use. Tests bootstrap an entire small network through one
/// of these rather than wiring up bootstrap chains by hand.
pub struct Central {
    nodes: RwLock<HashMap<Id, Arc<Node>>>,
    storage: Storage,
    self_ref: OnceLock<Weak<Central>>,
}

impl Central {
    /// An empty registry.
    pub fn new() -> Arc<Central> {
        let central = Arc::new(Central {
            nodes: RwLock::new(HashMap::new()),
            storage: Storage::new(),
            self_ref: OnceLock::new(),
        });
        let _ = central.self_ref.set(Arc::downgrade(&central));
        central
    }

    /// Bootstraps `node` through this registry and adds it to the registry.
    /// The joining node's routing table is populated first, then it becomes
    /// discoverable to every node that registers after it.
    pub fn register(&self, node: Arc<Node>) {
        node.bootstrap(self.handle());
        self.nodes.write().unwrap().insert(node.id(), node);
    }

    /// Snapshot of every node currently registered.
    pub fn nodes(&self) -> Vec<Arc<Node>> {
        self.nodes.read().unwrap().values().cloned().collect()
    }

    /// Number of registered nodes.
    pub fn len(&self) -> usize {
        self.nodes.read().unwrap().len()
    }

    /// A handle peers can use to reach this registry's `find_node`.
    pub fn handle(&self) -> PeerHandle {
        let weak = self.self_ref.get().expect("self_ref set in Central::new");
        let strong = weak.upgrade().expect("central handle outlived its own Arc");
        PeerHandle::new(strong as Arc<dyn Peer>)
    }

    /// This registry's own local store — it answers STORE/REFERENCE like any
    /// other peer it may be routed to, so tests that tally owners/references
    /// across a swarm must account for its share too.
    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}

impl Peer for Central {
    fn id(&self) -> Id {
        Id::ZERO
    }

    fn ping(&self, _caller: PeerHandle) -> bool {
        true
    }

    fn find_node(&self, _caller: PeerHandle, target: Id, limit: usize) -> Vec<PeerHandle> {
        let mut handles: Vec<PeerHandle> =
            self.nodes.read().unwrap().values().map(|node| node.handle()).collect();
        handles.sort_by_key(|peer| Id::distance(&target, &peer.id()));
        handles.truncate(limit);
        handles
    }

    fn find_value(&self, caller: PeerHandle, namespace: Id, key_hash: Id) -> FindValueOutcome {
        if let Some(value) = self.storage.fetch_value(&namespace, &key_hash) {
            FindValueOutcome::Value(value)
        } else if let Some(holder) = self.storage.fetch_reference(&namespace, &key_hash) {
            FindValueOutcome::Reference(holder)
        } else {
            FindValueOutcome::Closer(self.find_node(caller, key_hash, usize::MAX))
        }
    }

    fn store(&self, _caller: PeerHandle, namespace: Id, key_hash: Id, value: Vec<u8>) -> bool {
        self.storage.store(namespace, key_hash, value);
        true
    }

    fn reference(
        &self,
        _caller: PeerHandle,
        namespace: Id,
        key_hash: Id,
        primary: PeerHandle,
    ) -> bool {
        self.storage.reference(namespace, key_hash, primary);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_nodes_bootstraps_them_against_each_other() {
        let central = Central::new();
        for i in 0..5 {
            central.register(Node::new(&i.to_string()));
        }

        assert_eq!(central.len(), 5);
        for node in central.nodes() {
            assert!(!node.table().is_empty());
        }
    }
}
