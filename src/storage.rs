//! Per-node local store: `namespace → (key-hash → record)`.
//!
//! A plain `RwLock<HashMap<..>>` shape, scoped one level deeper than a
//! single-tenant store to support namespaces. No expiration or republishing
//! machinery — TTL and replica repair are out of scope.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::id::Id;
use crate::peer::PeerHandle;

/// A stored key's state: this node either owns the value, or knows which
/// peer does. A node never holds both at once for the same key.
#[derive(Clone)]
pub enum Record {
    /// This node is the authoritative holder of the value.
    Owned(Vec<u8>),
    /// This node knows which peer holds the value.
    Reference(PeerHandle),
}

/// Local store, scoped by namespace. Namespaces are independent of each
/// other; a key hash in one namespace has no relationship to the same hash
/// in another.
#[derive(Default)]
pub struct Storage {
    namespaces: RwLock<HashMap<Id, HashMap<Id, Record>>>,
}

impl Storage {
    /// An empty store.
    pub fn new() -> Storage {
        Storage::default()
    }

    /// Installs `Owned(value)`, overwriting any prior record at that key.
    pub fn store(&self, namespace: Id, key_hash: Id, value: Vec<u8>) {
        let mut namespaces = self.namespaces.write().unwrap();
        namespaces
            .entry(namespace)
            .or_default()
            .insert(key_hash, Record::Owned(value));
    }

    /// Installs `Reference(peer)`, overwriting any prior record at that key.
    pub fn reference(&self, namespace: Id, key_hash: Id, peer: PeerHandle) {
        let mut namespaces = self.namespaces.write().unwrap();
        namespaces
            .entry(namespace)
            .or_default()
            .insert(key_hash, Record::Reference(peer));
    }

    /// Returns the value iff the record at this key is `Owned`.
    pub fn fetch_value(&self, namespace: &Id, key_hash: &Id) -> Option<Vec<u8>> {
        let namespaces = self.namespaces.read().unwrap();
        match namespaces.get(namespace)?.get(key_hash)? {
            Record::Owned(value) => Some(value.clone()),
            Record::Reference(_) => None,
        }
    }

    /// Returns the holder iff the record at this key is `Reference`.
    pub fn fetch_reference(&self, namespace: &Id, key_hash: &Id) -> Option<PeerHandle> {
        let namespaces = self.namespaces.read().unwrap();
        match namespaces.get(namespace)?.get(key_hash)? {
            Record::Reference(peer) => Some(peer.clone()),
            Record::Owned(_) => None,
        }
    }

    /// Number of entries held in a namespace (diagnostic; used by tests
    /// validating replication counts).
    pub fn len(&self, namespace: &Id) -> usize {
        self.namespaces
            .read()
            .unwrap()
            .get(namespace)
            .map_or(0, |keys| keys.len())
    }

    /// Whether a namespace has no entries.
    pub fn is_empty(&self, namespace: &Id) -> bool {
        self.len(namespace) == 0
    }

    /// Returns true iff this key holds `Owned` in the given namespace.
    pub fn owns(&self, namespace: &Id, key_hash: &Id) -> bool {
        matches!(
            self.namespaces.read().unwrap().get(namespace).and_then(|keys| keys.get(key_hash)),
            Some(Record::Owned(_))
        )
    }

    /// Returns true iff this key holds `Reference` in the given namespace.
    pub fn references(&self, namespace: &Id, key_hash: &Id) -> bool {
        matches!(
            self.namespaces.read().unwrap().get(namespace).and_then(|keys| keys.get(key_hash)),
            Some(Record::Reference(_))
        )
    }
}
