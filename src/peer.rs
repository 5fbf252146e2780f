//! The RPC surface every node exposes to its peers.
//!
//! With the transport layer out of scope, a "peer" is whatever answers these
//! five operations — a trait object, not a base class. The production
//! [`Node`](crate::node::Node) implements it, and so does the omniscient
//! test fixture in [`sim`](crate::sim): a regular node and a "central" node
//! both satisfy the same interface.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::id::Id;

/// Outcome of a `FIND_VALUE` RPC.
#[derive(Clone)]
pub enum FindValueOutcome {
    /// The callee owns the value outright.
    Value(Vec<u8>),
    /// The callee knows which peer owns the value.
    Reference(PeerHandle),
    /// The callee owns neither; here are its closest known peers instead.
    Closer(Vec<PeerHandle>),
}

/// The minimal RPC surface a node exposes to its peers.
///
/// Every method's first argument is the caller's own handle. Implementers
/// MUST offer it to their routing table via `add_contact` before returning —
/// this is how the routing table discovers peers passively, from both sides
/// of every call.
pub trait Peer: Send + Sync {
    /// This peer's identifier.
    fn id(&self) -> Id;

    /// Liveness probe. May be non-deterministic under simulation; used only
    /// for routing decisions, never for correctness.
    fn ping(&self, caller: PeerHandle) -> bool;

    /// Equivalent to `closest_to(target, limit)` on the callee's table.
    fn find_node(&self, caller: PeerHandle, target: Id, limit: usize) -> Vec<PeerHandle>;

    /// Looks up a value by `(namespace, key_hash)`.
    fn find_value(&self, caller: PeerHandle, namespace: Id, key_hash: Id) -> FindValueOutcome;

    /// Installs an owned value. Returns whether the callee accepted the
    /// write — `false` models an unresponsive peer that dropped the RPC,
    /// the in-process stand-in for a transport timeout.
    fn store(&self, caller: PeerHandle, namespace: Id, key_hash: Id, value: Vec<u8>) -> bool;

    /// Installs a reference to the peer that owns the value. Same
    /// success/failure contract as `store`.
    fn reference(
        &self,
        caller: PeerHandle,
        namespace: Id,
        key_hash: Id,
        primary: PeerHandle,
    ) -> bool;
}

/// A cheaply-cloneable, comparable-by-id handle to anything implementing
/// [`Peer`]. Stands in for what a production build would make a socket
/// address plus connection pool.
#[derive(Clone)]
pub struct PeerHandle {
    id: Id,
    peer: Arc<dyn Peer>,
}

impl PeerHandle {
    /// Wraps a concrete peer implementation as a handle.
    pub fn new(peer: Arc<dyn Peer>) -> PeerHandle {
        PeerHandle { id: peer.id(), peer }
    }

    /// This peer's identifier, cached at construction so comparisons never
    /// need to cross the trait-object boundary.
    pub fn id(&self) -> Id {
        self.id
    }

    /// Issues a PING to this peer.
    pub fn ping(&self, caller: PeerHandle) -> bool {
        self.peer.ping(caller)
    }

    /// Issues a FIND_NODE to this peer.
    pub fn find_node(&self, caller: PeerHandle, target: Id, limit: usize) -> Vec<PeerHandle> {
        self.peer.find_node(caller, target, limit)
    }

    /// Issues a FIND_VALUE to this peer.
    pub fn find_value(&self, caller: PeerHandle, namespace: Id, key_hash: Id) -> FindValueOutcome {
        self.peer.find_value(caller, namespace, key_hash)
    }

    /// Issues a STORE to this peer.
    pub fn store(&self, caller: PeerHandle, namespace: Id, key_hash: Id, value: Vec<u8>) -> bool {
        self.peer.store(caller, namespace, key_hash, value)
    }

    /// Issues a REFERENCE to this peer.
    pub fn reference(
        &self,
        caller: PeerHandle,
        namespace: Id,
        key_hash: Id,
        primary: PeerHandle,
    ) -> bool {
        self.peer.reference(caller, namespace, key_hash, primary)
    }
}

impl PartialEq for PeerHandle {
    fn eq(&self, other: &PeerHandle) -> bool {
        self.id == other.id
    }
}

impl Eq for PeerHandle {}

impl Hash for PeerHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for PeerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerHandle({})", self.id)
    }
}
