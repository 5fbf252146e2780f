//! Iterative node lookup: the `discover` procedure that converges on the k
//! peers closest to a target, with an early-exit variant used by `get`.
//!
//! Each round's α selected peers are queried on their own OS thread and
//! joined against a single shared deadline rather than through an async
//! runtime. A peer whose thread does not report back before the deadline is
//! treated exactly like one that returned an empty result, and its thread is
//! left to finish and drop its result on its own — this crate has no
//! transport layer to forcibly tear down, so "abandoned" means "no longer
//! waited on".

use std::collections::HashSet;
use std::sync::mpsc;
use std::thread;
use std::time::Instant;

use tracing::{trace, warn};

use crate::id::Id;
use crate::node::Node;
use crate::peer::{FindValueOutcome, PeerHandle};

/// What a `discover` call is looking for.
#[derive(Clone)]
pub enum LookupMode {
    /// Find the k closest peers to the target (used by `put`).
    Nodes,
    /// Find a value or a reference to its holder (used by `get`).
    Value { namespace: Id, key_hash: Id },
}

/// Outcome of a `discover` call.
pub enum Discovered {
    /// The shortlist of closest-known peers, in ascending distance order.
    /// Returned by node lookups, and by value lookups that converge
    /// without finding anything.
    Peers(Vec<PeerHandle>),
    /// A value-seeking lookup found the value directly.
    Value(Vec<u8>),
    /// A value-seeking lookup found a peer holding a reference to the
    /// primary; the caller should fetch from that peer next.
    Reference(PeerHandle),
}

enum RoundResult {
    Peers(Vec<PeerHandle>),
    Value(Vec<u8>),
    Reference(PeerHandle),
}

fn dispatch(peer: PeerHandle, caller: PeerHandle, target: Id, mode: &LookupMode, k: usize) -> RoundResult {
    match mode {
        LookupMode::Nodes => RoundResult::Peers(peer.find_node(caller, target, k)),
        LookupMode::Value { namespace, key_hash } => {
            match peer.find_value(caller, *namespace, *key_hash) {
                FindValueOutcome::Value(value) => RoundResult::Value(value),
                FindValueOutcome::Reference(holder) => RoundResult::Reference(holder),
                FindValueOutcome::Closer(peers) => RoundResult::Peers(peers),
            }
        }
    }
}

/// Runs the iterative lookup from `node`'s perspective.
pub fn discover(node: &Node, target: Id, mode: LookupMode) -> Discovered {
    let self_handle = node.handle();
    let k = node.config().k;
    let alpha = node.config().alpha;
    let timeout = node.config().rpc_timeout;

    let mut shortlist = node.table().closest_to(&target, k as i64, &self_handle);
    // `seen` starts empty, not pre-seeded with this node's own id: the
    // caller itself is a legitimate first-round query target whenever it
    // lands in its own shortlist, which is how a value-seeking lookup ever
    // notices that the caller holds the value locally. Seeding `seen` with
    // the caller's own id up front would make a node permanently unable to
    // discover its own locally-stored values.
    let mut seen: HashSet<Id> = HashSet::new();

    loop {
        let selected: Vec<PeerHandle> = shortlist
            .iter()
            .filter(|p| !seen.contains(&p.id()))
            .take(alpha)
            .cloned()
            .collect();

        if selected.is_empty() {
            break;
        }

        let prev_closest: Vec<Id> = shortlist.iter().take(k).map(|p| p.id()).collect();

        let mut in_flight = Vec::with_capacity(selected.len());
        for peer in &selected {
            seen.insert(peer.id());
            let (tx, rx) = mpsc::channel();
            let peer_clone = peer.clone();
            let caller = self_handle.clone();
            let mode_clone = mode.clone();
            thread::spawn(move || {
                let result = dispatch(peer_clone, caller, target, &mode_clone, k);
                let _ = tx.send(result);
            });
            in_flight.push((peer.clone(), rx));
        }

        let deadline = Instant::now() + timeout;
        let mut new_peers = Vec::new();
        for (peer, rx) in in_flight {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match rx.recv_timeout(remaining) {
                Ok(RoundResult::Peers(peers)) => {
                    node.table().add_contact(peer.clone(), &self_handle);
                    for discovered in &peers {
                        node.table().add_contact(discovered.clone(), &self_handle);
                    }
                    new_peers.extend(peers);
                }
                Ok(RoundResult::Value(value)) => {
                    node.table().add_contact(peer.clone(), &self_handle);
                    return Discovered::Value(value);
                }
                Ok(RoundResult::Reference(holder)) => {
                    node.table().add_contact(peer.clone(), &self_handle);
                    node.table().add_contact(holder.clone(), &self_handle);
                    return Discovered::Reference(holder);
                }
                Err(_) => {
                    warn!(peer = %peer.id(), "rpc abandoned: no response before deadline");
                }
            }
        }

        let mut combined = shortlist.clone();
        combined.extend(new_peers);
        let mut dedup = HashSet::new();
        combined.retain(|p| dedup.insert(p.id()));
        combined.sort_by_key(|p| Id::distance(&target, &p.id()));
        combined.truncate(k);
        shortlist = combined;

        let new_closest: Vec<Id> = shortlist.iter().take(k).map(|p| p.id()).collect();
        trace!(round_size = selected.len(), shortlist_len = shortlist.len(), "discover round complete");
        if new_closest == prev_closest {
            break;
        }
    }

    Discovered::Peers(shortlist)
}
