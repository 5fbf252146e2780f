//! Kademlia routing table: `ID_BITS` k-buckets, LRU-with-liveness-check
//! insertion, and a "bounce" `closest_to` query that expands outward from
//! the target bucket.
//!
//! One independently-lockable bucket per index, a `VecDeque` ordered
//! head-to-tail by recency. A full bucket PINGs its head before evicting it
//! rather than evicting unconditionally, so a live long-lived node is never
//! dropped in favour of one just seen for the first time.


use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use tracing::{debug, trace};

use crate::id::{Id, ID_BITS};
use crate::peer::PeerHandle;

/// A node's routing table: `ID_BITS` k-buckets keyed by XOR-distance prefix
/// length from `self_id`. Each bucket is its own mutex so that mutation of
/// one region of the keyspace never blocks another.
pub struct Table {
    self_id: Id,
    k: usize,
    buckets: Vec<Mutex<VecDeque<PeerHandle>>>,
    observer: Mutex<Option<Box<dyn Fn(Id) + Send + Sync>>>,
}

impl Table {
    /// An empty table for `self_id`, with bucket capacity `k`.
    pub fn new(self_id: Id, k: usize) -> Table {
        let buckets = (0..ID_BITS)
            .map(|_| Mutex::new(VecDeque::with_capacity(k)))
            .collect();
        Table { self_id, k, buckets, observer: Mutex::new(None) }
    }

    /// Installs a callback invoked with the id of every peer offered to
    /// `add_contact`, whether or not it is ultimately retained. Used by
    /// tests to track distinct peers seen independently of the table's own
    /// bookkeeping; has no effect on routing behaviour.
    pub fn set_observer(&self, f: impl Fn(Id) + Send + Sync + 'static) {
        *self.observer.lock().unwrap() = Some(Box::new(f));
    }

    /// Places `peer` into its target bucket. `pinger` is the handle this
    /// node uses to challenge a bucket's head when the bucket is full —
    /// issued outside the bucket's lock so a peer that pings back into this
    /// same table cannot self-deadlock.
    pub fn add_contact(&self, peer: PeerHandle, pinger: &PeerHandle) {
        let index = match self.self_id.bucket_index(&peer.id()) {
            Some(index) => index,
            None => return, // peer is self
        };

        if let Some(f) = self.observer.lock().unwrap().as_ref() {
            f(peer.id());
        }

        let challenge = {
            let mut entries = self.buckets[index].lock().unwrap();
            if let Some(pos) = entries.iter().position(|p| p.id() == peer.id()) {
                entries.remove(pos);
                entries.push_back(peer);
                trace!(bucket = index, "refreshed existing contact");
                return;
            }
            if entries.len() < self.k {
                entries.push_back(peer);
                trace!(bucket = index, "appended new contact");
                return;
            }
            entries.front().cloned()
        };

        // Bucket is full: challenge the head outside the lock.
        let head = match challenge {
            Some(head) => head,
            None => return, // k == 0; nothing to evict
        };

        if head.ping(pinger.clone()) {
            let mut entries = self.buckets[index].lock().unwrap();
            if let Some(pos) = entries.iter().position(|p| p.id() == head.id()) {
                entries.remove(pos);
                entries.push_back(head);
            }
            debug!(bucket = index, peer = %peer.id(), "bucket full, head alive, dropping contact");
        } else {
            let mut entries = self.buckets[index].lock().unwrap();
            entries.retain(|p| p.id() != head.id());
            entries.push_back(peer);
            debug!(bucket = index, evicted = %head.id(), "bucket full, head unresponsive, evicted");
        }
    }

    /// Drops a peer from its bucket outright, used by the eviction policy
    /// and by bookkeeping on repeated RPC failure.
    pub fn remove(&self, peer_id: &Id) {
        if let Some(index) = self.self_id.bucket_index(peer_id) {
            self.buckets[index].lock().unwrap().retain(|p| p.id() != *peer_id);
        }
    }

    /// The `limit` peers known to this node closest (by XOR distance) to
    /// `target`, in ascending distance order. `self_handle` is included as
    /// a candidate. A negative `limit` returns every known peer.
    pub fn closest_to(&self, target: &Id, limit: i64, self_handle: &PeerHandle) -> Vec<PeerHandle> {
        let mut candidates = vec![self_handle.clone()];
        let n = self.buckets.len();
        let sufficient = |count: usize| limit >= 0 && count as i64 >= limit;

        match self.self_id.bucket_index(target) {
            Some(j) => {
                self.collect_bucket(j, &mut candidates);
                let mut offset = 1usize;
                while !sufficient(candidates.len()) && (offset <= j || j + offset < n) {
                    if offset <= j {
                        self.collect_bucket(j - offset, &mut candidates);
                    }
                    if !sufficient(candidates.len()) && j + offset < n {
                        self.collect_bucket(j + offset, &mut candidates);
                    }
                    offset += 1;
                }
            }
            None => {
                // target is this table's own owner: no single starting
                // bucket to expand from, so scan everything.
                for i in 0..n {
                    self.collect_bucket(i, &mut candidates);
                }
            }
        }

        let mut seen = HashSet::new();
        candidates.retain(|p| seen.insert(p.id()));
        candidates.sort_by_key(|p| Id::distance(target, &p.id()));
        if limit >= 0 {
            candidates.truncate(limit as usize);
        }
        candidates
    }

    fn collect_bucket(&self, index: usize, out: &mut Vec<PeerHandle>) {
        let entries = self.buckets[index].lock().unwrap();
        out.extend(entries.iter().cloned());
    }

    /// Total number of distinct peers held across every bucket.
    pub fn len(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().unwrap().len()).sum()
    }

    /// Whether this table holds no peers at all.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Occupancy of a single bucket, for invariant checks in tests.
    pub fn bucket_len(&self, index: usize) -> usize {
        self.buckets[index].lock().unwrap().len()
    }
}
