//! Per-node network constants, built through a fluent builder.
//!
//! One struct holding the constants, one method per knob on a builder that
//! consumes and returns `Self` so call sites read as a sequence of named
//! overrides over the defaults.

use std::cmp;
use std::time::Duration;

/// Network constants shared by a node's routing table, `discover` and the
/// DHT façade. Constructed once per node and never mutated afterwards.
#[derive(Clone, Debug)]
pub struct Config {
    /// Bucket capacity and shortlist width ("k" in the Kademlia literature).
    pub k: usize,
    /// Parallel-query width for `discover` ("alpha").
    pub alpha: usize,
    /// `true`: primary-plus-reference storage. `false`: full k-fold
    /// replication of the value to every member of the shortlist.
    pub use_references: bool,
    /// Per-RPC deadline; a `discover` round is abandoned once it elapses.
    pub rpc_timeout: Duration,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            k: 5,
            alpha: 3,
            use_references: true,
            rpc_timeout: Duration::from_secs(5),
        }
    }
}

impl Config {
    /// Starts building a configuration from the defaults.
    pub fn builder() -> Config {
        Config::default()
    }

    /// Bucket size and shortlist width.
    pub fn k(mut self, k: usize) -> Self {
        self.k = cmp::max(k, 1);
        self
    }

    /// Parallel-query width for `discover`. Clamped to at least 1, since a
    /// lookup that can select zero peers per round would never progress.
    pub fn alpha(mut self, alpha: usize) -> Self {
        self.alpha = cmp::max(alpha, 1);
        self
    }

    /// Switches between primary-plus-reference storage and full k-fold
    /// replication.
    pub fn use_references(mut self, use_references: bool) -> Self {
        self.use_references = use_references;
        self
    }

    /// Per-RPC deadline.
    pub fn rpc_timeout(mut self, rpc_timeout: Duration) -> Self {
        self.rpc_timeout = rpc_timeout;
        self
    }
}
