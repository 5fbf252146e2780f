//! Whole-network scenarios, run against small in-process swarms wired up
//! through [`boreas::sim::Central`].
//!
//! The large randomized put/get scenario runs a smaller swarm and fewer
//! rounds than a production soak test would, to keep one `cargo test`
//! invocation of this file in the same ballpark as the rest of the suite;
//! the property under test (every node agrees on every value) does not
//! depend on the network being any particular size.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, Once};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use boreas::config::Config;
use boreas::dht::Dht;
use boreas::id::Id;
use boreas::node::Node;
use boreas::routing::Table;
use boreas::sim::Central;

static TRACING: Once = Once::new();

/// Installs a filtered subscriber for the duration of the test binary.
/// Silent unless `RUST_LOG` is set, and only ever installed once since
/// every test in the binary calls this.
fn init_tracing() {
    TRACING.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}

fn swarm(count: usize, config: Config) -> (Arc<Central>, Vec<Arc<Node>>) {
    init_tracing();
    let central = Central::new();
    let mut nodes = Vec::with_capacity(count);
    for i in 0..count {
        let node = Node::with_config(&format!("swarm-{i}"), config.clone());
        central.register(node.clone());
        nodes.push(node);
    }
    (central, nodes)
}

#[test]
fn five_node_network_put_on_one_get_on_all() {
    let config = Config::builder().k(5).alpha(3);
    let (_central, nodes) = swarm(5, config);

    let dht0 = Dht::new(&nodes[0], "data");
    dht0.put("hello", b"world".to_vec()).unwrap();

    for node in &nodes {
        let dht = Dht::new(node, "data");
        assert_eq!(dht.get("hello").unwrap(), b"world".to_vec());
    }
}

#[test]
fn randomized_puts_agree_across_the_whole_network() {
    let config = Config::default();
    let (_central, nodes) = swarm(60, config);
    let mut rng = StdRng::seed_from_u64(0xDEC0DE);

    for round in 0..60 {
        let source = &nodes[rng.gen_range(0..nodes.len())];
        let key = format!("key{round}");
        let value = format!("value{round}").into_bytes();

        Dht::new(source, "data").put(&key, value.clone()).unwrap();

        for node in &nodes {
            assert_eq!(Dht::new(node, "data").get(&key).unwrap(), value);
        }
    }
}

#[test]
fn re_put_is_last_writer_wins_at_the_primary() {
    let config = Config::default();
    let (_central, nodes) = swarm(50, config);
    let writer = &nodes[0];

    let dht = Dht::new(writer, "data");
    dht.put("k", b"v1".to_vec()).unwrap();
    dht.put("k", b"v2".to_vec()).unwrap();

    for node in &nodes {
        assert_eq!(Dht::new(node, "data").get("k").unwrap(), b"v2".to_vec());
    }
}

#[test]
fn bucket_occupancy_equals_distinct_peers_seen() {
    init_tracing();
    let config = Config::default();
    let central = Central::new();

    // Observers are wired in before each node joins the swarm, so they
    // record every peer id ever offered to that node's routing table,
    // independently of what the table itself ends up retaining.
    let mut nodes = Vec::with_capacity(10);
    let mut observed: Vec<Arc<Mutex<HashSet<Id>>>> = Vec::with_capacity(10);
    for i in 0..10 {
        let node = Node::with_config(&format!("swarm-{i}"), config.clone());
        let seen = Arc::new(Mutex::new(HashSet::new()));
        let seen_for_observer = seen.clone();
        node.table().set_observer(move |id| {
            seen_for_observer.lock().unwrap().insert(id);
        });
        central.register(node.clone());
        nodes.push(node);
        observed.push(seen);
    }

    for (node, seen) in nodes.iter().zip(observed.iter()) {
        let table = node.table();
        let total: usize = (0..boreas::id::ID_BITS).map(|i| table.bucket_len(i)).sum();
        let distinct_seen = seen.lock().unwrap().len();
        assert_eq!(
            total,
            distinct_seen,
            "bucket occupancy should equal the distinct peers this node was ever offered"
        );

        let closest = table.closest_to(&node.id(), -1, &node.handle());
        let mut ids = HashSet::new();
        for peer in &closest {
            if peer.id() != node.id() {
                assert!(ids.insert(peer.id()), "duplicate peer across buckets");
            }
        }
    }
}

#[test]
fn primary_plus_reference_replication_counts() {
    let config = Config::builder().k(5).use_references(true);
    let (central, nodes) = swarm(60, config);

    let dht = Dht::new(&nodes[0], "data");
    dht.put("k", b"v".to_vec()).unwrap();

    let namespace = Id::hash(b"data");
    let key_hash = Id::hash(b"k");

    // `Central` (Id::ZERO) is an ordinary routable contact every node
    // retains from bootstrap, so it can occupy one of the k=5 shortlist
    // slots exactly like any other peer; tally its share alongside the
    // regular swarm rather than assuming the primary/references land
    // entirely among `nodes`.
    let owners = nodes.iter().filter(|n| n.storage().owns(&namespace, &key_hash)).count()
        + usize::from(central.storage().owns(&namespace, &key_hash));
    let references = nodes.iter().filter(|n| n.storage().references(&namespace, &key_hash)).count()
        + usize::from(central.storage().references(&namespace, &key_hash));

    assert_eq!(owners, 1);
    assert_eq!(references, 4);
}

#[test]
fn unresponsive_bucket_head_is_evicted_on_challenge() {
    // Built directly against a `Table` rather than a bootstrapped swarm, so
    // the three contacts that land in the same bucket can be picked
    // deterministically instead of hoping a 20-node network happens to
    // cluster three peers together in the same bucket.
    let owner_id = Id::ZERO;
    let table = Table::new(owner_id, 2);
    let root = Node::new("root-pinger");

    let mut by_bucket: HashMap<usize, Vec<Arc<Node>>> = HashMap::new();
    for i in 0..500 {
        let node = Node::new(&format!("bucket-probe-{i}"));
        if let Some(index) = owner_id.bucket_index(&node.id()) {
            by_bucket.entry(index).or_default().push(node);
        }
    }
    // Pigeonhole: 500 candidates across 160 buckets guarantees some bucket
    // holds at least ⌈500/160⌉ = 4 of them, regardless of hash behaviour.
    let (_, candidates) = by_bucket
        .into_iter()
        .max_by_key(|(_, peers)| peers.len())
        .expect("at least one bucket is populated");
    assert!(candidates.len() >= 3);

    let first = candidates[0].clone();
    let second = candidates[1].clone();
    let third = candidates[2].clone();
    first.set_responsive(false);

    table.add_contact(first.handle(), &root.handle());
    table.add_contact(second.handle(), &root.handle());
    assert_eq!(table.len(), 2);

    table.add_contact(third.handle(), &root.handle());
    assert_eq!(table.len(), 2);

    let remaining: HashSet<Id> =
        table.closest_to(&owner_id, -1, &root.handle()).into_iter().map(|p| p.id()).collect();
    assert!(remaining.contains(&second.id()));
    assert!(remaining.contains(&third.id()));
    assert!(!remaining.contains(&first.id()));
}
