//! Centralised Chord simulation.
//!
//! The coordinator has the complete view of every peer: it creates the
//! network, builds the finger tables and runs every query. Routing itself
//! only uses each node's local state ([`Node::find_successor`]); the global
//! view is used to pick the authoritative holder of each key.
//!
//! A coordinator is owned by a single caller. `generate_network` and
//! `simulate` take `&mut self` and must not be called concurrently.

use log::{debug, info};
use num_bigint::BigUint;

use crate::chord_config::ChordConfig;
use crate::chord_error::{Error, Result};
use crate::chord_fingers::FingerTableBuilder;
use crate::chord_interface::{Event, EventSink, Identifier, NoOpSink, QueryRecord};
use crate::chord_node::Node;
use crate::chord_peer_id::{Blake3Digest, DigestProvider, PeerIdGenerator};
use crate::chord_ring::IdentifierSpace;
use crate::chord_stats::{Distribution, SimulationResult};
use crate::chord_topology::Topology;

/// Lifecycle of a coordinator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkState {
    /// No network generated yet, or the last generation failed
    Uninitialized,
    /// Finger tables and predecessors are in place
    NetworkReady,
    /// A simulation is running, or aborted; regenerate to recover
    Simulating,
}

pub struct ChordCoordinator<D: DigestProvider = Blake3Digest> {
    space: IdentifierSpace,
    seed: [u8; 32],
    generator: PeerIdGenerator<D>,
    topology: Topology,
    builder: FingerTableBuilder,
    event_sink: Box<dyn EventSink>,
    state: NetworkState,
}

impl ChordCoordinator<Blake3Digest> {
    /// Create a coordinator with default NoOpSink
    pub fn new(config: ChordConfig) -> Result<Self> {
        Self::new_with_sink(config, Box::new(NoOpSink))
    }

    /// Create a coordinator with a custom event sink for the run logs
    pub fn new_with_sink(config: ChordConfig, event_sink: Box<dyn EventSink>) -> Result<Self> {
        Self::with_digest(config, Blake3Digest, event_sink)
    }
}

impl<D: DigestProvider> ChordCoordinator<D> {
    pub fn with_digest(
        config: ChordConfig,
        digest: D,
        event_sink: Box<dyn EventSink>,
    ) -> Result<Self> {
        let space = IdentifierSpace::new(config.bits)?;
        let builder = FingerTableBuilder::new(config.workers)?;
        let seed = config.resolve_seed();

        Ok(Self {
            generator: PeerIdGenerator::new(&space, digest, seed),
            space,
            seed,
            topology: Topology::new(),
            builder,
            event_sink,
            state: NetworkState::Uninitialized,
        })
    }

    pub fn space(&self) -> &IdentifierSpace {
        &self.space
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn state(&self) -> NetworkState {
        self.state
    }

    /// Seed driving id and key generation
    pub fn seed(&self) -> [u8; 32] {
        self.seed
    }

    /// Generate a Chord-like network of `n` peers, replacing any previous one.
    pub fn generate_network(&mut self, n: usize, run_id: &str) -> Result<()> {
        if n == 0 {
            return Err(Error::Configuration(
                "peer count must be positive".to_string(),
            ));
        }
        if BigUint::from(n) > *self.space.modulus() {
            return Err(Error::Configuration(format!(
                "Too many nodes inserted: {} peers do not fit in {} bits",
                n,
                self.space.bits()
            )));
        }

        info!(
            "Generating Chord-like network with an identifiers space spanned by {} bits and involving {} peers",
            self.space.bits(),
            n
        );

        self.state = NetworkState::Uninitialized;
        self.topology.clear();
        self.event_sink.log(Event::GenerationStarted {
            run_id: run_id.to_string(),
            bits: self.space.bits(),
            peers: n,
        })?;

        info!("Creating nodes...");
        let mut collisions = 0usize;
        while self.topology.len() < n {
            let peer_id = self.generator.generate()?;
            if !self.topology.insert(Node::new(peer_id)) {
                collisions += 1;
            }
        }
        debug!("{} id collisions rejected", collisions);

        info!(
            "Creating fingers with {} workers...",
            self.builder.workers()
        );
        let edges = self.topology.build_fingers(&self.builder, &self.space)?;
        for edge in edges {
            self.event_sink.log(Event::FingerDiscovered(edge))?;
        }

        info!("Setting predecessor of each node");
        self.topology.assign_predecessors()?;

        for node in self.topology.nodes() {
            self.event_sink.log(Event::NodeDescribed(node.descriptor()?))?;
        }
        self.event_sink.log(Event::GenerationFinished {
            run_id: run_id.to_string(),
        })?;

        self.state = NetworkState::NetworkReady;
        Ok(())
    }

    /// Every peer queries `rounds` random keys; returns hop and load statistics.
    ///
    /// Query counters are zero again afterwards, so the same network can be
    /// simulated repeatedly.
    pub fn simulate(&mut self, run_id: &str, rounds: usize) -> Result<SimulationResult> {
        if self.state != NetworkState::NetworkReady {
            return Err(Error::NetworkNotInitialized);
        }
        if rounds == 0 {
            return Err(Error::Configuration(
                "queries per node must be positive".to_string(),
            ));
        }

        self.state = NetworkState::Simulating;
        self.event_sink.log(Event::SimulationStarted {
            run_id: run_id.to_string(),
            rounds,
        })?;

        let peers: Vec<Identifier> = self.topology.ids().cloned().collect();
        let mut total_hops = 0usize;
        let mut hop_distribution = Distribution::new();

        info!(
            "Starting simulation: {} peers x {} queries",
            peers.len(),
            rounds
        );
        for _ in 0..rounds {
            for peer in &peers {
                let query = self.run_query(peer)?;

                hop_distribution.record(query.hops);
                total_hops += query.hops;
                self.event_sink.log(Event::QueryResolved(query))?;
            }
        }

        let mut query_distribution = Distribution::new();
        for node in self.topology.nodes_mut() {
            query_distribution.record(node.queries_received());
            node.reset_queries();
        }

        self.event_sink.log(Event::SimulationFinished {
            run_id: run_id.to_string(),
        })?;

        let average_hops = total_hops as f64 / (peers.len() * rounds) as f64;
        info!("Average hops: {}", average_hops);

        self.state = NetworkState::NetworkReady;
        Ok(SimulationResult::new(
            average_hops,
            hop_distribution,
            query_distribution,
        ))
    }

    /// Resolve one random key from `peer`, walking the ring hop by hop.
    fn run_query(&mut self, peer: &Identifier) -> Result<QueryRecord> {
        let key = self.generator.generate()?;
        let holder = self.topology.find_finger(&key)?;
        self.topology.node_mut(&holder)?.record_query();

        let max_hops = self.topology.len();
        let mut current = peer.clone();
        let mut path = Vec::new();

        while current != holder {
            if path.len() >= max_hops {
                return Err(Error::InvariantViolation(format!(
                    "query for {} from {} did not reach {} within {} hops",
                    key, peer, holder, max_hops
                )));
            }

            current = self
                .topology
                .node(&current)?
                .find_successor(&self.space, &key)?;
            path.push(current.clone());
        }

        Ok(QueryRecord {
            peer: peer.clone(),
            key,
            holder,
            hops: path.len(),
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chord_config::OutputConfig;
    use crate::chord_error::ErrorKind;
    use crate::chord_peer_id::tests::ScriptedDigest;
    use crate::chord_sinks::tests::FailingSink;
    use crate::chord_sinks::{FileEventSink, MultiEventSink, RecordingSink};
    use std::collections::BTreeSet;

    fn config(bits: u32, seed: u8) -> ChordConfig {
        ChordConfig {
            bits,
            workers: 3,
            seed: Some([seed; 32]),
        }
    }

    fn check_ring(coordinator: &ChordCoordinator<impl DigestProvider>, n: usize) {
        let topology = coordinator.topology();
        assert_eq!(topology.len(), n);

        let ids: BTreeSet<Identifier> = topology.ids().cloned().collect();
        assert_eq!(ids.len(), n);

        for node in topology.nodes() {
            assert!(coordinator.space().contains(node.id()));
            let fingers: Vec<&Identifier> = node.fingers().iter().collect();
            assert!(!fingers.is_empty());
            assert!(fingers.len() <= coordinator.space().bits() as usize);
            assert_eq!(node.successor(), fingers.first().copied());

            let successor = topology.node(node.successor().unwrap()).unwrap();
            assert_eq!(successor.predecessor(), Some(node.id()));
        }

        // one cycle over every id
        let start = topology.ids().next().unwrap().clone();
        let mut seen = BTreeSet::new();
        let mut current = start.clone();
        loop {
            assert!(seen.insert(current.clone()));
            current = topology.node(&current).unwrap().successor().unwrap().clone();
            if current == start {
                break;
            }
        }
        assert_eq!(seen.len(), n);
    }

    #[test]
    fn test_simulate_before_generation_fails() {
        let mut coordinator = ChordCoordinator::new(config(8, 1)).unwrap();
        assert_eq!(coordinator.state(), NetworkState::Uninitialized);
        assert!(matches!(
            coordinator.simulate("x", 1),
            Err(Error::NetworkNotInitialized)
        ));
    }

    #[test]
    fn test_invalid_peer_counts() {
        let mut coordinator = ChordCoordinator::new(config(4, 1)).unwrap();
        assert!(matches!(
            coordinator.generate_network(0, "x"),
            Err(Error::Configuration(_))
        ));
        assert!(matches!(
            coordinator.generate_network(17, "x"),
            Err(Error::Configuration(_))
        ));
        assert_eq!(coordinator.state(), NetworkState::Uninitialized);
    }

    #[test]
    fn test_invalid_bits_and_workers() {
        assert!(ChordCoordinator::new(config(0, 1)).is_err());
        let no_workers = ChordConfig {
            workers: 0,
            ..config(8, 1)
        };
        assert!(ChordCoordinator::new(no_workers).is_err());
    }

    #[test]
    fn test_small_network_scenario() {
        let recorder = RecordingSink::new();
        let mut coordinator =
            ChordCoordinator::new_with_sink(config(8, 3), Box::new(recorder.clone())).unwrap();

        coordinator.generate_network(5, "8b_5n").unwrap();
        assert_eq!(coordinator.state(), NetworkState::NetworkReady);
        check_ring(&coordinator, 5);

        let described = recorder
            .events()
            .iter()
            .filter(|e| matches!(e, Event::NodeDescribed(_)))
            .count();
        assert_eq!(described, 5);

        recorder.clear();
        let result = coordinator.simulate("8b_5n", 1).unwrap();

        let queries: Vec<QueryRecord> = recorder
            .events()
            .into_iter()
            .filter_map(|e| match e {
                Event::QueryResolved(q) => Some(q),
                _ => None,
            })
            .collect();
        assert_eq!(queries.len(), 5);
        assert_eq!(result.total_queries(), 5);
        for query in &queries {
            assert_eq!(query.hops, query.path.len());
            assert_eq!(query.path.last().unwrap_or(&query.peer), &query.holder);
        }
    }

    #[test]
    fn test_full_ring() {
        // every id of a 4-bit ring is taken
        let mut coordinator = ChordCoordinator::new(config(4, 5)).unwrap();
        coordinator.generate_network(16, "full").unwrap();
        check_ring(&coordinator, 16);

        let result = coordinator.simulate("full", 2).unwrap();
        assert_eq!(result.total_queries(), 32);
    }

    #[test]
    fn test_single_node_ring() {
        let mut coordinator = ChordCoordinator::new(config(8, 9)).unwrap();
        coordinator.generate_network(1, "solo").unwrap();

        let node = coordinator.topology().nodes().next().unwrap();
        assert_eq!(node.successor(), Some(node.id()));
        assert_eq!(node.predecessor(), Some(node.id()));

        let result = coordinator.simulate("solo", 3).unwrap();
        assert_eq!(result.average_hops(), 0.0);
        assert_eq!(result.hop_distribution().get(0), 3);
        assert_eq!(result.query_distribution().get(3), 1);
    }

    #[test]
    fn test_statistics_are_consistent() {
        let n = 200;
        let rounds = 3;
        let mut coordinator = ChordCoordinator::new(config(32, 11)).unwrap();
        coordinator.generate_network(n, "stats").unwrap();
        check_ring(&coordinator, n);

        let result = coordinator.simulate("stats", rounds).unwrap();
        let hops = result.hop_distribution();
        let load = result.query_distribution();

        assert_eq!(hops.occurrences(), n * rounds);
        let average = hops.weighted_sum() as f64 / (n * rounds) as f64;
        assert!((average - result.average_hops()).abs() < 1e-9);

        assert_eq!(load.occurrences(), n);
        assert_eq!(load.weighted_sum(), n * rounds);

        for node in coordinator.topology().nodes() {
            assert_eq!(node.queries_received(), 0);
        }

        // O(log N): log2(200) is about 7.6
        assert!(result.average_hops() < 2.0 * (n as f64).log2());
        assert!(hops.max_value().unwrap() < n);
    }

    #[test]
    fn test_every_walk_reaches_holder() {
        let mut coordinator = ChordCoordinator::new(config(12, 21)).unwrap();
        coordinator.generate_network(64, "walk").unwrap();

        let space = coordinator.space().clone();
        let topology = coordinator.topology();
        let peers: Vec<Identifier> = topology.ids().cloned().collect();

        for peer in &peers {
            for key in (0u32..4096).step_by(97).map(Identifier::from) {
                let holder = topology.find_finger(&key).unwrap();
                let mut current = peer.clone();
                let mut hops = 0;
                while current != holder {
                    current = topology
                        .node(&current)
                        .unwrap()
                        .find_successor(&space, &key)
                        .unwrap();
                    hops += 1;
                    assert!(hops <= peers.len(), "walk from {} for {} loops", peer, key);
                }
            }
        }
    }

    #[test]
    fn test_repeated_simulation_on_same_network() {
        let mut coordinator = ChordCoordinator::new(config(16, 4)).unwrap();
        coordinator.generate_network(30, "again").unwrap();

        let first = coordinator.simulate("again", 2).unwrap();
        let second = coordinator.simulate("again", 1).unwrap();
        assert_eq!(first.total_queries(), 60);
        assert_eq!(second.total_queries(), 30);
        assert_eq!(second.query_distribution().weighted_sum(), 30);
        assert_eq!(coordinator.state(), NetworkState::NetworkReady);
    }

    #[test]
    fn test_regeneration_replaces_topology() {
        let mut coordinator = ChordCoordinator::new(config(16, 8)).unwrap();
        coordinator.generate_network(20, "a").unwrap();
        coordinator.generate_network(7, "b").unwrap();
        check_ring(&coordinator, 7);
    }

    #[test]
    fn test_same_seed_same_network() {
        let mut a = ChordCoordinator::new(config(24, 13)).unwrap();
        let mut b = ChordCoordinator::new(ChordConfig {
            workers: 1,
            ..config(24, 13)
        })
        .unwrap();
        a.generate_network(40, "a").unwrap();
        b.generate_network(40, "b").unwrap();

        let ids_a: Vec<Identifier> = a.topology().ids().cloned().collect();
        let ids_b: Vec<Identifier> = b.topology().ids().cloned().collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(a.seed(), b.seed());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        // 0x2a twice, then 0x07 and 0x33
        let digest = ScriptedDigest::new(&["ff2a", "002a", "0007", "1233"]);
        let recorder = RecordingSink::new();
        let mut coordinator =
            ChordCoordinator::with_digest(config(8, 0), digest, Box::new(recorder.clone()))
                .unwrap();

        coordinator.generate_network(3, "dup").unwrap();

        let ids: Vec<Identifier> = coordinator.topology().ids().cloned().collect();
        assert_eq!(
            ids,
            vec![
                Identifier::from(0x07u32),
                Identifier::from(0x2au32),
                Identifier::from(0x33u32)
            ]
        );
        check_ring(&coordinator, 3);
    }

    #[test]
    fn test_digest_failure_aborts_generation() {
        let digest = ScriptedDigest::new(&["01"]);
        let mut coordinator =
            ChordCoordinator::with_digest(config(8, 0), digest, Box::new(NoOpSink)).unwrap();

        let err = coordinator.generate_network(2, "fail").unwrap_err();
        assert!(matches!(err, Error::DigestUnavailable(_)));
        assert_eq!(coordinator.state(), NetworkState::Uninitialized);
        assert!(matches!(
            coordinator.simulate("fail", 1),
            Err(Error::NetworkNotInitialized)
        ));
    }

    #[test]
    fn test_finger_events_match_tables() {
        let recorder = RecordingSink::new();
        let mut coordinator =
            ChordCoordinator::new_with_sink(config(16, 6), Box::new(recorder.clone())).unwrap();
        coordinator.generate_network(25, "edges").unwrap();

        let edges = recorder
            .events()
            .iter()
            .filter(|e| matches!(e, Event::FingerDiscovered(_)))
            .count();
        let fingers: usize = coordinator
            .topology()
            .nodes()
            .map(|n| n.fingers().len())
            .sum();
        assert_eq!(edges, fingers);

        let events = recorder.events();
        assert!(matches!(events.first(), Some(Event::GenerationStarted { .. })));
        assert!(matches!(events.last(), Some(Event::GenerationFinished { .. })));
    }

    fn is_finger(event: &Event) -> bool {
        matches!(event, Event::FingerDiscovered(_))
    }

    fn is_query(event: &Event) -> bool {
        matches!(event, Event::QueryResolved(_))
    }

    #[test]
    fn test_sink_failure_aborts_generation() {
        let recorder = RecordingSink::new();
        let sink = FailingSink::new(recorder.clone(), is_finger, 3);
        let mut coordinator = ChordCoordinator::new_with_sink(config(8, 3), Box::new(sink)).unwrap();

        let err = coordinator.generate_network(5, "8b_5n").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert_eq!(coordinator.state(), NetworkState::Uninitialized);

        // start marker plus the two edges before the failure
        let events = recorder.events();
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], Event::GenerationStarted { .. }));
        assert_eq!(events.iter().filter(|e| is_finger(e)).count(), 2);

        assert!(matches!(
            coordinator.simulate("8b_5n", 1),
            Err(Error::NetworkNotInitialized)
        ));

        // the sink only fails once; a new generation recovers
        coordinator.generate_network(5, "8b_5n").unwrap();
        assert_eq!(coordinator.state(), NetworkState::NetworkReady);
        check_ring(&coordinator, 5);
    }

    #[test]
    fn test_sink_failure_aborts_simulation() {
        let recorder = RecordingSink::new();
        let sink = FailingSink::new(recorder.clone(), is_query, 3);
        let mut coordinator = ChordCoordinator::new_with_sink(config(8, 3), Box::new(sink)).unwrap();
        coordinator.generate_network(5, "8b_5n").unwrap();
        recorder.clear();

        let err = coordinator.simulate("8b_5n", 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
        assert_eq!(coordinator.state(), NetworkState::Simulating);

        let events = recorder.events();
        assert!(matches!(events[0], Event::SimulationStarted { .. }));
        assert_eq!(events.iter().filter(|e| is_query(e)).count(), 2);
        assert!(!events
            .iter()
            .any(|e| matches!(e, Event::SimulationFinished { .. })));

        // aborted runs need a fresh network
        assert!(matches!(
            coordinator.simulate("8b_5n", 1),
            Err(Error::NetworkNotInitialized)
        ));
        assert_eq!(coordinator.state(), NetworkState::Simulating);

        coordinator.generate_network(5, "8b_5n").unwrap();
        assert_eq!(coordinator.state(), NetworkState::NetworkReady);
        let result = coordinator.simulate("8b_5n", 1).unwrap();
        assert_eq!(result.total_queries(), 5);
        assert_eq!(coordinator.state(), NetworkState::NetworkReady);
    }

    #[test]
    fn test_aborted_simulation_keeps_flushed_records() {
        let dir = tempfile::TempDir::new().unwrap();
        let file_sink = FileEventSink::new(OutputConfig {
            log_dir: dir.path().join("log"),
            csv_dir: dir.path().join("csvLog"),
        });
        let queries_path = file_sink.queries_path("8b_5n", 1);

        let mut sinks = MultiEventSink::new();
        sinks.add_sink(Box::new(file_sink));
        sinks.add_sink(Box::new(FailingSink::new(RecordingSink::new(), is_query, 4)));

        let mut coordinator =
            ChordCoordinator::new_with_sink(config(8, 3), Box::new(sinks)).unwrap();
        coordinator.generate_network(5, "8b_5n").unwrap();
        assert!(coordinator.simulate("8b_5n", 1).is_err());

        // the file sink saw the failing record first, then the run stopped
        let queries = std::fs::read_to_string(queries_path).unwrap();
        assert_eq!(queries.lines().count(), 4);
        assert!(queries.lines().all(|line| line.starts_with("Peer\t")));
    }
}
