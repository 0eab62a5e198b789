//! # chord-sim - Centralised Chord DHT Simulation
//!
//! Builds a ring of peer identifiers, derives every peer's routing table
//! (fingers, successor, predecessor) from global knowledge of the ring, then
//! simulates lookups hop by hop to measure path length and load distribution.
//!
//! ## Core Components
//!
//! - **IdentifierSpace**: modular arithmetic and wraparound interval checks on `[0, 2^bits)`
//! - **PeerIdGenerator**: ring ids from hashed random seeds
//! - **Node**: finger table and the `find_successor` routing step
//! - **Topology**: ordered id -> node map with the "first id >= target" lookup
//! - **FingerTableBuilder**: finger tables computed on a fixed worker pool
//! - **ChordCoordinator**: network generation and query simulation
//!
//! ## Usage
//!
//! ```no_run
//! use chord_sim::{ChordConfig, ChordCoordinator};
//!
//! let mut chord = ChordCoordinator::new(ChordConfig::with_bits(32))?;
//! chord.generate_network(1000, "32b_1000n")?;
//!
//! let result = chord.simulate("32b_1000n", 1)?;
//! println!("average hops: {}", result.average_hops());
//! # Ok::<(), chord_sim::Error>(())
//! ```
//!
//! Run logs are produced by plugging a [`FileEventSink`] in with
//! [`ChordCoordinator::new_with_sink`].

// Ring routing
pub mod chord_interface;
pub mod chord_node;
pub mod chord_peer_id;
pub mod chord_ring;
pub mod chord_topology;

// Orchestration
pub mod chord_coordinator;
pub mod chord_fingers;
pub mod chord_stats;

// Ambient
pub mod chord_config;
pub mod chord_error;
pub mod chord_sinks;

// Re-export commonly used types
pub use chord_config::{parse_seed_hex, run_id, ChordConfig, OutputConfig};
pub use chord_coordinator::{ChordCoordinator, NetworkState};
pub use chord_error::{Error, ErrorKind, Result};
pub use chord_interface::{
    Event, EventSink, FingerEdge, Identifier, NodeDescriptor, NoOpSink, QueryRecord,
};
pub use chord_peer_id::{Blake3Digest, DigestProvider};
pub use chord_ring::IdentifierSpace;
pub use chord_sinks::{ConsoleEventSink, FileEventSink, MultiEventSink, RecordingSink};
pub use chord_stats::{Distribution, SimulationResult};
