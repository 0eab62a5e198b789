use num_bigint::BigUint;

use crate::chord_error::Result;

/// Position on the identifier ring, in `[0, 2^bits)`
pub type Identifier = BigUint;

/// Number of routing steps taken by one query
pub type HopCount = usize;

/// Upper bound for ring width, the width of a SHA-1 style digest
pub const MAX_BITS: u32 = 160;

/// Number of finger-table workers when none is configured
pub const DEFAULT_WORKERS: usize = 4;

/// Directed edge `source -> finger`, one per unique finger discovered
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerEdge {
    pub source: Identifier,
    pub finger: Identifier,
}

/// Snapshot of a node's routing state, written to the topology log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeDescriptor {
    pub id: Identifier,
    pub predecessor: Identifier,
    pub successor: Identifier,
    pub fingers: Vec<Identifier>,
}

/// Outcome of one simulated lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRecord {
    /// Peer issuing the query
    pub peer: Identifier,
    pub key: Identifier,
    /// Node responsible for `key`
    pub holder: Identifier,
    /// Every node visited after `peer`, in order; ends with `holder`
    pub path: Vec<Identifier>,
    pub hops: HopCount,
}

/// Render ids as `[a, b, c]`
pub fn format_ids(ids: &[Identifier]) -> String {
    let parts: Vec<String> = ids.iter().map(|id| id.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

// ============================================================================
// Event Logging System
// ============================================================================

/// Events emitted by the coordinator for the topology, export and query logs
#[derive(Debug, Clone)]
pub enum Event {
    /// A new network is about to be built
    GenerationStarted {
        run_id: String,
        bits: u32,
        peers: usize,
    },
    /// Unique finger added to a node's table
    FingerDiscovered(FingerEdge),
    /// Final routing state of one node
    NodeDescribed(NodeDescriptor),
    GenerationFinished {
        run_id: String,
    },
    SimulationStarted {
        run_id: String,
        rounds: usize,
    },
    /// One query walked to its holder
    QueryResolved(QueryRecord),
    SimulationFinished {
        run_id: String,
    },
}

/// Trait for consuming events from the coordinator
///
/// A failing sink aborts the current run; records already written stay in place.
pub trait EventSink {
    fn log(&mut self, event: Event) -> Result<()>;
}

/// No-op event sink
pub struct NoOpSink;

impl EventSink for NoOpSink {
    #[inline(always)]
    fn log(&mut self, _event: Event) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_ids() {
        let ids = vec![
            Identifier::from(3u32),
            Identifier::from(17u32),
            Identifier::from(250u32),
        ];
        assert_eq!(format_ids(&ids), "[3, 17, 250]");
        assert_eq!(format_ids(&[]), "[]");
    }
}
