//! Concurrent finger-table construction.
//!
//! The ascending node list is cut into one contiguous block per worker. Each
//! worker only reads the shared [`RingIndex`] and only writes the nodes of its
//! own block, so no locking is needed. `build` returns once every block is
//! done; predecessors can only be assigned after that point.

use std::ops::Range;

use indexmap::IndexSet;
use log::debug;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::chord_error::{Error, Result};
use crate::chord_interface::FingerEdge;
use crate::chord_node::Node;
use crate::chord_ring::IdentifierSpace;
use crate::chord_topology::RingIndex;

/// Fixed-size worker pool building finger tables
pub struct FingerTableBuilder {
    workers: usize,
    pool: ThreadPool,
}

impl FingerTableBuilder {
    pub fn new(workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(Error::Configuration(
                "finger table builder needs at least one worker".to_string(),
            ));
        }

        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("finger-worker-{}", i))
            .build()?;

        Ok(Self { workers, pool })
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Split `len` items into exactly `workers` contiguous ranges of
    /// `len / workers` items; the last range takes the remainder.
    pub fn partition(len: usize, workers: usize) -> Vec<Range<usize>> {
        let workers = workers.max(1);
        let block = len / workers;

        (0..workers)
            .map(|w| {
                let start = w * block;
                let end = if w + 1 == workers { len } else { start + block };
                start..end
            })
            .collect()
    }

    /// Compute the finger table of every node in `nodes` (ascending id order).
    ///
    /// Returns one edge per unique finger, block by block in partition order.
    pub fn build(
        &self,
        space: &IdentifierSpace,
        index: &RingIndex,
        nodes: &mut [&mut Node],
    ) -> Result<Vec<FingerEdge>> {
        let ranges = Self::partition(nodes.len(), self.workers);

        let mut blocks: Vec<&mut [&mut Node]> = Vec::with_capacity(ranges.len());
        let mut rest = nodes;
        for range in &ranges {
            let (block, tail) = std::mem::take(&mut rest).split_at_mut(range.len());
            blocks.push(block);
            rest = tail;
        }

        let per_block: Vec<Vec<FingerEdge>> = self.pool.install(|| {
            blocks
                .into_par_iter()
                .enumerate()
                .map(|(worker, block)| {
                    debug!("worker {} building {} finger tables", worker, block.len());
                    build_block(space, index, block)
                })
                .collect::<Result<Vec<_>>>()
        })?;

        Ok(per_block.into_iter().flatten().collect())
    }
}

fn build_block(
    space: &IdentifierSpace,
    index: &RingIndex,
    block: &mut [&mut Node],
) -> Result<Vec<FingerEdge>> {
    let mut edges = Vec::new();

    for node in block.iter_mut() {
        // duplicates collapse, first occurrence keeps its position
        let mut fingers = IndexSet::new();

        for k in 0..space.bits() {
            let target = space.finger_target(node.id(), k);
            let finger = index.find_finger(&target)?;

            if fingers.insert(finger.clone()) {
                edges.push(FingerEdge {
                    source: node.id().clone(),
                    finger,
                });
            }
        }

        node.set_fingers(fingers)?;
    }

    Ok(edges)
}
