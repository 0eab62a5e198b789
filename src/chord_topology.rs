use std::collections::btree_map::{Values, ValuesMut};
use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::chord_error::{Error, Result};
use crate::chord_fingers::FingerTableBuilder;
use crate::chord_interface::{FingerEdge, Identifier};
use crate::chord_node::Node;
use crate::chord_ring::IdentifierSpace;

/// Ascending set of every peer id on the ring.
///
/// Read-only while finger tables are built, so workers may share it.
#[derive(Debug, Default, Clone)]
pub struct RingIndex {
    ids: BTreeSet<Identifier>,
}

impl RingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, id: Identifier) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.ids.iter()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// First id `>= target`, wrapping to the smallest id.
    pub fn find_finger(&self, target: &Identifier) -> Result<Identifier> {
        self.ids
            .range(target..)
            .next()
            .or_else(|| self.ids.first())
            .cloned()
            .ok_or_else(|| Error::InvariantViolation(format!("No finger found for {}", target)))
    }
}

/// All nodes of the ring, keyed and ordered by identifier
#[derive(Debug, Default)]
pub struct Topology {
    index: RingIndex,
    nodes: BTreeMap<Identifier, Node>,
}

impl Topology {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a node; false (and no change) when its id is taken.
    pub fn insert(&mut self, node: Node) -> bool {
        if !self.index.insert(node.id().clone()) {
            return false;
        }
        self.nodes.insert(node.id().clone(), node);
        true
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.nodes.clear();
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &Identifier) -> bool {
        self.index.contains(id)
    }

    pub fn index(&self) -> &RingIndex {
        &self.index
    }

    /// Ids in ascending order
    pub fn ids(&self) -> impl Iterator<Item = &Identifier> {
        self.index.iter()
    }

    /// Nodes in ascending id order
    pub fn nodes(&self) -> Values<'_, Identifier, Node> {
        self.nodes.values()
    }

    pub fn nodes_mut(&mut self) -> ValuesMut<'_, Identifier, Node> {
        self.nodes.values_mut()
    }

    pub fn node(&self, id: &Identifier) -> Result<&Node> {
        self.nodes
            .get(id)
            .ok_or_else(|| Error::InvariantViolation(format!("unknown node {}", id)))
    }

    pub fn node_mut(&mut self, id: &Identifier) -> Result<&mut Node> {
        self.nodes
            .get_mut(id)
            .ok_or_else(|| Error::InvariantViolation(format!("unknown node {}", id)))
    }

    /// Holder of `target`: first id `>= target`, else the smallest id.
    pub fn find_finger(&self, target: &Identifier) -> Result<Identifier> {
        self.index.find_finger(target)
    }

    /// Build every finger table with `builder`.
    pub fn build_fingers(
        &mut self,
        builder: &FingerTableBuilder,
        space: &IdentifierSpace,
    ) -> Result<Vec<FingerEdge>> {
        let index = &self.index;
        let mut nodes: Vec<&mut Node> = self.nodes.values_mut().collect();
        builder.build(space, index, &mut nodes)
    }

    /// Each node becomes the predecessor of its successor, then the ring is
    /// verified.
    pub fn assign_predecessors(&mut self) -> Result<()> {
        let links: Vec<(Identifier, Identifier)> = self
            .nodes
            .values()
            .map(|node| {
                node.successor()
                    .cloned()
                    .map(|successor| (node.id().clone(), successor))
                    .ok_or_else(|| {
                        Error::InvariantViolation(format!(
                            "node {} has no successor",
                            node.id()
                        ))
                    })
            })
            .collect::<Result<_>>()?;

        for (id, successor) in links {
            self.node_mut(&successor)?.set_predecessor(id)?;
        }

        self.verify_ring()
    }

    /// Successors must form one cycle over every id, with
    /// `predecessor(successor(v)) == v`.
    pub fn verify_ring(&self) -> Result<()> {
        let start = match self.index.iter().next() {
            Some(start) => start,
            None => return Ok(()),
        };

        let mut current = start;
        for step in 1..=self.len() {
            let node = self.node(current)?;
            let successor = node.successor().ok_or_else(|| {
                Error::InvariantViolation(format!("node {} has no successor", current))
            })?;

            let back = self.node(successor)?.predecessor();
            if back != Some(current) {
                return Err(Error::InvariantViolation(format!(
                    "successor {} of {} points back to {:?}",
                    successor, current, back
                )));
            }

            if successor == start && step != self.len() {
                return Err(Error::InvariantViolation(format!(
                    "successor cycle closes after {} of {} nodes",
                    step,
                    self.len()
                )));
            }
            current = successor;
        }

        if current != start {
            return Err(Error::InvariantViolation(format!(
                "successor walk from {} did not return after {} steps",
                start,
                self.len()
            )));
        }

        debug!("ring verified over {} nodes", self.len());
        Ok(())
    }
}
