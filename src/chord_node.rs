use indexmap::IndexSet;

use crate::chord_error::{Error, Result};
use crate::chord_interface::{Identifier, NodeDescriptor};
use crate::chord_ring::IdentifierSpace;

/// A peer of the simulated ring.
///
/// A node is routable once both its finger table and its predecessor are set.
/// `successor` always equals the first finger.
#[derive(Debug, Clone)]
pub struct Node {
    id: Identifier,
    successor: Option<Identifier>,
    predecessor: Option<Identifier>,
    fingers: IndexSet<Identifier>,
    queries_received: usize,
}

impl Node {
    pub fn new(id: Identifier) -> Self {
        Self {
            id,
            successor: None,
            predecessor: None,
            fingers: IndexSet::new(),
            queries_received: 0,
        }
    }

    pub fn id(&self) -> &Identifier {
        &self.id
    }

    pub fn successor(&self) -> Option<&Identifier> {
        self.successor.as_ref()
    }

    pub fn predecessor(&self) -> Option<&Identifier> {
        self.predecessor.as_ref()
    }

    pub fn fingers(&self) -> &IndexSet<Identifier> {
        &self.fingers
    }

    pub fn is_routable(&self) -> bool {
        !self.fingers.is_empty() && self.predecessor.is_some()
    }

    /// Replace the finger table; the first finger becomes the successor.
    pub fn set_fingers(&mut self, fingers: IndexSet<Identifier>) -> Result<()> {
        let first = fingers.first().cloned().ok_or_else(|| {
            Error::InvariantViolation(format!("empty finger table for node {}", self.id))
        })?;

        self.fingers = fingers;
        self.successor = Some(first);
        self.predecessor = None;
        Ok(())
    }

    /// Set once per generation pass, after every successor is known.
    pub fn set_predecessor(&mut self, predecessor: Identifier) -> Result<()> {
        if let Some(existing) = &self.predecessor {
            return Err(Error::InvariantViolation(format!(
                "node {} claimed as successor by both {} and {}",
                self.id, existing, predecessor
            )));
        }
        self.predecessor = Some(predecessor);
        Ok(())
    }

    // Queries received

    pub fn queries_received(&self) -> usize {
        self.queries_received
    }

    pub fn record_query(&mut self) {
        self.queries_received += 1;
    }

    pub fn reset_queries(&mut self) {
        self.queries_received = 0;
    }

    pub fn descriptor(&self) -> Result<NodeDescriptor> {
        let (predecessor, successor) = self.routing_state()?;
        Ok(NodeDescriptor {
            id: self.id.clone(),
            predecessor: predecessor.clone(),
            successor: successor.clone(),
            fingers: self.fingers.iter().cloned().collect(),
        })
    }

    fn routing_state(&self) -> Result<(&Identifier, &Identifier)> {
        match (&self.predecessor, &self.successor) {
            (Some(predecessor), Some(successor)) if !self.fingers.is_empty() => {
                Ok((predecessor, successor))
            }
            _ => Err(Error::InvariantViolation(format!(
                "node {} routed through before its finger table was built",
                self.id
            ))),
        }
    }

    /// Next hop towards the holder of `target`.
    ///
    /// Returns this node when it is responsible for `target`, the successor
    /// when the successor is, otherwise the closest preceding finger.
    pub fn find_successor(
        &self,
        space: &IdentifierSpace,
        target: &Identifier,
    ) -> Result<Identifier> {
        let (predecessor, successor) = self.routing_state()?;

        if space.in_closed_right_interval(target, predecessor, &self.id) {
            // target in (predecessor, id]
            Ok(self.id.clone())
        } else if space.in_closed_right_interval(target, &self.id, successor) {
            // target in (id, successor]
            Ok(successor.clone())
        } else {
            self.closest_preceding_node(space, target)
        }
    }

    /// Highest finger strictly inside `(id, target)` on the ring, or this node
    /// when none qualifies.
    pub fn closest_preceding_node(
        &self,
        space: &IdentifierSpace,
        target: &Identifier,
    ) -> Result<Identifier> {
        self.routing_state()?;

        // (id, id) spans the whole ring; a query for our own id stays here
        if target == &self.id {
            return Ok(self.id.clone());
        }

        // in_open_interval unfolds both target and finger when the query crosses zero
        let closest = self
            .fingers
            .iter()
            .rev()
            .find(|finger| space.in_open_interval(finger, &self.id, target));

        Ok(closest.unwrap_or(&self.id).clone())
    }
}
