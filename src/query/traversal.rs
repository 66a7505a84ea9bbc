use super::{Generation, QuerySnapshot, TriggerReason};
use crate::frustum::{Classification, FrustumPlanes};
use crate::octree::{Node, NodePath, NodeSnapshot, SpatialRegion};
use glam::DMat4;
use std::collections::HashMap;
use std::sync::Arc;

/// A node the traversal wants, before it is known whether it is cached.
#[derive(Clone, Debug)]
pub(crate) struct NodeRequest {
    pub path: NodePath,
    pub region: SpatialRegion,
    pub parent: Option<NodePath>,
    pub classification: Classification,
    pub override_color: Option<[u8; 3]>,
}

impl NodeRequest {
    pub fn arrived(self, node: Arc<Node>) -> QueuedNode {
        QueuedNode {
            node,
            parent: self.parent,
            classification: self.classification,
            override_color: self.override_color,
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct QueuedNode {
    pub node: Arc<Node>,
    pub parent: Option<NodePath>,
    pub classification: Classification,
    pub override_color: Option<[u8; 3]>,
}

/// Per-node state owned by one generation, never written to the shared node.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct TraversalState {
    pub placeholder_octants: u8,
    pub processed: bool,
}

/// Result of a finished or replaced generation, input of the next adaptation.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PassOutcome {
    pub node_count: usize,
    pub ran_to_completion: bool,
}

/// Everything one generation owns.
#[derive(Debug)]
pub(crate) struct Pass {
    pub generation: Generation,
    pub reason: TriggerReason,
    pub view: DMat4,
    pub frustum: FrustumPlanes,
    pub threshold: f64,
    /// Append-only: nodes in arrival order, consumed through `cursor`.
    pub queue: Vec<QueuedNode>,
    pub cursor: usize,
    pub node_count: usize,
    pub in_flight: usize,
    pub side_table: HashMap<NodePath, TraversalState>,
    pub interrupted: bool,
    pub completed: bool,
}

impl Pass {
    pub fn new(
        generation: Generation,
        reason: TriggerReason,
        view: DMat4,
        frustum: FrustumPlanes,
        threshold: f64,
    ) -> Self {
        Self {
            generation,
            reason,
            view,
            frustum,
            threshold,
            queue: Vec::new(),
            cursor: 0,
            node_count: 0,
            in_flight: 0,
            side_table: HashMap::new(),
            interrupted: false,
            completed: false,
        }
    }

    pub fn enqueue(&mut self, queued: QueuedNode) {
        self.side_table.insert(
            queued.node.path().clone(),
            TraversalState {
                placeholder_octants: queued.node.children_mask(),
                processed: false,
            },
        );
        self.queue.push(queued);
    }

    /// Next node to process, unless the generation was aborted.
    pub fn next_queued(&mut self) -> Option<QueuedNode> {
        if self.interrupted {
            return None;
        }
        let queued = self.queue.get(self.cursor)?.clone();
        self.cursor += 1;
        Some(queued)
    }

    pub fn has_queued(&self) -> bool {
        !self.interrupted && self.cursor < self.queue.len()
    }

    pub fn mark_processed(&mut self, path: &NodePath) {
        if let Some(state) = self.side_table.get_mut(path) {
            state.processed = true;
        }
    }

    /// Stop drawing `path`'s own points for `octant`.
    pub fn hide_placeholder(&mut self, path: &NodePath, octant: u8) {
        if let Some(state) = self.side_table.get_mut(path) {
            state.placeholder_octants &= !(1 << octant);
        }
    }

    pub fn outcome(&self) -> PassOutcome {
        PassOutcome {
            node_count: self.node_count,
            ran_to_completion: self.completed && !self.interrupted,
        }
    }

    pub fn snapshot(&self) -> QuerySnapshot {
        let nodes = self
            .queue
            .iter()
            .map(|queued| {
                let path = queued.node.path();
                let state = self.side_table.get(path).copied().unwrap_or_default();
                NodeSnapshot {
                    path: path.clone(),
                    region: *queued.node.region(),
                    node: Arc::clone(&queued.node),
                    classification: queued.classification,
                    placeholder_octants: state.placeholder_octants,
                    override_color: queued.override_color,
                    processed: state.processed,
                }
            })
            .collect();

        QuerySnapshot {
            generation: self.generation,
            nodes,
            node_count: self.node_count,
            in_flight: self.in_flight,
            threshold: self.threshold,
            completed: self.completed,
            interrupted: self.interrupted,
        }
    }
}
