use super::Generation;
use crate::octree::{NodePath, NodeSnapshot};
use futures::channel::mpsc::UnboundedSender;

/// Independent copy of a generation's node set.
#[derive(Clone, Debug)]
pub struct QuerySnapshot {
    pub generation: Generation,
    /// Nodes in the order they arrived.
    pub nodes: Vec<NodeSnapshot>,
    /// Nodes counted against the budget so far.
    pub node_count: usize,
    pub in_flight: usize,
    pub threshold: f64,
    pub completed: bool,
    pub interrupted: bool,
}

impl QuerySnapshot {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, NodeSnapshot> {
        self.nodes.iter()
    }

    pub fn paths(&self) -> impl Iterator<Item = &NodePath> + '_ {
        self.nodes.iter().map(|snapshot| &snapshot.path)
    }

    pub fn get(&self, path: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|snapshot| snapshot.path.as_str() == path)
    }

    pub fn total_points(&self) -> usize {
        self.nodes.iter().map(|snapshot| snapshot.node.num_points()).sum()
    }
}

impl<'a> IntoIterator for &'a QuerySnapshot {
    type Item = &'a NodeSnapshot;
    type IntoIter = std::slice::Iter<'a, NodeSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Receives the results of a running query.
pub trait QueryObserver {
    /// Partial result while requests are still in flight.
    fn on_progress(&mut self, snapshot: QuerySnapshot) {
        let _ = snapshot;
    }

    /// Final result of a generation, also sent when it was interrupted.
    fn on_complete(&mut self, snapshot: QuerySnapshot);
}

#[derive(Clone, Debug)]
pub enum QueryEvent {
    Progress(QuerySnapshot),
    Completed(QuerySnapshot),
}

impl QueryEvent {
    pub fn snapshot(&self) -> &QuerySnapshot {
        match self {
            QueryEvent::Progress(snapshot) | QueryEvent::Completed(snapshot) => snapshot,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, QueryEvent::Completed(_))
    }
}

impl QueryObserver for Vec<QueryEvent> {
    fn on_progress(&mut self, snapshot: QuerySnapshot) {
        self.push(QueryEvent::Progress(snapshot));
    }

    fn on_complete(&mut self, snapshot: QuerySnapshot) {
        self.push(QueryEvent::Completed(snapshot));
    }
}

/// Forwards events to another task, e.g. the render loop. A closed receiver is ignored.
impl QueryObserver for UnboundedSender<QueryEvent> {
    fn on_progress(&mut self, snapshot: QuerySnapshot) {
        let _ = self.unbounded_send(QueryEvent::Progress(snapshot));
    }

    fn on_complete(&mut self, snapshot: QuerySnapshot) {
        let _ = self.unbounded_send(QueryEvent::Completed(snapshot));
    }
}
