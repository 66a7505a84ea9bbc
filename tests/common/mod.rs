#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::oneshot;
use glam::{DMat4, DVec3};
use octree_stream::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Node source backed by an explicit set of nodes.
#[derive(Default)]
pub struct MemoryTree {
    nodes: HashMap<String, (u8, Vec<PointRecord>)>,
    failing: HashSet<String>,
    corrupt: HashSet<String>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, path: &str, children_mask: u8) -> Self {
        let record = PointRecord {
            position: [128, 128, 128],
            color: [10, 20, 30],
        };
        self.nodes
            .insert(path.to_string(), (children_mask, vec![record]));
        self
    }

    pub fn failing(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    /// Serve `path` as a payload whose length is not a whole number of records.
    pub fn corrupt(mut self, path: &str) -> Self {
        self.corrupt.insert(path.to_string());
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl NodeSource for MemoryTree {
    async fn load_node(
        &self,
        path: &NodePath,
        region: &SpatialRegion,
    ) -> Result<Node, LoadNodeError> {
        self.requests.lock().unwrap().push(path.to_string());

        if self.failing.contains(path.as_str()) {
            return Err(ResourceError::Status(500).into());
        }
        if self.corrupt.contains(path.as_str()) {
            return Ok(Node::decode(path.clone(), *region, &[0b1, 1, 2, 3])?);
        }
        match self.nodes.get(path.as_str()) {
            Some((mask, points)) => Ok(Node::new(path.clone(), *region, *mask, points.clone())),
            None => Err(ResourceError::NotFound(path.to_string()).into()),
        }
    }
}

/// Procedural height-field tree: every node above `depth` has the four children on
/// the low Z side, so the data is a flat surface at the bottom of the root cube.
pub struct Surface {
    pub depth: usize,
    requests: AtomicUsize,
}

impl Surface {
    pub const MASK: u8 = 0b0101_0101;

    pub fn new(depth: usize) -> Self {
        Self {
            depth,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl NodeSource for Surface {
    async fn load_node(
        &self,
        path: &NodePath,
        region: &SpatialRegion,
    ) -> Result<Node, LoadNodeError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let mask = if (region.level() as usize) < self.depth {
            Self::MASK
        } else {
            0
        };
        Ok(Node::new(path.clone(), *region, mask, Vec::new()))
    }
}

/// Wraps a source so requests stay pending until the gate is opened.
pub struct Gated<S> {
    inner: S,
    closed: AtomicBool,
    waiting: Mutex<Vec<(String, oneshot::Sender<()>)>>,
}

impl<S> Gated<S> {
    pub fn closed(inner: S) -> Self {
        Self {
            inner,
            closed: AtomicBool::new(true),
            waiting: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    /// Open the gate for later requests and release the waiting ones. Returns how
    /// many waiting requests were still alive to receive the release.
    pub fn open(&self) -> usize {
        self.closed.store(false, Ordering::SeqCst);
        let waiting = std::mem::take(&mut *self.waiting.lock().unwrap());
        waiting
            .into_iter()
            .filter(|(_, release)| !release.is_canceled())
            .map(|(_, release)| release.send(()))
            .filter(Result::is_ok)
            .count()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    /// Paths of the requests held at the gate, sorted.
    pub fn waiting(&self) -> Vec<String> {
        let mut paths: Vec<_> = self
            .waiting
            .lock()
            .unwrap()
            .iter()
            .map(|(path, _)| path.clone())
            .collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl<S: NodeSource> NodeSource for Gated<S> {
    async fn load_node(
        &self,
        path: &NodePath,
        region: &SpatialRegion,
    ) -> Result<Node, LoadNodeError> {
        if self.closed.load(Ordering::SeqCst) {
            let (release, wait) = oneshot::channel();
            self.waiting
                .lock()
                .unwrap()
                .push((path.to_string(), release));
            if wait.await.is_err() {
                return Err(ResourceError::Other("gate dropped".to_string()).into());
            }
        }
        self.inner.load_node(path, region).await
    }
}

pub fn root_region() -> SpatialRegion {
    SpatialRegion::cube(DVec3::ZERO, 16.0).unwrap()
}

pub fn tree(name: &str) -> TreeInfo {
    TreeInfo::new(name, root_region())
}

/// Camera looking straight at the root cube from 40 units away; the whole cube
/// is inside the frustum.
pub fn front_view(resolution: f64, trees: Vec<TreeInfo>) -> FrustumQuery {
    FrustumQuery {
        projection: DMat4::perspective_rh_gl(60f64.to_radians(), 1.0, 0.1, 1000.0),
        view: DMat4::look_at_rh(DVec3::new(0.0, 0.0, 40.0), DVec3::ZERO, DVec3::Y),
        trees,
        resolution,
    }
}

/// Oblique camera close above the surface of a [`Surface`] tree, so the needed
/// detail falls off with distance.
pub fn oblique_view(resolution: f64, trees: Vec<TreeInfo>) -> FrustumQuery {
    FrustumQuery {
        projection: DMat4::perspective_rh_gl(60f64.to_radians(), 1.0, 0.1, 1000.0),
        view: DMat4::look_at_rh(
            DVec3::new(0.0, -24.0, 4.0),
            DVec3::new(0.0, 0.0, -8.0),
            DVec3::Z,
        ),
        trees,
        resolution,
    }
}

pub fn completed(events: &[QueryEvent]) -> Vec<&QuerySnapshot> {
    events
        .iter()
        .filter(|event| event.is_completed())
        .map(QueryEvent::snapshot)
        .collect()
}
