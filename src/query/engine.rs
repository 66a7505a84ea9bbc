use super::config::{ConfigError, QueryConfig};
use super::observer::{QueryObserver, QuerySnapshot};
use super::traversal::{NodeRequest, Pass, PassOutcome, QueuedNode};
use super::{FrustumQuery, Generation, QueryState, QueryStats, TriggerReason};
use crate::cache::NodeCache;
use crate::frustum::{Classification, FrustumPlanes};
use crate::loader::{LoadNodeError, NodeSource};
use crate::octree::Node;
use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use glam::DMat4;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{Level, debug, info, span, warn};

/// Completion of one node request, tagged with the generation that issued it.
struct Fetched {
    generation: Generation,
    request: NodeRequest,
    result: Result<Node, LoadNodeError>,
}

/// A self-induced trigger waiting for the current pass to settle.
#[derive(Clone, Copy, Debug)]
struct ScheduledTrigger {
    generation: Generation,
    reason: TriggerReason,
}

enum Slice {
    /// The batch limit was reached with nodes still queued.
    Yield,
    /// The queue is empty (or the pass was aborted).
    CaughtUp { processed: usize },
}

/// Streams the nodes of the enabled trees needed for the current view.
///
/// All work runs on the task driving [`run`](Self::run): fetches are polled from a
/// single [`FuturesUnordered`] and arrivals are appended to the live generation's
/// queue, so no state is ever mutated concurrently. Starting a generation drops
/// every request of the previous one.
pub struct FrustumQuerier<S: NodeSource + ?Sized + 'static> {
    source: Arc<S>,
    config: QueryConfig,
    cache: NodeCache,
    query: Option<FrustumQuery>,
    generation: Generation,
    resolution_correction: f64,
    last_outcome: Option<PassOutcome>,
    pass: Option<Pass>,
    pending: FuturesUnordered<BoxFuture<'static, Fetched>>,
    scheduled: Option<ScheduledTrigger>,
    chained_retriggers: usize,
    stats: QueryStats,
}

impl<S: NodeSource + ?Sized + 'static> FrustumQuerier<S> {
    pub fn new(source: Arc<S>, config: QueryConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let cache = NodeCache::new(config.cache_capacity()?);
        Ok(Self::with_cache(source, config, cache))
    }

    /// Use an existing cache, e.g. one warmed by an earlier querier.
    pub fn with_cache(source: Arc<S>, config: QueryConfig, cache: NodeCache) -> Self {
        Self {
            source,
            config,
            cache,
            query: None,
            generation: Generation::default(),
            resolution_correction: 1.0,
            last_outcome: None,
            pass: None,
            pending: FuturesUnordered::new(),
            scheduled: None,
            chained_retriggers: 0,
            stats: QueryStats::default(),
        }
    }

    /// Start a generation for a new view or tree set.
    pub fn query(&mut self, query: FrustumQuery) -> Generation {
        self.query = Some(query);
        self.retrigger()
    }

    /// Start a generation with the last query, e.g. after a budget change.
    pub fn retrigger(&mut self) -> Generation {
        self.chained_retriggers = 0;
        self.trigger(TriggerReason::External)
    }

    pub fn set_desired_node_count(&mut self, desired_node_count: usize) {
        self.config.desired_node_count = desired_node_count.max(1);
    }

    pub fn set_cache_only(&mut self, cache_only: bool) {
        self.config.cache_only = cache_only;
    }

    /// Drop every outstanding request of the live generation.
    ///
    /// The generation still completes with the nodes it already has.
    pub fn cancel(&mut self) {
        self.scheduled = None;
        if let Some(mut pass) = self.pass.take() {
            if pass.in_flight > 0 {
                pass.interrupted = true;
                self.cancel_requests(&mut pass);
            }
            self.pass = Some(pass);
        }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn state(&self) -> QueryState {
        match &self.pass {
            None => QueryState::Idle,
            Some(pass) if pass.completed => QueryState::Completed,
            Some(pass) if pass.interrupted => QueryState::Interrupted,
            Some(pass) if pass.in_flight == 0 => QueryState::Draining,
            Some(_) => QueryState::Running,
        }
    }

    pub fn in_flight(&self) -> usize {
        self.pass.as_ref().map_or(0, |pass| pass.in_flight)
    }

    /// Resolution threshold of the live generation.
    pub fn threshold(&self) -> Option<f64> {
        self.pass.as_ref().map(|pass| pass.threshold)
    }

    pub fn resolution_correction(&self) -> f64 {
        self.resolution_correction
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    pub fn cache(&self) -> &NodeCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut NodeCache {
        &mut self.cache
    }

    pub fn stats(&self) -> &QueryStats {
        &self.stats
    }

    /// Current node set of the live generation.
    pub fn snapshot(&self) -> Option<QuerySnapshot> {
        self.pass.as_ref().map(Pass::snapshot)
    }

    /// Drive the live generation, and any re-triggers it schedules, until nothing
    /// is left to do.
    ///
    /// Cancel safe: dropping the future leaves the querier consistent, and a later
    /// call resumes where this one stopped.
    pub async fn run<O: QueryObserver + ?Sized>(&mut self, observer: &mut O) {
        loop {
            let processed = match self.drain_slice() {
                Slice::Yield => {
                    YieldNow::default().await;
                    continue;
                }
                Slice::CaughtUp { processed } => processed,
            };

            let (in_flight, completed) = match &self.pass {
                Some(pass) => (pass.in_flight, pass.completed),
                None => (0, true),
            };

            if in_flight > 0 {
                if processed > 0 {
                    if let Some(pass) = &self.pass {
                        observer.on_progress(pass.snapshot());
                    }
                }
                match self.pending.next().await {
                    Some(fetched) => self.handle_fetched(fetched),
                    None => {
                        warn!(in_flight, "Requests in flight but none pending");
                        if let Some(pass) = self.pass.as_mut() {
                            pass.in_flight = 0;
                        }
                    }
                }
                continue;
            }

            if !completed {
                self.complete_pass(observer);
                continue;
            }

            match self.scheduled.take() {
                Some(scheduled) => {
                    YieldNow::default().await;
                    self.fire(scheduled);
                }
                None => return,
            }
        }
    }

    /// Start a new generation: cancel the old one, adapt the threshold, request roots.
    fn trigger(&mut self, reason: TriggerReason) -> Generation {
        if let Some(mut previous) = self.pass.take() {
            if previous.in_flight > 0 {
                self.cancel_requests(&mut previous);
            }
            self.last_outcome = Some(previous.outcome());
        }
        self.adapt_resolution(reason);

        self.generation = self.generation.next();
        self.stats.generations += 1;

        let (view, frustum, base_resolution, trees) = match &self.query {
            Some(query) => (
                query.view,
                FrustumPlanes::from_projection(&query.projection),
                query.resolution,
                query.trees.clone(),
            ),
            None => (
                DMat4::IDENTITY,
                FrustumPlanes::from_projection(&DMat4::IDENTITY),
                0.0,
                Vec::new(),
            ),
        };
        let threshold = base_resolution * self.resolution_correction;
        let mut pass = Pass::new(self.generation, reason, view, frustum, threshold);

        let roots: Vec<_> = trees.into_iter().filter(|tree| tree.enabled).collect();
        info!(
            generation = self.generation.get(),
            ?reason,
            threshold,
            roots = roots.len(),
            "Starting frustum query"
        );

        for tree in roots {
            self.request(
                &mut pass,
                NodeRequest {
                    path: tree.root,
                    region: tree.region,
                    parent: None,
                    // roots are fetched regardless; their children get tested
                    classification: Classification::Intersecting,
                    override_color: tree.override_color,
                },
            );
        }

        self.pass = Some(pass);
        self.generation
    }

    /// Proportional control of the resolution threshold from the last outcome.
    ///
    /// A coarsening retry always coarsens, whatever the count of the aborted pass.
    fn adapt_resolution(&mut self, reason: TriggerReason) {
        let (Some(outcome), Some(query)) = (self.last_outcome, &self.query) else {
            return;
        };
        let count = outcome.node_count as f64;
        let step = self.config.resolution_step;

        if reason == TriggerReason::Coarsen || count > self.config.upper_adapt_bound() {
            self.resolution_correction *= step;
        } else if count < self.config.lower_adapt_bound() && outcome.ran_to_completion {
            let refined = self.resolution_correction / step;
            if query.resolution * refined >= self.config.min_feature_size {
                self.resolution_correction = refined;
            }
        }
    }

    fn fire(&mut self, scheduled: ScheduledTrigger) {
        if scheduled.generation != self.generation {
            debug!(
                scheduled = scheduled.generation.get(),
                current = self.generation.get(),
                "Dropping re-trigger from a superseded generation"
            );
            return;
        }
        self.chained_retriggers += 1;
        self.trigger(scheduled.reason);
    }

    fn schedule(&mut self, generation: Generation, reason: TriggerReason) {
        if self.chained_retriggers >= self.config.max_chained_retriggers {
            warn!(
                chained = self.chained_retriggers,
                ?reason,
                "Re-trigger limit reached, keeping the current result"
            );
            return;
        }
        debug!(generation = generation.get(), ?reason, "Scheduling re-trigger");
        self.scheduled = Some(ScheduledTrigger { generation, reason });
    }

    /// Serve `request` from the cache, or start fetching it.
    fn request(&mut self, pass: &mut Pass, request: NodeRequest) {
        if let Some(node) = self.cache.get(&request.path).cloned() {
            self.stats.cache_hits += 1;
            pass.enqueue(request.arrived(node));
            return;
        }

        if self.config.cache_only {
            self.stats.cache_only_skips += 1;
            debug!(path = %request.path, "Not in cache, skipping");
            return;
        }

        pass.in_flight += 1;
        self.stats.requests += 1;

        let source = Arc::clone(&self.source);
        let generation = pass.generation;
        self.pending.push(
            async move {
                let result = source.load_node(&request.path, &request.region).await;
                Fetched {
                    generation,
                    request,
                    result,
                }
            }
            .boxed(),
        );
    }

    fn cancel_requests(&mut self, pass: &mut Pass) {
        self.stats.cancelled += pass.in_flight as u64;
        pass.in_flight = 0;
        self.pending = FuturesUnordered::new();
    }

    fn handle_fetched(&mut self, fetched: Fetched) {
        let Some(pass) = self
            .pass
            .as_mut()
            .filter(|pass| pass.generation == fetched.generation && !pass.completed)
        else {
            self.stats.stale_discarded += 1;
            debug!(
                path = %fetched.request.path,
                generation = fetched.generation.get(),
                "Discarding node from a stale generation"
            );
            return;
        };
        pass.in_flight = pass.in_flight.saturating_sub(1);

        match fetched.result {
            Ok(node) => {
                let node = Arc::new(node);
                self.cache.put(fetched.request.path.clone(), Arc::clone(&node));
                pass.enqueue(fetched.request.arrived(node));
            }
            Err(err) => {
                self.stats.failures += 1;
                warn!(path = %fetched.request.path, %err, "Failed to load node");
            }
        }
    }

    /// Process up to `yield_batch_size` queued nodes.
    fn drain_slice(&mut self) -> Slice {
        let Some(mut pass) = self.pass.take() else {
            return Slice::CaughtUp { processed: 0 };
        };
        let _span = span!(Level::DEBUG, "drain", generation = pass.generation.get()).entered();

        let mut processed = 0;
        let slice = loop {
            if processed >= self.config.yield_batch_size && pass.has_queued() {
                break Slice::Yield;
            }
            let Some(queued) = pass.next_queued() else {
                break Slice::CaughtUp { processed };
            };
            self.process_node(&mut pass, queued);
            processed += 1;
        };

        self.pass = Some(pass);
        slice
    }

    fn process_node(&mut self, pass: &mut Pass, queued: QueuedNode) {
        if (pass.node_count + pass.in_flight) as f64 > self.config.abort_bound() {
            self.abort_over_budget(pass);
            return;
        }
        pass.node_count += 1;

        let node = &queued.node;
        pass.mark_processed(node.path());
        if let (Some(parent), Some(octant)) = (&queued.parent, node.path().octant()) {
            pass.hide_placeholder(parent, octant);
        }

        if node.is_leaf() {
            return;
        }

        let center = pass.view.transform_point3(node.center());
        let dist_sq = center.length_squared();
        let node_size = node.node_size();
        if node_size * node_size <= pass.threshold * pass.threshold * dist_sq {
            return;
        }

        for octant in 0..8u8 {
            if !node.has_child(octant) {
                continue;
            }
            let region = node.region().child(octant);

            let classification = match queued.classification {
                Classification::Inside => Classification::Inside,
                _ => {
                    let child_center = pass.view.transform_point3(region.center());
                    pass.frustum
                        .classify(child_center, region.bounding_radius())
                }
            };

            if !classification.is_visible() {
                pass.hide_placeholder(node.path(), octant);
                continue;
            }

            self.request(
                pass,
                NodeRequest {
                    path: node.path().child(octant),
                    region,
                    parent: Some(node.path().clone()),
                    classification,
                    override_color: queued.override_color,
                },
            );
        }
    }

    fn abort_over_budget(&mut self, pass: &mut Pass) {
        debug!(
            generation = pass.generation.get(),
            node_count = pass.node_count,
            in_flight = pass.in_flight,
            "Node budget exceeded, aborting"
        );
        pass.interrupted = true;
        pass.node_count += pass.in_flight;
        self.stats.budget_aborts += 1;
        self.cancel_requests(pass);
        self.schedule(pass.generation, TriggerReason::Coarsen);
    }

    fn complete_pass<O: QueryObserver + ?Sized>(&mut self, observer: &mut O) {
        let Some(pass) = self.pass.as_mut() else {
            return;
        };
        pass.completed = true;

        let generation = pass.generation;
        let refine = !pass.interrupted
            && (pass.node_count as f64) < self.config.refine_bound()
            && self.config.min_feature_size < pass.threshold / self.config.resolution_step;

        info!(
            generation = generation.get(),
            reason = ?pass.reason,
            node_count = pass.node_count,
            interrupted = pass.interrupted,
            "Frustum query finished"
        );
        let snapshot = pass.snapshot();

        if refine {
            self.schedule(generation, TriggerReason::Refine);
        }
        observer.on_complete(snapshot);
    }
}

/// Resolves on its second poll, letting the executor run other tasks in between.
#[derive(Default)]
struct YieldNow {
    yielded: bool,
}

impl Future for YieldNow {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            return Poll::Ready(());
        }
        self.yielded = true;
        cx.waker().wake_by_ref();
        Poll::Pending
    }
}
