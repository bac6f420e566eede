//! Transform engine: the cached forward/filter/render pipeline with
//! cooperative cancellation.
//!
//! States flow through two bounded LRU caches. The forward cache holds
//! unfiltered decompositions keyed by backend, image, and options; the
//! filtered cache holds filter outputs keyed by the forward key plus the
//! canonical filter spec. Entries are `Rc`-shared: eviction disposes a state
//! only when the cache held the last reference, so a state still in use by an
//! in-flight run stays alive until that run drops it.
//!
//! Cancellation is a monotone token. `begin_request` bumps the engine's
//! counter and hands the new value to the run; the pipeline re-checks the
//! counter after each stage and, once superseded, discards everything it
//! produced past the caches and reports `Cancelled` instead of a result.

use std::num::NonZeroUsize;
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use lru::LruCache;
use ndarray::Array2;

use crate::backend::{
    backend_for, FilterSpec, StateMeta, TransformBackend, TransformOptions, TransformState,
    TransformType,
};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::logging::{append_json_line, now_ms, PipelineLogEntry, PIPELINE_LOG_FILE};
use crate::matrix::ImageSource;
use crate::stats::BandStats;

/// One pipeline request.
#[derive(Clone, Debug)]
pub struct TransformRequest {
    pub transform: TransformType,
    pub image_id: String,
    pub source: ImageSource,
    pub options: TransformOptions,
    pub filter: Option<FilterSpec>,
}

/// Everything a completed run renders.
#[derive(Clone, Debug)]
pub struct PipelineOutput {
    pub display: Array2<u8>,
    pub mask_display: Option<Array2<u8>>,
    pub reconstructed: Array2<u8>,
    pub metrics: BandStats,
    pub meta: StateMeta,
}

/// Outcome of a run: a superseded request yields `Cancelled`, never a stale
/// result and never an error.
#[derive(Clone, Debug)]
pub enum PipelineResult {
    Complete(Box<PipelineOutput>),
    Cancelled,
}

impl PipelineResult {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineResult::Cancelled)
    }
}

/// Handle identifying one claim on the engine's current-request slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TaskToken(u64);

/// Bounded LRU of shared transform states with hit accounting.
pub struct StateCache {
    entries: LruCache<String, Rc<TransformState>>,
    hits: u64,
    misses: u64,
}

impl StateCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        StateCache {
            entries: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a state, promoting it to most-recently-used on a hit.
    pub fn get(&mut self, key: &str) -> Option<Rc<TransformState>> {
        match self.entries.get(key) {
            Some(state) => {
                self.hits += 1;
                Some(Rc::clone(state))
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Insert a state, disposing whatever the insertion pushes out (the
    /// least-recently-used entry, or the previous value under the same key).
    pub fn insert(&mut self, key: String, state: Rc<TransformState>) {
        if let Some((_, evicted)) = self.entries.push(key, state) {
            dispose_entry(evicted);
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    /// Drop every entry, disposing each state this cache solely owned.
    pub fn clear(&mut self) {
        while let Some((_, state)) = self.entries.pop_lru() {
            dispose_entry(state);
        }
    }
}

/// Dispose a state leaving the cache. When other `Rc` holders remain the
/// buffers stay alive for them; the tombstone write only happens for the
/// sole owner.
fn dispose_entry(state: Rc<TransformState>) {
    if let Ok(mut owned) = Rc::try_unwrap(state) {
        owned.dispose();
    }
}

/// The engine: two state caches plus the supersession counter.
pub struct TransformEngine {
    config: EngineConfig,
    forward_cache: StateCache,
    filtered_cache: StateCache,
    task_counter: AtomicU64,
}

impl TransformEngine {
    pub fn new(config: EngineConfig) -> Self {
        let forward_cache = StateCache::new(config.forward_capacity);
        let filtered_cache = StateCache::new(config.filtered_capacity);
        TransformEngine {
            config,
            forward_cache,
            filtered_cache,
            task_counter: AtomicU64::new(0),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(EngineConfig::default())
    }

    /// Claim the current-request slot, superseding any in-flight run.
    pub fn begin_request(&self) -> TaskToken {
        TaskToken(self.task_counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Supersede whatever run is in flight without starting a new one.
    pub fn cancel_all(&self) {
        self.task_counter.fetch_add(1, Ordering::SeqCst);
    }

    fn is_current(&self, token: TaskToken) -> bool {
        self.task_counter.load(Ordering::SeqCst) == token.0
    }

    /// Begin a request and run it to completion or supersession.
    pub fn run(&mut self, request: &TransformRequest) -> EngineResult<PipelineResult> {
        let token = self.begin_request();
        self.run_with_token(token, request)
    }

    /// Run the full pipeline under an already-claimed token. The token is
    /// re-checked after each stage; a superseded run stops early, keeps what
    /// it already cached, and reports `Cancelled`.
    pub fn run_with_token(
        &mut self,
        token: TaskToken,
        request: &TransformRequest,
    ) -> EngineResult<PipelineResult> {
        let started = Instant::now();
        let backend = backend_for(request.transform);

        let forward_key = backend.forward_key(&request.image_id, &request.options);
        let (forward, forward_hit) = match self.forward_cache.get(&forward_key) {
            Some(state) => (state, true),
            None => {
                let state = Rc::new(backend.forward(&request.source, &request.options)?);
                self.forward_cache.insert(forward_key, Rc::clone(&state));
                (state, false)
            }
        };
        if !self.is_current(token) {
            return Ok(self.finish_cancelled(request, forward_hit, None, started));
        }

        let (filtered, filtered_hit) = self.resolve_filtered(backend, request, &forward)?;
        if !self.is_current(token) {
            return Ok(self.finish_cancelled(request, forward_hit, filtered_hit, started));
        }

        let view = backend.display(&filtered)?;
        let metrics = backend.metrics(&filtered)?;
        let reconstructed = backend.inverse(&filtered)?;
        if !self.is_current(token) {
            // Superseded during rendering: the planes are stale, drop them.
            drop(view);
            drop(reconstructed);
            return Ok(self.finish_cancelled(request, forward_hit, filtered_hit, started));
        }

        let meta = filtered
            .meta()
            .ok_or_else(|| EngineError::state("state disposed mid-pipeline"))?;

        self.log_run(request, forward_hit, filtered_hit, false, started);
        Ok(PipelineResult::Complete(Box::new(PipelineOutput {
            display: view.display,
            mask_display: view.mask_display,
            reconstructed,
            metrics,
            meta,
        })))
    }

    /// Resolve the filtered state for a request. An absent or identity
    /// filter reuses the forward state itself (same allocation, no cache
    /// entry); anything else is fetched from the filtered cache or computed
    /// and inserted.
    fn resolve_filtered(
        &mut self,
        backend: &dyn TransformBackend,
        request: &TransformRequest,
        forward: &Rc<TransformState>,
    ) -> EngineResult<(Rc<TransformState>, Option<bool>)> {
        let spec = match request.filter.as_ref().and_then(FilterSpec::normalized) {
            None => return Ok((Rc::clone(forward), None)),
            Some(spec) => spec,
        };
        let key = backend.filtered_key(&request.image_id, &request.options, &spec);
        if let Some(state) = self.filtered_cache.get(&key) {
            return Ok((state, Some(true)));
        }
        let state = Rc::new(backend.apply_filter(forward, &spec)?);
        self.filtered_cache.insert(key, Rc::clone(&state));
        Ok((state, Some(false)))
    }

    fn finish_cancelled(
        &self,
        request: &TransformRequest,
        forward_hit: bool,
        filtered_hit: Option<bool>,
        started: Instant,
    ) -> PipelineResult {
        self.log_run(request, forward_hit, filtered_hit, true, started);
        PipelineResult::Cancelled
    }

    fn log_run(
        &self,
        request: &TransformRequest,
        forward_hit: bool,
        filtered_hit: Option<bool>,
        cancelled: bool,
        started: Instant,
    ) {
        if !self.config.log_pipeline {
            return;
        }
        let entry = PipelineLogEntry {
            timestamp_ms: now_ms(),
            transform: request.transform.tag(),
            image_id: &request.image_id,
            forward_cache_hit: forward_hit,
            filtered_cache_hit: filtered_hit,
            cancelled,
            duration_ms: started.elapsed().as_millis(),
        };
        // Log failures must never fail the pipeline.
        let _ = append_json_line(Path::new(&self.config.log_dir), PIPELINE_LOG_FILE, &entry);
    }

    /// Dispose and drop every cached state.
    pub fn clear_caches(&mut self) {
        self.filtered_cache.clear();
        self.forward_cache.clear();
    }

    pub fn forward_cache(&self) -> &StateCache {
        &self.forward_cache
    }

    pub fn filtered_cache(&self) -> &StateCache {
        &self.filtered_cache
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}
