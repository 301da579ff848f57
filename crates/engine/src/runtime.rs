//! The Cadence runtime: owns learned state and wires every component.
//!
//! Event processing is sequential. Learned state lives behind two locks that
//! are always taken in the same order, learner then relevance, and both are
//! held while an event is applied or a snapshot is copied. Hooks run on the
//! dispatcher's pool and never block ingestion.

use crate::adaptation::{AdaptationEngine, Decision};
use cadence_config::AppConfig;
use cadence_context::RelevanceCache;
use cadence_core::{
    DispatchContext, DispatchOutcome, DomainEvent, Event, EventBus, EventInput, EventKind, Pattern,
    RelevanceEntry, Snapshot,
};
use cadence_hooks::{HookDispatcher, HookRegistry, HookSummary, OutcomeCounts, OutcomeLog};
use cadence_learning::{Learner, Prediction};
use cadence_state::StateManager;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

/// What one ingested event did.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub event: Event,

    /// Patterns created or reinforced
    pub updated: usize,

    /// Patterns evicted for capacity
    pub evicted: usize,

    /// Whether the relevance cache was touched
    pub touched: bool,

    pub prediction: Option<Prediction>,

    /// Adaptation decision label
    pub decision: &'static str,

    /// Request ids handed to the dispatcher
    pub dispatched: Vec<u64>,
}

/// Result of one maintenance pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MaintenanceReport {
    pub pruned: usize,
    pub decayed: usize,
    pub persisted: Option<PathBuf>,
    pub snapshots_deleted: usize,
}

/// Result of [`Runtime::shutdown`].
#[derive(Debug, Clone, Default, Serialize)]
pub struct ShutdownReport {
    /// Queued hooks that never ran
    pub skipped: usize,

    /// Hooks abandoned after the grace period
    pub abandoned: usize,

    /// Final snapshot, if it was written
    pub snapshot: Option<PathBuf>,

    /// Snapshots removed by retention after the final write
    pub snapshots_deleted: usize,
}

/// Counters for `cadence status` and diagnostics.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStats {
    pub events_ingested: u64,
    pub events_dropped: u64,
    pub pattern_updates: u64,
    pub patterns_evicted: u64,
    pub predictions: u64,
    pub dispatches_requested: u64,
    pub snapshots_persisted: u64,
    pub snapshot_failures: u64,
    pub patterns: usize,
    pub relevance_entries: usize,
    pub hooks_pending: usize,
    pub outcomes: OutcomeCounts,
}

#[derive(Default)]
struct Counters {
    events_ingested: AtomicU64,
    pattern_updates: AtomicU64,
    patterns_evicted: AtomicU64,
    predictions: AtomicU64,
    dispatches_requested: AtomicU64,
    snapshots_persisted: AtomicU64,
    snapshot_failures: AtomicU64,
}

fn bump(counter: &AtomicU64, by: u64) {
    counter.fetch_add(by, Ordering::Relaxed);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct Runtime {
    config: AppConfig,
    learner: Mutex<Learner>,
    relevance: Mutex<RelevanceCache>,
    registry: Arc<HookRegistry>,
    adaptation: AdaptationEngine,
    dispatcher: HookDispatcher,
    outcomes: Arc<Mutex<OutcomeLog>>,
    collector: Mutex<Option<(oneshot::Sender<()>, JoinHandle<OutcomeReceiver>)>>,
    /// Outcome channel handed back by the collector at shutdown
    late_outcomes: Mutex<Option<OutcomeReceiver>>,
    maintenance: Mutex<Option<AbortHandle>>,
    state: StateManager,
    bus: Arc<EventBus>,
    counters: Counters,
    last_persist: Mutex<DateTime<Utc>>,
    project_root: String,
}

impl Runtime {
    /// Build a runtime whose hooks are the configured shell bindings.
    pub fn from_config(config: AppConfig) -> cadence_core::Result<Self> {
        let registry = HookRegistry::from_bindings(&config.hooks.bindings)?;
        Ok(Self::new(config, registry))
    }

    /// Build a runtime with an explicit registry. Must be called inside a
    /// tokio runtime; the dispatcher pool starts immediately.
    pub fn new(config: AppConfig, registry: HookRegistry) -> Self {
        let registry = Arc::new(registry);
        let bus = Arc::new(EventBus::default());
        let outcomes = Arc::new(Mutex::new(OutcomeLog::new(config.hooks.outcome_history)));

        let (dispatcher, rx) = HookDispatcher::start(&config.hooks);
        let collector = spawn_collector(rx, outcomes.clone(), bus.clone());

        let state = StateManager::new(&config.state, config.state_dir());
        let project_root = config.project_root().to_string_lossy().to_string();

        info!(
            bindings = registry.len(),
            threshold = config.learning.confidence_threshold,
            state_dir = %state.dir().display(),
            "Cadence runtime started"
        );

        Self {
            learner: Mutex::new(Learner::new(&config.learning)),
            relevance: Mutex::new(RelevanceCache::new(&config.context)),
            adaptation: AdaptationEngine::new(config.learning.confidence_threshold, registry.clone()),
            registry,
            dispatcher,
            outcomes,
            collector: Mutex::new(Some(collector)),
            late_outcomes: Mutex::new(None),
            maintenance: Mutex::new(None),
            state,
            bus,
            counters: Counters::default(),
            last_persist: Mutex::new(Utc::now()),
            project_root,
            config,
        }
    }

    // ── Ingestion ───────────────────────────────────────────────────────────

    /// Process one event: learn, update relevance, decide and dispatch.
    ///
    /// Never fails; hook problems surface as outcomes.
    pub fn ingest(&self, input: EventInput) -> IngestReport {
        let now = Utc::now();
        let (observation, touched) = {
            let mut learner = lock(&self.learner);
            let mut relevance = lock(&self.relevance);
            let observation = learner.observe(input, now);
            let touched = relevance.observe(&observation.event);
            (observation, touched)
        };

        bump(&self.counters.events_ingested, 1);
        bump(&self.counters.pattern_updates, observation.updated.len() as u64);
        bump(&self.counters.patterns_evicted, observation.evicted.len() as u64);

        for pattern in &observation.updated {
            self.bus.publish(DomainEvent::PatternUpdated {
                signature: pattern.describe(),
                occurrences: pattern.occurrences,
                confidence: pattern.confidence,
                timestamp: now,
            });
        }
        for pattern in &observation.evicted {
            self.bus.publish(DomainEvent::PatternEvicted {
                signature: pattern.describe(),
                confidence: pattern.confidence,
                timestamp: now,
            });
        }

        if observation.prediction.is_some() {
            bump(&self.counters.predictions, 1);
        }
        let decision = self
            .adaptation
            .evaluate(observation.prediction.as_ref(), &observation.event.kind);

        let mut dispatched = Vec::new();
        if let Decision::Dispatch { prediction, hooks } = &decision {
            for hook in hooks {
                let context = DispatchContext {
                    event: observation.event.clone(),
                    predicted: prediction.kind.clone(),
                    confidence: prediction.confidence,
                    signature: prediction.signature.clone(),
                    project_root: self.project_root.clone(),
                };
                let request_id = self.dispatcher.dispatch(hook.clone(), context);
                info!(
                    request_id,
                    binding = %hook.id(),
                    predicted = %prediction.kind,
                    confidence = prediction.confidence,
                    "Hook dispatched"
                );
                self.bus.publish(DomainEvent::HookDispatched {
                    request_id,
                    binding_id: hook.id().to_string(),
                    predicted: prediction.kind.to_string(),
                    confidence: prediction.confidence,
                    timestamp: now,
                });
                dispatched.push(request_id);
            }
            bump(&self.counters.dispatches_requested, dispatched.len() as u64);
            // After shutdown the dispatcher answers with `Skipped` right away
            self.drain_late_outcomes();
        }

        debug!(
            event_id = observation.event.id,
            kind = %observation.event.kind,
            updated = observation.updated.len(),
            decision = decision.label(),
            "Event processed"
        );

        IngestReport {
            event: observation.event,
            updated: observation.updated.len(),
            evicted: observation.evicted.len(),
            touched,
            prediction: observation.prediction,
            decision: decision.label(),
            dispatched,
        }
    }

    // ── Queries ─────────────────────────────────────────────────────────────

    /// Learned patterns, best first.
    pub fn current_patterns(&self) -> Vec<Pattern> {
        lock(&self.learner).library().patterns()
    }

    /// Most relevant files right now.
    pub fn top_k(&self, k: usize) -> Vec<RelevanceEntry> {
        lock(&self.relevance).top_k(k, Utc::now())
    }

    /// Prediction for an arbitrary tail of kinds (oldest first).
    pub fn predict_for(&self, tail: &[EventKind]) -> Option<Prediction> {
        lock(&self.learner).predict_for(tail)
    }

    /// Up to `n` dispatch outcomes, newest first.
    pub fn recent_outcomes(&self, n: usize) -> Vec<DispatchOutcome> {
        lock(&self.outcomes).recent(n)
    }

    pub fn hooks(&self) -> Vec<HookSummary> {
        self.registry.summary()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.bus.subscribe()
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn state(&self) -> &StateManager {
        &self.state
    }

    pub fn stats(&self) -> RuntimeStats {
        let (events_dropped, patterns) = {
            let learner = lock(&self.learner);
            (learner.log().dropped(), learner.library().len())
        };
        let relevance_entries = lock(&self.relevance).len();
        let c = &self.counters;
        RuntimeStats {
            events_ingested: c.events_ingested.load(Ordering::Relaxed),
            events_dropped,
            pattern_updates: c.pattern_updates.load(Ordering::Relaxed),
            patterns_evicted: c.patterns_evicted.load(Ordering::Relaxed),
            predictions: c.predictions.load(Ordering::Relaxed),
            dispatches_requested: c.dispatches_requested.load(Ordering::Relaxed),
            snapshots_persisted: c.snapshots_persisted.load(Ordering::Relaxed),
            snapshot_failures: c.snapshot_failures.load(Ordering::Relaxed),
            patterns,
            relevance_entries,
            hooks_pending: self.dispatcher.pending(),
            outcomes: lock(&self.outcomes).counts(),
        }
    }

    // ── State ───────────────────────────────────────────────────────────────

    /// Copy learned state. Both locks are held so the copy reflects one
    /// point between events.
    pub fn capture_snapshot(&self, now: DateTime<Utc>) -> Snapshot {
        let (patterns, relevance) = {
            let learner = lock(&self.learner);
            let relevance = lock(&self.relevance);
            (learner.library().patterns(), relevance.entries(now))
        };
        StateManager::capture(patterns, relevance, now)
    }

    /// Replace learned state with a snapshot.
    pub fn restore(&self, snapshot: Snapshot) {
        let patterns = snapshot.patterns.len();
        let relevance = snapshot.relevance.len();
        {
            let mut learner = lock(&self.learner);
            let mut cache = lock(&self.relevance);
            learner.library_mut().restore(snapshot.patterns);
            cache.restore(snapshot.relevance);
        }
        info!(patterns, relevance, "Learned state restored");
    }

    /// Restore the newest snapshot on disk. Returns `false` on a cold start.
    pub fn restore_latest(&self) -> bool {
        match self.state.restore_latest() {
            Some(snapshot) => {
                self.restore(snapshot);
                true
            }
            None => false,
        }
    }

    /// Write a snapshot now. Failures are logged and reported as `None`.
    pub fn persist(&self, now: DateTime<Utc>) -> Option<PathBuf> {
        let snapshot = self.capture_snapshot(now);
        match self.state.persist(&snapshot) {
            Ok(file) => {
                *lock(&self.last_persist) = now;
                bump(&self.counters.snapshots_persisted, 1);
                self.bus.publish(DomainEvent::SnapshotPersisted {
                    path: file.path.display().to_string(),
                    patterns: snapshot.patterns.len(),
                    relevance: snapshot.relevance.len(),
                    timestamp: now,
                });
                Some(file.path)
            }
            Err(e) => {
                warn!(error = %e, "Snapshot failed, will retry next interval");
                bump(&self.counters.snapshot_failures, 1);
                self.bus.publish(DomainEvent::SnapshotFailed {
                    reason: e.to_string(),
                    timestamp: now,
                });
                None
            }
        }
    }

    // ── Maintenance ─────────────────────────────────────────────────────────

    /// Prune and decay patterns, persist when due and apply retention.
    pub fn maintain(&self, now: DateTime<Utc>) -> MaintenanceReport {
        let (pruned, decayed) = {
            let mut learner = lock(&self.learner);
            let library = learner.library_mut();
            (library.prune(now).len(), library.decay(now))
        };

        let interval_ms = (self.config.state.interval_hours * 3_600_000.0) as i64;
        let due = now - *lock(&self.last_persist) >= chrono::Duration::milliseconds(interval_ms);
        let persisted = if due { self.persist(now) } else { None };

        let snapshots_deleted = match self.state.enforce_retention(now) {
            Ok(deleted) => deleted.len(),
            Err(e) => {
                warn!(error = %e, "Snapshot retention failed");
                0
            }
        };

        let report = MaintenanceReport {
            pruned,
            decayed,
            persisted,
            snapshots_deleted,
        };
        debug!(?report, "Maintenance pass complete");
        report
    }

    /// Run [`Runtime::maintain`] every `maintenance_interval_minutes`.
    ///
    /// The loop holds only a weak reference and ends when the runtime is
    /// dropped or shut down.
    pub fn start_maintenance(
        self: &Arc<Self>,
    ) -> (mpsc::Receiver<MaintenanceReport>, JoinHandle<()>) {
        let runtime = Arc::downgrade(self);
        let period = Duration::from_secs(self.config.learning.maintenance_interval_minutes * 60);
        let (tx, rx) = mpsc::channel::<MaintenanceReport>(16);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let Some(runtime) = runtime.upgrade() else {
                    debug!("Runtime dropped, stopping maintenance loop");
                    return;
                };
                let report = runtime.maintain(Utc::now());
                // Reports are informational; a slow or absent reader is fine
                let _ = tx.try_send(report);
            }
        });

        *lock(&self.maintenance) = Some(handle.abort_handle());
        (rx, handle)
    }

    // ── Shutdown ────────────────────────────────────────────────────────────

    /// Wait until every dispatched hook has an outcome, up to `timeout`.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        self.dispatcher.wait_idle(timeout).await
    }

    /// Stop maintenance, drain the dispatcher within the grace period, write
    /// a final snapshot and apply retention.
    ///
    /// The runtime stays queryable afterwards. Events ingested later are
    /// still learned, but their hooks are recorded as `Skipped`.
    pub async fn shutdown(&self) -> ShutdownReport {
        if let Some(handle) = lock(&self.maintenance).take() {
            handle.abort();
        }

        let grace = Duration::from_millis(self.config.hooks.shutdown_grace_ms);
        let drain = self.dispatcher.shutdown(grace).await;

        let collector = lock(&self.collector).take();
        if let Some((stop, handle)) = collector {
            let _ = stop.send(());
            match handle.await {
                Ok(rx) => *lock(&self.late_outcomes) = Some(rx),
                Err(e) => warn!(error = %e, "Outcome collector did not stop cleanly"),
            }
        }

        let now = Utc::now();
        let snapshot = self.persist(now);
        let snapshots_deleted = match self.state.enforce_retention(now) {
            Ok(deleted) => deleted.len(),
            Err(e) => {
                warn!(error = %e, "Snapshot retention failed");
                0
            }
        };
        info!(
            skipped = drain.skipped,
            abandoned = drain.abandoned,
            persisted = snapshot.is_some(),
            snapshots_deleted,
            "Cadence runtime stopped"
        );
        ShutdownReport {
            skipped: drain.skipped,
            abandoned: drain.abandoned,
            snapshot,
            snapshots_deleted,
        }
    }

    /// Record outcomes emitted after the collector stopped.
    fn drain_late_outcomes(&self) {
        let mut late = lock(&self.late_outcomes);
        if let Some(rx) = late.as_mut() {
            while let Ok(outcome) = rx.try_recv() {
                record_outcome(&self.outcomes, &self.bus, outcome);
            }
        }
    }
}

type OutcomeReceiver = mpsc::UnboundedReceiver<DispatchOutcome>;

fn record_outcome(log: &Mutex<OutcomeLog>, bus: &EventBus, outcome: DispatchOutcome) {
    debug!(
        request_id = outcome.request_id,
        binding = %outcome.binding_id,
        status = %outcome.status,
        "Hook outcome recorded"
    );
    lock(log).record(outcome.clone());
    bus.publish(DomainEvent::HookCompleted { outcome });
}

/// Record outcomes as they arrive. On stop, drain what is buffered and hand
/// the receiver back.
fn spawn_collector(
    mut rx: OutcomeReceiver,
    log: Arc<Mutex<OutcomeLog>>,
    bus: Arc<EventBus>,
) -> (oneshot::Sender<()>, JoinHandle<OutcomeReceiver>) {
    let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

    let handle = tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                received = rx.recv() => match received {
                    Some(outcome) => record_outcome(&log, &bus, outcome),
                    None => break,
                },
                _ = &mut stop_rx => {
                    while let Ok(outcome) = rx.try_recv() {
                        record_outcome(&log, &bus, outcome);
                    }
                    break;
                }
            }
        }
        rx
    });

    (stop_tx, handle)
}
