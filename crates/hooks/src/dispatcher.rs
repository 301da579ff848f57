//! Bounded worker pool that runs hooks off the learning path.
//!
//! `dispatch` never blocks: requests go into a FIFO queue served by a fixed
//! number of workers. Every accepted request yields exactly one
//! [`DispatchOutcome`] on the outcome channel.

use crate::registry::RegisteredHook;
use cadence_config::HooksConfig;
use cadence_core::{DispatchContext, DispatchOutcome, DispatchStatus, HookError};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{Notify, mpsc};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, info, warn};

/// Slack on top of a hook's own timeout before the worker abandons it.
const DEADLINE_BACKSTOP: Duration = Duration::from_millis(250);

struct Request {
    id: u64,
    hook: Arc<RegisteredHook>,
    context: DispatchContext,
    timeout: Duration,
}

struct InFlight {
    binding_id: String,
    started_at: DateTime<Utc>,
    started: Instant,
    abort: Option<AbortHandle>,
}

struct Shared {
    queue: Mutex<VecDeque<Request>>,
    queue_capacity: usize,
    notify: Notify,
    closed: AtomicBool,
    in_flight: Mutex<HashMap<u64, InFlight>>,
    active: AtomicUsize,
    /// Accepted requests without an outcome yet
    pending: AtomicUsize,
    /// Signalled when `pending` drops to zero
    idle: Notify,
    outcomes: mpsc::UnboundedSender<DispatchOutcome>,
}

impl Shared {
    fn queue(&self) -> MutexGuard<'_, VecDeque<Request>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<u64, InFlight>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, outcome: DispatchOutcome) {
        // Receiver gone means nobody is recording outcomes any more
        let _ = self.outcomes.send(outcome);
    }

    /// Emit the single outcome of an accepted request.
    fn finish(&self, outcome: DispatchOutcome) {
        self.emit(outcome);
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Counts reported by [`HookDispatcher::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    /// Queued requests that never ran
    pub skipped: usize,

    /// Executions still running when the grace period ended
    pub abandoned: usize,
}

pub struct HookDispatcher {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    next_id: AtomicU64,
    default_timeout: Duration,
}

impl HookDispatcher {
    /// Spawn the worker pool. Must be called inside a tokio runtime.
    ///
    /// Returns the dispatcher and the receiver for outcomes.
    pub fn start(config: &HooksConfig) -> (Self, mpsc::UnboundedReceiver<DispatchOutcome>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::with_capacity(config.queue_capacity)),
            queue_capacity: config.queue_capacity.max(1),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            in_flight: Mutex::new(HashMap::new()),
            active: AtomicUsize::new(0),
            pending: AtomicUsize::new(0),
            idle: Notify::new(),
            outcomes: tx,
        });

        let workers = (0..config.max_concurrent.max(1))
            .map(|worker| tokio::spawn(worker_loop(worker, shared.clone())))
            .collect();

        info!(
            workers = config.max_concurrent,
            queue_capacity = config.queue_capacity,
            "Hook dispatcher started"
        );

        (
            Self {
                shared,
                workers: Mutex::new(workers),
                next_id: AtomicU64::new(1),
                default_timeout: Duration::from_millis(config.default_timeout_ms),
            },
            rx,
        )
    }

    /// Queue a hook for execution and return its request id.
    ///
    /// When the queue is full the oldest pending request is dropped with a
    /// `Skipped` outcome. After shutdown every request is skipped immediately.
    pub fn dispatch(&self, hook: Arc<RegisteredHook>, context: DispatchContext) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let timeout = hook.binding.timeout_or(self.default_timeout);

        let overflow = {
            let mut queue = self.shared.queue();
            // Checked under the queue lock so shutdown cannot miss this request
            if self.shared.closed.load(Ordering::Acquire) {
                drop(queue);
                self.shared
                    .emit(DispatchOutcome::skipped(id, hook.id(), "dispatcher is shut down"));
                return id;
            }
            self.shared.pending.fetch_add(1, Ordering::AcqRel);
            let overflow = if queue.len() >= self.shared.queue_capacity {
                queue.pop_front()
            } else {
                None
            };
            queue.push_back(Request {
                id,
                hook,
                context,
                timeout,
            });
            overflow
        };

        if let Some(dropped) = overflow {
            warn!(request_id = dropped.id, binding = %dropped.hook.id(), "Dispatch queue full, skipping oldest request");
            self.shared.finish(DispatchOutcome::skipped(
                dropped.id,
                dropped.hook.id(),
                "dispatch queue full",
            ));
        }

        self.shared.notify.notify_one();
        id
    }

    /// Requests waiting for a worker.
    pub fn queued(&self) -> usize {
        self.shared.queue().len()
    }

    /// Executions currently running.
    pub fn active(&self) -> usize {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Accepted requests whose outcome has not been emitted yet.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    /// Wait until every accepted request has an outcome. Returns `false` if
    /// `timeout` elapsed first.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let idle = async {
            loop {
                let notified = self.shared.idle.notified();
                tokio::pin!(notified);
                // Register before checking so a finish in between is not missed
                notified.as_mut().enable();
                if self.pending() == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, idle).await.is_ok()
    }

    /// Stop accepting work, skip everything queued and give running hooks
    /// `grace` to finish. Whatever is still running afterwards is aborted and
    /// reported as `TimedOut`.
    pub async fn shutdown(&self, grace: Duration) -> DrainReport {
        self.shared.closed.store(true, Ordering::Release);

        let pending: Vec<Request> = self.shared.queue().drain(..).collect();
        let skipped = pending.len();
        for request in pending {
            self.shared.finish(DispatchOutcome::skipped(
                request.id,
                request.hook.id(),
                "dispatcher shutting down",
            ));
        }
        self.shared.notify.notify_waiters();

        let mut workers = std::mem::take(
            &mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let joined = tokio::time::timeout(grace, futures::future::join_all(workers.iter_mut())).await;
        if joined.is_err() {
            for worker in &workers {
                worker.abort();
            }
        }

        let leftovers: Vec<(u64, InFlight)> = self.shared.in_flight().drain().collect();
        let abandoned = leftovers.len();
        for (request_id, entry) in leftovers {
            if let Some(abort) = &entry.abort {
                abort.abort();
            }
            warn!(request_id, binding = %entry.binding_id, "Hook abandoned at shutdown");
            self.shared.finish(DispatchOutcome {
                request_id,
                binding_id: entry.binding_id,
                started_at: entry.started_at,
                duration_ms: entry.started.elapsed().as_millis() as u64,
                status: DispatchStatus::TimedOut,
                error_detail: Some("abandoned after shutdown grace period".into()),
                output: None,
            });
        }

        info!(skipped, abandoned, "Hook dispatcher stopped");
        DrainReport { skipped, abandoned }
    }
}

impl Drop for HookDispatcher {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
        self.shared.notify.notify_waiters();
    }
}

async fn worker_loop(worker: usize, shared: Arc<Shared>) {
    loop {
        let (next, more) = {
            let mut queue = shared.queue();
            let next = queue.pop_front();
            (next, !queue.is_empty())
        };

        if let Some(request) = next {
            if more {
                shared.notify.notify_one();
            }
            execute(worker, &shared, request).await;
            continue;
        }

        // Register interest before re-checking so a wake-up cannot slip by
        let notified = shared.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if !shared.queue().is_empty() {
            continue;
        }
        if shared.closed.load(Ordering::Acquire) {
            break;
        }
        notified.await;
    }
    debug!(worker, "Hook worker exiting");
}

async fn execute(worker: usize, shared: &Shared, request: Request) {
    let Request {
        id,
        hook,
        context,
        timeout,
    } = request;
    let binding_id = hook.id().to_string();
    let started_at = Utc::now();
    let started = Instant::now();

    let task_hook = hook.clone();
    let mut handle = tokio::spawn(async move { task_hook.executable.run(&context, timeout).await });

    shared.in_flight().insert(
        id,
        InFlight {
            binding_id: binding_id.clone(),
            started_at,
            started,
            abort: Some(handle.abort_handle()),
        },
    );
    let active = shared.active.fetch_add(1, Ordering::AcqRel) + 1;
    debug!(worker, request_id = id, binding = %binding_id, active, "Hook started");

    let result = tokio::time::timeout(timeout + DEADLINE_BACKSTOP, &mut handle).await;
    shared.active.fetch_sub(1, Ordering::AcqRel);

    let (status, error_detail, output) = match result {
        Err(_) => {
            handle.abort();
            (
                DispatchStatus::TimedOut,
                Some(format!("exceeded {}ms deadline", timeout.as_millis())),
                None,
            )
        }
        Ok(Err(join_error)) => (
            DispatchStatus::Failure,
            Some(format!("hook task failed: {join_error}")),
            None,
        ),
        Ok(Ok(Err(e @ HookError::Timeout { .. }))) => {
            (DispatchStatus::TimedOut, Some(e.to_string()), None)
        }
        Ok(Ok(Err(e))) => (DispatchStatus::Failure, Some(e.to_string()), None),
        Ok(Ok(Ok(out))) => (
            DispatchStatus::Success,
            None,
            (!out.is_empty()).then_some(out),
        ),
    };

    let outcome = DispatchOutcome {
        request_id: id,
        binding_id,
        started_at,
        duration_ms: started.elapsed().as_millis() as u64,
        status,
        error_detail,
        output,
    };
    debug!(worker, request_id = id, status = %outcome.status, duration_ms = outcome.duration_ms, "Hook finished");

    // Shutdown may already have reported this request
    let mut in_flight = shared.in_flight();
    if in_flight.remove(&id).is_some() {
        shared.finish(outcome);
    }
}
