// ============================================================
// Layer 6 — Worker Pool
// ============================================================
// One worker thread per compute device. The coordinator and the
// workers only talk through two queues owned by the pool:
//
//   task queue   (coordinator → workers)
//     Task::Batch(batch) or Task::Stop, unbounded, shared by all
//     workers through Arc<Mutex<Receiver>>; whichever worker is
//     free takes the next task.
//
//   result queue (workers → coordinator)
//     WorkerMessage::Cost per consumed batch, or
//     WorkerMessage::Failed when a worker cannot go on.
//
// Worker lifecycle:
//   1. build the cost function once, on its own device, from its
//      own Arc-shared copy of the parameters and options
//   2. loop: take a task; Stop → exit; Batch → push its cost
//
// The pool is a scoped resource: dropping it (success, error, or
// early return) cancels pending batches, sends the stop sentinels
// that have not been sent yet and joins every worker. A worker
// stuck inside a forward pass cannot be interrupted; after a
// grace period it is reported and left detached.
//
// Workers are threads in this process, not child processes. A
// panic is caught at the thread boundary, but anything that
// aborts the process (a segfault in a GPU driver, an abort on
// out-of-memory) takes the coordinator down with it.
//
// Why hold the queue lock across `recv`?
//   - Only one worker can wait on an mpsc Receiver at a time;
//     the others queue on the mutex instead, which gives the same
//     "first free worker takes the next task" order
//   - The guard is dropped as soon as a task arrives, so no lock
//     is held during a forward pass
//
// Reference: Rust Book §16 (Message Passing with mpsc)
//            Rust Book §20 (Turning a Single-Threaded Server
//                           into a Multithreaded Server)

use anyhow::{Context, Result};
use std::{
    any::Any,
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc, Mutex,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::domain::{
    batch::Batch,
    device::ComputeDevice,
    errors::EvalError,
    options::ModelOptions,
    parameters::ParameterSet,
    traits::CostFunctionBuilder,
};

/// How often a blocked coordinator re-checks worker liveness.
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How long Drop waits for workers to exit before detaching them.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// An item on the task queue.
pub enum Task {
    Batch(Batch),
    Stop,
}

/// An item on the result queue.
#[derive(Debug)]
pub enum WorkerMessage {
    Cost { worker: usize, cost: f64 },
    Failed { worker: usize, reason: String },
}

struct Worker {
    name:   String,
    handle: Option<JoinHandle<()>>,
}

pub struct WorkerPool {
    tasks:      Option<Sender<Task>>,
    results:    Receiver<WorkerMessage>,
    workers:    Vec<Worker>,
    cancelled:  Arc<AtomicBool>,
    stops_sent: bool,
}

impl WorkerPool {
    /// Spawn one worker per device. Each worker builds its own cost
    /// function from `builder`; building happens on the worker thread.
    pub fn spawn<F: CostFunctionBuilder>(
        devices: &[ComputeDevice],
        params:  Arc<ParameterSet>,
        options: Arc<ModelOptions>,
        builder: Arc<F>,
    ) -> Result<Self> {
        if devices.is_empty() {
            return Err(EvalError::Config("at least one device is required".into()).into());
        }

        let (task_tx, task_rx)     = mpsc::channel::<Task>();
        let (result_tx, result_rx) = mpsc::channel::<WorkerMessage>();
        let task_rx   = Arc::new(Mutex::new(task_rx));
        let cancelled = Arc::new(AtomicBool::new(false));

        let mut pool = Self {
            tasks:      Some(task_tx),
            results:    result_rx,
            workers:    Vec::with_capacity(devices.len()),
            cancelled:  Arc::clone(&cancelled),
            stops_sent: false,
        };

        for (id, &device) in devices.iter().enumerate() {
            let name = format!("worker_{id}_{device}");
            let ctx = WorkerContext {
                id,
                name:      name.clone(),
                device,
                params:    Arc::clone(&params),
                options:   Arc::clone(&options),
                builder:   Arc::clone(&builder),
                tasks:     Arc::clone(&task_rx),
                results:   result_tx.clone(),
                cancelled: Arc::clone(&cancelled),
            };

            // On failure `pool` is dropped here, which stops the
            // workers spawned so far.
            let handle = thread::Builder::new()
                .name(name.clone())
                .spawn(move || run_worker(ctx))
                .with_context(|| format!("Failed to spawn {name}"))?;

            pool.workers.push(Worker { name, handle: Some(handle) });
        }

        tracing::debug!("Spawned {} workers", pool.workers.len());
        Ok(pool)
    }

    pub fn size(&self) -> usize {
        self.workers.len()
    }

    /// Put one batch on the task queue. Never blocks.
    pub fn submit(&self, batch: Batch) -> Result<()> {
        self.send(Task::Batch(batch))
    }

    /// Put one stop sentinel per worker on the task queue. Every worker
    /// sees exactly one, however the batches were shared out.
    pub fn finish_submitting(&mut self) -> Result<()> {
        if self.stops_sent {
            return Ok(());
        }
        for _ in 0..self.workers.len() {
            self.send(Task::Stop)?;
        }
        self.stops_sent = true;
        Ok(())
    }

    /// Wait for the next cost, in arrival order.
    ///
    /// Fails with `WorkerFailure` when a worker reports an error or
    /// panics, when every worker has exited, or when no result shows
    /// up within `timeout`.
    pub fn next_cost(&mut self, timeout: Duration) -> Result<f64> {
        let deadline = Instant::now() + timeout;

        loop {
            let wait = deadline
                .saturating_duration_since(Instant::now())
                .min(POLL_INTERVAL);

            match self.results.recv_timeout(wait) {
                Ok(WorkerMessage::Cost { cost, .. }) => return Ok(cost),
                Ok(WorkerMessage::Failed { worker, reason }) => {
                    return Err(EvalError::worker_failure(self.worker_name(worker), reason).into());
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(EvalError::worker_failure(
                        "pool",
                        "all workers exited before every result was delivered",
                    )
                    .into());
                }
                Err(RecvTimeoutError::Timeout) => {
                    self.reap_panicked()?;
                    if Instant::now() >= deadline {
                        return Err(EvalError::worker_failure(
                            "pool",
                            format!("no result received within {timeout:?}"),
                        )
                        .into());
                    }
                }
            }
        }
    }

    fn send(&self, task: Task) -> Result<()> {
        let sender = self
            .tasks
            .as_ref()
            .ok_or_else(|| EvalError::worker_failure("pool", "task queue already closed"))?;

        sender.send(task).map_err(|_| {
            EvalError::worker_failure("pool", "all workers exited; task queue has no consumer")
        })?;
        Ok(())
    }

    fn worker_name(&self, id: usize) -> String {
        self.workers
            .get(id)
            .map(|w| w.name.clone())
            .unwrap_or_else(|| format!("worker_{id}"))
    }

    /// Join workers that have already exited; a panic is a failure.
    fn reap_panicked(&mut self) -> Result<()> {
        for w in &mut self.workers {
            let finished = w.handle.as_ref().is_some_and(|h| h.is_finished());
            if !finished {
                continue;
            }
            if let Some(handle) = w.handle.take() {
                if let Err(payload) = handle.join() {
                    return Err(EvalError::worker_failure(&w.name, panic_message(&*payload)).into());
                }
            }
        }
        Ok(())
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Err(e) = self.finish_submitting() {
            tracing::debug!("Could not send stop sentinels during shutdown: {e:#}");
        }
        // closing the queue also wakes workers whose sentinel got lost
        self.tasks.take();

        let deadline = Instant::now() + SHUTDOWN_GRACE;
        for w in &mut self.workers {
            let Some(handle) = w.handle.take() else { continue };

            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(10));
            }

            if handle.is_finished() {
                if let Err(payload) = handle.join() {
                    tracing::warn!("{} panicked: {}", w.name, panic_message(&*payload));
                }
            } else {
                tracing::warn!("{} did not stop within {:?}; detaching it", w.name, SHUTDOWN_GRACE);
            }
        }
    }
}

// ─── Worker thread ────────────────────────────────────────────────────────────
struct WorkerContext<F> {
    id:        usize,
    name:      String,
    device:    ComputeDevice,
    params:    Arc<ParameterSet>,
    options:   Arc<ModelOptions>,
    builder:   Arc<F>,
    tasks:     Arc<Mutex<Receiver<Task>>>,
    results:   Sender<WorkerMessage>,
    cancelled: Arc<AtomicBool>,
}

fn run_worker<F: CostFunctionBuilder>(ctx: WorkerContext<F>) {
    if let Err(e) = worker_loop(&ctx) {
        tracing::error!("{} failed: {e:#}", ctx.name);
        // the coordinator may already be gone; nothing left to tell
        let _ = ctx.results.send(WorkerMessage::Failed {
            worker: ctx.id,
            reason: format!("{e:#}"),
        });
    }
}

fn worker_loop<F: CostFunctionBuilder>(ctx: &WorkerContext<F>) -> Result<()> {
    tracing::info!("Building cost function on {} ({})", ctx.device, ctx.name);
    let cost_fn = ctx
        .builder
        .build(&ctx.params, &ctx.options, ctx.device)
        .with_context(|| format!("building the cost function on {}", ctx.device))?;

    let mut processed = 0usize;
    loop {
        let task = {
            let receiver = ctx.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            receiver.recv()
        };

        match task {
            Ok(Task::Batch(batch)) => {
                // Cancellation is only seen between tasks: a forward pass
                // already running cannot be interrupted, but the queued
                // batches behind it are drained without being scored.
                if ctx.cancelled.load(Ordering::SeqCst) {
                    continue;
                }
                let cost = cost_fn.cost(&batch)?;
                processed += 1;
                if ctx.results.send(WorkerMessage::Cost { worker: ctx.id, cost }).is_err() {
                    break;
                }
            }
            // Stop sentinel, or the queue was closed under us
            Ok(Task::Stop) | Err(_) => break,
        }
    }

    tracing::debug!("{} finished after {} batches", ctx.name, processed);
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
