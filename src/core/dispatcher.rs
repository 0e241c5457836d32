//! Runs blocking work on a worker pool and hands the results back to one consumer.
//!
//! Work runs in parallel on a rayon pool. Finished work is queued on a channel,
//! and the single consumer (a UI tick, an event-loop iteration or a dedicated
//! task) drains that queue, running each completion callback against its own
//! `&mut` context. Callbacks therefore never run concurrently with each other
//! or with the consumer.

use super::CoreError;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Default pool size multiplier over the available hardware threads.
pub const DEFAULT_THREADS_PER_CORE: usize = 4;

/// A failure inside submitted work, delivered to the consumer instead of a result.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The work returned an error.
    #[error("{label} failed: {source:#}")]
    Failed {
        label: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The work panicked. The pool thread survives.
    #[error("{label} panicked: {message}")]
    Panicked { label: &'static str, message: String },
}

type Callback<C> = Box<dyn FnOnce(&mut C) + Send + 'static>;

/// A finished piece of work waiting to be delivered to the consumer.
pub struct Completed<C> {
    callback: Callback<C>,
    in_flight: Arc<AtomicUsize>,
}

impl<C> Completed<C> {
    /// Runs the completion callback against the consumer's context.
    pub fn deliver(self, ctx: &mut C) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.callback)(ctx);
    }
}

/// A bounded worker pool whose results are consumed by a single owner of `C`.
pub struct Dispatcher<C> {
    pool: rayon::ThreadPool,
    completed_tx: mpsc::UnboundedSender<Completed<C>>,
    completed_rx: mpsc::UnboundedReceiver<Completed<C>>,
    in_flight: Arc<AtomicUsize>,
}

impl<C: 'static> Dispatcher<C> {
    /// Creates a dispatcher with `threads_per_core` workers per hardware thread.
    pub fn new(threads_per_core: usize) -> Result<Self, CoreError> {
        Self::with_threads(threads_per_core.max(1) * available_cores())
    }

    /// Creates a dispatcher with exactly `threads` workers.
    pub fn with_threads(threads: usize) -> Result<Self, CoreError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("dispatch-worker-{i}"))
            .build()?;
        let (completed_tx, completed_rx) = mpsc::unbounded_channel();

        tracing::debug!("Task dispatcher started with {} workers", pool.current_num_threads());
        Ok(Self {
            pool,
            completed_tx,
            completed_rx,
            in_flight: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Schedules `work` on the pool.
    ///
    /// `on_complete` runs exactly once on the consumer, receiving the result or
    /// the [`TaskError`] describing why there is none. Submissions are neither
    /// prioritized nor cancellable; completions arrive in completion order.
    pub fn submit<T, W, F>(&self, label: &'static str, work: W, on_complete: F)
    where
        T: Send + 'static,
        W: FnOnce() -> anyhow::Result<T> + Send + 'static,
        F: FnOnce(&mut C, Result<T, TaskError>) + Send + 'static,
    {
        let completed_tx = self.completed_tx.clone();
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::SeqCst);

        self.pool.spawn(move || {
            let outcome = match panic::catch_unwind(AssertUnwindSafe(work)) {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(source)) => Err(TaskError::Failed { label, source }),
                Err(payload) => Err(TaskError::Panicked {
                    label,
                    message: panic_message(payload.as_ref()),
                }),
            };
            if let Err(e) = &outcome {
                tracing::warn!("Background task {}", e);
            }

            let completed = Completed {
                callback: Box::new(move |ctx: &mut C| on_complete(ctx, outcome)),
                in_flight,
            };
            if completed_tx.send(completed).is_err() {
                tracing::debug!("Consumer is gone, dropping result of {}", label);
            }
        });
    }

    /// Takes the next finished item without waiting.
    pub fn try_take(&mut self) -> Option<Completed<C>> {
        self.completed_rx.try_recv().ok()
    }

    /// Waits for the next finished item. Returns `None` at once when nothing is pending.
    pub async fn next(&mut self) -> Option<Completed<C>> {
        if self.pending() == 0 {
            return self.try_take();
        }
        self.completed_rx.recv().await
    }

    /// Submitted work whose completion has not been delivered yet.
    pub fn pending(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub fn worker_count(&self) -> usize {
        self.pool.current_num_threads()
    }
}

/// The number of hardware threads, or 1 if unknown.
pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
