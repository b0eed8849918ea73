//! Worker pool executing mutations against the store
//!
//! Each worker is a dedicated OS thread that owns one `StoreAdapter` and
//! drains its own bounded tokio queue with `blocking_recv`. Callers stay
//! async: they reserve a queue slot, hand over an envelope and suspend on
//! the envelope's oneshot receiver.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, PoisonError, RwLock};
use std::thread::JoinHandle;
use std::time::Instant;

use agora_core::errors::{ExError, ExErrorKind};
use agora_core::{log_op_end, log_op_error, log_op_start, validate_mutation};
use agora_core::{Actor, Mutation, MutationOutcome};
use agora_core_types::RequestContext;
use agora_store::StoreAdapter;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, error, info};

use super::envelope::{Envelope, PendingCompletion, Receipt};
use super::selector::RoundRobin;
use crate::commands::engine_command::{apply_mutation, ExecutorSettings};
use crate::config::{PoolConfig, SaturationPolicy};

type Result<T> = std::result::Result<T, ExError>;

/// Fixed-size pool of mutation workers
pub struct DispatchPool {
    /// One sender per worker, indexed by worker id; emptied on shutdown
    inboxes: RwLock<Vec<mpsc::Sender<Envelope>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    selector: RoundRobin,
    saturation: SaturationPolicy,
    queue_capacity: usize,
}

impl DispatchPool {
    /// Open one store per worker and start the worker threads
    ///
    /// `open_store` is called with each worker id before any thread starts,
    /// so a store that cannot be opened fails construction as a whole.
    ///
    /// # Errors
    /// `InvalidConfig` for a zero-sized pool, the opener's error, or `Io` if
    /// a thread cannot be spawned.
    pub fn start<F>(config: &PoolConfig, settings: ExecutorSettings, mut open_store: F) -> Result<Self>
    where
        F: FnMut(usize) -> Result<StoreAdapter>,
    {
        config.validate()?;

        let stores = (0..config.worker_count)
            .map(&mut open_store)
            .collect::<Result<Vec<_>>>()?;

        let mut inboxes = Vec::with_capacity(config.worker_count);
        let mut workers = Vec::with_capacity(config.worker_count);
        for (worker_id, store) in stores.into_iter().enumerate() {
            let (sender, receiver) = mpsc::channel(config.queue_capacity);
            workers.push(spawn_worker(worker_id, receiver, store, settings)?);
            inboxes.push(sender);
        }

        info!(
            worker_count = config.worker_count,
            queue_capacity = config.queue_capacity,
            saturation = ?config.saturation,
            "dispatch pool started"
        );

        Ok(Self {
            inboxes: RwLock::new(inboxes),
            workers: Mutex::new(workers),
            selector: RoundRobin::new(config.worker_count),
            saturation: config.saturation,
            queue_capacity: config.queue_capacity,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.selector.workers()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    pub fn saturation(&self) -> SaturationPolicy {
        self.saturation
    }

    pub fn is_closed(&self) -> bool {
        self.inboxes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }

    /// Validate and submit a mutation, then wait for its single result
    ///
    /// # Errors
    /// Validation and dispatch errors before enqueueing, otherwise the
    /// executor's error tagged with the envelope's request id.
    pub async fn submit(&self, actor: Actor, mutation: Mutation) -> Result<Receipt> {
        self.dispatch(actor, mutation).await?.wait().await
    }

    /// Validate and enqueue a mutation without waiting for the result
    ///
    /// # Errors
    /// - validation errors, before a worker is selected
    /// - `PoolSaturated` under `SaturationPolicy::Reject` when the selected
    ///   worker's queue is full
    /// - `PoolClosed` after `shutdown`
    pub async fn dispatch(&self, actor: Actor, mutation: Mutation) -> Result<PendingCompletion> {
        self.dispatch_with(RequestContext::new(), actor, mutation)
            .await
    }

    /// `dispatch` with a caller-supplied correlation context
    ///
    /// # Errors
    /// As `dispatch`.
    pub async fn dispatch_with(
        &self,
        context: RequestContext,
        actor: Actor,
        mutation: Mutation,
    ) -> Result<PendingCompletion> {
        let op = mutation.kind().as_str();
        validate_mutation(&actor, &mutation)?;

        let (worker_id, inbox) = self.select(op)?;

        let permit = match self.saturation {
            SaturationPolicy::Block => inbox.reserve().await.map_err(|_| closed(op))?,
            SaturationPolicy::Reject => inbox.try_reserve().map_err(|e| match e {
                TrySendError::Full(()) => ExError::new(ExErrorKind::PoolSaturated)
                    .with_op(op)
                    .with_entity_id(format!("worker:{}", worker_id))
                    .with_message("worker queue is full"),
                TrySendError::Closed(()) => closed(op),
            })?,
        };

        let request_id = context.request_id.clone();
        let (envelope, receiver) = Envelope::new(context, actor, mutation);
        permit.send(envelope);

        debug!(op, request_id = request_id.as_str(), worker_id, "envelope queued");
        Ok(PendingCompletion::new(request_id, worker_id, receiver))
    }

    fn select(&self, op: &str) -> Result<(usize, mpsc::Sender<Envelope>)> {
        let inboxes = self.inboxes.read().unwrap_or_else(PoisonError::into_inner);
        if inboxes.is_empty() {
            return Err(closed(op));
        }
        let worker_id = self.selector.next();
        inboxes
            .get(worker_id)
            .cloned()
            .map(|inbox| (worker_id, inbox))
            .ok_or_else(|| closed(op))
    }

    /// Close every queue, let workers drain what is queued, then join them
    ///
    /// Blocks the calling thread until the last worker exits. Later
    /// submissions fail with `PoolClosed`. Calling it twice is a no-op.
    pub fn shutdown(&self) {
        let inboxes = std::mem::take(&mut *self.inboxes.write().unwrap_or_else(PoisonError::into_inner));
        if inboxes.is_empty() {
            return;
        }
        drop(inboxes);

        let workers = std::mem::take(&mut *self.workers.lock().unwrap_or_else(PoisonError::into_inner));
        for (worker_id, handle) in workers.into_iter().enumerate() {
            if handle.join().is_err() {
                error!(worker_id, "worker thread panicked outside an envelope");
            }
        }
        info!("dispatch pool stopped");
    }
}

fn closed(op: &str) -> ExError {
    ExError::new(ExErrorKind::PoolClosed)
        .with_op(op)
        .with_message("dispatch pool is shut down")
}

fn spawn_worker(
    worker_id: usize,
    inbox: mpsc::Receiver<Envelope>,
    store: StoreAdapter,
    settings: ExecutorSettings,
) -> Result<JoinHandle<()>> {
    std::thread::Builder::new()
        .name(format!("agora-worker-{}", worker_id))
        .spawn(move || run_worker(worker_id, inbox, store, settings))
        .map_err(|e| {
            ExError::new(ExErrorKind::Io)
                .with_op("spawn_worker")
                .with_entity_id(format!("worker:{}", worker_id))
                .with_message(e.to_string())
        })
}

fn run_worker(
    worker_id: usize,
    mut inbox: mpsc::Receiver<Envelope>,
    mut store: StoreAdapter,
    settings: ExecutorSettings,
) {
    debug!(worker_id, "worker started");
    let mut handled: u64 = 0;
    while let Some(envelope) = inbox.blocking_recv() {
        execute(worker_id, &mut store, &settings, envelope);
        handled += 1;
    }
    debug!(worker_id, handled, "worker stopped");
}

/// Run one envelope and deliver exactly one completion for it
fn execute(
    worker_id: usize,
    store: &mut StoreAdapter,
    settings: &ExecutorSettings,
    envelope: Envelope,
) {
    let Envelope {
        context,
        actor,
        mutation,
        completion,
    } = envelope;
    let op = mutation.kind().as_str();
    let request_id = context.request_id.clone();

    log_op_start!(op, request_id = request_id.as_str(), worker_id = worker_id);
    let start = Instant::now();

    let result = run_guarded(op, || apply_mutation(store, actor, mutation, settings));
    let duration_ms = start.elapsed().as_millis() as u64;

    let completion_value = match result {
        Ok(outcome) => {
            log_op_end!(
                op,
                duration_ms = duration_ms,
                request_id = request_id.as_str(),
                worker_id = worker_id
            );
            Ok(Receipt {
                request_id,
                worker_id,
                outcome,
            })
        }
        Err(err) => {
            let mut err = err.with_request_id(request_id.clone());
            if let Some(trace_id) = context.trace_id {
                err = err.with_trace_id(trace_id);
            }
            log_op_error!(
                op,
                err.clone(),
                duration_ms = duration_ms,
                request_id = request_id.as_str(),
                worker_id = worker_id
            );
            Err(err)
        }
    };

    // The caller may have dropped its PendingCompletion
    let _ = completion.send(completion_value);
}

/// Turn a panic inside `f` into an `Internal` error for `op`
///
/// An open transaction is rolled back while unwinding.
fn run_guarded<F>(op: &str, f: F) -> Result<MutationOutcome>
where
    F: FnOnce() -> Result<MutationOutcome>,
{
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        Err(ExError::new(ExErrorKind::Internal)
            .with_op(op)
            .with_message(format!("executor panicked: {}", panic_message(payload.as_ref()))))
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panicking_executor_becomes_internal_error() {
        let err = run_guarded("create_post", || panic!("boom")).unwrap_err();

        assert_eq!(err.kind(), ExErrorKind::Internal);
        assert_eq!(err.op(), Some("create_post"));
        assert!(err.message().contains("executor panicked: boom"));
    }

    #[test]
    fn test_formatted_panic_payload_is_kept() {
        let err = run_guarded("cast_vote", || panic!("bad target {}", 7)).unwrap_err();

        assert!(err.message().contains("bad target 7"));
    }

    #[test]
    fn test_ok_and_err_pass_through_untouched() {
        let outcome = run_guarded("reset_all", || {
            Ok(MutationOutcome::ResetComplete { tables_cleared: 8 })
        })
        .unwrap();
        assert_eq!(outcome, MutationOutcome::ResetComplete { tables_cleared: 8 });

        let err = run_guarded("join_community", || Err(ExError::new(ExErrorKind::NotFound)))
            .unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::NotFound);
    }
}
