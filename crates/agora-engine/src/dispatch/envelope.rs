//! Request envelope and its completion channel
//!
//! An envelope is built once per submission, consumed by exactly one
//! worker, and answered exactly once through its oneshot sender.

use agora_core::errors::{ExError, ExErrorKind};
use agora_core::{Actor, Mutation, MutationOutcome};
use agora_core_types::{RequestContext, RequestId};
use serde::Serialize;
use tokio::sync::oneshot;

type Result<T> = std::result::Result<T, ExError>;

/// Successful completion of one envelope
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Receipt {
    pub request_id: RequestId,
    /// Worker that executed the mutation
    pub worker_id: usize,
    pub outcome: MutationOutcome,
}

pub(crate) type Completion = oneshot::Sender<Result<Receipt>>;

/// One mutation in flight between a caller and a worker
#[derive(Debug)]
pub struct Envelope {
    pub context: RequestContext,
    pub actor: Actor,
    pub mutation: Mutation,
    pub(crate) completion: Completion,
}

impl Envelope {
    pub(crate) fn new(
        context: RequestContext,
        actor: Actor,
        mutation: Mutation,
    ) -> (Self, oneshot::Receiver<Result<Receipt>>) {
        let (completion, receiver) = oneshot::channel();
        (
            Self {
                context,
                actor,
                mutation,
                completion,
            },
            receiver,
        )
    }
}

/// Caller side of a dispatched envelope
///
/// Dropping it stops waiting but does not cancel the work; the worker still
/// executes the mutation and its reply is discarded.
#[derive(Debug)]
pub struct PendingCompletion {
    request_id: RequestId,
    worker_id: usize,
    receiver: oneshot::Receiver<Result<Receipt>>,
}

impl PendingCompletion {
    pub(crate) fn new(
        request_id: RequestId,
        worker_id: usize,
        receiver: oneshot::Receiver<Result<Receipt>>,
    ) -> Self {
        Self {
            request_id,
            worker_id,
            receiver,
        }
    }

    pub fn request_id(&self) -> &RequestId {
        &self.request_id
    }

    /// Worker the envelope was queued on
    pub fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Wait for the single result of this envelope
    ///
    /// # Errors
    /// The executor's error, or `WorkerLost` if the worker went away
    /// without answering.
    pub async fn wait(self) -> Result<Receipt> {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => Err(ExError::new(ExErrorKind::WorkerLost)
                .with_op("await_completion")
                .with_request_id(self.request_id)
                .with_entity_id(format!("worker:{}", self.worker_id))
                .with_message("completion channel closed without a result")),
        }
    }
}
