use agora_core_types::{RequestId, TraceId};
use thiserror::Error;

/// Result type alias for domain-level validation
pub type Result<T> = std::result::Result<T, AgoraError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Every error that crosses the dispatch boundary is an `ExError` carrying
/// one of these kinds. Each kind maps to a stable code usable by the gateway
/// for status mapping and by tests for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExErrorKind {
    // Validation
    InvalidInput,
    InvalidTargetKind,
    InvalidVoteValue,
    InvalidParent,
    UnknownOperation,
    Unauthorised,

    // Conflict
    NotFound,
    AlreadyExists,
    ConstraintViolation,

    // Dispatch
    PoolSaturated,
    PoolClosed,
    /// The worker dropped the completion channel without answering
    WorkerLost,

    // Store
    StoreUnavailable,
    Persistence,
    Concurrency,
    Serialization,
    Io,

    // Configuration
    InvalidConfig,

    // Internal
    Internal,
}

/// Coarse grouping of error kinds, mirroring how each is surfaced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Rejected before an envelope is created
    Validation,
    /// Raised inside an atomic unit and rolled back
    Conflict,
    /// Raised by the pool before enqueueing
    Dispatch,
    /// The store failed for this one operation
    Store,
    Config,
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::InvalidTargetKind => "ERR_INVALID_TARGET_KIND",
            ExErrorKind::InvalidVoteValue => "ERR_INVALID_VOTE_VALUE",
            ExErrorKind::InvalidParent => "ERR_INVALID_PARENT",
            ExErrorKind::UnknownOperation => "ERR_UNKNOWN_OPERATION",
            ExErrorKind::Unauthorised => "ERR_UNAUTHORISED",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::AlreadyExists => "ERR_ALREADY_EXISTS",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::PoolSaturated => "ERR_POOL_SATURATED",
            ExErrorKind::PoolClosed => "ERR_POOL_CLOSED",
            ExErrorKind::WorkerLost => "ERR_WORKER_LOST",
            ExErrorKind::StoreUnavailable => "ERR_STORE_UNAVAILABLE",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Concurrency => "ERR_CONCURRENCY",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ExErrorKind::InvalidInput
            | ExErrorKind::InvalidTargetKind
            | ExErrorKind::InvalidVoteValue
            | ExErrorKind::InvalidParent
            | ExErrorKind::UnknownOperation
            | ExErrorKind::Unauthorised => ErrorCategory::Validation,
            ExErrorKind::NotFound
            | ExErrorKind::AlreadyExists
            | ExErrorKind::ConstraintViolation => ErrorCategory::Conflict,
            ExErrorKind::PoolSaturated | ExErrorKind::PoolClosed | ExErrorKind::WorkerLost => {
                ErrorCategory::Dispatch
            }
            ExErrorKind::StoreUnavailable
            | ExErrorKind::Persistence
            | ExErrorKind::Concurrency
            | ExErrorKind::Serialization
            | ExErrorKind::Io => ErrorCategory::Store,
            ExErrorKind::InvalidConfig => ErrorCategory::Config,
            ExErrorKind::Internal => ErrorCategory::Internal,
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification for programmatic handling plus the context
/// needed to tie the failure back to the request that caused it.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    entity_id: Option<String>,
    request_id: Option<RequestId>,
    trace_id: Option<TraceId>,
    message: String,
}

impl ExError {
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            entity_id: None,
            request_id: None,
            trace_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add entity ID context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add request ID context
    pub fn with_request_id(mut self, request_id: RequestId) -> Self {
        self.request_id = Some(request_id);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn category(&self) -> ErrorCategory {
        self.kind.category()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&RequestId> {
        self.request_id.as_ref()
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, " (request_id: {})", request_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain validation errors raised before a mutation reaches the pool
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgoraError {
    /// A required text field is empty or whitespace
    #[error("Field '{field}' must not be empty")]
    EmptyField { field: &'static str },

    #[error("Field '{field}' exceeds {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    /// Identifiers are positive database row ids
    #[error("Field '{field}' must be a positive id, got {value}")]
    NonPositiveId { field: &'static str, value: i64 },

    #[error("Invalid vote target kind: {value}")]
    InvalidTargetKind { value: String },

    #[error("Invalid vote value {value}, expected 1 or -1")]
    InvalidVoteValue { value: i64 },

    /// Parent comment does not exist or belongs to another post
    #[error("Comment {comment_id} is not a valid parent on post {post_id}")]
    InvalidParentComment { comment_id: i64, post_id: i64 },

    #[error("User {user_id} cannot subscribe to themselves")]
    SelfSubscription { user_id: i64 },

    /// Operation requires a resolved user identity
    #[error("Operation '{op}' requires an authenticated actor")]
    MissingActor { op: &'static str },

    #[error("Unknown operation kind: {kind}")]
    UnknownOperation { kind: String },

    #[error("Malformed payload for '{kind}': {message}")]
    MalformedPayload { kind: String, message: String },
}

impl From<AgoraError> for ExError {
    fn from(err: AgoraError) -> Self {
        let message = err.to_string();
        match err {
            AgoraError::EmptyField { field }
            | AgoraError::FieldTooLong { field, .. }
            | AgoraError::NonPositiveId { field, .. } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("validate")
                .with_entity_id(field)
                .with_message(message),

            AgoraError::InvalidTargetKind { .. } => ExError::new(ExErrorKind::InvalidTargetKind)
                .with_op("validate")
                .with_message(message),

            AgoraError::InvalidVoteValue { .. } => ExError::new(ExErrorKind::InvalidVoteValue)
                .with_op("validate")
                .with_message(message),

            AgoraError::InvalidParentComment { comment_id, .. } => {
                ExError::new(ExErrorKind::InvalidParent)
                    .with_op("create_comment")
                    .with_entity_id(comment_id.to_string())
                    .with_message(message)
            }

            AgoraError::SelfSubscription { user_id } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("subscribe_user")
                .with_entity_id(user_id.to_string())
                .with_message(message),

            AgoraError::MissingActor { op } => ExError::new(ExErrorKind::Unauthorised)
                .with_op(op)
                .with_message(message),

            AgoraError::UnknownOperation { .. } => ExError::new(ExErrorKind::UnknownOperation)
                .with_op("decode")
                .with_message(message),

            AgoraError::MalformedPayload { .. } => ExError::new(ExErrorKind::InvalidInput)
                .with_op("decode")
                .with_message(message),
        }
    }
}
