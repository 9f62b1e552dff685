//! Error types for the command crate.

use robohr_core::ErrorKind;
use robohr_store::StoreError;
use thiserror::Error;

/// Errors raised while building the action registry.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("action already registered: {0}")]
    DuplicateAction(String),

    #[error("invalid descriptor for action {action}: {reason}")]
    InvalidDescriptor { action: String, reason: String },
}

/// Errors returned by action handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The store refused the operation; the reason is meant for the end user.
    #[error("{0}")]
    Rejected(String),

    /// A name or id lookup came back empty.
    #[error("{0}")]
    NotFound(String),

    /// The store failed unexpectedly.
    #[error("backend failure: {0}")]
    Backend(String),
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Rejected(reason) => HandlerError::Rejected(reason),
            StoreError::Backend(reason) => HandlerError::Backend(reason),
        }
    }
}

/// Unexpected faults inside the dispatcher. Recoverable outcomes are
/// reported as failed `CommandResult`s instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("store backend failed while running {action}: {reason}")]
    Backend { action: String, reason: String },
}

/// Why the intent client could not produce an intent.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecognitionFailure {
    /// Network failure, timeout or error status from the service.
    #[error("intent recognition service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("command text is empty")]
    EmptyInput,

    /// The service answered with something that is not an intent.
    #[error("malformed response from intent recognition service: {0}")]
    MalformedResponse(String),
}

impl RecognitionFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RecognitionFailure::EmptyInput => ErrorKind::MissingParameter,
            RecognitionFailure::ServiceUnavailable(_) | RecognitionFailure::MalformedResponse(_) => {
                ErrorKind::ServiceUnavailable
            }
        }
    }

    /// Whether the failure says something about the health of the service.
    pub fn affects_health(&self) -> bool {
        !matches!(self, RecognitionFailure::EmptyInput)
    }
}

/// Errors from the speech providers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpeechError {
    #[error("speech service unavailable: {0}")]
    Unavailable(String),

    #[error("speech support is disabled")]
    Disabled,

    #[error("audio payload is empty")]
    EmptyAudio,

    #[error("audio payload of {size} bytes exceeds the limit of {limit} bytes")]
    PayloadTooLarge { size: usize, limit: usize },

    #[error("malformed response from speech service: {0}")]
    MalformedResponse(String),
}

/// Faults that escape the gateway. The HTTP layer maps these to 5xx.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error("failed to start command server: {0}")]
    StartupFailed(String),

    #[error("internal error: {0}")]
    Internal(String),
}
