use std::fmt;

use serde_json::{json, Value};
use thiserror::Error;

/// Faults raised by the kernel itself, either when something is registered
/// or while a message is being dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("event type not supported: '{0}'")]
    UnknownEvent(String),

    #[error("param expected: {0}")]
    MissingField(&'static str),

    #[error("action already exists: {0}")]
    DuplicateAction(String),

    #[error("action not supported: '{0}'")]
    ActionNotFound(String),

    #[error("action '{0}' has an empty entry in its child action list")]
    MalformedChain(String),
}

pub type GridResult<T> = Result<T, GridError>;

/// What an `on_error` continuation receives.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionFailure {
    /// A handler reported the error through [`Reply::error`](crate::Reply::error).
    Handler(Value),
    /// The dispatcher could not continue the chain.
    Dispatch(GridError),
}

impl ActionFailure {
    /// Payload published with the `error` event.
    pub fn to_value(&self) -> Value {
        match self {
            ActionFailure::Handler(info) => info.clone(),
            ActionFailure::Dispatch(err) => json!(err.to_string()),
        }
    }
}

impl fmt::Display for ActionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionFailure::Handler(Value::String(message)) => f.write_str(message),
            ActionFailure::Handler(info) => write!(f, "{info}"),
            ActionFailure::Dispatch(err) => write!(f, "{err}"),
        }
    }
}

impl From<GridError> for ActionFailure {
    fn from(err: GridError) -> Self {
        ActionFailure::Dispatch(err)
    }
}

/// Faults produced while loading or unloading a module. These never escape
/// the lifecycle manager as raw errors; they are published as events and
/// recorded against the module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModuleFault {
    #[error("can't load module {id}: {reason}")]
    Unresolved { id: String, reason: String },

    #[error("can't load module - it does not have this mandatory method: {id}.{method}")]
    MissingCapability { id: String, method: &'static str },

    #[error("module {id} failed to initialise: {reason}")]
    InitFailed { id: String, reason: String },

    #[error("module {id} failed to destroy cleanly: {reason}")]
    DestroyFailed { id: String, reason: String },

    #[error("module already loaded: {0}")]
    AlreadyLoaded(String),

    #[error("module previously failed to load: {0}")]
    PreviouslyFailed(String),
}

impl ModuleFault {
    pub fn module_id(&self) -> &str {
        match self {
            ModuleFault::Unresolved { id, .. }
            | ModuleFault::MissingCapability { id, .. }
            | ModuleFault::InitFailed { id, .. }
            | ModuleFault::DestroyFailed { id, .. } => id,
            ModuleFault::AlreadyLoaded(id) | ModuleFault::PreviouslyFailed(id) => id,
        }
    }
}
