use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::error::{ActionFailure, GridError, GridResult};
use crate::message::ActionMessage;

use super::Kernel;

/// Handler behind an action. It must eventually consume the [`Reply`] with
/// either `ok` or `error`; dropping it leaves the caller waiting forever.
pub type ActionFn = dyn Fn(&Kernel, &ActionMessage, Reply) + Send + Sync;

/// A registered action.
#[derive(Clone)]
pub struct Action {
    id: String,
    handler: Arc<ActionFn>,
}

impl Action {
    pub fn new<F>(id: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Kernel, &ActionMessage, Reply) + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Descriptor published with `action.created`.
    pub fn descriptor(&self) -> Value {
        json!({ "action": self.id })
    }

    pub(crate) fn invoke(&self, kernel: &Kernel, message: &ActionMessage, reply: Reply) {
        (self.handler)(kernel, message, reply)
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("id", &self.id).finish()
    }
}

/// The `ok`/`error` continuation pair handed to a handler. Consuming it
/// guarantees that at most one of the two is ever called.
pub struct Reply {
    on_ok: Box<dyn FnOnce(Option<Value>) + Send>,
    on_error: Box<dyn FnOnce(ActionFailure) + Send>,
}

impl Reply {
    pub(crate) fn new<S, E>(on_ok: S, on_error: E) -> Self
    where
        S: FnOnce(Option<Value>) + Send + 'static,
        E: FnOnce(ActionFailure) + Send + 'static,
    {
        Self {
            on_ok: Box::new(on_ok),
            on_error: Box::new(on_error),
        }
    }

    /// Signals success, optionally with result data.
    pub fn ok(self, data: impl Into<Option<Value>>) {
        (self.on_ok)(data.into())
    }

    /// Signals success without data.
    pub fn done(self) {
        (self.on_ok)(None)
    }

    /// Signals a handler-level error. The remainder of the chain is skipped.
    pub fn error(self, info: impl Into<Value>) {
        (self.on_error)(ActionFailure::Handler(info.into()))
    }

    /// Completes with `data` or reports the error's message.
    pub fn finish<E: fmt::Display>(self, result: Result<Option<Value>, E>) {
        match result {
            Ok(data) => self.ok(data),
            Err(err) => self.error(err.to_string()),
        }
    }

    pub(crate) fn fail(self, failure: ActionFailure) {
        (self.on_error)(failure)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Reply")
    }
}

/// Action id to handler, in registration order.
#[derive(Debug, Default)]
pub(crate) struct ActionRegistry {
    actions: IndexMap<String, Action>,
}

impl ActionRegistry {
    pub fn insert(&mut self, action: Action) -> GridResult<Action> {
        if action.id.is_empty() {
            return Err(GridError::MissingField("action"));
        }
        if self.actions.contains_key(&action.id) {
            return Err(GridError::DuplicateAction(action.id));
        }
        self.actions.insert(action.id.clone(), action.clone());
        Ok(action)
    }

    pub fn remove(&mut self, id: &str) -> Option<Action> {
        self.actions.shift_remove(id)
    }

    pub fn get(&self, id: &str) -> Option<Action> {
        self.actions.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.actions.contains_key(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }
}
