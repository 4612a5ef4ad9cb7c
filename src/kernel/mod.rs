//! The kernel: event bus, action registry and chain executor behind one
//! cloneable context object that is handed to every module.

mod actions;
mod chain;
mod events;

use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Value};

use crate::error::{ActionFailure, GridResult};
use crate::message::ActionMessage;

pub use actions::{Action, ActionFn, Reply};
pub use events::{EventHandler, Subscription};

use actions::ActionRegistry;
use chain::FailSink;
use events::EventBus;

/// Events every kernel defines at startup.
pub const BUILTIN_EVENTS: &[&str] = &[
    "data",
    "error",
    "reset",
    "task.started",
    "task.finished",
    "task.failed",
    "task.aborted",
    "action.created",
    "action.deleted",
    "module.loaded",
    "module.unloaded",
];

/// Result of a synchronous [`Kernel::call`].
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed(Option<Value>),
    Failed(ActionFailure),
    /// Some handler in the chain has not replied yet.
    Pending,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            Outcome::Completed(data) => data.as_ref(),
            _ => None,
        }
    }
}

struct KernelInner {
    events: RwLock<EventBus>,
    actions: RwLock<ActionRegistry>,
}

/// Shared handle to the kernel. Cloning is cheap; every clone talks to the
/// same registries.
///
/// No internal lock is held while a handler runs, so handlers are free to
/// call back into the kernel.
#[derive(Clone)]
pub struct Kernel {
    inner: Arc<KernelInner>,
}

impl Default for Kernel {
    fn default() -> Self {
        Self::new()
    }
}

impl Kernel {
    /// Creates a kernel with the built-in events and the `action.get` and
    /// `reset` actions.
    pub fn new() -> Self {
        let mut events = EventBus::default();
        for event in BUILTIN_EVENTS {
            let _ = events.create(event);
        }

        let mut actions = ActionRegistry::default();
        let builtins = [
            Action::new("action.get", |kernel, _, reply| {
                reply.ok(json!({ "actions": kernel.action_ids() }))
            }),
            Action::new("reset", |kernel, _, reply| {
                kernel.notify("reset", json!({}));
                reply.done()
            }),
        ];
        for action in builtins {
            let _ = actions.insert(action);
        }

        Self {
            inner: Arc::new(KernelInner {
                events: RwLock::new(events),
                actions: RwLock::new(actions),
            }),
        }
    }

    /// Defines an event type. Defining a known type again is a no-op.
    pub fn create_event(&self, event: &str) -> GridResult<()> {
        if self.inner.events.write().create(event)? {
            debug!("event created: {event}");
        }
        Ok(())
    }

    /// Subscribes to an event type that has already been created.
    pub fn on_event<F>(&self, event: &str, handler: F) -> GridResult<Subscription>
    where
        F: Fn(&Kernel, &Value) + Send + Sync + 'static,
    {
        self.inner.events.write().subscribe(event, Arc::new(handler))
    }

    /// Drops a subscription. Unknown or stale handles are ignored.
    pub fn un_event(&self, handle: Subscription) {
        self.inner.events.write().unsubscribe(handle);
    }

    /// Invokes every subscriber of `event`, in subscription order.
    /// Missing params are delivered as an empty object. A subscription
    /// dropped by an earlier handler of the same fire is skipped.
    pub fn fire_event(&self, event: &str, params: Option<Value>) -> GridResult<()> {
        let handlers = self.inner.events.read().handlers(event)?;
        if handlers.is_empty() {
            return Ok(());
        }
        let params = match params {
            Some(Value::Null) | None => json!({}),
            Some(params) => params,
        };
        for (handle, handler) in handlers {
            if self.is_subscribed(handle) {
                handler(self, &params);
            }
        }
        Ok(())
    }

    /// Removes an event type along with all of its subscriptions.
    pub fn delete_event(&self, event: &str) {
        if self.inner.events.write().delete(event) {
            debug!("event deleted: {event}");
        }
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.inner.events.read().contains(event)
    }

    pub fn event_types(&self) -> Vec<String> {
        self.inner.events.read().types()
    }

    pub fn subscriber_count(&self, event: &str) -> Option<usize> {
        self.inner.events.read().subscriber_count(event)
    }

    /// True while `handle` still refers to a live subscription.
    pub fn is_subscribed(&self, handle: Subscription) -> bool {
        self.inner.events.read().is_live(handle)
    }

    /// Fires a kernel notification, tolerating a host that deleted the
    /// event type.
    pub(crate) fn notify(&self, event: &str, params: Value) {
        if let Err(err) = self.fire_event(event, Some(params)) {
            debug!("notification skipped: {err}");
        }
    }

    /// Registers an action and publishes `action.created`.
    pub fn create_action<F>(&self, id: impl Into<String>, handler: F) -> GridResult<Action>
    where
        F: Fn(&Kernel, &ActionMessage, Reply) + Send + Sync + 'static,
    {
        self.register(Action::new(id, handler))
    }

    /// Registers a prepared [`Action`] and publishes `action.created`.
    pub fn register(&self, action: Action) -> GridResult<Action> {
        let action = self.inner.actions.write().insert(action)?;
        debug!("action created: {}", action.id());
        self.notify("action.created", action.descriptor());
        Ok(action)
    }

    /// Removes an action. Unknown ids are ignored.
    pub fn delete_action(&self, id: &str) {
        let removed = self.inner.actions.write().remove(id);
        if removed.is_some() {
            debug!("action deleted: {id}");
            self.notify("action.deleted", json!({ "action": id }));
        }
    }

    pub fn has_action(&self, id: &str) -> bool {
        self.inner.actions.read().contains(id)
    }

    pub fn action_ids(&self) -> Vec<String> {
        self.inner.actions.read().ids()
    }

    pub(crate) fn lookup(&self, id: &str) -> Option<Action> {
        self.inner.actions.read().get(id)
    }

    /// Dispatches `message` and its chain.
    ///
    /// `on_success` receives the data of the last leaf once the whole chain
    /// has completed; `on_error` receives the first failure. Each is called
    /// at most once, and only one of them. A message without an `action`
    /// succeeds immediately.
    ///
    /// An unknown root action is returned as an error without invoking
    /// either callback.
    pub fn send<S, E>(&self, message: ActionMessage, on_success: S, on_error: E) -> GridResult<()>
    where
        S: FnOnce(Option<Value>) + Send + 'static,
        E: FnOnce(ActionFailure) + Send + 'static,
    {
        if message.action_id().is_none() {
            on_success(None);
            return Ok(());
        }

        let data_kernel = self.clone();
        let done = Box::new(move |data: Option<Value>| {
            if let Some(data) = &data {
                data_kernel.notify("data", json!({ "data": data }));
            }
            on_success(data);
        });
        let error_kernel = self.clone();
        let fail = FailSink::new(move |failure: ActionFailure| {
            warn!("action failed: {failure}");
            error_kernel.notify("error", json!({ "error": failure.to_value() }));
            on_error(failure);
        });

        chain::run(self, Arc::new(message), false, done, fail).map_err(|err| {
            warn!("dispatch fault: {err}");
            err
        })
    }

    /// Dispatches `message` without caring about the outcome.
    pub fn dispatch(&self, message: ActionMessage) -> GridResult<()> {
        self.send(message, |_| {}, |_| {})
    }

    /// Dispatches `message` and reports how it ended by the time the call
    /// returns.
    pub fn call(&self, message: ActionMessage) -> GridResult<Outcome> {
        let outcome = Arc::new(Mutex::new(Outcome::Pending));
        let ok_outcome = Arc::clone(&outcome);
        let err_outcome = Arc::clone(&outcome);
        self.send(
            message,
            move |data| *ok_outcome.lock() = Outcome::Completed(data),
            move |failure| *err_outcome.lock() = Outcome::Failed(failure),
        )?;
        let result = outcome.lock().clone();
        Ok(result)
    }
}

impl fmt::Debug for Kernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Kernel")
            .field("events", &*self.inner.events.read())
            .field("actions", &self.action_ids())
            .finish()
    }
}
