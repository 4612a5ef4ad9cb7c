//! Dispatch of an action message and its chain of children.
//!
//! A node runs its own handler first. If the handler succeeds and the node
//! has children, the children run one after another, each started once the
//! previous one has completed, depth first. Only the last leaf of the
//! tree surfaces data to the caller: every child except the last is
//! suppressed, and suppression is inherited by everything below it.

use std::sync::Arc;

use log::warn;
use parking_lot::Mutex;
use serde_json::Value;

use crate::error::{ActionFailure, GridError, GridResult};
use crate::message::ActionMessage;

use super::{Kernel, Reply};

/// Completion of a node: receives the data it surfaces upward.
pub(crate) type Done = Box<dyn FnOnce(Option<Value>) + Send>;

/// The caller's error continuation, shared by every node of one dispatch.
/// It fires at most once.
#[derive(Clone)]
pub(crate) struct FailSink(Arc<Mutex<Option<Box<dyn FnOnce(ActionFailure) + Send>>>>);

impl FailSink {
    pub fn new<E>(on_error: E) -> Self
    where
        E: FnOnce(ActionFailure) + Send + 'static,
    {
        Self(Arc::new(Mutex::new(Some(Box::new(on_error)))))
    }

    pub fn raise(&self, failure: ActionFailure) {
        let callback = self.0.lock().take();
        match callback {
            Some(callback) => callback(failure),
            None => warn!("dropping failure after the chain already failed: {failure}"),
        }
    }
}

/// Runs `message` with the given suppression flag.
///
/// Errors are returned only for faults detected before the node's handler
/// was invoked; everything after that travels through `done` or `fail`.
pub(crate) fn run(
    kernel: &Kernel,
    message: Arc<ActionMessage>,
    suppressed: bool,
    done: Done,
    fail: FailSink,
) -> GridResult<()> {
    let id = message
        .action_id()
        .ok_or(GridError::MissingField("action"))?;
    let action = kernel
        .lookup(id)
        .ok_or_else(|| GridError::ActionNotFound(id.to_string()))?;

    let chain_kernel = kernel.clone();
    let chain_message = Arc::clone(&message);
    let chain_fail = fail.clone();
    let reply = Reply::new(
        move |data| {
            if chain_message.has_children() {
                run_children(&chain_kernel, chain_message, 0, suppressed, done, chain_fail);
            } else {
                done(if suppressed { None } else { data });
            }
        },
        move |failure| fail.raise(failure),
    );
    action.invoke(kernel, &message, reply);
    Ok(())
}

/// Where a non-last child stands relative to the sibling loop.
enum Step {
    /// The child has not completed yet.
    Running,
    /// The child completed while the loop was still waiting on it.
    Finished,
    /// The loop gave up waiting; a late completion resumes from here.
    Detached(Done),
}

/// Runs the children of `parent` from `start` onward.
///
/// Children that complete synchronously are followed in a loop, so the
/// stack grows with the depth of the tree rather than with the number of
/// siblings. A child that completes later resumes the remaining siblings
/// from its own completion.
fn run_children(
    kernel: &Kernel,
    parent: Arc<ActionMessage>,
    start: usize,
    suppressed: bool,
    done: Done,
    fail: FailSink,
) {
    let last = parent.actions.len() - 1;
    let mut index = start;
    loop {
        let Some(child) = parent.actions[index].clone() else {
            let parent_id = parent.action_id().unwrap_or_default().to_string();
            fail.raise(ActionFailure::Dispatch(GridError::MalformedChain(parent_id)));
            return;
        };

        if index == last {
            start_child(kernel, child, suppressed, done, fail);
            return;
        }

        let step = Arc::new(Mutex::new(Step::Running));
        let resume_step = Arc::clone(&step);
        let resume_kernel = kernel.clone();
        let resume_parent = Arc::clone(&parent);
        let resume_fail = fail.clone();
        let next: Done = Box::new(move |_| {
            let previous = std::mem::replace(&mut *resume_step.lock(), Step::Finished);
            if let Step::Detached(done) = previous {
                run_children(
                    &resume_kernel,
                    resume_parent,
                    index + 1,
                    suppressed,
                    done,
                    resume_fail,
                );
            }
        });

        if !start_child(kernel, child, true, next, fail.clone()) {
            return;
        }
        let mut state = step.lock();
        if matches!(*state, Step::Finished) {
            index += 1;
            continue;
        }
        *state = Step::Detached(done);
        return;
    }
}

/// Starts one child. Returns `false` when it could not be dispatched.
fn start_child(
    kernel: &Kernel,
    child: ActionMessage,
    suppressed: bool,
    done: Done,
    fail: FailSink,
) -> bool {
    match run(kernel, Arc::new(child), suppressed, done, fail.clone()) {
        Ok(()) => true,
        Err(err) => {
            warn!("chain dispatch fault: {err}");
            fail.raise(ActionFailure::Dispatch(err));
            false
        }
    }
}
