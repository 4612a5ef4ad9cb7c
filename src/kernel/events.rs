use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GridError, GridResult};

use super::Kernel;

/// Callback invoked with the parameters of a fired event.
pub type EventHandler = Arc<dyn Fn(&Kernel, &Value) + Send + Sync>;

/// Opaque token identifying one event subscription.
///
/// Slots are recycled, but every release bumps the slot generation, so a
/// token kept after `un_event` or `delete_event` can never match a newer
/// subscription that landed in the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Subscription {
    slot: u32,
    generation: u32,
}

#[derive(Debug, Default)]
struct Slot {
    generation: u32,
    event: Option<String>,
}

/// Pool of reusable subscription handles, each pointing back at the event
/// type it was taken for.
#[derive(Debug, Default)]
struct HandlePool {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl HandlePool {
    fn acquire(&mut self, event: &str) -> Subscription {
        let slot = match self.free.pop() {
            Some(slot) => slot,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let entry = &mut self.slots[slot as usize];
        entry.event = Some(event.to_string());
        Subscription {
            slot,
            generation: entry.generation,
        }
    }

    fn resolve(&self, handle: Subscription) -> Option<&str> {
        let entry = self.slots.get(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        entry.event.as_deref()
    }

    fn release(&mut self, handle: Subscription) -> Option<String> {
        let entry = self.slots.get_mut(handle.slot as usize)?;
        if entry.generation != handle.generation {
            return None;
        }
        let event = entry.event.take()?;
        entry.generation = entry.generation.wrapping_add(1);
        self.free.push(handle.slot);
        Some(event)
    }

    fn live(&self) -> usize {
        self.slots.iter().filter(|slot| slot.event.is_some()).count()
    }
}

#[derive(Default)]
struct EventType {
    subscribers: IndexMap<Subscription, EventHandler>,
}

/// Named event types and their subscribers.
#[derive(Default)]
pub(crate) struct EventBus {
    types: HashMap<String, EventType>,
    order: Vec<String>,
    pool: HandlePool,
}

impl EventBus {
    /// Registers an event type. Returns `false` when it already existed.
    pub fn create(&mut self, event: &str) -> GridResult<bool> {
        if event.is_empty() {
            return Err(GridError::InvalidArgument(
                "event type must not be empty".into(),
            ));
        }
        if self.types.contains_key(event) {
            return Ok(false);
        }
        self.types.insert(event.to_string(), EventType::default());
        self.order.push(event.to_string());
        Ok(true)
    }

    pub fn subscribe(&mut self, event: &str, handler: EventHandler) -> GridResult<Subscription> {
        let Some(subs) = self.types.get_mut(event) else {
            return Err(GridError::UnknownEvent(event.to_string()));
        };
        let handle = self.pool.acquire(event);
        subs.subscribers.insert(handle, handler);
        Ok(handle)
    }

    /// Drops a subscription. Unknown and already released handles are ignored.
    pub fn unsubscribe(&mut self, handle: Subscription) -> bool {
        let Some(event) = self.pool.release(handle) else {
            return false;
        };
        match self.types.get_mut(&event) {
            Some(subs) => subs.subscribers.shift_remove(&handle).is_some(),
            None => false,
        }
    }

    /// Snapshot of the handlers for `event`, in subscription order.
    pub fn handlers(&self, event: &str) -> GridResult<Vec<(Subscription, EventHandler)>> {
        let subs = self
            .types
            .get(event)
            .ok_or_else(|| GridError::UnknownEvent(event.to_string()))?;
        Ok(subs
            .subscribers
            .iter()
            .map(|(handle, handler)| (*handle, Arc::clone(handler)))
            .collect())
    }

    /// Removes an event type and releases every handle that referenced it.
    pub fn delete(&mut self, event: &str) -> bool {
        let Some(subs) = self.types.remove(event) else {
            return false;
        };
        for handle in subs.subscribers.keys() {
            self.pool.release(*handle);
        }
        self.order.retain(|name| name != event);
        true
    }

    pub fn subscriber_count(&self, event: &str) -> Option<usize> {
        self.types.get(event).map(|subs| subs.subscribers.len())
    }

    pub fn contains(&self, event: &str) -> bool {
        self.types.contains_key(event)
    }

    pub fn is_live(&self, handle: Subscription) -> bool {
        self.pool.resolve(handle).is_some()
    }

    pub fn types(&self) -> Vec<String> {
        self.order.clone()
    }

    pub fn live_handles(&self) -> usize {
        self.pool.live()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("types", &self.order)
            .field("live_handles", &self.live_handles())
            .finish()
    }
}
