use std::cell::RefCell;
use std::rc::{Rc, Weak};
use tracing::debug;

use crate::models::ApplicationRecord;
use crate::store::{parse_records, StorageEvent};

type Handler = Rc<RefCell<dyn FnMut(&[ApplicationRecord])>>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<(u64, Handler)>,
}

impl Registry {
    fn contains(&self, id: u64) -> bool {
        self.handlers.iter().any(|(h, _)| *h == id)
    }
}

/// Fan-out of "the application list changed" within one context.
///
/// Two signals feed subscribers: [`Notifier::publish`] from mutations made in
/// this context (already structured), and [`Notifier::deliver_storage_event`]
/// for writes made by other contexts (raw, parsed here).
pub struct Notifier {
    key: String,
    registry: Rc<RefCell<Registry>>,
}

/// Keeps a handler registered. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes the handler"]
pub struct Subscription {
    id: u64,
    registry: Weak<RefCell<Registry>>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.borrow_mut().handlers.retain(|(id, _)| *id != self.id);
        }
    }
}

impl Notifier {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            registry: Rc::new(RefCell::new(Registry::default())),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.registry.borrow().handlers.len()
    }

    pub fn subscribe(&self, handler: impl FnMut(&[ApplicationRecord]) + 'static) -> Subscription {
        let mut registry = self.registry.borrow_mut();
        let id = registry.next_id;
        registry.next_id += 1;
        let handler: Handler = Rc::new(RefCell::new(handler));
        registry.handlers.push((id, handler));
        Subscription {
            id,
            registry: Rc::downgrade(&self.registry),
        }
    }

    pub fn publish(&self, records: &[ApplicationRecord]) {
        self.dispatch(records);
    }

    /// Apply a cross-context change signal. Returns whether subscribers ran.
    pub fn deliver_storage_event(&self, event: &StorageEvent) -> bool {
        if event.key != self.key {
            debug!(key = %event.key, "ignoring storage event for another key");
            return false;
        }

        let records = match event.new_value.as_deref() {
            None => Vec::new(),
            Some(raw) => match parse_records(raw) {
                Some(records) => records,
                None => {
                    debug!(key = %event.key, "ignoring malformed storage event payload");
                    return false;
                }
            },
        };
        self.dispatch(&records);
        true
    }

    fn dispatch(&self, records: &[ApplicationRecord]) {
        // Handlers may (un)subscribe or publish while we iterate.
        let snapshot: Vec<(u64, Handler)> = self.registry.borrow().handlers.clone();

        for (id, handler) in snapshot {
            if !self.registry.borrow().contains(id) {
                continue;
            }
            match handler.try_borrow_mut() {
                Ok(mut handler) => (&mut *handler)(records),
                Err(_) => debug!(subscriber = id, "skipping re-entrant notification"),
            }
        }
    }
}
