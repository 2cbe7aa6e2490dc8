use std::rc::Rc;
use tracing::debug;

use crate::manager::CollectionManager;
use crate::notify::Notifier;
use crate::storage::SlotStorage;
use crate::store::ApplicationStore;

/// Everything one running front end shares: a single store over the slot and
/// a single notifier. Build it once at start-up and hand managers out of it.
pub struct AppContext {
    store: Rc<ApplicationStore>,
    notifier: Rc<Notifier>,
}

impl AppContext {
    pub fn new(backend: Rc<dyn SlotStorage>, key: &str) -> Self {
        Self {
            store: Rc::new(ApplicationStore::new(backend, key)),
            notifier: Rc::new(Notifier::new(key)),
        }
    }

    pub fn store(&self) -> &ApplicationStore {
        &self.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn manager(&self) -> CollectionManager {
        CollectionManager::new(self.store.clone(), self.notifier.clone())
    }

    /// Pick up writes made by other contexts. Returns whether subscribers
    /// received a new list.
    pub fn pump(&self) -> bool {
        match self.store.poll_external() {
            Some(event) => {
                debug!(key = %event.key, "slot changed externally");
                self.notifier.deliver_storage_event(&event)
            }
            None => false,
        }
    }

    /// End the collection's lifetime: drop the slot and tell subscribers.
    pub fn clear(&self) -> bool {
        let cleared = self.store.clear();
        self.notifier.publish(&[]);
        cleared
    }
}
