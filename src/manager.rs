use std::cell::RefCell;
use std::rc::Rc;
use tracing::debug;

use crate::models::{ApplicationPatch, ApplicationRecord};
use crate::notify::{Notifier, Subscription};
use crate::store::ApplicationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Uninitialized,
    Loaded,
}

/// One consumer's in-memory copy of the application list.
///
/// Every mutation is written through to the store and then published, so
/// there is never unpersisted local state to reconcile: external changes
/// simply replace the list.
pub struct CollectionManager {
    store: Rc<ApplicationStore>,
    notifier: Rc<Notifier>,
    records: Rc<RefCell<Vec<ApplicationRecord>>>,
    state: ManagerState,
    subscription: Option<Subscription>,
}

impl CollectionManager {
    pub fn new(store: Rc<ApplicationStore>, notifier: Rc<Notifier>) -> Self {
        Self {
            store,
            notifier,
            records: Rc::new(RefCell::new(Vec::new())),
            state: ManagerState::Uninitialized,
            subscription: None,
        }
    }

    pub fn state(&self) -> ManagerState {
        self.state
    }

    pub fn is_loaded(&self) -> bool {
        self.state == ManagerState::Loaded
    }

    /// Load from storage, seeding `default_sample` when nothing is stored.
    /// Calling it again reloads. A seed is saved and published like any
    /// other write so sibling managers pick it up.
    pub fn initialize(&mut self, default_sample: &[ApplicationRecord]) {
        let loaded = self.store.load();
        let seeded = loaded.is_empty() && !default_sample.is_empty();
        *self.records.borrow_mut() = if seeded {
            debug!(count = default_sample.len(), "seeding sample applications");
            default_sample.to_vec()
        } else {
            loaded
        };

        if self.subscription.is_none() {
            let records = Rc::downgrade(&self.records);
            self.subscription = Some(self.notifier.subscribe(move |list| {
                if let Some(records) = records.upgrade() {
                    *records.borrow_mut() = list.to_vec();
                }
            }));
        }
        self.state = ManagerState::Loaded;

        if seeded {
            self.commit(default_sample);
        }
    }

    fn ensure_loaded(&mut self) {
        if self.state == ManagerState::Uninitialized {
            self.initialize(&[]);
        }
    }

    /// Append a new record and return its id (one past the largest id, or 1).
    pub fn add(&mut self, patch: ApplicationPatch) -> i64 {
        self.ensure_loaded();
        let (id, snapshot) = {
            let mut records = self.records.borrow_mut();
            let id = records.iter().map(|r| r.id).fold(0, i64::max) + 1;
            records.push(patch.into_record(id));
            (id, records.clone())
        };
        self.commit(&snapshot);
        id
    }

    /// Merge `patch` into the record with `id`. Returns false if there is none.
    pub fn update(&mut self, id: i64, patch: &ApplicationPatch) -> bool {
        self.ensure_loaded();
        let snapshot = {
            let mut records = self.records.borrow_mut();
            let Some(record) = records.iter_mut().find(|r| r.id == id) else {
                return false;
            };
            patch.apply_to(record);
            records.clone()
        };
        self.commit(&snapshot);
        true
    }

    /// Remove the record with `id`. Returns false if there is none.
    pub fn remove(&mut self, id: i64) -> bool {
        self.ensure_loaded();
        let snapshot = {
            let mut records = self.records.borrow_mut();
            let before = records.len();
            records.retain(|r| r.id != id);
            if records.len() == before {
                return false;
            }
            records.clone()
        };
        self.commit(&snapshot);
        true
    }

    /// Take another context's list verbatim.
    pub fn on_external_change(&self, records: Vec<ApplicationRecord>) {
        *self.records.borrow_mut() = records;
    }

    pub fn records(&self) -> Vec<ApplicationRecord> {
        self.records.borrow().clone()
    }

    pub fn get(&self, id: i64) -> Option<ApplicationRecord> {
        self.records.borrow().iter().find(|r| r.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.borrow().is_empty()
    }

    // Persistence failures are logged by the store; the mutation stands.
    fn commit(&self, records: &[ApplicationRecord]) {
        self.store.save(records);
        self.notifier.publish(records);
    }
}
