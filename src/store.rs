use std::cell::RefCell;
use std::rc::Rc;
use tracing::{debug, warn};

use crate::models::ApplicationRecord;
use crate::storage::SlotStorage;

pub const DEFAULT_STORAGE_KEY: &str = "jobflow_applications";

/// Raised when the slot changed underneath us, i.e. another context wrote it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
}

/// Parse a raw slot value. `None` for malformed JSON or the wrong shape.
pub fn parse_records(raw: &str) -> Option<Vec<ApplicationRecord>> {
    serde_json::from_str(raw).ok()
}

/// Reads and writes the application list in one storage slot.
///
/// Storage is a best-effort cache: reads that fail yield an empty list and
/// writes that fail are logged and dropped. Nothing here returns an error.
pub struct ApplicationStore {
    backend: Rc<dyn SlotStorage>,
    key: String,
    /// Raw value this context last wrote or was told about; anything else in
    /// the slot came from somewhere else.
    last_seen: RefCell<Option<String>>,
}

impl ApplicationStore {
    pub fn new(backend: Rc<dyn SlotStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let last_seen = backend.get_item(&key).ok().flatten();
        Self {
            backend,
            key,
            last_seen: RefCell::new(last_seen),
        }
    }

    pub fn load(&self) -> Vec<ApplicationRecord> {
        let raw = match self.backend.get_item(&self.key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read applications from storage");
                return Vec::new();
            }
        };
        // last_seen only moves on our own writes and on polls
        let Some(raw) = raw else {
            return Vec::new();
        };
        match parse_records(&raw) {
            Some(records) => {
                debug!(key = %self.key, count = records.len(), "loaded applications");
                records
            }
            None => {
                warn!(key = %self.key, "stored applications are malformed, starting empty");
                Vec::new()
            }
        }
    }

    /// Replace the slot with `records`. Returns whether the write landed.
    pub fn save(&self, records: &[ApplicationRecord]) -> bool {
        let payload = match serde_json::to_string(records) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to serialize applications");
                return false;
            }
        };

        match self.backend.set_item(&self.key, &payload) {
            Ok(()) => {
                debug!(key = %self.key, count = records.len(), bytes = payload.len(), "saved applications");
                *self.last_seen.borrow_mut() = Some(payload);
                true
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to write applications to storage");
                false
            }
        }
    }

    /// Drop the slot entirely.
    pub fn clear(&self) -> bool {
        match self.backend.remove_item(&self.key) {
            Ok(()) => {
                *self.last_seen.borrow_mut() = None;
                true
            }
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to clear applications from storage");
                false
            }
        }
    }

    /// Check whether someone else rewrote the slot since we last touched it.
    pub fn poll_external(&self) -> Option<StorageEvent> {
        let current = match self.backend.get_item(&self.key) {
            Ok(current) => current,
            Err(e) => {
                debug!(key = %self.key, error = %e, "storage poll failed");
                return None;
            }
        };

        let mut last_seen = self.last_seen.borrow_mut();
        if *last_seen == current {
            return None;
        }
        let old_value = std::mem::replace(&mut *last_seen, current.clone());
        Some(StorageEvent {
            key: self.key.clone(),
            old_value,
            new_value: current,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApplicationPatch;
    use crate::storage::MemoryStorage;

    fn store_with(backend: Rc<MemoryStorage>) -> ApplicationStore {
        ApplicationStore::new(backend, DEFAULT_STORAGE_KEY)
    }

    #[test]
    fn test_load_missing_slot_is_empty() {
        let store = store_with(Rc::new(MemoryStorage::new()));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_save_then_load_returns_same_records() {
        let store = store_with(Rc::new(MemoryStorage::new()));
        let records = vec![
            ApplicationPatch::new("Acme", "Engineer").status("Interview").into_record(1),
            ApplicationPatch::new("Globex", "Designer").into_record(4),
        ];
        assert!(store.save(&records));
        assert_eq!(store.load(), records);
    }

    #[test]
    fn test_malformed_or_wrong_shape_loads_empty() {
        let backend = Rc::new(MemoryStorage::new());
        let store = store_with(backend.clone());

        for raw in ["{not json", r#"{"id":1}"#, r#"[1,2,3]"#, r#"[{"id":"one"}]"#] {
            backend.set_item(DEFAULT_STORAGE_KEY, raw).unwrap();
            assert!(store.load().is_empty(), "expected empty for {raw}");
        }
    }

    #[test]
    fn test_write_failure_is_swallowed() {
        let backend = Rc::new(MemoryStorage::with_quota(64));
        let store = store_with(backend.clone());
        let small = vec![ApplicationPatch::new("A", "B").into_record(1)];
        assert!(store.save(&small));

        let big = vec![
            ApplicationPatch::new("A", "B").notes("x".repeat(200)).into_record(1),
        ];
        assert!(!store.save(&big));
        // previous value survives
        assert_eq!(store.load(), small);
    }

    #[test]
    fn test_disabled_storage_reads_empty() {
        let backend = Rc::new(MemoryStorage::new());
        backend.set_item(DEFAULT_STORAGE_KEY, "[]").unwrap();
        backend.set_disabled(true);
        let store = store_with(backend);
        assert!(store.load().is_empty());
        assert!(!store.save(&[]));
        assert!(!store.clear());
    }

    #[test]
    fn test_poll_ignores_own_writes_and_reports_foreign_ones() {
        let backend = Rc::new(MemoryStorage::new());
        let ours = store_with(backend.clone());
        let theirs = store_with(backend.clone());

        assert!(ours.save(&[]));
        assert_eq!(ours.poll_external(), None);

        let event = theirs.poll_external().expect("other context sees the write");
        assert_eq!(event.key, DEFAULT_STORAGE_KEY);
        assert_eq!(event.old_value, None);
        assert_eq!(event.new_value.as_deref(), Some("[]"));
        assert_eq!(theirs.poll_external(), None);

        assert!(theirs.clear());
        let event = ours.poll_external().unwrap();
        assert_eq!(event.old_value.as_deref(), Some("[]"));
        assert_eq!(event.new_value, None);
    }

    #[test]
    fn test_load_does_not_swallow_foreign_write() {
        let backend = Rc::new(MemoryStorage::new());
        let ours = store_with(backend.clone());
        let theirs = store_with(backend);

        let records = vec![ApplicationPatch::new("Acme", "Engineer").into_record(1)];
        assert!(theirs.save(&records));
        assert_eq!(ours.load(), records);

        let event = ours.poll_external().expect("write still reported after load");
        assert_eq!(event.old_value, None);
        assert!(event.new_value.is_some());
        assert_eq!(ours.poll_external(), None);
    }

    #[test]
    fn test_load_tolerates_loosely_typed_records() {
        let backend = Rc::new(MemoryStorage::new());
        backend
            .set_item(
                DEFAULT_STORAGE_KEY,
                r#"[{"id":1,"company":null,"jobTitle":"SE","salary":120000},{"uniqueNo":"2","company":"Acme"}]"#,
            )
            .unwrap();
        let loaded = store_with(backend).load();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].company, "");
        assert_eq!(loaded[0].salary.as_deref(), Some("120000"));
        assert_eq!(loaded[1].id, 2);
    }

    #[test]
    fn test_existing_value_is_not_reported_as_change() {
        let backend = Rc::new(MemoryStorage::new());
        backend.set_item(DEFAULT_STORAGE_KEY, "[]").unwrap();
        let store = store_with(backend);
        assert_eq!(store.poll_external(), None);
    }
}
