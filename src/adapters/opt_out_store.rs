use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::adapters::json_file::{read_or_default, write_atomic};
use crate::domain::models::normalize_recipient;
use crate::domain::ports::{OptOutStore, StoreError};

pub const OPT_OUTS_FILE_NAME: &str = "optouts.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct OptOutsFile {
    #[serde(default)]
    optouts: Vec<String>,
}

/// Read-through JSON file store: every lookup hits the file, so webhook writes are visible
/// to a run that is already in progress.
#[derive(Debug)]
pub struct JsonOptOutStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonOptOutStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn in_dir(data_dir: &Path) -> Self {
        Self::new(data_dir.join(OPT_OUTS_FILE_NAME))
    }

    fn update(&self, apply: impl FnOnce(&mut Vec<String>) -> bool) -> Result<(), StoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| StoreError::LockPoisoned)?;
        let mut file: OptOutsFile = read_or_default(&self.path)?;
        if apply(&mut file.optouts) {
            write_atomic(&self.path, &file)?;
        }
        Ok(())
    }
}

impl OptOutStore for JsonOptOutStore {
    fn is_opted_out(&self, recipient: &str) -> Result<bool, StoreError> {
        let normalized = normalize_recipient(recipient);
        if normalized.is_empty() {
            return Ok(false);
        }
        let file: OptOutsFile = read_or_default(&self.path)?;
        Ok(file.optouts.iter().any(|entry| entry == &normalized))
    }

    fn opt_out(&self, recipient: &str) -> Result<bool, StoreError> {
        let normalized = normalize_recipient(recipient);
        if normalized.is_empty() {
            return Ok(false);
        }
        self.update(|optouts| {
            if optouts.contains(&normalized) {
                false
            } else {
                optouts.push(normalized.clone());
                true
            }
        })?;
        Ok(true)
    }

    fn opt_in(&self, recipient: &str) -> Result<bool, StoreError> {
        let normalized = normalize_recipient(recipient);
        if normalized.is_empty() {
            return Ok(false);
        }
        self.update(|optouts| {
            let before = optouts.len();
            optouts.retain(|entry| entry != &normalized);
            optouts.len() != before
        })?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::JsonOptOutStore;
    use crate::domain::ports::OptOutStore;

    #[test]
    fn opt_out_then_opt_in_round_trip_through_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = JsonOptOutStore::in_dir(dir.path());

        assert!(!store.is_opted_out("+55 11 98765-4321").expect("lookup"));
        assert!(store.opt_out("+55 11 98765-4321").expect("opt out"));
        assert!(store.opt_out("5511987654321").expect("repeat opt out"));
        assert!(store.is_opted_out("5511987654321").expect("lookup"));

        let raw = std::fs::read_to_string(dir.path().join("optouts.json")).expect("file exists");
        assert_eq!(raw.matches("5511987654321").count(), 1);

        assert!(store.opt_in("5511987654321").expect("opt in"));
        assert!(!store.is_opted_out("+55 11 98765-4321").expect("lookup"));
    }

    #[test]
    fn sees_changes_written_by_another_handle() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let reader = JsonOptOutStore::in_dir(dir.path());
        let writer = JsonOptOutStore::in_dir(dir.path());

        assert!(!reader.is_opted_out("15551234567").expect("lookup"));
        writer.opt_out("15551234567").expect("opt out");

        assert!(reader.is_opted_out("15551234567").expect("lookup"));
    }

    #[test]
    fn ignores_identifiers_without_digits() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let store = JsonOptOutStore::in_dir(dir.path());

        assert!(!store.opt_out("unknown").expect("opt out"));
        assert!(!store.is_opted_out("unknown").expect("lookup"));
    }
}
