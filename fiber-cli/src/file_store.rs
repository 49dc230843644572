//! JSON-file implementation of the vitality document store.
use fiber_vitality::{
    StoredVitality, TombRecord, UserEntry, UserVitality, VitalityStore, WriteOutcome,
    next_revision,
};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store file {} is not valid JSON: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    users: BTreeMap<String, UserEntry>,
}

/// Whole-file document store. Every write goes to a sibling temp file and is
/// renamed into place, so a retirement's archive insert and record clear land
/// together or not at all.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<StoreFile, FileStoreError> {
        let raw = match retry_once(|| fs::read_to_string(&self.path)) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(StoreFile::default()),
            Err(source) => {
                return Err(FileStoreError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        if raw.trim().is_empty() {
            return Ok(StoreFile::default());
        }
        serde_json::from_str(&raw).map_err(|source| FileStoreError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn write(&self, file: &StoreFile) -> Result<(), FileStoreError> {
        let json = serde_json::to_string_pretty(file).map_err(|source| FileStoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        let tmp = self.tmp_path();
        retry_once(|| {
            fs::write(&tmp, json.as_bytes())?;
            fs::rename(&tmp, &self.path)
        })
        .map_err(|source| FileStoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        debug!("wrote {} user(s) to {}", file.users.len(), self.path.display());
        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(std::ffi::OsStr::to_os_string)
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn conditional_write(
        &self,
        user_id: &str,
        expected_revision: Option<u64>,
        apply: impl FnOnce(&mut UserEntry),
    ) -> Result<WriteOutcome, FileStoreError> {
        let mut file = self.read()?;
        let current = file.users.get(user_id).map(|entry| entry.revision);
        let Some(revision) = next_revision(current, expected_revision) else {
            return Ok(WriteOutcome::Conflict { current });
        };
        let entry = file.users.entry(user_id.to_string()).or_default();
        entry.revision = revision;
        apply(entry);
        self.write(&file)?;
        Ok(WriteOutcome::Committed { revision })
    }
}

/// Run an I/O operation, retrying once on failures other than `NotFound`.
fn retry_once<T>(mut op: impl FnMut() -> std::io::Result<T>) -> std::io::Result<T> {
    match op() {
        Err(err) if err.kind() != ErrorKind::NotFound => {
            warn!("store I/O failed ({err}); retrying once");
            op()
        }
        other => other,
    }
}

impl VitalityStore for FileStore {
    type Error = FileStoreError;

    fn load(&self, user_id: &str) -> Result<Option<StoredVitality>, Self::Error> {
        Ok(self
            .read()?
            .users
            .remove(user_id)
            .map(|entry| StoredVitality {
                revision: entry.revision,
                doc: entry.doc,
            }))
    }

    fn save(
        &self,
        user_id: &str,
        doc: &UserVitality,
        expected_revision: Option<u64>,
    ) -> Result<WriteOutcome, Self::Error> {
        self.conditional_write(user_id, expected_revision, |entry| {
            entry.doc = doc.clone();
        })
    }

    fn retire(
        &self,
        user_id: &str,
        doc: &UserVitality,
        tomb: &TombRecord,
        expected_revision: u64,
    ) -> Result<WriteOutcome, Self::Error> {
        self.conditional_write(user_id, Some(expected_revision), |entry| {
            entry.doc = doc.clone();
            entry.tombs.push(tomb.clone());
        })
    }

    fn tombs(&self, user_id: &str) -> Result<Vec<TombRecord>, Self::Error> {
        Ok(self
            .read()?
            .users
            .remove(user_id)
            .map(|entry| entry.tombs)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, NaiveDate, Utc};
    use fiber_vitality::MonsterRecord;

    fn temp_store(label: &str) -> FileStore {
        let path = std::env::temp_dir().join(format!(
            "fiber-store-{label}-{}-{}.json",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos()
        ));
        FileStore::new(path)
    }

    fn doc(health: f64) -> UserVitality {
        let today = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        UserVitality {
            monster: Some(MonsterRecord::new("Gloop", "img", health, today)),
            ..UserVitality::default()
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let store = temp_store("missing");
        assert!(store.load("u1").unwrap().is_none());
        assert!(store.tombs("u1").unwrap().is_empty());
    }

    #[test]
    fn save_and_load_roundtrip_through_disk() {
        let store = temp_store("roundtrip");
        assert_eq!(
            store.save("u1", &doc(80.0), None).unwrap(),
            WriteOutcome::Committed { revision: 1 }
        );
        let reopened = FileStore::new(store.path());
        let loaded = reopened.load("u1").unwrap().unwrap();
        assert_eq!(loaded.revision, 1);
        assert_eq!(loaded.doc, doc(80.0));
        assert!(!store.tmp_path().exists());
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn stale_revision_conflicts() {
        let store = temp_store("conflict");
        store.save("u1", &doc(80.0), None).unwrap();
        store.save("u1", &doc(70.0), Some(1)).unwrap();
        assert_eq!(
            store.save("u1", &doc(60.0), Some(1)).unwrap(),
            WriteOutcome::Conflict { current: Some(2) }
        );
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn retire_writes_tomb_and_clears_monster() {
        let store = temp_store("retire");
        let alive = doc(-55.0);
        store.save("u1", &alive, None).unwrap();
        let monster = alive.monster.clone().unwrap();
        let died_at = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let tomb = TombRecord::from_monster(&monster, "test", died_at);
        let cleared = UserVitality {
            monster: None,
            ..alive
        };
        store.retire("u1", &cleared, &tomb, 1).unwrap();
        assert_eq!(store.tombs("u1").unwrap(), vec![tomb]);
        assert!(store.load("u1").unwrap().unwrap().doc.monster.is_none());
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn corrupt_file_reports_json_error() {
        let store = temp_store("corrupt");
        fs::write(store.path(), "{ nope").unwrap();
        let err = store.load("u1").unwrap_err();
        assert!(matches!(err, FileStoreError::Json { .. }));
        let _ = fs::remove_file(store.path());
    }
}
