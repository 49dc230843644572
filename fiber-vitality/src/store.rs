//! Document-store abstraction with optimistic concurrency.
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::convert::Infallible;
use std::rc::Rc;

use crate::monster::{TombRecord, UserVitality};

/// A user document together with the revision it was read at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredVitality {
    pub revision: u64,
    pub doc: UserVitality,
}

/// Result of a conditional write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOutcome {
    Committed { revision: u64 },
    /// The stored revision no longer matches what the writer read.
    Conflict { current: Option<u64> },
}

/// Revision a conditional write should commit at, or `None` on mismatch.
///
/// `expected == None` asserts the document does not exist yet.
#[must_use]
pub fn next_revision(current: Option<u64>, expected: Option<u64>) -> Option<u64> {
    if current == expected {
        Some(expected.map_or(1, |rev| rev.saturating_add(1)))
    } else {
        None
    }
}

/// Trait for abstracting persistence of vitality documents.
/// Platform-specific implementations should provide this.
pub trait VitalityStore {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Load the user's document.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn load(&self, user_id: &str) -> Result<Option<StoredVitality>, Self::Error>;

    /// Replace the user's document if its revision still equals `expected_revision`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written. A revision mismatch is
    /// reported as [`WriteOutcome::Conflict`], not as an error.
    fn save(
        &self,
        user_id: &str,
        doc: &UserVitality,
        expected_revision: Option<u64>,
    ) -> Result<WriteOutcome, Self::Error>;

    /// Append `tomb` to the archive and replace the document in one atomic step.
    ///
    /// Either both writes land or neither does.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be written.
    fn retire(
        &self,
        user_id: &str,
        doc: &UserVitality,
        tomb: &TombRecord,
        expected_revision: u64,
    ) -> Result<WriteOutcome, Self::Error>;

    /// The user's archive, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn tombs(&self, user_id: &str) -> Result<Vec<TombRecord>, Self::Error>;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserEntry {
    pub revision: u64,
    pub doc: UserVitality,
    #[serde(default)]
    pub tombs: Vec<TombRecord>,
}

/// In-process store. Clones share the same backing map, which lets tests
/// stand up two "sessions" against one user.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: Rc<RefCell<HashMap<String, UserEntry>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw entry for inspection.
    #[must_use]
    pub fn entry(&self, user_id: &str) -> Option<UserEntry> {
        self.users.borrow().get(user_id).cloned()
    }

    /// Overwrite an entry without revision checks (fixtures and migrations).
    pub fn put_entry(&self, user_id: &str, entry: UserEntry) {
        self.users.borrow_mut().insert(user_id.to_string(), entry);
    }
}

impl VitalityStore for MemoryStore {
    type Error = Infallible;

    fn load(&self, user_id: &str) -> Result<Option<StoredVitality>, Self::Error> {
        Ok(self.users.borrow().get(user_id).map(|entry| StoredVitality {
            revision: entry.revision,
            doc: entry.doc.clone(),
        }))
    }

    fn save(
        &self,
        user_id: &str,
        doc: &UserVitality,
        expected_revision: Option<u64>,
    ) -> Result<WriteOutcome, Self::Error> {
        let mut users = self.users.borrow_mut();
        let current = users.get(user_id).map(|entry| entry.revision);
        let Some(revision) = next_revision(current, expected_revision) else {
            return Ok(WriteOutcome::Conflict { current });
        };
        let entry = users.entry(user_id.to_string()).or_default();
        entry.revision = revision;
        entry.doc = doc.clone();
        Ok(WriteOutcome::Committed { revision })
    }

    fn retire(
        &self,
        user_id: &str,
        doc: &UserVitality,
        tomb: &TombRecord,
        expected_revision: u64,
    ) -> Result<WriteOutcome, Self::Error> {
        let mut users = self.users.borrow_mut();
        let current = users.get(user_id).map(|entry| entry.revision);
        let Some(revision) = next_revision(current, Some(expected_revision)) else {
            return Ok(WriteOutcome::Conflict { current });
        };
        let entry = users.entry(user_id.to_string()).or_default();
        entry.revision = revision;
        entry.doc = doc.clone();
        entry.tombs.push(tomb.clone());
        Ok(WriteOutcome::Committed { revision })
    }

    fn tombs(&self, user_id: &str) -> Result<Vec<TombRecord>, Self::Error> {
        Ok(self
            .users
            .borrow()
            .get(user_id)
            .map(|entry| entry.tombs.clone())
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::MonsterRecord;
    use chrono::{DateTime, NaiveDate, Utc};

    fn doc_with_monster(health: f64) -> UserVitality {
        let today = NaiveDate::from_ymd_opt(2024, 7, 1).unwrap();
        UserVitality {
            monster: Some(MonsterRecord::new("Gloop", "img", health, today)),
            ..UserVitality::default()
        }
    }

    #[test]
    fn next_revision_requires_exact_match() {
        assert_eq!(next_revision(None, None), Some(1));
        assert_eq!(next_revision(Some(4), Some(4)), Some(5));
        assert_eq!(next_revision(Some(4), Some(3)), None);
        assert_eq!(next_revision(Some(1), None), None);
        assert_eq!(next_revision(None, Some(1)), None);
    }

    #[test]
    fn save_is_conditional_on_revision() {
        let store = MemoryStore::new();
        let doc = doc_with_monster(80.0);
        assert_eq!(
            store.save("u1", &doc, None).unwrap(),
            WriteOutcome::Committed { revision: 1 }
        );
        assert_eq!(
            store.save("u1", &doc, None).unwrap(),
            WriteOutcome::Conflict { current: Some(1) }
        );
        assert_eq!(
            store.save("u1", &doc, Some(1)).unwrap(),
            WriteOutcome::Committed { revision: 2 }
        );
        let loaded = store.load("u1").unwrap().unwrap();
        assert_eq!(loaded.revision, 2);
        assert_eq!(loaded.doc, doc);
    }

    #[test]
    fn clones_share_state() {
        let store = MemoryStore::new();
        let other_session = store.clone();
        store.save("u1", &doc_with_monster(10.0), None).unwrap();
        assert!(other_session.load("u1").unwrap().is_some());
        assert!(other_session.load("u2").unwrap().is_none());
    }

    #[test]
    fn retire_archives_and_clears_together() {
        let store = MemoryStore::new();
        let doc = doc_with_monster(-60.0);
        store.save("u1", &doc, None).unwrap();
        let monster = doc.monster.clone().unwrap();
        let died_at = DateTime::<Utc>::from_timestamp(0, 0).unwrap();
        let tomb = TombRecord::from_monster(&monster, "test", died_at);
        let cleared = UserVitality {
            monster: None,
            ..doc
        };

        assert_eq!(
            store.retire("u1", &cleared, &tomb, 7).unwrap(),
            WriteOutcome::Conflict { current: Some(1) }
        );
        assert!(store.tombs("u1").unwrap().is_empty());

        assert_eq!(
            store.retire("u1", &cleared, &tomb, 1).unwrap(),
            WriteOutcome::Committed { revision: 2 }
        );
        assert_eq!(store.tombs("u1").unwrap(), vec![tomb]);
        assert!(store.load("u1").unwrap().unwrap().doc.monster.is_none());
    }
}
