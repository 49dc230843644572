//! Read-through cache in front of a [`VitalityStore`].
use std::cell::RefCell;
use std::collections::HashMap;

use crate::monster::{TombRecord, UserVitality};
use crate::store::{StoredVitality, VitalityStore, WriteOutcome};

/// Serves repeated loads from memory. Any write for a user drops that user's
/// entry before reaching the inner store, so the cache never outlives a
/// mutation and the inner store stays authoritative.
#[derive(Debug)]
pub struct CachedStore<S> {
    inner: S,
    entries: RefCell<HashMap<String, StoredVitality>>,
}

impl<S: VitalityStore> CachedStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            entries: RefCell::new(HashMap::new()),
        }
    }

    pub const fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Drop the cached document for `user_id`.
    pub fn invalidate(&self, user_id: &str) {
        self.entries.borrow_mut().remove(user_id);
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }

    #[must_use]
    pub fn is_cached(&self, user_id: &str) -> bool {
        self.entries.borrow().contains_key(user_id)
    }
}

impl<S: VitalityStore> VitalityStore for CachedStore<S> {
    type Error = S::Error;

    fn load(&self, user_id: &str) -> Result<Option<StoredVitality>, Self::Error> {
        if let Some(hit) = self.entries.borrow().get(user_id) {
            return Ok(Some(hit.clone()));
        }
        let loaded = self.inner.load(user_id)?;
        if let Some(stored) = &loaded {
            self.entries
                .borrow_mut()
                .insert(user_id.to_string(), stored.clone());
        }
        Ok(loaded)
    }

    fn save(
        &self,
        user_id: &str,
        doc: &UserVitality,
        expected_revision: Option<u64>,
    ) -> Result<WriteOutcome, Self::Error> {
        self.invalidate(user_id);
        self.inner.save(user_id, doc, expected_revision)
    }

    fn retire(
        &self,
        user_id: &str,
        doc: &UserVitality,
        tomb: &TombRecord,
        expected_revision: u64,
    ) -> Result<WriteOutcome, Self::Error> {
        self.invalidate(user_id);
        self.inner.retire(user_id, doc, tomb, expected_revision)
    }

    fn tombs(&self, user_id: &str) -> Result<Vec<TombRecord>, Self::Error> {
        self.inner.tombs(user_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[test]
    fn load_populates_and_write_invalidates() {
        let backing = MemoryStore::new();
        backing.save("u1", &UserVitality::default(), None).unwrap();
        let cached = CachedStore::new(backing.clone());

        assert!(!cached.is_cached("u1"));
        assert_eq!(cached.load("u1").unwrap().unwrap().revision, 1);
        assert!(cached.is_cached("u1"));

        cached.save("u1", &UserVitality::default(), Some(1)).unwrap();
        assert!(!cached.is_cached("u1"));
        assert_eq!(cached.load("u1").unwrap().unwrap().revision, 2);
    }

    #[test]
    fn missing_users_are_not_cached() {
        let cached = CachedStore::new(MemoryStore::new());
        assert!(cached.load("ghost").unwrap().is_none());
        assert!(!cached.is_cached("ghost"));
    }

    #[test]
    fn stale_entry_surfaces_as_conflict_then_refreshes() {
        let backing = MemoryStore::new();
        backing.save("u1", &UserVitality::default(), None).unwrap();
        let cached = CachedStore::new(backing.clone());
        let seen = cached.load("u1").unwrap().unwrap();

        // Another session writes behind the cache.
        backing.save("u1", &UserVitality::default(), Some(1)).unwrap();
        assert_eq!(cached.load("u1").unwrap().unwrap().revision, seen.revision);

        let outcome = cached
            .save("u1", &UserVitality::default(), Some(seen.revision))
            .unwrap();
        assert_eq!(outcome, WriteOutcome::Conflict { current: Some(2) });
        assert_eq!(cached.load("u1").unwrap().unwrap().revision, 2);
    }
}
