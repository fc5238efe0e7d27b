//! Session store — committed map of session id → SessionResult.
//!
//! Every operation goes through the Atomic Store, so each access is also
//! a recovery point. Sessions are written once and read-only thereafter
//! except for deletion.

use std::collections::BTreeMap;

use wat_core::domain::SessionResult;

use crate::storage::StorageBackend;
use crate::store::{AtomicStore, StoreError};

/// Backing key for the sessions envelope.
pub const SESSIONS_KEY: &str = "wat_sessions";

pub struct SessionStore<B: StorageBackend> {
    store: AtomicStore<B>,
}

impl<B: StorageBackend> SessionStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            store: AtomicStore::new(backend, SESSIONS_KEY),
        }
    }

    /// All persisted sessions, keyed by id. Empty map when nothing has
    /// been committed yet.
    pub fn load_all(
        &mut self,
    ) -> Result<BTreeMap<String, SessionResult>, StoreError> {
        Ok(self.store.load()?.unwrap_or_default())
    }

    pub fn get(
        &mut self,
        id: &str,
    ) -> Result<Option<SessionResult>, StoreError> {
        Ok(self.load_all()?.remove(id))
    }

    pub fn list_ids(&mut self) -> Result<Vec<String>, StoreError> {
        Ok(self.load_all()?.into_keys().collect())
    }

    /// Insert or replace one session and commit the whole envelope.
    pub fn save(&mut self, session: SessionResult) -> Result<(), StoreError> {
        let mut all = self.load_all()?;
        all.insert(session.id.clone(), session);
        self.store.write(&all)
    }

    /// Delete one session. Reports whether it existed.
    pub fn delete(&mut self, id: &str) -> Result<bool, StoreError> {
        let mut all = self.load_all()?;
        let existed = all.remove(id).is_some();
        if existed {
            self.store.write(&all)?;
        }
        Ok(existed)
    }

    pub fn delete_all(&mut self) -> Result<(), StoreError> {
        self.store.write(&BTreeMap::<String, SessionResult>::new())
    }

    pub fn backend(&self) -> &B {
        self.store.backend()
    }
}
