//! Annotation store — manual per-trial tags and notes.
//!
//! Explicit store object with injectable backing storage; no free-floating
//! module state, so tests can run isolated instances side by side.
//! Entries are keyed `sessionId:trialIndex` and removed outright when both
//! tags and note become empty.

use std::collections::BTreeMap;

use wat_core::domain::Annotation;

use crate::storage::StorageBackend;
use crate::store::{AtomicStore, StoreError};

/// Backing key for the annotations envelope.
pub const ANNOTATIONS_KEY: &str = "wat_annotations";

pub struct AnnotationStore<B: StorageBackend> {
    store: AtomicStore<B>,
}

impl<B: StorageBackend> AnnotationStore<B> {
    pub fn new(backend: B) -> Self {
        Self {
            store: AtomicStore::new(backend, ANNOTATIONS_KEY),
        }
    }

    fn entry_key(session_id: &str, trial_index: u32) -> String {
        format!("{}:{}", session_id, trial_index)
    }

    fn load_all(
        &mut self,
    ) -> Result<BTreeMap<String, Annotation>, StoreError> {
        Ok(self.store.load()?.unwrap_or_default())
    }

    /// Insert, replace, or — when the annotation is empty — delete.
    pub fn set(&mut self, annotation: Annotation) -> Result<(), StoreError> {
        let key = Self::entry_key(&annotation.session_id, annotation.trial_index);
        let mut all = self.load_all()?;
        if annotation.is_empty() {
            all.remove(&key);
        } else {
            all.insert(key, annotation);
        }
        self.store.write(&all)
    }

    pub fn get(
        &mut self,
        session_id: &str,
        trial_index: u32,
    ) -> Result<Option<Annotation>, StoreError> {
        let key = Self::entry_key(session_id, trial_index);
        Ok(self.load_all()?.remove(&key))
    }

    /// All annotations for one session, in trial order.
    pub fn for_session(
        &mut self,
        session_id: &str,
    ) -> Result<Vec<Annotation>, StoreError> {
        let mut list: Vec<Annotation> = self
            .load_all()?
            .into_values()
            .filter(|a| a.session_id == session_id)
            .collect();
        list.sort_by_key(|a| a.trial_index);
        Ok(list)
    }

    /// Tag → occurrence count over one session's annotations. Empty map
    /// when the session has no annotations — callers use that to omit
    /// the bundle key entirely.
    pub fn tag_summary(
        &mut self,
        session_id: &str,
    ) -> Result<BTreeMap<String, u32>, StoreError> {
        let mut counts = BTreeMap::new();
        for annotation in self.for_session(session_id)? {
            for tag in annotation.tags {
                *counts.entry(tag).or_insert(0) += 1;
            }
        }
        Ok(counts)
    }

    pub fn delete_for_session(
        &mut self,
        session_id: &str,
    ) -> Result<(), StoreError> {
        let mut all = self.load_all()?;
        all.retain(|_, a| a.session_id != session_id);
        self.store.write(&all)
    }
}
