//! Persistent store
//!
//! A [`PersistentStore`] owns the state of one functional domain: one or more
//! collections plus scalar fields. Every mutation is applied in memory first
//! and then the whole state is written to the storage backend as a snapshot:
//!
//! ```json
//! {"state": {"charts": [["c1", {...}]], "current_chart": "c1"}, "version": 0}
//! ```
//!
//! Backend failures never reach the caller. They are logged and counted, and
//! the in-memory state stays authoritative for the rest of the session.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, span, trace, warn, Level};

use super::{Collection, Patch, Record, StorageBackend, StoreError};

/// The complete persisted state of one store
///
/// Collection fields should use `#[serde(with = "codec::pairs", default)]`
/// and the struct should carry `#[serde(default)]`, so that a partly damaged
/// snapshot still restores whatever is readable.
pub trait StoreState: Serialize + DeserializeOwned + Default {
    /// Snapshot format version written into the envelope
    const VERSION: u32 = 0;

    /// Upgrade the `state` value of a snapshot written with another version
    fn migrate(state: Value, from_version: u32) -> Value {
        let _ = from_version;
        state
    }
}

/// Access to the collection of `R` inside a store state
///
/// States that track a current selection for `R` override [`Holds::selected`]
/// and [`Holds::select`].
pub trait Holds<R: Record>: StoreState {
    /// The collection of `R` records
    fn collection(&self) -> &Collection<R>;

    /// Mutable access for the owning store
    fn collection_mut(&mut self) -> &mut Collection<R>;

    /// Key of the currently selected `R`, if any
    fn selected(&self) -> Option<&str> {
        None
    }

    /// Replace the selection; returns false if this state has no selection for `R`
    fn select(&mut self, key: Option<String>) -> bool {
        let _ = key;
        false
    }
}

#[derive(Serialize)]
struct SnapshotRef<'a, S> {
    state: &'a S,
    version: u32,
}

/// A store of one domain's state, persisted after every mutation
pub struct PersistentStore<S: StoreState> {
    name: String,
    state: S,
    backend: Arc<dyn StorageBackend>,
    persist_failures: u64,
    recovered_on_open: bool,
}

impl<S: StoreState> PersistentStore<S> {
    /// Open the store persisted under `name`
    ///
    /// A missing snapshot starts from the default state. An unreadable one
    /// is discarded with a warning and also starts from the default state.
    pub fn open(name: impl Into<String>, backend: Arc<dyn StorageBackend>) -> Self {
        let name = name.into();
        let open_span = span!(Level::DEBUG, "open_store", store = %name);
        let _enter = open_span.enter();

        let (state, recovered_on_open) = match load_state::<S>(&name, backend.as_ref()) {
            Ok(Some(state)) => {
                debug!("Restored snapshot");
                (state, false)
            }
            Ok(None) => {
                debug!("No snapshot found; starting empty");
                (S::default(), false)
            }
            Err(e) => {
                warn!(error = %e, "Failed to restore snapshot; starting empty");
                (S::default(), true)
            }
        };

        Self {
            name,
            state,
            backend,
            persist_failures: 0,
            recovered_on_open,
        }
    }

    /// The storage item name this store writes to
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read-only view of the whole state
    pub fn state(&self) -> &S {
        &self.state
    }

    /// Number of snapshot writes that failed since the store was opened
    pub fn persist_failures(&self) -> u64 {
        self.persist_failures
    }

    /// Whether opening discarded an unreadable snapshot
    pub fn recovered_on_open(&self) -> bool {
        self.recovered_on_open
    }

    /// Read-only view of the collection of `R`
    pub fn collection<R: Record>(&self) -> &Collection<R>
    where
        S: Holds<R>,
    {
        <S as Holds<R>>::collection(&self.state)
    }

    /// Look up a record by key
    pub fn get<R: Record>(&self, key: &str) -> Option<&R>
    where
        S: Holds<R>,
    {
        self.collection::<R>().get(key)
    }

    /// Insert or overwrite a record under its key
    pub fn add<R: Record>(&mut self, record: R)
    where
        S: Holds<R>,
    {
        let key = record.key().to_string();
        let replaced = <S as Holds<R>>::collection_mut(&mut self.state)
            .upsert(record)
            .is_some();
        debug!(store = %self.name, key = %key, replaced, "Record added");
        self.persist();
    }

    /// Shallow-merge `patch` into the record under `key`
    ///
    /// Returns false, without error, when there is no such record or the
    /// patch is rejected. The snapshot is rewritten either way.
    pub fn update<R, P>(&mut self, key: &str, patch: P) -> bool
    where
        R: Record,
        P: Patch<R>,
        S: Holds<R>,
    {
        match self.try_update::<R, P>(key, patch) {
            Ok(applied) => applied,
            Err(e) => {
                warn!(store = %self.name, key, error = %e, "Patch rejected; record unchanged");
                false
            }
        }
    }

    /// Like [`PersistentStore::update`], but reports a rejected patch
    ///
    /// `Ok(false)` means there is no record under `key`. On error the record
    /// is unchanged.
    pub fn try_update<R, P>(&mut self, key: &str, patch: P) -> Result<bool, StoreError>
    where
        R: Record,
        P: Patch<R>,
        S: Holds<R>,
    {
        let outcome = match <S as Holds<R>>::collection_mut(&mut self.state).get_mut(key) {
            Some(record) => patch.apply(record).map(|()| true),
            None => Ok(false),
        };
        match &outcome {
            Ok(true) => debug!(store = %self.name, key, "Record updated"),
            Ok(false) => debug!(store = %self.name, key, "No record to update"),
            Err(_) => {}
        }
        self.persist();
        outcome
    }

    /// Remove a record, clearing the selection if it pointed at it
    pub fn remove<R: Record>(&mut self, key: &str) -> Option<R>
    where
        S: Holds<R>,
    {
        let removed = <S as Holds<R>>::collection_mut(&mut self.state).remove(key);
        if <S as Holds<R>>::selected(&self.state) == Some(key) {
            <S as Holds<R>>::select(&mut self.state, None);
            debug!(store = %self.name, key, "Cleared current selection");
        }
        debug!(store = %self.name, key, removed = removed.is_some(), "Record removed");
        self.persist();
        removed
    }

    /// Set the current selection to `record`, or clear it with `None`
    ///
    /// Callers select only records from this store's own collection; the
    /// key is not checked against it.
    pub fn set_current<R: Record>(&mut self, record: Option<&R>)
    where
        S: Holds<R>,
    {
        let key = record.map(|record| record.key().to_string());
        if <S as Holds<R>>::select(&mut self.state, key.clone()) {
            debug!(store = %self.name, key = ?key, "Current selection changed");
        } else {
            warn!(store = %self.name, "Store keeps no selection for this record kind");
        }
        self.persist();
    }

    /// Key of the current selection
    pub fn current_key<R: Record>(&self) -> Option<&str>
    where
        S: Holds<R>,
    {
        <S as Holds<R>>::selected(&self.state)
    }

    /// The currently selected record, if it is in the collection
    pub fn current<R: Record>(&self) -> Option<&R>
    where
        S: Holds<R>,
    {
        let key = self.current_key::<R>()?;
        self.get::<R>(key)
    }

    /// Reset to the default state and delete the persisted snapshot
    pub fn clear(&mut self) {
        self.state = S::default();
        match self.backend.remove_item(&self.name) {
            Ok(()) => info!(store = %self.name, "Store cleared"),
            Err(e) => {
                self.persist_failures += 1;
                warn!(store = %self.name, error = %e, "Failed to delete snapshot");
            }
        }
    }

    /// The snapshot text currently held by the backend
    pub fn persisted(&self) -> Result<Option<String>, StoreError> {
        self.backend.get_item(&self.name)
    }

    /// Serialize the state and write it to the backend
    pub fn try_persist(&self) -> Result<(), StoreError> {
        let snapshot = SnapshotRef {
            state: &self.state,
            version: S::VERSION,
        };
        let json = serde_json::to_string(&snapshot)?;
        self.backend.set_item(&self.name, &json)?;
        trace!(store = %self.name, bytes = json.len(), "Snapshot written");
        Ok(())
    }

    /// Apply a change to scalar state fields and persist
    pub(crate) fn apply(&mut self, change: impl FnOnce(&mut S)) {
        change(&mut self.state);
        self.persist();
    }

    fn persist(&mut self) {
        if let Err(e) = self.try_persist() {
            self.persist_failures += 1;
            warn!(
                store = %self.name,
                error = %e,
                failures = self.persist_failures,
                "Failed to persist snapshot; keeping in-memory state"
            );
        }
    }
}

impl<S: StoreState + fmt::Debug> fmt::Debug for PersistentStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PersistentStore")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("persist_failures", &self.persist_failures)
            .field("recovered_on_open", &self.recovered_on_open)
            .finish()
    }
}

/// Read and decode the snapshot stored under `name`
///
/// Accepts the `{"state": .., "version": ..}` envelope and, for older data,
/// a bare state object.
fn load_state<S: StoreState>(
    name: &str,
    backend: &dyn StorageBackend,
) -> Result<Option<S>, StoreError> {
    let Some(raw) = backend.get_item(name)? else {
        return Ok(None);
    };
    let value: Value = serde_json::from_str(&raw)?;

    let (state, version) = match value {
        Value::Object(mut envelope) if envelope.contains_key("state") => {
            let version = envelope
                .get("version")
                .and_then(Value::as_u64)
                .and_then(|v| u32::try_from(v).ok())
                .unwrap_or(0);
            (envelope.remove("state").unwrap_or(Value::Null), version)
        }
        other => {
            debug!("Snapshot has no envelope; reading it as bare state");
            (other, 0)
        }
    };

    let state = if version == S::VERSION {
        state
    } else {
        info!(from = version, to = S::VERSION, "Migrating snapshot");
        S::migrate(state, version)
    };

    Ok(Some(serde_json::from_value(state)?))
}
