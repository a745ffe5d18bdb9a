//! Store hub: the composition root for all domain stores
//!
//! The hub opens one store per functional domain against a shared storage
//! backend and hands them to consumers as named fields. Stores are
//! independent: a change to one is never atomic with a change to another.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, span, Level};

use super::{
    builtin_schemas, AssetsStore, Chart, ChartStore, CustomizationStore, Document,
    DocumentEngineStore, DocumentSchema, Generation, Model, ProtocolSession, SessionStore,
    Template,
};
use crate::core::{JsonPatch, Record, StorageBackend, StoreError};

/// Hub configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HubConfig {
    /// Prefix of every storage item name the hub claims
    pub key_prefix: String,
}

impl HubConfig {
    pub fn new(key_prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: key_prefix.into(),
        }
    }

    /// Storage item name of a store
    pub fn storage_key(&self, store: StoreKind) -> String {
        format!("{}-{}", self.key_prefix, store.as_str())
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new("blueprint")
    }
}

/// The functional domains the hub composes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKind {
    Assets,
    Documents,
    Charts,
    Customization,
    Sessions,
}

impl StoreKind {
    pub const ALL: [StoreKind; 5] = [
        StoreKind::Assets,
        StoreKind::Documents,
        StoreKind::Charts,
        StoreKind::Customization,
        StoreKind::Sessions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::Assets => "core-assets",
            StoreKind::Documents => "document-engine",
            StoreKind::Charts => "chart-engine",
            StoreKind::Customization => "user-customization",
            StoreKind::Sessions => "protocol-sessions",
        }
    }

    /// Collections held by this store
    pub fn collections(&self) -> &'static [CollectionKind] {
        match self {
            StoreKind::Assets => &[CollectionKind::Documents, CollectionKind::Models],
            StoreKind::Documents => &[CollectionKind::Schemas, CollectionKind::Generations],
            StoreKind::Charts => &[CollectionKind::Charts],
            StoreKind::Customization => &[CollectionKind::Templates],
            StoreKind::Sessions => &[CollectionKind::Sessions],
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StoreKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StoreError::unknown_store(s))
    }
}

/// Every collection reachable through the hub
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollectionKind {
    Documents,
    Models,
    Schemas,
    Generations,
    Charts,
    Templates,
    Sessions,
}

impl CollectionKind {
    pub const ALL: [CollectionKind; 7] = [
        CollectionKind::Documents,
        CollectionKind::Models,
        CollectionKind::Schemas,
        CollectionKind::Generations,
        CollectionKind::Charts,
        CollectionKind::Templates,
        CollectionKind::Sessions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionKind::Documents => "documents",
            CollectionKind::Models => "models",
            CollectionKind::Schemas => "schemas",
            CollectionKind::Generations => "generations",
            CollectionKind::Charts => "charts",
            CollectionKind::Templates => "templates",
            CollectionKind::Sessions => "sessions",
        }
    }

    /// The store that owns this collection
    pub fn store(&self) -> StoreKind {
        match self {
            CollectionKind::Documents | CollectionKind::Models => StoreKind::Assets,
            CollectionKind::Schemas | CollectionKind::Generations => StoreKind::Documents,
            CollectionKind::Charts => StoreKind::Charts,
            CollectionKind::Templates => StoreKind::Customization,
            CollectionKind::Sessions => StoreKind::Sessions,
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionKind {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| StoreError::unknown_collection(s))
    }
}

/// Run `$body` with `$store` bound to the store owning `$kind` and `$record`
/// aliased to that collection's record type
macro_rules! with_collection {
    ($hub:expr, $kind:expr, |$store:ident: &mut, $record:ident| $body:expr) => {
        match $kind {
            CollectionKind::Documents => {
                type $record = Document;
                let $store = &mut $hub.assets;
                $body
            }
            CollectionKind::Models => {
                type $record = Model;
                let $store = &mut $hub.assets;
                $body
            }
            CollectionKind::Schemas => {
                type $record = DocumentSchema;
                let $store = &mut $hub.documents;
                $body
            }
            CollectionKind::Generations => {
                type $record = Generation;
                let $store = &mut $hub.documents;
                $body
            }
            CollectionKind::Charts => {
                type $record = Chart;
                let $store = &mut $hub.charts;
                $body
            }
            CollectionKind::Templates => {
                type $record = Template;
                let $store = &mut $hub.customization;
                $body
            }
            CollectionKind::Sessions => {
                type $record = ProtocolSession;
                let $store = &mut $hub.sessions;
                $body
            }
        }
    };
    ($hub:expr, $kind:expr, |$store:ident, $record:ident| $body:expr) => {
        match $kind {
            CollectionKind::Documents => {
                type $record = Document;
                let $store = &$hub.assets;
                $body
            }
            CollectionKind::Models => {
                type $record = Model;
                let $store = &$hub.assets;
                $body
            }
            CollectionKind::Schemas => {
                type $record = DocumentSchema;
                let $store = &$hub.documents;
                $body
            }
            CollectionKind::Generations => {
                type $record = Generation;
                let $store = &$hub.documents;
                $body
            }
            CollectionKind::Charts => {
                type $record = Chart;
                let $store = &$hub.charts;
                $body
            }
            CollectionKind::Templates => {
                type $record = Template;
                let $store = &$hub.customization;
                $body
            }
            CollectionKind::Sessions => {
                type $record = ProtocolSession;
                let $store = &$hub.sessions;
                $body
            }
        }
    };
}

/// Access point for all domain stores
///
/// Open once at start-up, call [`StoreHub::initialize`], then pass the
/// hub by reference to whatever needs the stores.
pub struct StoreHub {
    config: HubConfig,
    backend: Arc<dyn StorageBackend>,
    pub assets: AssetsStore,
    pub documents: DocumentEngineStore,
    pub charts: ChartStore,
    pub customization: CustomizationStore,
    pub sessions: SessionStore,
}

impl StoreHub {
    /// Open every store against `backend`, restoring persisted snapshots
    pub fn open(backend: Arc<dyn StorageBackend>, config: &HubConfig) -> Self {
        let config = config.clone();
        let open_span = span!(Level::INFO, "open_hub", prefix = %config.key_prefix);
        let _enter = open_span.enter();

        let hub = Self {
            assets: AssetsStore::open(config.storage_key(StoreKind::Assets), backend.clone()),
            documents: DocumentEngineStore::open(
                config.storage_key(StoreKind::Documents),
                backend.clone(),
            ),
            charts: ChartStore::open(config.storage_key(StoreKind::Charts), backend.clone()),
            customization: CustomizationStore::open(
                config.storage_key(StoreKind::Customization),
                backend.clone(),
            ),
            sessions: SessionStore::open(config.storage_key(StoreKind::Sessions), backend.clone()),
            config,
            backend,
        };

        let recovered: Vec<&str> = StoreKind::ALL
            .into_iter()
            .filter(|kind| hub.recovered_on_open(*kind))
            .map(|kind| kind.as_str())
            .collect();
        info!(recovered = ?recovered, "Stores opened");
        hub
    }

    /// Open with the default configuration
    pub fn with_backend(backend: Arc<dyn StorageBackend>) -> Self {
        Self::open(backend, &HubConfig::default())
    }

    /// One-time start-up registration of default data
    ///
    /// Registers the built-in document schemas that are not registered yet.
    /// Schemas already present, including edited built-ins, are left alone,
    /// so running it on every start-up is safe.
    pub fn initialize(&mut self) {
        let init_span = span!(Level::INFO, "initialize_hub");
        let _enter = init_span.enter();

        let mut registered = 0usize;
        for schema in builtin_schemas() {
            if self.documents.get::<DocumentSchema>(&schema.id).is_some() {
                debug!(schema = %schema.id, "Built-in schema already registered");
                continue;
            }
            debug!(schema = %schema.id, "Registering built-in schema");
            self.documents.register_schema(schema);
            registered += 1;
        }
        info!(registered, "Built-in schemas registered");
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Storage item names claimed by the hub, one per store
    pub fn store_names(&self) -> Vec<String> {
        StoreKind::ALL
            .into_iter()
            .map(|kind| self.config.storage_key(kind))
            .collect()
    }

    /// Raw snapshot text of a store as held by the backend
    pub fn persisted(&self, store: StoreKind) -> Result<Option<String>, StoreError> {
        self.backend.get_item(&self.config.storage_key(store))
    }

    /// Reset a store and delete its snapshot
    pub fn reset(&mut self, store: StoreKind) {
        match store {
            StoreKind::Assets => self.assets.clear(),
            StoreKind::Documents => self.documents.clear(),
            StoreKind::Charts => self.charts.clear(),
            StoreKind::Customization => self.customization.clear(),
            StoreKind::Sessions => self.sessions.clear(),
        }
    }

    /// Whether a store discarded an unreadable snapshot when it was opened
    pub fn recovered_on_open(&self, store: StoreKind) -> bool {
        match store {
            StoreKind::Assets => self.assets.recovered_on_open(),
            StoreKind::Documents => self.documents.recovered_on_open(),
            StoreKind::Charts => self.charts.recovered_on_open(),
            StoreKind::Customization => self.customization.recovered_on_open(),
            StoreKind::Sessions => self.sessions.recovered_on_open(),
        }
    }

    /// Failed snapshot writes of a store since it was opened
    pub fn persist_failures(&self, store: StoreKind) -> u64 {
        match store {
            StoreKind::Assets => self.assets.persist_failures(),
            StoreKind::Documents => self.documents.persist_failures(),
            StoreKind::Charts => self.charts.persist_failures(),
            StoreKind::Customization => self.customization.persist_failures(),
            StoreKind::Sessions => self.sessions.persist_failures(),
        }
    }

    /// Number of records in a collection
    pub fn count(&self, kind: CollectionKind) -> usize {
        with_collection!(self, kind, |store, R| store.collection::<R>().len())
    }

    /// All records of a collection as JSON values, in key order
    pub fn list_json(&self, kind: CollectionKind) -> Result<Vec<Value>, StoreError> {
        with_collection!(self, kind, |store, R| {
            store
                .collection::<R>()
                .values()
                .map(|record| serde_json::to_value(record).map_err(StoreError::from))
                .collect()
        })
    }

    /// One record as a JSON value
    pub fn get_json(&self, kind: CollectionKind, key: &str) -> Result<Option<Value>, StoreError> {
        with_collection!(self, kind, |store, R| {
            store
                .get::<R>(key)
                .map(serde_json::to_value)
                .transpose()
                .map_err(StoreError::from)
        })
    }

    /// Decode `value` as a record of the collection and upsert it
    ///
    /// Returns the record's key. Fails only if `value` is not a valid record.
    pub fn add_json(&mut self, kind: CollectionKind, value: Value) -> Result<String, StoreError> {
        with_collection!(self, kind, |store: &mut, R| {
            let record: R = serde_json::from_value(value)?;
            let key = record.key().to_string();
            store.add(record);
            Ok(key)
        })
    }

    /// Shallow-merge a JSON object into a record
    ///
    /// `Ok(false)` if the key is absent. Fails with
    /// [`StoreError::InvalidPatch`] when the patch would change the key or
    /// leave an invalid record; the record is unchanged in that case.
    pub fn update_json(
        &mut self,
        kind: CollectionKind,
        key: &str,
        patch: JsonPatch,
    ) -> Result<bool, StoreError> {
        with_collection!(self, kind, |store: &mut, R| store.try_update::<R, _>(key, patch))
    }

    /// Remove a record; false if the key was absent
    pub fn remove_json(&mut self, kind: CollectionKind, key: &str) -> bool {
        with_collection!(self, kind, |store: &mut, R| store.remove::<R>(key).is_some())
    }

    /// Select the record under `key`, or clear the selection with `None`
    ///
    /// Returns false when the collection keeps no selection or the key is not
    /// in the collection; nothing changes in that case.
    pub fn select(&mut self, kind: CollectionKind, key: Option<&str>) -> bool {
        if !self.has_selection(kind) {
            return false;
        }
        with_collection!(self, kind, |store: &mut, R| {
            match key {
                Some(key) => match store.get::<R>(key).cloned() {
                    Some(record) => {
                        store.set_current(Some(&record));
                        true
                    }
                    None => false,
                },
                None => {
                    store.set_current::<R>(None);
                    true
                }
            }
        })
    }

    /// Key of the current selection of a collection
    pub fn current_key(&self, kind: CollectionKind) -> Option<&str> {
        with_collection!(self, kind, |store, R| store.current_key::<R>())
    }

    /// Whether the collection keeps a current selection
    pub fn has_selection(&self, kind: CollectionKind) -> bool {
        !matches!(
            kind,
            CollectionKind::Generations | CollectionKind::Templates
        )
    }
}

impl fmt::Debug for StoreHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreHub")
            .field("config", &self.config)
            .field("assets", &self.assets)
            .field("documents", &self.documents)
            .field("charts", &self.charts)
            .field("customization", &self.customization)
            .field("sessions", &self.sessions)
            .finish()
    }
}
