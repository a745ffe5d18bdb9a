//! Blueprint - persisted keyed-collection stores
//!
//! A state layer for an artifact-generation workspace: documents, models,
//! schemas, generation jobs, charts, templates and protocol sessions, each
//! held in a keyed collection and written to a key-value storage backend
//! after every change.
//!
//! # Quick Start
//!
//! ```rust
//! use blueprint::prelude::*;
//!
//! let mut hub = blueprint::open_memory_hub();
//! hub.initialize();
//!
//! hub.charts.add(Chart::new("latency", "Latency", ChartKind::Line));
//! assert!(hub.charts.get::<Chart>("latency").is_some());
//! ```
//!
//! # Stores
//!
//! Individual stores can be used without the hub:
//!
//! ```rust
//! use std::sync::Arc;
//! use blueprint::prelude::*;
//!
//! let storage = MemoryStorage::new();
//! let mut store = ChartStore::open("charts", Arc::new(storage.clone()));
//! let chart = Chart::new("c-1", "Requests", ChartKind::Bar);
//! store.add(chart.clone());
//! store.set_current(Some(&chart));
//!
//! // A second store over the same storage sees the snapshot
//! let reopened = ChartStore::open("charts", Arc::new(storage));
//! assert_eq!(reopened.current::<Chart>(), Some(&chart));
//! ```

pub mod core;
pub mod domains;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

use std::path::Path;
use std::sync::Arc;

pub use crate::core::*;
pub use crate::domains::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::{
        Collection, FileStorage, Holds, JsonPatch, MemoryStorage, Patch, PersistentStore, Record,
        StorageBackend, StoreError, StoreState,
    };
    pub use crate::domains::{
        AssetsStore, Chart, ChartKind, ChartStore, CollectionKind, CustomizationStore, Document,
        DocumentContent, DocumentEngineStore, DocumentKind, DocumentSchema, Generation,
        HubConfig, Model, ModelKind, ProtocolSession, SessionStore, StoreHub, StoreKind,
        Template, Theme,
    };
}

/// Open a hub over a data directory
///
/// The directory is created if needed. Snapshots are stored as one JSON file
/// per store.
///
/// # Example
/// ```rust,no_run
/// let mut hub = blueprint::open_file_hub(".blueprint").unwrap();
/// hub.initialize();
/// ```
pub fn open_file_hub(dir: impl AsRef<Path>) -> anyhow::Result<StoreHub> {
    let storage = FileStorage::create(dir.as_ref().to_path_buf())?;
    Ok(StoreHub::with_backend(Arc::new(storage)))
}

/// Open a hub over fresh in-memory storage
pub fn open_memory_hub() -> StoreHub {
    StoreHub::with_backend(Arc::new(MemoryStorage::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_open_memory_hub() {
        let mut hub = open_memory_hub();
        hub.initialize();
        assert_eq!(hub.count(CollectionKind::Schemas), 5);
        assert_eq!(hub.count(CollectionKind::Documents), 0);
    }

    #[test]
    fn test_open_file_hub_creates_directory() {
        let dir = tempdir().unwrap();
        let data_dir = dir.path().join("nested").join("data");
        let mut hub = open_file_hub(&data_dir).unwrap();
        hub.initialize();

        assert!(data_dir.is_dir());
        assert!(data_dir.join("blueprint-document-engine.json").is_file());
    }

    #[test]
    fn test_open_file_hub_reloads_state() {
        let dir = tempdir().unwrap();
        {
            let mut hub = open_file_hub(dir.path()).unwrap();
            hub.customization.set_theme(Theme::Dark);
        }
        let hub = open_file_hub(dir.path()).unwrap();
        assert_eq!(hub.customization.state().theme, Theme::Dark);
    }
}
