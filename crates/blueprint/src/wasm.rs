//! WebAssembly bindings for Blueprint
//!
//! Stores persist to the browser's `window.localStorage`. Records cross the
//! boundary as JSON strings.

use std::sync::Arc;

use wasm_bindgen::prelude::*;

use crate::core::{JsonPatch, StorageBackend, StoreError};
use crate::domains::{CollectionKind, HubConfig, StoreHub, StoreKind};

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(catch, js_namespace = localStorage, js_name = getItem)]
    fn local_storage_get(key: &str) -> Result<Option<String>, JsValue>;

    #[wasm_bindgen(catch, js_namespace = localStorage, js_name = setItem)]
    fn local_storage_set(key: &str, value: &str) -> Result<(), JsValue>;

    #[wasm_bindgen(catch, js_namespace = localStorage, js_name = removeItem)]
    fn local_storage_remove(key: &str) -> Result<(), JsValue>;
}

fn js_error(e: JsValue) -> StoreError {
    StoreError::storage(e.as_string().unwrap_or_else(|| format!("{:?}", e)))
}

/// Storage backend over `window.localStorage`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalStorage;

impl StorageBackend for LocalStorage {
    fn get_item(&self, name: &str) -> Result<Option<String>, StoreError> {
        local_storage_get(name).map_err(js_error)
    }

    fn set_item(&self, name: &str, value: &str) -> Result<(), StoreError> {
        local_storage_set(name, value).map_err(js_error)
    }

    fn remove_item(&self, name: &str) -> Result<(), StoreError> {
        local_storage_remove(name).map_err(js_error)
    }
}

/// Initialize WASM module
///
/// Sets up panic hooks and logging for better error messages in the browser.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    use crate::core::logging::init_logging;
    let _ = init_logging(Some("info"), None);
}

fn to_js(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn collection(name: &str) -> Result<CollectionKind, JsValue> {
    name.parse::<CollectionKind>().map_err(to_js)
}

/// Store hub exported to JavaScript
#[wasm_bindgen]
pub struct WasmHub {
    hub: StoreHub,
}

#[wasm_bindgen]
impl WasmHub {
    /// Open all stores from local storage and register any missing
    /// built-in schema
    ///
    /// # Arguments
    /// * `prefix` - Storage key prefix, `"blueprint"` when omitted
    #[wasm_bindgen(constructor)]
    pub fn open(prefix: Option<String>) -> WasmHub {
        let config = prefix.map(HubConfig::new).unwrap_or_default();
        let mut hub = StoreHub::open(Arc::new(LocalStorage), &config);
        hub.initialize();
        WasmHub { hub }
    }

    /// All records of a collection as a JSON array
    pub fn list(&self, collection_name: &str) -> Result<String, JsValue> {
        let records = self.hub.list_json(collection(collection_name)?).map_err(to_js)?;
        serde_json::to_string(&records).map_err(to_js)
    }

    /// Insert or overwrite a record given as JSON; returns its key
    pub fn add(&mut self, collection_name: &str, record_json: &str) -> Result<String, JsValue> {
        let kind = collection(collection_name)?;
        let value: serde_json::Value = serde_json::from_str(record_json).map_err(to_js)?;
        self.hub.add_json(kind, value).map_err(to_js)
    }

    /// Merge a JSON object into a record; false if the key is absent
    ///
    /// Throws when the patch changes the key or leaves an invalid record.
    pub fn update(
        &mut self,
        collection_name: &str,
        key: &str,
        patch_json: &str,
    ) -> Result<bool, JsValue> {
        let kind = collection(collection_name)?;
        let patch = JsonPatch::parse(patch_json).map_err(to_js)?;
        self.hub.update_json(kind, key, patch).map_err(to_js)
    }

    pub fn remove(&mut self, collection_name: &str, key: &str) -> Result<bool, JsValue> {
        let kind = collection(collection_name)?;
        Ok(self.hub.remove_json(kind, key))
    }

    /// Select a record, or clear the selection when `key` is omitted
    pub fn select(&mut self, collection_name: &str, key: Option<String>) -> Result<bool, JsValue> {
        let kind = collection(collection_name)?;
        Ok(self.hub.select(kind, key.as_deref()))
    }

    /// Raw persisted snapshot of a store, if any
    pub fn snapshot(&self, store_name: &str) -> Result<Option<String>, JsValue> {
        let store = store_name.parse::<StoreKind>().map_err(to_js)?;
        self.hub.persisted(store).map_err(to_js)
    }
}
