//! Core error types for store persistence
//!
//! Store operations never surface these to callers; they are produced by the
//! storage and snapshot layers and logged at the store boundary.

use thiserror::Error;

/// Core error types for the persistence pipeline
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage error: {message}")]
    Storage { message: String },

    #[error("IO error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },

    #[error("Invalid storage item name: {name}")]
    InvalidName { name: String },

    #[error("Invalid patch: {message}")]
    InvalidPatch { message: String },

    #[error("Unknown collection: {collection}")]
    UnknownCollection { collection: String },

    #[error("Unknown store: {store}")]
    UnknownStore { store: String },
}

impl StoreError {
    /// Create a new storage backend error
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Create a new invalid name error
    pub fn invalid_name(name: impl Into<String>) -> Self {
        Self::InvalidName { name: name.into() }
    }

    /// Create a new invalid patch error
    pub fn invalid_patch(message: impl Into<String>) -> Self {
        Self::InvalidPatch {
            message: message.into(),
        }
    }

    /// Create a new unknown collection error
    pub fn unknown_collection(collection: impl Into<String>) -> Self {
        Self::UnknownCollection {
            collection: collection.into(),
        }
    }

    /// Create a new unknown store error
    pub fn unknown_store(store: impl Into<String>) -> Self {
        Self::UnknownStore {
            store: store.into(),
        }
    }
}
