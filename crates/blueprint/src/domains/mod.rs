//! Domain stores
//!
//! One module per functional domain, each defining its record types, patch
//! types and the state its [`PersistentStore`](crate::core::PersistentStore)
//! holds. [`hub`] composes them.

pub mod assets;
pub mod charts;
pub mod customization;
pub mod documents;
pub mod hub;
pub mod sessions;

pub use assets::*;
pub use charts::*;
pub use customization::*;
pub use documents::*;
pub use hub::*;
pub use sessions::*;
