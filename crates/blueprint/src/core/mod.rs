//! Core abstractions for persisted stores
//!
//! Records live in keyed collections; the codec maps collections to their
//! persisted form; persistent stores own the state of one domain and write
//! it through a storage backend after every change.

pub mod codec;
mod collection;
mod error;
pub mod logging;
mod record;
mod storage;
mod store;

pub use codec::{decode, encode, try_decode, try_encode, DecodeError, EncodeError};
pub use collection::*;
pub use error::*;
pub use logging::*;
pub use record::{JsonPatch, Patch, Record};
pub use storage::*;
pub use store::*;
