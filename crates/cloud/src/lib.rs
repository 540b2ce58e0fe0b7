//! Object-storage capability.
//!
//! The rest of the platform only knows "store bytes under a name, get a
//! public URL back" — the [`ObjectStore`] trait. [`S3ObjectStore`] is the
//! production implementation; [`MemoryObjectStore`] backs tests.

pub mod memory;
pub mod s3;
pub mod store;

pub use memory::MemoryObjectStore;
pub use s3::{S3Config, S3ObjectStore};
pub use store::{ObjectStore, StorageError};
