//! The storage provider trait.

use async_trait::async_trait;

/// Errors from an object-storage backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backend rejected the write because the object already exists
    /// and overwriting was not allowed.
    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    /// The upload failed for any other reason.
    #[error("Upload failed for '{name}': {message}")]
    Upload {
        /// Object name the write targeted.
        name: String,
        /// Backend-specific failure description.
        message: String,
    },
}

/// A backend that stores bytes under a name and returns a public URL
/// deterministically derived from that name.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `name`. When `allow_overwrite` is false, a
    /// pre-existing object with the same name is an error.
    ///
    /// Returns the public URL of the stored object.
    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        allow_overwrite: bool,
    ) -> Result<String, StorageError>;

    /// The public URL an object with `name` would be served from.
    fn public_url(&self, name: &str) -> String;
}
