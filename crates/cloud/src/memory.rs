//! In-memory object store for tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::store::{ObjectStore, StorageError};

/// Default base URL for in-memory object URLs.
const MEMORY_BASE_URL: &str = "memory://uploads";

/// Object store holding everything in a map. Not for production use.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.lock().await.len()
    }

    /// Whether an object with `name` exists.
    pub async fn contains(&self, name: &str) -> bool {
        self.objects.lock().await.contains_key(name)
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(
        &self,
        name: &str,
        bytes: Vec<u8>,
        allow_overwrite: bool,
    ) -> Result<String, StorageError> {
        let mut objects = self.objects.lock().await;
        if !allow_overwrite && objects.contains_key(name) {
            return Err(StorageError::AlreadyExists(name.to_string()));
        }
        objects.insert(name.to_string(), bytes);
        Ok(self.public_url(name))
    }

    fn public_url(&self, name: &str) -> String {
        format!("{MEMORY_BASE_URL}/{name}")
    }
}
