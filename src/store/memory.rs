use std::sync::{Arc, Mutex, PoisonError};

use super::{ProgressStore, StoreError};

/// In-process store. Clones share the same slot.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing snapshot
    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Some(bytes.into()))),
        }
    }

    /// Current snapshot, if any
    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.snapshot())
    }

    fn save(&self, bytes: &[u8]) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(bytes.to_vec());
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}
