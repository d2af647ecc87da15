//! Persistence collaborator for progress snapshots.
//!
//! Stores deal in opaque bytes under a single constant key; encoding and
//! decoding belong to [`crate::progress::ProgressState`].

mod file;
mod memory;

use std::io;

use thiserror::Error;

pub use file::JsonFileStore;
pub use memory::MemoryStore;

/// Key under which the progress snapshot is stored
pub const STATE_KEY: &str = "migration-state";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode progress snapshot: {0}")]
    Encode(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        StoreError::Io {
            context: context.into(),
            source,
        }
    }
}

/// Load/save/clear of the single progress snapshot.
///
/// A missing snapshot is `Ok(None)`, never an error.
pub trait ProgressStore {
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError>;

    fn save(&self, bytes: &[u8]) -> Result<(), StoreError>;

    /// Remove the snapshot; clearing an absent snapshot succeeds
    fn clear(&self) -> Result<(), StoreError>;
}

impl<T: ProgressStore + ?Sized> ProgressStore for Box<T> {
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).load()
    }

    fn save(&self, bytes: &[u8]) -> Result<(), StoreError> {
        (**self).save(bytes)
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}
