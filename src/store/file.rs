use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use super::{ProgressStore, StoreError, STATE_KEY};

/// Snapshot kept in `{dir}/migration-state.json`
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let path = dir.join(format!("{STATE_KEY}.json"));
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{STATE_KEY}.tmp.json"))
    }
}

impl ProgressStore for JsonFileStore {
    fn load(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(
                format!("reading {}", self.path.display()),
                e,
            )),
        }
    }

    fn save(&self, bytes: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| StoreError::io(format!("creating {}", self.dir.display()), e))?;

        // Write-then-rename so a reader never sees a half-written snapshot
        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path)
            .map_err(|e| StoreError::io("creating temp state file", e))?;
        let written = file.write_all(bytes).and_then(|()| file.sync_all());
        drop(file);
        if let Err(e) = written {
            discard_temp(&temp_path);
            return Err(StoreError::io("writing temp state file", e));
        }

        if let Err(e) = fs::rename(&temp_path, &self.path) {
            discard_temp(&temp_path);
            return Err(StoreError::io(
                format!("renaming to {}", self.path.display()),
                e,
            ));
        }

        debug!(path = %self.path.display(), bytes = bytes.len(), "progress saved");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!(path = %self.path.display(), "progress cleared");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(
                format!("removing {}", self.path.display()),
                e,
            )),
        }
    }
}

fn discard_temp(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        debug!(path = %path.display(), error = %e, "could not remove temp state file");
    }
}
