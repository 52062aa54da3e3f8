//! Persistence of the access settings for `/generatekey`
//!
//! The settings are a single JSON object read and overwritten wholesale.
//! The file is created by the first save. Until then, and on any other read
//! failure, loading fails and issuance is refused.

use std::io;
use std::path::{Path, PathBuf};

use license_types::AccessSettings;
use thiserror::Error;
use tracing::debug;

/// Errors raised by an [`AccessStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Access config {} does not exist", path.display())]
    Missing { path: PathBuf },

    #[error("Failed to read access config {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse access config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Failed to write access config {}: {source}", path.display())]
    Write { path: PathBuf, source: io::Error },

    #[error("Failed to encode access config: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Read/write access to the persisted [`AccessSettings`].
#[allow(async_fn_in_trait)]
pub trait AccessStore {
    async fn load(&self) -> Result<AccessSettings, StoreError>;

    async fn save(&self, settings: &AccessSettings) -> Result<(), StoreError>;
}

/// JSON file backed store.
#[derive(Debug, Clone)]
pub struct FileAccessStore {
    path: PathBuf,
}

impl FileAccessStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AccessStore for FileAccessStore {
    async fn load(&self) -> Result<AccessSettings, StoreError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StoreError::Missing {
                    path: self.path.clone(),
                })
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, settings: &AccessSettings) -> Result<(), StoreError> {
        let content = serde_json::to_string(settings)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::Write {
                    path: self.path.clone(),
                    source,
                })?;
        }

        tokio::fs::write(&self.path, content)
            .await
            .map_err(|source| StoreError::Write {
                path: self.path.clone(),
                source,
            })?;

        debug!("Access config written to {}", self.path.display());
        Ok(())
    }
}

/// In-memory store for tests, with switchable read and write failures.
#[cfg(test)]
pub struct MemoryAccessStore {
    settings: std::sync::Mutex<AccessSettings>,
    fail_reads: bool,
    fail_writes: bool,
}

#[cfg(test)]
impl MemoryAccessStore {
    pub fn new(settings: AccessSettings) -> Self {
        Self {
            settings: std::sync::Mutex::new(settings),
            fail_reads: false,
            fail_writes: false,
        }
    }

    pub fn unrestricted() -> Self {
        Self::new(AccessSettings::default())
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn current(&self) -> AccessSettings {
        self.settings.lock().unwrap().clone()
    }
}

#[cfg(test)]
impl AccessStore for MemoryAccessStore {
    async fn load(&self) -> Result<AccessSettings, StoreError> {
        if self.fail_reads {
            return Err(StoreError::Read {
                path: PathBuf::from("memory"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "simulated read failure"),
            });
        }
        Ok(self.current())
    }

    async fn save(&self, settings: &AccessSettings) -> Result<(), StoreError> {
        if self.fail_writes {
            return Err(StoreError::Write {
                path: PathBuf::from("memory"),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "simulated write failure"),
            });
        }
        *self.settings.lock().unwrap() = settings.clone();
        Ok(())
    }
}
