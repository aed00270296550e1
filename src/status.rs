use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, instrument};

pub const STATUS_FILENAME: &str = "status.json";

#[derive(Debug, Error)]
pub enum StatusError {
    #[error("status file {0} does not exist")]
    NotFound(PathBuf),
    #[error("status file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed status file: {0}")]
    Format(#[from] serde_json::Error),
}

/// The persisted record of which interface, if any, is active.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceStatus {
    #[serde(default)]
    pub id: u64,
    #[serde(default)]
    pub iface: String,
}

impl ServiceStatus {
    pub fn new(id: u64, iface: impl Into<String>) -> Self {
        Self {
            id,
            iface: iface.into(),
        }
    }

    pub fn iface(&self) -> Option<&str> {
        (!self.iface.is_empty()).then_some(self.iface.as_str())
    }
}

/// Single-record store in the daemon home directory.
#[derive(Debug, Clone)]
pub struct StatusStore {
    path: PathBuf,
}

impl StatusStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_home(home: &Path) -> Self {
        Self::new(home.join(STATUS_FILENAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io(&self, source: std::io::Error) -> StatusError {
        StatusError::Io {
            path: self.path.clone(),
            source,
        }
    }

    /// A missing file is an empty record, not an error.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Result<ServiceStatus, StatusError> {
        match fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no status file");
                Ok(ServiceStatus::default())
            }
            Err(e) => Err(self.io(e)),
        }
    }

    /// Writes to a sibling temp file and renames it over the record, so a
    /// reader sees either the old or the new record.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn save(&self, status: &ServiceStatus) -> Result<(), StatusError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| self.io(e))?;
        }

        let buf = serde_json::to_vec_pretty(status)?;
        let tmp = self.path.with_extension("json.tmp");

        let mut file = fs::File::create(&tmp).await.map_err(|e| self.io(e))?;
        file.write_all(&buf).await.map_err(|e| self.io(e))?;
        file.sync_all().await.map_err(|e| self.io(e))?;
        drop(file);

        fs::rename(&tmp, &self.path).await.map_err(|e| self.io(e))
    }

    /// Fails with [`StatusError::NotFound`] if there is no record.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn remove(&self) -> Result<(), StatusError> {
        match fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StatusError::NotFound(self.path.clone()))
            }
            Err(e) => Err(self.io(e)),
        }
    }
}
