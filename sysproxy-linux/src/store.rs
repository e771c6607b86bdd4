//! Snapshot file in the per-user config directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use sysproxy_core::{decode_snapshot, encode_snapshot, Snapshot, SnapshotStore, StoreError};

pub const SNAPSHOT_FILE: &str = "proxy_snapshot.cfg";

/// `$XDG_CONFIG_HOME/sysproxy/proxy_snapshot.cfg`, or a temp-dir path when no config dir is known.
pub fn default_snapshot_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("sysproxy")
        .join(SNAPSHOT_FILE)
}

#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn exists(&self) -> bool {
        self.path.is_file()
    }

    fn load(&self) -> Result<Option<Snapshot>, StoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(decode_snapshot(&text)?))
    }

    /// Written to a sibling temp file and renamed, so a crash never leaves half a snapshot.
    fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.temp_path();
        fs::write(&tmp, encode_snapshot(snapshot))?;
        fs::rename(&tmp, &self.path)?;
        tracing::debug!(path = %self.path.display(), "proxy snapshot written");
        Ok(())
    }

    fn clear(&self) -> Result<(), StoreError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
