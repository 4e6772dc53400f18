use std::fs::{self, File};
use std::io::{ErrorKind, Read, Result, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{de::DeserializeOwned, Serialize};
use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::PilotResult;
use crate::models::{RunConfig, Settings};

// --- File I/O ---

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let mut file = File::open(path)?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    let data = serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
    Ok(data)
}

pub fn atomic_write_json<T: Serialize>(path: &Path, data: &T) -> Result<()> {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;

    let json = serde_json::to_string_pretty(data)
        .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;

    tmp.write_all(json.as_bytes())?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;

    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

pub struct FileLock {
    file: File,
}

impl FileLock {
    pub fn new(path: &Path) -> Result<Self> {
        let mut lock_path = path.as_os_str().to_owned();
        lock_path.push(".lock");
        let file = File::create(PathBuf::from(lock_path))?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

// --- Settings ---

/// Key-value settings file holding the API key, delay and message count.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Saved settings, or defaults when nothing has been saved yet.
    pub fn load(&self) -> Result<Settings> {
        match read_json(&self.path) {
            Ok(settings) => Ok(settings),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Settings::default()),
            Err(e) => Err(e),
        }
    }

    pub fn save(&self, settings: &Settings) -> Result<()> {
        let _lock = self.lock()?;
        atomic_write_json(&self.path, settings)?;
        debug!(path = %self.path.display(), "settings saved");
        Ok(())
    }

    /// Read-modify-write under the file lock.
    pub fn update(&self, apply: impl FnOnce(&mut Settings)) -> Result<Settings> {
        let _lock = self.lock()?;
        let mut settings = self.load()?;
        apply(&mut settings);
        atomic_write_json(&self.path, &settings)?;
        Ok(settings)
    }

    /// Applies run overrides and saves them, but only once they form a valid
    /// run config.
    pub fn commit_run(&self, apply: impl FnOnce(&mut Settings)) -> PilotResult<RunConfig> {
        let _lock = self.lock()?;
        let mut settings = self.load()?;
        apply(&mut settings);
        let config = settings.run_config()?;
        atomic_write_json(&self.path, &settings)?;
        Ok(config)
    }

    fn lock(&self) -> Result<FileLock> {
        if let Some(dir) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(dir)?;
        }
        FileLock::new(&self.path)
    }
}
