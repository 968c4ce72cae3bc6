use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::records::RecordGrid;

/// Nested `category -> difficulty -> chapters` layout of the save file.
/// Absence at any layer means "no recorded data", never corruption.
pub type SavedRuns = HashMap<String, HashMap<String, Vec<SavedChapter>>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedLevel {
    pub code: String,
    pub pb_seconds: u64,
    pub pb_microseconds: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedChapter {
    pub chapter_number: u8,
    pub pb_seconds: Option<u64>,
    pub pb_microseconds: Option<u32>,
    pub levels: Vec<SavedLevel>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SaveFile {
    /// Opaque to the timing core; owned by whatever front end drives it.
    #[serde(default)]
    gui_config: Value,
    #[serde(default)]
    runs: SavedRuns,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not access save file: {0}")]
    Io(#[from] io::Error),
    #[error("save file is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}

/// Durable storage for the record grid plus the pass-through UI config.
pub trait RecordStore {
    /// Read the saved runs and UI config. A missing file is a first run,
    /// not an error; any other failure is surfaced.
    fn load(&mut self) -> Result<(SavedRuns, Value), StoreError>;

    /// Write the grid and config, returning whether a write happened.
    /// Skipped entirely unless the config changed since the last load/save
    /// or some chapter reports a modification.
    fn save(&mut self, grid: &RecordGrid, gui_config: &Value) -> Result<bool, StoreError>;
}

#[derive(Debug, Clone)]
pub struct FileRecordStore {
    path: PathBuf,
    last_config: Option<Value>,
}

impl FileRecordStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = if let Some(pd) = ProjectDirs::from("", "", "gzsplit") {
            pd.config_dir().join("records.json")
        } else {
            PathBuf::from("gzsplit_records.json")
        };
        Self {
            path,
            last_config: None,
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
            last_config: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordStore for FileRecordStore {
    fn load(&mut self) -> Result<(SavedRuns, Value), StoreError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let empty = Value::Object(Default::default());
                self.last_config = Some(empty.clone());
                return Ok((SavedRuns::new(), empty));
            }
            Err(e) => return Err(e.into()),
        };
        let file: SaveFile = serde_json::from_slice(&bytes)?;
        self.last_config = Some(file.gui_config.clone());
        Ok((file.runs, file.gui_config))
    }

    fn save(&mut self, grid: &RecordGrid, gui_config: &Value) -> Result<bool, StoreError> {
        let config_changed = self.last_config.as_ref() != Some(gui_config);
        if !config_changed && !grid.is_modified() {
            return Ok(false);
        }
        let file = SaveFile {
            gui_config: gui_config.clone(),
            runs: grid.to_saved(),
        };
        // serialize fully in memory first so a failure cannot truncate the file
        let data = serde_json::to_vec_pretty(&file)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, data)?;
        self.last_config = Some(gui_config.clone());
        Ok(true)
    }
}
