// src/storage/mod.rs
use crate::edgar::RawFactsDocument;
use crate::utils::error::StorageError;
use std::fs;
use std::path::{Path, PathBuf};

/// Writes CLI outputs (charts, debug dumps) under a base directory. Nothing is read back.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    /// Saves a rendered chart as `<base>/<TICKER>/<ticker>_<metric>.png`
    pub fn save_chart(&self, ticker: &str, metric: &str, png: &[u8]) -> Result<PathBuf, StorageError> {
        let target_dir = self.ticker_dir(ticker)?;
        let filename = format!("{}_{}.png", ticker.to_lowercase(), slugify(metric));
        let file_path = target_dir.join(filename);

        fs::write(&file_path, png).map_err(StorageError::IoError)?;
        tracing::info!("Saved chart to {}", file_path.display());

        Ok(file_path)
    }

    /// Saves the raw facts document as pretty JSON, for debugging extraction
    pub fn save_raw_facts(&self, ticker: &str, document: &RawFactsDocument) -> Result<PathBuf, StorageError> {
        let target_dir = self.ticker_dir(ticker)?;
        let file_path = target_dir.join(format!("{}_companyfacts.json", ticker.to_lowercase()));

        let body = serde_json::to_string_pretty(document.as_json())
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, body).map_err(StorageError::IoError)?;
        tracing::info!("Saved raw facts to {}", file_path.display());

        Ok(file_path)
    }

    fn ticker_dir(&self, ticker: &str) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir.join(ticker.trim().to_uppercase());
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        Ok(target_dir)
    }
}

/// "EPS (Basic)" -> "eps_basic"
fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}
