// src/storage/mod.rs
use crate::marketscreener::models::EntityReference;
use crate::utils::error::StorageError;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

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

    /// Directory holding one entity's tables: /base_dir/<slug>/
    fn entity_dir(&self, entity: &EntityReference) -> Result<PathBuf, StorageError> {
        self.folder(&entity.slug())
    }

    fn folder(&self, name: &str) -> Result<PathBuf, StorageError> {
        let target_dir = self.base_dir.join(name);
        if !target_dir.exists() {
            fs::create_dir_all(&target_dir).map_err(StorageError::IoError)?;
        }
        Ok(target_dir)
    }

    /// Saves one named table as pretty-printed JSON.
    pub fn save_table<T: Serialize + ?Sized>(
        &self,
        entity: &EntityReference,
        name: &str,
        table: &T,
    ) -> Result<PathBuf, StorageError> {
        self.save_in(&entity.slug(), name, table)
    }

    /// Saves a table that belongs to no entity (a published data set) under `/base_dir/<folder>/`.
    pub fn save_in<T: Serialize + ?Sized>(&self, folder: &str, name: &str, table: &T) -> Result<PathBuf, StorageError> {
        let file_path = self.folder(folder)?.join(format!("{}.json", name));

        let json = serde_json::to_string_pretty(table)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, json).map_err(StorageError::IoError)?;

        tracing::info!("Saved '{}' to {}", name, file_path.display());
        Ok(file_path)
    }

    /// Saves metadata about an extraction run in JSON format
    pub fn save_metadata(&self, entity: &EntityReference, tables: &[&str]) -> Result<PathBuf, StorageError> {
        let file_path = self.entity_dir(entity)?.join("metadata.json");

        let metadata = serde_json::json!({
            "name": entity.name,
            "url": entity.url,
            "tables": tables,
            "extraction_timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let metadata_str = serde_json::to_string_pretty(&metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        fs::write(&file_path, metadata_str).map_err(StorageError::IoError)?;

        tracing::info!("Saved metadata to {}", file_path.display());
        Ok(file_path)
    }
}
