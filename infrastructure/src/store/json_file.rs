//! JSON file checkpoint store.
//!
//! All documents live in one JSON object keyed by document key. Every
//! increment rewrites the file through a temporary file and a rename, so a
//! crash never leaves a half-written store behind.

use async_trait::async_trait;
use serde_json::{Map, Value};
use squad_application::{CheckpointStore, StoreError};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

pub struct JsonFileCheckpointStore {
    path: PathBuf,
    /// Loaded on first use
    documents: Mutex<Option<Map<String, Value>>>,
}

impl JsonFileCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            documents: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a numeric field (missing is zero)
    pub async fn read_field(&self, key: &str, field_path: &str) -> Result<i64, StoreError> {
        let mut documents = self.documents.lock().await;
        let documents = self.loaded(&mut documents).await?;
        let mut value = documents.get(key);
        for segment in field_path.split('.') {
            value = value.and_then(|node| node.get(segment));
        }
        match value {
            None => Ok(0),
            Some(v) => v.as_i64().ok_or_else(|| StoreError::NotANumber {
                key: key.to_string(),
                field: field_path.to_string(),
            }),
        }
    }

    async fn loaded<'a>(
        &self,
        slot: &'a mut Option<Map<String, Value>>,
    ) -> Result<&'a mut Map<String, Value>, StoreError> {
        if slot.is_none() {
            let documents = match tokio::fs::read(&self.path).await {
                Ok(bytes) if bytes.is_empty() => Map::new(),
                Ok(bytes) => serde_json::from_slice(&bytes)?,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
                Err(e) => return Err(e.into()),
            };
            *slot = Some(documents);
        }
        Ok(slot.get_or_insert_with(Map::new))
    }

    async fn persist(&self, documents: &Map<String, Value>) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(documents)?;
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

/// Add `amount` at `field_path` inside `document`, creating objects on the way
fn increment_in(
    document: &mut Value,
    key: &str,
    field_path: &str,
    amount: i64,
) -> Result<(), StoreError> {
    let not_a_number = || StoreError::NotANumber {
        key: key.to_string(),
        field: field_path.to_string(),
    };

    let segments: Vec<&str> = field_path.split('.').collect();
    let (last, parents) = segments.split_last().ok_or_else(not_a_number)?;

    let mut node = document;
    for segment in parents {
        if node.is_null() {
            *node = Value::Object(Map::new());
        }
        node = node
            .as_object_mut()
            .ok_or_else(not_a_number)?
            .entry(segment.to_string())
            .or_insert(Value::Null);
    }
    if node.is_null() {
        *node = Value::Object(Map::new());
    }

    let field = node
        .as_object_mut()
        .ok_or_else(not_a_number)?
        .entry(last.to_string())
        .or_insert(Value::from(0));
    let current = field.as_i64().ok_or_else(not_a_number)?;
    *field = Value::from(current + amount);
    Ok(())
}

#[async_trait]
impl CheckpointStore for JsonFileCheckpointStore {
    async fn increment_field(&self, key: &str, field_path: &str, amount: i64) -> Result<(), StoreError> {
        let mut guard = self.documents.lock().await;
        let documents = self.loaded(&mut guard).await?;

        // Apply to a copy so a failed write leaves memory matching the file.
        let mut updated = documents.clone();
        let document = updated.entry(key.to_string()).or_insert(Value::Null);
        increment_in(document, key, field_path, amount)?;
        self.persist(&updated).await?;

        *documents = updated;
        debug!("Incremented {}:{} by {}", key, field_path, amount);
        Ok(())
    }
}
