use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeenRecord {
    pub id: String,
    pub title: String,
}

/// Durable record of processed thread ids, stored as a JSON array.
#[derive(Debug)]
pub struct SeenStore {
    path: PathBuf,
    records: Vec<SeenRecord>,
    ids: HashSet<String>,
}

impl SeenStore {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let records = load_records(&path)?;
        let ids = records.iter().map(|r| r.id.clone()).collect();
        debug!("Loaded {} seen threads from {}", records.len(), path.display());
        Ok(Self { path, records, ids })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Marks `id` as seen and persists the store immediately.
    pub fn record(&mut self, id: &str, title: &str) -> anyhow::Result<()> {
        if !self.ids.insert(id.to_string()) {
            return Ok(());
        }
        self.records.push(SeenRecord {
            id: id.to_string(),
            title: title.to_string(),
        });
        save_records(&self.path, &self.records)
    }
}

fn load_records(path: &Path) -> anyhow::Result<Vec<SeenRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = fs::read_to_string(path)
        .with_context(|| format!("Failed to read seen store {}", path.display()))?;
    if data.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(&data)
        .with_context(|| format!("Seen store {} is not valid JSON", path.display()))
}

fn save_records(path: &Path, records: &[SeenRecord]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let data = serde_json::to_string_pretty(records)?;
    fs::write(path, data)
        .with_context(|| format!("Failed to write seen store {}", path.display()))?;
    Ok(())
}
