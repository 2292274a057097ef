//! Usage record storage backends

use super::{Result, UsageError, UsageRecord};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// Append-only store of usage records, prunable by age
#[async_trait]
pub trait UsageStore: Send + Sync {
    async fn append(&self, record: &UsageRecord) -> Result<()>;

    /// Records created at or after `cutoff`
    async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<UsageRecord>>;

    /// Most recent records, newest first
    async fn recent(&self, limit: usize) -> Result<Vec<UsageRecord>>;

    /// Delete records created before `cutoff`, returning how many were removed
    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize>;
}

fn newest_first(mut records: Vec<UsageRecord>, limit: usize) -> Vec<UsageRecord> {
    records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    records.truncate(limit);
    records
}

fn lock_error<T>(e: std::sync::PoisonError<T>) -> UsageError {
    UsageError::Storage(format!("Lock error: {}", e))
}

/// In-memory store
#[derive(Debug, Default)]
pub struct MemoryUsageStore {
    records: Mutex<Vec<UsageRecord>>,
}

impl MemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UsageStore for MemoryUsageStore {
    async fn append(&self, record: &UsageRecord) -> Result<()> {
        self.records.lock().map_err(lock_error)?.push(record.clone());
        Ok(())
    }

    async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<UsageRecord>> {
        let records = self.records.lock().map_err(lock_error)?;
        Ok(records
            .iter()
            .filter(|r| r.created_at >= cutoff)
            .cloned()
            .collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        let records = self.records.lock().map_err(lock_error)?.clone();
        Ok(newest_first(records, limit))
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut records = self.records.lock().map_err(lock_error)?;
        let before = records.len();
        records.retain(|r| r.created_at >= cutoff);
        Ok(before - records.len())
    }
}

/// JSON Lines file, one record per line
#[derive(Debug)]
pub struct JsonlUsageStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlUsageStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Vec<UsageRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<UsageRecord>(&line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping malformed usage line {}: {}", index + 1, e),
            }
        }

        Ok(records)
    }

    fn rewrite(&self, records: &[UsageRecord]) -> Result<()> {
        let tmp = self.path.with_extension("jsonl.tmp");
        {
            let mut file = File::create(&tmp)?;
            for record in records {
                writeln!(file, "{}", serde_json::to_string(record)?)?;
            }
            file.flush()?;
        }
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl UsageStore for JsonlUsageStore {
    async fn append(&self, record: &UsageRecord) -> Result<()> {
        let _guard = self.lock.lock().map_err(lock_error)?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", serde_json::to_string(record)?)?;
        file.flush()?;

        Ok(())
    }

    async fn since(&self, cutoff: DateTime<Utc>) -> Result<Vec<UsageRecord>> {
        let _guard = self.lock.lock().map_err(lock_error)?;
        Ok(self
            .read_all()?
            .into_iter()
            .filter(|r| r.created_at >= cutoff)
            .collect())
    }

    async fn recent(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        let _guard = self.lock.lock().map_err(lock_error)?;
        Ok(newest_first(self.read_all()?, limit))
    }

    async fn delete_before(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let _guard = self.lock.lock().map_err(lock_error)?;

        let records = self.read_all()?;
        let before = records.len();
        let kept: Vec<UsageRecord> = records
            .into_iter()
            .filter(|r| r.created_at >= cutoff)
            .collect();
        let deleted = before - kept.len();

        if deleted > 0 {
            self.rewrite(&kept)?;
        }

        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{GatewayResponse, ProviderKind, TokenUsage};
    use chrono::Duration;

    fn record_at(model: &str, days_ago: i64) -> UsageRecord {
        let response = GatewayResponse::success("ok", Some(TokenUsage::new(10, 5)));
        let mut record = UsageRecord::from_attempt(ProviderKind::OpenAi, model, "chat", &response, 120);
        record.created_at = Utc::now() - Duration::days(days_ago);
        record
    }

    async fn exercise(store: &dyn UsageStore) {
        store.append(&record_at("old", 100)).await.unwrap();
        store.append(&record_at("mid", 10)).await.unwrap();
        store.append(&record_at("new", 0)).await.unwrap();

        let recent = store.recent(2).await.unwrap();
        let models: Vec<_> = recent.iter().map(|r| r.model_id.as_str()).collect();
        assert_eq!(models, vec!["new", "mid"]);

        let window = store.since(Utc::now() - Duration::days(30)).await.unwrap();
        assert_eq!(window.len(), 2);

        let deleted = store
            .delete_before(Utc::now() - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(deleted, 1);
        assert_eq!(store.recent(10).await.unwrap().len(), 2);

        let deleted = store
            .delete_before(Utc::now() - Duration::days(30))
            .await
            .unwrap();
        assert_eq!(deleted, 0);
    }

    #[tokio::test]
    async fn test_memory_store() {
        exercise(&MemoryUsageStore::new()).await;
    }

    #[tokio::test]
    async fn test_jsonl_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlUsageStore::new(dir.path().join("data").join("usage.jsonl"));
        exercise(&store).await;

        // survives reopening
        let reopened = JsonlUsageStore::new(store.path());
        assert_eq!(reopened.recent(10).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_jsonl_skips_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("usage.jsonl");
        let store = JsonlUsageStore::new(&path);
        store.append(&record_at("a", 0)).await.unwrap();

        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(file, "{{not json").unwrap();
        drop(file);

        store.append(&record_at("b", 0)).await.unwrap();
        assert_eq!(store.recent(10).await.unwrap().len(), 2);
    }
}
