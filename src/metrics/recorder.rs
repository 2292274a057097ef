//! Background usage recording and reporting

use super::{aggregate, Result, UsageRecord, UsageStats, UsageStore};
use crate::api::{GatewayResponse, ProviderKind};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

enum Job {
    Record(UsageRecord),
    Flush(oneshot::Sender<()>),
}

/// Hands usage records to a background worker.
///
/// `record` never waits and never fails: a full queue or a persistence error
/// is logged and the record is dropped.
#[derive(Clone)]
pub struct UsageRecorder {
    tx: mpsc::Sender<Job>,
    store: Arc<dyn UsageStore>,
}

impl UsageRecorder {
    /// Start the worker on the current tokio runtime
    pub fn spawn(store: Arc<dyn UsageStore>, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        tokio::spawn(run_worker(rx, store.clone()));
        Self { tx, store }
    }

    pub fn record(
        &self,
        kind: ProviderKind,
        model_id: &str,
        endpoint: &str,
        response: &GatewayResponse,
        latency_ms: u64,
    ) {
        let record = UsageRecord::from_attempt(kind, model_id, endpoint, response, latency_ms);

        match self.tx.try_send(Job::Record(record)) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Usage queue full, dropping record for {}/{}", kind, model_id)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Usage worker stopped, dropping record for {}/{}", kind, model_id)
            }
        }
    }

    /// Wait until every record queued before this call has been handled
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(Job::Flush(done_tx)).await.is_err() {
            return;
        }
        let _ = done_rx.await;
    }

    /// Per-kind aggregates over the last `days_back` days
    pub async fn stats(&self, days_back: u32) -> Result<Vec<UsageStats>> {
        let records = self.store.since(days_ago(days_back)).await?;
        Ok(aggregate(&records))
    }

    /// Most recent records, newest first
    pub async fn history(&self, limit: usize) -> Result<Vec<UsageRecord>> {
        self.store.recent(limit).await
    }

    /// Delete records older than `days_to_keep` days
    pub async fn cleanup(&self, days_to_keep: u32) -> Result<usize> {
        let deleted = self.store.delete_before(days_ago(days_to_keep)).await?;
        info!("Cleaned up {} old usage records", deleted);
        Ok(deleted)
    }
}

/// Start of a window reaching `days` back, clamped to the earliest representable instant
fn days_ago(days: u32) -> DateTime<Utc> {
    Utc::now()
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

async fn run_worker(mut rx: mpsc::Receiver<Job>, store: Arc<dyn UsageStore>) {
    while let Some(job) = rx.recv().await {
        match job {
            Job::Record(record) => match store.append(&record).await {
                Ok(()) => debug!(
                    tokens = record.tokens_total,
                    cost = record.cost_estimate,
                    latency_ms = record.latency_ms,
                    "Tracked usage: {}/{}",
                    record.kind,
                    record.model_id
                ),
                Err(e) => warn!("Failed to track usage: {}", e),
            },
            Job::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!("Usage worker stopped");
}
