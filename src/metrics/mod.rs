//! Usage accounting: pricing, records, storage and reporting

pub mod pricing;
mod recorder;
mod store;

pub use pricing::{estimate_cost, price_for, ModelPrice};
pub use recorder::UsageRecorder;
pub use store::{JsonlUsageStore, MemoryUsageStore, UsageStore};

use crate::api::{GatewayResponse, ProviderKind};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UsageError {
    #[error("Usage store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Usage record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Usage store error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, UsageError>;

/// Accounting entry for one adapter attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: String,
    pub kind: ProviderKind,
    pub model_id: String,
    pub endpoint: String,
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub tokens_total: u32,
    /// Estimated cost in euros
    pub cost_estimate: f64,
    pub latency_ms: u64,
    pub success: bool,
    pub created_at: DateTime<Utc>,
}

impl UsageRecord {
    pub fn from_attempt(
        kind: ProviderKind,
        model_id: &str,
        endpoint: &str,
        response: &GatewayResponse,
        latency_ms: u64,
    ) -> Self {
        let usage = response.usage_or_default();

        Self {
            id: format!("usage_{}", uuid::Uuid::new_v4().simple()),
            kind,
            model_id: model_id.to_string(),
            endpoint: endpoint.to_string(),
            tokens_in: usage.tokens_in,
            tokens_out: usage.tokens_out,
            tokens_total: usage.tokens_total,
            cost_estimate: estimate_cost(kind, model_id, usage.tokens_in, usage.tokens_out),
            latency_ms,
            success: response.success,
            created_at: Utc::now(),
        }
    }
}

/// Aggregated usage for one provider kind over a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UsageStats {
    pub kind: ProviderKind,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub total_tokens: u64,
    pub total_cost: f64,
    pub avg_latency_ms: f64,
    pub requests_by_model: BTreeMap<String, u64>,
}

impl UsageStats {
    fn empty(kind: ProviderKind) -> Self {
        Self {
            kind,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            total_tokens: 0,
            total_cost: 0.0,
            avg_latency_ms: 0.0,
            requests_by_model: BTreeMap::new(),
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.total_requests == 0 {
            return 0.0;
        }
        self.successful_requests as f64 / self.total_requests as f64
    }
}

/// Group records per kind, ordered by kind
pub fn aggregate(records: &[UsageRecord]) -> Vec<UsageStats> {
    let mut by_kind: BTreeMap<ProviderKind, (UsageStats, u64)> = BTreeMap::new();

    for record in records {
        let (stats, latency_sum) = by_kind
            .entry(record.kind)
            .or_insert_with(|| (UsageStats::empty(record.kind), 0));

        stats.total_requests += 1;
        if record.success {
            stats.successful_requests += 1;
        } else {
            stats.failed_requests += 1;
        }
        stats.total_tokens += record.tokens_total as u64;
        stats.total_cost += record.cost_estimate;
        *stats
            .requests_by_model
            .entry(record.model_id.clone())
            .or_insert(0) += 1;
        *latency_sum += record.latency_ms;
    }

    by_kind
        .into_values()
        .map(|(mut stats, latency_sum)| {
            stats.avg_latency_ms = latency_sum as f64 / stats.total_requests as f64;
            stats
        })
        .collect()
}

impl std::fmt::Display for UsageStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== {} ===", self.kind)?;
        writeln!(
            f,
            "Requests: {} ({} ok, {} failed, {:.1}% success)",
            self.total_requests,
            self.successful_requests,
            self.failed_requests,
            self.success_rate() * 100.0
        )?;
        writeln!(f, "Tokens: {}", self.total_tokens)?;
        writeln!(f, "Estimated cost: {:.4} EUR", self.total_cost)?;
        writeln!(f, "Avg latency: {:.0} ms", self.avg_latency_ms)?;
        for (model, count) in &self.requests_by_model {
            writeln!(f, "  {}: {}", model, count)?;
        }
        Ok(())
    }
}
