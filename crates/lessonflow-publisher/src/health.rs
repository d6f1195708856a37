//! Liveness record of the publishing worker

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::engine::TickSummary;

/// Point-in-time view of worker health
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkerHealthSnapshot {
    pub last_tick_at: Option<DateTime<Utc>>,
    /// Last tick that scanned successfully
    pub last_summary: Option<TickSummary>,
    pub total_ticks: u64,
    pub failed_ticks: u64,
    /// Reset by the next successful tick
    pub consecutive_failures: u64,
    pub last_error: Option<String>,
}

#[derive(Debug, Default)]
pub struct WorkerHealth {
    inner: RwLock<WorkerHealthSnapshot>,
}

impl WorkerHealth {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record_success(&self, summary: TickSummary) {
        let mut health = self.inner.write().await;
        health.last_tick_at = Some(summary.started_at);
        health.last_summary = Some(summary);
        health.total_ticks += 1;
        health.consecutive_failures = 0;
    }

    pub async fn record_failure(&self, at: DateTime<Utc>, error: String) {
        let mut health = self.inner.write().await;
        health.last_tick_at = Some(at);
        health.total_ticks += 1;
        health.failed_ticks += 1;
        health.consecutive_failures += 1;
        health.last_error = Some(error);
    }

    pub async fn snapshot(&self) -> WorkerHealthSnapshot {
        self.inner.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_failures_reset_on_success() {
        let health = WorkerHealth::new();
        let now = Utc::now();

        health.record_failure(now, "connection refused".to_string()).await;
        health.record_failure(now, "connection refused".to_string()).await;

        let snapshot = health.snapshot().await;
        assert_eq!(snapshot.total_ticks, 2);
        assert_eq!(snapshot.consecutive_failures, 2);
        assert!(snapshot.last_summary.is_none());

        health
            .record_success(TickSummary {
                started_at: now,
                scanned: 3,
                published: 3,
                ..Default::default()
            })
            .await;

        let snapshot = health.snapshot().await;
        assert_eq!(snapshot.total_ticks, 3);
        assert_eq!(snapshot.failed_ticks, 2);
        assert_eq!(snapshot.consecutive_failures, 0);
        assert_eq!(snapshot.last_summary.map(|s| s.published), Some(3));
        assert_eq!(snapshot.last_error.as_deref(), Some("connection refused"));
    }
}
