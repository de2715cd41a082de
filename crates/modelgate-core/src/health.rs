use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;

use crate::error::ProviderError;
use crate::provider::openai_compat::{self, AppIdentity};
use crate::provider::{ProviderRecord, ProviderRegistry};
use crate::transport::PooledTransport;

/// How many advertised model ids a report keeps.
pub const REPORTED_MODELS: usize = 5;

/// Outcome of probing one provider.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub name: String,
    pub priority: i32,
    pub healthy: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,
    /// `None` when no network call was made.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    pub checked_at: DateTime<Utc>,
}

/// Re-derives provider health from a cheap `GET /models` call.
pub struct HealthProber {
    registry: ProviderRegistry,
    transport: Arc<PooledTransport>,
    app: AppIdentity,
    timeout: Duration,
}

impl HealthProber {
    pub fn new(
        registry: ProviderRegistry,
        transport: Arc<PooledTransport>,
        app: AppIdentity,
        timeout: Duration,
    ) -> Self {
        Self {
            registry,
            transport,
            app,
            timeout,
        }
    }

    /// Probe every provider concurrently and update their health.
    pub async fn probe_all(&self) -> BTreeMap<String, HealthReport> {
        let probes = self.registry.iter().map(|record| self.probe_one(record));
        join_all(probes)
            .await
            .into_iter()
            .map(|report| (report.name.clone(), report))
            .collect()
    }

    /// Probe a single provider and update its health.
    pub async fn probe_one(&self, record: &ProviderRecord) -> HealthReport {
        let mut report = HealthReport {
            name: record.name().to_string(),
            priority: record.priority(),
            healthy: false,
            error: None,
            models: Vec::new(),
            latency_ms: None,
            checked_at: Utc::now(),
        };

        if !record.is_configured() {
            report.error = Some(ProviderError::NotConfigured.to_string());
            return report;
        }

        let client = match self.transport.client() {
            Ok(client) => client,
            Err(e) => {
                // A closed transport says nothing about the provider itself.
                report.healthy = record.is_healthy();
                report.error = Some(e.to_string());
                return report;
            }
        };

        let start = Instant::now();
        let result = openai_compat::list_models(&client, record, &self.app, self.timeout).await;
        report.latency_ms = Some(start.elapsed().as_millis() as u64);

        match result {
            Ok(models) => {
                record.mark_healthy();
                tracing::info!(
                    "Provider {} healthy ({}ms, {} models)",
                    record.name(),
                    report.latency_ms.unwrap_or_default(),
                    models.len()
                );
                report.healthy = true;
                report.models = models.into_iter().take(REPORTED_MODELS).collect();
            }
            Err(e) => {
                let detail = e.to_string();
                tracing::warn!("Provider {} failed health probe: {}", record.name(), detail);
                record.mark_unhealthy(detail.clone());
                report.error = Some(detail);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProviderEntry, ProviderKind};

    fn prober(entries: Vec<ProviderEntry>) -> HealthProber {
        HealthProber::new(
            ProviderRegistry::new(entries).unwrap(),
            Arc::new(PooledTransport::new()),
            AppIdentity::default(),
            Duration::from_secs(1),
        )
    }

    #[tokio::test]
    async fn test_unconfigured_reported_without_transport() {
        let p = prober(vec![ProviderEntry::new("local", ProviderKind::Local, "http://127.0.0.1:9", "m", 1)]);
        let reports = p.probe_all().await;
        let report = &reports["local"];
        assert!(!report.healthy);
        assert_eq!(report.error.as_deref(), Some("not configured"));
        assert!(report.latency_ms.is_none());
        assert!(!p.transport.is_open());
    }

    #[tokio::test]
    async fn test_closed_transport_leaves_health_alone() {
        let p = prober(vec![
            ProviderEntry::new("a", ProviderKind::Vendor, "http://127.0.0.1:9", "m", 1).with_api_key("k"),
        ]);
        p.transport.close();
        let reports = p.probe_all().await;
        assert!(reports["a"].healthy);
        assert_eq!(reports["a"].error.as_deref(), Some("Transport is closed"));
        assert!(p.registry.get("a").unwrap().is_healthy());
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = HealthReport {
            name: "local".into(),
            priority: 1,
            healthy: true,
            error: None,
            models: vec!["qwen".into()],
            latency_ms: Some(12),
            checked_at: Utc::now(),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["latencyMs"], 12);
        assert!(json.get("error").is_none());
        assert!(json.get("checkedAt").is_some());
    }
}
