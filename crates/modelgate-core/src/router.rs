use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::{Config, RouterConfig};
use crate::dispatch::Dispatcher;
use crate::error::Result;
use crate::fallback::FallbackResponder;
use crate::health::{HealthProber, HealthReport};
use crate::provider::openai_compat::AppIdentity;
use crate::provider::ProviderRegistry;
use crate::transport::PooledTransport;
use crate::types::{ChatRequest, CompletionResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallHealth {
    Healthy,
    Unhealthy,
}

/// Snapshot produced by [`Router::get_status`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouterStatus {
    pub overall: OverallHealth,
    /// Highest-priority provider that is healthy once probing finishes.
    pub active_preferred: Option<String>,
    /// Reports in attempt order.
    pub per_provider: Vec<HealthReport>,
}

/// Entry point for callers: status, completions and shutdown.
///
/// Several routers with different registries can live in one process; the
/// router owns its transport and shares provider records with nobody else.
pub struct Router {
    registry: ProviderRegistry,
    transport: Arc<PooledTransport>,
    dispatcher: Dispatcher,
    prober: HealthProber,
    fallback: Option<FallbackResponder>,
}

impl Router {
    pub fn new(registry: ProviderRegistry, config: &RouterConfig) -> Self {
        let transport = Arc::new(PooledTransport::new());
        let app = AppIdentity {
            name: config.app_name.clone(),
            url: config.app_url.clone(),
        };

        let dispatcher = Dispatcher::new(
            registry.clone(),
            transport.clone(),
            app.clone(),
            Duration::from_secs(config.completion_timeout_secs),
            config.default_max_tokens,
        );
        let prober = HealthProber::new(
            registry.clone(),
            transport.clone(),
            app,
            Duration::from_secs(config.probe_timeout_secs),
        );

        tracing::debug!(
            "Router created with {} providers ({} configured), fallback {}",
            registry.len(),
            registry.configured_count(),
            if config.fallback { "on" } else { "off" }
        );

        Self {
            registry,
            transport,
            dispatcher,
            prober,
            fallback: config.fallback.then(FallbackResponder::new),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let registry = ProviderRegistry::from_config(config)?;
        Ok(Self::new(registry, &config.router))
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn fallback_enabled(&self) -> bool {
        self.fallback.is_some()
    }

    /// Probe every provider, then summarise.
    pub async fn get_status(&self) -> RouterStatus {
        let mut reports = self.prober.probe_all().await;
        let per_provider: Vec<HealthReport> = self
            .registry
            .iter()
            .filter_map(|record| reports.remove(record.name()))
            .collect();

        let active_preferred = self.registry.preferred().map(|r| r.name().to_string());

        RouterStatus {
            overall: if active_preferred.is_some() {
                OverallHealth::Healthy
            } else {
                OverallHealth::Unhealthy
            },
            active_preferred,
            per_provider,
        }
    }

    /// Dispatch and return the full result. Exhaustion is always an error.
    pub async fn complete(&self, request: &ChatRequest) -> Result<CompletionResult> {
        Ok(self.dispatcher.dispatch(request).await?)
    }

    /// Dispatch and return the assistant text.
    ///
    /// With fallback enabled, exhaustion (including an empty registry) yields
    /// a labelled demo answer instead of an error.
    pub async fn complete_chat(&self, request: &ChatRequest) -> Result<String> {
        match self.dispatcher.dispatch(request).await {
            Ok(result) => Ok(result.content),
            Err(e) if e.is_exhaustion() => match &self.fallback {
                Some(fallback) => {
                    tracing::warn!("{}; answering with fallback text", e);
                    Ok(fallback.respond(request.last_user_message()))
                }
                None => Err(e.into()),
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Restore a provider's health without probing it.
    pub fn reinstate(&self, name: &str) -> bool {
        self.registry.reinstate(name)
    }

    /// Release the transport. Idempotent.
    pub fn close(&self) {
        self.transport.close();
    }

    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }
}
