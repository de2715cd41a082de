use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn, Instrument};
use uuid::Uuid;

use crate::error::DispatchError;
use crate::provider::openai_compat::{self, AppIdentity};
use crate::provider::ProviderRegistry;
use crate::transport::PooledTransport;
use crate::types::{ChatRequest, CompletionResult, Role};

/// Walks providers in priority order until one answers.
///
/// Health is written only once a provider call has resolved. If the future
/// returned by [`Dispatcher::dispatch`] is dropped mid-call (caller timeout or
/// cancellation) the in-flight request is aborted and the provider's health
/// is left untouched.
pub struct Dispatcher {
    registry: ProviderRegistry,
    transport: Arc<PooledTransport>,
    app: AppIdentity,
    timeout: Duration,
    default_max_tokens: u32,
}

impl Dispatcher {
    pub fn new(
        registry: ProviderRegistry,
        transport: Arc<PooledTransport>,
        app: AppIdentity,
        timeout: Duration,
        default_max_tokens: u32,
    ) -> Self {
        Self {
            registry,
            transport,
            app,
            timeout,
            default_max_tokens,
        }
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub async fn dispatch(&self, request: &ChatRequest) -> Result<CompletionResult, DispatchError> {
        request.validate()?;
        if self.transport.is_closed() {
            return Err(DispatchError::Closed);
        }
        if self.registry.configured_count() == 0 {
            return Err(DispatchError::NotConfigured);
        }

        let span = tracing::info_span!("dispatch", request_id = %Uuid::new_v4());
        self.walk(request).instrument(span).await
    }

    async fn walk(&self, request: &ChatRequest) -> Result<CompletionResult, DispatchError> {
        let mut last_error: Option<String> = None;
        let mut skipped_error: Option<String> = None;

        for record in self.registry.iter() {
            if !record.is_healthy() {
                debug!("Skipping unhealthy provider {}", record.name());
                if let Some(e) = record.last_error() {
                    skipped_error = Some(format!("{}: {}", record.name(), e));
                }
                continue;
            }

            let client = self.transport.client().map_err(|_| DispatchError::Closed)?;
            let model = record.resolve_model(request.model.as_deref());
            let body = openai_compat::build_payload(record, model, request, self.default_max_tokens);

            match openai_compat::chat(&client, record, &self.app, &body, self.timeout).await {
                Ok(parsed) => {
                    record.clear_error();
                    info!(
                        "Provider {} served request with model {} ({} tokens)",
                        record.name(),
                        model,
                        parsed.usage.total_tokens
                    );
                    return Ok(CompletionResult {
                        content: parsed.content,
                        role: Role::Assistant,
                        tool_calls: parsed.tool_calls,
                        served_by: record.name().to_string(),
                        model: model.to_string(),
                        usage: parsed.usage,
                    });
                }
                Err(e) => {
                    let detail = e.to_string();
                    warn!("Provider {} failed: {}, failing over", record.name(), detail);
                    record.mark_unhealthy(detail.clone());
                    last_error = Some(format!("{}: {}", record.name(), detail));
                }
            }
        }

        Err(DispatchError::AllProvidersExhausted {
            last_error: last_error.or(skipped_error),
        })
    }
}
