use reqwest::{Client, RequestBuilder, Response};
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::error::ProviderError;
use crate::types::ChatRequest;

use super::response::{self, ParsedCompletion};
use super::{ProviderKind, ProviderRecord};

/// Identification headers sent to model-routing providers.
#[derive(Debug, Clone, Default)]
pub struct AppIdentity {
    pub name: String,
    pub url: String,
}

/// Attach auth and per-kind headers.
fn authorize(builder: RequestBuilder, record: &ProviderRecord, app: &AppIdentity) -> RequestBuilder {
    let builder = builder.header("Authorization", format!("Bearer {}", record.credential()));
    match record.kind() {
        ProviderKind::Routing => builder
            .header("HTTP-Referer", app.url.as_str())
            .header("X-Title", app.name.as_str()),
        ProviderKind::Local | ProviderKind::Vendor => builder,
    }
}

/// Build the `/chat/completions` body for one provider.
///
/// `model` is the id already resolved with [`ProviderRecord::resolve_model`].
pub fn build_payload(
    record: &ProviderRecord,
    model: &str,
    request: &ChatRequest,
    default_max_tokens: u32,
) -> serde_json::Value {
    let max_tokens = record.clamp_max_tokens(request.max_tokens.unwrap_or(default_max_tokens));

    let msgs: Vec<serde_json::Value> = request
        .messages
        .iter()
        .map(|m| {
            let mut msg = json!({
                "role": m.role,
                "content": m.content.as_deref().unwrap_or(""),
            });
            if let Some(ref tc) = m.tool_calls {
                msg["tool_calls"] = json!(tc);
            }
            if let Some(ref id) = m.tool_call_id {
                msg["tool_call_id"] = json!(id);
            }
            if let Some(ref name) = m.name {
                msg["name"] = json!(name);
            }
            msg
        })
        .collect();

    let mut body = json!({
        "model": model,
        "messages": msgs,
        "temperature": request.temperature,
        "max_tokens": max_tokens,
        "stream": false,
    });

    if let Some(tools) = request.tools.as_ref().filter(|t| !t.is_empty()) {
        body["tools"] = json!(tools);
        body["tool_choice"] = json!("auto");
    }

    body
}

/// Send one completion call and parse the result.
pub async fn chat(
    client: &Client,
    record: &ProviderRecord,
    app: &AppIdentity,
    body: &serde_json::Value,
    timeout: Duration,
) -> Result<ParsedCompletion, ProviderError> {
    let url = format!("{}/chat/completions", record.base_address());
    debug!("Completion request to {} ({}) with model {}", record.name(), url, body["model"]);

    let response = authorize(client.post(&url), record, app)
        .header("Content-Type", "application/json")
        .timeout(timeout)
        .json(body)
        .send()
        .await?;

    let text = success_body(response).await?;
    response::parse_completion(&text)
}

/// List the models a provider advertises.
pub async fn list_models(
    client: &Client,
    record: &ProviderRecord,
    app: &AppIdentity,
    timeout: Duration,
) -> Result<Vec<String>, ProviderError> {
    let url = format!("{}/models", record.base_address());
    debug!("Model listing request to {} ({})", record.name(), url);

    let response = authorize(client.get(&url), record, app)
        .timeout(timeout)
        .send()
        .await?;

    let text = success_body(response).await?;
    response::parse_model_list(&text)
}

/// Read the body of a 2xx response. Any other status is a rejection, even
/// when its body cannot be read.
async fn success_body(response: Response) -> Result<String, ProviderError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Rejected {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }
    Ok(response.text().await?)
}
