pub mod openai_compat;
pub mod response;

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crate::config::{Config, ProviderEntry};
use crate::error::{ConfigError, ProviderError};

pub use crate::config::ProviderKind;

/// One registered backend.
///
/// Everything but the health pair is fixed at construction. `healthy` and
/// `last_error` are written independently; a reader may observe one update
/// without the other, which is tolerated since health is advisory.
pub struct ProviderRecord {
    name: String,
    kind: ProviderKind,
    base_address: String,
    credential: String,
    model_id: String,
    priority: i32,
    max_tokens: Option<u32>,
    models: Vec<String>,
    healthy: AtomicBool,
    last_error: Mutex<Option<String>>,
}

impl std::fmt::Debug for ProviderRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRecord")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("base_address", &self.base_address)
            .field("configured", &self.is_configured())
            .field("model_id", &self.model_id)
            .field("priority", &self.priority)
            .field("healthy", &self.is_healthy())
            .finish_non_exhaustive()
    }
}

impl ProviderRecord {
    pub fn from_entry(entry: &ProviderEntry) -> Self {
        let configured = !entry.api_key.is_empty();
        Self {
            name: entry.name.clone(),
            kind: entry.kind,
            base_address: entry.api_base.trim_end_matches('/').to_string(),
            credential: entry.api_key.clone(),
            model_id: entry.model.clone(),
            priority: entry.priority,
            max_tokens: entry.max_tokens,
            models: entry.models.clone(),
            healthy: AtomicBool::new(configured),
            last_error: Mutex::new((!configured).then(|| ProviderError::NotConfigured.to_string())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn base_address(&self) -> &str {
        &self.base_address
    }

    pub(crate) fn credential(&self) -> &str {
        &self.credential
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    /// A provider without a credential is never attempted.
    pub fn is_configured(&self) -> bool {
        !self.credential.is_empty()
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    pub fn last_error(&self) -> Option<String> {
        match self.last_error.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Restore health and clear the error. Unconfigured providers stay unhealthy.
    pub fn mark_healthy(&self) {
        if !self.is_configured() {
            return;
        }
        self.set_last_error(None);
        self.healthy.store(true, Ordering::Relaxed);
    }

    pub fn mark_unhealthy(&self, error: impl Into<String>) {
        self.healthy.store(false, Ordering::Relaxed);
        self.set_last_error(Some(error.into()));
    }

    /// Clear the error after a successful call without touching the flag.
    pub(crate) fn clear_error(&self) {
        self.set_last_error(None);
    }

    fn set_last_error(&self, value: Option<String>) {
        let mut guard = match self.last_error.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = value;
    }

    /// Whether a caller-supplied model id is a valid routing target here.
    pub fn accepts_model(&self, model: &str) -> bool {
        if model.is_empty() {
            return false;
        }
        if model == self.model_id || self.models.iter().any(|m| m == model) {
            return true;
        }
        match self.kind {
            ProviderKind::Routing => is_namespaced_model(model),
            ProviderKind::Local | ProviderKind::Vendor => false,
        }
    }

    /// Model to send: the caller's override if accepted, else the default.
    pub fn resolve_model<'a>(&'a self, requested: Option<&'a str>) -> &'a str {
        match requested {
            Some(model) if self.accepts_model(model) => model,
            _ => &self.model_id,
        }
    }

    pub fn clamp_max_tokens(&self, requested: u32) -> u32 {
        match self.max_tokens {
            Some(cap) => requested.min(cap),
            None => requested,
        }
    }
}

/// `vendor/model` ids, as used by model-routing APIs.
fn is_namespaced_model(model: &str) -> bool {
    match model.split_once('/') {
        Some((vendor, name)) => !vendor.is_empty() && !name.is_empty(),
        None => false,
    }
}

/// Arena of provider records in attempt order.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    records: Vec<Arc<ProviderRecord>>,
}

impl ProviderRegistry {
    /// Build a registry. Records are ordered by ascending priority; equal
    /// priorities keep the order they were given in.
    pub fn new(entries: Vec<ProviderEntry>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        let mut records = Vec::with_capacity(entries.len());
        for entry in &entries {
            if entry.name.trim().is_empty() {
                return Err(ConfigError::Invalid("provider name must not be empty".to_string()));
            }
            if !seen.insert(entry.name.clone()) {
                return Err(ConfigError::DuplicateProvider(entry.name.clone()));
            }
            if entry.api_base.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "provider '{}' has no apiBase",
                    entry.name
                )));
            }
            records.push(Arc::new(ProviderRecord::from_entry(entry)));
        }
        records.sort_by_key(|r| r.priority);
        Ok(Self { records })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(config.providers.clone())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Records in attempt order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ProviderRecord>> {
        self.records.iter()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ProviderRecord>> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of providers that have a credential.
    pub fn configured_count(&self) -> usize {
        self.records.iter().filter(|r| r.is_configured()).count()
    }

    /// Highest-priority healthy provider, computed from current state.
    pub fn preferred(&self) -> Option<&Arc<ProviderRecord>> {
        self.records.iter().find(|r| r.is_healthy())
    }

    /// Re-register a provider: restore its health without probing.
    ///
    /// Returns false for unknown or unconfigured providers.
    pub fn reinstate(&self, name: &str) -> bool {
        match self.get(name) {
            Some(record) if record.is_configured() => {
                record.mark_healthy();
                tracing::info!("Provider {} reinstated", name);
                true
            }
            _ => false,
        }
    }
}
