use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Root configuration for modelgate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub providers: Vec<ProviderEntry>,
    pub router: RouterConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            providers: default_providers(),
            router: RouterConfig::default(),
        }
    }
}

impl Config {
    /// Find a provider entry by name.
    pub fn provider(&self, name: &str) -> Option<&ProviderEntry> {
        self.providers.iter().find(|p| p.name == name)
    }

    fn provider_mut(&mut self, name: &str) -> Option<&mut ProviderEntry> {
        self.providers.iter_mut().find(|p| p.name == name)
    }
}

/// What sort of backend a provider is.
///
/// The kind decides which headers are sent and which caller model overrides
/// are honoured. It never influences attempt order; that is `priority` alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Local inference server speaking the OpenAI wire format.
    Local,
    /// Cloud model-routing API that accepts `vendor/model` ids.
    Routing,
    /// Vendor-direct API.
    #[default]
    Vendor,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Local => write!(f, "local"),
            ProviderKind::Routing => write!(f, "routing"),
            ProviderKind::Vendor => write!(f, "vendor"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderEntry {
    pub name: String,
    pub kind: ProviderKind,
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub priority: i32,
    /// Upper bound applied to the request's `max_tokens`.
    pub max_tokens: Option<u32>,
    /// Extra model ids this provider accepts as caller overrides.
    pub models: Vec<String>,
}

impl Default for ProviderEntry {
    fn default() -> Self {
        Self {
            name: String::new(),
            kind: ProviderKind::Vendor,
            api_base: String::new(),
            api_key: String::new(),
            model: String::new(),
            priority: 100,
            max_tokens: None,
            models: Vec::new(),
        }
    }
}

impl ProviderEntry {
    pub fn new(
        name: impl Into<String>,
        kind: ProviderKind,
        api_base: impl Into<String>,
        model: impl Into<String>,
        priority: i32,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            api_base: api_base.into(),
            model: model.into(),
            priority,
            ..Self::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }
}

/// Router behaviour shared by every provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouterConfig {
    /// Substitute a canned demo answer when every provider fails.
    pub fallback: bool,
    pub completion_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub default_max_tokens: u32,
    /// Sent as `X-Title` to routing providers.
    pub app_name: String,
    /// Sent as `HTTP-Referer` to routing providers.
    pub app_url: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            fallback: true,
            completion_timeout_secs: 90,
            probe_timeout_secs: 5,
            default_max_tokens: 2000,
            app_name: "modelgate".to_string(),
            app_url: "https://github.com/modelgate/modelgate".to_string(),
        }
    }
}

fn default_providers() -> Vec<ProviderEntry> {
    vec![
        ProviderEntry::new(
            "local",
            ProviderKind::Local,
            "http://localhost:1234/v1",
            "local-model",
            1,
        ),
        ProviderEntry::new(
            "openrouter",
            ProviderKind::Routing,
            "https://openrouter.ai/api/v1",
            "openai/gpt-4o-mini",
            2,
        )
        .with_max_tokens(4000),
        ProviderEntry::new(
            "openai",
            ProviderKind::Vendor,
            "https://api.openai.com/v1",
            "gpt-4o-mini",
            3,
        )
        .with_max_tokens(4000),
    ]
}

// ====== Config loading/saving ======

/// Load configuration from environment variables.
///
/// Priority:
/// 1. `MODELGATE_CONFIG` env var, full JSON config
/// 2. File (`~/.modelgate/config.json`) or defaults, with individual env vars on top
pub fn load_config_from_env() -> Config {
    load_config_from_env_at(None)
}

/// Same as [`load_config_from_env`] with an explicit config file.
pub fn load_config_from_env_at(config_path: Option<&Path>) -> Config {
    load_config_with(config_path, |var| std::env::var(var).ok())
}

/// Resolve configuration with `lookup` standing in for the environment.
pub fn load_config_with<F>(config_path: Option<&Path>, lookup: F) -> Config
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(json) = lookup("MODELGATE_CONFIG") {
        match serde_json::from_str::<Config>(&json) {
            Ok(config) => return config,
            Err(e) => {
                tracing::warn!("Failed to parse MODELGATE_CONFIG: {}", e);
            }
        }
    }

    let mut cfg = load_config(config_path);
    apply_env_overrides(&mut cfg, lookup);
    cfg
}

fn apply_env_overrides<F>(cfg: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let overlay: &[(&str, &str, fn(&mut ProviderEntry, String))] = &[
        ("local", "LOCAL_LLM_URL", |p, v| p.api_base = v),
        ("local", "LOCAL_LLM_API_KEY", |p, v| p.api_key = v),
        ("local", "LOCAL_LLM_MODEL", |p, v| p.model = v),
        ("openrouter", "OPENROUTER_API_KEY", |p, v| p.api_key = v),
        ("openrouter", "OPENROUTER_MODEL", |p, v| p.model = v),
        ("openai", "OPENAI_API_KEY", |p, v| p.api_key = v),
        ("openai", "OPENAI_MODEL", |p, v| p.model = v),
    ];

    for (provider, var, apply) in overlay {
        if let Some(v) = lookup(*var) {
            match cfg.provider_mut(provider) {
                Some(entry) => apply(entry, v),
                None => tracing::debug!("{} set but no '{}' provider is configured", var, provider),
            }
        }
    }

    if let Some(v) = lookup("MODELGATE_FALLBACK") {
        cfg.router.fallback = !matches!(v.trim().to_lowercase().as_str(), "0" | "false" | "off" | "no");
    }
}

/// Get the default configuration file path.
pub fn get_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".modelgate")
        .join("config.json")
}

/// Load configuration from file or create default.
pub fn load_config(config_path: Option<&Path>) -> Config {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if path.exists() {
        match read_config(&path) {
            Ok(config) => return config,
            Err(e) => {
                tracing::warn!("{} ({}), using default configuration", e, path.display());
            }
        }
    }

    Config::default()
}

/// Read and parse a config file, reporting why it could not be used.
pub fn read_config(path: &Path) -> std::result::Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    Ok(serde_json::from_str::<Config>(&content)?)
}

/// Save configuration to file.
pub fn save_config(config: &Config, config_path: Option<&Path>) -> std::result::Result<(), ConfigError> {
    let path = config_path
        .map(|p| p.to_path_buf())
        .unwrap_or_else(get_config_path);

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    }

    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(&path, json).map_err(|e| ConfigError::Invalid(e.to_string()))?;
    Ok(())
}
