use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub fetch: FetchConfig,
    pub alerts: AlertConfig,
    pub recorder: RecorderConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8888".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Fetch target pages during URL scans to feed the markup layer.
    pub enabled: bool,
    pub timeout_ms: u64,
    pub max_bytes: usize,
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5000,
            max_bytes: 50_000,
            user_agent: concat!("nophish/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// EmailJS delivery settings for phishing alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub service_id: String,
    pub template_id: String,
    pub public_key: String,
    pub private_key: Option<String>,
    pub preview_chars: usize,
    pub timeout_ms: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: EMAILJS_ENDPOINT.to_string(),
            service_id: String::new(),
            template_id: String::new(),
            public_key: String::new(),
            private_key: None,
            preview_chars: 500,
            timeout_ms: 10_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Datastore endpoint that receives every scan record.
    pub endpoint: Option<String>,
    /// Local JSON-lines journal of scans.
    pub journal_path: Option<String>,
    pub body_chars: usize,
    pub timeout_ms: u64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            journal_path: None,
            body_chars: 5000,
            timeout_ms: 5000,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {path}"))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {path}"))?;
        Ok(config)
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        if std::path::Path::new(path).exists() {
            Self::from_file(path)
        } else {
            log::warn!("Configuration file '{path}' not found, using default configuration");
            Ok(Self::default())
        }
    }

    pub fn to_yaml(&self) -> anyhow::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Overlay values supplied through the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let lookup = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(bind) = lookup("NOPHISH_BIND") {
            self.server.bind_address = bind;
        }
        if let Some(id) = lookup("EMAILJS_SERVICE_ID") {
            self.alerts.service_id = id;
            self.alerts.enabled = true;
        }
        if let Some(id) = lookup("EMAILJS_TEMPLATE_ID") {
            self.alerts.template_id = id;
        }
        if let Some(key) = lookup("EMAILJS_PUBLIC_KEY") {
            self.alerts.public_key = key;
        }
        if let Some(key) = lookup("EMAILJS_PRIVATE_KEY") {
            self.alerts.private_key = Some(key);
        }
        if let Some(url) = lookup("NOPHISH_RECORD_URL") {
            self.recorder.endpoint = Some(url);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            bail!("Invalid bind address: {}", self.server.bind_address);
        }
        if self.fetch.enabled && (self.fetch.timeout_ms == 0 || self.fetch.max_bytes == 0) {
            bail!("Page fetch requires a non-zero timeout_ms and max_bytes");
        }
        if self.alerts.enabled {
            if self.alerts.service_id.is_empty() || self.alerts.template_id.is_empty() {
                bail!("Alerts are enabled but service_id or template_id is empty");
            }
            url::Url::parse(&self.alerts.endpoint)
                .with_context(|| format!("Invalid alert endpoint: {}", self.alerts.endpoint))?;
        }
        if let Some(endpoint) = &self.recorder.endpoint {
            url::Url::parse(endpoint)
                .with_context(|| format!("Invalid recorder endpoint: {endpoint}"))?;
        }
        Ok(())
    }
}
