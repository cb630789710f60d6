//! Side effects that run after a scan completes.
//!
//! Hooks receive the finished [`ScanRecord`] on a spawned task. Their
//! failures are logged and never reach the HTTP caller.

pub mod emailjs;
pub mod recorder;

use crate::config::Config;
use crate::detection::Layer;
use crate::engine::ScanResult;
use chrono::{DateTime, Utc};
use std::sync::Arc;

pub use emailjs::EmailJsAlerter;
pub use recorder::{RecordForwarder, ScanJournal};

/// A finished scan plus the raw fields the hooks report on.
#[derive(Debug, Clone)]
pub struct ScanRecord {
    pub result: ScanResult,
    pub sender: String,
    pub subject: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
}

impl ScanRecord {
    pub fn new(result: ScanResult) -> Self {
        let subject = result.subject_identifier.clone();
        Self {
            result,
            sender: String::new(),
            subject,
            body: String::new(),
            timestamp: Utc::now(),
        }
    }

    pub fn email(result: ScanResult, subject: &str, body: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            sender: result.subject_identifier.clone(),
            subject: subject.to_string(),
            body: body.to_string(),
            timestamp,
            result,
        }
    }

    pub fn layer_reasons(&self, layer: Layer) -> Vec<String> {
        self.result
            .layer(layer)
            .map(|b| b.reasons.clone())
            .unwrap_or_default()
    }

    pub fn layer_score(&self, layer: Layer) -> u32 {
        self.result.layer(layer).map_or(0, |b| b.score)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookOutcome {
    Delivered,
    Skipped,
}

#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Endpoint rejected request with status {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub enum PostScanHook {
    Alert(EmailJsAlerter),
    Forward(RecordForwarder),
    Journal(ScanJournal),
}

impl PostScanHook {
    pub fn name(&self) -> &'static str {
        match self {
            PostScanHook::Alert(_) => "emailjs-alert",
            PostScanHook::Forward(_) => "record-forward",
            PostScanHook::Journal(_) => "journal",
        }
    }

    pub async fn run(&self, record: &ScanRecord) -> Result<HookOutcome, HookError> {
        match self {
            PostScanHook::Alert(alerter) => alerter.send(record).await,
            PostScanHook::Forward(forwarder) => forwarder.forward(record).await,
            PostScanHook::Journal(journal) => journal.append(record).await,
        }
    }

    fn fires_for(&self, record: &ScanRecord) -> bool {
        match self {
            PostScanHook::Alert(_) => record.result.is_phishing,
            _ => true,
        }
    }
}

#[derive(Default)]
pub struct HookSet {
    hooks: Vec<Arc<PostScanHook>>,
}

impl HookSet {
    pub fn new(hooks: Vec<PostScanHook>) -> Self {
        Self {
            hooks: hooks.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, HookError> {
        let mut hooks = Vec::new();
        if config.alerts.enabled {
            hooks.push(PostScanHook::Alert(EmailJsAlerter::new(config.alerts.clone())?));
        }
        if let Some(endpoint) = &config.recorder.endpoint {
            hooks.push(PostScanHook::Forward(RecordForwarder::new(
                endpoint.clone(),
                config.recorder.body_chars,
                std::time::Duration::from_millis(config.recorder.timeout_ms),
            )?));
        }
        if let Some(path) = &config.recorder.journal_path {
            hooks.push(PostScanHook::Journal(ScanJournal::new(path)));
        }
        Ok(Self::new(hooks))
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Whether an EmailJS alert goes out for `record`.
    pub fn alert_applies(&self, record: &ScanRecord) -> bool {
        self.hooks
            .iter()
            .any(|hook| matches!(hook.as_ref(), PostScanHook::Alert(_)) && hook.fires_for(record))
    }

    /// Spawn every applicable hook without waiting on it.
    pub fn dispatch(&self, record: ScanRecord) {
        let record = Arc::new(record);

        for hook in &self.hooks {
            if !hook.fires_for(&record) {
                continue;
            }

            let hook = Arc::clone(hook);
            let record = Arc::clone(&record);
            tokio::spawn(async move {
                match hook.run(&record).await {
                    Ok(outcome) => log::debug!(
                        "Hook {} finished for {}: {:?}",
                        hook.name(),
                        record.result.subject_identifier,
                        outcome
                    ),
                    Err(e) => log::warn!(
                        "Hook {} failed for {}: {}",
                        hook.name(),
                        record.result.subject_identifier,
                        e
                    ),
                }
            });
        }
    }

    /// Run every applicable hook in order and wait for each.
    pub async fn run_all(&self, record: &ScanRecord) -> Vec<(&'static str, Result<HookOutcome, HookError>)> {
        let mut outcomes = Vec::with_capacity(self.hooks.len());
        for hook in &self.hooks {
            if hook.fires_for(record) {
                outcomes.push((hook.name(), hook.run(record).await));
            }
        }
        outcomes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ScanEngine;

    #[test]
    fn test_from_default_config_has_no_hooks() {
        let hooks = HookSet::from_config(&Config::default()).unwrap();
        assert!(hooks.is_empty());
    }

    #[test]
    fn test_from_config_builds_enabled_hooks() {
        let mut config = Config::default();
        config.alerts.enabled = true;
        config.alerts.service_id = "service".into();
        config.alerts.template_id = "template".into();
        config.recorder.endpoint = Some("http://127.0.0.1:9/api/add_email".into());
        config.recorder.journal_path = Some("/tmp/nophish-journal.jsonl".into());

        let hooks = HookSet::from_config(&config).unwrap();
        assert_eq!(hooks.len(), 3);
    }

    #[test]
    fn test_email_record_fields() {
        let result = ScanEngine::new().scan_email("x@evil.example", "Alert", "urgent");
        let record = ScanRecord::email(result, "Alert", "urgent", Utc::now());
        assert_eq!(record.sender, "x@evil.example");
        assert_eq!(record.layer_score(Layer::Ml), 1);
        assert_eq!(record.layer_reasons(Layer::Html), Vec::<String>::new());
    }

    #[tokio::test]
    async fn test_dispatch_without_alert_hook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scans.jsonl");
        let hooks = HookSet::new(vec![PostScanHook::Journal(ScanJournal::new(&path))]);

        let record = ScanRecord::new(ScanEngine::new().scan_email("a", "urgent", "verify password"));
        assert!(!hooks.alert_applies(&record));
        hooks.dispatch(record);
    }

    #[test]
    fn test_alert_applies_only_to_phishing() {
        let mut alerts = Config::default().alerts;
        alerts.enabled = true;
        alerts.endpoint = "http://127.0.0.1:9/send".into();
        let hooks = HookSet::new(vec![PostScanHook::Alert(EmailJsAlerter::new(alerts).unwrap())]);

        let engine = ScanEngine::new();
        let phishing = engine.scan_email("a", "urgent", "send your password");
        let clean = engine.scan_email("a", "Lunch", "noon");
        assert!(hooks.alert_applies(&ScanRecord::new(phishing)));
        assert!(!hooks.alert_applies(&ScanRecord::new(clean)));
    }

    #[tokio::test]
    async fn test_run_all_skips_alert_for_clean_scan() {
        let mut alerts = Config::default().alerts;
        alerts.enabled = true;
        alerts.endpoint = "http://127.0.0.1:9/send".into();
        let hooks = HookSet::new(vec![PostScanHook::Alert(EmailJsAlerter::new(alerts).unwrap())]);

        let result = ScanEngine::new().scan_email("a", "Lunch", "noon");
        let outcomes = hooks.run_all(&ScanRecord::new(result)).await;
        assert!(outcomes.is_empty());
    }
}
