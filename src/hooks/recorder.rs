use super::{HookError, HookOutcome, ScanRecord};
use crate::detection::{Layer, SubjectKind};
use crate::normalization::truncate_chars;
use reqwest::Client;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Flattened scan record accepted by the dashboard datastore.
#[derive(Debug, Serialize)]
struct StoredScan<'a> {
    kind: SubjectKind,
    timestamp: String,
    sender: &'a str,
    subject: &'a str,
    is_phishing: bool,
    total_score: u32,
    url_score: u32,
    html_score: u32,
    ml_score: u32,
    url_reasons: Vec<String>,
    html_reasons: Vec<String>,
    ml_reasons: Vec<String>,
    email_body: &'a str,
}

/// Posts every scan to an external datastore.
pub struct RecordForwarder {
    client: Client,
    endpoint: String,
    body_chars: usize,
}

impl RecordForwarder {
    pub fn new(endpoint: String, body_chars: usize, timeout: Duration) -> Result<Self, HookError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            body_chars,
        })
    }

    fn stored<'a>(&self, record: &'a ScanRecord) -> StoredScan<'a> {
        StoredScan {
            kind: record.result.subject_kind,
            timestamp: record.timestamp.to_rfc3339(),
            sender: &record.sender,
            subject: &record.subject,
            is_phishing: record.result.is_phishing,
            total_score: record.result.total_score,
            url_score: record.layer_score(Layer::Url),
            html_score: record.layer_score(Layer::Html),
            ml_score: record.layer_score(Layer::Ml),
            url_reasons: record.layer_reasons(Layer::Url),
            html_reasons: record.layer_reasons(Layer::Html),
            ml_reasons: record.layer_reasons(Layer::Ml),
            email_body: truncate_chars(&record.body, self.body_chars),
        }
    }

    pub async fn forward(&self, record: &ScanRecord) -> Result<HookOutcome, HookError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&self.stored(record))
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(HookOutcome::Delivered)
        } else {
            Err(HookError::Rejected {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            })
        }
    }
}

#[derive(Debug, Serialize)]
struct JournalEntry<'a> {
    time: String,
    kind: SubjectKind,
    from: &'a str,
    subject: &'a str,
    analysis: &'a crate::engine::ScanResult,
}

/// Appends one JSON line per scan to a local file.
pub struct ScanJournal {
    path: PathBuf,
}

impl ScanJournal {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub async fn append(&self, record: &ScanRecord) -> Result<HookOutcome, HookError> {
        let entry = JournalEntry {
            time: record.timestamp.to_rfc3339(),
            kind: record.result.subject_kind,
            from: &record.sender,
            subject: &record.subject,
            analysis: &record.result,
        };
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(HookOutcome::Delivered)
    }
}
