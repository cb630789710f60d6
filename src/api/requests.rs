use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::engine::{ScanEngine, ScanResult};
use crate::hooks::{HookSet, ScanRecord};
use crate::report::ScanReport;

use super::error::ApiError;

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

#[derive(Debug, Default, Deserialize)]
pub struct UrlScanRequest {
    pub url: Option<String>,
    #[serde(rename = "urlToScan")]
    pub url_to_scan: Option<String>,
}

impl UrlScanRequest {
    pub fn target(&self) -> Option<&str> {
        present(&self.url).or_else(|| present(&self.url_to_scan))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FileScanRequest {
    pub content: Option<String>,
    #[serde(rename = "fileContent")]
    pub file_content: Option<String>,
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

impl FileScanRequest {
    pub fn content(&self) -> Option<&str> {
        present(&self.content).or_else(|| present(&self.file_content))
    }

    pub fn file_name(&self) -> &str {
        present(&self.file_name).unwrap_or("unknown")
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EmailScanRequest {
    pub sender: Option<String>,
    pub from: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub email_body: Option<String>,
    pub timestamp: Option<String>,
}

impl EmailScanRequest {
    pub fn sender(&self) -> &str {
        present(&self.sender)
            .or_else(|| present(&self.from))
            .unwrap_or("Unknown")
    }

    pub fn raw_subject(&self) -> Option<&str> {
        present(&self.subject)
    }

    pub fn subject(&self) -> &str {
        self.raw_subject().unwrap_or("No Subject")
    }

    pub fn body(&self) -> Option<&str> {
        present(&self.body).or_else(|| present(&self.email_body))
    }

    /// Apply defaults and reject a request with neither subject nor body.
    pub fn submission(&self) -> Result<EmailSubmission, ApiError> {
        if self.raw_subject().is_none() && self.body().is_none() {
            return Err(ApiError::BadRequest(
                "Email subject or body is required".to_string(),
            ));
        }

        let received_at = self
            .timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
            .unwrap_or_else(Utc::now);

        Ok(EmailSubmission {
            sender: self.sender().to_string(),
            subject: self.subject().to_string(),
            scanned_subject: self.raw_subject().unwrap_or_default().to_string(),
            body: self.body().unwrap_or_default().to_string(),
            timestamp: self
                .timestamp
                .clone()
                .unwrap_or_else(|| received_at.to_rfc3339()),
            received_at,
        })
    }
}

/// An email request with its defaults filled in.
#[derive(Debug, Clone)]
pub struct EmailSubmission {
    pub sender: String,
    /// Echoed to the caller; `No Subject` when absent.
    pub subject: String,
    /// What the scanner sees; empty when absent.
    pub scanned_subject: String,
    pub body: String,
    pub timestamp: String,
    pub received_at: DateTime<Utc>,
}

impl EmailSubmission {
    pub fn scan(&self, engine: &ScanEngine) -> ScanResult {
        engine.scan_email(&self.sender, &self.scanned_subject, &self.body)
    }

    /// Build the hook record and the caller's report for a finished scan.
    pub fn conclude(&self, result: ScanResult, hooks: &HookSet) -> (ScanRecord, ScanReport) {
        let record = ScanRecord::email(result, &self.subject, &self.body, self.received_at);
        let report = ScanReport::from_result(&record.result).with_email(
            &self.subject,
            &self.timestamp,
            hooks.alert_applies(&record),
        );
        (record, report)
    }
}
