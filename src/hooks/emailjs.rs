use super::{HookError, HookOutcome, ScanRecord};
use crate::config::AlertConfig;
use crate::detection::Layer;
use crate::normalization::truncate_chars;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct TemplateParams {
    sender: String,
    subject: String,
    timestamp: String,
    score: u32,
    detection_reasons: String,
    email_preview: String,
}

#[derive(Debug, Serialize)]
struct EmailJsRequest<'a> {
    service_id: &'a str,
    template_id: &'a str,
    user_id: &'a str,
    #[serde(rename = "accessToken", skip_serializing_if = "Option::is_none")]
    access_token: Option<&'a str>,
    template_params: TemplateParams,
}

/// Sends a templated alert email through EmailJS for phishing verdicts.
pub struct EmailJsAlerter {
    client: Client,
    config: AlertConfig,
}

impl EmailJsAlerter {
    pub fn new(config: AlertConfig) -> Result<Self, HookError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()?;
        Ok(Self { client, config })
    }

    pub async fn send(&self, record: &ScanRecord) -> Result<HookOutcome, HookError> {
        if !record.result.is_phishing {
            return Ok(HookOutcome::Skipped);
        }

        let payload = self.build_request(record);
        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            log::info!(
                "Phishing alert sent for {} (score {})",
                record.result.subject_identifier,
                record.result.total_score
            );
            Ok(HookOutcome::Delivered)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(HookError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn build_request<'a>(&'a self, record: &ScanRecord) -> EmailJsRequest<'a> {
        EmailJsRequest {
            service_id: &self.config.service_id,
            template_id: &self.config.template_id,
            user_id: &self.config.public_key,
            access_token: self.config.private_key.as_deref(),
            template_params: TemplateParams {
                sender: non_empty_or(&record.sender, "Unknown"),
                subject: non_empty_or(&record.subject, "No Subject"),
                timestamp: record.timestamp.to_rfc3339(),
                score: record.result.total_score,
                detection_reasons: reasons_html(record),
                email_preview: truncate_chars(&record.body, self.config.preview_chars)
                    .replace('\n', "<br>"),
            },
        }
    }
}

fn non_empty_or(value: &str, fallback: &str) -> String {
    if value.trim().is_empty() {
        fallback.to_string()
    } else {
        value.to_string()
    }
}

fn reasons_html(record: &ScanRecord) -> String {
    let items: String = record
        .result
        .signals
        .iter()
        .filter(|s| s.layer != Layer::Analysis)
        .map(|s| format!("<li>{}: {}</li>", s.layer, s.reason))
        .collect();

    if items.is_empty() {
        "<li>No details</li>".to_string()
    } else {
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{aggregate, ScanEngine};
    use crate::detection::SubjectKind;
    use chrono::{TimeZone, Utc};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn alert_config(endpoint: &str) -> AlertConfig {
        AlertConfig {
            enabled: true,
            endpoint: endpoint.to_string(),
            service_id: "service_1".to_string(),
            template_id: "template_1".to_string(),
            public_key: "pub".to_string(),
            private_key: None,
            preview_chars: 10,
            timeout_ms: 2000,
        }
    }

    fn phishing_record() -> ScanRecord {
        let result = ScanEngine::new().scan_email(
            "attacker@evil.example",
            "Security alert",
            "urgent: send your password",
        );
        ScanRecord::email(
            result,
            "Security alert",
            "line one\nline two and more",
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
    }

    /// Accepts one request and answers with `status`, returning the raw request.
    async fn capture_once(status: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&raw);
                if let Some(split) = text.find("\r\n\r\n") {
                    let length = text[..split]
                        .lines()
                        .find_map(|l| l.to_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    if raw.len() >= split + 4 + length || n == 0 {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok"
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            let text = String::from_utf8_lossy(&raw).to_string();
            text.split("\r\n\r\n").nth(1).unwrap_or("").to_string()
        });
        (format!("http://{addr}/api/v1.0/email/send"), handle)
    }

    #[test]
    fn test_request_payload() {
        let alerter = EmailJsAlerter::new(alert_config("http://127.0.0.1:9/")).unwrap();
        let record = phishing_record();
        let json = serde_json::to_value(alerter.build_request(&record)).unwrap();

        assert_eq!(json["service_id"], "service_1");
        assert_eq!(json["template_id"], "template_1");
        assert_eq!(json["user_id"], "pub");
        assert!(json.get("accessToken").is_none());
        assert_eq!(json["template_params"]["sender"], "attacker@evil.example");
        assert_eq!(json["template_params"]["timestamp"], "2024-05-01T12:00:00+00:00");
        assert_eq!(json["template_params"]["email_preview"], "line one<br>l");
        let reasons = json["template_params"]["detection_reasons"].as_str().unwrap();
        assert!(reasons.contains("<li>ML: Password request detected</li>"));
    }

    #[test]
    fn test_reasons_fallback() {
        let record = ScanRecord::new(aggregate(SubjectKind::Email, "a", Vec::new()));
        assert_eq!(reasons_html(&record), "<li>No details</li>");
    }

    #[tokio::test]
    async fn test_clean_scan_is_skipped() {
        let alerter = EmailJsAlerter::new(alert_config("http://127.0.0.1:9/")).unwrap();
        let result = ScanEngine::new().scan_email("a", "Lunch", "noon");
        let outcome = alerter.send(&ScanRecord::new(result)).await.unwrap();
        assert_eq!(outcome, HookOutcome::Skipped);
    }

    #[tokio::test]
    async fn test_alert_delivery() {
        let (endpoint, server) = capture_once("200 OK").await;
        let alerter = EmailJsAlerter::new(alert_config(&endpoint)).unwrap();

        let outcome = alerter.send(&phishing_record()).await.unwrap();
        assert_eq!(outcome, HookOutcome::Delivered);

        let body: serde_json::Value = serde_json::from_str(&server.await.unwrap()).unwrap();
        assert_eq!(body["template_params"]["subject"], "Security alert");
    }

    #[tokio::test]
    async fn test_alert_rejected() {
        let (endpoint, _server) = capture_once("400 Bad Request").await;
        let alerter = EmailJsAlerter::new(alert_config(&endpoint)).unwrap();

        let err = alerter.send(&phishing_record()).await.unwrap_err();
        assert!(matches!(err, HookError::Rejected { status: 400, .. }));
    }
}
