//! JSON response shape shared by the scan endpoints.

use crate::detection::{Layer, SubjectKind};
use crate::engine::{LayerBreakdown, ScanResult};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasonEntry {
    pub layer: Layer,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LayerAnalysis {
    pub url_layer: LayerBreakdown,
    pub html_layer: LayerBreakdown,
    pub ml_layer: LayerBreakdown,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis_layer: Option<LayerBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(rename = "fileName", skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub is_phishing: bool,
    pub score: u32,
    pub reasons: Vec<ReasonEntry>,
    pub analysis: LayerAnalysis,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert_queued: Option<bool>,
}

impl ScanReport {
    pub fn from_result(result: &ScanResult) -> Self {
        let summary = |layer| {
            result
                .layer(layer)
                .cloned()
                .unwrap_or_default()
        };

        let identifier = Some(result.subject_identifier.clone());
        let (url, file_name, sender) = match result.subject_kind {
            SubjectKind::Url => (identifier, None, None),
            SubjectKind::File => (None, identifier, None),
            SubjectKind::Email => (None, None, identifier),
        };

        Self {
            url,
            file_name,
            sender,
            subject: None,
            timestamp: None,
            is_phishing: result.is_phishing,
            score: result.total_score,
            reasons: result
                .signals
                .iter()
                .map(|s| ReasonEntry {
                    layer: s.layer,
                    reason: s.reason.clone(),
                })
                .collect(),
            analysis: LayerAnalysis {
                url_layer: summary(Layer::Url),
                html_layer: summary(Layer::Html),
                ml_layer: summary(Layer::Ml),
                analysis_layer: result.layer(Layer::Analysis).cloned(),
            },
            recommendations: result.recommendations.clone(),
            alert_queued: None,
        }
    }

    /// Attach the email fields echoed back to the caller.
    pub fn with_email(mut self, subject: &str, timestamp: &str, alert_queued: bool) -> Self {
        self.subject = Some(subject.to_string());
        self.timestamp = Some(timestamp.to_string());
        self.alert_queued = Some(alert_queued);
        self
    }
}
