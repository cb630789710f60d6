//! Layer selection per subject kind and score aggregation.

use crate::detection::catalog::{Catalog, MAX_SCORE, PHISHING_THRESHOLD};
use crate::detection::{
    file_type, keyword, structural, url_lexical, Layer, MatchedSignal, SubjectKind,
};
use crate::normalization;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LayerBreakdown {
    pub count: usize,
    pub score: u32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    pub subject_kind: SubjectKind,
    pub subject_identifier: String,
    /// Uncapped sum of signal weights.
    pub raw_score: u32,
    pub total_score: u32,
    pub is_phishing: bool,
    pub signals: Vec<MatchedSignal>,
    pub per_layer_breakdown: BTreeMap<Layer, LayerBreakdown>,
    pub recommendations: Vec<String>,
}

impl ScanResult {
    pub fn layer(&self, layer: Layer) -> Option<&LayerBreakdown> {
        self.per_layer_breakdown.get(&layer)
    }
}

/// What the page fetcher produced for a URL scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageContent {
    /// No fetch was attempted.
    Skipped,
    Fetched(String),
    /// The fetch failed or timed out.
    Unavailable,
}

/// Combine evaluator outputs, in invocation order, into a scan result.
pub fn aggregate(
    kind: SubjectKind,
    identifier: impl Into<String>,
    outputs: Vec<Vec<MatchedSignal>>,
) -> ScanResult {
    let signals: Vec<MatchedSignal> = outputs.into_iter().flatten().collect();

    let raw_score: u32 = signals.iter().map(|s| s.weight).sum();
    let total_score = raw_score.min(MAX_SCORE);
    let is_phishing = total_score >= PHISHING_THRESHOLD;

    let mut per_layer_breakdown: BTreeMap<Layer, LayerBreakdown> = BTreeMap::new();
    for signal in &signals {
        let entry = per_layer_breakdown.entry(signal.layer).or_default();
        entry.count += 1;
        entry.score += signal.weight;
        entry.reasons.push(signal.reason.clone());
    }

    ScanResult {
        subject_kind: kind,
        subject_identifier: identifier.into(),
        raw_score,
        total_score,
        is_phishing,
        signals,
        per_layer_breakdown,
        recommendations: Catalog::for_kind(kind).recommendations.select(is_phishing),
    }
}

/// Stateless entry point that runs the layers applicable to each subject kind.
#[derive(Debug, Clone, Copy)]
pub struct ScanEngine {
    url: &'static Catalog,
    file: &'static Catalog,
    email: &'static Catalog,
}

impl Default for ScanEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanEngine {
    pub fn new() -> Self {
        Self {
            url: Catalog::for_kind(SubjectKind::Url),
            file: Catalog::for_kind(SubjectKind::File),
            email: Catalog::for_kind(SubjectKind::Email),
        }
    }

    pub fn scan_url(&self, url: &str, page: &PageContent) -> ScanResult {
        let text = normalization::normalize(url);
        let mut outputs = Vec::with_capacity(4);

        if let Some(rules) = &self.url.url {
            outputs.push(url_lexical::evaluate(rules, &text));
        }

        match page {
            PageContent::Fetched(markup) if !markup.is_empty() => {
                let markup = normalization::normalize(markup);
                outputs.push(structural::evaluate(&self.url.structural, &markup));
            }
            PageContent::Unavailable => outputs.push(vec![MatchedSignal::new(
                Layer::Analysis,
                0,
                "Could not fetch URL content for deeper analysis",
            )]),
            _ => {}
        }

        outputs.push(keyword::evaluate(&self.url.keywords, &text));

        self.finish(SubjectKind::Url, url, outputs)
    }

    /// `raw_content` may carry a `base64:` prefix.
    pub fn scan_file(&self, file_name: &str, raw_content: &str) -> ScanResult {
        let text = normalization::normalize(&normalization::decode_file_content(raw_content));
        let mut outputs = Vec::with_capacity(4);

        if let Some(links) = &self.file.links {
            outputs.push(url_lexical::evaluate_links(links, &text));
        }
        outputs.push(structural::evaluate(&self.file.structural, &text));
        outputs.push(keyword::evaluate(&self.file.keywords, &text));
        outputs.push(file_type::evaluate(
            self.file.file_types,
            &normalization::normalize(file_name),
        ));

        self.finish(SubjectKind::File, file_name, outputs)
    }

    pub fn scan_email(&self, sender: &str, subject: &str, body: &str) -> ScanResult {
        let text = normalization::email_text(subject, body);
        let mut outputs = Vec::with_capacity(3);

        if let Some(links) = &self.email.links {
            outputs.push(url_lexical::evaluate_links(links, &text));
        }
        outputs.push(structural::evaluate(&self.email.structural, &text));
        outputs.push(keyword::evaluate(&self.email.keywords, &text));

        self.finish(SubjectKind::Email, sender, outputs)
    }

    fn finish(
        &self,
        kind: SubjectKind,
        identifier: &str,
        outputs: Vec<Vec<MatchedSignal>>,
    ) -> ScanResult {
        let result = aggregate(kind, identifier, outputs);
        log::debug!(
            "{} scan of {:?}: score {} (raw {}), {} signals, phishing={}",
            kind,
            identifier,
            result.total_score,
            result.raw_score,
            result.signals.len(),
            result.is_phishing
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ScanEngine {
        ScanEngine::new()
    }

    #[test]
    fn test_empty_aggregate() {
        let result = aggregate(SubjectKind::Email, "nobody", Vec::new());
        assert_eq!(result.total_score, 0);
        assert!(!result.is_phishing);
        assert!(result.signals.is_empty());
        assert!(result.per_layer_breakdown.is_empty());
        assert_eq!(
            result.recommendations[0],
            "No obvious phishing indicators detected"
        );
    }

    #[test]
    fn test_aggregate_caps_score() {
        let outputs = vec![
            vec![
                MatchedSignal::new(Layer::Url, 3, "a"),
                MatchedSignal::new(Layer::Url, 3, "b"),
            ],
            vec![
                MatchedSignal::new(Layer::Html, 3, "c"),
                MatchedSignal::new(Layer::Ml, 5, "d"),
            ],
        ];
        let result = aggregate(SubjectKind::File, "x.html", outputs);
        assert_eq!(result.raw_score, 14);
        assert_eq!(result.total_score, 10);
        assert!(result.is_phishing);
    }

    #[test]
    fn test_aggregate_keeps_invocation_order() {
        let outputs = vec![
            vec![MatchedSignal::new(Layer::Ml, 1, "first")],
            vec![
                MatchedSignal::new(Layer::Url, 2, "second"),
                MatchedSignal::new(Layer::Ml, 1, "third"),
            ],
        ];
        let result = aggregate(SubjectKind::Email, "s", outputs);
        let reasons: Vec<&str> = result.signals.iter().map(|s| s.reason.as_str()).collect();
        assert_eq!(reasons, vec!["first", "second", "third"]);

        let ml = result.layer(Layer::Ml).unwrap();
        assert_eq!(ml.count, 2);
        assert_eq!(ml.score, 2);
        assert_eq!(ml.reasons, vec!["first", "third"]);
    }

    #[test]
    fn test_threshold_boundary() {
        let below = aggregate(
            SubjectKind::Url,
            "u",
            vec![vec![MatchedSignal::new(Layer::Url, 2, "x")]],
        );
        let at = aggregate(
            SubjectKind::Url,
            "u",
            vec![vec![MatchedSignal::new(Layer::Url, 3, "x")]],
        );
        assert!(!below.is_phishing);
        assert!(at.is_phishing);
    }

    #[test]
    fn test_shortened_url_is_phishing() {
        let result = engine().scan_url("http://bit.ly/login-verify-account", &PageContent::Skipped);
        assert!(result.is_phishing);
        assert!(result.total_score >= 6);
        assert_eq!(result.layer(Layer::Url).unwrap().score, 6);
        assert_eq!(result.subject_identifier, "http://bit.ly/login-verify-account");
    }

    #[test]
    fn test_plain_url_is_clean() {
        let result = engine().scan_url("https://example.com/about", &PageContent::Skipped);
        assert_eq!(result.total_score, 0);
        assert!(!result.is_phishing);
        assert!(result.signals.is_empty());
    }

    #[test]
    fn test_url_scan_with_page_markup() {
        let page = PageContent::Fetched("<FORM action=x><INPUT TYPE=\"password\"></FORM>".into());
        let result = engine().scan_url("https://example.com/about", &page);
        assert_eq!(result.layer(Layer::Html).unwrap().score, 5);
        assert!(result.is_phishing);
    }

    #[test]
    fn test_unavailable_page_is_noted_without_weight() {
        let result = engine().scan_url("https://example.com/about", &PageContent::Unavailable);
        assert_eq!(result.total_score, 0);
        assert!(!result.is_phishing);
        let note = result.layer(Layer::Analysis).unwrap();
        assert_eq!(
            note.reasons,
            vec!["Could not fetch URL content for deeper analysis"]
        );
    }

    #[test]
    fn test_login_form_file() {
        let result = engine().scan_file("unknown", "<form><input type=\"password\">");
        assert_eq!(result.layer(Layer::Html).unwrap().score, 5);
        assert!(result.is_phishing);
    }

    #[test]
    fn test_base64_file_is_decoded() {
        // "<form><input type='password'>"
        let encoded = "base64:PGZvcm0+PGlucHV0IHR5cGU9J3Bhc3N3b3JkJz4=";
        let result = engine().scan_file("page.html", encoded);
        let html = result.layer(Layer::Html).unwrap();
        assert_eq!(
            html.reasons,
            vec!["HTML form detected", "Password input field detected"]
        );
        assert_eq!(
            result.layer(Layer::Analysis).unwrap().reasons,
            vec!["File type: HTML (markup analyzed)"]
        );
    }

    #[test]
    fn test_unpadded_base64_file_is_decoded() {
        let result = engine().scan_file("x", "base64:PGZvcm0");
        assert_eq!(
            result.layer(Layer::Html).unwrap().reasons,
            vec!["HTML form detected"]
        );
        assert_eq!(result.total_score, 2);
    }

    #[test]
    fn test_credential_email() {
        let result = engine().scan_email(
            "attacker@example.net",
            "",
            "Please verify your account immediately, enter your password to continue",
        );
        assert_eq!(result.layer(Layer::Ml).unwrap().score, 5);
        assert_eq!(result.total_score, 5);
        assert!(result.is_phishing);
    }

    #[test]
    fn test_empty_inputs_are_clean() {
        let e = engine();
        for result in [
            e.scan_email("someone", "", ""),
            e.scan_file("unknown", ""),
            e.scan_email("someone", "Lunch", "See you at noon in the big room."),
        ] {
            assert_eq!(result.total_score, 0);
            assert!(!result.is_phishing);
            assert!(result.signals.is_empty());
        }
    }

    #[test]
    fn test_case_insensitive_matching() {
        let e = engine();
        let upper = e.scan_email("a", "URGENT", "VERIFY YOUR IDENTITY");
        let lower = e.scan_email("a", "urgent", "verify your identity");
        assert_eq!(upper.signals, lower.signals);
        assert_eq!(upper.total_score, lower.total_score);
    }

    #[test]
    fn test_scans_are_idempotent() {
        let e = engine();
        let first = e.scan_file("a.js", "<script>document.write('x')</script>");
        let second = e.scan_file("a.js", "<script>document.write('x')</script>");
        assert_eq!(first, second);
    }

    #[test]
    fn test_score_bounds_hold() {
        let e = engine();
        let samples = [
            e.scan_url("http://1.2.3.4@a.b.c.d.e.tk/login?base64=%3D", &PageContent::Skipped),
            e.scan_file(
                "x.js",
                "<form><input type='password'><script>eval(1)</script><iframe onclick=x> \
                 urgent: send your password, enter your pin to continue http://bit.ly/z",
            ),
            e.scan_email("b", "hi", "hello"),
        ];
        for result in samples {
            assert!(result.total_score <= MAX_SCORE);
            assert_eq!(result.is_phishing, result.total_score >= PHISHING_THRESHOLD);
            assert_eq!(
                result.total_score,
                result.signals.iter().map(|s| s.weight).sum::<u32>().min(MAX_SCORE)
            );
            for signal in &result.signals {
                assert!(result.per_layer_breakdown.contains_key(&signal.layer));
            }
        }
    }
}
