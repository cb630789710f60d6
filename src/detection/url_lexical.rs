use super::catalog::{RuleSet, UrlRules};
use super::{Layer, MatchedSignal};
use url::Url;

/// Score a single lower-cased URL against the lexical rules.
pub fn evaluate(rules: &UrlRules, url: &str) -> Vec<MatchedSignal> {
    let mut signals = Vec::new();

    for keyword in rules.keywords {
        if url.contains(keyword) {
            signals.push(MatchedSignal::new(
                Layer::Url,
                rules.keyword_weight,
                format!("Suspicious keyword: \"{keyword}\""),
            ));
        }
    }

    for shortener in rules.shorteners {
        if url.contains(shortener) {
            signals.push(MatchedSignal::new(
                Layer::Url,
                rules.shortener_weight,
                format!("URL shortener detected: {shortener}"),
            ));
        }
    }

    let host = extract_host(url);
    let host_text = host.as_deref().unwrap_or(url);

    if rules.ip_host.is_match(host_text) {
        signals.push(MatchedSignal::new(
            Layer::Url,
            rules.ip_host_weight,
            "IP address used instead of domain",
        ));
    }

    if url.starts_with("http://") {
        signals.push(MatchedSignal::new(
            Layer::Url,
            rules.insecure_scheme_weight,
            "Insecure HTTP connection",
        ));
    }

    if let Some(host) = host.as_deref() {
        let subdomains = host.matches('.').count();
        if subdomains > rules.max_subdomains {
            signals.push(MatchedSignal::new(
                Layer::Url,
                rules.subdomain_weight,
                format!("Excessive subdomains ({subdomains})"),
            ));
        }

        for tld in rules.suspicious_tlds {
            if host.ends_with(tld) {
                signals.push(MatchedSignal::new(
                    Layer::Url,
                    rules.tld_weight,
                    format!("Suspicious TLD: {tld}"),
                ));
            }
        }
    }

    if rules.encoded_markers.iter().any(|marker| url.contains(marker)) {
        signals.push(MatchedSignal::new(
            Layer::Url,
            rules.encoded_weight,
            "Potential encoded/obfuscated content",
        ));
    }

    if url.contains('@') {
        signals.push(MatchedSignal::new(
            Layer::Url,
            rules.credential_marker_weight,
            "Credentials in URL (@ symbol)",
        ));
    }

    signals
}

/// Score links embedded in free text (file bodies, email bodies).
pub fn evaluate_links(rules: &RuleSet, text: &str) -> Vec<MatchedSignal> {
    rules.evaluate(text)
}

/// Host portion of a URL, tolerating input the URL parser rejects.
pub fn extract_host(url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        return parsed.host_str().map(|h| h.to_lowercase());
    }

    let rest = url.split_once("://").map_or(url, |(_, rest)| rest);
    let authority = rest.split(['/', '?', '#']).next().unwrap_or("");
    let host = authority.rsplit('@').next().unwrap_or("");
    let host = host.split(':').next().unwrap_or("");
    (!host.is_empty()).then(|| host.to_lowercase())
}
