//! Phrase matching for urgency and credential-harvesting language.
//!
//! This is the layer reported as "ML". It is a fixed phrase list plus two
//! composite checks, nothing is learned.

use super::catalog::RuleSet;
use super::MatchedSignal;

pub fn evaluate(rules: &RuleSet, text: &str) -> Vec<MatchedSignal> {
    rules.evaluate(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::catalog::Catalog;
    use crate::detection::{Layer, SubjectKind};

    fn rules() -> &'static RuleSet {
        &Catalog::for_kind(SubjectKind::Email).keywords
    }

    #[test]
    fn test_credential_harvesting_email() {
        let text = "please verify your account immediately, enter your password to continue";
        let signals = evaluate(rules(), text);
        let reasons: Vec<&str> = signals.iter().map(|s| s.reason.as_str()).collect();

        assert_eq!(
            reasons,
            vec![
                "Phishing keyword: \"immediately\"",
                "Phishing keyword: \"verify\"",
                "Phishing keyword: \"password\"",
                "Credential harvesting pattern",
            ]
        );
        assert_eq!(signals.iter().map(|s| s.weight).sum::<u32>(), 5);
        assert!(signals.iter().all(|s| s.layer == Layer::Ml));
    }

    #[test]
    fn test_password_request() {
        let signals = evaluate(rules(), "kindly reply with password for the audit");
        let request = signals
            .iter()
            .find(|s| s.reason == "Password request detected")
            .unwrap();
        assert_eq!(request.weight, 5);
    }

    #[test]
    fn test_template_requires_order() {
        let signals = evaluate(rules(), "to continue, enter your name");
        assert!(signals
            .iter()
            .all(|s| s.reason != "Credential harvesting pattern"));
    }

    #[test]
    fn test_benign_sentence() {
        assert!(evaluate(rules(), "lunch is at noon in the big room").is_empty());
    }
}
