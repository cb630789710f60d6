use super::catalog::RuleSet;
use super::MatchedSignal;

/// Markup checks over file content, email bodies and fetched pages.
pub fn evaluate(rules: &RuleSet, markup: &str) -> Vec<MatchedSignal> {
    rules.evaluate(markup)
}
