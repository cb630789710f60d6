use super::catalog::FileTypeRule;
use super::{Layer, MatchedSignal};

/// Note the declared file type; only the first matching rule applies.
/// Expects an already lower-cased file name.
pub fn evaluate(rules: &[FileTypeRule], file_name: &str) -> Vec<MatchedSignal> {
    rules
        .iter()
        .find(|rule| rule.suffixes.iter().any(|suffix| file_name.ends_with(suffix)))
        .map(|rule| MatchedSignal::new(Layer::Analysis, rule.weight, rule.description))
        .into_iter()
        .collect()
}
