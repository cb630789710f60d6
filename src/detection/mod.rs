pub mod catalog;
pub mod file_type;
pub mod keyword;
pub mod structural;
pub mod url_lexical;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of heuristic checks a signal was produced by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Layer {
    #[serde(rename = "URL")]
    Url,
    #[serde(rename = "HTML")]
    Html,
    /// Keyword and phrase matching. Named "ML" on the wire for compatibility.
    #[serde(rename = "ML")]
    Ml,
    Analysis,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Url => "URL",
            Layer::Html => "HTML",
            Layer::Ml => "ML",
            Layer::Analysis => "Analysis",
        }
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Url,
    File,
    Email,
}

impl SubjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubjectKind::Url => "url",
            SubjectKind::File => "file",
            SubjectKind::Email => "email",
        }
    }
}

impl fmt::Display for SubjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule that fired against one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedSignal {
    pub layer: Layer,
    pub reason: String,
    pub weight: u32,
}

impl MatchedSignal {
    pub fn new(layer: Layer, weight: u32, reason: impl Into<String>) -> Self {
        Self {
            layer,
            reason: reason.into(),
            weight,
        }
    }
}
