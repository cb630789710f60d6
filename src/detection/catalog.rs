//! Static rule tables for each subject kind.
//!
//! Catalogs are built once on first use and shared read-only afterwards.
//! Kinds may share the same table constants but each kind owns its own
//! compiled rule instances.

use super::{Layer, MatchedSignal, SubjectKind};
use regex::Regex;
use std::sync::OnceLock;

pub const PHISHING_THRESHOLD: u32 = 3;
pub const MAX_SCORE: u32 = 10;

const URL_KEYWORDS: &[&str] = &[
    "login",
    "signin",
    "verify",
    "secure",
    "account",
    "update",
    "confirm",
    "bank",
    "paypal",
    "password",
    "credential",
    "suspend",
    "unusual",
    "activity",
    "validate",
];

const URL_SHORTENERS: &[&str] = &["bit.ly", "tinyurl", "goo.gl", "t.co", "ow.ly", "is.gd"];

const SUSPICIOUS_TLDS: &[&str] = &[".tk", ".ml", ".ga", ".cf", ".gq", ".xyz", ".top"];

const ENCODED_MARKERS: &[&str] = &["base64", "%3d"];

const IPV4_HOST: &str = r"^(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)";

const LINK_TOKENS: &[&str] = &[
    "bit.ly",
    "tinyurl",
    "goo.gl",
    "t.co",
    "login-secure",
    "verify-account",
    "account-verify",
];

const INSECURE_LINK: &str = r#"http://[^\s"']+"#;

const EXTERNAL_HREF: &str = r#"href=["'](http[^"']+)["']"#;

const PHISHING_PHRASES: &[&str] = &[
    "urgent",
    "immediately",
    "verify",
    "confirm",
    "update",
    "suspend",
    "locked",
    "unauthorized",
    "suspicious",
    "click here",
    "click below",
    "login now",
    "password",
    "credit card",
    "bank account",
    "ssn",
    "social security",
    "verify your identity",
    "account will be closed",
    "action required",
    "unusual activity",
    "security alert",
    "24 hours",
    "48 hours",
];

const PASSWORD_REQUESTS: &[&str] = &[
    "send your password",
    "reply with password",
    "email your password",
];

const CREDENTIAL_TEMPLATE: &str = r"(?s)enter your.*to continue";

/// How a rule decides whether it fires.
#[derive(Debug)]
pub enum Matcher {
    /// Fires when the text contains any of the needles.
    AnyOf(&'static [&'static str]),
    /// Fires when the pattern matches anywhere.
    Pattern(Regex),
    /// Fires when the pattern matches more than `threshold` times.
    CountAbove { pattern: Regex, threshold: usize },
}

#[derive(Debug)]
pub struct SignalRule {
    pub layer: Layer,
    pub matcher: Matcher,
    /// `{count}` is replaced with the match count for counting rules.
    pub description: String,
    pub weight: u32,
}

impl SignalRule {
    pub fn new(layer: Layer, matcher: Matcher, description: impl Into<String>, weight: u32) -> Self {
        Self {
            layer,
            matcher,
            description: description.into(),
            weight,
        }
    }

    pub fn check(&self, text: &str) -> Option<MatchedSignal> {
        match &self.matcher {
            Matcher::AnyOf(needles) => needles
                .iter()
                .any(|needle| text.contains(needle))
                .then(|| MatchedSignal::new(self.layer, self.weight, self.description.clone())),
            Matcher::Pattern(pattern) => pattern
                .is_match(text)
                .then(|| MatchedSignal::new(self.layer, self.weight, self.description.clone())),
            Matcher::CountAbove { pattern, threshold } => {
                let count = pattern.find_iter(text).count();
                (count > *threshold).then(|| {
                    MatchedSignal::new(
                        self.layer,
                        self.weight,
                        self.description.replace("{count}", &count.to_string()),
                    )
                })
            }
        }
    }
}

/// An ordered list of rules evaluated independently of one another.
#[derive(Debug)]
pub struct RuleSet {
    pub rules: Vec<SignalRule>,
}

impl RuleSet {
    pub fn evaluate(&self, text: &str) -> Vec<MatchedSignal> {
        self.rules.iter().filter_map(|rule| rule.check(text)).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Lexical checks applied to a single URL.
#[derive(Debug)]
pub struct UrlRules {
    pub keywords: &'static [&'static str],
    pub keyword_weight: u32,
    pub shorteners: &'static [&'static str],
    pub shortener_weight: u32,
    pub ip_host: Regex,
    pub ip_host_weight: u32,
    pub insecure_scheme_weight: u32,
    pub max_subdomains: usize,
    pub subdomain_weight: u32,
    pub suspicious_tlds: &'static [&'static str],
    pub tld_weight: u32,
    pub encoded_markers: &'static [&'static str],
    pub encoded_weight: u32,
    pub credential_marker_weight: u32,
}

#[derive(Debug)]
pub struct FileTypeRule {
    pub suffixes: &'static [&'static str],
    pub description: &'static str,
    pub weight: u32,
}

#[derive(Debug)]
pub struct Recommendations {
    pub phishing: &'static [&'static str],
    pub safe: &'static [&'static str],
}

impl Recommendations {
    pub fn select(&self, is_phishing: bool) -> Vec<String> {
        let list = if is_phishing { self.phishing } else { self.safe };
        list.iter().map(|s| s.to_string()).collect()
    }
}

/// Every table that applies to one subject kind.
#[derive(Debug)]
pub struct Catalog {
    pub kind: SubjectKind,
    /// Lexical rules for the scanned URL itself.
    pub url: Option<UrlRules>,
    /// Link rules for URLs embedded in free text.
    pub links: Option<RuleSet>,
    pub structural: RuleSet,
    pub keywords: RuleSet,
    pub file_types: &'static [FileTypeRule],
    pub recommendations: Recommendations,
}

impl Catalog {
    pub fn for_kind(kind: SubjectKind) -> &'static Catalog {
        static URL: OnceLock<Catalog> = OnceLock::new();
        static FILE: OnceLock<Catalog> = OnceLock::new();
        static EMAIL: OnceLock<Catalog> = OnceLock::new();

        match kind {
            SubjectKind::Url => URL.get_or_init(Self::url_catalog),
            SubjectKind::File => FILE.get_or_init(Self::file_catalog),
            SubjectKind::Email => EMAIL.get_or_init(Self::email_catalog),
        }
    }

    fn url_catalog() -> Catalog {
        Catalog {
            kind: SubjectKind::Url,
            url: Some(url_rules()),
            links: None,
            structural: structural_rules(false),
            keywords: keyword_rules(),
            file_types: &[],
            recommendations: Recommendations {
                phishing: &[
                    "Do not enter any credentials on this page",
                    "Do not download any files from this URL",
                    "Report this URL as phishing",
                    "Do not share this with others",
                ],
                safe: &[
                    "This URL appears relatively safe",
                    "However, always verify the domain",
                    "Never enter sensitive information on unknown sites",
                ],
            },
        }
    }

    fn file_catalog() -> Catalog {
        Catalog {
            kind: SubjectKind::File,
            url: None,
            links: Some(link_rules()),
            structural: structural_rules(true),
            keywords: keyword_rules(),
            file_types: FILE_TYPES,
            recommendations: Recommendations {
                phishing: &[
                    "DO NOT open or execute this file",
                    "This file contains phishing indicators",
                    "Report to your security team",
                    "Delete immediately",
                ],
                safe: &[
                    "No obvious threats detected",
                    "File appears relatively safe",
                    "Always verify the source before opening",
                ],
            },
        }
    }

    fn email_catalog() -> Catalog {
        Catalog {
            kind: SubjectKind::Email,
            url: None,
            links: Some(link_rules()),
            structural: structural_rules(false),
            keywords: keyword_rules(),
            file_types: &[],
            recommendations: Recommendations {
                phishing: &[
                    "Do not click any links in this email",
                    "Do not reply with passwords or personal information",
                    "Report this email as phishing",
                    "Delete the email once reported",
                ],
                safe: &[
                    "No obvious phishing indicators detected",
                    "Still verify the sender before acting on any request",
                    "Never share credentials over email",
                ],
            },
        }
    }
}

const FILE_TYPES: &[FileTypeRule] = &[
    FileTypeRule {
        suffixes: &[".html", ".htm"],
        description: "File type: HTML (markup analyzed)",
        weight: 0,
    },
    FileTypeRule {
        suffixes: &[".txt"],
        description: "File type: Text",
        weight: 0,
    },
    FileTypeRule {
        suffixes: &[".js"],
        description: "File type: JavaScript - extra caution advised",
        weight: 1,
    },
];

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("built-in catalog pattern must compile")
}

fn url_rules() -> UrlRules {
    UrlRules {
        keywords: URL_KEYWORDS,
        keyword_weight: 1,
        shorteners: URL_SHORTENERS,
        shortener_weight: 2,
        ip_host: compile(IPV4_HOST),
        ip_host_weight: 3,
        insecure_scheme_weight: 1,
        max_subdomains: 3,
        subdomain_weight: 2,
        suspicious_tlds: SUSPICIOUS_TLDS,
        tld_weight: 1,
        encoded_markers: ENCODED_MARKERS,
        encoded_weight: 3,
        credential_marker_weight: 3,
    }
}

fn link_rules() -> RuleSet {
    let mut rules: Vec<SignalRule> = LINK_TOKENS
        .iter()
        .map(|token| {
            SignalRule::new(
                Layer::Url,
                Matcher::AnyOf(std::slice::from_ref(token)),
                format!("Suspicious URL: {token}"),
                2,
            )
        })
        .collect();
    rules.push(SignalRule::new(
        Layer::Url,
        Matcher::CountAbove {
            pattern: compile(INSECURE_LINK),
            threshold: 0,
        },
        "{count} insecure HTTP links found",
        1,
    ));
    RuleSet { rules }
}

fn structural_rules(flag_base64: bool) -> RuleSet {
    let mut rules = vec![
        SignalRule::new(Layer::Html, Matcher::AnyOf(&["<form"]), "HTML form detected", 2),
        SignalRule::new(
            Layer::Html,
            Matcher::AnyOf(&["type=\"password\"", "type='password'"]),
            "Password input field detected",
            3,
        ),
        SignalRule::new(
            Layer::Html,
            Matcher::AnyOf(&["<script"]),
            "JavaScript script tags detected",
            2,
        ),
        SignalRule::new(
            Layer::Html,
            Matcher::AnyOf(&["<iframe"]),
            "Inline frame (iframe) detected",
            2,
        ),
        SignalRule::new(
            Layer::Html,
            Matcher::AnyOf(&["onerror=", "onclick="]),
            "Event handlers detected",
            2,
        ),
        SignalRule::new(
            Layer::Html,
            Matcher::AnyOf(&["eval(", "document.write"]),
            "Dangerous JavaScript functions detected",
            3,
        ),
    ];
    if flag_base64 {
        rules.push(SignalRule::new(
            Layer::Html,
            Matcher::AnyOf(&["base64"]),
            "Base64 encoded content detected",
            2,
        ));
    }
    rules.push(SignalRule::new(
        Layer::Html,
        Matcher::CountAbove {
            pattern: compile(EXTERNAL_HREF),
            threshold: 10,
        },
        "Many external links ({count})",
        1,
    ));
    RuleSet { rules }
}

fn keyword_rules() -> RuleSet {
    let mut rules: Vec<SignalRule> = PHISHING_PHRASES
        .iter()
        .map(|phrase| {
            SignalRule::new(
                Layer::Ml,
                Matcher::AnyOf(std::slice::from_ref(phrase)),
                format!("Phishing keyword: \"{phrase}\""),
                1,
            )
        })
        .collect();
    rules.push(SignalRule::new(
        Layer::Ml,
        Matcher::AnyOf(PASSWORD_REQUESTS),
        "Password request detected",
        5,
    ));
    rules.push(SignalRule::new(
        Layer::Ml,
        Matcher::Pattern(compile(CREDENTIAL_TEMPLATE)),
        "Credential harvesting pattern",
        2,
    ));
    RuleSet { rules }
}
