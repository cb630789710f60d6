pub mod api;
pub mod config;
pub mod detection;
pub mod engine;
pub mod fetcher;
pub mod hooks;
pub mod normalization;
pub mod report;

pub use config::Config;
pub use detection::{Layer, MatchedSignal, SubjectKind};
pub use engine::{aggregate, PageContent, ScanEngine, ScanResult};
pub use report::ScanReport;
