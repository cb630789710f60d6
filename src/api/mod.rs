mod error;
mod handlers;
mod requests;

pub use error::ApiError;
pub use requests::{EmailScanRequest, EmailSubmission, FileScanRequest, UrlScanRequest};

use crate::config::Config;
use crate::engine::ScanEngine;
use crate::fetcher::{HttpPageFetcher, PageFetcher};
use crate::hooks::HookSet;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub engine: ScanEngine,
    pub fetcher: Option<Arc<dyn PageFetcher>>,
    pub hooks: Arc<HookSet>,
}

impl AppState {
    pub fn new(fetcher: Option<Arc<dyn PageFetcher>>, hooks: HookSet) -> Self {
        Self {
            engine: ScanEngine::new(),
            fetcher,
            hooks: Arc::new(hooks),
        }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let fetcher: Option<Arc<dyn PageFetcher>> = if config.fetch.enabled {
            Some(Arc::new(HttpPageFetcher::new(
                config.fetch.timeout(),
                config.fetch.max_bytes,
                &config.fetch.user_agent,
            )?))
        } else {
            None
        };
        let hooks = HookSet::from_config(config)?;
        log::info!(
            "Scanner ready: page fetch {}, {} post-scan hooks",
            if fetcher.is_some() { "enabled" } else { "disabled" },
            hooks.len()
        );
        Ok(Self::new(fetcher, hooks))
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/scan/url", post(handlers::scan_url))
        .route("/api/scan/file", post(handlers::scan_file))
        .route("/api/scan/email", post(handlers::scan_email))
        .with_state(state)
}
