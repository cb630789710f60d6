use crate::engine::PageContent;
use reqwest::Client;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub type FetchFuture<'a> = Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>>;

/// Source of page markup for URL scans.
pub trait PageFetcher: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a>;
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Fetches a page over HTTP with a hard deadline and a body-size cap.
pub struct HttpPageFetcher {
    client: Client,
    timeout: Duration,
    max_bytes: usize,
}

impl HttpPageFetcher {
    pub fn new(timeout: Duration, max_bytes: usize, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self {
            client,
            timeout,
            max_bytes,
        })
    }

    async fn fetch_capped(&self, url: &str) -> Result<String, FetchError> {
        let mut response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            log::debug!("{} answered with status {}, scanning body anyway", url, response.status());
        }
        let mut body: Vec<u8> = Vec::new();

        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() >= self.max_bytes {
                body.truncate(self.max_bytes);
                log::debug!("Page body for {} capped at {} bytes", url, self.max_bytes);
                break;
            }
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}

impl PageFetcher for HttpPageFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            match tokio::time::timeout(self.timeout, self.fetch_capped(url)).await {
                Ok(result) => result,
                Err(_) => Err(FetchError::Timeout(self.timeout)),
            }
        })
    }
}

/// Fetch `url` for a URL scan. Failures degrade to [`PageContent::Unavailable`].
pub async fn page_content(fetcher: Option<&dyn PageFetcher>, url: &str) -> PageContent {
    let Some(fetcher) = fetcher else {
        return PageContent::Skipped;
    };
    match fetcher.fetch(url).await {
        Ok(markup) => PageContent::Fetched(markup),
        Err(e) => {
            log::warn!("Could not fetch {url}: {e}");
            PageContent::Unavailable
        }
    }
}
