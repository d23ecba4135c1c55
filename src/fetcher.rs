//! Source fetcher.
//!
//! Resolves a source — an `http(s)` URL or a path to a local XML file —
//! to a parsed [`FeedDocument`]. The HTTP client is built once from an
//! injected [`FetchConfig`]; there is no process-global state and every
//! request carries a finite timeout.

use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::parser;
use crate::types::{AggregatorError, FeedDocument, FetchConfig, Result};

pub struct SourceFetcher {
    client: Client,
}

impl SourceFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }

    /// Fetch and parse the feed at `source`.
    ///
    /// Network and parse failures are both fatal for the run; a feed is
    /// never half-processed.
    pub async fn fetch(&self, source: &str) -> Result<FeedDocument> {
        match Url::parse(source) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                debug!("fetching feed from {url}");
                let response = self.client.get(url).send().await?.error_for_status()?;
                let xml = response.text().await?;
                parser::parse_feed(&xml)
            }
            Ok(url) if url.scheme() == "file" => {
                let path = url
                    .to_file_path()
                    .map_err(|_| AggregatorError::Parse(format!("invalid file URL '{source}'")))?;
                let xml = tokio::fs::read_to_string(path).await?;
                parser::parse_feed(&xml)
            }
            Ok(url) => Err(AggregatorError::Parse(format!(
                "unsupported URL scheme '{}'",
                url.scheme()
            ))),
            // Not a URL at all: treat it as a local path.
            Err(_) => {
                debug!("reading feed from local path {source}");
                let xml = tokio::fs::read_to_string(source).await?;
                parser::parse_feed(&xml)
            }
        }
    }
}
