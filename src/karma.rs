//! Karma lookup for forum posts.
//!
//! Top-post selection ranks candidates by an externally hosted popularity
//! score, scraped from the post's page. The trait seam keeps ranking
//! testable without network access.

use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::Backoff;
use backoff::exponential::ExponentialBackoff;
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use tracing::{debug, warn};

use crate::types::{AggregatorError, FetchConfig, Result};

#[async_trait]
pub trait KarmaSource: Send + Sync {
    /// Resolve the karma score of the post at `url`.
    async fn post_karma(&self, url: &str) -> Result<i64>;
}

/// Scrapes the vote score from a forum post page.
pub struct ForumKarmaClient {
    client: Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl ForumKarmaClient {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;
        Ok(Self {
            client,
            max_retries: config.max_retries,
            retry_delay: Duration::from_secs(config.retry_delay_seconds),
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let mut backoff: ExponentialBackoff<backoff::SystemClock> = ExponentialBackoff {
            current_interval: self.retry_delay,
            initial_interval: self.retry_delay,
            max_interval: self.retry_delay * 8,
            multiplier: 2.0,
            max_elapsed_time: Some(self.retry_delay * 30),
            ..Default::default()
        };

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            match self.client.get(url).send().await {
                Ok(response) => {
                    // A forbidden response must stay distinguishable from
                    // "score zero"; it aborts ranking instead of corrupting it.
                    if response.status() == StatusCode::FORBIDDEN {
                        return Err(AggregatorError::Forbidden {
                            url: url.to_string(),
                        });
                    }
                    let response = response.error_for_status()?;
                    return Ok(response.text().await?);
                }
                Err(e) => {
                    last_error = Some(AggregatorError::Http(e));
                    if attempt < self.max_retries {
                        if let Some(delay) = backoff.next_backoff() {
                            warn!("karma fetch attempt {} failed for {url}, retrying in {delay:?}", attempt + 1);
                            tokio::time::sleep(delay).await;
                            continue;
                        }
                    }
                }
            }
        }

        Err(last_error.unwrap_or(AggregatorError::KarmaUnavailable {
            url: url.to_string(),
        }))
    }
}

#[async_trait]
impl KarmaSource for ForumKarmaClient {
    async fn post_karma(&self, url: &str) -> Result<i64> {
        let page = self.fetch_page(url).await?;
        let karma = extract_karma(&page, url)?;
        debug!("karma {karma} for {url}");
        Ok(karma)
    }
}

/// Pull the numeric vote score out of a post page.
fn extract_karma(page: &str, url: &str) -> Result<i64> {
    let selector = Selector::parse("h1.PostsVote-voteScore")
        .map_err(|e| AggregatorError::Parse(format!("karma selector: {e}")))?;
    let document = Html::parse_document(page);
    let score_text = document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>())
        .ok_or_else(|| AggregatorError::KarmaUnavailable {
            url: url.to_string(),
        })?;
    score_text
        .trim()
        .parse::<i64>()
        .map_err(|_| AggregatorError::KarmaUnavailable {
            url: url.to_string(),
        })
}
