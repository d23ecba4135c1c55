//! Core feed model and error taxonomy.

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedDocument {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    pub language: Option<String>,
    pub copyright: Option<String>,
    pub author: Option<String>,
    pub owner_email: Option<String>,
    pub image: Option<ChannelImage>,
    pub itunes_summary: Option<String>,
    pub itunes_image: Option<String>,
    pub itunes_explicit: Option<String>,
    pub last_build_date: Option<String>,
    /// Items in document order. Duplicates are possible before filtering.
    pub items: Vec<FeedItem>,
}

impl FeedDocument {
    /// Trimmed titles of every item, in document order.
    pub fn item_titles(&self) -> Vec<String> {
        self.items
            .iter()
            .map(|item| item.title.trim().to_string())
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelImage {
    pub url: String,
    pub title: Option<String>,
    pub link: Option<String>,
}

/// One post from an RSS feed.
///
/// `pub_date` is carried verbatim as the RFC-822-like string found in the
/// document; it is only parsed (with the configured format) where a filter
/// needs the actual timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedItem {
    pub guid: Option<String>,
    pub guid_is_permalink: bool,
    pub title: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub dc_creator: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<String>,
    pub content_encoded: Option<String>,
    pub enclosure: Option<Enclosure>,
    pub itunes_duration: Option<String>,
    pub itunes_episode: Option<String>,
    pub itunes_episode_type: Option<String>,
    pub itunes_explicit: Option<String>,
    pub itunes_image: Option<String>,
}

impl FeedItem {
    /// Display name of the item's author.
    ///
    /// Forum feeds only carry `dc:creator` (with underscores for spaces);
    /// provider feeds carry a plain `author` element. The author element
    /// wins when both are present.
    pub fn author_name(&self) -> Option<String> {
        self.author
            .as_deref()
            .map(|a| a.trim().to_string())
            .or_else(|| {
                self.dc_creator
                    .as_deref()
                    .map(|c| c.replace('_', " ").trim().to_string())
            })
    }

    /// A short identifier for log and error messages.
    pub fn ident(&self) -> String {
        self.guid
            .clone()
            .or_else(|| self.link.clone())
            .unwrap_or_else(|| self.title.clone())
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Enclosure {
    pub url: String,
    pub length: String,
    pub mime_type: String,
}

/// HTTP client parameters shared by the source fetcher and the karma ranker.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub user_agent: String,
    pub timeout_seconds: u64,
    pub max_retries: u32,
    pub retry_delay_seconds: u64,
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/83.0.4103.97 Safari/537.36"
                .to_string(),
            timeout_seconds: 30,
            max_retries: 3,
            retry_delay_seconds: 5,
            max_redirects: 5,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed parse error: {0}")]
    Parse(String),

    #[error("XML write error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("item '{item}' is missing required element <{element}>")]
    MissingElement { element: &'static str, item: String },

    #[error("malformed date '{value}': {reason}")]
    MalformedDate { value: String, reason: String },

    #[error("forbidden response from {url}; the request headers may need to change")]
    Forbidden { url: String },

    #[error("no karma score found at {url}")]
    KarmaUnavailable { url: String },

    #[error("not found: {key}")]
    NotFound { key: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, AggregatorError>;
