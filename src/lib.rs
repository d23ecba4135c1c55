pub mod config;
pub mod content;
pub mod fetcher;
pub mod filters;
pub mod karma;
pub mod merge;
pub mod parser;
pub mod pipeline;
pub mod similarity;
pub mod storage;
pub mod types;

pub use config::{FeedKind, FeedSourceConfig, SearchPeriod};
pub use fetcher::SourceFetcher;
pub use filters::FilterReport;
pub use karma::{ForumKarmaClient, KarmaSource};
pub use merge::{MergeEngine, MergeOutcome};
pub use pipeline::{run_target, update_input_feed, update_podcast_feed, RunReport};
pub use storage::{FeedStorage, LocalStorage, MemoryStorage};
pub use types::{AggregatorError, Enclosure, FeedDocument, FeedItem, FetchConfig, Result};
