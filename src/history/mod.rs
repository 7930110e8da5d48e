// src/history/mod.rs
// =============================================================================
// Historical URL discovery: passive sources that have already crawled the
// target. Each provider speaks its own API; the aggregator fans out to all
// of them concurrently and merges their answers first-arrival-wins.
// =============================================================================

mod aggregator;
mod providers;

pub use aggregator::{aggregate, default_providers};
pub use providers::{
    CommonCrawlProvider, HistoricalRecord, UrlProvider, VirusTotalProvider, WaybackProvider,
};
