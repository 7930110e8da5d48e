// src/history/aggregator.rs
// =============================================================================
// Fans out to every configured provider concurrently and merges their
// records into one deduplicated URL list. Merge order is arrival order:
// whichever provider reports a URL first owns it. A provider that errors
// contributes nothing and is logged at debug level.
// =============================================================================

use reqwest::Client;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

use super::providers::{
    CommonCrawlProvider, HistoricalRecord, UrlProvider, VirusTotalProvider, WaybackProvider,
};

const WAYBACK_ENDPOINT: &str = "http://web.archive.org";
const COMMONCRAWL_ENDPOINT: &str = "http://index.commoncrawl.org";
const VIRUSTOTAL_ENDPOINT: &str = "https://www.virustotal.com";

/// The standard provider set: Wayback and Common Crawl always, VirusTotal
/// only when an API key is available.
pub fn default_providers() -> Vec<Arc<dyn UrlProvider>> {
    let mut providers: Vec<Arc<dyn UrlProvider>> = vec![
        Arc::new(WaybackProvider::new(WAYBACK_ENDPOINT)),
        Arc::new(CommonCrawlProvider::new(COMMONCRAWL_ENDPOINT)),
    ];
    if let Some(virustotal) = VirusTotalProvider::from_env(VIRUSTOTAL_ENDPOINT) {
        providers.push(Arc::new(virustotal));
    }
    providers
}

/// Queries all providers for `host` and returns the merged, deduplicated
/// URL list.
pub async fn aggregate(
    client: &Client,
    host: &str,
    providers: Vec<Arc<dyn UrlProvider>>,
) -> Vec<String> {
    let (tx, mut rx) = mpsc::unbounded_channel::<HistoricalRecord>();

    let mut tasks = Vec::new();
    for provider in providers {
        let tx = tx.clone();
        let client = client.clone();
        let host = host.to_string();
        tasks.push(tokio::spawn(async move {
            match provider.fetch(&client, &host).await {
                Ok(records) => {
                    for record in records {
                        if tx.send(record).is_err() {
                            break;
                        }
                    }
                }
                Err(e) => {
                    debug!(provider = provider.name(), error = %e, "provider failed");
                }
            }
        }));
    }
    // the merge loop ends when every producer clone is gone
    drop(tx);

    let mut seen = HashSet::new();
    let mut merged = Vec::new();
    while let Some(record) = rx.recv().await {
        if seen.insert(record.url.clone()) {
            merged.push(record.url);
        }
    }

    for task in tasks {
        let _ = task.await;
    }
    merged
}
