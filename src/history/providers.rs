// src/history/providers.rs
// =============================================================================
// The three passive URL providers.
//
// Wayback Machine  - CDX API, JSON array-of-arrays with a header row
// Common Crawl     - index API, newline-delimited JSON objects
// VirusTotal       - domain report API, only active when VT_API_KEY is set
//
// Each provider is a thin client for one upstream format. Errors propagate
// to the aggregator, which logs them and moves on; a provider failure never
// fails the crawl.
// =============================================================================

use anyhow::{bail, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// One historical sighting of a URL: when it was seen and what it was.
#[derive(Debug, Clone)]
pub struct HistoricalRecord {
    pub timestamp: String,
    pub url: String,
}

/// A source of historical URLs for a host.
#[async_trait]
pub trait UrlProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn fetch(&self, client: &Client, host: &str) -> Result<Vec<HistoricalRecord>>;
}

// -----------------------------------------------------------------------------
// Wayback Machine
// -----------------------------------------------------------------------------

pub struct WaybackProvider {
    endpoint: String,
}

impl WaybackProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl UrlProvider for WaybackProvider {
    fn name(&self) -> &'static str {
        "wayback"
    }

    async fn fetch(&self, client: &Client, host: &str) -> Result<Vec<HistoricalRecord>> {
        let url = format!(
            "{}/cdx/search/cdx?url=*.{}/*&output=json&collapse=urlkey",
            self.endpoint, host
        );
        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("wayback returned HTTP {}", response.status());
        }
        // rows are [urlkey, timestamp, original, mimetype, ...]; the first
        // row is the column header
        let rows: Vec<Vec<String>> = response.json().await?;
        let mut records = Vec::new();
        for row in rows.into_iter().skip(1) {
            if row.len() < 3 {
                debug!(provider = "wayback", "short CDX row skipped");
                continue;
            }
            records.push(HistoricalRecord {
                timestamp: row[1].clone(),
                url: row[2].clone(),
            });
        }
        Ok(records)
    }
}

// -----------------------------------------------------------------------------
// Common Crawl
// -----------------------------------------------------------------------------

pub struct CommonCrawlProvider {
    endpoint: String,
}

impl CommonCrawlProvider {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommonCrawlEntry {
    url: String,
    #[serde(default)]
    timestamp: String,
}

#[async_trait]
impl UrlProvider for CommonCrawlProvider {
    fn name(&self) -> &'static str {
        "commoncrawl"
    }

    async fn fetch(&self, client: &Client, host: &str) -> Result<Vec<HistoricalRecord>> {
        let url = format!(
            "{}/CC-MAIN-2018-22-index?url=*.{}/*&output=json",
            self.endpoint, host
        );
        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("commoncrawl returned HTTP {}", response.status());
        }
        let body = response.text().await?;
        let mut records = Vec::new();
        // one JSON object per line; lines that don't parse are skipped
        for line in body.lines() {
            let entry: CommonCrawlEntry = match serde_json::from_str(line) {
                Ok(entry) => entry,
                Err(_) => {
                    debug!(provider = "commoncrawl", "unparseable index line skipped");
                    continue;
                }
            };
            records.push(HistoricalRecord {
                timestamp: entry.timestamp,
                url: entry.url,
            });
        }
        Ok(records)
    }
}

// -----------------------------------------------------------------------------
// VirusTotal
// -----------------------------------------------------------------------------

pub struct VirusTotalProvider {
    endpoint: String,
    api_key: String,
}

impl VirusTotalProvider {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// VirusTotal needs an API key; without VT_API_KEY in the environment
    /// the provider simply doesn't exist.
    pub fn from_env(endpoint: impl Into<String>) -> Option<Self> {
        let api_key = std::env::var("VT_API_KEY").ok()?;
        if api_key.is_empty() {
            return None;
        }
        Some(Self::new(endpoint, api_key))
    }
}

#[derive(Debug, Deserialize)]
struct VirusTotalReport {
    #[serde(default)]
    detected_urls: Vec<VirusTotalUrl>,
}

#[derive(Debug, Deserialize)]
struct VirusTotalUrl {
    url: String,
}

#[async_trait]
impl UrlProvider for VirusTotalProvider {
    fn name(&self) -> &'static str {
        "virustotal"
    }

    async fn fetch(&self, client: &Client, host: &str) -> Result<Vec<HistoricalRecord>> {
        let url = format!(
            "{}/vtapi/v2/domain/report?apikey={}&domain={}",
            self.endpoint, self.api_key, host
        );
        let response = client.get(&url).send().await?;
        if !response.status().is_success() {
            bail!("virustotal returned HTTP {}", response.status());
        }
        let report: VirusTotalReport = response.json().await?;
        Ok(report
            .detected_urls
            .into_iter()
            .map(|detected| HistoricalRecord {
                timestamp: String::new(),
                url: detected.url,
            })
            .collect())
    }
}
