// src/crawl/orchestrator.rs
// =============================================================================
// The crawl orchestrator: one Crawler per seed.
//
// A crawl fans out to four channels running under a single join barrier:
// 1. live page traversal starting at the seed URL (anchor/script/form hooks)
// 2. robots.txt  - Allow/Disallow paths become candidate URLs
// 3. sitemap.xml - every <loc> entry becomes a candidate URL
// 4. historical URL aggregation across the passive-recon providers
//
// Every candidate flows through the same pipeline: dedup first (the atomic
// insert decides which channel "owns" an asset), then the scope policy,
// then the reporter and the request recorder. With depth > 1 the robots,
// sitemap and history channels also feed their URLs back into the
// traversal queue as extra seeds.
//
// Failure containment: a channel that errors (network failure, bad status,
// unparseable body) contributes zero findings and is logged at debug level;
// it never fails the crawl. The only hard error is an empty seed.
// =============================================================================

use anyhow::{bail, Result};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

use crate::history::{self, UrlProvider};
use crate::linkfinder;
use crate::report::{AssetKind, Reporter};
use crate::scope::ScopePolicy;

use super::cancel::CancelToken;
use super::dedup::{AssetDedup, Category};
use super::recorder::{RecordedRequest, RequestRecorder};
use super::seed::Seed;
use super::traversal::{CrawlHooks, FoundRef, Traverser, TraverserHandle};

// The user agent the original recon crawlers present.
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/78.0.3904.108 Safari/537.36";

// Matches robots.txt Allow/Disallow directives; replacing the match with
// nothing strips the directive prefix and leaves the path.
static ROBOTS_DIRECTIVE: Lazy<Regex> = Lazy::new(|| Regex::new(r".*llow: ").unwrap());

// Pulls location entries out of a sitemap body.
static SITEMAP_LOC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<loc>\s*([^<]+?)\s*</loc>").unwrap());

/// One crawl instance: everything here is per-seed; independent seeds share
/// nothing but the output sink.
pub struct Crawler {
    seed: Seed,
    policy: ScopePolicy,
    dedup: AssetDedup,
    recorder: RequestRecorder,
    reporter: Arc<Reporter>,
    client: Client,
    cancel: CancelToken,
    providers: Vec<Arc<dyn UrlProvider>>,
}

impl Crawler {
    pub fn new(seed: Seed, reporter: Arc<Reporter>) -> Result<Self> {
        Self::with_providers(seed, reporter, history::default_providers())
    }

    /// Like `new`, but with an explicit historical provider set.
    pub fn with_providers(
        seed: Seed,
        reporter: Arc<Reporter>,
        providers: Vec<Arc<dyn UrlProvider>>,
    ) -> Result<Self> {
        let policy = ScopePolicy::new(&seed.base, seed.strategy)?;
        let client = build_client(&seed)?;
        Ok(Self {
            recorder: RequestRecorder::new(seed.headers.clone()),
            policy,
            dedup: AssetDedup::new(),
            reporter,
            client,
            cancel: CancelToken::new(),
            providers,
            seed,
        })
    }

    /// Runs the full crawl for this seed. Returns the recorded requests once
    /// all four discovery channels have finished.
    pub async fn crawl(self: Arc<Self>) -> Result<Vec<RecordedRequest>> {
        if self.seed.base.is_empty() {
            bail!("seed url was empty");
        }

        let hooks: Arc<dyn CrawlHooks> = self.clone();
        let (traverser, handle) = Traverser::new(
            self.client.clone(),
            hooks,
            self.seed.depth,
            self.seed.threads,
            self.cancel.clone(),
        );

        // optional wall-clock limit for this seed
        let watchdog = self.seed.timeout.map(|limit| {
            let cancel = self.cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                cancel.cancel();
            })
        });

        let robots = self.scan_robots(handle.clone());
        let sitemap = self.scan_sitemap(handle.clone());
        let historical = self.scan_historical(handle.clone());
        let base = self.seed.base.clone();
        let traversal = async move {
            handle.visit(&base);
            // this was the last outside handle; the traverser now finishes
            // as soon as the side channels drop theirs and the pages drain
            drop(handle);
            traverser.run().await;
        };

        // the single join barrier: all four channels must complete; the
        // side channels stop at the time limit even mid-await
        tokio::join!(
            race(&self.cancel, robots),
            race(&self.cancel, sitemap),
            race(&self.cancel, historical),
            traversal,
        );

        if let Some(watchdog) = watchdog {
            watchdog.abort();
        }
        if self.cancel.is_cancelled() {
            warn!(seed = %self.seed.base, "crawl hit its time limit");
        }

        Ok(self.recorder.drain())
    }

    // Scope-checks a candidate; reports and records it when in scope.
    // Returns whether it was in scope. This is the single path every
    // channel's findings go through.
    fn report_in_scope(&self, kind: AssetKind, candidate: &str) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let scoped = match self.policy.check(candidate) {
            Some(scoped) => scoped,
            None => return false,
        };
        self.reporter.report(kind, &scoped.display);
        self.recorder.record(scoped.resolved.as_str());
        true
    }

    async fn scan_robots(&self, handle: TraverserHandle) {
        let robots_url = format!("{}/robots.txt", self.seed.base);
        let body = match fetch_body(&self.client, &robots_url).await {
            Ok(body) => body,
            Err(e) => {
                debug!(url = %robots_url, error = %e, "robots.txt fetch failed");
                return;
            }
        };

        let mut discovered = Vec::new();
        for line in body.lines() {
            if !ROBOTS_DIRECTIVE.is_match(line) {
                continue;
            }
            let path = ROBOTS_DIRECTIVE.replace(line, "").trim().to_string();
            let full = format!("{}{}", self.seed.base, path);
            if self.seed.include.robots && self.dedup.insert_if_absent(Category::Urls, &full) {
                self.report_in_scope(AssetKind::Robots, &full);
            }
            discovered.push(full);
        }

        // with depth > 1 the robots paths become extra traversal seeds
        if self.seed.depth > 1 {
            for url in discovered {
                handle.visit(&url);
            }
        }
    }

    async fn scan_sitemap(&self, handle: TraverserHandle) {
        let sitemap_url = format!("{}/sitemap.xml", self.seed.base);
        let body = match fetch_body(&self.client, &sitemap_url).await {
            Ok(body) => body,
            Err(e) => {
                debug!(url = %sitemap_url, error = %e, "sitemap.xml fetch failed");
                return;
            }
        };

        for capture in SITEMAP_LOC.captures_iter(&body) {
            let location = capture[1].trim().to_string();
            if location.is_empty() {
                continue;
            }
            if self.seed.include.sitemap
                && self.dedup.insert_if_absent(Category::Urls, &location)
            {
                self.report_in_scope(AssetKind::Sitemap, &location);
            }
            if self.seed.depth > 1 {
                handle.visit(&location);
            }
        }
    }

    async fn scan_historical(&self, handle: TraverserHandle) {
        if !self.seed.use_wayback {
            return;
        }
        let urls =
            history::aggregate(&self.client, &self.seed.host, self.providers.clone()).await;

        for url in urls {
            if self.cancel.is_cancelled() {
                return;
            }
            if self.seed.include.wayback && self.dedup.insert_if_absent(Category::Urls, &url) {
                self.report_in_scope(AssetKind::Wayback, &url);
            }
            // historical URLs are a rich source of new subdomains
            if self.seed.include.subdomains {
                if let Some(host) = host_of(&url) {
                    if host.contains(&self.seed.host)
                        && self.dedup.insert_if_absent(Category::Subdomains, &host)
                    {
                        self.report_in_scope(AssetKind::Subdomain, &host);
                    }
                }
            }
            if self.seed.depth > 1 {
                handle.visit(&url);
            }
        }
    }
}

#[async_trait]
impl CrawlHooks for Crawler {
    async fn on_anchor(&self, found: &FoundRef) -> bool {
        // the atomic insert decides everything downstream: report, record,
        // and whether the traverser should follow the link
        let first_seen = self.dedup.insert_if_absent(Category::Urls, &found.absolute);
        if first_seen && self.seed.include.urls {
            self.report_in_scope(AssetKind::Url, &found.absolute);
        }

        // independently surface a newly-seen host
        if self.seed.include.subdomains {
            if let Some(host) = host_of(&found.absolute) {
                if self.dedup.insert_if_absent(Category::Subdomains, &host) {
                    self.report_in_scope(AssetKind::Subdomain, &host);
                }
            }
        }

        first_seen
    }

    async fn on_script(&self, found: &FoundRef) {
        if !self.seed.include.scripts {
            return;
        }
        if !self.dedup.insert_if_absent(Category::Scripts, &found.absolute) {
            return;
        }
        let in_scope = self.report_in_scope(AssetKind::Script, &found.absolute);
        if in_scope && self.seed.linkfinder {
            linkfinder::scan(&self.client, &found.absolute, &self.reporter, &self.cancel).await;
        }
    }

    async fn on_form(&self, found: &FoundRef) {
        if !self.seed.include.forms {
            return;
        }
        if self.dedup.insert_if_absent(Category::Forms, &found.absolute) {
            self.report_in_scope(AssetKind::Form, &found.absolute);
        }
    }
}

async fn race(cancel: &CancelToken, work: impl std::future::Future<Output = ()>) {
    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = work => {}
    }
}

fn host_of(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| host.to_string())
}

async fn fetch_body(client: &Client, url: &str) -> Result<String> {
    let response = client.get(url).send().await?;
    if !response.status().is_success() {
        bail!("HTTP {}", response.status());
    }
    Ok(response.text().await?)
}

fn build_client(seed: &Seed) -> Result<Client> {
    let mut default_headers = HeaderMap::new();
    for (name, value) in &seed.headers {
        let name = match HeaderName::from_bytes(name.as_bytes()) {
            Ok(name) => name,
            Err(_) => {
                warn!(header = %name, "skipping invalid header name");
                continue;
            }
        };
        let value = match HeaderValue::from_str(value) {
            Ok(value) => value,
            Err(_) => {
                warn!(header = %name, "skipping invalid header value");
                continue;
            }
        };
        default_headers.insert(name, value);
    }

    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(10))
        .default_headers(default_headers)
        .danger_accept_invalid_certs(seed.insecure)
        .build()?)
}
