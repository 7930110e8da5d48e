// src/crawl/recorder.rs
// =============================================================================
// Recorded requests: every in-scope discovery can be archived as a
// reconstructable GET request.
//
// The recorder is a mutex-guarded append-only list written to concurrently
// by all orchestrator tasks and all traversal hooks. At crawl completion
// drain() hands the accumulated list to the archiver, which writes one raw
// HTTP request file per entry into --outdir.
// =============================================================================

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;
use url::Url;
use uuid::Uuid;

/// A serializable GET request descriptor for one discovered asset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
}

impl RecordedRequest {
    fn from_url(url: &str, headers: &[(String, String)]) -> Option<Self> {
        // Sanity check: a URL without a recognizable scheme can't be
        // replayed, so it yields no entry.
        if !url.contains("http") {
            return None;
        }
        let parsed = Url::parse(url).ok()?;
        parsed.host_str()?;
        Some(Self {
            method: "GET".to_string(),
            url: url.to_string(),
            headers: headers.to_vec(),
        })
    }

    /// Renders the descriptor as a raw HTTP/1.1 request, the format the
    /// archive files use.
    pub fn to_raw(&self) -> String {
        let parsed = match Url::parse(&self.url) {
            Ok(parsed) => parsed,
            Err(_) => return String::new(),
        };
        let mut path = parsed.path().to_string();
        if let Some(query) = parsed.query() {
            path = format!("{}?{}", path, query);
        }
        let host = parsed.host_str().unwrap_or_default();

        let mut raw = format!("{} {} HTTP/1.1\r\nHost: {}\r\n", self.method, path, host);
        for (name, value) in &self.headers {
            raw.push_str(&format!("{}: {}\r\n", name, value));
        }
        raw.push_str("\r\n");
        raw
    }
}

/// Thread-safe append-only request collection for one crawl instance.
#[derive(Debug)]
pub struct RequestRecorder {
    headers: Vec<(String, String)>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl RequestRecorder {
    /// `headers` are the seed's static headers, attached to every entry.
    pub fn new(headers: Vec<(String, String)>) -> Self {
        Self {
            headers,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Appends a request built from a fully-resolved absolute URL. A URL
    /// lacking a recognizable scheme is skipped silently.
    pub fn record(&self, url: &str) {
        if let Some(request) = RecordedRequest::from_url(url, &self.headers) {
            let mut requests = match self.requests.lock() {
                Ok(requests) => requests,
                Err(poisoned) => poisoned.into_inner(),
            };
            requests.push(request);
        }
    }

    /// Takes the accumulated list at crawl completion.
    pub fn drain(&self) -> Vec<RecordedRequest> {
        let mut requests = match self.requests.lock() {
            Ok(requests) => requests,
            Err(poisoned) => poisoned.into_inner(),
        };
        std::mem::take(&mut *requests)
    }
}

/// Writes each recorded request to `dir` as a raw request file with a
/// random name. Returns how many files were written.
pub fn save_requests(dir: &Path, requests: &[RecordedRequest]) -> Result<usize> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("could not create output directory {}", dir.display()))?;
    let mut written = 0;
    for request in requests {
        let raw = request.to_raw();
        if raw.is_empty() {
            continue;
        }
        let file = dir.join(format!("recon_{}.req", Uuid::new_v4()));
        std::fs::write(&file, raw)
            .with_context(|| format!("could not write {}", file.display()))?;
        written += 1;
    }
    Ok(written)
}
