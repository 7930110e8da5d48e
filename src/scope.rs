// src/scope.rs
// =============================================================================
// This module decides whether a discovered asset is "in scope" for the
// current crawl, relative to the seed host.
//
// Strategies:
// - strict: candidate host must exactly equal the seed host
// - www:    seed host, or "www." + seed host
// - subs:   seed host, or any subdomain of it (boundary-anchored, so
//           "evil-example.com" does NOT match seed "example.com")
// - fuzzy:  candidate host merely contains the seed host (intentionally loose)
// - yolo:   everything is in scope (the default)
//
// Candidates can be absolute URLs, rooted paths, or bare hosts. Bare hosts
// get a synthetic "https://" prefix so the url crate will parse them; the
// prefix is stripped again from the reported string.
// =============================================================================

use clap::ValueEnum;
use url::Url;

/// Which hosts count as in-scope relative to the seed host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ScopeStrategy {
    /// Specified domain only
    Strict,
    /// Specified domain plus its www. variant
    Www,
    /// Specified domain and its subdomains
    Subs,
    /// Anything containing the specified domain
    Fuzzy,
    /// Everything
    Yolo,
}

/// An asset that passed the scope check.
#[derive(Debug, Clone)]
pub struct ScopedAsset {
    /// The string to report: the resolved URL, with any synthetic schema
    /// stripped back off.
    pub display: String,
    /// The fully-resolved absolute URL, used to build recorded requests.
    pub resolved: Url,
}

/// Scope decisions for one crawl instance. Immutable once built.
#[derive(Debug, Clone)]
pub struct ScopePolicy {
    base: Url,
    host: String,
    strategy: ScopeStrategy,
}

impl ScopePolicy {
    /// Builds a policy from the seed's base URL. Fails if the base URL has
    /// no host to compare against.
    pub fn new(base_url: &str, strategy: ScopeStrategy) -> anyhow::Result<Self> {
        let base = Url::parse(base_url)?;
        let host = base
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("seed URL has no host: {}", base_url))?
            .to_string();
        Ok(Self {
            base,
            host,
            strategy,
        })
    }

    /// The seed host this policy compares against.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Checks a candidate string against the scope.
    ///
    /// Relative candidates are resolved against the seed base. Returns None
    /// for out-of-scope or malformed candidates - a candidate that cannot be
    /// parsed is silently excluded, never an error.
    pub fn check(&self, candidate: &str) -> Option<ScopedAsset> {
        // Bare hosts like "sub.example.com" have no schema and no leading
        // slash; give them a synthetic one so they parse as absolute URLs.
        let synthetic = if !candidate.contains("http://")
            && !candidate.contains("https://")
            && !candidate.starts_with('/')
        {
            "https://"
        } else {
            ""
        };

        let resolved = self.base.join(&format!("{}{}", synthetic, candidate)).ok()?;
        let host = resolved.host_str().unwrap_or("");

        let in_scope = match self.strategy {
            ScopeStrategy::Strict => host == self.host,
            ScopeStrategy::Www => host == self.host || host == format!("www.{}", self.host),
            ScopeStrategy::Subs => {
                host == self.host || host.ends_with(&format!(".{}", self.host))
            }
            ScopeStrategy::Fuzzy => host.contains(&self.host),
            ScopeStrategy::Yolo => true,
        };
        if !in_scope {
            return None;
        }

        // Report the candidate the way it was found: strip the schema we
        // synthesized, along with the bare "/" path the url crate adds.
        let mut display = resolved.to_string();
        if !synthetic.is_empty() {
            display = display.replacen(synthetic, "", 1);
            if resolved.path() == "/" && resolved.query().is_none() && display.ends_with('/') {
                display.pop();
            }
        }

        Some(ScopedAsset { display, resolved })
    }
}
