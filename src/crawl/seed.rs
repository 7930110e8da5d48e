// src/crawl/seed.rs
// =============================================================================
// Per-crawl configuration.
//
// A Seed is built once per crawl invocation from the CLI arguments and one
// seed URL, then passed around by shared reference - nothing mutates it
// after construction. Multiple seeds (e.g. piped in on stdin) each get their
// own Seed and share no state beyond the output sink.
// =============================================================================

use anyhow::{bail, Result};
use std::time::Duration;
use url::Url;

use crate::cli::Cli;
use crate::scope::ScopeStrategy;

/// Which asset categories are surfaced in the output.
///
/// Mirrors the CLI: when no category flag is given everything is included;
/// naming any category switches the default off.
#[derive(Debug, Clone)]
pub struct IncludeFlags {
    pub urls: bool,
    pub subdomains: bool,
    pub scripts: bool,
    pub forms: bool,
    pub robots: bool,
    pub sitemap: bool,
    pub wayback: bool,
}

impl IncludeFlags {
    fn from_cli(cli: &Cli) -> Self {
        let any = cli.urls
            || cli.subs
            || cli.js
            || cli.forms
            || cli.robots
            || cli.sitemap
            || cli.wayback;
        if !any {
            // default: include everything
            return Self {
                urls: true,
                subdomains: true,
                scripts: true,
                forms: true,
                robots: true,
                sitemap: true,
                wayback: true,
            };
        }
        Self {
            urls: cli.urls,
            subdomains: cli.subs,
            scripts: cli.js,
            forms: cli.forms,
            robots: cli.robots,
            sitemap: cli.sitemap,
            wayback: cli.wayback,
        }
    }
}

/// Immutable configuration for one crawl instance.
#[derive(Debug, Clone)]
pub struct Seed {
    /// Normalized base URL: schema defaulted to http://, no trailing slash.
    pub base: String,
    /// Host component of the base URL, used for scope decisions and
    /// historical lookups.
    pub host: String,
    pub strategy: ScopeStrategy,
    /// Crawl depth; 1 means only the seed page itself is traversed.
    pub depth: usize,
    /// Size of the concurrent page-fetch pool.
    pub threads: usize,
    pub include: IncludeFlags,
    /// Query the historical URL providers and feed their results in.
    pub use_wayback: bool,
    /// Run the link-finder regex scan over in-scope JavaScript files.
    pub linkfinder: bool,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Static headers sent with every request and attached to every
    /// recorded request.
    pub headers: Vec<(String, String)>,
    /// Optional wall-clock limit for this seed.
    pub timeout: Option<Duration>,
}

impl Seed {
    /// Builds the seed for one URL. `headers` is the already-parsed static
    /// header list (parsed once, shared by every seed).
    pub fn new(cli: &Cli, raw_url: &str, headers: Vec<(String, String)>) -> Result<Self> {
        let raw_url = raw_url.trim();
        if raw_url.is_empty() {
            bail!("seed url was empty");
        }

        // Schema defaults to http, matching the CLI help text.
        let mut base = if raw_url.contains("://") {
            raw_url.to_string()
        } else {
            format!("http://{}", raw_url)
        };
        while base.ends_with('/') {
            base.pop();
        }

        let parsed = Url::parse(&base)?;
        let host = parsed
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("seed URL has no host: {}", base))?
            .to_string();

        let mut headers = headers;
        if let Some(cookie) = &cli.cookie {
            headers.push(("Cookie".to_string(), cookie.clone()));
        }
        if let Some(auth) = &cli.auth {
            headers.push(("Authorization".to_string(), auth.clone()));
        }

        Ok(Self {
            base,
            host,
            strategy: cli.scope,
            depth: cli.depth.max(1),
            threads: cli.threads.max(1),
            include: IncludeFlags::from_cli(cli),
            use_wayback: cli.usewayback,
            linkfinder: cli.linkfinder,
            insecure: cli.insecure,
            headers,
            timeout: cli.timeout.map(Duration::from_secs),
        })
    }
}

/// Parses a raw header string like "Cookie: foo=bar; Authorization: token"
/// into key/value pairs. An entirely colon-free non-empty string is a user
/// error and is rejected.
pub fn parse_headers(raw: &str) -> Result<Vec<(String, String)>> {
    let mut headers = Vec::new();
    if raw.is_empty() {
        return Ok(headers);
    }
    if !raw.contains(':') {
        bail!("headers flag not formatted properly (no colon to separate header and value)");
    }
    for header in raw.split(';') {
        // Prefer the ": " separator so header values containing colons
        // (e.g. URLs) survive intact.
        let parts = if let Some(parts) = header.split_once(": ") {
            parts
        } else if let Some(parts) = header.split_once(':') {
            parts
        } else {
            continue;
        };
        headers.push((parts.0.trim().to_string(), parts.1.trim().to_string()));
    }
    Ok(headers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(args: &[&str]) -> Cli {
        let mut full = vec!["recon-spider"];
        full.extend_from_slice(args);
        Cli::parse_from(full)
    }

    #[test]
    fn test_schema_defaults_to_http() {
        let seed = Seed::new(&cli(&["example.com"]), "example.com", vec![]).unwrap();
        assert_eq!(seed.base, "http://example.com");
        assert_eq!(seed.host, "example.com");
    }

    #[test]
    fn test_explicit_schema_is_kept() {
        let seed = Seed::new(&cli(&[]), "https://example.com/", vec![]).unwrap();
        assert_eq!(seed.base, "https://example.com");
    }

    #[test]
    fn test_empty_seed_is_rejected() {
        assert!(Seed::new(&cli(&[]), "  ", vec![]).is_err());
    }

    #[test]
    fn test_include_flags_default_to_all() {
        let seed = Seed::new(&cli(&["example.com"]), "example.com", vec![]).unwrap();
        assert!(seed.include.urls && seed.include.robots && seed.include.wayback);
    }

    #[test]
    fn test_naming_a_category_disables_the_rest() {
        let seed = Seed::new(&cli(&["example.com", "--js"]), "example.com", vec![]).unwrap();
        assert!(seed.include.scripts);
        assert!(!seed.include.urls);
        assert!(!seed.include.robots);
    }

    #[test]
    fn test_parse_headers() {
        let headers = parse_headers("Cookie: foo=bar; X-Api-Key:secret").unwrap();
        assert_eq!(
            headers,
            vec![
                ("Cookie".to_string(), "foo=bar".to_string()),
                ("X-Api-Key".to_string(), "secret".to_string()),
            ]
        );
    }

    #[test]
    fn test_parse_headers_requires_colon() {
        assert!(parse_headers("not a header").is_err());
    }

    #[test]
    fn test_parse_headers_empty_is_ok() {
        assert!(parse_headers("").unwrap().is_empty());
    }
}
