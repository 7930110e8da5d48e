// src/linkfinder.rs
// =============================================================================
// Endpoint extraction from JavaScript bodies.
//
// The pattern is LinkFinder's: it matches quoted strings that look like
// full URLs, absolute or relative paths, or bare filenames with an
// interesting extension. Matches are reported verbatim, surrounding quotes
// included, with no scope or dedup pass - raw leads for a human to triage.
// =============================================================================

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use tracing::debug;

use crate::crawl::CancelToken;
use crate::report::{AssetKind, Reporter};

static ENDPOINT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?:"|')(((?:[a-zA-Z]{1,10}://|//)[^"'/]{1,}\.[a-zA-Z]{2,}[^"']{0,})|((?:/|\.\./|\./)[^"'><,;| *()(%%$^/\\\[\]][^"'><,;|()]{1,})|([a-zA-Z0-9_\-/]{1,}/[a-zA-Z0-9_\-/]{1,}\.(?:[a-zA-Z]{1,4}|action)(?:[\?|/][^"|']{0,}|))|([a-zA-Z0-9_\-]{1,}\.(?:php|asp|aspx|jsp|json|action|html|js|txt|xml)(?:\?[^"|']{0,}|)))(?:"|')"#,
    )
    .unwrap()
});

/// Fetches a script and reports every endpoint-looking string in it.
/// Failures are contained: an unreachable script yields nothing.
pub async fn scan(client: &Client, js_url: &str, reporter: &Reporter, cancel: &CancelToken) {
    let response = match client.get(js_url).send().await {
        Ok(response) => response,
        Err(e) => {
            debug!(url = %js_url, error = %e, "script fetch failed");
            return;
        }
    };
    if !response.status().is_success() {
        debug!(url = %js_url, status = %response.status(), "script fetch failed");
        return;
    }
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!(url = %js_url, error = %e, "script body read failed");
            return;
        }
    };

    for found in ENDPOINT.find_iter(&body) {
        if cancel.is_cancelled() {
            return;
        }
        reporter.report(AssetKind::LinkFinder, found.as_str());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matches(body: &str) -> Vec<String> {
        ENDPOINT
            .find_iter(body)
            .map(|found| found.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_extracts_full_urls_and_paths() {
        let js = r#"
            fetch("https://api.example.com/v1/users");
            const path = '/internal/admin/panel';
            load("assets/config.json");
        "#;
        let found = matches(js);
        assert!(found.contains(&r#""https://api.example.com/v1/users""#.to_string()));
        assert!(found.contains(&"'/internal/admin/panel'".to_string()));
        assert!(found.contains(&r#""assets/config.json""#.to_string()));
    }

    #[test]
    fn test_extracts_bare_filenames_with_interesting_extensions() {
        let js = r#"var page = "login.php?next=home";"#;
        let found = matches(js);
        assert_eq!(found, vec![r#""login.php?next=home""#.to_string()]);
    }

    #[test]
    fn test_plain_strings_do_not_match() {
        let js = r#"console.log("hello world"); var x = "just text";"#;
        assert!(matches(js).is_empty());
    }
}
