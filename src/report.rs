// src/report.rs
// =============================================================================
// This module is the output sink: one line per reported asset, written to
// a shared writer guarded by a mutex so every crawl task can report
// concurrently without interleaving lines.
//
// Each asset category carries a colored tag, matching the classic recon
// tool convention:
//   [url] yellow, [subdomain] green, [javascript] red, [form] cyan,
//   [robots] magenta, [sitemap] blue, [wayback] yellow, [linkfinder] red
//
// With --plain the tag and colors are dropped entirely, so the output can
// be piped straight into other tools.
// =============================================================================

use colored::{ColoredString, Colorize};
use std::io::Write;
use std::sync::Mutex;

/// The category of a discovered asset, used for output tagging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Url,
    Subdomain,
    Script,
    Form,
    Robots,
    Sitemap,
    Wayback,
    LinkFinder,
}

impl AssetKind {
    fn tag(&self) -> ColoredString {
        match self {
            AssetKind::Url => "[url]".bright_yellow(),
            AssetKind::Subdomain => "[subdomain]".bright_green(),
            AssetKind::Script => "[javascript]".bright_red(),
            AssetKind::Form => "[form]".bright_cyan(),
            AssetKind::Robots => "[robots]".bright_magenta(),
            AssetKind::Sitemap => "[sitemap]".bright_blue(),
            AssetKind::Wayback => "[wayback]".yellow(),
            AssetKind::LinkFinder => "[linkfinder]".bright_red(),
        }
    }
}

/// Append-only line sink shared by all crawl instances.
pub struct Reporter {
    out: Mutex<Box<dyn Write + Send>>,
    plain: bool,
}

impl Reporter {
    /// A reporter writing to stdout (the normal case).
    pub fn stdout(plain: bool) -> Self {
        Self::new(Box::new(std::io::stdout()), plain)
    }

    /// A reporter writing to any sink; tests use an in-memory buffer.
    pub fn new(out: Box<dyn Write + Send>, plain: bool) -> Self {
        Self {
            out: Mutex::new(out),
            plain,
        }
    }

    /// Writes one asset line. Write errors (e.g. a closed pipe) are ignored:
    /// a broken consumer should not take the crawl down.
    pub fn report(&self, kind: AssetKind, msg: &str) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = if self.plain {
            writeln!(out, "{}", msg)
        } else {
            writeln!(out, "{} {}", kind.tag(), msg)
        };
        let _ = out.flush();
    }
}
