// src/cli.rs
// =============================================================================
// Command-line interface. One seed URL as a positional argument, or many
// seeds piped on stdin, one per line.
// =============================================================================

use clap::Parser;
use std::path::PathBuf;

use crate::scope::ScopeStrategy;

#[derive(Debug, Parser)]
#[command(
    name = "recon-spider",
    about = "Fast web reconnaissance crawler: pages, robots, sitemaps and web archives",
    version
)]
pub struct Cli {
    /// Seed URL to crawl; omit it to read seeds from stdin, one per line
    pub url: Option<String>,

    /// How many link-hops deep to follow from each seed
    #[arg(long, default_value_t = 1)]
    pub depth: usize,

    /// Which hosts count as in scope relative to the seed host
    #[arg(long, value_enum, default_value_t = ScopeStrategy::Subs)]
    pub scope: ScopeStrategy,

    /// Maximum concurrent page fetches per seed
    #[arg(short, long, default_value_t = 8)]
    pub threads: usize,

    /// Cookie header sent with every request
    #[arg(long)]
    pub cookie: Option<String>,

    /// Authorization header sent with every request
    #[arg(long)]
    pub auth: Option<String>,

    /// Extra headers, semicolon-separated: "Name: value;Other: value"
    #[arg(long, default_value = "")]
    pub headers: String,

    /// Accept invalid TLS certificates
    #[arg(long)]
    pub insecure: bool,

    /// Plain output: one asset per line, no category tags, no color
    #[arg(long)]
    pub plain: bool,

    /// Scan discovered in-scope scripts for endpoint-looking strings
    #[arg(long)]
    pub linkfinder: bool,

    /// Write each in-scope discovery as a raw HTTP request file here
    #[arg(long)]
    pub outdir: Option<PathBuf>,

    /// Wall-clock limit per seed, in seconds
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Also query the web archives for historical URLs of the seed host
    #[arg(long)]
    pub usewayback: bool,

    // Category include flags. Naming none means everything; naming any
    // means only the named categories.
    /// Include discovered URLs in the output
    #[arg(long)]
    pub urls: bool,

    /// Include discovered subdomains in the output
    #[arg(long)]
    pub subs: bool,

    /// Include discovered script sources in the output
    #[arg(long)]
    pub js: bool,

    /// Include discovered form targets in the output
    #[arg(long)]
    pub forms: bool,

    /// Include robots.txt entries in the output
    #[arg(long)]
    pub robots: bool,

    /// Include sitemap.xml entries in the output
    #[arg(long)]
    pub sitemap: bool,

    /// Include historical archive URLs in the output
    #[arg(long)]
    pub wayback: bool,
}
