// src/main.rs
// =============================================================================
// recon-spider: fast web reconnaissance crawler.
//
// For every seed (one positional URL, or many piped on stdin) the crawler
// runs four concurrent discovery channels - live page traversal, robots.txt,
// sitemap.xml and the historical web archives - filters everything through
// one scope policy and one dedup store, and streams each unique in-scope
// asset to stdout the moment it is found.
// =============================================================================

mod cli;
mod crawl;
mod history;
mod linkfinder;
mod report;
mod scope;

use anyhow::Result;
use clap::Parser;
use futures::future::join_all;
use std::io::BufRead;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use cli::Cli;
use crawl::{parse_headers, save_requests, Crawler, Seed};
use report::Reporter;

#[tokio::main]
async fn main() -> ExitCode {
    // diagnostics go to stderr so stdout stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // a malformed --headers value is fatal before any crawl starts
    let headers = parse_headers(&cli.headers)?;

    let seeds = collect_seeds(&cli);
    if seeds.is_empty() {
        eprintln!("no seed URLs; pass one as an argument or pipe them on stdin");
        return Ok(ExitCode::from(1));
    }

    let reporter = Arc::new(Reporter::stdout(cli.plain));

    // one crawl per seed, all running concurrently against the shared sink
    let mut crawls = Vec::new();
    for raw in &seeds {
        let seed = match Seed::new(&cli, raw, headers.clone()) {
            Ok(seed) => seed,
            Err(e) => {
                eprintln!("skipping seed {:?}: {:#}", raw, e);
                continue;
            }
        };
        let reporter = reporter.clone();
        let outdir = cli.outdir.clone();
        crawls.push(async move {
            let label = seed.base.clone();
            let crawler = Arc::new(Crawler::new(seed, reporter)?);
            let requests = crawler.crawl().await?;
            if let Some(dir) = outdir {
                save_requests(&dir, &requests)?;
            }
            Ok::<_, anyhow::Error>(label)
        });
    }

    if crawls.is_empty() {
        eprintln!("every seed URL was invalid");
        return Ok(ExitCode::from(1));
    }

    let mut failures = 0;
    let total = crawls.len();
    for outcome in join_all(crawls).await {
        if let Err(e) = outcome {
            eprintln!("crawl failed: {:#}", e);
            failures += 1;
        }
    }

    if failures == total {
        return Ok(ExitCode::from(1));
    }
    Ok(ExitCode::SUCCESS)
}

/// The positional URL when given, otherwise every non-empty stdin line.
/// The positional argument is taken verbatim - URL paths can be
/// case-sensitive; only piped seed lists get normalized.
fn collect_seeds(cli: &Cli) -> Vec<String> {
    if let Some(url) = &cli.url {
        return vec![url.trim().to_string()];
    }
    let stdin = std::io::stdin();
    seeds_from_lines(stdin.lock().lines().map_while(|line| line.ok()))
}

fn seeds_from_lines(lines: impl Iterator<Item = String>) -> Vec<String> {
    lines
        .map(|line| line.trim().to_lowercase())
        .filter(|line| !line.is_empty())
        .collect()
}
