// src/crawl/mod.rs
// =============================================================================
// This module contains the crawl engine.
//
// Submodules:
// - seed:         per-crawl immutable configuration
// - dedup:        first-seen-wins membership sets, one per asset category
// - recorder:     thread-safe collection of reconstructable GET requests
// - cancel:       cancellation token for the per-seed timeout
// - traversal:    live page traversal with typed anchor/script/form hooks
// - orchestrator: composes everything into one crawl per seed
//
// This file (mod.rs) is the module root - it re-exports the public API so
// callers can write `crawl::Crawler` instead of `crawl::orchestrator::Crawler`.
// =============================================================================

mod cancel;
mod dedup;
mod orchestrator;
mod recorder;
mod seed;
mod traversal;

pub use cancel::CancelToken;
pub use orchestrator::Crawler;
pub use recorder::{save_requests, RecordedRequest};
pub use seed::{parse_headers, Seed};
