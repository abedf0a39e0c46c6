//! Crawl pipeline: fetching, analysis, link auditing, and the worker pool
//!
//! The pipeline for one item is fetch -> analyze -> persist -> transition,
//! driven by `CrawlerService` which owns the scheduler and worker pool.

mod analyzer;
mod fetcher;
mod links;
mod service;

pub use analyzer::{analyze_page, inspect_page, PageFacts};
pub use fetcher::{
    build_http_client, fetch_page, FetchError, FetchedPage, HttpProbe, LivenessProbe,
    ProbeOutcome, BROWSER_USER_AGENT,
};
pub use links::{audit_links, LinkAudit};
pub use service::CrawlerService;
