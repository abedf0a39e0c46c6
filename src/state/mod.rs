//! State machines for the crawl pipeline
//!
//! Two distinct machines live here: the lifecycle of an individual URL
//! (`CrawlStatus`) and the lifecycle of the service itself (`Lifecycle`).

mod crawl_status;
mod lifecycle;

pub use crawl_status::CrawlStatus;
pub use lifecycle::{Lifecycle, ServicePhase};
