//! Library layer for booktags: crawls tag listing pages, extracts book
//! records, and ranks them.
//!
//! Sits on top of the `booktags_api` transport and adds the pagination
//! policy (delays, identity rotation, retry and miss thresholds), the field
//! extractor, layered configuration, and input validation.

pub mod batch;
pub mod config;
pub mod crawl;
mod detail;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod interrupt;
pub mod rank;
pub mod record;
pub mod selectors;
pub mod validation;

#[cfg(test)]
mod test_support;

pub use booktags_api;
pub use booktags_api::{Client, FetchFailure, Identity, IdentityPool};

pub use batch::{BatchReport, TopicReport};
pub use config::{CrawlConfig, CrawlPolicy, DelayRange, FileConfig, FilterMode, RotationKind};
pub use crawl::{CrawlStats, Crawler, Termination, TopicCrawl};
pub use error::BookTagsError;
pub use fetch::PageFetch;
pub use interrupt::{interrupt_channel, Interrupt, InterruptHandle};
pub use rank::{rank, Ranked};
pub use record::Record;
pub use selectors::{Selectors, SiteSelectors};
