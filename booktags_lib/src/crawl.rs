//! Pagination controller: fetches one topic's listing pages under the
//! delay, retry and termination policy, accumulating records.

use std::fmt;

use booktags_api::{FetchFailure, IdentityPool, RawPage};
use serde::Serialize;

use crate::config::{CrawlConfig, CrawlPolicy, FilterMode};
use crate::error::BookTagsError;
use crate::extract::{extract, item_blocks, ItemBlock};
use crate::fetch::PageFetch;
use crate::interrupt::Interrupt;
use crate::record::Record;
use crate::selectors::Selectors;

/// Why a topic's crawl stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// `max_pages` pages were collected.
    PageLimit,
    /// Too many consecutive fetch failures.
    FetchFailures,
    /// Too many consecutive pages without item blocks.
    EmptyPages,
    /// The run was interrupted.
    Interrupted,
}

impl Termination {
    /// Whether the crawl ended before reaching its page limit.
    pub fn is_early(self) -> bool {
        self != Self::PageLimit
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PageLimit => "page limit reached",
            Self::FetchFailures => "too many fetch failures",
            Self::EmptyPages => "too many empty pages",
            Self::Interrupted => "interrupted",
        };
        f.write_str(s)
    }
}

/// Counters for one topic's crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Requests actually sent.
    pub fetch_attempts: u32,
    /// Pages that yielded at least one item block.
    pub pages_parsed: u32,
    pub fetch_failures: u32,
    /// Successful fetches with no item blocks.
    pub empty_pages: u32,
    pub records_collected: usize,
    /// Records dropped during accumulation in eager filter mode.
    pub records_dropped: usize,
}

/// Result of crawling one topic, before ranking.
#[derive(Debug, Clone)]
pub struct TopicCrawl {
    pub topic: String,
    pub records: Vec<Record>,
    pub stats: CrawlStats,
    pub termination: Termination,
}

#[derive(Debug)]
enum CrawlState {
    Fetching,
    Parsing(RawPage),
    Accumulating(Vec<ItemBlock>),
    Terminated(Termination),
}

#[derive(Debug, Default)]
struct PaginationState {
    page_index: u32,
    consecutive_failures: u32,
    consecutive_misses: u32,
}

/// Drives topic crawls against a [`PageFetch`] implementation.
///
/// Owns the identity pool and selectors so that one crawler can be reused
/// across topics; nothing else carries over from one topic to the next.
pub struct Crawler<F> {
    pub(crate) fetcher: F,
    pub(crate) identities: IdentityPool,
    pub(crate) selectors: Selectors,
    pub(crate) policy: CrawlPolicy,
    pub(crate) interrupt: Interrupt,
    pub(crate) detail_lookup: bool,
}

impl<F: PageFetch> Crawler<F> {
    pub fn new(
        fetcher: F,
        identities: IdentityPool,
        selectors: Selectors,
        policy: CrawlPolicy,
    ) -> Self {
        Self {
            fetcher,
            identities,
            selectors,
            policy,
            interrupt: Interrupt::never(),
            detail_lookup: false,
        }
    }

    /// Builds a crawler from a validated configuration.
    pub fn from_config(fetcher: F, config: &CrawlConfig) -> Result<Self, BookTagsError> {
        config.validate()?;
        let crawler = Self::new(
            fetcher,
            config.identity_pool()?,
            Selectors::compile(&config.selectors)?,
            config.policy.clone(),
        );
        Ok(crawler.with_detail_lookup(config.detail_lookup))
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn with_detail_lookup(mut self, enabled: bool) -> Self {
        self.detail_lookup = enabled;
        self
    }

    pub fn policy(&self) -> &CrawlPolicy {
        &self.policy
    }

    /// Crawls up to `max_pages` listing pages for `topic`.
    ///
    /// Never fails: fetch and parse problems are retried up to their
    /// thresholds, after which the crawl ends with whatever was collected.
    /// `min_engagement` is only consulted in [`FilterMode::Eager`].
    pub async fn crawl(&mut self, topic: &str, max_pages: u32, min_engagement: u64) -> TopicCrawl {
        tracing::info!(
            "Crawling tag '{}' (up to {} pages, min engagement {})",
            topic,
            max_pages,
            min_engagement
        );

        let mut pagination = PaginationState::default();
        let mut stats = CrawlStats::default();
        let mut records = Vec::new();
        let mut state = CrawlState::Fetching;

        let termination = loop {
            state = match state {
                CrawlState::Fetching => {
                    self.fetch_step(topic, max_pages, &mut pagination, &mut stats)
                        .await
                }
                CrawlState::Parsing(page) => {
                    self.parse_step(topic, &page, &mut pagination, &mut stats)
                }
                CrawlState::Accumulating(blocks) => {
                    self.accumulate_step(
                        topic,
                        &blocks,
                        min_engagement,
                        &mut records,
                        &mut pagination,
                        &mut stats,
                    );
                    CrawlState::Fetching
                }
                CrawlState::Terminated(reason) => break reason,
            };
        };

        stats.records_collected = records.len();
        if termination.is_early() {
            tracing::warn!(
                "Tag '{}' stopped early ({}) after {} pages, {} records",
                topic,
                termination,
                stats.pages_parsed,
                records.len()
            );
        } else {
            tracing::info!(
                "Tag '{}' done: {} pages, {} records",
                topic,
                stats.pages_parsed,
                records.len()
            );
        }

        TopicCrawl {
            topic: topic.to_string(),
            records,
            stats,
            termination,
        }
    }

    async fn fetch_step(
        &mut self,
        topic: &str,
        max_pages: u32,
        pagination: &mut PaginationState,
        stats: &mut CrawlStats,
    ) -> CrawlState {
        if pagination.page_index >= max_pages {
            return CrawlState::Terminated(Termination::PageLimit);
        }

        let start = pagination.page_index.saturating_mul(self.policy.page_size);
        let url = match self.fetcher.listing_url(topic, start) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Cannot build listing URL for '{}': {}", topic, e);
                stats.fetch_failures += 1;
                return CrawlState::Terminated(Termination::FetchFailures);
            }
        };

        match self.paced_fetch(&url).await {
            None => CrawlState::Terminated(Termination::Interrupted),
            Some(result) => {
                stats.fetch_attempts += 1;
                match result {
                    Ok(page) => CrawlState::Parsing(page),
                    Err(e) => self.on_fetch_failure(topic, pagination, stats, &e),
                }
            }
        }
    }

    /// Waits the jittered delay, then fetches `url` with the next identity.
    /// Returns `None` if interrupted before the read completes.
    pub(crate) async fn paced_fetch(&mut self, url: &str) -> Option<Result<RawPage, FetchFailure>> {
        let mut interrupt = self.interrupt.clone();
        if interrupt.is_raised() {
            return None;
        }

        let delay = self.policy.delay.sample();
        if !delay.is_zero() {
            tracing::debug!("Waiting {:.1}s before {}", delay.as_secs_f64(), url);
            interrupt.guard(tokio::time::sleep(delay)).await?;
        }

        let identity = self.identities.next_identity().clone();
        interrupt.guard(self.fetcher.fetch(url, &identity)).await
    }

    fn on_fetch_failure(
        &self,
        topic: &str,
        pagination: &mut PaginationState,
        stats: &mut CrawlStats,
        err: &FetchFailure,
    ) -> CrawlState {
        pagination.consecutive_failures += 1;
        stats.fetch_failures += 1;
        if pagination.consecutive_failures >= self.policy.max_retries {
            tracing::warn!(
                "Tag '{}' page {}: giving up after {} consecutive failures ({})",
                topic,
                pagination.page_index + 1,
                pagination.consecutive_failures,
                err
            );
            CrawlState::Terminated(Termination::FetchFailures)
        } else {
            tracing::warn!(
                "Tag '{}' page {}: {} (attempt {}/{})",
                topic,
                pagination.page_index + 1,
                err,
                pagination.consecutive_failures,
                self.policy.max_retries
            );
            CrawlState::Fetching
        }
    }

    fn parse_step(
        &self,
        topic: &str,
        page: &RawPage,
        pagination: &mut PaginationState,
        stats: &mut CrawlStats,
    ) -> CrawlState {
        let blocks = item_blocks(&page.body, &self.selectors);
        if blocks.is_empty() {
            pagination.consecutive_misses += 1;
            stats.empty_pages += 1;
            if pagination.consecutive_misses >= self.policy.max_misses {
                tracing::warn!(
                    "Tag '{}' page {}: no items after {} attempts",
                    topic,
                    pagination.page_index + 1,
                    pagination.consecutive_misses
                );
                return CrawlState::Terminated(Termination::EmptyPages);
            }
            tracing::warn!(
                "Tag '{}' page {}: no items found (miss {}/{})",
                topic,
                pagination.page_index + 1,
                pagination.consecutive_misses,
                self.policy.max_misses
            );
            return CrawlState::Fetching;
        }

        pagination.consecutive_failures = 0;
        pagination.consecutive_misses = 0;
        CrawlState::Accumulating(blocks)
    }

    fn accumulate_step(
        &self,
        topic: &str,
        blocks: &[ItemBlock],
        min_engagement: u64,
        records: &mut Vec<Record>,
        pagination: &mut PaginationState,
        stats: &mut CrawlStats,
    ) {
        let eager = self.policy.filter_mode == FilterMode::Eager;
        for block in blocks {
            let record = extract(block, &self.selectors);
            if eager && record.engagement_count() < min_engagement {
                tracing::debug!(
                    "Dropping '{}': {} ratings < {}",
                    record.title(),
                    record.engagement_count(),
                    min_engagement
                );
                stats.records_dropped += 1;
                continue;
            }
            records.push(record);
        }

        stats.pages_parsed += 1;
        pagination.page_index += 1;
        tracing::info!(
            "Tag '{}' page {}: {} items",
            topic,
            pagination.page_index,
            blocks.len()
        );
    }
}
