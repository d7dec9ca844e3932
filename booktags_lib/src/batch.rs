//! Runs the crawl for a list of topics and collects per-topic reports.

use serde::Serialize;

use crate::crawl::{CrawlStats, Crawler, Termination};
use crate::fetch::PageFetch;
use crate::rank::rank;
use crate::record::Record;

/// Final result for one topic.
#[derive(Debug, Clone, Serialize)]
pub struct TopicReport {
    pub topic: String,
    /// Ranked records that passed the engagement threshold.
    pub records: Vec<Record>,
    /// Records removed by the engagement threshold, in either filter mode.
    pub filtered: usize,
    pub stats: CrawlStats,
    pub termination: Termination,
}

/// Reports for every processed topic, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub topics: Vec<TopicReport>,
    /// Set when an interrupt cut the run short.
    pub interrupted: bool,
    /// Topics never started because of an interrupt.
    pub skipped: Vec<String>,
}

impl BatchReport {
    pub fn get(&self, topic: &str) -> Option<&TopicReport> {
        self.topics.iter().find(|t| t.topic == topic)
    }

    pub fn total_records(&self) -> usize {
        self.topics.iter().map(|t| t.records.len()).sum()
    }

    /// True when no topic produced a record.
    pub fn is_empty(&self) -> bool {
        self.total_records() == 0
    }
}

impl<F: PageFetch> Crawler<F> {
    /// Crawls, optionally enriches, and ranks each topic in turn.
    ///
    /// A topic that ends early still gets a report; only an interrupt stops
    /// later topics from running.
    pub async fn run(&mut self, topics: &[String], max_pages: u32, min_engagement: u64) -> BatchReport {
        let mut report = BatchReport::default();

        for (i, topic) in topics.iter().enumerate() {
            if self.interrupt.is_raised() {
                report.interrupted = true;
                report.skipped = topics[i..].to_vec();
                tracing::warn!("Interrupted, skipping {} remaining tags", report.skipped.len());
                break;
            }

            let crawl = self.crawl(topic, max_pages, min_engagement).await;
            let records = if self.detail_lookup {
                self.fill_engagement(topic, crawl.records).await
            } else {
                crawl.records
            };
            let ranked = rank(records, min_engagement);

            if crawl.termination == Termination::Interrupted {
                report.interrupted = true;
            }
            report.topics.push(TopicReport {
                topic: crawl.topic,
                filtered: ranked.excluded + crawl.stats.records_dropped,
                records: ranked.records,
                stats: crawl.stats,
                termination: crawl.termination,
            });
        }

        if report.interrupted && report.skipped.is_empty() {
            let done = report.topics.len();
            report.skipped = topics[done..].to_vec();
        }

        tracing::info!(
            "Collected {} records across {} tags",
            report.total_records(),
            report.topics.len()
        );
        report
    }
}
