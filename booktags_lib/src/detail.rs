//! Fills in engagement counts the listing page did not show, from each
//! item's detail page.

use crate::crawl::Crawler;
use crate::extract::detail_engagement_count;
use crate::fetch::PageFetch;
use crate::record::Record;

impl<F: PageFetch> Crawler<F> {
    /// Looks up the vote count for every record with a zero count and a
    /// link. One attempt per record; a failed or unreadable lookup keeps
    /// the record as it was. Stops looking up once interrupted.
    pub async fn fill_engagement(&mut self, topic: &str, records: Vec<Record>) -> Vec<Record> {
        let pending = records
            .iter()
            .filter(|r| needs_lookup(r))
            .count();
        if pending == 0 {
            return records;
        }
        tracing::info!("Tag '{}': looking up {} detail pages", topic, pending);

        let mut filled = 0;
        let mut out = Vec::with_capacity(records.len());
        let mut interrupted = false;
        for record in records {
            if interrupted || !needs_lookup(&record) {
                out.push(record);
                continue;
            }

            let page = match self.paced_fetch(record.url()).await {
                None => {
                    interrupted = true;
                    out.push(record);
                    continue;
                }
                Some(Ok(page)) => page,
                Some(Err(e)) => {
                    tracing::warn!("Detail lookup for '{}' failed: {}", record.title(), e);
                    out.push(record);
                    continue;
                }
            };

            match detail_engagement_count(&page.body, &self.selectors) {
                Some(count) if count > 0 => {
                    filled += 1;
                    out.push(record.with_engagement_count(count));
                }
                _ => {
                    tracing::debug!("No vote count on detail page for '{}'", record.title());
                    out.push(record);
                }
            }
        }

        tracing::info!("Tag '{}': filled {}/{} engagement counts", topic, filled, pending);
        out
    }
}

fn needs_lookup(record: &Record) -> bool {
    record.engagement_count() == 0 && !record.url().is_empty()
}

#[cfg(test)]
mod tests {
    use crate::interrupt::interrupt_channel;
    use crate::test_support::{crawler, detail_page, item, item_with_url, listing, policy, ScriptedFetcher};

    const URL: &str = "https://book.example/subject/quiet/";

    async fn crawled(fetcher: ScriptedFetcher) -> (Vec<crate::Record>, ScriptedFetcher) {
        let mut crawler = crawler(fetcher, policy());
        let result = crawler.crawl("python", 1, 0).await;
        let records = crawler.fill_engagement("python", result.records).await;
        (records, crawler.fetcher)
    }

    #[tokio::test]
    async fn fills_missing_counts_from_detail_page() {
        let body = listing(&[item("Loud", "8.0", 900), item_with_url("Quiet", "9.1", 0, URL)]);
        let fetcher = ScriptedFetcher::new(vec![Ok(body)]).with_route(URL, &detail_page(4321));

        let (records, fetcher) = crawled(fetcher).await;

        assert_eq!(records[0].engagement_count(), 900);
        assert_eq!(records[1].title(), "Quiet");
        assert_eq!(records[1].engagement_count(), 4321);
        assert_eq!(records[1].rating(), 9.1);
        let detail_reads = fetcher.requests().iter().filter(|r| r.url == URL).count();
        assert_eq!(detail_reads, 1);
    }

    #[tokio::test]
    async fn failed_lookup_keeps_record_unchanged() {
        let body = listing(&[item_with_url("Quiet", "9.1", 0, URL)]);
        let fetcher = ScriptedFetcher::new(vec![Ok(body)]).with_failing_route(URL, 404);

        let (records, _) = crawled(fetcher).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].engagement_count(), 0);
    }

    #[tokio::test]
    async fn records_with_counts_are_not_looked_up() {
        let body = listing(&[item("Loud", "8.0", 900)]);
        let fetcher = ScriptedFetcher::new(vec![Ok(body)]);

        let (_, fetcher) = crawled(fetcher).await;

        assert_eq!(fetcher.requests().len(), 1);
    }

    #[tokio::test]
    async fn interrupted_lookup_returns_every_record() {
        let body = listing(&[item_with_url("Quiet", "9.1", 0, URL)]);
        let fetcher = ScriptedFetcher::new(vec![Ok(body)]).with_route(URL, &detail_page(50));
        let (handle, interrupt) = interrupt_channel();
        let mut crawler = crawler(fetcher, policy()).with_interrupt(interrupt);

        let result = crawler.crawl("python", 1, 0).await;
        handle.raise();
        let records = crawler.fill_engagement("python", result.records).await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].engagement_count(), 0);
        assert_eq!(crawler.fetcher.requests().len(), 1);
    }
}
