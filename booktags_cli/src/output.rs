use booktags_lib::{BatchReport, TopicReport};
use tabled::{Table, Tabled};

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "Tag")]
    topic: String,
    #[tabled(rename = "Kept")]
    kept: usize,
    #[tabled(rename = "Filtered")]
    filtered: usize,
    #[tabled(rename = "Pages")]
    pages: u32,
    #[tabled(rename = "Requests")]
    requests: u32,
    #[tabled(rename = "Stopped")]
    termination: String,
}

fn build_summary_rows(topics: &[TopicReport]) -> Vec<SummaryRow> {
    topics
        .iter()
        .map(|t| SummaryRow {
            topic: t.topic.clone(),
            kept: t.records.len(),
            filtered: t.filtered,
            pages: t.stats.pages_parsed,
            requests: t.stats.fetch_attempts,
            termination: t.termination.to_string(),
        })
        .collect()
}

pub fn print_summary(report: &BatchReport, min_engagement: u64) {
    if !report.topics.is_empty() {
        println!("{}", Table::new(build_summary_rows(&report.topics)));
    }
    for line in empty_topic_lines(report) {
        println!("{}", line);
    }
    println!(
        "Total: {} books with at least {} ratings",
        report.total_records(),
        min_engagement
    );
    if report.interrupted {
        println!("Interrupted; results are partial.");
        if !report.skipped.is_empty() {
            println!("Skipped tags: {}", report.skipped.join(", "));
        }
    }
}

/// One line per tag that ended with no records.
pub fn empty_topic_lines(report: &BatchReport) -> Vec<String> {
    report
        .topics
        .iter()
        .filter(|t| t.records.is_empty())
        .map(|t| format!("No data collected for tag '{}' ({})", t.topic, t.termination))
        .collect()
}

/// Shown when every tag came back empty.
pub fn no_data_message() -> String {
    [
        "No data collected. Likely causes:",
        "  1. Network connection problems",
        "  2. The site is temporarily rate-limiting this IP",
        "  3. The tag does not exist",
        "  4. The minimum engagement threshold filtered every book",
    ]
    .join("\n")
}
