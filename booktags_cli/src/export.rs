//! Writes ranked records to xlsx, csv, or json files.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use booktags_lib::{BatchReport, Record, TopicReport};
use rust_xlsxwriter::{Format, Workbook};
use serde::ser::{Serialize, Serializer};

/// Excel's limit on worksheet name length.
const SHEET_NAME_MAX: usize = 31;

/// Budget for the joined topics in a file name; common filesystems cap a
/// name at 255 bytes.
pub const FILE_TOPICS_MAX_BYTES: usize = 200;

const HEADERS: [&str; 8] = [
    "sequence",
    "title",
    "rating",
    "engagement_count",
    "author",
    "publisher_info",
    "url",
    "description",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum ExportFormat {
    Xlsx,
    Csv,
    Json,
}

#[derive(serde::Serialize)]
struct RecordRow<'a> {
    sequence: usize,
    title: &'a str,
    rating: f64,
    engagement_count: u64,
    author: &'a str,
    publisher_info: &'a str,
    url: &'a str,
    description: &'a str,
}

fn build_rows(records: &[Record]) -> Vec<RecordRow<'_>> {
    records
        .iter()
        .enumerate()
        .map(|(i, r)| RecordRow {
            sequence: i + 1,
            title: r.title(),
            rating: r.rating(),
            engagement_count: r.engagement_count(),
            author: r.author(),
            publisher_info: r.publisher_info(),
            url: r.url(),
            description: r.description(),
        })
        .collect()
}

/// Writes every processed topic and returns the files created.
pub fn export(report: &BatchReport, format: ExportFormat, out_dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(out_dir)
        .with_context(|| format!("creating output directory {}", out_dir.display()))?;

    match format {
        ExportFormat::Xlsx => {
            let path = out_dir.join(file_name(&report.topics, "xlsx"));
            write_xlsx(&report.topics, &path)?;
            Ok(vec![path])
        }
        ExportFormat::Json => {
            let path = out_dir.join(file_name(&report.topics, "json"));
            write_json(&report.topics, &path)?;
            Ok(vec![path])
        }
        ExportFormat::Csv => report
            .topics
            .iter()
            .zip(csv_file_names(&report.topics))
            .map(|(topic, name)| -> Result<PathBuf> {
                let path = out_dir.join(name);
                write_csv(&topic.records, &path)?;
                Ok(path)
            })
            .collect(),
    }
}

/// `book_list-{topics joined by '-'}.{ext}`, with path-hostile characters
/// replaced. A joined part longer than [`FILE_TOPICS_MAX_BYTES`] is cut on a
/// char boundary and tagged with the number of topics.
pub fn file_name(topics: &[TopicReport], ext: &str) -> String {
    format!("{}.{}", file_stem(topics), ext)
}

fn file_stem(topics: &[TopicReport]) -> String {
    let joined = topics
        .iter()
        .map(|t| t.topic.as_str())
        .collect::<Vec<_>>()
        .join("-");
    let safe: String = joined
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c => c,
        })
        .collect();

    if safe.len() <= FILE_TOPICS_MAX_BYTES {
        return format!("book_list-{}", safe);
    }
    let mut cut = FILE_TOPICS_MAX_BYTES;
    while !safe.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("book_list-{}-{}_tags", &safe[..cut], topics.len())
}

/// One CSV file name per topic. Topics that sanitise to the same name get a
/// numeric suffix so no file overwrites another.
pub fn csv_file_names(topics: &[TopicReport]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    topics
        .iter()
        .map(|topic| {
            let stem = file_stem(std::slice::from_ref(topic));
            let mut name = format!("{}.csv", stem);
            let mut n = 2;
            while taken.contains(&name.to_lowercase()) {
                name = format!("{}_{}.csv", stem, n);
                n += 1;
            }
            taken.insert(name.to_lowercase());
            name
        })
        .collect()
}

/// Worksheet names for `topics`: forbidden characters replaced, cut to 31
/// characters, no leading or trailing apostrophe, and made unique
/// (case-insensitively) with a numeric suffix.
pub fn sheet_names<'a>(topics: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    let mut names = Vec::new();

    for topic in topics {
        let cleaned: String = topic
            .chars()
            .map(|c| match c {
                '[' | ']' | ':' | '*' | '?' | '/' | '\\' => '_',
                c => c,
            })
            .collect();

        let mut name = fit_sheet_name(&cleaned, SHEET_NAME_MAX);
        let mut n = 2;
        while taken.contains(&name.to_lowercase()) {
            let suffix = format!("_{}", n);
            let stem = fit_sheet_name(&cleaned, SHEET_NAME_MAX - suffix.chars().count());
            name = format!("{}{}", stem, suffix);
            n += 1;
        }
        taken.insert(name.to_lowercase());
        names.push(name);
    }
    names
}

/// Cuts to `max` chars, then drops apostrophes left at either end.
fn fit_sheet_name(cleaned: &str, max: usize) -> String {
    let cut = truncate_chars(cleaned, max);
    let trimmed = cut.trim_matches('\'');
    if trimmed.is_empty() {
        "sheet".to_string()
    } else {
        trimmed.to_string()
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn write_xlsx(topics: &[TopicReport], path: &Path) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let names = sheet_names(topics.iter().map(|t| t.topic.as_str()));

    for (topic, name) in topics.iter().zip(names) {
        let sheet = workbook.add_worksheet();
        sheet
            .set_name(&name)
            .with_context(|| format!("naming sheet for tag '{}'", topic.topic))?;

        for (col, header) in (0u16..).zip(HEADERS) {
            sheet.write_string_with_format(0, col, header, &bold)?;
        }
        for (row, r) in (1u32..).zip(build_rows(&topic.records)) {
            sheet.write_number(row, 0, r.sequence as f64)?;
            sheet.write_string(row, 1, r.title)?;
            sheet.write_number(row, 2, r.rating)?;
            sheet.write_number(row, 3, r.engagement_count as f64)?;
            sheet.write_string(row, 4, r.author)?;
            sheet.write_string(row, 5, r.publisher_info)?;
            sheet.write_string(row, 6, r.url)?;
            sheet.write_string(row, 7, r.description)?;
        }
    }

    workbook
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn write_csv(records: &[Record], path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    if records.is_empty() {
        wtr.write_record(HEADERS)?;
    }
    for row in build_rows(records) {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Topic-to-rows map that keeps the crawl order of topics.
struct TopicRows<'a>(&'a [TopicReport]);

impl Serialize for TopicRows<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.0
                .iter()
                .map(|t| (t.topic.as_str(), build_rows(&t.records))),
        )
    }
}

fn write_json(topics: &[TopicReport], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&TopicRows(topics))?;
    fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
