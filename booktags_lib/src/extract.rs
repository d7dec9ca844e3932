//! Item blocks and the field extractor.
//!
//! Every field has its own lookup returning `Option`; [`extract`] composes
//! them into a [`RecordDraft`] and lets [`RecordDraft::finish`] supply the
//! defaults. A missing or malformed field never costs the whole item.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::record::{Record, RecordDraft};
use crate::selectors::Selectors;

/// Segments at the tail of the publication line that describe the edition
/// (publisher, date, price).
const PUBLISHER_SEGMENTS: usize = 3;

static COUNT_RE: LazyLock<Option<Regex>> = LazyLock::new(|| compile_count_re(r"\d[\d,]*"));

/// Compiles the count pattern, logging once if it is rejected; every count
/// then falls back to its default.
fn compile_count_re(pattern: &str) -> Option<Regex> {
    Regex::new(pattern)
        .map_err(|e| {
            tracing::error!("regex compile error for count pattern: {}", e);
        })
        .ok()
}

/// The markup of one listing entry, detached from its page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemBlock {
    html: String,
}

impl ItemBlock {
    pub fn new(html: impl Into<String>) -> Self {
        Self { html: html.into() }
    }

    pub fn html(&self) -> &str {
        &self.html
    }
}

/// Finds every item block on a listing page. An empty result means the page
/// carried no recognizable entries.
pub fn item_blocks(body: &str, selectors: &Selectors) -> Vec<ItemBlock> {
    let document = Html::parse_document(body);
    document
        .select(&selectors.item)
        .map(|el| ItemBlock::new(el.html()))
        .collect()
}

/// Builds a record from one item block.
pub fn extract(block: &ItemBlock, selectors: &Selectors) -> Record {
    let fragment = Html::parse_fragment(block.html());
    let root = fragment.root_element();

    let anchor = root.select(&selectors.title).next();
    let (author, publisher_info) = match publication(&root, selectors) {
        Some((author, publisher)) => (author, Some(publisher)),
        None => (None, None),
    };

    RecordDraft {
        title: anchor.as_ref().and_then(title),
        url: anchor.as_ref().and_then(link),
        rating: rating(&root, selectors),
        engagement_count: engagement_count(&root, selectors),
        author,
        publisher_info,
        description: description(&root, selectors),
    }
    .finish()
}

/// Reads the vote count from an item's detail page.
pub fn detail_engagement_count(body: &str, selectors: &Selectors) -> Option<u64> {
    let document = Html::parse_document(body);
    document
        .select(&selectors.detail_votes)
        .find_map(|el| parse_count(&text_of(&el)))
}

fn title(anchor: &ElementRef) -> Option<String> {
    anchor
        .value()
        .attr("title")
        .map(collapse_ws)
        .filter(|t| !t.is_empty())
        .or_else(|| Some(text_of(anchor)).filter(|t| !t.is_empty()))
}

fn link(anchor: &ElementRef) -> Option<String> {
    anchor
        .value()
        .attr("href")
        .map(|href| href.trim().to_string())
        .filter(|href| !href.is_empty())
}

fn rating(root: &ElementRef, selectors: &Selectors) -> Option<f64> {
    first_text(root, &selectors.rating).and_then(|t| parse_rating(&t))
}

fn engagement_count(root: &ElementRef, selectors: &Selectors) -> Option<u64> {
    first_text(root, &selectors.engagement).and_then(|t| parse_count(&t))
}

fn publication(root: &ElementRef, selectors: &Selectors) -> Option<(Option<String>, String)> {
    first_text(root, &selectors.publication).and_then(|t| split_publication(&t))
}

fn description(root: &ElementRef, selectors: &Selectors) -> Option<String> {
    first_text(root, &selectors.description).filter(|t| !t.is_empty())
}

pub(crate) fn parse_rating(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|r| r.is_finite())
}

/// First integer embedded in `text`, e.g. `120` from `"(120人评价)"`.
/// Thousands separators are accepted; overflow counts as no number.
pub(crate) fn parse_count(text: &str) -> Option<u64> {
    let m = COUNT_RE.as_ref()?.find(text)?;
    m.as_str().replace(',', "").parse().ok()
}

/// Splits `"author / translator / publisher / date / price"` into the author
/// part (everything before the last three segments, if anything) and the
/// publisher part (the last three segments, or fewer).
pub(crate) fn split_publication(text: &str) -> Option<(Option<String>, String)> {
    let segments: Vec<&str> = text
        .split('/')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if segments.is_empty() {
        return None;
    }
    let cut = segments.len().saturating_sub(PUBLISHER_SEGMENTS);
    let (author, publisher) = segments.split_at(cut);
    let author = (!author.is_empty()).then(|| author.join(" / "));
    Some((author, publisher.join(" / ")))
}

fn first_text(root: &ElementRef, selector: &Selector) -> Option<String> {
    root.select(selector).next().map(|el| text_of(&el))
}

fn text_of(el: &ElementRef) -> String {
    collapse_ws(&el.text().collect::<String>())
}

fn collapse_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
