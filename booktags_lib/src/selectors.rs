//! CSS selectors locating item blocks and their fields.

use scraper::Selector;
use serde::Deserialize;

use crate::error::BookTagsError;

/// Selector strings, as written in configuration.
///
/// Field selectors are matched inside one item block; `item` is matched
/// against the whole listing page and `detail_votes` against an item's
/// detail page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteSelectors {
    pub item: String,
    pub title: String,
    pub rating: String,
    pub engagement: String,
    pub publication: String,
    pub description: String,
    pub detail_votes: String,
}

impl Default for SiteSelectors {
    fn default() -> Self {
        Self {
            item: "li.subject-item".to_string(),
            title: "h2 a".to_string(),
            rating: "span.rating_nums".to_string(),
            engagement: "span.pl".to_string(),
            publication: "div.pub".to_string(),
            description: "p".to_string(),
            detail_votes: "div.rating_sum a span".to_string(),
        }
    }
}

/// Compiled form of [`SiteSelectors`].
#[derive(Debug, Clone)]
pub struct Selectors {
    pub(crate) item: Selector,
    pub(crate) title: Selector,
    pub(crate) rating: Selector,
    pub(crate) engagement: Selector,
    pub(crate) publication: Selector,
    pub(crate) description: Selector,
    pub(crate) detail_votes: Selector,
}

impl Selectors {
    /// Compiles every selector, rejecting the whole set if any is invalid.
    pub fn compile(site: &SiteSelectors) -> Result<Self, BookTagsError> {
        Ok(Self {
            item: parse("item", &site.item)?,
            title: parse("title", &site.title)?,
            rating: parse("rating", &site.rating)?,
            engagement: parse("engagement", &site.engagement)?,
            publication: parse("publication", &site.publication)?,
            description: parse("description", &site.description)?,
            detail_votes: parse("detail_votes", &site.detail_votes)?,
        })
    }
}

fn parse(field: &str, selector: &str) -> Result<Selector, BookTagsError> {
    Selector::parse(selector).map_err(|e| {
        BookTagsError::Config(format!(
            "invalid {} selector '{}': {:?}",
            field, selector, e
        ))
    })
}
