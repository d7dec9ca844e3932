//! The catalog record and the defaults applied when a field is missing.

use serde::Serialize;

/// Title used when an item has no usable title anchor.
pub const UNKNOWN_TITLE: &str = "unknown title";

/// Author / publisher placeholder.
pub const UNKNOWN: &str = "unknown";

/// Descriptions are cut to this many characters.
pub const DESCRIPTION_MAX_CHARS: usize = 100;

/// One catalog item. Every field is always populated; see [`RecordDraft`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    title: String,
    rating: f64,
    engagement_count: u64,
    author: String,
    publisher_info: String,
    url: String,
    description: String,
}

impl Record {
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn engagement_count(&self) -> u64 {
        self.engagement_count
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn publisher_info(&self) -> &str {
        &self.publisher_info
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// A copy of this record with a different engagement count.
    pub fn with_engagement_count(&self, engagement_count: u64) -> Record {
        Record {
            engagement_count,
            ..self.clone()
        }
    }
}

/// Field values as found on the page, each possibly missing.
///
/// [`RecordDraft::finish`] is the single place where missing or unusable
/// values turn into their defaults.
#[derive(Debug, Clone, Default)]
pub struct RecordDraft {
    pub title: Option<String>,
    pub rating: Option<f64>,
    pub engagement_count: Option<u64>,
    pub author: Option<String>,
    pub publisher_info: Option<String>,
    pub url: Option<String>,
    pub description: Option<String>,
}

impl RecordDraft {
    pub fn finish(self) -> Record {
        Record {
            title: non_blank(self.title).unwrap_or_else(|| UNKNOWN_TITLE.to_string()),
            rating: self
                .rating
                .filter(|r| r.is_finite())
                // Fold -0.0 into 0.0 so it sorts with the default.
                .map(|r| if r == 0.0 { 0.0 } else { r })
                .unwrap_or(0.0),
            engagement_count: self.engagement_count.unwrap_or(0),
            author: non_blank(self.author).unwrap_or_else(|| UNKNOWN.to_string()),
            publisher_info: non_blank(self.publisher_info).unwrap_or_else(|| UNKNOWN.to_string()),
            url: self.url.map(|u| u.trim().to_string()).unwrap_or_default(),
            description: self
                .description
                .map(|d| truncate_chars(d.trim(), DESCRIPTION_MAX_CHARS))
                .unwrap_or_default(),
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_is_fully_defaulted() {
        let record = RecordDraft::default().finish();
        assert_eq!(record.title(), UNKNOWN_TITLE);
        assert_eq!(record.rating(), 0.0);
        assert_eq!(record.engagement_count(), 0);
        assert_eq!(record.author(), UNKNOWN);
        assert_eq!(record.publisher_info(), UNKNOWN);
        assert_eq!(record.url(), "");
        assert_eq!(record.description(), "");
    }

    #[test]
    fn blank_strings_count_as_missing() {
        let record = RecordDraft {
            title: Some("   ".into()),
            author: Some("".into()),
            publisher_info: Some("\n".into()),
            ..Default::default()
        }
        .finish();
        assert_eq!(record.title(), UNKNOWN_TITLE);
        assert_eq!(record.author(), UNKNOWN);
        assert_eq!(record.publisher_info(), UNKNOWN);
    }

    #[test]
    fn non_finite_rating_defaults() {
        for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let record = RecordDraft {
                rating: Some(bad),
                ..Default::default()
            }
            .finish();
            assert_eq!(record.rating(), 0.0);
        }
    }

    #[test]
    fn negative_zero_rating_normalised() {
        let record = RecordDraft {
            rating: Some(-0.0),
            ..Default::default()
        }
        .finish();
        assert!(record.rating().is_sign_positive());
    }

    #[test]
    fn description_truncated_by_chars() {
        let long: String = "书".repeat(150);
        let record = RecordDraft {
            description: Some(long),
            ..Default::default()
        }
        .finish();
        assert_eq!(record.description().chars().count(), DESCRIPTION_MAX_CHARS);
    }

    #[test]
    fn with_engagement_count_leaves_original() {
        let original = RecordDraft {
            title: Some("X".into()),
            ..Default::default()
        }
        .finish();
        let updated = original.with_engagement_count(42);
        assert_eq!(original.engagement_count(), 0);
        assert_eq!(updated.engagement_count(), 42);
        assert_eq!(updated.title(), "X");
    }
}
