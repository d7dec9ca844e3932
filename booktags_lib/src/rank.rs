//! Engagement filter and rating order.

use crate::record::Record;

/// Records that passed the engagement threshold, best rated first.
#[derive(Debug, Clone, PartialEq)]
pub struct Ranked {
    pub records: Vec<Record>,
    /// How many records fell below the threshold.
    pub excluded: usize,
}

/// Keeps records with at least `min_engagement` ratings and sorts them by
/// rating, highest first. Equal ratings keep their input order.
pub fn rank(records: Vec<Record>, min_engagement: u64) -> Ranked {
    let total = records.len();
    let mut kept: Vec<Record> = records
        .into_iter()
        .filter(|r| r.engagement_count() >= min_engagement)
        .collect();
    let excluded = total - kept.len();
    if excluded > 0 {
        tracing::info!(
            "Excluded {} of {} records below {} ratings",
            excluded,
            total,
            min_engagement
        );
    }

    kept.sort_by(|a, b| b.rating().total_cmp(&a.rating()));
    Ranked {
        records: kept,
        excluded,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::RecordDraft;

    fn record(title: &str, rating: f64, count: u64) -> Record {
        RecordDraft {
            title: Some(title.to_string()),
            rating: Some(rating),
            engagement_count: Some(count),
            ..RecordDraft::default()
        }
        .finish()
    }

    fn titles(ranked: &Ranked) -> Vec<&str> {
        ranked.records.iter().map(|r| r.title()).collect()
    }

    fn sample() -> Vec<Record> {
        vec![
            record("a", 7.5, 500),
            record("b", 9.0, 20),
            record("c", 8.1, 300),
            record("d", 7.5, 1200),
            record("e", 0.0, 4000),
            record("f", 9.0, 301),
        ]
    }

    #[test]
    fn keeps_threshold_and_orders_by_rating() {
        let records = vec![
            record("five hundred", 7.2, 500),
            record("one hundred", 9.9, 100),
            record("three hundred", 8.4, 300),
        ];

        let ranked = rank(records, 300);

        assert_eq!(titles(&ranked), vec!["three hundred", "five hundred"]);
        assert_eq!(ranked.excluded, 1);
    }

    #[test]
    fn equal_ratings_keep_input_order() {
        let ranked = rank(sample(), 0);
        assert_eq!(titles(&ranked), vec!["b", "f", "c", "a", "d", "e"]);
    }

    #[test]
    fn ranking_twice_changes_nothing() {
        for min in [0, 300, 1000] {
            let once = rank(sample(), min);
            let twice = rank(once.records.clone(), min);
            assert_eq!(once.records, twice.records);
            assert_eq!(twice.excluded, 0);
        }
    }

    #[test]
    fn higher_threshold_never_keeps_more() {
        let mut previous = usize::MAX;
        for min in [0, 1, 20, 21, 300, 301, 500, 1200, 4000, 4001] {
            let kept = rank(sample(), min).records.len();
            assert!(kept <= previous, "threshold {} kept {}", min, kept);
            previous = kept;
        }
        assert_eq!(previous, 0);
    }

    #[test]
    fn empty_input() {
        let ranked = rank(Vec::new(), 300);
        assert!(ranked.records.is_empty());
        assert_eq!(ranked.excluded, 0);
    }
}
