//! Category Sequencer: per-category ordering and previous/next links.
//!
//! Adjacency is computed only after partitioning by `(locale, category)`, so
//! a reader paging through one category never lands in another.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use tracing::debug;

use sitepipe_shared::{LocaleBucket, NavLink};

use crate::normalize::category_key;
use crate::validate::ValidRecord;

/// Valid records sharing `(locale, category)`, newest first.
#[derive(Debug, Clone)]
pub struct CategoryGroup {
    pub locale: LocaleBucket,
    pub category: String,
    records: Vec<ValidRecord>,
}

impl CategoryGroup {
    pub fn records(&self) -> &[ValidRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// A record with its neighbours inside its category group.
#[derive(Debug, Clone)]
pub struct SequencedPage {
    pub record: ValidRecord,
    /// Older neighbour.
    pub prev: NavLink,
    /// Newer neighbour.
    pub next: NavLink,
}

/// Newest first; ties broken by id so the order is total.
pub fn newest_first(a: &ValidRecord, b: &ValidRecord) -> Ordering {
    b.created_at
        .cmp(&a.created_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Group records by `(locale, category)`. Groups come out sorted by key;
/// records inside a group are sorted newest first.
pub fn partition(records: &[ValidRecord]) -> Vec<CategoryGroup> {
    let mut groups: BTreeMap<(LocaleBucket, String), Vec<ValidRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry((record.locale, category_key(&record.category)))
            .or_default()
            .push(record.clone());
    }

    groups
        .into_iter()
        .map(|((locale, category), mut records)| {
            records.sort_by(newest_first);
            CategoryGroup {
                locale,
                category,
                records,
            }
        })
        .collect()
}

/// Attach prev/next links to every record of one group.
///
/// For position `i`, `prev` is `i + 1` (older) and `next` is `i - 1`
/// (newer). The ends get [`NavLink::None`].
pub fn sequence(group: &CategoryGroup) -> Vec<SequencedPage> {
    let records = group.records();
    let link = |index: Option<usize>| {
        index
            .and_then(|i| records.get(i))
            .map(|r| NavLink::target(r.slug.clone(), r.title.clone()))
            .unwrap_or(NavLink::None)
    };

    let pages: Vec<SequencedPage> = records
        .iter()
        .enumerate()
        .map(|(i, record)| SequencedPage {
            record: record.clone(),
            prev: link(i.checked_add(1)),
            next: link(i.checked_sub(1)),
        })
        .collect();

    debug!(
        locale = %group.locale,
        category = %group.category,
        pages = pages.len(),
        "category sequenced"
    );
    pages
}

/// Partition then sequence every group.
pub fn sequence_all(records: &[ValidRecord]) -> Vec<SequencedPage> {
    partition(records).iter().flat_map(sequence).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{ValidationRules, validate};
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use sitepipe_shared::NormalizedRecord;

    /// `age` in hours before a fixed instant; larger is older.
    fn record(slug: &str, category: &str, age: i64) -> ValidRecord {
        let base = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let normalized = NormalizedRecord {
            id: format!("id-{slug}"),
            created_at: base - Duration::hours(age),
            title: slug.to_uppercase(),
            slug: slug.into(),
            category: category.into(),
            body: json!("a body that is comfortably longer than the minimum length"),
            summary: String::new(),
            date: None,
            image_url: None,
            image_alt: String::new(),
            locale: LocaleBucket::Primary,
        };
        validate(normalized, &ValidationRules::default()).unwrap()
    }

    fn find<'a>(pages: &'a [SequencedPage], slug: &str) -> &'a SequencedPage {
        pages.iter().find(|p| p.record.slug == slug).unwrap()
    }

    #[test]
    fn three_records_link_by_position() {
        let pages = sequence_all(&[
            record("a", "news", 1),
            record("b", "news", 2),
            record("c", "news", 3),
        ]);

        let a = find(&pages, "a");
        let b = find(&pages, "b");
        let c = find(&pages, "c");

        assert_eq!(b.prev, NavLink::target("c", "C"));
        assert_eq!(b.next, NavLink::target("a", "A"));
        assert_eq!(a.next, NavLink::None);
        assert_eq!(a.prev.slug(), Some("b"));
        assert_eq!(c.prev, NavLink::None);
        assert_eq!(c.next.slug(), Some("b"));
    }

    #[test]
    fn single_record_gets_two_sentinels() {
        let pages = sequence_all(&[record("only", "news", 1)]);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].prev.is_none());
        assert!(pages[0].next.is_none());
    }

    #[test]
    fn links_never_cross_categories() {
        // Interleaved in fetch order: news, dynamics, news, dynamics.
        let records = [
            record("n1", "news", 1),
            record("d1", "dynamics", 2),
            record("n2", "news", 3),
            record("d2", "dynamics", 4),
        ];
        let pages = sequence_all(&records);

        for page in &pages {
            for link in [&page.prev, &page.next] {
                if let Some(slug) = link.slug() {
                    let target = find(&pages, slug);
                    assert_eq!(target.record.category, page.record.category);
                }
            }
        }
        assert_eq!(find(&pages, "n1").prev.slug(), Some("n2"));
        assert_eq!(find(&pages, "d1").prev.slug(), Some("d2"));
    }

    #[test]
    fn input_order_does_not_matter() {
        let groups = partition(&[
            record("c", "news", 3),
            record("a", "news", 1),
            record("b", "news", 2),
        ]);
        assert_eq!(groups.len(), 1);
        let slugs: Vec<_> = groups[0].records().iter().map(|r| r.slug.as_str()).collect();
        assert_eq!(slugs, ["a", "b", "c"]);
    }

    #[test]
    fn equal_timestamps_are_ordered_by_id() {
        let groups = partition(&[record("y", "news", 1), record("x", "news", 1)]);
        let ids: Vec<_> = groups[0].records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["id-x", "id-y"]);
    }
}
