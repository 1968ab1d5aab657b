//! Sitemap Merger: prior entries + newly observed URLs → merged entries.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use tracing::{debug, instrument};

use sitepipe_shared::InsertOrder;

use crate::SitemapEntry;

/// Metadata stamped on URLs observed in this build.
#[derive(Debug, Clone)]
pub struct MergeOptions {
    /// Build date, written as `lastmod`.
    pub today: NaiveDate,
    pub priority: f64,
    pub changefreq: Option<String>,
    pub order: InsertOrder,
}

/// Result of a merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub entries: Vec<SitemapEntry>,
    /// URLs not present in the prior set.
    pub added: usize,
    /// Prior URLs observed again, whose metadata was refreshed.
    pub refreshed: usize,
}

/// Merge newly observed URLs into the prior sitemap.
///
/// - Keyed by `loc`; the output never contains a `loc` twice, even when the
///   prior document or `new_urls` do.
/// - A `loc` present in both keeps its prior position and takes the new
///   `lastmod`/`priority` (last write wins). A prior `changefreq` survives
///   unless the options carry one.
/// - New entries keep their relative order and are placed after
///   ([`InsertOrder::Append`]) or before ([`InsertOrder::Prepend`]) the prior
///   ones.
///
/// Merging the same `new_urls` into the output again yields the same `loc`
/// sequence.
#[instrument(skip_all, fields(prior = prior.len(), new = new_urls.len(), order = ?opts.order))]
pub fn merge(prior: Vec<SitemapEntry>, new_urls: &[String], opts: &MergeOptions) -> MergeOutcome {
    let lastmod = opts.today.format("%Y-%m-%d").to_string();

    // Collapse duplicates inside the prior set; later metadata wins.
    let mut kept: Vec<SitemapEntry> = Vec::with_capacity(prior.len());
    let mut prior_index: HashMap<String, usize> = HashMap::with_capacity(prior.len());
    for entry in prior {
        match prior_index.get(&entry.loc) {
            Some(&i) => {
                debug!(loc = %entry.loc, "duplicate loc in prior sitemap");
                overwrite(&mut kept[i], entry);
            }
            None => {
                prior_index.insert(entry.loc.clone(), kept.len());
                kept.push(entry);
            }
        }
    }

    let mut added: Vec<SitemapEntry> = Vec::new();
    let mut added_locs: HashSet<String> = HashSet::new();
    let mut refreshed: HashSet<usize> = HashSet::new();

    for url in new_urls {
        let loc = url.trim();
        if loc.is_empty() {
            continue;
        }

        let fresh = SitemapEntry {
            loc: loc.to_string(),
            lastmod: Some(lastmod.clone()),
            changefreq: opts.changefreq.clone(),
            priority: Some(opts.priority),
        };

        if let Some(&i) = prior_index.get(loc) {
            overwrite(&mut kept[i], fresh);
            refreshed.insert(i);
        } else if added_locs.insert(loc.to_string()) {
            added.push(fresh);
        }
    }

    let added_count = added.len();
    let entries = match opts.order {
        InsertOrder::Append => {
            kept.extend(added);
            kept
        }
        InsertOrder::Prepend => {
            added.extend(kept);
            added
        }
    };

    debug!(
        total = entries.len(),
        added = added_count,
        refreshed = refreshed.len(),
        "sitemap merged"
    );

    MergeOutcome {
        entries,
        added: added_count,
        refreshed: refreshed.len(),
    }
}

/// Newer metadata replaces older; absent newer values keep the older ones.
fn overwrite(target: &mut SitemapEntry, newer: SitemapEntry) {
    if newer.lastmod.is_some() {
        target.lastmod = newer.lastmod;
    }
    if newer.changefreq.is_some() {
        target.changefreq = newer.changefreq;
    }
    if newer.priority.is_some() {
        target.priority = newer.priority;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(order: InsertOrder) -> MergeOptions {
        MergeOptions {
            today: NaiveDate::from_ymd_opt(2025, 3, 14).unwrap(),
            priority: 0.8,
            changefreq: None,
            order,
        }
    }

    fn old(loc: &str) -> SitemapEntry {
        SitemapEntry {
            loc: loc.into(),
            lastmod: Some("2023-01-01".into()),
            changefreq: Some("monthly".into()),
            priority: Some(0.5),
        }
    }

    fn locs(entries: &[SitemapEntry]) -> Vec<&str> {
        entries.iter().map(|e| e.loc.as_str()).collect()
    }

    fn urls(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn appends_new_urls_after_prior() {
        let out = merge(
            vec![old("https://x/a"), old("https://x/b")],
            &urls(&["https://x/c", "https://x/d"]),
            &opts(InsertOrder::Append),
        );
        assert_eq!(
            locs(&out.entries),
            vec!["https://x/a", "https://x/b", "https://x/c", "https://x/d"]
        );
        assert_eq!(out.added, 2);
        assert_eq!(out.refreshed, 0);
        assert_eq!(out.entries[2].lastmod.as_deref(), Some("2025-03-14"));
        assert_eq!(out.entries[2].priority, Some(0.8));
    }

    #[test]
    fn prepends_new_urls_before_prior() {
        let out = merge(
            vec![old("https://x/a")],
            &urls(&["https://x/c", "https://x/d"]),
            &opts(InsertOrder::Prepend),
        );
        assert_eq!(
            locs(&out.entries),
            vec!["https://x/c", "https://x/d", "https://x/a"]
        );
    }

    #[test]
    fn overlapping_loc_takes_new_metadata_in_place() {
        let out = merge(
            vec![old("https://x/a"), old("https://x/b")],
            &urls(&["https://x/a"]),
            &opts(InsertOrder::Prepend),
        );
        assert_eq!(locs(&out.entries), vec!["https://x/a", "https://x/b"]);
        assert_eq!(out.added, 0);
        assert_eq!(out.refreshed, 1);

        let a = &out.entries[0];
        assert_eq!(a.lastmod.as_deref(), Some("2025-03-14"));
        assert_eq!(a.priority, Some(0.8));
        assert_eq!(a.changefreq.as_deref(), Some("monthly"));

        let b = &out.entries[1];
        assert_eq!(b.lastmod.as_deref(), Some("2023-01-01"));
    }

    #[test]
    fn duplicates_are_collapsed() {
        let out = merge(
            vec![old("https://x/a"), old("https://x/a")],
            &urls(&["https://x/b", "https://x/b", " https://x/a ", ""]),
            &opts(InsertOrder::Append),
        );
        assert_eq!(locs(&out.entries), vec!["https://x/a", "https://x/b"]);
        assert_eq!(out.added, 1);
        assert_eq!(out.refreshed, 1);
    }

    #[test]
    fn merge_is_idempotent() {
        for order in [InsertOrder::Append, InsertOrder::Prepend] {
            let new = urls(&["https://x/n1", "https://x/a", "https://x/n2"]);
            let first = merge(vec![old("https://x/a"), old("https://x/b")], &new, &opts(order));
            let second = merge(first.entries.clone(), &new, &opts(order));

            assert_eq!(second.entries, first.entries);
            assert_eq!(second.added, 0);
            assert_eq!(second.refreshed, 3);
        }
    }

    #[test]
    fn empty_prior_makes_everything_new() {
        let out = merge(
            Vec::new(),
            &urls(&["https://x/a", "https://x/b"]),
            &opts(InsertOrder::Append),
        );
        assert_eq!(out.added, 2);
        assert_eq!(out.entries.len(), 2);
    }
}
