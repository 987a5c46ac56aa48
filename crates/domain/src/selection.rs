//! Candidate filtering against the project cooldown window

use std::collections::{BTreeMap, HashSet};
use time::Date;

use crate::model::Project;

/// Default size of the staleness-ranked fallback pool
pub const DEFAULT_POOL_SIZE: usize = 20;

/// Whole days between `last_seen` and `today` (negative if `last_seen` is in the future)
pub fn days_since(last_seen: Date, today: Date) -> i64 {
    (today - last_seen).whole_days()
}

/// A key is fresh when it was never recorded or its cooldown has elapsed
pub fn is_fresh(key: &str, seen: &BTreeMap<String, Date>, cooldown_days: u32, today: Date) -> bool {
    match seen.get(key) {
        None => true,
        Some(&last_seen) => days_since(last_seen, today) >= i64::from(cooldown_days),
    }
}

/// Projects outside their cooldown window, in input order
pub fn filter_fresh(
    raw: &[Project],
    seen: &BTreeMap<String, Date>,
    cooldown_days: u32,
    today: Date,
) -> Vec<Project> {
    raw.iter()
        .filter(|p| is_fresh(&p.identity(), seen, cooldown_days, today))
        .cloned()
        .collect()
}

/// Up to `pool_size` projects, stalest first; never-seen projects rank
/// ahead of everything and ties keep input order
pub fn staleness_pool(
    raw: &[Project],
    seen: &BTreeMap<String, Date>,
    today: Date,
    pool_size: usize,
) -> Vec<Project> {
    let mut ranked: Vec<(i64, &Project)> = raw
        .iter()
        .map(|p| {
            let age = seen
                .get(&p.identity())
                .map(|last_seen| days_since(*last_seen, today))
                .unwrap_or(i64::MAX);
            (age, p)
        })
        .collect();

    ranked.sort_by(|a, b| b.0.cmp(&a.0));

    ranked
        .into_iter()
        .take(pool_size.max(1))
        .map(|(_, p)| p.clone())
        .collect()
}

/// Drop nameless projects and repeated identities, keeping the first occurrence
pub fn dedupe_candidates(projects: Vec<Project>) -> Vec<Project> {
    let mut seen = HashSet::new();
    projects
        .into_iter()
        .filter(|p| !p.name.trim().is_empty())
        .filter(|p| seen.insert(p.identity()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;
    use time::macros::date;

    fn foo() -> Project {
        Project::new("Foo", "", "https://x/foo")
    }

    #[test]
    fn test_unseen_candidate_is_fresh() {
        let raw = vec![foo()];
        let fresh = filter_fresh(&raw, &BTreeMap::new(), 7, date!(2024 - 05 - 01));
        assert_eq!(fresh, raw);
    }

    #[test]
    fn test_candidate_seen_today_is_filtered_and_pooled() {
        let today = date!(2024 - 05 - 01);
        let raw = vec![foo()];
        let seen = BTreeMap::from([("https://x/foo".to_string(), today)]);

        assert!(filter_fresh(&raw, &seen, 7, today).is_empty());
        assert_eq!(staleness_pool(&raw, &seen, today, DEFAULT_POOL_SIZE), raw);
    }

    #[test]
    fn test_cooldown_boundary() {
        let today = date!(2024 - 05 - 08);
        let seen = BTreeMap::from([("https://x/foo".to_string(), date!(2024 - 05 - 01))]);

        assert!(is_fresh("https://x/foo", &seen, 7, today));
        assert!(!is_fresh("https://x/foo", &seen, 8, today));
    }

    #[test]
    fn test_cooldown_is_monotonic_within_window() {
        let first_check = date!(2024 - 05 - 01);
        let window = 7u32;
        for posted_offset in 0..window {
            let posted = first_check - Duration::days(i64::from(posted_offset));
            let seen = BTreeMap::from([("https://x/foo".to_string(), posted)]);
            if is_fresh("https://x/foo", &seen, window, first_check) {
                continue;
            }
            for day in 0..i64::from(window) {
                let later = first_check + Duration::days(day);
                if days_since(posted, later) < i64::from(window) {
                    assert!(!is_fresh("https://x/foo", &seen, window, later));
                }
            }
        }
    }

    #[test]
    fn test_filter_preserves_order() {
        let today = date!(2024 - 05 - 10);
        let raw = vec![
            Project::new("A", "", "https://x/a"),
            Project::new("B", "", "https://x/b"),
            Project::new("C", "", "https://x/c"),
        ];
        let seen = BTreeMap::from([("https://x/b".to_string(), today)]);

        let fresh = filter_fresh(&raw, &seen, 3, today);
        let names: Vec<_> = fresh.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["A", "C"]);
    }

    #[test]
    fn test_filter_matches_trailing_slash_variants() {
        let today = date!(2024 - 05 - 10);
        let raw = vec![Project::new("Foo", "", "https://x/foo/")];
        let seen = BTreeMap::from([("https://x/foo".to_string(), today)]);

        assert!(filter_fresh(&raw, &seen, 7, today).is_empty());
    }

    #[test]
    fn test_empty_input_gives_empty_output() {
        let today = date!(2024 - 05 - 10);
        assert!(filter_fresh(&[], &BTreeMap::new(), 7, today).is_empty());
        assert!(staleness_pool(&[], &BTreeMap::new(), today, 20).is_empty());
    }

    #[test]
    fn test_pool_ranks_unseen_then_stalest() {
        let today = date!(2024 - 05 - 10);
        let raw = vec![
            Project::new("Recent", "", "https://x/recent"),
            Project::new("Old", "", "https://x/old"),
            Project::new("Never", "", "https://x/never"),
            Project::new("Middle", "", "https://x/middle"),
        ];
        let seen = BTreeMap::from([
            ("https://x/recent".to_string(), date!(2024 - 05 - 09)),
            ("https://x/old".to_string(), date!(2024 - 04 - 01)),
            ("https://x/middle".to_string(), date!(2024 - 05 - 01)),
        ]);

        let pool = staleness_pool(&raw, &seen, today, 3);
        let names: Vec<_> = pool.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Never", "Old", "Middle"]);
    }

    #[test]
    fn test_pool_is_bounded() {
        let today = date!(2024 - 05 - 10);
        let raw: Vec<_> = (0..50)
            .map(|i| Project::new(format!("P{i}"), "", format!("https://x/{i}")))
            .collect();
        let seen: BTreeMap<_, _> = raw.iter().map(|p| (p.identity(), today)).collect();

        assert_eq!(staleness_pool(&raw, &seen, today, DEFAULT_POOL_SIZE).len(), 20);
    }

    #[test]
    fn test_dedupe_keeps_first_and_drops_nameless() {
        let projects = vec![
            Project::new("Foo", "FOO", "https://x/foo"),
            Project::new("  ", "", "https://x/blank"),
            Project::new("foo again", "", "https://x/foo/"),
            Project::new("Bar", "", "https://x/bar"),
        ];

        let deduped = dedupe_candidates(projects);
        let names: Vec<_> = deduped.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Foo", "Bar"]);
    }
}
