use std::cmp::Reverse;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::model::{Bookmark, Settings, SortMethod, UsageStats};

/// Per-category override, else the global default
pub fn effective_method(settings: &Settings, category: &str) -> SortMethod {
    settings
        .category_sorts
        .get(category)
        .copied()
        .unwrap_or(settings.default_sort)
}

/// Returns `bookmarks` ordered by `method`.
///
/// All sorts are stable: bookmarks with equal keys keep their input order.
/// Bookmarks without usage stats count as never used.
pub fn sort(bookmarks: &[Bookmark], method: SortMethod, stats: &UsageStats) -> Vec<Bookmark> {
    let mut sorted = bookmarks.to_vec();
    match method {
        SortMethod::Default => {}
        SortMethod::Alphabetical => sorted.sort_by_cached_key(|b| collation_key(&b.name)),
        SortMethod::LastUsed => {
            sorted.sort_by_key(|b| Reverse(stats.get(&b.url).map_or(0, |s| s.last_used)))
        }
        SortMethod::MostUsed => {
            sorted.sort_by_key(|b| Reverse(stats.get(&b.url).map_or(0, |s| s.use_count)))
        }
    }
    sorted
}

/// Three-level key in the manner of a collator: base letters without case
/// or accents, then accents, then the raw text. "Évernote" sorts with the
/// E's, before "Zoom".
fn collation_key(name: &str) -> (String, String, String) {
    let decomposed: String = name.nfd().flat_map(char::to_lowercase).collect();
    let base = decomposed
        .chars()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    (base, decomposed, name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::UsageEntry;

    fn site(name: &str) -> Bookmark {
        Bookmark::new(name, "", format!("https://{}.com", name.to_lowercase()))
    }

    fn names(list: &[Bookmark]) -> Vec<&str> {
        list.iter().map(|b| b.name.as_str()).collect()
    }

    fn stats(entries: &[(&str, i64, u64)]) -> UsageStats {
        entries
            .iter()
            .map(|(name, last_used, use_count)| {
                (
                    format!("https://{}.com", name.to_lowercase()),
                    UsageEntry {
                        last_used: *last_used,
                        use_count: *use_count,
                    },
                )
            })
            .collect()
    }

    #[test]
    fn test_alphabetical() {
        let input = vec![site("Notion"), site("Gmail"), site("Trello")];
        let sorted = sort(&input, SortMethod::Alphabetical, &UsageStats::new());
        assert_eq!(names(&sorted), vec!["Gmail", "Notion", "Trello"]);
    }

    #[test]
    fn test_alphabetical_folds_accents() {
        let input = vec![site("Zoom"), site("Évernote"), site("eBay"), site("Ångström")];
        let sorted = sort(&input, SortMethod::Alphabetical, &UsageStats::new());
        assert_eq!(names(&sorted), vec!["Ångström", "eBay", "Évernote", "Zoom"]);

        // Unaccented spelling first when the letters match
        let input = vec![site("Café"), site("Cafe")];
        let sorted = sort(&input, SortMethod::Alphabetical, &UsageStats::new());
        assert_eq!(names(&sorted), vec!["Cafe", "Café"]);
    }

    #[test]
    fn test_alphabetical_ignores_case() {
        let input = vec![site("zebra"), site("Apple"), site("banana")];
        let sorted = sort(&input, SortMethod::Alphabetical, &UsageStats::new());
        assert_eq!(names(&sorted), vec!["Apple", "banana", "zebra"]);
    }

    #[test]
    fn test_most_used_untracked_last() {
        let usage = stats(&[("A", 10, 5), ("B", 20, 1)]);
        let input = vec![site("C"), site("B"), site("A")];
        let sorted = sort(&input, SortMethod::MostUsed, &usage);
        assert_eq!(names(&sorted), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_last_used_most_recent_first() {
        let usage = stats(&[("A", 10, 5), ("B", 20, 1)]);
        let input = vec![site("C"), site("A"), site("B")];
        let sorted = sort(&input, SortMethod::LastUsed, &usage);
        assert_eq!(names(&sorted), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let usage = stats(&[("A", 5, 2), ("B", 5, 2)]);
        let input = vec![site("B"), site("Z"), site("A"), site("Y")];
        let sorted = sort(&input, SortMethod::MostUsed, &usage);
        assert_eq!(names(&sorted), vec!["B", "A", "Z", "Y"]);
    }

    #[test]
    fn test_effective_method_prefers_override() {
        let mut settings = Settings::default();
        settings.default_sort = SortMethod::MostUsed;
        settings
            .category_sorts
            .insert("social".to_string(), SortMethod::Alphabetical);
        assert_eq!(effective_method(&settings, "social"), SortMethod::Alphabetical);
        assert_eq!(effective_method(&settings, "work"), SortMethod::MostUsed);
    }
}
