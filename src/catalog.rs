//! Bookmark catalog: built-in categories overlaid by user categories, the
//! persisted category order, and the add/edit/remove/reorder mutations.
//!
//! Lookups by URL take the first match in key-iteration order. Missing URLs
//! and categories are no-ops, never errors.

use tracing::debug;

use crate::defaults;
use crate::model::{Bookmark, CategoryMap, Settings, SortMethod};
use crate::sorting;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// One category as it should be displayed
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryView {
    pub key: String,
    pub title: String,
    pub sort: SortMethod,
    pub bookmarks: Vec<Bookmark>,
    pub can_move_up: bool,
    pub can_move_down: bool,
}

/// Built-ins overlaid by user categories. A user key equal to a built-in key
/// replaces that built-in list wholesale and keeps its position.
pub fn all_categories(websites: &CategoryMap) -> CategoryMap {
    let mut all = defaults::builtin_categories();
    for (key, bookmarks) in websites.iter() {
        if all.contains_key(key) {
            debug!("User category '{}' shadows the built-in one", key);
        }
        all.insert(key, bookmarks.to_vec());
    }
    all
}

/// Applies the persisted order to the current key set: known keys keep their
/// relative order, new keys are appended in encounter order, and keys that
/// no longer exist are dropped.
pub fn ordered_keys(order: &[String], all_keys: &[String]) -> Vec<String> {
    let mut ordered: Vec<String> = Vec::with_capacity(order.len() + all_keys.len());
    for key in order.iter().chain(all_keys.iter()) {
        if !ordered.contains(key) {
            ordered.push(key.clone());
        }
    }
    ordered.retain(|key| all_keys.contains(key));
    ordered
}

/// Effective display order for the current settings
pub fn current_order(settings: &Settings) -> Vec<String> {
    let all_keys: Vec<String> = all_categories(&settings.websites)
        .keys()
        .map(str::to_string)
        .collect();
    ordered_keys(&settings.category_order, &all_keys)
}

/// Appends to `category`, creating it if needed. No duplicate detection.
pub fn add(websites: &mut CategoryMap, category: &str, bookmark: Bookmark) {
    websites.entry(category).push(bookmark);
}

/// First bookmark with `url`, together with its category
pub fn find_by_url<'a>(websites: &'a CategoryMap, url: &str) -> Option<(&'a str, &'a Bookmark)> {
    websites
        .iter()
        .find_map(|(key, bookmarks)| bookmarks.iter().find(|b| b.url == url).map(|b| (key, b)))
}

/// Category holding `url`, searching user categories before built-ins
pub fn category_of(websites: &CategoryMap, url: &str) -> Option<String> {
    if let Some((key, _)) = find_by_url(websites, url) {
        return Some(key.to_string());
    }
    find_by_url(&defaults::builtin_categories(), url).map(|(key, _)| key.to_string())
}

/// Copies the built-in category holding `url` into the user categories so
/// that one entry can be edited without hiding its siblings. Returns the
/// copied key; does nothing when `url` is already a user bookmark or the
/// key is already shadowed.
pub fn materialize_builtin(websites: &mut CategoryMap, url: &str) -> Option<String> {
    if find_by_url(websites, url).is_some() {
        return None;
    }
    let builtins = defaults::builtin_categories();
    let (key, _) = find_by_url(&builtins, url)?;
    if websites.contains_key(key) {
        return None;
    }
    let bookmarks = builtins.get(key)?.to_vec();
    debug!("Copying built-in category {} for editing", key);
    websites.insert(key, bookmarks);
    Some(key.to_string())
}

/// Removes the first bookmark with `url` across user categories and deletes
/// its category when that leaves it empty.
pub fn remove_by_url(websites: &mut CategoryMap, url: &str) -> Option<(String, Bookmark)> {
    let mut emptied = None;
    let mut removed = None;

    for (key, bookmarks) in websites.iter_mut() {
        if let Some(idx) = bookmarks.iter().position(|b| b.url == url) {
            let bookmark = bookmarks.remove(idx);
            debug!("Removed website {} from {}", url, key);
            if bookmarks.is_empty() {
                emptied = Some(key.to_string());
            }
            removed = Some((key.to_string(), bookmark));
            break;
        }
    }

    if let Some(key) = emptied {
        websites.remove(&key);
        debug!("Removed empty category {}", key);
    }
    removed
}

/// Remove-then-add; the bookmark may change category
pub fn edit(websites: &mut CategoryMap, original_url: &str, category: &str, updated: Bookmark) {
    remove_by_url(websites, original_url);
    add(websites, category, updated);
}

/// Swaps `key` with its neighbour in the effective order and stores the
/// resulting full order. Returns false at either boundary or for an unknown
/// key, leaving settings untouched.
pub fn reorder(settings: &mut Settings, key: &str, direction: Direction) -> bool {
    let mut order = current_order(settings);
    let idx = match order.iter().position(|k| k == key) {
        Some(idx) => idx,
        None => return false,
    };

    let neighbour = match direction {
        Direction::Up if idx > 0 => idx - 1,
        Direction::Down if idx + 1 < order.len() => idx + 1,
        _ => return false,
    };

    order.swap(idx, neighbour);
    settings.category_order = order;
    true
}

/// "myTools" -> "My Tools"
pub fn display_title(key: &str) -> String {
    let mut title = String::with_capacity(key.len() + 4);
    for (i, ch) in key.chars().enumerate() {
        if i == 0 {
            title.extend(ch.to_uppercase());
        } else {
            if ch.is_uppercase() {
                title.push(' ');
            }
            title.push(ch);
        }
    }
    title
}

/// Ordered, sorted categories ready for display. Empty categories are
/// skipped here but stay in the order.
pub fn render_view(settings: &Settings) -> Vec<CategoryView> {
    let all = all_categories(&settings.websites);
    let order = current_order(settings);
    let total = order.len();

    order
        .iter()
        .enumerate()
        .filter_map(|(idx, key)| {
            let bookmarks = all.get(key).filter(|b| !b.is_empty())?;
            let sort = sorting::effective_method(settings, key);
            Some(CategoryView {
                key: key.clone(),
                title: display_title(key),
                sort,
                bookmarks: sorting::sort(bookmarks, sort, &settings.website_stats),
                can_move_up: idx > 0,
                can_move_down: idx + 1 < total,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn site(name: &str) -> Bookmark {
        Bookmark::new(name, "", format!("https://{}.com", name.to_lowercase()))
    }

    #[test]
    fn test_category_of_prefers_user_categories() {
        let mut websites = CategoryMap::new();
        websites.insert("work", vec![site("Gmail")]);

        assert_eq!(category_of(&websites, "https://gmail.com").as_deref(), Some("work"));
        assert_eq!(category_of(&websites, "https://discord.com").as_deref(), Some("social"));
        assert_eq!(category_of(&websites, "https://nowhere.example"), None);
    }

    #[test]
    fn test_materialize_builtin_keeps_siblings() {
        let mut websites = CategoryMap::new();
        assert_eq!(
            materialize_builtin(&mut websites, "https://discord.com").as_deref(),
            Some("social")
        );
        edit(
            &mut websites,
            "https://discord.com",
            "social",
            Bookmark::new("Discord", "Chat", "https://discord.gg"),
        );

        let social = websites.get("social").unwrap();
        assert_eq!(social.len(), 5);
        assert!(social.iter().any(|b| b.url == "https://twitter.com"));
        assert!(social.iter().any(|b| b.url == "https://discord.gg"));

        // Already shadowed or already a user bookmark: untouched
        assert!(materialize_builtin(&mut websites, "https://twitter.com").is_none());
        assert!(materialize_builtin(&mut websites, "https://nowhere.example").is_none());
    }

    #[test]
    fn test_user_category_shadows_builtin() {
        let mut websites = CategoryMap::new();
        websites.insert("productivity", vec![site("Jira")]);
        websites.insert("work", vec![site("Figma")]);

        let all = all_categories(&websites);
        assert_eq!(
            all.keys().collect::<Vec<_>>(),
            vec!["social", "productivity", "entertainment", "work"]
        );
        assert_eq!(all.get("productivity").unwrap(), &[site("Jira")][..]);
    }

    #[test]
    fn test_ordered_keys_merges_new_and_drops_stale() {
        let order = keys(&["b", "gone", "a"]);
        let all = keys(&["a", "b", "c", "d"]);
        assert_eq!(ordered_keys(&order, &all), keys(&["b", "a", "c", "d"]));
        assert_eq!(ordered_keys(&[], &all), all);
    }

    #[test]
    fn test_remove_last_bookmark_prunes_category() {
        let mut websites = CategoryMap::new();
        add(&mut websites, "solo", site("One"));
        add(&mut websites, "pair", site("Two"));
        add(&mut websites, "pair", site("Three"));

        let (category, removed) = remove_by_url(&mut websites, "https://one.com").unwrap();
        assert_eq!(category, "solo");
        assert_eq!(removed.name, "One");
        assert!(!websites.contains_key("solo"));

        remove_by_url(&mut websites, "https://two.com");
        assert_eq!(websites.get("pair").unwrap().len(), 1);

        assert!(remove_by_url(&mut websites, "https://missing.com").is_none());
    }

    #[test]
    fn test_remove_takes_first_match_only() {
        let mut websites = CategoryMap::new();
        add(&mut websites, "a", site("Dup"));
        add(&mut websites, "b", site("Dup"));
        remove_by_url(&mut websites, "https://dup.com");
        assert!(!websites.contains_key("a"));
        assert_eq!(websites.get("b").unwrap().len(), 1);
    }

    #[test]
    fn test_edit_moves_between_categories() {
        let mut websites = CategoryMap::new();
        add(&mut websites, "a", site("Keep"));
        add(&mut websites, "a", site("Move"));

        let updated = Bookmark::new("Moved", "new desc", "https://moved.com");
        edit(&mut websites, "https://move.com", "b", updated.clone());

        assert_eq!(websites.get("a").unwrap(), &[site("Keep")][..]);
        assert_eq!(websites.get("b").unwrap(), &[updated][..]);
    }

    #[test]
    fn test_reorder_boundaries_are_noops() {
        let mut settings = Settings::default();
        assert!(!reorder(&mut settings, "social", Direction::Up));
        assert!(!reorder(&mut settings, "entertainment", Direction::Down));
        assert!(!reorder(&mut settings, "nope", Direction::Down));
        assert!(settings.category_order.is_empty());
    }

    #[test]
    fn test_reorder_up_then_down_restores() {
        let mut settings = Settings::default();
        let before = current_order(&settings);

        assert!(reorder(&mut settings, "productivity", Direction::Up));
        assert_eq!(
            settings.category_order,
            keys(&["productivity", "social", "entertainment"])
        );
        assert!(reorder(&mut settings, "productivity", Direction::Down));
        assert_eq!(current_order(&settings), before);
    }

    #[test]
    fn test_display_title() {
        assert_eq!(display_title("social"), "Social");
        assert_eq!(display_title("myTools"), "My Tools");
        assert_eq!(display_title(""), "");
    }

    #[test]
    fn test_render_view_skips_empty_shadowed_builtin() {
        let mut settings = Settings::default();
        settings.websites.insert("social", Vec::new());
        settings
            .category_sorts
            .insert("productivity".to_string(), SortMethod::Alphabetical);

        let view = render_view(&settings);
        let shown: Vec<&str> = view.iter().map(|c| c.key.as_str()).collect();
        assert_eq!(shown, vec!["productivity", "entertainment"]);
        assert_eq!(view[0].sort, SortMethod::Alphabetical);
        assert_eq!(view[0].bookmarks[0].name, "Gmail");
        assert!(view[0].can_move_up);
        assert!(!view[1].can_move_down);
    }
}
