use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::StartPageError;

/// A single website tile. Identity is the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bookmark {
    pub name: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub desc: String,
    pub url: String,
    /// Image URL or data URI; `None` until a screenshot has been resolved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot: Option<String>,
}

impl Bookmark {
    pub fn new(name: impl Into<String>, desc: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            desc: desc.into(),
            url: url.into(),
            screenshot: None,
        }
    }

    pub fn with_screenshot(mut self, screenshot: impl Into<String>) -> Self {
        self.screenshot = Some(screenshot.into());
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Named, ordered group of bookmarks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub key: String,
    pub bookmarks: Vec<Bookmark>,
}

/// Category key -> bookmarks, iterated in insertion order.
///
/// Persisted as a JSON object; document order is kept on load so that
/// "first match" lookups and new-key discovery are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
    entries: Vec<Category>,
}

impl CategoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.position(key).is_some()
    }

    pub fn get(&self, key: &str) -> Option<&[Bookmark]> {
        self.entries
            .iter()
            .find(|c| c.key == key)
            .map(|c| c.bookmarks.as_slice())
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Vec<Bookmark>> {
        self.entries
            .iter_mut()
            .find(|c| c.key == key)
            .map(|c| &mut c.bookmarks)
    }

    /// Returns the list for `key`, appending an empty one at the end if absent
    pub fn entry(&mut self, key: &str) -> &mut Vec<Bookmark> {
        let idx = match self.position(key) {
            Some(idx) => idx,
            None => {
                self.entries.push(Category {
                    key: key.to_string(),
                    bookmarks: Vec::new(),
                });
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].bookmarks
    }

    /// Replaces the list in place when the key exists, otherwise appends
    pub fn insert(&mut self, key: impl Into<String>, bookmarks: Vec<Bookmark>) {
        let key = key.into();
        match self.position(&key) {
            Some(idx) => self.entries[idx].bookmarks = bookmarks,
            None => self.entries.push(Category { key, bookmarks }),
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<Vec<Bookmark>> {
        self.position(key)
            .map(|idx| self.entries.remove(idx).bookmarks)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|c| c.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Bookmark])> {
        self.entries
            .iter()
            .map(|c| (c.key.as_str(), c.bookmarks.as_slice()))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Vec<Bookmark>)> {
        self.entries
            .iter_mut()
            .map(|c| (c.key.as_str(), &mut c.bookmarks))
    }

    fn position(&self, key: &str) -> Option<usize> {
        self.entries.iter().position(|c| c.key == key)
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<Bookmark>)> for CategoryMap {
    fn from_iter<I: IntoIterator<Item = (K, Vec<Bookmark>)>>(iter: I) -> Self {
        let mut map = CategoryMap::new();
        for (key, bookmarks) in iter {
            map.insert(key, bookmarks);
        }
        map
    }
}

impl Serialize for CategoryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for category in &self.entries {
            map.serialize_entry(&category.key, &category.bookmarks)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CategoryMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct CategoryMapVisitor;

        impl<'de> Visitor<'de> for CategoryMapVisitor {
            type Value = CategoryMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of category name to bookmark list")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<CategoryMap, A::Error> {
                let mut map = CategoryMap::new();
                while let Some((key, bookmarks)) = access.next_entry::<String, Vec<Bookmark>>()? {
                    map.insert(key, bookmarks);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(CategoryMapVisitor)
    }
}

/// How bookmarks inside one category are ordered.
///
/// Stored values that are not recognised load as `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "String")]
pub enum SortMethod {
    #[default]
    Default,
    Alphabetical,
    LastUsed,
    MostUsed,
}

impl SortMethod {
    pub const ALL: [SortMethod; 4] = [
        SortMethod::Default,
        SortMethod::Alphabetical,
        SortMethod::LastUsed,
        SortMethod::MostUsed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SortMethod::Default => "default",
            SortMethod::Alphabetical => "alphabetical",
            SortMethod::LastUsed => "lastUsed",
            SortMethod::MostUsed => "mostUsed",
        }
    }

    /// Button label shown next to each category
    pub fn label(&self) -> &'static str {
        match self {
            SortMethod::Default => "Default",
            SortMethod::Alphabetical => "A-Z",
            SortMethod::LastUsed => "Recent",
            SortMethod::MostUsed => "Popular",
        }
    }
}

impl fmt::Display for SortMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMethod {
    type Err = StartPageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(SortMethod::Default),
            "alphabetical" | "a-z" => Ok(SortMethod::Alphabetical),
            "lastUsed" | "last-used" | "recent" => Ok(SortMethod::LastUsed),
            "mostUsed" | "most-used" | "popular" => Ok(SortMethod::MostUsed),
            other => Err(StartPageError::UnknownSortMethod(other.to_string())),
        }
    }
}

impl From<String> for SortMethod {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_default()
    }
}

/// Per-URL usage counters; either field may be absent in stored records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UsageEntry {
    /// Milliseconds since the Unix epoch, 0 = never
    pub last_used: i64,
    pub use_count: u64,
}

pub type UsageStats = HashMap<String, UsageEntry>;

/// The single persisted settings record.
///
/// Every field falls back to its documented default when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub search_term: String,
    /// User categories; shadow built-ins with the same key
    pub websites: CategoryMap,
    pub custom_categories: Vec<String>,
    pub last_background_update: i64,
    pub default_sort: SortMethod,
    pub website_stats: UsageStats,
    pub category_order: Vec<String>,
    pub category_sorts: HashMap<String, SortMethod>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            search_term: crate::defaults::DEFAULT_SEARCH_TERM.to_string(),
            websites: CategoryMap::new(),
            custom_categories: Vec::new(),
            last_background_update: 0,
            default_sort: SortMethod::Default,
            website_stats: UsageStats::new(),
            category_order: Vec::new(),
            category_sorts: HashMap::new(),
        }
    }
}
