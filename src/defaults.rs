//! Built-in data: default categories, search terms and fallback gradients.

use rand::seq::SliceRandom;

use crate::model::{Bookmark, CategoryMap};

pub const DEFAULT_SEARCH_TERM: &str = "nature";

pub const DEFAULT_SEARCH_TERMS: &[&str] = &[
    "nature",
    "landscape",
    "abstract",
    "minimalist",
    "ocean",
    "mountains",
    "forest",
    "sunset",
];

pub const FALLBACK_GRADIENTS: &[&str] = &[
    "linear-gradient(135deg, #667eea 0%, #764ba2 100%)",
    "linear-gradient(135deg, #f093fb 0%, #f5576c 100%)",
    "linear-gradient(135deg, #4facfe 0%, #00f2fe 100%)",
    "linear-gradient(135deg, #43e97b 0%, #38f9d7 100%)",
    "linear-gradient(135deg, #fa709a 0%, #fee140 100%)",
];

/// Category offered when the user picks "custom" without naming it
pub const CUSTOM_CATEGORY: &str = "custom";

const BUILTIN_TABLE: &[(&str, &[(&str, &str, &str)])] = &[
    (
        "social",
        &[
            ("Twitter", "Social networking", "https://twitter.com"),
            ("Facebook", "Connect with friends", "https://facebook.com"),
            ("Instagram", "Photo sharing", "https://instagram.com"),
            ("LinkedIn", "Professional network", "https://linkedin.com"),
            ("Discord", "Gaming chat", "https://discord.com"),
        ],
    ),
    (
        "productivity",
        &[
            ("Gmail", "Email service", "https://gmail.com"),
            ("Google Drive", "Cloud storage", "https://drive.google.com"),
            ("Notion", "All-in-one workspace", "https://notion.so"),
            ("Trello", "Project management", "https://trello.com"),
            ("Slack", "Team communication", "https://slack.com"),
        ],
    ),
    (
        "entertainment",
        &[
            ("YouTube", "Video platform", "https://youtube.com"),
            ("Netflix", "Streaming service", "https://netflix.com"),
            ("Spotify", "Music streaming", "https://spotify.com"),
            ("Reddit", "Discussion platform", "https://reddit.com"),
            ("Twitch", "Live streaming", "https://twitch.tv"),
        ],
    ),
];

/// The built-in categories, in display order
pub fn builtin_categories() -> CategoryMap {
    BUILTIN_TABLE
        .iter()
        .map(|(key, sites)| {
            let bookmarks = sites
                .iter()
                .map(|(name, desc, url)| Bookmark::new(*name, *desc, *url))
                .collect();
            (*key, bookmarks)
        })
        .collect()
}

pub fn is_builtin(key: &str) -> bool {
    BUILTIN_TABLE.iter().any(|(k, _)| *k == key)
}

pub fn random_search_term() -> &'static str {
    DEFAULT_SEARCH_TERMS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(DEFAULT_SEARCH_TERM)
}

pub fn random_gradient() -> &'static str {
    FALLBACK_GRADIENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(FALLBACK_GRADIENTS[0])
}
