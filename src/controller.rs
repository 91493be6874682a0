//! The start page controller.
//!
//! Owns the single settings record. Every mutation takes the record's lock,
//! applies the change, and writes the result through to the store before
//! releasing it, so concurrent commands never lose each other's updates and
//! writes reach the store in program order. A failed write is logged and the
//! in-memory record stays authoritative.

use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::background::Background;
use crate::catalog::{self, CategoryView, Direction};
use crate::defaults::{self, CUSTOM_CATEGORY};
use crate::error::{Result, StartPageError};
use crate::model::{Bookmark, Settings, SortMethod, UsageEntry};
use crate::resolver::{ImageRequest, ImageResolver};
use crate::store::SettingsStore;
use crate::url_format::{normalize_user_url, tile_image};
use crate::usage;

const NO_DESCRIPTION: &str = "No description";

/// Input of the add/edit website form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebsiteForm {
    pub url: String,
    pub name: String,
    pub desc: String,
    /// Selected category; `"custom"` means use `custom_category`
    pub category: String,
    pub custom_category: Option<String>,
    /// Image captured during preview, if any
    pub screenshot: Option<String>,
    /// URL of the bookmark being edited
    pub editing: Option<String>,
}

impl WebsiteForm {
    pub fn target_category(&self) -> String {
        if self.category == CUSTOM_CATEGORY {
            match self.custom_category.as_deref().map(str::trim) {
                Some(name) if !name.is_empty() => name.to_string(),
                _ => CUSTOM_CATEGORY.to_string(),
            }
        } else {
            self.category.trim().to_string()
        }
    }
}

/// Commands the UI layer can issue
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    SaveWebsite(WebsiteForm),
    RemoveWebsite { url: String },
    MoveCategory { key: String, direction: Direction },
    ChangeSort { category: Option<String>, method: SortMethod },
    TrackUsage { url: String },
    SetSearchTerm(String),
    ResetToDefaults,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Saved { category: String, bookmark: Bookmark },
    Removed(Option<(String, Bookmark)>),
    Moved(bool),
    SortChanged,
    Tracked(UsageEntry),
    SearchTermSet,
    Reset,
}

pub struct StartPage {
    settings: Mutex<Settings>,
    store: Arc<dyn SettingsStore>,
    /// False when the stored record could not be read and is still in place
    writable: bool,
}

impl StartPage {
    /// Loads the record once; a missing or unreadable record means defaults.
    ///
    /// An unreadable record is never overwritten: unless the store moved it
    /// aside, changes stay in memory for this session.
    pub async fn load(store: Arc<dyn SettingsStore>) -> Self {
        let (settings, writable) = match store.get().await {
            Ok(Some(settings)) => {
                debug!("Loaded settings with {} user categories", settings.websites.len());
                (settings, true)
            }
            Ok(None) => (Settings::default(), true),
            Err(e @ StartPageError::Quarantined { .. }) => {
                warn!("⚠️  {}; starting from defaults", e);
                (Settings::default(), true)
            }
            Err(e) => {
                warn!("⚠️  Failed to load settings, using defaults without saving: {}", e);
                (Settings::default(), false)
            }
        };
        Self {
            writable,
            ..Self::with_settings(settings, store)
        }
    }

    pub fn with_settings(settings: Settings, store: Arc<dyn SettingsStore>) -> Self {
        Self {
            settings: Mutex::new(settings),
            store,
            writable: true,
        }
    }

    /// Whether changes reach the store
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Copy of the current record
    pub async fn snapshot(&self) -> Settings {
        self.settings.lock().await.clone()
    }

    pub async fn view(&self) -> Vec<CategoryView> {
        catalog::render_view(&*self.settings.lock().await)
    }

    /// Bookmark with `url`, user categories first, then built-ins
    pub async fn find(&self, url: &str) -> Option<(String, Bookmark)> {
        let settings = self.settings.lock().await;
        let found = catalog::find_by_url(&settings.websites, url)
            .map(|(category, bookmark)| (category.to_string(), bookmark.clone()));
        found.or_else(|| {
            catalog::find_by_url(&defaults::builtin_categories(), url)
                .map(|(category, bookmark)| (category.to_string(), bookmark.clone()))
        })
    }

    pub async fn dispatch(&self, action: Action) -> Result<Outcome> {
        match action {
            Action::SaveWebsite(form) => {
                let (category, bookmark) = self.save_website(form).await?;
                Ok(Outcome::Saved { category, bookmark })
            }
            Action::RemoveWebsite { url } => Ok(Outcome::Removed(self.remove_website(&url).await)),
            Action::MoveCategory { key, direction } => {
                Ok(Outcome::Moved(self.move_category(&key, direction).await))
            }
            Action::ChangeSort { category, method } => {
                self.change_sort(category.as_deref(), method).await;
                Ok(Outcome::SortChanged)
            }
            Action::TrackUsage { url } => Ok(Outcome::Tracked(self.track_usage(&url).await)),
            Action::SetSearchTerm(term) => {
                self.set_search_term(&term).await;
                Ok(Outcome::SearchTermSet)
            }
            Action::ResetToDefaults => {
                self.reset().await;
                Ok(Outcome::Reset)
            }
        }
    }

    /// Adds a website, or replaces the one being edited.
    ///
    /// The URL is auto-formatted and validated before anything changes.
    /// Without a captured screenshot the favicon (or placeholder) is used.
    pub async fn save_website(&self, form: WebsiteForm) -> Result<(String, Bookmark)> {
        let name = form.name.trim().to_string();
        if form.url.trim().is_empty() || name.is_empty() {
            return Err(StartPageError::MissingField);
        }
        let url = normalize_user_url(&form.url)?;
        let category = form.target_category();
        if category.is_empty() {
            return Err(StartPageError::MissingField);
        }

        let screenshot = form
            .screenshot
            .clone()
            .unwrap_or_else(|| tile_image(&name, &url));
        let desc = match form.desc.trim() {
            "" => NO_DESCRIPTION.to_string(),
            desc => desc.to_string(),
        };
        let bookmark = Bookmark::new(name, desc, url).with_screenshot(screenshot);

        let saved = bookmark.clone();
        let target = category.clone();
        self.mutate(move |settings| {
            match form.editing.as_deref() {
                Some(original) => {
                    debug!("Editing mode: removing old entry for {}", original);
                    catalog::materialize_builtin(&mut settings.websites, original);
                    catalog::edit(&mut settings.websites, original, &target, bookmark);
                }
                None => catalog::add(&mut settings.websites, &target, bookmark),
            }
            if !defaults::is_builtin(&target) && !settings.custom_categories.contains(&target) {
                settings.custom_categories.push(target.clone());
            }
            sync_custom_categories(settings);
        })
        .await;

        info!("✅ Added {} to {} category", saved.name, category);
        Ok((category, saved))
    }

    pub async fn remove_website(&self, url: &str) -> Option<(String, Bookmark)> {
        let mut removed = None;
        self.mutate_if(|settings| {
            removed = catalog::remove_by_url(&mut settings.websites, url);
            sync_custom_categories(settings);
            removed.is_some()
        })
        .await;
        removed
    }

    pub async fn move_category(&self, key: &str, direction: Direction) -> bool {
        let moved = self
            .mutate_if(|settings| catalog::reorder(settings, key, direction))
            .await;
        if moved {
            info!("Moved {} {:?}", key, direction);
        }
        moved
    }

    /// Per-category override when `category` is given, else the global default
    pub async fn change_sort(&self, category: Option<&str>, method: SortMethod) {
        self.mutate(|settings| match category {
            Some(key) => {
                settings.category_sorts.insert(key.to_string(), method);
            }
            None => settings.default_sort = method,
        })
        .await;
    }

    /// Call once per navigation to a bookmark, never on render
    pub async fn track_usage(&self, url: &str) -> UsageEntry {
        let now = usage::now_millis();
        self.mutate(|settings| usage::track(&mut settings.website_stats, url, now))
            .await
    }

    pub async fn set_search_term(&self, term: &str) {
        self.mutate(|settings| settings.search_term = term.trim().to_string())
            .await;
    }

    /// Stores the refresh time when a photo was actually applied
    pub async fn apply_background(&self, background: &Background) {
        if background.is_photo() {
            let now = usage::now_millis();
            self.mutate(|settings| settings.last_background_update = now)
                .await;
        }
    }

    pub async fn reset(&self) {
        self.mutate(|settings| *settings = Settings::default()).await;
        info!("🔄 Settings reset to defaults");
    }

    /// Resolves screenshots for user bookmarks that have none, one at a time
    /// with the resolver's batch delay, and persists once at the end.
    /// Built-in categories are skipped; they display favicons.
    pub async fn resolve_missing<F>(&self, resolver: &ImageResolver, progress_callback: F) -> usize
    where
        F: Fn(usize, usize, &str),
    {
        let requests: Vec<ImageRequest> = {
            let settings = self.settings.lock().await;
            settings
                .websites
                .iter()
                .flat_map(|(_, bookmarks)| bookmarks.iter())
                .filter(|b| b.screenshot.is_none() && !b.url.is_empty())
                .map(|b| ImageRequest::new(b.url.clone(), b.name.clone()))
                .collect()
        };
        if requests.is_empty() {
            return 0;
        }
        info!("📸 Loading screenshots for {} websites", requests.len());

        // The lock is not held while the network calls run
        let results = resolver.resolve_batch(requests, progress_callback).await;

        self.mutate(|settings| {
            let mut updated = 0;
            for (request, image) in results {
                let target = settings
                    .websites
                    .iter_mut()
                    .flat_map(|(_, bookmarks)| bookmarks.iter_mut())
                    .find(|b| b.url == request.url && b.screenshot.is_none());
                if let Some(bookmark) = target {
                    bookmark.screenshot = Some(image);
                    updated += 1;
                }
            }
            updated
        })
        .await
    }

    async fn mutate<R>(&self, f: impl FnOnce(&mut Settings) -> R) -> R {
        let mut settings = self.settings.lock().await;
        let result = f(&mut settings);
        self.persist(&settings).await;
        result
    }

    /// Persists only when `f` reports a change
    async fn mutate_if(&self, f: impl FnOnce(&mut Settings) -> bool) -> bool {
        let mut settings = self.settings.lock().await;
        let changed = f(&mut settings);
        if changed {
            self.persist(&settings).await;
        }
        changed
    }

    async fn persist(&self, settings: &Settings) {
        if !self.writable {
            warn!("⚠️  Not saving: the stored settings could not be read");
            return;
        }
        match self.store.set(settings).await {
            Ok(()) => debug!("Settings saved successfully"),
            Err(e) => warn!("⚠️  Failed to save settings (keeping in-memory state): {}", e),
        }
    }
}

/// Keeps the custom category list in step with the user categories
fn sync_custom_categories(settings: &mut Settings) {
    let websites = &settings.websites;
    settings
        .custom_categories
        .retain(|key| websites.contains_key(key));
}
