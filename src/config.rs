use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

/// Marker left in template API keys; a key containing it counts as absent
const KEY_TEMPLATE_MARKER: &str = "YOUR_";

/// Screenshot service configuration
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Pause between calls when resolving many bookmarks at once
    pub batch_delay: Duration,
    pub microlink_endpoint: String,
    pub screenshotone_endpoint: String,
    pub screenshotone_access_key: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            viewport_width: 1024,
            viewport_height: 1024,
            batch_delay: Duration::from_secs(1),
            microlink_endpoint: "https://api.microlink.io/screenshot".to_string(),
            screenshotone_endpoint: "https://api.screenshotone.com/take".to_string(),
            screenshotone_access_key: "_demo_".to_string(),
        }
    }
}

/// Background photo configuration
#[derive(Debug, Clone)]
pub struct BackgroundConfig {
    pub unsplash_access_key: Option<String>,
    pub unsplash_endpoint: String,
    pub timeout_secs: u64,
    /// A background older than this is refreshed by the watcher
    pub max_age: Duration,
    /// How often the watcher checks the age (6-field cron)
    pub check_cron: String,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            unsplash_access_key: None,
            unsplash_endpoint: "https://api.unsplash.com/photos/random".to_string(),
            timeout_secs: 10,
            max_age: Duration::from_secs(30 * 60),
            check_cron: "0 */5 * * * *".to_string(),
        }
    }
}

impl BackgroundConfig {
    /// The key, if it is set and not a template placeholder
    pub fn usable_key(&self) -> Option<&str> {
        self.unsplash_access_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && !k.contains(KEY_TEMPLATE_MARKER))
    }
}

#[derive(Debug, Clone)]
pub struct StartPageConfig {
    pub settings_path: PathBuf,
    pub resolver: ResolverConfig,
    pub background: BackgroundConfig,
    /// How long a live preview may take to load before it counts as blocked
    pub preview_timeout: Duration,
}

impl Default for StartPageConfig {
    fn default() -> Self {
        Self {
            settings_path: default_settings_path(),
            resolver: ResolverConfig::default(),
            background: BackgroundConfig::default(),
            preview_timeout: Duration::from_secs(10),
        }
    }
}

impl StartPageConfig {
    /// Defaults overlaid with `STARTPAGE_SETTINGS`, `UNSPLASH_ACCESS_KEY`
    /// and `STARTPAGE_BATCH_DELAY_MS`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("STARTPAGE_SETTINGS") {
            if !path.trim().is_empty() {
                config.settings_path = PathBuf::from(path);
            }
        }
        if let Ok(key) = std::env::var("UNSPLASH_ACCESS_KEY") {
            config.background.unsplash_access_key = Some(key);
        }
        if let Ok(delay) = std::env::var("STARTPAGE_BATCH_DELAY_MS") {
            match delay.parse::<u64>() {
                Ok(ms) => config.resolver.batch_delay = Duration::from_millis(ms),
                Err(_) => debug!("Ignoring invalid STARTPAGE_BATCH_DELAY_MS: {}", delay),
            }
        }

        config
    }
}

fn default_settings_path() -> PathBuf {
    match dirs::config_dir() {
        Some(dir) => dir.join("startpage").join("settings.json"),
        None => PathBuf::from(".startpage-settings.json"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StartPageConfig::default();
        assert_eq!(config.preview_timeout, Duration::from_secs(10));
        assert_eq!(config.resolver.batch_delay, Duration::from_secs(1));
        assert_eq!(config.background.max_age, Duration::from_secs(1800));
        assert_eq!(config.settings_path.extension().unwrap(), "json");
    }

    #[test]
    fn test_template_key_is_not_usable() {
        let mut bg = BackgroundConfig::default();
        assert!(bg.usable_key().is_none());
        bg.unsplash_access_key = Some("YOUR_UNSPLASH_ACCESS_KEY_HERE".to_string());
        assert!(bg.usable_key().is_none());
        bg.unsplash_access_key = Some("  ".to_string());
        assert!(bg.usable_key().is_none());
        bg.unsplash_access_key = Some("abc123".to_string());
        assert_eq!(bg.usable_key(), Some("abc123"));
    }
}
