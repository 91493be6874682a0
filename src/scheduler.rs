use anyhow::Result;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{debug, info};

use crate::background::{is_stale, Background, BackgroundSource};
use crate::controller::StartPage;
use crate::usage;

/// Keeps the background photo fresh while the page is open
#[derive(Clone)]
pub struct BackgroundWatcher {
    page: Arc<StartPage>,
    source: Arc<BackgroundSource>,
}

impl BackgroundWatcher {
    pub fn new(page: Arc<StartPage>, source: Arc<BackgroundSource>) -> Self {
        Self { page, source }
    }

    /// Fetches a background for the current search term and records the
    /// refresh time when a photo was applied
    pub async fn refresh(&self) -> Background {
        let term = self.page.snapshot().await.search_term;
        let background = self.source.fetch(&term).await;
        self.page.apply_background(&background).await;
        background
    }

    /// Refreshes only when the last photo is older than the configured age
    pub async fn refresh_if_stale(&self, now_ms: i64) -> Option<Background> {
        let last = self.page.snapshot().await.last_background_update;
        if !is_stale(last, now_ms, self.source.max_age()) {
            debug!("Background still fresh, skipping refresh");
            return None;
        }
        info!("🔄 Background is stale, refreshing");
        Some(self.refresh().await)
    }
}

/// Loads a background now, then checks its age on the configured cron
/// schedule until Ctrl+C.
pub async fn start_watcher(watcher: BackgroundWatcher) -> Result<()> {
    let mut scheduler = JobScheduler::new().await?;
    let cron_expr = watcher.source.check_cron().to_string();

    info!("⏰ Scheduler initialized with cron: {}", cron_expr);

    let initial = watcher.refresh().await;
    info!("🖼️  Background: {}", initial.css());

    let job_watcher = watcher.clone();
    let job = Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
        let watcher = job_watcher.clone();
        Box::pin(async move {
            debug!("Scheduled background check triggered");
            if let Some(background) = watcher.refresh_if_stale(usage::now_millis()).await {
                info!("✅ Background refreshed: {}", background.css());
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;

    info!("🔄 Watching background. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;
    info!("🛑 Shutting down scheduler...");

    scheduler.shutdown().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BackgroundConfig;
    use crate::model::Settings;
    use crate::store::MemoryStore;

    fn watcher(last_update: i64) -> (BackgroundWatcher, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let settings = Settings {
            last_background_update: last_update,
            ..Settings::default()
        };
        let page = Arc::new(StartPage::with_settings(settings, store.clone()));
        let source = Arc::new(BackgroundSource::new(BackgroundConfig::default()).unwrap());
        (BackgroundWatcher::new(page, source), store)
    }

    #[tokio::test]
    async fn test_fresh_background_is_kept() {
        let (watcher, store) = watcher(1_000_000);
        assert!(watcher.refresh_if_stale(1_000_000 + 60_000).await.is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_gradient_does_not_count_as_refresh() {
        let (watcher, store) = watcher(0);
        let background = watcher.refresh_if_stale(31 * 60 * 1000).await.unwrap();
        assert!(!background.is_photo());
        assert_eq!(watcher.page.snapshot().await.last_background_update, 0);
        assert_eq!(store.write_count(), 0);
    }
}
