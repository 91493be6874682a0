use chrono::Utc;
use tracing::debug;

use crate::model::{UsageEntry, UsageStats};

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

/// Records one navigation to `url` at time `now` (epoch millis).
///
/// The entry is created on first use. `last_used` never moves backwards even
/// if the wall clock does.
pub fn track(stats: &mut UsageStats, url: &str, now: i64) -> UsageEntry {
    let entry = stats.entry(url.to_string()).or_default();
    entry.last_used = entry.last_used.max(now);
    entry.use_count += 1;
    debug!("Tracked usage for {}: {} times", url, entry.use_count);
    *entry
}
