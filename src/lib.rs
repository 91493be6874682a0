//! Start page core: bookmark catalog, sorting, usage tracking, screenshot
//! resolution and the live preview session.

pub mod background;
pub mod catalog;
pub mod config;
pub mod controller;
pub mod defaults;
pub mod error;
pub mod fallback;
pub mod model;
pub mod preview;
pub mod progress;
pub mod resolver;
pub mod scheduler;
pub mod sorting;
pub mod store;
pub mod url_format;
pub mod usage;

pub use controller::{Action, Outcome, StartPage, WebsiteForm};
pub use error::{Result, StartPageError};
pub use model::{Bookmark, CategoryMap, Settings, SortMethod, UsageEntry, UsageStats};
