use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::sync::Arc;
use std::str::FromStr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use startpage::background::BackgroundSource;
use startpage::catalog::{self, Direction};
use startpage::config::StartPageConfig;
use startpage::preview::{HttpCheckSurface, PreviewSession, PreviewState};
use startpage::progress;
use startpage::resolver::{ImageRequest, ImageResolver};
use startpage::scheduler::{self, BackgroundWatcher};
use startpage::store::JsonFileStore;
use startpage::{SortMethod, StartPage, WebsiteForm};

#[derive(Parser)]
#[command(name = "startpage")]
#[command(about = "Browser start page: bookmarks, screenshots and backgrounds", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (overrides STARTPAGE_SETTINGS)
    #[arg(short, long, global = true)]
    settings: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show all categories in display order, sorted
    List {
        /// Only show this category
        #[arg(short, long)]
        category: Option<String>,
    },

    /// Add a website to a category
    Add {
        #[command(flatten)]
        site: SiteArgs,

        /// Category key, or "custom" together with --custom-name
        #[arg(short, long, default_value = "custom")]
        category: String,
    },

    /// Edit the website with the given URL
    Edit {
        /// Current URL of the website
        original: String,

        /// New URL (defaults to the current one)
        #[arg(long)]
        url: Option<String>,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        desc: Option<String>,

        /// Move to this category
        #[arg(short, long)]
        category: Option<String>,

        /// Custom category name when --category is "custom"
        #[arg(long)]
        custom_name: Option<String>,

        /// Preview the page and capture a fresh screenshot
        #[arg(long)]
        preview: bool,
    },

    /// Remove the website with the given URL
    Remove { url: String },

    /// Move a category up or down in the display order
    Move {
        category: String,

        #[arg(value_enum)]
        direction: MoveDirection,
    },

    /// Change the sort method, globally or for one category
    Sort {
        /// default, alphabetical, lastUsed or mostUsed
        #[arg(value_parser = SortMethod::from_str)]
        method: SortMethod,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// Open a website: records the visit and prints the URL
    Open { url: String },

    /// Show usage statistics
    Stats,

    /// Resolve a screenshot for a URL without saving it
    Resolve {
        url: String,

        #[arg(short, long, default_value = "")]
        name: String,
    },

    /// Load screenshots for all saved websites that have none
    ResolveMissing,

    /// Load a background for the current search term
    Background,

    /// Change the background search term
    SearchTerm { term: String },

    /// Keep the background fresh until Ctrl+C
    Watch,

    /// Reset all settings to defaults
    Reset,
}

#[derive(Args)]
struct SiteArgs {
    /// Website URL (https:// and www. are added when missing)
    #[arg(short, long)]
    url: String,

    /// Display name
    #[arg(short, long)]
    name: String,

    #[arg(short, long, default_value = "")]
    desc: String,

    /// Custom category name when --category is "custom"
    #[arg(long)]
    custom_name: Option<String>,

    /// Use this image instead of resolving one
    #[arg(long)]
    screenshot: Option<String>,

    /// Preview the page and capture a screenshot before saving
    #[arg(long)]
    preview: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum MoveDirection {
    Up,
    Down,
}

impl From<MoveDirection> for Direction {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Up => Direction::Up,
            MoveDirection::Down => Direction::Down,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so command output on stdout stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = StartPageConfig::from_env();
    if let Some(path) = cli.settings {
        config.settings_path = path;
    }

    let store = Arc::new(JsonFileStore::new(config.settings_path.clone()));
    let page = Arc::new(StartPage::load(store).await);

    match cli.command {
        Commands::List { category } => {
            let views = page.view().await;
            for view in views
                .iter()
                .filter(|v| category.as_deref().map_or(true, |c| c == v.key))
            {
                println!("\n📁 {} [{}] ({})", view.title, view.key, view.sort.label());
                for bookmark in &view.bookmarks {
                    println!("   {} - {}", bookmark.name, bookmark.url);
                    if !bookmark.desc.is_empty() {
                        println!("      {}", bookmark.desc);
                    }
                }
            }
        }

        Commands::Add { site, category } => {
            let screenshot = match site.screenshot {
                Some(image) => Some(image),
                None if site.preview => preview_capture(&config, &site.url, &site.name).await?,
                None => None,
            };
            let form = WebsiteForm {
                url: site.url,
                name: site.name,
                desc: site.desc,
                category,
                custom_category: site.custom_name,
                screenshot,
                editing: None,
            };
            let (category, bookmark) = page.save_website(form).await?;
            println!("✅ Added {} ({}) to {}", bookmark.name, bookmark.url, category);
        }

        Commands::Edit {
            original,
            url,
            name,
            desc,
            category,
            custom_name,
            preview,
        } => {
            let (current_category, current) = match page.find(&original).await {
                Some(found) => found,
                None => bail!("No website with URL {}", original),
            };
            let url = url.unwrap_or_else(|| current.url.clone());
            let name = name.unwrap_or_else(|| current.name.clone());
            let screenshot = if preview {
                preview_capture(&config, &url, &name).await?
            } else if url == current.url {
                current.screenshot.clone()
            } else {
                None
            };
            let form = WebsiteForm {
                url,
                name,
                desc: desc.unwrap_or(current.desc),
                category: category.unwrap_or(current_category),
                custom_category: custom_name,
                screenshot,
                editing: Some(original),
            };
            let (category, bookmark) = page.save_website(form).await?;
            println!("✅ Updated {} ({}) in {}", bookmark.name, bookmark.url, category);
        }

        Commands::Remove { url } => match page.remove_website(&url).await {
            Some((category, bookmark)) => {
                println!("🗑️  Removed {} from {}", bookmark.name, category)
            }
            None => warn!("⚠️  No saved website with URL {}", url),
        },

        Commands::Move {
            category,
            direction,
        } => {
            if page.move_category(&category, direction.into()).await {
                println!("✅ Moved {}", category);
            } else {
                println!("Category {} cannot move further", category);
            }
        }

        Commands::Sort { method, category } => {
            page.change_sort(category.as_deref(), method).await;
            match category {
                Some(category) => println!("✅ {} sorted by {}", category, method.label()),
                None => println!("✅ Default sort set to {}", method.label()),
            }
        }

        Commands::Open { url } => {
            let entry = page.track_usage(&url).await;
            let settings = page.snapshot().await;
            match catalog::category_of(&settings.websites, &url) {
                Some(category) => info!("🔗 Opening {} from {}", url, category),
                None => info!("🔗 Opening {}", url),
            }
            println!("{}", url);
            info!("Visited {} times", entry.use_count);
        }

        Commands::Stats => {
            let settings = page.snapshot().await;
            let mut stats: Vec<_> = settings.website_stats.iter().collect();
            stats.sort_by(|a, b| b.1.use_count.cmp(&a.1.use_count).then(a.0.cmp(b.0)));
            println!("📊 Usage statistics ({} websites)", stats.len());
            for (url, entry) in stats {
                let last = chrono::DateTime::from_timestamp_millis(entry.last_used)
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "never".to_string());
                println!("   {:>5}  {}  {}", entry.use_count, last, url);
            }
        }

        Commands::Resolve { url, name } => {
            let resolver = ImageResolver::new(&config.resolver)?;
            let spinner = progress::create_spinner(&format!("Resolving {}", url));
            let resolved = resolver
                .resolve_with_source(&ImageRequest::new(url, name))
                .await;
            progress::finish_with_success(&spinner, &format!("via {}", resolved.source));
            println!("{}", resolved.value);
        }

        Commands::ResolveMissing => {
            let resolver = ImageResolver::new(&config.resolver)?;
            let pb = progress::create_screenshot_progress_bar(0, "Loading screenshots");
            let updated = page
                .resolve_missing(&resolver, |done, total, url| {
                    pb.set_length(total as u64);
                    progress::report_step(&pb, done, url);
                })
                .await;
            progress::finish_with_success(&pb, &format!("{} screenshots loaded", updated));
        }

        Commands::Background => {
            let source = Arc::new(BackgroundSource::new(config.background.clone())?);
            let watcher = BackgroundWatcher::new(page.clone(), source);
            let background = watcher.refresh().await;
            println!("{}", background.css());
        }

        Commands::SearchTerm { term } => {
            page.set_search_term(&term).await;
            println!("✅ Search term set to {:?}", term.trim());
        }

        Commands::Watch => {
            let source = Arc::new(BackgroundSource::new(config.background.clone())?);
            scheduler::start_watcher(BackgroundWatcher::new(page.clone(), source)).await?;
        }

        Commands::Reset => {
            page.reset().await;
            println!("✅ Settings reset to defaults");
        }
    }

    Ok(())
}

/// Previews `url` and captures an image for it. A page that refuses to be
/// embedded still gets an image from the screenshot services.
async fn preview_capture(config: &StartPageConfig, url: &str, name: &str) -> Result<Option<String>> {
    let target = startpage::url_format::normalize_user_url(url)
        .with_context(|| format!("Cannot preview {}", url))?;
    let surface = Arc::new(HttpCheckSurface::new(config.preview_timeout)?);
    let resolver = Arc::new(ImageResolver::new(&config.resolver)?);
    let session = PreviewSession::new(surface, resolver, config.preview_timeout);

    let spinner = progress::create_spinner(&format!("Previewing {}", target));
    match session.load(&target).await {
        Some(PreviewState::Loaded { .. }) => info!("✅ Preview loaded"),
        Some(PreviewState::Failed { reason, .. }) => {
            warn!("⚠️  Preview unavailable ({:?}), using screenshot services", reason)
        }
        _ => {}
    }

    let image = session.capture(name).await;
    match &image {
        Some(_) => progress::finish_with_success(&spinner, "Screenshot captured"),
        None => progress::finish_with_error(&spinner, "No screenshot"),
    }
    Ok(image)
}
