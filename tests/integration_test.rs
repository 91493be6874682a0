// Integration tests for startpage
// Run with: cargo test --test integration_test

use std::path::Path;
use std::process::Command;
use std::sync::Arc;

use startpage::catalog::Direction;
use startpage::store::{JsonFileStore, SettingsStore};
use startpage::{Action, Outcome, Settings, SortMethod, StartPage, WebsiteForm};

fn run_cli(settings: &Path, args: &[&str]) -> (bool, String, String) {
    run_cli_logged(settings, "warn", args)
}

fn run_cli_logged(settings: &Path, log_level: &str, args: &[&str]) -> (bool, String, String) {
    let output = Command::new(env!("CARGO_BIN_EXE_startpage"))
        .arg("--settings")
        .arg(settings)
        .args(args)
        .env("RUST_LOG", log_level)
        .env_remove("UNSPLASH_ACCESS_KEY")
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (output.status.success(), stdout, stderr)
}

fn read_settings(path: &Path) -> Settings {
    let json = std::fs::read_to_string(path).expect("settings file");
    serde_json::from_str(&json).expect("valid settings json")
}

#[test]
fn test_list_shows_builtin_categories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let (success, stdout, _) = run_cli(&path, &["list"]);
    assert!(success);
    assert!(stdout.contains("Social"));
    assert!(stdout.contains("https://gmail.com"));
    // Listing never writes
    assert!(!path.exists());
}

#[test]
fn test_add_open_remove_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let (success, stdout, stderr) = run_cli(
        &path,
        &["add", "--url", "figma.com", "--name", "Figma", "--custom-name", "design"],
    );
    assert!(success, "add failed: {}", stderr);
    assert!(stdout.contains("https://www.figma.com/"));

    let settings = read_settings(&path);
    let design = settings.websites.get("design").unwrap();
    assert_eq!(design[0].desc, "No description");
    assert_eq!(settings.custom_categories, vec!["design".to_string()]);

    let (success, stdout, _) = run_cli(&path, &["open", "https://www.figma.com/"]);
    assert!(success);
    assert_eq!(stdout.trim(), "https://www.figma.com/");
    assert_eq!(
        read_settings(&path).website_stats["https://www.figma.com/"].use_count,
        1
    );

    let (success, _, _) = run_cli(&path, &["remove", "https://www.figma.com/"]);
    assert!(success);
    let settings = read_settings(&path);
    assert!(!settings.websites.contains_key("design"));
    assert!(settings.custom_categories.is_empty());
}

#[test]
fn test_open_prints_only_the_url() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let (success, stdout, stderr) = run_cli_logged(&path, "debug", &["open", "https://gmail.com"]);
    assert!(success);
    assert_eq!(stdout, "https://gmail.com\n");
    assert!(stderr.contains("Opening https://gmail.com"));
}

#[test]
fn test_edit_builtin_website() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let (success, _, stderr) = run_cli(
        &path,
        &["edit", "https://twitter.com", "--url", "x.com", "--name", "X"],
    );
    assert!(success, "edit failed: {}", stderr);

    let settings = read_settings(&path);
    let social = settings.websites.get("social").unwrap();
    assert_eq!(social.len(), 5);
    assert!(social.iter().any(|b| b.url == "https://www.x.com/" && b.name == "X"));
    assert!(social.iter().any(|b| b.url == "https://discord.com"));
}

#[test]
fn test_invalid_url_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    let (success, _, _) = run_cli(&path, &["add", "--url", "not a url", "--name", "X"]);
    assert!(!success);
    assert!(!path.exists());
}

#[test]
fn test_sort_and_move_persist() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");

    assert!(run_cli(&path, &["sort", "alphabetical", "--category", "social"]).0);
    assert!(run_cli(&path, &["sort", "most-used"]).0);
    assert!(run_cli(&path, &["move", "entertainment", "up"]).0);

    let settings = read_settings(&path);
    assert_eq!(settings.category_sorts["social"], SortMethod::Alphabetical);
    assert_eq!(settings.default_sort, SortMethod::MostUsed);
    assert_eq!(
        settings.category_order,
        vec!["social", "entertainment", "productivity"]
    );

    let (success, _, _) = run_cli(&path, &["sort", "random"]);
    assert!(!success);
}

#[tokio::test]
async fn test_controller_survives_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("settings.json");

    {
        let store = Arc::new(JsonFileStore::new(&path));
        let page = StartPage::load(store).await;
        let form = WebsiteForm {
            url: "https://jira.example.com".to_string(),
            name: "Jira".to_string(),
            category: "work".to_string(),
            ..WebsiteForm::default()
        };
        page.dispatch(Action::SaveWebsite(form)).await.unwrap();
        page.dispatch(Action::TrackUsage {
            url: "https://jira.example.com".to_string(),
        })
        .await
        .unwrap();
        let moved = page
            .dispatch(Action::MoveCategory {
                key: "work".to_string(),
                direction: Direction::Up,
            })
            .await
            .unwrap();
        assert_eq!(moved, Outcome::Moved(true));
    }

    let store = Arc::new(JsonFileStore::new(&path));
    let persisted = store.get().await.unwrap().unwrap();
    assert_eq!(
        persisted.category_order,
        vec!["social", "productivity", "work", "entertainment"]
    );

    let page = StartPage::load(store).await;
    let views = page.view().await;
    let keys: Vec<_> = views.iter().map(|v| v.key.as_str()).collect();
    assert_eq!(keys, vec!["social", "productivity", "work", "entertainment"]);
    assert_eq!(
        page.snapshot().await.website_stats["https://jira.example.com"].use_count,
        1
    );
}

#[tokio::test]
async fn test_corrupt_settings_fall_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(&path, "{ not json").unwrap();

    let store = Arc::new(JsonFileStore::new(&path));
    let page = StartPage::load(store.clone()).await;
    assert_eq!(page.snapshot().await, Settings::default());

    // The unreadable file is kept aside, not overwritten
    page.track_usage("https://gmail.com").await;
    assert_eq!(std::fs::read_to_string(store.backup_path()).unwrap(), "{ not json");
    assert_eq!(read_settings(&path).website_stats["https://gmail.com"].use_count, 1);
}

#[test]
fn test_partial_settings_file_keeps_user_data() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("settings.json");
    std::fs::write(
        &path,
        r#"{"websites":{"work":[{"name":"Jira","desc":"Tickets","url":"https://jira.example.com"}]},
            "websiteStats":{"https://a.com":{"useCount":5}}}"#,
    )
    .unwrap();

    let (success, _, _) = run_cli(&path, &["open", "https://jira.example.com"]);
    assert!(success);

    let settings = read_settings(&path);
    assert_eq!(settings.websites.get("work").unwrap()[0].name, "Jira");
    assert_eq!(settings.website_stats["https://a.com"].use_count, 5);
    assert_eq!(settings.website_stats["https://jira.example.com"].use_count, 1);
}
