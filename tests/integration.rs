use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn lb_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("lb");
    path
}

/// Config pointing at a backend that refuses connections, with the local
/// store inside the temp dir.
fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"[backend]
url = "http://127.0.0.1:1"
anon_key = "test-anon-key"
timeout_secs = 2

[local]
path = "{}/local.json"

[search]
debounce_ms = 10
"#,
        root.display()
    );

    let config_path = config_dir.join("linkboard.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_lb(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = lb_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("LINKBOARD_ANON_KEY")
        .stdin(Stdio::null())
        .output()
        .unwrap_or_else(|e| panic!("Failed to run lb binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

const CARD_ID: &str = "00000000-0000-0000-0000-000000000014";

fn write_export(dir: &Path, name: &str, section_id: &str) -> PathBuf {
    let doc = format!(
        r#"{{
  "sections": [
    {{"id": "00000000-0000-0000-0000-000000000001", "name": "Work", "order_index": 0,
      "created_at": "2024-05-01T10:00:00Z"}}
  ],
  "folders": [],
  "cards": [
    {{"id": "{}", "title": "Docs", "url": "https://docs.rs",
      "type": "doc", "tags": ["rust"], "section_id": "{}",
      "created_at": "2024-05-01T10:00:00Z"}}
  ],
  "card_folders": [],
  "exported_at": "2024-05-02T08:30:00Z"
}}"#,
        CARD_ID, section_id
    );
    let path = dir.join(name);
    fs::write(&path, doc).unwrap();
    path
}

#[test]
fn test_fav_toggle_twice() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_lb(&config_path, &["fav", "toggle", CARD_ID]);
    assert!(success, "toggle failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("★ starred"));

    let (stdout, _, success) = run_lb(&config_path, &["fav", "toggle", CARD_ID]);
    assert!(success);
    assert!(stdout.contains("☆ unstarred"));

    let (stdout, _, success) = run_lb(&config_path, &["fav", "list"]);
    assert!(success);
    assert!(stdout.contains("No favorites."));
}

#[test]
fn test_fav_persists_to_local_file() {
    let (tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_lb(&config_path, &["fav", "add", CARD_ID]);
    assert!(success, "fav add failed: {}", stderr);

    let local = fs::read_to_string(tmp.path().join("local.json")).unwrap();
    assert!(local.contains("dashboard-favorites"));
    assert!(local.contains(CARD_ID));
}

#[test]
fn test_recent_list_empty() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_lb(&config_path, &["recent", "list"]);
    assert!(success);
    assert!(stdout.contains("No recently opened cards."));

    let (stdout, _, success) = run_lb(&config_path, &["recent", "clear"]);
    assert!(success);
    assert!(stdout.contains("cleared"));
}

#[test]
fn test_missing_config_errors() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.toml");

    let (_, stderr, success) = run_lb(&missing, &["sections", "list"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"), "stderr: {}", stderr);
}

#[test]
fn test_invalid_backend_url_errors() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("bad.toml");
    fs::write(
        &config_path,
        "[backend]\nurl = \"ftp://example.com\"\nanon_key = \"k\"\n",
    )
    .unwrap();

    let (_, stderr, success) = run_lb(&config_path, &["sections", "list"]);
    assert!(!success);
    assert!(stderr.contains("http or https"), "stderr: {}", stderr);
}

#[test]
fn test_missing_anon_key_errors() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("nokey.toml");
    fs::write(&config_path, "[backend]\nurl = \"https://example.com\"\n").unwrap();

    let (_, stderr, success) = run_lb(&config_path, &["sections", "list"]);
    assert!(!success);
    assert!(stderr.contains("anon_key"), "stderr: {}", stderr);
}

#[test]
fn test_import_preview_prints_counts() {
    let (tmp, config_path) = setup_test_env();
    let file = write_export(
        tmp.path(),
        "backup.json",
        "00000000-0000-0000-0000-000000000001",
    );

    let (stdout, stderr, success) =
        run_lb(&config_path, &["import", file.to_str().unwrap(), "--preview"]);
    assert!(success, "preview failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Sections:  1"));
    assert!(stdout.contains("Cards:     1"));
    assert!(stdout.contains("Links:     0"));
}

#[test]
fn test_import_rejects_dangling_reference_before_backend() {
    let (tmp, config_path) = setup_test_env();
    let file = write_export(
        tmp.path(),
        "broken.json",
        "00000000-0000-0000-0000-0000000000ff",
    );

    let (_, stderr, success) = run_lb(&config_path, &["import", file.to_str().unwrap(), "--yes"]);
    assert!(!success);
    assert!(stderr.contains("invalid import document"), "stderr: {}", stderr);
}

#[test]
fn test_import_requires_confirmation_without_tty() {
    let (tmp, config_path) = setup_test_env();
    let file = write_export(
        tmp.path(),
        "backup.json",
        "00000000-0000-0000-0000-000000000001",
    );

    let (_, stderr, success) = run_lb(&config_path, &["import", file.to_str().unwrap()]);
    assert!(!success);
    assert!(stderr.contains("--yes"), "stderr: {}", stderr);
}

#[test]
fn test_search_short_query_skips_backend() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_lb(&config_path, &["search", "ab"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("Type at least 3 characters"));
}

#[test]
fn test_search_unreachable_backend_returns_empty() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_lb(&config_path, &["search", "rust"]);
    assert!(success, "search failed: {}", stderr);
    assert!(stdout.contains("No results."));
}

#[test]
fn test_sections_list_unreachable_backend_errors() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success) = run_lb(&config_path, &["sections", "list"]);
    assert!(!success);
}

#[test]
fn test_completions_bash() {
    let (_tmp, config_path) = setup_test_env();

    let (stdout, _, success) = run_lb(&config_path, &["completions", "bash"]);
    assert!(success);
    assert!(stdout.contains("lb"));
}

#[test]
fn test_cards_reorder_needs_a_scope() {
    let (_tmp, config_path) = setup_test_env();

    let (_, stderr, success) = run_lb(&config_path, &["cards", "reorder", "0", "1"]);
    assert!(!success);
    assert!(stderr.contains("--section"), "stderr: {}", stderr);

    let (_, stderr, success) = run_lb(
        &config_path,
        &["cards", "reorder", "0", "1", "--unfiled", "--folder", CARD_ID],
    );
    assert!(!success);
    assert!(stderr.contains("--section"), "stderr: {}", stderr);
}
