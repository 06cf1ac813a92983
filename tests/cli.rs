use axum::routing::get;
use axum::Router;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tokio::process::Command;

const KJV: &str = r#"{
    "Genesis": {"1": {"1": "In the beginning God created the heaven and the earth.",
                      "3": "And God said, Let there be light: and there was light."}},
    "Song of Solomon": {"2": {"1": "I am the rose of Sharon, and the lily of the valleys."}}
}"#;

const VOLUSPA: &str = "Hearing I ask from the holy races\n\
From Heimdall's sons, both high and low\n\
An ash I know, Yggdrasil its name\n\
With water white is the great tree wet\n\
Thence come the dews that fall in the dales";

fn corpus_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("corpus");
    path
}

async fn spawn_server() -> String {
    let app = Router::new()
        .route("/bible/kjv/main/books/kjv.json", get(|| async { KJV }))
        .route("/norse/eddas/main/voluspa.txt", get(|| async { VOLUSPA }));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn setup_test_env(base_url: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let config_dir = tmp.path().join("config");
    fs::create_dir_all(&config_dir).unwrap();

    let config_content = format!(
        r#"{{
    "repositories": [
        {{
            "id": "kjv", "name": "King James Bible", "category": "scripture",
            "owner": "bible", "repo": "kjv", "branch": "main", "path": "books",
            "files": [{{"name": "kjv.json", "display": "KJV", "language": "en", "format": "json"}}]
        }},
        {{
            "id": "eddas", "name": "Poetic Edda",
            "owner": "norse", "repo": "eddas", "branch": "main",
            "files": [
                {{"name": "voluspa.txt", "display": "Völuspá", "language": "en", "format": "txt"}},
                {{"name": "missing.txt", "format": "txt"}}
            ]
        }}
    ],
    "cache_duration_minutes": 60,
    "max_concurrent_fetches": 2,
    "api_settings": {{"timeout_seconds": 5, "max_retries": 1, "raw_base_url": "{}"}},
    "cache": {{"dir": "../cache"}}
}}"#,
        base_url
    );

    let config_path = config_dir.join("corpora.json");
    fs::write(&config_path, config_content).unwrap();
    (tmp, config_path)
}

async fn run_corpus(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = corpus_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path)
        .arg("--progress")
        .arg("off")
        .args(args)
        .output()
        .await
        .unwrap_or_else(|e| panic!("Failed to run corpus binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    (stdout, stderr, output.status.success())
}

#[tokio::test]
async fn test_repos_lists_configuration() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (stdout, _, ok) = run_corpus(&config, &["repos"]).await;
    assert!(ok);
    assert!(stdout.contains("kjv  King James Bible  [scripture]"));
    assert!(stdout.contains("bible/kjv@main"));
    assert!(stdout.contains("voluspa.txt"));
    assert!(stdout.contains("Völuspá"));
}

#[tokio::test]
async fn test_search_structured_document() {
    let base = spawn_server().await;
    let (_tmp, config) = setup_test_env(&base);

    let (stdout, stderr, ok) = run_corpus(&config, &["search", "light", "--repo", "kjv"]).await;
    assert!(ok, "stderr: {}", stderr);
    assert!(stdout.contains("Genesis 1:3"));
    assert!(stdout.contains("kjv.json#Genesis.1.3"));
    assert!(stdout.contains("1 result(s)."));
}

#[tokio::test]
async fn test_search_json_output() {
    let base = spawn_server().await;
    let (_tmp, config) = setup_test_env(&base);

    let (stdout, stderr, ok) = run_corpus(&config, &["search", "rose", "--json"]).await;
    assert!(ok, "stderr: {}", stderr);
    let results: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let results = results.as_array().unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0]["book"], "Song of Solomon");
    assert_eq!(results[0]["matched_term"], "rose");
    assert!(results[0]["url"]
        .as_str()
        .unwrap()
        .ends_with("#Song%20of%20Solomon.2.1"));
}

#[tokio::test]
async fn test_failed_file_is_reported_not_fatal() {
    let base = spawn_server().await;
    let (_tmp, config) = setup_test_env(&base);

    let (stdout, stderr, ok) =
        run_corpus(&config, &["search", "Yggdrasil", "--repo", "eddas"]).await;
    assert!(ok, "stderr: {}", stderr);
    assert!(stderr.contains("Failed to load 1 file(s)"));
    assert!(stderr.contains("missing.txt"));
    assert!(stdout.contains("[Poetic Edda] Völuspá"));
    assert!(stdout.contains("Yggdrasil"));
    assert!(stdout.contains("1 result(s)."));
}

#[tokio::test]
async fn test_search_uses_cache_and_clear_is_idempotent() {
    let base = spawn_server().await;
    let (_tmp, config) = setup_test_env(&base);

    let (_, _, ok) = run_corpus(&config, &["search", "beginning", "--repo", "kjv"]).await;
    assert!(ok);

    let (stdout, _, ok) = run_corpus(
        &config,
        &["search", "beginning", "--repo", "kjv", "--stats"],
    )
    .await;
    assert!(ok);
    assert!(stdout.contains("1 hit(s), 0 miss(es)"));

    let (stdout, _, ok) = run_corpus(&config, &["cache", "info"]).await;
    assert!(ok);
    assert!(stdout.contains("Entries:  1"));

    let (stdout, _, ok) = run_corpus(&config, &["cache", "clear"]).await;
    assert!(ok);
    assert!(stdout.contains("Removed 1 cached entry."));

    let (stdout, _, ok) = run_corpus(&config, &["cache", "clear"]).await;
    assert!(ok);
    assert!(stdout.contains("Removed 0 cached entries."));
}

#[tokio::test]
async fn test_unknown_repository_fails() {
    let (_tmp, config) = setup_test_env("http://127.0.0.1:9");
    let (_, stderr, ok) = run_corpus(&config, &["search", "light", "--repo", "nope"]).await;
    assert!(!ok);
    assert!(stderr.contains("no repositories selected"));
}

#[tokio::test]
async fn test_empty_query_fails() {
    let base = spawn_server().await;
    let (_tmp, config) = setup_test_env(&base);
    let (_, stderr, ok) = run_corpus(&config, &["search", "  ", "--repo", "kjv"]).await;
    assert!(!ok);
    assert!(stderr.contains("search query is empty"));
}

#[tokio::test]
async fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, ok) = run_corpus(&tmp.path().join("nope.json"), &["repos"]).await;
    assert!(!ok);
    assert!(stderr.contains("configuration error"));
}
