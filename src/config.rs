use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub repositories: Vec<RepositoryDescriptor>,
    #[serde(default = "default_cache_duration_minutes")]
    pub cache_duration_minutes: u64,
    #[serde(default = "default_max_concurrent_fetches")]
    pub max_concurrent_fetches: usize,
    #[serde(default)]
    pub api_settings: ApiSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

/// Where a repository's raw corpus files live and which files belong to it.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RepositoryDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub owner: String,
    pub repo: String,
    pub branch: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub files: Vec<FileDescriptor>,
    #[serde(default)]
    pub category: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FileDescriptor {
    pub name: String,
    #[serde(default)]
    pub display: String,
    #[serde(default)]
    pub language: String,
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub size_mb: Option<f64>,
    /// Custom parser type; overrides `format` during parser lookup.
    #[serde(default)]
    pub parser: Option<String>,
}

fn default_format() -> String {
    "json".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ApiSettings {
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default = "default_raw_base_url")]
    pub raw_base_url: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            max_retries: default_max_retries(),
            github_token: None,
            raw_base_url: default_raw_base_url(),
        }
    }
}

fn default_timeout_seconds() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_raw_base_url() -> String {
    "https://raw.githubusercontent.com".to_string()
}
fn default_cache_duration_minutes() -> u64 {
    60
}
fn default_max_concurrent_fetches() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct CacheSettings {
    /// Persistent tier directory; relative to the config file when relative.
    #[serde(default)]
    pub dir: Option<PathBuf>,
    #[serde(default = "default_persistent_quota_mb")]
    pub persistent_quota_mb: u64,
    #[serde(default = "default_session_quota_mb")]
    pub session_quota_mb: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            dir: None,
            persistent_quota_mb: default_persistent_quota_mb(),
            session_quota_mb: default_session_quota_mb(),
        }
    }
}

fn default_persistent_quota_mb() -> u64 {
    50
}
fn default_session_quota_mb() -> u64 {
    20
}

impl RepositoryDescriptor {
    /// Display name, falling back to the id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }

    /// Raw file URL: `<base>/<owner>/<repo>/<branch>/<path/>?<file>`.
    ///
    /// A pure function of the descriptor, so cache hits can be checked
    /// against the URL stored alongside cached content.
    pub fn file_url(&self, base_url: &str, file_name: &str) -> String {
        let base = base_url.trim_end_matches('/');
        let path = self.path.trim_matches('/');
        if path.is_empty() {
            format!(
                "{}/{}/{}/{}/{}",
                base, self.owner, self.repo, self.branch, file_name
            )
        } else {
            format!(
                "{}/{}/{}/{}/{}/{}",
                base, self.owner, self.repo, self.branch, path, file_name
            )
        }
    }
}

impl FileDescriptor {
    /// Parser type used for dispatch: explicit `parser`, else `format`.
    pub fn parser_type(&self) -> &str {
        self.parser.as_deref().unwrap_or(&self.format)
    }

    pub fn display_name(&self) -> &str {
        if self.display.is_empty() {
            &self.name
        } else {
            &self.display
        }
    }
}

impl Config {
    /// A config with no repositories, for commands that only touch the cache.
    pub fn minimal() -> Self {
        Self {
            repositories: Vec::new(),
            cache_duration_minutes: default_cache_duration_minutes(),
            max_concurrent_fetches: default_max_concurrent_fetches(),
            api_settings: ApiSettings::default(),
            cache: CacheSettings::default(),
        }
    }

    pub fn find_repository(&self, id: &str) -> Option<&RepositoryDescriptor> {
        self.repositories.iter().find(|r| r.id == id)
    }

    /// Bearer token from config, else `$GITHUB_TOKEN`.
    pub fn auth_token(&self) -> Option<String> {
        self.api_settings
            .github_token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| std::env::var("GITHUB_TOKEN").ok().filter(|t| !t.is_empty()))
    }

    pub fn cache_ttl_ms(&self) -> i64 {
        (self.cache_duration_minutes as i64).saturating_mul(60_000)
    }

    fn validate(&self) -> Result<()> {
        if self.cache_duration_minutes == 0 {
            bail!("cache_duration_minutes must be > 0");
        }
        if self.api_settings.timeout_seconds == 0 {
            bail!("api_settings.timeout_seconds must be > 0");
        }

        let mut seen = HashSet::new();
        for repo in &self.repositories {
            for (field, value) in [
                ("id", &repo.id),
                ("owner", &repo.owner),
                ("repo", &repo.repo),
                ("branch", &repo.branch),
            ] {
                if value.trim().is_empty() {
                    bail!("repository '{}' has an empty {}", repo.id, field);
                }
            }
            if !seen.insert(repo.id.as_str()) {
                bail!("duplicate repository id: '{}'", repo.id);
            }
        }
        Ok(())
    }
}

/// Parse a config document. `.json` files are read as JSON, anything else as TOML.
pub fn parse_config(content: &str, path: &Path) -> Result<Config> {
    let is_json = path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let mut config: Config = if is_json {
        serde_json::from_str(content).with_context(|| "Failed to parse config file as JSON")?
    } else {
        toml::from_str(content).with_context(|| "Failed to parse config file as TOML")?
    };

    config.validate()?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    config.cache.dir = Some(match config.cache.dir.take() {
        Some(dir) if dir.is_relative() => base.join(dir),
        Some(dir) => dir,
        None => base.join(".corpus-cache"),
    });

    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content, path)
}
