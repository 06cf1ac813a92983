//! Fetch-with-retry for raw corpus files.
//!
//! [`HttpFetcher`] wraps a single GET with a per-attempt timeout, optional
//! bearer-token auth, and exponential backoff across a bounded number of
//! attempts.
//!
//! # Retry Strategy
//!
//! - Network errors, timeouts, and non-2xx responses all count as a failed attempt.
//! - Backoff between attempts: `base * 2^attempt` (1s, 2s, 4s, ... with the default base).
//! - No wait after the final attempt.
//! - After `max_retries` attempts the fetch fails with [`FetchError::Exhausted`];
//!   no outer layer retries again.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use std::time::Duration;

use crate::config::Config;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("failed to fetch {url} after {attempts} attempt(s): {last_error}")]
    Exhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Source of raw corpus text.
///
/// The batch loader only talks to this trait, so tests and alternative
/// transports can stand in for HTTP.
#[async_trait]
pub trait TextFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Total attempts; `0` is treated as `1`.
    pub max_retries: u32,
    /// Per-attempt timeout. On expiry the request is dropped and the attempt fails.
    pub timeout: Duration,
    pub auth_token: Option<String>,
    /// First backoff delay; doubles after each failed attempt.
    pub backoff_base: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            timeout: Duration::from_secs(30),
            auth_token: None,
            backoff_base: Duration::from_millis(1000),
        }
    }
}

impl FetchOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_retries: config.api_settings.max_retries,
            timeout: Duration::from_secs(config.api_settings.timeout_seconds),
            auth_token: config.auth_token(),
            ..Default::default()
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * 2u32.pow(attempt.min(16))
    }
}

/// HTTP fetcher over reqwest (rustls).
pub struct HttpFetcher {
    client: reqwest::Client,
    options: FetchOptions,
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("corpus-search/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self { client, options })
    }

    async fn attempt(&self, url: &str) -> Result<String, String> {
        let mut request = self.client.get(url);
        if let Some(token) = &self.options.auth_token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let send = async {
            let response = request.send().await.map_err(|e| e.to_string())?;
            let status = response.status();
            if !status.is_success() {
                return Err(format!("HTTP {}", status));
            }
            response.text().await.map_err(|e| e.to_string())
        };

        match tokio::time::timeout(self.options.timeout, send).await {
            Ok(result) => result,
            Err(_) => Err(format!(
                "timed out after {}s",
                self.options.timeout.as_secs_f64()
            )),
        }
    }
}

#[async_trait]
impl TextFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let attempts = self.options.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match self.attempt(url).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    tracing::debug!(url, attempt = attempt + 1, error = %e, "fetch attempt failed");
                    last_error = e;
                }
            }

            if attempt + 1 < attempts {
                tokio::time::sleep(self.options.backoff(attempt)).await;
            }
        }

        Err(FetchError::Exhausted {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_from_base() {
        let opts = FetchOptions::default();
        assert_eq!(opts.backoff(0), Duration::from_millis(1000));
        assert_eq!(opts.backoff(1), Duration::from_millis(2000));
        assert_eq!(opts.backoff(2), Duration::from_millis(4000));
    }

    #[test]
    fn options_follow_config() {
        let mut cfg = Config::minimal();
        cfg.api_settings.timeout_seconds = 7;
        cfg.api_settings.max_retries = 5;
        cfg.api_settings.github_token = Some("tok".to_string());

        let opts = FetchOptions::from_config(&cfg);
        assert_eq!(opts.timeout, Duration::from_secs(7));
        assert_eq!(opts.max_retries, 5);
        assert_eq!(opts.auth_token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn unreachable_host_exhausts_attempts() {
        let fetcher = HttpFetcher::new(FetchOptions {
            max_retries: 2,
            timeout: Duration::from_secs(2),
            auth_token: None,
            backoff_base: Duration::from_millis(5),
        })
        .unwrap();

        // Port 9 on localhost is reserved (discard) and normally closed.
        let err = fetcher
            .fetch_text("http://127.0.0.1:9/corpus.json")
            .await
            .unwrap_err();
        match err {
            FetchError::Exhausted { url, attempts, .. } => {
                assert_eq!(url, "http://127.0.0.1:9/corpus.json");
                assert_eq!(attempts, 2);
            }
            other => panic!("unexpected error: {}", other),
        }
    }
}
