//! Batch-load progress reporting.
//!
//! The batch loader reports through a [`LoadObserver`]: progress when each
//! file's task starts, a failure per file that could not be loaded, and one
//! completion event after every window has settled. Progress is emitted on
//! **stderr** so stdout remains parseable for scripts.
//!
//! Progress is reported at task start, so percentages are approximate while
//! a window is in flight. Only [`LoadObserver::on_complete`] is a definitive
//! completion signal.

use parking_lot::Mutex;
use serde::Serialize;
use std::io::Write;

/// Progress for one file task.
#[derive(Clone, Debug)]
pub struct LoadProgress {
    /// Running count of started tasks (1-based).
    pub n: usize,
    pub total: usize,
    pub repo_name: String,
    pub file_display: String,
}

/// A file that could not be loaded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub repo_name: String,
    pub file_name: String,
    pub message: String,
}

/// Receives batch-load events. Every method defaults to a no-op.
pub trait LoadObserver: Send + Sync {
    fn on_progress(&self, _progress: &LoadProgress) {}

    fn on_error(&self, _failure: &LoadFailure) {}

    /// Called exactly once per load, after all windows settle.
    fn on_complete(&self, _loaded: usize, _keys: &[String]) {}
}

/// Human-friendly progress on stderr: "load  3 / 12  King James Bible: KJV".
pub struct StderrProgress;

impl LoadObserver for StderrProgress {
    fn on_progress(&self, p: &LoadProgress) {
        let line = format!(
            "load  {} / {}  {}: {}\n",
            format_number(p.n as u64),
            format_number(p.total as u64),
            p.repo_name,
            p.file_display
        );
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }

    fn on_error(&self, f: &LoadFailure) {
        let line = format!("load  failed  {}: {}  ({})\n", f.repo_name, f.file_name, f.message);
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
    }

    fn on_complete(&self, loaded: usize, _keys: &[String]) {
        let line = format!("load  done  {} text(s) loaded\n", format_number(loaded as u64));
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// Machine-readable progress: one JSON object per line on stderr.
pub struct JsonProgress;

impl JsonProgress {
    fn emit(obj: serde_json::Value) {
        if let Ok(line) = serde_json::to_string(&obj) {
            let _ = writeln!(std::io::stderr().lock(), "{}", line);
        }
    }
}

impl LoadObserver for JsonProgress {
    fn on_progress(&self, p: &LoadProgress) {
        Self::emit(serde_json::json!({
            "event": "progress",
            "n": p.n,
            "total": p.total,
            "repo": p.repo_name,
            "file": p.file_display,
        }));
    }

    fn on_error(&self, f: &LoadFailure) {
        Self::emit(serde_json::json!({
            "event": "error",
            "repo": f.repo_name,
            "file": f.file_name,
            "message": f.message,
        }));
    }

    fn on_complete(&self, loaded: usize, keys: &[String]) {
        Self::emit(serde_json::json!({
            "event": "complete",
            "loaded": loaded,
            "keys": keys,
        }));
    }
}

/// No-op observer when progress is disabled.
pub struct NoProgress;

impl LoadObserver for NoProgress {}

/// Forwards to an inner observer and keeps every failure for later display.
pub struct FailureLog<'a> {
    inner: &'a dyn LoadObserver,
    failures: Mutex<Vec<LoadFailure>>,
}

impl<'a> FailureLog<'a> {
    pub fn new(inner: &'a dyn LoadObserver) -> Self {
        Self {
            inner,
            failures: Mutex::new(Vec::new()),
        }
    }

    pub fn into_failures(self) -> Vec<LoadFailure> {
        self.failures.into_inner()
    }
}

impl LoadObserver for FailureLog<'_> {
    fn on_progress(&self, progress: &LoadProgress) {
        self.inner.on_progress(progress);
    }

    fn on_error(&self, failure: &LoadFailure) {
        self.failures.lock().push(failure.clone());
        self.inner.on_error(failure);
    }

    fn on_complete(&self, loaded: usize, keys: &[String]) {
        self.inner.on_complete(loaded, keys);
    }
}

pub(crate) fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::with_capacity(s.len() + (s.len() - 1) / 3);
    let chars: Vec<char> = s.chars().rev().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && i % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }
    result.chars().rev().collect()
}

/// Progress mode for the CLI: off, human (stderr), or JSON (stderr).
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressMode {
    Off,
    Human,
    Json,
}

impl ProgressMode {
    /// Default: human progress when stderr is a TTY, otherwise off.
    pub fn default_for_tty() -> Self {
        if atty::is(atty::Stream::Stderr) {
            ProgressMode::Human
        } else {
            ProgressMode::Off
        }
    }

    pub fn observer(&self) -> Box<dyn LoadObserver> {
        match self {
            ProgressMode::Off => Box::new(NoProgress),
            ProgressMode::Human => Box::new(StderrProgress),
            ProgressMode::Json => Box::new(JsonProgress),
        }
    }
}
