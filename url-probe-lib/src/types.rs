//! Core data types for URL probing.
//!
//! This module defines the result of a single probe, the engine
//! configuration, the per-run summary and the output format selector.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Token written in place of a status code when a URL produced no response.
pub const NO_RESPONSE_TOKEN: &str = "no-response";

/// Status code attached to results emitted by the redirect hint heuristic.
pub const REDIRECT_HINT_STATUS: u16 = 301;

/// What happened when a URL was probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "code", rename_all = "snake_case")]
pub enum Outcome {
    /// Response headers arrived with this HTTP status code
    Status(u16),

    /// Timeout or transport failure; nothing came back
    NoResponse,
}

impl Outcome {
    /// The status code, if one was received.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Outcome::Status(code) => Some(*code),
            Outcome::NoResponse => None,
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self, Outcome::Status(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Status(code) => write!(f, "{}", code),
            Outcome::NoResponse => write!(f, "{}", NO_RESPONSE_TOKEN),
        }
    }
}

/// Result of probing one URL.
///
/// `Display` renders the `"<url>,<outcome>"` line written to result files.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProbeResult {
    /// The URL exactly as it was queued (already trimmed)
    pub url: String,

    /// Status code or no-response marker
    pub outcome: Outcome,
}

impl ProbeResult {
    pub fn new<U: Into<String>>(url: U, outcome: Outcome) -> Self {
        Self {
            url: url.into(),
            outcome,
        }
    }

    pub fn status<U: Into<String>>(url: U, code: u16) -> Self {
        Self::new(url, Outcome::Status(code))
    }

    pub fn no_response<U: Into<String>>(url: U) -> Self {
        Self::new(url, Outcome::NoResponse)
    }
}

impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.url, self.outcome)
    }
}

/// Configuration options for the probe engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Number of long-lived worker loops draining the work queue
    /// Default: 100
    pub workers: usize,

    /// Pool-wide cap on probes holding an admission slot
    /// Default: same as `workers`
    pub concurrency: usize,

    /// Hard deadline for each request
    /// Default: 3000 ms
    #[serde(skip)]
    pub timeout: Duration,

    /// Emit an extra 301 result when a failure's error text names `<url>/`
    /// Default: false
    pub redirect_hint: bool,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            concurrency: DEFAULT_WORKERS,
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            redirect_hint: false,
        }
    }
}

/// Default worker count (and default concurrency cap).
pub const DEFAULT_WORKERS: usize = 100;

/// Default per-request deadline in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 3000;

/// Upper bound accepted for workers and concurrency.
pub const MAX_WORKERS: usize = 10_000;

impl ProbeConfig {
    /// Set the number of worker loops. Clamped to `1..=MAX_WORKERS`.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.clamp(1, MAX_WORKERS);
        self
    }

    /// Set the concurrency cap. Clamped to `1..=MAX_WORKERS`.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.clamp(1, MAX_WORKERS);
        self
    }

    /// Set the per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable the redirect hint heuristic.
    pub fn with_redirect_hint(mut self, enabled: bool) -> Self {
        self.redirect_hint = enabled;
        self
    }

    /// Check the invariants the engine relies on.
    pub fn validate(&self) -> Result<(), crate::ProbeError> {
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(crate::ProbeError::config(format!(
                "Workers must be between 1 and {}",
                MAX_WORKERS
            )));
        }
        if self.concurrency == 0 || self.concurrency > MAX_WORKERS {
            return Err(crate::ProbeError::config(format!(
                "Concurrency must be between 1 and {}",
                MAX_WORKERS
            )));
        }
        if self.timeout.is_zero() {
            return Err(crate::ProbeError::config("Timeout must be greater than zero"));
        }
        Ok(())
    }
}

/// Totals for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProbeSummary {
    /// Number of URLs handed to the engine
    pub expected: usize,

    /// Number of results forwarded to the sink (includes redirect hints)
    pub results: usize,

    /// Results carrying a status code (excluding redirect hints)
    pub responded: usize,

    /// Results with no response
    pub no_response: usize,

    /// Extra results emitted by the redirect hint heuristic
    pub redirect_hints: usize,

    /// Results the sink failed to accept
    pub sink_failures: usize,

    /// Probes that acquired an admission slot during this run
    pub admitted: usize,

    /// Highest number of probes that held an admission slot at once
    pub peak_in_flight: usize,

    /// Wall-clock duration of the run
    #[serde(skip)]
    pub elapsed: Duration,
}

/// How results are written by file sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// `url,outcome` lines
    #[default]
    Csv,

    /// One JSON object per line
    Json,
}

impl FromStr for OutputFormat {
    type Err = crate::ProbeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            other => Err(crate::ProbeError::config(format!(
                "Unknown output format '{}'. Use 'csv' or 'json'",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
