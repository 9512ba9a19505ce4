//! # URL Probe Library
//!
//! Probes lists of URLs over HTTP(S) and records, for each, the response
//! status code or a no-response marker.
//!
//! The engine is a fixed pool of worker loops draining a work queue. Every
//! probe holds a unit of the run's admission gate while its request is in
//! flight, so the concurrency cap holds no matter how many workers run.
//! Results flow back through a channel to a single [`ResultSink`], and each
//! finished probe ticks a [`ProgressSink`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use url_probe_lib::{CountingProgress, ProbeConfig, ProbeResult, UrlProber};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let prober = UrlProber::with_config(ProbeConfig::default().with_concurrency(20))?;
//!     let urls = vec!["https://example.com".to_string(), "https://example.org".to_string()];
//!
//!     let mut results: Vec<ProbeResult> = Vec::new();
//!     let progress = Arc::new(CountingProgress::new());
//!     prober.probe_all(urls, &mut results, progress.clone()).await?;
//!
//!     for result in &results {
//!         println!("{}", result);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Guarantees
//!
//! - **Exactly once**: each input URL yields one result and one progress tick
//! - **Bounded**: at most `concurrency` requests are in flight at any time
//! - **No leaks**: every admission unit is released on every exit path
//! - **Unordered**: results arrive in completion order

// Re-export main public API types and functions
pub use config::{
    load_env_config, load_env_config_from, parse_timeout_string, ConfigManager, DefaultsConfig,
    EnvConfig, FileConfig, OutputConfig,
};
pub use dispatcher::{DispatchHandle, Dispatcher};
pub use error::ProbeError;
pub use fetch::{HttpFetcher, StatusFetcher};
pub use gate::{AdmissionGate, AdmissionPermit, GateStats};
pub use probe::{fetch_outcome, RedirectHint};
pub use prober::UrlProber;
pub use queue::{WorkQueue, WorkQueueReceiver};
pub use sink::{CountingProgress, NoProgress, ProgressSink, ResultSink, WriterSink};
pub use types::{
    Outcome, OutputFormat, ProbeConfig, ProbeResult, ProbeSummary, DEFAULT_TIMEOUT_MS,
    DEFAULT_WORKERS, MAX_WORKERS, NO_RESPONSE_TOKEN, REDIRECT_HINT_STATUS,
};
pub use utils::{parse_url_list, read_urls_from_file, read_urls_from_reader, STDIN_SOURCE};

// Internal modules - their public items are re-exported above
mod config;
mod dispatcher;
mod error;
mod fetch;
mod gate;
mod probe;
mod prober;
mod queue;
mod sink;
mod types;
mod utils;

// Type alias for convenience
pub type Result<T> = std::result::Result<T, ProbeError>;

// Library version and metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
