//! Main URL prober implementation.
//!
//! This module provides the `UrlProber` struct that wires the work queue,
//! dispatcher, result channel and sinks together for one run.

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::ProbeError;
use crate::fetch::{HttpFetcher, StatusFetcher};
use crate::probe::fetch_outcome;
use crate::queue::WorkQueue;
use crate::sink::{ProgressSink, ResultSink};
use crate::types::{Outcome, ProbeConfig, ProbeResult, ProbeSummary};

/// Probes URL lists under a concurrency cap and a per-request deadline.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use url_probe_lib::{NoProgress, ProbeResult, UrlProber};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let prober = UrlProber::new()?;
///     let urls = vec!["https://example.com".to_string()];
///     let mut results: Vec<ProbeResult> = Vec::new();
///
///     let summary = prober.probe_all(urls, &mut results, Arc::new(NoProgress)).await?;
///     println!("{} results, {} without response", summary.results, summary.no_response);
///     Ok(())
/// }
/// ```
pub struct UrlProber<F = HttpFetcher> {
    /// Configuration settings for this prober instance
    config: ProbeConfig,
    /// Worker pool; each run gets its own admission gate
    dispatcher: Dispatcher<F>,
    /// HTTP layer shared with the dispatcher
    fetcher: Arc<F>,
}

impl UrlProber<HttpFetcher> {
    /// Create a prober with default configuration.
    ///
    /// Default settings:
    /// - Workers: 100
    /// - Concurrency cap: 100
    /// - Timeout: 3000 ms
    /// - Redirect hint: disabled
    pub fn new() -> Result<Self, ProbeError> {
        Self::with_config(ProbeConfig::default())
    }

    /// Create a prober backed by reqwest with a custom configuration.
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::time::Duration;
    /// use url_probe_lib::{ProbeConfig, UrlProber};
    ///
    /// let config = ProbeConfig::default()
    ///     .with_workers(20)
    ///     .with_concurrency(10)
    ///     .with_timeout(Duration::from_millis(1500));
    ///
    /// let prober = UrlProber::with_config(config).unwrap();
    /// assert_eq!(prober.config().concurrency, 10);
    /// ```
    pub fn with_config(config: ProbeConfig) -> Result<Self, ProbeError> {
        config.validate()?;
        let fetcher = HttpFetcher::new(config.timeout)?;
        Ok(Self::with_fetcher(config, fetcher))
    }
}

impl<F: StatusFetcher> UrlProber<F> {
    /// Create a prober around any [`StatusFetcher`].
    pub fn with_fetcher(config: ProbeConfig, fetcher: F) -> Self {
        let fetcher = Arc::new(fetcher);
        let dispatcher = Dispatcher::new(&config, Arc::clone(&fetcher));
        Self {
            config,
            dispatcher,
            fetcher,
        }
    }

    /// Get the current configuration for this prober.
    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    pub fn dispatcher(&self) -> &Dispatcher<F> {
        &self.dispatcher
    }

    /// Probe a single URL outside the worker pool.
    pub async fn probe_url(&self, url: &str) -> ProbeResult {
        let url = url.trim();
        match fetch_outcome(self.fetcher.as_ref(), url, self.config.timeout).await {
            Ok(code) => ProbeResult::status(url, code),
            Err(_) => ProbeResult::no_response(url),
        }
    }

    /// Probe every URL and forward each result to `sink`.
    ///
    /// The process:
    /// 1. Trims the URLs and fills and closes a work queue sized to the input
    /// 2. Starts the dispatcher's worker loops
    /// 3. Forwards results to `sink` as they complete, in completion order
    /// 4. Joins the dispatcher once the result channel closes
    ///
    /// Each URL yields exactly one result (plus one redirect hint result when
    /// that heuristic is enabled and matches), and `progress` is ticked once
    /// per URL. A failing sink write is logged and counted; the remaining
    /// results are still delivered.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError` only when the engine itself breaks (queue overflow
    /// or a crashed worker), never for unreachable URLs.
    pub async fn probe_all<S>(
        &self,
        urls: Vec<String>,
        sink: &mut S,
        progress: Arc<dyn ProgressSink>,
    ) -> Result<ProbeSummary, ProbeError>
    where
        S: ResultSink + ?Sized,
    {
        let start = Instant::now();
        let expected = urls.len();

        if expected == 0 {
            info!("no URLs to probe");
            return Ok(ProbeSummary::default());
        }

        info!(
            urls = expected,
            workers = self.dispatcher.workers(),
            concurrency = self.config.concurrency,
            timeout_ms = self.config.timeout.as_millis() as u64,
            "starting probe run"
        );

        let queue = WorkQueue::from_urls(urls.into_iter().map(|url| url.trim().to_string()))?;
        let (results_tx, mut results_rx) = mpsc::channel(expected);

        let handle = self.dispatcher.start(queue, results_tx, progress);
        let gate = handle.gate().clone();

        let mut summary = ProbeSummary {
            expected,
            ..ProbeSummary::default()
        };

        while let Some(result) = results_rx.recv().await {
            summary.results += 1;
            match result.outcome {
                Outcome::Status(_) => summary.responded += 1,
                Outcome::NoResponse => summary.no_response += 1,
            }

            if let Err(e) = sink.emit(&result) {
                summary.sink_failures += 1;
                warn!(url = %result.url, error = %e, "result sink rejected result");
            }
        }

        handle.join().await?;

        if let Err(e) = sink.flush() {
            summary.sink_failures += 1;
            warn!(error = %e, "result sink flush failed");
        }

        // Every URL yields one primary result; anything beyond that is a hint.
        summary.redirect_hints = summary.results.saturating_sub(expected);
        summary.responded = summary.responded.saturating_sub(summary.redirect_hints);

        let gate_stats = gate.stats();
        summary.admitted = gate_stats.acquired;
        summary.peak_in_flight = gate_stats.peak;
        summary.elapsed = start.elapsed();

        info!(
            results = summary.results,
            responded = summary.responded,
            no_response = summary.no_response,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "probe run finished"
        );

        Ok(summary)
    }
}
