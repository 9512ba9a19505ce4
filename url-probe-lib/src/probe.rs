//! A single probe: one GET against one URL, producing one result.
//!
//! Every probe, whatever happens to the request, sends its result to the
//! result channel, ticks the progress sink once and releases its admission
//! permit once.

use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::error::ProbeError;
use crate::fetch::StatusFetcher;
use crate::gate::AdmissionPermit;
use crate::sink::ProgressSink;
use crate::types::{Outcome, ProbeResult, REDIRECT_HINT_STATUS};

/// Heuristic that infers a redirect from where a request failed.
///
/// When a request fails on the slash-terminated form of the probed URL rather
/// than on the probed URL itself, the server most likely redirected there.
/// With the hint enabled such failures emit an additional `301` result ahead
/// of the usual no-response result, so that URL appears twice in the output.
///
/// Only the failing URL reported by the HTTP client is consulted, never the
/// error text. The hint is disabled unless explicitly requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RedirectHint {
    enabled: bool,
}

impl RedirectHint {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a request for `url` that failed on `failed_url` had been
    /// redirected to the slash-terminated form of `url`.
    ///
    /// Both sides are compared in parsed form, so `http://host` and the
    /// `http://host/` the client reports for it count as the same URL.
    pub fn matches(url: &str, failed_url: &str) -> bool {
        let (Ok(probed), Ok(with_slash)) = (
            reqwest::Url::parse(url),
            reqwest::Url::parse(&format!("{}/", url)),
        ) else {
            return false;
        };
        failed_url != probed.as_str() && failed_url == with_slash.as_str()
    }

    /// The extra result to emit for this failure, if any.
    pub fn extra_result(&self, url: &str, err: &ProbeError) -> Option<ProbeResult> {
        let failed_url = err.failed_url()?;
        (self.enabled && Self::matches(url, failed_url))
            .then(|| ProbeResult::status(url, REDIRECT_HINT_STATUS))
    }
}

/// Shared resources handed to every probe of one dispatcher run.
pub(crate) struct ProbeContext<F> {
    pub(crate) fetcher: Arc<F>,
    pub(crate) timeout: Duration,
    pub(crate) redirect_hint: RedirectHint,
    pub(crate) results: mpsc::Sender<ProbeResult>,
    pub(crate) progress: Arc<dyn ProgressSink>,
}

/// Fetch the status of `url` under a hard deadline.
///
/// A panicking fetcher is reported as a transport failure so the caller still
/// produces exactly one result.
pub async fn fetch_outcome<F: StatusFetcher>(
    fetcher: &F,
    url: &str,
    timeout: Duration,
) -> Result<u16, ProbeError> {
    let request = AssertUnwindSafe(fetcher.fetch_status(url)).catch_unwind();
    match tokio::time::timeout(timeout, request).await {
        Ok(Ok(result)) => result,
        Ok(Err(_panic)) => Err(ProbeError::transport(url, "fetcher panicked")),
        Err(_elapsed) => Err(ProbeError::timeout(url, timeout)),
    }
}

/// Run one probe to completion. Consumes the admission permit.
pub(crate) async fn run_probe<F: StatusFetcher>(
    url: String,
    permit: AdmissionPermit,
    ctx: Arc<ProbeContext<F>>,
) {
    let outcome = match fetch_outcome(ctx.fetcher.as_ref(), &url, ctx.timeout).await {
        Ok(code) => {
            debug!(url = %url, status = code, "probe responded");
            Outcome::Status(code)
        }
        Err(err) => {
            debug!(url = %url, error = %err, "probe got no response");
            if let Some(extra) = ctx.redirect_hint.extra_result(&url, &err) {
                deliver(&ctx.results, extra).await;
            }
            Outcome::NoResponse
        }
    };

    deliver(&ctx.results, ProbeResult::new(url, outcome)).await;
    ctx.progress.tick();
    drop(permit);
}

async fn deliver(results: &mpsc::Sender<ProbeResult>, result: ProbeResult) {
    if let Err(mpsc::error::SendError(result)) = results.send(result).await {
        warn!(url = %result.url, "result receiver dropped before delivery");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::{MockFetcher, MockResponse};
    use crate::gate::AdmissionGate;
    use crate::sink::CountingProgress;
    use std::time::Instant;

    fn context(
        fetcher: MockFetcher,
        timeout: Duration,
        redirect_hint: bool,
    ) -> (
        Arc<ProbeContext<MockFetcher>>,
        mpsc::Receiver<ProbeResult>,
        Arc<CountingProgress>,
    ) {
        let (results, rx) = mpsc::channel(4);
        let progress = Arc::new(CountingProgress::new());
        let ctx = Arc::new(ProbeContext {
            fetcher: Arc::new(fetcher),
            timeout,
            redirect_hint: RedirectHint::new(redirect_hint),
            results,
            progress: progress.clone(),
        });
        (ctx, rx, progress)
    }

    #[test]
    fn test_redirect_hint_matching() {
        assert!(RedirectHint::matches("http://a.test/docs", "http://a.test/docs/"));
        assert!(!RedirectHint::matches("http://a.test/docs", "http://a.test/docs"));
        assert!(!RedirectHint::matches("http://a.test/docs", "http://b.test/docs/"));
        assert!(!RedirectHint::matches("not a url", "not a url/"));
        assert!(!RedirectHint::matches("", "/"));
    }

    #[test]
    fn test_bare_host_never_matches() {
        // The client reports `http://a.test` as `http://a.test/`.
        assert!(!RedirectHint::matches("http://a.test", "http://a.test/"));
        assert!(!RedirectHint::matches("http://127.0.0.1:9", "http://127.0.0.1:9/"));

        let refused = ProbeError::transport("http://a.test/", "connection refused");
        assert!(RedirectHint::new(true).extra_result("http://a.test", &refused).is_none());
    }

    #[test]
    fn test_redirect_hint_extra_result() {
        let failed = ProbeError::transport("http://a.test/docs/", "connection reset");
        assert!(RedirectHint::new(false).extra_result("http://a.test/docs", &failed).is_none());
        assert_eq!(
            RedirectHint::new(true).extra_result("http://a.test/docs", &failed),
            Some(ProbeResult::status("http://a.test/docs", 301))
        );

        let timed_out = ProbeError::timeout("http://a.test/docs/", Duration::from_secs(1));
        assert!(RedirectHint::new(true).extra_result("http://a.test/docs", &timed_out).is_none());
    }

    #[tokio::test]
    async fn test_success_emits_status_and_releases() {
        let gate = AdmissionGate::new(1);
        let fetcher = MockFetcher::new().respond("http://a.test", MockResponse::Status(204));
        let (ctx, mut rx, progress) = context(fetcher, Duration::from_secs(1), false);

        let permit = gate.acquire().await;
        run_probe("http://a.test".to_string(), permit, ctx).await;

        assert_eq!(rx.recv().await, Some(ProbeResult::status("http://a.test", 204)));
        assert_eq!(progress.count(), 1);
        assert_eq!(gate.stats().released, 1);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn test_failure_emits_no_response() {
        let gate = AdmissionGate::new(1);
        let fetcher = MockFetcher::new()
            .respond("http://a.test", MockResponse::Fail("connection refused".into()));
        let (ctx, mut rx, progress) = context(fetcher, Duration::from_secs(1), false);

        let permit = gate.acquire().await;
        run_probe("http://a.test".to_string(), permit, ctx).await;

        assert_eq!(rx.recv().await, Some(ProbeResult::no_response("http://a.test")));
        assert_eq!(progress.count(), 1);
        assert_eq!(gate.stats().in_flight, 0);
    }

    #[tokio::test]
    async fn test_redirect_hint_adds_result_only_when_enabled() {
        let failure = MockResponse::FailAt("http://a.test/docs/".into(), "connection reset".into());

        let gate = AdmissionGate::new(1);
        let fetcher = MockFetcher::new().respond("http://a.test/docs", failure.clone());
        let (ctx, mut rx, progress) = context(fetcher, Duration::from_secs(1), true);
        run_probe("http://a.test/docs".to_string(), gate.acquire().await, ctx).await;

        assert_eq!(rx.recv().await, Some(ProbeResult::status("http://a.test/docs", 301)));
        assert_eq!(rx.recv().await, Some(ProbeResult::no_response("http://a.test/docs")));
        assert_eq!(progress.count(), 1, "the hint never adds a progress tick");

        let fetcher = MockFetcher::new().respond("http://a.test/docs", failure);
        let (ctx, mut rx, _progress) = context(fetcher, Duration::from_secs(1), false);
        run_probe("http://a.test/docs".to_string(), gate.acquire().await, ctx).await;
        assert_eq!(rx.recv().await, Some(ProbeResult::no_response("http://a.test/docs")));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_redirect_hint_ignores_plain_failure_on_bare_host() {
        let failure = MockResponse::FailAt("http://a.test/".into(), "connection refused".into());

        let gate = AdmissionGate::new(1);
        let fetcher = MockFetcher::new().respond("http://a.test", failure);
        let (ctx, mut rx, progress) = context(fetcher, Duration::from_secs(1), true);
        run_probe("http://a.test".to_string(), gate.acquire().await, ctx).await;

        assert_eq!(rx.recv().await, Some(ProbeResult::no_response("http://a.test")));
        assert!(rx.try_recv().is_err());
        assert_eq!(progress.count(), 1);
    }

    #[tokio::test]
    async fn test_timeout_emits_no_response_after_deadline() {
        let gate = AdmissionGate::new(1);
        let fetcher = MockFetcher::new().respond("http://timeout.test", MockResponse::Hang);
        let (ctx, mut rx, progress) = context(fetcher, Duration::from_millis(50), false);

        let start = Instant::now();
        run_probe("http://timeout.test".to_string(), gate.acquire().await, ctx).await;
        let elapsed = start.elapsed();

        assert_eq!(rx.recv().await, Some(ProbeResult::no_response("http://timeout.test")));
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500), "took {:?}", elapsed);
        assert_eq!(progress.count(), 1);
        assert_eq!(gate.available(), 1);
    }

    #[tokio::test]
    async fn test_panicking_fetcher_still_reports() {
        let gate = AdmissionGate::new(1);
        let fetcher = MockFetcher::new().respond("http://boom.test", MockResponse::Panic);
        let (ctx, mut rx, progress) = context(fetcher, Duration::from_secs(1), false);

        run_probe("http://boom.test".to_string(), gate.acquire().await, ctx).await;

        assert_eq!(rx.recv().await, Some(ProbeResult::no_response("http://boom.test")));
        assert_eq!(progress.count(), 1);
        assert_eq!(gate.stats().released, 1);
    }
}
