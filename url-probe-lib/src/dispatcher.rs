//! Worker pool that drains the work queue into bounded probes.
//!
//! A dispatcher runs a fixed number of worker loops. Each loop takes the next
//! URL, waits for a unit of the run's admission gate and spawns the probe
//! without waiting for it, so the worker count and the concurrency cap are
//! independent: the gate alone decides how many requests are in flight.
//!
//! Every [`Dispatcher::start`] creates a fresh gate, so overlapping runs on
//! one dispatcher each get their own cap and counters.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error};

use crate::error::ProbeError;
use crate::fetch::StatusFetcher;
use crate::gate::AdmissionGate;
use crate::probe::{run_probe, ProbeContext, RedirectHint};
use crate::queue::WorkQueueReceiver;
use crate::sink::ProgressSink;
use crate::types::{ProbeConfig, ProbeResult};

/// Fixed pool of worker loops sharing one admission gate per run.
pub struct Dispatcher<F> {
    fetcher: Arc<F>,
    concurrency: usize,
    workers: usize,
    timeout: Duration,
    redirect_hint: RedirectHint,
}

/// Handle on a started run: the supervised group of worker loops and the
/// admission gate they share.
///
/// Each worker joins the probes it spawned before exiting, so once
/// [`DispatchHandle::join`] returns every probe has finished and every
/// result sender has been dropped.
pub struct DispatchHandle {
    workers: JoinSet<usize>,
    gate: AdmissionGate,
}

impl<F: StatusFetcher> Dispatcher<F> {
    pub fn new(config: &ProbeConfig, fetcher: Arc<F>) -> Self {
        Self {
            fetcher,
            concurrency: config.concurrency.max(1),
            workers: config.workers.max(1),
            timeout: config.timeout,
            redirect_hint: RedirectHint::new(config.redirect_hint),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Capacity of the gate each run gets.
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Spawn the worker loops on the current tokio runtime.
    ///
    /// Results go straight from the probes to `results`; the dispatcher never
    /// reads them. `results` is moved in, so the channel closes when the
    /// last probe finishes.
    pub fn start(
        &self,
        queue: WorkQueueReceiver,
        results: mpsc::Sender<ProbeResult>,
        progress: Arc<dyn ProgressSink>,
    ) -> DispatchHandle {
        let gate = AdmissionGate::new(self.concurrency);
        let ctx = Arc::new(ProbeContext {
            fetcher: Arc::clone(&self.fetcher),
            timeout: self.timeout,
            redirect_hint: self.redirect_hint,
            results,
            progress,
        });

        let mut workers = JoinSet::new();
        for id in 0..self.workers {
            workers.spawn(worker_loop(
                id,
                queue.clone(),
                gate.clone(),
                Arc::clone(&ctx),
            ));
        }

        DispatchHandle { workers, gate }
    }
}

impl DispatchHandle {
    /// The admission gate of this run.
    pub fn gate(&self) -> &AdmissionGate {
        &self.gate
    }

    /// Wait for every worker loop and every probe to finish.
    ///
    /// Returns the number of probes spawned.
    pub async fn join(mut self) -> Result<usize, ProbeError> {
        let mut spawned = 0;
        let mut failure = None;

        while let Some(joined) = self.workers.join_next().await {
            match joined {
                Ok(count) => spawned += count,
                Err(e) => {
                    error!(error = %e, "worker loop failed");
                    failure.get_or_insert_with(|| {
                        ProbeError::internal(format!("worker loop failed: {}", e))
                    });
                }
            }
        }

        match failure {
            Some(err) => Err(err),
            None => Ok(spawned),
        }
    }
}

/// One worker: pull, admit, spawn; then wait for its own probes.
async fn worker_loop<F: StatusFetcher>(
    id: usize,
    queue: WorkQueueReceiver,
    gate: AdmissionGate,
    ctx: Arc<ProbeContext<F>>,
) -> usize {
    let mut probes = JoinSet::new();
    let mut spawned = 0;

    while let Some(url) = queue.next().await {
        let permit = gate.acquire().await;
        probes.spawn(run_probe(url, permit, Arc::clone(&ctx)));
        spawned += 1;
    }

    while let Some(joined) = probes.join_next().await {
        if let Err(e) = joined {
            error!(worker = id, error = %e, "probe task failed");
        }
    }

    debug!(worker = id, spawned, "worker finished");
    spawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::mock::{MockFetcher, MockResponse};
    use crate::queue::WorkQueue;
    use crate::sink::CountingProgress;

    fn config(workers: usize, concurrency: usize) -> ProbeConfig {
        ProbeConfig::default()
            .with_workers(workers)
            .with_concurrency(concurrency)
            .with_timeout(Duration::from_secs(2))
    }

    async fn drain(mut rx: mpsc::Receiver<ProbeResult>) -> Vec<ProbeResult> {
        let mut out = Vec::new();
        while let Some(result) = rx.recv().await {
            out.push(result);
        }
        out
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cap_holds_with_more_workers_than_slots() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .otherwise(MockResponse::SlowStatus(200, Duration::from_millis(10))),
        );
        let dispatcher = Dispatcher::new(&config(16, 3), Arc::clone(&fetcher));

        let urls: Vec<String> = (0..40).map(|i| format!("http://h{}.test", i)).collect();
        let queue = WorkQueue::from_urls(urls.clone()).unwrap();
        let (tx, rx) = mpsc::channel(urls.len());
        let progress = Arc::new(CountingProgress::new());

        let handle = dispatcher.start(queue, tx, progress.clone());
        let gate = handle.gate().clone();
        let results = drain(rx).await;
        let spawned = handle.join().await.unwrap();

        assert_eq!(spawned, 40);
        assert_eq!(results.len(), 40);
        assert_eq!(progress.count(), 40);
        assert_eq!(fetcher.calls(), 40);
        assert!(fetcher.peak() <= 3, "fetch peak {}", fetcher.peak());

        let stats = gate.stats();
        assert_eq!(stats.capacity, 3);
        assert!(stats.peak <= 3);
        assert_eq!(stats.acquired, 40);
        assert_eq!(stats.released, 40);
        assert_eq!(stats.in_flight, 0);
    }

    #[tokio::test]
    async fn test_single_worker_keeps_many_probes_in_flight() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .otherwise(MockResponse::SlowStatus(200, Duration::from_millis(50))),
        );
        let dispatcher = Dispatcher::new(&config(1, 8), Arc::clone(&fetcher));

        let urls: Vec<String> = (0..8).map(|i| format!("http://h{}.test", i)).collect();
        let queue = WorkQueue::from_urls(urls).unwrap();
        let (tx, rx) = mpsc::channel(8);

        let handle = dispatcher.start(queue, tx, Arc::new(CountingProgress::new()));
        let gate = handle.gate().clone();
        let results = drain(rx).await;
        handle.join().await.unwrap();

        assert_eq!(results.len(), 8);
        assert!(
            gate.stats().peak > 1,
            "one worker should not serialise its probes"
        );
    }

    #[tokio::test]
    async fn test_join_waits_for_all_probes() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .otherwise(MockResponse::SlowStatus(200, Duration::from_millis(20))),
        );
        let dispatcher = Dispatcher::new(&config(2, 2), fetcher);

        let urls: Vec<String> = (0..6).map(|i| format!("http://h{}.test", i)).collect();
        let queue = WorkQueue::from_urls(urls).unwrap();
        let (tx, mut rx) = mpsc::channel(6);

        let handle = dispatcher.start(queue, tx, Arc::new(CountingProgress::new()));
        let gate = handle.gate().clone();
        handle.join().await.unwrap();

        assert_eq!(gate.stats().in_flight, 0);
        let mut count = 0;
        while let Some(_result) = rx.recv().await {
            count += 1;
        }
        assert_eq!(count, 6);
    }

    #[tokio::test]
    async fn test_empty_queue_finishes_immediately() {
        let dispatcher = Dispatcher::new(&config(4, 2), Arc::new(MockFetcher::new()));
        let queue = WorkQueue::from_urls(Vec::new()).unwrap();
        let (tx, rx) = mpsc::channel(1);
        let progress = Arc::new(CountingProgress::new());

        let handle = dispatcher.start(queue, tx, progress.clone());
        assert!(drain(rx).await.is_empty());
        assert_eq!(handle.join().await.unwrap(), 0);
        assert_eq!(progress.count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_overlapping_runs_keep_separate_gates() {
        let fetcher = Arc::new(
            MockFetcher::new()
                .otherwise(MockResponse::SlowStatus(200, Duration::from_millis(30))),
        );
        let dispatcher = Dispatcher::new(&config(4, 2), fetcher);

        let start_run = |prefix: &str| {
            let urls: Vec<String> = (0..6)
                .map(|i| format!("http://{}{}.test", prefix, i))
                .collect();
            let queue = WorkQueue::from_urls(urls).unwrap();
            let (tx, rx) = mpsc::channel(6);
            let handle = dispatcher.start(queue, tx, Arc::new(CountingProgress::new()));
            (handle, rx)
        };

        let (first, first_rx) = start_run("a");
        let (second, second_rx) = start_run("b");
        let first_gate = first.gate().clone();
        let second_gate = second.gate().clone();

        let (first_results, second_results) = tokio::join!(drain(first_rx), drain(second_rx));
        first.join().await.unwrap();
        second.join().await.unwrap();

        assert_eq!(first_results.len(), 6);
        assert_eq!(second_results.len(), 6);
        for stats in [first_gate.stats(), second_gate.stats()] {
            assert_eq!(stats.acquired, 6);
            assert_eq!(stats.released, 6);
            assert!(stats.peak >= 1 && stats.peak <= 2, "peak {}", stats.peak);
        }
    }
}
