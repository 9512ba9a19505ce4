//! HTTP layer used by probes.
//!
//! [`StatusFetcher`] is the seam between the probe engine and the network:
//! the engine only needs "give me the status code for this URL". The
//! production implementation is [`HttpFetcher`], built on reqwest.

use std::future::Future;
use std::time::Duration;

use crate::error::ProbeError;

/// Something that can turn a URL into an HTTP status code.
///
/// Implementations must not read response bodies; the engine only cares about
/// the status line.
pub trait StatusFetcher: Send + Sync + 'static {
    /// Issue one GET for `url` and return the response status code.
    fn fetch_status(&self, url: &str) -> impl Future<Output = Result<u16, ProbeError>> + Send;
}

/// reqwest-backed fetcher with certificate verification disabled.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    /// HTTP client shared by every probe of a run
    http_client: reqwest::Client,
    timeout: Duration,
}

impl HttpFetcher {
    /// Create a fetcher whose requests are cut off after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .user_agent(concat!("url-probe/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                ProbeError::internal(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http_client,
            timeout,
        })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl StatusFetcher for HttpFetcher {
    async fn fetch_status(&self, url: &str) -> Result<u16, ProbeError> {
        let response = self.http_client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::timeout(url, self.timeout)
            } else {
                ProbeError::from_reqwest(url, &e)
            }
        })?;

        // The body is never read; dropping the response releases the connection.
        let status = response.status().as_u16();
        drop(response);
        Ok(status)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_fetcher_builds() {
        let fetcher = HttpFetcher::new(Duration::from_millis(3000)).unwrap();
        assert_eq!(fetcher.timeout(), Duration::from_millis(3000));
    }

    #[tokio::test]
    async fn test_invalid_url_is_transport_error() {
        let fetcher = HttpFetcher::new(Duration::from_millis(500)).unwrap();
        let err = fetcher.fetch_status("not a url").await.unwrap_err();
        assert!(err.is_no_response());
    }
}
