//! Error handling for URL probing operations.
//!
//! Transport failures never abort a run: the probe engine turns them into a
//! no-response result. The remaining variants cover configuration, input
//! files, result sinks and internal invariants.

use std::fmt;
use std::time::Duration;

/// Main error type for URL probing operations.
#[derive(Debug, Clone)]
pub enum ProbeError {
    /// The request could not be completed (DNS, refused connection, TLS, bad URL).
    ///
    /// `url` is the URL the request failed on, which is a redirect target
    /// when the failure happened after following a redirect.
    Transport {
        url: String,
        message: String,
    },

    /// No response headers arrived before the deadline
    Timeout {
        url: String,
        duration: Duration,
    },

    /// Configuration errors (invalid settings, unparsable files, etc.)
    ConfigError {
        message: String,
    },

    /// File I/O errors when reading URL lists or writing results
    FileError {
        path: String,
        message: String,
    },

    /// A result sink refused a result
    SinkError {
        message: String,
    },

    /// Generic internal errors that don't fit other categories
    Internal {
        message: String,
    },
}

impl ProbeError {
    /// Create a new transport error.
    pub fn transport<U: Into<String>, M: Into<String>>(url: U, message: M) -> Self {
        Self::Transport {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a new timeout error.
    pub fn timeout<U: Into<String>>(url: U, duration: Duration) -> Self {
        Self::Timeout {
            url: url.into(),
            duration,
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new sink error.
    pub fn sink<M: Into<String>>(message: M) -> Self {
        Self::SinkError {
            message: message.into(),
        }
    }

    /// Create a new internal error.
    pub fn internal<M: Into<String>>(message: M) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Build a transport error from a reqwest failure, keeping the whole
    /// source chain in the message.
    ///
    /// The URL reqwest reports takes precedence over `url`, so a failure on a
    /// redirect target names that target.
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        let failed_url = err.url().map(|u| u.as_str()).unwrap_or(url);
        let mut message = err.to_string();
        let mut source = std::error::Error::source(err);
        while let Some(cause) = source {
            let cause_text = cause.to_string();
            if !message.contains(&cause_text) {
                message.push_str(": ");
                message.push_str(&cause_text);
            }
            source = cause.source();
        }
        Self::transport(failed_url, message)
    }

    /// URL a transport failure happened on.
    pub fn failed_url(&self) -> Option<&str> {
        match self {
            Self::Transport { url, .. } => Some(url),
            _ => None,
        }
    }

    /// Whether this error means the probed URL produced no response at all.
    pub fn is_no_response(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }
}

impl fmt::Display for ProbeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { url, message } => {
                write!(f, "Request to '{}' failed: {}", url, message)
            }
            Self::Timeout { url, duration } => {
                write!(f, "Request to '{}' timed out after {:?}", url, duration)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::SinkError { message } => {
                write!(f, "Result sink error: {}", message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        Self::from_reqwest("", &err)
    }
}

impl From<std::io::Error> for ProbeError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

impl From<serde_json::Error> for ProbeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Internal {
            message: format!("JSON serialization failed: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = ProbeError::transport("http://a.test", "connection refused");
        assert_eq!(
            err.to_string(),
            "Request to 'http://a.test' failed: connection refused"
        );

        let err = ProbeError::timeout("http://a.test", Duration::from_millis(50));
        assert!(err.to_string().contains("timed out after 50ms"));

        let err = ProbeError::file_error("urls.txt", "not found");
        assert_eq!(err.to_string(), "File error at 'urls.txt': not found");
    }

    #[test]
    fn test_is_no_response() {
        assert!(ProbeError::transport("u", "m").is_no_response());
        assert!(ProbeError::timeout("u", Duration::from_secs(1)).is_no_response());
        assert!(!ProbeError::config("bad").is_no_response());
        assert!(!ProbeError::sink("disk full").is_no_response());
    }

    #[test]
    fn test_failed_url() {
        let err = ProbeError::transport("http://a.test/docs/", "connection reset");
        assert_eq!(err.failed_url(), Some("http://a.test/docs/"));
        assert_eq!(
            ProbeError::timeout("http://a.test", Duration::from_secs(1)).failed_url(),
            None
        );
    }

    #[tokio::test]
    async fn test_from_reqwest_uses_reported_url() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let url = format!("http://127.0.0.1:{}", port);
        let err = reqwest::get(&url).await.unwrap_err();
        let probe_err = ProbeError::from_reqwest(&url, &err);

        assert_eq!(probe_err.failed_url(), Some(format!("{}/", url).as_str()));
        assert!(probe_err.is_no_response());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "boom");
        let err: ProbeError = io.into();
        assert!(matches!(err, ProbeError::Internal { .. }));
        assert!(err.to_string().contains("boom"));
    }
}
