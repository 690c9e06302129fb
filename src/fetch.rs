//! Retrieval of reports over HTTP.

use std::io::Read;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;

use crate::error::{Result, SpotwatchError};
use crate::model::BugCollection;
use crate::parsers::spotbugs::SpotBugsParser;
use crate::parsers::Parser;

/// Anything that can turn a report URL into a decoded report.
pub trait ReportSource {
    fn fetch(&self, url: &str) -> Result<BugCollection>;
}

impl<T: ReportSource + ?Sized> ReportSource for &T {
    fn fetch(&self, url: &str) -> Result<BugCollection> {
        (**self).fetch(url)
    }
}

/// Settings for `HttpFetcher`.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Overall deadline for one request, body included.
    pub timeout: Duration,
    /// Bodies larger than this are rejected.
    pub max_body_bytes: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Fetches reports with a plain GET, defeating intermediate caches with a
/// `version=<epoch millis>` query parameter.
pub struct HttpFetcher {
    agent: ureq::Agent,
    config: FetchConfig,
    last_version: AtomicI64,
}

impl HttpFetcher {
    pub fn new(config: FetchConfig) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(config.timeout).build();
        Self {
            agent,
            config,
            last_version: AtomicI64::new(0),
        }
    }

    /// Current time in milliseconds, bumped when needed so that no two calls
    /// return the same value.
    fn next_version(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self
            .last_version
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }

    /// `url` with a fresh cache-busting parameter appended.
    #[must_use]
    pub fn cache_busted(&self, url: &str) -> String {
        let separator = if url.contains('?') { '&' } else { '?' };
        format!("{}{}version={}", url, separator, self.next_version())
    }

    /// Download the raw report body.
    pub fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let request_url = self.cache_busted(url);
        let response = match self.agent.get(&request_url).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(code, response)) => {
                return Err(SpotwatchError::Status {
                    url: url.to_string(),
                    code,
                    reason: response.status_text().to_string(),
                });
            }
            Err(e) => {
                return Err(SpotwatchError::Transport {
                    url: url.to_string(),
                    message: e.to_string(),
                });
            }
        };
        // ureq only reports 4xx/5xx as errors; unfollowed 1xx/3xx land here.
        if !(200..=299).contains(&response.status()) {
            return Err(SpotwatchError::Status {
                url: url.to_string(),
                code: response.status(),
                reason: response.status_text().to_string(),
            });
        }

        // The reader owns the connection; it is released when dropped on
        // every path out of this function.
        let mut body = Vec::new();
        response
            .into_reader()
            .take(self.config.max_body_bytes + 1)
            .read_to_end(&mut body)
            .map_err(|e| SpotwatchError::Transport {
                url: url.to_string(),
                message: format!("failed to read response body: {}", e),
            })?;
        if body.len() as u64 > self.config.max_body_bytes {
            return Err(SpotwatchError::Transport {
                url: url.to_string(),
                message: format!(
                    "response body exceeds {} bytes",
                    self.config.max_body_bytes
                ),
            });
        }
        Ok(body)
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new(FetchConfig::default())
    }
}

impl ReportSource for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<BugCollection> {
        let body = self.fetch_bytes(url)?;
        SpotBugsParser.parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version_of(url: &str) -> i64 {
        url.rsplit("version=").next().unwrap().parse().unwrap()
    }

    #[test]
    fn cache_buster_uses_right_separator() {
        let fetcher = HttpFetcher::default();
        assert!(fetcher
            .cache_busted("http://host/report.xml")
            .starts_with("http://host/report.xml?version="));
        assert!(fetcher
            .cache_busted("http://host/report.xml?token=abc")
            .starts_with("http://host/report.xml?token=abc&version="));
    }

    #[test]
    fn cache_buster_strictly_increases() {
        let fetcher = HttpFetcher::default();
        let mut last = 0;
        for _ in 0..50 {
            let v = version_of(&fetcher.cache_busted("http://host/r.xml"));
            assert!(v > last, "{v} <= {last}");
            last = v;
        }
    }
}
