use chrono::{DateTime, Local};
use reqwest::Url;
use std::time::Duration;

use crate::error::{NetpulseError, ProbeError};

pub const DEFAULT_ENDPOINT: &str = "https://ipv4.google.com";

/// Latency reported for a failed probe wherever a signed value is emitted.
pub const FAILED_LATENCY_MS: i64 = -1;

/// Query parameter carrying the cache-busting timestamp.
const CACHE_BUSTER: &str = "t";

#[derive(Debug, Clone)]
pub struct ProbeTarget {
    pub name: String,
    pub url: Url,
}

impl ProbeTarget {
    pub fn parse(endpoint: &str) -> Result<Self, NetpulseError> {
        let url = Url::parse(endpoint)
            .map_err(|e| NetpulseError::Config(format!("Invalid endpoint {}: {}", endpoint, e)))?;

        match url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(NetpulseError::Config(format!(
                    "Unsupported endpoint scheme '{}', expected http or https",
                    other
                )))
            }
        }

        let name = url.host_str().unwrap_or(endpoint).to_string();
        Ok(Self { name, url })
    }

    /// The endpoint with `t=<epoch_ms>` appended so no cache answers the probe.
    pub fn cache_busted(&self, epoch_ms: i64) -> Url {
        let mut url = self.url.clone();
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| k != CACHE_BUSTER)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        url.set_query(None);
        {
            let mut query = url.query_pairs_mut();
            for (k, v) in &kept {
                query.append_pair(k, v);
            }
            query.append_pair(CACHE_BUSTER, &epoch_ms.to_string());
        }
        url
    }
}

/// Result of one probe, success or not.
#[derive(Debug)]
pub struct ProbeOutcome {
    pub seq: u32,
    pub started_at: DateTime<Local>,
    pub rtt: Option<Duration>,
    pub error: Option<ProbeError>,
}

impl ProbeOutcome {
    pub fn success(seq: u32, started_at: DateTime<Local>, rtt: Duration) -> Self {
        Self {
            seq,
            started_at,
            rtt: Some(rtt),
            error: None,
        }
    }

    pub fn failure(seq: u32, started_at: DateTime<Local>, error: ProbeError) -> Self {
        Self {
            seq,
            started_at,
            rtt: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whole milliseconds, `None` for a failed probe.
    pub fn latency_ms(&self) -> Option<u64> {
        match (&self.error, self.rtt) {
            (None, Some(rtt)) => Some(rtt.as_millis() as u64),
            _ => None,
        }
    }

    /// Like [`latency_ms`](Self::latency_ms) but with the `-1` sentinel for failures.
    pub fn latency_or_sentinel(&self) -> i64 {
        self.latency_ms()
            .map(|ms| ms as i64)
            .unwrap_or(FAILED_LATENCY_MS)
    }
}
