use serde::Serialize;
use std::time::Duration;

/// Probe counters for the current session. Kept in memory only.
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    pub sent: u32,
    pub received: u32,
    pub min_rtt: Option<Duration>,
    pub max_rtt: Option<Duration>,
    pub sum_rtt: Duration,
    pub last_seq: u32,
}

impl SessionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_with_success(&mut self, seq: u32, rtt: Duration) {
        self.sent += 1;
        self.received += 1;
        self.last_seq = seq;
        self.sum_rtt += rtt;
        self.min_rtt = Some(self.min_rtt.map_or(rtt, |min| min.min(rtt)));
        self.max_rtt = Some(self.max_rtt.map_or(rtt, |max| max.max(rtt)));
    }

    pub fn update_with_failure(&mut self, seq: u32) {
        self.sent += 1;
        self.last_seq = seq;
    }

    pub fn avg_rtt(&self) -> Option<Duration> {
        if self.received > 0 {
            Some(self.sum_rtt / self.received)
        } else {
            None
        }
    }

    pub fn loss_percent(&self) -> f64 {
        if self.sent > 0 {
            (1.0 - (self.received as f64 / self.sent as f64)) * 100.0
        } else {
            0.0
        }
    }

    pub fn summary(&self, host: &str) -> SummaryRecord {
        let ms = |d: Option<Duration>| d.map_or(0.0, |d| d.as_secs_f64() * 1000.0);
        SummaryRecord {
            host: host.to_string(),
            probes_sent: self.sent,
            probes_received: self.received,
            loss_percent: self.loss_percent(),
            latency_min_ms: ms(self.min_rtt),
            latency_avg_ms: ms(self.avg_rtt()),
            latency_max_ms: ms(self.max_rtt),
        }
    }
}

/// Flat row used for JSON and CSV summaries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRecord {
    pub host: String,
    pub probes_sent: u32,
    pub probes_received: u32,
    pub loss_percent: f64,
    pub latency_min_ms: f64,
    pub latency_avg_ms: f64,
    pub latency_max_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_session() {
        let mut stats = SessionStats::new();
        stats.update_with_success(0, Duration::from_millis(40));
        stats.update_with_failure(1);
        stats.update_with_success(2, Duration::from_millis(120));
        stats.update_with_success(3, Duration::from_millis(20));

        assert_eq!(stats.sent, 4);
        assert_eq!(stats.received, 3);
        assert_eq!(stats.last_seq, 3);
        assert_eq!(stats.min_rtt, Some(Duration::from_millis(20)));
        assert_eq!(stats.max_rtt, Some(Duration::from_millis(120)));
        assert_eq!(stats.avg_rtt(), Some(Duration::from_millis(60)));
        assert!((stats.loss_percent() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_session() {
        let stats = SessionStats::new();
        assert_eq!(stats.avg_rtt(), None);
        assert_eq!(stats.loss_percent(), 0.0);

        let record = stats.summary("example.com");
        assert_eq!(record.probes_sent, 0);
        assert_eq!(record.latency_avg_ms, 0.0);
    }
}
