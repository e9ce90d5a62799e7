use colored::Color;

/// Latency below this is rendered as good.
pub const GOOD_BELOW_MS: u64 = 100;
/// Latency below this (and not good) is rendered as fair.
pub const FAIR_BELOW_MS: u64 = 300;

/// How a probe result is rated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Offline,
    Good,
    Fair,
    Poor,
}

impl Severity {
    /// Classifies a probe result. `None` means the probe failed.
    pub fn classify(latency_ms: Option<u64>) -> Self {
        match latency_ms {
            None => Severity::Offline,
            Some(ms) if ms < GOOD_BELOW_MS => Severity::Good,
            Some(ms) if ms < FAIR_BELOW_MS => Severity::Fair,
            Some(_) => Severity::Poor,
        }
    }

    pub fn color(self) -> Color {
        match self {
            Severity::Good => Color::Green,
            Severity::Fair => Color::Yellow,
            Severity::Poor | Severity::Offline => Color::Red,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Offline => "offline",
            Severity::Good => "good",
            Severity::Fair => "fair",
            Severity::Poor => "poor",
        }
    }
}

/// What the ping panel shows after one probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusView {
    pub text: String,
    pub label: &'static str,
    pub severity: Severity,
}

impl StatusView {
    pub fn render(latency_ms: Option<u64>) -> Self {
        let severity = Severity::classify(latency_ms);
        match latency_ms {
            Some(ms) => Self {
                text: format!("{} ms", ms),
                label: "Online",
                severity,
            },
            None => Self {
                text: "Gagal".to_string(),
                label: "Offline",
                severity,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_good_probe_view() {
        let view = StatusView::render(Some(42));
        assert_eq!(view.text, "42 ms");
        assert_eq!(view.label, "Online");
        assert_eq!(view.severity, Severity::Good);
    }

    #[test]
    fn test_fair_and_poor_probe_views() {
        assert_eq!(StatusView::render(Some(150)).severity, Severity::Fair);
        assert_eq!(StatusView::render(Some(450)).severity, Severity::Poor);
    }

    #[test]
    fn test_failed_probe_view() {
        let view = StatusView::render(None);
        assert_eq!(view.text, "Gagal");
        assert_eq!(view.label, "Offline");
        assert_eq!(view.severity, Severity::Offline);
    }

    #[test]
    fn test_threshold_edges() {
        assert_eq!(Severity::classify(Some(0)), Severity::Good);
        assert_eq!(Severity::classify(Some(99)), Severity::Good);
        assert_eq!(Severity::classify(Some(100)), Severity::Fair);
        assert_eq!(Severity::classify(Some(299)), Severity::Fair);
        assert_eq!(Severity::classify(Some(300)), Severity::Poor);
    }

    proptest! {
        #[test]
        fn classify_matches_thresholds(ms in 0u64..100_000) {
            let severity = Severity::classify(Some(ms));
            prop_assert_eq!(severity == Severity::Good, ms < 100);
            prop_assert_eq!(severity == Severity::Fair, (100..300).contains(&ms));
            prop_assert_eq!(severity == Severity::Poor, ms >= 300);
            prop_assert_ne!(severity, Severity::Offline);
        }
    }
}
