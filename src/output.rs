use chrono::Local;
use clap::ValueEnum;
use colored::Colorize;
use std::io::Write;

use crate::app::{App, AppEvent, Frontend};
use crate::chart::SparklineChart;
use crate::error::Result;
use crate::speedtest::{SpeedPhase, SpeedTimer};
use crate::stats::SummaryRecord;
use crate::target::ProbeTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SummaryFormat {
    Text,
    Json,
    Csv,
}

pub fn print_probe_start(target: &ProbeTarget, interval_ms: u64) {
    println!("PROBE {} ({}) every {} ms", target.name, target.url, interval_ms);
}

/// Line-per-event frontend used with `--plain` and for the one-shot speed test.
pub struct PlainOutput {
    host: String,
    quiet: bool,
    show_timestamp: bool,
}

impl PlainOutput {
    pub fn new(host: impl Into<String>, quiet: bool, show_timestamp: bool) -> Self {
        Self {
            host: host.into(),
            quiet,
            show_timestamp,
        }
    }

    /// The line printed for an event, if any. Quiet mode only drops probe lines.
    pub fn format_event(&self, app: &App<SparklineChart>, event: &AppEvent) -> Option<String> {
        let display = app.display();
        let stamp = match event {
            AppEvent::Probe(outcome) => outcome.started_at,
            _ => Local::now(),
        };
        let line = match event {
            AppEvent::Probe(_) if self.quiet => return None,
            AppEvent::Probe(outcome) => {
                let severity = display.severity?;
                match &outcome.error {
                    None => format!(
                        "probe to {}: seq={} time={} {} [{}] {}",
                        self.host,
                        outcome.seq,
                        display.ping_text.color(severity.color()),
                        display.ping_indicator,
                        severity.as_str(),
                        app.chart().renderer().line()
                    ),
                    Some(e) => format!(
                        "probe to {} failed (seq={}): {} {} ({})",
                        self.host,
                        outcome.seq,
                        display.ping_text.red(),
                        display.ping_indicator,
                        e
                    ),
                }
            }
            AppEvent::StartSpeedTest if app.speed_phase() == SpeedPhase::Downloading => {
                "speed test started, measuring download...".to_string()
            }
            AppEvent::Speed(SpeedTimer::DownloadElapsed) if app.speed_phase() == SpeedPhase::Uploading => {
                format!("download: {}", display.download_text.cyan())
            }
            AppEvent::Speed(SpeedTimer::UploadElapsed) if app.speed_phase() == SpeedPhase::Idle => {
                format!("upload: {}", display.upload_text.cyan())
            }
            _ => return None,
        };

        if self.show_timestamp {
            Some(format!("[{}] {}", stamp.format("%H:%M:%S%.3f"), line))
        } else {
            Some(line)
        }
    }
}

impl Frontend<SparklineChart> for PlainOutput {
    fn render(&mut self, app: &App<SparklineChart>, event: &AppEvent) -> anyhow::Result<()> {
        if let Some(line) = self.format_event(app, event) {
            println!("{}", line);
        }
        Ok(())
    }
}

pub fn write_summary<W: Write>(out: &mut W, format: SummaryFormat, record: &SummaryRecord) -> Result<()> {
    match format {
        SummaryFormat::Text => {
            writeln!(out, "\n--- {} probe statistics ---", record.host)?;
            writeln!(
                out,
                "{} probes sent, {} completed, {:.1}% failed",
                record.probes_sent, record.probes_received, record.loss_percent
            )?;
            if record.probes_received > 0 {
                writeln!(
                    out,
                    "latency min/avg/max = {:.2}/{:.2}/{:.2} ms",
                    record.latency_min_ms, record.latency_avg_ms, record.latency_max_ms
                )?;
            }
        }
        SummaryFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, record)?;
            writeln!(out)?;
        }
        SummaryFormat::Csv => {
            let mut writer = csv::Writer::from_writer(&mut *out);
            writer.serialize(record)?;
            writer.flush()?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::error::ProbeError;
    use crate::target::ProbeOutcome;
    use chrono::TimeZone;
    use std::time::Duration;

    fn record() -> SummaryRecord {
        SummaryRecord {
            host: "example.com".into(),
            probes_sent: 4,
            probes_received: 3,
            loss_percent: 25.0,
            latency_min_ms: 20.0,
            latency_avg_ms: 60.0,
            latency_max_ms: 120.0,
        }
    }

    fn app() -> App<SparklineChart> {
        let mut config = Config::default();
        config.seed = Some(5);
        App::new(&config, "example.com", SparklineChart::new())
    }

    #[test]
    fn test_text_summary() {
        let mut out = Vec::new();
        write_summary(&mut out, SummaryFormat::Text, &record()).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("--- example.com probe statistics ---"));
        assert!(text.contains("4 probes sent, 3 completed, 25.0% failed"));
        assert!(text.contains("latency min/avg/max = 20.00/60.00/120.00 ms"));
    }

    #[test]
    fn test_json_summary() {
        let mut out = Vec::new();
        write_summary(&mut out, SummaryFormat::Json, &record()).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(value["host"], "example.com");
        assert_eq!(value["probes_received"], 3);
        assert_eq!(value["latency_max_ms"], 120.0);
    }

    #[test]
    fn test_csv_summary_has_header_and_row() {
        let mut out = Vec::new();
        write_summary(&mut out, SummaryFormat::Csv, &record()).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("host,probes_sent,probes_received,loss_percent,latency_min_ms,latency_avg_ms,latency_max_ms")
        );
        assert_eq!(lines.next(), Some("example.com,4,3,25.0,20.0,60.0,120.0"));
    }

    #[test]
    fn test_probe_lines() {
        colored::control::set_override(false);
        let output = PlainOutput::new("example.com", false, false);
        let mut app = app();

        let ok = AppEvent::Probe(ProbeOutcome::success(0, Local::now(), Duration::from_millis(42)));
        app.handle(&ok);
        let line = output.format_event(&app, &ok).unwrap();
        assert!(line.starts_with("probe to example.com: seq=0 time=42 ms Online [good]"));

        let failed = AppEvent::Probe(ProbeOutcome::failure(1, Local::now(), ProbeError::Timeout));
        app.handle(&failed);
        let line = output.format_event(&app, &failed).unwrap();
        assert_eq!(line, "probe to example.com failed (seq=1): Gagal Offline (Timeout)");
    }

    #[test]
    fn test_timestamp_is_probe_start_time() {
        colored::control::set_override(false);
        let output = PlainOutput::new("example.com", false, true);
        let mut app = app();

        let started_at = Local.with_ymd_and_hms(2024, 5, 1, 9, 5, 7).unwrap();
        let ok = AppEvent::Probe(ProbeOutcome::success(3, started_at, Duration::from_millis(80)));
        app.handle(&ok);
        let line = output.format_event(&app, &ok).unwrap();
        assert!(line.starts_with("[09:05:07.000] probe to example.com: seq=3 time=80 ms"));
    }

    #[test]
    fn test_quiet_keeps_speed_test_results() {
        colored::control::set_override(false);
        let output = PlainOutput::new("example.com", true, false);
        let mut app = app();

        let ok = AppEvent::Probe(ProbeOutcome::success(0, Local::now(), Duration::from_millis(42)));
        app.handle(&ok);
        assert!(output.format_event(&app, &ok).is_none());

        let download = AppEvent::Speed(SpeedTimer::DownloadElapsed);
        let upload = AppEvent::Speed(SpeedTimer::UploadElapsed);
        app.handle(&AppEvent::StartSpeedTest);
        app.handle(&download);
        let line = output.format_event(&app, &download).unwrap();
        assert!(line.starts_with("download: ") && line.ends_with(" Mbps"));
        app.handle(&upload);
        let line = output.format_event(&app, &upload).unwrap();
        assert!(line.starts_with("upload: ") && line.ends_with(" Mbps"));
    }

    #[test]
    fn test_rejected_press_prints_nothing() {
        let output = PlainOutput::new("example.com", false, false);
        let mut app = app();

        app.handle(&AppEvent::StartSpeedTest);
        assert!(output.format_event(&app, &AppEvent::StartSpeedTest).is_some());

        app.handle(&AppEvent::Speed(SpeedTimer::DownloadElapsed));
        app.handle(&AppEvent::StartSpeedTest);
        assert!(output.format_event(&app, &AppEvent::StartSpeedTest).is_none());
    }
}
