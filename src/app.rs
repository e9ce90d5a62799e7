use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::chart::{ChartRenderer, ChartSink, ChartSpec, Sample};
use crate::config::Config;
use crate::speedtest::{self, format_mbps, SpeedPhase, SpeedSimulator, SpeedTimer, SpeedUpdate};
use crate::stats::{SessionStats, SummaryRecord};
use crate::status::{Severity, StatusView};
use crate::target::ProbeOutcome;

/// Shown in both result fields while a speed test is running.
pub const PENDING_TEXT: &str = "...";

/// Everything the frontends draw, apart from the chart.
#[derive(Debug, Clone, PartialEq)]
pub struct Display {
    pub ping_text: String,
    pub ping_indicator: String,
    pub severity: Option<Severity>,
    pub download_text: String,
    pub upload_text: String,
    pub progress_visible: bool,
    pub trigger_enabled: bool,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            ping_text: "--".to_string(),
            ping_indicator: "Checking".to_string(),
            severity: None,
            download_text: "-".to_string(),
            upload_text: "-".to_string(),
            progress_visible: false,
            trigger_enabled: true,
        }
    }
}

#[derive(Debug)]
pub enum AppEvent {
    Probe(ProbeOutcome),
    Speed(SpeedTimer),
    StartSpeedTest,
    Redraw,
    Quit,
}

impl From<SpeedTimer> for AppEvent {
    fn from(timer: SpeedTimer) -> Self {
        AppEvent::Speed(timer)
    }
}

/// What the event loop has to do after an event was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    ArmSpeedTimers,
    Quit,
}

/// Draws the app after every event.
pub trait Frontend<C: ChartRenderer> {
    fn render(&mut self, app: &App<C>, event: &AppEvent) -> anyhow::Result<()>;
}

/// Dashboard state. Only the event loop touches it.
pub struct App<C: ChartRenderer> {
    host: String,
    display: Display,
    chart: ChartSink<C>,
    speed: SpeedSimulator<StdRng>,
    stats: SessionStats,
    quit_after_speed_test: bool,
}

impl<C: ChartRenderer> App<C> {
    pub fn new(config: &Config, host: impl Into<String>, renderer: C) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Self {
            host: host.into(),
            display: Display::default(),
            chart: ChartSink::init(renderer, ChartSpec::default(), config.chart_capacity),
            speed: SpeedSimulator::new(config.speed, rng),
            stats: SessionStats::new(),
            quit_after_speed_test: false,
        }
    }

    /// Ends the loop as soon as one speed test has finished.
    pub fn quit_after_speed_test(mut self, enabled: bool) -> Self {
        self.quit_after_speed_test = enabled;
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn display(&self) -> &Display {
        &self.display
    }

    pub fn chart(&self) -> &ChartSink<C> {
        &self.chart
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn speed_phase(&self) -> SpeedPhase {
        self.speed.phase()
    }

    pub fn summary(&self) -> SummaryRecord {
        self.stats.summary(&self.host)
    }

    pub fn handle(&mut self, event: &AppEvent) -> Control {
        match event {
            AppEvent::Probe(outcome) => {
                self.apply_probe(outcome);
                Control::Continue
            }
            AppEvent::StartSpeedTest => match self.speed.press() {
                Some(update) => {
                    self.apply_speed(update);
                    Control::ArmSpeedTimers
                }
                None => {
                    debug!("speed test already running, ignoring trigger");
                    Control::Continue
                }
            },
            AppEvent::Speed(timer) => match self.speed.on_timer(*timer) {
                Some(update) => {
                    self.apply_speed(update);
                    if self.quit_after_speed_test && self.speed.phase() == SpeedPhase::Idle {
                        Control::Quit
                    } else {
                        Control::Continue
                    }
                }
                None => Control::Continue,
            },
            AppEvent::Redraw => Control::Continue,
            AppEvent::Quit => Control::Quit,
        }
    }

    fn apply_probe(&mut self, outcome: &ProbeOutcome) {
        let latency = outcome.latency_ms();
        debug!(seq = outcome.seq, latency_ms = outcome.latency_or_sentinel(), "applying probe outcome");
        match outcome.rtt {
            Some(rtt) if outcome.is_success() => self.stats.update_with_success(outcome.seq, rtt),
            _ => self.stats.update_with_failure(outcome.seq),
        }

        let view = StatusView::render(latency);
        self.display.ping_text = view.text;
        self.display.ping_indicator = view.label.to_string();
        self.display.severity = Some(view.severity);

        if let Some(ms) = latency {
            self.chart.append(Sample::now(ms));
        }
    }

    fn apply_speed(&mut self, update: SpeedUpdate) {
        match update {
            SpeedUpdate::Started => {
                self.display.progress_visible = true;
                self.display.download_text = PENDING_TEXT.to_string();
                self.display.upload_text = PENDING_TEXT.to_string();
            }
            SpeedUpdate::Download(mbps) => {
                self.display.download_text = format_mbps(mbps);
            }
            SpeedUpdate::Upload(mbps) => {
                self.display.upload_text = format_mbps(mbps);
                self.display.progress_visible = false;
            }
        }
        self.display.trigger_enabled = self.speed.trigger_enabled();
    }
}

/// Runs until a quit event, or until the probe channel closes.
///
/// Probe results and user/timer events are applied one at a time, and the
/// frontend redraws after each of them.
pub async fn run<C, F>(
    app: &mut App<C>,
    frontend: &mut F,
    mut probes: mpsc::Receiver<ProbeOutcome>,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    mut events: mpsc::UnboundedReceiver<AppEvent>,
) -> anyhow::Result<()>
where
    C: ChartRenderer,
    F: Frontend<C>,
{
    info!(host = %app.host(), "event loop started");

    loop {
        let event = tokio::select! {
            outcome = probes.recv() => match outcome {
                Some(outcome) => AppEvent::Probe(outcome),
                None => {
                    debug!("probe channel closed");
                    break;
                }
            },
            Some(event) = events.recv() => event,
        };

        let control = app.handle(&event);
        frontend.render(app, &event)?;

        match control {
            Control::Continue => {}
            Control::ArmSpeedTimers => {
                tokio::spawn(speedtest::drive_timers(*app.speed.profile(), events_tx.clone()));
            }
            Control::Quit => break,
        }
    }

    info!(host = %app.host(), "event loop stopped");
    Ok(())
}
