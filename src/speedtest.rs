use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time;
use tracing::info;

/// Inclusive range for one simulated result, in Mbps.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MbpsRange {
    pub min: f64,
    pub max: f64,
}

impl MbpsRange {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Uniform draw in the range, rounded to two decimals.
    pub fn sample<R: Rng>(&self, rng: &mut R) -> f64 {
        let raw = rng.gen_range(self.min..=self.max);
        ((raw * 100.0).round() / 100.0).clamp(self.min, self.max)
    }
}

pub const DOWNLOAD_RANGE: MbpsRange = MbpsRange::new(50.0, 95.0);
pub const UPLOAD_RANGE: MbpsRange = MbpsRange::new(10.0, 30.0);
pub const DOWNLOAD_DELAY: Duration = Duration::from_millis(3000);
pub const UPLOAD_DELAY: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedPhase {
    Idle,
    Downloading,
    Uploading,
}

/// Timer events that move the simulation forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedTimer {
    DownloadElapsed,
    UploadElapsed,
}

/// Visible effect of a transition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpeedUpdate {
    Started,
    Download(f64),
    Upload(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpeedProfile {
    pub download: MbpsRange,
    pub upload: MbpsRange,
    #[serde(rename = "download_delay_ms", with = "millis")]
    pub download_delay: Duration,
    #[serde(rename = "upload_delay_ms", with = "millis")]
    pub upload_delay: Duration,
}

impl Default for SpeedProfile {
    fn default() -> Self {
        Self {
            download: DOWNLOAD_RANGE,
            upload: UPLOAD_RANGE,
            download_delay: DOWNLOAD_DELAY,
            upload_delay: UPLOAD_DELAY,
        }
    }
}

/// Idle -> Downloading -> Uploading -> Idle. Cannot be cancelled and cannot fail.
pub struct SpeedSimulator<R: Rng> {
    phase: SpeedPhase,
    profile: SpeedProfile,
    rng: R,
}

impl<R: Rng> SpeedSimulator<R> {
    pub fn new(profile: SpeedProfile, rng: R) -> Self {
        Self {
            phase: SpeedPhase::Idle,
            profile,
            rng,
        }
    }

    pub fn phase(&self) -> SpeedPhase {
        self.phase
    }

    pub fn profile(&self) -> &SpeedProfile {
        &self.profile
    }

    pub fn trigger_enabled(&self) -> bool {
        self.phase == SpeedPhase::Idle
    }

    /// The user pressed the trigger. Ignored unless idle.
    pub fn press(&mut self) -> Option<SpeedUpdate> {
        if self.phase != SpeedPhase::Idle {
            return None;
        }
        self.phase = SpeedPhase::Downloading;
        info!("speed test started");
        Some(SpeedUpdate::Started)
    }

    /// Applies a timer event; events that do not match the phase are dropped.
    pub fn on_timer(&mut self, timer: SpeedTimer) -> Option<SpeedUpdate> {
        match (self.phase, timer) {
            (SpeedPhase::Downloading, SpeedTimer::DownloadElapsed) => {
                let mbps = self.profile.download.sample(&mut self.rng);
                self.phase = SpeedPhase::Uploading;
                info!(download_mbps = mbps, "download phase finished");
                Some(SpeedUpdate::Download(mbps))
            }
            (SpeedPhase::Uploading, SpeedTimer::UploadElapsed) => {
                let mbps = self.profile.upload.sample(&mut self.rng);
                self.phase = SpeedPhase::Idle;
                info!(upload_mbps = mbps, "speed test finished");
                Some(SpeedUpdate::Upload(mbps))
            }
            _ => None,
        }
    }
}

/// Arms both timers for one run. Once spawned it always runs to the end;
/// a closed receiver just swallows the events.
pub async fn drive_timers<T: From<SpeedTimer>>(profile: SpeedProfile, tx: mpsc::UnboundedSender<T>) {
    time::sleep(profile.download_delay).await;
    let _ = tx.send(SpeedTimer::DownloadElapsed.into());
    time::sleep(profile.upload_delay).await;
    let _ = tx.send(SpeedTimer::UploadElapsed.into());
}

pub fn format_mbps(mbps: f64) -> String {
    format!("{:.2} Mbps", mbps)
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
