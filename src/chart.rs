use chrono::{Local, Timelike};
use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 20;
/// Largest window the config accepts.
pub const MAX_CAPACITY: usize = 10_000;

/// One successful probe as it appears on the chart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub time_label: String,
    pub latency_ms: u64,
}

impl Sample {
    pub fn new(time_label: impl Into<String>, latency_ms: u64) -> Self {
        Self {
            time_label: time_label.into(),
            latency_ms,
        }
    }

    /// Stamps the sample with the current local time.
    pub fn now(latency_ms: u64) -> Self {
        Self::new(time_label(&Local::now()), latency_ms)
    }
}

/// `H:M:S` without zero padding, e.g. `9:5:7`.
pub fn time_label<T: Timelike>(time: &T) -> String {
    format!("{}:{}:{}", time.hour(), time.minute(), time.second())
}

/// Fixed-capacity FIFO window of the most recent samples.
#[derive(Debug, Clone)]
pub struct ChartBuffer {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl ChartBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity.min(MAX_CAPACITY)),
            capacity,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        self.samples.push_back(sample);
        while self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.samples.iter().map(|s| s.time_label.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = u64> + '_ {
        self.samples.iter().map(|s| s.latency_ms)
    }

    pub fn max_value(&self) -> Option<u64> {
        self.values().max()
    }
}

/// Static description of the chart handed to the renderer once.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartSpec {
    pub series_label: String,
    pub y_title: String,
    pub x_title: String,
}

impl Default for ChartSpec {
    fn default() -> Self {
        Self {
            series_label: "Latency (ms)".to_string(),
            y_title: "Milliseconds (ms)".to_string(),
            x_title: "Time".to_string(),
        }
    }
}

/// Something that can draw the latency series.
pub trait ChartRenderer {
    fn init(&mut self, spec: &ChartSpec);

    /// Called after every buffer mutation with the whole window.
    fn update(&mut self, buffer: &ChartBuffer);
}

/// Owns the sample window and the renderer that shows it.
pub struct ChartSink<R: ChartRenderer> {
    buffer: ChartBuffer,
    renderer: R,
    spec: ChartSpec,
}

impl<R: ChartRenderer> ChartSink<R> {
    pub fn init(mut renderer: R, spec: ChartSpec, capacity: usize) -> Self {
        renderer.init(&spec);
        Self {
            buffer: ChartBuffer::new(capacity),
            renderer,
            spec,
        }
    }

    pub fn append(&mut self, sample: Sample) {
        self.buffer.push(sample);
        self.renderer.update(&self.buffer);
    }

    pub fn buffer(&self) -> &ChartBuffer {
        &self.buffer
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn spec(&self) -> &ChartSpec {
        &self.spec
    }
}

const SPARK_LEVELS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Plain-mode renderer: keeps a one-line sparkline of the window.
#[derive(Debug, Default)]
pub struct SparklineChart {
    line: String,
}

impl SparklineChart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self) -> &str {
        &self.line
    }
}

impl ChartRenderer for SparklineChart {
    fn init(&mut self, _spec: &ChartSpec) {
        self.line.clear();
    }

    fn update(&mut self, buffer: &ChartBuffer) {
        if buffer.is_empty() {
            self.line.clear();
            return;
        }
        // y axis starts at zero, so scale against the max only
        let max = buffer.max_value().unwrap_or(0).max(1);
        let top = SPARK_LEVELS.len() as u64 - 1;
        self.line = buffer
            .values()
            .map(|v| SPARK_LEVELS[(v * top / max) as usize])
            .collect();
    }
}
