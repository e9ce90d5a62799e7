use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::output::SummaryFormat;
use crate::probe::OverlapPolicy;

#[derive(Parser, Debug)]
#[command(author, version, about = "Latency probe dashboard with a simulated speed test", long_about = None)]
pub struct Cli {
    /// Endpoint to probe (http or https)
    #[arg(short = 'u', long)]
    pub url: Option<String>,

    /// Time between probes in milliseconds
    #[arg(short = 'p', long)]
    pub period: Option<u64>,

    /// Per-request timeout in milliseconds (none by default)
    #[arg(short = 'w', long)]
    pub timeout: Option<u64>,

    /// Stop after this many probes
    #[arg(short = 'c', long)]
    pub count: Option<u32>,

    /// What to do when a probe is still running at the next tick
    #[arg(long, value_enum)]
    pub overlap: Option<OverlapPolicy>,

    /// Number of samples kept on the chart
    #[arg(long)]
    pub capacity: Option<usize>,

    /// Seed for the simulated speed test
    #[arg(long)]
    pub seed: Option<u64>,

    /// Read settings from a JSON file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Print one line per event instead of the dashboard
    #[arg(long)]
    pub plain: bool,

    /// Plain mode: hide per-probe lines
    #[arg(short, long)]
    pub quiet: bool,

    /// Plain mode: show timestamps
    #[arg(short = 'T', long)]
    pub timestamp: bool,

    /// Session summary format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: SummaryFormat,

    /// Write logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Live dashboard (default)
    Dashboard,

    /// Run one simulated speed test and exit
    Speedtest,
}

impl Cli {
    /// Plain output is used for `--plain` and for the one-shot speed test.
    pub fn is_plain(&self) -> bool {
        self.plain || self.command == Some(Commands::Speedtest)
    }
}
