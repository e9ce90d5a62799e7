mod app;
mod chart;
mod cli;
mod config;
mod error;
mod logging;
mod output;
mod probe;
mod speedtest;
mod stats;
mod status;
mod target;
mod ui;

use anyhow::Result;
use app::{App, AppEvent};
use chart::SparklineChart;
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use config::Config;
use output::{print_probe_start, write_summary, PlainOutput};
use probe::{HttpTransport, Prober};
use std::io;
use std::process;
use target::ProbeTarget;
use tokio::sync::mpsc;
use tracing::info;
use ui::{Dashboard, TerminalChart};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_file.as_deref(), cli.is_plain())?;

    let config = match Config::resolve(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", format!("Error: {}", e).red());
            process::exit(1);
        }
    };
    let target = ProbeTarget::parse(&config.endpoint)?;
    let speed_only = cli.command == Some(Commands::Speedtest);

    // Channel for collecting probe outcomes
    let (probe_tx, probe_rx) = mpsc::channel(100);
    let (events_tx, events_rx) = mpsc::unbounded_channel();

    // The one-shot speed test runs without probes, but the channel has to stay
    // open or the event loop would stop right away.
    let _idle_probe_tx = if speed_only {
        events_tx.send(AppEvent::StartSpeedTest)?;
        Some(probe_tx)
    } else {
        let transport = match HttpTransport::new(config.probe_timeout()) {
            Ok(transport) => transport,
            Err(e) => {
                eprintln!("{}", format!("Error: {}", e).red());
                process::exit(1);
            }
        };
        let prober = Prober::new(transport, target.clone(), config.probe_interval(), config.overlap);
        tokio::spawn(prober.run(config.probe_count, probe_tx));
        None
    };

    info!(endpoint = %target.url, interval_ms = config.probe_interval_ms, overlap = ?config.overlap, "starting");

    let summary = if cli.is_plain() {
        let quit_tx = events_tx.clone();
        ctrlc::set_handler(move || {
            let _ = quit_tx.send(AppEvent::Quit);
        })?;

        if !cli.quiet && !speed_only {
            print_probe_start(&target, config.probe_interval_ms);
        }

        let mut app = App::new(&config, target.name.clone(), SparklineChart::new()).quit_after_speed_test(speed_only);
        let mut frontend = PlainOutput::new(target.name.clone(), cli.quiet, cli.timestamp);
        app::run(&mut app, &mut frontend, probe_rx, events_tx, events_rx).await?;
        app.summary()
    } else {
        let mut app = App::new(&config, target.name.clone(), TerminalChart::new());
        let mut dashboard = Dashboard::enter()?;
        ui::spawn_key_reader(events_tx.clone());

        let result = app::run(&mut app, &mut dashboard, probe_rx, events_tx, events_rx).await;
        dashboard.restore()?;
        result?;
        app.summary()
    };

    if !speed_only {
        write_summary(&mut io::stdout(), cli.format, &summary)?;
    }

    Ok(())
}
