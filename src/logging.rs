use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging.
///
/// The level comes from `RUST_LOG` when set. Without it, plain mode logs
/// warnings to stderr and a log file gets `info`. The dashboard owns the
/// screen, so without a log file it logs nothing at all.
pub fn init_logging(log_file: Option<&Path>, plain: bool) -> io::Result<()> {
    let default_level = match (log_file, plain) {
        (Some(_), _) => "info",
        (None, true) => "warn",
        (None, false) => "off",
    };
    let filter = if log_file.is_none() && !plain {
        EnvFilter::new("off")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let registry = tracing_subscriber::registry().with(filter);
    match log_file {
        Some(path) => {
            let file = File::create(path)?;
            registry
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .init();
        }
        None => {
            registry
                .with(fmt::layer().with_target(false).with_writer(io::stderr))
                .init();
        }
    }
    Ok(())
}
