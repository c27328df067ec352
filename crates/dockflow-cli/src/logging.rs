//! Log initialization for the DockFlow CLI.
//!
//! Logs go to stderr so that progress bars and result summaries on stdout
//! stay clean. An optional file sink records a more verbose copy, with
//! targets and line numbers, for post-mortem reading of long campaigns.

use crate::error::Result;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

/// Maps the CLI flags to the console level. `--quiet` keeps errors visible
/// rather than silencing everything: a failed campaign must still say why.
fn console_level(verbosity: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::ERROR;
    }
    match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    }
}

pub fn setup_logging(verbosity: u8, quiet: bool, log_file: Option<PathBuf>) -> Result<()> {
    let console = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact();

    let registry = tracing_subscriber::registry()
        .with(console_level(verbosity, quiet))
        .with(console);

    match log_file {
        Some(path) => {
            let sink = File::create(&path)?;
            let file_layer = fmt::layer()
                .with_writer(sink)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;
    use serial_test::serial;
    use tracing::{info, warn};

    #[test]
    fn quiet_keeps_errors_and_verbosity_escalates() {
        assert_eq!(console_level(3, true), LevelFilter::ERROR);
        assert_eq!(console_level(0, false), LevelFilter::WARN);
        assert_eq!(console_level(1, false), LevelFilter::INFO);
        assert_eq!(console_level(2, false), LevelFilter::DEBUG);
        assert_eq!(console_level(9, false), LevelFilter::TRACE);
    }

    #[test]
    #[serial]
    fn file_sink_captures_events_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campaign.log");

        let sink = File::create(&path).unwrap();
        let layer = fmt::layer()
            .with_writer(sink)
            .with_ansi(false)
            .with_target(true)
            .with_line_number(true);
        tracing::subscriber::with_default(tracing_subscriber::registry().with(layer), || {
            warn!("ligand directory is empty");
        });

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("ligand directory is empty"));
        assert!(content.contains("WARN"));
    }

    #[test]
    #[serial]
    fn global_initialization_succeeds_once() {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| setup_logging(2, false, None).expect("logger setup"));
        info!("logger is live");
    }

    #[test]
    #[serial]
    fn unwritable_log_file_is_an_io_error() {
        // Creating the sink fails before any global state is touched.
        if cfg!(unix) {
            let result = setup_logging(0, false, Some(PathBuf::from("/")));
            assert!(matches!(result, Err(CliError::Io(_))));
        }
    }
}
