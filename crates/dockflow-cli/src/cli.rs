use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "DockFlow Developers",
    version,
    about = "DockFlow CLI - Runs resumable multi-receptor, multi-ligand virtual-screening campaigns and merges the scores into a composite ranking.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Set the number of threads for parallel complex processing.
    /// Defaults to the number of available logical cores.
    #[arg(short = 'j', long, global = true, value_name = "NUM")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run or resume a screening campaign rooted at a base directory.
    Dock(DockArgs),
    /// Show the step position of every complex recorded in the campaign snapshot.
    Status(StatusArgs),
}

/// Arguments for the `dock` subcommand.
#[derive(Args, Debug)]
pub struct DockArgs {
    /// Base directory of the campaign (input structures, work directories,
    /// snapshot, and result tables all live under it).
    #[arg(short, long, default_value = ".", value_name = "PATH")]
    pub base: PathBuf,

    /// Path to the workflow configuration file in TOML format.
    /// Defaults to `dockflow.workflow.toml` inside the base directory; when
    /// no file exists a default is generated there for review.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Process complexes on the worker pool, overriding the config file.
    #[arg(long)]
    pub parallel: bool,

    /// Disable the periodic queue reporter, overriding the config file.
    #[arg(long)]
    pub no_report: bool,
}

/// Arguments for the `status` subcommand.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Base directory of the campaign.
    #[arg(short, long, default_value = ".", value_name = "PATH")]
    pub base: PathBuf,

    /// Workflow configuration file; resolved as for `dock`, but never
    /// generated by this command.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn dock_defaults_to_current_directory() {
        let cli = Cli::parse_from(["dockflow", "dock"]);
        match cli.command {
            Commands::Dock(args) => {
                assert_eq!(args.base, PathBuf::from("."));
                assert!(args.config.is_none());
                assert!(!args.parallel);
            }
            _ => panic!("expected the dock subcommand"),
        }
    }
}
