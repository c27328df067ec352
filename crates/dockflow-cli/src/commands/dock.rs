use crate::cli::DockArgs;
use crate::error::Result;
use crate::ui::CliProgressHandler;
use dockflow::engine::config::{ConfigSource, DEFAULT_WORKFLOW_FILE, PipelineConfig};
use dockflow::engine::progress::ProgressReporter;
use dockflow::workflows;
use std::fs;
use tracing::info;

pub fn run(args: DockArgs) -> Result<()> {
    fs::create_dir_all(&args.base)?;
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| args.base.join(DEFAULT_WORKFLOW_FILE));

    let mut config = match PipelineConfig::load_or_init(&config_path)? {
        ConfigSource::Loaded(config) => config,
        ConfigSource::Generated(path) => {
            println!("No workflow configuration was found.");
            println!("A default file was generated at: {}", path.display());
            println!(
                "Review it (engine executable, grid parameters, ranking columns) and rerun."
            );
            return Ok(());
        }
    };
    info!(path = %config_path.display(), "Workflow configuration loaded.");

    if args.parallel {
        config.user.multiprocessing = true;
    }
    if args.no_report {
        config.user.report_flag = false;
    }

    let handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(handler.callback());

    println!(
        "Starting screening campaign in {}...",
        args.base.display()
    );
    let output = workflows::screen::run(&args.base, &config, reporter)?;

    println!(
        "Campaign finished: {} receptor(s) x {} ligand(s), {}/{} complexes completed.",
        output.receptors, output.ligands, output.complexes_terminal, output.complexes_total
    );
    if output.complexes_terminal < output.complexes_total {
        println!("Rerun the same command to retry the remaining complexes.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use tempfile::tempdir;

    fn dock_args(base: &Path) -> DockArgs {
        DockArgs {
            base: base.to_path_buf(),
            config: None,
            parallel: false,
            no_report: true,
        }
    }

    #[test]
    fn first_run_generates_a_config_and_stops_for_review() {
        let dir = tempdir().unwrap();
        run(dock_args(dir.path())).unwrap();

        assert!(dir.path().join(DEFAULT_WORKFLOW_FILE).exists());
        // Nothing ran: no snapshot was written.
        assert!(!dir.path().join("dockflow.progress.bin").exists());
    }

    #[cfg(unix)]
    #[test]
    fn second_run_executes_the_campaign() {
        let dir = tempdir().unwrap();
        run(dock_args(dir.path())).unwrap();

        // Point the generated config at a stub engine before rerunning.
        let config_path = dir.path().join(DEFAULT_WORKFLOW_FILE);
        let mut config = match PipelineConfig::load_or_init(&config_path).unwrap() {
            ConfigSource::Loaded(config) => config,
            ConfigSource::Generated(_) => panic!("config should exist after the first run"),
        };
        config.user.engine.executable = "true".to_string();
        config.user.report_flag = false;
        fs::write(&config_path, toml::to_string_pretty(&config).unwrap()).unwrap();

        run(dock_args(dir.path())).unwrap();
        assert!(dir.path().join("dockflow.progress.bin").exists());
    }

    #[test]
    fn explicit_config_path_is_respected() {
        let dir = tempdir().unwrap();
        let custom = dir.path().join("custom.toml");
        let args = DockArgs {
            base: dir.path().to_path_buf(),
            config: Some(custom.clone()),
            parallel: false,
            no_report: true,
        };
        run(args).unwrap();
        assert!(custom.exists());
        assert!(!dir.path().join(PathBuf::from(DEFAULT_WORKFLOW_FILE)).exists());
    }
}
