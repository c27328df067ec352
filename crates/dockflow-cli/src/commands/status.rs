use crate::cli::StatusArgs;
use crate::error::{CliError, Result};
use dockflow::engine::config::{DEFAULT_WORKFLOW_FILE, PipelineConfig, UserSettings};
use dockflow::workflows;
use std::fs;

pub fn run(args: StatusArgs) -> Result<()> {
    // Unlike `dock`, this never generates a config file: an absent file just
    // means default settings.
    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| args.base.join(DEFAULT_WORKFLOW_FILE));
    let settings = if config_path.is_file() {
        let raw = fs::read_to_string(&config_path)?;
        let config: PipelineConfig = toml::from_str(&raw).map_err(|e| {
            CliError::Config(format!(
                "malformed workflow file '{}': {}",
                config_path.display(),
                e
            ))
        })?;
        config.user
    } else {
        UserSettings::default()
    };

    match workflows::screen::status(&args.base, &settings)? {
        None => println!("No campaign has run in {} yet.", args.base.display()),
        Some(report) => {
            let mut printed = false;
            for (uid, complexes) in &report.plugins {
                if complexes.is_empty() {
                    continue;
                }
                printed = true;
                println!("{}: {} complex(es)", uid, complexes.len());
                for (id, position) in complexes {
                    println!("  {:<40} {}", id, position);
                }
            }
            if !printed {
                println!("A campaign snapshot exists but holds no complexes yet.");
            }
        }
    }
    Ok(())
}
