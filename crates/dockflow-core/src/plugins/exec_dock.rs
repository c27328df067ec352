//! Generic external docking engine adapter (`docking` stage).
//!
//! Drives every receptor x ligand complex through the step sequence
//! `prepare -> configure -> dock -> analyse -> finalise`. The engine itself
//! is an external command-line collaborator described entirely by
//! [`EngineSettings`]: an executable plus an argv template with
//! `{receptor}`, `{ligand}`, `{config}`, and `{out}` placeholders.
//!
//! Every step handler is idempotent with respect to its own outputs: inputs
//! are copied only when absent, the engine config is written only when
//! absent, and docking is skipped when the pose file already exists. That is
//! what makes an interrupted campaign resumable: a re-run walks the same
//! steps and only redoes the work whose artifacts are missing.
//!
//! After the dispatch queue drains, the pooled per-complex score tables are
//! concatenated, ranked by the composite ranker, and exported as the
//! `All-Ranked` and `Top-Ranked` CSV reports.

use crate::core::io::table::write_csv;
use crate::core::models::complex::{Complex, ComplexId};
use crate::core::models::entity::EntityKind;
use crate::core::ranking::composite::{COMPOSITE_RANK, COMPOSITE_SCORE, rank_composite};
use crate::core::ranking::{Cell, ScoreTable};
use crate::core::steps::StepSequence;
use crate::engine::config::EngineSettings;
use crate::engine::context::PipelineContext;
use crate::engine::dispatch::TaskDispatcher;
use crate::engine::error::EngineError;
use crate::engine::plugin::{Plugin, PluginIdentity, PluginInit};
use crate::engine::progress::Progress;
use crate::plugins::scan_structures;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, instrument, warn};

pub const STEP_NAMES: [&str; 5] = ["prepare", "configure", "dock", "analyse", "finalise"];

/// Artifact key under which the parsed per-complex score table attaches.
pub const SCORES_ARTIFACT: &str = "scores";

pub const SCORE_COLUMNS: [&str; 4] = ["mode", "affinity", "rmsd_lb", "rmsd_ub"];

pub fn step_sequence() -> StepSequence {
    StepSequence::new(STEP_NAMES).expect("static step sequence is valid")
}

pub struct ExecDock {
    init: PluginInit,
    sequence: StepSequence,
}

impl ExecDock {
    pub const IDENTITY: PluginIdentity = PluginIdentity {
        name: "External Docking Engine",
        uid: "execdock",
        version: "1.0",
        assignments: &["docking"],
    };

    pub fn construct(init: PluginInit) -> Box<dyn Plugin> {
        Box::new(Self {
            init,
            sequence: step_sequence(),
        })
    }

    fn docking_dir(&self, ctx: &PipelineContext) -> PathBuf {
        ctx.paths.docking.join(Self::IDENTITY.uid)
    }

    /// Concatenates the per-complex score tables, ranks them, and exports
    /// the result tables. Quietly does nothing when no results exist yet.
    #[instrument(skip_all, name = "tabulate_results")]
    fn finalise_results(&self, ctx: &mut PipelineContext) -> Result<(), EngineError> {
        let spec = ctx.settings.rank_spec();
        let group_key = ctx.settings.ranking_group_key.clone();
        let results_dir = ctx.paths.results.clone();

        let Some(progress) = ctx.plugin_progress(Self::IDENTITY.uid) else {
            return Ok(());
        };

        let mut combined: Option<ScoreTable> = None;
        for complex in progress.complexes.values() {
            let Some(scores) = complex.artifact(SCORES_ARTIFACT) else {
                continue;
            };
            if scores.is_empty() {
                continue;
            }
            let mut table = scores.clone();
            table.add_constant_column("rec_uid", Cell::Text(complex.receptor_uid.clone()));
            table.add_constant_column("lig_uid", Cell::Text(complex.ligand_uid.clone()));
            table.add_constant_column("complex_uid", Cell::Text(complex.uid.to_string()));
            match &mut combined {
                None => combined = Some(table),
                Some(all) => {
                    if !all.concat(&table) {
                        warn!(complex = %complex.uid, "Score table schema mismatch; skipped.");
                    }
                }
            }
        }
        let Some(combined) = combined else {
            debug!("No results were found to be concatenated.");
            return Ok(());
        };

        let Some(outcome) = rank_composite(&combined, &spec, &group_key) else {
            warn!("Ranking produced no output; result tables not exported.");
            return Ok(());
        };

        let mut order: Vec<&str> = vec![COMPOSITE_RANK, COMPOSITE_SCORE];
        for (column, _) in spec.columns() {
            order.push(column);
        }
        order.extend(["mode", "rec_uid", "lig_uid", "complex_uid"]);

        let all_ranked = outcome.all_ranked.select_columns(&order);
        let top_ranked = outcome.top_per_group.select_columns(&order);

        fs::create_dir_all(&results_dir)?;
        let rename = result_header_renames();
        let uid = Self::IDENTITY.uid;
        let all_path = results_dir.join(format!("Results.{uid}.all-ranked.csv"));
        let top_path = results_dir.join(format!("Results.{uid}.top-ranked.csv"));
        write_csv(&all_ranked, &all_path, &rename)
            .map_err(|e| export_error(&all_path, e))?;
        write_csv(&top_ranked, &top_path, &rename)
            .map_err(|e| export_error(&top_path, e))?;

        info!(
            all = %all_path.display(),
            top = %top_path.display(),
            rows = all_ranked.num_rows(),
            "Ranked result tables exported."
        );
        Ok(())
    }
}

impl Plugin for ExecDock {
    fn identity(&self) -> &PluginIdentity {
        &Self::IDENTITY
    }

    fn boot(&mut self, ctx: &mut PipelineContext) -> Result<(), EngineError> {
        debug!(stage = %self.init.current_stage, "ExecDock booting.");
        fs::create_dir_all(self.docking_dir(ctx))?;
        fs::create_dir_all(&ctx.paths.results)?;

        let receptors = scan_structures(&ctx.paths.receptors, EntityKind::Receptor)?;
        let ligands = scan_structures(&ctx.paths.ligands, EntityKind::Ligand)?;

        let progress = ctx.plugin_progress_mut(Self::IDENTITY.uid);
        progress.receptors = receptors;
        progress.ligands = ligands;
        info!(
            receptors = progress.receptors.len(),
            ligands = progress.ligands.len(),
            complexes_restored = progress.complexes.len(),
            "ExecDock initialized."
        );
        ctx.checkpoint()
    }

    fn run(&mut self, ctx: &mut PipelineContext) -> Result<(), EngineError> {
        let engine = ctx.settings.engine.clone();
        let parallel = ctx.settings.multiprocessing;
        let docking_dir = self.docking_dir(ctx);
        let board = ctx.board.clone();

        let progress = ctx.plugin_progress_mut(Self::IDENTITY.uid);
        let receptor_sources: BTreeMap<String, PathBuf> = progress
            .receptors
            .iter()
            .map(|r| (r.uid.clone(), r.source_path.clone()))
            .collect();
        let ligand_sources: BTreeMap<String, PathBuf> = progress
            .ligands
            .iter()
            .map(|l| (l.uid.clone(), l.source_path.clone()))
            .collect();

        // Combinatorial fan-out: a complex is created the first time its
        // pairing is encountered; later passes pick up the persisted one.
        for rec_uid in receptor_sources.keys() {
            for lig_uid in ligand_sources.keys() {
                let id = ComplexId::new(rec_uid, lig_uid);
                if !progress.complexes.contains_key(&id) {
                    let workdir = docking_dir.join(id.as_str());
                    progress
                        .complexes
                        .insert(id.clone(), Complex::new(rec_uid, lig_uid, workdir));
                    debug!(complex = %id, "Complex initiated.");
                }
            }
        }

        let mut dispatcher = TaskDispatcher::new(parallel, board);
        let mut kept = BTreeMap::new();
        for (id, complex) in std::mem::take(&mut progress.complexes) {
            if complex.step_state.is_terminal(&self.sequence) {
                debug!(complex = %id, "Complex already terminal; skipping.");
                kept.insert(id, complex);
                continue;
            }
            let (Some(receptor_src), Some(ligand_src)) = (
                receptor_sources.get(&complex.receptor_uid).cloned(),
                ligand_sources.get(&complex.ligand_uid).cloned(),
            ) else {
                warn!(complex = %id, "Input structure no longer registered; unit left untouched.");
                kept.insert(id, complex);
                continue;
            };

            let runner = StepRunner {
                sequence: self.sequence.clone(),
                engine: engine.clone(),
                receptor_src,
                ligand_src,
            };
            dispatcher.submit(id.to_string(), complex, move |unit| runner.process(unit));
        }

        let reporter = ctx.reporter.clone();
        dispatcher.set_final_callback(move || {
            reporter.report(Progress::Message(
                "Docking queue drained; aggregating results.".to_string(),
            ));
        });

        let outcomes = dispatcher.drain();

        let progress = ctx.plugin_progress_mut(Self::IDENTITY.uid);
        progress.complexes = kept;
        let mut failures = 0usize;
        let mut protocol_error = None;
        for outcome in outcomes {
            match outcome.result {
                Ok(()) => {}
                Err(e @ EngineError::StepProtocol { .. }) => protocol_error = Some(e),
                Err(_) => failures += 1,
            }
            progress
                .complexes
                .insert(outcome.unit.uid.clone(), outcome.unit);
        }
        if failures > 0 {
            warn!(failures, "Complexes left resumable after this pass; rerun to retry.");
        }

        ctx.checkpoint()?;
        if let Some(e) = protocol_error {
            // A protocol violation is a programming error: fatal for this
            // plugin instance, harmless to the rest of the pipeline.
            return Err(e);
        }
        self.finalise_results(ctx)
    }

    fn shutdown(&mut self, ctx: &mut PipelineContext) -> Result<(), EngineError> {
        debug!("ExecDock shutting down.");
        ctx.checkpoint()
    }
}

/// Everything one worker needs to drive a single complex through its steps.
/// Owns its data so a pooled job cannot reach any shared state.
struct StepRunner {
    sequence: StepSequence,
    engine: EngineSettings,
    receptor_src: PathBuf,
    ligand_src: PathBuf,
}

impl StepRunner {
    fn process(&self, unit: &mut Complex) -> Result<(), EngineError> {
        while let Some(step) = unit.step_state.advance(&self.sequence).map(str::to_string) {
            debug!(complex = %unit.uid, step, "Running step.");
            self.execute(&step, unit)?;
            unit.step_state.mark_done(&self.sequence, &step)?;
        }
        Ok(())
    }

    fn execute(&self, step: &str, unit: &mut Complex) -> Result<(), EngineError> {
        match step {
            "prepare" => self.prepare(unit),
            "configure" => self.configure(unit),
            "dock" => self.dock(unit),
            "analyse" => self.analyse(unit),
            "finalise" => {
                debug!(complex = %unit.uid, "Complex finalised.");
                Ok(())
            }
            other => Err(step_error(unit, other, "no handler for step".to_string())),
        }
    }

    fn prepare(&self, unit: &mut Complex) -> Result<(), EngineError> {
        fs::create_dir_all(&unit.workdir)
            .map_err(|e| step_error(unit, "prepare", format!("cannot create workdir: {e}")))?;
        copy_if_missing(&self.receptor_src, &unit.path_receptor, unit, "prepare")?;
        copy_if_missing(&self.ligand_src, &unit.path_ligand, unit, "prepare")
    }

    fn configure(&self, unit: &mut Complex) -> Result<(), EngineError> {
        if file_has_content(&unit.path_engine_config) {
            debug!(complex = %unit.uid, "Engine config already exists; skipping.");
            return Ok(());
        }
        let mut lines: Vec<String> = self
            .engine
            .config_params
            .iter()
            .map(|(key, value)| format!("{key} = {value}"))
            .collect();
        lines.push(String::new());
        fs::write(&unit.path_engine_config, lines.join("\n"))
            .map_err(|e| step_error(unit, "configure", format!("cannot write config: {e}")))
    }

    fn dock(&self, unit: &mut Complex) -> Result<(), EngineError> {
        if unit.path_poses_out.exists() {
            debug!(complex = %unit.uid, "Docking output exists; skipping.");
            return Ok(());
        }

        let args = self.substitute_args(unit)?;
        let output = Command::new(&self.engine.executable)
            .args(&args)
            .current_dir(&unit.workdir)
            .output()
            .map_err(|e| {
                step_error(
                    unit,
                    "dock",
                    format!("failed to launch engine '{}': {e}", self.engine.executable),
                )
            })?;

        if !output.status.success() {
            return Err(step_error(
                unit,
                "dock",
                format!(
                    "engine exited with {}: {}",
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        fs::write(&unit.path_score_log, &output.stdout)
            .map_err(|e| step_error(unit, "dock", format!("cannot write score log: {e}")))
    }

    fn analyse(&self, unit: &mut Complex) -> Result<(), EngineError> {
        if !unit.path_score_log.exists() {
            debug!(complex = %unit.uid, "No score log; nothing to analyse.");
            return Ok(());
        }
        let text = fs::read_to_string(&unit.path_score_log)
            .map_err(|e| step_error(unit, "analyse", format!("cannot read score log: {e}")))?;
        let table = parse_score_log(&text);
        debug!(complex = %unit.uid, poses = table.num_rows(), "Score log parsed.");
        unit.attach_artifact(SCORES_ARTIFACT, table);
        Ok(())
    }

    /// Substitutes the argv template with absolute per-complex paths. All
    /// substituted files live in the unit's workdir by construction.
    fn substitute_args(&self, unit: &Complex) -> Result<Vec<String>, EngineError> {
        let workdir = fs::canonicalize(&unit.workdir)
            .map_err(|e| step_error(unit, "dock", format!("cannot resolve workdir: {e}")))?;
        let abs = |path: &Path| -> String {
            match path.file_name() {
                Some(name) => workdir.join(name).display().to_string(),
                None => path.display().to_string(),
            }
        };
        Ok(self
            .engine
            .args
            .iter()
            .map(|arg| {
                arg.replace("{receptor}", &abs(&unit.path_receptor))
                    .replace("{ligand}", &abs(&unit.path_ligand))
                    .replace("{config}", &abs(&unit.path_engine_config))
                    .replace("{out}", &abs(&unit.path_poses_out))
            })
            .collect())
    }
}

/// Parses an engine score log: whitespace-separated rows following the
/// dashed column rule (`-----+...`), as printed by AutoDock-style engines.
pub fn parse_score_log(text: &str) -> ScoreTable {
    let mut table = ScoreTable::new(SCORE_COLUMNS);
    let mut in_table = false;
    for line in text.lines() {
        if in_table {
            if !line.starts_with(' ') {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < SCORE_COLUMNS.len() {
                continue;
            }
            let row = fields
                .iter()
                .take(SCORE_COLUMNS.len())
                .map(|f| match f.parse::<f64>() {
                    Ok(v) => Cell::Num(v),
                    Err(_) => Cell::Text((*f).to_string()),
                })
                .collect();
            table.push_row(row);
        } else if line.starts_with("-----+") {
            in_table = true;
        }
    }
    table
}

fn result_header_renames() -> HashMap<String, String> {
    [
        ("mode", "Conformer ID"),
        ("affinity", "Engine Score"),
        ("rmsd_lb", "RMSD LB"),
        ("rmsd_ub", "RMSD UB"),
        ("rec_uid", "Receptor ID"),
        ("lig_uid", "Ligand ID"),
        ("complex_uid", "Complex ID"),
        (COMPOSITE_RANK, "Composite Rank"),
        (COMPOSITE_SCORE, "Composite Score"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

fn step_error(unit: &Complex, step: &str, message: String) -> EngineError {
    EngineError::StepExecution {
        complex: unit.uid.to_string(),
        step: step.to_string(),
        message,
    }
}

fn export_error(path: &Path, e: csv::Error) -> EngineError {
    EngineError::Persistence {
        path: path.to_path_buf(),
        message: format!("result export failed: {e}"),
    }
}

fn copy_if_missing(
    src: &Path,
    dst: &Path,
    unit: &Complex,
    step: &str,
) -> Result<(), EngineError> {
    if file_has_content(dst) {
        debug!(dst = %dst.display(), "Input already staged; skipping copy.");
        return Ok(());
    }
    fs::copy(src, dst).map_err(|e| {
        step_error(
            unit,
            step,
            format!("cannot stage '{}': {e}", src.display()),
        )
    })?;
    Ok(())
}

fn file_has_content(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false)
}
