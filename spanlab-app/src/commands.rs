use anyhow::{Context, Result, bail};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spanlab_core::{PresentationObserver, TerminationReason};
use spanlab_experiment::{TaskConfig, TrialEngine};
use spanlab_export::{CsvFileSink, CsvLayout, JsonFileSink, OutputTarget, summary_line, to_csv};
use spanlab_timing::Timer;
use std::io::{self, BufReader};
use std::path::Path;
use tracing::info;

use crate::app::App;
use crate::simulate::run_simulation;
use crate::{ExportArgs, ExportFormat, TaskArgs};

fn load_config(args: &TaskArgs) -> Result<TaskConfig> {
    match (&args.task, &args.config) {
        (_, Some(path)) => TaskConfig::from_path(path)
            .with_context(|| format!("loading {}", path.display())),
        (Some(id), None) => TaskConfig::preset(id).with_context(|| {
            let known: Vec<String> = TaskConfig::presets().into_iter().map(|p| p.task_id).collect();
            format!("unknown task {id:?}; known tasks: {}", known.join(", "))
        }),
        (None, None) => bail!("pass either --task <id> or --config <file>"),
    }
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

pub fn run(task: &TaskArgs, export: &ExportArgs) -> Result<()> {
    let config = load_config(task)?;
    let mut app = App::new(config, rng(task.seed), BufReader::new(io::stdin()))?;
    let summary = app.run()?;
    println!("{}", summary_line(&summary));
    save(app.engine(), export)
}

pub fn simulate(task: &TaskArgs, export: &ExportArgs, accuracy: f64, print_csv: bool) -> Result<()> {
    let config = load_config(task)?;
    let seed = task.seed.unwrap_or(0);
    let engine = run_simulation(config, seed, accuracy)?;
    let summary = engine.summary();
    info!(task = %engine.config().task_id, seed, accuracy, "simulation finished");

    if print_csv {
        let layout = CsvLayout::for_mode(engine.config().mode);
        print!("{}", to_csv(&layout, engine.log().as_slice(), &summary));
    }
    println!("{}", summary_line(&summary));
    save(&engine, export)
}

/// Hands the log to the requested file sinks. No-op without `--out`.
fn save<T, R, O>(engine: &TrialEngine<T, R, O>, export: &ExportArgs) -> Result<()>
where
    T: Timer,
    R: Rng,
    O: PresentationObserver,
{
    let Some(dir) = &export.out else {
        return Ok(());
    };
    let target = OutputTarget::new(dir, &export.participant, Utc::now())?;
    let termination: Option<TerminationReason> = engine.summary().termination;

    if matches!(export.format, ExportFormat::Csv | ExportFormat::Both) {
        let layout = CsvLayout::for_mode(engine.config().mode);
        let mut sink = CsvFileSink::new(target.clone(), layout).with_termination(termination);
        engine.hand_off(&mut sink)?;
        for path in sink.written() {
            println!("Wrote {}", path.display());
        }
    }
    if matches!(export.format, ExportFormat::Json | ExportFormat::Both) {
        let mut sink = JsonFileSink::new(target).with_termination(termination);
        engine.hand_off(&mut sink)?;
        for path in sink.written() {
            println!("Wrote {}", path.display());
        }
    }
    Ok(())
}

pub fn validate(path: &Path) -> Result<()> {
    let config = TaskConfig::from_path(path).with_context(|| format!("{}", path.display()))?;
    println!(
        "{}: valid {} task, levels {}-{}",
        config.task_id, config.mode, config.min_level, config.max_level
    );
    Ok(())
}

pub fn presets(show: Option<&str>) -> Result<()> {
    match show {
        Some(id) => {
            let preset = TaskConfig::preset(id).with_context(|| format!("unknown task {id:?}"))?;
            print!("{}", toml::to_string(&preset).context("rendering preset")?);
        }
        None => {
            for preset in TaskConfig::presets() {
                println!(
                    "{:<22} {:<17} levels {}-{}",
                    preset.task_id, preset.mode, preset.min_level, preset.max_level
                );
            }
        }
    }
    Ok(())
}
