use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use adventure_state::{
    EngineVar, GameState, NoInput, StateConfig, StateRecord, SAVE_EXTENSION, SAVE_VERSION,
};
use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(author, version, about = "Adventure save-state inspector")]
struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
    /// TOML file with state settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a JSON summary of a save file.
    Inspect { save: PathBuf },
    /// Re-encode a save at another format version.
    Convert {
        save: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        #[arg(long, default_value_t = SAVE_VERSION)]
        version: u32,
    },
    /// List the readable saves below a directory.
    List { dir: PathBuf },
    /// Describe and evaluate a packed condition against a save.
    Eval {
        save: PathBuf,
        #[arg(allow_negative_numbers = true)]
        condition: i16,
    },
}

#[derive(Serialize)]
struct SaveSummary {
    version: u32,
    game_running: bool,
    current_frame: u32,
    seconds_played: u32,
    location: Location,
    inventory: Vec<u16>,
    zip_destinations_unlocked: usize,
    camera: CameraSummary,
    description: String,
    saved_at: String,
    vars: BTreeMap<String, i32>,
}

#[derive(Serialize)]
struct Location {
    age: i32,
    room: i32,
    node: i32,
}

#[derive(Serialize)]
struct CameraSummary {
    limited: bool,
    pitch: f32,
    heading: f32,
    fov: f32,
    node_type: u32,
}

#[derive(Serialize)]
struct EvalReport {
    condition: i16,
    description: String,
    result: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = match &cli.config {
        Some(path) => StateConfig::load_from(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => StateConfig::default(),
    };
    match cli.command {
        Command::Inspect { save } => inspect_save(&save, config),
        Command::Convert {
            save,
            output,
            version,
        } => convert_save(&save, &output, version, config),
        Command::List { dir } => list_saves(&dir),
        Command::Eval { save, condition } => eval_condition(&save, condition, config),
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_state(path: &Path, config: StateConfig) -> Result<GameState> {
    let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut state = GameState::with_config(config);
    state
        .load_bytes(&bytes)
        .with_context(|| format!("decode {}", path.display()))?;
    Ok(state)
}

fn summarize(state: &GameState) -> SaveSummary {
    let record: &StateRecord = state.record();
    let date = record.metadata.date();
    let view = state.view();
    let vars = record
        .vars
        .non_zero()
        .map(|(index, value)| (state.describe_var(index), value))
        .collect();
    SaveSummary {
        version: record.version,
        game_running: state.game_running(),
        current_frame: state.current_frame(),
        seconds_played: state.seconds_played(),
        location: Location {
            age: state.engine_var(EngineVar::LocationAge),
            room: state.engine_var(EngineVar::LocationRoom),
            node: state.engine_var(EngineVar::LocationNode),
        },
        inventory: state.inventory(),
        zip_destinations_unlocked: record.zip_destinations.unlocked_count(),
        camera: CameraSummary {
            limited: state.camera_limits().limited,
            pitch: view.lookat_pitch,
            heading: view.lookat_heading,
            fov: view.lookat_fov,
            node_type: state.current_node_type(),
        },
        description: state.save_description().to_string(),
        saved_at: format!(
            "{:04}-{:02}-{:02} {:02}:{:02}",
            date.year, date.month, date.day, date.hour, date.minute
        ),
        vars,
    }
}

fn inspect_save(path: &Path, config: StateConfig) -> Result<()> {
    let state = load_state(path, config)?;
    let summary = summarize(&state);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn convert_save(path: &Path, output: &Path, version: u32, config: StateConfig) -> Result<()> {
    if version > SAVE_VERSION {
        bail!("version {version} is newer than the supported {SAVE_VERSION}");
    }
    let mut state = load_state(path, config)?;
    let mut bytes = Vec::new();
    state
        .write(&mut bytes, version)
        .with_context(|| format!("encode at version {version}"))?;
    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(output, &bytes).with_context(|| format!("write {}", output.display()))?;
    tracing::info!(
        from = state.record().version,
        to = version,
        bytes = bytes.len(),
        "converted save"
    );
    Ok(())
}

fn list_saves(dir: &Path) -> Result<()> {
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("walk {}", dir.display()))?;
        let path = entry.path();
        if !entry.file_type().is_file()
            || path.extension().and_then(|ext| ext.to_str()) != Some(SAVE_EXTENSION)
        {
            continue;
        }
        let bytes = fs::read(path).with_context(|| format!("read {}", path.display()))?;
        match StateRecord::from_bytes(&bytes) {
            Ok(record) => println!(
                "{}\tv{}\t{}",
                path.display(),
                record.version,
                record.metadata.description
            ),
            Err(err) => tracing::warn!(path = %path.display(), error = %err, "skipping unreadable save"),
        }
    }
    Ok(())
}

fn eval_condition(path: &Path, condition: i16, config: StateConfig) -> Result<()> {
    let mut state = load_state(path, config)?;
    let report = EvalReport {
        condition,
        description: state.describe_condition(condition),
        result: state.evaluate(condition, &NoInput),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
