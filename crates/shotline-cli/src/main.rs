//! Shotline CLI
//!
//! Headless access to the timing resolver and the edit engine:
//! `resolve` prints the resolved timing of every clip, `split` applies a
//! split and prints the saved document.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use shotline::core::timing::{resolve_timeline, StaticProbe};
use shotline::{Edit, EditDocument, EditSettings};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Edit settings file (JSON); defaults are used when missing
    #[arg(short = 's', long = "settings", value_name = "FILE", global = true)]
    settings: Option<PathBuf>,

    /// Source durations in seconds, as a JSON object keyed by URL
    #[arg(short = 'd', long = "durations", value_name = "FILE", global = true)]
    durations: Option<PathBuf>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print start, length and end (milliseconds) of every clip
    Resolve {
        #[arg(value_name = "EDIT")]
        edit: PathBuf,
    },
    /// Split a clip at an absolute time and print the resulting document
    Split {
        #[arg(value_name = "EDIT")]
        edit: PathBuf,
        #[arg(long)]
        track: usize,
        #[arg(long)]
        clip: usize,
        /// Split point in seconds on the timeline
        #[arg(long)]
        at: f64,
        /// Write the document here instead of stdout
        #[arg(short = 'o', long = "output", value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TimingRow {
    track: usize,
    clip: usize,
    asset: &'static str,
    start: f64,
    length: f64,
    end: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ResolveReport {
    duration: f64,
    clips: Vec<TimingRow>,
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_document(path: &Path) -> Result<EditDocument> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read edit {}", path.display()))?;
    EditDocument::from_json_str(&content)
        .with_context(|| format!("Invalid edit document {}", path.display()))
}

fn read_probe(path: Option<&Path>) -> Result<StaticProbe> {
    let Some(path) = path else {
        return Ok(StaticProbe::new());
    };
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read durations {}", path.display()))?;
    let table: HashMap<String, f64> = serde_json::from_str(&content)
        .with_context(|| format!("Invalid durations table {}", path.display()))?;
    Ok(StaticProbe::from_table(table))
}

async fn resolve(edit_path: &Path, probe: &StaticProbe) -> Result<ResolveReport> {
    let document = read_document(edit_path)?;
    let resolved = resolve_timeline(&document.timeline.tracks, probe).await;

    let mut clips = Vec::new();
    for (t, (track, timings)) in document
        .timeline
        .tracks
        .iter()
        .zip(&resolved.tracks)
        .enumerate()
    {
        for (c, (config, timing)) in track.clips.iter().zip(timings).enumerate() {
            clips.push(TimingRow {
                track: t,
                clip: c,
                asset: config.asset.type_name(),
                start: timing.start,
                length: timing.length,
                end: timing.end(),
            });
        }
    }

    Ok(ResolveReport {
        duration: resolved.duration(),
        clips,
    })
}

async fn split(
    edit_path: &Path,
    settings: EditSettings,
    probe: StaticProbe,
    track: usize,
    clip: usize,
    at: f64,
) -> Result<EditDocument> {
    let document = read_document(edit_path)?;
    let mut edit = Edit::new(settings).with_probe(Rc::new(probe));
    edit.load_edit(document).await?;
    edit.settle_loads().await;

    let right = edit
        .split_clip(track, clip, at)
        .with_context(|| format!("Failed to split clip {clip} on track {track} at {at}s"))?;
    edit.settle_loads().await;
    info!(right = %right, duration = edit.total_duration(), "Split applied");

    Ok(edit.to_document()?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbosity);

    let settings = match &cli.settings {
        Some(path) => EditSettings::load(path)
            .with_context(|| format!("Failed to load settings {}", path.display()))?,
        None => EditSettings::default(),
    };
    let probe = read_probe(cli.durations.as_deref())?;

    match cli.command {
        Commands::Resolve { edit } => {
            let report = resolve(&edit, &probe).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Split {
            edit,
            track,
            clip,
            at,
            output,
        } => {
            let document = split(&edit, settings, probe, track, clip, at).await?;
            let json = serde_json::to_string_pretty(&document)?;
            match output {
                Some(path) => std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{json}"),
            }
        }
    }

    Ok(())
}
