//! Command line decoder for Serato crates and track tags

mod config;
mod dump;
mod report;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serato_core::{
    decode_beatgrid, decode_crate_paths, decode_hot_cues_with, decode_track_markers,
    BeatGridContainer, LabelMode, MarkersEncoding,
};
use tracing::{debug, info, level_filters::LevelFilter, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use config::{Config, OutputMode};
use report::{beat_grid_text, hot_cues_text, to_json, CrateReport};

#[derive(Parser)]
#[command(name = "srx")]
#[command(about = "Decode Serato crates, hot cues and beat grids")]
#[command(version)]
struct Cli {
    /// JSON file with tag candidates and label mode
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tracks of .crate files
    Crate {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Print paths converted for this host
        #[arg(long)]
        lookup: bool,
    },

    /// Decode a Markers2 tag value saved to a file
    Cues {
        file: PathBuf,

        /// Value has a single base64 layer (ID3 GEOB)
        #[arg(long)]
        flat: bool,

        /// Overrides the configured label mode
        #[arg(long, value_enum)]
        label_mode: Option<LabelArg>,
    },

    /// Decode a BeatGrid tag value saved to a file
    Beatgrid {
        file: PathBuf,

        #[arg(long, value_enum, default_value = "raw")]
        container: ContainerArg,
    },

    /// Decode a JSON tag dump through the configured candidates
    Track { dump: PathBuf },
}

#[derive(Clone, Copy, ValueEnum)]
enum LabelArg {
    Trim,
    Cut,
}

impl From<LabelArg> for LabelMode {
    fn from(arg: LabelArg) -> Self {
        match arg {
            LabelArg::Trim => LabelMode::TrimTrailingNul,
            LabelArg::Cut => LabelMode::CutAtFirstNul,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ContainerArg {
    Mp4,
    Raw,
}

impl From<ContainerArg> for BeatGridContainer {
    fn from(arg: ContainerArg) -> Self {
        match arg {
            ContainerArg::Mp4 => BeatGridContainer::Mp4Wrapped,
            ContainerArg::Raw => BeatGridContainer::RawBinary,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from_level(level).into())
        .from_env_lossy();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let config = Config {
        output: if cli.json { OutputMode::Json } else { OutputMode::Text },
        decode_config: cli.config,
        verbose: cli.verbose,
    };
    init_logging(config.verbose)?;

    match cli.command {
        Commands::Crate { files, lookup } => {
            let mut reports = Vec::with_capacity(files.len());
            for file in &files {
                let data = fs::read(file).with_context(|| format!("Cannot read crate {:?}", file))?;
                let scan = decode_crate_paths(&data);
                info!("{:?}: {} tracks, {} errors", file, scan.paths.len(), scan.errors.len());
                reports.push(CrateReport::new(file, &scan, lookup));
            }

            match config.output {
                OutputMode::Json => println!("{}", to_json(&reports)?),
                OutputMode::Text => {
                    for report in &reports {
                        print!("{}", report.to_text());
                    }
                }
            }
        }

        Commands::Cues { file, flat, label_mode } => {
            let decode = config.load_decode_config()?;
            let mode = label_mode.map(LabelMode::from).unwrap_or(decode.label_mode);
            let encoding = if flat { MarkersEncoding::Flat } else { MarkersEncoding::Nested };

            let value = fs::read(&file)
                .with_context(|| format!("Cannot read tag value {:?}", file))?;
            debug!("{} bytes, {:?} encoding, {:?}", value.len(), encoding, mode);
            let cues = decode_hot_cues_with(&value, encoding, mode);

            match config.output {
                OutputMode::Json => println!("{}", to_json(&cues)?),
                OutputMode::Text => print!("{}", hot_cues_text(&cues)),
            }
        }

        Commands::Beatgrid { file, container } => {
            let value = fs::read(&file)
                .with_context(|| format!("Cannot read tag value {:?}", file))?;
            let grid = decode_beatgrid(&value, container.into());

            match config.output {
                OutputMode::Json => println!("{}", to_json(&grid)?),
                OutputMode::Text => print!("{}", beat_grid_text(&grid)),
            }
        }

        Commands::Track { dump } => {
            let decode = config.load_decode_config()?;
            let tags = dump::read_tag_dump(&dump)?;
            let markers = decode_track_markers(&tags, &decode);

            match config.output {
                OutputMode::Json => println!("{}", to_json(&markers)?),
                OutputMode::Text => {
                    println!("Hot cues:");
                    print!("{}", hot_cues_text(&markers.hot_cues));
                    println!("Beat grid:");
                    print!("{}", beat_grid_text(&markers.beat_grid));
                }
            }
        }
    }

    Ok(())
}
