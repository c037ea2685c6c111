//! gcode-pause CLI - insert and remove printer pauses in sliced G-code
//!
//! Pauses are placed at layer boundaries so multi-color prints can stop for
//! a filament swap.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use gcode_pause::{
    Diagnostic, Document, ExportOptions, LayerHeight, PauseParams, TemplateOptions,
    DEFAULT_SUFFIX,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod plan;

#[derive(Parser)]
#[command(name = "gcode-pause")]
#[command(about = "Insert and remove printer pauses at layer heights in G-code", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Significant digits for lift and park coordinates
    #[arg(long, global = true, default_value_t = gcode_pause::template::DEFAULT_PRECISION)]
    precision: usize,

    /// Suffix appended to the input file name when no output is given
    #[arg(long, global = true, default_value = DEFAULT_SUFFIX)]
    suffix: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert a pause at the start of a layer
    Insert {
        /// Input .gcode file
        file: PathBuf,
        /// Layer height (mm); the next layer up is used if none matches
        #[arg(long = "height", short = 'z')]
        height: LayerHeight,
        #[command(flatten)]
        params: ParamArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Insert pauses listed in a YAML, TOML or JSON plan file
    Batch {
        /// Input .gcode file
        file: PathBuf,
        /// Plan file mapping layer height to pause parameters
        plan: PathBuf,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Remove pauses at the given layer heights
    Remove {
        /// Input .gcode file
        file: PathBuf,
        /// Layer heights (mm)
        #[arg(required = true)]
        heights: Vec<LayerHeight>,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// List layer heights and the line each starts on
    Layers {
        /// Input .gcode file
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// List inserted pauses and the lines they occupy
    Pauses {
        /// Input .gcode file
        file: PathBuf,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Args)]
struct ParamArgs {
    /// How far to raise the hot end (mm)
    #[arg(long, default_value_t = 10.0)]
    z_offset: f64,
    /// X position to park at (mm)
    #[arg(long = "x", default_value_t = 10.0)]
    x_pause: f64,
    /// Y position to park at (mm)
    #[arg(long = "y", default_value_t = 10.0)]
    y_pause: f64,
    /// Message shown on the printer display
    #[arg(short, long, default_value = "")]
    message: String,
}

impl From<ParamArgs> for PauseParams {
    fn from(args: ParamArgs) -> Self {
        PauseParams::new(args.z_offset, args.x_pause, args.y_pause).with_message(args.message)
    }
}

#[derive(Args)]
struct OutputArgs {
    /// Output file (default: input name with the suffix appended)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Serialize)]
struct LayerRow {
    height: LayerHeight,
    line: usize,
}

#[derive(Serialize)]
struct PauseRow {
    height: LayerHeight,
    first_line: usize,
    last_line: usize,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let template = TemplateOptions {
        precision: cli.precision,
    };
    let export = ExportOptions { suffix: cli.suffix };
    let open = |path: &Path| -> Result<Document> {
        Ok(Document::open(path)
            .with_context(|| format!("loading {}", path.display()))?
            .with_template_options(template)
            .with_export_options(export.clone()))
    };

    match cli.command {
        Commands::Insert {
            file,
            height,
            params,
            output,
        } => {
            let mut doc = open(&file)?;
            let diagnostics = doc.insert_pause(height, &params.into())?;
            save(&doc, output.output.as_deref(), &diagnostics)?;
        }
        Commands::Batch {
            file,
            plan: plan_path,
            output,
        } => {
            let plan = plan::load(&plan_path)?;
            let mut doc = open(&file)?;
            let diagnostics = doc.insert_pauses(&plan)?;
            save(&doc, output.output.as_deref(), &diagnostics)?;
        }
        Commands::Remove {
            file,
            heights,
            output,
        } => {
            let mut doc = open(&file)?;
            let mut diagnostics = Vec::new();
            for height in heights {
                diagnostics.extend(doc.remove_pause(height)?);
            }
            save(&doc, output.output.as_deref(), &diagnostics)?;
        }
        Commands::Layers { file, json } => {
            let doc = open(&file)?;
            let rows: Vec<LayerRow> = doc
                .layers()
                .iter()
                .map(|(height, offset)| LayerRow {
                    height,
                    line: offset + 1,
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    println!("{}\t{}", row.height, row.line);
                }
            }
        }
        Commands::Pauses { file, json } => {
            let doc = open(&file)?;
            let rows: Vec<PauseRow> = doc
                .pauses()
                .by_offset()
                .into_iter()
                .map(|(height, record)| PauseRow {
                    height,
                    first_line: record.start + 1,
                    last_line: record.end + 1,
                })
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for row in &rows {
                    println!("{}\t{}-{}", row.height, row.first_line, row.last_line);
                }
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

// Diagnostics were already logged as warnings by the document.
fn save(doc: &Document, output: Option<&Path>, diagnostics: &[Diagnostic]) -> Result<()> {
    let written = doc.save(output).context("writing G-code")?;
    match diagnostics.len() {
        0 => println!("Wrote {}", written.display()),
        1 => println!("Wrote {} (1 warning)", written.display()),
        n => println!("Wrote {} ({n} warnings)", written.display()),
    }
    Ok(())
}
