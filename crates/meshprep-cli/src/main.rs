//! meshprep: validate, repair and export meshes for 3D printing.
//!
//! Meant for scripting and CI: every command has a `--format json` mode and
//! `validate`/`export` exit non-zero when the mesh is not fit to print.
//!
//! # Logging
//!
//! `RUST_LOG` overrides the `-v` flags:
//! - `RUST_LOG=meshprep=info` - one line per stage
//! - `RUST_LOG=meshprep::timing=debug` - per-operation timings
//! - `RUST_LOG=meshprep::repair=debug` - individual repair actions
//!
//! ```bash
//! RUST_LOG=meshprep=info meshprep repair part.stl -o fixed.stl
//! meshprep -vv generate cylinder --radius 10 --height 20 -o peg.stl
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod commands;
mod output;

use commands::{export, generate, info, repair, validate};

/// meshprep - prepare triangle meshes for 3D printing.
///
/// Check printability, repair common defects and write STL files.
#[derive(Parser)]
#[command(name = "meshprep")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format for results
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Suppress all non-error output
    #[arg(long, short, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short = 'v', global = true, action = clap::ArgAction::Count)]
    verbosity: u8,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum QualityArg {
    Draft,
    Standard,
    High,
    Ultra,
}

impl From<QualityArg> for meshprep::ExportQuality {
    fn from(value: QualityArg) -> Self {
        match value {
            QualityArg::Draft => Self::Draft,
            QualityArg::Standard => Self::Standard,
            QualityArg::High => Self::High,
            QualityArg::Ultra => Self::Ultra,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
pub enum Shape {
    Box,
    Cylinder,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether a mesh is printable
    Validate {
        /// Input STL file
        input: PathBuf,

        /// Minimum wall thickness in mm
        #[arg(long)]
        min_wall_thickness: Option<f64>,

        /// Minimum enclosed volume in mm^3
        #[arg(long)]
        min_volume: Option<f64>,

        /// Printer build volume as X,Y,Z in mm
        #[arg(long, value_delimiter = ',', num_args = 3)]
        max_dimensions: Option<Vec<f64>>,

        /// Show issue details
        #[arg(long)]
        verbose: bool,
    },

    /// Repair a mesh and save the result
    Repair {
        /// Input STL file
        input: PathBuf,

        /// Output file (defaults to <input>_repaired.stl)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Run the comprehensive repair backend instead of the standard pipeline
        #[arg(long)]
        aggressive: bool,

        /// Distance in mm under which vertices are merged
        #[arg(long)]
        merge_threshold: Option<f64>,

        /// Largest hole, in boundary edges, that will be filled
        #[arg(long)]
        max_hole_edges: Option<usize>,
    },

    /// Re-export a mesh file through validation and repair
    Export {
        /// Input STL file
        input: PathBuf,

        /// Output STL file
        #[arg(short, long)]
        output: PathBuf,

        /// Write ASCII STL instead of binary
        #[arg(long)]
        ascii: bool,

        /// Skip validation before writing
        #[arg(long)]
        no_validate: bool,

        /// Do not repair invalid meshes
        #[arg(long)]
        no_repair: bool,
    },

    /// Tessellate a primitive and export it
    Generate {
        /// Primitive to generate
        shape: Shape,

        /// Output STL file
        #[arg(short, long)]
        output: PathBuf,

        /// Box edge length in mm
        #[arg(long, default_value = "10.0")]
        size: f64,

        /// Cylinder radius in mm
        #[arg(long, default_value = "5.0")]
        radius: f64,

        /// Cylinder height in mm
        #[arg(long, default_value = "10.0")]
        height: f64,

        /// Tessellation quality preset
        #[arg(long, default_value = "standard")]
        quality: QualityArg,

        /// Linear tolerance in mm, overriding the preset
        #[arg(long)]
        tolerance: Option<f64>,

        /// Angular tolerance in degrees, overriding the preset
        #[arg(long)]
        angular_tolerance: Option<f64>,

        /// Write ASCII STL instead of binary
        #[arg(long)]
        ascii: bool,

        /// Skip validation before writing
        #[arg(long)]
        no_validate: bool,

        /// Do not repair invalid meshes
        #[arg(long)]
        no_repair: bool,
    },

    /// Display mesh statistics
    Info {
        /// Input STL file
        input: PathBuf,
    },
}

fn init_tracing(verbosity: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = match std::env::var("RUST_LOG") {
        Ok(directives) => EnvFilter::new(directives),
        Err(_) => {
            let level = match verbosity {
                0 => "warn",
                1 => "meshprep=info",
                2 => "meshprep=debug",
                _ => "trace",
            };
            EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .with(filter)
        .init();
}

fn main() -> Result<()> {
    #[cfg(debug_assertions)]
    miette::set_panic_hook();

    let cli = Cli::parse();
    init_tracing(cli.verbosity, cli.quiet);

    let result = match &cli.command {
        Commands::Validate {
            input,
            min_wall_thickness,
            min_volume,
            max_dimensions,
            verbose,
        } => validate::run(
            input,
            validate::Limits {
                min_wall_thickness: *min_wall_thickness,
                min_volume: *min_volume,
                max_dimensions: max_dimensions.as_deref(),
            },
            *verbose,
            &cli,
        ),
        Commands::Repair {
            input,
            output,
            aggressive,
            merge_threshold,
            max_hole_edges,
        } => repair::run(
            input,
            output.as_deref(),
            *aggressive,
            *merge_threshold,
            *max_hole_edges,
            &cli,
        ),
        Commands::Export {
            input,
            output,
            ascii,
            no_validate,
            no_repair,
        } => export::run(
            input,
            output,
            export::Options {
                ascii: *ascii,
                validate: !*no_validate,
                repair: !*no_repair,
            },
            &cli,
        ),
        Commands::Generate {
            shape,
            output,
            size,
            radius,
            height,
            quality,
            tolerance,
            angular_tolerance,
            ascii,
            no_validate,
            no_repair,
        } => generate::run(
            *shape,
            output,
            generate::Dimensions {
                size: *size,
                radius: *radius,
                height: *height,
            },
            generate::Tolerances {
                quality: (*quality).into(),
                linear: *tolerance,
                angular: *angular_tolerance,
            },
            export::Options {
                ascii: *ascii,
                validate: !*no_validate,
                repair: !*no_repair,
            },
            &cli,
        ),
        Commands::Info { input } => info::run(input, &cli),
    };

    if let Err(e) = &result {
        if !cli.quiet {
            if let Some(mesh_err) = e.downcast_ref::<meshprep::MeshError>() {
                eprintln!("{}: {}", "Error".red().bold(), mesh_err);
                eprintln!("  {}: {}", "Code".cyan(), mesh_err.code());
                eprintln!(
                    "  {}: {}",
                    "Suggestion".green(),
                    mesh_err.recovery_suggestion()
                );
                if let Some(location) = mesh_err.location() {
                    eprintln!("  {}: {}", "Location".yellow(), location);
                }
            } else {
                eprintln!("{}: {}", "Error".red().bold(), e);
                for cause in e.chain().skip(1) {
                    eprintln!("  {}: {}", "Caused by".yellow(), cause);
                }
            }
        }
        std::process::exit(1);
    }

    Ok(())
}
