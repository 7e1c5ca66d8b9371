//! meshprep repair - fix common mesh defects.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;
use meshprep::{RepairConfig, RepairLog, Repairer};
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Debug, Serialize)]
struct RepairReport<'a> {
    input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    output: Option<String>,
    was_modified: bool,
    input_vertices: usize,
    input_faces: usize,
    output_vertices: usize,
    output_faces: usize,
    actions: &'a [RepairLog],
}

/// `part.stl` becomes `part_repaired.stl` next to the input.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "mesh".to_string());
    input.with_file_name(format!("{}_repaired.stl", stem))
}

pub fn run(
    input: &Path,
    output_path: Option<&Path>,
    aggressive: bool,
    merge_threshold: Option<f64>,
    max_hole_edges: Option<usize>,
    cli: &Cli,
) -> Result<()> {
    let mesh = super::load(input)?;

    let mut config = RepairConfig::default();
    if let Some(threshold) = merge_threshold {
        config.merge_threshold = threshold;
    }
    if let Some(max_edges) = max_hole_edges {
        config.max_hole_edges = max_edges;
    }
    let repairer = Repairer::new(config);

    let result = if aggressive {
        repairer.repair_aggressive(&mesh)
    } else {
        repairer.repair(&mesh)
    };

    let output_path = output_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output(input));

    let saved = if result.was_modified {
        result
            .mesh
            .save(&output_path)
            .with_context(|| format!("Failed to save repaired mesh to {:?}", output_path))?;
        Some(output_path.display().to_string())
    } else {
        None
    };

    let report = RepairReport {
        input: input.display().to_string(),
        output: saved,
        was_modified: result.was_modified,
        input_vertices: mesh.vertex_count(),
        input_faces: mesh.face_count(),
        output_vertices: result.mesh.vertex_count(),
        output_faces: result.mesh.face_count(),
        actions: &result.log,
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&report, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", result);
                println!();
                match &report.output {
                    Some(path) => {
                        output::success(
                            &format!("Repaired mesh saved to {}", path),
                            cli.format,
                            cli.quiet,
                        );
                        println!(
                            "  {}: {} → {} vertices",
                            "Vertices".cyan(),
                            report.input_vertices,
                            report.output_vertices
                        );
                        println!(
                            "  {}: {} → {} faces",
                            "Faces".cyan(),
                            report.input_faces,
                            report.output_faces
                        );
                    }
                    None => output::warning("Mesh unchanged, nothing written", cli.format, cli.quiet),
                }
                for failure in result.failures() {
                    println!("  {} {}", "✗".red(), failure.description);
                }
            }
        }
    }

    Ok(())
}
