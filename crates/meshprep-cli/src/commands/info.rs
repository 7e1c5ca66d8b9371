//! meshprep info - display mesh statistics.

use std::path::Path;

use anyhow::Result;
use colored::Colorize;
use meshprep::{MeshAdjacency, StlFormat, check_winding, format_size};
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

#[derive(Debug, Serialize)]
struct MeshInfo {
    path: String,
    vertices: usize,
    faces: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    bounds: Option<BoundsInfo>,
    surface_area: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    volume: Option<f64>,
    watertight: bool,
    boundary_edges: usize,
    non_manifold_edges: usize,
    inconsistent_edges: usize,
    components: usize,
    binary_size_bytes: u64,
    ascii_size_bytes: u64,
}

#[derive(Debug, Serialize)]
struct BoundsInfo {
    min: [f64; 3],
    max: [f64; 3],
    dimensions: [f64; 3],
}

pub fn run(input: &Path, cli: &Cli) -> Result<()> {
    let mesh = super::load(input)?;

    let adjacency = MeshAdjacency::build(&mesh.faces);
    let watertight = adjacency.is_watertight();
    let bounds = mesh.bounds().map(|(min, max)| {
        let dims = max - min;
        BoundsInfo {
            min: [min.x, min.y, min.z],
            max: [max.x, max.y, max.z],
            dimensions: [dims.x, dims.y, dims.z],
        }
    });

    let info = MeshInfo {
        path: input.display().to_string(),
        vertices: mesh.vertex_count(),
        faces: mesh.face_count(),
        bounds,
        surface_area: mesh.surface_area(),
        volume: watertight.then(|| mesh.volume()),
        watertight,
        boundary_edges: adjacency.boundary_edge_count(),
        non_manifold_edges: adjacency.non_manifold_edge_count(),
        inconsistent_edges: check_winding(&mesh).inconsistent_edges,
        components: mesh.find_components().component_count,
        binary_size_bytes: StlFormat::Binary.estimate_size(mesh.face_count()),
        ascii_size_bytes: StlFormat::Ascii.estimate_size(mesh.face_count()),
    };

    match cli.format {
        OutputFormat::Json => {
            output::print(&info, cli.format, cli.quiet);
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Mesh Information".bold().underline());
                output::field("File", input.display());
                output::field("Vertices", info.vertices);
                output::field("Faces", info.faces);
                output::field("Components", info.components);

                if let Some(ref b) = info.bounds {
                    println!("\n{}", "Bounds:".bold());
                    output::field(
                        "Min",
                        format!("({:.3}, {:.3}, {:.3})", b.min[0], b.min[1], b.min[2]),
                    );
                    output::field(
                        "Max",
                        format!("({:.3}, {:.3}, {:.3})", b.max[0], b.max[1], b.max[2]),
                    );
                    output::field(
                        "Size",
                        format!(
                            "{:.3} x {:.3} x {:.3} mm",
                            b.dimensions[0], b.dimensions[1], b.dimensions[2]
                        ),
                    );
                }

                println!("\n{}", "Topology:".bold());
                output::field(
                    "Watertight",
                    if info.watertight {
                        "Yes".green()
                    } else {
                        "No".red()
                    },
                );
                output::field("Boundary edges", info.boundary_edges);
                output::field("Non-manifold edges", info.non_manifold_edges);
                output::field("Inconsistent edges", info.inconsistent_edges);

                println!("\n{}", "Geometry:".bold());
                output::field("Surface area", format!("{:.2} mm^2", info.surface_area));
                if let Some(volume) = info.volume {
                    output::field("Volume", format!("{:.2} mm^3", volume));
                }

                println!("\n{}", "STL size:".bold());
                output::field("Binary", format_size(info.binary_size_bytes));
                output::field("ASCII", format_size(info.ascii_size_bytes));
            }
        }
    }

    Ok(())
}
