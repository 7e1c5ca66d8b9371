//! meshprep export - push a mesh file through the export pipeline.

use std::path::Path;

use anyhow::Result;
use meshprep::{ExportResult, ExportSettings, Exporter, StlFormat, ValidationReport};
use serde::Serialize;

use crate::{Cli, OutputFormat, output};

/// Pipeline switches shared by `export` and `generate`.
#[derive(Clone, Copy)]
pub struct Options {
    pub ascii: bool,
    pub validate: bool,
    pub repair: bool,
}

impl Options {
    pub fn apply(self, settings: ExportSettings) -> ExportSettings {
        let format = if self.ascii {
            StlFormat::Ascii
        } else {
            StlFormat::Binary
        };
        settings
            .with_format(format)
            .with_validation(self.validate)
            .with_repair(self.repair)
    }
}

#[derive(Debug, Serialize)]
struct ExportReport {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_path: Option<String>,
    file_size_bytes: u64,
    triangle_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    validation_result: Option<ValidationReport>,
    repairs_applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
}

impl From<&ExportResult> for ExportReport {
    fn from(result: &ExportResult) -> Self {
        Self {
            success: result.success,
            file_path: result.file_path.as_ref().map(|p| p.display().to_string()),
            file_size_bytes: result.file_size_bytes,
            triangle_count: result.triangle_count,
            validation_result: result.validation_result.as_ref().map(|v| v.report()),
            repairs_applied: result.repairs_applied(),
            error_message: result.error_message.clone(),
        }
    }
}

pub fn run(input: &Path, output_path: &Path, options: Options, cli: &Cli) -> Result<()> {
    let mesh = super::load(input)?;
    let settings = options.apply(ExportSettings::default());
    let result = Exporter::default().export_mesh_with(&mesh, output_path, &settings);
    report(&result, cli)
}

/// Print an export outcome and exit non-zero when it failed.
pub fn report(result: &ExportResult, cli: &Cli) -> Result<()> {
    match cli.format {
        OutputFormat::Json => output::print(&ExportReport::from(result), cli.format, cli.quiet),
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", result);
                if let Some(repair) = &result.repair_result {
                    println!("\n{}", repair);
                }
            }
        }
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
