//! meshprep validate - check a mesh against printer limits.

use std::path::Path;

use anyhow::{Result, bail};
use colored::Colorize;
use meshprep::{Severity, ValidationIssue, Validator, ValidatorConfig};

use crate::{Cli, OutputFormat, output};

/// Overrides for the default validator thresholds.
pub struct Limits<'a> {
    pub min_wall_thickness: Option<f64>,
    pub min_volume: Option<f64>,
    pub max_dimensions: Option<&'a [f64]>,
}

impl Limits<'_> {
    fn to_config(&self) -> Result<ValidatorConfig> {
        let mut config = ValidatorConfig::default();
        if let Some(thickness) = self.min_wall_thickness {
            config.min_wall_thickness = thickness;
        }
        if let Some(volume) = self.min_volume {
            config.min_volume = volume;
        }
        if let Some(dims) = self.max_dimensions {
            let [x, y, z] = dims else {
                bail!("--max-dimensions expects three values X,Y,Z, got {}", dims.len());
            };
            config.max_dimensions = [*x, *y, *z];
        }
        Ok(config)
    }
}

pub fn run(input: &Path, limits: Limits<'_>, verbose: bool, cli: &Cli) -> Result<()> {
    let mesh = super::load(input)?;
    let config = limits.to_config()?;
    let result = Validator::new(config).validate(&mesh);

    match cli.format {
        OutputFormat::Json => {
            if verbose {
                output::print(&result, cli.format, cli.quiet);
            } else {
                output::print(&result.report(), cli.format, cli.quiet);
            }
        }
        OutputFormat::Text => {
            if !cli.quiet {
                println!("{}", "Validation Report".bold().underline());
                output::field("File", input.display());
                println!();
                println!("{}", result);

                if verbose && !result.issues.is_empty() {
                    println!("\n{}", "Details:".bold());
                    for issue in &result.issues {
                        print_issue(issue);
                    }
                }

                println!();
                if result.is_printable {
                    println!("{}", "Ready to print".green().bold());
                } else if result.is_valid {
                    println!("{}", "Valid, but not watertight".yellow().bold());
                } else {
                    println!("{}", "Not printable".red().bold());
                }
            }
        }
    }

    if !result.is_valid {
        std::process::exit(1);
    }

    Ok(())
}

fn print_issue(issue: &ValidationIssue) {
    let icon = match issue.severity {
        Severity::Error => "✗".red(),
        Severity::Warning => "⚠".yellow(),
        Severity::Info => "ℹ".blue(),
    };
    println!("  {} [{}] {}", icon, issue.code, issue.message);
    if let Some(details) = &issue.details
        && let Ok(json) = serde_json::to_string(details)
    {
        println!("      {}", json.dimmed());
    }
}
