//! meshprep generate - tessellate a primitive and export it.

use std::path::Path;

use anyhow::Result;
use meshprep::{
    Cuboid, Cylinder, ExportQuality, ExportSettings, Exporter, Model, ModelMetadata, Tessellate,
};
use tracing::info;

use super::export::{self, Options};
use crate::{Cli, Shape};

pub struct Dimensions {
    pub size: f64,
    pub radius: f64,
    pub height: f64,
}

/// Quality preset plus optional explicit overrides.
pub struct Tolerances {
    pub quality: ExportQuality,
    pub linear: Option<f64>,
    pub angular: Option<f64>,
}

impl Tolerances {
    fn settings(&self) -> ExportSettings {
        let mut settings = ExportSettings::default().with_quality(self.quality);
        if let Some(linear) = self.linear {
            settings = settings.with_tolerance(linear);
        }
        if let Some(angular) = self.angular {
            settings = settings.with_angular_tolerance(angular);
        }
        settings
    }
}

pub fn run(
    shape: Shape,
    output_path: &Path,
    dims: Dimensions,
    tolerances: Tolerances,
    options: Options,
    cli: &Cli,
) -> Result<()> {
    let settings = options.apply(tolerances.settings());

    let solid: Box<dyn Tessellate> = match shape {
        Shape::Box => Box::new(Cuboid::cube(dims.size)),
        Shape::Cylinder => {
            let cylinder = Cylinder::new(dims.radius, dims.height);
            info!(
                segments = cylinder.segments(settings.linear_tolerance(), settings.angular_tolerance()),
                quality = %tolerances.quality,
                "Tessellating cylinder"
            );
            Box::new(cylinder)
        }
    };

    let name = output_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "unnamed".to_string());
    let model = Model::new(solid, ModelMetadata::named(name).with_tag("generated"));

    let result = Exporter::default().export_with(&model, output_path, &settings);
    export::report(&result, cli)
}
