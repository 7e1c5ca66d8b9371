//! STL export with validation and one-shot repair.
//!
//! The flow per export is: tessellate, validate, repair once if invalid and
//! re-validate, then write. Geometric problems never stop an export; only a
//! failed tessellation or a failed write produce `success = false`.

use std::borrow::Cow;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::Mesh;
use crate::error::MeshResult;
use crate::io::{StlFormat, save_stl, stl_to_bytes};
use crate::model::Model;
use crate::repair::{RepairResult, Repairer};
use crate::solid::Tessellate;
use crate::tracing_ext::{OperationTimer, log_export_result};
use crate::validate::{ValidationResult, Validator, group_thousands, validate_mesh_data};

/// Tessellation presets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ExportQuality {
    Draft,
    #[default]
    Standard,
    High,
    Ultra,
}

impl ExportQuality {
    pub const ALL: [ExportQuality; 4] = [
        ExportQuality::Draft,
        ExportQuality::Standard,
        ExportQuality::High,
        ExportQuality::Ultra,
    ];

    /// Maximum surface deviation in mm.
    pub fn linear_tolerance(&self) -> f64 {
        match self {
            ExportQuality::Draft => 0.1,
            ExportQuality::Standard => 0.01,
            ExportQuality::High => 0.001,
            ExportQuality::Ultra => 0.0001,
        }
    }

    /// Maximum angle between adjacent facets in degrees.
    pub fn angular_tolerance(&self) -> f64 {
        match self {
            ExportQuality::Draft => 15.0,
            ExportQuality::Standard => 5.0,
            ExportQuality::High => 1.0,
            ExportQuality::Ultra => 0.5,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ExportQuality::Draft => "draft",
            ExportQuality::Standard => "standard",
            ExportQuality::High => "high",
            ExportQuality::Ultra => "ultra",
        }
    }
}

impl fmt::Display for ExportQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How an export is carried out.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ExportSettings {
    pub format: StlFormat,
    pub quality: ExportQuality,
    /// Overrides the quality preset's linear tolerance.
    pub tolerance: Option<f64>,
    /// Overrides the quality preset's angular tolerance.
    pub angular_tolerance: Option<f64>,
    pub validate_before_export: bool,
    /// Only consulted when validation runs.
    pub repair_if_invalid: bool,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            format: StlFormat::Binary,
            quality: ExportQuality::Standard,
            tolerance: None,
            angular_tolerance: None,
            validate_before_export: true,
            repair_if_invalid: true,
        }
    }
}

impl ExportSettings {
    pub fn with_format(mut self, format: StlFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_quality(mut self, quality: ExportQuality) -> Self {
        self.quality = quality;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = Some(tolerance);
        self
    }

    pub fn with_angular_tolerance(mut self, degrees: f64) -> Self {
        self.angular_tolerance = Some(degrees);
        self
    }

    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate_before_export = validate;
        self
    }

    pub fn with_repair(mut self, repair: bool) -> Self {
        self.repair_if_invalid = repair;
        self
    }

    /// Effective linear tolerance.
    pub fn linear_tolerance(&self) -> f64 {
        self.tolerance
            .unwrap_or_else(|| self.quality.linear_tolerance())
    }

    /// Effective angular tolerance.
    pub fn angular_tolerance(&self) -> f64 {
        self.angular_tolerance
            .unwrap_or_else(|| self.quality.angular_tolerance())
    }
}

/// Outcome of one export.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub success: bool,
    /// Set only when the file was written.
    pub file_path: Option<PathBuf>,
    pub file_size_bytes: u64,
    pub triangle_count: usize,
    /// Post-repair validation when a repair ran.
    pub validation_result: Option<ValidationResult>,
    /// Present only when a repair was attempted.
    pub repair_result: Option<RepairResult>,
    pub error_message: Option<String>,
}

impl ExportResult {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            file_path: None,
            file_size_bytes: 0,
            triangle_count: 0,
            validation_result: None,
            repair_result: None,
            error_message: Some(message),
        }
    }

    pub fn repairs_applied(&self) -> bool {
        self.repair_result.as_ref().is_some_and(|r| r.was_modified)
    }

    pub fn summary(&self) -> String {
        self.to_string()
    }
}

/// Format a byte count as B, KB or MB.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    if bytes < KB {
        format!("{} B", bytes)
    } else if bytes < KB * KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.2} MB", bytes as f64 / (KB * KB) as f64)
    }
}

impl fmt::Display for ExportResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "=== Export Summary ===")?;
        if self.success {
            write!(f, "\nStatus: SUCCESS")?;
            if let Some(path) = &self.file_path {
                write!(f, "\nOutput: {}", path.display())?;
            }
            write!(f, "\nFile Size: {}", format_size(self.file_size_bytes))?;
            write!(f, "\nTriangles: {}", group_thousands(self.triangle_count))?;
        } else {
            write!(f, "\nStatus: FAILED")?;
            if let Some(message) = &self.error_message {
                write!(f, "\nError: {}", message)?;
            }
        }

        if let Some(validation) = &self.validation_result {
            let passed = if validation.is_valid { "PASSED" } else { "FAILED" };
            let watertight = if validation.is_watertight { "Yes" } else { "No" };
            write!(f, "\n\nValidation: {}\nWatertight: {}", passed, watertight)?;
        }

        if self.repairs_applied() {
            write!(f, "\n\nRepairs Applied: Yes")?;
        }
        Ok(())
    }
}

/// Runs exports with a shared validator and repairer.
#[derive(Debug, Clone, Default)]
pub struct Exporter {
    settings: ExportSettings,
    validator: Validator,
    repairer: Repairer,
}

impl Exporter {
    pub fn new(settings: ExportSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn with_validator(mut self, validator: Validator) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_repairer(mut self, repairer: Repairer) -> Self {
        self.repairer = repairer;
        self
    }

    pub fn settings(&self) -> &ExportSettings {
        &self.settings
    }

    /// Export with this exporter's settings.
    pub fn export<S: Tessellate>(&self, model: &Model<S>, path: impl AsRef<Path>) -> ExportResult {
        self.export_with(model, path, &self.settings)
    }

    /// Export with one-off settings.
    pub fn export_with<S: Tessellate>(
        &self,
        model: &Model<S>,
        path: impl AsRef<Path>,
        settings: &ExportSettings,
    ) -> ExportResult {
        let _timer = OperationTimer::new("export");
        let mesh = match model.to_mesh(settings.linear_tolerance(), settings.angular_tolerance()) {
            Ok(mesh) => mesh,
            Err(err) => {
                let result = ExportResult::failed(format!("Failed to convert model to mesh: {}", err));
                log_export_result(&result);
                return result;
            }
        };
        self.write_checked(&mesh, path.as_ref(), settings)
    }

    /// Export an existing mesh, skipping tessellation.
    pub fn export_mesh(&self, mesh: &Mesh, path: impl AsRef<Path>) -> ExportResult {
        self.export_mesh_with(mesh, path, &self.settings)
    }

    pub fn export_mesh_with(
        &self,
        mesh: &Mesh,
        path: impl AsRef<Path>,
        settings: &ExportSettings,
    ) -> ExportResult {
        let _timer = OperationTimer::for_mesh("export_mesh", mesh);
        self.write_checked(mesh, path.as_ref(), settings)
    }

    /// Tessellate and encode in memory. Checks indices and coordinates but
    /// runs no printability validation or repair.
    pub fn export_to_bytes<S: Tessellate>(
        &self,
        model: &Model<S>,
        settings: &ExportSettings,
    ) -> MeshResult<Vec<u8>> {
        let mesh = model.to_mesh(settings.linear_tolerance(), settings.angular_tolerance())?;
        validate_mesh_data(&mesh)?;
        stl_to_bytes(&mesh, settings.format, model.name())
    }

    /// Expected output size for `model` under `settings`.
    pub fn estimate_file_size<S: Tessellate>(
        &self,
        model: &Model<S>,
        settings: &ExportSettings,
    ) -> MeshResult<u64> {
        let mesh = model.to_mesh(settings.linear_tolerance(), settings.angular_tolerance())?;
        Ok(settings.format.estimate_size(mesh.face_count()))
    }

    fn write_checked(&self, mesh: &Mesh, path: &Path, settings: &ExportSettings) -> ExportResult {
        if let Err(err) = validate_mesh_data(mesh) {
            let result = ExportResult::failed(format!("Invalid mesh data: {}", err));
            log_export_result(&result);
            return result;
        }
        let (mesh, validation, repair) = self.prepare(mesh, settings);

        let result = match save_stl(&mesh, path, settings.format) {
            Ok(size) => ExportResult {
                success: true,
                file_path: Some(path.to_path_buf()),
                file_size_bytes: size,
                triangle_count: mesh.face_count(),
                validation_result: validation,
                repair_result: repair,
                error_message: None,
            },
            Err(err) => ExportResult {
                triangle_count: mesh.face_count(),
                validation_result: validation,
                repair_result: repair,
                ..ExportResult::failed(format!("Failed to write STL file: {}", err))
            },
        };
        log_export_result(&result);
        result
    }

    /// Validate and repair at most once.
    fn prepare<'a>(
        &self,
        mesh: &'a Mesh,
        settings: &ExportSettings,
    ) -> (Cow<'a, Mesh>, Option<ValidationResult>, Option<RepairResult>) {
        if !settings.validate_before_export {
            return (Cow::Borrowed(mesh), None, None);
        }

        let validation = self.validator.validate(mesh);
        if validation.is_valid || !settings.repair_if_invalid {
            return (Cow::Borrowed(mesh), Some(validation), None);
        }

        debug!(
            "Mesh invalid before export ({} errors), repairing",
            validation.error_count()
        );
        let repair = self.repairer.repair(mesh);
        let revalidated = self.validator.validate(&repair.mesh);
        if !revalidated.is_valid {
            warn!(
                "Mesh still invalid after repair ({} errors); exporting anyway",
                revalidated.error_count()
            );
        }
        (Cow::Owned(repair.mesh.clone()), Some(revalidated), Some(repair))
    }
}
