//! Patient → FHIR bundle export.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{debug, warn};
use uuid::Uuid;

use pa_agent::Patient;
use pa_core::ValidationConfig;

use crate::convert::{entry_resources, patient_resource};
use crate::{Bundle, BundleType, BundleValidator, Diagnostic, OutputResult, StructuralValidator};

/// A bundle plus whatever the validator had to say about it.
#[derive(Clone, Debug)]
pub struct ExportResult {
    pub bundle:      Bundle,
    /// Empty when validation is off or found nothing.
    pub diagnostics: Vec<Diagnostic>,
}

impl ExportResult {
    /// `true` unless a diagnostic has error severity.
    pub fn is_valid(&self) -> bool {
        !self.diagnostics.iter().any(Diagnostic::is_error)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }
}

/// Builds one bundle per patient: the `Patient` resource first, then one
/// resource per clinical event in record order.
///
/// The output depends only on the patient's state, apart from the bundle id
/// which is freshly generated.
pub struct BundleExporter {
    bundle_type: BundleType,
    validator:   Option<Box<dyn BundleValidator>>,
}

impl Default for BundleExporter {
    fn default() -> Self {
        Self::new()
    }
}

impl BundleExporter {
    /// Transaction bundles, no validation.
    pub fn new() -> Self {
        Self { bundle_type: BundleType::default(), validator: None }
    }

    /// Exporter configured from the run's validation settings.
    ///
    /// With `server_url` set and the `remote-validation` feature enabled the
    /// server is used; otherwise structural checks only.
    pub fn from_config(config: &ValidationConfig) -> OutputResult<Self> {
        let exporter = Self::new();
        if !config.enabled {
            return Ok(exporter);
        }
        Ok(match config.server_url.as_deref() {
            #[cfg(feature = "remote-validation")]
            Some(url) => exporter.validator(crate::RemoteValidator::new(url)?),
            #[cfg(not(feature = "remote-validation"))]
            Some(url) => {
                warn!(url, "built without remote-validation, using structural checks");
                exporter.validator(StructuralValidator)
            }
            None => exporter.validator(StructuralValidator),
        })
    }

    pub fn bundle_type(mut self, bundle_type: BundleType) -> Self {
        self.bundle_type = bundle_type;
        self
    }

    pub fn validator(mut self, validator: impl BundleValidator + 'static) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Convert without validating.
    pub fn bundle(&self, patient: &Patient) -> Bundle {
        let mut bundle = Bundle::new(Uuid::new_v4().to_string(), self.bundle_type);
        bundle.push(patient_resource(patient));
        for entry in patient.record() {
            for resource in entry_resources(entry, patient) {
                bundle.push(resource);
            }
        }
        bundle
    }

    /// Convert and, if a validator is set, validate.
    pub fn export(&self, patient: &Patient) -> ExportResult {
        let bundle = self.bundle(patient);
        let diagnostics = match &self.validator {
            None => Vec::new(),
            Some(validator) => match bundle.to_value() {
                Ok(value) => validator.validate(&value),
                Err(e) => vec![Diagnostic::error(validator.name(), "Bundle", e.to_string())],
            },
        };

        debug!(
            patient_id = patient.patient_id.0,
            resources = bundle.len(),
            diagnostics = diagnostics.len(),
            "bundle exported"
        );
        for d in diagnostics.iter().filter(|d| d.is_error()) {
            warn!(patient_id = patient.patient_id.0, diagnostic = %d, "bundle failed validation");
        }
        ExportResult { bundle, diagnostics }
    }
}

/// Write `bundle` as pretty-printed JSON.
pub fn write_bundle_json(path: &Path, bundle: &Bundle) -> OutputResult<()> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, bundle)?;
    out.flush()?;
    Ok(())
}
