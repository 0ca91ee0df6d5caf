//! Bundle validation.
//!
//! Validators never fail an export.  They return [`Diagnostic`]s, which the
//! exporter attaches to its [`ExportResult`](crate::ExportResult).
//!
//! - [`StructuralValidator`] checks offline what the exporter is expected to
//!   get right: resource types, ids, required elements, status codes,
//!   date formats and transaction requests.
//! - `RemoteValidator` (feature `remote-validation`) posts the bundle to a
//!   FHIR server's `Bundle/$validate` operation.  When the server does not
//!   offer the operation (404), times out at the gateway (504) or cannot be
//!   reached, it falls back to the structural checks.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate};
use serde_json::Value;

// ── Diagnostics ───────────────────────────────────────────────────────────────

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Debug)]
pub enum Severity {
    Error,
    Warning,
    Information,
}

/// One validation finding.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Diagnostic {
    pub severity:  Severity,
    /// FHIRPath-like location, e.g. `Bundle.entry[2].resource.status`.
    pub location:  String,
    pub message:   String,
    /// Name of the validator that produced it.
    pub validator: &'static str,
}

impl Diagnostic {
    pub fn error(validator: &'static str, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: Severity::Error, location: location.into(), message: message.into(), validator }
    }

    pub fn warning(validator: &'static str, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self { severity: Severity::Warning, location: location.into(), message: message.into(), validator }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {:?} at {}: {}", self.validator, self.severity, self.location, self.message)
    }
}

// ── BundleValidator ───────────────────────────────────────────────────────────

/// Checks a serialized bundle.
pub trait BundleValidator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Findings for `bundle`; empty means valid.
    fn validate(&self, bundle: &Value) -> Vec<Diagnostic>;
}

// ── StructuralValidator ───────────────────────────────────────────────────────

/// Offline FHIR R4 checks for the resource types the exporter produces.
#[derive(Copy, Clone, Debug, Default)]
pub struct StructuralValidator;

const STRUCTURAL: &str = "structural";

/// Required elements and allowed `status` codes per resource type.
struct Profile {
    resource_type: &'static str,
    required:      &'static [&'static str],
    statuses:      &'static [&'static str],
}

const PROFILES: &[Profile] = &[
    Profile { resource_type: "Patient", required: &[], statuses: &[] },
    Profile {
        resource_type: "Encounter",
        required:      &["status", "class"],
        statuses:      &["planned", "arrived", "triaged", "in-progress", "onleave", "finished", "cancelled", "entered-in-error", "unknown"],
    },
    Profile { resource_type: "Condition", required: &["subject", "code"], statuses: &[] },
    Profile {
        resource_type: "Observation",
        required:      &["status", "code"],
        statuses:      &["registered", "preliminary", "final", "amended", "corrected", "cancelled", "entered-in-error", "unknown"],
    },
    Profile {
        resource_type: "Procedure",
        required:      &["status", "subject"],
        statuses:      &["preparation", "in-progress", "not-done", "on-hold", "stopped", "completed", "entered-in-error", "unknown"],
    },
    Profile {
        resource_type: "MedicationRequest",
        required:      &["status", "intent", "subject"],
        statuses:      &["active", "on-hold", "cancelled", "completed", "entered-in-error", "stopped", "draft", "unknown"],
    },
    Profile {
        resource_type: "ServiceRequest",
        required:      &["status", "intent", "subject"],
        statuses:      &["draft", "active", "on-hold", "revoked", "completed", "entered-in-error", "unknown"],
    },
    Profile {
        resource_type: "Appointment",
        required:      &["status", "participant"],
        statuses:      &["proposed", "pending", "booked", "arrived", "fulfilled", "cancelled", "noshow", "entered-in-error", "checked-in", "waitlist"],
    },
];

/// `dateTime` elements, as paths of object keys.
const DATE_TIME_PATHS: &[&[&str]] = &[
    &["recordedDate"],
    &["abatementDateTime"],
    &["occurrenceDateTime"],
    &["deceasedDateTime"],
    &["start"],
    &["end"],
    &["period", "start"],
    &["period", "end"],
    &["effectivePeriod", "start"],
    &["effectivePeriod", "end"],
    &["performedPeriod", "start"],
    &["performedPeriod", "end"],
    &["dispenseRequest", "validityPeriod", "start"],
    &["dispenseRequest", "validityPeriod", "end"],
];

impl BundleValidator for StructuralValidator {
    fn name(&self) -> &'static str {
        STRUCTURAL
    }

    fn validate(&self, bundle: &Value) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        if bundle.get("resourceType").and_then(Value::as_str) != Some("Bundle") {
            out.push(Diagnostic::error(STRUCTURAL, "Bundle.resourceType", "expected \"Bundle\""));
        }
        let bundle_type = bundle.get("type").and_then(Value::as_str).unwrap_or_default();
        if !matches!(bundle_type, "transaction" | "batch" | "collection") {
            out.push(Diagnostic::error(
                STRUCTURAL,
                "Bundle.type",
                format!("unsupported bundle type {bundle_type:?}"),
            ));
        }
        let Some(entries) = bundle.get("entry").and_then(Value::as_array) else {
            out.push(Diagnostic::error(STRUCTURAL, "Bundle.entry", "missing entry array"));
            return out;
        };

        let mut seen = BTreeSet::new();
        for (i, entry) in entries.iter().enumerate() {
            let at = format!("Bundle.entry[{i}]");
            let Some(resource) = entry.get("resource").filter(|r| r.is_object()) else {
                out.push(Diagnostic::error(STRUCTURAL, format!("{at}.resource"), "missing resource"));
                continue;
            };
            let resource_type = resource.get("resourceType").and_then(Value::as_str).unwrap_or_default();
            check_resource(resource, resource_type, &format!("{at}.resource"), &mut out);

            if let Some(id) = resource.get("id").and_then(Value::as_str) {
                if !seen.insert(format!("{resource_type}/{id}")) {
                    out.push(Diagnostic::error(
                        STRUCTURAL,
                        format!("{at}.resource.id"),
                        format!("duplicate resource {resource_type}/{id}"),
                    ));
                }
            }
            if bundle_type == "transaction" || bundle_type == "batch" {
                check_request(entry.get("request"), resource_type, &at, &mut out);
            }
        }
        out
    }
}

fn check_resource(resource: &Value, resource_type: &str, at: &str, out: &mut Vec<Diagnostic>) {
    let Some(profile) = PROFILES.iter().find(|p| p.resource_type == resource_type) else {
        out.push(Diagnostic::error(
            STRUCTURAL,
            format!("{at}.resourceType"),
            format!("unsupported resource type {resource_type:?}"),
        ));
        return;
    };

    match resource.get("id").and_then(Value::as_str) {
        Some(id) if is_fhir_id(id) => {}
        _ => out.push(Diagnostic::error(STRUCTURAL, format!("{at}.id"), "missing or malformed id")),
    }
    for field in profile.required {
        if resource.get(field).is_none_or(Value::is_null) {
            out.push(Diagnostic::error(STRUCTURAL, format!("{at}.{field}"), "required element missing"));
        }
    }
    if let Some(status) = resource.get("status").and_then(Value::as_str) {
        if !profile.statuses.is_empty() && !profile.statuses.contains(&status) {
            out.push(Diagnostic::error(
                STRUCTURAL,
                format!("{at}.status"),
                format!("{status:?} is not a valid {resource_type} status"),
            ));
        }
    }
    if resource_type == "MedicationRequest"
        && resource.get("medicationReference").is_none()
        && resource.get("medicationCodeableConcept").is_none()
    {
        out.push(Diagnostic::error(STRUCTURAL, format!("{at}.medication[x]"), "required element missing"));
    }
    if resource_type == "Appointment"
        && resource.get("participant").and_then(Value::as_array).is_some_and(Vec::is_empty)
    {
        out.push(Diagnostic::error(STRUCTURAL, format!("{at}.participant"), "must not be empty"));
    }

    for path in DATE_TIME_PATHS {
        let value = path.iter().try_fold(resource, |v, key| v.get(key));
        if let Some(value) = value {
            let ok = value.as_str().is_some_and(|s| DateTime::parse_from_rfc3339(s).is_ok());
            if !ok {
                out.push(Diagnostic::error(
                    STRUCTURAL,
                    format!("{at}.{}", path.join(".")),
                    "not a valid dateTime",
                ));
            }
        }
    }
    if let Some(birth_date) = resource.get("birthDate") {
        let ok = birth_date
            .as_str()
            .is_some_and(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok());
        if !ok {
            out.push(Diagnostic::error(STRUCTURAL, format!("{at}.birthDate"), "not a valid date"));
        }
    }
}

fn check_request(request: Option<&Value>, resource_type: &str, at: &str, out: &mut Vec<Diagnostic>) {
    let Some(request) = request else {
        out.push(Diagnostic::error(STRUCTURAL, format!("{at}.request"), "transaction entries need a request"));
        return;
    };
    if request.get("method").and_then(Value::as_str) != Some("POST") {
        out.push(Diagnostic::warning(STRUCTURAL, format!("{at}.request.method"), "expected POST"));
    }
    if request.get("url").and_then(Value::as_str) != Some(resource_type) {
        out.push(Diagnostic::error(
            STRUCTURAL,
            format!("{at}.request.url"),
            format!("expected {resource_type:?}"),
        ));
    }
}

/// FHIR `id`: 1–64 characters from `[A-Za-z0-9-.]`.
fn is_fhir_id(id: &str) -> bool {
    (1..=64).contains(&id.len())
        && id.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'.')
}

// ── RemoteValidator ───────────────────────────────────────────────────────────

#[cfg(feature = "remote-validation")]
pub use remote::RemoteValidator;

#[cfg(feature = "remote-validation")]
pub(crate) mod remote {
    use std::time::Duration;

    use reqwest::StatusCode;
    use reqwest::blocking::Client;
    use serde_json::Value;
    use tracing::warn;

    use super::{BundleValidator, Diagnostic, Severity, StructuralValidator};
    use crate::OutputResult;

    const REMOTE: &str = "remote";

    /// Validates through `{server_url}/Bundle/$validate`.
    pub struct RemoteValidator {
        url:      String,
        client:   Client,
        fallback: StructuralValidator,
    }

    impl RemoteValidator {
        pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

        pub fn new(server_url: &str) -> OutputResult<Self> {
            Self::with_timeout(server_url, Self::DEFAULT_TIMEOUT)
        }

        pub fn with_timeout(server_url: &str, timeout: Duration) -> OutputResult<Self> {
            let client = Client::builder().timeout(timeout).build()?;
            let url = format!("{}/Bundle/$validate", server_url.trim_end_matches('/'));
            Ok(Self { url, client, fallback: StructuralValidator })
        }

        pub fn url(&self) -> &str {
            &self.url
        }

        fn fall_back(&self, bundle: &Value, reason: &str) -> Vec<Diagnostic> {
            warn!(url = %self.url, reason, "remote validation unavailable, using structural checks");
            self.fallback.validate(bundle)
        }
    }

    impl BundleValidator for RemoteValidator {
        fn name(&self) -> &'static str {
            REMOTE
        }

        fn validate(&self, bundle: &Value) -> Vec<Diagnostic> {
            let response = match self.client.post(&self.url).json(bundle).send() {
                Ok(response) => response,
                Err(e) => return self.fall_back(bundle, &e.to_string()),
            };
            let status = response.status();
            if matches!(status, StatusCode::NOT_FOUND | StatusCode::GATEWAY_TIMEOUT) {
                return self.fall_back(bundle, &status.to_string());
            }
            match response.text() {
                Ok(body) => response_diagnostics(status, &body),
                Err(e) => vec![Diagnostic::error(
                    REMOTE,
                    "Bundle",
                    format!("failed to read $validate response ({status}): {e}"),
                )],
            }
        }
    }

    /// Interpret a `$validate` response.
    ///
    /// An `OperationOutcome` body is read for issues whatever the status.
    /// A failure status always yields at least one error, and a success
    /// status without an `OperationOutcome` is itself an error.
    pub(crate) fn response_diagnostics(status: StatusCode, body: &str) -> Vec<Diagnostic> {
        let outcome = serde_json::from_str::<Value>(body)
            .ok()
            .filter(|v| v.get("resourceType").and_then(Value::as_str) == Some("OperationOutcome"));
        let mut diagnostics = outcome.as_ref().map(outcome_issues).unwrap_or_default();

        if outcome.is_none() {
            let what = if status.is_success() { "unreadable $validate response" } else { "server returned" };
            diagnostics.push(Diagnostic::error(
                REMOTE,
                "Bundle",
                format!("{what} {status}: {}", snippet(body)),
            ));
        } else if !status.is_success() && !diagnostics.iter().any(Diagnostic::is_error) {
            diagnostics.push(Diagnostic::error(REMOTE, "Bundle", format!("server returned {status}")));
        }
        diagnostics
    }

    fn snippet(body: &str) -> &str {
        const MAX: usize = 200;
        match body.char_indices().nth(MAX) {
            Some((i, _)) => &body[..i],
            None => body,
        }
    }

    /// Error and warning issues of an `OperationOutcome`.
    fn outcome_issues(outcome: &Value) -> Vec<Diagnostic> {
        let Some(issues) = outcome.get("issue").and_then(Value::as_array) else {
            return Vec::new();
        };
        issues
            .iter()
            .filter_map(|issue| {
                let severity = match issue.get("severity").and_then(Value::as_str)? {
                    "fatal" | "error" => Severity::Error,
                    "warning" => Severity::Warning,
                    _ => return None,
                };
                let location = issue
                    .get("expression")
                    .or_else(|| issue.get("location"))
                    .and_then(Value::as_array)
                    .and_then(|a| a.first())
                    .and_then(Value::as_str)
                    .unwrap_or("Bundle")
                    .to_string();
                let message = issue
                    .get("diagnostics")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                Some(Diagnostic { severity, location, message, validator: REMOTE })
            })
            .collect()
    }
}
