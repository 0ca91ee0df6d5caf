//! FHIR `Bundle` container.

use serde::Serialize;
use serde_json::Value;

/// `Bundle.type`.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BundleType {
    #[default]
    Transaction,
    Batch,
    Collection,
}

impl BundleType {
    pub fn as_str(self) -> &'static str {
        match self {
            BundleType::Transaction => "transaction",
            BundleType::Batch       => "batch",
            BundleType::Collection  => "collection",
        }
    }

    /// Transaction and batch entries must say what to do with the resource.
    pub fn needs_request(self) -> bool {
        !matches!(self, BundleType::Collection)
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Serialize)]
pub struct BundleRequest {
    pub method: String,
    pub url:    String,
}

impl BundleRequest {
    /// `POST <resourceType>`.
    pub fn post(resource_type: &str) -> Self {
        Self { method: "POST".into(), url: resource_type.into() }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct BundleEntry {
    pub resource: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request:  Option<BundleRequest>,
}

impl BundleEntry {
    /// The resource's `resourceType`, or `""` if it has none.
    pub fn resource_type(&self) -> &str {
        self.resource.get("resourceType").and_then(Value::as_str).unwrap_or_default()
    }
}

/// A FHIR R4 bundle of one patient's resources, in record order.
#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct Bundle {
    #[serde(rename = "resourceType")]
    resource_type: &'static str,
    pub id:        String,
    #[serde(rename = "type")]
    pub bundle_type: BundleType,
    #[serde(rename = "entry")]
    pub entries:   Vec<BundleEntry>,
}

impl Bundle {
    pub fn new(id: impl Into<String>, bundle_type: BundleType) -> Self {
        Self { resource_type: "Bundle", id: id.into(), bundle_type, entries: Vec::new() }
    }

    /// Append a resource.  Transaction and batch bundles get a
    /// `POST <resourceType>` request.
    pub fn push(&mut self, resource: Value) {
        let request = self.bundle_type.needs_request().then(|| {
            let resource_type = resource.get("resourceType").and_then(Value::as_str).unwrap_or_default();
            BundleRequest::post(resource_type)
        });
        self.entries.push(BundleEntry { resource, request });
    }

    pub fn resources(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|e| &e.resource)
    }

    /// Resources of one type, in bundle order.
    pub fn resources_of<'a>(&'a self, resource_type: &'a str) -> impl Iterator<Item = &'a Value> {
        self.entries
            .iter()
            .filter(move |e| e.resource_type() == resource_type)
            .map(|e| &e.resource)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}
