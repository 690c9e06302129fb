//! The `PipelineActivity` custom resource, as far as we read and write it.
//!
//! Every struct keeps the fields it does not model in a flattened `extra`
//! map. Updates send the whole object back, so anything we fail to carry
//! through would be deleted from the cluster.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kubernetes object metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named list of artifact URLs produced by a pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub urls: Vec<String>,
}

/// Where the data in a fact came from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Original {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub mimetype: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// One named numeric value inside a fact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Measurement {
    pub name: String,
    #[serde(default)]
    pub measurement_type: String,
    #[serde(default)]
    pub measurement_value: u64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// A kind-tagged payload summarizing external tool output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Fact {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(default)]
    pub fact_type: String,
    #[serde(default)]
    pub original: Original,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default)]
    pub measurements: Vec<Measurement>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActivitySpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facts: Vec<Fact>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The activity record for one pipeline run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineActivity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ActivitySpec,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PipelineActivity {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            api_version: Some("jenkins.io/v1".to_string()),
            kind: Some("PipelineActivity".to_string()),
            metadata: ObjectMeta {
                name: name.into(),
                namespace: Some(namespace.into()),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        self.metadata.namespace.as_deref()
    }

    /// All URLs of the attachments called `name`, in record order.
    pub fn attachment_urls<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.spec
            .attachments
            .iter()
            .filter(move |a| a.name == name)
            .flat_map(|a| a.urls.iter().map(String::as_str))
    }

    /// Number of facts with the given type.
    #[must_use]
    pub fn count_facts(&self, fact_type: &str) -> usize {
        self.spec
            .facts
            .iter()
            .filter(|f| f.fact_type == fact_type)
            .count()
    }
}
