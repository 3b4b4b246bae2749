//! Management Portal entity types.
//!
//! These mirror the JSON documents the portal returns from its list
//! endpoints. Only the fields the directory client relies on are required;
//! everything else is optional so that portal upgrades adding or dropping
//! fields do not break deserialization.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A study registered in the portal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    #[serde(default)]
    pub id: Option<i64>,

    /// Unique project name, used as the cache key.
    pub project_name: String,

    #[serde(default)]
    pub human_readable_project_name: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub organization: Option<String>,

    #[serde(default)]
    pub location: Option<String>,

    #[serde(default)]
    pub project_status: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: BTreeMap<String, String>,
}

/// A participant enrolled in a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    #[serde(default)]
    pub id: Option<i64>,

    /// Unique login, used as the cache key.
    pub login: String,

    #[serde(default)]
    pub external_id: Option<String>,

    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub project: Option<Project>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub sources: Vec<Source>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: BTreeMap<String, String>,
}

impl Subject {
    /// Name of the project this subject is enrolled in.
    pub fn project_name(&self) -> Option<&str> {
        self.project.as_ref().map(|p| p.project_name.as_str())
    }

    /// Returns `true` if this subject is enrolled in the given project.
    pub fn is_in_project(&self, project_name: &str) -> bool {
        self.project_name() == Some(project_name)
    }
}

/// A device or app assigned to a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Source {
    #[serde(default)]
    pub id: Option<i64>,

    pub source_id: String,

    #[serde(default)]
    pub source_name: Option<String>,

    #[serde(default)]
    pub assigned: Option<bool>,

    #[serde(default)]
    pub source_type_producer: Option<String>,

    #[serde(default)]
    pub source_type_model: Option<String>,

    #[serde(default)]
    pub source_type_catalog_version: Option<String>,
}

impl Source {
    /// Identifier of this source's type, if the portal reported all parts.
    pub fn source_type(&self) -> Option<SourceTypeIdentifier> {
        match (
            &self.source_type_producer,
            &self.source_type_model,
            &self.source_type_catalog_version,
        ) {
            (Some(producer), Some(model), Some(version)) => {
                Some(SourceTypeIdentifier::new(producer, model, version))
            }
            _ => None,
        }
    }
}

/// Identifies a source type by producer, model and catalog version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTypeIdentifier {
    pub producer: String,
    pub model: String,
    pub catalog_version: String,
}

impl SourceTypeIdentifier {
    pub fn new(
        producer: impl Into<String>,
        model: impl Into<String>,
        catalog_version: impl Into<String>,
    ) -> Self {
        Self {
            producer: producer.into(),
            model: model.into(),
            catalog_version: catalog_version.into(),
        }
    }
}

impl fmt::Display for SourceTypeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.producer, self.model, self.catalog_version)
    }
}

/// A device or app type from the source-type catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceType {
    #[serde(default)]
    pub id: Option<i64>,

    pub producer: String,

    pub model: String,

    pub catalog_version: String,

    #[serde(default)]
    pub source_type_scope: Option<String>,

    #[serde(default)]
    pub can_register_dynamically: Option<bool>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub source_data: Vec<SourceData>,
}

impl SourceType {
    /// Identifier of this source type, used as the cache key.
    pub fn identifier(&self) -> SourceTypeIdentifier {
        SourceTypeIdentifier::new(&self.producer, &self.model, &self.catalog_version)
    }
}

/// A data stream produced by a source type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceData {
    pub source_data_type: String,

    #[serde(default)]
    pub source_data_name: Option<String>,

    #[serde(default)]
    pub frequency: Option<String>,

    #[serde(default)]
    pub unit: Option<String>,

    #[serde(default)]
    pub processing_state: Option<String>,

    #[serde(default)]
    pub data_class: Option<String>,

    #[serde(default)]
    pub key_schema: Option<String>,

    #[serde(default)]
    pub value_schema: Option<String>,

    #[serde(default)]
    pub topic: Option<String>,

    #[serde(default)]
    pub provider: Option<String>,

    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Portal DTOs serialize unset collections as `null`.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subject_from_portal_json() {
        let subject: Subject = serde_json::from_value(json!({
            "id": 1101,
            "login": "8b2f3a1e",
            "externalId": "P-01",
            "status": "ACTIVATED",
            "project": {
                "id": 3,
                "projectName": "radar-pilot",
                "humanReadableProjectName": "RADAR Pilot",
                "location": "London"
            },
            "sources": [{
                "sourceId": "0f2c",
                "sourceName": "empatica-0f2c",
                "assigned": true,
                "sourceTypeProducer": "Empatica",
                "sourceTypeModel": "E4",
                "sourceTypeCatalogVersion": "v1"
            }],
            "attributes": {"group": "control"}
        }))
        .unwrap();

        assert_eq!(subject.login, "8b2f3a1e");
        assert_eq!(subject.project_name(), Some("radar-pilot"));
        assert!(subject.is_in_project("radar-pilot"));
        assert!(!subject.is_in_project("other"));
        assert_eq!(subject.attributes.get("group").map(String::as_str), Some("control"));
        assert_eq!(
            subject.sources[0].source_type(),
            Some(SourceTypeIdentifier::new("Empatica", "E4", "v1"))
        );
    }

    #[test]
    fn test_subject_minimal_json() {
        let subject: Subject = serde_json::from_value(json!({"login": "abc"})).unwrap();
        assert_eq!(subject.project_name(), None);
        assert!(subject.sources.is_empty());
    }

    #[test]
    fn test_null_collections_deserialize_as_empty() {
        let projects: Vec<Project> = serde_json::from_value(json!([
            {"projectName": "radar", "attributes": null},
            {"projectName": "other"}
        ]))
        .unwrap();
        assert_eq!(projects.len(), 2);
        assert!(projects[0].attributes.is_empty());

        let subject: Subject = serde_json::from_value(json!({
            "login": "abc",
            "project": {"projectName": "radar", "attributes": null},
            "sources": null,
            "attributes": null
        }))
        .unwrap();
        assert!(subject.sources.is_empty());
        assert!(subject.attributes.is_empty());
        assert!(subject.is_in_project("radar"));

        let source_type: SourceType = serde_json::from_value(json!({
            "producer": "RADAR",
            "model": "PHQ8",
            "catalogVersion": "1.0.0",
            "sourceData": null
        }))
        .unwrap();
        assert!(source_type.source_data.is_empty());
    }

    #[test]
    fn test_source_without_complete_type() {
        let source: Source = serde_json::from_value(json!({
            "sourceId": "x",
            "sourceTypeProducer": "Empatica"
        }))
        .unwrap();
        assert_eq!(source.source_type(), None);
    }

    #[test]
    fn test_source_type_identifier() {
        let source_type: SourceType = serde_json::from_value(json!({
            "id": 7,
            "producer": "Empatica",
            "model": "E4",
            "catalogVersion": "v1",
            "sourceTypeScope": "PASSIVE",
            "canRegisterDynamically": false,
            "sourceData": [
                {"sourceDataType": "EMPATICA_E4_ACCELEROMETER", "frequency": "32.0", "unit": "G"},
                {"sourceDataType": "EMPATICA_E4_BATTERY_LEVEL", "enabled": false}
            ]
        }))
        .unwrap();

        let id = source_type.identifier();
        assert_eq!(id, SourceTypeIdentifier::new("Empatica", "E4", "v1"));
        assert_eq!(id.to_string(), "Empatica_E4_v1");
        assert!(source_type.source_data[0].enabled);
        assert!(!source_type.source_data[1].enabled);
    }
}
