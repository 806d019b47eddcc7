//! Canonical resources
//!
//! Provider-agnostic representation of a cloud resource, and the two
//! capabilities that build it:
//!
//! - [`ResourceFactory`] - cheap construction from listing data
//! - [`Deserializer`] - construction from a full provider read
//!
//! Enumerators and details fetchers never build a [`Resource`] themselves.

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Attribute mapping of a resource
pub type Attributes = Map<String, Value>;

/// Resource type tag, e.g. `google_storage_bucket`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResourceType(String);

impl ResourceType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceType {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A resource stub or a fully hydrated resource
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    id: String,
    #[serde(rename = "type")]
    resource_type: ResourceType,
    attributes: Attributes,
}

impl Resource {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn resource_type(&self) -> &ResourceType {
        &self.resource_type
    }

    pub fn attributes(&self) -> &Attributes {
        &self.attributes
    }

    /// String attribute lookup
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(|v| v.as_str())
    }
}

/// Builds resources from identity plus listing attributes
pub trait ResourceFactory: Send + Sync {
    fn create(&self, resource_type: &ResourceType, id: &str, attributes: Attributes) -> Resource;
}

/// Factory that stores attributes as given
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResourceFactory;

impl ResourceFactory for DefaultResourceFactory {
    fn create(&self, resource_type: &ResourceType, id: &str, attributes: Attributes) -> Resource {
        Resource {
            id: id.to_string(),
            resource_type: resource_type.clone(),
            attributes,
        }
    }
}

#[derive(Debug, Error)]
pub enum DeserializeError {
    #[error("{resource_type}: expected an object, got {found}")]
    NotAnObject {
        resource_type: ResourceType,
        found: &'static str,
    },
    #[error("{resource_type}: missing id attribute")]
    MissingId { resource_type: ResourceType },
}

/// Turns a raw provider read into a resource
pub trait Deserializer: Send + Sync {
    fn deserialize_one(
        &self,
        resource_type: &ResourceType,
        raw: Value,
    ) -> Result<Resource, DeserializeError>;
}

/// Deserializer for JSON objects carrying their identity in an `id` field
pub struct JsonDeserializer {
    factory: Arc<dyn ResourceFactory>,
}

impl JsonDeserializer {
    pub fn new(factory: Arc<dyn ResourceFactory>) -> Self {
        Self { factory }
    }
}

impl Deserializer for JsonDeserializer {
    fn deserialize_one(
        &self,
        resource_type: &ResourceType,
        raw: Value,
    ) -> Result<Resource, DeserializeError> {
        let Value::Object(attributes) = raw else {
            return Err(DeserializeError::NotAnObject {
                resource_type: resource_type.clone(),
                found: json_kind(&raw),
            });
        };

        let id = match attributes.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => {
                return Err(DeserializeError::MissingId {
                    resource_type: resource_type.clone(),
                })
            }
        };

        Ok(self.factory.create(resource_type, &id, attributes))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn deserializer() -> JsonDeserializer {
        JsonDeserializer::new(Arc::new(DefaultResourceFactory))
    }

    #[test]
    fn test_factory_keeps_identity_and_attributes() {
        let mut attributes = Attributes::new();
        attributes.insert("location".to_string(), json!("EU"));

        let resource =
            DefaultResourceFactory.create(&"google_storage_bucket".into(), "my-bucket", attributes);

        assert_eq!(resource.id(), "my-bucket");
        assert_eq!(resource.resource_type().as_str(), "google_storage_bucket");
        assert_eq!(resource.attribute_str("location"), Some("EU"));
    }

    #[test]
    fn test_deserialize_object_with_id() {
        let resource = deserializer()
            .deserialize_one(
                &"google_compute_firewall".into(),
                json!({"id": "projects/p/global/firewalls/allow-ssh", "direction": "INGRESS"}),
            )
            .unwrap();

        assert_eq!(resource.id(), "projects/p/global/firewalls/allow-ssh");
        assert_eq!(resource.attribute_str("direction"), Some("INGRESS"));
    }

    #[test]
    fn test_deserialize_numeric_id() {
        let resource = deserializer()
            .deserialize_one(&"google_compute_network".into(), json!({"id": 42}))
            .unwrap();
        assert_eq!(resource.id(), "42");
    }

    #[test]
    fn test_deserialize_rejects_non_objects_and_missing_ids() {
        let ty = ResourceType::from("google_compute_network");

        let err = deserializer().deserialize_one(&ty, json!([1, 2])).unwrap_err();
        assert!(matches!(err, DeserializeError::NotAnObject { found: "an array", .. }));

        let err = deserializer()
            .deserialize_one(&ty, json!({"name": "default"}))
            .unwrap_err();
        assert!(matches!(err, DeserializeError::MissingId { .. }));
    }
}
