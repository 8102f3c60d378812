//! Entity domain model
//!
//! An entity is a single typed record in the backing store, identified by a
//! UUID and carrying arbitrary JSON properties.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// A record in the entity store
///
/// Serializes to a single flat JSON object: `uuid` and `type` next to the
/// entity's own properties.
///
/// # Examples
///
/// ```
/// use entity_export::domain::entity::Entity;
/// use serde_json::json;
///
/// let entity = Entity::builder()
///     .entity_type("user")
///     .property("username", json!("ada"))
///     .build()
///     .unwrap();
///
/// let record = serde_json::to_value(&entity).unwrap();
/// assert_eq!(record["type"], "user");
/// assert_eq!(record["username"], "ada");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Unique identifier
    pub uuid: Uuid,

    /// Entity type (usually the singular collection name)
    #[serde(rename = "type")]
    pub entity_type: String,

    /// All remaining properties
    #[serde(flatten)]
    pub properties: Map<String, Value>,
}

impl Entity {
    /// Creates a new builder for constructing an Entity
    pub fn builder() -> EntityBuilder {
        EntityBuilder::default()
    }

    /// Full JSON representation as an object map
    pub fn to_record(&self) -> Map<String, Value> {
        let mut record = Map::with_capacity(self.properties.len() + 2);
        record.insert("uuid".to_string(), Value::String(self.uuid.to_string()));
        record.insert("type".to_string(), Value::String(self.entity_type.clone()));
        for (key, value) in &self.properties {
            record.insert(key.clone(), value.clone());
        }
        record
    }
}

/// Builder for constructing Entity instances
#[derive(Debug, Default)]
pub struct EntityBuilder {
    uuid: Option<Uuid>,
    entity_type: Option<String>,
    properties: Map<String, Value>,
}

impl EntityBuilder {
    /// Creates a new EntityBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the UUID (a random one is generated otherwise)
    pub fn uuid(mut self, uuid: Uuid) -> Self {
        self.uuid = Some(uuid);
        self
    }

    /// Sets the entity type
    pub fn entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    /// Adds one property; `uuid` and `type` are reserved and ignored
    pub fn property(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if key != "uuid" && key != "type" {
            self.properties.insert(key, value);
        }
        self
    }

    /// Builds the Entity
    ///
    /// # Errors
    ///
    /// Returns an error if the entity type is missing or empty
    pub fn build(self) -> Result<Entity, String> {
        let entity_type = self.entity_type.ok_or("entity_type is required")?;
        if entity_type.trim().is_empty() {
            return Err("entity_type cannot be empty".to_string());
        }
        Ok(Entity {
            uuid: self.uuid.unwrap_or_else(Uuid::new_v4),
            entity_type,
            properties: self.properties,
        })
    }
}
