//! Generic records, typed identifiers and equality filters

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use utoipa::openapi::{
    schema::{AdditionalProperties, KnownFormat, ObjectBuilder, Schema, SchemaFormat, SchemaType},
    RefOr,
};

use crate::error::{AppError, AppResult};

/// A loosely typed record stored in a named collection
///
/// `id`, `createdAt` and `updatedAt` are managed by the record store; all
/// other fields are kept as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Value of a field by its wire name, including the managed ones
    pub fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "createdAt" => self.created_at.and_then(|t| serde_json::to_value(t).ok()),
            "updatedAt" => self.updated_at.and_then(|t| serde_json::to_value(t).ok()),
            _ => self.fields.get(name).cloned(),
        }
    }

    pub fn matches(&self, filter: &Filter) -> bool {
        filter
            .iter()
            .all(|(key, expected)| self.field(key).as_ref() == Some(expected))
    }

    pub fn to_object(&self) -> AppResult<Map<String, Value>> {
        to_fields(self)
    }

    pub fn from_object(object: Map<String, Value>) -> AppResult<Self> {
        Ok(serde_json::from_value(Value::Object(object))?)
    }
}

// Free-form object with the managed fields spelled out
impl<'s> utoipa::ToSchema<'s> for Record {
    fn schema() -> (&'s str, RefOr<Schema>) {
        let timestamp = || {
            ObjectBuilder::new()
                .schema_type(SchemaType::String)
                .format(Some(SchemaFormat::KnownFormat(KnownFormat::DateTime)))
        };
        (
            "Record",
            ObjectBuilder::new()
                .property("id", ObjectBuilder::new().schema_type(SchemaType::String))
                .required("id")
                .property("createdAt", timestamp())
                .property("updatedAt", timestamp())
                .additional_properties(Some(AdditionalProperties::FreeForm(true)))
                .into(),
        )
    }
}

/// Serialize any value into a JSON object's fields
pub fn to_fields<S: Serialize + ?Sized>(value: &S) -> AppResult<Map<String, Value>> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(AppError::Validation(format!(
            "Expected an object of fields, got {}",
            other
        ))),
    }
}

/// Exact-equality filter over record fields
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Filter(Map<String, Value>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Filter {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Record identifier tagged with the entity it points at
pub struct Id<T> {
    value: String,
    _kind: PhantomData<fn() -> T>,
}

impl<T> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _kind: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn into_string(self) -> String {
        self.value
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Id({})", self.value)
    }
}

impl<T> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

/// A typed view over the records of one collection
pub trait Entity: Serialize + DeserializeOwned + Send {
    /// Collection name inside the record blob
    const RESOURCE: &'static str;

    fn from_record(record: Record) -> AppResult<Self> {
        Ok(serde_json::from_value(serde_json::to_value(record)?)?)
    }
}
