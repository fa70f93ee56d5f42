use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Result, SyncError};

/// Index definition as submitted to (and described back by) the search service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDefinition {
    pub name: String,
    pub fields: Vec<Field>,
}

/// One column of the index schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub key: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub facetable: bool,
    #[serde(default = "default_retrievable")]
    pub retrievable: bool,
}

fn default_retrievable() -> bool {
    true
}

/// Field data types understood by the search service
///
/// Types this crate does not model (`Edm.Single`, complex types, other
/// collections) are kept verbatim in `Other` so a described index still parses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    String,
    Int32,
    Int64,
    Double,
    Boolean,
    DateTimeOffset,
    GeographyPoint,
    StringCollection,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "Edm.String",
            Self::Int32 => "Edm.Int32",
            Self::Int64 => "Edm.Int64",
            Self::Double => "Edm.Double",
            Self::Boolean => "Edm.Boolean",
            Self::DateTimeOffset => "Edm.DateTimeOffset",
            Self::GeographyPoint => "Edm.GeographyPoint",
            Self::StringCollection => "Collection(Edm.String)",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Edm.String" => Self::String,
            "Edm.Int32" => Self::Int32,
            "Edm.Int64" => Self::Int64,
            "Edm.Double" => Self::Double,
            "Edm.Boolean" => Self::Boolean,
            "Edm.DateTimeOffset" => Self::DateTimeOffset,
            "Edm.GeographyPoint" => Self::GeographyPoint,
            "Collection(Edm.String)" => Self::StringCollection,
            _ => Self::Other(value),
        }
    }
}

impl From<FieldType> for String {
    fn from(field_type: FieldType) -> Self {
        field_type.as_str().to_string()
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Field {
    /// A retrievable field with every other capability off
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            key: false,
            searchable: false,
            filterable: false,
            sortable: false,
            facetable: false,
            retrievable: true,
        }
    }

    /// The document key field
    pub fn key(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            key: true,
            ..Self::new(name, field_type)
        }
    }

    pub fn searchable(mut self) -> Self {
        self.searchable = true;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn facetable(mut self) -> Self {
        self.facetable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.retrievable = false;
        self
    }
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// The single key field, if the schema is well formed
    pub fn key_field(&self) -> Option<&Field> {
        let mut keys = self.fields.iter().filter(|f| f.key);
        match (keys.next(), keys.next()) {
            (Some(key), None) => Some(key),
            _ => None,
        }
    }

    /// Local checks run before the definition is submitted.
    ///
    /// Flag combinations are left to the service; only the structural
    /// invariants are enforced here.
    pub fn validate(&self) -> Result<()> {
        if self.fields.is_empty() {
            return Err(SyncError::schema(format!(
                "index '{}' declares no fields",
                self.name
            )));
        }

        let key_count = self.fields.iter().filter(|f| f.key).count();
        if key_count != 1 {
            return Err(SyncError::schema(format!(
                "index '{}' must declare exactly one key field, found {}",
                self.name, key_count
            )));
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(SyncError::schema(format!(
                    "index '{}' has a field with an empty name",
                    self.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(SyncError::schema(format!(
                    "index '{}' declares field '{}' more than once",
                    self.name, field.name
                )));
            }
        }

        Ok(())
    }
}
