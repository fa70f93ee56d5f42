//! Built-in index schemas

use serde::{Deserialize, Serialize};

use super::types::{Field, FieldType, IndexDefinition};

/// Named schemas that can be selected from configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaPreset {
    /// USGS geographic names feature table
    Geonames,
}

impl SchemaPreset {
    pub fn definition(&self, index_name: &str) -> IndexDefinition {
        match self {
            SchemaPreset::Geonames => geonames(index_name),
        }
    }
}

/// Schema for the USGS GeoNames feature table.
///
/// Text columns are full-text searchable; numeric and date columns are
/// facetable instead. `DESCRIPTION` and `HISTORY` are search-only.
pub fn geonames(index_name: &str) -> IndexDefinition {
    let text = |name: &str| {
        Field::new(name, FieldType::String)
            .searchable()
            .filterable()
            .sortable()
    };
    let number = |name: &str| {
        Field::new(name, FieldType::Int32)
            .filterable()
            .sortable()
            .facetable()
    };
    let date = |name: &str| {
        Field::new(name, FieldType::DateTimeOffset)
            .filterable()
            .sortable()
            .facetable()
    };

    IndexDefinition::new(
        index_name,
        vec![
            Field::key("FEATURE_ID", FieldType::String),
            text("FEATURE_NAME"),
            text("FEATURE_CLASS"),
            text("STATE_ALPHA"),
            number("STATE_NUMERIC"),
            text("COUNTY_NAME"),
            number("COUNTY_NUMERIC"),
            Field::new("LOCATION", FieldType::GeographyPoint)
                .filterable()
                .sortable(),
            number("ELEV_IN_M"),
            number("ELEV_IN_FT"),
            text("MAP_NAME"),
            Field::new("DESCRIPTION", FieldType::String).searchable(),
            Field::new("HISTORY", FieldType::String).searchable(),
            date("DATE_CREATED"),
            date("DATE_EDITED"),
        ],
    )
}
