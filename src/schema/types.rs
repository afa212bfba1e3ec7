//! Cube metadata types.
//!
//! These mirror the schema document served by the OLAP server. The query
//! model never stores references into these structures; it keeps names and
//! resolves them through [`LevelIndex`](super::LevelIndex) on demand.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A collection of cubes, as served by the schema endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub cubes: Vec<Cube>,
}

impl Schema {
    /// Look up a cube by name.
    pub fn cube(&self, name: &str) -> Option<&Cube> {
        self.cubes.iter().find(|cube| cube.name == name)
    }
}

/// An OLAP cube.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Cube {
    pub name: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub annotations: BTreeMap<String, String>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub measures: Vec<Measure>,
}

impl Cube {
    /// Look up a dimension by name.
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|dim| dim.name == name)
    }

    /// Look up a top-level or attached measure by name.
    pub fn measure(&self, name: &str) -> Option<&Measure> {
        self.measures_flat()
            .find(|(measure, _)| measure.name == name)
            .map(|(measure, _)| measure)
    }

    /// Resolve an annotation, preferring the `{key}_{locale}` variant.
    pub fn annotation(&self, key: &str, locale: Option<&str>) -> Option<&str> {
        locale
            .and_then(|locale| self.annotations.get(&format!("{}_{}", key, locale)))
            .or_else(|| self.annotations.get(key))
            .map(String::as_str)
    }
}

/// Kind of dimension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionType {
    #[default]
    Standard,
    Time,
    Geo,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    #[serde(default, rename = "type")]
    pub dimension_type: DimensionType,
    /// Hierarchy used when none is named explicitly.
    #[serde(default)]
    pub default_hierarchy: Option<String>,
    #[serde(default)]
    pub hierarchies: Vec<Hierarchy>,
}

impl Dimension {
    pub fn hierarchy(&self, name: &str) -> Option<&Hierarchy> {
        self.hierarchies.iter().find(|hie| hie.name == name)
    }

    /// The declared default hierarchy, falling back to the first one.
    pub fn default_hierarchy(&self) -> Option<&Hierarchy> {
        self.default_hierarchy
            .as_deref()
            .and_then(|name| self.hierarchy(name))
            .or_else(|| self.hierarchies.first())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hierarchy {
    pub name: String,
    #[serde(default)]
    pub levels: Vec<Level>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub name: String,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl Level {
    pub fn property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|prop| prop.name == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
}

/// A measure, possibly carrying attached sub-measures (e.g. margins of error).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub name: String,
    #[serde(default)]
    pub aggregator: Option<String>,
    #[serde(default)]
    pub attached: Vec<Measure>,
}

/// A member of a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub key: String,
    #[serde(default)]
    pub caption: Option<String>,
}
