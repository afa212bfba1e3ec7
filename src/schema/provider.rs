//! SchemaProvider trait definition.
//!
//! The SchemaProvider trait abstracts over the ways cube metadata and level
//! members reach the query model: an HTTP schema endpoint in a browser shell,
//! or a JSON document on disk for the CLI and tests.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{Cube, Member, Schema};
use crate::model::QueryParams;

/// Errors raised by schema providers.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("cube not found: {0}")]
    CubeNotFound(String),

    #[error("level '{level}' not found in cube '{cube}'")]
    LevelNotFound { cube: String, level: String },

    #[error("failed to read schema: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error("schema provider failed: {0}")]
    Remote(String),
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Trait for fetching cube metadata and level members.
#[async_trait]
pub trait SchemaProvider: Send + Sync {
    /// Fetch a cube's metadata tree, localized for `locale`.
    async fn fetch_cube(&self, name: &str, locale: Option<&str>) -> ProviderResult<Cube>;

    /// Fetch the members of a level (referenced by bare name).
    async fn fetch_members(
        &self,
        cube: &str,
        level: &str,
        locale: Option<&str>,
    ) -> ProviderResult<Vec<Member>>;
}

/// In-memory provider backed by a schema document.
///
/// Members are served from the `members` map keyed by `(cube, level)`;
/// locale is ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticSchema {
    schema: Schema,
    members: HashMap<(String, String), Vec<Member>>,
}

impl StaticSchema {
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            members: HashMap::new(),
        }
    }

    /// Load a schema document from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ProviderResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let schema: Schema = serde_json::from_str(&content)?;
        Ok(Self::new(schema))
    }

    /// Register the member list of a level.
    pub fn with_members(mut self, cube: &str, level: &str, members: Vec<Member>) -> Self {
        self.members
            .insert((cube.to_string(), level.to_string()), members);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }
}

#[async_trait]
impl SchemaProvider for StaticSchema {
    async fn fetch_cube(&self, name: &str, _locale: Option<&str>) -> ProviderResult<Cube> {
        self.schema
            .cube(name)
            .cloned()
            .ok_or_else(|| ProviderError::CubeNotFound(name.to_string()))
    }

    async fn fetch_members(
        &self,
        cube: &str,
        level: &str,
        _locale: Option<&str>,
    ) -> ProviderResult<Vec<Member>> {
        let cube_meta = self
            .schema
            .cube(cube)
            .ok_or_else(|| ProviderError::CubeNotFound(cube.to_string()))?;
        if !cube_meta.levels().any(|l| l.level.name == level) {
            return Err(ProviderError::LevelNotFound {
                cube: cube.to_string(),
                level: level.to_string(),
            });
        }
        Ok(self
            .members
            .get(&(cube.to_string(), level.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

/// Populate `members` on every drilldown of `params`.
///
/// Member lists are fetched concurrently in the query's locale and written
/// back by drilldown key once every fetch has settled. `params` stays
/// borrowed for the whole call, so its drilldowns cannot change while members
/// load. Fetch failures leave the drilldown's cached members untouched; the
/// number of drilldowns that were updated is returned.
pub async fn hydrate_members<P: SchemaProvider + ?Sized>(
    provider: &P,
    params: &mut QueryParams,
) -> usize {
    let cube = params.cube.clone();
    let locale = params.locale.clone();
    let requests: Vec<(String, String)> = params
        .drilldowns
        .values()
        .map(|dd| (dd.key.clone(), dd.level.clone()))
        .collect();

    let futures: Vec<_> = requests
        .iter()
        .map(|(_, level)| provider.fetch_members(&cube, level, locale.as_deref()))
        .collect();
    let results = futures::future::join_all(futures).await;

    let mut updated = 0;
    for ((key, level), result) in requests.into_iter().zip(results) {
        match result {
            Ok(members) => {
                if let Some(drilldown) = params.drilldowns.get_mut(&key) {
                    debug!(level = %level, count = members.len(), "drilldown members loaded");
                    drilldown.members = members;
                    updated += 1;
                }
            }
            Err(err) => {
                warn!(level = %level, error = %err, "failed to load drilldown members");
            }
        }
    }
    updated
}
