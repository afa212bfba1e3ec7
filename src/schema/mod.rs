//! Cube metadata: types, flattened walks, full names and providers.
//!
//! The schema is an external collaborator. The query model only stores
//! names; everything here exists so codecs can resolve those names against
//! the cube a query targets.

mod names;
mod provider;
mod types;
mod walk;

pub use names::{level_full_name, property_full_name, FullNameError, LevelName, PropertyName};
pub use provider::{hydrate_members, ProviderError, ProviderResult, SchemaProvider, StaticSchema};
pub use types::{
    Cube, Dimension, DimensionType, Hierarchy, Level, Measure, Member, Property, Schema,
};
pub use walk::{LevelIndex, LevelRef, MeasureWalk, PropertyRef};
