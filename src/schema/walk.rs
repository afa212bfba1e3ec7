//! Flattened walks over the cube tree.
//!
//! Levels belong to hierarchies which belong to dimensions, and measures can
//! carry attached sub-measures. Rather than keeping back-pointers, each walk
//! yields the entity together with its ancestors, and [`LevelIndex`] turns
//! those tuples into flat name lookups.

use std::collections::HashMap;

use tracing::warn;

use super::names::{level_full_name, property_full_name};
use super::types::{Cube, Dimension, Hierarchy, Level, Measure, Property};

/// A level together with its parent chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelRef<'a> {
    pub dimension: &'a Dimension,
    pub hierarchy: &'a Hierarchy,
    pub level: &'a Level,
}

impl LevelRef<'_> {
    /// `[Dimension].[Hierarchy].[Level]` (or the two-part short form).
    pub fn full_name(&self) -> String {
        level_full_name(&self.dimension.name, &self.hierarchy.name, &self.level.name)
    }
}

/// A level property together with its level's parent chain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertyRef<'a> {
    pub level: LevelRef<'a>,
    pub property: &'a Property,
}

impl PropertyRef<'_> {
    pub fn full_name(&self) -> String {
        property_full_name(
            &self.level.dimension.name,
            &self.level.hierarchy.name,
            &self.level.level.name,
            &self.property.name,
        )
    }
}

impl Cube {
    /// Every level of the cube, in declaration order.
    pub fn levels(&self) -> impl Iterator<Item = LevelRef<'_>> {
        self.dimensions.iter().flat_map(|dimension| {
            dimension.hierarchies.iter().flat_map(move |hierarchy| {
                hierarchy.levels.iter().map(move |level| LevelRef {
                    dimension,
                    hierarchy,
                    level,
                })
            })
        })
    }

    /// Every level property of the cube, in declaration order.
    pub fn properties(&self) -> impl Iterator<Item = PropertyRef<'_>> {
        self.levels().flat_map(|level| {
            level
                .level
                .properties
                .iter()
                .map(move |property| PropertyRef { level, property })
        })
    }

    /// Depth-first walk over measures and their attached sub-measures.
    ///
    /// Each item carries the measure's direct parent, `None` for top-level measures.
    pub fn measures_flat(&self) -> MeasureWalk<'_> {
        MeasureWalk {
            stack: self.measures.iter().rev().map(|m| (m, None)).collect(),
        }
    }
}

/// Iterator returned by [`Cube::measures_flat`].
pub struct MeasureWalk<'a> {
    stack: Vec<(&'a Measure, Option<&'a Measure>)>,
}

impl<'a> Iterator for MeasureWalk<'a> {
    type Item = (&'a Measure, Option<&'a Measure>);

    fn next(&mut self) -> Option<Self::Item> {
        let (measure, parent) = self.stack.pop()?;
        self.stack
            .extend(measure.attached.iter().rev().map(|child| (child, Some(measure))));
        Some((measure, parent))
    }
}

/// Name lookups for the levels of a single cube.
///
/// Level names are only unique inside a cube, so an index is built per cube
/// and never shared across cubes.
#[derive(Debug, Clone)]
pub struct LevelIndex<'a> {
    cube: &'a Cube,
    by_name: HashMap<&'a str, LevelRef<'a>>,
    by_full_name: HashMap<String, LevelRef<'a>>,
}

impl<'a> LevelIndex<'a> {
    pub fn new(cube: &'a Cube) -> Self {
        let mut by_name: HashMap<&'a str, LevelRef<'a>> = HashMap::new();
        let mut by_full_name = HashMap::new();

        for level in cube.levels() {
            by_full_name.insert(level.full_name(), level);
            if let Some(existing) = by_name.get(level.level.name.as_str()) {
                warn!(
                    cube = %cube.name,
                    level = %level.level.name,
                    kept = %existing.full_name(),
                    ignored = %level.full_name(),
                    "duplicate level name in cube; keeping first definition"
                );
                continue;
            }
            by_name.insert(level.level.name.as_str(), level);
        }

        Self {
            cube,
            by_name,
            by_full_name,
        }
    }

    pub fn cube(&self) -> &'a Cube {
        self.cube
    }

    /// Resolve a bare level name.
    pub fn by_name(&self, name: &str) -> Option<LevelRef<'a>> {
        self.by_name.get(name).copied()
    }

    /// Resolve a level full name.
    pub fn by_full_name(&self, full_name: &str) -> Option<LevelRef<'a>> {
        self.by_full_name.get(full_name).copied()
    }

    /// Resolve an explicit (dimension, hierarchy, level) triple.
    pub fn by_parts(&self, dimension: &str, hierarchy: &str, level: &str) -> Option<LevelRef<'a>> {
        self.by_full_name(&level_full_name(dimension, hierarchy, level))
    }

    /// Split a `level.property` token into a level and one of its properties.
    ///
    /// Both names may contain dots, so every known level that prefixes the
    /// token is tried, longest first.
    pub fn split_property(&self, token: &str) -> Option<PropertyRef<'a>> {
        let mut candidates: Vec<_> = self
            .by_name
            .iter()
            .filter(|(name, _)| {
                let name: &str = name;
                token.len() > name.len() + 1
                    && token.starts_with(name)
                    && token.as_bytes()[name.len()] == b'.'
            })
            .collect();
        candidates.sort_by_key(|(name, _)| std::cmp::Reverse(name.len()));

        candidates.into_iter().find_map(|(name, level)| {
            let property_name = &token[name.len() + 1..];
            level
                .level
                .property(property_name)
                .map(|property| PropertyRef {
                    level: *level,
                    property,
                })
        })
    }
}
