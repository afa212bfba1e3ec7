//! Bracketed full names for levels and properties.
//!
//! ```text
//! [Geography].[Country]                 hierarchy shares the dimension name
//! [Geography].[Alt].[Country]           explicit hierarchy
//! [Geography].[Country].[ISO 3]         property of the first form
//! [Geography].[Alt].[Country].[ISO 3]   property of the second form
//! ```
//!
//! A `]` inside a segment is written as `]]`.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed full name '{0}'")]
pub struct FullNameError(pub String);

/// Build a level full name.
pub fn level_full_name(dimension: &str, hierarchy: &str, level: &str) -> String {
    if dimension == hierarchy {
        join_segments(&[dimension, level])
    } else {
        join_segments(&[dimension, hierarchy, level])
    }
}

/// Build a property full name.
pub fn property_full_name(dimension: &str, hierarchy: &str, level: &str, property: &str) -> String {
    if dimension == hierarchy {
        join_segments(&[dimension, level, property])
    } else {
        join_segments(&[dimension, hierarchy, level, property])
    }
}

/// Parsed level full name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelName {
    pub dimension: String,
    pub hierarchy: String,
    pub level: String,
}

impl LevelName {
    pub fn parse(input: &str) -> Result<Self, FullNameError> {
        let segments = split_segments(input)?;
        match segments.as_slice() {
            [dimension, level] => Ok(Self {
                dimension: dimension.clone(),
                hierarchy: dimension.clone(),
                level: level.clone(),
            }),
            [dimension, hierarchy, level] => Ok(Self {
                dimension: dimension.clone(),
                hierarchy: hierarchy.clone(),
                level: level.clone(),
            }),
            _ => Err(FullNameError(input.to_string())),
        }
    }
}

/// Parsed property full name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyName {
    pub level: LevelName,
    pub property: String,
}

impl PropertyName {
    pub fn parse(input: &str) -> Result<Self, FullNameError> {
        let mut segments = split_segments(input)?;
        if !(3..=4).contains(&segments.len()) {
            return Err(FullNameError(input.to_string()));
        }
        let property = segments.pop().unwrap_or_default();
        let level = segments.pop().unwrap_or_default();
        let dimension = segments.remove(0);
        let hierarchy = segments.pop().unwrap_or_else(|| dimension.clone());
        Ok(Self {
            level: LevelName {
                dimension,
                hierarchy,
                level,
            },
            property,
        })
    }
}

fn join_segments(segments: &[&str]) -> String {
    segments
        .iter()
        .map(|segment| format!("[{}]", segment.replace(']', "]]")))
        .collect::<Vec<_>>()
        .join(".")
}

fn split_segments(input: &str) -> Result<Vec<String>, FullNameError> {
    let malformed = || FullNameError(input.to_string());
    let mut segments = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        if chars.next() != Some('[') {
            return Err(malformed());
        }
        let mut segment = String::new();
        loop {
            match chars.next() {
                Some(']') if chars.peek() == Some(&']') => {
                    chars.next();
                    segment.push(']');
                }
                Some(']') => break,
                Some(c) => segment.push(c),
                None => return Err(malformed()),
            }
        }
        segments.push(segment);

        match chars.next() {
            None => return Ok(segments),
            Some('.') => continue,
            Some(_) => return Err(malformed()),
        }
    }
}
