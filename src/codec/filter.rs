//! Filter token grammar shared by both codecs.
//!
//! ```text
//! <measure>.<cmp>.<value>[.<joint>.<cmp>.<value>]
//! Trade Value.gt.1000
//! Trade Value.gte.10.5.and.lt.20
//! ```
//!
//! Measure names and decimal values may contain dots, so the token is matched
//! as a whole rather than split on `.`. Comparison and joint symbols are
//! case-sensitive.

use once_cell::sync::Lazy;
use regex::Regex;

use super::{CodecError, CodecResult};
use crate::model::{format_value, Comparison, FilterCondition, FilterItem, Joint};

static FILTER_TOKEN: Lazy<Regex> = Lazy::new(|| {
    let cmp = "gte|gt|lte|lt|neq|eq";
    let num = r"-?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][+-]?\d+)?";
    Regex::new(&format!(
        r"^(?P<measure>.+?)\.(?P<cmp1>{cmp})\.(?P<val1>{num})(?:\.(?P<joint>and|or)\.(?P<cmp2>{cmp})\.(?P<val2>{num}))?$"
    ))
    .unwrap()
});

/// A parsed filter token.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterToken {
    pub measure: String,
    pub condition_one: FilterCondition,
    pub condition_two: Option<(Joint, FilterCondition)>,
}

/// Render the conditions of a filter as a token.
///
/// Values are written in canonical numeric form. The typed text is not part
/// of the token; permalinks carry it in a separate field.
pub fn format_filter_token(filter: &FilterItem) -> String {
    let mut token = format!(
        "{}.{}.{}",
        filter.measure,
        filter.condition_one.comparison.symbol(),
        format_value(filter.condition_one.value)
    );
    if let Some(two) = filter.complete_condition_two() {
        token.push_str(&format!(
            ".{}.{}.{}",
            filter.joint.symbol(),
            two.comparison.symbol(),
            format_value(two.value)
        ));
    }
    token
}

pub fn parse_filter_token(token: &str) -> CodecResult<FilterToken> {
    let malformed = || CodecError::MalformedFilter(token.to_string());
    let caps = FILTER_TOKEN.captures(token).ok_or_else(malformed)?;

    let condition = |cmp: &str, val: &str| -> CodecResult<FilterCondition> {
        let comparison = Comparison::from_symbol(&caps[cmp]).ok_or_else(malformed)?;
        let value: f64 = caps[val].parse().map_err(|_| malformed())?;
        Ok(FilterCondition::from_value(comparison, value))
    };

    let condition_one = condition("cmp1", "val1")?;
    let condition_two = match caps.name("joint") {
        Some(joint) => {
            let joint = Joint::from_symbol(joint.as_str()).ok_or_else(malformed)?;
            Some((joint, condition("cmp2", "val2")?))
        }
        None => None,
    };

    Ok(FilterToken {
        measure: caps["measure"].to_string(),
        condition_one,
        condition_two,
    })
}
