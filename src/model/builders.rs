//! Builders that normalize loosely typed input into query items.
//!
//! Every builder is total: any JSON value (even `null`) produces a
//! structurally valid item. Missing strings become empty, missing flags take
//! the item's default, and numbers that fail to parse become `NaN`. A `key`
//! present in the input is always kept, so feeding an item's
//! [`to_plain`](super::QueryParamsItem::to_plain) output back into its builder
//! preserves identity.

use serde_json::Value;

use super::items::{
    format_value, Comparison, CutItem, DrilldownItem, FilterCondition, FilterItem, Joint,
    MeasureItem, PropertyItem,
};
use super::key::{content_key, random_key};
use crate::schema::{LevelRef, Member};

pub fn build_measure(props: &Value) -> MeasureItem {
    let name = str_field(props, "name");
    let key = key_field(props).unwrap_or_else(|| {
        if name.is_empty() {
            random_key()
        } else {
            name.clone()
        }
    });
    MeasureItem {
        key,
        active: bool_field(props, "active").unwrap_or(false),
        name,
    }
}

pub fn build_property(props: &Value) -> PropertyItem {
    let level = str_field(props, "level");
    let name = str_field(props, "name");
    let key = key_field(props).unwrap_or_else(|| property_key(&level, &name));
    PropertyItem {
        key,
        active: bool_field(props, "active").unwrap_or(false),
        level,
        name,
    }
}

/// Build a drilldown. Drilldowns default to active.
pub fn build_drilldown(props: &Value) -> DrilldownItem {
    let (dimension, hierarchy, level) = level_fields(props);
    let key = key_field(props).unwrap_or_else(|| drilldown_key(&dimension, &hierarchy, &level));

    let properties = array_field(props, "properties")
        .iter()
        .map(|prop| {
            let mut item = build_property(prop);
            if item.level.is_empty() {
                item.level = level.clone();
                if key_field(prop).is_none() {
                    item.key = property_key(&item.level, &item.name);
                }
            }
            item
        })
        .collect();

    let members = array_field(props, "members")
        .iter()
        .filter_map(build_member)
        .collect();

    DrilldownItem {
        key,
        active: bool_field(props, "active").unwrap_or(true),
        dimension,
        hierarchy,
        level,
        properties,
        members,
        caption_property: str_field(props, "captionProperty"),
    }
}

pub fn build_cut(props: &Value) -> CutItem {
    let (dimension, hierarchy, level) = level_fields(props);
    let key = key_field(props).unwrap_or_else(|| cut_key(&dimension, &hierarchy, &level));
    let members = array_field(props, "members")
        .iter()
        .filter_map(scalar_to_string)
        .collect();

    CutItem {
        key,
        active: bool_field(props, "active").unwrap_or(false),
        dimension,
        hierarchy,
        level,
        members,
        exclude: bool_field(props, "exclude").unwrap_or(false),
    }
}

pub fn build_filter(props: &Value) -> FilterItem {
    let measure = str_field(props, "measure");
    let condition_one = props
        .get("conditionOne")
        .map(build_condition)
        .unwrap_or_else(|| FilterCondition::new(Comparison::Gt, "", f64::NAN));
    let condition_two = props
        .get("conditionTwo")
        .filter(|v| !v.is_null())
        .map(build_condition);
    let joint = props
        .get("joint")
        .and_then(Value::as_str)
        .and_then(Joint::from_symbol)
        .unwrap_or_default();

    let key = key_field(props).unwrap_or_else(|| {
        filter_key(&measure, &condition_one, condition_two.as_ref(), joint)
            .unwrap_or_else(random_key)
    });

    FilterItem {
        key,
        active: bool_field(props, "active").unwrap_or(false),
        measure,
        condition_one,
        condition_two,
        joint,
    }
}

/// Build a drilldown for a resolved level of a cube.
pub fn drilldown_for_level(level: LevelRef<'_>, active: bool) -> DrilldownItem {
    let key = drilldown_key(
        &level.dimension.name,
        &level.hierarchy.name,
        &level.level.name,
    );
    DrilldownItem {
        key,
        active,
        dimension: level.dimension.name.clone(),
        hierarchy: level.hierarchy.name.clone(),
        level: level.level.name.clone(),
        properties: level
            .level
            .properties
            .iter()
            .map(|prop| PropertyItem {
                key: property_key(&level.level.name, &prop.name),
                active: false,
                level: level.level.name.clone(),
                name: prop.name.clone(),
            })
            .collect(),
        members: Vec::new(),
        caption_property: String::new(),
    }
}

/// Build a cut for a resolved level of a cube.
pub fn cut_for_level(level: LevelRef<'_>, members: Vec<String>, exclude: bool) -> CutItem {
    CutItem {
        key: cut_key(
            &level.dimension.name,
            &level.hierarchy.name,
            &level.level.name,
        ),
        active: true,
        dimension: level.dimension.name.clone(),
        hierarchy: level.hierarchy.name.clone(),
        level: level.level.name.clone(),
        members,
        exclude,
    }
}

/// Build an active filter whose key derives from its content.
pub fn filter_from_conditions(
    measure: &str,
    condition_one: FilterCondition,
    condition_two: Option<FilterCondition>,
    joint: Joint,
) -> FilterItem {
    let key = filter_key(measure, &condition_one, condition_two.as_ref(), joint)
        .unwrap_or_else(random_key);
    FilterItem {
        key,
        active: true,
        measure: measure.to_string(),
        condition_one,
        condition_two,
        joint,
    }
}

pub(crate) fn drilldown_key(dimension: &str, hierarchy: &str, level: &str) -> String {
    if level.is_empty() {
        return random_key();
    }
    content_key(&["drilldown", dimension, hierarchy, level])
}

pub(crate) fn property_key(level: &str, name: &str) -> String {
    if name.is_empty() {
        return random_key();
    }
    content_key(&["property", level, name])
}

pub(crate) fn cut_key(dimension: &str, hierarchy: &str, level: &str) -> String {
    if level.is_empty() {
        return random_key();
    }
    content_key(&["cut", dimension, hierarchy, level])
}

/// Content key of a filter, if it has a measure and a usable first condition.
///
/// Blank filters have no natural identity: two freshly added filters on the
/// same measure must not collide.
pub(crate) fn filter_key(
    measure: &str,
    one: &FilterCondition,
    two: Option<&FilterCondition>,
    joint: Joint,
) -> Option<String> {
    if measure.is_empty() || !one.is_complete() {
        return None;
    }
    let one_value = format_value(one.value);
    let mut parts = vec!["filter", measure, one.comparison.symbol(), one_value.as_str()];
    let two_value;
    if let Some(two) = two.filter(|c| c.is_complete()) {
        two_value = format_value(two.value);
        parts.extend([joint.symbol(), two.comparison.symbol(), two_value.as_str()]);
    }
    Some(content_key(&parts))
}

/// Accepts `["gt", "1,000", 1000]` or `{"comparison": "gt", "text": ..., "value": ...}`.
fn build_condition(value: &Value) -> FilterCondition {
    let (cmp, text, number) = match value {
        Value::Array(items) => (items.first(), items.get(1), items.get(2)),
        Value::Object(map) => (map.get("comparison"), map.get("text"), map.get("value")),
        _ => (None, None, None),
    };

    let comparison = cmp
        .and_then(Value::as_str)
        .and_then(Comparison::from_symbol)
        .unwrap_or(Comparison::Gt);
    let text = text.and_then(scalar_to_string).unwrap_or_default();
    let value = match number {
        Some(number) if !number.is_null() => to_number(number),
        _ => parse_number(&text),
    };
    FilterCondition::new(comparison, text, value)
}

fn build_member(value: &Value) -> Option<Member> {
    match value {
        Value::Object(map) => Some(Member {
            key: map.get("key").and_then(scalar_to_string)?,
            caption: map.get("caption").and_then(scalar_to_string),
        }),
        other => scalar_to_string(other).map(|key| Member { key, caption: None }),
    }
}

/// Dimension/hierarchy default to each other, and to the level, when missing.
fn level_fields(props: &Value) -> (String, String, String) {
    let level = str_field(props, "level");
    let mut dimension = str_field(props, "dimension");
    let mut hierarchy = str_field(props, "hierarchy");
    if dimension.is_empty() {
        dimension = if hierarchy.is_empty() {
            level.clone()
        } else {
            hierarchy.clone()
        };
    }
    if hierarchy.is_empty() {
        hierarchy = dimension.clone();
    }
    (dimension, hierarchy, level)
}

fn key_field(props: &Value) -> Option<String> {
    props
        .get("key")
        .and_then(scalar_to_string)
        .filter(|key| !key.is_empty())
}

fn str_field(props: &Value, field: &str) -> String {
    props
        .get(field)
        .and_then(scalar_to_string)
        .unwrap_or_default()
}

fn bool_field(props: &Value, field: &str) -> Option<bool> {
    match props.get(field)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn array_field<'a>(props: &'a Value, field: &str) -> &'a [Value] {
    props
        .get(field)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn to_number(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s),
        _ => f64::NAN,
    }
}

/// Parse user-typed numbers, tolerating thousand separators.
pub(crate) fn parse_number(text: &str) -> f64 {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && *c != '_' && !c.is_whitespace())
        .collect();
    cleaned.parse().unwrap_or(f64::NAN)
}
