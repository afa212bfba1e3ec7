// src/model/items.rs
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::schema::{level_full_name, Member};

/// Common surface of every record stored in a [`QueryParams`](super::QueryParams) map.
pub trait QueryParamsItem {
    /// Immutable identity, also the item's map key.
    fn key(&self) -> &str;

    /// Whether the item contributes to the request.
    fn is_active(&self) -> bool;

    fn set_active(&mut self, active: bool);

    /// Plain JSON form, accepted back by the matching builder.
    fn to_plain(&self) -> Value;
}

/// A measure selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureItem {
    pub key: String,
    pub active: bool,
    pub name: String,
}

/// A level property requested alongside a drilldown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyItem {
    pub key: String,
    pub active: bool,
    /// Bare name of the owning level.
    pub level: String,
    pub name: String,
}

/// A drilldown level, referenced by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrilldownItem {
    pub key: String,
    pub active: bool,
    pub dimension: String,
    pub hierarchy: String,
    pub level: String,
    pub properties: Vec<PropertyItem>,
    /// Cached level members, filled in after creation.
    pub members: Vec<Member>,
    /// Property used to caption members in the UI (empty for none).
    pub caption_property: String,
}

impl DrilldownItem {
    pub fn full_name(&self) -> String {
        level_full_name(&self.dimension, &self.hierarchy, &self.level)
    }

    pub fn active_properties(&self) -> impl Iterator<Item = &PropertyItem> {
        self.properties.iter().filter(|prop| prop.active)
    }
}

/// A restriction to some members of a level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CutItem {
    pub key: String,
    pub active: bool,
    pub dimension: String,
    pub hierarchy: String,
    pub level: String,
    pub members: Vec<String>,
    /// Exclude the members instead of restricting to them.
    #[serde(default)]
    pub exclude: bool,
}

impl CutItem {
    pub fn full_name(&self) -> String {
        level_full_name(&self.dimension, &self.hierarchy, &self.level)
    }

    /// Active and with at least one member selected.
    ///
    /// An active cut with no members is a no-op, not an error.
    pub fn is_active_cut(&self) -> bool {
        self.active && !self.members.is_empty()
    }
}

/// Comparison operator of a filter condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
    Neq,
}

impl Comparison {
    pub const ALL: [Comparison; 6] = [
        Comparison::Gt,
        Comparison::Gte,
        Comparison::Lt,
        Comparison::Lte,
        Comparison::Eq,
        Comparison::Neq,
    ];

    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Gt => "gt",
            Comparison::Gte => "gte",
            Comparison::Lt => "lt",
            Comparison::Lte => "lte",
            Comparison::Eq => "eq",
            Comparison::Neq => "neq",
        }
    }

    /// Case-sensitive lookup in the symbol table.
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cmp| cmp.symbol() == symbol)
    }
}

impl std::fmt::Display for Comparison {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// How two filter conditions combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Joint {
    #[default]
    And,
    Or,
}

impl Joint {
    pub fn symbol(self) -> &'static str {
        match self {
            Joint::And => "and",
            Joint::Or => "or",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "and" => Some(Joint::And),
            "or" => Some(Joint::Or),
            _ => None,
        }
    }
}

/// One side of a filter: operator, the text the user typed, and its parsed value.
///
/// The text is kept so formatting such as thousand separators survives redisplay.
/// A value that is not a finite number serializes as `null` and reads back
/// as `NaN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "(Comparison, String, Option<f64>)",
    into = "(Comparison, String, Option<f64>)"
)]
pub struct FilterCondition {
    pub comparison: Comparison,
    pub text: String,
    pub value: f64,
}

impl FilterCondition {
    pub fn new(comparison: Comparison, text: impl Into<String>, value: f64) -> Self {
        Self {
            comparison,
            text: text.into(),
            value,
        }
    }

    /// Condition whose text is the canonical rendering of `value`.
    pub fn from_value(comparison: Comparison, value: f64) -> Self {
        Self::new(comparison, format_value(value), value)
    }

    pub fn is_complete(&self) -> bool {
        self.value.is_finite()
    }

    fn to_plain(&self) -> Value {
        json!([self.comparison.symbol(), self.text, self.value])
    }
}

impl From<(Comparison, String, Option<f64>)> for FilterCondition {
    fn from((comparison, text, value): (Comparison, String, Option<f64>)) -> Self {
        Self {
            comparison,
            text,
            value: value.unwrap_or(f64::NAN),
        }
    }
}

impl From<FilterCondition> for (Comparison, String, Option<f64>) {
    fn from(cond: FilterCondition) -> Self {
        let value = cond.value.is_finite().then_some(cond.value);
        (cond.comparison, cond.text, value)
    }
}

/// A measure filter with one or two conditions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterItem {
    pub key: String,
    pub active: bool,
    pub measure: String,
    pub condition_one: FilterCondition,
    pub condition_two: Option<FilterCondition>,
    pub joint: Joint,
}

impl FilterItem {
    /// Active, with a measure and a usable first condition.
    pub fn is_active_filter(&self) -> bool {
        self.active && !self.measure.is_empty() && self.condition_one.is_complete()
    }

    /// The second condition, if it is usable.
    pub fn complete_condition_two(&self) -> Option<&FilterCondition> {
        self.condition_two.as_ref().filter(|cond| cond.is_complete())
    }
}

/// Canonical text for a numeric value (`5` rather than `5.0`).
pub fn format_value(value: f64) -> String {
    format!("{}", value)
}

impl QueryParamsItem for MeasureItem {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn to_plain(&self) -> Value {
        json!({"key": self.key, "active": self.active, "name": self.name})
    }
}

impl QueryParamsItem for PropertyItem {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn to_plain(&self) -> Value {
        json!({
            "key": self.key,
            "active": self.active,
            "level": self.level,
            "name": self.name,
        })
    }
}

impl QueryParamsItem for DrilldownItem {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn to_plain(&self) -> Value {
        let members: Vec<Value> = self
            .members
            .iter()
            .map(|m| json!({"key": m.key, "caption": m.caption}))
            .collect();
        json!({
            "key": self.key,
            "active": self.active,
            "dimension": self.dimension,
            "hierarchy": self.hierarchy,
            "level": self.level,
            "properties": self.properties.iter().map(|p| p.to_plain()).collect::<Vec<_>>(),
            "members": members,
            "captionProperty": self.caption_property,
        })
    }
}

impl QueryParamsItem for CutItem {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn to_plain(&self) -> Value {
        json!({
            "key": self.key,
            "active": self.active,
            "dimension": self.dimension,
            "hierarchy": self.hierarchy,
            "level": self.level,
            "members": self.members,
            "exclude": self.exclude,
        })
    }
}

impl QueryParamsItem for FilterItem {
    fn key(&self) -> &str {
        &self.key
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn to_plain(&self) -> Value {
        json!({
            "key": self.key,
            "active": self.active,
            "measure": self.measure,
            "conditionOne": self.condition_one.to_plain(),
            "conditionTwo": self.condition_two.as_ref().map(FilterCondition::to_plain),
            "joint": self.joint.symbol(),
        })
    }
}
