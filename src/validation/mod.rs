//! Validity checks for query parameters.
//!
//! A query is executable when it passes an ordered chain of rules. Failures
//! are not errors: they surface as a [`QueryIssue`] the UI uses to disable
//! the run action and show a single message, so only the first failing rule
//! is reported.

use std::collections::{HashMap, HashSet};

use serde_json::Value;

use crate::model::QueryParams;

/// Reason a query is not executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryIssue {
    /// Plain input does not have the shape of a query.
    Malformed(String),
    /// No cube selected.
    NoCube,
    /// No active measure.
    NoMeasures,
    /// No active drilldown.
    NoDrilldowns,
    /// Two active drilldowns use different hierarchies of one dimension.
    DuplicatedHierarchy {
        dimension: String,
        hierarchies: Vec<String>,
    },
    /// Two active cuts restrict the same level.
    DuplicatedCutLevel { level: String },
}

impl QueryIssue {
    /// Stable identifier, used as a translation key by the UI.
    pub fn id(&self) -> &'static str {
        match self {
            QueryIssue::Malformed(_) => "query.malformed",
            QueryIssue::NoCube => "query.no_cube",
            QueryIssue::NoMeasures => "query.no_measures",
            QueryIssue::NoDrilldowns => "query.no_drilldowns",
            QueryIssue::DuplicatedHierarchy { .. } => "query.duplicated_hierarchy",
            QueryIssue::DuplicatedCutLevel { .. } => "query.duplicated_cut_level",
        }
    }
}

impl std::fmt::Display for QueryIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryIssue::Malformed(msg) => write!(f, "Malformed query: {}", msg),
            QueryIssue::NoCube => write!(f, "Select a cube"),
            QueryIssue::NoMeasures => write!(f, "Select at least one measure"),
            QueryIssue::NoDrilldowns => write!(f, "Select at least one drilldown"),
            QueryIssue::DuplicatedHierarchy {
                dimension,
                hierarchies,
            } => write!(
                f,
                "Dimension '{}' is drilled down through more than one hierarchy: {}",
                dimension,
                hierarchies.join(", ")
            ),
            QueryIssue::DuplicatedCutLevel { level } => {
                write!(f, "Level '{}' has more than one cut", level)
            }
        }
    }
}

impl std::error::Error for QueryIssue {}

type Rule = fn(&QueryParams) -> Result<(), QueryIssue>;

/// Rules in evaluation order.
const RULES: [Rule; 5] = [
    check_cube,
    check_measures,
    check_drilldowns,
    check_hierarchies,
    check_cut_levels,
];

/// Whether the query passes every rule.
pub fn is_valid_query(params: &QueryParams) -> bool {
    first_issue(params).is_none()
}

/// The first rule the query fails, if any.
pub fn first_issue(params: &QueryParams) -> Option<QueryIssue> {
    validate(params).err()
}

/// Run the rule chain, stopping at the first failure.
pub fn validate(params: &QueryParams) -> Result<(), QueryIssue> {
    RULES.iter().try_for_each(|rule| rule(params))
}

/// Structural check of a plain (JSON) query, returning the typed form.
///
/// `measures` and `drilldowns` must be objects keyed by item key; the
/// remaining fields are checked by deserialization.
pub fn check_plain(value: &Value) -> Result<QueryParams, QueryIssue> {
    let object = value
        .as_object()
        .ok_or_else(|| QueryIssue::Malformed("expected an object".to_string()))?;

    match object.get("cube") {
        Some(Value::String(_)) | None => {}
        Some(_) => return Err(QueryIssue::Malformed("cube must be a string".to_string())),
    }
    for field in ["measures", "drilldowns"] {
        match object.get(field) {
            Some(Value::Object(_)) | None => {}
            Some(_) => {
                return Err(QueryIssue::Malformed(format!(
                    "{} must be a map keyed by item key",
                    field
                )))
            }
        }
    }

    serde_json::from_value(value.clone()).map_err(|err| QueryIssue::Malformed(err.to_string()))
}

fn check_cube(params: &QueryParams) -> Result<(), QueryIssue> {
    if params.cube.is_empty() {
        return Err(QueryIssue::NoCube);
    }
    Ok(())
}

fn check_measures(params: &QueryParams) -> Result<(), QueryIssue> {
    if params.active_measures().next().is_none() {
        return Err(QueryIssue::NoMeasures);
    }
    Ok(())
}

fn check_drilldowns(params: &QueryParams) -> Result<(), QueryIssue> {
    if params.active_drilldowns().next().is_none() {
        return Err(QueryIssue::NoDrilldowns);
    }
    Ok(())
}

fn check_hierarchies(params: &QueryParams) -> Result<(), QueryIssue> {
    let mut seen: HashMap<&str, Vec<&str>> = HashMap::new();
    for dd in params.active_drilldowns() {
        let hierarchies = seen.entry(dd.dimension.as_str()).or_default();
        if !hierarchies.contains(&dd.hierarchy.as_str()) {
            hierarchies.push(dd.hierarchy.as_str());
        }
    }

    let mut conflicts: Vec<_> = seen
        .into_iter()
        .filter(|(_, hierarchies)| hierarchies.len() > 1)
        .collect();
    // Report the same dimension every time for the same query.
    conflicts.sort_by(|a, b| a.0.cmp(b.0));

    match conflicts.into_iter().next() {
        Some((dimension, mut hierarchies)) => {
            hierarchies.sort();
            Err(QueryIssue::DuplicatedHierarchy {
                dimension: dimension.to_string(),
                hierarchies: hierarchies.into_iter().map(String::from).collect(),
            })
        }
        None => Ok(()),
    }
}

fn check_cut_levels(params: &QueryParams) -> Result<(), QueryIssue> {
    let mut seen = HashSet::new();
    for cut in params.active_cuts() {
        let level = cut.full_name();
        if !seen.insert(level.clone()) {
            return Err(QueryIssue::DuplicatedCutLevel { level });
        }
    }
    Ok(())
}
