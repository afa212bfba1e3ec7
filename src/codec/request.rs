//! Flat data-server request encoding.
//!
//! ```text
//! cube        trade
//! locale      en
//! drilldowns  Year,Country                     bare level names
//! measures    Trade Value,Quantity
//! properties  Country.ISO 3                    level.property
//! include     Year:2020,2021;Country:mex       level:member,member;...
//!                                              (`\` escapes `,` `;` `\` in members)
//! exclude     Flow:2
//! filters     Trade Value.gt.1000,Quantity.lt.5.or.gt.10
//! limit       100,200                          limit,offset
//! sort        Trade Value.desc
//! parents     true                             one field per server flag
//! ```

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, warn};

use super::filter::{format_filter_token, parse_filter_token};
use super::{
    escape_item, search_pairs, split_escaped, split_list, split_unescaped, CodecError,
    CodecResult,
};
use crate::config::QuerySettings;
use crate::model::{
    build_measure, build_property, cut_for_level, drilldown_for_level, filter_from_conditions,
    CutItem, DrilldownItem, Joint, QueryParams, SortDirection, BOOLEAN_FLAGS,
};
use crate::schema::{Cube, LevelIndex};

/// A request in the data server's flat format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlatRequest {
    pub cube: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drilldowns: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub measures: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    /// Server flags, each sent as its own `name=true|false` field.
    #[serde(flatten)]
    pub booleans: BTreeMap<String, bool>,
}

impl FlatRequest {
    /// Fields in wire order, absent ones skipped.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![("cube".to_string(), self.cube.clone())];
        let optional = [
            ("locale", &self.locale),
            ("drilldowns", &self.drilldowns),
            ("measures", &self.measures),
            ("properties", &self.properties),
            ("include", &self.include),
            ("exclude", &self.exclude),
            ("filters", &self.filters),
            ("limit", &self.limit),
            ("sort", &self.sort),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                pairs.push((name.to_string(), value.clone()));
            }
        }
        for (flag, value) in &self.booleans {
            pairs.push((flag.clone(), value.to_string()));
        }
        pairs
    }

    /// URL query string for the data endpoint.
    pub fn to_query_string(&self) -> String {
        url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.to_pairs())
            .finish()
    }

    /// Collect request fields from URL search params. Unknown keys are ignored
    /// and the last occurrence of a repeated key wins.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut request = FlatRequest::default();
        for (key, value) in pairs {
            let value = value.into();
            match key.as_ref() {
                "cube" => request.cube = value,
                "locale" => request.locale = Some(value),
                "drilldowns" => request.drilldowns = Some(value),
                "measures" => request.measures = Some(value),
                "properties" => request.properties = Some(value),
                "include" => request.include = Some(value),
                "exclude" => request.exclude = Some(value),
                "filters" => request.filters = Some(value),
                "limit" => request.limit = Some(value),
                "sort" => request.sort = Some(value),
                flag if BOOLEAN_FLAGS.iter().any(|(name, _)| *name == flag) => {
                    match value.as_str() {
                        "true" | "1" => {
                            request.booleans.insert(flag.to_string(), true);
                        }
                        "false" | "0" => {
                            request.booleans.insert(flag.to_string(), false);
                        }
                        other => warn!(flag, value = other, "ignoring unparseable server flag"),
                    }
                }
                other => debug!(key = other, "ignoring unknown request field"),
            }
        }
        request
    }

    pub fn from_query_string(query: &str) -> Self {
        Self::from_pairs(search_pairs(query))
    }
}

/// Encode a query with default settings.
pub fn to_request(params: &QueryParams) -> FlatRequest {
    to_request_with(params, &QuerySettings::default())
}

/// Encode a query for the data server.
///
/// Only active items are sent; cuts without members are skipped. While
/// `is_preview` is set the row count is capped at `settings.preview_limit`.
pub fn to_request_with(params: &QueryParams, settings: &QuerySettings) -> FlatRequest {
    let drilldowns: Vec<&DrilldownItem> = params.active_drilldowns().collect();

    let properties: Vec<String> = drilldowns
        .iter()
        .flat_map(|dd| {
            dd.active_properties()
                .map(move |prop| format!("{}.{}", dd.level, prop.name))
        })
        .collect();

    let cuts = |exclude: bool| {
        let groups: Vec<String> = params
            .active_cuts()
            .filter(|cut| cut.exclude == exclude)
            .map(|cut| {
                let mut members: Vec<_> = cut.members.iter().map(|m| escape_item(m)).collect();
                members.sort();
                format!("{}:{}", cut.level, members.join(","))
            })
            .collect();
        non_empty(groups.join(";"))
    };

    let (limit, offset) = if params.is_preview {
        let limit = match params.pagi_limit {
            0 => settings.preview_limit,
            limit => limit.min(settings.preview_limit),
        };
        (limit, 0)
    } else {
        (params.pagi_limit, params.pagi_offset)
    };

    FlatRequest {
        cube: params.cube.clone(),
        locale: params.locale.clone(),
        drilldowns: non_empty(
            drilldowns
                .iter()
                .map(|dd| dd.level.as_str())
                .collect::<Vec<_>>()
                .join(","),
        ),
        measures: non_empty(
            params
                .active_measures()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(","),
        ),
        properties: non_empty(properties.join(",")),
        include: cuts(false),
        exclude: cuts(true),
        filters: non_empty(
            params
                .active_filters()
                .map(format_filter_token)
                .collect::<Vec<_>>()
                .join(","),
        ),
        limit: (limit > 0 || offset > 0).then(|| format!("{},{}", limit, offset)),
        sort: params
            .sort_key
            .as_ref()
            .filter(|key| !key.is_empty())
            .map(|key| format!("{}.{}", key, params.sort_dir.symbol())),
        booleans: params
            .booleans
            .iter()
            .filter(|(_, value)| **value)
            .map(|(flag, value)| (flag.clone(), *value))
            .collect(),
    }
}

/// Decode URL search params against a cube's metadata.
pub fn parse_request(cube: &Cube, query: &str) -> CodecResult<QueryParams> {
    from_request(cube, &FlatRequest::from_query_string(query))
}

/// Decode a flat request against a cube's metadata.
///
/// Bare level names are resolved through the cube's [`LevelIndex`]. Cuts and
/// measures naming things the cube lacks are dropped with a warning; an
/// unknown drilldown level is a [`CodecError::UnknownLevel`].
pub fn from_request(cube: &Cube, request: &FlatRequest) -> CodecResult<QueryParams> {
    if !request.cube.is_empty() && request.cube != cube.name {
        return Err(CodecError::CubeMismatch {
            expected: cube.name.clone(),
            found: request.cube.clone(),
        });
    }

    let index = LevelIndex::new(cube);
    let mut params = QueryParams::new(cube.name.clone());
    params.locale = request.locale.clone();

    for name in list_items(&request.measures, ',') {
        if cube.measure(name).is_none() {
            warn!(cube = %cube.name, measure = name, "dropping unknown measure");
            continue;
        }
        params.upsert_measure(build_measure(&serde_json::json!({"name": name, "active": true})));
    }

    for name in list_items(&request.drilldowns, ',') {
        let level = index.by_name(name).ok_or_else(|| CodecError::UnknownLevel {
            cube: cube.name.clone(),
            level: name.to_string(),
        })?;
        let mut drilldown = drilldown_for_level(level, true);
        drilldown.properties.clear();
        params.upsert_drilldown(drilldown);
    }

    for token in list_items(&request.properties, ',') {
        let Some(property) = index.split_property(token) else {
            warn!(cube = %cube.name, property = token, "dropping unknown property");
            continue;
        };
        let owner = params
            .drilldowns
            .values_mut()
            .find(|dd| dd.level == property.level.level.name);
        match owner {
            Some(drilldown) => {
                let prop = build_property(&serde_json::json!({
                    "level": drilldown.level,
                    "name": property.property.name,
                    "active": true,
                }));
                if !drilldown.properties.iter().any(|p| p.key == prop.key) {
                    drilldown.properties.push(prop);
                }
            }
            None => warn!(property = token, "dropping property of a level not drilled down"),
        }
    }

    for (field, exclude) in [(&request.include, false), (&request.exclude, true)] {
        let groups = field.as_deref().map(|value| split_unescaped(value, ';'));
        for group in groups.into_iter().flatten() {
            if let Some(cut) = decode_cut(&index, group, exclude)? {
                params.upsert_cut(cut);
            }
        }
    }

    for token in list_items(&request.filters, ',') {
        match parse_filter_token(token) {
            Ok(parsed) => {
                let (joint, two) = match parsed.condition_two {
                    Some((joint, cond)) => (joint, Some(cond)),
                    None => (Joint::default(), None),
                };
                params.upsert_filter(filter_from_conditions(
                    &parsed.measure,
                    parsed.condition_one,
                    two,
                    joint,
                ));
            }
            Err(err) => warn!(error = %err, "dropping filter"),
        }
    }

    if let Some(limit) = request.limit.as_deref() {
        let (limit, offset) = parse_pagination(limit)?;
        params.set_page(limit, offset);
    }

    if let Some(sort) = request.sort.as_deref() {
        let (key, dir) = parse_sort(sort)?;
        params.set_sort(Some(key), dir);
    }

    for (flag, value) in &request.booleans {
        if *value {
            params.set_boolean(flag, Some(true));
        }
    }

    Ok(params)
}

fn decode_cut(index: &LevelIndex<'_>, group: &str, exclude: bool) -> CodecResult<Option<CutItem>> {
    let (level_name, members) = group
        .split_once(':')
        .ok_or_else(|| CodecError::MalformedCut(group.to_string()))?;

    let level_name = level_name.trim();
    let Some(level) = index.by_name(level_name) else {
        warn!(cube = %index.cube().name, level = level_name, "dropping cut on unknown level");
        return Ok(None);
    };

    let mut members = split_escaped(members);
    members.sort();
    members.dedup();
    Ok(Some(cut_for_level(level, members, exclude)))
}

/// `"limit"` or `"limit,offset"`.
pub(crate) fn parse_pagination(value: &str) -> CodecResult<(u64, u64)> {
    let malformed = || CodecError::MalformedPagination(value.to_string());
    let (limit, offset) = match value.split_once(',') {
        Some((limit, offset)) => (limit, offset),
        None => (value, "0"),
    };
    let limit = limit.trim().parse().map_err(|_| malformed())?;
    let offset = offset.trim().parse().map_err(|_| malformed())?;
    Ok((limit, offset))
}

/// `"key.dir"`; the key itself may contain dots.
pub(crate) fn parse_sort(value: &str) -> CodecResult<(String, SortDirection)> {
    value
        .rsplit_once('.')
        .and_then(|(key, dir)| {
            let dir = SortDirection::from_symbol(dir)?;
            (!key.is_empty()).then(|| (key.to_string(), dir))
        })
        .ok_or_else(|| CodecError::MalformedSort(value.to_string()))
}

fn list_items(field: &Option<String>, delimiter: char) -> impl Iterator<Item = &str> {
    field
        .as_deref()
        .into_iter()
        .flat_map(move |value| split_list(value, delimiter))
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
