//! Permalink encoding.
//!
//! A permalink is a URL query string that restores the full explorer state:
//! the query plus the active panel and chart. Levels are addressed by full
//! name so links keep resolving when a cube gains levels with clashing bare
//! names. Lists use one repeated key per item:
//!
//! ```text
//! cube=trade
//! measures=Trade Value
//! drilldowns=[Time].[Year]
//! properties=[Geography].[Country].[ISO 3]
//! captions=[Geography].[Country].[ISO 3]  caption property of a drilldown
//! cuts=[Time].[Year]:2020,2021          `\` escapes `,` `;` `\`
//! exclude=[Flow].[Flow]:2
//! filters=Trade Value.gt.1000
//! filter_text=1\,000                    typed text of the preceding filter
//! limit=100&offset=200&sort=Trade Value.desc
//! booleans=5                            packed server flags
//! preview=1&panel=pivot&chart=treemap
//! ```
//!
//! Only active items are written, and cut members are sorted on both sides,
//! so two links for the same query compare equal.

use tracing::{debug, warn};

use super::filter::{format_filter_token, parse_filter_token};
use super::request::parse_sort;
use super::{
    escape_item, search_pairs, split_escaped, split_escaped_all, CodecError, CodecResult,
};
use crate::model::{
    build_measure, build_property, cut_for_level, drilldown_for_level, filter_from_conditions,
    format_value, FilterCondition, FilterItem, Joint, QueryItem, QueryParams, BOOLEAN_FLAGS,
};
use crate::schema::{property_full_name, Cube, LevelIndex, LevelName, PropertyName};

/// Encode a query item as a URL query string.
pub fn serialize_permalink(item: &QueryItem) -> String {
    let params = item.params.pruned();
    let mut out = url::form_urlencoded::Serializer::new(String::new());

    out.append_pair("cube", &params.cube);
    if let Some(locale) = &params.locale {
        out.append_pair("locale", locale);
    }
    for measure in params.measures.values() {
        out.append_pair("measures", &measure.name);
    }
    for drilldown in params.drilldowns.values() {
        out.append_pair("drilldowns", &drilldown.full_name());
    }
    for drilldown in params.drilldowns.values() {
        for prop in drilldown.active_properties() {
            let name = property_full_name(
                &drilldown.dimension,
                &drilldown.hierarchy,
                &drilldown.level,
                &prop.name,
            );
            out.append_pair("properties", &name);
        }
    }
    for drilldown in params.drilldowns.values() {
        if !drilldown.caption_property.is_empty() {
            let name = property_full_name(
                &drilldown.dimension,
                &drilldown.hierarchy,
                &drilldown.level,
                &drilldown.caption_property,
            );
            out.append_pair("captions", &name);
        }
    }
    for cut in params.cuts.values() {
        let members: Vec<_> = cut.members.iter().map(|m| escape_item(m)).collect();
        let key = if cut.exclude { "exclude" } else { "cuts" };
        out.append_pair(key, &format!("{}:{}", cut.full_name(), members.join(",")));
    }
    for filter in params.filters.values() {
        out.append_pair("filters", &format_filter_token(filter));
        if let Some(texts) = filter_texts(filter) {
            out.append_pair("filter_text", &texts);
        }
    }
    if params.pagi_limit > 0 {
        out.append_pair("limit", &params.pagi_limit.to_string());
    }
    if params.pagi_offset > 0 {
        out.append_pair("offset", &params.pagi_offset.to_string());
    }
    if let Some(key) = params.sort_key.as_ref().filter(|key| !key.is_empty()) {
        out.append_pair("sort", &format!("{}.{}", key, params.sort_dir.symbol()));
    }
    let packed = pack_booleans(&params);
    if packed > 0 {
        out.append_pair("booleans", &packed.to_string());
    }
    if params.is_preview {
        out.append_pair("preview", "1");
    }
    if let Some(panel) = &item.panel {
        out.append_pair("panel", panel);
    }
    if let Some(chart) = &item.chart {
        out.append_pair("chart", chart);
    }

    out.finish()
}

/// Decode a permalink against a cube's metadata.
///
/// Cuts on unknown levels and unknown measures are dropped; a drilldown on
/// an unknown level is a [`CodecError::UnknownLevel`].
pub fn parse_permalink(cube: &Cube, query: &str) -> CodecResult<QueryItem> {
    let index = LevelIndex::new(cube);
    let mut item = QueryItem {
        params: QueryParams::new(cube.name.clone()),
        ..Default::default()
    };
    let mut properties = Vec::new();
    let mut captions = Vec::new();
    // Filter that a following `filter_text` applies to.
    let mut last_filter: Option<String> = None;

    for (key, value) in search_pairs(query) {
        let params = &mut item.params;
        match key.as_str() {
            "cube" if value != cube.name => {
                return Err(CodecError::CubeMismatch {
                    expected: cube.name.clone(),
                    found: value,
                })
            }
            "cube" => {}
            "locale" => params.locale = Some(value),
            "measures" => {
                if cube.measure(&value).is_none() {
                    warn!(cube = %cube.name, measure = %value, "dropping unknown measure");
                    continue;
                }
                params.upsert_measure(build_measure(
                    &serde_json::json!({"name": value, "active": true}),
                ));
            }
            "drilldowns" => {
                let name = LevelName::parse(&value)?;
                let level = index
                    .by_parts(&name.dimension, &name.hierarchy, &name.level)
                    .ok_or_else(|| CodecError::UnknownLevel {
                        cube: cube.name.clone(),
                        level: value.clone(),
                    })?;
                let mut drilldown = drilldown_for_level(level, true);
                drilldown.properties.clear();
                params.upsert_drilldown(drilldown);
            }
            // Properties attach to drilldowns, which may come later in the link.
            "properties" => properties.push(value),
            "captions" => captions.push(value),
            "cuts" | "exclude" => {
                let (full_name, members) =
                    split_cut(&value).ok_or_else(|| CodecError::MalformedCut(value.clone()))?;
                let name = LevelName::parse(full_name)?;
                let Some(level) = index.by_parts(&name.dimension, &name.hierarchy, &name.level)
                else {
                    warn!(cube = %cube.name, level = full_name, "dropping cut on unknown level");
                    continue;
                };
                let mut members = split_escaped(members);
                members.sort();
                members.dedup();
                params.upsert_cut(cut_for_level(level, members, key == "exclude"));
            }
            "filters" => match parse_filter_token(&value) {
                Ok(parsed) => {
                    let (joint, two) = match parsed.condition_two {
                        Some((joint, cond)) => (joint, Some(cond)),
                        None => (Joint::default(), None),
                    };
                    let filter =
                        filter_from_conditions(&parsed.measure, parsed.condition_one, two, joint);
                    last_filter = Some(filter.key.clone());
                    params.upsert_filter(filter);
                }
                Err(err) => {
                    last_filter = None;
                    warn!(error = %err, "dropping filter");
                }
            },
            "filter_text" => {
                let filter = last_filter
                    .as_ref()
                    .and_then(|key| params.filters.get_mut(key));
                match filter {
                    Some(filter) => apply_filter_texts(filter, &value),
                    None => debug!(text = %value, "ignoring filter text without a filter"),
                }
            }
            "limit" => params.pagi_limit = parse_count(&value)?,
            "offset" => params.pagi_offset = parse_count(&value)?,
            "sort" => {
                let (key, dir) = parse_sort(&value)?;
                params.set_sort(Some(key), dir);
            }
            "booleans" => {
                let packed: u32 = value
                    .trim()
                    .parse()
                    .map_err(|_| CodecError::MalformedBooleans(value.clone()))?;
                unpack_booleans(params, packed);
            }
            "preview" => params.is_preview = matches!(value.as_str(), "1" | "true"),
            "panel" => item.panel = Some(value),
            "chart" => item.chart = Some(value),
            other => debug!(key = other, "ignoring unknown permalink key"),
        }
    }

    for value in properties {
        attach_property(&index, &mut item.params, &value)?;
    }
    for value in captions {
        attach_caption(&index, &mut item.params, &value)?;
    }

    Ok(item)
}

fn attach_property(
    index: &LevelIndex<'_>,
    params: &mut QueryParams,
    value: &str,
) -> CodecResult<()> {
    let name = PropertyName::parse(value)?;
    let known = index
        .by_parts(&name.level.dimension, &name.level.hierarchy, &name.level.level)
        .is_some_and(|level| level.level.property(&name.property).is_some());
    if !known {
        warn!(property = value, "dropping unknown property");
        return Ok(());
    }

    let owner = params.drilldowns.values_mut().find(|dd| {
        dd.dimension == name.level.dimension
            && dd.hierarchy == name.level.hierarchy
            && dd.level == name.level.level
    });
    match owner {
        Some(drilldown) => {
            let prop = build_property(&serde_json::json!({
                "level": drilldown.level,
                "name": name.property,
                "active": true,
            }));
            if !drilldown.properties.iter().any(|p| p.key == prop.key) {
                drilldown.properties.push(prop);
            }
        }
        None => warn!(property = value, "dropping property of a level not drilled down"),
    }
    Ok(())
}

fn attach_caption(
    index: &LevelIndex<'_>,
    params: &mut QueryParams,
    value: &str,
) -> CodecResult<()> {
    let name = PropertyName::parse(value)?;
    let known = index
        .by_parts(&name.level.dimension, &name.level.hierarchy, &name.level.level)
        .is_some_and(|level| level.level.property(&name.property).is_some());
    let owner = params.drilldowns.values_mut().find(|dd| {
        dd.dimension == name.level.dimension
            && dd.hierarchy == name.level.hierarchy
            && dd.level == name.level.level
    });
    match owner {
        Some(drilldown) if known => drilldown.caption_property = name.property,
        _ => warn!(caption = value, "dropping caption property"),
    }
    Ok(())
}

/// Escaped typed texts of a filter's conditions, when any differs from the
/// canonical rendering of its value.
fn filter_texts(filter: &FilterItem) -> Option<String> {
    let mut conditions = vec![&filter.condition_one];
    conditions.extend(filter.complete_condition_two());
    let typed = conditions
        .iter()
        .any(|cond| cond.text != format_value(cond.value));
    typed.then(|| {
        conditions
            .iter()
            .map(|cond| escape_item(&cond.text).into_owned())
            .collect::<Vec<_>>()
            .join(",")
    })
}

fn apply_filter_texts(filter: &mut FilterItem, value: &str) {
    let mut texts = split_escaped_all(value).into_iter();
    let conditions: [Option<&mut FilterCondition>; 2] =
        [Some(&mut filter.condition_one), filter.condition_two.as_mut()];
    for cond in conditions.into_iter().flatten() {
        if let Some(text) = texts.next() {
            cond.text = text;
        }
    }
}

/// Pack the flags set to `true` into a bitmask.
pub fn pack_booleans(params: &QueryParams) -> u32 {
    BOOLEAN_FLAGS
        .iter()
        .filter(|(flag, _)| params.booleans.get(*flag).copied().unwrap_or(false))
        .fold(0, |packed, (_, bit)| packed | bit)
}

/// Set the flags whose bits are present. Bits without a known flag are
/// ignored, so links written by newer versions still open.
pub fn unpack_booleans(params: &mut QueryParams, packed: u32) {
    let known = BOOLEAN_FLAGS.iter().fold(0, |mask, (_, bit)| mask | bit);
    if packed & !known != 0 {
        debug!(unknown_bits = packed & !known, "ignoring unknown boolean flag bits");
    }
    for (flag, bit) in BOOLEAN_FLAGS {
        if packed & bit != 0 {
            params.set_boolean(flag, Some(true));
        }
    }
}

/// Split `<full name>:<members>` after the last bracketed segment.
fn split_cut(value: &str) -> Option<(&str, &str)> {
    let bytes = value.as_bytes();
    let mut i = 0;
    loop {
        if bytes.get(i) != Some(&b'[') {
            return None;
        }
        i += 1;
        // Scan to the closing bracket, skipping `]]` escapes.
        loop {
            match bytes.get(i)? {
                b']' if bytes.get(i + 1) == Some(&b']') => i += 2,
                b']' => break,
                _ => i += 1,
            }
        }
        i += 1;
        match bytes.get(i)? {
            b'.' => i += 1,
            b':' => return Some((&value[..i], &value[i + 1..])),
            _ => return None,
        }
    }
}

fn parse_count(value: &str) -> CodecResult<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| CodecError::MalformedPagination(value.to_string()))
}
