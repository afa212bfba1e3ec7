#[path = "../common/mod.rs"]
mod common;

use cubequery::codec::{from_request, parse_request, to_request, to_request_with, CodecError};
use cubequery::config::QuerySettings;
use cubequery::model::{
    build_cut, build_measure, cut_for_level, drilldown_for_level, filter_from_conditions,
    Comparison, FilterCondition, Joint, QueryParams, SortDirection,
};
use cubequery::schema::LevelIndex;
use insta::assert_snapshot;
use serde_json::json;

fn full_query(index: &LevelIndex<'_>) -> QueryParams {
    let mut params = QueryParams::new("trade");
    params.locale = Some("en".into());
    params.upsert_measure(build_measure(&json!({"name": "Trade Value", "active": true})));
    params.upsert_measure(build_measure(&json!({"name": "Quantity"})));

    let mut country = drilldown_for_level(common::level(index, "Country"), true);
    country.properties[0].active = true;
    params.upsert_drilldown(country);
    params.upsert_drilldown(drilldown_for_level(common::level(index, "Year"), true));

    params.upsert_cut(cut_for_level(
        common::level(index, "Year"),
        vec!["2021".into(), "2020".into()],
        false,
    ));
    params.upsert_cut(cut_for_level(common::level(index, "Flow"), vec!["2".into()], true));
    params.upsert_filter(filter_from_conditions(
        "Trade Value",
        FilterCondition::from_value(Comparison::Gt, 1000.0),
        Some(FilterCondition::from_value(Comparison::Lte, 5e6)),
        Joint::And,
    ));
    params.set_page(50, 100);
    params.set_sort(Some("Trade Value".into()), SortDirection::Desc);
    params.set_boolean("parents", Some(true));
    params.set_boolean("sparse", Some(false));
    params
}

#[test]
fn test_encode_simple_query() {
    let cube = common::trade();
    let index = LevelIndex::new(&cube);
    let mut params = QueryParams::new("trade");
    params.upsert_measure(build_measure(&json!({"name": "Trade Value", "active": true})));
    params.upsert_drilldown(drilldown_for_level(common::level(&index, "Year"), true));
    params.upsert_cut(cut_for_level(common::level(&index, "Flow"), vec!["2".into()], false));
    params.set_boolean("parents", Some(true));

    assert_snapshot!(
        to_request(&params).to_query_string(),
        @"cube=trade&drilldowns=Year&measures=Trade+Value&include=Flow%3A2&parents=true"
    );
}

#[test]
fn test_encode_all_fields() {
    let cube = common::trade();
    let index = LevelIndex::new(&cube);
    let request = to_request(&full_query(&index));

    assert_eq!(request.locale.as_deref(), Some("en"));
    assert_eq!(request.measures.as_deref(), Some("Trade Value"));
    assert_eq!(request.properties.as_deref(), Some("Country.ISO 3"));
    assert_eq!(request.include.as_deref(), Some("Year:2020,2021"));
    assert_eq!(request.exclude.as_deref(), Some("Flow:2"));
    assert_eq!(
        request.filters.as_deref(),
        Some("Trade Value.gt.1000.and.lte.5000000")
    );
    assert_eq!(request.limit.as_deref(), Some("50,100"));
    assert_eq!(request.sort.as_deref(), Some("Trade Value.desc"));
    assert_eq!(request.booleans.len(), 1);
}

#[test]
fn test_round_trip_matches_pruned_params() {
    let cube = common::trade();
    let index = LevelIndex::new(&cube);
    let params = full_query(&index);

    let decoded = from_request(&cube, &to_request(&params)).unwrap();
    assert_eq!(decoded, params.pruned());

    let query = to_request(&params).to_query_string();
    assert_eq!(parse_request(&cube, &query).unwrap(), params.pruned());
}

#[test]
fn test_active_cut_without_members_is_not_sent() {
    let mut params = QueryParams::new("trade");
    params.upsert_cut(build_cut(&json!({
        "level": "Year", "members": ["2020", "2021"], "active": true
    })));
    let key = params.cuts.keys().next().cloned().unwrap();
    params.cuts.get_mut(&key).unwrap().members.clear();

    let request = to_request(&params);
    assert_eq!(request.include, None);
    assert!(!request.to_query_string().contains("Year"));
}

#[test]
fn test_cut_members_with_delimiters_survive() {
    let cube = common::trade();
    let index = LevelIndex::new(&cube);
    let mut params = QueryParams::new("trade");
    params.upsert_measure(build_measure(&json!({"name": "Trade Value", "active": true})));
    params.upsert_drilldown(drilldown_for_level(common::level(&index, "Year"), true));
    params.upsert_cut(cut_for_level(
        common::level(&index, "Subregion"),
        vec!["North, Central".into(), "West; Islands".into(), "Zone:1".into()],
        false,
    ));

    let request = to_request(&params);
    assert_eq!(
        request.include.as_deref(),
        Some("Subregion:North\\, Central,West\\; Islands,Zone:1")
    );

    let parsed = parse_request(&cube, &request.to_query_string()).unwrap();
    assert_eq!(parsed, params.pruned());
    let cut = parsed.cuts.values().next().unwrap();
    assert_eq!(cut.members, vec!["North, Central", "West; Islands", "Zone:1"]);
}

#[test]
fn test_preview_caps_limit() {
    let settings = QuerySettings {
        preview_limit: 100,
        ..Default::default()
    };
    let mut params = QueryParams::new("trade");
    params.is_preview = true;

    assert_eq!(to_request_with(&params, &settings).limit.as_deref(), Some("100,0"));

    params.set_page(500, 20);
    assert_eq!(to_request_with(&params, &settings).limit.as_deref(), Some("100,0"));

    params.set_page(10, 20);
    assert_eq!(to_request_with(&params, &settings).limit.as_deref(), Some("10,0"));

    params.is_preview = false;
    assert_eq!(to_request_with(&params, &settings).limit.as_deref(), Some("10,20"));
}

#[test]
fn test_unknown_drilldown_level_is_an_error() {
    let cube = common::trade();
    let err = parse_request(&cube, "cube=trade&drilldowns=Year,Planet").unwrap_err();
    assert_eq!(
        err,
        CodecError::UnknownLevel {
            cube: "trade".into(),
            level: "Planet".into()
        }
    );
}

#[test]
fn test_unknown_cut_level_and_measure_are_dropped() {
    let cube = common::trade();
    let params = parse_request(
        &cube,
        "cube=trade&measures=Trade+Value,Bogus&drilldowns=Year&include=Planet%3Amars;Year%3A2020",
    )
    .unwrap();

    assert_eq!(params.measures.keys().collect::<Vec<_>>(), vec!["Trade Value"]);
    assert_eq!(params.cuts.len(), 1);
    assert_eq!(params.cuts.values().next().unwrap().level, "Year");
}

#[test]
fn test_malformed_fields() {
    let cube = common::trade();
    assert_eq!(
        parse_request(&cube, "include=Year").unwrap_err(),
        CodecError::MalformedCut("Year".into())
    );
    assert!(matches!(
        parse_request(&cube, "limit=ten"),
        Err(CodecError::MalformedPagination(_))
    ));
    assert!(matches!(
        parse_request(&cube, "sort=Value.sideways"),
        Err(CodecError::MalformedSort(_))
    ));
    assert!(matches!(
        parse_request(&cube, "cube=services"),
        Err(CodecError::CubeMismatch { .. })
    ));
}

#[test]
fn test_malformed_filter_is_dropped() {
    let cube = common::trade();
    let params = parse_request(
        &cube,
        "drilldowns=Year&filters=Trade+Value.about.5,Quantity.lt.3",
    )
    .unwrap();
    assert_eq!(params.filters.len(), 1);
    assert_eq!(params.filters.values().next().unwrap().measure, "Quantity");
}

#[test]
fn test_property_of_undrilled_level_is_dropped() {
    let cube = common::trade();
    let params = parse_request(&cube, "drilldowns=Year&properties=Country.ISO+3").unwrap();
    let year = params.drilldowns.values().next().unwrap();
    assert!(year.properties.is_empty());
}
