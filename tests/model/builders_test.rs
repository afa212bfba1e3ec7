#[path = "../common/mod.rs"]
mod common;

use cubequery::model::{
    build_cut, build_drilldown, build_filter, build_measure, build_property, cut_for_level,
    drilldown_for_level, filter_from_conditions, Comparison, FilterCondition, Joint,
    QueryParamsItem,
};
use cubequery::schema::LevelIndex;
use serde_json::{json, Value};

#[test]
fn test_builders_accept_their_own_plain_form() {
    let measure = build_measure(&json!({"name": "Trade Value", "active": true}));
    assert_eq!(build_measure(&measure.to_plain()), measure);

    let property = build_property(&json!({"level": "Country", "name": "ISO 3"}));
    assert_eq!(build_property(&property.to_plain()), property);

    let drilldown = build_drilldown(&json!({
        "dimension": "Geography",
        "level": "Country",
        "properties": [{"name": "ISO 3", "active": true}, {"name": "Flag"}],
        "members": [{"key": "mex", "caption": "Mexico"}, "usa"],
        "captionProperty": "ISO 3"
    }));
    assert_eq!(build_drilldown(&drilldown.to_plain()), drilldown);

    let cut = build_cut(&json!({
        "dimension": "Time",
        "level": "Year",
        "members": ["2021", "2020"],
        "active": true,
        "exclude": true
    }));
    assert_eq!(build_cut(&cut.to_plain()), cut);

    let filter = build_filter(&json!({
        "measure": "Trade Value",
        "conditionOne": ["gt", "1,000", 1000],
        "conditionTwo": {"comparison": "lte", "text": "5000"},
        "joint": "or",
        "active": true
    }));
    assert_eq!(build_filter(&filter.to_plain()), filter);
}

#[test]
fn test_builders_are_total() {
    let inputs = [
        Value::Null,
        json!(42),
        json!("text"),
        json!([1, 2, 3]),
        json!({"level": 7, "members": "not a list", "active": "maybe"}),
    ];
    for input in &inputs {
        let _ = build_measure(input);
        let _ = build_property(input);
        let drilldown = build_drilldown(input);
        assert!(drilldown.active, "drilldowns default to active");
        let cut = build_cut(input);
        assert!(!cut.active);
        let filter = build_filter(input);
        assert!(!filter.active);
    }
}

#[test]
fn test_key_in_input_is_preserved() {
    let cut = build_cut(&json!({"key": "my-cut", "level": "Year"}));
    assert_eq!(cut.key, "my-cut");

    let measure = build_measure(&json!({"key": 12, "name": "Quantity"}));
    assert_eq!(measure.key, "12");
}

#[test]
fn test_level_builders_match_plain_builders() {
    let cube = common::trade();
    let index = LevelIndex::new(&cube);
    let country = common::level(&index, "Country");

    let from_level = drilldown_for_level(country, true);
    let from_plain = build_drilldown(&json!({
        "dimension": "Geography",
        "hierarchy": "Geography",
        "level": "Country"
    }));
    assert_eq!(from_level.key, from_plain.key);
    assert_eq!(from_level.properties.len(), 2);
    assert!(from_level.properties.iter().all(|p| !p.active));

    let cut = cut_for_level(country, vec!["mex".into()], false);
    let plain = build_cut(&json!({"dimension": "Geography", "level": "Country"}));
    assert_eq!(cut.key, plain.key);
    assert!(cut.is_active_cut());
}

#[test]
fn test_filter_key_follows_content() {
    let a = filter_from_conditions(
        "Trade Value",
        FilterCondition::from_value(Comparison::Gt, 10.0),
        None,
        Joint::And,
    );
    let b = build_filter(&json!({
        "measure": "Trade Value",
        "conditionOne": ["gt", "10", 10]
    }));
    assert_eq!(a.key, b.key);

    let c = filter_from_conditions(
        "Trade Value",
        FilterCondition::from_value(Comparison::Gte, 10.0),
        None,
        Joint::And,
    );
    assert_ne!(a.key, c.key);
}
