#[path = "../common/mod.rs"]
mod common;

use cubequery::codec::permalink::{pack_booleans, unpack_booleans};
use cubequery::codec::{parse_permalink, serialize_permalink, CodecError};
use cubequery::model::{
    build_filter, build_measure, cut_for_level, drilldown_for_level, filter_from_conditions,
    Comparison, FilterCondition, Joint, QueryItem, QueryParams, SortDirection,
};
use cubequery::schema::LevelIndex;
use insta::assert_snapshot;
use serde_json::json;

fn item(index: &LevelIndex<'_>) -> QueryItem {
    let mut params = QueryParams::new("trade");
    params.locale = Some("es".into());
    params.upsert_measure(build_measure(&json!({"name": "Trade Value", "active": true})));
    params.upsert_measure(build_measure(&json!({"name": "Quantity", "active": true})));

    let mut country = drilldown_for_level(common::level(index, "Country"), true);
    for prop in &mut country.properties {
        prop.active = true;
    }
    params.upsert_drilldown(country);
    params.upsert_drilldown(drilldown_for_level(common::level(index, "Year"), false));
    params.upsert_drilldown(drilldown_for_level(common::level(index, "Month"), true));

    params.upsert_cut(cut_for_level(
        common::level(index, "Subregion"),
        vec!["North, Central".into(), "South".into()],
        false,
    ));
    params.upsert_cut(cut_for_level(common::level(index, "Flow"), vec!["1".into()], true));
    params.upsert_filter(filter_from_conditions(
        "Quantity",
        FilterCondition::from_value(Comparison::Neq, -2.5),
        None,
        Joint::And,
    ));
    params.set_page(25, 50);
    params.set_sort(Some("Quantity".into()), SortDirection::Asc);
    params.set_boolean("sparse", Some(true));
    params.set_boolean("exclude_default_members", Some(true));
    params.is_preview = true;

    QueryItem {
        params,
        panel: Some("pivot".into()),
        chart: Some("treemap-1".into()),
    }
}

#[test]
fn test_serialize_simple_item() {
    let cube = common::trade();
    let index = LevelIndex::new(&cube);
    let mut params = QueryParams::new("trade");
    params.upsert_measure(build_measure(&json!({"name": "Trade Value", "active": true})));
    params.upsert_drilldown(drilldown_for_level(common::level(&index, "Year"), true));
    params.upsert_cut(cut_for_level(
        common::level(&index, "Year"),
        vec!["2021".into(), "2020".into()],
        false,
    ));
    params.set_boolean("parents", Some(true));
    params.set_boolean("nonempty", Some(true));
    let item = QueryItem {
        params,
        panel: Some("pivot".into()),
        chart: None,
    };

    assert_snapshot!(
        serialize_permalink(&item),
        @"cube=trade&measures=Trade+Value&drilldowns=%5BTime%5D.%5BYear%5D&cuts=%5BTime%5D.%5BYear%5D%3A2020%2C2021&booleans=5&panel=pivot"
    );
}

#[test]
fn test_round_trip() {
    let cube = common::trade();
    let index = LevelIndex::new(&cube);
    let original = item(&index);

    let link = serialize_permalink(&original);
    let parsed = parse_permalink(&cube, &link).unwrap();

    assert_eq!(parsed.params, original.params.pruned());
    assert_eq!(parsed.panel, original.panel);
    assert_eq!(parsed.chart, original.chart);
    assert_eq!(serialize_permalink(&parsed), link);
}

#[test]
fn test_three_part_names_and_escaped_members() {
    let cube = common::trade();
    let index = LevelIndex::new(&cube);
    let link = serialize_permalink(&item(&index));

    let parsed = parse_permalink(&cube, &link).unwrap();
    let subregion = parsed
        .params
        .cuts
        .values()
        .find(|cut| cut.level == "Subregion")
        .unwrap();
    assert_eq!(subregion.hierarchy, "Region");
    assert_eq!(subregion.members, vec!["North, Central", "South"]);

    let flow = parsed.params.cuts.values().find(|cut| cut.level == "Flow").unwrap();
    assert!(flow.exclude);
}

#[test]
fn test_cut_members_are_sorted_on_parse() {
    let cube = common::trade();
    let a = parse_permalink(&cube, "cube=trade&cuts=[Time].[Year]:2021,2019,2020").unwrap();
    let b = parse_permalink(&cube, "cube=trade&cuts=[Time].[Year]:2019,2020,2021").unwrap();
    assert_eq!(a, b);
    assert_eq!(
        a.params.cuts.values().next().unwrap().members,
        vec!["2019", "2020", "2021"]
    );
}

#[test]
fn test_unknown_boolean_bits_are_ignored() {
    let cube = common::trade();
    let parsed = parse_permalink(&cube, "cube=trade&booleans=4097").unwrap();
    assert_eq!(parsed.params.booleans.len(), 1);
    assert_eq!(parsed.params.booleans.get("parents"), Some(&true));

    assert!(matches!(
        parse_permalink(&cube, "cube=trade&booleans=lots"),
        Err(CodecError::MalformedBooleans(_))
    ));
}

#[test]
fn test_boolean_packing_round_trip() {
    let mut params = QueryParams::new("trade");
    params.set_boolean("distinct", Some(true));
    params.set_boolean("debug", Some(true));
    assert_eq!(pack_booleans(&params), 24);

    let mut restored = QueryParams::new("trade");
    unpack_booleans(&mut restored, 24);
    assert_eq!(restored.booleans, params.booleans);
}

#[test]
fn test_unknown_drilldown_is_an_error_but_unknown_cut_is_dropped() {
    let cube = common::trade();
    assert!(matches!(
        parse_permalink(&cube, "cube=trade&drilldowns=[Time].[Week]"),
        Err(CodecError::UnknownLevel { .. })
    ));

    let parsed = parse_permalink(&cube, "cube=trade&cuts=[Time].[Week]:1").unwrap();
    assert!(parsed.params.cuts.is_empty());

    assert!(matches!(
        parse_permalink(&cube, "cube=trade&drilldowns=Year"),
        Err(CodecError::MalformedFullName(_))
    ));
}

#[test]
fn test_properties_may_precede_their_drilldown() {
    let cube = common::trade();
    let parsed = parse_permalink(
        &cube,
        "cube=trade&properties=[Geography].[Country].[Flag]&drilldowns=[Geography].[Country]",
    )
    .unwrap();
    let country = parsed.params.drilldowns.values().next().unwrap();
    assert_eq!(country.properties.len(), 1);
    assert_eq!(country.properties[0].name, "Flag");
    assert!(country.properties[0].active);
}

#[test]
fn test_typed_filter_keeps_text_and_identity() {
    let cube = common::trade();
    let mut params = QueryParams::new("trade");
    params.upsert_measure(build_measure(&json!({"name": "Quantity", "active": true})));

    // Added blank, then filled in by the user.
    let mut filter = build_filter(&json!({"measure": "Quantity"}));
    let blank_key = filter.key.clone();
    filter.condition_one = FilterCondition::new(Comparison::Gt, "1,000", 1000.0);
    filter.condition_two = Some(FilterCondition::new(Comparison::Lte, "5 000", 5000.0));
    filter.joint = Joint::Or;
    filter.active = true;
    params.upsert_filter(filter);

    let original = QueryItem {
        params,
        ..Default::default()
    };
    let link = serialize_permalink(&original);
    let parsed = parse_permalink(&cube, &link).unwrap();

    assert_eq!(parsed.params, original.params.pruned());
    let restored = parsed.params.filters.values().next().unwrap();
    assert_ne!(restored.key, blank_key);
    assert_eq!(restored.condition_one.text, "1,000");
    assert_eq!(restored.condition_two.as_ref().unwrap().text, "5 000");
    assert_eq!(serialize_permalink(&parsed), link);
}

#[test]
fn test_canonical_filter_text_is_not_repeated() {
    let cube = common::trade();
    let index = LevelIndex::new(&cube);
    let link = serialize_permalink(&item(&index));
    assert!(!link.contains("filter_text"));

    // Text without a preceding filter is ignored.
    let parsed = parse_permalink(&cube, "cube=trade&filter_text=1%2C000").unwrap();
    assert!(parsed.params.filters.is_empty());
}

#[test]
fn test_caption_property_round_trip() {
    let cube = common::trade();
    let index = LevelIndex::new(&cube);
    let mut params = QueryParams::new("trade");
    params.upsert_measure(build_measure(&json!({"name": "Trade Value", "active": true})));
    let mut country = drilldown_for_level(common::level(&index, "Country"), true);
    country.caption_property = "ISO 3".into();
    params.upsert_drilldown(country);
    let original = QueryItem {
        params,
        ..Default::default()
    };

    let link = serialize_permalink(&original);
    assert!(link.contains("captions=%5BGeography%5D.%5BCountry%5D.%5BISO+3%5D"));

    let parsed = parse_permalink(&cube, &link).unwrap();
    assert_eq!(parsed.params, original.params.pruned());
    let restored = parsed.params.drilldowns.values().next().unwrap();
    assert_eq!(restored.caption_property, "ISO 3");
}

#[test]
fn test_unknown_caption_property_is_dropped() {
    let cube = common::trade();
    let parsed = parse_permalink(
        &cube,
        "cube=trade&drilldowns=[Geography].[Country]&captions=[Geography].[Country].[Nope]",
    )
    .unwrap();
    let country = parsed.params.drilldowns.values().next().unwrap();
    assert!(country.caption_property.is_empty());
}
