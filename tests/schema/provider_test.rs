#[path = "../common/mod.rs"]
mod common;

use async_trait::async_trait;
use cubequery::model::{build_drilldown, QueryParams};
use cubequery::schema::{
    hydrate_members, Cube, Member, ProviderError, ProviderResult, SchemaProvider, StaticSchema,
};
use serde_json::json;

fn member(key: &str) -> Member {
    Member {
        key: key.to_string(),
        caption: None,
    }
}

fn provider() -> StaticSchema {
    StaticSchema::new(common::schema())
        .with_members("trade", "Year", vec![member("2020"), member("2021")])
        .with_members("trade", "Flow", vec![member("1"), member("2")])
}

#[tokio::test]
async fn test_fetch_cube() {
    let provider = provider();
    let cube = provider.fetch_cube("trade", Some("en")).await.unwrap();
    assert_eq!(cube.name, "trade");

    let err = provider.fetch_cube("nope", None).await.unwrap_err();
    assert!(matches!(err, ProviderError::CubeNotFound(name) if name == "nope"));
}

#[tokio::test]
async fn test_fetch_members() {
    let provider = provider();
    let years = provider.fetch_members("trade", "Year", None).await.unwrap();
    assert_eq!(years.len(), 2);

    // Known level without registered members.
    let months = provider.fetch_members("trade", "Month", None).await.unwrap();
    assert!(months.is_empty());

    assert!(matches!(
        provider.fetch_members("trade", "Week", None).await,
        Err(ProviderError::LevelNotFound { .. })
    ));
}

#[tokio::test]
async fn test_hydrate_members_fills_every_drilldown() {
    let provider = provider();
    let mut params = QueryParams::new("trade");
    params.upsert_drilldown(build_drilldown(&json!({"dimension": "Time", "level": "Year"})));
    params.upsert_drilldown(build_drilldown(&json!({"dimension": "Flow", "level": "Flow"})));
    params.upsert_drilldown(build_drilldown(&json!({"dimension": "Time", "level": "Week"})));

    let updated = hydrate_members(&provider, &mut params).await;
    assert_eq!(updated, 2);

    let year = params.drilldowns.values().find(|d| d.level == "Year").unwrap();
    assert_eq!(year.members, vec![member("2020"), member("2021")]);
    let week = params.drilldowns.values().find(|d| d.level == "Week").unwrap();
    assert!(week.members.is_empty());
}

/// Provider that fails every member request.
struct Offline;

#[async_trait]
impl SchemaProvider for Offline {
    async fn fetch_cube(&self, name: &str, _locale: Option<&str>) -> ProviderResult<Cube> {
        Err(ProviderError::Remote(format!("offline while fetching {}", name)))
    }

    async fn fetch_members(
        &self,
        _cube: &str,
        _level: &str,
        _locale: Option<&str>,
    ) -> ProviderResult<Vec<Member>> {
        Err(ProviderError::Remote("offline".into()))
    }
}

#[tokio::test]
async fn test_failed_fetch_keeps_cached_members() {
    let mut params = QueryParams::new("trade");
    params.upsert_drilldown(build_drilldown(&json!({
        "dimension": "Time", "level": "Year", "members": ["1999"]
    })));

    let provider: Box<dyn SchemaProvider> = Box::new(Offline);
    let updated = hydrate_members(provider.as_ref(), &mut params).await;

    assert_eq!(updated, 0);
    let year = params.drilldowns.values().next().unwrap();
    assert_eq!(year.members, vec![member("1999")]);
}

#[test]
fn test_static_schema_from_json_file() {
    let path = std::env::temp_dir().join(format!("cubequery-schema-{}.json", std::process::id()));
    std::fs::write(&path, serde_json::to_string(&common::schema()).unwrap()).unwrap();

    let provider = StaticSchema::from_json_file(&path).unwrap();
    assert_eq!(provider.schema().cubes.len(), 4);

    std::fs::remove_file(&path).unwrap();
    assert!(matches!(
        StaticSchema::from_json_file(&path),
        Err(ProviderError::Io(_))
    ));
}
