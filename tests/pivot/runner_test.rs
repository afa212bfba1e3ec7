use std::sync::Arc;

use cubequery::pivot::{PivotOutcome, PivotRunner, PivotSpec, Record};
use serde_json::json;

fn rows(count: usize) -> Arc<Vec<Record>> {
    let value = json!((0..count)
        .map(|i| json!({"Year": 2000 + (i % 20), "Country": format!("C{}", i % 50), "Value": i}))
        .collect::<Vec<_>>());
    Arc::new(serde_json::from_value(value).unwrap())
}

#[tokio::test]
async fn test_single_submission_is_current() {
    let runner = PivotRunner::new();
    let spec = PivotSpec::new("Year", "Country", "Value").unwrap();

    let ticket = runner.submit(rows(200), spec.clone());
    assert!(ticket.is_current());

    match ticket.await.unwrap() {
        PivotOutcome::Current(matrix) => {
            assert_eq!(matrix.headers.len(), 21);
            assert_eq!(matrix.data.len(), 50);
        }
        PivotOutcome::Superseded => panic!("only submission was superseded"),
    }
    assert_eq!(runner.latest_spec(), Some(spec));
}

#[tokio::test]
async fn test_newer_submission_supersedes_older() {
    let runner = PivotRunner::new();
    let data = rows(5_000);

    let first = runner.submit(
        Arc::clone(&data),
        PivotSpec::new("Year", "Country", "Value").unwrap(),
    );
    let second = runner.submit(
        Arc::clone(&data),
        PivotSpec::new("Country", "Year", "Value").unwrap(),
    );

    assert!(!first.is_current());
    assert!(second.is_current());
    assert_eq!(first.generation() + 1, second.generation());

    assert_eq!(first.await.unwrap(), PivotOutcome::Superseded);
    match second.await.unwrap() {
        PivotOutcome::Current(matrix) => assert_eq!(matrix.data.len(), 20),
        PivotOutcome::Superseded => panic!("latest submission was superseded"),
    }
    assert_eq!(runner.current_generation(), 2);
    assert_eq!(runner.latest_spec().unwrap().col, "Country");
}

#[tokio::test]
async fn test_clones_share_generation() {
    let runner = PivotRunner::new();
    let other = runner.clone();

    let ticket = runner.submit(rows(10), PivotSpec::new("Year", "Country", "Value").unwrap());
    let _newer = other.submit(rows(10), PivotSpec::new("Year", "Country", "Value").unwrap());

    assert_eq!(ticket.outcome().await.unwrap(), PivotOutcome::Superseded);
}
