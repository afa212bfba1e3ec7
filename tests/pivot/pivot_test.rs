use cubequery::pivot::{pivot, Aggregation, PivotRow, PivotSpec, Record};
use serde_json::json;

fn records(value: serde_json::Value) -> Vec<Record> {
    serde_json::from_value(value).unwrap()
}

fn trade_rows() -> Vec<Record> {
    records(json!([
        {"Year": 2020, "Country": "A", "Value": 5},
        {"Year": 2021, "Country": "A", "Value": 7},
        {"Year": 2020, "Country": "B", "Value": 3}
    ]))
}

#[test]
fn test_year_by_country() {
    let spec = PivotSpec::new("Year", "Country", "Value").unwrap();
    let matrix = pivot(&trade_rows(), &spec);

    assert_eq!(matrix.headers, vec!["", "2020", "2021"]);
    assert_eq!(
        matrix.data,
        vec![
            PivotRow {
                label: "A".into(),
                cells: vec![Some(5.0), Some(7.0)],
            },
            PivotRow {
                label: "B".into(),
                cells: vec![Some(3.0), None],
            },
        ]
    );
}

#[test]
fn test_missing_cells_render_blank() {
    let spec = PivotSpec::new("Year", "Country", "Value").unwrap();
    let rows = pivot(&trade_rows(), &spec).to_text_rows();
    assert_eq!(
        rows,
        vec![
            vec!["", "2020", "2021"],
            vec!["A", "5", "7"],
            vec!["B", "3", ""],
        ]
    );
}

#[test]
fn test_shape_follows_distinct_values() {
    let data = records(json!([
        {"c": "x", "r": 1, "v": 1},
        {"c": "y", "r": 2, "v": 1},
        {"c": "z", "r": 3, "v": 1},
        {"c": "x", "r": 3, "v": 1},
        {"c": "y", "r": 1, "v": 1}
    ]));
    let matrix = pivot(&data, &PivotSpec::new("c", "r", "v").unwrap());

    assert_eq!(matrix.data.len(), 3);
    for row in &matrix.data {
        assert_eq!(row.cells.len() + 1, matrix.headers.len());
        assert_eq!(row.cells.len(), 3);
    }
    let filled: usize = matrix
        .data
        .iter()
        .map(|row| row.cells.iter().filter(|c| c.is_some()).count())
        .sum();
    assert_eq!(filled, 5);
}

#[test]
fn test_numeric_headers_sort_numerically_before_text() {
    let data = records(json!([
        {"Month": 10, "Country": "A", "Value": 1},
        {"Month": 9, "Country": "A", "Value": 1},
        {"Month": "Total", "Country": "A", "Value": 1},
        {"Month": 2.5, "Country": "A", "Value": 1}
    ]));
    let matrix = pivot(&data, &PivotSpec::new("Month", "Country", "Value").unwrap());
    assert_eq!(matrix.headers, vec!["", "2.5", "9", "10", "Total"]);
}

#[test]
fn test_aggregations() {
    let data = records(json!([
        {"Year": 2020, "Country": "A", "Value": 4},
        {"Year": 2020, "Country": "A", "Value": 1},
        {"Year": 2020, "Country": "A", "Value": 9}
    ]));
    let spec = PivotSpec::new("Year", "Country", "Value").unwrap();
    let cell = |aggregation| {
        pivot(&data, &spec.clone().with_aggregation(aggregation)).data[0].cells[0]
    };

    assert_eq!(cell(Aggregation::Sum), Some(14.0));
    assert_eq!(cell(Aggregation::Count), Some(3.0));
    assert_eq!(cell(Aggregation::Min), Some(1.0));
    assert_eq!(cell(Aggregation::Max), Some(9.0));
    assert_eq!(cell(Aggregation::First), Some(4.0));
    assert_eq!(cell(Aggregation::Last), Some(9.0));
}

#[test]
fn test_empty_input() {
    let matrix = pivot(&[], &PivotSpec::new("Year", "Country", "Value").unwrap());
    assert_eq!(matrix.headers, vec![""]);
    assert!(matrix.data.is_empty());
}
