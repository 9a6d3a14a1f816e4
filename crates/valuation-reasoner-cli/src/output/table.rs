use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::scalar;

/// Format an output envelope as tables using the tabled crate.
pub fn print_table(value: &Value) {
    let Value::Object(envelope) = value else {
        println!("{value}");
        return;
    };

    match envelope.get("result") {
        Some(Value::Object(result)) => print_result(result),
        Some(other) => println!("{}", scalar(other)),
        None => println!("{}", field_table(envelope)),
    }

    if let Some(Value::Array(warnings)) = envelope.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {w}");
            }
        }
    }

    if let Some(Value::String(meth)) = envelope.get("methodology") {
        println!("\nMethodology: {meth}");
    }
}

fn print_result(result: &Map<String, Value>) {
    if result.contains_key("cells") {
        println!("{}", grid_table(result));
        return;
    }

    let (nested, flat): (Vec<_>, Vec<_>) = result
        .iter()
        .partition(|(_, v)| matches!(v, Value::Array(a) if a.first().is_some_and(Value::is_object)));

    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in flat {
        builder.push_record([key.as_str(), &cell(val)]);
    }
    println!("{}", Table::from(builder));

    for (key, val) in nested {
        if let Value::Array(rows) = val {
            println!("\n{key}:");
            println!("{}", row_table(rows));
        }
    }
}

fn field_table(map: &Map<String, Value>) -> Table {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &cell(val)]);
    }
    Table::from(builder)
}

/// One row per object, headers taken from the first.
fn row_table(rows: &[Value]) -> Table {
    let mut builder = Builder::default();
    let headers: Vec<String> = match rows.first() {
        Some(Value::Object(first)) => first.keys().cloned().collect(),
        _ => Vec::new(),
    };
    builder.push_record(headers.clone());

    for row in rows.iter().filter_map(Value::as_object) {
        builder.push_record(headers.iter().map(|h| row.get(h).map(cell).unwrap_or_default()));
    }
    Table::from(builder)
}

/// WACC down the side, terminal growth across the top.
fn grid_table(grid: &Map<String, Value>) -> Table {
    let rates = grid.get("discount_rates").and_then(Value::as_array);
    let growths = grid.get("growth_rates").and_then(Value::as_array);
    let cells = grid.get("cells").and_then(Value::as_array);

    let mut builder = Builder::default();
    let mut header = vec!["WACC \\ g".to_string()];
    header.extend(growths.into_iter().flatten().map(scalar));
    builder.push_record(header);

    for (rate, row) in rates.into_iter().flatten().zip(cells.into_iter().flatten()) {
        let mut record = vec![scalar(rate)];
        record.extend(row.as_array().into_iter().flatten().map(grid_cell));
        builder.push_record(record);
    }
    Table::from(builder)
}

pub(crate) fn grid_cell(value: &Value) -> String {
    match value {
        Value::Object(m) => m.get("enterprise_value").map(scalar).unwrap_or_default(),
        other => scalar(other),
    }
}

fn cell(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Array(items) => items.iter().map(cell).collect::<Vec<_>>().join(", "),
        other => scalar(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_grid_table_marks_divergent_cells() {
        let grid = json!({
            "discount_rates": ["0.03", "0.10"],
            "growth_rates": ["0.04"],
            "cells": [["divergent"], [{ "enterprise_value": "150.5" }]],
        });
        let rendered = grid_table(grid.as_object().unwrap()).to_string();
        assert!(rendered.contains("divergent"));
        assert!(rendered.contains("150.5"));
    }
}
