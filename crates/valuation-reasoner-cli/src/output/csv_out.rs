use serde_json::{Map, Value};
use std::io;

use super::scalar;
use super::table::grid_cell;

/// Write the result as CSV to stdout. Projections and grids keep their
/// row layout; anything else becomes field,value pairs.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());

    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    let written = match result {
        Value::Object(map) if map.contains_key("cells") => write_grid(&mut wtr, map),
        Value::Object(map) => match map.get("projections") {
            Some(Value::Array(rows)) => write_rows(&mut wtr, rows),
            _ => write_fields(&mut wtr, map),
        },
        Value::Array(rows) => write_rows(&mut wtr, rows),
        other => wtr.write_record([scalar(other)]),
    };

    if let Err(e) = written.and_then(|_| wtr.flush().map_err(csv::Error::from)) {
        tracing::error!(error = %e, "could not write CSV output");
    }
}

fn write_fields<W: io::Write>(wtr: &mut csv::Writer<W>, map: &Map<String, Value>) -> csv::Result<()> {
    wtr.write_record(["field", "value"])?;
    for (key, val) in map {
        wtr.write_record([key.as_str(), &scalar(val)])?;
    }
    Ok(())
}

fn write_rows<W: io::Write>(wtr: &mut csv::Writer<W>, rows: &[Value]) -> csv::Result<()> {
    let Some(Value::Object(first)) = rows.first() else {
        for row in rows {
            wtr.write_record([scalar(row)])?;
        }
        return Ok(());
    };

    let headers: Vec<&String> = first.keys().collect();
    wtr.write_record(&headers)?;
    for row in rows.iter().filter_map(Value::as_object) {
        wtr.write_record(headers.iter().map(|h| row.get(*h).map(scalar).unwrap_or_default()))?;
    }
    Ok(())
}

fn write_grid<W: io::Write>(wtr: &mut csv::Writer<W>, grid: &Map<String, Value>) -> csv::Result<()> {
    let empty = Vec::new();
    let rates = grid.get("discount_rates").and_then(Value::as_array).unwrap_or(&empty);
    let growths = grid.get("growth_rates").and_then(Value::as_array).unwrap_or(&empty);
    let cells = grid.get("cells").and_then(Value::as_array).unwrap_or(&empty);

    let mut header = vec!["wacc \\ terminal_growth".to_string()];
    header.extend(growths.iter().map(scalar));
    wtr.write_record(&header)?;

    for (rate, row) in rates.iter().zip(cells) {
        let mut record = vec![scalar(rate)];
        record.extend(row.as_array().unwrap_or(&empty).iter().map(grid_cell));
        wtr.write_record(&record)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_projection_rows() {
        let rows = json!([
            { "year": 1, "revenue": "110" },
            { "year": 2, "revenue": "121" },
        ]);
        let mut wtr = csv::Writer::from_writer(Vec::new());
        write_rows(&mut wtr, rows.as_array().unwrap()).unwrap();
        let text = String::from_utf8(wtr.into_inner().unwrap()).unwrap();
        assert_eq!(text, "revenue,year\n110,1\n121,2\n");
    }
}
