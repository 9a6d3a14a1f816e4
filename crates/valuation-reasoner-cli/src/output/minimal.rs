use serde_json::Value;

use super::scalar;

/// Headline figures, most specific first. The first non-null one found in
/// the result is printed.
const HEADLINE_KEYS: [&str; 4] = [
    "dcf_enterprise_value",
    "enterprise_value",
    "percentage_difference",
    "computed_cells",
];

/// Print just the headline value of a result.
pub fn print_minimal(value: &Value) {
    let result = value
        .as_object()
        .and_then(|m| m.get("result"))
        .unwrap_or(value);

    println!("{}", headline(result));
}

fn headline(result: &Value) -> String {
    let Value::Object(map) = result else {
        return scalar(result);
    };

    for key in HEADLINE_KEYS {
        if let Some(val) = map.get(key).filter(|v| !v.is_null()) {
            return scalar(val);
        }
    }

    map.iter()
        .next()
        .map(|(key, val)| format!("{key}: {}", scalar(val)))
        .unwrap_or_default()
}
