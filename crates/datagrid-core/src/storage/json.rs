//! JSON export: an array of `{column title: formatted value}` objects.

use serde_json::{Map, Number, Value as Json};

use datagrid_engine::engine::{ColumnConfig, Row, Value, format_cell};

use crate::error::Result;

const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Convert a cell value to JSON. Whole numbers are written without a fraction.
pub fn to_json_value(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Number(n) if n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER => {
            Json::Number(Number::from(*n as i64))
        }
        Value::Number(n) => Number::from_f64(*n).map(Json::Number).unwrap_or(Json::Null),
        Value::List(items) => Json::Array(items.iter().map(to_json_value).collect()),
        other => Json::String(other.to_plain_string()),
    }
}

/// Rows as JSON records keyed by column title, in column order.
pub fn json_records(rows: &[&Row], columns: &[&ColumnConfig]) -> Vec<Json> {
    rows.iter()
        .map(|row| {
            let record: Map<String, Json> = columns
                .iter()
                .map(|c| (c.title.clone(), to_json_value(&format_cell(c, &c.value(row)))))
                .collect();
            Json::Object(record)
        })
        .collect()
}

pub fn write_json(rows: &[&Row], columns: &[&ColumnConfig]) -> Result<String> {
    Ok(serde_json::to_string_pretty(&json_records(rows, columns))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagrid_engine::engine::{ColumnType, FormatSpec};

    #[test]
    fn test_records_keep_column_order_and_types() {
        let cols = vec![
            ColumnConfig::text("name", "Name"),
            ColumnConfig::number("age", "Age"),
            ColumnConfig::number("price", "Price").format(FormatSpec::default().currency("EUR")),
            ColumnConfig::new("active", "Active", ColumnType::Boolean),
        ];
        let col_refs: Vec<&ColumnConfig> = cols.iter().collect();
        let row = Row::new()
            .with("name", "John")
            .with("age", 30)
            .with("price", 9.5)
            .with("active", true);
        let records = json_records(&[&row], &col_refs);
        assert_eq!(
            serde_json::to_string(&records[0]).unwrap(),
            r#"{"Name":"John","Age":30,"Price":"9.50 EUR","Active":"Yes"}"#
        );
    }

    #[test]
    fn test_non_finite_numbers_become_null() {
        assert_eq!(to_json_value(&Value::Number(f64::NAN)), Json::Null);
        assert_eq!(to_json_value(&Value::Number(2.5)), serde_json::json!(2.5));
        assert_eq!(to_json_value(&Value::Null), Json::Null);
    }
}
