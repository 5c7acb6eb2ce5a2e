//! Export formatting of cell values.

use chrono::{NaiveDate, NaiveDateTime};
use std::fmt::Write;

use super::coerce::{parse_bool_token, parse_date_time};
use super::html::strip_html;
use super::{ColumnConfig, ColumnType, FormatSpec, Value};

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";
const DEFAULT_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Format a number for display with the column's format spec.
///
/// Without a spec the shortest representation is used. A currency implies two
/// decimals unless `decimals` says otherwise.
pub fn format_number(n: f64, format: Option<&FormatSpec>) -> String {
    let Some(spec) = format else {
        return super::format_plain_number(n);
    };

    let decimals = spec.decimals.or(spec.currency.as_ref().map(|_| 2));
    let mut out = match decimals {
        Some(d) => format!("{:.*}", d, n),
        None => super::format_plain_number(n),
    };
    if let Some(currency) = &spec.currency {
        out = format!("{out} {currency}");
    }
    if let Some(prefix) = &spec.prefix {
        out = format!("{prefix}{out}");
    }
    if let Some(suffix) = &spec.suffix {
        out.push_str(suffix);
    }
    out
}

fn has_number_format(spec: Option<&FormatSpec>) -> bool {
    spec.is_some_and(|s| {
        s.decimals.is_some() || s.currency.is_some() || s.prefix.is_some() || s.suffix.is_some()
    })
}

/// Render a date with a chrono format string. Invalid format strings fall back
/// to the default.
fn write_date(date: NaiveDate, fmt: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", date.format(fmt)).is_err() {
        out.clear();
        let _ = write!(out, "{}", date.format(DEFAULT_DATE_FORMAT));
    }
    out
}

fn write_date_time(dt: NaiveDateTime, fmt: &str) -> String {
    let mut out = String::new();
    if write!(out, "{}", dt.format(fmt)).is_err() {
        out.clear();
        let _ = write!(out, "{}", dt.format(DEFAULT_DATE_TIME_FORMAT));
    }
    out
}

fn format_temporal(value: &Value, column: &ColumnConfig) -> Option<String> {
    let custom = column.format.as_ref().and_then(|f| f.date_format.as_deref());
    let dt = match value {
        Value::Date(d) => d.and_hms_opt(0, 0, 0)?,
        Value::DateTime(dt) => *dt,
        Value::Text(s) => parse_date_time(s)?,
        _ => return None,
    };
    Some(match column.column_type {
        ColumnType::DateTime => write_date_time(dt, custom.unwrap_or(DEFAULT_DATE_TIME_FORMAT)),
        _ => write_date(dt.date(), custom.unwrap_or(DEFAULT_DATE_FORMAT)),
    })
}

fn option_label(column: &ColumnConfig, value: &Value) -> String {
    column
        .option_for(value)
        .map(|opt| opt.label.clone())
        .unwrap_or_else(|| value.to_plain_string())
}

/// Format one cell for export.
///
/// Rich text is stripped first. A custom transform wins over the type-specific
/// rules. Numbers without a number format, and unformatted booleans in
/// non-boolean columns, keep their native type so structured sinks can write
/// them as such.
pub fn format_cell(column: &ColumnConfig, value: &Value) -> Value {
    if value.is_null() {
        return Value::Null;
    }

    let value = match value {
        Value::Text(s) if column.column_type == ColumnType::RichText => Value::Text(strip_html(s)),
        other => other.clone(),
    };

    if let Some(transform) = column.format.as_ref().and_then(|f| f.transform.as_ref()) {
        return Value::Text(transform.apply(&value));
    }

    match column.column_type {
        ColumnType::Number => match value.as_number() {
            Some(n) if has_number_format(column.format.as_ref()) => {
                Value::Text(format_number(n, column.format.as_ref()))
            }
            Some(n) => Value::Number(n),
            None => Value::Text(value.to_plain_string()),
        },
        ColumnType::Boolean => {
            let flag = match &value {
                Value::Bool(b) => Some(*b),
                Value::Number(n) => Some(*n != 0.0),
                Value::Text(s) => parse_bool_token(s),
                _ => None,
            };
            match flag {
                Some(true) => Value::from("Yes"),
                Some(false) => Value::from("No"),
                None => Value::Text(value.to_plain_string()),
            }
        }
        ColumnType::Date | ColumnType::DateTime => match format_temporal(&value, column) {
            Some(s) => Value::Text(s),
            None => Value::Text(value.to_plain_string()),
        },
        ColumnType::Select => Value::Text(option_label(column, &value)),
        ColumnType::MultiSelect => match &value {
            Value::List(items) => Value::Text(
                items
                    .iter()
                    .map(|v| option_label(column, v))
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            other => Value::Text(option_label(column, other)),
        },
        _ => match value {
            Value::Number(n) if has_number_format(column.format.as_ref()) => {
                Value::Text(format_number(n, column.format.as_ref()))
            }
            Value::Number(_) | Value::Bool(_) => value,
            Value::Date(_) | Value::DateTime(_) => {
                Value::Text(format_temporal(&value, column).unwrap_or_default())
            }
            Value::List(items) => Value::Text(
                items
                    .iter()
                    .map(Value::to_plain_string)
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            other => Value::Text(other.to_plain_string()),
        },
    }
}

/// Formatted cell as text, for delimited and markdown sinks.
pub fn format_cell_text(column: &ColumnConfig, value: &Value) -> String {
    match format_cell(column, value) {
        Value::Bool(b) => if b { "Yes" } else { "No" }.to_string(),
        other => other.to_plain_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SelectOption;

    #[test]
    fn test_number_formats() {
        assert_eq!(format_number(30.0, None), "30");
        let spec = FormatSpec::default().decimals(1);
        assert_eq!(format_number(2.26, Some(&spec)), "2.3");
        let spec = FormatSpec::default().currency("EUR");
        assert_eq!(format_number(1234.5, Some(&spec)), "1234.50 EUR");
        let spec = FormatSpec::default().decimals(0).prefix("~").suffix("%");
        assert_eq!(format_number(42.4, Some(&spec)), "~42%");
    }

    #[test]
    fn test_plain_number_stays_native() {
        let col = ColumnConfig::number("age", "Age");
        assert_eq!(format_cell(&col, &Value::from(30)), Value::Number(30.0));
        assert_eq!(format_cell(&col, &Value::from("30")), Value::Number(30.0));
        assert_eq!(format_cell(&col, &Value::from("n/a")), Value::from("n/a"));
    }

    #[test]
    fn test_richtext_stripped_before_transform() {
        let col = ColumnConfig::new("bio", "Bio", ColumnType::RichText)
            .format(FormatSpec::default().transform(|v| v.to_plain_string().to_uppercase()));
        assert_eq!(format_cell(&col, &Value::from("<p>hi <b>there</b></p>")), Value::from("HI THERE"));
    }

    #[test]
    fn test_boolean_yes_no() {
        let col = ColumnConfig::new("active", "Active", ColumnType::Boolean);
        assert_eq!(format_cell_text(&col, &Value::from(true)), "Yes");
        assert_eq!(format_cell_text(&col, &Value::from("non")), "No");
        assert_eq!(format_cell_text(&col, &Value::Null), "");
    }

    #[test]
    fn test_dates() {
        let col = ColumnConfig::new("d", "D", ColumnType::Date);
        assert_eq!(format_cell_text(&col, &Value::from("15/01/2024")), "2024-01-15");
        let col = ColumnConfig::new("d", "D", ColumnType::Date).format(FormatSpec {
            date_format: Some("%d.%m.%Y".to_string()),
            ..FormatSpec::default()
        });
        assert_eq!(format_cell_text(&col, &Value::from("2024-01-15")), "15.01.2024");
        let col = ColumnConfig::new("t", "T", ColumnType::DateTime);
        assert_eq!(format_cell_text(&col, &Value::from("2024-01-15T08:30:00")), "2024-01-15 08:30");
    }

    #[test]
    fn test_select_labels() {
        let options = vec![
            SelectOption::new("todo", "To do"),
            SelectOption::new("done", "Done"),
        ];
        let col = ColumnConfig::new("s", "S", ColumnType::Select).options(options.clone());
        assert_eq!(format_cell_text(&col, &Value::from("done")), "Done");
        assert_eq!(format_cell_text(&col, &Value::from("other")), "other");

        let col = ColumnConfig::new("m", "M", ColumnType::MultiSelect).options(options);
        let cell = Value::List(vec![Value::from("todo"), Value::from("done")]);
        assert_eq!(format_cell_text(&col, &cell), "To do, Done");
    }
}
