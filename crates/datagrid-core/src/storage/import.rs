//! Import: header mapping plus per-cell validation and coercion.

use regex::Regex;
use serde::Serialize;

use datagrid_engine::engine::{
    ColumnConfig, ColumnType, Row, Value, parse_bool_token, parse_date, parse_date_time,
    parse_number_token,
};

use super::csv::parse_delimited;

/// A problem found while importing. `row` is the 1-based file row, so the
/// header is row 1 and the first record row 2. Row 0 is the input as a whole.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ImportIssue {
    pub row: usize,
    pub column: Option<String>,
    pub message: String,
}

impl ImportIssue {
    fn new(row: usize, column: Option<&ColumnConfig>, message: impl Into<String>) -> Self {
        Self {
            row,
            column: column.map(|c| c.title.clone()),
            message: message.into(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ImportResult {
    pub success: bool,
    /// Rows without errors, in input order.
    pub data: Vec<Row>,
    pub errors: Vec<ImportIssue>,
    pub warnings: Vec<ImportIssue>,
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// For each column, the index of the header cell that feeds it.
///
/// Exact title (or id) matches are taken first, ignoring case and surrounding
/// whitespace. Columns still unmapped then take the first unused header that
/// contains their title or is contained in it.
pub fn map_headers(headers: &[String], columns: &[&ColumnConfig]) -> Vec<Option<usize>> {
    let normalized: Vec<String> = headers.iter().map(|h| normalize(h)).collect();
    let mut used = vec![false; headers.len()];
    let mut mapping = vec![None; columns.len()];

    for (c, column) in columns.iter().enumerate() {
        let title = normalize(&column.title);
        let id = normalize(&column.id);
        let found = normalized
            .iter()
            .enumerate()
            .find(|(h, header)| !used[*h] && !header.is_empty() && (**header == title || **header == id));
        if let Some((h, _)) = found {
            used[h] = true;
            mapping[c] = Some(h);
        }
    }

    for (c, column) in columns.iter().enumerate() {
        if mapping[c].is_some() {
            continue;
        }
        let title = normalize(&column.title);
        if title.is_empty() {
            continue;
        }
        let found = normalized.iter().enumerate().find(|(h, header)| {
            !used[*h] && !header.is_empty() && (header.contains(&title) || title.contains(header.as_str()))
        });
        if let Some((h, _)) = found {
            used[h] = true;
            mapping[c] = Some(h);
        }
    }

    mapping
}

/// Outcome of coercing one cell.
struct Coerced {
    value: Value,
    warnings: Vec<String>,
}

impl Coerced {
    fn ok(value: Value) -> Self {
        Self {
            value,
            warnings: Vec::new(),
        }
    }
}

fn coerce_number(column: &ColumnConfig, raw: &str) -> Result<Value, String> {
    let n = parse_number_token(raw).ok_or_else(|| format!("Invalid number: {}", raw))?;
    if let Some(validation) = &column.validation {
        if let Some(min) = validation.min.filter(|min| n < *min) {
            return Err(format!("Value must be at least {}", Value::from(min)));
        }
        if let Some(max) = validation.max.filter(|max| n > *max) {
            return Err(format!("Value must be at most {}", Value::from(max)));
        }
    }
    Ok(Value::Number(n))
}

fn match_option(column: &ColumnConfig, token: &str) -> Option<Value> {
    column
        .options
        .iter()
        .find(|opt| opt.matches_token(token))
        .map(|opt| opt.value.clone())
}

fn coerce_cell(column: &ColumnConfig, raw: &str, pattern: Option<&Regex>) -> Result<Coerced, String> {
    // Only free text keeps surrounding whitespace.
    let text = raw.trim();
    match column.column_type {
        ColumnType::Number => coerce_number(column, text).map(Coerced::ok),
        ColumnType::Boolean => parse_bool_token(text)
            .map(|b| Coerced::ok(Value::Bool(b)))
            .ok_or_else(|| format!("Invalid boolean value: {}", text)),
        ColumnType::Date => parse_date(text)
            .map(|d| Coerced::ok(Value::Date(d)))
            .ok_or_else(|| format!("Invalid date: {}", text)),
        ColumnType::DateTime => parse_date_time(text)
            .map(|dt| Coerced::ok(Value::DateTime(dt)))
            .ok_or_else(|| format!("Invalid date: {}", text)),
        ColumnType::Select if !column.options.is_empty() => Ok(match match_option(column, text) {
            Some(value) => Coerced::ok(value),
            None => Coerced {
                value: Value::Text(text.to_string()),
                warnings: vec![format!("Unrecognized value: {}", text)],
            },
        }),
        ColumnType::MultiSelect => {
            let mut out = Coerced::ok(Value::Null);
            let mut items = Vec::new();
            for token in text.split([',', ';']).map(str::trim).filter(|t| !t.is_empty()) {
                match match_option(column, token) {
                    Some(value) => items.push(value),
                    None => {
                        if !column.options.is_empty() {
                            out.warnings.push(format!("Unrecognized value: {}", token));
                        }
                        items.push(Value::Text(token.to_string()));
                    }
                }
            }
            out.value = Value::List(items);
            Ok(out)
        }
        _ => match pattern {
            Some(re) if !re.is_match(raw) => Err(format!("Invalid format: {}", raw)),
            _ => Ok(Coerced::ok(Value::Text(raw.to_string()))),
        },
    }
}

fn compile_pattern(column: &ColumnConfig) -> Option<Regex> {
    let pattern = column.validation.as_ref()?.pattern.as_deref()?;
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            log::warn!("ignoring invalid pattern on column {}: {}", column.id, e);
            None
        }
    }
}

/// Parse, map and validate tabular text against the column schema.
///
/// A row with any error is left out of `data`; warnings never drop a row.
/// Formula columns are derived and never read from the input.
pub fn import_text(text: &str, columns: &[&ColumnConfig]) -> ImportResult {
    let records = parse_delimited(text);
    let Some((headers, body)) = records.split_first() else {
        return ImportResult {
            success: false,
            errors: vec![ImportIssue::new(0, None, "No data found")],
            ..ImportResult::default()
        };
    };

    let columns: Vec<&ColumnConfig> = columns
        .iter()
        .copied()
        .filter(|c| c.formula.is_none() && c.column_type != ColumnType::Formula)
        .collect();
    let mapping = map_headers(headers, &columns);
    let patterns: Vec<Option<Regex>> = columns.iter().map(|c| compile_pattern(c)).collect();

    let mut result = ImportResult::default();
    for (index, record) in body.iter().enumerate() {
        let file_row = index + 2;
        let mut row = Row::new();
        let mut row_ok = true;

        for (c, column) in columns.iter().copied().enumerate() {
            let raw = mapping[c]
                .and_then(|h| record.get(h))
                .map(String::as_str)
                .unwrap_or("");

            if raw.trim().is_empty() {
                if column.required {
                    result.errors.push(ImportIssue::new(
                        file_row,
                        Some(column),
                        format!("{} is required", column.title),
                    ));
                    row_ok = false;
                } else {
                    row.set(column.field(), Value::Null);
                }
                continue;
            }

            match coerce_cell(column, raw, patterns[c].as_ref()) {
                Ok(coerced) => {
                    for message in coerced.warnings {
                        result.warnings.push(ImportIssue::new(file_row, Some(column), message));
                    }
                    row.set(column.field(), coerced.value);
                }
                Err(message) => {
                    result.errors.push(ImportIssue::new(file_row, Some(column), message));
                    row_ok = false;
                }
            }
        }

        if row_ok {
            result.data.push(row);
        }
    }

    result.success = result.errors.is_empty();
    log::debug!(
        "imported {} of {} rows ({} errors, {} warnings)",
        result.data.len(),
        body.len(),
        result.errors.len(),
        result.warnings.len()
    );
    result
}
