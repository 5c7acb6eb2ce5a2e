//! Sorting engine.
//!
//! A [`SortSpec`] is an ordered list of (column, direction) entries. Rows are
//! compared by the first entry, ties fall through to the next, and remaining
//! ties keep their input order. Nulls sort after every defined value in both
//! directions.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::html::plain_text;
use super::{ColumnRegistry, ColumnType, Row, Value};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Some(SortDirection::Asc),
            "desc" | "descending" => Some(SortDirection::Desc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortEntry {
    pub column: String,
    pub direction: SortDirection,
}

/// Sort entries in precedence order. Empty means input order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortSpec {
    entries: Vec<SortEntry>,
}

impl SortSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(column: impl Into<String>, direction: SortDirection) -> Self {
        Self::new().then(column, direction)
    }

    /// Append a lower-precedence entry.
    pub fn then(mut self, column: impl Into<String>, direction: SortDirection) -> Self {
        self.set(&column.into(), Some(direction), true);
        self
    }

    pub fn entries(&self) -> &[SortEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn direction_of(&self, column: &str) -> Option<SortDirection> {
        self.entries
            .iter()
            .find(|e| e.column == column)
            .map(|e| e.direction)
    }

    /// Advance a column through descending, ascending, then unsorted.
    ///
    /// Without `additive` the column becomes the only sort key.
    /// Returns the column's new direction.
    pub fn toggle(&mut self, column: &str, additive: bool) -> Option<SortDirection> {
        let next = match self.direction_of(column) {
            None => Some(SortDirection::Desc),
            Some(SortDirection::Desc) => Some(SortDirection::Asc),
            Some(SortDirection::Asc) => None,
        };
        self.set(column, next, additive);
        next
    }

    /// Force a direction for a column, or remove it with `None`.
    pub fn set(&mut self, column: &str, direction: Option<SortDirection>, additive: bool) {
        if !additive {
            self.entries.retain(|e| e.column == column);
        }
        match direction {
            None => self.entries.retain(|e| e.column != column),
            Some(direction) => match self.entries.iter_mut().find(|e| e.column == column) {
                Some(entry) => entry.direction = direction,
                None => self.entries.push(SortEntry {
                    column: column.to_string(),
                    direction,
                }),
            },
        }
    }

    /// Drop entries naming columns the predicate rejects.
    pub fn retain_columns(&mut self, keep: impl Fn(&str) -> bool) {
        self.entries.retain(|e| keep(&e.column));
    }
}

fn string_compare(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase())
}

fn text_of(value: &Value) -> String {
    match value {
        Value::Text(s) => plain_text(s),
        other => other.to_plain_string(),
    }
}

/// Ascending comparison of two defined values, guided by the column type.
/// Values that cannot be compared as their type fall back to text.
pub fn compare_values(a: &Value, b: &Value, column_type: ColumnType) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Date(_) | Value::DateTime(_), Value::Date(_) | Value::DateTime(_)) => {
            a.as_timestamp().cmp(&b.as_timestamp())
        }
        _ if matches!(column_type, ColumnType::Number | ColumnType::Boolean) => {
            match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                _ => string_compare(&text_of(a), &text_of(b)),
            }
        }
        _ if column_type.is_temporal() => match (a.as_timestamp(), b.as_timestamp()) {
            (Some(x), Some(y)) => x.cmp(&y),
            _ => string_compare(&text_of(a), &text_of(b)),
        },
        _ => string_compare(&text_of(a), &text_of(b)),
    }
}

/// Compare with direction applied; nulls last in either direction.
fn compare_cells(a: &Value, b: &Value, column_type: ColumnType, direction: SortDirection) -> Ordering {
    match (a.is_null(), b.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => {
            let ord = compare_values(a, b, column_type);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// Reorder `indices` (positions into `rows`) by the sort spec. Stable.
pub fn sort_indices(rows: &[Row], indices: &mut Vec<usize>, registry: &ColumnRegistry, spec: &SortSpec) {
    if spec.is_empty() || indices.len() < 2 {
        return;
    }

    // Unknown columns read the raw field and compare as text.
    let keys: Vec<(ColumnType, SortDirection, Vec<Value>)> = spec
        .entries()
        .iter()
        .map(|entry| {
            let column = registry.get(&entry.column);
            let column_type = column.map(|c| c.column_type).unwrap_or(ColumnType::Text);
            let values = indices
                .iter()
                .map(|&i| match column {
                    Some(c) => c.value(&rows[i]),
                    None => match rows[i].get(&entry.column) {
                        Value::Null => Value::Null,
                        other => Value::Text(other.to_plain_string()),
                    },
                })
                .collect();
            (column_type, entry.direction, values)
        })
        .collect();

    let mut order: Vec<usize> = (0..indices.len()).collect();
    order.sort_by(|&x, &y| {
        for (column_type, direction, values) in &keys {
            let ord = compare_cells(&values[x], &values[y], *column_type, *direction);
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    let sorted: Vec<usize> = order.into_iter().map(|pos| indices[pos]).collect();
    *indices = sorted;
}

/// Sorted positions of all rows.
pub fn sort_rows(rows: &[Row], registry: &ColumnRegistry, spec: &SortSpec) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..rows.len()).collect();
    sort_indices(rows, &mut indices, registry, spec);
    indices
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ColumnConfig;
    use chrono::NaiveDate;

    fn registry() -> ColumnRegistry {
        ColumnRegistry::new(vec![
            ColumnConfig::number("id", "Id"),
            ColumnConfig::text("name", "Name"),
            ColumnConfig::number("age", "Age"),
            ColumnConfig::new("joined", "Joined", ColumnType::Date),
            ColumnConfig::new("bio", "Bio", ColumnType::RichText),
        ])
        .unwrap()
    }

    fn ids(rows: &[Row], order: &[usize]) -> Vec<String> {
        order.iter().map(|&i| rows[i].get("id").to_plain_string()).collect()
    }

    #[test]
    fn test_sort_by_age_asc() {
        let rows = vec![
            Row::new().with("id", 1).with("age", 30).with("name", "John"),
            Row::new().with("id", 2).with("age", 25).with("name", "Alice"),
        ];
        let order = sort_rows(&rows, &registry(), &SortSpec::by("age", SortDirection::Asc));
        assert_eq!(ids(&rows, &order), vec!["2", "1"]);
    }

    #[test]
    fn test_numbers_compare_numerically() {
        let rows = vec![
            Row::new().with("id", 1).with("age", "100"),
            Row::new().with("id", 2).with("age", 9),
            Row::new().with("id", 3).with("age", "20"),
        ];
        let order = sort_rows(&rows, &registry(), &SortSpec::by("age", SortDirection::Asc));
        assert_eq!(ids(&rows, &order), vec!["2", "3", "1"]);
    }

    #[test]
    fn test_nulls_last_both_directions() {
        let rows = vec![
            Row::new().with("id", 1),
            Row::new().with("id", 2).with("age", 5),
            Row::new().with("id", 3).with("age", 7),
        ];
        let reg = registry();
        let asc = sort_rows(&rows, &reg, &SortSpec::by("age", SortDirection::Asc));
        assert_eq!(ids(&rows, &asc), vec!["2", "3", "1"]);
        let desc = sort_rows(&rows, &reg, &SortSpec::by("age", SortDirection::Desc));
        assert_eq!(ids(&rows, &desc), vec!["3", "2", "1"]);
    }

    #[test]
    fn test_stable_on_ties() {
        let rows = vec![
            Row::new().with("id", 1).with("age", 30),
            Row::new().with("id", 2).with("age", 20),
            Row::new().with("id", 3).with("age", 30),
            Row::new().with("id", 4).with("age", 20),
        ];
        let reg = registry();
        let asc = sort_rows(&rows, &reg, &SortSpec::by("age", SortDirection::Asc));
        assert_eq!(ids(&rows, &asc), vec!["2", "4", "1", "3"]);
        let desc = sort_rows(&rows, &reg, &SortSpec::by("age", SortDirection::Desc));
        assert_eq!(ids(&rows, &desc), vec!["1", "3", "2", "4"]);
    }

    #[test]
    fn test_multi_key_tie_break() {
        let rows = vec![
            Row::new().with("id", 1).with("age", 30).with("name", "bob"),
            Row::new().with("id", 2).with("age", 30).with("name", "Alice"),
            Row::new().with("id", 3).with("age", 20).with("name", "Carl"),
        ];
        let spec = SortSpec::by("age", SortDirection::Desc).then("name", SortDirection::Asc);
        let order = sort_rows(&rows, &registry(), &spec);
        assert_eq!(ids(&rows, &order), vec!["2", "1", "3"]);
    }

    #[test]
    fn test_dates_and_richtext() {
        let rows = vec![
            Row::new()
                .with("id", 1)
                .with("joined", "2024-05-01")
                .with("bio", "<b>zed</b>"),
            Row::new()
                .with("id", 2)
                .with("joined", NaiveDate::from_ymd_opt(2023, 1, 1).unwrap())
                .with("bio", "<i>Amy</i>"),
        ];
        let reg = registry();
        let by_date = sort_rows(&rows, &reg, &SortSpec::by("joined", SortDirection::Asc));
        assert_eq!(ids(&rows, &by_date), vec!["2", "1"]);
        let by_bio = sort_rows(&rows, &reg, &SortSpec::by("bio", SortDirection::Asc));
        assert_eq!(ids(&rows, &by_bio), vec!["2", "1"]);
    }

    #[test]
    fn test_unknown_column_sorts_as_text() {
        let rows = vec![
            Row::new().with("id", 1).with("extra", 10),
            Row::new().with("id", 2).with("extra", 9),
        ];
        let order = sort_rows(&rows, &registry(), &SortSpec::by("extra", SortDirection::Asc));
        assert_eq!(ids(&rows, &order), vec!["1", "2"]);
    }

    #[test]
    fn test_toggle_cycles_desc_asc_none() {
        let mut spec = SortSpec::new();
        assert_eq!(spec.toggle("age", false), Some(SortDirection::Desc));
        assert_eq!(spec.toggle("age", false), Some(SortDirection::Asc));
        assert_eq!(spec.toggle("age", false), None);
        assert!(spec.is_empty());
    }

    #[test]
    fn test_toggle_replaces_unless_additive() {
        let mut spec = SortSpec::by("age", SortDirection::Asc);
        spec.toggle("name", false);
        assert_eq!(spec.entries().len(), 1);
        assert_eq!(spec.direction_of("age"), None);

        spec.toggle("age", true);
        assert_eq!(spec.entries().len(), 2);
        assert_eq!(spec.entries()[1].column, "age");
    }

    #[test]
    fn test_set_and_remove() {
        let mut spec = SortSpec::new();
        spec.set("age", Some(SortDirection::Asc), false);
        assert_eq!(spec.direction_of("age"), Some(SortDirection::Asc));
        spec.set("age", None, false);
        assert!(spec.is_empty());
    }
}
