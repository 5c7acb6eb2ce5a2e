//! Conditional colour rules.
//!
//! A rule tests one column of a row and, when it matches, paints either that
//! cell or the whole row. Rules are applied in ascending priority and the
//! first matching rule wins each colour property.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::filter::{Patterns, apply_operator};
use super::{ColumnConfig, ColumnType, FilterOperator, FilterRule, Row, Value};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorCondition {
    Equals,
    Contains,
    Greater,
    Less,
    Between,
    Empty,
    NotEmpty,
}

impl ColorCondition {
    fn operator(self) -> FilterOperator {
        match self {
            ColorCondition::Equals => FilterOperator::Equals,
            ColorCondition::Contains => FilterOperator::Contains,
            ColorCondition::Greater => FilterOperator::Gt,
            ColorCondition::Less => FilterOperator::Lt,
            ColorCondition::Between => FilterOperator::Between,
            ColorCondition::Empty => FilterOperator::IsEmpty,
            ColorCondition::NotEmpty => FilterOperator::IsNotEmpty,
        }
    }
}

/// What a matching rule paints.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorTarget {
    #[default]
    Cell,
    Row,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorRule {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub column: String,
    pub condition: ColorCondition,
    #[serde(default)]
    pub value: Value,
    /// Upper bound for `between`.
    #[serde(default)]
    pub value2: Option<Value>,
    /// Hex background colour.
    #[serde(default)]
    pub background: Option<String>,
    /// Hex text colour.
    #[serde(default)]
    pub text_color: Option<String>,
    #[serde(default)]
    pub apply_to: ColorTarget,
    /// Lower values are applied first.
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl ColorRule {
    pub fn new(
        id: impl Into<String>,
        column: impl Into<String>,
        condition: ColorCondition,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            column: column.into(),
            condition,
            value: value.into(),
            value2: None,
            background: None,
            text_color: None,
            apply_to: ColorTarget::Cell,
            priority: 0,
            enabled: true,
        }
    }

    pub fn between(
        id: impl Into<String>,
        column: impl Into<String>,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Self {
        let mut rule = Self::new(id, column, ColorCondition::Between, low);
        rule.value2 = Some(high.into());
        rule
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_background(mut self, color: impl Into<String>) -> Self {
        self.background = Some(color.into());
        self
    }

    pub fn with_text_color(mut self, color: impl Into<String>) -> Self {
        self.text_color = Some(color.into());
        self
    }

    pub fn apply_to(mut self, target: ColorTarget) -> Self {
        self.apply_to = target;
        self
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    fn as_filter(&self) -> FilterRule {
        let mut rule = FilterRule::new(self.column.clone(), self.condition.operator(), self.value.clone());
        rule.value2 = self.value2.clone();
        rule
    }

    /// Whether the rule's condition holds for a cell. A rule missing its
    /// operand never matches.
    pub fn matches(&self, cell: &Value, column_type: ColumnType) -> bool {
        let rule = self.as_filter();
        let operand_missing = match self.condition {
            ColorCondition::Empty | ColorCondition::NotEmpty => false,
            ColorCondition::Between => rule.bounds().is_none(),
            _ => self.value.is_blank(),
        };
        !operand_missing && apply_operator(&rule, cell, column_type, &Patterns::new())
    }
}

/// Resolved colours for one cell.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellColors {
    pub background: Option<String>,
    pub text: Option<String>,
}

impl CellColors {
    pub fn is_empty(&self) -> bool {
        self.background.is_none() && self.text.is_none()
    }

    /// Take the rule's colours for properties not already set.
    fn fill(&mut self, rule: &ColorRule) {
        if self.background.is_none() {
            self.background = rule.background.clone();
        }
        if self.text.is_none() {
            self.text = rule.text_color.clone();
        }
    }

    /// Properties set here win over `base`.
    fn over(&self, base: &CellColors) -> CellColors {
        CellColors {
            background: self.background.clone().or_else(|| base.background.clone()),
            text: self.text.clone().or_else(|| base.text.clone()),
        }
    }
}

/// Colours resolved for a row: row-wide colours plus per-cell overrides.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowColors {
    pub row: CellColors,
    pub cells: BTreeMap<String, CellColors>,
}

impl RowColors {
    pub fn is_empty(&self) -> bool {
        self.row.is_empty() && self.cells.is_empty()
    }

    /// Effective colours of a cell. Cell rules override row rules per property.
    pub fn cell(&self, column: &str) -> CellColors {
        match self.cells.get(column) {
            Some(colors) => colors.over(&self.row),
            None => self.row.clone(),
        }
    }
}

/// Enabled rules in application order: ascending priority, stable on ties.
pub fn ordered_rules(rules: &[ColorRule]) -> Vec<&ColorRule> {
    let mut ordered: Vec<&ColorRule> = rules.iter().filter(|r| r.enabled).collect();
    ordered.sort_by_key(|r| r.priority);
    ordered
}

/// Resolve the colours a row receives. Rules on columns missing from
/// `columns` read the raw row field as text.
pub fn resolve_row_colors(rules: &[ColorRule], row: &Row, columns: &[&ColumnConfig]) -> RowColors {
    let mut colors = RowColors::default();
    for rule in ordered_rules(rules) {
        let (cell, column_type) = match columns.iter().find(|c| c.id == rule.column) {
            Some(column) => (column.value(row), column.column_type),
            None => (row.get(&rule.column).clone(), ColumnType::Text),
        };
        if !rule.matches(&cell, column_type) {
            continue;
        }
        match rule.apply_to {
            ColorTarget::Row => colors.row.fill(rule),
            ColorTarget::Cell => colors.cells.entry(rule.column.clone()).or_default().fill(rule),
        }
    }
    colors
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ColumnConfig> {
        vec![
            ColumnConfig::text("name", "Name"),
            ColumnConfig::number("age", "Age"),
        ]
    }

    fn resolve(rules: &[ColorRule], row: &Row) -> RowColors {
        let cols = columns();
        let refs: Vec<&ColumnConfig> = cols.iter().collect();
        resolve_row_colors(rules, row, &refs)
    }

    #[test]
    fn test_conditions() {
        let age = Value::from(30);
        let rule = |c, v: &str| ColorRule::new("r", "age", c, v);
        assert!(rule(ColorCondition::Equals, "30").matches(&age, ColumnType::Number));
        assert!(rule(ColorCondition::Greater, "18").matches(&age, ColumnType::Number));
        assert!(!rule(ColorCondition::Less, "18").matches(&age, ColumnType::Number));
        assert!(ColorRule::between("r", "age", 20, 40).matches(&age, ColumnType::Number));
        assert!(!ColorRule::between("r", "age", 31, 40).matches(&age, ColumnType::Number));
        assert!(
            ColorRule::new("r", "name", ColorCondition::Contains, "LIC")
                .matches(&Value::from("Alice"), ColumnType::Text)
        );
        assert!(rule(ColorCondition::Empty, "").matches(&Value::Null, ColumnType::Number));
        assert!(rule(ColorCondition::NotEmpty, "").matches(&age, ColumnType::Number));
    }

    #[test]
    fn test_missing_operand_never_matches() {
        let age = Value::from(30);
        assert!(!ColorRule::new("r", "age", ColorCondition::Greater, "").matches(&age, ColumnType::Number));
        assert!(!ColorRule::new("r", "age", ColorCondition::Between, 10).matches(&age, ColumnType::Number));
    }

    #[test]
    fn test_priority_order_and_targets() {
        let rules = vec![
            ColorRule::new("late", "age", ColorCondition::Greater, 18)
                .with_background("#00ff00")
                .with_text_color("#111111")
                .priority(2),
            ColorRule::new("early", "age", ColorCondition::Greater, 20)
                .with_background("#ff0000")
                .priority(1),
            ColorRule::new("row", "name", ColorCondition::Equals, "john")
                .with_background("#0000ff")
                .apply_to(ColorTarget::Row)
                .priority(3),
            ColorRule::new("off", "age", ColorCondition::NotEmpty, "")
                .with_background("#999999")
                .enabled(false),
        ];
        let row = Row::new().with("name", "John").with("age", 30);
        let colors = resolve(&rules, &row);

        let age = colors.cell("age");
        assert_eq!(age.background.as_deref(), Some("#ff0000"));
        assert_eq!(age.text.as_deref(), Some("#111111"));

        let name = colors.cell("name");
        assert_eq!(name.background.as_deref(), Some("#0000ff"));
        assert_eq!(name.text, None);
    }

    #[test]
    fn test_no_match_leaves_row_plain() {
        let rules = vec![ColorRule::new("r", "age", ColorCondition::Less, 10).with_background("#ff0000")];
        let row = Row::new().with("name", "Bob").with("age", 41);
        assert!(resolve(&rules, &row).is_empty());
    }

    #[test]
    fn test_unknown_column_reads_raw_field() {
        let rules = vec![
            ColorRule::new("r", "status", ColorCondition::Equals, "active")
                .with_background("#00ff00")
                .apply_to(ColorTarget::Row),
        ];
        let row = Row::new().with("name", "Bob").with("status", "Active");
        assert_eq!(resolve(&rules, &row).cell("age").background.as_deref(), Some("#00ff00"));
    }
}
