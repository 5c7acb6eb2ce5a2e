//! Filtering engine.
//!
//! Rules sit in groups, groups combine under a set-level logic, and a global
//! search term is applied on top. Evaluation is a pure function of the rows,
//! the schema and the filter state. It never fails: a rule that cannot be
//! evaluated (unknown column, missing operand, invalid pattern) passes every
//! row, while a cell that cannot be coerced fails the predicate.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use super::{ColumnConfig, ColumnRegistry, ColumnType, Row, Value};
use super::html::plain_text;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    IsEmpty,
    IsNotEmpty,
    In,
    NotIn,
    /// Regular expression match on the cell's plain text.
    Matches,
}

impl FilterOperator {
    pub fn parse(s: &str) -> Option<Self> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "equals" | "eq" | "=" | "==" => FilterOperator::Equals,
            "not_equals" | "ne" | "!=" => FilterOperator::NotEquals,
            "contains" => FilterOperator::Contains,
            "not_contains" => FilterOperator::NotContains,
            "starts_with" => FilterOperator::StartsWith,
            "ends_with" => FilterOperator::EndsWith,
            "gt" | ">" => FilterOperator::Gt,
            "gte" | ">=" => FilterOperator::Gte,
            "lt" | "<" => FilterOperator::Lt,
            "lte" | "<=" => FilterOperator::Lte,
            "between" => FilterOperator::Between,
            "is_empty" => FilterOperator::IsEmpty,
            "is_not_empty" => FilterOperator::IsNotEmpty,
            "in" => FilterOperator::In,
            "not_in" => FilterOperator::NotIn,
            "matches" | "regex" => FilterOperator::Matches,
            _ => return None,
        };
        Some(op)
    }

    /// Whether the operator reads the rule's value.
    pub fn needs_value(&self) -> bool {
        !matches!(self, FilterOperator::IsEmpty | FilterOperator::IsNotEmpty)
    }
}

/// How results inside a group, or groups inside a set, are combined.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Logic {
    #[default]
    And,
    Or,
}

impl Logic {
    /// Combine results. Returns None when there was nothing to combine.
    fn combine(self, results: impl Iterator<Item = bool>) -> Option<bool> {
        let mut seen = false;
        let mut acc = matches!(self, Logic::And);
        for r in results {
            seen = true;
            match self {
                Logic::And => acc &= r,
                Logic::Or => acc |= r,
            }
        }
        seen.then_some(acc)
    }
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterRule {
    #[serde(default)]
    pub id: String,
    pub column: String,
    pub operator: FilterOperator,
    #[serde(default)]
    pub value: Value,
    /// Upper bound for `between`.
    #[serde(default)]
    pub value2: Option<Value>,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl FilterRule {
    pub fn new(column: impl Into<String>, operator: FilterOperator, value: impl Into<Value>) -> Self {
        Self {
            id: String::new(),
            column: column.into(),
            operator,
            value: value.into(),
            value2: None,
            enabled: true,
        }
    }

    pub fn between(column: impl Into<String>, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        let mut rule = Self::new(column, FilterOperator::Between, low);
        rule.value2 = Some(high.into());
        rule
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Bounds for `between`: `value`/`value2`, or a two-element list in `value`.
    pub(super) fn bounds(&self) -> Option<(&Value, &Value)> {
        match (&self.value, &self.value2) {
            (low, Some(high)) if !low.is_blank() && !high.is_blank() => Some((low, high)),
            (Value::List(items), None) if items.len() == 2 => {
                if items[0].is_blank() || items[1].is_blank() {
                    None
                } else {
                    Some((&items[0], &items[1]))
                }
            }
            _ => None,
        }
    }
}

/// `matches` patterns compiled once per evaluation pass, keyed by pattern
/// text. An invalid pattern is stored as `None`.
#[derive(Clone, Debug, Default)]
pub struct Patterns {
    compiled: HashMap<String, Option<Regex>>,
}

impl Patterns {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile the pattern of an enabled `matches` rule.
    pub fn add(&mut self, rule: &FilterRule) {
        if !rule.enabled || rule.operator != FilterOperator::Matches {
            return;
        }
        let pattern = rule.value.to_plain_string();
        if !self.compiled.contains_key(&pattern) {
            let re = Regex::new(&pattern).ok();
            self.compiled.insert(pattern, re);
        }
    }

    pub fn len(&self) -> usize {
        self.compiled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.compiled.is_empty()
    }

    /// Whether `text` matches `pattern`. Invalid patterns match everything.
    fn is_match(&self, pattern: &str, text: &str) -> bool {
        match self.compiled.get(pattern) {
            Some(Some(re)) => re.is_match(text),
            Some(None) => true,
            None => Regex::new(pattern).map_or(true, |re| re.is_match(text)),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterGroup {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub logic: Logic,
    #[serde(default)]
    pub rules: Vec<FilterRule>,
    /// Nested groups, combined with the rules under this group's logic.
    #[serde(default)]
    pub groups: Vec<FilterGroup>,
}

impl FilterGroup {
    pub fn new(id: impl Into<String>, logic: Logic) -> Self {
        Self {
            id: id.into(),
            logic,
            rules: Vec::new(),
            groups: Vec::new(),
        }
    }

    pub fn rule(mut self, rule: FilterRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn group(mut self, group: FilterGroup) -> Self {
        self.groups.push(group);
        self
    }

    fn has_enabled_rules(&self) -> bool {
        self.rules.iter().any(|r| r.enabled) || self.groups.iter().any(|g| g.has_enabled_rules())
    }

    fn collect_patterns(&self, patterns: &mut Patterns) {
        for rule in &self.rules {
            patterns.add(rule);
        }
        for group in &self.groups {
            group.collect_patterns(patterns);
        }
    }

    fn find_rule_mut(&mut self, id: &str) -> Option<&mut FilterRule> {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.id == id) {
            return Some(rule);
        }
        self.groups.iter_mut().find_map(|g| g.find_rule_mut(id))
    }

    fn remove_rule(&mut self, id: &str) -> bool {
        let before = self.rules.len();
        self.rules.retain(|r| r.id != id);
        if self.rules.len() != before {
            return true;
        }
        self.groups.iter_mut().any(|g| g.remove_rule(id))
    }

    /// None when the group has nothing enabled to evaluate.
    fn evaluate(&self, row: &Row, registry: &ColumnRegistry, patterns: &Patterns) -> Option<bool> {
        let rule_results = self
            .rules
            .iter()
            .filter(|r| r.enabled)
            .map(|r| evaluate_compiled(r, row, registry, patterns));
        let group_results = self
            .groups
            .iter()
            .filter_map(|g| g.evaluate(row, registry, patterns));
        self.logic.combine(rule_results.chain(group_results))
    }
}

/// Complete filter state: groups plus the logic that joins them.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(default)]
    pub groups: Vec<FilterGroup>,
    #[serde(default)]
    pub logic: Logic,
}

impl FilterSet {
    pub fn new(logic: Logic) -> Self {
        Self {
            groups: Vec::new(),
            logic,
        }
    }

    pub fn group(mut self, group: FilterGroup) -> Self {
        self.groups.push(group);
        self
    }

    /// True when at least one enabled rule exists.
    pub fn is_active(&self) -> bool {
        self.groups.iter().any(|g| g.has_enabled_rules())
    }

    pub fn set_rule_enabled(&mut self, rule_id: &str, enabled: bool) -> bool {
        match self.groups.iter_mut().find_map(|g| g.find_rule_mut(rule_id)) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn remove_rule(&mut self, rule_id: &str) -> bool {
        self.groups.iter_mut().any(|g| g.remove_rule(rule_id))
    }

    /// Compile every enabled `matches` pattern in the set.
    pub fn patterns(&self) -> Patterns {
        let mut patterns = Patterns::new();
        for group in &self.groups {
            group.collect_patterns(&mut patterns);
        }
        patterns
    }

    pub fn matches(&self, row: &Row, registry: &ColumnRegistry) -> bool {
        self.matches_compiled(row, registry, &self.patterns())
    }

    /// [`matches`](Self::matches) with patterns compiled by [`patterns`](Self::patterns).
    pub fn matches_compiled(&self, row: &Row, registry: &ColumnRegistry, patterns: &Patterns) -> bool {
        self.logic
            .combine(
                self.groups
                    .iter()
                    .filter_map(|g| g.evaluate(row, registry, patterns)),
            )
            .unwrap_or(true)
    }
}

/// Evaluate a single rule against a row. Disabled rules are the caller's concern.
pub fn evaluate_rule(rule: &FilterRule, row: &Row, registry: &ColumnRegistry) -> bool {
    evaluate_compiled(rule, row, registry, &Patterns::new())
}

fn evaluate_compiled(rule: &FilterRule, row: &Row, registry: &ColumnRegistry, patterns: &Patterns) -> bool {
    let Some(column) = registry.get(&rule.column) else {
        return true;
    };
    let cell = column.value(row);
    apply_operator(rule, &cell, column.column_type, patterns)
}

pub(super) fn apply_operator(
    rule: &FilterRule,
    cell: &Value,
    column_type: ColumnType,
    patterns: &Patterns,
) -> bool {
    use FilterOperator::*;

    if rule.operator.needs_value() && rule.operator != Between && rule.value.is_blank() {
        return true;
    }

    match rule.operator {
        Equals => text_any(cell, |t| t == rule.value.to_match_text()),
        NotEquals => !text_any(cell, |t| t == rule.value.to_match_text()),
        Contains => text_any(cell, |t| t.contains(&rule.value.to_match_text())),
        NotContains => !text_any(cell, |t| t.contains(&rule.value.to_match_text())),
        StartsWith => text_any(cell, |t| t.starts_with(&rule.value.to_match_text())),
        EndsWith => text_any(cell, |t| t.ends_with(&rule.value.to_match_text())),
        Gt => compare_ordered(cell, &rule.value, column_type).is_some_and(|o| o == Ordering::Greater),
        Gte => compare_ordered(cell, &rule.value, column_type).is_some_and(|o| o != Ordering::Less),
        Lt => compare_ordered(cell, &rule.value, column_type).is_some_and(|o| o == Ordering::Less),
        Lte => compare_ordered(cell, &rule.value, column_type).is_some_and(|o| o != Ordering::Greater),
        Between => match rule.bounds() {
            None => true,
            Some((low, high)) => {
                compare_ordered(cell, low, column_type).is_some_and(|o| o != Ordering::Less)
                    && compare_ordered(cell, high, column_type)
                        .is_some_and(|o| o != Ordering::Greater)
            }
        },
        IsEmpty => cell.is_blank(),
        IsNotEmpty => !cell.is_blank(),
        In => {
            let set = membership_set(&rule.value);
            text_any(cell, |t| set.contains(&t))
        }
        NotIn => {
            let set = membership_set(&rule.value);
            !text_any(cell, |t| set.contains(&t))
        }
        Matches => patterns.is_match(
            &rule.value.to_plain_string(),
            &plain_text(&cell.to_plain_string()),
        ),
    }
}

/// Apply a text predicate to a cell, element-wise for list cells.
fn text_any(cell: &Value, pred: impl Fn(String) -> bool) -> bool {
    match cell {
        Value::List(items) => items.iter().any(|v| pred(v.to_match_text())),
        other => pred(other.to_match_text()),
    }
}

fn membership_set(value: &Value) -> Vec<String> {
    match value {
        Value::List(items) => items.iter().map(Value::to_match_text).collect(),
        other => other
            .to_plain_string()
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect(),
    }
}

/// Order a cell against an operand, numerically or by timestamp.
/// Returns None when either side cannot be coerced.
pub fn compare_ordered(cell: &Value, target: &Value, column_type: ColumnType) -> Option<Ordering> {
    let temporal = column_type.is_temporal()
        || matches!(cell, Value::Date(_) | Value::DateTime(_))
        || matches!(target, Value::Date(_) | Value::DateTime(_));

    if !temporal {
        if let (Some(a), Some(b)) = (cell.as_number(), target.as_number()) {
            return a.partial_cmp(&b);
        }
        if column_type == ColumnType::Number {
            return None;
        }
    }

    let a = cell.as_timestamp()?;
    let b = target.as_timestamp()?;
    Some(a.cmp(&b))
}

/// Text a global search term is matched against. None for null cells.
fn search_texts(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Bool(b) => vec![if *b { "yes" } else { "no" }.to_string()],
        Value::List(items) => items.iter().flat_map(search_texts).collect(),
        other => vec![other.to_match_text()],
    }
}

/// Whether any searchable column of the row contains the term (case-insensitive).
pub fn matches_search(row: &Row, columns: &[&ColumnConfig], term: &str) -> bool {
    let needle = term.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    columns
        .iter()
        .filter(|c| c.searchable)
        .any(|c| search_texts(&c.value(row)).iter().any(|t| t.contains(&needle)))
}

/// Indices of rows passing the global search and the filter set, in input order.
pub fn filter_rows(
    rows: &[Row],
    registry: &ColumnRegistry,
    filters: &FilterSet,
    search: Option<&str>,
    search_columns: &[&ColumnConfig],
) -> Vec<usize> {
    let search = search.map(str::trim).filter(|s| !s.is_empty());
    let patterns = filters.patterns();
    rows.iter()
        .enumerate()
        .filter(|(_, row)| search.is_none_or(|term| matches_search(row, search_columns, term)))
        .filter(|(_, row)| filters.matches_compiled(row, registry, &patterns))
        .map(|(i, _)| i)
        .collect()
}
