//! Column schema.
//!
//! A [`ColumnConfig`] is created once per table definition. Serializable parts
//! (ids, flags, validation, options, formatting) round-trip through serde so a
//! table definition can live in a config file; closures (custom accessor,
//! renderer, format transform) are attached in code.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use super::{Row, Value};

/// Semantic type of a column.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    #[default]
    Text,
    Number,
    Boolean,
    Date,
    DateTime,
    Select,
    MultiSelect,
    RichText,
    Formula,
    Custom,
}

impl ColumnType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Text => "text",
            ColumnType::Number => "number",
            ColumnType::Boolean => "boolean",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Select => "select",
            ColumnType::MultiSelect => "multiselect",
            ColumnType::RichText => "richtext",
            ColumnType::Formula => "formula",
            ColumnType::Custom => "custom",
        }
    }

    pub fn is_temporal(&self) -> bool {
        matches!(self, ColumnType::Date | ColumnType::DateTime)
    }
}

/// An entry of a select/multiselect option list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SelectOption {
    pub value: Value,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

impl SelectOption {
    pub fn new(value: impl Into<Value>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            color: None,
        }
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// Case-insensitive match against the option value or label.
    pub fn matches_token(&self, token: &str) -> bool {
        let token = token.trim().to_lowercase();
        self.value.to_plain_string().to_lowercase() == token || self.label.to_lowercase() == token
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Validation {
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub pattern: Option<String>,
}

/// Custom value-to-text transform applied on export.
#[derive(Clone)]
pub struct FormatTransform(Arc<dyn Fn(&Value) -> String + Send + Sync>);

impl FormatTransform {
    pub fn new(f: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn apply(&self, value: &Value) -> String {
        (self.0)(value)
    }
}

impl fmt::Debug for FormatTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FormatTransform(..)")
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct FormatSpec {
    #[serde(default)]
    pub decimals: Option<usize>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default)]
    pub suffix: Option<String>,
    /// chrono format string for date/datetime cells.
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(skip)]
    pub transform: Option<FormatTransform>,
}

impl FormatSpec {
    pub fn decimals(mut self, decimals: usize) -> Self {
        self.decimals = Some(decimals);
        self
    }

    pub fn currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    pub fn transform(mut self, f: impl Fn(&Value) -> String + Send + Sync + 'static) -> Self {
        self.transform = Some(FormatTransform::new(f));
        self
    }
}

/// A formula declaration. Evaluation happens outside the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FormulaSpec {
    pub expression: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

/// Reads a cell value from a row instead of the column key.
#[derive(Clone)]
pub struct ValueAccessor(Arc<dyn Fn(&Row) -> Value + Send + Sync>);

impl ValueAccessor {
    pub fn new(f: impl Fn(&Row) -> Value + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for ValueAccessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ValueAccessor(..)")
    }
}

/// Turns a cell into display text for the rendering layer.
#[derive(Clone)]
pub struct CellRenderer(Arc<dyn Fn(&Value, &Row) -> String + Send + Sync>);

impl CellRenderer {
    pub fn new(f: impl Fn(&Value, &Row) -> String + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }
}

impl fmt::Debug for CellRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CellRenderer(..)")
    }
}

fn default_true() -> bool {
    true
}

/// Column definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub id: String,
    /// Row field holding the value. Defaults to the column id.
    #[serde(default)]
    pub key: String,
    pub title: String,
    #[serde(default, rename = "type")]
    pub column_type: ColumnType,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub min_width: Option<f32>,
    #[serde(default)]
    pub max_width: Option<f32>,
    #[serde(default = "default_true")]
    pub sortable: bool,
    #[serde(default = "default_true")]
    pub searchable: bool,
    #[serde(default)]
    pub editable: bool,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default)]
    pub locked: bool,
    #[serde(default)]
    pub validation: Option<Validation>,
    #[serde(default)]
    pub options: Vec<SelectOption>,
    #[serde(default)]
    pub format: Option<FormatSpec>,
    #[serde(default)]
    pub formula: Option<FormulaSpec>,
    #[serde(skip)]
    pub accessor: Option<ValueAccessor>,
    #[serde(skip)]
    pub renderer: Option<CellRenderer>,
}

impl ColumnConfig {
    pub fn new(id: impl Into<String>, title: impl Into<String>, column_type: ColumnType) -> Self {
        let id = id.into();
        Self {
            key: id.clone(),
            id,
            title: title.into(),
            column_type,
            width: None,
            min_width: None,
            max_width: None,
            sortable: true,
            searchable: true,
            editable: false,
            required: false,
            visible: true,
            locked: false,
            validation: None,
            options: Vec::new(),
            format: None,
            formula: None,
            accessor: None,
            renderer: None,
        }
    }

    pub fn text(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(id, title, ColumnType::Text)
    }

    pub fn number(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(id, title, ColumnType::Number)
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn width(mut self, width: f32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn width_bounds(mut self, min: Option<f32>, max: Option<f32>) -> Self {
        self.min_width = min;
        self.max_width = max;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn validation(mut self, validation: Validation) -> Self {
        self.validation = Some(validation);
        self
    }

    pub fn options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn format(mut self, format: FormatSpec) -> Self {
        self.format = Some(format);
        self
    }

    pub fn formula(mut self, expression: impl Into<String>, dependencies: &[&str]) -> Self {
        self.column_type = ColumnType::Formula;
        self.formula = Some(FormulaSpec {
            expression: expression.into(),
            dependencies: dependencies.iter().map(|d| d.to_string()).collect(),
        });
        self
    }

    pub fn accessor(mut self, f: impl Fn(&Row) -> Value + Send + Sync + 'static) -> Self {
        self.accessor = Some(ValueAccessor::new(f));
        self
    }

    pub fn renderer(mut self, f: impl Fn(&Value, &Row) -> String + Send + Sync + 'static) -> Self {
        self.renderer = Some(CellRenderer::new(f));
        self
    }

    /// Field name used to read and write the row. Falls back to the id.
    pub fn field(&self) -> &str {
        if self.key.is_empty() {
            &self.id
        } else {
            &self.key
        }
    }

    /// Resolve this column's cell value: custom accessor first, then the key.
    pub fn value(&self, row: &Row) -> Value {
        match &self.accessor {
            Some(accessor) => (accessor.0)(row),
            None => row.get(self.field()).clone(),
        }
    }

    /// Text from the custom renderer, if one is attached.
    pub fn render(&self, value: &Value, row: &Row) -> Option<String> {
        self.renderer.as_ref().map(|r| (r.0)(value, row))
    }

    /// Option whose value matches `value` (string comparison).
    pub fn option_for(&self, value: &Value) -> Option<&SelectOption> {
        let needle = value.to_plain_string();
        self.options
            .iter()
            .find(|opt| opt.value.to_plain_string() == needle)
    }

    /// Clamp a requested width to this column's bounds.
    pub fn clamp_width(&self, width: f32) -> f32 {
        let mut w = width;
        if let Some(min) = self.min_width {
            w = w.max(min);
        }
        if let Some(max) = self.max_width {
            w = w.min(max);
        }
        w
    }
}
