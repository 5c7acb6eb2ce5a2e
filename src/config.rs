//! Table definitions loaded from TOML.
//!
//! ```toml
//! [table]
//! id = "people"
//! key_field = "id"
//! page_size = 25
//!
//! [[columns]]
//! id = "age"
//! title = "Age"
//! type = "number"
//!
//! [[color_rules]]
//! id = "senior"
//! column = "age"
//! condition = "greater"
//! value = 60
//! background = "#fde68a"
//! ```
//!
//! Without a definition file, [`TableDefinition::from_headers`] turns every
//! CSV header into a text column keyed by the first one.

use serde::Deserialize;
use std::path::Path;

use datagrid_core::pagination::{DEFAULT_PAGE_SIZE, DEFAULT_PAGE_SIZE_OPTIONS};
use datagrid_core::virtualization::{DEFAULT_OVERSCAN, DEFAULT_ROW_HEIGHT, DEFAULT_THRESHOLD};
use datagrid_core::{
    ColorRule, ColumnConfig, Features, PaginationConfig, TableConfig, TableSettings,
    VirtualizerConfig,
};

use crate::error::{AppError, Result};

pub const MAX_TABLE_FILE_BYTES: u64 = 1_048_576; // 1 MiB

/// Table id used when a definition does not name one.
pub const DEFAULT_TABLE_ID: &str = "default";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableFile {
    table: TableSection,
    virtualizer: Option<VirtualizerSection>,
    #[serde(default)]
    columns: Vec<ColumnConfig>,
    #[serde(default)]
    color_rules: Vec<ColorRule>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TableSection {
    id: Option<String>,
    key_field: String,
    pagination: Option<bool>,
    page_size: Option<usize>,
    page_size_options: Option<Vec<usize>>,
    sortable: Option<bool>,
    searchable: Option<bool>,
    filterable: Option<bool>,
    selectable: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct VirtualizerSection {
    threshold: Option<usize>,
    estimated_row_height: Option<f64>,
    overscan: Option<usize>,
    force: Option<bool>,
}

/// A parsed table definition, ready to become a [`TableConfig`].
#[derive(Clone, Debug)]
pub struct TableDefinition {
    pub id: String,
    pub key_field: String,
    pub columns: Vec<ColumnConfig>,
    pub pagination: Option<PaginationConfig>,
    pub virtualizer: VirtualizerConfig,
    pub features: Features,
    /// Default colour rules. Saved settings carrying rules replace them.
    pub color_rules: Vec<ColorRule>,
}

impl TableDefinition {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self> {
        let file: TableFile = toml::from_str(content).map_err(|e| AppError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_file(file)
    }

    fn from_file(file: TableFile) -> Result<Self> {
        let TableFile {
            table,
            virtualizer,
            columns,
            color_rules,
        } = file;

        if columns.is_empty() {
            return Err(AppError::NoColumns);
        }
        let key_field = table.key_field.trim().to_string();
        if !columns.iter().any(|c| c.field() == key_field) {
            return Err(AppError::UnknownKeyField(key_field));
        }

        let pagination = table.pagination.unwrap_or(true).then(|| PaginationConfig {
            page_size: table.page_size.filter(|&n| n > 0).unwrap_or(DEFAULT_PAGE_SIZE),
            page_size_options: table
                .page_size_options
                .unwrap_or_else(|| DEFAULT_PAGE_SIZE_OPTIONS.to_vec()),
        });

        let virtualizer = match virtualizer {
            Some(v) => VirtualizerConfig {
                threshold: v.threshold.unwrap_or(DEFAULT_THRESHOLD),
                estimated_row_height: v.estimated_row_height.unwrap_or(DEFAULT_ROW_HEIGHT),
                overscan: v.overscan.unwrap_or(DEFAULT_OVERSCAN),
                force: v.force.unwrap_or(false),
            },
            None => VirtualizerConfig::default(),
        };

        let features = Features {
            sortable: table.sortable.unwrap_or(true),
            searchable: table.searchable.unwrap_or(true),
            filterable: table.filterable.unwrap_or(true),
            selectable: table.selectable.unwrap_or(true),
        };

        Ok(Self {
            id: table
                .id
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_TABLE_ID.to_string()),
            key_field,
            columns,
            pagination,
            virtualizer,
            features,
            color_rules,
        })
    }

    /// Text columns named after the headers, keyed by the first header.
    pub fn from_headers(headers: &[String]) -> Result<Self> {
        let mut columns: Vec<ColumnConfig> = Vec::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let title = header.trim();
            let id = if title.is_empty() {
                format!("column_{}", i + 1)
            } else {
                title.to_string()
            };
            let title = if title.is_empty() { id.as_str() } else { title };
            columns.push(ColumnConfig::text(id.clone(), title));
        }
        let key_field = columns
            .first()
            .map(|c| c.id.clone())
            .ok_or(AppError::NoColumns)?;

        Ok(Self {
            id: DEFAULT_TABLE_ID.to_string(),
            key_field,
            columns,
            pagination: Some(PaginationConfig::default()),
            virtualizer: VirtualizerConfig::default(),
            features: Features::default(),
            color_rules: Vec::new(),
        })
    }

    pub fn to_config(&self, mut settings: TableSettings) -> TableConfig {
        if settings.color_rules.is_empty() {
            settings.color_rules = self.color_rules.clone();
        }
        let mut config = TableConfig::new(self.key_field.clone(), self.columns.clone())
            .pagination(self.pagination.clone())
            .virtualizer(self.virtualizer.clone())
            .settings(settings);
        config.features = self.features;
        config
    }
}

/// Read a table definition, refusing files over [`MAX_TABLE_FILE_BYTES`].
pub fn load_table_definition(path: &Path) -> Result<TableDefinition> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_TABLE_FILE_BYTES {
        return Err(AppError::TooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            max: MAX_TABLE_FILE_BYTES,
        });
    }
    let content = std::fs::read_to_string(path)?;
    let definition = TableDefinition::from_toml_str(&content, path)?;
    log::debug!(
        "loaded table definition {} ({} columns) from {}",
        definition.id,
        definition.columns.len(),
        path.display()
    );
    Ok(definition)
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagrid_core::ColumnType;

    const PEOPLE: &str = r##"
[table]
id = "people"
key_field = "id"
page_size = 25
sortable = false

[[columns]]
id = "id"
title = "Id"
type = "number"
visible = false

[[columns]]
id = "name"
title = "Name"
required = true

[[columns]]
id = "status"
title = "Status"
type = "select"
options = [
  { value = "active", label = "Active", color = "#16a34a" },
  { value = "inactive", label = "Inactive" },
]

[[color_rules]]
id = "inactive"
column = "status"
condition = "equals"
value = "inactive"
background = "#e5e7eb"
apply_to = "row"
"##;

    fn parse(content: &str) -> Result<TableDefinition> {
        TableDefinition::from_toml_str(content, Path::new("table.toml"))
    }

    #[test]
    fn test_parse_table_definition() {
        let def = parse(PEOPLE).unwrap();
        assert_eq!(def.id, "people");
        assert_eq!(def.key_field, "id");
        assert_eq!(def.columns.len(), 3);
        assert_eq!(def.columns[0].column_type, ColumnType::Number);
        assert!(!def.columns[0].visible);
        assert!(def.columns[1].required);
        assert_eq!(def.columns[2].options.len(), 2);
        assert_eq!(def.pagination.as_ref().unwrap().page_size, 25);
        assert!(!def.features.sortable);
        assert!(def.features.searchable);
    }

    #[test]
    fn test_virtualizer_section_replaces_pagination() {
        let def = parse(
            r#"
[table]
key_field = "id"
pagination = false

[virtualizer]
threshold = 10
force = true

[[columns]]
id = "id"
title = "Id"
"#,
        )
        .unwrap();
        assert_eq!(def.id, DEFAULT_TABLE_ID);
        assert!(def.pagination.is_none());
        assert_eq!(def.virtualizer.threshold, 10);
        assert_eq!(def.virtualizer.estimated_row_height, DEFAULT_ROW_HEIGHT);
        assert!(def.virtualizer.force);
    }

    #[test]
    fn test_rejects_unknown_fields_and_bad_key() {
        let unknown = parse("[table]\nkey_field = \"id\"\nsorted = true\n");
        assert!(matches!(unknown, Err(AppError::Parse { .. })));

        let no_columns = parse("[table]\nkey_field = \"id\"\n");
        assert!(matches!(no_columns, Err(AppError::NoColumns)));

        let bad_key = parse("[table]\nkey_field = \"nope\"\n\n[[columns]]\nid = \"id\"\ntitle = \"Id\"\n");
        assert!(matches!(bad_key, Err(AppError::UnknownKeyField(k)) if k == "nope"));
    }

    #[test]
    fn test_from_headers() {
        let headers = vec!["Name".to_string(), " Age ".to_string(), "".to_string()];
        let def = TableDefinition::from_headers(&headers).unwrap();
        let ids: Vec<&str> = def.columns.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["Name", "Age", "column_3"]);
        assert_eq!(def.key_field, "Name");
        assert!(def.columns.iter().all(|c| c.column_type == ColumnType::Text));
        assert!(TableDefinition::from_headers(&[]).is_err());
    }

    #[test]
    fn test_to_config_builds_table() {
        let def = parse(PEOPLE).unwrap();
        let config = def.to_config(TableSettings::default());
        let table = datagrid_core::DataTable::new(config).unwrap();
        assert_eq!(table.key_field(), "id");
        assert!(!table.features().sortable);
        assert_eq!(table.pagination_config().unwrap().page_size, 25);
        assert_eq!(table.color_rules().len(), 1);
        assert_eq!(table.color_rules()[0].apply_to, datagrid_core::ColorTarget::Row);
    }

    #[test]
    fn test_saved_color_rules_replace_defaults() {
        let def = parse(PEOPLE).unwrap();
        let mut settings = TableSettings::default();
        settings.color_rules.push(
            ColorRule::new("mine", "name", datagrid_core::ColorCondition::NotEmpty, "")
                .with_text_color("#1d4ed8"),
        );
        let table = datagrid_core::DataTable::new(def.to_config(settings)).unwrap();
        let ids: Vec<&str> = table.color_rules().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["mine"]);
    }

    #[test]
    fn test_load_rejects_oversized_file() {
        let path = std::env::temp_dir().join("datagrid_table_large.toml");
        let oversized = "a".repeat(MAX_TABLE_FILE_BYTES as usize + 1);
        std::fs::write(&path, oversized).expect("write oversized table");

        let result = load_table_definition(&path);
        assert!(matches!(result, Err(AppError::TooLarge { .. })));

        let _ = std::fs::remove_file(&path);
    }
}
