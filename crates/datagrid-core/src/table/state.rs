use std::sync::Arc;

use datagrid_engine::engine::{ColorRule, ColumnConfig, ColumnRegistry, FilterSet, Row, RowKey, SortSpec};

use super::snapshot::{SnapshotListener, SubscriptionId, TableSnapshot};
use crate::error::{DataGridError, Result};
use crate::formula::FormulaEvaluator;
use crate::pagination::{PaginationConfig, PaginationState};
use crate::selection::SelectionState;
use crate::settings::{SettingsListener, TableSettings};
use crate::virtualization::{Virtualizer, VirtualizerConfig};

/// Table-level switches. A disabled feature ignores its actions.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Features {
    pub sortable: bool,
    pub searchable: bool,
    pub filterable: bool,
    pub selectable: bool,
}

impl Default for Features {
    fn default() -> Self {
        Self {
            sortable: true,
            searchable: true,
            filterable: true,
            selectable: true,
        }
    }
}

/// Everything needed to build a [`DataTable`].
#[derive(Clone, Debug)]
pub struct TableConfig {
    pub key_field: String,
    pub columns: Vec<ColumnConfig>,
    /// `None` renders every processed row through the virtualizer instead.
    pub pagination: Option<PaginationConfig>,
    pub virtualizer: VirtualizerConfig,
    pub features: Features,
    pub settings: TableSettings,
}

impl TableConfig {
    pub fn new(key_field: impl Into<String>, columns: Vec<ColumnConfig>) -> Self {
        Self {
            key_field: key_field.into(),
            columns,
            pagination: Some(PaginationConfig::default()),
            virtualizer: VirtualizerConfig::default(),
            features: Features::default(),
            settings: TableSettings::default(),
        }
    }

    pub fn pagination(mut self, pagination: Option<PaginationConfig>) -> Self {
        self.pagination = pagination;
        self
    }

    pub fn virtualizer(mut self, virtualizer: VirtualizerConfig) -> Self {
        self.virtualizer = virtualizer;
        self
    }

    pub fn sortable(mut self, sortable: bool) -> Self {
        self.features.sortable = sortable;
        self
    }

    pub fn searchable(mut self, searchable: bool) -> Self {
        self.features.searchable = searchable;
        self
    }

    pub fn filterable(mut self, filterable: bool) -> Self {
        self.features.filterable = filterable;
        self
    }

    pub fn selectable(mut self, selectable: bool) -> Self {
        self.features.selectable = selectable;
        self
    }

    pub fn settings(mut self, settings: TableSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Headless data table: owns the rows and all view state, and recomputes
/// the processed view lazily after each action.
pub struct DataTable {
    pub(crate) key_field: String,
    pub(crate) registry: ColumnRegistry,
    pub(crate) features: Features,
    pub(crate) rows: Vec<Row>,

    pub(crate) search: String,
    pub(crate) filters: FilterSet,
    pub(crate) sort: SortSpec,
    pub(crate) color_rules: Vec<ColorRule>,
    pub(crate) selection: SelectionState,
    pub(crate) pagination_config: Option<PaginationConfig>,
    pub(crate) pagination: PaginationState,
    pub(crate) virtualizer: Virtualizer,
    pub(crate) settings: TableSettings,

    pub(crate) settings_listener: Option<SettingsListener>,
    pub(crate) warned_no_listener: bool,
    pub(crate) formula_evaluator: Option<Box<dyn FormulaEvaluator>>,
    pub(crate) subscribers: Vec<(SubscriptionId, SnapshotListener)>,
    pub(crate) next_subscription: usize,

    /// Filtered, sorted rows with formula columns filled in.
    pub(crate) processed: Arc<Vec<Row>>,
    pub(crate) processed_keys: Vec<RowKey>,
    pub(crate) dirty: bool,
    pub(crate) snapshot: Option<Arc<TableSnapshot>>,
}

impl DataTable {
    /// Build a table. Fails when the column schema is invalid.
    pub fn new(config: TableConfig) -> Result<Self> {
        let registry = ColumnRegistry::new(config.columns)?;
        let settings = config.settings;

        let page_size = settings
            .page_size
            .or(config.pagination.as_ref().map(|p| p.page_size))
            .unwrap_or(crate::pagination::DEFAULT_PAGE_SIZE);

        let mut sort = settings.sort.clone().unwrap_or_default();
        sort.retain_columns(|id| registry.contains(id));

        let table = DataTable {
            key_field: config.key_field,
            registry,
            features: config.features,
            rows: Vec::new(),
            search: String::new(),
            filters: settings.filters.clone().unwrap_or_default(),
            sort,
            color_rules: settings.color_rules.clone(),
            selection: SelectionState::new(),
            pagination_config: config.pagination,
            pagination: PaginationState::new(page_size),
            virtualizer: Virtualizer::new(config.virtualizer),
            settings,
            settings_listener: None,
            warned_no_listener: false,
            formula_evaluator: None,
            subscribers: Vec::new(),
            next_subscription: 0,
            processed: Arc::new(Vec::new()),
            processed_keys: Vec::new(),
            dirty: true,
            snapshot: None,
        };
        log::debug!(
            "table created: key field {}, {} columns, {}",
            table.key_field,
            table.registry.len(),
            if table.pagination_config.is_some() { "paginated" } else { "virtualized" }
        );
        Ok(table)
    }

    /// Build a table and load its rows.
    pub fn with_data(config: TableConfig, rows: Vec<Row>) -> Result<Self> {
        let mut table = Self::new(config)?;
        table.set_data(rows)?;
        Ok(table)
    }

    /// Register the callback that receives settings after every change.
    pub fn on_settings_change(&mut self, listener: SettingsListener) {
        self.settings_listener = Some(listener);
    }

    /// Install an evaluator for formula columns.
    pub fn set_formula_evaluator(&mut self, evaluator: Box<dyn FormulaEvaluator>) {
        self.formula_evaluator = Some(evaluator);
        self.invalidate();
    }

    pub fn key_field(&self) -> &str {
        &self.key_field
    }

    pub fn registry(&self) -> &ColumnRegistry {
        &self.registry
    }

    pub fn features(&self) -> Features {
        self.features
    }

    /// Raw rows as loaded.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn search_term(&self) -> &str {
        &self.search
    }

    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    pub fn sort(&self) -> &SortSpec {
        &self.sort
    }

    pub fn color_rules(&self) -> &[ColorRule] {
        &self.color_rules
    }

    pub fn selection(&self) -> &SelectionState {
        &self.selection
    }

    pub fn settings(&self) -> &TableSettings {
        &self.settings
    }

    pub fn is_paginated(&self) -> bool {
        self.pagination_config.is_some()
    }

    pub fn pagination_config(&self) -> Option<&PaginationConfig> {
        self.pagination_config.as_ref()
    }

    /// Check that every row has a unique, non-null key.
    pub(crate) fn validate_keys(rows: &[Row], key_field: &str) -> Result<()> {
        let mut seen = std::collections::HashSet::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            let Some(key) = row.key(key_field) else {
                return Err(DataGridError::MissingRowKey {
                    index,
                    key_field: key_field.to_string(),
                });
            };
            if !seen.insert(key.clone()) {
                return Err(DataGridError::DuplicateRowKey(key.0));
            }
        }
        Ok(())
    }

    /// Mark the processed view stale.
    pub(crate) fn invalidate(&mut self) {
        self.dirty = true;
        self.snapshot = None;
    }

    /// Mark only the snapshot stale (view state changed, data did not).
    pub(crate) fn touch(&mut self) {
        self.snapshot = None;
    }
}
