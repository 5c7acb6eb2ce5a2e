//! Column registry: the authoritative column schema of a table.

use std::collections::HashMap;

use super::cycle::detect_cycle;
use super::{ColumnConfig, ColumnType};
use crate::error::{Result, SchemaError};

/// Holds column definitions in declaration order with id lookup.
#[derive(Clone, Debug, Default)]
pub struct ColumnRegistry {
    columns: Vec<ColumnConfig>,
    index: HashMap<String, usize>,
}

impl ColumnRegistry {
    /// Build a registry, rejecting duplicate ids and broken formula declarations.
    pub fn new(columns: Vec<ColumnConfig>) -> Result<Self> {
        let mut index = HashMap::with_capacity(columns.len());
        for (i, col) in columns.iter().enumerate() {
            if index.insert(col.id.clone(), i).is_some() {
                return Err(SchemaError::DuplicateColumn(col.id.clone()));
            }
        }

        let mut deps: HashMap<String, Vec<String>> = HashMap::new();
        for col in &columns {
            let Some(formula) = &col.formula else {
                continue;
            };
            for dep in &formula.dependencies {
                if !index.contains_key(dep) {
                    return Err(SchemaError::UnknownDependency {
                        column: col.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }
            deps.insert(col.id.clone(), formula.dependencies.clone());
        }

        for col in &columns {
            if let Some(path) = detect_cycle(&col.id, &deps) {
                return Err(SchemaError::CircularDependency(path));
            }
        }

        Ok(Self { columns, index })
    }

    pub fn get(&self, id: &str) -> Option<&ColumnConfig> {
        self.index.get(id).map(|&i| &self.columns[i])
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColumnConfig> {
        self.columns.iter()
    }

    pub fn columns(&self) -> &[ColumnConfig] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Formula columns, in declaration order.
    pub fn formula_columns(&self) -> impl Iterator<Item = &ColumnConfig> {
        self.columns
            .iter()
            .filter(|c| c.column_type == ColumnType::Formula && c.formula.is_some())
    }
}
