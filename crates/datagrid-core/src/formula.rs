//! Formula column evaluation seam.
//!
//! The table validates formula declarations but does not interpret
//! expressions. A host that wants computed cells injects a
//! [`FormulaEvaluator`]; results are written into the processed rows after
//! filtering and sorting, dependencies first.

use std::collections::HashSet;

use datagrid_engine::engine::{ColumnConfig, ColumnRegistry, FormulaSpec, Row, Value};

/// Everything an evaluator may read for one cell.
pub struct FormulaContext<'a> {
    /// Processed rows, with earlier formula columns already filled in.
    pub rows: &'a [Row],
    pub index: usize,
    pub registry: &'a ColumnRegistry,
}

impl FormulaContext<'_> {
    pub fn row(&self) -> &Row {
        &self.rows[self.index]
    }

    /// Value of another column in the current row.
    pub fn value(&self, column_id: &str) -> Value {
        match self.registry.get(column_id) {
            Some(column) => column.value(self.row()),
            None => Value::Null,
        }
    }
}

pub trait FormulaEvaluator {
    fn evaluate(&self, column: &ColumnConfig, formula: &FormulaSpec, ctx: &FormulaContext<'_>) -> Value;
}

impl<F> FormulaEvaluator for F
where
    F: Fn(&ColumnConfig, &FormulaSpec, &FormulaContext<'_>) -> Value,
{
    fn evaluate(&self, column: &ColumnConfig, formula: &FormulaSpec, ctx: &FormulaContext<'_>) -> Value {
        self(column, formula, ctx)
    }
}

/// Formula columns ordered so every column comes after the formula columns it
/// depends on. The registry has already rejected cycles.
pub fn evaluation_order(registry: &ColumnRegistry) -> Vec<&ColumnConfig> {
    fn visit<'a>(
        column: &'a ColumnConfig,
        registry: &'a ColumnRegistry,
        done: &mut HashSet<String>,
        out: &mut Vec<&'a ColumnConfig>,
    ) {
        if !done.insert(column.id.clone()) {
            return;
        }
        if let Some(formula) = &column.formula {
            for dep in &formula.dependencies {
                if let Some(dep_col) = registry.get(dep).filter(|c| c.formula.is_some()) {
                    visit(dep_col, registry, done, out);
                }
            }
        }
        out.push(column);
    }

    let mut done = HashSet::new();
    let mut out = Vec::new();
    for column in registry.formula_columns() {
        visit(column, registry, &mut done, &mut out);
    }
    out
}

/// Compute every formula column over `rows` in place.
pub fn apply_formulas(rows: &mut [Row], registry: &ColumnRegistry, evaluator: &dyn FormulaEvaluator) {
    for column in evaluation_order(registry) {
        let Some(formula) = &column.formula else {
            continue;
        };
        let view: &[Row] = rows;
        let values: Vec<Value> = (0..view.len())
            .map(|index| {
                let ctx = FormulaContext {
                    rows: view,
                    index,
                    registry,
                };
                evaluator.evaluate(column, formula, &ctx)
            })
            .collect();
        for (row, value) in rows.iter_mut().zip(values) {
            row.set(column.field(), value);
        }
    }
}
