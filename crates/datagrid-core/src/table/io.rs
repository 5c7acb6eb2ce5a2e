use std::path::{Path, PathBuf};

use datagrid_engine::engine::{ColumnConfig, Row};

use super::DataTable;
use crate::clipboard::ClipboardProvider;
use crate::error::{DataGridError, Result};
use crate::settings::ordered_columns;
use crate::storage::{
    ExportFile, ExportFormat, ExportOptions, ImportResult, export, import_text, read_import_file,
    write_csv, write_export_file,
};

impl DataTable {
    /// Columns an export covers, in display order.
    pub fn export_columns(&self, visible_only: bool) -> Vec<&ColumnConfig> {
        if visible_only {
            self.visible_columns()
        } else {
            ordered_columns(&self.registry, &self.settings)
        }
    }

    /// Processed rows, optionally narrowed to the selection.
    fn export_rows(&mut self, selected_only: bool) -> Vec<Row> {
        self.ensure_processed();
        self.processed
            .iter()
            .filter(|row| {
                !selected_only
                    || row
                        .key(&self.key_field)
                        .is_some_and(|k| self.selection.is_selected(&k))
            })
            .cloned()
            .collect()
    }

    /// Serialize the processed rows. Nothing is produced on failure.
    ///
    /// Styled exports use the table's colour rules unless the options carry
    /// their own.
    pub fn export(&mut self, format: ExportFormat, options: &ExportOptions) -> Result<ExportFile> {
        let rows = self.export_rows(options.selected_only);
        let row_refs: Vec<&Row> = rows.iter().collect();
        let columns = self.export_columns(options.visible_columns_only);
        if options.include_styles && options.color_rules.is_empty() && !self.color_rules.is_empty() {
            let options = ExportOptions {
                color_rules: self.color_rules.clone(),
                ..options.clone()
            };
            return export(&row_refs, &columns, format, &options);
        }
        export(&row_refs, &columns, format, options)
    }

    /// Export to a file, choosing the format from its extension. A directory
    /// target receives the export's default file name.
    pub fn export_to_path(
        &mut self,
        target: &Path,
        format: Option<ExportFormat>,
        options: &ExportOptions,
    ) -> Result<PathBuf> {
        let format = match format {
            Some(format) => format,
            None => ExportFormat::from_path(target)?,
        };
        let file = self.export(format, options)?;
        write_export_file(&file, target)
    }

    /// Validate tabular text against this table's columns.
    ///
    /// The table is left untouched; callers decide what to do with the rows.
    pub fn import_text(&self, text: &str) -> ImportResult {
        let columns: Vec<&ColumnConfig> = self.registry.iter().collect();
        import_text(text, &columns)
    }

    pub fn import_file(&self, path: &Path) -> Result<ImportResult> {
        let text = read_import_file(path)?;
        Ok(self.import_text(&text))
    }

    /// Copy processed rows as tab-separated text with a header row.
    /// Returns the number of rows copied.
    pub fn copy_to_clipboard(
        &mut self,
        clipboard: &mut dyn ClipboardProvider,
        selected_only: bool,
    ) -> Result<usize> {
        let rows = self.export_rows(selected_only);
        let row_refs: Vec<&Row> = rows.iter().collect();
        let columns = self.visible_columns();
        if columns.is_empty() {
            return Err(DataGridError::NoColumns);
        }
        let options = ExportOptions {
            delimiter: '\t',
            formula_guard: false,
            ..ExportOptions::default()
        };
        let text = write_csv(&row_refs, &columns, &options);
        if !clipboard.set_text(text) {
            return Err(DataGridError::Clipboard("clipboard write was refused".to_string()));
        }
        log::debug!("copied {} rows to clipboard", rows.len());
        Ok(rows.len())
    }

    /// Read the clipboard and run it through the import pipeline.
    pub fn paste_from_clipboard(&self, clipboard: &mut dyn ClipboardProvider) -> Result<ImportResult> {
        let text = clipboard
            .get_text()
            .ok_or_else(|| DataGridError::Clipboard("clipboard is empty".to_string()))?;
        Ok(self.import_text(&text))
    }
}
