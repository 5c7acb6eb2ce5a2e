//! Export sinks, import parsing and file helpers.
//!
//! - [`export`] - serialize rows into an [`ExportFile`] in one of the [`ExportFormat`]s
//! - [`write_export_file`] - write an export without ever leaving a partial file
//! - [`import_text`] - parse, map and validate pasted or uploaded text

mod csv;
mod import;
mod json;
mod md;
mod sheet;

pub use csv::{detect_delimiter, escape_csv_field, parse_delimited, write_csv};
pub use import::{ImportIssue, ImportResult, import_text, map_headers};
pub use json::{json_records, to_json_value, write_json};
pub use md::write_markdown;
pub use sheet::{
    CellStyle, ColumnStatistics, Sheet, SheetCell, Workbook, build_workbook, column_statistics,
    is_color_dark, write_workbook,
};

use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use datagrid_engine::engine::{ColorRule, ColumnConfig, Row};

use crate::error::{DataGridError, Result};

/// Largest file the import path will read.
pub const MAX_IMPORT_FILE_BYTES: u64 = 1_048_576; // 1 MiB

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Markdown,
    /// JSON workbook with styled cells.
    Spreadsheet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Markdown => "md",
            ExportFormat::Spreadsheet => "sheet.json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv;charset=utf-8",
            ExportFormat::Json | ExportFormat::Spreadsheet => "application/json",
            ExportFormat::Markdown => "text/markdown;charset=utf-8",
        }
    }

    /// Format named by a file's extension. `.sheet.json` wins over `.json`.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".sheet.json") {
            return Ok(ExportFormat::Spreadsheet);
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => Self::parse(ext),
            None => Err(DataGridError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn parse(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "md" | "markdown" => Ok(ExportFormat::Markdown),
            "sheet" | "sheet.json" | "spreadsheet" | "xlsx" => Ok(ExportFormat::Spreadsheet),
            other => Err(DataGridError::UnsupportedFormat(other.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ExportOptions {
    /// File name without or with extension. Defaults to `export`.
    pub filename: Option<String>,
    pub include_headers: bool,
    pub delimiter: char,
    pub visible_columns_only: bool,
    pub selected_only: bool,
    pub include_styles: bool,
    pub include_statistics: bool,
    /// Prefix formula-looking CSV text with `'`. Guarded files no longer
    /// import back to the same text.
    pub formula_guard: bool,
    /// Markdown title line.
    pub title: Option<String>,
    /// Conditional colours for styled spreadsheet cells.
    pub color_rules: Vec<ColorRule>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            filename: None,
            include_headers: true,
            delimiter: ',',
            visible_columns_only: true,
            selected_only: false,
            include_styles: true,
            include_statistics: false,
            formula_guard: false,
            title: None,
            color_rules: Vec::new(),
        }
    }
}

/// A fully serialized export.
#[derive(Clone, Debug, PartialEq)]
pub struct ExportFile {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

fn unsafe_filename_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_-]+").expect("filename regex must compile"))
}

/// File name for an export: the requested stem made filesystem-safe plus the
/// format's extension.
pub fn export_filename(requested: Option<&str>, format: ExportFormat) -> String {
    let ext = format.extension();
    let stem = requested
        .map(|name| {
            let suffix = format!(".{}", ext);
            let cut = name.len().saturating_sub(suffix.len());
            let trimmed = match name.get(cut..) {
                Some(tail) if tail.eq_ignore_ascii_case(&suffix) => &name[..cut],
                _ => name,
            };
            unsafe_filename_chars()
                .replace_all(trimmed.trim(), "_")
                .trim_matches('_')
                .to_string()
        })
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "export".to_string());
    format!("{}.{}", stem, ext)
}

/// Serialize rows to the requested format.
///
/// Fails before producing any bytes when there is nothing to export column-wise.
pub fn export(
    rows: &[&Row],
    columns: &[&ColumnConfig],
    format: ExportFormat,
    options: &ExportOptions,
) -> Result<ExportFile> {
    if columns.is_empty() {
        return Err(DataGridError::NoColumns);
    }

    let text = match format {
        ExportFormat::Csv => write_csv(rows, columns, options),
        ExportFormat::Json => write_json(rows, columns)?,
        ExportFormat::Markdown => write_markdown(rows, columns, options.title.as_deref()),
        ExportFormat::Spreadsheet => write_workbook(rows, columns, options)?,
    };

    let file = ExportFile {
        filename: export_filename(options.filename.as_deref(), format),
        mime_type: format.mime_type().to_string(),
        bytes: text.into_bytes(),
    };
    log::debug!(
        "exported {} rows x {} columns as {} ({} bytes)",
        rows.len(),
        columns.len(),
        format,
        file.bytes.len()
    );
    Ok(file)
}

/// Write an export to `target`. A directory target receives the export's own
/// file name. The bytes go to a temporary sibling first and are renamed into
/// place, so a failed write never leaves a partial file behind.
pub fn write_export_file(file: &ExportFile, target: &Path) -> Result<PathBuf> {
    let path = if target.is_dir() {
        target.join(&file.filename)
    } else {
        target.to_path_buf()
    };

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);

    if let Err(e) = std::fs::write(&tmp, &file.bytes) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    log::debug!("wrote {}", path.display());
    Ok(path)
}

/// Read a text file for import, refusing anything over [`MAX_IMPORT_FILE_BYTES`].
pub fn read_import_file(path: &Path) -> Result<String> {
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_IMPORT_FILE_BYTES {
        return Err(DataGridError::Io(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!(
                "Refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_IMPORT_FILE_BYTES
            ),
        )));
    }
    Ok(std::fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Cleanup(PathBuf);

    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.0);
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("datagrid_storage_{}_{}", std::process::id(), name))
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ExportFormat::from_path(Path::new("out.csv")).unwrap(), ExportFormat::Csv);
        assert_eq!(ExportFormat::from_path(Path::new("a/b.JSON")).unwrap(), ExportFormat::Json);
        assert_eq!(
            ExportFormat::from_path(Path::new("report.sheet.json")).unwrap(),
            ExportFormat::Spreadsheet
        );
        assert!(matches!(
            ExportFormat::from_path(Path::new("report.pdf")),
            Err(DataGridError::UnsupportedFormat(_))
        ));
        assert!(ExportFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn test_export_filename() {
        assert_eq!(export_filename(None, ExportFormat::Csv), "export.csv");
        assert_eq!(export_filename(Some("Q3 report"), ExportFormat::Csv), "Q3_report.csv");
        assert_eq!(export_filename(Some("data.csv"), ExportFormat::Csv), "data.csv");
        assert_eq!(export_filename(Some("../../etc"), ExportFormat::Json), "etc.json");
        assert_eq!(export_filename(Some("  "), ExportFormat::Markdown), "export.md");
    }

    #[test]
    fn test_export_requires_columns() {
        let row = Row::new().with("a", 1);
        let result = export(&[&row], &[], ExportFormat::Csv, &ExportOptions::default());
        assert!(matches!(result, Err(DataGridError::NoColumns)));
    }

    #[test]
    fn test_export_csv_file() {
        let cols = vec![ColumnConfig::text("name", "Name")];
        let col_refs: Vec<&ColumnConfig> = cols.iter().collect();
        let row = Row::new().with("name", "John");
        let file = export(&[&row], &col_refs, ExportFormat::Csv, &ExportOptions::default()).unwrap();
        assert_eq!(file.filename, "export.csv");
        assert_eq!(file.mime_type, "text/csv;charset=utf-8");
        assert_eq!(file.bytes, b"Name\nJohn\n".to_vec());

        let empty = export(&[], &col_refs, ExportFormat::Json, &ExportOptions::default()).unwrap();
        assert_eq!(empty.bytes, b"[]".to_vec());
    }

    #[test]
    fn test_write_export_file_atomic() {
        let path = temp_path("out.csv");
        let _cleanup = Cleanup(path.clone());
        let file = ExportFile {
            filename: "export.csv".to_string(),
            mime_type: "text/csv".to_string(),
            bytes: b"a,b\n".to_vec(),
        };
        let written = write_export_file(&file, &path).unwrap();
        assert_eq!(written, path);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
        assert!(!path.with_file_name(format!(
            "{}.tmp",
            path.file_name().unwrap().to_string_lossy()
        ))
        .exists());
    }

    #[test]
    fn test_write_export_file_into_missing_dir_fails_cleanly() {
        let dir = temp_path("missing_dir");
        let target = dir.join("out.csv");
        let file = ExportFile {
            filename: "out.csv".to_string(),
            mime_type: "text/csv".to_string(),
            bytes: b"x".to_vec(),
        };
        assert!(write_export_file(&file, &target).is_err());
        assert!(!target.exists());
    }

    #[test]
    fn test_read_import_file_too_large() {
        let path = temp_path("big.csv");
        let _cleanup = Cleanup(path.clone());
        std::fs::write(&path, vec![b'a'; (MAX_IMPORT_FILE_BYTES + 1) as usize]).unwrap();
        let err = read_import_file(&path).unwrap_err();
        assert!(err.to_string().contains("too large"));
    }
}
