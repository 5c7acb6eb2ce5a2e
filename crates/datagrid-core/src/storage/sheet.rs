//! Styled spreadsheet export.
//!
//! The workbook is a JSON document in the cell-map layout spreadsheet widgets
//! load directly: sheets keyed by id, cells keyed by row then column, each
//! cell carrying a value, a type code and an optional style.

use serde::Serialize;
use serde_json::Value as Json;
use std::collections::{BTreeMap, HashSet};

use datagrid_engine::engine::{
    CellColors, ColumnConfig, ColumnType, Row, Value, format_cell, parse_bool_token, resolve_row_colors,
};

use super::ExportOptions;
use super::json::to_json_value;
use crate::error::Result;

pub const CELL_STRING: u8 = 1;
pub const CELL_NUMBER: u8 = 2;
pub const CELL_BOOLEAN: u8 = 3;
pub const CELL_DATE: u8 = 4;

const ALIGN_LEFT: u8 = 1;
const ALIGN_CENTER: u8 = 2;
const ALIGN_RIGHT: u8 = 3;
const VALIGN_MIDDLE: u8 = 2;

const HEADER_BG: &str = "366092";
const ZEBRA_BG: &str = "F8F9FA";
const NEGATIVE_FG: &str = "DC3545";
const POSITIVE_FG: &str = "28A745";
const WHITE: &str = "FFFFFF";
const STATS_HEADER_BG: &str = "E9ECEF";

/// Rows sampled when sizing columns.
const WIDTH_SAMPLE_ROWS: usize = 100;
const CHAR_WIDTH: usize = 8;
const MIN_COLUMN_WIDTH: usize = 80;
const MAX_COLUMN_WIDTH: usize = 400;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Rgb {
    pub rgb: String,
}

impl Rgb {
    fn new(hex: &str) -> Self {
        Self {
            rgb: hex.trim_start_matches('#').to_uppercase(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CellStyle {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bg: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fc: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ff: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fs: Option<u8>,
    /// Bold.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bl: Option<u8>,
    /// Horizontal alignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ht: Option<u8>,
    /// Vertical alignment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vt: Option<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SheetCell {
    pub v: Json,
    pub t: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s: Option<CellStyle>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ColumnWidth {
    pub w: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Freeze {
    pub x_split: usize,
    pub y_split: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CellRange {
    pub start_row: usize,
    pub end_row: usize,
    pub start_column: usize,
    pub end_column: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AutoFilter {
    pub range: CellRange,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub id: String,
    pub name: String,
    pub cell_data: BTreeMap<usize, BTreeMap<usize, SheetCell>>,
    pub column_data: BTreeMap<usize, ColumnWidth>,
    pub row_count: usize,
    pub column_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freeze: Option<Freeze>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<AutoFilter>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workbook {
    pub id: String,
    pub name: String,
    pub sheet_order: Vec<String>,
    pub sheets: BTreeMap<String, Sheet>,
}

/// Perceived luminance below one half. Unparseable colours count as light.
pub fn is_color_dark(hex: &str) -> bool {
    let hex = hex.trim_start_matches('#');
    if hex.len() < 6 || !hex.is_char_boundary(6) {
        return false;
    }
    let channel = |range: std::ops::Range<usize>| u8::from_str_radix(&hex[range], 16).ok();
    match (channel(0..2), channel(2..4), channel(4..6)) {
        (Some(r), Some(g), Some(b)) => {
            let luminance = (0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64) / 255.0;
            luminance < 0.5
        }
        _ => false,
    }
}

fn header_style() -> CellStyle {
    CellStyle {
        bg: Some(Rgb::new(HEADER_BG)),
        fc: Some(Rgb::new(WHITE)),
        ff: Some("Arial".to_string()),
        fs: Some(12),
        bl: Some(1),
        ht: Some(ALIGN_CENTER),
        vt: Some(VALIGN_MIDDLE),
    }
}

/// Style for a data cell at sheet row `row` (header is row 0). Colour rule
/// results are laid over the type-based style.
fn cell_style(raw: &Value, typed: &Json, column: &ColumnConfig, row: usize, colors: &CellColors) -> CellStyle {
    let mut style = CellStyle {
        vt: Some(VALIGN_MIDDLE),
        ..CellStyle::default()
    };
    if row % 2 == 0 {
        style.bg = Some(Rgb::new(ZEBRA_BG));
    }

    match column.column_type {
        ColumnType::Number => {
            style.ht = Some(ALIGN_RIGHT);
            if let Some(n) = typed.as_f64() {
                if n < 0.0 {
                    style.fc = Some(Rgb::new(NEGATIVE_FG));
                } else if n > 1000.0 {
                    style.fc = Some(Rgb::new(POSITIVE_FG));
                }
            }
        }
        ColumnType::Boolean => {
            style.ht = Some(ALIGN_CENTER);
            match typed.as_bool() {
                Some(true) => {
                    style.fc = Some(Rgb::new(POSITIVE_FG));
                    style.bl = Some(1);
                }
                Some(false) => {
                    style.fc = Some(Rgb::new(NEGATIVE_FG));
                    style.bl = Some(1);
                }
                None => {}
            }
        }
        ColumnType::Select => {
            style.ht = Some(ALIGN_CENTER);
            if let Some(color) = column.option_for(raw).and_then(|o| o.color.as_deref()) {
                style.bg = Some(Rgb::new(color));
                if is_color_dark(color) {
                    style.fc = Some(Rgb::new(WHITE));
                }
            }
        }
        ColumnType::Date | ColumnType::DateTime => style.ht = Some(ALIGN_CENTER),
        _ => style.ht = Some(ALIGN_LEFT),
    }

    if let Some(bg) = &colors.background {
        style.bg = Some(Rgb::new(bg));
        if is_color_dark(bg) {
            style.fc = Some(Rgb::new(WHITE));
        } else if style.fc == Some(Rgb::new(WHITE)) {
            style.fc = None;
        }
    }
    if let Some(fc) = &colors.text {
        style.fc = Some(Rgb::new(fc));
    }
    style
}

/// Typed value and type code for a data cell.
fn typed_cell(raw: &Value, column: &ColumnConfig) -> (Json, u8) {
    let formatted = format_cell(column, raw);
    if formatted.is_blank() {
        return (Json::String(String::new()), CELL_STRING);
    }
    let has_transform = column.format.as_ref().is_some_and(|f| f.transform.is_some());
    match (column.column_type, &formatted) {
        (_, Value::Number(_)) => (to_json_value(&formatted), CELL_NUMBER),
        (ColumnType::Boolean, _) if !has_transform => {
            let flag = match raw {
                Value::Bool(b) => Some(*b),
                Value::Number(n) => Some(*n != 0.0),
                other => parse_bool_token(&other.to_plain_string()),
            };
            match flag {
                Some(b) => (Json::Bool(b), CELL_BOOLEAN),
                None => (to_json_value(&formatted), CELL_STRING),
            }
        }
        (_, Value::Bool(b)) => (Json::Bool(*b), CELL_BOOLEAN),
        (ColumnType::Date | ColumnType::DateTime, _) if !has_transform => {
            (to_json_value(&formatted), CELL_DATE)
        }
        _ => (to_json_value(&formatted), CELL_STRING),
    }
}

fn display_len(value: &Json) -> usize {
    match value {
        Json::String(s) => s.chars().count(),
        Json::Null => 0,
        other => other.to_string().chars().count(),
    }
}

fn data_sheet(rows: &[&Row], columns: &[&ColumnConfig], options: &ExportOptions) -> Sheet {
    let mut cell_data = BTreeMap::new();
    let mut widths: Vec<usize> = columns.iter().map(|c| c.title.chars().count()).collect();

    let header: BTreeMap<usize, SheetCell> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let cell = SheetCell {
                v: Json::String(c.title.clone()),
                t: CELL_STRING,
                s: options.include_styles.then(header_style),
            };
            (i, cell)
        })
        .collect();
    cell_data.insert(0, header);

    for (r, row) in rows.iter().enumerate() {
        let sheet_row = r + 1;
        let row_colors = (options.include_styles && !options.color_rules.is_empty())
            .then(|| resolve_row_colors(&options.color_rules, row, columns));
        let mut cells = BTreeMap::new();
        for (c, column) in columns.iter().enumerate() {
            let raw = column.value(row);
            let (v, t) = typed_cell(&raw, column);
            if r < WIDTH_SAMPLE_ROWS {
                widths[c] = widths[c].max(display_len(&v));
            }
            let s = options.include_styles.then(|| {
                let colors = row_colors
                    .as_ref()
                    .map(|rc| rc.cell(&column.id))
                    .unwrap_or_default();
                cell_style(&raw, &v, column, sheet_row, &colors)
            });
            cells.insert(c, SheetCell { v, t, s });
        }
        cell_data.insert(sheet_row, cells);
    }

    let column_data = widths
        .iter()
        .enumerate()
        .map(|(i, len)| {
            let w = (len * CHAR_WIDTH).clamp(MIN_COLUMN_WIDTH, MAX_COLUMN_WIDTH);
            (i, ColumnWidth { w })
        })
        .collect();

    Sheet {
        id: "sheet1".to_string(),
        name: "Data".to_string(),
        cell_data,
        column_data,
        row_count: rows.len() + 1,
        column_count: columns.len(),
        freeze: Some(Freeze {
            x_split: 0,
            y_split: 1,
        }),
        filter: (!columns.is_empty()).then(|| AutoFilter {
            range: CellRange {
                start_row: 0,
                end_row: rows.len(),
                start_column: 0,
                end_column: columns.len() - 1,
            },
        }),
    }
}

/// Per-column summary: type, totals, distinct and empty counts, numeric range.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnStatistics {
    pub title: String,
    pub column_type: ColumnType,
    pub total: usize,
    pub unique: usize,
    pub empty: usize,
    /// (min, max, average) over numeric cells of number columns.
    pub numeric: Option<(f64, f64, f64)>,
}

impl ColumnStatistics {
    pub fn details(&self) -> String {
        match self.numeric {
            Some((min, max, avg)) => format!(
                "Min: {}, Max: {}, Avg: {:.2}",
                datagrid_engine::engine::format_plain_number(min),
                datagrid_engine::engine::format_plain_number(max),
                avg
            ),
            None => String::new(),
        }
    }
}

pub fn column_statistics(rows: &[&Row], columns: &[&ColumnConfig]) -> Vec<ColumnStatistics> {
    columns
        .iter()
        .map(|column| {
            let raws: Vec<Value> = rows.iter().map(|r| column.value(r)).collect();
            let present: Vec<&Value> = raws.iter().filter(|v| !v.is_blank()).collect();
            let unique: HashSet<String> = present.iter().map(|v| v.to_plain_string()).collect();

            let numeric = if column.column_type == ColumnType::Number {
                let numbers: Vec<f64> = present.iter().filter_map(|v| v.as_number()).collect();
                if numbers.is_empty() {
                    None
                } else {
                    let min = numbers.iter().copied().fold(f64::INFINITY, f64::min);
                    let max = numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                    let avg = numbers.iter().sum::<f64>() / numbers.len() as f64;
                    Some((min, max, avg))
                }
            } else {
                None
            };

            ColumnStatistics {
                title: column.title.clone(),
                column_type: column.column_type,
                total: rows.len(),
                unique: unique.len(),
                empty: rows.len() - present.len(),
                numeric,
            }
        })
        .collect()
}

fn statistics_sheet(rows: &[&Row], columns: &[&ColumnConfig]) -> Sheet {
    let title_style = CellStyle {
        ff: Some("Arial".to_string()),
        fs: Some(14),
        bl: Some(1),
        fc: Some(Rgb::new(HEADER_BG)),
        ht: Some(ALIGN_CENTER),
        ..CellStyle::default()
    };
    let head_style = CellStyle {
        bl: Some(1),
        bg: Some(Rgb::new(STATS_HEADER_BG)),
        ht: Some(ALIGN_CENTER),
        ..CellStyle::default()
    };

    let text = |s: &str, style: Option<&CellStyle>| SheetCell {
        v: Json::String(s.to_string()),
        t: CELL_STRING,
        s: style.cloned(),
    };
    let number = |n: usize| SheetCell {
        v: Json::from(n),
        t: CELL_NUMBER,
        s: None,
    };

    let mut cell_data = BTreeMap::new();
    cell_data.insert(0, BTreeMap::from([(0, text("Data statistics", Some(&title_style)))]));
    let headers = ["Column", "Type", "Total rows", "Unique values", "Empty values", "Details"];
    cell_data.insert(
        1,
        headers
            .iter()
            .enumerate()
            .map(|(i, h)| (i, text(h, Some(&head_style))))
            .collect(),
    );

    let stats = column_statistics(rows, columns);
    for (i, stat) in stats.iter().enumerate() {
        let cells = BTreeMap::from([
            (0, text(&stat.title, None)),
            (1, text(stat.column_type.as_str(), None)),
            (2, number(stat.total)),
            (3, number(stat.unique)),
            (4, number(stat.empty)),
            (5, text(&stat.details(), None)),
        ]);
        cell_data.insert(i + 2, cells);
    }

    let column_data = [160, 80, 96, 120, 96, 240]
        .into_iter()
        .enumerate()
        .map(|(i, w)| (i, ColumnWidth { w }))
        .collect();

    Sheet {
        id: "stats".to_string(),
        name: "Statistics".to_string(),
        cell_data,
        column_data,
        row_count: stats.len() + 2,
        column_count: headers.len(),
        freeze: None,
        filter: None,
    }
}

pub fn build_workbook(rows: &[&Row], columns: &[&ColumnConfig], options: &ExportOptions) -> Workbook {
    let mut sheets = BTreeMap::new();
    let mut sheet_order = Vec::new();

    let data = data_sheet(rows, columns, options);
    sheet_order.push(data.id.clone());
    sheets.insert(data.id.clone(), data);

    if options.include_statistics {
        let stats = statistics_sheet(rows, columns);
        sheet_order.push(stats.id.clone());
        sheets.insert(stats.id.clone(), stats);
    }

    Workbook {
        id: "workbook1".to_string(),
        name: "Export".to_string(),
        sheet_order,
        sheets,
    }
}

pub fn write_workbook(rows: &[&Row], columns: &[&ColumnConfig], options: &ExportOptions) -> Result<String> {
    Ok(serde_json::to_string_pretty(&build_workbook(rows, columns, options))?)
}
