//! Markdown export functionality

use datagrid_engine::engine::{ColumnConfig, Row, format_cell_text};

/// Write rows as a markdown pipe table.
pub fn write_markdown(rows: &[&Row], columns: &[&ColumnConfig], title: Option<&str>) -> String {
    let mut out = String::new();

    if let Some(title) = title {
        out.push_str(&format!("# {}\n\n", escape_markdown(title)));
    }

    if rows.is_empty() && columns.is_empty() {
        out.push_str("*Empty table*\n");
        return out;
    }

    // Header
    out.push('|');
    for col in columns {
        out.push_str(&format!(" {} |", escape_markdown(&col.title)));
    }
    out.push('\n');

    // Separator
    out.push('|');
    for _ in columns {
        out.push_str("---|");
    }
    out.push('\n');

    for row in rows {
        out.push('|');
        for col in columns {
            let display = format_cell_text(col, &col.value(row));
            out.push_str(&format!(" {} |", escape_markdown(&display)));
        }
        out.push('\n');
    }

    out
}

/// Escape special markdown characters in cell content
fn escape_markdown(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ").replace('\r', "")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_table() {
        let cols = vec![
            ColumnConfig::text("name", "Name"),
            ColumnConfig::number("age", "Age"),
        ];
        let col_refs: Vec<&ColumnConfig> = cols.iter().collect();
        let row = Row::new().with("name", "a|b\nc").with("age", 3);
        let out = write_markdown(&[&row], &col_refs, Some("People"));
        assert_eq!(out, "# People\n\n| Name | Age |\n|---|---|\n| a\\|b c | 3 |\n");
    }

    #[test]
    fn test_markdown_empty() {
        assert_eq!(write_markdown(&[], &[], None), "*Empty table*\n");
    }
}
