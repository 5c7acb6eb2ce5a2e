//! Delimited text export and parsing.

use datagrid_engine::engine::{ColumnConfig, Row, Value, format_cell};

use super::ExportOptions;

/// Write rows as delimited text. Every record ends with a newline.
pub fn write_csv(rows: &[&Row], columns: &[&ColumnConfig], options: &ExportOptions) -> String {
    let delimiter = options.delimiter;
    let mut out = String::new();

    if options.include_headers {
        let header: Vec<String> = columns
            .iter()
            .map(|c| escape_csv_field(&c.title, delimiter, options.formula_guard))
            .collect();
        out.push_str(&header.join(&delimiter.to_string()));
        out.push('\n');
    }

    for row in rows {
        let fields: Vec<String> = columns
            .iter()
            .map(|c| {
                let cell = format_cell(c, &c.value(row));
                // Numbers are data, not formulas, even when they start with '-'.
                let guard = options.formula_guard
                    && matches!(&cell, Value::Text(s) if s.trim().parse::<f64>().is_err());
                let text = match cell {
                    Value::Bool(b) => if b { "Yes" } else { "No" }.to_string(),
                    other => other.to_plain_string(),
                };
                escape_csv_field(&text, delimiter, guard)
            })
            .collect();
        out.push_str(&fields.join(&delimiter.to_string()));
        out.push('\n');
    }

    out
}

/// Escape a field for delimited output.
///
/// Fields holding the delimiter, quotes or line breaks are quoted, as are
/// fields with leading or trailing whitespace, which parsers trim otherwise.
/// With `guard`, text a spreadsheet would run as a formula gets a leading `'`.
pub fn escape_csv_field(field: &str, delimiter: char, guard: bool) -> String {
    let first_non_space = field.trim_start_matches([' ', '\t']).chars().next();
    let safe_field = if guard && matches!(first_non_space, Some('=' | '+' | '-' | '@')) {
        format!("'{}", field)
    } else {
        field.to_string()
    };

    if safe_field.contains(delimiter)
        || safe_field.contains('"')
        || safe_field.contains('\n')
        || safe_field.contains('\r')
        || safe_field.starts_with([' ', '\t'])
        || safe_field.ends_with([' ', '\t'])
    {
        format!("\"{}\"", safe_field.replace('"', "\"\""))
    } else {
        safe_field
    }
}

/// Pick the delimiter from the first non-empty line: tab, then semicolon when
/// it outnumbers commas, else comma.
pub fn detect_delimiter(text: &str) -> char {
    let first = text.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
    if first.contains('\t') {
        '\t'
    } else if first.matches(';').count() > first.matches(',').count() {
        ';'
    } else {
        ','
    }
}

/// Parse pasted or uploaded tabular text into records.
///
/// The delimiter is detected, then fields are read quote-aware: quoted fields
/// may hold delimiters, newlines and `""` escapes and keep their whitespace,
/// unquoted fields are trimmed. Blank lines are skipped and a leading BOM is
/// ignored.
pub fn parse_delimited(text: &str) -> Vec<Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    parse_quoted(text, detect_delimiter(text))
}

fn finish_field(fields: &mut Vec<String>, current: &mut String, was_quoted: bool) {
    let field = std::mem::take(current);
    if was_quoted {
        fields.push(field);
    } else {
        fields.push(field.trim().to_string());
    }
}

fn finish_record(records: &mut Vec<Vec<String>>, fields: &mut Vec<String>) {
    let record = std::mem::take(fields);
    if record.len() == 1 && record[0].is_empty() {
        return;
    }
    records.push(record);
}

fn parse_quoted(text: &str, delimiter: char) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut field_was_quoted = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            if c == '"' {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            } else {
                current.push(c);
            }
            continue;
        }
        match c {
            '"' => {
                in_quotes = true;
                field_was_quoted = true;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' | '\r' => {
                finish_field(&mut fields, &mut current, field_was_quoted);
                finish_record(&mut records, &mut fields);
                field_was_quoted = false;
            }
            c if c == delimiter => {
                finish_field(&mut fields, &mut current, field_was_quoted);
                field_was_quoted = false;
            }
            _ => current.push(c),
        }
    }
    if !current.is_empty() || !fields.is_empty() || field_was_quoted {
        finish_field(&mut fields, &mut current, field_was_quoted);
        finish_record(&mut records, &mut fields);
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagrid_engine::engine::ColumnType;

    fn columns() -> Vec<ColumnConfig> {
        vec![
            ColumnConfig::text("name", "Name"),
            ColumnConfig::number("age", "Age"),
        ]
    }

    #[test]
    fn test_write_csv_example() {
        let cols = columns();
        let col_refs: Vec<&ColumnConfig> = cols.iter().collect();
        let john = Row::new().with("id", 1).with("name", "John").with("age", 30);
        let out = write_csv(&[&john], &col_refs, &ExportOptions::default());
        assert_eq!(out, "Name,Age\nJohn,30\n");
    }

    #[test]
    fn test_write_csv_quotes_and_guard() {
        let cols = vec![
            ColumnConfig::text("a", "A"),
            ColumnConfig::number("n", "N"),
            ColumnConfig::new("ok", "Ok", ColumnType::Boolean),
        ];
        let col_refs: Vec<&ColumnConfig> = cols.iter().collect();
        let row = Row::new()
            .with("a", "=SUM(1,2)")
            .with("n", -5)
            .with("ok", false);
        let options = ExportOptions {
            include_headers: false,
            formula_guard: true,
            ..ExportOptions::default()
        };
        assert_eq!(write_csv(&[&row], &col_refs, &options), "\"'=SUM(1,2)\",-5,No\n");

        let plain = ExportOptions {
            include_headers: false,
            ..ExportOptions::default()
        };
        assert_eq!(write_csv(&[&row], &col_refs, &plain), "\"=SUM(1,2)\",-5,No\n");
    }

    #[test]
    fn test_parse_csv_line_quoted() {
        assert_eq!(
            parse_delimited(r#"a,"hello, world",c"#),
            vec![vec!["a", "hello, world", "c"]]
        );
    }

    #[test]
    fn test_parse_quoted_preserves_whitespace_and_escapes() {
        assert_eq!(
            parse_delimited(r#""  keep me  ","say ""hi""""#),
            vec![vec!["  keep me  ", r#"say "hi""#]]
        );
    }

    #[test]
    fn test_parse_quoted_newline_and_blank_lines() {
        let text = "Name,Notes\r\n\r\nJohn,\"line one\nline two\"\n\nAlice,x\n";
        assert_eq!(
            parse_delimited(text),
            vec![
                vec!["Name", "Notes"],
                vec!["John", "line one\nline two"],
                vec!["Alice", "x"],
            ]
        );
    }

    #[test]
    fn test_parse_tab_separated() {
        let text = "\u{feff}Name\tAge\nJohn\t 30 \n";
        assert_eq!(
            parse_delimited(text),
            vec![vec!["Name", "Age"], vec!["John", "30"]]
        );
    }

    #[test]
    fn test_parse_tab_separated_quoted_fields() {
        let text = "Name\tNotes\n\"say \"\"hi\"\"\"\t\"a\tb\"\n\"two\nlines\"\t\"  padded  \"\n";
        assert_eq!(
            parse_delimited(text),
            vec![
                vec!["Name", "Notes"],
                vec!["say \"hi\"", "a\tb"],
                vec!["two\nlines", "  padded  "],
            ]
        );
    }

    #[test]
    fn test_surrounding_whitespace_is_quoted() {
        assert_eq!(escape_csv_field("  padded  ", ',', false), "\"  padded  \"");
        assert_eq!(escape_csv_field("tail\t", '\t', false), "\"tail\t\"");
        assert_eq!(escape_csv_field("in between", ',', false), "in between");

        let cols = columns();
        let col_refs: Vec<&ColumnConfig> = cols.iter().collect();
        let row = Row::new().with("name", " lead").with("age", 7);
        let out = write_csv(&[&row], &col_refs, &ExportOptions::default());
        assert_eq!(parse_delimited(&out), vec![vec!["Name", "Age"], vec![" lead", "7"]]);
    }

    #[test]
    fn test_detect_semicolon() {
        assert_eq!(detect_delimiter("a;b;c\n1;2,5;3"), ';');
        assert_eq!(detect_delimiter("a,b;c"), ',');
    }

    #[test]
    fn test_escape_csv_field() {
        assert_eq!(escape_csv_field("simple", ',', true), "simple");
        assert_eq!(escape_csv_field("with,comma", ',', true), "\"with,comma\"");
        assert_eq!(escape_csv_field("with\"quote", ',', true), "\"with\"\"quote\"");
        assert_eq!(escape_csv_field(" =1+1", ',', true), "' =1+1");
        assert_eq!(escape_csv_field("=1+1", ',', false), "=1+1");
        assert_eq!(escape_csv_field("a;b", ';', false), "\"a;b\"");
    }
}
