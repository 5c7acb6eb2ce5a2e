//! datagrid - run the headless data grid pipeline over a CSV file

use anyhow::{Context, bail};
use simplelog::{Config, LevelFilter, WriteLogger};
use std::env;
use std::fs::File;
use std::path::PathBuf;

use datagrid::config::{TableDefinition, load_table_definition};
use datagrid::settings_store::{default_settings_path, load_settings, persisting_listener};
use datagrid_core::storage::{ExportOptions, parse_delimited, read_import_file, write_csv};
use datagrid_core::{ColumnConfig, DataTable, Row, TableSettings};
use datagrid_engine::engine::{
    FilterGroup, FilterOperator, FilterRule, FilterSet, Logic, SortDirection, SortSpec, Value,
};

fn print_usage() {
    eprintln!("Usage: datagrid [OPTIONS] <FILE>");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <FILE>                    CSV or tab-separated file to load");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  -t, --table <FILE>        Table definition (TOML)");
    eprintln!("  -s, --search <TERM>       Global search over visible columns");
    eprintln!("  --filter <RULE>           \"<column> <op> <value>[ <value2>]\" (can be repeated)");
    eprintln!("  --filter-logic <and|or>   Combine filter rules (default: and)");
    eprintln!("  --sort <COLUMN[:DIR]>     Sort by column, asc or desc (can be repeated)");
    eprintln!("  --page <N>                Page to show (default: 1)");
    eprintln!("  --page-size <N>           Rows per page");
    eprintln!("  -o, --output <FILE>       Export to .csv, .json, .md or .sheet.json");
    eprintln!("  --copy                    Copy the processed rows to the clipboard");
    eprintln!("  --formula-guard           Prefix formula-like CSV text with '");
    eprintln!("  --settings <FILE>         Settings file (default: config dir)");
    eprintln!("  --no-settings             Do not load or save settings");
    eprintln!("  --log <FILE>              Write a debug log");
    eprintln!("  -v, --verbose             Trace-level logging (with --log)");
    eprintln!("  -h, --help                Print help");
}

#[derive(Debug, Default)]
struct Cli {
    file: Option<PathBuf>,
    table: Option<PathBuf>,
    search: Option<String>,
    filters: Vec<String>,
    filter_logic: Logic,
    sorts: Vec<String>,
    page: Option<usize>,
    page_size: Option<usize>,
    output: Option<PathBuf>,
    copy: bool,
    formula_guard: bool,
    settings: Option<PathBuf>,
    no_settings: bool,
    log: Option<PathBuf>,
    verbose: bool,
}

fn next_value<'a>(args: &'a [String], i: &mut usize, what: &str) -> &'a str {
    *i += 1;
    if *i >= args.len() {
        eprintln!("Error: {} requires {}", args[*i - 1], what);
        std::process::exit(1);
    }
    &args[*i]
}

fn parse_count(value: &str, flag: &str) -> usize {
    match value.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => {
            eprintln!("Error: {} expects a positive number, got {}", flag, value);
            std::process::exit(1);
        }
    }
}

fn parse_args(args: &[String]) -> Cli {
    let mut cli = Cli::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "-h" | "--help" => {
                print_usage();
                std::process::exit(0);
            }
            "-t" | "--table" => {
                cli.table = Some(PathBuf::from(next_value(args, &mut i, "a file path")));
            }
            "-s" | "--search" => {
                cli.search = Some(next_value(args, &mut i, "a value").to_string());
            }
            "--filter" => {
                cli.filters
                    .push(next_value(args, &mut i, "a rule").to_string());
            }
            "--filter-logic" => {
                let value = next_value(args, &mut i, "and or or");
                cli.filter_logic = match value.to_ascii_lowercase().as_str() {
                    "and" => Logic::And,
                    "or" => Logic::Or,
                    other => {
                        eprintln!("Error: Unknown filter logic: {}", other);
                        std::process::exit(1);
                    }
                };
            }
            "--sort" => {
                cli.sorts.push(next_value(args, &mut i, "a column").to_string());
            }
            "--page" => {
                cli.page = Some(parse_count(next_value(args, &mut i, "a number"), "--page"));
            }
            "--page-size" => {
                cli.page_size = Some(parse_count(
                    next_value(args, &mut i, "a number"),
                    "--page-size",
                ));
            }
            "-o" | "--output" => {
                cli.output = Some(PathBuf::from(next_value(args, &mut i, "a file path")));
            }
            "--copy" => cli.copy = true,
            "--formula-guard" => cli.formula_guard = true,
            "--settings" => {
                cli.settings = Some(PathBuf::from(next_value(args, &mut i, "a file path")));
            }
            "--no-settings" => cli.no_settings = true,
            "--log" => {
                cli.log = Some(PathBuf::from(next_value(args, &mut i, "a file path")));
            }
            "-v" | "--verbose" => cli.verbose = true,
            arg if arg.starts_with('-') && arg.len() > 1 => {
                eprintln!("Error: Unknown option: {}", arg);
                print_usage();
                std::process::exit(1);
            }
            _ => {
                if cli.file.is_none() {
                    cli.file = Some(PathBuf::from(&args[i]));
                } else {
                    eprintln!("Error: Unexpected argument: {}", args[i]);
                    print_usage();
                    std::process::exit(1);
                }
            }
        }
        i += 1;
    }

    cli
}

/// Find a column by id or title, ignoring case.
fn resolve_column<'a>(columns: &'a [ColumnConfig], name: &str) -> Option<&'a ColumnConfig> {
    let name = name.trim();
    columns
        .iter()
        .find(|c| c.id == name)
        .or_else(|| {
            columns
                .iter()
                .find(|c| c.id.eq_ignore_ascii_case(name) || c.title.eq_ignore_ascii_case(name))
        })
}

/// Parse `"<column> <op> <value>[ <value2>]"`. Only `between` takes a second
/// value; every other operator reads the rest of the line as one value.
fn parse_filter(spec: &str, columns: &[ColumnConfig]) -> Result<FilterRule, String> {
    let mut parts = spec.split_whitespace();
    let (Some(column), Some(op)) = (parts.next(), parts.next()) else {
        return Err(format!("expected \"<column> <op> <value>\", got {:?}", spec));
    };
    let column = resolve_column(columns, column).ok_or_else(|| format!("unknown column {}", column))?;
    let operator = FilterOperator::parse(op).ok_or_else(|| format!("unknown operator {}", op))?;
    let rest: Vec<&str> = parts.collect();

    let rule = match operator {
        FilterOperator::IsEmpty | FilterOperator::IsNotEmpty => {
            if !rest.is_empty() {
                return Err(format!("{} takes no value", op));
            }
            FilterRule::new(column.id.clone(), operator, Value::Null)
        }
        FilterOperator::Between => match rest.as_slice() {
            [low, high] => FilterRule::between(column.id.clone(), *low, *high),
            _ => return Err("between expects two values".to_string()),
        },
        _ => {
            if rest.is_empty() {
                return Err(format!("{} expects a value", op));
            }
            FilterRule::new(column.id.clone(), operator, rest.join(" "))
        }
    };
    Ok(rule)
}

/// Parse `column[:asc|:desc]`, ascending by default.
fn parse_sort(spec: &str, columns: &[ColumnConfig]) -> Result<(String, SortDirection), String> {
    let (name, direction) = match spec.rsplit_once(':') {
        Some((name, dir)) => {
            let dir = SortDirection::parse(dir)
                .ok_or_else(|| format!("unknown sort direction {}", dir))?;
            (name, dir)
        }
        None => (spec, SortDirection::Asc),
    };
    let column = resolve_column(columns, name).ok_or_else(|| format!("unknown column {}", name))?;
    Ok((column.id.clone(), direction))
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let Some(path) = cli.log.as_ref() else {
        return Ok(());
    };
    let level = if cli.verbose {
        LevelFilter::Trace
    } else {
        LevelFilter::Debug
    };
    let file = File::create(path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;
    WriteLogger::init(level, Config::default(), file).context("Failed to initialize logger")?;
    Ok(())
}

fn load_definition(cli: &Cli, text: &str) -> anyhow::Result<TableDefinition> {
    if let Some(path) = cli.table.as_ref() {
        return Ok(load_table_definition(path)?);
    }
    let headers = parse_delimited(text).into_iter().next().unwrap_or_default();
    Ok(TableDefinition::from_headers(&headers)?)
}

fn settings_path(cli: &Cli, definition: &TableDefinition) -> Option<PathBuf> {
    if cli.no_settings {
        return None;
    }
    if let Some(path) = cli.settings.as_ref() {
        return Some(path.clone());
    }
    match default_settings_path(&definition.id) {
        Ok(path) => Some(path),
        Err(e) => {
            log::warn!("settings disabled: {}", e);
            None
        }
    }
}

fn print_window(table: &mut DataTable) -> anyhow::Result<()> {
    let (rows, label) = match table.page_info() {
        Some(info) => (table.display_rows(), info.label()),
        None => {
            let rows: Vec<Row> = table.processed_rows().to_vec();
            let label = if rows.is_empty() {
                "Showing 0-0 of 0".to_string()
            } else {
                format!("Showing 1-{} of {}", rows.len(), rows.len())
            };
            (rows, label)
        }
    };
    let columns = table.visible_columns();
    if columns.is_empty() {
        bail!("No visible columns");
    }
    let row_refs: Vec<&Row> = rows.iter().collect();
    print!("{}", write_csv(&row_refs, &columns, &ExportOptions::default()));
    eprintln!("{}", label);
    Ok(())
}

#[cfg(feature = "clipboard")]
fn copy_rows(table: &mut DataTable) -> anyhow::Result<()> {
    let mut clipboard = datagrid::clipboard::SystemClipboard;
    let count = table.copy_to_clipboard(&mut clipboard, false)?;
    eprintln!("Copied {} rows to clipboard", count);
    Ok(())
}

#[cfg(not(feature = "clipboard"))]
fn copy_rows(_table: &mut DataTable) -> anyhow::Result<()> {
    bail!("Clipboard support is not enabled in this build")
}

fn run(cli: Cli) -> anyhow::Result<()> {
    init_logging(&cli)?;

    let Some(file) = cli.file.as_ref() else {
        print_usage();
        bail!("No input file given");
    };
    let text = read_import_file(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;

    let definition = load_definition(&cli, &text)?;
    let settings_file = settings_path(&cli, &definition);
    let settings = match settings_file.as_ref() {
        Some(path) => load_settings(path).unwrap_or_else(|e| {
            eprintln!("Warning: {}", e);
            TableSettings::default()
        }),
        None => TableSettings::default(),
    };

    let mut table = DataTable::new(definition.to_config(settings))?;

    let imported = table.import_text(&text);
    for warning in &imported.warnings {
        eprintln!("Warning: row {}: {}", warning.row, warning.message);
    }
    if !imported.success {
        for error in &imported.errors {
            eprintln!("Error: row {}: {}", error.row, error.message);
        }
        bail!("{} had {} invalid rows", file.display(), imported.errors.len());
    }
    table.set_data(imported.data)?;

    if let Some(path) = settings_file {
        table.on_settings_change(persisting_listener(path));
    }

    if let Some(term) = cli.search.as_deref() {
        table.set_search(term);
    }

    if !cli.filters.is_empty() {
        let mut group = FilterGroup::new("cli", cli.filter_logic);
        for (n, spec) in cli.filters.iter().enumerate() {
            let rule = parse_filter(spec, &definition.columns)
                .map_err(|e| anyhow::anyhow!("Invalid filter: {}", e))?;
            group = group.rule(rule.with_id(format!("cli-{}", n + 1)));
        }
        table.set_filters(FilterSet::new(Logic::And).group(group));
    }

    if !cli.sorts.is_empty() {
        let mut spec = SortSpec::new();
        for entry in &cli.sorts {
            let (column, direction) = parse_sort(entry, &definition.columns)
                .map_err(|e| anyhow::anyhow!("Invalid sort: {}", e))?;
            spec = spec.then(column, direction);
        }
        table.sort_by(spec);
    }

    if let Some(size) = cli.page_size {
        table.set_page_size(size);
    }
    if let Some(page) = cli.page {
        table.go_to_page(page);
    }

    if cli.copy {
        copy_rows(&mut table)?;
    }

    if let Some(output) = cli.output.as_ref() {
        let options = ExportOptions {
            formula_guard: cli.formula_guard,
            ..ExportOptions::default()
        };
        let written = table.export_to_path(output, None, &options)?;
        println!("Exported to {}", written.display());
    } else if !cli.copy {
        print_window(&mut table)?;
    }

    Ok(())
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let cli = parse_args(&args);

    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn columns() -> Vec<ColumnConfig> {
        vec![
            ColumnConfig::text("name", "Name"),
            ColumnConfig::number("age", "Age"),
        ]
    }

    #[test]
    fn test_parse_filter() {
        let rule = parse_filter("Age gt 26", &columns()).unwrap();
        assert_eq!(rule.column, "age");
        assert_eq!(rule.operator, FilterOperator::Gt);
        assert_eq!(rule.value, Value::from("26"));

        let rule = parse_filter("name contains John Smith", &columns()).unwrap();
        assert_eq!(rule.value, Value::from("John Smith"));

        let rule = parse_filter("age between 20 30", &columns()).unwrap();
        assert_eq!(rule.value2, Some(Value::from("30")));

        let rule = parse_filter("name is_empty", &columns()).unwrap();
        assert_eq!(rule.operator, FilterOperator::IsEmpty);
    }

    #[test]
    fn test_parse_filter_errors() {
        assert!(parse_filter("age", &columns()).is_err());
        assert!(parse_filter("height gt 3", &columns()).is_err());
        assert!(parse_filter("age around 3", &columns()).is_err());
        assert!(parse_filter("age between 3", &columns()).is_err());
        assert!(parse_filter("age gt", &columns()).is_err());
    }

    #[test]
    fn test_parse_sort() {
        assert_eq!(
            parse_sort("age", &columns()).unwrap(),
            ("age".to_string(), SortDirection::Asc)
        );
        assert_eq!(
            parse_sort("Name:desc", &columns()).unwrap(),
            ("name".to_string(), SortDirection::Desc)
        );
        assert!(parse_sort("age:sideways", &columns()).is_err());
        assert!(parse_sort("nope", &columns()).is_err());
    }

    #[test]
    fn test_parse_args() {
        let args: Vec<String> = [
            "datagrid",
            "people.csv",
            "--filter",
            "age gt 26",
            "--filter-logic",
            "or",
            "--sort",
            "age:desc",
            "--page-size",
            "10",
            "--no-settings",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        let cli = parse_args(&args);
        assert_eq!(cli.file, Some(PathBuf::from("people.csv")));
        assert_eq!(cli.filters, vec!["age gt 26"]);
        assert_eq!(cli.filter_logic, Logic::Or);
        assert_eq!(cli.sorts, vec!["age:desc"]);
        assert_eq!(cli.page_size, Some(10));
        assert!(cli.no_settings);
    }
}
