//! Integration tests for the datagrid command-line binary

use std::path::PathBuf;
use std::process::Command;

const PEOPLE_CSV: &str = "tests/fixtures/people.csv";
const PEOPLE_TOML: &str = "tests/fixtures/people.toml";

fn run_command(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .arg("run")
        .arg("-q")
        .arg("--")
        // Tests must be deterministic and not depend on a user's saved table settings.
        .arg("--no-settings")
        .args(args)
        .output()
        .expect("Failed to execute command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let exit_code = output.status.code().unwrap_or(-1);

    (stdout, stderr, exit_code)
}

struct Cleanup(PathBuf);

impl Drop for Cleanup {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.0);
    }
}

fn temp_dir(name: &str) -> (PathBuf, Cleanup) {
    let dir = std::env::temp_dir().join(format!("datagrid_cli_{}", name));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).expect("create temp dir");
    (dir.clone(), Cleanup(dir))
}

#[test]
fn test_default_schema_prints_all_rows() {
    let (stdout, stderr, code) = run_command(&[PEOPLE_CSV]);
    assert_eq!(
        stdout,
        "id,name,age,status\n1,John,30,active\n2,Alice,25,inactive\n3,Bob,41,active\n4,Carol,35,active\n"
    );
    assert!(stderr.contains("Showing 1-4 of 4"));
    assert_eq!(code, 0);
}

#[test]
fn test_filter_and_sort() {
    let (stdout, _, code) = run_command(&[
        PEOPLE_CSV,
        "--filter",
        "age gt 26",
        "--sort",
        "age:desc",
    ]);
    assert_eq!(
        stdout,
        "id,name,age,status\n3,Bob,41,active\n4,Carol,35,active\n1,John,30,active\n"
    );
    assert_eq!(code, 0);
}

#[test]
fn test_filter_logic_or() {
    let (stdout, _, code) = run_command(&[
        PEOPLE_CSV,
        "--filter",
        "name equals Alice",
        "--filter",
        "age gte 40",
        "--filter-logic",
        "or",
    ]);
    assert_eq!(
        stdout,
        "id,name,age,status\n2,Alice,25,inactive\n3,Bob,41,active\n"
    );
    assert_eq!(code, 0);
}

#[test]
fn test_search() {
    let (stdout, stderr, code) = run_command(&[PEOPLE_CSV, "--search", "CAR"]);
    assert_eq!(stdout, "id,name,age,status\n4,Carol,35,active\n");
    assert!(stderr.contains("Showing 1-1 of 1"));
    assert_eq!(code, 0);
}

#[test]
fn test_table_definition_pages_and_labels() {
    let (stdout, stderr, code) = run_command(&[
        PEOPLE_CSV,
        "--table",
        PEOPLE_TOML,
        "--sort",
        "age",
        "--page",
        "2",
    ]);
    assert_eq!(stdout, "Name,Age,Status\nCarol,35,Active\nBob,41,Active\n");
    assert!(stderr.contains("Showing 3-4 of 4"));
    assert_eq!(code, 0);
}

#[test]
fn test_page_is_clamped() {
    let (stdout, stderr, code) = run_command(&[
        PEOPLE_CSV,
        "--table",
        PEOPLE_TOML,
        "--page-size",
        "3",
        "--page",
        "9",
    ]);
    assert_eq!(stdout, "Name,Age,Status\nCarol,35,Active\n");
    assert!(stderr.contains("Showing 4-4 of 4"));
    assert_eq!(code, 0);
}

#[test]
fn test_export_json() {
    let (dir, _cleanup) = temp_dir("json");
    let out = dir.join("people.json");
    let out_str = out.to_string_lossy().to_string();

    let (stdout, _, code) = run_command(&[
        PEOPLE_CSV,
        "--table",
        PEOPLE_TOML,
        "--filter",
        "status in inactive",
        "-o",
        &out_str,
    ]);
    assert_eq!(code, 0);
    assert!(stdout.contains("Exported to"));

    let json = std::fs::read_to_string(&out).expect("read export");
    assert!(json.contains("\"Name\": \"Alice\""));
    assert!(json.contains("\"Age\": 25"));
    assert!(json.contains("\"Status\": \"Inactive\""));
    assert!(!json.contains("John"));
    assert!(!json.contains("\"Id\""));
}

#[test]
fn test_export_markdown() {
    let (dir, _cleanup) = temp_dir("md");
    let out = dir.join("people.md");
    let out_str = out.to_string_lossy().to_string();

    let (_, _, code) = run_command(&[PEOPLE_CSV, "--sort", "name", "-o", &out_str]);
    assert_eq!(code, 0);

    let md = std::fs::read_to_string(&out).expect("read export");
    let first_data_line = md.lines().nth(2).unwrap_or_default();
    assert!(first_data_line.contains("Alice"));
}

#[test]
fn test_invalid_rows_fail_import() {
    let (stdout, stderr, code) = run_command(&[
        "tests/fixtures/invalid.csv",
        "--table",
        PEOPLE_TOML,
    ]);
    assert_eq!(stdout, "");
    assert!(stderr.contains("row 2: Invalid number: thirty"));
    assert!(stderr.contains("row 3: Name is required"));
    assert_eq!(code, 1);
}

#[test]
fn test_bad_arguments() {
    let (_, stderr, code) = run_command(&[PEOPLE_CSV, "--filter", "height gt 3"]);
    assert!(stderr.contains("Invalid filter: unknown column height"));
    assert_eq!(code, 1);

    let (_, stderr, code) = run_command(&[PEOPLE_CSV, "--sort", "age:sideways"]);
    assert!(stderr.contains("Invalid sort"));
    assert_eq!(code, 1);

    let (_, stderr, code) = run_command(&["tests/fixtures/missing.csv"]);
    assert!(stderr.contains("Error:"));
    assert_eq!(code, 1);

    let (_, stderr, code) = run_command(&["--bogus"]);
    assert!(stderr.contains("Unknown option: --bogus"));
    assert_eq!(code, 1);
}

#[test]
fn test_formula_guard_is_opt_in() {
    let (dir, _cleanup) = temp_dir("guard");
    let input = dir.join("formulas.csv");
    std::fs::write(&input, "id,name\n1,=1+1\n2,-Dupont\n").expect("write input");
    let input_str = input.to_string_lossy().to_string();

    let plain = dir.join("plain.csv");
    let plain_str = plain.to_string_lossy().to_string();
    let (_, _, code) = run_command(&[&input_str, "-o", &plain_str]);
    assert_eq!(code, 0);
    let csv = std::fs::read_to_string(&plain).expect("read export");
    assert_eq!(csv, "id,name\n1,=1+1\n2,-Dupont\n");

    let guarded = dir.join("guarded.csv");
    let guarded_str = guarded.to_string_lossy().to_string();
    let (_, _, code) = run_command(&[&input_str, "--formula-guard", "-o", &guarded_str]);
    assert_eq!(code, 0);
    let csv = std::fs::read_to_string(&guarded).expect("read export");
    assert_eq!(csv, "id,name\n1,'=1+1\n2,'-Dupont\n");
}
