use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;

fn milkbook(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("milkbook").unwrap();
    cmd.env("HOME", home).env_remove("RUST_LOG");
    cmd
}

fn write_csv(dir: &Path, name: &str, body: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    path.to_string_lossy().to_string()
}

const SHEET: &str = "Date,Session,User ID,Quantity,Percentage\n\
10/03/2025,AM,1,10,7\n\
10/03/2025,PM,1,8,7\n\
10/03/2025,AM,1,10,7\n\
11/03/2025,AM,2,0,4.9\n\
12/03/2025,A.M.,3,5,6\n";

#[test]
fn test_mode_is_required() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "milk.csv", SHEET);
    milkbook(home.path())
        .args(["import", &csv])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--mode"));
}

#[test]
fn test_strict_import_reports_skipped_rows() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "milk.csv", SHEET);
    milkbook(home.path())
        .args(["import", &csv, "--mode", "strict"])
        .assert()
        .success()
        .stdout(predicate::str::contains("milk.csv: 3 imported"))
        .stdout(predicate::str::contains("Row 4:"))
        .stdout(predicate::str::contains("Duplicate entry"))
        .stdout(predicate::str::contains(
            "Row 5: Quantity must be greater than 0.0. | Percentage must be between 5.0 and 10.0.",
        ));
}

#[test]
fn test_lenient_import_keeps_everything_and_exports() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "milk.csv", SHEET);
    let out = home.path().join("out").join("table-data.xlsx");
    milkbook(home.path())
        .args(["import", &csv, "--mode", "lenient", "--output"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("5 records loaded"));
    assert!(out.exists());

    milkbook(home.path())
        .args(["show", "--mode", "lenient"])
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("10-Mar-25"))
        .stdout(predicate::str::contains("5 rows"));
}

#[test]
fn test_bare_output_exports_to_output_dir() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "milk.csv", SHEET);
    let books = home.path().join("books");
    milkbook(home.path())
        .args(["config", "set", "output_dir"])
        .arg(&books)
        .assert()
        .success();
    milkbook(home.path())
        .args(["import", &csv, "--mode", "lenient", "--output"])
        .assert()
        .success()
        .stdout(predicate::str::contains("table-data.xlsx"));
    assert!(books.join("table-data.xlsx").exists());
}

#[test]
fn test_add_is_all_or_nothing() {
    let home = tempfile::tempdir().unwrap();
    let book = home.path().join("book.xlsx");

    milkbook(home.path())
        .args(["add", "--file"])
        .arg(&book)
        .args(["2025-03-10,AM,4,10,7", "2025-03-10,PM,4,8,7"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Saved 2 entries"));

    milkbook(home.path())
        .args(["add", "--file"])
        .arg(&book)
        .args(["2025-03-11,AM,4,10,7", "2025-03-10,AM,4,1,6"])
        .assert()
        .failure()
        .stdout(predicate::str::contains("Entry 2:"))
        .stdout(predicate::str::contains("User ID: Duplicate entry"));

    milkbook(home.path())
        .args(["show", "--mode", "strict"])
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 rows"));
}

#[test]
fn test_add_reports_every_bad_field() {
    let home = tempfile::tempdir().unwrap();
    let book = home.path().join("book.xlsx");
    milkbook(home.path())
        .args(["add", "--file"])
        .arg(&book)
        .arg("2025-03-10,am,25,0,11")
        .assert()
        .failure()
        .stdout(predicate::str::contains("User ID must be between 1 and 20."))
        .stdout(predicate::str::contains("Session must be AM or PM."))
        .stdout(predicate::str::contains("Quantity must be greater than 0.0."))
        .stdout(predicate::str::contains("Percentage must be between 5.0 and 10.0."));
    assert!(!book.exists());
}

#[test]
fn test_remove_row_and_all() {
    let home = tempfile::tempdir().unwrap();
    let book = home.path().join("book.xlsx");
    milkbook(home.path())
        .args(["add", "--file"])
        .arg(&book)
        .args(["2025-03-10,AM,4,10,7", "2025-03-10,PM,4,8,7"])
        .assert()
        .success();

    milkbook(home.path())
        .args(["remove", "--row", "1", "--file"])
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed row 1"));

    milkbook(home.path())
        .args(["remove", "--row", "9", "--file"])
        .arg(&book)
        .assert()
        .failure()
        .stderr(predicate::str::contains("No row 9"));

    milkbook(home.path())
        .args(["remove", "--all", "--file"])
        .arg(&book)
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed all 1 rows"));
}

#[test]
fn test_statements_written_to_pdf() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "milk.csv", SHEET);
    let pdf = home.path().join("statements.pdf");
    milkbook(home.path())
        .args(["statements", &csv, "--mode", "strict", "--from", "2025-03-10", "--output"])
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("2 statements, 1 page"));
    let bytes = std::fs::read(&pdf).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

#[test]
fn test_statements_default_name_under_output_dir() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "milk.csv", SHEET);
    let out_dir = home.path().join("pdfs");
    milkbook(home.path())
        .args(["config", "set", "output_dir"])
        .arg(&out_dir)
        .assert()
        .success();
    milkbook(home.path())
        .args(["config", "set", "timestamped_filenames", "false"])
        .assert()
        .success();
    milkbook(home.path())
        .args(["statements", &csv, "--mode", "lenient"])
        .assert()
        .success();
    assert!(out_dir.join("report.pdf").exists());
}

#[test]
fn test_unsnapped_month_statement() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(
        home.path(),
        "late.csv",
        "Date,Session,User ID,Quantity,Percentage\n20/03/2025,AM,1,10,7\n25/03/2025,PM,1,4,6\n",
    );
    let pdf = home.path().join("month.pdf");
    milkbook(home.path())
        .args(["statements", &csv, "--mode", "strict", "--from", "2025-03-01", "--to", "2025-03-31", "--no-snap", "--output"])
        .arg(&pdf)
        .assert()
        .success()
        .stdout(predicate::str::contains("1 statement, 1 page"));
    assert!(pdf.exists());
}

#[test]
fn test_statements_filter_preconditions() {
    let home = tempfile::tempdir().unwrap();
    let csv = write_csv(home.path(), "milk.csv", SHEET);
    milkbook(home.path())
        .args(["statements", &csv, "--mode", "strict", "--from-id", "5", "--to-id", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("From ID (5) cannot be greater than To ID (2)."));

    milkbook(home.path())
        .args(["statements", &csv, "--mode", "strict", "--from", "2025-03-10", "--to", "2025-04-02"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("one calendar month"));

    milkbook(home.path())
        .args(["statements", &csv, "--mode", "strict", "--from-id", "15"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No rows found for the selected filters."));
}

#[test]
fn test_users_table() {
    let home = tempfile::tempdir().unwrap();
    milkbook(home.path())
        .arg("users")
        .assert()
        .success()
        .stdout(predicate::str::contains("నాసిన. అంకయ్య"))
        .stdout(predicate::str::contains("N/A"));
}

#[test]
fn test_config_rejects_bad_values() {
    let home = tempfile::tempdir().unwrap();
    milkbook(home.path())
        .args(["config", "set", "page_rows", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("page_rows"));
    milkbook(home.path())
        .args(["config", "set", "page_rows", "3"])
        .assert()
        .success();
    milkbook(home.path())
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"page_rows\s+= 3").unwrap());
}

#[test]
fn test_completions() {
    let home = tempfile::tempdir().unwrap();
    milkbook(home.path())
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("milkbook"));
}
