use std::path::Path;

use colored::Colorize;

use crate::error::{MilkbookError, Result};
use crate::export::write_workbook;
use crate::importer::{load_files, ImportMode};
use crate::ledger::{Entry, RecordStore};

/// Everything already in the workbook has been written, so it counts as saved.
fn open_store(path: &Path) -> Result<RecordStore> {
    if !path.exists() {
        return Ok(RecordStore::new());
    }
    let (store, _) = load_files(&[path], ImportMode::Lenient)?;
    Ok(store.mark_saved())
}

pub fn add(file: &str, raw_entries: &[String]) -> Result<()> {
    let path = Path::new(file);
    let entries = raw_entries
        .iter()
        .map(|s| s.parse::<Entry>())
        .collect::<Result<Vec<_>>>()?;
    let store = open_store(path)?;

    let committed = match store.commit_form(&entries) {
        Ok(committed) => committed,
        Err(MilkbookError::Rejected(rejections)) => {
            for rejection in &rejections {
                println!("{}", format!("Entry {}:", rejection.row).red().bold());
                for v in &rejection.violations {
                    println!("  {}: {v}", v.field().label());
                }
            }
            return Err(MilkbookError::Rejected(rejections));
        }
        Err(e) => return Err(e),
    };

    write_workbook(&committed, path)?;
    println!(
        "Saved {} entr{} to {} ({} rows)",
        entries.len(),
        if entries.len() == 1 { "y" } else { "ies" },
        path.display(),
        committed.len()
    );
    Ok(())
}

pub fn remove(file: &str, row: Option<usize>, all: bool) -> Result<()> {
    let path = Path::new(file);
    let store = open_store(path)?;

    let remaining = if all {
        let n = store.len();
        println!("Removed all {n} rows");
        store.clear()
    } else {
        let position = row.unwrap_or(0);
        let (remaining, removed) = store.remove(position)?;
        println!(
            "Removed row {position}: {} {} id {}",
            removed.date, removed.session, removed.id
        );
        remaining
    };
    write_workbook(&remaining, path)?;
    Ok(())
}
