use std::path::PathBuf;

use crate::cli::print_summaries;
use crate::error::Result;
use crate::export::{write_workbook, DEFAULT_FILENAME};
use crate::importer::{load_files, ImportMode};
use crate::settings::load_settings;

/// `--output` given without a path lands in the output directory.
fn export_path(output: Option<String>) -> PathBuf {
    output
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(load_settings().output_dir).join(DEFAULT_FILENAME))
}

pub fn run(files: &[String], mode: ImportMode, output: Option<Option<String>>) -> Result<()> {
    let (store, summaries) = load_files(files, mode)?;
    print_summaries(&summaries);

    let rejected: usize = summaries.iter().map(|s| s.rejected.len()).sum();
    println!("{} records loaded, {} rows skipped", store.len(), rejected);

    if let Some(out) = output {
        let path = export_path(out);
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        write_workbook(&store, &path)?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}
