use crate::cli::{print_summaries, records_table};
use crate::error::Result;
use crate::importer::{load_files, ImportMode};

pub fn run(files: &[String], mode: ImportMode) -> Result<()> {
    let (store, summaries) = load_files(files, mode)?;
    print_summaries(&summaries);
    if store.is_empty() {
        println!("No records.");
        return Ok(());
    }
    let n = store.len();
    println!("{}", records_table(&store));
    println!("{n} row{}", if n == 1 { "" } else { "s" });
    Ok(())
}
