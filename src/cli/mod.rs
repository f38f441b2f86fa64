pub mod config;
pub mod entry;
pub mod import;
pub mod show;
pub mod statements;
pub mod users;

use clap::{Parser, Subcommand};
use colored::Colorize;
use comfy_table::{Cell, Table};

use crate::dates::display_from_iso;
use crate::fmt::{format_amount_grouped, format_percentage, format_quantity};
use crate::importer::{ImportMode, ImportSummary};
use crate::ledger::RecordStore;

#[derive(Parser)]
#[command(
    name = "milkbook",
    version,
    about = "Milk-delivery ledger: import delivery sheets and print per-user statements."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Import delivery sheets and report what was accepted.
    Import {
        /// XLSX/XLS/ODS/CSV files, read in order
        #[arg(required = true)]
        files: Vec<String>,
        /// Ingestion policy
        #[arg(long, value_enum)]
        mode: ImportMode,
        /// Write the combined records to this workbook; with no path,
        /// `table-data.xlsx` in the configured output directory
        #[arg(long, num_args = 0..=1, value_name = "PATH")]
        output: Option<Option<String>>,
    },
    /// Print the ingested records as a table.
    Show {
        #[arg(required = true)]
        files: Vec<String>,
        #[arg(long, value_enum)]
        mode: ImportMode,
    },
    /// Validate entries and append them to a workbook.
    Add {
        /// Workbook to extend (created if missing)
        #[arg(long)]
        file: String,
        /// date,session,id,quantity,percentage
        #[arg(required = true)]
        entries: Vec<String>,
    },
    /// Remove one row, or every row, from a workbook.
    Remove {
        #[arg(long)]
        file: String,
        /// S.No as printed by `milkbook show`
        #[arg(long, conflicts_with = "all", required_unless_present = "all")]
        row: Option<usize>,
        #[arg(long)]
        all: bool,
    },
    /// Render per-user statements to PDF.
    Statements {
        #[arg(required = true)]
        files: Vec<String>,
        #[arg(long, value_enum)]
        mode: ImportMode,
        /// Lowest user id to include
        #[arg(long = "from-id")]
        from_id: Option<i64>,
        /// Highest user id to include
        #[arg(long = "to-id")]
        to_id: Option<i64>,
        /// Start date (any accepted date form)
        #[arg(long = "from")]
        from_date: Option<String>,
        /// End date
        #[arg(long = "to")]
        to_date: Option<String>,
        /// Use the dates as given instead of snapping to a half month
        #[arg(long = "no-snap")]
        no_snap: bool,
        /// Output file path
        #[arg(long)]
        output: Option<String>,
    },
    /// List the user table.
    Users,
    /// Show or change settings.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
    /// Print a shell completion script.
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Print current settings.
    Show,
    /// Change one setting.
    Set { key: String, value: String },
}

pub(crate) fn print_summaries(summaries: &[ImportSummary]) {
    for s in summaries {
        let mut line = format!("{}: {} imported", s.source, s.imported);
        if s.blank_rows > 0 {
            line.push_str(&format!(", {} blank rows ignored", s.blank_rows));
        }
        if s.rejected.is_empty() {
            println!("{line}");
            continue;
        }
        println!("{line}, {}", format!("{} skipped", s.rejected.len()).yellow());
        for rejection in &s.rejected {
            println!(
                "  {} {}",
                format!("Row {}:", rejection.row).red(),
                rejection.issues()
            );
        }
    }
}

pub(crate) fn records_table(store: &RecordStore) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        "S.No",
        "Date",
        "Session",
        "User ID",
        "Quantity",
        "Percentage",
        "Amount",
        "",
    ]);
    for (i, r) in store.records().iter().enumerate() {
        let status = if r.saved {
            Cell::new("")
        } else {
            Cell::new("unsaved".yellow())
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(display_from_iso(&r.date)),
            Cell::new(r.session.as_str()),
            Cell::new(r.id.to_string()),
            Cell::new(format_quantity(r.quantity)),
            Cell::new(format_percentage(r.percentage)),
            Cell::new(format_amount_grouped(r.amount)),
            status,
        ]);
    }
    table
}
