use comfy_table::Table;

use crate::error::Result;
use crate::users;

pub fn run() -> Result<()> {
    let mut table = Table::new();
    table.set_header(vec!["ID", "Name"]);
    for (id, name) in users::all() {
        table.add_row(vec![id.to_string(), name.to_string()]);
    }
    println!("{table}");
    Ok(())
}
