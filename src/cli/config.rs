use crate::error::Result;
use crate::settings::{load_settings, save_settings, settings_path};

pub fn show() -> Result<()> {
    let s = load_settings();
    let opt = |v: &Option<String>| v.clone().unwrap_or_else(|| "(not set)".to_string());
    println!("Settings file: {}", settings_path().display());
    println!("  output_dir            = {}", s.output_dir);
    println!("  page_columns          = {}", s.page_columns);
    println!("  page_rows             = {}", s.page_rows);
    println!("  row_capacity          = {}", s.row_capacity);
    println!("  show_session_divider  = {}", s.show_session_divider);
    println!("  timestamped_filenames = {}", s.timestamped_filenames);
    println!("  image_dir             = {}", opt(&s.image_dir));
    println!("  font_path             = {}", opt(&s.font_path));
    Ok(())
}

pub fn set(key: &str, value: &str) -> Result<()> {
    let mut s = load_settings();
    s.set(key, value)?;
    save_settings(&s)?;
    println!("Set {key} = {value}");
    Ok(())
}
