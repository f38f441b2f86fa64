use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{MilkbookError, Result};
use crate::layout::LayoutConfig;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub output_dir: String,
    pub page_columns: usize,
    pub page_rows: usize,
    pub row_capacity: usize,
    pub show_session_divider: bool,
    pub timestamped_filenames: bool,
    pub image_dir: Option<String>,
    pub font_path: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir().to_string_lossy().to_string(),
            page_columns: 2,
            page_rows: 2,
            row_capacity: 16,
            show_session_divider: true,
            timestamped_filenames: true,
            image_dir: None,
            font_path: None,
        }
    }
}

pub const KEYS: &[&str] = &[
    "output_dir",
    "page_columns",
    "page_rows",
    "row_capacity",
    "show_session_divider",
    "timestamped_filenames",
    "image_dir",
    "font_path",
];

impl Settings {
    pub fn layout_config(&self) -> LayoutConfig {
        let defaults = LayoutConfig::default();
        LayoutConfig {
            columns: self.page_columns.max(1),
            rows: self.page_rows.max(1),
            row_capacity: self.row_capacity.max(1),
            divider_height: if self.show_session_divider {
                defaults.divider_height
            } else {
                0.0
            },
            ..defaults
        }
    }

    /// Update one setting from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fn count(key: &str, value: &str) -> Result<usize> {
            match value.trim().parse::<usize>() {
                Ok(n) if n >= 1 => Ok(n),
                _ => Err(MilkbookError::Settings(format!(
                    "{key} must be a whole number of at least 1, got '{value}'"
                ))),
            }
        }
        fn flag(key: &str, value: &str) -> Result<bool> {
            match value.trim().to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(MilkbookError::Settings(format!(
                    "{key} must be true or false, got '{value}'"
                ))),
            }
        }
        fn optional_path(value: &str) -> Option<String> {
            let v = value.trim();
            (!v.is_empty()).then(|| shellexpand_path(v))
        }

        match key {
            "output_dir" => self.output_dir = shellexpand_path(value.trim()),
            "page_columns" => self.page_columns = count(key, value)?,
            "page_rows" => self.page_rows = count(key, value)?,
            "row_capacity" => self.row_capacity = count(key, value)?,
            "show_session_divider" => self.show_session_divider = flag(key, value)?,
            "timestamped_filenames" => self.timestamped_filenames = flag(key, value)?,
            "image_dir" => self.image_dir = optional_path(value),
            "font_path" => self.font_path = optional_path(value),
            _ => {
                return Err(MilkbookError::Settings(format!(
                    "Unknown setting '{key}'. Known settings: {}",
                    KEYS.join(", ")
                )))
            }
        }
        Ok(())
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("milkbook")
}

pub fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_output_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("milkbook")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!(path = %path.display(), error = %e, "settings unreadable, using defaults");
            Settings::default()
        })
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| MilkbookError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            output_dir: "/tmp/test".to_string(),
            page_columns: 3,
            image_dir: Some("/tmp/images".to_string()),
            ..Settings::default()
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!((s.page_columns, s.page_rows, s.row_capacity), (2, 2, 16));
        assert!(s.show_session_divider);
        assert!(s.timestamped_filenames);
        assert!(s.image_dir.is_none());
        assert!(!s.output_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"output_dir": "/tmp/test", "row_capacity": 15}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.output_dir, "/tmp/test");
        assert_eq!(s.row_capacity, 15);
        assert_eq!(s.page_columns, 2);
        assert!(s.timestamped_filenames);
    }

    #[test]
    fn test_set_validates_values() {
        let mut s = Settings::default();
        s.set("page_rows", "3").unwrap();
        s.set("timestamped_filenames", "no").unwrap();
        assert_eq!(s.page_rows, 3);
        assert!(!s.timestamped_filenames);
        assert!(s.set("page_rows", "0").is_err());
        assert!(s.set("row_capacity", "many").is_err());
        assert!(s.set("show_session_divider", "maybe").is_err());
        assert!(matches!(s.set("colour", "red"), Err(MilkbookError::Settings(_))));
        s.set("image_dir", "").unwrap();
        assert_eq!(s.image_dir, None);
    }

    #[test]
    fn test_layout_config_follows_settings() {
        let s = Settings {
            page_columns: 3,
            page_rows: 1,
            row_capacity: 15,
            show_session_divider: false,
            ..Settings::default()
        };
        let cfg = s.layout_config();
        assert_eq!(cfg.cards_per_page(), 3);
        assert_eq!(cfg.row_capacity, 15);
        assert_eq!(cfg.divider_height, 0.0);
    }
}
