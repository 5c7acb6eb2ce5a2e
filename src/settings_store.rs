//! File-backed persistence for [`TableSettings`].
//!
//! Settings live as JSON under the user config dir, one file per table:
//! `<config>/datagrid/settings/<table-id>.json`.

use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use datagrid_core::{SettingsListener, TableSettings};

use crate::error::{AppError, Result};

pub const MAX_SETTINGS_FILE_BYTES: u64 = 1_048_576; // 1 MiB

/// Default settings file for a table id.
pub fn default_settings_path(table_id: &str) -> Result<PathBuf> {
    let proj = ProjectDirs::from("", "", "datagrid").ok_or(AppError::NoConfigDir)?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("settings");
    path.push(format!("{}.json", file_stem(table_id)));
    Ok(path)
}

fn file_stem(table_id: &str) -> String {
    let stem: String = table_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() {
        "default".to_string()
    } else {
        stem
    }
}

/// Load saved settings. A missing file yields the defaults.
pub fn load_settings(path: &Path) -> Result<TableSettings> {
    if !path.exists() {
        return Ok(TableSettings::default());
    }
    let meta = std::fs::metadata(path)?;
    if meta.len() > MAX_SETTINGS_FILE_BYTES {
        return Err(AppError::TooLarge {
            path: path.to_path_buf(),
            size: meta.len(),
            max: MAX_SETTINGS_FILE_BYTES,
        });
    }
    let content = std::fs::read_to_string(path)?;
    let settings = serde_json::from_str(&content).map_err(|e| AppError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    log::debug!("loaded settings from {}", path.display());
    Ok(settings)
}

/// Write settings as pretty JSON, creating parent directories.
pub fn save_settings(path: &Path, settings: &TableSettings) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(settings).map_err(|e| AppError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Listener that saves every settings change to `path`. Write failures are
/// logged, never raised into the table.
pub fn persisting_listener(path: PathBuf) -> SettingsListener {
    Box::new(move |settings: &TableSettings| {
        if let Err(e) = save_settings(&path, settings) {
            log::warn!("failed to save settings to {}: {}", path.display(), e);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use datagrid_core::{ColumnConfig, DataTable, Row, TableConfig};
    use datagrid_engine::engine::SortDirection;

    struct Cleanup(PathBuf);

    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn temp_dir(name: &str) -> (PathBuf, Cleanup) {
        let dir = std::env::temp_dir().join(format!("datagrid_settings_{}", name));
        let _ = std::fs::remove_dir_all(&dir);
        (dir.clone(), Cleanup(dir))
    }

    #[test]
    fn test_file_stem_sanitizes_ids() {
        assert_eq!(file_stem("people"), "people");
        assert_eq!(file_stem("../etc/passwd"), "___etc_passwd");
        assert_eq!(file_stem(""), "default");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let (dir, _cleanup) = temp_dir("missing");
        let settings = load_settings(&dir.join("nope.json")).unwrap();
        assert_eq!(settings, TableSettings::default());
    }

    #[test]
    fn test_save_then_load() {
        let (dir, _cleanup) = temp_dir("roundtrip");
        let path = dir.join("settings").join("people.json");

        let mut settings = TableSettings::default();
        settings.page_size = Some(25);
        settings.set_column_visible("age", false);
        save_settings(&path, &settings).unwrap();

        assert_eq!(load_settings(&path).unwrap(), settings);
    }

    #[test]
    fn test_corrupt_file_is_parse_error() {
        let (dir, _cleanup) = temp_dir("corrupt");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_settings(&path), Err(AppError::Parse { .. })));
    }

    #[test]
    fn test_persisting_listener_writes_changes() {
        let (dir, _cleanup) = temp_dir("listener");
        let path = dir.join("people.json");

        let columns = vec![ColumnConfig::text("id", "Id"), ColumnConfig::number("age", "Age")];
        let rows = vec![Row::new().with("id", "a").with("age", 3)];
        let mut table = DataTable::with_data(TableConfig::new("id", columns), rows).unwrap();
        table.on_settings_change(persisting_listener(path.clone()));
        table.toggle_sort("age", false);

        let saved = load_settings(&path).unwrap();
        assert_eq!(
            saved.sort.unwrap().direction_of("age"),
            Some(SortDirection::Desc)
        );
    }
}
