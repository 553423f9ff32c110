use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::services::export::ExportFormat;
use crate::utils::path::{get_config_path, get_database_path, get_export_dir};

/// Application settings kept outside the database (settings.toml)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    /// Overrides the platform data directory database
    pub database_path: Option<PathBuf>,
    pub export_directory: PathBuf,
    pub default_export_format: ExportFormat,
    /// Place printed before the issue date; village name when unset
    pub place_name: Option<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            database_path: None,
            export_directory: get_export_dir(),
            default_export_format: ExportFormat::Pdf,
            place_name: None,
        }
    }
}

impl AppSettings {
    pub fn load() -> Self {
        Self::load_from(&get_config_path())
    }

    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };

        match toml::from_str(&content) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("Ignoring unreadable settings file {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&get_config_path())
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn database_path(&self) -> PathBuf {
        self.database_path.clone().unwrap_or_else(get_database_path)
    }
}
