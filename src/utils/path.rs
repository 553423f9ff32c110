use std::path::{Path, PathBuf};

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("id", "desa", "DesaSurat")
}

/// Default database location
pub fn get_database_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("desa.db"))
        .unwrap_or_else(|| PathBuf::from("desa.db"))
}

/// Settings file location
pub fn get_config_path() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.config_dir().join("settings.toml"))
        .unwrap_or_else(|| PathBuf::from("settings.toml"))
}

/// Default directory for exported letters
pub fn get_export_dir() -> PathBuf {
    project_dirs()
        .map(|dirs| dirs.data_dir().join("exports"))
        .unwrap_or_else(|| PathBuf::from("exports"))
}

/// Make a string safe to use as a file name
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Lowercased file extension
pub fn get_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|s| s.to_lowercase())
}

/// Whether the path looks like an image the exporters can embed
pub fn is_image_file(path: &Path) -> bool {
    matches!(
        get_extension(path).as_deref(),
        Some("jpg" | "jpeg" | "png")
    )
}
