//! User configuration loading for reqfile-ls.
//!
//! User config location: $XDG_CONFIG_HOME/reqfile-ls/reqfile-ls.toml
//! Fallback: the platform config directory (`dirs::config_dir()`).

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

use super::settings::SettingsLayer;

const APP_DIR: &str = "reqfile-ls";
const FILE_NAME: &str = "reqfile-ls.toml";

/// Returns the path to the user configuration file.
///
/// Returns None if neither $XDG_CONFIG_HOME nor a platform config directory
/// is available.
pub fn user_config_path() -> Option<PathBuf> {
    let base = std::env::var_os("XDG_CONFIG_HOME")
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)?;
    Some(config_path_in(&base))
}

fn config_path_in(base: &Path) -> PathBuf {
    base.join(APP_DIR).join(FILE_NAME)
}

/// Load the user config. A missing file is `Ok(None)`.
pub fn load_user_config() -> Result<Option<SettingsLayer>, ConfigError> {
    let Some(path) = user_config_path() else {
        return Ok(None);
    };
    if !path.exists() {
        return Ok(None);
    }
    load_config_file(&path).map(Some)
}

/// Read and parse one TOML config file.
pub fn load_config_file(path: &Path) -> Result<SettingsLayer, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Toml {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn config_path_is_app_dir_under_base() {
        assert_eq!(
            config_path_in(Path::new("/custom/config")),
            PathBuf::from("/custom/config/reqfile-ls/reqfile-ls.toml")
        );
    }

    #[test]
    fn load_config_file_reads_partial_layer() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join(FILE_NAME);
        fs::write(
            &path,
            r#"
                logLevel = "debug"

                [shadow]
                timeoutMs = 2000

                [blockNames]
                code = ["script:pre-request", "hooks"]
            "#,
        )
        .expect("failed to write config");

        let layer = load_config_file(&path).expect("config should load");
        assert_eq!(layer.log_level.as_deref(), Some("debug"));
        let shadow = layer.shadow.expect("shadow section");
        assert_eq!(shadow.timeout_ms, Some(2000));
        assert_eq!(shadow.directory_name, None);
        assert_eq!(
            layer.block_names.and_then(|names| names.code),
            Some(vec!["script:pre-request".to_string(), "hooks".to_string()])
        );
        assert!(layer.diagnostics.is_none());
    }

    #[test]
    fn invalid_toml_reports_path() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join(FILE_NAME);
        fs::write(&path, "shadow = 3").expect("failed to write config");

        let err = load_config_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Toml { .. }));
        assert!(err.to_string().contains(FILE_NAME));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let err = load_config_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
