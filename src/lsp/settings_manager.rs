//! Live settings for the language server.
//!
//! Settings, the block-name table derived from them and the workspace root
//! are swapped atomically so request handlers never observe a half-applied
//! configuration.

use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::Settings;
use crate::parser::{BlockNames, ConfiguredBlockNames};

pub(crate) struct SettingsManager {
    root_path: ArcSwap<Option<PathBuf>>,
    settings: ArcSwap<Settings>,
    block_names: ArcSwap<ConfiguredBlockNames>,
    /// `--config` path given on the command line
    explicit_config: Option<PathBuf>,
}

impl std::fmt::Debug for SettingsManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsManager")
            .field("root_path", &"ArcSwap<Option<PathBuf>>")
            .field("settings", &"ArcSwap<Settings>")
            .field("explicit_config", &self.explicit_config)
            .finish()
    }
}

impl SettingsManager {
    pub(crate) fn new(settings: Settings, explicit_config: Option<PathBuf>) -> Self {
        let block_names = ConfiguredBlockNames::from_settings(&settings.block_names);
        Self {
            root_path: ArcSwap::new(Arc::new(None)),
            settings: ArcSwap::new(Arc::new(settings)),
            block_names: ArcSwap::new(Arc::new(block_names)),
            explicit_config,
        }
    }

    pub(crate) fn explicit_config(&self) -> Option<&std::path::Path> {
        self.explicit_config.as_deref()
    }

    pub(crate) fn set_root_path(&self, path: Option<PathBuf>) {
        self.root_path.store(Arc::new(path));
    }

    pub(crate) fn root_path(&self) -> Arc<Option<PathBuf>> {
        self.root_path.load_full()
    }

    pub(crate) fn load_settings(&self) -> Arc<Settings> {
        self.settings.load_full()
    }

    /// Block-name table matching the current settings.
    pub(crate) fn block_names(&self) -> Arc<dyn BlockNames> {
        self.block_names.load_full()
    }

    /// Store new settings and rebuild the block-name table from them.
    pub(crate) fn apply_settings(&self, settings: Settings) {
        let block_names = ConfiguredBlockNames::from_settings(&settings.block_names);
        self.block_names.store(Arc::new(block_names));
        self.settings.store(Arc::new(settings));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_settings_rebuilds_block_names() {
        let manager = SettingsManager::new(Settings::default(), None);
        assert!(manager.block_names().is_code_block("tests"));
        assert!(!manager.block_names().is_code_block("hooks"));

        let mut settings = Settings::default();
        settings.block_names.code.push("hooks".to_string());
        manager.apply_settings(settings);

        assert!(manager.block_names().is_code_block("hooks"));
        assert_eq!(manager.load_settings().block_names.code.last().unwrap(), "hooks");
    }

    #[test]
    fn root_path_starts_unset() {
        let manager = SettingsManager::new(Settings::default(), None);
        assert!(manager.root_path().is_none());
        manager.set_root_path(Some(PathBuf::from("/collection")));
        assert_eq!(
            manager.root_path().as_ref().as_deref(),
            Some(std::path::Path::new("/collection"))
        );
    }
}
