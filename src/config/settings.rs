//! Settings types.
//!
//! [`SettingsLayer`] is what a single source (defaults, config file, LSP
//! client) provides: every field optional so layers can be merged field by
//! field. [`Settings`] is the resolved view the rest of the crate reads.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::defaults;

/// Resolved settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub log_level: Option<String>,
    pub block_names: BlockNameSettings,
    pub shadow: ShadowSettings,
    pub diagnostics: DiagnosticSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings::from(defaults::default_layer())
    }
}

/// Which `{` block names select which sub-parser. Names not listed in
/// `code`, `json` or `plain_text` are parsed as dictionaries; `dictionary`
/// only feeds completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockNameSettings {
    pub code: Vec<String>,
    pub json: Vec<String>,
    pub plain_text: Vec<String>,
    pub dictionary: Vec<String>,
}

impl Default for BlockNameSettings {
    fn default() -> Self {
        defaults::default_block_names()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowSettings {
    /// Absolute limit for one queued update
    pub timeout_ms: u64,
    /// Delay before a creation reports that it is slow
    pub slow_notice_ms: u64,
    /// How long a deletion waits before touching the file
    pub deletion_grace_ms: u64,
    /// Directory under the collection root holding shadow documents
    pub directory_name: String,
    pub file_extension: String,
}

impl ShadowSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn slow_notice(&self) -> Duration {
        Duration::from_millis(self.slow_notice_ms)
    }

    pub fn deletion_grace(&self) -> Duration {
        Duration::from_millis(self.deletion_grace_ms)
    }
}

impl Default for ShadowSettings {
    fn default() -> Self {
        Settings::default().shadow
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticSettings {
    pub enabled: bool,
    /// Blocks every request file must contain
    pub required_blocks: Vec<String>,
}

impl Default for DiagnosticSettings {
    fn default() -> Self {
        Settings::default().diagnostics
    }
}

/// Settings as provided by one source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsLayer {
    pub log_level: Option<String>,
    pub block_names: Option<BlockNameLayer>,
    pub shadow: Option<ShadowLayer>,
    pub diagnostics: Option<DiagnosticLayer>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockNameLayer {
    pub code: Option<Vec<String>>,
    pub json: Option<Vec<String>>,
    pub plain_text: Option<Vec<String>>,
    pub dictionary: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowLayer {
    pub timeout_ms: Option<u64>,
    pub slow_notice_ms: Option<u64>,
    pub deletion_grace_ms: Option<u64>,
    pub directory_name: Option<String>,
    pub file_extension: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticLayer {
    pub enabled: Option<bool>,
    pub required_blocks: Option<Vec<String>>,
}

impl From<SettingsLayer> for Settings {
    /// Resolve a layer, taking anything it leaves unset from the built-in
    /// defaults.
    fn from(layer: SettingsLayer) -> Self {
        let block_names = layer.block_names.unwrap_or_default();
        let shadow = layer.shadow.unwrap_or_default();
        let diagnostics = layer.diagnostics.unwrap_or_default();
        let names = defaults::default_block_names();

        Settings {
            log_level: layer.log_level,
            block_names: BlockNameSettings {
                code: block_names.code.unwrap_or(names.code),
                json: block_names.json.unwrap_or(names.json),
                plain_text: block_names.plain_text.unwrap_or(names.plain_text),
                dictionary: block_names.dictionary.unwrap_or(names.dictionary),
            },
            shadow: ShadowSettings {
                timeout_ms: shadow.timeout_ms.unwrap_or(defaults::SHADOW_TIMEOUT_MS),
                slow_notice_ms: shadow
                    .slow_notice_ms
                    .unwrap_or(defaults::SHADOW_SLOW_NOTICE_MS),
                deletion_grace_ms: shadow
                    .deletion_grace_ms
                    .unwrap_or(defaults::SHADOW_DELETION_GRACE_MS),
                directory_name: shadow
                    .directory_name
                    .unwrap_or_else(|| defaults::SHADOW_DIRECTORY_NAME.to_string()),
                file_extension: shadow
                    .file_extension
                    .unwrap_or_else(|| defaults::SHADOW_FILE_EXTENSION.to_string()),
            },
            diagnostics: DiagnosticSettings {
                enabled: diagnostics.enabled.unwrap_or(true),
                required_blocks: diagnostics
                    .required_blocks
                    .unwrap_or_else(defaults::default_required_blocks),
            },
        }
    }
}
