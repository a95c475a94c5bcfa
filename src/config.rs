//! Layered configuration.
//!
//! Layers, lowest precedence first: built-in defaults, the user config file,
//! an explicit `--config` file, then settings sent by the LSP client.
//! Later layers override earlier ones field by field.

pub mod defaults;
pub mod settings;
pub mod user;

use std::path::Path;

use serde_json::Value;

pub use settings::{
    BlockNameLayer, BlockNameSettings, DiagnosticLayer, DiagnosticSettings, Settings,
    SettingsLayer, ShadowLayer, ShadowSettings,
};
pub use user::{load_config_file, load_user_config, user_config_path};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsEventKind {
    Info,
    Warning,
}

/// Something worth telling the user about while loading settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SettingsEvent {
    pub kind: SettingsEventKind,
    pub message: String,
}

impl SettingsEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: SettingsEventKind::Warning,
            message: message.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettingsSource {
    InitializationOptions,
    ClientConfiguration,
}

impl SettingsSource {
    fn description(self) -> &'static str {
        match self {
            SettingsSource::InitializationOptions => "initialization options",
            SettingsSource::ClientConfiguration => "client configuration",
        }
    }
}

#[derive(Debug)]
pub struct SettingsLoadOutcome {
    pub settings: Settings,
    pub events: Vec<SettingsEvent>,
}

/// Resolve settings from every layer.
pub fn load_settings(
    explicit_config: Option<&Path>,
    override_settings: Option<(SettingsSource, Value)>,
) -> SettingsLoadOutcome {
    let mut events = Vec::new();

    let defaults = Some(defaults::default_layer());
    let user_config = load_user_config_with_events(&mut events);
    let explicit = explicit_config.and_then(|path| load_explicit_config(path, &mut events));
    let client = override_settings
        .and_then(|(source, value)| parse_override_settings(source, value, &mut events));

    let merged = merge_all(&[defaults, user_config, explicit, client]).unwrap_or_default();
    SettingsLoadOutcome {
        settings: Settings::from(merged),
        events,
    }
}

fn load_user_config_with_events(events: &mut Vec<SettingsEvent>) -> Option<SettingsLayer> {
    match load_user_config() {
        Ok(Some(layer)) => {
            events.push(SettingsEvent::info("Loaded user config"));
            Some(layer)
        }
        Ok(None) => None,
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to load user config: {}",
                err
            )));
            None
        }
    }
}

fn load_explicit_config(path: &Path, events: &mut Vec<SettingsEvent>) -> Option<SettingsLayer> {
    match load_config_file(path) {
        Ok(layer) => {
            events.push(SettingsEvent::info(format!(
                "Loaded config file: {}",
                path.display()
            )));
            Some(layer)
        }
        Err(err) => {
            events.push(SettingsEvent::warning(err.to_string()));
            None
        }
    }
}

fn parse_override_settings(
    source: SettingsSource,
    value: Value,
    events: &mut Vec<SettingsEvent>,
) -> Option<SettingsLayer> {
    if value.is_null() {
        return None;
    }
    match serde_json::from_value::<SettingsLayer>(value) {
        Ok(layer) => {
            events.push(SettingsEvent::info(format!(
                "Applied settings from {}",
                source.description()
            )));
            Some(layer)
        }
        Err(err) => {
            events.push(SettingsEvent::warning(format!(
                "Failed to parse {}: {}",
                source.description(),
                err
            )));
            None
        }
    }
}

/// Merge layers in order; later layers have higher precedence.
pub fn merge_all(layers: &[Option<SettingsLayer>]) -> Option<SettingsLayer> {
    layers.iter().cloned().reduce(merge_settings).flatten()
}

/// Merge two layers, preferring values from `primary` over `fallback`.
pub fn merge_settings(
    fallback: Option<SettingsLayer>,
    primary: Option<SettingsLayer>,
) -> Option<SettingsLayer> {
    match (fallback, primary) {
        (None, None) => None,
        (Some(settings), None) | (None, Some(settings)) => Some(settings),
        (Some(fallback), Some(primary)) => Some(SettingsLayer {
            log_level: primary.log_level.or(fallback.log_level),
            block_names: merge_option(fallback.block_names, primary.block_names, |w, s| {
                BlockNameLayer {
                    code: s.code.or(w.code),
                    json: s.json.or(w.json),
                    plain_text: s.plain_text.or(w.plain_text),
                    dictionary: s.dictionary.or(w.dictionary),
                }
            }),
            shadow: merge_option(fallback.shadow, primary.shadow, |w, s| ShadowLayer {
                timeout_ms: s.timeout_ms.or(w.timeout_ms),
                slow_notice_ms: s.slow_notice_ms.or(w.slow_notice_ms),
                deletion_grace_ms: s.deletion_grace_ms.or(w.deletion_grace_ms),
                directory_name: s.directory_name.or(w.directory_name),
                file_extension: s.file_extension.or(w.file_extension),
            }),
            diagnostics: merge_option(fallback.diagnostics, primary.diagnostics, |w, s| {
                DiagnosticLayer {
                    enabled: s.enabled.or(w.enabled),
                    required_blocks: s.required_blocks.or(w.required_blocks),
                }
            }),
        }),
    }
}

fn merge_option<T>(fallback: Option<T>, primary: Option<T>, merge: impl FnOnce(T, T) -> T) -> Option<T> {
    match (fallback, primary) {
        (Some(w), Some(s)) => Some(merge(w, s)),
        (w, s) => s.or(w),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn later_layers_override_field_by_field() {
        let user = SettingsLayer {
            shadow: Some(ShadowLayer {
                timeout_ms: Some(2_000),
                directory_name: Some(".user".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let client = SettingsLayer {
            shadow: Some(ShadowLayer {
                directory_name: Some(".client".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };

        let merged = merge_all(&[Some(defaults::default_layer()), Some(user), None, Some(client)]);
        let settings = Settings::from(merged.unwrap());
        assert_eq!(settings.shadow.timeout_ms, 2_000);
        assert_eq!(settings.shadow.directory_name, ".client");
        assert_eq!(settings.shadow.slow_notice_ms, defaults::SHADOW_SLOW_NOTICE_MS);
        assert_eq!(settings.block_names, BlockNameSettings::default());
    }

    #[test]
    fn explicit_config_and_client_settings_are_layered() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join("project.toml");
        fs::write(
            &path,
            "[diagnostics]\nrequiredBlocks = [\"meta\", \"get\"]\nenabled = false\n",
        )
        .expect("failed to write config");

        let outcome = load_settings(
            Some(&path),
            Some((
                SettingsSource::InitializationOptions,
                json!({ "diagnostics": { "enabled": true } }),
            )),
        );

        assert!(outcome.settings.diagnostics.enabled);
        assert_eq!(
            outcome.settings.diagnostics.required_blocks,
            vec!["meta".to_string(), "get".to_string()]
        );
        assert!(
            outcome
                .events
                .iter()
                .any(|event| event.message.contains("initialization options"))
        );
    }

    #[test]
    fn invalid_client_settings_are_reported_and_ignored() {
        let outcome = load_settings(
            None,
            Some((
                SettingsSource::ClientConfiguration,
                json!({ "shadow": { "timeoutMs": "soon" } }),
            )),
        );
        assert_eq!(outcome.settings.shadow.timeout_ms, defaults::SHADOW_TIMEOUT_MS);
        assert!(
            outcome
                .events
                .iter()
                .any(|event| event.kind == SettingsEventKind::Warning)
        );
    }
}
