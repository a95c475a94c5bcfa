//! Built-in configuration values for the request-file format.

use super::settings::{
    BlockNameLayer, BlockNameSettings, DiagnosticLayer, SettingsLayer, ShadowLayer,
};

pub const SHADOW_TIMEOUT_MS: u64 = 10_000;
pub const SHADOW_SLOW_NOTICE_MS: u64 = 5_000;
pub const SHADOW_DELETION_GRACE_MS: u64 = 5_000;
pub const SHADOW_DIRECTORY_NAME: &str = ".reqfile-ls";
pub const SHADOW_FILE_EXTENSION: &str = "js";

const CODE_BLOCKS: &[&str] = &["script:pre-request", "script:post-response", "tests"];

const JSON_BLOCKS: &[&str] = &["body:json", "body:graphql:vars"];

const PLAIN_TEXT_BLOCKS: &[&str] = &[
    "body:text",
    "body:xml",
    "body:sparql",
    "body:graphql",
    "docs",
];

const DICTIONARY_BLOCKS: &[&str] = &[
    "meta",
    "get",
    "post",
    "put",
    "delete",
    "patch",
    "options",
    "head",
    "connect",
    "trace",
    "headers",
    "params:query",
    "params:path",
    "auth",
    "auth:awsv4",
    "auth:basic",
    "auth:bearer",
    "auth:digest",
    "auth:ntlm",
    "auth:oauth2",
    "auth:wsse",
    "auth:apikey",
    "body:form-urlencoded",
    "body:multipart-form",
    "vars",
    "vars:pre-request",
    "vars:post-response",
    "assert",
    "settings",
];

fn owned(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

pub fn default_block_names() -> BlockNameSettings {
    BlockNameSettings {
        code: owned(CODE_BLOCKS),
        json: owned(JSON_BLOCKS),
        plain_text: owned(PLAIN_TEXT_BLOCKS),
        dictionary: owned(DICTIONARY_BLOCKS),
    }
}

pub fn default_required_blocks() -> Vec<String> {
    vec!["meta".to_string()]
}

/// The lowest-precedence layer: every field set.
pub fn default_layer() -> SettingsLayer {
    let names = default_block_names();
    SettingsLayer {
        log_level: None,
        block_names: Some(BlockNameLayer {
            code: Some(names.code),
            json: Some(names.json),
            plain_text: Some(names.plain_text),
            dictionary: Some(names.dictionary),
        }),
        shadow: Some(ShadowLayer {
            timeout_ms: Some(SHADOW_TIMEOUT_MS),
            slow_notice_ms: Some(SHADOW_SLOW_NOTICE_MS),
            deletion_grace_ms: Some(SHADOW_DELETION_GRACE_MS),
            directory_name: Some(SHADOW_DIRECTORY_NAME.to_string()),
            file_extension: Some(SHADOW_FILE_EXTENSION.to_string()),
        }),
        diagnostics: Some(DiagnosticLayer {
            enabled: Some(true),
            required_blocks: Some(default_required_blocks()),
        }),
    }
}
