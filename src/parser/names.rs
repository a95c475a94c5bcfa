//! Name-to-kind lookup for `{` blocks.
//!
//! The bracket decides between array and everything else; for `{` blocks the
//! declared name picks the sub-parser. The table itself lives outside the
//! parser so hosts can extend it from configuration.

use std::collections::HashSet;

use serde::Serialize;

use crate::config::BlockNameSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    Dictionary,
    Array,
    PlainText,
    Json,
    Code,
}

impl BlockKind {
    pub fn describe(self) -> &'static str {
        match self {
            BlockKind::Dictionary => "dictionary block of `key: value` lines",
            BlockKind::Array => "array block of comma-separated entries",
            BlockKind::PlainText => "free-form text block",
            BlockKind::Json => "JSON body block",
            BlockKind::Code => "embedded script block",
        }
    }
}

/// Lookup supplied by the host to classify `{` blocks by name.
pub trait BlockNames: Send + Sync {
    fn is_code_block(&self, name: &str) -> bool;
    fn is_json_block(&self, name: &str) -> bool;
    fn is_plain_text_block(&self, name: &str) -> bool;

    /// Every name this table knows about, for completion.
    fn known_names(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Pick the sub-parser for a block header.
pub fn resolve_kind(names: &dyn BlockNames, name: &str, bracket: char) -> BlockKind {
    if bracket == '[' {
        BlockKind::Array
    } else if names.is_code_block(name) {
        BlockKind::Code
    } else if names.is_json_block(name) {
        BlockKind::Json
    } else if names.is_plain_text_block(name) {
        BlockKind::PlainText
    } else {
        BlockKind::Dictionary
    }
}

/// Block-name table built from settings.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredBlockNames {
    code: HashSet<String>,
    json: HashSet<String>,
    plain_text: HashSet<String>,
    dictionary: HashSet<String>,
}

impl ConfiguredBlockNames {
    pub fn from_settings(settings: &BlockNameSettings) -> Self {
        Self {
            code: settings.code.iter().cloned().collect(),
            json: settings.json.iter().cloned().collect(),
            plain_text: settings.plain_text.iter().cloned().collect(),
            dictionary: settings.dictionary.iter().cloned().collect(),
        }
    }
}

impl BlockNames for ConfiguredBlockNames {
    fn is_code_block(&self, name: &str) -> bool {
        self.code.contains(name)
    }

    fn is_json_block(&self, name: &str) -> bool {
        self.json.contains(name)
    }

    fn is_plain_text_block(&self, name: &str) -> bool {
        self.plain_text.contains(name)
    }

    fn known_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .code
            .iter()
            .chain(&self.json)
            .chain(&self.plain_text)
            .chain(&self.dictionary)
            .cloned()
            .collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("script:pre-request", '{', BlockKind::Code)]
    #[case("tests", '{', BlockKind::Code)]
    #[case("body:json", '{', BlockKind::Json)]
    #[case("docs", '{', BlockKind::PlainText)]
    #[case("headers", '{', BlockKind::Dictionary)]
    #[case("unknown-name", '{', BlockKind::Dictionary)]
    #[case("body:json", '[', BlockKind::Array)]
    #[case("vars:secret", '[', BlockKind::Array)]
    fn resolves_kind_from_bracket_then_name(
        #[case] name: &str,
        #[case] bracket: char,
        #[case] expected: BlockKind,
    ) {
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        assert_eq!(resolve_kind(&names, name, bracket), expected);
    }

    #[test]
    fn known_names_are_sorted_and_include_dictionaries() {
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let known = names.known_names();
        assert!(known.contains(&"meta".to_string()));
        assert!(known.contains(&"tests".to_string()));
        let mut sorted = known.clone();
        sorted.sort();
        assert_eq!(known, sorted);
    }
}
