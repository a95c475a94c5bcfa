//! Diagnostics over the parsed block tree.
//!
//! A rule is a pure function of the parse result. [`run_rules`] applies
//! every rule in [`RULES`] and concatenates their findings in rule order.

mod rules;

use serde::Serialize;

use crate::config::DiagnosticSettings;
use crate::parser::{Block, ParsedDocument, TextOutsideOfBlocks};
use crate::text::Range;

pub use rules::RULES;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

/// A location elsewhere that explains a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelatedInformation {
    pub uri: String,
    pub range: Range,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    pub range: Range,
    pub severity: Severity,
    /// Stable identifier of the rule that produced this diagnostic
    pub code: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub related_information: Vec<RelatedInformation>,
}

impl Diagnostic {
    pub fn new(code: &'static str, severity: Severity, range: Range, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            range,
            severity,
            code,
            related_information: Vec::new(),
        }
    }

    pub fn with_related(mut self, uri: &str, range: Range, message: impl Into<String>) -> Self {
        self.related_information.push(RelatedInformation {
            uri: uri.to_string(),
            range,
            message: message.into(),
        });
        self
    }
}

/// Everything a rule may look at.
pub struct RuleContext<'a> {
    pub uri: &'a str,
    pub blocks: &'a [Block],
    pub text_outside_of_blocks: &'a [TextOutsideOfBlocks],
    pub settings: &'a DiagnosticSettings,
}

pub type Rule = fn(&RuleContext<'_>) -> Vec<Diagnostic>;

/// Run every rule against a parsed document.
pub fn run_rules(uri: &str, parsed: &ParsedDocument, settings: &DiagnosticSettings) -> Vec<Diagnostic> {
    if !settings.enabled {
        return Vec::new();
    }
    let context = RuleContext {
        uri,
        blocks: &parsed.blocks,
        text_outside_of_blocks: &parsed.text_outside_of_blocks,
        settings,
    };
    RULES.iter().flat_map(|rule| rule(&context)).collect()
}

pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics
        .iter()
        .any(|diagnostic| diagnostic.severity == Severity::Error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockNameSettings;
    use crate::parser::{ConfiguredBlockNames, parse};

    #[test]
    fn disabled_settings_produce_nothing() {
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let parsed = parse("stray text", &names).unwrap();
        let settings = DiagnosticSettings {
            enabled: false,
            required_blocks: vec!["meta".to_string()],
        };
        assert!(run_rules("file:///a.bru", &parsed, &settings).is_empty());
    }

    #[test]
    fn well_formed_file_is_clean() {
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let text = "# comment\nmeta {\n  name: ok\n}\n\nget {\n  url: https://example.com\n}\n";
        let parsed = parse(text, &names).unwrap();
        let diagnostics = run_rules("file:///a.bru", &parsed, &DiagnosticSettings::default());
        assert_eq!(diagnostics, Vec::new());
        assert!(!has_errors(&diagnostics));
    }
}
