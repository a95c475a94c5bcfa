//! Push diagnostics for request files.
//!
//! Rule findings are published on every open and change. A parser logic
//! inconsistency is not a finding about the user's file, so it is surfaced
//! through `window/showMessage` and the published set is cleared.

use std::str::FromStr;

use tower_lsp_server::ls_types::*;
use url::Url;

use crate::diagnostics::{self, Severity, run_rules};
use crate::intelligence::CodeIntelligence;
use crate::lsp::documents::DocumentState;

use super::super::{ReqfileLs, url_to_uri};

const LOG_TARGET: &str = "reqfile_ls::publish_diagnostic";
const SOURCE: &str = "reqfile-ls";

fn to_lsp_severity(severity: Severity) -> DiagnosticSeverity {
    match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
        Severity::Information => DiagnosticSeverity::INFORMATION,
        Severity::Hint => DiagnosticSeverity::HINT,
    }
}

fn to_lsp_diagnostic(diagnostic: &diagnostics::Diagnostic) -> Diagnostic {
    let related_information: Vec<DiagnosticRelatedInformation> = diagnostic
        .related_information
        .iter()
        .filter_map(|related| {
            Some(DiagnosticRelatedInformation {
                location: Location::new(Uri::from_str(&related.uri).ok()?, related.range.into()),
                message: related.message.clone(),
            })
        })
        .collect();

    Diagnostic {
        range: diagnostic.range.into(),
        severity: Some(to_lsp_severity(diagnostic.severity)),
        code: Some(NumberOrString::String(diagnostic.code.to_string())),
        source: Some(SOURCE.to_string()),
        message: diagnostic.message.clone(),
        related_information: (!related_information.is_empty()).then_some(related_information),
        ..Diagnostic::default()
    }
}

impl<C: CodeIntelligence> ReqfileLs<C> {
    pub(crate) async fn publish_document_diagnostics(&self, url: &Url, state: &DocumentState) {
        let Some(uri) = url_to_uri(url) else {
            log::warn!(target: LOG_TARGET, "Cannot publish diagnostics for {}", url);
            return;
        };

        let diagnostics = match &state.parsed {
            Ok(parsed) => {
                let settings = self.settings_manager.load_settings();
                run_rules(url.as_str(), parsed, &settings.diagnostics)
                    .iter()
                    .map(to_lsp_diagnostic)
                    .collect()
            }
            Err(err) => {
                log::error!(target: LOG_TARGET, "Parser inconsistency in {}: {}", url, err);
                self.client
                    .show_message(MessageType::ERROR, format!("reqfile-ls: {}", err))
                    .await;
                Vec::new()
            }
        };

        log::debug!(
            target: LOG_TARGET,
            "Publishing {} diagnostics for {}",
            diagnostics.len(),
            url
        );
        self.client
            .publish_diagnostics(uri, diagnostics, state.version)
            .await;
    }
}
