//! Signature help method for ReqfileLs.

use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::*;

use crate::intelligence::{CodeIntelligence, SignatureInfo};
use crate::text;

use super::super::ReqfileLs;

fn to_signature_help(info: SignatureInfo) -> SignatureHelp {
    let parameters = info
        .parameters
        .into_iter()
        .map(|parameter| ParameterInformation {
            label: ParameterLabel::Simple(parameter),
            documentation: None,
        })
        .collect();
    SignatureHelp {
        signatures: vec![SignatureInformation {
            label: info.label,
            documentation: None,
            parameters: Some(parameters),
            active_parameter: None,
        }],
        active_signature: Some(0),
        active_parameter: Some(info.active_parameter),
    }
}

impl<C: CodeIntelligence> ReqfileLs<C> {
    pub(crate) async fn signature_help_impl(
        &self,
        params: SignatureHelpParams,
    ) -> Result<Option<SignatureHelp>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = text::Position::from(params.text_document_position_params.position);

        let Some(context) = self.shadow_context(&uri, position).await else {
            return Ok(None);
        };
        Ok(self
            .intelligence
            .signature_help(&context.request)
            .await
            .map(to_signature_help))
    }
}
