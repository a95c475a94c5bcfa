//! Go-to-definition method for ReqfileLs.

use tower_lsp_server::jsonrpc::Result;
use tower_lsp_server::ls_types::*;
use url::Url;

use crate::intelligence::{CodeIntelligence, Definition};
use crate::text;

use super::super::{ReqfileLs, ShadowContext, url_to_uri};

const LOG_TARGET: &str = "reqfile_ls::definition";

/// Definitions in the shadow document map back into the request file;
/// definitions elsewhere pass through unchanged.
fn to_location(context: &ShadowContext, definition: Definition) -> Option<Location> {
    if definition.path == context.request.shadow_path {
        let range = context.to_source(definition.range)?;
        return Some(Location::new(context.source_uri.clone(), range.into()));
    }
    let url = Url::from_file_path(&definition.path).ok()?;
    Some(Location::new(url_to_uri(&url)?, definition.range.into()))
}

impl<C: CodeIntelligence> ReqfileLs<C> {
    pub(crate) async fn definition_impl(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = text::Position::from(params.text_document_position_params.position);

        let Some(context) = self.shadow_context(&uri, position).await else {
            return Ok(None);
        };
        let definitions = self.intelligence.definition(&context.request).await;
        let total = definitions.len();
        let locations: Vec<Location> = definitions
            .into_iter()
            .filter_map(|definition| to_location(&context, definition))
            .collect();
        if locations.len() < total {
            log::debug!(
                target: LOG_TARGET,
                "Dropped {} unmappable definitions",
                total - locations.len()
            );
        }

        if locations.is_empty() {
            return Ok(None);
        }
        Ok(Some(GotoDefinitionResponse::Array(locations)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BlockNameSettings;
    use crate::intelligence::ShadowRequest;
    use crate::parser::{ConfiguredBlockNames, parse};
    use crate::shadow::build_shadow_document;
    use std::path::PathBuf;
    use std::str::FromStr;

    fn context() -> ShadowContext {
        let source = "meta {\n  name: a\n}\n\ntests {\n  const total = 1;\n  expect(total);\n}\n";
        let names = ConfiguredBlockNames::from_settings(&BlockNameSettings::default());
        let blocks = parse(source, &names).unwrap().blocks;
        let shadow_text = build_shadow_document("a.bru", &blocks);
        ShadowContext {
            source_uri: Uri::from_str("file:///collection/a.bru").unwrap(),
            blocks,
            request: ShadowRequest {
                shadow_path: PathBuf::from("/collection/.reqfile-ls/a.js"),
                shadow_text,
                position: text::Position::new(4, 10),
            },
        }
    }

    #[test]
    fn shadow_definition_maps_into_source() {
        let context = context();
        // Shadow lines: header, blank, `function tests() {`, then the body
        let location = to_location(
            &context,
            Definition {
                path: context.request.shadow_path.clone(),
                range: text::Range::on_line(3, 8, 13),
            },
        )
        .unwrap();
        assert_eq!(location.uri.as_str(), "file:///collection/a.bru");
        assert_eq!(location.range, text::Range::on_line(5, 8, 13).into());
    }

    #[test]
    fn definition_on_generated_line_is_dropped() {
        let context = context();
        let definition = Definition {
            path: context.request.shadow_path.clone(),
            range: text::Range::on_line(2, 9, 14),
        };
        assert!(to_location(&context, definition).is_none());
    }

    #[test]
    fn foreign_definition_passes_through() {
        let context = context();
        let definition = Definition {
            path: PathBuf::from("/collection/lib/helpers.js"),
            range: text::Range::on_line(10, 0, 5),
        };
        let location = to_location(&context, definition).unwrap();
        assert_eq!(location.uri.as_str(), "file:///collection/lib/helpers.js");
        assert_eq!(location.range, text::Range::on_line(10, 0, 5).into());
    }
}
