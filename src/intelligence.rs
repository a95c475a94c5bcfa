//! Code intelligence for embedded script blocks.
//!
//! The language server never analyses script code itself. It renders the
//! shadow document, waits until the engine sees it, and asks a
//! [`CodeIntelligence`] implementation about a position in that document.
//! Results carry shadow-document ranges; the caller maps them back.

mod javascript;

use std::future::Future;
use std::path::PathBuf;

use serde::Serialize;

use crate::text::{Position, Range};

pub use javascript::SyntaxIntelligence;

/// A position inside a shadow document, with the text the engine sees.
#[derive(Debug, Clone)]
pub struct ShadowRequest {
    pub shadow_path: PathBuf,
    pub shadow_text: String,
    pub position: Position,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HoverInfo {
    /// Markdown
    pub contents: String,
    pub range: Option<Range>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Variable,
    Function,
    Module,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionCandidate {
    pub label: String,
    pub kind: CandidateKind,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureInfo {
    pub label: String,
    pub parameters: Vec<String>,
    pub active_parameter: u32,
}

/// A definition site, possibly in another file than the shadow document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Definition {
    pub path: PathBuf,
    pub range: Range,
}

/// The engine answering questions about shadow documents.
pub trait CodeIntelligence: Send + Sync + 'static {
    fn hover(&self, request: &ShadowRequest) -> impl Future<Output = Option<HoverInfo>> + Send;

    fn completion(
        &self,
        request: &ShadowRequest,
    ) -> impl Future<Output = Vec<CompletionCandidate>> + Send;

    fn definition(&self, request: &ShadowRequest) -> impl Future<Output = Vec<Definition>> + Send;

    fn signature_help(
        &self,
        request: &ShadowRequest,
    ) -> impl Future<Output = Option<SignatureInfo>> + Send;
}
