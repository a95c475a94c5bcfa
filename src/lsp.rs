//! Language server for request files.
//!
//! Structured blocks are served directly from the parse result. Requests
//! inside script blocks go through the shadow document to a
//! [`CodeIntelligence`](crate::intelligence::CodeIntelligence) engine.

mod documents;
mod lsp_impl;
mod settings_manager;

pub use lsp_impl::ReqfileLs;
