//! Text document related LSP methods.

mod completion;
mod definition;
mod document_symbol;
mod formatting;
mod hover;
mod publish_diagnostic;
mod signature_help;
