pub mod config;
pub mod diagnostics;
pub mod embedded;
pub mod error;
pub mod intelligence;
pub mod lsp;
pub mod parser;
pub mod shadow;
pub mod text;
pub mod translate;

pub use config::Settings;
pub use error::{ConfigError, ParseError, ReqlsError, ReqlsResult, ShadowError};
pub use parser::{Block, BlockKind, ParsedDocument, parse};
pub use translate::translate_range;

// Re-export the main server implementation
pub use lsp::ReqfileLs;
