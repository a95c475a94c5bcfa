//! Embedded code inside request files.
//!
//! [`scanner`] finds where a code block ends without a full parse, and
//! [`syntax`] provides the syntax handle later used to navigate into it.

pub mod scanner;
pub mod syntax;

pub use scanner::find_block_end;
pub use syntax::{JavaScriptSyntax, Span, SyntaxSpan};
