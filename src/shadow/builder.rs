//! Shadow document layout.
//!
//! ```text
//! // Generated from <source>. Do not edit.
//!
//! function script_pre_request() {
//! <block content>
//! }
//!
//! function tests() {
//! <block content>
//! }
//! ```
//!
//! Each code block's content is copied verbatim, so a line inside a function
//! body corresponds one-to-one to a line of the block's content range.

use crate::parser::{Block, BlockKind};

/// Function name for a block: every non-alphanumeric character becomes `_`.
pub fn function_name(block_name: &str) -> String {
    block_name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch } else { '_' })
        .collect()
}

/// The line that opens a block's function in the shadow document.
pub fn function_header(block_name: &str) -> String {
    format!("function {}() {{", function_name(block_name))
}

/// Build the shadow document for the code blocks among `blocks`.
pub fn build_shadow_document(source_name: &str, blocks: &[Block]) -> String {
    let mut document = format!("// Generated from {}. Do not edit.\n", source_name);

    for block in blocks.iter().filter(|block| block.kind() == BlockKind::Code) {
        let Some(code) = block.code() else {
            continue;
        };
        document.push('\n');
        document.push_str(&function_header(&block.name));
        document.push('\n');
        document.push_str(&code.text);
        document.push_str("\n}\n");
    }

    document
}
