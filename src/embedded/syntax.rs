//! Syntax handles for embedded code blocks.

use tree_sitter::{Parser, Tree};

const LOG_TARGET: &str = "reqfile_ls::embedded";

/// A syntax node located inside a code block, in byte offsets of the code
/// text (not of the request file).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct Span {
    pub kind: String,
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Navigation into the syntax of one embedded code body.
pub trait SyntaxSpan: Send + Sync {
    /// Smallest named node enclosing `offset`, excluding the root.
    fn child_span_containing(&self, offset: usize) -> Option<Span>;
}

/// JavaScript syntax tree of one code block body.
pub struct JavaScriptSyntax {
    tree: Tree,
}

impl JavaScriptSyntax {
    /// Parse a code block body. Returns `None` if the grammar cannot be
    /// loaded; syntax errors still produce a tree.
    pub fn parse(code: &str) -> Option<Self> {
        let mut parser = Parser::new();
        if let Err(err) = parser.set_language(&tree_sitter_javascript::LANGUAGE.into()) {
            log::warn!(target: LOG_TARGET, "JavaScript grammar unavailable: {}", err);
            return None;
        }
        parser.parse(code, None).map(|tree| Self { tree })
    }
}

impl SyntaxSpan for JavaScriptSyntax {
    fn child_span_containing(&self, offset: usize) -> Option<Span> {
        let root = self.tree.root_node();
        if offset > root.end_byte() {
            return None;
        }
        let node = root.named_descendant_for_byte_range(offset, offset)?;
        if node.id() == root.id() {
            return None;
        }
        Some(Span {
            kind: node.kind().to_string(),
            start: node.start_byte(),
            end: node.end_byte(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_identifier_under_offset() {
        let code = "  const total = res.body.count;\n";
        let syntax = JavaScriptSyntax::parse(code).unwrap();
        let offset = code.find("body").unwrap() + 1;
        let span = syntax.child_span_containing(offset).unwrap();
        assert_eq!(span.kind, "property_identifier");
        assert_eq!(&code[span.start..span.end], "body");
    }

    #[test]
    fn whitespace_between_statements_has_no_child() {
        let code = "a();\n\n\nb();";
        let syntax = JavaScriptSyntax::parse(code).unwrap();
        assert!(syntax.child_span_containing(5).is_none());
    }

    #[test]
    fn offset_past_end_is_none() {
        let syntax = JavaScriptSyntax::parse("a();").unwrap();
        assert!(syntax.child_span_containing(100).is_none());
    }
}
