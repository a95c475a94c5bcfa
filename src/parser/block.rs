//! Block tree produced by the parser.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::embedded::SyntaxSpan;
use crate::text::Range;

use super::names::BlockKind;

/// A named, bracket-delimited region of a request file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Block {
    pub name: String,
    pub name_range: Range,
    /// Opening line start through the end of the closing line.
    pub range: Range,
    /// Everything between the opening and closing bracket lines.
    pub content_range: Range,
    pub content: BlockContent,
}

impl Block {
    pub fn kind(&self) -> BlockKind {
        match self.content {
            BlockContent::Dictionary(_) => BlockKind::Dictionary,
            BlockContent::Array(_) => BlockKind::Array,
            BlockContent::PlainText(_) => BlockKind::PlainText,
            BlockContent::Json(_) => BlockKind::Json,
            BlockContent::Code(_) => BlockKind::Code,
        }
    }

    /// Simple `key: value` fields of a dictionary block, in source order.
    pub fn fields(&self) -> impl Iterator<Item = &DictionaryField> {
        let items: &[DictionaryItem] = match &self.content {
            BlockContent::Dictionary(items) => items,
            _ => &[],
        };
        items.iter().filter_map(|item| match item {
            DictionaryItem::Field(field) => Some(field),
            _ => None,
        })
    }

    /// First simple field with the given key.
    pub fn field(&self, key: &str) -> Option<&DictionaryField> {
        self.fields().find(|field| field.key == key)
    }

    /// Lines inside the block that did not match the block's grammar.
    pub fn plain_text_lines(&self) -> Vec<&PlainTextLine> {
        match &self.content {
            BlockContent::Dictionary(items) => items
                .iter()
                .filter_map(|item| match item {
                    DictionaryItem::PlainText(line) => Some(line),
                    _ => None,
                })
                .collect(),
            BlockContent::Array(items) => items
                .iter()
                .filter_map(|item| match item {
                    ArrayItem::PlainText(line) => Some(line),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Raw text of plain-text, JSON and code blocks.
    pub fn text(&self) -> Option<&str> {
        match &self.content {
            BlockContent::PlainText(text) | BlockContent::Json(text) => Some(text),
            BlockContent::Code(code) => Some(&code.text),
            _ => None,
        }
    }

    pub fn code(&self) -> Option<&CodeBlockContent> {
        match &self.content {
            BlockContent::Code(code) => Some(code),
            _ => None,
        }
    }
}

/// Structured content of a block, decided once at parse time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BlockContent {
    Dictionary(Vec<DictionaryItem>),
    Array(Vec<ArrayItem>),
    PlainText(String),
    Json(String),
    Code(CodeBlockContent),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DictionaryItem {
    Field(DictionaryField),
    ArrayField(ArrayValuedField),
    PlainText(PlainTextLine),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DictionaryField {
    pub key: String,
    pub value: String,
    pub key_range: Range,
    pub value_range: Range,
}

/// `key: [` followed by entry lines and a closing `]` line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayValuedField {
    pub key: String,
    pub key_range: Range,
    pub values: Vec<ArrayEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ArrayItem {
    Entry(ArrayEntry),
    PlainText(PlainTextLine),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArrayEntry {
    pub entry: String,
    pub entry_range: Range,
}

/// A line inside a structured block that did not match its grammar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlainTextLine {
    pub text: String,
    pub range: Range,
}

/// Body of an embedded-code block plus its syntax handle.
#[derive(Clone, Serialize)]
pub struct CodeBlockContent {
    pub text: String,
    #[serde(skip)]
    pub syntax: Option<Arc<dyn SyntaxSpan>>,
}

impl CodeBlockContent {
    pub fn new(text: String, syntax: Option<Arc<dyn SyntaxSpan>>) -> Self {
        Self { text, syntax }
    }
}

// The syntax handle is derived from `text`, so equality on text is enough.
impl PartialEq for CodeBlockContent {
    fn eq(&self, other: &Self) -> bool {
        self.text == other.text
    }
}

impl fmt::Debug for CodeBlockContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeBlockContent")
            .field("text", &self.text)
            .field("has_syntax", &self.syntax.is_some())
            .finish()
    }
}

/// Source text not claimed by any block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextOutsideOfBlocks {
    pub text: String,
    pub range: Range,
}

/// Result of parsing a request file.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ParsedDocument {
    pub blocks: Vec<Block>,
    pub text_outside_of_blocks: Vec<TextOutsideOfBlocks>,
}

impl ParsedDocument {
    pub fn block(&self, name: &str) -> Option<&Block> {
        self.blocks.iter().find(|block| block.name == name)
    }

    pub fn code_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|block| block.kind() == BlockKind::Code)
    }

    /// Block whose full range contains `position`.
    pub fn block_at(&self, position: crate::text::Position) -> Option<&Block> {
        self.blocks
            .iter()
            .find(|block| block.range.contains(position))
    }
}
