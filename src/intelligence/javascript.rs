//! Syntax-only JavaScript intelligence.
//!
//! Declarations are collected with a tree-sitter query and resolved by
//! lexical scope: among same-named declarations whose scope encloses the
//! reference, the innermost scope wins, then the closest preceding one.
//! Script globals provided by the request runtime are known by name.

use tree_sitter::{Language, Node, Parser, Query, QueryCursor, QueryError, StreamingIterator, Tree};

use crate::text::{LineDocument, Range};

use super::{
    CandidateKind, CodeIntelligence, CompletionCandidate, Definition, HoverInfo, ShadowRequest,
    SignatureInfo,
};

const LOG_TARGET: &str = "reqfile_ls::intelligence";

const DECLARATIONS: &str = r#"
(variable_declarator name: (identifier) @variable)
(function_declaration name: (identifier) @function)
(formal_parameters (identifier) @parameter)
(formal_parameters (assignment_pattern left: (identifier) @parameter))
(arrow_function parameter: (identifier) @parameter)
(catch_clause parameter: (identifier) @parameter)
"#;

const SCOPE_KINDS: &[&str] = &[
    "program",
    "statement_block",
    "function_declaration",
    "function_expression",
    "arrow_function",
    "method_definition",
    "for_statement",
    "for_in_statement",
    "catch_clause",
    "class_body",
];

struct Global {
    name: &'static str,
    detail: &'static str,
    parameters: Option<&'static [&'static str]>,
}

impl Global {
    fn label(&self) -> String {
        match self.parameters {
            Some(parameters) => format!("function {}({})", self.name, parameters.join(", ")),
            None => format!("const {}", self.name),
        }
    }
}

const GLOBALS: &[Global] = &[
    Global {
        name: "bru",
        detail: "Runtime helpers for variables, environments and request flow",
        parameters: None,
    },
    Global {
        name: "req",
        detail: "The outgoing request",
        parameters: None,
    },
    Global {
        name: "res",
        detail: "The received response",
        parameters: None,
    },
    Global {
        name: "test",
        detail: "Register a named test case",
        parameters: Some(&["name", "callback"]),
    },
    Global {
        name: "expect",
        detail: "Start an assertion chain on a value",
        parameters: Some(&["value"]),
    },
];

fn global(name: &str) -> Option<&'static Global> {
    GLOBALS.iter().find(|global| global.name == name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclarationKind {
    Variable,
    Function,
    Parameter,
}

struct Declaration<'t> {
    name: String,
    kind: DeclarationKind,
    node: Node<'t>,
    scope: Node<'t>,
}

impl Declaration<'_> {
    fn label(&self, text: &str) -> String {
        match self.kind {
            DeclarationKind::Function => {
                let parameters = self
                    .node
                    .parent()
                    .and_then(|function| function.child_by_field_name("parameters"))
                    .and_then(|parameters| parameters.utf8_text(text.as_bytes()).ok())
                    .unwrap_or("()");
                format!("function {}{}", self.name, parameters)
            }
            DeclarationKind::Variable => {
                let keyword = self
                    .node
                    .parent()
                    .and_then(|declarator| declarator.parent())
                    .and_then(|declaration| declaration.child(0))
                    .map(|keyword| keyword.kind())
                    .unwrap_or("let");
                format!("{} {}", keyword, self.name)
            }
            DeclarationKind::Parameter => format!("(parameter) {}", self.name),
        }
    }

    fn parameter_names(&self, text: &str) -> Vec<String> {
        let Some(parameters) = self
            .node
            .parent()
            .and_then(|function| function.child_by_field_name("parameters"))
        else {
            return Vec::new();
        };
        let mut cursor = parameters.walk();
        parameters
            .named_children(&mut cursor)
            .filter_map(|parameter| parameter.utf8_text(text.as_bytes()).ok())
            .map(str::to_string)
            .collect()
    }
}

fn encloses(node: Node<'_>, offset: usize) -> bool {
    node.start_byte() <= offset && offset <= node.end_byte()
}

fn declaration_scope(node: Node<'_>, kind: DeclarationKind) -> Option<Node<'_>> {
    let mut current = node.parent()?;
    if kind == DeclarationKind::Function {
        // A function's name belongs to the scope around the function
        current = current.parent()?;
    }
    loop {
        if SCOPE_KINDS.contains(&current.kind()) {
            return Some(current);
        }
        current = current.parent()?;
    }
}

fn resolve<'d, 't>(
    declarations: &'d [Declaration<'t>],
    name: &str,
    offset: usize,
) -> Option<&'d Declaration<'t>> {
    declarations
        .iter()
        .filter(|declaration| declaration.name == name && encloses(declaration.scope, offset))
        .min_by_key(|declaration| {
            let start = declaration.node.start_byte();
            (
                declaration.scope.byte_range().len(),
                start > offset,
                offset.abs_diff(start),
            )
        })
}

fn identifier_at(tree: &Tree, offset: usize) -> Option<Node<'_>> {
    let root = tree.root_node();
    let at = |offset| {
        root.named_descendant_for_byte_range(offset, offset)
            .filter(|node| node.kind() == "identifier")
    };
    // The cursor may sit right after the identifier
    at(offset).or_else(|| offset.checked_sub(1).and_then(at))
}

fn node_range(document: &LineDocument, node: Node<'_>) -> Range {
    Range::new(
        document.position_at(node.start_byte()),
        document.position_at(node.end_byte()),
    )
}

/// Tree-sitter backed intelligence that needs no external engine.
pub struct SyntaxIntelligence {
    language: Language,
    declarations: Query,
}

impl std::fmt::Debug for SyntaxIntelligence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntaxIntelligence")
            .field("patterns", &self.declarations.pattern_count())
            .finish()
    }
}

impl SyntaxIntelligence {
    pub fn new() -> Result<Self, QueryError> {
        let language: Language = tree_sitter_javascript::LANGUAGE.into();
        let declarations = Query::new(&language, DECLARATIONS)?;
        Ok(Self {
            language,
            declarations,
        })
    }

    fn parse(&self, text: &str) -> Option<Tree> {
        let mut parser = Parser::new();
        if let Err(err) = parser.set_language(&self.language) {
            log::warn!(target: LOG_TARGET, "JavaScript grammar unavailable: {}", err);
            return None;
        }
        parser.parse(text, None)
    }

    fn collect_declarations<'t>(&self, tree: &'t Tree, text: &str) -> Vec<Declaration<'t>> {
        let capture_names = self.declarations.capture_names();
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.declarations, tree.root_node(), text.as_bytes());
        let mut declarations = Vec::new();

        while let Some(found) = matches.next() {
            for capture in found.captures {
                let kind = match capture_names[capture.index as usize] {
                    "function" => DeclarationKind::Function,
                    "parameter" => DeclarationKind::Parameter,
                    _ => DeclarationKind::Variable,
                };
                let node = capture.node;
                let Ok(name) = node.utf8_text(text.as_bytes()) else {
                    continue;
                };
                let Some(scope) = declaration_scope(node, kind) else {
                    continue;
                };
                declarations.push(Declaration {
                    name: name.to_string(),
                    kind,
                    node,
                    scope,
                });
            }
        }
        declarations
    }

    fn hover_at(&self, request: &ShadowRequest) -> Option<HoverInfo> {
        let text = request.shadow_text.as_str();
        let document = LineDocument::new(text);
        let offset = document.offset_at(request.position);
        let tree = self.parse(text)?;
        let node = identifier_at(&tree, offset)?;
        let name = node.utf8_text(text.as_bytes()).ok()?;
        let declarations = self.collect_declarations(&tree, text);

        let contents = if let Some(declaration) = resolve(&declarations, name, offset) {
            format!("```javascript\n{}\n```", declaration.label(text))
        } else {
            let global = global(name)?;
            format!("```javascript\n{}\n```\n{}", global.label(), global.detail)
        };
        Some(HoverInfo {
            contents,
            range: Some(node_range(&document, node)),
        })
    }

    fn completion_at(&self, request: &ShadowRequest) -> Vec<CompletionCandidate> {
        let text = request.shadow_text.as_str();
        let document = LineDocument::new(text);
        let offset = document.offset_at(request.position);
        let mut candidates: Vec<CompletionCandidate> = Vec::new();

        if let Some(tree) = self.parse(text) {
            let mut declarations = self.collect_declarations(&tree, text);
            declarations.retain(|declaration| encloses(declaration.scope, offset));
            declarations.sort_by_key(|declaration| declaration.scope.byte_range().len());
            for declaration in &declarations {
                if candidates.iter().any(|candidate| candidate.label == declaration.name) {
                    continue;
                }
                let kind = match declaration.kind {
                    DeclarationKind::Function => CandidateKind::Function,
                    _ => CandidateKind::Variable,
                };
                candidates.push(CompletionCandidate {
                    label: declaration.name.clone(),
                    kind,
                    detail: Some(declaration.label(text)),
                });
            }
        }

        for global in GLOBALS {
            if candidates.iter().any(|candidate| candidate.label == global.name) {
                continue;
            }
            let kind = if global.parameters.is_some() {
                CandidateKind::Function
            } else {
                CandidateKind::Module
            };
            candidates.push(CompletionCandidate {
                label: global.name.to_string(),
                kind,
                detail: Some(global.detail.to_string()),
            });
        }
        candidates
    }

    fn definition_at(&self, request: &ShadowRequest) -> Vec<Definition> {
        let text = request.shadow_text.as_str();
        let document = LineDocument::new(text);
        let offset = document.offset_at(request.position);
        let Some(tree) = self.parse(text) else {
            return Vec::new();
        };
        let Some(node) = identifier_at(&tree, offset) else {
            return Vec::new();
        };
        let Ok(name) = node.utf8_text(text.as_bytes()) else {
            return Vec::new();
        };
        let declarations = self.collect_declarations(&tree, text);
        resolve(&declarations, name, offset)
            .map(|declaration| Definition {
                path: request.shadow_path.clone(),
                range: node_range(&document, declaration.node),
            })
            .into_iter()
            .collect()
    }

    fn signature_at(&self, request: &ShadowRequest) -> Option<SignatureInfo> {
        let text = request.shadow_text.as_str();
        let document = LineDocument::new(text);
        let offset = document.offset_at(request.position);
        let tree = self.parse(text)?;

        let mut node = tree.root_node().descendant_for_byte_range(offset, offset)?;
        let (callee, arguments) = loop {
            if node.kind() == "call_expression"
                && let (Some(callee), Some(arguments)) = (
                    node.child_by_field_name("function"),
                    node.child_by_field_name("arguments"),
                )
                && arguments.start_byte() < offset
                && offset < arguments.end_byte()
            {
                break (callee, arguments);
            }
            node = node.parent()?;
        };
        if callee.kind() != "identifier" {
            return None;
        }
        let name = callee.utf8_text(text.as_bytes()).ok()?;

        let mut cursor = arguments.walk();
        let active_parameter = arguments
            .children(&mut cursor)
            .filter(|child| child.kind() == "," && child.start_byte() < offset)
            .count() as u32;

        let declarations = self.collect_declarations(&tree, text);
        let (label, parameters) = match resolve(&declarations, name, callee.start_byte()) {
            Some(declaration) if declaration.kind == DeclarationKind::Function => {
                let parameters = declaration.parameter_names(text);
                (format!("{}({})", name, parameters.join(", ")), parameters)
            }
            Some(_) => return None,
            None => {
                let parameters = global(name)?.parameters?;
                (
                    format!("{}({})", name, parameters.join(", ")),
                    parameters.iter().map(|p| p.to_string()).collect(),
                )
            }
        };
        Some(SignatureInfo {
            label,
            parameters,
            active_parameter,
        })
    }
}

impl CodeIntelligence for SyntaxIntelligence {
    async fn hover(&self, request: &ShadowRequest) -> Option<HoverInfo> {
        self.hover_at(request)
    }

    async fn completion(&self, request: &ShadowRequest) -> Vec<CompletionCandidate> {
        self.completion_at(request)
    }

    async fn definition(&self, request: &ShadowRequest) -> Vec<Definition> {
        self.definition_at(request)
    }

    async fn signature_help(&self, request: &ShadowRequest) -> Option<SignatureInfo> {
        self.signature_at(request)
    }
}
