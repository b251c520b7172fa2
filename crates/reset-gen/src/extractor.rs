//! Go source parser that extracts package-level declarations.
//!
//! Files are parsed with tree-sitter-go and lowered into the [`ast`](crate::ast)
//! model. Doc comments are reconstructed from the comment nodes that sit
//! directly above a declaration or a grouped spec, with no blank line between.

use std::path::PathBuf;

use tree_sitter::{Node, Parser, Point};

use crate::ast::{
    ChanDir, CommentGroup, Decl, Expr, FieldDecl, File, FuncDecl, FuncType, GenDecl, ImportSpec,
    InterfaceElem, Receiver, TypeSpec,
};
use crate::error::LoadError;

/// A reusable tree-sitter parser configured for Go.
pub struct GoParser {
    parser: Parser,
}

impl GoParser {
    pub fn new() -> Result<Self, LoadError> {
        let mut parser = Parser::new();
        parser.set_language(&tree_sitter_go::LANGUAGE.into())?;
        Ok(Self { parser })
    }

    /// Parse one Go source file.
    ///
    /// Any syntax error is reported with its 1-based position.
    pub fn parse_file(&mut self, path: impl Into<PathBuf>, source: &str) -> Result<File, LoadError> {
        let path = path.into();
        let Some(tree) = self.parser.parse(source, None) else {
            return Err(LoadError::Parse { file: path });
        };

        let root = tree.root_node();
        if root.has_error() {
            let at = first_error(root).unwrap_or_else(|| root.start_position());
            return Err(LoadError::Syntax {
                file: path,
                line: at.row + 1,
                column: at.column + 1,
            });
        }

        let extractor = Extractor {
            source: source.as_bytes(),
        };
        extractor.file(root, path)
    }
}

fn first_error(node: Node) -> Option<Point> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position());
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    let children: Vec<Node> = node.children(&mut cursor).collect();
    children.into_iter().find_map(first_error)
}

/// Whether the file opts out of every build with `//go:build ignore`.
pub fn has_ignore_constraint(source: &str) -> bool {
    source
        .lines()
        .map(str::trim)
        .take_while(|line| !line.starts_with("package "))
        .filter_map(|line| line.strip_prefix("//go:build "))
        .any(|expr| expr.split_whitespace().any(|term| term == "ignore"))
}

struct Extractor<'a> {
    source: &'a [u8],
}

impl<'a> Extractor<'a> {
    fn text(&self, node: Node) -> &'a str {
        node.utf8_text(self.source).unwrap_or_default()
    }

    fn file(&self, root: Node, path: PathBuf) -> Result<File, LoadError> {
        let mut file = File {
            path,
            ..File::default()
        };

        let mut cursor = root.walk();
        for child in root.named_children(&mut cursor) {
            match child.kind() {
                "package_clause" => file.package = self.package_name(child),
                "import_declaration" => self.imports(child, &mut file.imports),
                "type_declaration" => file.decls.push(Decl::Type(self.type_decl(child))),
                "function_declaration" | "method_declaration" => {
                    file.decls.push(Decl::Func(self.func_decl(child)));
                }
                "var_declaration" => file.decls.push(Decl::Var(self.value_names(child, "var_spec"))),
                "const_declaration" => {
                    file.decls.push(Decl::Const(self.value_names(child, "const_spec")));
                }
                _ => {}
            }
        }

        if file.package.is_empty() {
            return Err(LoadError::MissingPackageClause { file: file.path });
        }
        Ok(file)
    }

    fn package_name(&self, node: Node) -> String {
        // tree-sitter-go uses package_identifier as a child node, not a field
        let mut cursor = node.walk();
        node.named_children(&mut cursor)
            .find(|child| child.kind() == "package_identifier")
            .map(|child| self.text(child).to_string())
            .unwrap_or_default()
    }

    fn imports(&self, node: Node, imports: &mut Vec<ImportSpec>) {
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            match child.kind() {
                "import_spec_list" => self.imports(child, imports),
                "import_spec" => {
                    let Some(path) = child.child_by_field_name("path") else {
                        continue;
                    };
                    let path = self.text(path).trim_matches(|c| c == '"' || c == '`');
                    if path.is_empty() {
                        continue;
                    }
                    imports.push(ImportSpec {
                        name: child
                            .child_by_field_name("name")
                            .map(|name| self.text(name).to_string()),
                        path: path.to_string(),
                    });
                }
                _ => {}
            }
        }
    }

    /// Comment lines directly above `node`, in source order.
    fn doc_comment(&self, node: Node) -> Option<CommentGroup> {
        let mut lines = Vec::new();
        let mut next_row = node.start_position().row;
        let mut prev = node.prev_sibling();

        while let Some(comment) = prev {
            if comment.kind() != "comment" || comment.end_position().row + 1 != next_row {
                break;
            }
            if is_trailing_comment(comment) {
                break;
            }
            lines.push(self.text(comment).trim_end().to_string());
            next_row = comment.start_position().row;
            prev = comment.prev_sibling();
        }

        if lines.is_empty() {
            return None;
        }
        lines.reverse();
        Some(CommentGroup { lines })
    }

    fn type_decl(&self, node: Node) -> GenDecl {
        let mut decl = GenDecl {
            doc: self.doc_comment(node),
            ..GenDecl::default()
        };

        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            match child.kind() {
                "(" => decl.grouped = true,
                "type_spec" | "type_alias" => decl.specs.push(self.type_spec(child)),
                _ => {}
            }
        }
        decl
    }

    fn type_spec(&self, node: Node) -> TypeSpec {
        let name = node.child_by_field_name("name");
        TypeSpec {
            doc: self.doc_comment(node),
            name: name.map(|n| self.text(n).to_string()).unwrap_or_default(),
            type_params: node
                .child_by_field_name("type_parameters")
                .map(|list| self.type_param_names(list))
                .unwrap_or_default(),
            alias: node.kind() == "type_alias",
            ty: self.field_expr(node, "type"),
            line: name.unwrap_or(node).start_position().row + 1,
        }
    }

    fn type_param_names(&self, list: Node) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = list.walk();
        for param in list.named_children(&mut cursor) {
            let mut names_cursor = param.walk();
            names.extend(
                param
                    .children_by_field_name("name", &mut names_cursor)
                    .map(|n| self.text(n).to_string()),
            );
        }
        names
    }

    fn func_decl(&self, node: Node) -> FuncDecl {
        FuncDecl {
            recv: node
                .child_by_field_name("receiver")
                .and_then(|list| self.receiver(list)),
            name: node
                .child_by_field_name("name")
                .map(|n| self.text(n).to_string())
                .unwrap_or_default(),
            sig: self.signature(node),
        }
    }

    fn receiver(&self, list: Node) -> Option<Receiver> {
        let mut cursor = list.walk();
        let param = list
            .named_children(&mut cursor)
            .find(|child| child.kind() == "parameter_declaration")?;

        let mut ty = param.child_by_field_name("type")?;
        let mut pointer = false;
        loop {
            match ty.kind() {
                "pointer_type" => {
                    pointer = true;
                    ty = first_named(ty)?;
                }
                "parenthesized_type" => ty = first_named(ty)?,
                "generic_type" => ty = ty.child_by_field_name("type")?,
                "type_identifier" | "identifier" => break,
                _ => return None,
            }
        }

        Some(Receiver {
            type_name: self.text(ty).to_string(),
            pointer,
        })
    }

    fn value_names(&self, node: Node, spec_kind: &str) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = node.walk();
        for child in node.named_children(&mut cursor) {
            if child.kind() == spec_kind {
                let mut names_cursor = child.walk();
                names.extend(
                    child
                        .children_by_field_name("name", &mut names_cursor)
                        .map(|n| self.text(n).to_string()),
                );
            } else if child.kind().ends_with("_spec_list") {
                names.extend(self.value_names(child, spec_kind));
            }
        }
        names
    }

    fn field_expr(&self, node: Node, field: &str) -> Expr {
        node.child_by_field_name(field)
            .map(|child| self.expr(child))
            .unwrap_or_else(|| Expr::Other(String::new()))
    }

    fn expr(&self, node: Node) -> Expr {
        match node.kind() {
            "type_identifier" | "identifier" => Expr::Ident(self.text(node).to_string()),
            "qualified_type" => Expr::Qualified {
                package: node
                    .child_by_field_name("package")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
                name: node
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
            },
            "pointer_type" => Expr::Pointer(Box::new(self.first_named_expr(node))),
            "slice_type" => Expr::Slice(Box::new(self.field_expr(node, "element"))),
            "array_type" => Expr::Array {
                len: node
                    .child_by_field_name("length")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default(),
                elem: Box::new(self.field_expr(node, "element")),
            },
            "implicit_length_array_type" => Expr::Array {
                len: "...".to_string(),
                elem: Box::new(self.field_expr(node, "element")),
            },
            "map_type" => Expr::Map {
                key: Box::new(self.field_expr(node, "key")),
                value: Box::new(self.field_expr(node, "value")),
            },
            "channel_type" => Expr::Chan {
                dir: channel_dir(node),
                elem: Box::new(self.field_expr(node, "value")),
            },
            "function_type" => Expr::Func(self.signature(node)),
            "struct_type" => Expr::Struct(self.struct_fields(node)),
            "interface_type" => Expr::Interface(self.interface_elems(node)),
            "generic_type" => Expr::Generic {
                base: Box::new(self.field_expr(node, "type")),
                args: node
                    .child_by_field_name("type_arguments")
                    .map(|args| self.type_args(args))
                    .unwrap_or_default(),
            },
            "parenthesized_type" => self.first_named_expr(node),
            "type_elem" | "constraint_elem" => {
                let terms = named_children(node);
                match terms.as_slice() {
                    [single] => self.expr(*single),
                    _ => Expr::Other(self.text(node).to_string()),
                }
            }
            _ => Expr::Other(self.text(node).to_string()),
        }
    }

    fn first_named_expr(&self, node: Node) -> Expr {
        first_named(node)
            .map(|child| self.expr(child))
            .unwrap_or_else(|| Expr::Other(self.text(node).to_string()))
    }

    fn type_args(&self, node: Node) -> Vec<Expr> {
        named_children(node)
            .into_iter()
            .map(|arg| self.expr(arg))
            .collect()
    }

    fn struct_fields(&self, node: Node) -> Vec<FieldDecl> {
        let Some(list) = named_children(node)
            .into_iter()
            .find(|child| child.kind() == "field_declaration_list")
        else {
            return Vec::new();
        };

        let mut fields = Vec::new();
        for decl in named_children(list) {
            if decl.kind() != "field_declaration" {
                continue;
            }

            let mut cursor = decl.walk();
            let names: Vec<String> = decl
                .children_by_field_name("name", &mut cursor)
                .map(|n| self.text(n).to_string())
                .collect();

            let mut ty = self.field_expr(decl, "type");
            if names.is_empty() && has_token(decl, "*") {
                ty = Expr::Pointer(Box::new(ty));
            }

            fields.push(FieldDecl {
                names,
                ty,
                tag: decl
                    .child_by_field_name("tag")
                    .map(|tag| self.text(tag).to_string()),
            });
        }
        fields
    }

    fn interface_elems(&self, node: Node) -> Vec<InterfaceElem> {
        let mut elems = Vec::new();
        for child in named_children(node) {
            let elem = match child.kind() {
                "method_elem" | "method_spec" => InterfaceElem::Method {
                    name: child
                        .child_by_field_name("name")
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_default(),
                    sig: self.signature(child),
                },
                "type_elem" | "constraint_elem" => {
                    let terms = named_children(child);
                    match terms.as_slice() {
                        [single] if single.kind() != "negated_type" => {
                            InterfaceElem::Embed(self.expr(*single))
                        }
                        _ => InterfaceElem::Constraint,
                    }
                }
                "type_identifier" | "qualified_type" | "generic_type" => {
                    InterfaceElem::Embed(self.expr(child))
                }
                "interface_type_name" => InterfaceElem::Embed(self.first_named_expr(child)),
                _ => InterfaceElem::Constraint,
            };
            elems.push(elem);
        }
        elems
    }

    fn signature(&self, node: Node) -> FuncType {
        let mut sig = FuncType::default();
        if let Some(params) = node.child_by_field_name("parameters") {
            sig.params = self.params(params, &mut sig.variadic);
        }
        if let Some(result) = node.child_by_field_name("result") {
            sig.results = if result.kind() == "parameter_list" {
                self.params(result, &mut false)
            } else {
                vec![self.expr(result)]
            };
        }
        sig
    }

    fn params(&self, list: Node, variadic: &mut bool) -> Vec<Expr> {
        let mut params = Vec::new();
        for param in named_children(list) {
            let is_variadic = match param.kind() {
                "parameter_declaration" => false,
                "variadic_parameter_declaration" => true,
                _ => continue,
            };

            let mut ty = self.field_expr(param, "type");
            if is_variadic {
                *variadic = true;
                ty = Expr::Slice(Box::new(ty));
            }

            let mut cursor = param.walk();
            let count = param.children_by_field_name("name", &mut cursor).count().max(1);
            params.extend(std::iter::repeat_n(ty, count));
        }
        params
    }
}

/// A comment sharing its line with the end of the preceding declaration.
///
/// Terminator tokens are skipped: a `\n` terminator ends on the following row.
fn is_trailing_comment(comment: Node) -> bool {
    comment.prev_named_sibling().is_some_and(|prev| {
        prev.kind() != "comment" && prev.end_position().row == comment.start_position().row
    })
}

fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

fn first_named(node: Node) -> Option<Node> {
    named_children(node).into_iter().next()
}

fn has_token(node: Node, token: &str) -> bool {
    let mut cursor = node.walk();
    let found = node
        .children(&mut cursor)
        .any(|child| !child.is_named() && child.kind() == token);
    found
}

fn channel_dir(node: Node) -> ChanDir {
    let mut cursor = node.walk();
    let tokens: Vec<&str> = node
        .children(&mut cursor)
        .filter(|child| !child.is_named())
        .map(|child| child.kind())
        .collect();
    match tokens.as_slice() {
        ["<-", ..] => ChanDir::Recv,
        [_, "<-", ..] => ChanDir::Send,
        _ => ChanDir::Both,
    }
}
