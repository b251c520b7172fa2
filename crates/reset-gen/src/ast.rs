//! Syntax model for the parts of a Go source file the generator looks at.
//!
//! The extractor fills these structures from a tree-sitter parse tree. Only
//! package-level declarations are kept; function bodies and initializer
//! expressions are dropped.

use std::path::PathBuf;

/// One parsed `.go` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct File {
    pub path: PathBuf,
    /// Name from the `package` clause.
    pub package: String,
    pub imports: Vec<ImportSpec>,
    pub decls: Vec<Decl>,
}

/// `import name "path"`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpec {
    /// Explicit local name, including `_` and `.`.
    pub name: Option<String>,
    pub path: String,
}

/// Consecutive comment lines directly above a declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommentGroup {
    pub lines: Vec<String>,
}

impl CommentGroup {
    pub fn new(lines: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether one of the comments is exactly `line` (trailing whitespace ignored).
    pub fn has_line(&self, line: &str) -> bool {
        self.lines.iter().any(|l| l.trim_end() == line)
    }
}

/// A top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decl {
    Type(GenDecl),
    Func(FuncDecl),
    Var(Vec<String>),
    Const(Vec<String>),
}

/// A `type` declaration, either `type T ...` or the grouped `type ( ... )` form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenDecl {
    pub doc: Option<CommentGroup>,
    pub grouped: bool,
    pub specs: Vec<TypeSpec>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub doc: Option<CommentGroup>,
    pub name: String,
    pub type_params: Vec<String>,
    /// `type A = B`
    pub alias: bool,
    pub ty: Expr,
    /// 1-based line of the type name.
    pub line: usize,
}

/// A function or method declaration. Only the signature is retained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub recv: Option<Receiver>,
    pub name: String,
    pub sig: FuncType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receiver {
    /// Base type name with any type arguments stripped.
    pub type_name: String,
    pub pointer: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FuncType {
    /// One entry per parameter; `a, b int` contributes two.
    pub params: Vec<Expr>,
    pub results: Vec<Expr>,
    pub variadic: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDecl {
    /// Empty for an embedded field.
    pub names: Vec<String>,
    pub ty: Expr,
    pub tag: Option<String>,
}

impl FieldDecl {
    pub fn is_embedded(&self) -> bool {
        self.names.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InterfaceElem {
    Method { name: String, sig: FuncType },
    Embed(Expr),
    /// Union or approximation constraint (`~int | string`).
    Constraint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChanDir {
    Both,
    Send,
    Recv,
}

/// A type expression as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Ident(String),
    Qualified { package: String, name: String },
    Pointer(Box<Expr>),
    Slice(Box<Expr>),
    Array { len: String, elem: Box<Expr> },
    Map { key: Box<Expr>, value: Box<Expr> },
    Chan { dir: ChanDir, elem: Box<Expr> },
    Func(FuncType),
    Struct(Vec<FieldDecl>),
    Interface(Vec<InterfaceElem>),
    Generic { base: Box<Expr>, args: Vec<Expr> },
    /// Anything the generator has no use for; kept verbatim.
    Other(String),
}

impl Expr {
    pub fn is_struct(&self) -> bool {
        matches!(self, Expr::Struct(_))
    }

    /// The implicit field name of an embedded field of this type.
    pub fn embedded_name(&self) -> Option<&str> {
        match self {
            Expr::Ident(name) => Some(name),
            Expr::Qualified { name, .. } => Some(name),
            Expr::Pointer(inner) => inner.embedded_name(),
            Expr::Generic { base, .. } => base.embedded_name(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment_group_exact_line() {
        let doc = CommentGroup::new(["// Sample is pooled.", "// generate:reset  "]);
        assert!(doc.has_line("// generate:reset"));
        assert!(!doc.has_line("// generate:Reset"));
    }

    #[test]
    fn test_embedded_name() {
        let ty = Expr::Pointer(Box::new(Expr::Qualified {
            package: "bytes".to_string(),
            name: "Buffer".to_string(),
        }));
        assert_eq!(ty.embedded_name(), Some("Buffer"));

        let generic = Expr::Generic {
            base: Box::new(Expr::Ident("List".to_string())),
            args: vec![Expr::Ident("int".to_string())],
        };
        assert_eq!(generic.embedded_name(), Some("List"));
        assert_eq!(Expr::Slice(Box::new(generic)).embedded_name(), None);
    }
}
