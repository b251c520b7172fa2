//! Synthesis of `Reset()` methods.
//!
//! Every field is cleared according to its type:
//!
//! | Type | Statement |
//! |------|-----------|
//! | pointer | `if E != nil { ... }`, delegating to `Reset()` or recursing through `*E` |
//! | slice | `E = E[:0]` |
//! | map | `clear(E)` |
//! | struct | `E.Reset()` when available, else `E = T{}` |
//! | interface | `E.Reset()` when required by the interface, else a checked assertion |
//! | array | `E = T{}` |
//! | basic | zero literal |
//! | opaque named | `Reset()` through `&E` or `E` when available at run time, else `E = *new(T)` |
//! | chan, func, unresolved | `E = nil` |
//!
//! Opaque named types come from packages outside the load, typically the
//! standard library. Their shape is unknown, so the method set is checked at
//! run time instead.

use std::collections::HashSet;

use crate::imports::ImportQualifier;
use crate::types::{Field, InterfaceType, Method, Named, Type, TypeKey, TypeTable};

/// Preferred receiver name of generated methods.
pub const RECEIVER: &str = "obj";

/// [`RECEIVER`], or the first of `obj1`, `obj2`, ... for which `taken` is
/// false. A receiver must not shadow a package-level identifier the body
/// refers to.
pub fn receiver_name(taken: impl Fn(&str) -> bool) -> String {
    if !taken(RECEIVER) {
        return RECEIVER.to_string();
    }
    (1usize..)
        .map(|suffix| format!("{RECEIVER}{suffix}"))
        .find(|name| !taken(name))
        .unwrap_or_else(|| RECEIVER.to_string())
}

/// Nesting bound for pointer chains and embedding walks.
const MAX_DEPTH: usize = 16;

/// Expression naming the value being reset.
#[derive(Debug, Clone)]
struct Operand {
    expr: String,
    deref: bool,
}

impl Operand {
    fn field(receiver: &str, name: &str) -> Self {
        Self {
            expr: format!("{receiver}.{name}"),
            deref: false,
        }
    }

    /// Spelling as an operand of `=`, `!=` or a builtin call.
    fn value(&self) -> String {
        if self.deref {
            format!("*{}", self.expr)
        } else {
            self.expr.clone()
        }
    }

    /// Spelling as the base of a selector, slice or assertion.
    fn primary(&self) -> String {
        if self.deref {
            format!("(*{})", self.expr)
        } else {
            self.expr.clone()
        }
    }

    /// Spelling of `&E`.
    fn address(&self) -> String {
        if self.deref {
            self.expr.clone()
        } else {
            format!("&{}", self.expr)
        }
    }

    fn deref(&self) -> Self {
        Self {
            expr: self.value(),
            deref: true,
        }
    }
}

/// Tab-indented line buffer.
#[derive(Debug, Default)]
struct Block {
    out: String,
    depth: usize,
}

impl Block {
    fn line(&mut self, text: impl AsRef<str>) {
        for _ in 0..self.depth {
            self.out.push('\t');
        }
        self.out.push_str(text.as_ref());
        self.out.push('\n');
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }

    fn open(&mut self, head: impl AsRef<str>) {
        self.line(format!("{} {{", head.as_ref()));
        self.depth += 1;
    }

    fn close(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        self.line("}");
    }

    /// Closes the current branch and opens the next one of the same `if`.
    fn branch(&mut self, head: impl AsRef<str>) {
        self.depth = self.depth.saturating_sub(1);
        self.open(format!("}} {}", head.as_ref()));
    }
}

/// Generates `Reset()` methods for the struct types of one package.
#[derive(Debug)]
pub struct ResetSynthesizer<'a> {
    table: &'a TypeTable,
    /// Types about to receive a generated method.
    pending: &'a HashSet<TypeKey>,
    qualifier: ImportQualifier<'a>,
    receiver: String,
}

impl<'a> ResetSynthesizer<'a> {
    pub fn new(
        table: &'a TypeTable,
        pending: &'a HashSet<TypeKey>,
        qualifier: ImportQualifier<'a>,
    ) -> Self {
        Self {
            table,
            pending,
            qualifier,
            receiver: RECEIVER.to_string(),
        }
    }

    pub fn set_receiver(&mut self, receiver: impl Into<String>) -> &mut Self {
        self.receiver = receiver.into();
        self
    }

    pub fn qualifier(&self) -> &ImportQualifier<'a> {
        &self.qualifier
    }

    pub fn into_qualifier(self) -> ImportQualifier<'a> {
        self.qualifier
    }

    /// The `Reset()` method for `target`, or `None` when it is not a declared
    /// struct type.
    pub fn method(&mut self, target: &Named) -> Option<String> {
        let table = self.table;
        let decl = table.lookup(target)?;
        if decl.alias {
            return None;
        }
        let Some(Type::Struct(st)) = table.underlying(&decl.rhs) else {
            return None;
        };
        let host = decl
            .package
            .as_ref()
            .map(|package| package.path.as_str())
            .unwrap_or_default();

        let receiver = self.receiver.clone();
        let mut block = Block::default();
        block.open(format!("func ({receiver} *{}) Reset()", decl.name));
        block.open(format!("if {receiver} == nil"));
        block.line("return");
        block.close();

        let fields: Vec<&Field> = st
            .fields
            .iter()
            .filter(|field| is_included(field, host))
            .collect();
        if !fields.is_empty() {
            block.blank();
        }
        for field in fields {
            self.reset(&mut block, &Operand::field(&receiver, &field.name), &field.ty, 0);
        }

        block.close();
        Some(block.out)
    }

    fn reset(&mut self, block: &mut Block, op: &Operand, ty: &Type, depth: usize) {
        let table = self.table;
        let Some(underlying) = table.underlying(ty) else {
            self.reset_unresolved(block, op, ty);
            return;
        };
        if depth > MAX_DEPTH {
            let printed = self.qualifier.type_string(ty);
            block.line(format!("{} = *new({printed})", op.value()));
            return;
        }

        match underlying {
            Type::Pointer(elem) => {
                block.open(format!("if {} != nil", op.value()));
                let to_interface = matches!(table.underlying(elem), Some(Type::Interface(_)));
                // Defined pointer types have no selectable methods.
                let defined = matches!(table.unalias(ty), Some(Type::Named(_)));
                if !to_interface && self.has_reset(elem) {
                    let callee = if defined {
                        op.deref().primary()
                    } else {
                        op.primary()
                    };
                    block.line(format!("{callee}.Reset()"));
                } else {
                    self.reset(block, &op.deref(), elem, depth + 1);
                }
                block.close();
            }
            Type::Slice(_) => block.line(format!("{} = {}[:0]", op.value(), op.primary())),
            Type::Map { .. } => block.line(format!("clear({})", op.value())),
            Type::Struct(_) => {
                if self.has_reset(ty) {
                    block.line(format!("{}.Reset()", op.primary()));
                } else {
                    let printed = self.qualifier.type_string(ty);
                    block.line(format!("{} = {printed}{{}}", op.value()));
                }
            }
            Type::Interface(iface) => {
                block.open(format!("if {} != nil", op.value()));
                if self.interface_has_reset(iface, 0) {
                    block.line(format!("{}.Reset()", op.primary()));
                } else {
                    block.open(format!(
                        "if r, ok := {}.(interface{{ Reset() }}); ok",
                        op.primary()
                    ));
                    block.line("r.Reset()");
                    block.close();
                }
                block.close();
            }
            Type::Array { .. } => {
                let printed = self.qualifier.type_string(ty);
                block.line(format!("{} = {printed}{{}}", op.value()));
            }
            Type::Basic(kind) => block.line(format!("{} = {}", op.value(), kind.zero_literal())),
            Type::Chan { .. } | Type::Func(_) => block.line(format!("{} = nil", op.value())),
            Type::TypeParam(_) | Type::Named(_) => {
                let printed = self.qualifier.type_string(ty);
                block.line(format!("{} = *new({printed})", op.value()));
            }
        }
    }

    /// Named types outside the load are reset through whichever `Reset()`
    /// the value has at run time. `&E` comes first so pointer receivers and
    /// in-place value receivers win; `E` then reaches the dynamic value of
    /// an interface. Anything else gets its zero value through `new`.
    fn reset_unresolved(&mut self, block: &mut Block, op: &Operand, ty: &Type) {
        match self.table.unalias(ty) {
            Some(named @ Type::Named(_)) => {
                let printed = self.qualifier.type_string(named);
                block.open(format!(
                    "if r, ok := any({}).(interface{{ Reset() }}); ok",
                    op.address()
                ));
                block.line("r.Reset()");
                block.branch(format!(
                    "else if r, ok := any({}).(interface{{ Reset() }}); ok",
                    op.value()
                ));
                block.line("r.Reset()");
                block.branch("else");
                block.line(format!("{} = *new({printed})", op.value()));
                block.close();
            }
            _ => block.line(format!("{} = nil", op.value())),
        }
    }

    /// Whether `Reset()` is in the method set of `ty` or `*ty`.
    pub fn has_reset(&self, ty: &Type) -> bool {
        self.provides_reset(ty, 0)
    }

    fn provides_reset(&self, ty: &Type, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        let table = self.table;
        let Some(decl) = table.declaration(ty) else {
            return false;
        };
        if self.pending.contains(&decl.key()) {
            return true;
        }
        if decl.methods.iter().any(Method::is_reset) {
            return true;
        }
        if decl.methods.iter().any(|method| method.name == "Reset") {
            return false;
        }

        let Some(Type::Struct(st)) = table.underlying(&decl.rhs) else {
            return false;
        };
        // A field named Reset shadows anything deeper.
        if st.fields.iter().any(|field| field.name == "Reset") {
            return false;
        }
        let promoted = st
            .fields
            .iter()
            .filter(|field| field.embedded && self.embedded_reset(&field.ty, depth + 1))
            .count();
        promoted == 1
    }

    fn embedded_reset(&self, ty: &Type, depth: usize) -> bool {
        let table = self.table;
        let inner = match table.unalias(ty) {
            Some(Type::Pointer(elem)) => elem.as_ref(),
            Some(other) => other,
            None => return false,
        };
        match table.underlying(inner) {
            Some(Type::Interface(iface)) => self.interface_has_reset(iface, depth),
            _ => self.provides_reset(inner, depth),
        }
    }

    /// Whether the interface's method set requires `Reset()`.
    fn interface_has_reset(&self, iface: &InterfaceType, depth: usize) -> bool {
        if depth > MAX_DEPTH {
            return false;
        }
        if iface
            .methods
            .iter()
            .any(|method| method.name == "Reset" && method.sig.is_nullary())
        {
            return true;
        }
        iface.embeds.iter().any(|embed| match self.table.underlying(embed) {
            Some(Type::Interface(inner)) => self.interface_has_reset(inner, depth + 1),
            _ => false,
        })
    }
}

/// Unexported fields are kept only when declared in the host package. Blank
/// fields are never addressable.
fn is_included(field: &Field, host: &str) -> bool {
    if field.name == "_" || field.name.is_empty() {
        return false;
    }
    field.is_exported() || field.package == host
}
