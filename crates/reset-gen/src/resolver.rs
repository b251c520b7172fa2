//! Name resolution over the syntax of every loaded package.
//!
//! Produces the shared [`TypeTable`] and one definitions table per package.
//! Resolution is purely declarative: only type declarations, method
//! receivers and package-level names are looked at.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use tracing::debug;

use crate::ast::{self, Decl, Expr, FieldDecl, InterfaceElem};
use crate::types::{
    BasicKind, Field, InterfaceType, Method, MethodSig, Named, Object, PackageRef, Signature,
    StructType, Type, TypeKey, TypeName, TypeTable,
};

/// Parsed but unresolved package, as assembled by a loader.
#[derive(Debug, Clone)]
pub struct SourcePackage {
    pub name: String,
    pub path: String,
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub syntax: Vec<ast::File>,
}

impl SourcePackage {
    pub fn package_ref(&self) -> PackageRef {
        PackageRef::new(self.path.clone(), self.name.clone())
    }
}

/// Output of [`resolve_packages`].
#[derive(Debug)]
pub struct Resolved {
    pub table: TypeTable,
    /// Definitions table per input package, in input order.
    pub defs: Vec<BTreeMap<String, Object>>,
}

/// Resolve every type declaration and method of `packages`.
///
/// References into packages outside the set become opaque named types.
pub fn resolve_packages(packages: &[SourcePackage]) -> Resolved {
    let resolver = Resolver::new(packages);
    let mut table = TypeTable::new();

    for package in packages {
        let package_ref = package.package_ref();
        for file in &package.syntax {
            let scope = resolver.file_scope(&package_ref, file);
            for spec in type_specs(file) {
                let scope = scope.with_type_params(&spec.type_params);
                table.insert(TypeName {
                    package: Some(package_ref.clone()),
                    name: spec.name.clone(),
                    type_params: spec.type_params.clone(),
                    alias: spec.alias,
                    rhs: resolver.resolve(&spec.ty, &scope),
                    methods: Vec::new(),
                });
            }
        }
    }

    // Methods attach once every receiver type is known.
    for package in packages {
        let package_ref = package.package_ref();
        for file in &package.syntax {
            let scope = resolver.file_scope(&package_ref, file);
            for func in funcs(file) {
                let Some(recv) = &func.recv else {
                    continue;
                };
                let key = TypeKey::new(package.path.clone(), recv.type_name.clone());
                let Some(decl) = table.get_mut(&key) else {
                    debug!(receiver = %recv.type_name, method = %func.name, "method on unknown type");
                    continue;
                };
                decl.methods.push(Method {
                    name: func.name.clone(),
                    pointer_receiver: recv.pointer,
                    sig: resolver.signature(&func.sig, &scope),
                });
            }
        }
    }

    let defs = packages
        .iter()
        .map(definitions)
        .collect();

    Resolved { table, defs }
}

fn type_specs(file: &ast::File) -> impl Iterator<Item = &ast::TypeSpec> {
    file.decls
        .iter()
        .filter_map(|decl| match decl {
            Decl::Type(group) => Some(group),
            _ => None,
        })
        .flat_map(|group| group.specs.iter())
}

fn funcs(file: &ast::File) -> impl Iterator<Item = &ast::FuncDecl> {
    file.decls.iter().filter_map(|decl| match decl {
        Decl::Func(func) => Some(func),
        _ => None,
    })
}

/// Package-level identifiers of one package. The first declaration wins.
fn definitions(package: &SourcePackage) -> BTreeMap<String, Object> {
    let package_ref = package.package_ref();
    let mut defs = BTreeMap::new();

    for file in &package.syntax {
        for decl in &file.decls {
            match decl {
                Decl::Type(group) => {
                    for spec in &group.specs {
                        defs.entry(spec.name.clone()).or_insert_with(|| {
                            Object::TypeName(Named::new(package_ref.clone(), spec.name.clone()))
                        });
                    }
                }
                Decl::Func(func) if func.recv.is_none() => {
                    defs.entry(func.name.clone()).or_insert(Object::Func);
                }
                Decl::Func(_) => {}
                Decl::Var(names) => {
                    for name in names {
                        defs.entry(name.clone()).or_insert(Object::Var);
                    }
                }
                Decl::Const(names) => {
                    for name in names {
                        defs.entry(name.clone()).or_insert(Object::Const);
                    }
                }
            }
        }
    }

    defs.remove("_");
    defs
}

struct Resolver {
    /// Loaded packages by import path.
    known: HashMap<String, PackageRef>,
    /// Declared type names per loaded import path.
    declared: HashMap<String, HashSet<String>>,
}

struct Scope<'a> {
    package: &'a PackageRef,
    imports: HashMap<String, PackageRef>,
    dots: Vec<PackageRef>,
    type_params: &'a [String],
}

impl<'a> Scope<'a> {
    fn with_type_params<'b>(&'b self, type_params: &'b [String]) -> Scope<'b> {
        Scope {
            package: self.package,
            imports: self.imports.clone(),
            dots: self.dots.clone(),
            type_params,
        }
    }
}

impl Resolver {
    fn new(packages: &[SourcePackage]) -> Self {
        let known = packages
            .iter()
            .map(|p| (p.path.clone(), p.package_ref()))
            .collect();
        let declared = packages
            .iter()
            .map(|p| {
                let names = p
                    .syntax
                    .iter()
                    .flat_map(type_specs)
                    .map(|spec| spec.name.clone())
                    .collect();
                (p.path.clone(), names)
            })
            .collect();
        Self { known, declared }
    }

    fn package(&self, path: &str) -> PackageRef {
        self.known
            .get(path)
            .cloned()
            .unwrap_or_else(|| PackageRef::external(path))
    }

    fn file_scope<'a>(&self, package: &'a PackageRef, file: &ast::File) -> Scope<'a> {
        let mut imports = HashMap::new();
        let mut dots = Vec::new();

        for spec in &file.imports {
            let target = self.package(&spec.path);
            match spec.name.as_deref() {
                Some("_") => {}
                Some(".") => dots.push(target),
                Some(name) => {
                    imports.insert(name.to_string(), target);
                }
                None => {
                    imports.insert(target.name.clone(), target);
                }
            }
        }

        Scope {
            package,
            imports,
            dots,
            type_params: &[],
        }
    }

    fn declares(&self, path: &str, name: &str) -> bool {
        self.declared
            .get(path)
            .is_some_and(|names| names.contains(name))
    }

    fn resolve(&self, expr: &Expr, scope: &Scope) -> Type {
        match expr {
            Expr::Ident(name) => self.resolve_ident(name, scope),
            Expr::Qualified { package, name } => match scope.imports.get(package) {
                Some(target) if target.path == "unsafe" && name == "Pointer" => {
                    Type::Basic(BasicKind::UnsafePointer)
                }
                Some(target) => Type::Named(Named::new(target.clone(), name.clone())),
                None => Type::invalid(),
            },
            Expr::Pointer(elem) => Type::pointer(self.resolve(elem, scope)),
            Expr::Slice(elem) => Type::slice(self.resolve(elem, scope)),
            Expr::Array { len, elem } => Type::Array {
                len: len.clone(),
                elem: Box::new(self.resolve(elem, scope)),
            },
            Expr::Map { key, value } => {
                Type::map(self.resolve(key, scope), self.resolve(value, scope))
            }
            Expr::Chan { dir, elem } => Type::Chan {
                dir: *dir,
                elem: Box::new(self.resolve(elem, scope)),
            },
            Expr::Func(sig) => Type::Func(self.signature(sig, scope)),
            Expr::Struct(fields) => Type::Struct(StructType {
                fields: fields
                    .iter()
                    .flat_map(|field| self.fields(field, scope))
                    .collect(),
            }),
            Expr::Interface(elems) => Type::Interface(self.interface(elems, scope)),
            Expr::Generic { base, args } => match self.resolve(base, scope) {
                Type::Named(mut named) => {
                    named.args = args.iter().map(|arg| self.resolve(arg, scope)).collect();
                    Type::Named(named)
                }
                _ => Type::invalid(),
            },
            Expr::Other(_) => Type::invalid(),
        }
    }

    fn resolve_ident(&self, name: &str, scope: &Scope) -> Type {
        if scope.type_params.iter().any(|param| param == name) {
            return Type::TypeParam(name.to_string());
        }
        if self.declares(&scope.package.path, name) {
            return Type::Named(Named::new(scope.package.clone(), name));
        }
        if let Some(kind) = BasicKind::from_name(name) {
            return Type::Basic(kind);
        }
        match name {
            "error" => return Type::Named(Named::predeclared("error")),
            "any" | "comparable" => return Type::Interface(InterfaceType::default()),
            _ => {}
        }
        scope
            .dots
            .iter()
            .find(|dot| self.declares(&dot.path, name))
            .map(|dot| Type::Named(Named::new(dot.clone(), name)))
            .unwrap_or_else(Type::invalid)
    }

    fn fields(&self, field: &FieldDecl, scope: &Scope) -> Vec<Field> {
        let ty = self.resolve(&field.ty, scope);
        if field.is_embedded() {
            return vec![Field {
                name: field.ty.embedded_name().unwrap_or_default().to_string(),
                ty,
                embedded: true,
                tag: field.tag.clone(),
                package: scope.package.path.clone(),
            }];
        }
        field
            .names
            .iter()
            .map(|name| Field {
                name: name.clone(),
                ty: ty.clone(),
                embedded: false,
                tag: field.tag.clone(),
                package: scope.package.path.clone(),
            })
            .collect()
    }

    fn interface(&self, elems: &[InterfaceElem], scope: &Scope) -> InterfaceType {
        let mut iface = InterfaceType::default();
        for elem in elems {
            match elem {
                InterfaceElem::Method { name, sig } => iface.methods.push(MethodSig {
                    name: name.clone(),
                    sig: self.signature(sig, scope),
                }),
                InterfaceElem::Embed(expr) => iface.embeds.push(self.resolve(expr, scope)),
                InterfaceElem::Constraint => {}
            }
        }
        iface
    }

    fn signature(&self, sig: &ast::FuncType, scope: &Scope) -> Signature {
        Signature {
            params: sig.params.iter().map(|p| self.resolve(p, scope)).collect(),
            results: sig.results.iter().map(|r| self.resolve(r, scope)).collect(),
            variadic: sig.variadic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::GoParser;

    fn package(path: &str, sources: &[&str]) -> SourcePackage {
        let mut parser = GoParser::new().unwrap();
        let syntax: Vec<ast::File> = sources
            .iter()
            .enumerate()
            .map(|(i, source)| parser.parse_file(format!("f{i}.go"), source).unwrap())
            .collect();
        SourcePackage {
            name: syntax[0].package.clone(),
            path: path.to_string(),
            dir: PathBuf::from(path),
            files: syntax.iter().map(|f| f.path.clone()).collect(),
            syntax,
        }
    }

    fn model() -> SourcePackage {
        package(
            "example.com/app/model",
            &[r#"
package model

import (
    "time"
    ext "example.com/app/other"
    "unsafe"
)

type Sample struct {
    I       int
    When    time.Time
    Other   *ext.Other
    Raw     unsafe.Pointer
    Err     error
    Any     any
    Missing Undefined
    hidden  string
    Inner
}

type Inner struct{}

type Level = int

func (s *Sample) Reset() {}

func (s Sample) Len() int { return 0 }

func New() *Sample { return nil }

var Default Sample

const Max = 3
"#],
        )
    }

    fn other() -> SourcePackage {
        package(
            "example.com/app/other",
            &["package other\n\ntype Other struct {\n    secret int\n}\n"],
        )
    }

    fn sample_fields(table: &TypeTable) -> Vec<Field> {
        let sample = table
            .get(&TypeKey::new("example.com/app/model", "Sample"))
            .unwrap();
        let Type::Struct(st) = &sample.rhs else {
            panic!("expected struct");
        };
        st.fields.clone()
    }

    #[test]
    fn test_resolves_field_types() {
        let resolved = resolve_packages(&[model(), other()]);
        let fields = sample_fields(&resolved.table);

        assert_eq!(fields[0].ty, Type::Basic(BasicKind::Int));
        assert_eq!(
            fields[1].ty,
            Type::Named(Named::new(PackageRef::new("time", "time"), "Time"))
        );
        assert_eq!(
            fields[2].ty,
            Type::pointer(Type::Named(Named::new(
                PackageRef::new("example.com/app/other", "other"),
                "Other"
            )))
        );
        assert_eq!(fields[3].ty, Type::Basic(BasicKind::UnsafePointer));
        assert_eq!(fields[4].ty, Type::Named(Named::predeclared("error")));
        assert_eq!(fields[5].ty, Type::Interface(InterfaceType::default()));
        assert_eq!(fields[6].ty, Type::invalid());
        assert!(!fields[7].is_exported());
        assert_eq!(fields[7].package, "example.com/app/model");
        assert!(fields[8].embedded);
        assert_eq!(fields[8].name, "Inner");
    }

    #[test]
    fn test_attaches_methods() {
        let resolved = resolve_packages(&[model()]);
        let sample = resolved
            .table
            .get(&TypeKey::new("example.com/app/model", "Sample"))
            .unwrap();
        assert_eq!(sample.methods.len(), 2);
        assert!(sample.methods[0].is_reset());
        assert!(sample.methods[0].pointer_receiver);
        assert!(!sample.methods[1].is_reset());
        assert!(!sample.methods[1].pointer_receiver);
    }

    #[test]
    fn test_alias_declaration() {
        let resolved = resolve_packages(&[model()]);
        let level = resolved
            .table
            .get(&TypeKey::new("example.com/app/model", "Level"))
            .unwrap();
        assert!(level.alias);
        assert_eq!(level.rhs, Type::Basic(BasicKind::Int));
    }

    #[test]
    fn test_definitions_table() {
        let resolved = resolve_packages(&[model()]);
        let defs = &resolved.defs[0];
        assert!(matches!(defs.get("Sample"), Some(Object::TypeName(n)) if n.name == "Sample"));
        assert!(matches!(defs.get("Level"), Some(Object::TypeName(_))));
        assert_eq!(defs.get("New"), Some(&Object::Func));
        assert_eq!(defs.get("Default"), Some(&Object::Var));
        assert_eq!(defs.get("Max"), Some(&Object::Const));
        assert!(!defs.contains_key("Reset"));
    }

    #[test]
    fn test_dot_import_and_type_params() {
        let user = package(
            "example.com/app/user",
            &[r#"
package user

import . "example.com/app/other"

type Holder[T any] struct {
    Value T
    Ref   *Other
}
"#],
        );
        let resolved = resolve_packages(&[user, other()]);
        let holder = resolved
            .table
            .get(&TypeKey::new("example.com/app/user", "Holder"))
            .unwrap();
        assert_eq!(holder.type_params, vec!["T"]);
        let Type::Struct(st) = &holder.rhs else {
            panic!("expected struct");
        };
        assert_eq!(st.fields[0].ty, Type::TypeParam("T".to_string()));
        assert_eq!(
            st.fields[1].ty,
            Type::pointer(Type::Named(Named::new(
                PackageRef::new("example.com/app/other", "other"),
                "Other"
            )))
        );
    }
}
