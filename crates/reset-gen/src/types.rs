//! Resolved type model shared by every package of one load.

use std::collections::BTreeMap;

pub use crate::ast::ChanDir;

/// Upper bound on alias/defined-type chains followed before giving up.
const MAX_CHAIN: usize = 64;

/// A Go package as seen from a type reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PackageRef {
    /// Import path.
    pub path: String,
    /// Package name (declared for loaded packages, guessed otherwise).
    pub name: String,
}

impl PackageRef {
    pub fn new(path: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: name.into(),
        }
    }

    /// Reference to a package outside the loaded set, named after its path.
    pub fn external(path: impl Into<String>) -> Self {
        let path = path.into();
        let name = guess_package_name(&path);
        Self { path, name }
    }
}

/// Best-effort package name for an import path that was not loaded.
///
/// `gopkg.in/yaml.v3` gives `yaml`, `github.com/x/go-redis/v9` gives `redis`.
pub fn guess_package_name(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let mut last = segments.next().unwrap_or(path);
    if is_major_version(last) {
        if let Some(prev) = segments.next() {
            last = prev;
        }
    }
    let last = last.split('.').next().unwrap_or(last);
    let last = last.strip_prefix("go-").unwrap_or(last);

    let mut name: String = last
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

fn is_major_version(segment: &str) -> bool {
    segment
        .strip_prefix('v')
        .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
}

/// Identity of a declared type: package path plus name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeKey {
    pub package: String,
    pub name: String,
}

impl TypeKey {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicKind {
    Bool,
    String,
    Int,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Uintptr,
    Float32,
    Float64,
    Complex64,
    Complex128,
    Byte,
    Rune,
    UnsafePointer,
    UntypedNil,
    Invalid,
}

impl BasicKind {
    /// Predeclared basic type for an identifier.
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "bool" => BasicKind::Bool,
            "string" => BasicKind::String,
            "int" => BasicKind::Int,
            "int8" => BasicKind::Int8,
            "int16" => BasicKind::Int16,
            "int32" => BasicKind::Int32,
            "int64" => BasicKind::Int64,
            "uint" => BasicKind::Uint,
            "uint8" => BasicKind::Uint8,
            "uint16" => BasicKind::Uint16,
            "uint32" => BasicKind::Uint32,
            "uint64" => BasicKind::Uint64,
            "uintptr" => BasicKind::Uintptr,
            "float32" => BasicKind::Float32,
            "float64" => BasicKind::Float64,
            "complex64" => BasicKind::Complex64,
            "complex128" => BasicKind::Complex128,
            "byte" => BasicKind::Byte,
            "rune" => BasicKind::Rune,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            BasicKind::Bool => "bool",
            BasicKind::String => "string",
            BasicKind::Int => "int",
            BasicKind::Int8 => "int8",
            BasicKind::Int16 => "int16",
            BasicKind::Int32 => "int32",
            BasicKind::Int64 => "int64",
            BasicKind::Uint => "uint",
            BasicKind::Uint8 => "uint8",
            BasicKind::Uint16 => "uint16",
            BasicKind::Uint32 => "uint32",
            BasicKind::Uint64 => "uint64",
            BasicKind::Uintptr => "uintptr",
            BasicKind::Float32 => "float32",
            BasicKind::Float64 => "float64",
            BasicKind::Complex64 => "complex64",
            BasicKind::Complex128 => "complex128",
            BasicKind::Byte => "byte",
            BasicKind::Rune => "rune",
            BasicKind::UnsafePointer => "unsafe.Pointer",
            BasicKind::UntypedNil => "untyped nil",
            BasicKind::Invalid => "invalid type",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(
            self,
            BasicKind::Bool
                | BasicKind::String
                | BasicKind::UnsafePointer
                | BasicKind::UntypedNil
                | BasicKind::Invalid
        )
    }

    /// Literal assignable to any value of this kind.
    pub fn zero_literal(self) -> &'static str {
        match self {
            BasicKind::String => "\"\"",
            BasicKind::Bool => "false",
            kind if kind.is_numeric() => "0",
            _ => "nil",
        }
    }
}

/// Reference to a declared type. `package` is `None` for predeclared names
/// such as `error`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Named {
    pub package: Option<PackageRef>,
    pub name: String,
    pub args: Vec<Type>,
}

impl Named {
    pub fn new(package: PackageRef, name: impl Into<String>) -> Self {
        Self {
            package: Some(package),
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn predeclared(name: impl Into<String>) -> Self {
        Self {
            package: None,
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn key(&self) -> TypeKey {
        let package = self
            .package
            .as_ref()
            .map(|p| p.path.clone())
            .unwrap_or_default();
        TypeKey::new(package, self.name.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    pub embedded: bool,
    /// Raw tag literal including its quotes.
    pub tag: Option<String>,
    /// Import path of the package the field was declared in.
    pub package: String,
}

impl Field {
    pub fn is_exported(&self) -> bool {
        is_exported(&self.name)
    }
}

/// Go export rule: the name starts with an upper-case letter.
pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructType {
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<Type>,
    pub results: Vec<Type>,
    pub variadic: bool,
}

impl Signature {
    /// No parameters and no results, the shape of `Reset()`.
    pub fn is_nullary(&self) -> bool {
        self.params.is_empty() && self.results.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSig {
    pub name: String,
    pub sig: Signature,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceType {
    pub methods: Vec<MethodSig>,
    pub embeds: Vec<Type>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    Basic(BasicKind),
    Named(Named),
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Array { len: String, elem: Box<Type> },
    Map { key: Box<Type>, value: Box<Type> },
    Chan { dir: ChanDir, elem: Box<Type> },
    Func(Signature),
    Struct(StructType),
    Interface(InterfaceType),
    TypeParam(String),
}

impl Type {
    pub fn invalid() -> Self {
        Type::Basic(BasicKind::Invalid)
    }

    pub fn pointer(elem: Type) -> Self {
        Type::Pointer(Box::new(elem))
    }

    pub fn slice(elem: Type) -> Self {
        Type::Slice(Box::new(elem))
    }

    pub fn map(key: Type, value: Type) -> Self {
        Type::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }
}

/// A method declared on a named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Method {
    pub name: String,
    pub pointer_receiver: bool,
    pub sig: Signature,
}

impl Method {
    pub fn is_reset(&self) -> bool {
        self.name == "Reset" && self.sig.is_nullary()
    }
}

/// A declared type name with its right-hand side and methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeName {
    pub package: Option<PackageRef>,
    pub name: String,
    pub type_params: Vec<String>,
    pub alias: bool,
    /// The type on the right of the declaration. For defined types this is
    /// the source of the underlying type; for aliases the aliased type.
    pub rhs: Type,
    pub methods: Vec<Method>,
}

impl TypeName {
    pub fn new(package: PackageRef, name: impl Into<String>, rhs: Type) -> Self {
        Self {
            package: Some(package),
            name: name.into(),
            type_params: Vec::new(),
            alias: false,
            rhs,
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// The type this name denotes.
    pub fn named(&self) -> Named {
        Named {
            package: self.package.clone(),
            name: self.name.clone(),
            args: Vec::new(),
        }
    }

    pub fn key(&self) -> TypeKey {
        self.named().key()
    }
}

/// A package-level object from a definitions table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Object {
    TypeName(Named),
    Func,
    Var,
    Const,
}

/// Every declared type of one load, keyed by package path then name.
///
/// Predeclared `error` lives under the empty path.
#[derive(Debug, Clone)]
pub struct TypeTable {
    packages: BTreeMap<String, BTreeMap<String, TypeName>>,
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeTable {
    pub fn new() -> Self {
        let mut table = Self {
            packages: BTreeMap::new(),
        };
        table.insert(TypeName {
            package: None,
            name: "error".to_string(),
            type_params: Vec::new(),
            alias: false,
            rhs: Type::Interface(InterfaceType {
                methods: vec![MethodSig {
                    name: "Error".to_string(),
                    sig: Signature {
                        params: Vec::new(),
                        results: vec![Type::Basic(BasicKind::String)],
                        variadic: false,
                    },
                }],
                embeds: Vec::new(),
            }),
            methods: Vec::new(),
        });
        table
    }

    /// Add or replace a declaration.
    pub fn insert(&mut self, decl: TypeName) {
        let key = decl.key();
        self.packages
            .entry(key.package)
            .or_default()
            .insert(key.name, decl);
    }

    pub fn get(&self, key: &TypeKey) -> Option<&TypeName> {
        self.packages.get(&key.package)?.get(&key.name)
    }

    pub fn get_mut(&mut self, key: &TypeKey) -> Option<&mut TypeName> {
        self.packages.get_mut(&key.package)?.get_mut(&key.name)
    }

    pub fn lookup(&self, named: &Named) -> Option<&TypeName> {
        self.get(&named.key())
    }

    /// Whether any declaration belongs to the package at `path`.
    pub fn has_package(&self, path: &str) -> bool {
        self.packages.contains_key(path)
    }

    /// Follows aliases until a non-alias type is reached. Defined types are
    /// kept. Returns `None` when the chain is broken or cyclic.
    pub fn unalias<'a>(&'a self, ty: &'a Type) -> Option<&'a Type> {
        let mut current = ty;
        for _ in 0..MAX_CHAIN {
            match current {
                Type::Named(named) => match self.lookup(named) {
                    Some(decl) if decl.alias => current = &decl.rhs,
                    _ => return Some(current),
                },
                other => return Some(other),
            }
        }
        None
    }

    /// The underlying type, following named types and aliases.
    ///
    /// Returns `None` for a named type whose declaration is not in the table
    /// (an opaque type from a package outside the load) or for a cyclic chain.
    pub fn underlying<'a>(&'a self, ty: &'a Type) -> Option<&'a Type> {
        let mut current = ty;
        for _ in 0..MAX_CHAIN {
            match current {
                Type::Named(named) => current = &self.lookup(named)?.rhs,
                other => return Some(other),
            }
        }
        None
    }

    /// The declaration behind a (possibly aliased) named type.
    pub fn declaration<'a>(&'a self, ty: &'a Type) -> Option<&'a TypeName> {
        match self.unalias(ty)? {
            Type::Named(named) => self.lookup(named),
            _ => None,
        }
    }

    /// Iterates every declaration in path then name order.
    pub fn iter(&self) -> impl Iterator<Item = &TypeName> {
        self.packages.values().flat_map(BTreeMap::values)
    }
}
