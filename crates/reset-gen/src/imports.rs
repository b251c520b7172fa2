//! Import alias allocation and type printing.
//!
//! Aliases are assigned in the order types are printed, which follows field
//! declaration order. The import block is rendered separately, sorted by
//! alias, so rendering never influences assignment.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Write;

use tracing::debug;

use crate::types::{
    BasicKind, ChanDir, Field, InterfaceType, Named, PackageRef, Signature, Type, TypeTable,
};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Binding {
    path: String,
    /// Whether the package's declared name is known for certain.
    name_known: bool,
}

/// Alias <-> import path bindings for one generated file.
///
/// Each path is bound to exactly one alias and each alias to exactly one
/// path. A taken candidate gets an increasing suffix: `pkg`, `pkg1`, `pkg2`.
#[derive(Debug, Clone, Default)]
pub struct ImportAliasTable {
    /// Identifiers an alias must never shadow.
    reserved: HashSet<String>,
    by_alias: BTreeMap<String, Binding>,
    by_path: HashMap<String, String>,
}

impl ImportAliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table where `names` can never be handed out as aliases.
    pub fn with_reserved<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            reserved: names.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// The alias bound to `package`, binding a fresh one on first use.
    pub fn qualify(&mut self, package: &PackageRef, name_known: bool) -> String {
        if let Some(alias) = self.by_path.get(&package.path) {
            return alias.clone();
        }

        let mut alias = package.name.clone();
        let mut suffix = 0;
        while self.reserved.contains(&alias) || self.by_alias.contains_key(&alias) {
            suffix += 1;
            alias = format!("{}{suffix}", package.name);
        }

        debug!(path = %package.path, alias = %alias, "bound import alias");
        self.by_alias.insert(
            alias.clone(),
            Binding {
                path: package.path.clone(),
                name_known,
            },
        );
        self.by_path.insert(package.path.clone(), alias.clone());
        alias
    }

    /// The path bound to `alias`, if any.
    pub fn path(&self, alias: &str) -> Option<&str> {
        self.by_alias.get(alias).map(|binding| binding.path.as_str())
    }

    pub fn len(&self) -> usize {
        self.by_alias.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_alias.is_empty()
    }

    /// The import block, sorted by alias. Empty when nothing is bound.
    pub fn render(&self) -> String {
        if self.by_alias.is_empty() {
            return String::new();
        }

        let mut out = String::from("import (\n");
        for (alias, binding) in &self.by_alias {
            let last = binding.path.rsplit('/').next().unwrap_or(&binding.path);
            if alias != last || !binding.name_known {
                let _ = writeln!(out, "\t{alias} \"{}\"", binding.path);
            } else {
                let _ = writeln!(out, "\t\"{}\"", binding.path);
            }
        }
        out.push_str(")\n");
        out
    }
}

/// Whether `path` belongs to the standard library.
pub fn is_std_path(path: &str) -> bool {
    let first = path.split('/').next().unwrap_or(path);
    !first.is_empty() && !first.contains('.')
}

/// Prints Go types as seen from one package, qualifying foreign names.
#[derive(Debug)]
pub struct ImportQualifier<'a> {
    table: &'a TypeTable,
    /// Import path of the package being generated.
    local: String,
    aliases: ImportAliasTable,
}

impl<'a> ImportQualifier<'a> {
    pub fn new(table: &'a TypeTable, local: impl Into<String>, aliases: ImportAliasTable) -> Self {
        Self {
            table,
            local: local.into(),
            aliases,
        }
    }

    pub fn aliases(&self) -> &ImportAliasTable {
        &self.aliases
    }

    pub fn into_aliases(self) -> ImportAliasTable {
        self.aliases
    }

    /// Qualifier prefix for `package`, empty for the local package.
    fn prefix(&mut self, package: &PackageRef) -> String {
        if package.path == self.local {
            return String::new();
        }
        let name_known = self.table.has_package(&package.path) || is_std_path(&package.path);
        let alias = self.aliases.qualify(package, name_known);
        format!("{alias}.")
    }

    /// Go spelling of a named type, with type arguments.
    pub fn named(&mut self, named: &Named) -> String {
        let mut out = match &named.package {
            Some(package) => self.prefix(package),
            None => String::new(),
        };
        out.push_str(&named.name);
        if !named.args.is_empty() {
            let args: Vec<String> = named.args.iter().map(|arg| self.type_string(arg)).collect();
            let _ = write!(out, "[{}]", args.join(", "));
        }
        out
    }

    /// Go spelling of any type.
    pub fn type_string(&mut self, ty: &Type) -> String {
        match ty {
            Type::Basic(BasicKind::UnsafePointer) => {
                let prefix = self.prefix(&PackageRef::new("unsafe", "unsafe"));
                format!("{prefix}Pointer")
            }
            Type::Basic(kind) => kind.name().to_string(),
            Type::Named(named) => self.named(named),
            Type::Pointer(elem) => format!("*{}", self.type_string(elem)),
            Type::Slice(elem) => format!("[]{}", self.type_string(elem)),
            Type::Array { len, elem } => format!("[{len}]{}", self.type_string(elem)),
            Type::Map { key, value } => {
                format!("map[{}]{}", self.type_string(key), self.type_string(value))
            }
            Type::Chan { dir, elem } => {
                let inner = self.type_string(elem);
                match dir {
                    ChanDir::Send => format!("chan<- {inner}"),
                    ChanDir::Recv => format!("<-chan {inner}"),
                    ChanDir::Both if inner.starts_with("<-chan") => format!("chan ({inner})"),
                    ChanDir::Both => format!("chan {inner}"),
                }
            }
            Type::Func(sig) => format!("func{}", self.signature(sig)),
            Type::Struct(st) => self.struct_type(&st.fields),
            Type::Interface(iface) => self.interface_type(iface),
            Type::TypeParam(name) => name.clone(),
        }
    }

    fn signature(&mut self, sig: &Signature) -> String {
        let last = sig.params.len().saturating_sub(1);
        let params: Vec<String> = sig
            .params
            .iter()
            .enumerate()
            .map(|(i, param)| match param {
                Type::Slice(elem) if sig.variadic && i == last => {
                    format!("...{}", self.type_string(elem))
                }
                other => self.type_string(other),
            })
            .collect();
        let mut out = format!("({})", params.join(", "));

        match sig.results.as_slice() {
            [] => {}
            [single] => {
                let result = self.type_string(single);
                let _ = write!(out, " {result}");
            }
            results => {
                let results: Vec<String> = results.iter().map(|r| self.type_string(r)).collect();
                let _ = write!(out, " ({})", results.join(", "));
            }
        }
        out
    }

    fn struct_type(&mut self, fields: &[Field]) -> String {
        if fields.is_empty() {
            return "struct{}".to_string();
        }
        let fields: Vec<String> = fields
            .iter()
            .map(|field| {
                let ty = self.type_string(&field.ty);
                let mut out = if field.embedded {
                    ty
                } else {
                    format!("{} {ty}", field.name)
                };
                if let Some(tag) = &field.tag {
                    let _ = write!(out, " {tag}");
                }
                out
            })
            .collect();
        format!("struct{{ {} }}", fields.join("; "))
    }

    fn interface_type(&mut self, iface: &InterfaceType) -> String {
        if iface.methods.is_empty() && iface.embeds.is_empty() {
            return "interface{}".to_string();
        }
        let mut elems: Vec<String> = iface.embeds.iter().map(|e| self.type_string(e)).collect();
        for method in &iface.methods {
            let sig = self.signature(&method.sig);
            elems.push(format!("{}{sig}", method.name));
        }
        format!("interface{{ {} }}", elems.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MethodSig, StructType, TypeName};

    fn local() -> PackageRef {
        PackageRef::new("example.com/app/model", "model")
    }

    #[test]
    fn test_alias_collision_suffix() {
        let mut table = ImportAliasTable::new();
        let a = PackageRef::new("example.com/a/pkg", "pkg");
        let b = PackageRef::new("example.com/b/pkg", "pkg");
        let c = PackageRef::new("example.com/c/pkg", "pkg");

        assert_eq!(table.qualify(&a, true), "pkg");
        assert_eq!(table.qualify(&b, true), "pkg1");
        assert_eq!(table.qualify(&a, true), "pkg");
        assert_eq!(table.qualify(&c, true), "pkg2");
        assert_eq!(table.len(), 3);
        assert_eq!(table.path("pkg1"), Some("example.com/b/pkg"));
    }

    #[test]
    fn test_reserved_names_are_skipped() {
        let mut table = ImportAliasTable::with_reserved(["obj", "time"]);
        assert_eq!(table.qualify(&PackageRef::new("time", "time"), true), "time1");
        assert_eq!(table.qualify(&PackageRef::new("example.com/obj", "obj"), true), "obj1");
    }

    #[test]
    fn test_render_sorted_by_alias() {
        let mut table = ImportAliasTable::new();
        table.qualify(&PackageRef::new("time", "time"), true);
        table.qualify(&PackageRef::new("example.com/a/pkg", "pkg"), true);
        table.qualify(&PackageRef::new("example.com/b/pkg", "pkg"), true);
        table.qualify(&PackageRef::new("bytes", "bytes"), true);
        table.qualify(&PackageRef::external("gopkg.in/yaml.v3"), false);
        table.qualify(&PackageRef::new("example.com/c/go-thing", "thing"), true);

        assert_eq!(
            table.render(),
            "import (\n\
             \t\"bytes\"\n\
             \t\"example.com/a/pkg\"\n\
             \tpkg1 \"example.com/b/pkg\"\n\
             \tthing \"example.com/c/go-thing\"\n\
             \t\"time\"\n\
             \tyaml \"gopkg.in/yaml.v3\"\n\
             )\n"
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(ImportAliasTable::new().render(), "");
        assert!(ImportAliasTable::with_reserved(["obj"]).is_empty());
    }

    #[test]
    fn test_std_path() {
        assert!(is_std_path("time"));
        assert!(is_std_path("encoding/json"));
        assert!(!is_std_path("example.com/app"));
        assert!(!is_std_path("gopkg.in/yaml.v3"));
    }

    #[test]
    fn test_local_types_unqualified() {
        let table = TypeTable::new();
        let mut q = ImportQualifier::new(&table, local().path, ImportAliasTable::new());
        let ty = Type::pointer(Type::Named(Named::new(local(), "Other")));
        assert_eq!(q.type_string(&ty), "*Other");
        assert_eq!(q.type_string(&Type::Named(Named::predeclared("error"))), "error");
        assert!(q.aliases().is_empty());
    }

    #[test]
    fn test_composite_types() {
        let mut table = TypeTable::new();
        let other = PackageRef::new("example.com/app/other", "other");
        table.insert(TypeName::new(other.clone(), "Item", Type::Struct(StructType::default())));

        let mut q = ImportQualifier::new(&table, local().path, ImportAliasTable::new());
        let item = Type::Named(Named::new(other, "Item"));
        let time = Type::Named(Named::new(PackageRef::new("time", "time"), "Duration"));

        assert_eq!(
            q.type_string(&Type::map(Type::Basic(BasicKind::String), Type::slice(item.clone()))),
            "map[string][]other.Item"
        );
        assert_eq!(
            q.type_string(&Type::Array {
                len: "4".to_string(),
                elem: Box::new(time.clone()),
            }),
            "[4]time.Duration"
        );
        assert_eq!(
            q.type_string(&Type::Chan {
                dir: ChanDir::Both,
                elem: Box::new(Type::Chan {
                    dir: ChanDir::Recv,
                    elem: Box::new(Type::Basic(BasicKind::Int)),
                }),
            }),
            "chan (<-chan int)"
        );
        assert_eq!(
            q.type_string(&Type::Func(Signature {
                params: vec![Type::Basic(BasicKind::String), Type::slice(item.clone())],
                results: vec![Type::Basic(BasicKind::Int), Type::Named(Named::predeclared("error"))],
                variadic: true,
            })),
            "func(string, ...other.Item) (int, error)"
        );
        assert_eq!(
            q.type_string(&Type::Basic(BasicKind::UnsafePointer)),
            "unsafe.Pointer"
        );

        let mut generic = Named::new(local(), "List");
        generic.args = vec![item];
        assert_eq!(q.named(&generic), "List[other.Item]");

        assert_eq!(
            q.aliases().render(),
            "import (\n\t\"example.com/app/other\"\n\t\"time\"\n\t\"unsafe\"\n)\n"
        );
    }

    #[test]
    fn test_anonymous_struct_and_interface() {
        let table = TypeTable::new();
        let mut q = ImportQualifier::new(&table, local().path, ImportAliasTable::new());

        let st = Type::Struct(StructType {
            fields: vec![
                Field {
                    name: "X".to_string(),
                    ty: Type::Basic(BasicKind::Int),
                    embedded: false,
                    tag: Some("`json:\"x\"`".to_string()),
                    package: local().path,
                },
                Field {
                    name: "Inner".to_string(),
                    ty: Type::Named(Named::new(local(), "Inner")),
                    embedded: true,
                    tag: None,
                    package: local().path,
                },
            ],
        });
        assert_eq!(q.type_string(&st), "struct{ X int `json:\"x\"`; Inner }");
        assert_eq!(
            q.type_string(&Type::Struct(StructType::default())),
            "struct{}"
        );

        let iface = Type::Interface(InterfaceType {
            methods: vec![MethodSig {
                name: "Reset".to_string(),
                sig: Signature::default(),
            }],
            embeds: vec![Type::Named(Named::predeclared("error"))],
        });
        assert_eq!(q.type_string(&iface), "interface{ error; Reset() }");
        assert_eq!(
            q.type_string(&Type::Interface(InterfaceType::default())),
            "interface{}"
        );
    }
}
