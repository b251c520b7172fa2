//! Package discovery.
//!
//! [`SourceLoader`] walks a directory tree, parses every Go file and groups
//! files into packages by directory. Resolution runs over the whole set at
//! once so packages can see each other's declarations.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::ast;
use crate::error::LoadError;
use crate::extractor::{GoParser, has_ignore_constraint};
use crate::output::OUTPUT_FILE;
use crate::resolver::{SourcePackage, resolve_packages};
use crate::types::{Object, PackageRef, TypeTable};

/// A loaded package with resolved type information.
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    /// Import path.
    pub path: String,
    pub dir: PathBuf,
    pub files: Vec<PathBuf>,
    pub syntax: Vec<ast::File>,
    /// Package-level identifier to object.
    pub defs: BTreeMap<String, Object>,
    /// Declarations of every package from the same load.
    pub types: Arc<TypeTable>,
}

impl Package {
    pub fn package_ref(&self) -> PackageRef {
        PackageRef::new(self.path.clone(), self.name.clone())
    }
}

/// Strategy for turning a root directory into packages.
pub trait PackageLoader {
    fn load(&self, root: &Path) -> Result<Vec<Package>, LoadError>;
}

/// Loads Go packages straight from source files on disk.
#[derive(Debug, Clone, Default)]
pub struct SourceLoader;

impl SourceLoader {
    pub fn new() -> Self {
        Self
    }
}

impl PackageLoader for SourceLoader {
    fn load(&self, root: &Path) -> Result<Vec<Package>, LoadError> {
        let module = find_module(root)?;
        let mut parser = GoParser::new()?;

        let mut sources = Vec::new();
        for (dir, files) in collect_go_files(root)? {
            if let Some(package) = parse_package(&mut parser, &dir, files, module.as_ref(), root)? {
                sources.push(package);
            }
        }
        debug!(root = %root.display(), packages = sources.len(), "parsed packages");

        Ok(resolve_sources(sources))
    }
}

/// Resolve parsed packages together and attach the shared type table.
pub fn resolve_sources(sources: Vec<SourcePackage>) -> Vec<Package> {
    let resolved = resolve_packages(&sources);
    let types = Arc::new(resolved.table);

    sources
        .into_iter()
        .zip(resolved.defs)
        .map(|(source, defs)| Package {
            name: source.name,
            path: source.path,
            dir: source.dir,
            files: source.files,
            syntax: source.syntax,
            defs,
            types: Arc::clone(&types),
        })
        .collect()
}

/// Module path and root directory from the nearest `go.mod`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Module {
    path: String,
    dir: PathBuf,
}

fn find_module(root: &Path) -> Result<Option<Module>, LoadError> {
    for dir in root.ancestors() {
        let manifest = dir.join("go.mod");
        if !manifest.is_file() {
            continue;
        }
        let contents = fs::read_to_string(&manifest).map_err(|source| LoadError::Io {
            path: manifest.clone(),
            source,
        })?;
        let path = parse_module_path(&contents)
            .ok_or_else(|| LoadError::InvalidModule { path: manifest })?;
        return Ok(Some(Module {
            path,
            dir: dir.to_path_buf(),
        }));
    }
    Ok(None)
}

fn parse_module_path(go_mod: &str) -> Option<String> {
    go_mod.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or_default().trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let path = rest.trim().trim_matches('"');
        (!path.is_empty()).then(|| path.to_string())
    })
}

/// Directories skipped the way the go tool skips them.
fn is_ignored_dir(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name.starts_with('_') || name == "testdata" || name == "vendor"
}

fn is_source_file(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    name.ends_with(".go") && !name.ends_with("_test.go") && name != OUTPUT_FILE
}

/// Go files grouped by directory, both in sorted order.
fn collect_go_files(root: &Path) -> Result<BTreeMap<PathBuf, Vec<PathBuf>>, LoadError> {
    let mut dirs: BTreeMap<PathBuf, Vec<PathBuf>> = BTreeMap::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored_dir(entry));

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type().is_file() && is_source_file(path) {
            if let Some(dir) = path.parent() {
                dirs.entry(dir.to_path_buf())
                    .or_default()
                    .push(path.to_path_buf());
            }
        }
    }
    Ok(dirs)
}

fn parse_package(
    parser: &mut GoParser,
    dir: &Path,
    paths: Vec<PathBuf>,
    module: Option<&Module>,
    root: &Path,
) -> Result<Option<SourcePackage>, LoadError> {
    let mut files = Vec::new();
    let mut syntax: Vec<ast::File> = Vec::new();

    for path in paths {
        let source = fs::read_to_string(&path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        if has_ignore_constraint(&source) {
            debug!(file = %path.display(), "skipping ignored file");
            continue;
        }

        let file = parser.parse_file(&path, &source)?;
        if let Some(first) = syntax.first() {
            if first.package != file.package {
                return Err(LoadError::PackageMismatch {
                    dir: dir.to_path_buf(),
                    expected: first.package.clone(),
                    found: file.package,
                });
            }
        }
        files.push(path);
        syntax.push(file);
    }

    let Some(first) = syntax.first() else {
        return Ok(None);
    };

    Ok(Some(SourcePackage {
        name: first.package.clone(),
        path: import_path(dir, module, root),
        dir: dir.to_path_buf(),
        files,
        syntax,
    }))
}

fn import_path(dir: &Path, module: Option<&Module>, root: &Path) -> String {
    let (prefix, base) = match module {
        Some(module) => (Some(module.path.as_str()), module.dir.as_path()),
        None => (None, root),
    };

    let relative: Vec<String> = dir
        .strip_prefix(base)
        .map(|rel| {
            rel.components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    match (prefix, relative.is_empty()) {
        (Some(prefix), true) => prefix.to_string(),
        (Some(prefix), false) => format!("{prefix}/{}", relative.join("/")),
        (None, true) => ".".to_string(),
        (None, false) => relative.join("/"),
    }
}
