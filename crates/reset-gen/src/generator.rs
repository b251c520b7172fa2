//! Go `Reset()` method generator.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::collector::{ResetTarget, collect_targets};
use crate::error::GenerateError;
use crate::format::{CanonicalFormatter, Formatter};
use crate::imports::{ImportAliasTable, ImportQualifier};
use crate::loader::{Package, PackageLoader, SourceLoader};
use crate::output::{FileWriter, FsWriter, OUTPUT_FILE};
use crate::registry::TypeNameIndex;
use crate::synth::{ResetSynthesizer, receiver_name};
use crate::types::TypeKey;

/// First line of every generated file.
pub const BANNER: &str = "// Code generated by reset; DO NOT EDIT.";

/// Assembles the source of one generated file.
///
/// Layout: banner, `package` clause, import block (when not empty), then the
/// methods separated by one blank line in the order they were added.
#[derive(Debug, Clone)]
pub struct CodeEmitter {
    package: String,
    imports: String,
    methods: Vec<String>,
}

impl CodeEmitter {
    pub fn new(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            imports: String::new(),
            methods: Vec::new(),
        }
    }

    /// Set the rendered import block.
    pub fn set_imports(&mut self, imports: impl Into<String>) -> &mut Self {
        self.imports = imports.into();
        self
    }

    /// Append a generated method.
    pub fn add_method(&mut self, method: impl Into<String>) -> &mut Self {
        self.methods.push(method.into());
        self
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Generate the unformatted file contents.
    pub fn generate(&self) -> String {
        let mut output = String::new();

        output.push_str(BANNER);
        output.push_str("\n\n");
        output.push_str("package ");
        output.push_str(&self.package);
        output.push_str("\n\n");

        if !self.imports.is_empty() {
            output.push_str(&self.imports);
            output.push('\n');
        }

        output.push_str(&self.methods.join("\n"));
        output
    }
}

/// A file written by a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    /// Import path of the package.
    pub package: String,
    /// Number of `Reset()` methods in the file.
    pub methods: usize,
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub files: Vec<GeneratedFile>,
}

/// Generates `reset.gen.go` for every package under a root directory.
///
/// # Example
///
/// ```no_run
/// use reset_gen::{Generator, Gofmt};
///
/// let mut generator = Generator::new();
/// generator.with_formatter(Gofmt::new());
/// let summary = generator.run("./internal/model")?;
/// for file in &summary.files {
///     println!("{}", file.path.display());
/// }
/// # Ok::<(), reset_gen::GenerateError>(())
/// ```
pub struct Generator {
    loader: Box<dyn PackageLoader>,
    formatter: Box<dyn Formatter>,
    writer: Box<dyn FileWriter>,
}

impl Default for Generator {
    fn default() -> Self {
        Self {
            loader: Box::new(SourceLoader::new()),
            formatter: Box::new(CanonicalFormatter::new()),
            writer: Box::new(FsWriter::new()),
        }
    }
}

impl fmt::Debug for Generator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Generator").finish_non_exhaustive()
    }
}

impl Generator {
    /// Create a generator that reads sources from disk, formats with the
    /// built-in formatter and writes to disk.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_loader(&mut self, loader: impl PackageLoader + 'static) -> &mut Self {
        self.loader = Box::new(loader);
        self
    }

    pub fn with_formatter(&mut self, formatter: impl Formatter + 'static) -> &mut Self {
        self.formatter = Box::new(formatter);
        self
    }

    pub fn with_writer(&mut self, writer: impl FileWriter + 'static) -> &mut Self {
        self.writer = Box::new(writer);
        self
    }

    /// Generate every package under `root`.
    ///
    /// Packages without source files or without annotated structs are
    /// skipped. The first error aborts the run.
    pub fn run(&self, root: impl AsRef<Path>) -> Result<Summary, GenerateError> {
        let root = root.as_ref();
        let root = std::path::absolute(root).map_err(|source| GenerateError::ResolvePath {
            path: root.to_path_buf(),
            source,
        })?;

        let packages = self.loader.load(&root)?;

        let targets: Vec<Vec<ResetTarget>> = packages
            .iter()
            .map(|package| collect_targets(&package.syntax))
            .collect();
        let pending: HashSet<TypeKey> = packages
            .iter()
            .zip(&targets)
            .flat_map(|(package, targets)| {
                targets
                    .iter()
                    .map(move |target| TypeKey::new(package.path.clone(), target.name.clone()))
            })
            .collect();

        let mut summary = Summary::default();
        for (package, targets) in packages.iter().zip(&targets) {
            if package.files.is_empty() {
                debug!(package = %package.path, "skipping package without files");
                continue;
            }
            if targets.is_empty() {
                debug!(package = %package.path, "skipping package without targets");
                continue;
            }
            summary
                .files
                .push(self.generate_package(package, targets, &pending)?);
        }

        Ok(summary)
    }

    fn generate_package(
        &self,
        package: &Package,
        targets: &[ResetTarget],
        pending: &HashSet<TypeKey>,
    ) -> Result<GeneratedFile, GenerateError> {
        let index = TypeNameIndex::from_defs(&package.defs);
        let receiver = receiver_name(|name| package.defs.contains_key(name));
        let reserved = package
            .defs
            .keys()
            .map(String::as_str)
            .chain([receiver.as_str()]);
        let qualifier = ImportQualifier::new(
            &package.types,
            package.path.clone(),
            ImportAliasTable::with_reserved(reserved),
        );
        let mut synth = ResetSynthesizer::new(&package.types, pending, qualifier);
        synth.set_receiver(receiver.as_str());

        let mut emitter = CodeEmitter::new(package.name.clone());
        for target in targets {
            let Some(named) = index.get(&target.name) else {
                warn!(
                    name = %target.name,
                    file = %target.file.display(),
                    line = target.line,
                    "target type not found, skipping"
                );
                continue;
            };
            match synth.method(named) {
                Some(method) => {
                    emitter.add_method(method);
                }
                None => warn!(name = %target.name, "target is not a struct type, skipping"),
            }
        }
        emitter.set_imports(synth.into_qualifier().into_aliases().render());

        let formatted = self
            .formatter
            .format(emitter.generate().as_bytes())
            .map_err(|source| GenerateError::Format {
                package: package.path.clone(),
                source,
            })?;

        let path = package.dir.join(OUTPUT_FILE);
        self.writer
            .write(&path, &formatted)
            .map_err(|source| GenerateError::Write {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), methods = emitter.len(), "wrote reset methods");

        Ok(GeneratedFile {
            path,
            package: package.path.clone(),
            methods: emitter.len(),
        })
    }
}

/// Run the default generator over `root`.
pub fn run(root: impl AsRef<Path>) -> Result<Summary, GenerateError> {
    Generator::new().run(root)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    use crate::error::{FormatError, LoadError};
    use crate::extractor::GoParser;
    use crate::loader::resolve_sources;
    use crate::resolver::SourcePackage;

    #[derive(Clone)]
    struct StaticLoader(Vec<Package>);

    impl PackageLoader for StaticLoader {
        fn load(&self, _root: &Path) -> Result<Vec<Package>, LoadError> {
            Ok(self.0.clone())
        }
    }

    struct FailingLoader;

    impl PackageLoader for FailingLoader {
        fn load(&self, root: &Path) -> Result<Vec<Package>, LoadError> {
            Err(LoadError::InvalidModule {
                path: root.join("go.mod"),
            })
        }
    }

    struct RejectingFormatter;

    impl Formatter for RejectingFormatter {
        fn format(&self, _source: &[u8]) -> Result<Vec<u8>, FormatError> {
            Err(FormatError::Unclosed { delimiter: '{' })
        }
    }

    #[derive(Clone, Default)]
    struct RecordingWriter {
        files: Rc<RefCell<Vec<(PathBuf, String)>>>,
        fail: bool,
    }

    impl FileWriter for RecordingWriter {
        fn write(&self, path: &Path, contents: &[u8]) -> io::Result<()> {
            self.files.borrow_mut().push((
                path.to_path_buf(),
                String::from_utf8_lossy(contents).into_owned(),
            ));
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only"));
            }
            Ok(())
        }
    }

    fn packages(sources: &[(&str, &str)]) -> Vec<Package> {
        let mut parser = GoParser::new().unwrap();
        let sources = sources
            .iter()
            .map(|(path, source)| {
                let dir = PathBuf::from("/src").join(path);
                let file = parser.parse_file(dir.join("x.go"), source).unwrap();
                SourcePackage {
                    name: file.package.clone(),
                    path: path.to_string(),
                    dir,
                    files: vec![file.path.clone()],
                    syntax: vec![file],
                }
            })
            .collect();
        resolve_sources(sources)
    }

    const MODEL: &str = r#"
package model

import "time"

// generate:reset
type Sample struct {
    Name  string
    When  time.Time
    Items []Item
}

// generate:reset
type Item struct {
    ID   int
    Tags map[string]string
}

type Plain struct{ X int }
"#;

    #[test]
    fn test_emitter_layout() {
        let mut emitter = CodeEmitter::new("model");
        emitter
            .set_imports("import (\n\t\"time\"\n)\n")
            .add_method("func (obj *A) Reset() {\n}\n")
            .add_method("func (obj *B) Reset() {\n}\n");
        assert_eq!(emitter.len(), 2);
        assert_eq!(
            emitter.generate(),
            "// Code generated by reset; DO NOT EDIT.\n\npackage model\n\nimport (\n\t\"time\"\n)\n\nfunc (obj *A) Reset() {\n}\n\nfunc (obj *B) Reset() {\n}\n"
        );

        let bare = CodeEmitter::new("model");
        assert!(bare.is_empty());
        assert_eq!(
            bare.generate(),
            "// Code generated by reset; DO NOT EDIT.\n\npackage model\n\n"
        );
    }

    #[test]
    fn test_run_writes_one_file_per_package() {
        let writer = RecordingWriter::default();
        let mut generator = Generator::new();
        generator
            .with_loader(StaticLoader(packages(&[
                ("example.com/app/model", MODEL),
                ("example.com/app/none", "package none\n\ntype X struct{}\n"),
            ])))
            .with_writer(writer.clone());

        let summary = generator.run("/src").unwrap();
        assert_eq!(
            summary.files,
            vec![GeneratedFile {
                path: PathBuf::from("/src/example.com/app/model/reset.gen.go"),
                package: "example.com/app/model".to_string(),
                methods: 2,
            }]
        );

        let files = writer.files.borrow();
        assert_eq!(files.len(), 1);
        assert_eq!(
            files[0].1,
            "// Code generated by reset; DO NOT EDIT.\n\
             \n\
             package model\n\
             \n\
             import (\n\
             \t\"time\"\n\
             )\n\
             \n\
             func (obj *Sample) Reset() {\n\
             \tif obj == nil {\n\
             \t\treturn\n\
             \t}\n\
             \n\
             \tobj.Name = \"\"\n\
             \tif r, ok := any(&obj.When).(interface{ Reset() }); ok {\n\
             \t\tr.Reset()\n\
             \t} else if r, ok := any(obj.When).(interface{ Reset() }); ok {\n\
             \t\tr.Reset()\n\
             \t} else {\n\
             \t\tobj.When = *new(time.Time)\n\
             \t}\n\
             \tobj.Items = obj.Items[:0]\n\
             }\n\
             \n\
             func (obj *Item) Reset() {\n\
             \tif obj == nil {\n\
             \t\treturn\n\
             \t}\n\
             \n\
             \tobj.ID = 0\n\
             \tclear(obj.Tags)\n\
             }\n"
        );
    }

    #[test]
    fn test_pending_targets_delegate() {
        let writer = RecordingWriter::default();
        let mut generator = Generator::new();
        generator
            .with_loader(StaticLoader(packages(&[(
                "example.com/app/model",
                r#"
package model

// generate:reset
type Outer struct {
    In  Inner
    Ptr *Inner
}

// generate:reset
type Inner struct{ N int }
"#,
            )])))
            .with_writer(writer.clone());

        generator.run("/src").unwrap();
        let files = writer.files.borrow();
        assert!(files[0].1.contains("\tobj.In.Reset()\n"));
        assert!(files[0].1.contains("\tif obj.Ptr != nil {\n\t\tobj.Ptr.Reset()\n\t}\n"));
    }

    #[test]
    fn test_alias_avoids_package_identifiers() {
        let writer = RecordingWriter::default();
        let mut generator = Generator::new();
        generator
            .with_loader(StaticLoader(packages(&[
                (
                    "example.com/app/model",
                    r#"
package model

import o "example.com/app/other"

type other struct{}

// generate:reset
type Sample struct {
    Item o.Item
}
"#,
                ),
                ("example.com/app/other", "package other\n\ntype Item struct{ ID int }\n"),
            ])))
            .with_writer(writer.clone());

        generator.run("/src").unwrap();
        let files = writer.files.borrow();
        assert!(files[0].1.contains("import (\n\tother1 \"example.com/app/other\"\n)\n"));
        assert!(files[0].1.contains("\tobj.Item = other1.Item{}\n"));
    }

    #[test]
    fn test_receiver_avoids_package_identifiers() {
        let writer = RecordingWriter::default();
        let mut generator = Generator::new();
        generator
            .with_loader(StaticLoader(packages(&[(
                "example.com/app/model",
                r#"
package model

type obj struct{ N int }

// generate:reset
type Sample struct {
    Inner obj
}
"#,
            )])))
            .with_writer(writer.clone());

        generator.run("/src").unwrap();
        let files = writer.files.borrow();
        assert!(files[0].1.contains("func (obj1 *Sample) Reset() {\n\tif obj1 == nil {\n"));
        assert!(files[0].1.contains("\tobj1.Inner = obj{}\n"));
    }

    #[test]
    fn test_skips_packages_without_targets_or_files() {
        let writer = RecordingWriter::default();
        let mut empty = packages(&[("example.com/app/model", MODEL)]);
        empty[0].files.clear();

        let mut generator = Generator::new();
        generator
            .with_loader(StaticLoader(
                empty
                    .into_iter()
                    .chain(packages(&[(
                        "example.com/app/alias",
                        "package alias\n\n// generate:reset\ntype Alias = int\n",
                    )]))
                    .collect(),
            ))
            .with_writer(writer.clone());

        let summary = generator.run("/src").unwrap();
        assert!(summary.files.is_empty());
        assert!(writer.files.borrow().is_empty());
    }

    #[test]
    fn test_missing_definition_is_skipped() {
        let writer = RecordingWriter::default();
        let mut loaded = packages(&[("example.com/app/model", MODEL)]);
        loaded[0].defs.remove("Sample");

        let mut generator = Generator::new();
        generator
            .with_loader(StaticLoader(loaded))
            .with_writer(writer.clone());

        let summary = generator.run("/src").unwrap();
        assert_eq!(summary.files[0].methods, 1);
        let files = writer.files.borrow();
        assert!(!files[0].1.contains("Sample"));
        assert!(files[0].1.contains("func (obj *Item) Reset()"));
        assert!(!files[0].1.contains("import"));
    }

    #[test]
    fn test_loader_failure_aborts() {
        let writer = RecordingWriter::default();
        let mut generator = Generator::new();
        generator.with_loader(FailingLoader).with_writer(writer.clone());

        let err = generator.run("/src").unwrap_err();
        assert!(matches!(err, GenerateError::Load(LoadError::InvalidModule { .. })));
        assert!(writer.files.borrow().is_empty());
    }

    #[test]
    fn test_format_failure_aborts_without_writing() {
        let writer = RecordingWriter::default();
        let mut generator = Generator::new();
        generator
            .with_loader(StaticLoader(packages(&[("example.com/app/model", MODEL)])))
            .with_formatter(RejectingFormatter)
            .with_writer(writer.clone());

        let err = generator.run("/src").unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Format { ref package, .. } if package == "example.com/app/model"
        ));
        assert!(writer.files.borrow().is_empty());
    }

    #[test]
    fn test_write_failure_stops_the_run() {
        let writer = RecordingWriter {
            fail: true,
            ..RecordingWriter::default()
        };
        let mut generator = Generator::new();
        generator
            .with_loader(StaticLoader(packages(&[
                ("example.com/app/a", "package a\n\n// generate:reset\ntype A struct{}\n"),
                ("example.com/app/b", "package b\n\n// generate:reset\ntype B struct{}\n"),
            ])))
            .with_writer(writer.clone());

        let err = generator.run("/src").unwrap_err();
        assert!(matches!(
            err,
            GenerateError::Write { ref path, .. } if path.ends_with("example.com/app/a/reset.gen.go")
        ));
        assert_eq!(writer.files.borrow().len(), 1);
    }
}
