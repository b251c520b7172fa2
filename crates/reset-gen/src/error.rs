//! Error types for loading, formatting and generation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Error raised while discovering, parsing or resolving Go packages.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Reading a source or module file failed.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Directory traversal failed.
    #[error("failed to walk source tree: {0}")]
    Walk(#[from] walkdir::Error),

    /// The Go grammar could not be loaded into the parser.
    #[error("incompatible tree-sitter grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    /// The parser produced no tree.
    #[error("failed to parse {}", file.display())]
    Parse { file: PathBuf },

    /// The source contains a syntax error.
    #[error("syntax error in {}:{line}:{column}", file.display())]
    Syntax {
        file: PathBuf,
        line: usize,
        column: usize,
    },

    /// A source file without a `package` clause.
    #[error("missing package clause in {}", file.display())]
    MissingPackageClause { file: PathBuf },

    /// Files of one directory disagree on the package name.
    #[error("found packages {expected} and {found} in {}", dir.display())]
    PackageMismatch {
        dir: PathBuf,
        expected: String,
        found: String,
    },

    /// `go.mod` has no usable `module` directive.
    #[error("no module directive in {}", path.display())]
    InvalidModule { path: PathBuf },
}

/// Error raised while canonicalizing generated source.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("generated source is not valid UTF-8")]
    NotUtf8(#[from] std::string::FromUtf8Error),

    /// A closing delimiter without a matching opener.
    #[error("unbalanced '{delimiter}' on line {line}")]
    Unbalanced { line: usize, delimiter: char },

    /// Input ended inside a block, literal or comment.
    #[error("unclosed '{delimiter}' at end of input")]
    Unclosed { delimiter: char },

    /// The external formatter could not be started or fed.
    #[error("failed to run {}: {source}", program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The external formatter rejected the source.
    #[error("gofmt exited with {status}: {stderr}")]
    Gofmt { status: String, stderr: String },
}

/// Error type for a generation run. Every variant aborts the run.
#[derive(Debug, Error)]
pub enum GenerateError {
    /// The root directory could not be made absolute.
    #[error("failed to resolve root directory {}: {source}", path.display())]
    ResolvePath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Package discovery or resolution failed. Nothing was written.
    #[error("failed to load packages: {0}")]
    Load(#[from] LoadError),

    /// The generated buffer for a package could not be formatted.
    #[error("failed to format generated code for package {package}: {source}")]
    Format {
        package: String,
        #[source]
        source: FormatError,
    },

    /// Persisting the generated file failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}
