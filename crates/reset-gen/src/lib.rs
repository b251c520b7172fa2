//! # reset-gen
//!
//! Generator for Go `Reset()` methods. Every struct marked with a
//! `// generate:reset` doc comment receives a nil-safe method that restores
//! an instance to its zero state, delegating to nested `Reset()` methods
//! where they exist. The methods of a package land in `reset.gen.go` next to
//! its sources.
//!
//! ## Features
//!
//! - Go sources parsed with tree-sitter, no Go toolchain required
//! - Type resolution across every package under the root, including method
//!   sets with promoted methods
//! - Unexported fields of foreign packages are never referenced
//! - Deterministic output: re-running on unchanged sources rewrites identical
//!   bytes
//! - Loader, formatter and writer are swappable strategies
//!
//! ## Quick Start
//!
//! Annotate a struct:
//!
//! ```go
//! // generate:reset
//! type Request struct {
//!     ID      int
//!     Headers map[string]string
//!     Body    []byte
//!     Parent  *Request
//! }
//! ```
//!
//! Then run the generator over the module:
//!
//! ```no_run
//! let summary = reset_gen::run("./internal")?;
//! println!("wrote {} files", summary.files.len());
//! # Ok::<(), reset_gen::GenerateError>(())
//! ```
//!
//! which produces:
//!
//! ```go
//! func (obj *Request) Reset() {
//!     if obj == nil {
//!         return
//!     }
//!
//!     obj.ID = 0
//!     clear(obj.Headers)
//!     obj.Body = obj.Body[:0]
//!     if obj.Parent != nil {
//!         obj.Parent.Reset()
//!     }
//! }
//! ```
//!
//! ## Field Rules
//!
//! | Field type | Generated statement |
//! |------------|---------------------|
//! | `*T` | `if f != nil { f.Reset() }` or reset through `*f` |
//! | `[]T` | `f = f[:0]` |
//! | `map[K]V` | `clear(f)` |
//! | struct with `Reset()` | `f.Reset()` |
//! | other struct | `f = T{}` |
//! | interface requiring `Reset()` | `if f != nil { f.Reset() }` |
//! | other interface | checked assertion to `interface{ Reset() }` |
//! | `[N]T` | `f = [N]T{}` |
//! | `string`, `bool`, numbers | `""`, `false`, `0` |
//! | type from an unloaded package | `Reset()` if the value has one at run time, else `f = *new(T)` |
//! | `chan`, `func` | `f = nil` |

pub mod ast;
pub mod collector;
pub mod error;
mod extractor;
pub mod format;
pub mod generator;
pub mod imports;
pub mod loader;
pub mod output;
pub mod registry;
pub mod resolver;
pub mod synth;
pub mod types;

pub use collector::{DIRECTIVE, ResetTarget, collect_targets};
pub use error::{FormatError, GenerateError, LoadError};
pub use extractor::GoParser;
pub use format::{CanonicalFormatter, Formatter, Gofmt};
pub use generator::{BANNER, CodeEmitter, GeneratedFile, Generator, Summary, run};
pub use imports::{ImportAliasTable, ImportQualifier};
pub use loader::{Package, PackageLoader, SourceLoader};
pub use output::{FileWriter, FsWriter, OUTPUT_FILE, OUTPUT_MODE};
pub use registry::TypeNameIndex;
pub use synth::ResetSynthesizer;
