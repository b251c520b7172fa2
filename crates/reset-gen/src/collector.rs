//! Discovery of annotated struct declarations.

use std::path::PathBuf;

use tracing::debug;

use crate::ast::{Decl, File};

/// Doc comment line that marks a struct for generation.
pub const DIRECTIVE: &str = "// generate:reset";

/// A struct declaration that receives a generated `Reset()` method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResetTarget {
    pub name: String,
    /// File holding the declaration.
    pub file: PathBuf,
    /// 1-based line of the type name.
    pub line: usize,
}

/// Collect every annotated struct of one package, in file then declaration
/// order.
///
/// The directive may sit on the spec itself or on the enclosing `type`
/// declaration. Annotated aliases, non-struct types and generic declarations
/// are ignored.
pub fn collect_targets(files: &[File]) -> Vec<ResetTarget> {
    let mut targets = Vec::new();

    for file in files {
        for decl in &file.decls {
            let Decl::Type(group) = decl else {
                continue;
            };
            let decl_marked = group.doc.as_ref().is_some_and(|doc| doc.has_line(DIRECTIVE));

            for spec in &group.specs {
                let marked =
                    decl_marked || spec.doc.as_ref().is_some_and(|doc| doc.has_line(DIRECTIVE));
                if !marked || spec.alias || !spec.ty.is_struct() {
                    continue;
                }
                if !spec.type_params.is_empty() {
                    debug!(name = %spec.name, "skipping generic declaration");
                    continue;
                }
                targets.push(ResetTarget {
                    name: spec.name.clone(),
                    file: file.path.clone(),
                    line: spec.line,
                });
            }
        }
    }

    targets
}
