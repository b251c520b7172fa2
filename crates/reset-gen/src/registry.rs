//! Index of the type names declared in one package.
//!
//! Built once per package from the loader's definitions table, keeping only
//! type-name objects. The synthesizer enters through [`TypeNameIndex::get`]
//! to find a target's declaration.

use std::collections::{BTreeMap, HashMap};

use crate::types::{Named, Object};

/// Identifier -> declared type of one package.
#[derive(Debug, Clone, Default)]
pub struct TypeNameIndex {
    names: HashMap<String, Named>,
}

impl TypeNameIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from a definitions table.
    pub fn from_defs(defs: &BTreeMap<String, Object>) -> Self {
        let names = defs
            .iter()
            .filter_map(|(ident, object)| match object {
                Object::TypeName(named) => Some((ident.clone(), named.clone())),
                _ => None,
            })
            .collect();
        Self { names }
    }

    /// Look up a type by identifier.
    pub fn get(&self, ident: &str) -> Option<&Named> {
        self.names.get(ident)
    }

    /// Check if an identifier names a type.
    pub fn contains(&self, ident: &str) -> bool {
        self.names.contains_key(ident)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
