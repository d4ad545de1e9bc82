use std::fmt;

use rustc_hash::FxHashMap;

use crate::ast::Expression;

/// A user function introduced with `deffn`.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Expression,
}

impl FunctionDef {
    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

/// Renders the signature, e.g. `add(a,b)`.
impl fmt::Display for FunctionDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.params.join(","))
    }
}

/// Function definitions by name. Redefining a name replaces the old definition.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: FxHashMap<String, FunctionDef>,
}

impl FunctionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a definition, returning the one it replaced.
    pub fn define(
        &mut self,
        name: impl Into<String>,
        params: Vec<String>,
        body: Expression,
    ) -> Option<FunctionDef> {
        let name = name.into();
        self.functions.insert(
            name.clone(),
            FunctionDef {
                name,
                params,
                body,
            },
        )
    }

    pub fn resolve(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Definitions sorted by name.
    pub fn definitions(&self) -> Vec<&FunctionDef> {
        let mut definitions = self.functions.values().collect::<Vec<_>>();
        definitions.sort_by(|left, right| left.name.cmp(&right.name));
        definitions
    }
}
