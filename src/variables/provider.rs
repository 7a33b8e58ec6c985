//! Namespace providers.
//!
//! Each variable source (system functions, environments, file declarations,
//! request results) answers `has`/`get` for the names it owns. The
//! `VariableResolver` is the composite dispatcher that picks a provider for
//! each expression and post-processes the raw value it returns.

use super::encoding::unescape;
use super::VarError;
use std::collections::HashMap;

/// The namespace a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableKind {
    /// `$guid`, `$timestamp` and the other built-in functions
    System,
    /// Entries of the selected environment or `$shared`
    Environment,
    /// Variables declared in the request file
    File,
    /// Values captured from earlier responses (`login.response.body.$.token`)
    RequestChain,
    /// Values supplied interactively through `$prompt`
    Prompt,
}

/// A value produced by a provider, before any recursive re-processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variable {
    pub name: String,
    pub value: String,
    pub kind: VariableKind,
    /// Non-fatal remark about how the value was found
    pub warning: Option<String>,
}

impl Variable {
    pub fn new(name: impl Into<String>, value: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            kind,
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

/// A source of variables for one namespace.
pub trait VariableProvider {
    /// The namespace this provider serves.
    fn kind(&self) -> VariableKind;

    /// Whether `name` can be answered by this provider.
    fn has(&self, name: &str) -> bool;

    /// Looks up `name`, returning the raw (not yet re-processed) value.
    fn get(&self, name: &str) -> Result<Variable, VarError>;
}

/// Variables declared in the request file (`@name = value`).
///
/// Values are stored raw and may themselves contain placeholders; the
/// resolver re-processes them on every lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileVariables {
    variables: HashMap<String, String>,
}

impl FileVariables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a variable, decoding backslash escapes in its value.
    pub fn declare(&mut self, name: impl Into<String>, raw_value: &str) {
        self.variables.insert(name.into(), unescape(raw_value));
    }

    /// Inserts a value verbatim, without escape decoding.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }

    pub fn get_raw(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl VariableProvider for FileVariables {
    fn kind(&self) -> VariableKind {
        VariableKind::File
    }

    fn has(&self, name: &str) -> bool {
        self.variables.contains_key(name)
    }

    fn get(&self, name: &str) -> Result<Variable, VarError> {
        self.variables
            .get(name)
            .map(|value| Variable::new(name, value.clone(), VariableKind::File))
            .ok_or_else(|| VarError::UndefinedVariable(name.to_string()))
    }
}
