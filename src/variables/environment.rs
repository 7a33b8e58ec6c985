//! Environment namespace
//!
//! Resolves names against the environment table as seen from the selected
//! environment: its own entries first, then the `$shared` overlay.

use super::provider::{Variable, VariableKind, VariableProvider};
use super::VarError;
use crate::environment::EnvironmentTable;

/// The environment table viewed from one selected environment.
///
/// An empty `current` name means no environment is selected; only `$shared`
/// entries are visible then.
#[derive(Debug, Clone, Copy)]
pub struct EnvironmentScope<'a> {
    table: &'a EnvironmentTable,
    current: &'a str,
}

impl<'a> EnvironmentScope<'a> {
    pub fn new(table: &'a EnvironmentTable, current: &'a str) -> Self {
        Self { table, current }
    }

    /// Looks up a name without building a `Variable`.
    pub fn lookup(&self, name: &str) -> Option<&'a String> {
        self.table.get_variable(self.current, name)
    }

    fn is_unknown_environment(&self) -> bool {
        !self.current.is_empty() && !self.table.has_environment(self.current)
    }
}

impl VariableProvider for EnvironmentScope<'_> {
    fn kind(&self) -> VariableKind {
        VariableKind::Environment
    }

    fn has(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    fn get(&self, name: &str) -> Result<Variable, VarError> {
        let value = self
            .lookup(name)
            .ok_or_else(|| VarError::UndefinedVariable(name.to_string()))?;

        let variable = Variable::new(name, value.clone(), VariableKind::Environment);
        if self.is_unknown_environment() {
            return Ok(variable.with_warning(format!(
                "environment '{}' is not defined; value taken from $shared",
                self.current
            )));
        }
        Ok(variable)
    }
}

/// Resolves an environment variable by name, returning `None` when absent.
///
/// # Example
///
/// ```
/// use restfile::environment::{Environment, EnvironmentTable};
/// use restfile::variables::environment::resolve_environment_variable;
///
/// let mut table = EnvironmentTable::new();
/// table.set_shared("A", "1");
/// let mut dev = Environment::new("dev");
/// dev.set("A", "2");
/// table.add_environment(dev);
///
/// assert_eq!(resolve_environment_variable("A", &table, "dev"), Some("2".to_string()));
/// assert_eq!(resolve_environment_variable("A", &table, ""), Some("1".to_string()));
/// ```
pub fn resolve_environment_variable(
    name: &str,
    table: &EnvironmentTable,
    current: &str,
) -> Option<String> {
    EnvironmentScope::new(table, current).lookup(name).cloned()
}
