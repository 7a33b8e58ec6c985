//! Environment data models
//!
//! An environment table maps environment names to variable sets. The reserved
//! `$shared` entry is overlaid beneath every named environment: a lookup under
//! any environment name sees the shared entries, and the named environment's
//! own entries win on conflict.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Name of the reserved environment whose entries are visible everywhere.
pub const SHARED_ENVIRONMENT: &str = "$shared";

/// Represents a single environment with its variables
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Environment {
    /// Environment name (e.g., "dev", "staging", "production")
    pub name: String,

    /// Variable key-value pairs for this environment
    #[serde(default)]
    pub variables: HashMap<String, String>,
}

impl Environment {
    /// Creates a new environment with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            variables: HashMap::new(),
        }
    }

    /// Creates a new environment with name and variables
    pub fn with_variables(name: impl Into<String>, variables: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            variables,
        }
    }

    /// Gets a variable value by name
    pub fn get(&self, key: &str) -> Option<&String> {
        self.variables.get(key)
    }

    /// Sets a variable value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(key.into(), value.into());
    }

    /// Checks if a variable exists
    pub fn contains(&self, key: &str) -> bool {
        self.variables.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

/// All configured environments plus the shared overlay.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentTable {
    /// Named environments (e.g., "dev", "staging", "production")
    #[serde(default)]
    pub environments: HashMap<String, Environment>,

    /// Entries of the reserved `$shared` environment
    #[serde(default)]
    pub shared: HashMap<String, String>,

    /// Environment selected by the configuration file, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_environment: Option<String>,
}

impl EnvironmentTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a named environment.
    ///
    /// Adding an environment named `$shared` replaces the shared overlay instead.
    pub fn add_environment(&mut self, env: Environment) {
        if env.name == SHARED_ENVIRONMENT {
            self.shared = env.variables;
            return;
        }
        self.environments.insert(env.name.clone(), env);
    }

    /// Sets a shared variable
    pub fn set_shared(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.shared.insert(key.into(), value.into());
    }

    /// Gets an environment by name
    pub fn get_environment(&self, name: &str) -> Option<&Environment> {
        self.environments.get(name)
    }

    /// Checks if an environment exists. `$shared` always exists.
    pub fn has_environment(&self, name: &str) -> bool {
        name == SHARED_ENVIRONMENT || self.environments.contains_key(name)
    }

    /// Looks up a variable only in the shared overlay.
    pub fn get_shared(&self, key: &str) -> Option<&String> {
        self.shared.get(key)
    }

    /// Looks up a variable only in the named environment (no overlay).
    pub fn get_own(&self, environment: &str, key: &str) -> Option<&String> {
        self.environments
            .get(environment)
            .and_then(|env| env.get(key))
    }

    /// Gets a variable as seen from `environment`: its own entry first, then `$shared`.
    ///
    /// An empty environment name means "no environment selected" and sees only
    /// the shared entries.
    pub fn get_variable(&self, environment: &str, key: &str) -> Option<&String> {
        if !environment.is_empty() {
            if let Some(value) = self.get_own(environment, key) {
                return Some(value);
            }
        }
        self.shared.get(key)
    }

    /// Lists all named environments (excluding `$shared`), sorted.
    pub fn list_environments(&self) -> Vec<String> {
        let mut names: Vec<String> = self.environments.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.environments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.environments.is_empty()
    }
}
