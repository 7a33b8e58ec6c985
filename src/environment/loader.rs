//! Environment file loader
//!
//! Loads the environment table from `.http-client-env.json` or
//! `http-client.env.json`, starting in the request file's directory and
//! walking up to 3 parent directories.

use super::models::{Environment, EnvironmentTable, SHARED_ENVIRONMENT};
use crate::models::Value;
use log::debug;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during environment loading
#[derive(Debug, Error)]
pub enum EnvError {
    /// Failed to parse JSON content
    #[error("failed to parse environment file: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Invalid format or structure in the environment file
    #[error("invalid environment format: {0}")]
    InvalidFormat(String),

    /// IO error occurred while reading file
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Supported environment file names in order of preference
const ENV_FILE_NAMES: &[&str] = &[".http-client-env.json", "http-client.env.json"];

/// Maximum number of parent directories to search
const MAX_PARENT_SEARCH_DEPTH: usize = 3;

/// Key selecting the default environment inside the file
const DEFAULT_ENVIRONMENT_KEY: &str = "$default";

/// Loads the environment table for requests in `start_dir`.
///
/// Returns an empty table when no environment file is found. A file that
/// exists but cannot be parsed is an error.
pub fn load_environments(start_dir: &Path) -> Result<EnvironmentTable, EnvError> {
    let env_file = match find_environment_file(start_dir) {
        Some(path) => path,
        None => {
            debug!(
                "no environment file found from {}; using empty table",
                start_dir.display()
            );
            return Ok(EnvironmentTable::new());
        }
    };

    debug!("loading environments from {}", env_file.display());
    load_environment_file(&env_file)
}

/// Loads the environment table from an explicit file path.
pub fn load_environment_file(path: &Path) -> Result<EnvironmentTable, EnvError> {
    let content = fs::read_to_string(path)?;
    parse_environments(&content)
}

/// Parses environment JSON text into a table.
pub fn parse_environments(content: &str) -> Result<EnvironmentTable, EnvError> {
    let raw: serde_json::Value = serde_json::from_str(content)?;
    parse_environment_value(raw)
}

/// Finds the environment file by searching the directory and its parents
fn find_environment_file(start_dir: &Path) -> Option<PathBuf> {
    let mut current_path = start_dir.to_path_buf();

    for _ in 0..=MAX_PARENT_SEARCH_DEPTH {
        for filename in ENV_FILE_NAMES {
            let candidate = current_path.join(filename);
            if candidate.is_file() {
                return Some(candidate);
            }
        }

        match current_path.parent() {
            Some(parent) => current_path = parent.to_path_buf(),
            None => break,
        }
    }

    None
}

fn parse_environment_value(raw: serde_json::Value) -> Result<EnvironmentTable, EnvError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| EnvError::InvalidFormat("root must be a JSON object".to_string()))?;

    let mut table = EnvironmentTable::new();

    for (key, value) in obj.iter() {
        match key.as_str() {
            SHARED_ENVIRONMENT | "shared" => {
                table.shared = parse_variable_map(value, SHARED_ENVIRONMENT)?;
            }
            DEFAULT_ENVIRONMENT_KEY => {
                table.default_environment = value.as_str().map(str::to_string);
            }
            env_name => {
                if !is_valid_identifier(env_name) {
                    return Err(EnvError::InvalidFormat(format!(
                        "invalid environment name '{}': names must be alphanumeric with underscores/hyphens",
                        env_name
                    )));
                }

                let variables = parse_variable_map(value, env_name)?;
                table.add_environment(Environment::with_variables(env_name, variables));
            }
        }
    }

    if let Some(ref name) = table.default_environment {
        if !table.environments.contains_key(name) {
            return Err(EnvError::InvalidFormat(format!(
                "default environment '{}' does not exist",
                name
            )));
        }
    }

    Ok(table)
}

/// Parses a JSON object into a variable map, stringifying scalar values.
fn parse_variable_map(
    value: &serde_json::Value,
    context: &str,
) -> Result<HashMap<String, String>, EnvError> {
    let obj = value
        .as_object()
        .ok_or_else(|| EnvError::InvalidFormat(format!("'{}' must be a JSON object", context)))?;

    let mut map = HashMap::with_capacity(obj.len());
    for (key, val) in obj.iter() {
        let scalar = Value::from_json(val).ok_or_else(|| {
            EnvError::InvalidFormat(format!(
                "variable '{}' in '{}' must be a string, number, boolean or null",
                key, context
            ))
        })?;
        map.insert(key.clone(), scalar.to_string());
    }

    Ok(map)
}

/// Environment names start with a letter or underscore and continue with
/// letters, digits, underscores or hyphens. `shared` and `$`-prefixed names are reserved.
fn is_valid_identifier(name: &str) -> bool {
    if name == "shared" || name.starts_with('$') {
        return false;
    }

    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
