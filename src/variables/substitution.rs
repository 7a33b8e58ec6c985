//! Variable substitution engine
//!
//! [`VariableResolver`] replaces every `{{expression}}` in a piece of request
//! text. Each expression is dispatched by strict precedence:
//!
//! 1. `$name args...` goes to the system function library
//! 2. `req.response.(headers|body).path` goes to request chaining
//! 3. a declared file variable, whose value is processed again
//! 4. an environment variable (`$shared` overlay), whose value is processed again
//!
//! A leading `%` percent-encodes the final value. Results are cached per
//! resolver by the exact trimmed expression, so `{{$guid}}` yields the same
//! value every time it recurs within one resolver. Anything that cannot be
//! resolved is left in the output verbatim.

use super::encoding::percent_encode;
use super::environment::EnvironmentScope;
use super::provider::{FileVariables, VariableProvider};
use super::request::{is_request_reference, resolve_request_variable, RequestResults};
use super::system::{Prompter, SystemFunctions};
use super::VarError;
use crate::environment::EnvironmentTable;
use crate::models::RequestResult;
use log::{debug, trace, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Maximum nesting of file/environment values that reference other variables.
pub const MAX_RECURSION_DEPTH: usize = 32;

/// Non-greedy `{{...}}` span.
static VARIABLE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{(.+?)\}\}").expect("Failed to compile variable regex"));

/// Resolves `{{...}}` placeholders for one run.
///
/// A resolver owns its cache and is not meant to be shared between concurrent
/// callers; build one per resolution pass.
///
/// # Examples
///
/// ```
/// use restfile::environment::{Environment, EnvironmentTable};
/// use restfile::variables::VariableResolver;
///
/// let mut table = EnvironmentTable::new();
/// let mut dev = Environment::new("dev");
/// dev.set("host", "localhost:3000");
/// table.add_environment(dev);
///
/// let mut resolver = VariableResolver::new(table, "dev");
/// resolver.declare_file_variable("baseUrl", "http://{{host}}");
///
/// let text = resolver.process("GET {{baseUrl}}/users?q={{%query}}").unwrap();
/// assert_eq!(text, "GET http://localhost:3000/users?q={{%query}}");
/// ```
pub struct VariableResolver {
    environments: EnvironmentTable,
    current_environment: String,
    base_dir: Option<PathBuf>,
    file_variables: FileVariables,
    request_results: RequestResults,
    prompter: Option<Box<dyn Prompter>>,
    cache: HashMap<String, String>,
}

impl VariableResolver {
    /// Creates a resolver over `environments` with `current_environment`
    /// selected. An empty name selects no environment (only `$shared`).
    pub fn new(environments: EnvironmentTable, current_environment: impl Into<String>) -> Self {
        Self {
            environments,
            current_environment: current_environment.into(),
            base_dir: None,
            file_variables: FileVariables::new(),
            request_results: RequestResults::new(),
            prompter: None,
            cache: HashMap::new(),
        }
    }

    /// Sets the directory `$dotenv` reads from, normally the request file's directory.
    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Installs the callback used by `$prompt`.
    pub fn with_prompter(mut self, prompter: impl Prompter + 'static) -> Self {
        self.prompter = Some(Box::new(prompter));
        self
    }

    pub fn current_environment(&self) -> &str {
        &self.current_environment
    }

    pub fn environments(&self) -> &EnvironmentTable {
        &self.environments
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    /// Declares an `@name = value` file variable. Backslash escapes in the
    /// value are decoded; placeholders in it resolve on each use.
    pub fn declare_file_variable(&mut self, name: impl Into<String>, raw_value: &str) {
        self.file_variables.declare(name, raw_value);
    }

    /// Sets a file variable verbatim, without escape decoding.
    pub fn set_file_variable(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.file_variables.insert(name, value);
    }

    pub fn set_file_variables<I, K, V>(&mut self, variables: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (name, value) in variables {
            self.file_variables.insert(name, value);
        }
    }

    pub fn file_variables(&self) -> &FileVariables {
        &self.file_variables
    }

    /// Registers the response of a named request for later chaining.
    pub fn set_request_result(&mut self, name: impl Into<String>, result: RequestResult) {
        self.request_results.set(name, result);
    }

    pub fn request_results(&self) -> &RequestResults {
        &self.request_results
    }

    /// Forgets every cached expression value.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    /// Replaces every resolvable `{{...}}` placeholder in `text`.
    ///
    /// Unresolvable placeholders stay in the output as written; callers that
    /// need strict validation can check the result with [`find_unresolved`].
    ///
    /// # Errors
    ///
    /// Only [`VarError::Internal`] is returned.
    pub fn process(&mut self, text: &str) -> Result<String, VarError> {
        self.process_at_depth(text, 0)
    }

    /// Resolves a single expression (the text between the braces), reporting
    /// why it failed instead of leaving it in place.
    pub fn resolve_expression(&mut self, expression: &str) -> Result<String, VarError> {
        self.resolve_cached(expression.trim(), 0)
    }

    fn process_at_depth(&mut self, text: &str, depth: usize) -> Result<String, VarError> {
        if !text.contains("{{") {
            return Ok(text.to_string());
        }
        if depth > MAX_RECURSION_DEPTH {
            return Err(VarError::RecursionLimit(text.to_string()));
        }

        let mut result = String::with_capacity(text.len());
        let mut last_match_end = 0;

        for cap in VARIABLE_REGEX.captures_iter(text) {
            let (Some(full_match), Some(inner)) = (cap.get(0), cap.get(1)) else {
                return Err(VarError::Internal(format!(
                    "placeholder match without expression in '{}'",
                    text
                )));
            };
            result.push_str(&text[last_match_end..full_match.start()]);
            last_match_end = full_match.end();

            match self.resolve_cached(inner.as_str().trim(), depth) {
                Ok(value) => result.push_str(&value),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e @ VarError::RecursionLimit(_)) if depth > 0 => return Err(e),
                Err(e) => {
                    debug!("leaving {} unresolved: {}", full_match.as_str(), e);
                    result.push_str(full_match.as_str());
                }
            }
        }

        result.push_str(&text[last_match_end..]);
        Ok(result)
    }

    fn resolve_cached(&mut self, expression: &str, depth: usize) -> Result<String, VarError> {
        if let Some(cached) = self.cache.get(expression) {
            trace!("cache hit for '{}'", expression);
            return Ok(cached.clone());
        }

        let (lookup, encode) = match expression.strip_prefix('%') {
            Some(rest) => (rest.trim_start(), true),
            None => (expression, false),
        };

        let value = self.dispatch(lookup, depth)?;
        let value = if encode { percent_encode(&value) } else { value };

        self.cache.insert(expression.to_string(), value.clone());
        Ok(value)
    }

    fn dispatch(&mut self, expression: &str, depth: usize) -> Result<String, VarError> {
        if expression.is_empty() {
            return Err(VarError::InvalidSyntax("empty expression".to_string()));
        }

        if expression.starts_with('$') {
            return SystemFunctions::new(&self.environments, &self.current_environment)
                .with_base_dir(self.base_dir.as_deref())
                .with_prompter(self.prompter.as_deref())
                .call(expression)
                .map(|variable| variable.value);
        }

        if is_request_reference(expression) {
            return resolve_request_variable(&self.request_results, expression);
        }

        if self.file_variables.has(expression) {
            let raw = self.file_variables.get(expression)?.value;
            return self.process_at_depth(&raw, depth + 1);
        }

        let variable = EnvironmentScope::new(&self.environments, &self.current_environment)
            .get(expression)?;
        if let Some(warning) = &variable.warning {
            warn!("{}: {}", expression, warning);
        }
        self.process_at_depth(&variable.value, depth + 1)
    }
}

/// Returns the expressions of every `{{...}}` placeholder left in `text`.
pub fn find_unresolved(text: &str) -> Vec<String> {
    VARIABLE_REGEX
        .captures_iter(text)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::Environment;
    use proptest::prelude::*;
    use serial_test::serial;

    fn create_test_resolver() -> VariableResolver {
        let mut table = EnvironmentTable::new();
        table.set_shared("A", "1");
        table.set_shared("version", "v1");

        let mut staging = Environment::new("staging");
        staging.set("A", "2");
        staging.set("host", "staging.example.com");
        staging.set("apiRoot", "https://{{host}}/{{version}}");
        table.add_environment(staging);

        let mut resolver = VariableResolver::new(table, "staging");
        resolver.set_file_variable("baseUrl", "https://api.example.com");
        resolver.set_file_variable("apiKey", "secret-key-123");
        resolver.set_file_variable("port", "8080");
        resolver
    }

    #[test]
    fn test_simple_substitution() {
        let mut resolver = create_test_resolver();
        let result = resolver.process("GET {{baseUrl}}/users").unwrap();
        assert_eq!(result, "GET https://api.example.com/users");
    }

    #[test]
    fn test_multiple_variables() {
        let mut resolver = create_test_resolver();
        let result = resolver
            .process("GET {{baseUrl}}:{{port}}/api?key={{apiKey}}")
            .unwrap();
        assert_eq!(result, "GET https://api.example.com:8080/api?key=secret-key-123");
    }

    #[test]
    fn test_whitespace_inside_braces() {
        let mut resolver = create_test_resolver();
        assert_eq!(resolver.process("{{  port }}").unwrap(), "8080");
    }

    #[test]
    fn test_environment_overlay() {
        let mut resolver = create_test_resolver();
        assert_eq!(resolver.process("{{A}}").unwrap(), "2");
        assert_eq!(resolver.process("{{version}}").unwrap(), "v1");

        let mut table = EnvironmentTable::new();
        table.set_shared("A", "1");
        let mut dev = Environment::new("dev");
        dev.set("A", "2");
        table.add_environment(dev);

        let mut unset = VariableResolver::new(table, "");
        assert_eq!(unset.process("{{A}}").unwrap(), "1");
    }

    #[test]
    fn test_environment_values_are_reprocessed() {
        let mut resolver = create_test_resolver();
        assert_eq!(
            resolver.process("{{apiRoot}}/users").unwrap(),
            "https://staging.example.com/v1/users"
        );
    }

    #[test]
    fn test_nested_file_variables() {
        let mut resolver = create_test_resolver();
        resolver.set_file_variable("usersUrl", "{{baseUrl}}/users");
        resolver.set_file_variable("userUrl", "{{usersUrl}}/{{id}}");
        resolver.set_file_variable("id", "42");

        assert_eq!(
            resolver.process("GET {{userUrl}}").unwrap(),
            "GET https://api.example.com/users/42"
        );
    }

    #[test]
    fn test_file_variables_shadow_environment() {
        let mut resolver = create_test_resolver();
        resolver.set_file_variable("host", "file.example.com");
        assert_eq!(resolver.process("{{host}}").unwrap(), "file.example.com");
    }

    #[test]
    fn test_declared_values_are_unescaped() {
        let mut resolver = create_test_resolver();
        resolver.declare_file_variable("body", r#"{\"port\": {{port}}}\n"#);
        assert_eq!(resolver.process("{{body}}").unwrap(), "{\"port\": 8080}\n");
    }

    #[test]
    fn test_partial_resolution() {
        let mut table = EnvironmentTable::new();
        table.set_shared("known", "value");
        let mut resolver = VariableResolver::new(table, "");

        assert_eq!(
            resolver.process("{{known}}-{{unknown}}").unwrap(),
            "value-{{unknown}}"
        );
    }

    #[test]
    fn test_unresolved_inner_reference_is_kept() {
        let mut resolver = create_test_resolver();
        resolver.set_file_variable("broken", "{{baseUrl}}/{{missing}}");

        assert_eq!(
            resolver.process("{{broken}}").unwrap(),
            "https://api.example.com/{{missing}}"
        );
    }

    #[test]
    fn test_percent_encoding() {
        let mut resolver = create_test_resolver();
        resolver.set_file_variable("q", "hello world");

        assert_eq!(resolver.process("?q={{%q}}").unwrap(), "?q=hello%20world");
        assert_eq!(resolver.process("?q={{q}}").unwrap(), "?q=hello world");
        assert_eq!(resolver.process("{{% q}}").unwrap(), "hello%20world");
    }

    #[test]
    fn test_cache_makes_random_values_stable() {
        let mut resolver = create_test_resolver();

        let first = resolver.process("{{$guid}}|{{$randomInt 0 1000000}}").unwrap();
        let second = resolver.process("{{$guid}}|{{$randomInt 0 1000000}}").unwrap();
        assert_eq!(first, second);

        let (guid, _) = first.split_once('|').unwrap();
        assert_eq!(resolver.process("{{ $guid }}").unwrap(), guid);
    }

    #[test]
    fn test_cache_is_per_resolver() {
        let mut a = create_test_resolver();
        let mut b = create_test_resolver();
        assert_ne!(a.process("{{$guid}}").unwrap(), b.process("{{$guid}}").unwrap());
    }

    #[test]
    fn test_clear_cache() {
        let mut resolver = create_test_resolver();
        let first = resolver.process("{{$guid}}").unwrap();
        resolver.clear_cache();
        assert_ne!(resolver.process("{{$guid}}").unwrap(), first);
    }

    #[test]
    fn test_self_reference_stays_unresolved() {
        let mut resolver = create_test_resolver();
        resolver.set_file_variable("loop", "x{{loop}}");

        assert_eq!(resolver.process("a {{loop}} b").unwrap(), "a {{loop}} b");
    }

    #[test]
    fn test_mutual_reference_stays_unresolved() {
        let mut resolver = create_test_resolver();
        resolver.set_file_variable("ping", "{{pong}}");
        resolver.set_file_variable("pong", "{{ping}}");

        assert_eq!(
            resolver.process("{{ping}} {{port}}").unwrap(),
            "{{ping}} 8080"
        );
    }

    #[test]
    fn test_deep_but_finite_nesting_resolves() {
        let mut resolver = create_test_resolver();
        resolver.set_file_variable("v0", "end");
        for i in 1..=MAX_RECURSION_DEPTH {
            resolver.set_file_variable(format!("v{}", i), format!("{{{{v{}}}}}", i - 1));
        }

        let top = format!("{{{{v{}}}}}", MAX_RECURSION_DEPTH);
        assert_eq!(resolver.process(&top).unwrap(), "end");
    }

    #[test]
    #[serial]
    fn test_system_values_are_not_reprocessed() {
        let mut resolver = create_test_resolver();
        std::env::set_var("RESTFILE_SUBSTITUTION_RAW", "{{port}}");

        assert_eq!(
            resolver
                .process("{{$processEnv RESTFILE_SUBSTITUTION_RAW}}")
                .unwrap(),
            "{{port}}"
        );
        std::env::remove_var("RESTFILE_SUBSTITUTION_RAW");
    }

    #[test]
    fn test_failed_system_calls_stay_unresolved() {
        let mut resolver = create_test_resolver();

        for text in [
            "{{$randomInt 10 1}}",
            "{{$prompt name}}",
            "{{$nope}}",
            "{{$timestamp 1 fortnight}}",
        ] {
            assert_eq!(resolver.process(text).unwrap(), text);
        }
    }

    #[test]
    fn test_prompt_uses_installed_callback() {
        let mut resolver = create_test_resolver().with_prompter(
            |name: &str, _: &str, is_password: bool| -> Result<String, String> {
                Ok(format!("{}:{}", name, is_password))
            },
        );

        assert_eq!(
            resolver.process("{{$prompt password Your password}}").unwrap(),
            "password:true"
        );
    }

    #[test]
    fn test_prompt_description_keeps_apostrophes() {
        let mut resolver = create_test_resolver().with_prompter(
            |_: &str, description: &str, _: bool| -> Result<String, String> {
                Ok(description.to_string())
            },
        );

        assert_eq!(
            resolver.process("{{$prompt id Enter the user's id}}").unwrap(),
            "Enter the user's id"
        );
    }

    #[test]
    fn test_request_chaining() {
        let mut resolver = create_test_resolver();
        resolver.set_request_result(
            "login",
            RequestResult::new(200)
                .with_header("X-Request-Id", "r-1")
                .with_body(r#"{"token": "abc123"}"#),
        );

        assert_eq!(
            resolver
                .process("Bearer {{login.response.body.$.token}} {{login.response.headers.x-request-id}}")
                .unwrap(),
            "Bearer abc123 r-1"
        );
        assert_eq!(
            resolver.process("{{signup.response.body.*}}").unwrap(),
            "{{signup.response.body.*}}"
        );
    }

    #[test]
    fn test_request_reference_wins_over_file_variable() {
        let mut resolver = create_test_resolver();
        resolver.set_file_variable("a.response.body.*", "from file");
        assert_eq!(
            resolver.process("{{a.response.body.*}}").unwrap(),
            "{{a.response.body.*}}"
        );
    }

    #[test]
    fn test_resolve_expression_reports_errors() {
        let mut resolver = create_test_resolver();

        assert_eq!(resolver.resolve_expression(" port ").unwrap(), "8080");
        assert_eq!(
            resolver.resolve_expression("missing"),
            Err(VarError::UndefinedVariable("missing".to_string()))
        );
        assert!(matches!(
            resolver.resolve_expression("$randomInt 5 5"),
            Err(VarError::InvalidSyntax(_))
        ));
    }

    #[test]
    fn test_find_unresolved() {
        assert_eq!(
            find_unresolved("GET {{ a }}/x/{{b.response.body.*}} {{:c}}"),
            vec!["a".to_string(), "b.response.body.*".to_string(), ":c".to_string()]
        );
        assert!(find_unresolved("nothing here").is_empty());
    }

    #[test]
    fn test_malformed_placeholders_pass_through() {
        let mut resolver = create_test_resolver();
        for text in ["{{}}", "{ {port}}", "{{port}", "}}port{{", "{{ }}"] {
            assert_eq!(resolver.process(text).unwrap(), text);
        }
    }

    proptest! {
        #[test]
        fn prop_text_without_placeholders_is_unchanged(text in "[^{]*") {
            let mut resolver = create_test_resolver();
            prop_assert_eq!(resolver.process(&text).unwrap(), text);
        }

        #[test]
        fn prop_single_brace_text_is_unchanged(text in "([a-z ]|\\{[a-z]|\\})*") {
            let mut resolver = create_test_resolver();
            prop_assume!(!text.contains("{{"));
            prop_assert_eq!(resolver.process(&text).unwrap(), text);
        }
    }
}
