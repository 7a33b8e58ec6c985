//! Template variables
//!
//! Resolution of `{{...}}` placeholders in request text: the
//! [`VariableResolver`], the namespaces it dispatches to (system functions,
//! environments, file variables, request chaining) and the separate
//! `{{:name}}` user-input pass.

pub mod encoding;
pub mod environment;
pub mod error;
pub mod jsonpath;
pub mod provider;
pub mod request;
pub mod substitution;
pub mod system;
pub mod user_input;

pub use encoding::{path_escape, percent_encode, unescape};
pub use environment::{resolve_environment_variable, EnvironmentScope};
pub use error::VarError;
pub use jsonpath::extract_json_path;
pub use provider::{FileVariables, Variable, VariableKind, VariableProvider};
pub use request::{resolve_request_variable, RequestResults};
pub use substitution::{find_unresolved, VariableResolver, MAX_RECURSION_DEPTH};
pub use system::{resolve_system_variable, Prompter, SystemFunctions};
pub use user_input::{
    collect_user_inputs, detect_user_inputs, generate_key, has_user_inputs, replace_user_inputs,
    replace_user_inputs_in_request, replace_user_inputs_raw, UserInputPattern,
};
