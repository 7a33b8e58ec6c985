//! Template and request-chaining engine for plain-text HTTP request files
//!
//! Request files (`.http`/`.rest`) carry `{{...}}` placeholders in their URLs,
//! headers and bodies. This crate turns that text into what actually gets sent.
//!
//! # Architecture
//!
//! - **variables**: the [`VariableResolver`](variables::VariableResolver), the
//!   system function library, the mini JSON-path extractor, request chaining
//!   and the `{{:name}}` user-input pass
//! - **environment**: the environment table (`$shared` plus named
//!   environments) and its JSON loader
//! - **models**: captured response snapshots and the loosely typed `Value`
//! - **session**: values collected for `{{:name}}` placeholders, remembered
//!   per endpoint
//!
//! # Usage
//!
//! ```
//! use restfile::environment::EnvironmentTable;
//! use restfile::models::RequestResult;
//! use restfile::variables::VariableResolver;
//!
//! let mut table = EnvironmentTable::new();
//! table.set_shared("baseUrl", "https://api.example.com");
//!
//! let mut resolver = VariableResolver::new(table, "");
//! resolver.set_request_result(
//!     "login",
//!     RequestResult::new(200).with_body(r#"{"token": "abc123"}"#),
//! );
//!
//! let text = resolver
//!     .process("GET {{baseUrl}}/me\nAuthorization: Bearer {{login.response.body.$.token}}")
//!     .unwrap();
//! assert_eq!(text, "GET https://api.example.com/me\nAuthorization: Bearer abc123");
//! ```
//!
//! Placeholders that cannot be resolved are left in the text; use
//! [`find_unresolved`](variables::find_unresolved) to reject such requests.

pub mod environment;
pub mod models;
pub mod session;
pub mod variables;
