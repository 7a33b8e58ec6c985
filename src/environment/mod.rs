//! Environment configuration
//!
//! Environments let a request file run against different variable sets
//! (dev, staging, production). The table is loaded once per run from
//! `.http-client-env.json` or `http-client.env.json`; the name of the selected
//! environment is supplied separately by the caller.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use restfile::environment::load_environments;
//!
//! let table = load_environments(Path::new("/path/to/requests")).unwrap();
//! if let Some(url) = table.get_variable("dev", "baseUrl") {
//!     println!("Base URL: {}", url);
//! }
//! ```

pub mod loader;
pub mod models;

pub use loader::{load_environment_file, load_environments, parse_environments, EnvError};
pub use models::{Environment, EnvironmentTable, SHARED_ENVIRONMENT};
