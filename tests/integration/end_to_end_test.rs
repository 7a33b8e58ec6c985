//! End-to-end resolution tests
//!
//! These tests load environment configuration and `.env` files from disk,
//! run the user-input pass and then the resolver, the way a request file is
//! prepared before sending.

use super::{init_test_env, write_file};
use restfile::environment::load_environments;
use restfile::session::UserInputStore;
use restfile::variables::{
    collect_user_inputs, find_unresolved, generate_key, replace_user_inputs,
    replace_user_inputs_raw, VariableResolver,
};
use std::cell::Cell;
use std::path::Path;
use tempfile::TempDir;

const ENV_CONFIG: &str = r#"{
  "$shared": {
    "version": "v1",
    "timeout": 30,
    "apiRoot": "{{baseUrl}}/{{version}}"
  },
  "dev": {
    "baseUrl": "http://localhost:3000",
    "token": "dev-token"
  },
  "production": {
    "baseUrl": "https://api.example.com",
    "token": "prod-token",
    "version": "v2"
  },
  "$default": "dev"
}"#;

fn workspace() -> TempDir {
    init_test_env();
    let dir = TempDir::new().unwrap();
    write_file(&dir, ".http-client-env.json", ENV_CONFIG);
    dir
}

fn resolver_for(dir: &Path, environment: &str) -> VariableResolver {
    let table = load_environments(dir).unwrap();
    VariableResolver::new(table, environment).with_base_dir(dir)
}

#[test]
fn test_resolve_request_against_each_environment() {
    let dir = workspace();
    let request = "GET {{apiRoot}}/users?timeout={{timeout}}\nAuthorization: Bearer {{token}}";

    let mut dev = resolver_for(dir.path(), "dev");
    assert_eq!(
        dev.process(request).unwrap(),
        "GET http://localhost:3000/v1/users?timeout=30\nAuthorization: Bearer dev-token"
    );

    let mut production = resolver_for(dir.path(), "production");
    assert_eq!(
        production.process(request).unwrap(),
        "GET https://api.example.com/v2/users?timeout=30\nAuthorization: Bearer prod-token"
    );
}

#[test]
fn test_default_environment_from_config() {
    let dir = workspace();
    let table = load_environments(dir.path()).unwrap();
    assert_eq!(table.default_environment.as_deref(), Some("dev"));
}

#[test]
fn test_environment_file_found_in_parent_directory() {
    let dir = workspace();
    let nested = dir.path().join("api").join("users");
    std::fs::create_dir_all(&nested).unwrap();

    let mut resolver = resolver_for(&nested, "dev");
    assert_eq!(resolver.process("{{baseUrl}}").unwrap(), "http://localhost:3000");
}

#[test]
fn test_unset_environment_sees_only_shared() {
    let dir = workspace();
    let mut resolver = resolver_for(dir.path(), "");

    assert_eq!(
        resolver.process("{{version}} {{token}}").unwrap(),
        "v1 {{token}}"
    );
}

#[test]
fn test_file_variables_and_escapes() {
    let dir = workspace();
    let mut resolver = resolver_for(dir.path(), "dev");
    resolver.declare_file_variable("userId", "42");
    resolver.declare_file_variable("userUrl", "{{baseUrl}}/users/{{userId}}");
    resolver.declare_file_variable("payload", r#"{\"id\": {{userId}}}"#);

    let body = "PUT {{userUrl}}\nContent-Type: application/json\n\n{{payload}}";
    assert_eq!(
        resolver.process(body).unwrap(),
        "PUT http://localhost:3000/users/42\nContent-Type: application/json\n\n{\"id\": 42}"
    );
}

#[test]
fn test_dotenv_prefers_environment_specific_file() {
    let dir = workspace();
    write_file(&dir, ".env", "API_KEY=generic\nREGION=eu\n");
    write_file(&dir, ".env.dev", "API_KEY=dev-key\n");

    let mut dev = resolver_for(dir.path(), "dev");
    assert_eq!(dev.process("{{$dotenv API_KEY}}").unwrap(), "dev-key");
    assert_eq!(
        dev.process("{{$dotenv REGION}}").unwrap(),
        "{{$dotenv REGION}}"
    );

    let mut production = resolver_for(dir.path(), "production");
    assert_eq!(production.process("{{$dotenv REGION}}").unwrap(), "eu");
}

#[test]
fn test_partial_resolution_is_reported() {
    let dir = workspace();
    let mut resolver = resolver_for(dir.path(), "dev");

    let resolved = resolver
        .process("{{baseUrl}}/{{missing}}?id={{$randomInt 9 1}}")
        .unwrap();
    assert_eq!(
        resolved,
        "http://localhost:3000/{{missing}}?id={{$randomInt 9 1}}"
    );
    assert_eq!(
        find_unresolved(&resolved),
        vec!["missing".to_string(), "$randomInt 9 1".to_string()]
    );
}

#[test]
fn test_system_values_are_stable_within_one_run() {
    let dir = workspace();
    let mut resolver = resolver_for(dir.path(), "dev");

    let url = resolver.process("{{baseUrl}}/items/{{$guid}}").unwrap();
    let header = resolver.process("X-Correlation-Id: {{$guid}}").unwrap();
    let guid = url.rsplit('/').next().unwrap();

    assert_eq!(header, format!("X-Correlation-Id: {}", guid));
}

#[test]
fn test_user_inputs_then_variables() {
    let dir = workspace();
    let session_path = dir.path().join(".restfile").join("session.json");
    let url = "{{baseUrl}}/search/{{:term}}";
    let request = "GET {{baseUrl}}/search/{{:term}}\nX-Api-Key: {{:apiKey!secret}}";

    let prompts = Cell::new(0);
    let prompter = |name: &str, _: &str, _: bool| -> Result<String, String> {
        prompts.set(prompts.get() + 1);
        Ok(match name {
            "term" => "rust lang".to_string(),
            _ => "k#1".to_string(),
        })
    };

    let mut store = UserInputStore::open(&session_path).unwrap();
    let values = collect_user_inputs(request, url, &mut store, Some(&prompter));
    store.save().unwrap();
    assert_eq!(prompts.get(), 2);

    let (first_line, header) = request.split_once('\n').unwrap();
    let prepared = format!(
        "{}\n{}",
        replace_user_inputs(first_line, &values),
        replace_user_inputs_raw(header, &values)
    );

    let mut resolver = resolver_for(dir.path(), "dev");
    assert_eq!(
        resolver.process(&prepared).unwrap(),
        "GET http://localhost:3000/search/rust%20lang\nX-Api-Key: k#1"
    );

    // A second run reuses the remembered term but asks for the secret again.
    let mut store = UserInputStore::open(&session_path).unwrap();
    assert_eq!(
        store.get(&generate_key(url), "term").as_deref(),
        Some("rust lang")
    );
    collect_user_inputs(request, url, &mut store, Some(&prompter));
    assert_eq!(prompts.get(), 3);
}
