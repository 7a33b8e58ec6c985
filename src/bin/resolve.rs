//! Resolve the placeholders in a request file from the shell.
//!
//! Reads a text file, fills in `{{:name}}` user inputs (prompting on the
//! terminal and remembering answers in an optional session file), resolves
//! every `{{...}}` placeholder against the environment configuration found
//! next to the file, and prints the result to stdout.
//!
//! Logging goes to stderr and honors `RUST_LOG`.

use clap::Parser;
use log::{debug, error, warn};
use restfile::environment::{load_environments, EnvironmentTable};
use restfile::session::UserInputStore;
use restfile::variables::{
    collect_user_inputs, find_unresolved, has_user_inputs, replace_user_inputs_in_request,
    Prompter, VariableResolver,
};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "restfile-resolve")]
#[command(about = "Resolve {{...}} placeholders in an HTTP request file")]
#[command(version)]
struct Args {
    /// Request file to resolve
    #[arg(value_name = "FILE", required_unless_present = "file")]
    input: Option<PathBuf>,

    /// Request file (alternative to the positional argument)
    #[arg(short, long, value_name = "FILE", conflicts_with = "input")]
    file: Option<PathBuf>,

    /// Environment to select (defaults to the configured `$default`)
    #[arg(short, long)]
    env: Option<String>,

    /// File variable declaration, repeatable
    #[arg(long = "var", value_name = "NAME=VALUE", value_parser = parse_assignment)]
    vars: Vec<(String, String)>,

    /// JSON file remembering values entered for `{{:name}}` placeholders
    #[arg(long, value_name = "PATH")]
    session: Option<PathBuf>,

    /// Request URL used to key remembered `{{:name}}` values
    #[arg(long)]
    url: Option<String>,

    /// Exit with an error if any placeholder is left unresolved
    #[arg(long)]
    strict: bool,
}

fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty variable name in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}

/// Asks on stderr and reads one line from stdin.
fn prompt_stdin(name: &str, description: &str, is_password: bool) -> Result<String, String> {
    let mut stderr = io::stderr();
    let label = if description.is_empty() { name } else { description };
    let suffix = if is_password { " (input is visible)" } else { "" };
    write!(stderr, "{}{}: ", label, suffix).map_err(|e| e.to_string())?;
    stderr.flush().map_err(|e| e.to_string())?;

    let mut line = String::new();
    let read = io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| e.to_string())?;
    if read == 0 {
        return Err("no input available".to_string());
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn load_table(base_dir: &Path) -> EnvironmentTable {
    match load_environments(base_dir) {
        Ok(table) => table,
        Err(e) => {
            warn!("ignoring environment configuration: {}", e);
            EnvironmentTable::default()
        }
    }
}

/// Picks `--env`, falling back to the configured `$default`, or none.
fn select_environment(
    table: &EnvironmentTable,
    requested: Option<&str>,
) -> Result<String, String> {
    match requested {
        Some(name) if !table.has_environment(name) => {
            let known = table.list_environments();
            if known.is_empty() {
                Err(format!("unknown environment '{}': none are configured", name))
            } else {
                Err(format!(
                    "unknown environment '{}': available are {}",
                    name,
                    known.join(", ")
                ))
            }
        }
        Some(name) => Ok(name.to_string()),
        None => Ok(table.default_environment.clone().unwrap_or_default()),
    }
}

fn fill_user_inputs(content: String, args: &Args) -> Result<String, String> {
    if !has_user_inputs(&content) {
        return Ok(content);
    }

    let mut store = match &args.session {
        Some(path) => UserInputStore::open(path).map_err(|e| e.to_string())?,
        None => UserInputStore::new(),
    };
    let url = args.url.as_deref().unwrap_or_default();
    let prompter: &dyn Prompter = &prompt_stdin;

    let values = collect_user_inputs(&content, url, &mut store, Some(prompter));
    if store.path().is_some() {
        store.save().map_err(|e| e.to_string())?;
    }

    Ok(replace_user_inputs_in_request(&content, &values))
}

fn run(args: Args) -> Result<String, String> {
    let path = args
        .input
        .clone()
        .or_else(|| args.file.clone())
        .ok_or_else(|| "no request file given".to_string())?;
    let content = fs::read_to_string(&path)
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;

    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let table = load_table(&base_dir);
    let environment = select_environment(&table, args.env.as_deref())?;
    debug!("resolving {} with environment '{}'", path.display(), environment);

    let content = fill_user_inputs(content, &args)?;

    let mut resolver = VariableResolver::new(table, environment)
        .with_base_dir(base_dir)
        .with_prompter(prompt_stdin);
    for (name, value) in &args.vars {
        resolver.declare_file_variable(name.as_str(), value);
    }

    let resolved = resolver.process(&content).map_err(|e| e.to_string())?;

    let unresolved = find_unresolved(&resolved);
    if args.strict && !unresolved.is_empty() {
        return Err(format!("unresolved placeholders: {}", unresolved.join(", ")));
    }
    for expression in &unresolved {
        warn!("unresolved placeholder {{{{{}}}}}", expression);
    }

    Ok(resolved)
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run(Args::parse()) {
        Ok(resolved) => {
            print!("{}", resolved);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
