//! System function library
//!
//! Implements the `$`-prefixed built-ins usable inside `{{...}}`:
//! `$guid`/`$uuid`, `$timestamp`, `$datetime`/`$localDatetime`, `$randomInt`,
//! `$processEnv`, `$dotenv` and `$prompt`. An expression is split on
//! whitespace (quoted runs stay together); the first token names the function
//! and the rest are positional arguments.

use super::environment::EnvironmentScope;
use super::provider::{Variable, VariableKind, VariableProvider};
use super::VarError;
use crate::environment::EnvironmentTable;
use chrono::{DateTime, Days, Duration, Local, Months, SecondsFormat, TimeZone, Utc};
use log::warn;
use rand::Rng;
use std::collections::HashMap;
use std::env;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Names recognized as system functions, including the `$` prefix.
pub const SYSTEM_FUNCTIONS: &[&str] = &[
    "$guid",
    "$uuid",
    "$timestamp",
    "$datetime",
    "$localDatetime",
    "$randomInt",
    "$processEnv",
    "$dotenv",
    "$prompt",
];

/// Prompt names that switch the collaborator into masked input.
const PASSWORD_NAMES: &[&str] = &["password", "passwd", "pass", "secret"];

/// Custom date-format tokens, longest first so `YYYY` is never eaten by `YY`.
const DATE_TOKENS: &[(&str, &str)] = &[
    ("YYYY", "%Y"),
    ("MMMM", "%B"),
    ("dddd", "%A"),
    ("DDDD", "%j"),
    ("MMM", "%b"),
    ("ddd", "%a"),
    ("SSS", "%3f"),
    ("YY", "%y"),
    ("MM", "%m"),
    ("DD", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("ZZ", "%z"),
];

/// Interactive value source used by `$prompt` and the user-input layer.
///
/// The call blocks until the collaborator answers. Any closure with the
/// matching signature is a `Prompter`.
pub trait Prompter {
    fn prompt(&self, name: &str, description: &str, is_password: bool) -> Result<String, String>;
}

impl<F> Prompter for F
where
    F: Fn(&str, &str, bool) -> Result<String, String>,
{
    fn prompt(&self, name: &str, description: &str, is_password: bool) -> Result<String, String> {
        self(name, description, is_password)
    }
}

/// Context the system functions need from the surrounding run.
#[derive(Clone, Copy)]
pub struct SystemFunctions<'a> {
    environments: &'a EnvironmentTable,
    current_environment: &'a str,
    base_dir: Option<&'a Path>,
    prompter: Option<&'a dyn Prompter>,
}

impl<'a> SystemFunctions<'a> {
    pub fn new(environments: &'a EnvironmentTable, current_environment: &'a str) -> Self {
        Self {
            environments,
            current_environment,
            base_dir: None,
            prompter: None,
        }
    }

    /// Directory `$dotenv` reads from (the request file's directory).
    pub fn with_base_dir(mut self, base_dir: Option<&'a Path>) -> Self {
        self.base_dir = base_dir;
        self
    }

    pub fn with_prompter(mut self, prompter: Option<&'a dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Evaluates a full `$name arg1 arg2` expression.
    pub fn call(&self, expression: &str) -> Result<Variable, VarError> {
        let tokens = split_arguments(expression);
        let (name, args) = tokens
            .split_first()
            .ok_or_else(|| VarError::InvalidSyntax("empty system function".to_string()))?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        let function = name.strip_prefix('$').ok_or_else(|| {
            VarError::InvalidSyntax(format!("system function must start with $: {}", name))
        })?;

        resolve_system_variable(function, &args, self)
    }
}

impl VariableProvider for SystemFunctions<'_> {
    fn kind(&self) -> VariableKind {
        VariableKind::System
    }

    fn has(&self, name: &str) -> bool {
        name.split_whitespace()
            .next()
            .is_some_and(|function| SYSTEM_FUNCTIONS.contains(&function))
    }

    fn get(&self, name: &str) -> Result<Variable, VarError> {
        self.call(name)
    }
}

/// Resolves a system function by name (without `$`) and arguments.
///
/// # Examples
///
/// ```
/// use restfile::environment::EnvironmentTable;
/// use restfile::variables::system::{resolve_system_variable, SystemFunctions};
///
/// let table = EnvironmentTable::new();
/// let ctx = SystemFunctions::new(&table, "");
///
/// resolve_system_variable("guid", &[], &ctx).unwrap();
/// resolve_system_variable("timestamp", &["-1", "d"], &ctx).unwrap();
/// resolve_system_variable("datetime", &["iso8601"], &ctx).unwrap();
/// resolve_system_variable("randomInt", &["1", "100"], &ctx).unwrap();
/// ```
pub fn resolve_system_variable(
    name: &str,
    args: &[&str],
    ctx: &SystemFunctions<'_>,
) -> Result<Variable, VarError> {
    let system = |value: String| Ok(Variable::new(format!("${}", name), value, VariableKind::System));

    match name {
        "guid" | "uuid" => system(Uuid::new_v4().to_string()),
        "timestamp" => system(resolve_timestamp(args)?),
        "datetime" => system(resolve_datetime(args, Utc::now(), true)?),
        "localDatetime" => system(resolve_datetime(args, Local::now(), false)?),
        "randomInt" => system(resolve_random_int(args)?),
        "processEnv" => system(resolve_process_env(args, ctx)?),
        "dotenv" => system(resolve_dotenv(args, ctx)?),
        "prompt" => resolve_prompt(args, ctx),
        _ => Err(VarError::UndefinedVariable(format!("${}", name))),
    }
}

/// Splits an expression on whitespace, keeping quoted runs together.
///
/// A quote (single or double) only opens a quoted run at the start of a
/// token, and the surrounding quotes are removed. Elsewhere a quote is a
/// literal character, so `user's` stays intact. An unterminated run keeps its
/// opening quote.
pub fn split_arguments(expression: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;
    let mut in_token = false;

    for ch in expression.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if !in_token && (ch == '"' || ch == '\'') => {
                quote = Some(ch);
                in_token = true;
            }
            None if ch.is_whitespace() => {
                if in_token {
                    tokens.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            None => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if let Some(q) = quote {
        current.insert(0, q);
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

/// `{{$timestamp [offset unit]}}`: Unix seconds, UTC.
fn resolve_timestamp(args: &[&str]) -> Result<String, VarError> {
    let now = Utc::now();
    let datetime = if args.is_empty() {
        now
    } else {
        apply_offset(now, args)?
    };
    Ok(datetime.timestamp().to_string())
}

/// `{{$datetime format [offset unit]}}` and its local-time twin.
fn resolve_datetime<Tz>(args: &[&str], now: DateTime<Tz>, utc: bool) -> Result<String, VarError>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let (format, offset) = args.split_first().ok_or_else(|| {
        VarError::InvalidSyntax(
            "datetime requires a format (iso8601, rfc1123 or a token pattern)".to_string(),
        )
    })?;

    let datetime = if offset.is_empty() {
        now
    } else {
        apply_offset(now, offset)?
    };

    Ok(format_datetime(&datetime, format, utc))
}

/// Formats a timestamp as `iso8601`, `rfc1123` or a custom token pattern.
pub fn format_datetime<Tz>(datetime: &DateTime<Tz>, format: &str, utc: bool) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    match format {
        "iso8601" => datetime.to_rfc3339_opts(SecondsFormat::Secs, true),
        "rfc1123" if utc => datetime.format("%a, %d %b %Y %H:%M:%S GMT").to_string(),
        "rfc1123" => datetime.format("%a, %d %b %Y %H:%M:%S %z").to_string(),
        pattern => format_with_tokens(datetime, pattern),
    }
}

/// Substitutes date tokens in a single left-to-right pass, longest token first.
///
/// Characters that start no token are copied verbatim.
pub fn format_with_tokens<Tz>(datetime: &DateTime<Tz>, pattern: &str) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut out = String::with_capacity(pattern.len() + 16);
    let mut rest = pattern;

    'scan: while let Some(ch) = rest.chars().next() {
        for (token, spec) in DATE_TOKENS {
            if let Some(after) = rest.strip_prefix(token) {
                out.push_str(&datetime.format(spec).to_string());
                rest = after;
                continue 'scan;
            }
        }
        out.push(ch);
        rest = &rest[ch.len_utf8()..];
    }

    out
}

/// Shifts `base` by `amount unit`.
///
/// Units: `y`, `M`, `w`, `d` (calendar-aware) and `h`, `m`, `s`, `ms` (fixed).
/// Examples: `-1 d`, `+2 h`, `30 m`.
fn apply_offset<Tz: TimeZone>(base: DateTime<Tz>, args: &[&str]) -> Result<DateTime<Tz>, VarError> {
    let [amount, unit] = args else {
        return Err(VarError::InvalidOffset(format!(
            "offset requires an amount and a unit (e.g. '-1 d'), got '{}'",
            args.join(" ")
        )));
    };

    let amount: i64 = amount
        .parse()
        .map_err(|_| VarError::InvalidOffset(format!("invalid amount: {}", amount)))?;
    let out_of_range =
        || VarError::InvalidOffset(format!("offset {} {} is out of range", amount, unit));

    let shifted = match *unit {
        "y" => shift_months(base, amount.checked_mul(12).ok_or_else(out_of_range)?),
        "M" => shift_months(base, amount),
        "w" => shift_days(base, amount.checked_mul(7).ok_or_else(out_of_range)?),
        "d" => shift_days(base, amount),
        "h" => Duration::try_hours(amount).and_then(|d| base.checked_add_signed(d)),
        "m" => Duration::try_minutes(amount).and_then(|d| base.checked_add_signed(d)),
        "s" => Duration::try_seconds(amount).and_then(|d| base.checked_add_signed(d)),
        "ms" => Duration::try_milliseconds(amount).and_then(|d| base.checked_add_signed(d)),
        other => {
            return Err(VarError::InvalidOffset(format!(
                "invalid unit '{}': use y, M, w, d, h, m, s or ms",
                other
            )))
        }
    };

    shifted.ok_or_else(out_of_range)
}

fn shift_months<Tz: TimeZone>(base: DateTime<Tz>, months: i64) -> Option<DateTime<Tz>> {
    let delta = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        base.checked_add_months(delta)
    } else {
        base.checked_sub_months(delta)
    }
}

fn shift_days<Tz: TimeZone>(base: DateTime<Tz>, days: i64) -> Option<DateTime<Tz>> {
    let delta = Days::new(days.unsigned_abs());
    if days >= 0 {
        base.checked_add_days(delta)
    } else {
        base.checked_sub_days(delta)
    }
}

/// `{{$randomInt min max}}`: uniform integer in `[min, max)`.
fn resolve_random_int(args: &[&str]) -> Result<String, VarError> {
    let [min, max] = args else {
        return Err(VarError::InvalidSyntax(
            "randomInt requires min and max arguments".to_string(),
        ));
    };

    let min: i64 = min
        .parse()
        .map_err(|_| VarError::InvalidSyntax(format!("invalid min value: {}", min)))?;
    let max: i64 = max
        .parse()
        .map_err(|_| VarError::InvalidSyntax(format!("invalid max value: {}", max)))?;

    if min >= max {
        return Err(VarError::InvalidSyntax(format!(
            "min ({}) must be less than max ({})",
            min, max
        )));
    }

    Ok(rand::thread_rng().gen_range(min..max).to_string())
}

/// `{{$processEnv NAME}}` or `{{$processEnv %envVar}}`.
///
/// With the `%` form the process variable's name is itself read from the
/// environment configuration entry `envVar`.
fn resolve_process_env(args: &[&str], ctx: &SystemFunctions<'_>) -> Result<String, VarError> {
    let requested = args
        .first()
        .ok_or_else(|| VarError::InvalidSyntax("processEnv requires a variable name".to_string()))?;

    let var_name = match requested.strip_prefix('%') {
        Some(indirect) => EnvironmentScope::new(ctx.environments, ctx.current_environment)
            .lookup(indirect)
            .cloned()
            .ok_or_else(|| VarError::UndefinedVariable(indirect.to_string()))?,
        None => requested.to_string(),
    };

    env::var(&var_name).map_err(|_| VarError::EnvVarNotFound(var_name))
}

/// `{{$dotenv NAME}}`: reads `.env.<environment>` if present, else `.env`.
fn resolve_dotenv(args: &[&str], ctx: &SystemFunctions<'_>) -> Result<String, VarError> {
    let key = args
        .first()
        .ok_or_else(|| VarError::InvalidSyntax("dotenv requires a variable name".to_string()))?;

    let path = find_dotenv_file(ctx)?;
    let content = fs::read_to_string(&path).map_err(|e| {
        VarError::DotenvError(format!("failed to read {}: {}", path.display(), e))
    })?;

    parse_dotenv(&content).remove(*key).ok_or_else(|| {
        VarError::DotenvError(format!("key '{}' not found in {}", key, path.display()))
    })
}

fn find_dotenv_file(ctx: &SystemFunctions<'_>) -> Result<PathBuf, VarError> {
    let dir = match ctx.base_dir {
        Some(dir) => dir.to_path_buf(),
        None => env::current_dir().map_err(|e| {
            VarError::DotenvError(format!("failed to get current directory: {}", e))
        })?,
    };

    if !ctx.current_environment.is_empty() {
        let scoped = dir.join(format!(".env.{}", ctx.current_environment));
        if scoped.is_file() {
            return Ok(scoped);
        }
    }

    let default = dir.join(".env");
    if default.is_file() {
        Ok(default)
    } else {
        Err(VarError::DotenvError(format!(
            ".env file not found in {}",
            dir.display()
        )))
    }
}

/// Parses `.env` content: `KEY=value` lines, `#` comments, optional `export `
/// prefix and matching surrounding quotes.
pub fn parse_dotenv(content: &str) -> HashMap<String, String> {
    let mut vars = HashMap::new();

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let line = line.strip_prefix("export ").unwrap_or(line);
        let Some((key, value)) = line.split_once('=') else {
            warn!("ignoring invalid .env line {}: {}", line_num + 1, line);
            continue;
        };

        let value = value.trim();
        let value = if value.len() >= 2
            && ((value.starts_with('"') && value.ends_with('"'))
                || (value.starts_with('\'') && value.ends_with('\'')))
        {
            &value[1..value.len() - 1]
        } else {
            value
        };

        vars.insert(key.trim().to_string(), value.to_string());
    }

    vars
}

/// `{{$prompt name [description...]}}`
fn resolve_prompt(args: &[&str], ctx: &SystemFunctions<'_>) -> Result<Variable, VarError> {
    let (name, description) = args
        .split_first()
        .ok_or_else(|| VarError::InvalidSyntax("prompt requires a name".to_string()))?;

    let prompter = ctx
        .prompter
        .ok_or_else(|| VarError::Prompt("no prompt handler configured".to_string()))?;

    let is_password = PASSWORD_NAMES
        .iter()
        .any(|candidate| name.eq_ignore_ascii_case(candidate));

    let value = prompter
        .prompt(name, &description.join(" "), is_password)
        .map_err(VarError::Prompt)?;

    Ok(Variable::new(*name, value, VariableKind::Prompt))
}
