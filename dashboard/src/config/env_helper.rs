use std::str::FromStr;

use anyhow::{Context, Result};

/// Load an environment variable and parse it to the given type
///
/// # Errors
///
/// Returns an error if the environment variable is not set or is not a valid value for the given type
pub fn load_env_var<T: FromStr>(var_name: &str) -> Result<T> {
    let var = std::env::var(var_name).context(format!("{} is not set", var_name))?;
    parse_var(var_name, &var)
}

/// Load an optional environment variable, falling back to `default` when it is unset or empty
///
/// # Errors
///
/// Returns an error only if the variable is set to a value that does not parse
pub fn load_env_var_or<T: FromStr>(var_name: &str, default: T) -> Result<T> {
    match std::env::var(var_name) {
        Ok(var) if !var.trim().is_empty() => parse_var(var_name, &var),
        _ => Ok(default),
    }
}

/// Split a comma separated value into trimmed, non-empty items
pub fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_var<T: FromStr>(var_name: &str, var: &str) -> Result<T> {
    var.trim()
        .parse::<T>()
        .map_err(|_| anyhow::anyhow!("{} is not a valid {}", var, var_name))
}
