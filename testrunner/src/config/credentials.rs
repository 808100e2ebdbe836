//! Ordered value providers for ports, endpoints and credentials
//!
//! A value is looked up in a fixed order: explicit setting, then an
//! environment variable, then a built-in default. The first provider with a
//! value wins and the tier that supplied it is logged.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{RunnerError, RunnerResult};
use shared::{process_warn, ServiceRole};

/// Read access to environment variables
pub trait EnvSource: Send + Sync {
    fn var(&self, key: &str) -> Option<String>;
}

/// The runner's own process environment (after `.env` loading)
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Which provider supplied a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Explicit,
    Environment,
    BuiltIn,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Explicit => write!(f, "explicit setting"),
            Tier::Environment => write!(f, "environment variable"),
            Tier::BuiltIn => write!(f, "built-in default"),
        }
    }
}

/// One source of a value
pub enum Provider<T> {
    Explicit(Option<T>),
    Environment(&'static str),
    BuiltIn(T),
}

/// A value together with the tier that supplied it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved<T> {
    pub value: T,
    pub tier: Tier,
}

/// Return the first value any provider has, logging the tier that fired
pub fn first_present<T>(
    field: &str,
    providers: Vec<Provider<T>>,
    env: &dyn EnvSource,
) -> RunnerResult<Option<Resolved<T>>>
where
    T: FromStr + fmt::Display,
{
    for provider in providers {
        let resolved = match provider {
            Provider::Explicit(Some(value)) => Resolved { value, tier: Tier::Explicit },
            Provider::Explicit(None) => continue,
            Provider::Environment(key) => match env.var(key).filter(|v| !v.trim().is_empty()) {
                Some(raw) => {
                    let value = raw.trim().parse::<T>().map_err(|_| {
                        RunnerError::config(format!("{key}={raw} is not a valid value for {field}"))
                    })?;
                    Resolved { value, tier: Tier::Environment }
                }
                None => continue,
            },
            Provider::BuiltIn(value) => Resolved { value, tier: Tier::BuiltIn },
        };
        process_warn!(
            ServiceRole::Runner,
            "{} = {} (from {})",
            field,
            resolved.value,
            resolved.tier
        );
        return Ok(Some(resolved));
    }
    Ok(None)
}

/// Flag, then environment, then built-in default
pub fn flag_env_default<T>(
    field: &str,
    explicit: Option<T>,
    env_key: &'static str,
    default: T,
    env: &dyn EnvSource,
) -> RunnerResult<Resolved<T>>
where
    T: FromStr + fmt::Display + Clone,
{
    let providers = vec![
        Provider::Explicit(explicit),
        Provider::Environment(env_key),
        Provider::BuiltIn(default.clone()),
    ];
    Ok(first_present(field, providers, env)?.unwrap_or(Resolved {
        value: default,
        tier: Tier::BuiltIn,
    }))
}
