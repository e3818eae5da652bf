use std::{env, fmt::Display, str::FromStr};

use log::*;

/// Read and parse the environment variable `name`. If it is not set, or cannot be parsed, the default is returned and
/// the reason is logged.
pub fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    env::var(name)
        .map_err(|_| debug!("🪛️ {name} is not set. Using the default value of {default}."))
        .and_then(|s| {
            s.trim().parse::<T>().map_err(|e| {
                warn!("🪛️ Invalid configuration value for {name} ({s}). {e} Using the default, {default}, instead.")
            })
        })
        .unwrap_or(default)
}
