//! Environment-driven settings shared by the service crates.

use core::str::FromStr;

/// Read `key` from the environment, falling back to `default` when it is
/// unset or does not parse.
pub fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + core::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, fallback = %default, "unparsable setting; using default");
            default
        }),
        Err(_) => default,
    }
}
