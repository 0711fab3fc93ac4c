use std::env;
use std::str::FromStr;

use anyhow::Context;

use crate::ranking::DEFAULT_TOP_K;
use crate::risk::{DEFAULT_THRESHOLD, DEFAULT_WINDOW_DAYS};

#[derive(Debug, Clone)]
pub struct Config {
    /// Only needed by subcommands that touch the message store.
    pub database_url: Option<String>,
    pub top_k: i64,
    pub window_days: i64,
    pub threshold: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            top_k: DEFAULT_TOP_K,
            window_days: DEFAULT_WINDOW_DAYS,
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

/// Loads `.env` if present, then reads configuration from the environment.
pub fn load() -> anyhow::Result<Config> {
    let _ = dotenvy::dotenv();
    Config::from_lookup(|key| env::var(key).ok())
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> anyhow::Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} must be an integer, got {raw:?}")),
        None => Ok(default),
    }
}

impl Config {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Config::default();
        Ok(Self {
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            top_k: parse_var(&lookup, "SENTIMENT_TOP_K", defaults.top_k)?,
            window_days: parse_var(&lookup, "FLIGHT_RISK_WINDOW_DAYS", defaults.window_days)?,
            threshold: parse_var(&lookup, "FLIGHT_RISK_THRESHOLD", defaults.threshold)?,
        })
    }

    pub fn require_database_url(&self) -> anyhow::Result<&str> {
        self.database_url
            .as_deref()
            .context("DATABASE_URL must be set to a Postgres instance for this command")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.top_k, 3);
        assert_eq!(config.window_days, 30);
        assert_eq!(config.threshold, 4);
        assert!(config.database_url.is_none());
        assert!(config.require_database_url().is_err());
    }

    #[test]
    fn environment_overrides_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("SENTIMENT_TOP_K", "5"),
            ("FLIGHT_RISK_WINDOW_DAYS", " 14 "),
            ("DATABASE_URL", "postgres://localhost/sentiment"),
        ]))
        .unwrap();
        assert_eq!(config.top_k, 5);
        assert_eq!(config.window_days, 14);
        assert_eq!(config.threshold, 4);
        assert_eq!(config.require_database_url().unwrap(), "postgres://localhost/sentiment");
    }

    #[test]
    fn malformed_numbers_are_reported() {
        let err = Config::from_lookup(lookup(&[("FLIGHT_RISK_THRESHOLD", "four")])).unwrap_err();
        assert!(err.to_string().contains("FLIGHT_RISK_THRESHOLD"));
    }
}
