//! Runtime configuration read from `TESSERA_*` environment variables (and `.env`, if present).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::paths::default_home;

pub const ENV_BIND: &str = "TESSERA_BIND";
pub const ENV_HOME: &str = "TESSERA_HOME";
pub const ENV_PATTERNS_DIR: &str = "TESSERA_PATTERNS_DIR";
pub const ENV_MODELS_DIR: &str = "TESSERA_MODELS_DIR";
pub const ENV_SESSIONS_DIR: &str = "TESSERA_SESSIONS_DIR";
pub const ENV_CONTEXT_SIZE: &str = "TESSERA_CONTEXT_SIZE";
pub const ENV_LOG_CAPACITY: &str = "TESSERA_LOG_CAPACITY";
pub const ENV_PLUGIN_PATH: &str = "TESSERA_PLUGIN_PATH";
pub const ENV_RUNTIME_DIR: &str = "TESSERA_RUNTIME_DIR";
pub const ENV_MAX_DECODE_TOKENS: &str = "TESSERA_MAX_DECODE_TOKENS";

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub home: PathBuf,
    /// Directory of `*.yaml` prompt patterns.
    pub patterns_dir: PathBuf,
    /// Root of the model library.
    pub models_dir: PathBuf,
    pub sessions_dir: PathBuf,
    /// n_ctx passed to the backend at load time.
    pub context_size: u32,
    /// Conversation log entries kept; 0 = unbounded.
    pub log_capacity: usize,
    /// Explicit backend plugin; overrides the runtime dir lookup.
    pub plugin_path: Option<PathBuf>,
    pub runtime_dir: PathBuf,
    /// Upper bound on decode steps per completion, whatever `max_tokens` says.
    pub max_decode_tokens: Option<usize>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok(); // Load .env file if present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key → value source. Unset or empty values take the default;
    /// values that do not parse are errors.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let home = get(ENV_HOME).map(PathBuf::from).unwrap_or_else(default_home);
        let dir = |key: &str, sub: &str| get(key).map(PathBuf::from).unwrap_or_else(|| home.join(sub));

        Ok(Config {
            bind: parse_or(get(ENV_BIND), ENV_BIND, "127.0.0.1:5000".parse()?)?,
            patterns_dir: dir(ENV_PATTERNS_DIR, "prompts"),
            models_dir: dir(ENV_MODELS_DIR, "models"),
            sessions_dir: dir(ENV_SESSIONS_DIR, "sessions"),
            runtime_dir: dir(ENV_RUNTIME_DIR, "runtimes"),
            context_size: parse_or(get(ENV_CONTEXT_SIZE), ENV_CONTEXT_SIZE, 2048)?,
            log_capacity: parse_or(get(ENV_LOG_CAPACITY), ENV_LOG_CAPACITY, 100)?,
            plugin_path: get(ENV_PLUGIN_PATH).map(PathBuf::from),
            max_decode_tokens: get(ENV_MAX_DECODE_TOKENS)
                .map(|v| parse_value::<usize>(&v, ENV_MAX_DECODE_TOKENS))
                .transpose()?,
            home,
        })
    }
}

fn parse_value<T>(raw: &str, key: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("{key}={raw:?} is not valid"))
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(v) => parse_value(&v, key),
        None => Ok(default),
    }
}
