use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};

use crate::allocation::GateScope;
use crate::db::DbConfig;

/// Where allocation counters are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CounterBackend {
    #[default]
    Postgres,
    /// Process-local map; counters are lost on restart.
    Memory,
}

impl std::str::FromStr for CounterBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "postgres" => Ok(Self::Postgres),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow!(
                "invalid counter backend '{other}': expected 'postgres' or 'memory'"
            )),
        }
    }
}

/// Allocation gate settings.
#[derive(Debug, Clone)]
pub struct AllocationConfig {
    pub backend: CounterBackend,
    pub gate_scope: GateScope,
    pub gate_timeout: Duration,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            backend: CounterBackend::Postgres,
            gate_scope: GateScope::Global,
            gate_timeout: Duration::from_millis(5000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub listen_addr: SocketAddr,
    pub log_level: String,
    pub dev_mode: bool,
    pub database: DbConfig,
    pub allocation: AllocationConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from `lookup`, which returns the value of a
    /// variable if it is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let listen_addr: SocketAddr = lookup("PROTRACK_LISTEN_ADDR")
            .unwrap_or_else(|| "127.0.0.1:8080".to_string())
            .parse()
            .context("PROTRACK_LISTEN_ADDR")?;

        let log_level = lookup("PROTRACK_LOG_LEVEL").unwrap_or_else(|| "info".to_string());

        let dev_mode = lookup("PROTRACK_DEV")
            .map(|v| v == "1" || v.to_lowercase() == "true")
            .unwrap_or(false);

        let database = database_config(&lookup)?;

        let defaults = AllocationConfig::default();
        let backend = match lookup("PROTRACK_COUNTER_BACKEND") {
            Some(v) => v.parse()?,
            None => defaults.backend,
        };
        let gate_scope = match lookup("PROTRACK_GATE_SCOPE") {
            Some(v) => v.parse().map_err(|e: String| anyhow!(e))?,
            None => defaults.gate_scope,
        };
        let gate_timeout = parse_var::<u64>(&lookup, "PROTRACK_GATE_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.gate_timeout);

        Ok(Self {
            listen_addr,
            log_level,
            dev_mode,
            database,
            allocation: AllocationConfig {
                backend,
                gate_scope,
                gate_timeout,
            },
        })
    }
}

fn database_config(lookup: &impl Fn(&str) -> Option<String>) -> Result<DbConfig> {
    let defaults = DbConfig::default();

    let config = DbConfig {
        database_url: lookup("DATABASE_URL").unwrap_or(defaults.database_url),
        max_connections: parse_var(lookup, "DB_MAX_CONNECTIONS")?
            .unwrap_or(defaults.max_connections),
        min_connections: parse_var(lookup, "DB_MIN_CONNECTIONS")?
            .unwrap_or(defaults.min_connections),
        acquire_timeout: parse_var::<u64>(lookup, "DB_ACQUIRE_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.acquire_timeout),
        migrations_dir: lookup("PROTRACK_MIGRATIONS_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.migrations_dir),
    };

    if config.max_connections == 0 {
        bail!("DB_MAX_CONNECTIONS must be at least 1");
    }
    if config.min_connections > config.max_connections {
        bail!(
            "DB_MIN_CONNECTIONS ({}) exceeds DB_MAX_CONNECTIONS ({})",
            config.min_connections,
            config.max_connections
        );
    }

    Ok(config)
}

/// Reads a numeric variable; unset is `None`, malformed is an error.
fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(name)
        .map(|raw| {
            raw.trim()
                .parse()
                .with_context(|| format!("invalid {name} '{raw}'"))
        })
        .transpose()
}
