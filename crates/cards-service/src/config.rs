//! Process configuration
//!
//! Every option is an environment variable under the `CARDS_` prefix. The
//! recognized set is frozen: an unknown `CARDS_*` variable fails startup
//! instead of being silently ignored at first use. Parsing is pure over a
//! key/value snapshot so tests never touch the process environment.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::Level;

use cards_core::codec::base64_decode;

/// Prefix of every recognized environment variable.
pub const ENV_PREFIX: &str = "CARDS_";

const SERVER_ADDRESS: &str = "SERVER_ADDRESS";
const SERVER_READ_TIMEOUT: &str = "SERVER_READ_TIMEOUT";
const SERVER_WRITE_TIMEOUT: &str = "SERVER_WRITE_TIMEOUT";
const LOG_LEVEL: &str = "LOG_LEVEL";
const CASSANDRA: &str = "CASSANDRA";
const EVENTS_ADDRESS: &str = "EVENTS_ADDRESS";
const EVENTS_PUSH_PERIOD: &str = "EVENTS_PUSH_PERIOD";
const PRIVATE_KEY: &str = "PRIVATE_KEY";
const PRIVATE_KEY_PASSWORD: &str = "PRIVATE_KEY_PASSWORD";
const TRACER_DISABLED: &str = "TRACER_DISABLED";
const TRACER_AGENT_ADDRESS: &str = "TRACER_AGENT_ADDRESS";
const TRACER_SAMPLER_TYPE: &str = "TRACER_SAMPLER_TYPE";
const TRACER_SAMPLER_PARAM: &str = "TRACER_SAMPLER_PARAM";
const TRACER_SAMPLER_MANAGER_ADDRESS: &str = "TRACER_SAMPLER_MANAGER_ADDRESS";

/// The frozen record of recognized option names.
const RECOGNIZED: &[&str] = &[
    SERVER_ADDRESS,
    SERVER_READ_TIMEOUT,
    SERVER_WRITE_TIMEOUT,
    LOG_LEVEL,
    CASSANDRA,
    EVENTS_ADDRESS,
    EVENTS_PUSH_PERIOD,
    PRIVATE_KEY,
    PRIVATE_KEY_PASSWORD,
    TRACER_DISABLED,
    TRACER_AGENT_ADDRESS,
    TRACER_SAMPLER_TYPE,
    TRACER_SAMPLER_PARAM,
    TRACER_SAMPLER_MANAGER_ADDRESS,
];

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown configuration parameter ({0})")]
    UnknownParameter(String),

    #[error("configuration parameter ({0}) was not set")]
    MissingParameter(&'static str),

    #[error("invalid value for configuration parameter ({name}): {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// HTTP server options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
}

impl ServerConfig {
    /// The socket address to bind; a bare `:port` means all interfaces.
    pub fn bind_address(&self) -> String {
        if self.address.starts_with(':') {
            return format!("0.0.0.0{}", self.address);
        }
        self.address.clone()
    }
}

/// Datastore contact points and keyspace
#[derive(Debug, Clone)]
pub struct CassandraConfig {
    pub nodes: Vec<String>,
    pub keyspace: String,
}

/// Business-event push options
#[derive(Debug, Clone)]
pub struct EventsConfig {
    pub address: String,
    pub push_period: Duration,
}

/// Tracer sampler kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerType {
    Remote,
    Const,
    Probabilistic,
    RateLimiting,
}

impl FromStr for SamplerType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "remote" => Ok(Self::Remote),
            "const" => Ok(Self::Const),
            "probabilistic" => Ok(Self::Probabilistic),
            "rateLimiting" => Ok(Self::RateLimiting),
            other => Err(format!(
                "allowed values are: remote, const, probabilistic, rateLimiting; got ({other})"
            )),
        }
    }
}

impl std::fmt::Display for SamplerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Remote => "remote",
            Self::Const => "const",
            Self::Probabilistic => "probabilistic",
            Self::RateLimiting => "rateLimiting",
        };
        f.write_str(name)
    }
}

/// Request tracing options
#[derive(Debug, Clone)]
pub struct TracerConfig {
    pub disabled: bool,
    pub agent_address: String,
    pub sampler_type: SamplerType,
    pub sampler_param: f64,
    pub sampler_manager_address: String,
}

/// The application configuration record
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub log_level: Level,
    pub cassandra: Option<CassandraConfig>,
    pub events: EventsConfig,
    /// Sealed service private key blob, already base64-decoded.
    pub private_key: Vec<u8>,
    /// Service private key password, already base64-decoded.
    pub private_key_password: Vec<u8>,
    pub tracer: TracerConfig,
}

impl Config {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Load from an explicit key/value snapshot.
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Result<Self, ConfigError> {
        let mut values = HashMap::new();
        for (name, value) in vars {
            let Some(option) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            if !RECOGNIZED.contains(&option) {
                return Err(ConfigError::UnknownParameter(name));
            }
            values.insert(option.to_string(), value);
        }

        let get = |name: &str| values.get(name).map(String::as_str).unwrap_or("");

        let server = ServerConfig {
            address: non_empty_or(get(SERVER_ADDRESS), ":8080"),
            read_timeout: parse_seconds(SERVER_READ_TIMEOUT, get(SERVER_READ_TIMEOUT), 5)?,
            write_timeout: parse_seconds(SERVER_WRITE_TIMEOUT, get(SERVER_WRITE_TIMEOUT), 5)?,
        };

        let log_level = match get(LOG_LEVEL) {
            "" => Level::INFO,
            value => value.parse().map_err(|_| ConfigError::InvalidValue {
                name: LOG_LEVEL,
                reason: format!("not a log level ({value})"),
            })?,
        };

        let cassandra = parse_cassandra(get(CASSANDRA));

        let events = EventsConfig {
            address: get(EVENTS_ADDRESS).to_string(),
            push_period: parse_seconds(EVENTS_PUSH_PERIOD, get(EVENTS_PUSH_PERIOD), 5)?,
        };

        let private_key = required_base64(PRIVATE_KEY, get(PRIVATE_KEY))?;
        let private_key_password = required_base64(PRIVATE_KEY_PASSWORD, get(PRIVATE_KEY_PASSWORD))?;

        let tracer = TracerConfig {
            disabled: parse_bool(TRACER_DISABLED, get(TRACER_DISABLED), true)?,
            agent_address: get(TRACER_AGENT_ADDRESS).to_string(),
            sampler_type: match get(TRACER_SAMPLER_TYPE) {
                "" => SamplerType::Probabilistic,
                value => value.parse().map_err(|reason| ConfigError::InvalidValue {
                    name: TRACER_SAMPLER_TYPE,
                    reason,
                })?,
            },
            sampler_param: parse_f64(TRACER_SAMPLER_PARAM, get(TRACER_SAMPLER_PARAM), 0.1)?,
            sampler_manager_address: get(TRACER_SAMPLER_MANAGER_ADDRESS).to_string(),
        };

        Ok(Self {
            server,
            log_level,
            cassandra,
            events,
            private_key,
            private_key_password,
            tracer,
        })
    }
}

fn non_empty_or(value: &str, default: &str) -> String {
    if value.is_empty() {
        return default.to_string();
    }
    value.to_string()
}

fn parse_seconds(name: &'static str, value: &str, default: u64) -> Result<Duration, ConfigError> {
    if value.is_empty() {
        return Ok(Duration::from_secs(default));
    }
    value
        .parse()
        .map(Duration::from_secs)
        .map_err(|_| ConfigError::InvalidValue {
            name,
            reason: format!("not a number of seconds ({value})"),
        })
}

fn parse_bool(name: &'static str, value: &str, default: bool) -> Result<bool, ConfigError> {
    match value {
        "" => Ok(default),
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            name,
            reason: format!("not a boolean ({other})"),
        }),
    }
}

fn parse_f64(name: &'static str, value: &str, default: f64) -> Result<f64, ConfigError> {
    if value.is_empty() {
        return Ok(default);
    }
    value.parse().map_err(|_| ConfigError::InvalidValue {
        name,
        reason: format!("not a number ({value})"),
    })
}

fn required_base64(name: &'static str, value: &str) -> Result<Vec<u8>, ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::MissingParameter(name));
    }
    base64_decode(value).map_err(|err| ConfigError::InvalidValue {
        name,
        reason: format!("not base64: {err}"),
    })
}

/// `host1:9042,host2:9042/keyspace`; the keyspace defaults to `cards`.
fn parse_cassandra(value: &str) -> Option<CassandraConfig> {
    if value.is_empty() {
        return None;
    }

    let (nodes, keyspace) = match value.split_once('/') {
        Some((nodes, keyspace)) if !keyspace.is_empty() => (nodes, keyspace),
        Some((nodes, _)) => (nodes, "cards"),
        None => (value, "cards"),
    };

    Some(CassandraConfig {
        nodes: nodes.split(',').map(str::to_string).collect(),
        keyspace: keyspace.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use cards_core::codec::base64_encode;

    fn required_vars() -> Vec<(String, String)> {
        vec![
            ("CARDS_PRIVATE_KEY".into(), base64_encode(b"sealed-key")),
            ("CARDS_PRIVATE_KEY_PASSWORD".into(), base64_encode(b"pw")),
        ]
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_vars(required_vars()).unwrap();

        assert_eq!(config.server.address, ":8080");
        assert_eq!(config.server.bind_address(), "0.0.0.0:8080");
        assert_eq!(config.server.read_timeout, Duration::from_secs(5));
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.cassandra.is_none());
        assert_eq!(config.events.push_period, Duration::from_secs(5));
        assert!(config.tracer.disabled);
        assert_eq!(config.tracer.sampler_type, SamplerType::Probabilistic);
        assert_eq!(config.private_key, b"sealed-key");
    }

    #[test]
    fn test_unknown_parameter_rejected() {
        let mut vars = required_vars();
        vars.push(("CARDS_SERVER_ADRESS".into(), ":9090".into()));

        let err = Config::from_vars(vars).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownParameter(name) if name == "CARDS_SERVER_ADRESS"));
    }

    #[test]
    fn test_foreign_variables_ignored() {
        let mut vars = required_vars();
        vars.push(("PATH".into(), "/usr/bin".into()));
        vars.push(("HOME".into(), "/root".into()));

        assert!(Config::from_vars(vars).is_ok());
    }

    #[test]
    fn test_private_key_required() {
        let err = Config::from_vars(Vec::new()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingParameter(PRIVATE_KEY)));

        let vars = vec![("CARDS_PRIVATE_KEY".into(), base64_encode(b"sealed-key"))];
        let err = Config::from_vars(vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingParameter(PRIVATE_KEY_PASSWORD)
        ));
    }

    #[test]
    fn test_private_key_must_be_base64() {
        let vars = vec![
            ("CARDS_PRIVATE_KEY".into(), "!!!".into()),
            ("CARDS_PRIVATE_KEY_PASSWORD".into(), base64_encode(b"pw")),
        ];
        let err = Config::from_vars(vars).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { name: PRIVATE_KEY, .. }));
    }

    #[test]
    fn test_cassandra_parsing() {
        let mut vars = required_vars();
        vars.push(("CARDS_CASSANDRA".into(), "db-1:9042,db-2:9042/cards5".into()));

        let config = Config::from_vars(vars).unwrap();
        let cassandra = config.cassandra.unwrap();
        assert_eq!(cassandra.nodes, vec!["db-1:9042", "db-2:9042"]);
        assert_eq!(cassandra.keyspace, "cards5");

        let mut vars = required_vars();
        vars.push(("CARDS_CASSANDRA".into(), "db-1:9042".into()));
        let cassandra = Config::from_vars(vars).unwrap().cassandra.unwrap();
        assert_eq!(cassandra.keyspace, "cards");
    }

    #[test]
    fn test_sampler_type_is_strict() {
        let mut vars = required_vars();
        vars.push(("CARDS_TRACER_SAMPLER_TYPE".into(), "ratelimiting".into()));

        let err = Config::from_vars(vars).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { name: TRACER_SAMPLER_TYPE, .. }
        ));

        let mut vars = required_vars();
        vars.push(("CARDS_TRACER_SAMPLER_TYPE".into(), "rateLimiting".into()));
        let config = Config::from_vars(vars).unwrap();
        assert_eq!(config.tracer.sampler_type, SamplerType::RateLimiting);
    }

    #[test]
    fn test_timeouts_and_overrides() {
        let mut vars = required_vars();
        vars.push(("CARDS_SERVER_ADDRESS".into(), "127.0.0.1:9090".into()));
        vars.push(("CARDS_SERVER_READ_TIMEOUT".into(), "30".into()));
        vars.push(("CARDS_LOG_LEVEL".into(), "debug".into()));

        let config = Config::from_vars(vars).unwrap();
        assert_eq!(config.server.bind_address(), "127.0.0.1:9090");
        assert_eq!(config.server.read_timeout, Duration::from_secs(30));
        assert_eq!(config.log_level, Level::DEBUG);
    }
}
