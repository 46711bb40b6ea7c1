use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use crate::core::EngineDefaults;
use crate::models::{MissingAttribute, ScoringPolicy};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub query: QuerySettings,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 50502 }

#[derive(Debug, Clone, Deserialize)]
pub struct QuerySettings {
    #[serde(default = "default_query_url")]
    pub base_url: String,
    pub timeout_secs: Option<u64>,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            base_url: default_query_url(),
            timeout_secs: None,
        }
    }
}

fn default_query_url() -> String { "http://open-match-query.open-match.svc.cluster.local:51503".to_string() }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineSettings {
    /// Snowflake node id; must be unique per running process
    pub node_id: Option<u16>,
    pub function_name: Option<String>,
    #[serde(default)]
    pub scoring_policy: ScoringPolicy,
    #[serde(default)]
    pub missing_attribute: MissingAttribute,
}

impl EngineSettings {
    /// Configured node id, or one derived from the process id
    pub fn node_id(&self) -> u16 {
        self.node_id
            .unwrap_or_else(|| (std::process::id() % 1024) as u16)
    }

    pub fn defaults(&self) -> EngineDefaults {
        let mut defaults = EngineDefaults {
            scoring_policy: self.scoring_policy,
            missing_attribute: self.missing_attribute,
            ..EngineDefaults::default()
        };
        if let Some(name) = &self.function_name {
            defaults.function_name = name.clone();
        }
        defaults
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with MMF_)
    pub fn load() -> Result<Self, ConfigError> {
        let mut settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., MMF__SERVER__PORT -> server.port
            .add_source(
                Environment::with_prefix("MMF")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings = substitute_env_vars(settings)?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("MMF")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }
}

/// Apply well-known deployment variables on top of the layered config
///
/// `QUERY_SERVICE_URL` overrides `query.base_url` and `MMF_NODE_ID`
/// overrides `engine.node_id`.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings);

    if let Ok(url) = env::var("QUERY_SERVICE_URL") {
        builder = builder.set_override("query.base_url", url)?;
    }
    if let Some(node) = env::var("MMF_NODE_ID").ok().and_then(|v| v.parse::<u16>().ok()) {
        builder = builder.set_override("engine.node_id", node as i64)?;
    }

    builder.build()
}
