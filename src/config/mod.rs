//! Configuration management.
//!
//! Configuration is read from a TOML file and then overridden by environment
//! variables. Lookup order for the file:
//!
//! 1. `--config <path>` on the command line
//! 2. `GRAPH_RETRIEVER_CONFIG_PATH`
//! 3. Platform config dir (`graph-retriever/config.toml`)
//! 4. XDG-style `~/.config/graph-retriever/config.toml`
//!
//! ```toml
//! [arangodb]
//! endpoint = "http://host.docker.internal:8529"
//! database = "_system"
//! username = "root"
//! password = "${ARANGO_ROOT_PASSWORD}"
//!
//! [retrieval]
//! graph_name = "policies_graph"
//! hop = 100
//!
//! [logging]
//! level = "info"
//! format = "json"
//! ```

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable prefix for all overrides.
pub const ENV_PREFIX: &str = "GRAPH_RETRIEVER_";

/// Main configuration for the retriever.
#[derive(Debug, Clone, Default)]
pub struct RetrieverConfig {
    /// Graph store connection settings.
    pub arangodb: ArangoSettings,
    /// Retrieval defaults applied per incoming message.
    pub retrieval: RetrievalSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// Metrics settings.
    pub metrics: MetricsSettings,
}

/// `ArangoDB` connection settings.
#[derive(Debug, Clone)]
pub struct ArangoSettings {
    /// Server endpoint URL.
    pub endpoint: String,
    /// Database name.
    pub database: String,
    /// User name for basic auth.
    pub username: String,
    /// Password for basic auth.
    pub password: SecretString,
    /// Request timeout in milliseconds (0 to disable).
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds (0 to disable).
    pub connect_timeout_ms: u64,
    /// Rows per cursor batch.
    pub batch_size: u32,
}

impl Default for ArangoSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://host.docker.internal:8529".to_string(),
            database: "_system".to_string(),
            username: "root".to_string(),
            password: SecretString::from(String::new()),
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
            batch_size: 1_000,
        }
    }
}

/// Retrieval defaults used to build each request's retrieval configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrievalSettings {
    /// Graph the collections belong to.
    pub graph_name: String,
    /// Collection holding the text nodes.
    pub start_collection: String,
    /// Edge collection walked during expansion.
    pub edge_collection: String,
    /// Maximum traversal depth.
    pub hop: u32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            graph_name: "policies_graph".to_string(),
            start_collection: "GraphNodes".to_string(),
            edge_collection: "GraphEdges".to_string(),
            hop: 100,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format string, defaulting to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoggingSettings {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
    /// Optional log file; stderr when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            file: None,
        }
    }
}

/// Metrics settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSettings {
    /// Whether the Prometheus exporter is installed.
    pub enabled: bool,
    /// Port for the Prometheus HTTP listener.
    pub port: u16,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// `[arangodb]` section.
    pub arangodb: Option<ConfigFileArango>,
    /// `[retrieval]` section.
    pub retrieval: Option<ConfigFileRetrieval>,
    /// `[logging]` section.
    pub logging: Option<ConfigFileLogging>,
    /// `[metrics]` section.
    pub metrics: Option<ConfigFileMetrics>,
}

/// `[arangodb]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileArango {
    /// Endpoint URL.
    pub endpoint: Option<String>,
    /// Database name.
    pub database: Option<String>,
    /// User name.
    pub username: Option<String>,
    /// Password (may be an environment reference like `${ARANGO_PASSWORD}`).
    pub password: Option<String>,
    /// Request timeout.
    pub timeout_ms: Option<u64>,
    /// Connect timeout.
    pub connect_timeout_ms: Option<u64>,
    /// Cursor batch size.
    pub batch_size: Option<u32>,
}

/// `[retrieval]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileRetrieval {
    /// Graph name.
    pub graph_name: Option<String>,
    /// Start collection.
    pub start_collection: Option<String>,
    /// Edge collection.
    pub edge_collection: Option<String>,
    /// Traversal depth.
    pub hop: Option<u32>,
}

/// `[logging]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLogging {
    /// Filter directive.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

/// `[metrics]` section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileMetrics {
    /// Whether metrics are exported.
    pub enabled: Option<bool>,
    /// Listener port.
    pub port: Option<u16>,
}

impl RetrieverConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        Ok(Self::from_toml_str(&contents)?.with_env_overrides())
    }

    /// Parses configuration from TOML text without env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid configuration TOML.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the explicit path, `GRAPH_RETRIEVER_CONFIG_PATH`,
    /// or the default location, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }

        if let Some(path) = env_var("CONFIG_PATH") {
            return Self::load_from_file(Path::new(&path));
        }

        Ok(Self::load_default())
    }

    /// Loads configuration from the default location.
    ///
    /// Returns defaults (with env overrides) if no config file is found or
    /// the file found cannot be parsed.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default().with_env_overrides();
        };

        let candidates = [
            base_dirs
                .config_dir()
                .join("graph-retriever")
                .join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("graph-retriever")
                .join("config.toml"),
        ];

        for candidate in candidates.iter().filter(|path| path.exists()) {
            match Self::load_from_file(candidate) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "Ignoring unreadable config file");
                },
            }
        }

        Self::default().with_env_overrides()
    }

    /// Converts a `ConfigFile` to `RetrieverConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(arango) = file.arangodb {
            let target = &mut config.arangodb;
            if let Some(v) = arango.endpoint {
                target.endpoint = expand_env(&v);
            }
            if let Some(v) = arango.database {
                target.database = expand_env(&v);
            }
            if let Some(v) = arango.username {
                target.username = expand_env(&v);
            }
            if let Some(v) = arango.password {
                target.password = SecretString::from(expand_env(&v));
            }
            if let Some(v) = arango.timeout_ms {
                target.timeout_ms = v;
            }
            if let Some(v) = arango.connect_timeout_ms {
                target.connect_timeout_ms = v;
            }
            if let Some(v) = arango.batch_size {
                target.batch_size = v;
            }
        }
        if let Some(retrieval) = file.retrieval {
            let target = &mut config.retrieval;
            if let Some(v) = retrieval.graph_name {
                target.graph_name = v;
            }
            if let Some(v) = retrieval.start_collection {
                target.start_collection = v;
            }
            if let Some(v) = retrieval.edge_collection {
                target.edge_collection = v;
            }
            if let Some(v) = retrieval.hop {
                target.hop = v;
            }
        }
        if let Some(logging) = file.logging {
            if let Some(v) = logging.level {
                config.logging.level = v;
            }
            if let Some(v) = logging.format {
                config.logging.format = LogFormat::parse(&v);
            }
            config.logging.file = logging.file.map(|f| PathBuf::from(expand_env(&f)));
        }
        if let Some(metrics) = file.metrics {
            if let Some(v) = metrics.enabled {
                config.metrics.enabled = v;
            }
            if let Some(v) = metrics.port {
                config.metrics.port = v;
            }
        }

        config
    }

    /// Applies `GRAPH_RETRIEVER_*` environment variable overrides.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(v) = env_var("ARANGO_URL") {
            self.arangodb.endpoint = v;
        }
        if let Some(v) = env_var("ARANGO_DATABASE") {
            self.arangodb.database = v;
        }
        if let Some(v) = env_var("ARANGO_USERNAME") {
            self.arangodb.username = v;
        }
        if let Some(v) = env_var("ARANGO_PASSWORD") {
            self.arangodb.password = SecretString::from(v);
        }
        if let Some(v) = env_var("ARANGO_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            self.arangodb.timeout_ms = v;
        }
        if let Some(v) = env_var("HOP").and_then(|v| v.parse().ok()) {
            self.retrieval.hop = v;
        }
        if let Some(v) = env_var("GRAPH_NAME") {
            self.retrieval.graph_name = v;
        }
        if let Some(v) = env_var("LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&v);
        }
        if let Some(v) = env_var("LOG_FILE") {
            self.logging.file = Some(PathBuf::from(v));
        }
        if let Some(v) = env_var("METRICS_ENABLED").and_then(|v| parse_bool(&v)) {
            self.metrics.enabled = v;
        }
        if let Some(v) = env_var("METRICS_PORT").and_then(|v| v.parse().ok()) {
            self.metrics.port = v;
        }
        self
    }

    /// Renders the effective configuration as TOML with the password redacted.
    #[must_use]
    pub fn to_redacted_toml(&self) -> String {
        let view = RedactedView {
            arangodb: RedactedArango {
                endpoint: &self.arangodb.endpoint,
                database: &self.arangodb.database,
                username: &self.arangodb.username,
                password: if self.arangodb.password.expose_secret().is_empty() {
                    ""
                } else {
                    "***REDACTED***"
                },
                timeout_ms: self.arangodb.timeout_ms,
                connect_timeout_ms: self.arangodb.connect_timeout_ms,
                batch_size: self.arangodb.batch_size,
            },
            retrieval: &self.retrieval,
            logging: &self.logging,
            metrics: &self.metrics,
        };
        toml::to_string_pretty(&view).unwrap_or_else(|e| format!("# failed to render: {e}\n"))
    }
}

#[derive(Serialize)]
struct RedactedView<'a> {
    arangodb: RedactedArango<'a>,
    retrieval: &'a RetrievalSettings,
    logging: &'a LoggingSettings,
    metrics: &'a MetricsSettings,
}

#[derive(Serialize)]
struct RedactedArango<'a> {
    endpoint: &'a str,
    database: &'a str,
    username: &'a str,
    password: &'a str,
    timeout_ms: u64,
    connect_timeout_ms: u64,
    batch_size: u32,
}

/// Reads a non-empty `GRAPH_RETRIEVER_<name>` variable.
fn env_var(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}"))
        .ok()
        .filter(|v| !v.trim().is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Expands a whole-value `${VAR}` reference from the environment.
///
/// Values that are not exactly one reference are returned unchanged; an unset
/// variable expands to the empty string.
fn expand_env(value: &str) -> String {
    value
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .map_or_else(
            || value.to_string(),
            |name| std::env::var(name).unwrap_or_default(),
        )
}
