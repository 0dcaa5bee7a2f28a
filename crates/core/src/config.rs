use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATHS: &[&str] = &["lunchly.toml", "config/lunchly.toml"];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];
const MAX_TIMEOUT_SECS: u64 = 300;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub database_url: Option<String>,
    pub database_max_connections: Option<u32>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

/// An environment variable layer for one config field. Earlier names win.
#[derive(Clone, Copy, Debug)]
pub struct EnvKey {
    pub field: &'static str,
    pub names: &'static [&'static str],
}

pub const ENV_KEYS: &[EnvKey] = &[
    EnvKey { field: "database.url", names: &["LUNCHLY_DATABASE_URL"] },
    EnvKey { field: "database.max_connections", names: &["LUNCHLY_DATABASE_MAX_CONNECTIONS"] },
    EnvKey { field: "database.timeout_secs", names: &["LUNCHLY_DATABASE_TIMEOUT_SECS"] },
    EnvKey { field: "logging.level", names: &["LUNCHLY_LOGGING_LEVEL", "LUNCHLY_LOG_LEVEL"] },
    EnvKey { field: "logging.format", names: &["LUNCHLY_LOGGING_FORMAT", "LUNCHLY_LOG_FORMAT"] },
];

impl EnvKey {
    pub fn for_field(field: &str) -> Option<&'static EnvKey> {
        ENV_KEYS.iter().find(|key| key.field == field)
    }

    /// First set, non-blank variable for this field, with the name it came from.
    pub fn lookup(&self) -> Option<(&'static str, String)> {
        self.names.iter().find_map(|name| read_env(name).map(|value| (*name, value)))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite://lunchly.db?mode=rwc".to_string(),
                max_connections: 5,
                timeout_secs: 30,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        let url = self.url.trim();
        url == ":memory:" || url.starts_with("sqlite::memory:") || url.contains("mode=memory")
    }

    /// Each connection to a private in-memory database sees its own empty
    /// database, so such pools are held to one connection.
    pub fn pool_size(&self) -> u32 {
        if self.is_in_memory() {
            1
        } else {
            self.max_connections
        }
    }
}

impl LogFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compact => "compact",
            Self::Pretty => "pretty",
            Self::Json => "json",
        }
    }
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    /// Resolves configuration in order: defaults, config file, `LUNCHLY_*`
    /// environment, explicit overrides. The result is validated before return.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        match resolve_config_path(options.config_path.as_deref()) {
            Some(path) => config.apply_patch(read_patch(&path)?),
            None if options.require_file => {
                let expected =
                    options.config_path.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATHS[0]));
                return Err(ConfigError::MissingConfigFile(expected));
            }
            None => {}
        }

        for key in ENV_KEYS {
            if let Some((name, value)) = key.lookup() {
                config.set_from_env(key.field, name, value)?;
            }
        }

        config.apply_overrides(options.overrides);
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.database.url.trim();
        let is_sqlite =
            url.starts_with("sqlite://") || url.starts_with("sqlite::") || url == ":memory:";
        if !is_sqlite {
            return Err(invalid(
                "database.url must be a sqlite URL (`sqlite://...`, `sqlite::...`, or `:memory:`)",
            ));
        }
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections must be greater than zero"));
        }
        if !(1..=MAX_TIMEOUT_SECS).contains(&self.database.timeout_secs) {
            return Err(invalid("database.timeout_secs must be in range 1..=300"));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(invalid("logging.level must be one of trace|debug|info|warn|error"));
        }
        Ok(())
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        let database = patch.database.unwrap_or_default();
        let logging = patch.logging.unwrap_or_default();

        replace(&mut self.database.url, database.url);
        replace(&mut self.database.max_connections, database.max_connections);
        replace(&mut self.database.timeout_secs, database.timeout_secs);
        replace(&mut self.logging.level, logging.level);
        replace(&mut self.logging.format, logging.format);
    }

    fn set_from_env(&mut self, field: &str, name: &str, value: String) -> Result<(), ConfigError> {
        match field {
            "database.url" => self.database.url = value,
            "database.max_connections" => {
                self.database.max_connections = parse_env_number(name, &value)?;
            }
            "database.timeout_secs" => {
                self.database.timeout_secs = parse_env_number(name, &value)?;
            }
            "logging.level" => self.logging.level = value,
            "logging.format" => self.logging.format = value.parse()?,
            _ => {}
        }
        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        replace(&mut self.database.url, overrides.database_url);
        replace(&mut self.database.max_connections, overrides.database_max_connections);
        replace(&mut self.logging.level, overrides.log_level);
        replace(&mut self.logging.format, overrides.log_format);
    }
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).find(|path| path.exists())
}

fn replace<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Validation(message.to_string())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    toml::from_str::<ConfigPatch>(&interpolate_env_vars(&raw)?)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

/// Expands every `${VAR}` in `input`. An unset variable is an error.
fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let end = tail.find('}').ok_or(ConfigError::UnterminatedInterpolation)?;
        let var = &tail[..end];

        let value = env::var(var)
            .map_err(|_| ConfigError::MissingEnvInterpolation { var: var.to_string() })?;
        output.push_str(&value);
        rest = &tail[end + 1..];
    }

    output.push_str(rest);
    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_env_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    database: Option<DatabasePatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct DatabasePatch {
    url: Option<String>,
    max_connections: Option<u32>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

    use tempfile::TempDir;

    use super::{
        interpolate_env_vars, AppConfig, ConfigError, ConfigOverrides, DatabaseConfig, EnvKey,
        LoadOptions, LogFormat, ENV_KEYS,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    /// Holds the env lock with every `LUNCHLY_*` key cleared, then removes the
    /// variables it set when dropped.
    struct EnvScope {
        _guard: MutexGuard<'static, ()>,
        set: Vec<String>,
    }

    impl EnvScope {
        fn with(vars: &[(&str, &str)]) -> Self {
            let guard = ENV_LOCK
                .get_or_init(|| Mutex::new(()))
                .lock()
                .unwrap_or_else(PoisonError::into_inner);

            for name in ENV_KEYS.iter().flat_map(|key| key.names.iter()) {
                env::remove_var(name);
            }
            for (name, value) in vars {
                env::set_var(name, value);
            }

            Self { _guard: guard, set: vars.iter().map(|(name, _)| name.to_string()).collect() }
        }
    }

    impl Drop for EnvScope {
        fn drop(&mut self) {
            for name in &self.set {
                env::remove_var(name);
            }
        }
    }

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("lunchly.toml");
        fs::write(&path, body).expect("write config file");
        path
    }

    fn load_from(path: PathBuf) -> Result<AppConfig, ConfigError> {
        AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
    }

    #[test]
    fn defaults_are_valid() {
        let _env = EnvScope::with(&[]);

        let config = AppConfig::load(LoadOptions::default()).expect("defaults load");

        assert_eq!(config.database.url, "sqlite://lunchly.db?mode=rwc");
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.database.timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Compact);
    }

    #[test]
    fn file_values_are_interpolated_from_environment() {
        let _env = EnvScope::with(&[("TEST_LUNCHLY_DB_PATH", "from-env.db")]);
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, "[database]\nurl = \"sqlite://${TEST_LUNCHLY_DB_PATH}\"\n");

        let config = load_from(path).expect("config loads");

        assert_eq!(config.database.url, "sqlite://from-env.db");
    }

    #[test]
    fn missing_interpolation_variable_is_named() {
        let _env = EnvScope::with(&[]);
        env::remove_var("TEST_LUNCHLY_UNSET_VAR");
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(&dir, "[database]\nurl = \"${TEST_LUNCHLY_UNSET_VAR}\"\n");

        let error = load_from(path).expect_err("unset variable should fail");

        assert!(matches!(
            error,
            ConfigError::MissingEnvInterpolation { ref var } if var == "TEST_LUNCHLY_UNSET_VAR"
        ));
    }

    #[test]
    fn interpolation_leaves_plain_text_alone_and_rejects_open_braces() {
        let plain = "level = \"info\" # costs $5";
        assert_eq!(interpolate_env_vars(plain).ok().as_deref(), Some(plain));
        assert!(matches!(
            interpolate_env_vars("url = \"${LUNCHLY_DB"),
            Err(ConfigError::UnterminatedInterpolation)
        ));
    }

    #[test]
    fn logging_aliases_apply_when_primary_keys_are_unset() {
        let _env =
            EnvScope::with(&[("LUNCHLY_LOG_LEVEL", "warn"), ("LUNCHLY_LOG_FORMAT", "pretty")]);

        let config = AppConfig::load(LoadOptions::default()).expect("config loads");

        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn primary_logging_key_beats_its_alias() {
        let _env = EnvScope::with(&[
            ("LUNCHLY_LOGGING_LEVEL", "error"),
            ("LUNCHLY_LOG_LEVEL", "trace"),
        ]);

        let key = EnvKey::for_field("logging.level").expect("logging.level has env keys");

        assert_eq!(key.lookup(), Some(("LUNCHLY_LOGGING_LEVEL", "error".to_string())));
    }

    #[test]
    fn layers_apply_defaults_then_file_then_env_then_overrides() {
        let _env = EnvScope::with(&[
            ("LUNCHLY_DATABASE_URL", "sqlite://from-env.db"),
            ("LUNCHLY_DATABASE_TIMEOUT_SECS", "45"),
        ]);
        let dir = TempDir::new().expect("temp dir");
        let path = write_config(
            &dir,
            r#"
[database]
url = "sqlite://from-file.db"
timeout_secs = 10
max_connections = 8

[logging]
level = "warn"
"#,
        );

        let config = AppConfig::load(LoadOptions {
            config_path: Some(path),
            overrides: ConfigOverrides {
                database_url: Some("sqlite://from-override.db".to_string()),
                log_level: Some("debug".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config loads");

        assert_eq!(config.database.url, "sqlite://from-override.db");
        assert_eq!(config.database.timeout_secs, 45);
        assert_eq!(config.database.max_connections, 8);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn non_sqlite_url_fails_validation() {
        let _env = EnvScope::with(&[("LUNCHLY_DATABASE_URL", "postgres://localhost/lunchly")]);

        let error = AppConfig::load(LoadOptions::default()).expect_err("postgres is rejected");

        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("database.url")
        ));
    }

    #[test]
    fn out_of_range_timeout_fails_validation() {
        let _env = EnvScope::with(&[("LUNCHLY_DATABASE_TIMEOUT_SECS", "301")]);

        let error = AppConfig::load(LoadOptions::default()).expect_err("timeout is capped");

        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("timeout_secs")
        ));
    }

    #[test]
    fn non_numeric_env_override_names_the_key() {
        let _env = EnvScope::with(&[("LUNCHLY_DATABASE_MAX_CONNECTIONS", "many")]);

        let error = AppConfig::load(LoadOptions::default()).expect_err("not a number");

        assert!(matches!(
            error,
            ConfigError::InvalidEnvOverride { ref key, .. }
                if key == "LUNCHLY_DATABASE_MAX_CONNECTIONS"
        ));
    }

    #[test]
    fn required_file_missing_is_an_error() {
        let _env = EnvScope::with(&[]);
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("absent.toml");

        let result = AppConfig::load(LoadOptions {
            config_path: Some(path.clone()),
            require_file: true,
            ..LoadOptions::default()
        });

        assert!(matches!(
            result,
            Err(ConfigError::MissingConfigFile(ref missing)) if *missing == path
        ));
    }

    #[test]
    fn in_memory_databases_use_a_single_connection() {
        let database = |url: &str| DatabaseConfig {
            url: url.to_string(),
            max_connections: 5,
            timeout_secs: 30,
        };

        assert_eq!(database("sqlite::memory:").pool_size(), 1);
        assert_eq!(database(":memory:").pool_size(), 1);
        assert_eq!(database("sqlite://file:demo?mode=memory").pool_size(), 1);
        assert_eq!(database("sqlite://lunchly.db?mode=rwc").pool_size(), 5);
    }
}
