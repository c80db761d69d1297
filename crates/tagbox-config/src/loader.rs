use crate::config::{AppConfig, UnauthenticatedStatus};
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "TAGBOX_";

impl AppConfig {
    /// Load configuration with precedence: defaults < file < env
    ///
    /// An explicit `path` must exist. Without one, the default location is
    /// used when present.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => {
                    debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };

        config.apply_env_from(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/tagbox/config.toml` or the platform equivalent
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("tagbox").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        debug!(path = %path.display(), "Loading config file");
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Apply `TAGBOX_*` overrides read through `lookup`
    pub fn apply_env_from<F>(&mut self, lookup: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            let key = format!("{ENV_PREFIX}{name}");
            lookup(&key).map(|value| (key, value))
        };

        if let Some((key, value)) = var("HOST") {
            self.server.host = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("PORT") {
            self.server.port = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("BODY_LIMIT") {
            self.server.body_limit = parse(&key, &value)?;
        }
        if let Some((_, value)) = var("CORS_ORIGINS") {
            self.server.cors_origins = value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some((_, value)) = var("DATABASE_PATH") {
            self.database.path = PathBuf::from(value);
        }
        if let Some((key, value)) = var("DATABASE_WAL") {
            self.database.wal_mode = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = var("DATABASE_BUSY_TIMEOUT_MS") {
            self.database.busy_timeout_ms = parse(&key, &value)?;
        }

        if let Some((key, value)) = var("ALLOW_ANONYMOUS_CREATE") {
            self.policy.allow_anonymous_create = parse_bool(&key, &value)?;
        }
        if let Some((key, value)) = var("UNAUTHENTICATED_STATUS") {
            let code: u16 = parse(&key, &value)?;
            self.policy.unauthenticated_status = UnauthenticatedStatus::try_from(code)
                .map_err(|reason| ConfigError::invalid(&key, &value, reason))?;
        }

        if let Some((key, value)) = var("PASSWORD_MEMORY_KIB") {
            self.password.memory_kib = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("PASSWORD_ITERATIONS") {
            self.password.iterations = parse(&key, &value)?;
        }
        if let Some((key, value)) = var("PASSWORD_PARALLELISM") {
            self.password.parallelism = parse(&key, &value)?;
        }

        if let Some((_, value)) = var("LOG_LEVEL") {
            self.logging.level = value;
        }

        Ok(())
    }
}

fn parse<T>(key: &str, value: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::invalid(key, value, e.to_string()))
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::invalid(key, value, "expected a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::collections::HashMap;
    use std::net::{IpAddr, Ipv4Addr};
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.server.port, 8000);
        assert!(!config.policy.allow_anonymous_create);
        assert_eq!(
            config.policy.unauthenticated_status,
            UnauthenticatedStatus::Unauthorized
        );
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [server]
            port = 9000

            [policy]
            unauthenticated_status = 403
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(
            config.policy.unauthenticated_status,
            UnauthenticatedStatus::Forbidden
        );
        assert!(config.database.foreign_keys);
    }

    #[test]
    fn test_rejects_other_status_codes() {
        let result = AppConfig::from_toml_str("[policy]\nunauthenticated_status = 500\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        config
            .apply_env_from(lookup(&[
                ("TAGBOX_PORT", "8080"),
                ("TAGBOX_HOST", "0.0.0.0"),
                ("TAGBOX_ALLOW_ANONYMOUS_CREATE", "true"),
                ("TAGBOX_UNAUTHENTICATED_STATUS", "403"),
                ("TAGBOX_CORS_ORIGINS", "http://a.example, http://b.example,"),
                ("TAGBOX_DATABASE_PATH", "/tmp/t.db"),
            ]))
            .unwrap();

        assert_eq!(config.server.socket_addr().to_string(), "0.0.0.0:8080");
        assert!(config.policy.allow_anonymous_create);
        assert_eq!(config.policy.unauthenticated_status.as_u16(), 403);
        assert_eq!(
            config.server.cors_origins,
            vec!["http://a.example", "http://b.example"]
        );
        assert_eq!(config.database.path, PathBuf::from("/tmp/t.db"));
    }

    #[test]
    fn test_invalid_env_value_is_reported() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env_from(lookup(&[("TAGBOX_PORT", "eighty")]))
            .unwrap_err();
        assert!(err.to_string().contains("TAGBOX_PORT"));

        let err = config
            .apply_env_from(lookup(&[("TAGBOX_UNAUTHENTICATED_STATUS", "402")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_toml_round_trip_through_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = AppConfig::default();
        config.policy.allow_anonymous_create = true;
        config.server.cors_origins = vec!["http://localhost:3000".into()];
        std::fs::write(&path, config.to_toml_string().unwrap()).unwrap();

        assert_eq!(AppConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let result = AppConfig::load(Some(&dir.path().join("nope.toml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    #[serial]
    fn test_load_reads_process_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = 9000\n").unwrap();

        std::env::set_var("TAGBOX_PORT", "9100");
        let config = AppConfig::load(Some(&path));
        std::env::remove_var("TAGBOX_PORT");

        assert_eq!(config.unwrap().server.port, 9100);
    }
}
