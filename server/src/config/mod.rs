use config::{builder::DefaultState, Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub mongo_uri: String,
    pub mongo_dbname: String,
    /// Signs session cookies; at least 32 bytes.
    pub secret_key: Option<String>,
    pub ip: String,
    pub port: u16,
    pub session_expiry_hours: u64,
    pub login_rate_limit: usize,
    pub login_rate_window_secs: u64,
    pub store_backend: StoreBackend,
}

impl AppConfig {
    /// Defaults, then the optional TOML file, then process environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_from(path, Environment::default())
    }

    pub fn load_from(path: Option<&Path>, env: Environment) -> Result<Self> {
        let mut builder = Self::defaults()?;

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
        }

        // Values stay strings; typed fields are converted on deserialize, so a
        // numeric SECRET_KEY is never rewritten through a float.
        let config = builder.add_source(env).build()?;
        Ok(config.try_deserialize()?)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config = Self::defaults()?
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()?;
        Ok(config.try_deserialize()?)
    }

    fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        Ok(Config::builder()
            .set_default("mongo_uri", "mongodb://localhost:27017")?
            .set_default("mongo_dbname", "driving_lessons")?
            .set_default("ip", "0.0.0.0")?
            .set_default("port", 5000_i64)?
            .set_default("session_expiry_hours", 24_i64)?
            .set_default("login_rate_limit", 10_i64)?
            .set_default("login_rate_window_secs", 60_i64)?
            .set_default("store_backend", "mongo")?)
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.ip.clone(), self.port)
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(format!("Failed to load configuration: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> Environment {
        let source: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Environment::default().source(Some(source))
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::load_from(None, env(&[])).unwrap();
        assert_eq!(config.mongo_uri, "mongodb://localhost:27017");
        assert_eq!(config.mongo_dbname, "driving_lessons");
        assert_eq!(config.port, 5000);
        assert_eq!(config.session_expiry_hours, 24);
        assert_eq!(config.store_backend, StoreBackend::Mongo);
        assert!(config.secret_key.is_none());
    }

    #[test]
    fn test_environment_overrides() {
        let config = AppConfig::load_from(
            None,
            env(&[
                ("MONGO_DBNAME", "lessons_test"),
                ("MONGO_URI", "mongodb://db:27017"),
                ("SECRET_KEY", "0123456789abcdef0123456789abcdef"),
                ("IP", "127.0.0.1"),
                ("PORT", "8081"),
                ("STORE_BACKEND", "memory"),
            ]),
        )
        .unwrap();

        assert_eq!(config.mongo_dbname, "lessons_test");
        assert_eq!(config.mongo_uri, "mongodb://db:27017");
        assert_eq!(
            config.secret_key.as_deref(),
            Some("0123456789abcdef0123456789abcdef")
        );
        assert_eq!(config.bind_address(), ("127.0.0.1".to_string(), 8081));
        assert_eq!(config.store_backend, StoreBackend::Memory);
    }

    #[test]
    fn test_parse_toml() {
        let toml_content = r#"
mongo_dbname = "from_file"
port = 9000
login_rate_limit = 3
        "#;

        let config = AppConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.mongo_dbname, "from_file");
        assert_eq!(config.port, 9000);
        assert_eq!(config.login_rate_limit, 3);
        assert_eq!(config.ip, "0.0.0.0");
    }

    #[test]
    fn test_numeric_secret_kept_verbatim() {
        let secret = "12345678901234567890123456789012345";
        let config = AppConfig::load_from(
            None,
            env(&[("SECRET_KEY", secret), ("PORT", "8081"), ("LOGIN_RATE_LIMIT", "3")]),
        )
        .unwrap();

        assert_eq!(config.secret_key.as_deref(), Some(secret));
        assert_eq!(config.port, 8081);
        assert_eq!(config.login_rate_limit, 3);
    }

    #[test]
    fn test_rejects_bad_port() {
        let result = AppConfig::load_from(None, env(&[("PORT", "not-a-port")]));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
