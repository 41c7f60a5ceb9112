use dotenv::dotenv;
use serde::Deserialize;

/// How strictly `PUT /bookings/{id}/status` checks the requested status.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StatusValidation {
    /// Any non-blank status string is stored as given.
    #[default]
    Permissive,
    /// Only the known booking statuses are accepted.
    Strict,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub port: u16,
    pub bind_address: String,
    pub uploads_dir: String,
    pub db_pool_size: u32,
    pub app_env: String,
    pub booking_status_validation: StatusValidation,
}

impl AppConfig {
    /// Reads `.env` (if present) and then the process environment.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenv().ok();
        Self::from_source(config::Environment::default())
    }

    fn from_source<S>(source: S) -> Result<Self, config::ConfigError>
    where
        S: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .set_default("port", 5000)?
            .set_default("bind_address", "0.0.0.0")?
            .set_default("uploads_dir", "uploads")?
            .set_default("db_pool_size", 10)?
            .set_default("app_env", "development")?
            .set_default("booking_status_validation", "permissive")?
            .add_source(source)
            .build()?
            .try_deserialize()
    }

    /// `DATABASE_URL=memory://` runs against the in-process store.
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.starts_with("memory://")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> config::Environment {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        config::Environment::default().source(Some(map))
    }

    #[test]
    fn applies_defaults() {
        let config = AppConfig::from_source(env(&[
            ("DATABASE_URL", "postgres://localhost/stays"),
            ("JWT_SECRET", "secret"),
        ]))
        .unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.uploads_dir, "uploads");
        assert_eq!(config.db_pool_size, 10);
        assert_eq!(config.booking_status_validation, StatusValidation::Permissive);
        assert!(!config.uses_memory_store());
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_source(env(&[
            ("DATABASE_URL", "memory://"),
            ("JWT_SECRET", "secret"),
            ("PORT", "8080"),
            ("BOOKING_STATUS_VALIDATION", "strict"),
        ]))
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.booking_status_validation, StatusValidation::Strict);
        assert!(config.uses_memory_store());
    }

    #[test]
    fn missing_secret_is_an_error() {
        let result = AppConfig::from_source(env(&[("DATABASE_URL", "memory://")]));
        assert!(result.is_err());
    }
}
