use std::{env, time::Duration};

use thiserror::Error;

const DEFAULT_OFF_CATEGORIES_URL: &str = "https://fr.openfoodfacts.org/categories.json";
const DEFAULT_OFF_PRODUCT_URL: &str = "https://fr.openfoodfacts.org/api/v0/product/";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(String),

    #[error("environment variable {name} has an invalid value: {value}")]
    Invalid { name: String, value: String },
}

/// Read a required environment variable. Empty values count as unset.
pub fn get_env_variable(name: &str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name.to_string())),
    }
}

fn parse_optional<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => {
            value.trim().parse::<T>().map_err(|_| ConfigError::Invalid {
                name: name.to_string(),
                value,
            })
        }
        _ => Ok(default),
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub off: OpenFoodFactsConfig,
}

/// Endpoints of the external nutrition database.
#[derive(Debug, Clone)]
pub struct OpenFoodFactsConfig {
    pub categories_url: String,
    pub product_url: String,
    pub timeout: Duration,
}

impl Default for OpenFoodFactsConfig {
    fn default() -> Self {
        Self {
            categories_url: DEFAULT_OFF_CATEGORIES_URL.to_string(),
            product_url: DEFAULT_OFF_PRODUCT_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl OpenFoodFactsConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let categories_url = env::var("OFF_CATEGORIES_URL")
            .unwrap_or_else(|_| DEFAULT_OFF_CATEGORIES_URL.to_string());
        let product_url =
            env::var("OFF_PRODUCT_URL").unwrap_or_else(|_| DEFAULT_OFF_PRODUCT_URL.to_string());
        let timeout_secs = parse_optional::<u64>("OFF_TIMEOUT_SECS", 30)?;
        Ok(Self {
            categories_url,
            product_url,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = get_env_variable("DATABASE_URL")?;
        let jwt_secret = get_env_variable("JWT_SECRET")?;
        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_optional::<u16>("APP_PORT", 3000)?;
        let jwt_ttl_hours = parse_optional::<i64>("JWT_TTL_HOURS", 24)?;
        Ok(Self {
            port,
            database_url,
            host,
            jwt_secret,
            jwt_ttl_hours,
            off: OpenFoodFactsConfig::from_env()?,
        })
    }
}
