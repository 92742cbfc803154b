//! Configuration loading from environment variables.

/// Runtime configuration for the RTE server.
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL.
    pub database_url: String,
    /// HTTP listen port.
    pub port: u16,
    /// Course-level mastery threshold used when a package defines none.
    pub default_mastery: f64,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `DATABASE_URL`: PostgreSQL connection string
    ///
    /// Optional (with defaults):
    /// - `PORT`: HTTP listen port (default: 8081)
    /// - `RTE_DEFAULT_MASTERY`: fallback mastery threshold (default: 80)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8081".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("PORT", "must be a valid port number"))?;

        let default_mastery: f64 = std::env::var("RTE_DEFAULT_MASTERY")
            .unwrap_or_else(|_| "80".to_string())
            .parse()
            .map_err(|_| ConfigError::Invalid("RTE_DEFAULT_MASTERY", "must be a number"))?;
        if !(0.0..=100.0).contains(&default_mastery) {
            return Err(ConfigError::Invalid(
                "RTE_DEFAULT_MASTERY",
                "must be between 0 and 100",
            ));
        }

        Ok(Self {
            database_url,
            port,
            default_mastery,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
