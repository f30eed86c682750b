use anyhow::Context;
use validator::Validate;

/// Process configuration, read once from the environment at startup.
#[derive(Debug, Clone, Validate)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Static API key checked by the auth guard on write routes.
    #[validate(length(min = 10, message = "SERVER_API_KEY must be at least 10 characters"))]
    pub api_key: String,
    pub cors_allow_origin: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Config {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a valid port number")?,
            database_url: std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            api_key: std::env::var("SERVER_API_KEY").context("SERVER_API_KEY must be set")?,
            cors_allow_origin: std::env::var("CORS_ALLOW_ORIGIN")
                .unwrap_or_else(|_| "*".to_string()),
        };

        config
            .validate()
            .context("environment configuration is invalid")?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            database_url: "postgres://localhost/coffees".to_string(),
            api_key: "0123456789abcdef".to_string(),
            cors_allow_origin: "*".to_string(),
        }
    }

    #[test]
    fn accepts_valid_config() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn rejects_short_api_key() {
        let config = Config {
            api_key: "too-short".to_string(),
            ..valid_config()
        };
        assert!(config.validate().is_err());
    }
}
