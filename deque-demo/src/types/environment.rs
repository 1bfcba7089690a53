//! Environment configuration for different deployment stages

use std::env;
use std::time::Duration;

use aws_config::{retry::RetryConfig, timeout::TimeoutConfig, BehaviorVersion};
use tracing::Level;

/// Application environment configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    /// Production environment
    Production,
    /// Staging environment
    Staging,
    /// Development environment (uses `LocalStack`)
    Development,
}

impl Environment {
    /// Creates an Environment from the `APP_ENV` environment variable
    ///
    /// # Panics
    ///
    /// Panics if `APP_ENV` contains an invalid value
    #[must_use]
    pub fn from_env() -> Self {
        let env = env::var("APP_ENV")
            .unwrap_or_else(|_| "development".to_string())
            .trim()
            .to_lowercase();

        match env.as_str() {
            "production" => Self::Production,
            "staging" => Self::Staging,
            "development" => Self::Development,
            _ => panic!("Invalid environment: {env}"),
        }
    }

    /// Returns the endpoint URL to use for SQS
    ///
    /// `AWS_ENDPOINT_URL` wins over the per-environment default.
    #[must_use]
    pub fn override_aws_endpoint_url(&self) -> Option<String> {
        env::var("AWS_ENDPOINT_URL").ok().or_else(|| match self {
            // Regular AWS endpoints for production and staging
            Self::Production | Self::Staging => None,
            // LocalStack endpoint for development
            Self::Development => Some("http://localhost:4566".to_string()),
        })
    }

    /// AWS configuration without retries and with an operation timeout
    pub async fn aws_config(&self) -> aws_config::SdkConfig {
        let timeout_config = TimeoutConfig::builder()
            .operation_timeout(Duration::from_secs(30))
            .build();

        let mut config_builder = aws_config::load_defaults(BehaviorVersion::latest())
            .await
            .to_builder()
            .retry_config(RetryConfig::disabled())
            .timeout_config(timeout_config);

        if let Some(endpoint_url) = self.override_aws_endpoint_url() {
            config_builder = config_builder.endpoint_url(endpoint_url);
        }

        config_builder.build()
    }

    /// Whether logs are emitted as JSON
    #[must_use]
    pub const fn json_logs(&self) -> bool {
        matches!(self, Self::Production | Self::Staging)
    }

    #[must_use]
    pub fn tracing_level(&self) -> Level {
        env::var("TRACING_LEVEL")
            .ok()
            .and_then(|val| val.parse::<Level>().ok())
            .unwrap_or(match self {
                Self::Production | Self::Staging => Level::INFO,
                Self::Development => Level::DEBUG,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_environment_from_env() {
        // Test development (default)
        env::remove_var("APP_ENV");
        assert_eq!(Environment::from_env(), Environment::Development);

        // Test explicit development
        env::set_var("APP_ENV", "development");
        assert_eq!(Environment::from_env(), Environment::Development);

        // Test staging
        env::set_var("APP_ENV", " Staging ");
        assert_eq!(Environment::from_env(), Environment::Staging);

        // Test production
        env::set_var("APP_ENV", "production");
        assert_eq!(Environment::from_env(), Environment::Production);

        env::remove_var("APP_ENV");
    }

    #[test]
    #[serial]
    #[should_panic(expected = "Invalid environment: invalid")]
    fn test_invalid_environment() {
        env::set_var("APP_ENV", "invalid");
        let _ = Environment::from_env();
    }

    #[test]
    #[serial]
    fn test_endpoint_override() {
        env::remove_var("AWS_ENDPOINT_URL");
        assert_eq!(Environment::Production.override_aws_endpoint_url(), None);
        assert_eq!(
            Environment::Development.override_aws_endpoint_url().as_deref(),
            Some("http://localhost:4566")
        );

        env::set_var("AWS_ENDPOINT_URL", "http://sqs.internal:9324");
        assert_eq!(
            Environment::Staging.override_aws_endpoint_url().as_deref(),
            Some("http://sqs.internal:9324")
        );
        assert_eq!(
            Environment::Development.override_aws_endpoint_url().as_deref(),
            Some("http://sqs.internal:9324")
        );
        env::remove_var("AWS_ENDPOINT_URL");
    }

    #[tokio::test]
    #[serial]
    async fn test_aws_config_keeps_endpoint_from_env() {
        env::set_var("AWS_REGION", "us-east-1");

        env::remove_var("AWS_ENDPOINT_URL");
        let config = Environment::Development.aws_config().await;
        assert_eq!(config.endpoint_url(), Some("http://localhost:4566"));

        env::set_var("AWS_ENDPOINT_URL", "http://sqs.internal:9324");
        let config = Environment::Development.aws_config().await;
        assert_eq!(config.endpoint_url(), Some("http://sqs.internal:9324"));

        env::remove_var("AWS_ENDPOINT_URL");
        env::remove_var("AWS_REGION");
    }

    #[test]
    #[serial]
    fn test_tracing_level() {
        env::remove_var("TRACING_LEVEL");
        assert_eq!(Environment::Production.tracing_level(), Level::INFO);
        assert_eq!(Environment::Development.tracing_level(), Level::DEBUG);

        env::set_var("TRACING_LEVEL", "warn");
        assert_eq!(Environment::Development.tracing_level(), Level::WARN);
        env::remove_var("TRACING_LEVEL");
    }
}
