//! [`TextGenerator`] backed by the Claude Messages API.

use super::{GeneratorError, TextGenerator};
use crate::error::ConfigError;
use async_trait::async_trait;
use claude::{Claude, Request};
use std::time::Duration;

const SYSTEM_PROMPT: &str = "You write short, gentle, educational adventure stories for young children. \
You always answer with a single JSON object and nothing else.";

/// Claude-backed story generator.
#[derive(Clone)]
pub struct ClaudeGenerator {
    client: Claude,
}

impl ClaudeGenerator {
    pub fn new(client: Claude) -> Self {
        Self { client }
    }

    /// Create a generator from the ANTHROPIC_API_KEY environment variable.
    pub fn from_env() -> Result<Self, ConfigError> {
        let client = Claude::from_env().map_err(|_| ConfigError::NoApiKey)?;
        Ok(Self::new(client))
    }

    /// Bound each HTTP request.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            client: self.client.with_timeout(timeout),
        }
    }
}

#[async_trait]
impl TextGenerator for ClaudeGenerator {
    async fn invoke(
        &self,
        prompt: &str,
        max_length: usize,
        temperature: f32,
    ) -> Result<String, GeneratorError> {
        let request = Request::new(prompt)
            .with_system(SYSTEM_PROMPT)
            .with_max_tokens(max_length)
            .with_temperature(temperature);

        let completion = self.client.complete(request).await.map_err(map_error)?;
        Ok(completion.text)
    }

    fn name(&self) -> &str {
        "claude"
    }
}

/// Sort a client error into the generator's failure taxonomy.
fn map_error(error: claude::Error) -> GeneratorError {
    match error {
        claude::Error::NoApiKey => GeneratorError::AuthError {
            reason: "API key not configured".to_string(),
        },
        claude::Error::Config(reason) => GeneratorError::AuthError { reason },
        claude::Error::Timeout => GeneratorError::Timeout,
        claude::Error::Network(reason) => GeneratorError::Network { reason },
        // A body we cannot read is the service's fault and may not repeat.
        claude::Error::Parse(reason) => GeneratorError::ServerError { reason },
        claude::Error::Api {
            status,
            message,
            retry_after,
        } => match status {
            401 | 403 => GeneratorError::AuthError { reason: message },
            429 => GeneratorError::RateLimited { retry_after },
            408 => GeneratorError::Timeout,
            400 | 404 | 413 | 422 => GeneratorError::InvalidRequest {
                reason: format!("status {status}: {message}"),
            },
            _ => GeneratorError::ServerError {
                reason: format!("status {status}: {message}"),
            },
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> claude::Error {
        claude::Error::Api {
            status,
            message: "body".to_string(),
            retry_after: Some(Duration::from_secs(2)),
        }
    }

    #[test]
    fn test_status_mapping() {
        assert!(matches!(map_error(api(401)), GeneratorError::AuthError { .. }));
        assert!(matches!(map_error(api(403)), GeneratorError::AuthError { .. }));
        assert_eq!(
            map_error(api(429)),
            GeneratorError::RateLimited {
                retry_after: Some(Duration::from_secs(2))
            }
        );
        assert!(matches!(map_error(api(400)), GeneratorError::InvalidRequest { .. }));
        assert!(matches!(map_error(api(500)), GeneratorError::ServerError { .. }));
        assert!(matches!(map_error(api(529)), GeneratorError::ServerError { .. }));
        assert_eq!(map_error(api(408)), GeneratorError::Timeout);
    }

    #[tokio::test]
    async fn test_unreachable_service_is_transient() {
        let generator = ClaudeGenerator::new(Claude::new("test-key").with_base_url("http://127.0.0.1:9"))
            .with_timeout(Duration::from_secs(2));
        let err = generator.invoke("Tell a story", 100, 0.7).await.unwrap_err();
        assert!(
            matches!(err, GeneratorError::Network { .. } | GeneratorError::Timeout),
            "{err:?}"
        );
    }

    #[test]
    fn test_transport_mapping() {
        assert_eq!(map_error(claude::Error::Timeout), GeneratorError::Timeout);
        assert!(map_error(claude::Error::Network("reset".into())).is_transient());
        assert!(!map_error(claude::Error::NoApiKey).is_transient());
        assert!(map_error(claude::Error::Parse("eof".into())).is_transient());
    }

    #[test]
    fn test_generator_name() {
        let generator = ClaudeGenerator::new(Claude::new("test-key"));
        assert_eq!(generator.name(), "claude");
    }
}
