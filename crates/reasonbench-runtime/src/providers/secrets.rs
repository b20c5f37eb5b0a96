//! Credential handling for HTTP providers.
//!
//! API keys are wrapped in [`ApiCredential`] as soon as they are read, so
//! they cannot leak through `Debug`, `Display`, or `tracing` fields:
//!
//! ```ignore
//! use crate::providers::secrets::ApiCredential;
//!
//! // Inline config value first, then the environment
//! let cred = ApiCredential::resolve(config.api_key.as_deref(), "OPENAI_API_KEY", "OpenAI API key")?;
//!
//! // Exposed only where the header is built
//! request.bearer_auth(cred.expose());
//! ```

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

use super::ProviderError;

/// Where a credential was loaded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    /// Inline `api_key` in the run configuration
    Config,
    /// Environment variable
    Environment,
    /// Provided programmatically
    Programmatic,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Config => write!(f, "config"),
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::Programmatic => write!(f, "programmatic"),
        }
    }
}

/// A securely-stored API credential.
///
/// `Debug` and `Display` print `[REDACTED]`; the value is zeroed on drop and
/// only reachable through [`ApiCredential::expose`].
pub struct ApiCredential {
    value: SecretString,
    source: CredentialSource,
    name: &'static str,
}

impl ApiCredential {
    /// Wrap a credential value.
    pub fn new(value: impl Into<String>, source: CredentialSource, name: &'static str) -> Self {
        Self {
            value: SecretString::from(value.into()),
            source,
            name,
        }
    }

    /// Load a credential from an environment variable. Empty values count as unset.
    pub fn from_env(env_var: &str, name: &'static str) -> Result<Self, ProviderError> {
        match std::env::var(env_var) {
            Ok(v) if !v.trim().is_empty() => Ok(Self::new(v, CredentialSource::Environment, name)),
            _ => Err(ProviderError::NotConfigured(format!(
                "{} not set: configure '{}' environment variable",
                name, env_var
            ))),
        }
    }

    /// Use the inline config value when present, otherwise read `env_var`.
    pub fn resolve(
        inline: Option<&str>,
        env_var: &str,
        name: &'static str,
    ) -> Result<Self, ProviderError> {
        if let Some(value) = inline.filter(|v| !v.trim().is_empty()) {
            return Ok(Self::new(value, CredentialSource::Config, name));
        }

        Self::from_env(env_var, name).map_err(|_| {
            ProviderError::NotConfigured(format!(
                "{} required: set 'api_key' in config or the {} environment variable",
                name, env_var
            ))
        })
    }

    /// Check whether [`ApiCredential::resolve`] would succeed, without loading.
    pub fn is_available(inline: Option<&str>, env_var: &str) -> bool {
        inline.is_some_and(|v| !v.trim().is_empty())
            || std::env::var(env_var).is_ok_and(|v| !v.trim().is_empty())
    }

    /// Expose the credential value for use in an HTTP header.
    ///
    /// Call at the point of use only. Never store the exposed value.
    pub fn expose(&self) -> &str {
        self.value.expose_secret()
    }

    /// Check if the credential is empty.
    pub fn is_empty(&self) -> bool {
        self.value.expose_secret().is_empty()
    }
}

impl fmt::Debug for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiCredential")
            .field("value", &"[REDACTED]")
            .field("source", &self.source)
            .field("name", &self.name)
            .finish()
    }
}

impl fmt::Display for ApiCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {} [REDACTED]", self.name, self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credential_redacted_in_debug() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Programmatic, "Test API key");

        let debug = format!("{:?}", cred);
        assert!(!debug.contains(secret), "Secret exposed in Debug!");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_credential_redacted_in_display() {
        let secret = "sk-super-secret-key-12345";
        let cred = ApiCredential::new(secret, CredentialSource::Config, "Test API key");

        let display = format!("{}", cred);
        assert!(!display.contains(secret), "Secret exposed in Display!");
        assert!(display.contains("[REDACTED]"));
        assert!(display.contains("Test API key"));
        assert!(display.contains("config"));
    }

    #[test]
    fn test_credential_expose() {
        let cred = ApiCredential::new("sk-abc", CredentialSource::Programmatic, "Test API key");
        assert_eq!(cred.expose(), "sk-abc");
        assert!(!cred.is_empty());
    }

    #[test]
    fn test_resolve_prefers_inline_value() {
        std::env::set_var("REASONBENCH_TEST_KEY_PRIORITY", "env-key");
        let cred =
            ApiCredential::resolve(Some("config-key"), "REASONBENCH_TEST_KEY_PRIORITY", "Test key")
                .unwrap();

        assert_eq!(cred.expose(), "config-key");
        assert_eq!(cred.to_string(), "Test key from config [REDACTED]");

        std::env::remove_var("REASONBENCH_TEST_KEY_PRIORITY");
    }

    #[test]
    fn test_resolve_falls_back_to_env() {
        std::env::set_var("REASONBENCH_TEST_KEY_FALLBACK", "env-key");
        let cred = ApiCredential::resolve(Some("  "), "REASONBENCH_TEST_KEY_FALLBACK", "Test key")
            .unwrap();

        assert_eq!(cred.expose(), "env-key");
        assert_eq!(cred.to_string(), "Test key from environment [REDACTED]");

        std::env::remove_var("REASONBENCH_TEST_KEY_FALLBACK");
    }

    #[test]
    fn test_resolve_error_when_missing() {
        let err = ApiCredential::resolve(None, "REASONBENCH_NONEXISTENT_VAR_12345", "Test key")
            .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("Test key"));
        assert!(msg.contains("api_key"));
        assert!(msg.contains("REASONBENCH_NONEXISTENT_VAR_12345"));
    }

    #[test]
    fn test_is_available() {
        assert!(ApiCredential::is_available(Some("value"), "REASONBENCH_NONEXISTENT"));
        assert!(!ApiCredential::is_available(None, "REASONBENCH_NONEXISTENT"));
        assert!(!ApiCredential::is_available(Some(""), "REASONBENCH_NONEXISTENT"));
    }
}
