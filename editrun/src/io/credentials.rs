//! API key resolution for the editing collaborator.
//!
//! The key is looked up once at startup and then passed explicitly to the
//! editor. Nothing else reads the process environment for it.

use std::fmt;

use crate::core::error::ConfigurationError;

/// Secret API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    var: String,
    value: String,
}

impl ApiKey {
    /// Name of the environment variable the key is exported under.
    pub fn var(&self) -> &str {
        &self.var
    }

    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiKey")
            .field("var", &self.var)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// Resolve `var` through `lookup`. Unset or blank values are a configuration
/// error.
pub fn resolve_api_key<F>(var: &str, lookup: F) -> Result<ApiKey, ConfigurationError>
where
    F: FnOnce(&str) -> Option<String>,
{
    match lookup(var) {
        Some(value) if !value.trim().is_empty() => Ok(ApiKey {
            var: var.to_string(),
            value,
        }),
        _ => Err(ConfigurationError::MissingCredential {
            var: var.to_string(),
        }),
    }
}

/// Resolve `var` from the process environment.
pub fn api_key_from_env(var: &str) -> Result<ApiKey, ConfigurationError> {
    resolve_api_key(var, |name| std::env::var(name).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_present_key() {
        let key = resolve_api_key("OPENROUTER_API_KEY", |_| Some("sk-123".to_string()))
            .expect("key");
        assert_eq!(key.var(), "OPENROUTER_API_KEY");
        assert_eq!(key.expose(), "sk-123");
    }

    #[test]
    fn missing_or_blank_key_is_configuration_error() {
        let err = resolve_api_key("OPENROUTER_API_KEY", |_| None).unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::MissingCredential {
                var: "OPENROUTER_API_KEY".to_string()
            }
        );
        assert!(resolve_api_key("KEY", |_| Some("  ".to_string())).is_err());
    }

    #[test]
    fn debug_redacts_value() {
        let key = resolve_api_key("KEY", |_| Some("sk-secret".to_string())).expect("key");
        let rendered = format!("{key:?}");
        assert!(!rendered.contains("sk-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
