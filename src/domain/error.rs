use thiserror::Error;

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Store not configured: {message}")]
    NotConfigured { message: String },

    #[error("Invalid category: {type_name} cache category '{category}' must be among {allowed:?}")]
    InvalidCategory {
        type_name: String,
        category: String,
        allowed: Vec<String>,
    },

    #[error("Invalid content: {message}")]
    InvalidContent { message: String },

    #[error("Invalid key: {message}")]
    InvalidKey { message: String },

    #[error("Invalid pattern: {message}")]
    InvalidPattern { message: String },

    #[error("Store unavailable: {message}")]
    StoreUnavailable { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Queue error: {message}")]
    Queue { message: String },
}

impl DomainError {
    pub fn not_configured(message: impl Into<String>) -> Self {
        Self::NotConfigured {
            message: message.into(),
        }
    }

    pub fn invalid_category(
        type_name: impl Into<String>,
        category: impl Into<String>,
        allowed: &[&str],
    ) -> Self {
        Self::InvalidCategory {
            type_name: type_name.into(),
            category: category.into(),
            allowed: allowed.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn invalid_content(message: impl Into<String>) -> Self {
        Self::InvalidContent {
            message: message.into(),
        }
    }

    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    pub fn invalid_pattern(message: impl Into<String>) -> Self {
        Self::InvalidPattern {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::StoreUnavailable {
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    pub fn queue(message: impl Into<String>) -> Self {
        Self::Queue {
            message: message.into(),
        }
    }

    /// Returns true for failures that may succeed when retried later
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::Queue { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_category_error() {
        let error = DomainError::invalid_category("Widget", "bogus", &["summary", "stats"]);
        assert_eq!(
            error.to_string(),
            "Invalid category: Widget cache category 'bogus' must be among [\"summary\", \"stats\"]"
        );
    }

    #[test]
    fn test_not_configured_error() {
        let error = DomainError::not_configured("call configure() first");
        assert_eq!(error.to_string(), "Store not configured: call configure() first");
    }

    #[test]
    fn test_transient_errors() {
        assert!(DomainError::store("connection reset").is_transient());
        assert!(DomainError::queue("channel closed").is_transient());
        assert!(!DomainError::invalid_key("blank").is_transient());
        assert!(!DomainError::invalid_content("not an object").is_transient());
    }
}
