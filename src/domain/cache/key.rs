//! Cache key generation
//!
//! Keys form a strict hierarchy so that prefix scans can delete whole scopes:
//!
//! ```text
//! MultiCache                      master namespace
//! MultiCache:Widget               class-wide prefix
//! MultiCache:Widget:42            per-object container (hash, one field per category)
//! MultiCache:invalidation:<pat>   background invalidation guard
//! ```
//!
//! Do not change the composition order once entries exist in a store.

use std::fmt;

use crate::domain::DomainError;

/// Fixed namespace token that starts every key
pub const CACHE_KEY_MASTER_PREFIX: &str = "MultiCache";

/// Separator between key segments
pub const CACHE_KEY_SEPARATOR: &str = ":";

/// Namespace segment for invalidation guard keys
pub const INVALIDATION_NAMESPACE: &str = "invalidation";

/// Returns `MultiCache:<type>` or `MultiCache:<type>:<id>`
///
/// A blank `id` yields the class-wide prefix.
pub fn entity_prefix(type_name: &str, id: Option<&str>) -> Result<String, DomainError> {
    let type_name = type_name.trim();

    if type_name.is_empty() {
        return Err(DomainError::invalid_key("Entity type name can not be blank"));
    }

    if type_name == INVALIDATION_NAMESPACE {
        return Err(DomainError::invalid_key(format!(
            "Entity type name '{}' is reserved",
            type_name
        )));
    }

    let mut chain = vec![CACHE_KEY_MASTER_PREFIX, type_name];

    if let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) {
        chain.push(id);
    }

    Ok(chain.join(CACHE_KEY_SEPARATOR))
}

/// Returns the container key holding every category of one object
pub fn object_key(type_name: &str, id: &str) -> Result<String, DomainError> {
    if id.trim().is_empty() {
        return Err(DomainError::invalid_key(format!(
            "{} cache key requires a non-blank id",
            type_name
        )));
    }

    entity_prefix(type_name, Some(id))
}

/// Returns the guard key used to deduplicate background invalidation of `pattern`
pub fn guard_key(pattern: &str) -> String {
    [CACHE_KEY_MASTER_PREFIX, INVALIDATION_NAMESPACE, pattern.trim()].join(CACHE_KEY_SEPARATOR)
}

/// Whether `key` is a background invalidation guard rather than cached content
pub fn is_guard_key(key: &str) -> bool {
    key.strip_prefix(CACHE_KEY_MASTER_PREFIX)
        .and_then(|rest| rest.strip_prefix(CACHE_KEY_SEPARATOR))
        .and_then(|rest| rest.strip_prefix(INVALIDATION_NAMESPACE))
        .is_some_and(|rest| rest.starts_with(CACHE_KEY_SEPARATOR))
}

/// Escapes glob metacharacters so the value only matches itself in a scan
pub fn escape_glob(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());

    for c in value.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

/// Deletion scope, from the whole namespace down to a single object
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyScope {
    /// Every key written by this library
    All,
    /// Every object of one entity type
    Type(String),
    /// One object container with all its categories
    Object { type_name: String, id: String },
}

impl KeyScope {
    pub fn all() -> Self {
        Self::All
    }

    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self::Type(type_name.into())
    }

    pub fn for_object(type_name: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Object {
            type_name: type_name.into(),
            id: id.into(),
        }
    }

    /// Renders the scan pattern for this scope
    ///
    /// The type scope keeps the trailing separator so `Widget` does not match
    /// `WidgetGroup`. The object scope is literal so id `4` does not match `42`.
    pub fn pattern(&self) -> Result<String, DomainError> {
        match self {
            KeyScope::All => Ok(format!("{}{}*", CACHE_KEY_MASTER_PREFIX, CACHE_KEY_SEPARATOR)),
            KeyScope::Type(type_name) => {
                let prefix = entity_prefix(&escape_glob(type_name), None)?;
                Ok(format!("{}{}*", prefix, CACHE_KEY_SEPARATOR))
            }
            KeyScope::Object { type_name, id } => {
                if id.trim().is_empty() {
                    return Err(DomainError::invalid_key(format!(
                        "{} object scope requires a non-blank id",
                        type_name
                    )));
                }
                entity_prefix(&escape_glob(type_name), Some(&escape_glob(id)))
            }
        }
    }
}

impl fmt::Display for KeyScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyScope::All => write!(f, "all"),
            KeyScope::Type(type_name) => write!(f, "type:{}", type_name),
            KeyScope::Object { type_name, id } => write!(f, "object:{}/{}", type_name, id),
        }
    }
}
