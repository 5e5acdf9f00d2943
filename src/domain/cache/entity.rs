//! Contract each cacheable entity type supplies

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::DomainError;

/// Structured content stored under one category of one object
pub type CachedContent = serde_json::Map<String, Value>;

/// Domain objects that can be addressed in the cache
pub trait Identifiable {
    /// Identifier used as the object segment of the cache key
    fn cache_id(&self) -> String;
}

/// Normalized cache target: an id, plus the loaded instance when the caller had one
#[derive(Debug)]
pub struct EntityTarget<'a, E> {
    id: String,
    instance: Option<&'a E>,
}

impl<E> Clone for EntityTarget<'_, E> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            instance: self.instance,
        }
    }
}

impl<'a, E: Identifiable> EntityTarget<'a, E> {
    /// Targets an entity by id only; producers load it when needed
    pub fn from_id(id: impl ToString) -> Self {
        Self {
            id: id.to_string().trim().to_string(),
            instance: None,
        }
    }

    /// Targets an already loaded instance
    pub fn from_instance(instance: &'a E) -> Self {
        Self {
            id: instance.cache_id().trim().to_string(),
            instance: Some(instance),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn instance(&self) -> Option<&'a E> {
        self.instance
    }
}

/// Per-type capability descriptor: categories, content producer, parser
///
/// Implementations are registered once and dispatched statically through
/// `ObjectCache<D>`.
#[async_trait]
pub trait EntityCacheDescriptor: Send + Sync + 'static {
    /// Domain object this descriptor caches
    type Entity: Identifiable + Send + Sync;

    /// Type segment of the cache key. Must stay stable across releases.
    fn type_name(&self) -> &str;

    /// Finite allow-list of categories for this type
    fn allowed_categories(&self) -> &[&'static str];

    /// Produces the content for one category; must return a JSON object
    async fn generate_content(
        &self,
        target: &EntityTarget<'_, Self::Entity>,
        category: &str,
    ) -> Result<Value, DomainError>;

    /// Post-processes content before it reaches the caller
    fn parse_content(&self, content: CachedContent, _category: &str) -> Result<Value, DomainError> {
        Ok(Value::Object(content))
    }

    /// Rejects categories outside the allow-list
    fn validate_category(&self, category: &str) -> Result<(), DomainError> {
        let allowed = self.allowed_categories();

        if allowed.contains(&category) {
            Ok(())
        } else {
            Err(DomainError::invalid_category(
                self.type_name(),
                category,
                allowed,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Gadget {
        id: u64,
    }

    impl Identifiable for Gadget {
        fn cache_id(&self) -> String {
            self.id.to_string()
        }
    }

    struct GadgetCache;

    #[async_trait]
    impl EntityCacheDescriptor for GadgetCache {
        type Entity = Gadget;

        fn type_name(&self) -> &str {
            "Gadget"
        }

        fn allowed_categories(&self) -> &[&'static str] {
            &["summary"]
        }

        async fn generate_content(
            &self,
            target: &EntityTarget<'_, Gadget>,
            _category: &str,
        ) -> Result<Value, DomainError> {
            Ok(serde_json::json!({ "id": target.id() }))
        }
    }

    #[test]
    fn test_target_from_id_trims() {
        let target: EntityTarget<'_, Gadget> = EntityTarget::from_id(" 7 ");

        assert_eq!(target.id(), "7");
        assert!(target.instance().is_none());
    }

    #[test]
    fn test_target_from_instance() {
        let gadget = Gadget { id: 9 };
        let target = EntityTarget::from_instance(&gadget);

        assert_eq!(target.id(), "9");
        assert_eq!(target.instance().map(|g| g.id), Some(9));
    }

    #[test]
    fn test_validate_category() {
        assert!(GadgetCache.validate_category("summary").is_ok());

        let result = GadgetCache.validate_category("stats");
        assert!(matches!(result, Err(DomainError::InvalidCategory { .. })));
    }

    #[test]
    fn test_default_parse_content_is_identity() {
        let mut content = CachedContent::new();
        content.insert("name".to_string(), Value::from("Foo"));

        let parsed = GadgetCache.parse_content(content, "summary").unwrap();
        assert_eq!(parsed, serde_json::json!({ "name": "Foo" }));
    }
}
