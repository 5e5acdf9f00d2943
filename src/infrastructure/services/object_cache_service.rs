//! Per-object, per-category content cache

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, instrument};

use crate::domain::DomainError;
use crate::domain::cache::{CachedContent, EntityCacheDescriptor, EntityTarget, object_key};
use crate::domain::invalidation::InvalidationMode;
use crate::infrastructure::invalidation::{InvalidationEngine, InvalidationOutcome};
use crate::infrastructure::observability::record_cache_read;
use crate::infrastructure::store::StoreAccessor;

/// Get-or-compute cache for one entity type
///
/// Every object has a single container key; each category is a field of it
/// holding the JSON-encoded content. Concurrent misses for the same field may
/// both produce and write; the last write wins.
pub struct ObjectCache<D: EntityCacheDescriptor> {
    descriptor: Arc<D>,
    accessor: Arc<StoreAccessor>,
    engine: Arc<InvalidationEngine>,
}

impl<D: EntityCacheDescriptor> Clone for ObjectCache<D> {
    fn clone(&self) -> Self {
        Self {
            descriptor: self.descriptor.clone(),
            accessor: self.accessor.clone(),
            engine: self.engine.clone(),
        }
    }
}

impl<D: EntityCacheDescriptor> fmt::Debug for ObjectCache<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectCache")
            .field("type_name", &self.descriptor.type_name())
            .field("categories", &self.descriptor.allowed_categories())
            .finish()
    }
}

impl<D: EntityCacheDescriptor> ObjectCache<D> {
    /// Creates a cache for the entity type described by `descriptor`
    pub fn new(
        descriptor: Arc<D>,
        accessor: Arc<StoreAccessor>,
        engine: Arc<InvalidationEngine>,
    ) -> Self {
        Self {
            descriptor,
            accessor,
            engine,
        }
    }

    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }

    pub fn type_name(&self) -> &str {
        self.descriptor.type_name()
    }

    /// Container key of one object
    pub fn obj_cache_key(&self, id: &str) -> Result<String, DomainError> {
        object_key(self.type_name(), id)
    }

    /// Returns the cached content of `category`, producing and storing it on a miss
    #[instrument(skip(self, target), fields(type_name = %self.type_name(), id = %target.id()))]
    pub async fn get_cached(
        &self,
        target: EntityTarget<'_, D::Entity>,
        category: &str,
    ) -> Result<Value, DomainError> {
        self.descriptor.validate_category(category)?;

        let key = self.obj_cache_key(target.id())?;
        let store = self.accessor.get_store().await?;

        let content = match store.hget(&key, category).await? {
            Some(json) => {
                record_cache_read(self.type_name(), category, true);
                decode_content(&key, category, &json)?
            }
            None => {
                record_cache_read(self.type_name(), category, false);
                debug!(key = %key, category, "Cache miss, generating content");

                let generated = self.descriptor.generate_content(&target, category).await?;
                let content = require_object(generated, self.type_name(), category)?;

                if !content.is_empty() {
                    self.write_to_cache(&key, category, &content).await?;
                }

                content
            }
        };

        self.descriptor.parse_content(content, category)
    }

    /// Shorthand for `get_cached` with an id-only target
    pub async fn get_cached_by_id(&self, id: &str, category: &str) -> Result<Value, DomainError> {
        self.get_cached(EntityTarget::from_id(id), category).await
    }

    /// Writes `content` into the `category` field of the container at `key`
    pub async fn write_to_cache(
        &self,
        key: &str,
        category: &str,
        content: &CachedContent,
    ) -> Result<(), DomainError> {
        self.descriptor.validate_category(category)?;

        let json = encode_content(content)?;
        let store = self.accessor.get_store().await?;

        store.hset(key, category, &json).await
    }

    /// Produces several categories and stores them with one multi-field write
    ///
    /// Returns the number of categories written; empty content is skipped.
    #[instrument(skip(self, target), fields(type_name = %self.type_name(), id = %target.id()))]
    pub async fn warm(
        &self,
        target: EntityTarget<'_, D::Entity>,
        categories: &[&str],
    ) -> Result<usize, DomainError> {
        for category in categories {
            self.descriptor.validate_category(category)?;
        }

        let key = self.obj_cache_key(target.id())?;
        let mut fields = Vec::with_capacity(categories.len());

        for category in categories {
            let generated = self.descriptor.generate_content(&target, category).await?;
            let content = require_object(generated, self.type_name(), category)?;

            if !content.is_empty() {
                fields.push((category.to_string(), encode_content(&content)?));
            }
        }

        let store = self.accessor.get_store().await?;
        store.hset_multiple(&key, &fields).await?;

        Ok(fields.len())
    }

    /// Returns every category currently cached for one object, as stored
    pub async fn cached_categories(
        &self,
        id: &str,
    ) -> Result<HashMap<String, CachedContent>, DomainError> {
        let key = self.obj_cache_key(id)?;
        let store = self.accessor.get_store().await?;

        store
            .hget_all(&key)
            .await?
            .into_iter()
            .map(|(category, json)| {
                let content = decode_content(&key, &category, &json)?;
                Ok((category, content))
            })
            .collect()
    }

    /// Schedules background invalidation of every category of one object
    pub async fn destroy_obj_cache(&self, id: &str) -> Result<InvalidationOutcome, DomainError> {
        self.engine
            .destroy_obj_cache(self.type_name(), id, InvalidationMode::Async)
            .await
    }

    /// Deletes every category of one object before returning
    pub async fn destroy_obj_cache_sync(
        &self,
        id: &str,
    ) -> Result<InvalidationOutcome, DomainError> {
        self.engine
            .destroy_obj_cache(self.type_name(), id, InvalidationMode::Sync)
            .await
    }

    /// Deletes selected categories of one object, leaving the others cached
    pub async fn destroy_obj_categories(
        &self,
        id: &str,
        categories: &[&str],
    ) -> Result<usize, DomainError> {
        for category in categories {
            self.descriptor.validate_category(category)?;
        }

        let key = self.obj_cache_key(id)?;
        let fields: Vec<String> = categories.iter().map(|c| c.to_string()).collect();
        let store = self.accessor.get_store().await?;

        store.hdel(&key, &fields).await
    }

    /// Schedules background invalidation of every object of this type
    pub async fn destroy_class_cache(&self) -> Result<InvalidationOutcome, DomainError> {
        self.engine
            .destroy_class_cache(self.type_name(), InvalidationMode::Async)
            .await
    }
}

fn require_object(value: Value, type_name: &str, category: &str) -> Result<CachedContent, DomainError> {
    match value {
        Value::Object(content) => Ok(content),
        other => Err(DomainError::invalid_content(format!(
            "{} content for category '{}' must be a JSON object, got {}",
            type_name,
            category,
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn encode_content(content: &CachedContent) -> Result<String, DomainError> {
    serde_json::to_string(content)
        .map_err(|e| DomainError::serialization(format!("Failed to serialize content: {}", e)))
}

fn decode_content(key: &str, category: &str, json: &str) -> Result<CachedContent, DomainError> {
    serde_json::from_str(json).map_err(|e| {
        DomainError::serialization(format!(
            "Failed to deserialize '{}' field '{}': {}",
            key, category, e
        ))
    })
}
