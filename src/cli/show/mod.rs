//! Show command - dumps one object's cached categories

use std::collections::BTreeMap;

use clap::Args;
use serde_json::Value;

use crate::domain::DomainError;
use crate::domain::cache::object_key;

/// Arguments for the show command
#[derive(Args, Clone, Debug)]
pub struct ShowArgs {
    /// Entity type name
    pub type_name: String,

    /// Object id
    pub id: String,
}

/// Run the show command
pub async fn run(args: ShowArgs) -> anyhow::Result<()> {
    let cache = super::bootstrap()?;
    let result = load(&cache, &args).await;
    cache.shutdown().await;

    println!("{}", serde_json::to_string_pretty(&result?)?);

    Ok(())
}

async fn load(
    cache: &crate::MultiCache,
    args: &ShowArgs,
) -> Result<BTreeMap<String, Value>, DomainError> {
    let key = object_key(&args.type_name, &args.id)?;
    let store = cache.accessor().get_store().await?;

    store
        .hget_all(&key)
        .await?
        .into_iter()
        .map(|(category, json)| {
            let content = serde_json::from_str(&json).map_err(|e| {
                DomainError::serialization(format!(
                    "Failed to deserialize '{}' field '{}': {}",
                    key, category, e
                ))
            })?;
            Ok((category, content))
        })
        .collect()
}
