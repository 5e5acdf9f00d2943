//! Destroy commands - scope based invalidation

use clap::Args;
use tracing::info;

use crate::domain::invalidation::InvalidationMode;
use crate::infrastructure::invalidation::InvalidationOutcome;

/// Arguments for the destroy-object command
#[derive(Args, Clone, Debug)]
pub struct DestroyObjectArgs {
    /// Entity type name
    pub type_name: String,

    /// Object id
    pub id: String,

    /// Delete before returning instead of scheduling a background job
    #[arg(long)]
    pub sync: bool,
}

/// Arguments for the destroy-type command
#[derive(Args, Clone, Debug)]
pub struct DestroyTypeArgs {
    /// Entity type name
    pub type_name: String,

    #[arg(long)]
    pub sync: bool,
}

/// Arguments for the destroy-all command
#[derive(Args, Clone, Debug)]
pub struct DestroyAllArgs {
    #[arg(long)]
    pub sync: bool,
}

fn mode(sync: bool) -> InvalidationMode {
    if sync {
        InvalidationMode::Sync
    } else {
        InvalidationMode::Async
    }
}

fn report(scope: &str, outcome: InvalidationOutcome) {
    match outcome {
        InvalidationOutcome::Deleted(deleted) => {
            info!(scope, deleted, "Invalidation complete");
            println!("{}", deleted);
        }
        InvalidationOutcome::Background(outcome) => {
            info!(scope, %outcome, "Background invalidation requested");
        }
    }
}

/// Run the destroy-object command
pub async fn run_object(args: DestroyObjectArgs) -> anyhow::Result<()> {
    let cache = super::bootstrap()?;

    let result = cache
        .engine()
        .destroy_obj_cache(&args.type_name, &args.id, mode(args.sync))
        .await;

    cache.shutdown().await;
    report(&format!("object:{}/{}", args.type_name, args.id), result?);

    Ok(())
}

/// Run the destroy-type command
pub async fn run_type(args: DestroyTypeArgs) -> anyhow::Result<()> {
    let cache = super::bootstrap()?;

    let result = cache
        .destroy_class_cache(&args.type_name, mode(args.sync))
        .await;

    cache.shutdown().await;
    report(&format!("type:{}", args.type_name), result?);

    Ok(())
}

/// Run the destroy-all command
pub async fn run_all(args: DestroyAllArgs) -> anyhow::Result<()> {
    let cache = super::bootstrap()?;

    let result = cache.destroy_all(mode(args.sync)).await;

    cache.shutdown().await;
    report("all", result?);

    Ok(())
}
