//! Invalidate command - pattern based deletion

use clap::Args;
use tracing::info;

use crate::domain::invalidation::SYNC_BLOCK_SIZE;

/// Arguments for the invalidate command
#[derive(Args, Clone, Debug)]
pub struct InvalidateArgs {
    /// Key or glob pattern, e.g. `MultiCache:Widget:*`
    pub pattern: String,

    /// Treat the pattern as a literal key
    #[arg(long)]
    pub exact: bool,

    /// Keys requested per scan step
    #[arg(long, default_value_t = SYNC_BLOCK_SIZE)]
    pub block_size: usize,

    /// Schedule a deduplicated background job instead of deleting inline
    #[arg(long, conflicts_with = "exact")]
    pub background: bool,
}

/// Run the invalidate command
pub async fn run(args: InvalidateArgs) -> anyhow::Result<()> {
    let cache = super::bootstrap()?;

    let result = if args.background {
        cache
            .engine()
            .invalidate_async(&args.pattern)
            .await
            .map(|outcome| info!(pattern = %args.pattern, %outcome, "Background invalidation requested"))
    } else {
        cache
            .engine()
            .invalidate_sync(&args.pattern, args.exact, args.block_size)
            .await
            .map(|deleted| {
                info!(pattern = %args.pattern, deleted, "Invalidation complete");
                println!("{}", deleted);
            })
    };

    cache.shutdown().await;

    Ok(result?)
}
