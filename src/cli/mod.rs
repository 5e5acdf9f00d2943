//! CLI module for MultiCache
//!
//! Maintenance commands against a configured cache store:
//! - `invalidate`: delete a key or every key matching a glob pattern
//! - `destroy-object`, `destroy-type`, `destroy-all`: scope-based invalidation
//! - `show`: print every cached category of one object

pub mod destroy;
pub mod invalidate;
pub mod show;

use clap::{Parser, Subcommand};

use crate::config::AppConfig;
use crate::infrastructure::logging;
use crate::MultiCache;

/// MultiCache - Per-object content cache maintenance
#[derive(Parser)]
#[command(name = "multicache")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Delete a key, or every key matching a glob pattern
    Invalidate(invalidate::InvalidateArgs),

    /// Invalidate every cached category of one object
    DestroyObject(destroy::DestroyObjectArgs),

    /// Invalidate every object of one entity type
    DestroyType(destroy::DestroyTypeArgs),

    /// Invalidate the whole cache namespace
    DestroyAll(destroy::DestroyAllArgs),

    /// Print the cached categories of one object
    Show(show::ShowArgs),
}

/// Loads configuration, installs logging and builds the cache
fn bootstrap() -> anyhow::Result<MultiCache> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().unwrap_or_default();
    logging::init_logging(&config.logging);

    Ok(MultiCache::from_config(&config)?)
}
