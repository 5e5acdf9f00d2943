use clap::Parser;
use multicache::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Invalidate(args) => cli::invalidate::run(args).await,
        Command::DestroyObject(args) => cli::destroy::run_object(args).await,
        Command::DestroyType(args) => cli::destroy::run_type(args).await,
        Command::DestroyAll(args) => cli::destroy::run_all(args).await,
        Command::Show(args) => cli::show::run(args).await,
    }
}
