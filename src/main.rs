use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use estuary::app::AppContext;
use estuary::cli::{commands, Cli, Commands, SourceCommands};
use estuary::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = Config::load()?;
    let ctx = AppContext::new(config, None)?;

    match cli.command {
        Commands::Sources { command } => match command {
            SourceCommands::Add { id, kind, base_url } => {
                commands::add_source(&ctx, &id, &kind, &base_url)?;
            }
            SourceCommands::List => {
                commands::list_sources(&ctx)?;
            }
            SourceCommands::Remove { id } => {
                commands::remove_source(&ctx, &id)?;
            }
        },
        Commands::Sync { source, force } => {
            commands::sync(&ctx, source.as_deref(), force).await?;
        }
        Commands::Topics {
            source,
            stream,
            offset,
            limit,
        } => {
            commands::show_topics(&ctx, &source, &stream, offset, limit).await?;
        }
        Commands::Comments {
            source,
            topic,
            more,
        } => {
            commands::show_comments(&ctx, &source, &topic, more).await?;
        }
        Commands::Trends { source, tab } => {
            commands::show_trends(&ctx, &source, &tab).await?;
        }
        Commands::Forums { source } => {
            commands::show_forums(&ctx, &source).await?;
        }
        Commands::Clear { kind, stream } => {
            commands::clear(&ctx, &kind, &stream)?;
        }
    }

    Ok(())
}
