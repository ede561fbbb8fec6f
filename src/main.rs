use std::time::Duration;

use clap::Parser;

use newsticker::app::AppContext;
use newsticker::cli::{commands, Cli, Commands};
use newsticker::config::{parse_interval, Config};
use newsticker::coordinator::Selection;
use newsticker::logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if cli.no_log {
        config.logging.enabled = false;
    }

    let log_switch = logging::init(&config.logging)?;
    let ctx = AppContext::new(&config, log_switch)?;

    match cli.command {
        Commands::Sources => {
            commands::list_sources(&ctx);
        }
        Commands::Fetch { source, category } => {
            commands::fetch_once(
                &ctx,
                source.unwrap_or(config.ticker.source),
                category.unwrap_or(config.ticker.category),
            )
            .await?;
        }
        Commands::Watch {
            source,
            category,
            interval,
        } => {
            let interval = match interval {
                Some(text) => Duration::from_secs(parse_interval(&text).map_err(anyhow::Error::msg)?),
                None => config.ticker.interval()?,
            };
            let selection = Selection {
                source: source.unwrap_or(config.ticker.source),
                category: category.unwrap_or(config.ticker.category),
                interval,
                logging: config.logging.enabled,
            };
            commands::watch(&ctx, selection).await?;
        }
    }

    Ok(())
}
