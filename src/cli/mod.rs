pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "newsticker")]
#[command(about = "A headline ticker for Hacker News, Reddit, BBC News and Ars Technica", long_about = None)]
pub struct Cli {
    /// Config file to use instead of ~/.config/newsticker/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Disable log output
    #[arg(long, global = true)]
    pub no_log: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List sources and their categories
    Sources,
    /// Fetch once and print the items
    Fetch {
        /// Source index (see `sources`)
        #[arg(short, long)]
        source: Option<usize>,

        /// Category index within the source
        #[arg(short, long)]
        category: Option<usize>,
    },
    /// Keep refreshing and print new items as they arrive
    Watch {
        /// Source index (see `sources`)
        #[arg(short, long)]
        source: Option<usize>,

        /// Category index within the source
        #[arg(short, long)]
        category: Option<usize>,

        /// Refresh interval (e.g., "90s", "5m", "1h")
        #[arg(short, long)]
        interval: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_watch() {
        let cli = Cli::parse_from(["newsticker", "--no-log", "watch", "-s", "2", "-i", "90s"]);
        assert!(cli.no_log);
        match cli.command {
            Commands::Watch {
                source,
                category,
                interval,
            } => {
                assert_eq!(source, Some(2));
                assert_eq!(category, None);
                assert_eq!(interval.as_deref(), Some("90s"));
            }
            _ => panic!("expected watch"),
        }
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::parse_from(["newsticker", "sources", "--config", "/tmp/t.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/t.toml")));
        assert!(matches!(cli.command, Commands::Sources));
    }
}
