use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::debug;

use gridpage::GridConfig;

use super::demo::DemoCommand;

/// gridpage - page through large collections with a cache-coherent window
#[derive(Parser)]
#[command(
    name = "gridpage",
    version,
    about = "Page through large collections with a cache-coherent window",
    long_about = r#"gridpage drives a pagination controller over a generated data set, either
sliced in memory or served through a single-entry backend page cache.

Examples:
  gridpage demo                                 # First page of 1000 people
  gridpage demo --page 3 --sort age:desc        # Third page, oldest first
  gridpage demo --backend --latency-ms 50       # Through the backend cache
  gridpage config                               # Print effective configuration"#
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Page through a generated list of people
    Demo(DemoCommand),
    /// Print the effective configuration as JSON
    Config,
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if self.debug {
            debug!("Debug logging enabled");
        }

        let config = GridConfig::init().await?;
        debug!("Configuration initialized");

        match self.command {
            Commands::Demo(demo) => demo.execute(&config).await,
            Commands::Config => {
                println!("{}", serde_json::to_string_pretty(&config)?);
                Ok(())
            }
        }
    }
}
