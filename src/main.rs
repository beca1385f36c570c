mod cap;
mod cli;
mod config;
mod download;
mod format;
mod geometry;
mod levels;
mod output;
mod parquet;
mod scrape;
mod summary;
mod temperature;
mod warning;
mod zones;

use std::{fs, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{
    command::{self, temperatures::TemperatureInputs},
    Cli, Commands,
};
use config::{Config, ConfigArgs};
use tracing::debug;
use tracing_subscriber::{fmt, EnvFilter};

fn prepare(args: ConfigArgs) -> Result<Config> {
    let config = Config::try_from(args)?;
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Could not create {}", config.output_dir.display()))?;
    debug!(?config, "configuration");

    Ok(config)
}

async fn run(command: Commands) -> Result<String> {
    match command {
        Commands::Zones {
            inland,
            coastal,
            config,
        } => command::zones(&prepare(config)?, inland, coastal).await,
        Commands::Warnings { url, table, config } => {
            command::warnings(&prepare(config)?, &url, &table).await
        }
        Commands::Levels { url, config } => command::levels(&prepare(config)?, &url).await,
        Commands::Cap { api_key, config } => command::cap(&prepare(config)?, &api_key).await,
        Commands::Temperatures {
            api_keys,
            stations,
            master,
            pause,
            config,
        } => {
            let inputs = TemperatureInputs {
                stations,
                master,
                pause: Duration::from_secs(pause),
            };
            command::temperatures(&prepare(config)?, &api_keys, inputs).await
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli.command).await {
        Ok(filename) => println!("File saved to `{}`", filename),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
