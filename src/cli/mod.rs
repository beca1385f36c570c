//! Command line interface.

pub mod command;

use std::{path::PathBuf, time::Duration};

use clap::{command, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use crate::config::ConfigArgs;

pub const WARNINGS_URL: &str = "https://www.aemet.es/es/eltiempo/prediccion/avisos?r=1";
pub const WARNINGS_TABLE: &str = ".table";
pub const STATION_PAUSE_SECS: u64 = 2;

#[derive(Parser)]
#[command(version, about, long_about = None)]
/// Contains the commands
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the zone reference from the inland and coastal zone files
    Zones {
        /// Inland zones GeoJSON [default: <output-dir>/zonas.geojson]
        #[arg(long, value_name = "PATH")]
        inland: Option<PathBuf>,
        /// Coastal zones GeoJSON [default: <output-dir>/zonas_costeras.geojson]
        #[arg(long, value_name = "PATH")]
        coastal: Option<PathBuf>,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Scrape, geocode and publish the current warnings
    Warnings {
        /// Warnings page
        #[arg(long, default_value = WARNINGS_URL)]
        url: String,
        /// CSS locator of the warnings table
        #[arg(long, default_value = WARNINGS_TABLE)]
        table: String,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Summarise the hourly warning levels of every zone
    Levels {
        /// Warnings page
        #[arg(long, default_value = WARNINGS_URL)]
        url: String,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Download today's CAP alerts from AEMET open data
    Cap {
        /// AEMET open-data API key
        #[arg(long, env = "AEMET_API_KEY", hide_env_values = true)]
        api_key: String,
        #[command(flatten)]
        config: ConfigArgs,
    },
    /// Download the latest daily maxima and build the temperature map table
    Temperatures {
        /// AEMET open-data API keys, tried in order
        #[arg(
            long = "api-key",
            env = "AEMET_API_KEY",
            hide_env_values = true,
            value_delimiter = ',',
            required = true
        )]
        api_keys: Vec<String>,
        /// Station ids CSV
        /// [default: <output-dir>/complementarios_temperaturas/ids_estaciones_reducido.csv]
        #[arg(long, value_name = "PATH")]
        stations: Option<PathBuf>,
        /// Station master CSV [default: <output-dir>/complementarios_temperaturas/datos_mapa.csv]
        #[arg(long, value_name = "PATH")]
        master: Option<PathBuf>,
        /// Seconds to wait between two stations
        #[arg(long, default_value_t = STATION_PAUSE_SECS, value_name = "SECS")]
        pause: u64,
        #[command(flatten)]
        config: ConfigArgs,
    },
}

/// Creates a progress bar of `size` steps.
pub fn create_progress_bar(size: u64, message: String) -> ProgressBar {
    let style = ProgressStyle::with_template("[{eta_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

    ProgressBar::new(size).with_message(message).with_style(style)
}

/// Creates a spinner.
pub fn create_spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.enable_steady_tick(Duration::from_millis(100));

    bar
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_parse_warnings_command() {
        let args = ["panel-lluvias", "warnings", "--output-dir", "/tmp/panel"];
        let cli = Cli::try_parse_from(args).unwrap();

        match cli.command {
            Commands::Warnings { url, table, config } => {
                assert_eq!(url, WARNINGS_URL);
                assert_eq!(table, WARNINGS_TABLE);
                assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/panel")));
            }
            _ => panic!("expected the warnings command"),
        }
    }

    #[test]
    fn should_parse_zones_command() {
        let cli = Cli::try_parse_from([
            "panel-lluvias",
            "zones",
            "--inland",
            "zonas.geojson",
            "--coastal",
            "zonas_costeras.geojson",
        ])
        .unwrap();

        assert!(matches!(cli.command, Commands::Zones { inland: Some(_), coastal: Some(_), .. }));
    }

    #[test]
    fn should_parse_temperatures_command() {
        let cli = Cli::try_parse_from([
            "panel-lluvias",
            "temperatures",
            "--api-key",
            "primera,segunda",
            "--stations",
            "ids.csv",
        ])
        .unwrap();

        match cli.command {
            Commands::Temperatures {
                api_keys,
                stations,
                master,
                pause,
                ..
            } => {
                assert_eq!(api_keys, vec!["primera", "segunda"]);
                assert_eq!(stations, Some(PathBuf::from("ids.csv")));
                assert_eq!(master, None);
                assert_eq!(pause, STATION_PAUSE_SECS);
            }
            _ => panic!("expected the temperatures command"),
        }
    }

    #[test]
    fn should_count_progress() {
        let bar = create_progress_bar(3, "Downloading stations".to_string());
        bar.inc(2);
        assert_eq!(bar.position(), 2);
        assert_eq!(bar.length(), Some(3));
        bar.finish_and_clear();
    }

    #[test]
    fn should_keep_spinner_message() {
        let bar = create_spinner("Rendering warnings page...".to_string());
        assert_eq!(bar.message(), "Rendering warnings page...");
        bar.finish_and_clear();
    }
}
