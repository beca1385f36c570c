//! Run configuration shared by every subcommand.
//!
//! Flags (with environment fallbacks) are parsed into [`ConfigArgs`] and
//! turned into a [`Config`] once, so commands never look at raw flags.

use std::{path::PathBuf, time::Duration};

use anyhow::{anyhow, bail, Result};
use clap::{Args, ValueEnum};

use crate::warning::TieBreak;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_PAGE_WAIT_SECS: u64 = 30;

const OUTPUT_FOLDER: &str = "PANEL_LLUVIAS";
const REFERENCE_FILE: &str = "delimitaciones_aemet.geojson";
const CREDENTIALS_FILE: &str = "credenciales_google_sheet.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
/// How pages are fetched before parsing.
pub enum RendererKind {
    /// Headless Chrome through a WebDriver endpoint.
    #[default]
    Webdriver,
    /// Plain HTTP GET, no script execution.
    Http,
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub renderer: RendererKind,
    pub webdriver_url: String,
    /// Upper bound on waiting for the page's locator.
    pub page_wait: Duration,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        BrowserConfig {
            renderer: RendererKind::default(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_string(),
            page_wait: Duration::from_secs(DEFAULT_PAGE_WAIT_SECS),
        }
    }
}

#[derive(Debug, Clone)]
/// Where and whether to publish a command's table.
pub struct SheetsConfig {
    pub enabled: bool,
    pub spreadsheet_id: String,
    /// Explicit tab; each command has its own default.
    pub tab: Option<String>,
    pub credentials: PathBuf,
}

impl SheetsConfig {
    pub fn tab_or(&self, default: &str) -> String {
        self.tab.clone().unwrap_or_else(|| default.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub output_dir: PathBuf,
    /// Zone reference GeoJSON written by `zones` and read by `warnings`.
    pub reference: PathBuf,
    pub browser: BrowserConfig,
    pub sheets: SheetsConfig,
    pub tie_break: TieBreak,
}

impl Config {
    pub fn output_file(&self, name: &str) -> PathBuf {
        self.output_dir.join(name)
    }
}

/// Flags accepted by every subcommand.
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Directory for every output file [default: ~/PANEL_LLUVIAS]
    #[arg(long, env = "PANEL_OUTPUT_DIR", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
    /// Zone reference GeoJSON [default: <output-dir>/delimitaciones_aemet.geojson]
    #[arg(long, env = "PANEL_REFERENCE", value_name = "PATH")]
    pub reference: Option<PathBuf>,
    /// Page renderer.
    #[arg(long, value_enum, env = "PANEL_RENDERER", default_value_t = RendererKind::Webdriver)]
    pub renderer: RendererKind,
    /// WebDriver (chromedriver) endpoint.
    #[arg(long, env = "PANEL_WEBDRIVER_URL", default_value = DEFAULT_WEBDRIVER_URL)]
    pub webdriver_url: String,
    /// Seconds to wait for the page content.
    #[arg(
        long,
        env = "PANEL_PAGE_WAIT",
        default_value_t = DEFAULT_PAGE_WAIT_SECS,
        value_name = "SECS"
    )]
    pub page_wait: u64,
    /// Rule for equal-severity rows of the same zone.
    #[arg(long, value_enum, env = "PANEL_TIE_BREAK", default_value_t = TieBreak::FirstSeen)]
    pub tie_break: TieBreak,
    /// Upload the command's table to Google Sheets.
    #[arg(long, env = "PANEL_UPLOAD")]
    pub upload: bool,
    /// Target spreadsheet id.
    #[arg(long, env = "PANEL_SPREADSHEET_ID", value_name = "ID")]
    pub spreadsheet_id: Option<String>,
    /// Target tab [default: avisos_aemet or temperaturas, per command]
    #[arg(long, env = "PANEL_SHEET_TAB", value_name = "TAB")]
    pub sheet_tab: Option<String>,
    /// Service account JSON [default: <output-dir>/credenciales_google_sheet.json]
    #[arg(long, env = "GOOGLE_APPLICATION_CREDENTIALS", value_name = "PATH")]
    pub credentials: Option<PathBuf>,
}

impl TryFrom<ConfigArgs> for Config {
    type Error = anyhow::Error;

    fn try_from(args: ConfigArgs) -> Result<Self> {
        let output_dir = match args.output_dir {
            Some(dir) => dir,
            None => dirs::home_dir()
                .ok_or_else(|| anyhow!("No home directory. Provide --output-dir <dir>."))?
                .join(OUTPUT_FOLDER),
        };

        if args.page_wait == 0 {
            bail!("--page-wait must be at least 1 second");
        }

        if args.upload && args.spreadsheet_id.is_none() {
            bail!("--upload needs --spreadsheet-id <id> (or PANEL_SPREADSHEET_ID)");
        }

        let reference = args
            .reference
            .unwrap_or_else(|| output_dir.join(REFERENCE_FILE));
        let credentials = args
            .credentials
            .unwrap_or_else(|| output_dir.join(CREDENTIALS_FILE));

        Ok(Config {
            reference,
            browser: BrowserConfig {
                renderer: args.renderer,
                webdriver_url: args.webdriver_url,
                page_wait: Duration::from_secs(args.page_wait),
            },
            sheets: SheetsConfig {
                enabled: args.upload,
                spreadsheet_id: args.spreadsheet_id.unwrap_or_default(),
                tab: args.sheet_tab,
                credentials,
            },
            tie_break: args.tie_break,
            output_dir,
        })
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Harness {
        #[command(flatten)]
        config: ConfigArgs,
    }

    fn parse(args: &[&str]) -> Result<Config> {
        let args = std::iter::once("panel").chain(args.iter().copied());
        let harness = Harness::try_parse_from(args)?;
        Config::try_from(harness.config)
    }

    #[test]
    fn should_derive_paths_from_output_dir() {
        let config = parse(&["--output-dir", "/tmp/panel"]).unwrap();

        assert_eq!(config.reference, PathBuf::from("/tmp/panel/delimitaciones_aemet.geojson"));
        assert_eq!(
            config.sheets.credentials,
            PathBuf::from("/tmp/panel/credenciales_google_sheet.json")
        );
        assert_eq!(
            config.output_file("avisos.parquet"),
            PathBuf::from("/tmp/panel/avisos.parquet")
        );
    }

    #[test]
    fn should_use_defaults() {
        let config = parse(&["--output-dir", "/tmp/panel"]).unwrap();

        assert_eq!(config.browser.renderer, RendererKind::Webdriver);
        assert_eq!(config.browser.webdriver_url, DEFAULT_WEBDRIVER_URL);
        assert_eq!(config.browser.page_wait, Duration::from_secs(30));
        assert_eq!(config.tie_break, TieBreak::FirstSeen);
        assert_eq!(config.sheets.tab, None);
        assert_eq!(config.sheets.tab_or("avisos_aemet"), "avisos_aemet");
    }

    #[test]
    fn should_parse_tie_break_and_renderer() {
        let config = parse(&[
            "--output-dir",
            "/tmp/panel",
            "--tie-break",
            "latest-start",
            "--renderer",
            "http",
        ])
        .unwrap();

        assert_eq!(config.tie_break, TieBreak::LatestStart);
        assert_eq!(config.browser.renderer, RendererKind::Http);
    }

    #[test]
    fn should_require_spreadsheet_for_upload() {
        assert!(parse(&["--output-dir", "/tmp/panel", "--upload"]).is_err());

        let config =
            parse(&["--output-dir", "/tmp/panel", "--upload", "--spreadsheet-id", "abc"]).unwrap();
        assert!(config.sheets.enabled);
        assert_eq!(config.sheets.spreadsheet_id, "abc");

        let config = parse(&["--output-dir", "/tmp/panel", "--sheet-tab", "portada"]).unwrap();
        assert_eq!(config.sheets.tab_or("avisos_aemet"), "portada");
    }

    #[test]
    fn should_reject_zero_page_wait() {
        assert!(parse(&["--output-dir", "/tmp/panel", "--page-wait", "0"]).is_err());
    }
}
