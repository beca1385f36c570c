//! Download the latest AEMET CAP bundle and keep today's Spanish alerts.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use reqwest::Url;
use tempfile::TempDir;
use tracing::{info, warn};

use crate::{
    cap::{madrid_date, parse_alerts, select_current, CapAlert},
    cli::create_spinner,
    config::Config,
    download::{aemet_client, download_with_progress, fetch_datos_url, read_bundle, RetryPolicy},
    output::features::{feature, write_feature_collection},
};

pub const CAP_URL: &str = "https://opendata.aemet.es/opendata/api/avisos_cap/ultimoelaborado/area/esp";
pub const CAP_FILE: &str = "avisos_esp.geojson";

const ENVELOPE_TIMEOUT: Duration = Duration::from_secs(30);
const PAYLOAD_TIMEOUT: Duration = Duration::from_secs(120);

pub async fn cap(config: &Config, api_key: &str) -> Result<String> {
    let client = aemet_client()?;
    let policy = RetryPolicy::default();
    let url = Url::parse_with_params(CAP_URL, &[("api_key", api_key)])?;

    let bar = create_spinner("Requesting CAP bundle...".to_string());
    let datos = fetch_datos_url(&client, url.as_str(), ENVELOPE_TIMEOUT, &policy).await?;

    let tmp_dir = TempDir::new()?;
    let bundle_path = tmp_dir.path().join("avisos_cap");
    bar.set_message("Downloading CAP bundle...");
    let bytes = policy
        .run("CAP bundle download", || {
            download_with_progress(&client, &datos, PAYLOAD_TIMEOUT, &bundle_path, &bar)
        })
        .await?;
    bar.finish_with_message(format!("CAP bundle downloaded ({} bytes)", bytes));

    let alerts = parse_bundle(&read_bundle(&bundle_path)?);
    let today = madrid_date(Utc::now());
    let current = select_current(alerts, today);
    info!(alerts = current.len(), %today, "current Spanish CAP alerts");

    let file_path = config.output_file(CAP_FILE);
    let features = current
        .iter()
        .map(|a| feature(a.properties(), &a.geometry))
        .collect();
    write_feature_collection(&file_path, features)?;

    Ok(file_path.to_string_lossy().to_string())
}

/// Parses every document of a bundle. Unreadable documents are skipped.
fn parse_bundle(documents: &[(String, Vec<u8>)]) -> Vec<CapAlert> {
    let mut alerts = Vec::new();
    for (name, xml) in documents {
        match parse_alerts(xml) {
            Ok(parsed) => alerts.extend(parsed),
            Err(e) => warn!(document = %name, "skipping CAP document: {:#}", e),
        }
    }

    alerts
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_skip_broken_documents() {
        let documents = vec![
            ("roto.xml".to_string(), b"<alert><info></alert>".to_vec()),
            (
                "bueno.xml".to_string(),
                br#"<alert><identifier>a</identifier><sent>2026-10-16T08:00:00+02:00</sent>
                    <info><language>es-ES</language><event>Lluvias</event>
                    <area><polygon>39.1,-0.3 39.1,-0.1 38.9,-0.1 38.9,-0.3</polygon></area>
                    </info></alert>"#
                    .to_vec(),
            ),
        ];

        let alerts = parse_bundle(&documents);

        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].identifier, "a");
    }

    #[test]
    fn should_put_api_key_in_query() {
        let url = Url::parse_with_params(CAP_URL, &[("api_key", "abc")]).unwrap();
        assert_eq!(url.query(), Some("api_key=abc"));
    }
}
