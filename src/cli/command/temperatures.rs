//! Download the latest daily maxima of the map stations and rebuild the
//! temperature map table.

use std::{future::Future, path::PathBuf, time::Duration};

use anyhow::{anyhow, bail, Result};
use chrono::{Days, NaiveDate, Utc};
use reqwest::Url;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, error, info, warn};

use crate::{
    cap::madrid_date,
    cli::{command::upload_to_sheets, create_progress_bar, create_spinner},
    config::Config,
    download::{aemet_client, fetch_datos_text, is_rate_limited, RetryPolicy},
    parquet,
    temperature::{
        merge_with_master, parse_daily, read_csv_table, read_station_ids, transform_master,
        DailyReading,
    },
};

pub const DAILY_VALUES_URL: &str =
    "https://opendata.aemet.es/opendata/api/valores/climatologicos/diarios/datos";
pub const STATIONS_FILE: &str = "complementarios_temperaturas/ids_estaciones_reducido.csv";
pub const MASTER_FILE: &str = "complementarios_temperaturas/datos_mapa.csv";
pub const MASTER_TABLE_FILE: &str = "df_maestro.parquet";
pub const MAP_FILE: &str = "MAPA_TEMPERATURAS.parquet";
pub const SHEET_TAB: &str = "temperaturas";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const RATE_LIMIT_PAUSE: Duration = Duration::from_secs(65);
const MAX_DAYS_BACK: u64 = 5;
const DATE_STATIONS: usize = 3;
const DATE_DEADLINE: Duration = Duration::from_secs(40);

/// Where the command reads its inputs from. Missing paths default to
/// [`STATIONS_FILE`] and [`MASTER_FILE`] under the output directory.
#[derive(Debug, Clone, Default)]
pub struct TemperatureInputs {
    pub stations: Option<PathBuf>,
    pub master: Option<PathBuf>,
    /// Pause between two stations.
    pub pause: Duration,
}

pub async fn temperatures(
    config: &Config,
    api_keys: &[String],
    inputs: TemperatureInputs,
) -> Result<String> {
    let keys: Vec<String> = api_keys
        .iter()
        .map(|key| key.trim().to_string())
        .filter(|key| !key.is_empty())
        .collect();
    if keys.is_empty() {
        bail!("No AEMET API key. Provide --api-key <key> (or AEMET_API_KEY).");
    }

    let stations_path = inputs.stations.unwrap_or_else(|| config.output_file(STATIONS_FILE));
    let master_path = inputs.master.unwrap_or_else(|| config.output_file(MASTER_FILE));
    let stations = read_station_ids(&stations_path)?;
    if stations.is_empty() {
        bail!("No station ids in {}", stations_path.display());
    }
    let master = read_csv_table(&master_path)?;
    info!(stations = stations.len(), master_rows = master.rows.len(), "temperature inputs");

    let client = aemet_client()?;
    let policy = RetryPolicy {
        attempts: 2,
        ..RetryPolicy::default()
    };
    let client = &client;
    let policy = &policy;

    let bar = create_spinner("Looking for the latest daily values...".to_string());
    let first_key = keys[0].as_str();
    let today = madrid_date(Utc::now());
    let date = latest_available_date(today, &stations, DATE_DEADLINE, move |date, station| {
        async move {
            let url = match daily_values_url(&station, date, first_key) {
                Ok(url) => url,
                Err(_) => return false,
            };
            match fetch_datos_text(client, url.as_str(), REQUEST_TIMEOUT, policy).await {
                Ok(text) => parse_daily(&text, &station).is_ok_and(|r| !r.is_empty()),
                Err(e) => {
                    debug!(%station, %date, "no daily values: {:#}", e);
                    false
                }
            }
        }
    })
    .await;
    bar.finish_with_message(format!("Daily values of {}", date));

    let bar = create_progress_bar(stations.len() as u64, "Downloading stations".to_string());
    let mut readings: Vec<DailyReading> = Vec::new();
    let mut failed = 0;
    for (n, station) in stations.iter().enumerate() {
        if n > 0 {
            sleep(inputs.pause).await;
        }
        bar.set_message(station.clone());

        let fetched = try_keys(&keys, move |key| async move {
            let url = daily_values_url(station, date, &key)?;
            let text = fetch_daily_text(client, url.as_str(), policy).await?;
            parse_daily(&text, station)
        })
        .await;

        match fetched {
            Ok(station_readings) => readings.extend(station_readings),
            Err(e) => {
                failed += 1;
                warn!(%station, "skipping station: {:#}", e);
            }
        }
        bar.inc(1);
    }
    bar.finish_with_message(format!("{} readings, {} stations failed", readings.len(), failed));

    let merged = merge_with_master(master, &readings)?;
    parquet::save_table(&merged, &config.output_file(MASTER_TABLE_FILE))?;

    let map = transform_master(merged);
    let map_path = config.output_file(MAP_FILE);
    parquet::save_table(&map, &map_path)?;
    info!(rows = map.rows.len(), %date, "temperature map table");

    if config.sheets.enabled {
        let bar = create_spinner("Uploading to Google Sheets...".to_string());
        match upload_to_sheets(config, SHEET_TAB, &map).await {
            Ok(tab) => bar.finish_with_message(format!("Uploaded to tab `{}`", tab)),
            Err(e) => {
                bar.finish_and_clear();
                error!("Google Sheets upload failed: {:#}", e);
            }
        }
    }

    Ok(map_path.to_string_lossy().to_string())
}

/// Daily climatological values of one station on one day.
pub fn daily_values_url(station: &str, date: NaiveDate, api_key: &str) -> Result<Url> {
    let day = date.format("%Y-%m-%d");
    let url = format!(
        "{}/fechaini/{}T00:00:00UTC/fechafin/{}T23:59:00UTC/estacion/{}",
        DAILY_VALUES_URL, day, day, station
    );

    Ok(Url::parse_with_params(&url, &[("api_key", api_key)])?)
}

/// Most recent day, 1 to 5 days before `today`, for which one of the first
/// three stations has data. Gives up on the oldest day once `deadline` passes.
pub async fn latest_available_date<F, Fut>(
    today: NaiveDate,
    stations: &[String],
    deadline: Duration,
    mut has_data: F,
) -> NaiveDate
where
    F: FnMut(NaiveDate, String) -> Fut,
    Fut: Future<Output = bool>,
{
    let oldest = today - Days::new(MAX_DAYS_BACK);
    let started = Instant::now();

    for back in 1..=MAX_DAYS_BACK {
        let date = today - Days::new(back);
        for station in stations.iter().take(DATE_STATIONS) {
            let Some(left) = deadline.checked_sub(started.elapsed()) else {
                warn!(%oldest, "no daily values found in time");
                return oldest;
            };
            match timeout(left, has_data(date, station.clone())).await {
                Ok(true) => return date,
                Ok(false) => {}
                Err(_) => {
                    warn!(%oldest, "no daily values found in time");
                    return oldest;
                }
            }
        }
    }

    warn!(%oldest, "no station has recent daily values");
    oldest
}

/// Runs `fetch` with each key in turn until one succeeds.
pub async fn try_keys<T, F, Fut>(keys: &[String], mut fetch: F) -> Result<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut failures = Vec::new();
    for (n, key) in keys.iter().enumerate() {
        match fetch(key.clone()).await {
            Ok(value) => return Ok(value),
            Err(e) => {
                debug!(key = n + 1, "request failed: {:#}", e);
                failures.push(format!("key {}: {:#}", n + 1, e));
            }
        }
    }

    if failures.is_empty() {
        bail!("No API key to try");
    }
    Err(anyhow!("Every API key failed ({})", failures.join("; ")))
}

/// Like [`fetch_datos_text`], waiting out one rate limit before a last try.
async fn fetch_daily_text(
    client: &reqwest::Client,
    url: &str,
    policy: &RetryPolicy,
) -> Result<String> {
    match fetch_datos_text(client, url, REQUEST_TIMEOUT, policy).await {
        Err(e) if is_rate_limited(&e) => {
            warn!(pause = ?RATE_LIMIT_PAUSE, "AEMET rate limit reached");
            sleep(RATE_LIMIT_PAUSE).await;
            fetch_datos_text(client, url, REQUEST_TIMEOUT, policy).await
        }
        fetched => fetched,
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use super::*;

    fn ids(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|id| id.to_string()).collect()
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn should_build_daily_values_url() {
        let url = daily_values_url("3195", date(2026, 10, 15), "abc").unwrap();

        assert_eq!(
            url.path(),
            "/opendata/api/valores/climatologicos/diarios/datos\
             /fechaini/2026-10-15T00:00:00UTC/fechafin/2026-10-15T23:59:00UTC/estacion/3195"
        );
        assert_eq!(url.query(), Some("api_key=abc"));
    }

    #[tokio::test]
    async fn should_pick_most_recent_day_with_data() {
        let stations = ids(&["3195", "3129", "C447A", "9434"]);
        let asked = RefCell::new(Vec::new());

        let found = latest_available_date(
            date(2026, 10, 16),
            &stations,
            Duration::from_secs(5),
            |day, station| {
                asked.borrow_mut().push((day, station.clone()));
                async move { day == date(2026, 10, 14) && station == "C447A" }
            },
        )
        .await;

        assert_eq!(found, date(2026, 10, 14));
        assert_eq!(asked.borrow().len(), 6);
        assert!(asked.borrow().iter().all(|(_, station)| station != "9434"));
    }

    #[tokio::test]
    async fn should_fall_back_to_oldest_day() {
        let stations = ids(&["3195", "3129", "C447A", "9434"]);
        let mut calls = 0;

        let found = latest_available_date(
            date(2026, 10, 16),
            &stations,
            Duration::from_secs(5),
            |_, _| {
                calls += 1;
                async { false }
            },
        )
        .await;

        assert_eq!(found, date(2026, 10, 11));
        assert_eq!(calls, 15);
    }

    #[tokio::test]
    async fn should_give_up_after_deadline() {
        let stations = ids(&["3195"]);

        let found = latest_available_date(
            date(2026, 10, 16),
            &stations,
            Duration::from_millis(20),
            |_, _| async {
                sleep(Duration::from_secs(1)).await;
                true
            },
        )
        .await;

        assert_eq!(found, date(2026, 10, 11));
    }

    #[tokio::test]
    async fn should_try_next_key_after_failure() {
        let keys = ids(&["caducada", "buena"]);

        let used = try_keys(&keys, |key| async move {
            match key.as_str() {
                "buena" => Ok(key),
                _ => Err(anyhow!("401 Unauthorized")),
            }
        })
        .await
        .unwrap();

        assert_eq!(used, "buena");
    }

    #[tokio::test]
    async fn should_report_every_failed_key() {
        let keys = ids(&["a", "b"]);

        let error = try_keys(&keys, |key| async move {
            Err::<(), _>(anyhow!("rejected {}", key))
        })
        .await
        .unwrap_err();

        let message = format!("{:#}", error);
        assert!(message.contains("key 1: rejected a"));
        assert!(message.contains("key 2: rejected b"));
    }

    #[tokio::test]
    async fn should_fail_without_keys() {
        let error = try_keys(&[], |_| async { Ok(()) }).await.unwrap_err();

        assert!(error.to_string().contains("No API key"));
    }
}
