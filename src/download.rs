//! Network fetches with bounded retry, and CAP bundle extraction.

use std::{
    fmt,
    fs::File,
    future::Future,
    io::{Cursor, Read, Write},
    path::Path,
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Error, Result};
use flate2::read::GzDecoder;
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::{header, StatusCode};
use serde::Deserialize;
use tar::Archive;
use tracing::{debug, warn};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const GZIP_MAGIC: &[u8] = b"\x1F\x8B";
const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const TAR_MAGIC: &[u8] = b"ustar";
const TAR_MAGIC_OFFSET: usize = 257;
const PROGRESS_TEMPLATE: &str =
    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%) {eta}";

#[derive(Debug, Clone, Copy)]
/// Fixed attempt count with capped exponential backoff, no jitter.
pub struct RetryPolicy {
    pub attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            attempts: 5,
            base_delay: Duration::from_millis(1500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Delay after the `attempt`-th failure (0-based): `base · 2^attempt`, capped.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.max_delay)
    }

    /// Runs `op` until it succeeds or the attempts are used up.
    pub async fn run<T, F, Fut>(&self, what: &str, op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.run_if(what, op, |_| true).await
    }

    /// Like [`RetryPolicy::run`], but errors for which `transient` is false fail at once.
    pub async fn run_if<T, F, Fut, P>(&self, what: &str, mut op: F, transient: P) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&Error) -> bool,
    {
        let mut attempt = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt + 1 < self.attempts && transient(&e) => {
                    let delay = self.delay(attempt);
                    warn!(attempt = attempt + 1, ?delay, "{} failed: {:#}", what, e);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    let attempts = attempt + 1;
                    return Err(e.context(format!("{} failed after {} attempt(s)", what, attempts)));
                }
            }
        }
    }
}

/// True for network and HTTP status errors.
pub fn is_transient(error: &Error) -> bool {
    error.chain().any(|cause| cause.downcast_ref::<reqwest::Error>().is_some())
}

/// True when the server asked us to slow down, by HTTP status or by the
/// `estado` of an AEMET envelope.
pub fn is_rate_limited(error: &Error) -> bool {
    error.chain().any(|cause| {
        let http = cause
            .downcast_ref::<reqwest::Error>()
            .and_then(reqwest::Error::status)
            .is_some_and(|status| status == StatusCode::TOO_MANY_REQUESTS);
        let envelope = cause
            .downcast_ref::<AemetStatus>()
            .is_some_and(|status| status.estado == Some(429));

        http || envelope
    })
}

#[derive(Debug, Deserialize)]
struct Envelope {
    datos: Option<String>,
    descripcion: Option<String>,
    estado: Option<u16>,
}

#[derive(Debug, Clone, PartialEq)]
/// An AEMET envelope that carried no `datos` URL.
pub struct AemetStatus {
    pub estado: Option<u16>,
    pub descripcion: String,
}

impl fmt::Display for AemetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.estado {
            Some(estado) => write!(
                f,
                "AEMET response has no `datos` (estado {}): {}",
                estado, self.descripcion
            ),
            None => write!(f, "AEMET response has no `datos`: {}", self.descripcion),
        }
    }
}

impl std::error::Error for AemetStatus {}

/// Reads the `datos` URL from an AEMET open-data response.
pub fn parse_envelope(body: &[u8]) -> Result<String> {
    let body = body.strip_prefix(UTF8_BOM).unwrap_or(body);
    let envelope: Envelope =
        serde_json::from_slice(body).context("AEMET response is not a JSON envelope")?;

    match envelope.datos {
        Some(datos) if !datos.trim().is_empty() => Ok(datos),
        _ => Err(AemetStatus {
            estado: envelope.estado,
            descripcion: envelope.descripcion.unwrap_or_else(|| "no description".to_string()),
        }
        .into()),
    }
}

/// HTTP client with the headers the AEMET open-data API expects.
pub fn aemet_client() -> Result<reqwest::Client> {
    let mut headers = header::HeaderMap::new();
    headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        header::HeaderValue::from_static("es-ES,es;q=0.9"),
    );

    Ok(reqwest::Client::builder()
        .user_agent("aemet-client/1.0")
        .default_headers(headers)
        .build()?)
}

/// Fetches an AEMET envelope and returns the URL of its payload.
pub async fn fetch_datos_url(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<String> {
    let body = policy
        .run("AEMET envelope request", || async move {
            let response = client.get(url).timeout(timeout).send().await?.error_for_status()?;
            Ok(response.bytes().await?)
        })
        .await?;

    parse_envelope(&body)
}

/// Follows an AEMET envelope to its payload and returns the payload as text.
pub async fn fetch_datos_text(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<String> {
    let datos = fetch_datos_url(client, url, timeout, policy).await?;
    let datos = datos.as_str();

    policy
        .run_if(
            "AEMET payload request",
            || async move {
                let response = client.get(datos).timeout(timeout).send().await?.error_for_status()?;
                Ok(response.text().await?)
            },
            is_transient,
        )
        .await
}

/// Streams `url` into `file_path`, showing byte progress when the size is known.
pub async fn download_with_progress(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
    file_path: &Path,
    progress_bar: &ProgressBar,
) -> Result<u64> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| Error::msg(format!("Failed to download file: {}", e)))?;

    if !response.status().is_success() {
        return Err(Error::msg(format!("Failed to download file: {}", response.status())));
    }

    let total_size = response.content_length().unwrap_or(0);
    if total_size > 0 {
        progress_bar.set_length(total_size);
        progress_bar.set_style(
            ProgressStyle::with_template(PROGRESS_TEMPLATE)?.progress_chars("=> "),
        );
    }

    let mut file = File::create(file_path)?;
    let mut downloaded = 0u64;
    let mut stream = response.bytes_stream();

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| Error::msg(format!("Error reading chunk: {}", e)))?;
        file.write_all(&chunk)?;
        downloaded += chunk.len() as u64;
        progress_bar.set_position(downloaded);
    }
    file.flush()?;

    Ok(downloaded)
}

/// Returns every XML document in a CAP bundle as `(member name, bytes)`.
///
/// The bundle may be a tar archive (gzip-compressed or not), a zip archive
/// or a single XML document.
pub fn read_bundle(path: &Path) -> Result<Vec<(String, Vec<u8>)>> {
    let mut payload = Vec::new();
    File::open(path)
        .with_context(|| format!("Could not open {}", path.display()))?
        .read_to_end(&mut payload)?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    xml_documents(name, payload)
}

fn xml_documents(name: String, payload: Vec<u8>) -> Result<Vec<(String, Vec<u8>)>> {
    if payload.starts_with(GZIP_MAGIC) {
        let mut decoded = Vec::new();
        GzDecoder::new(payload.as_slice())
            .read_to_end(&mut decoded)
            .context("Corrupt gzip payload")?;
        return xml_documents(name.trim_end_matches(".gz").to_string(), decoded);
    }

    if payload.starts_with(ZIP_MAGIC) {
        return zip_members(payload);
    }

    if is_tar(&payload) {
        return tar_members(payload);
    }

    if looks_like_xml(&payload) {
        return Ok(vec![(name, payload)]);
    }

    Err(anyhow!("Unrecognised CAP payload ({} bytes)", payload.len()))
}

fn is_tar(payload: &[u8]) -> bool {
    payload
        .get(TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + TAR_MAGIC.len())
        .is_some_and(|magic| magic == TAR_MAGIC)
}

fn looks_like_xml(payload: &[u8]) -> bool {
    let payload = payload.strip_prefix(UTF8_BOM).unwrap_or(payload);
    payload
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|&b| b == b'<')
}

fn is_xml_name(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".xml")
}

fn tar_members(payload: Vec<u8>) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = Archive::new(Cursor::new(payload));
    let mut documents = Vec::new();

    for entry in archive.entries()? {
        let mut entry = entry?;
        let name = entry.path()?.to_string_lossy().to_string();
        if !entry.header().entry_type().is_file() || !is_xml_name(&name) {
            debug!(member = %name, "skipping tar member");
            continue;
        }

        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        documents.push((name, bytes));
    }

    Ok(documents)
}

fn zip_members(payload: Vec<u8>) -> Result<Vec<(String, Vec<u8>)>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(payload))?;
    let mut documents = Vec::new();

    for i in 0..archive.len() {
        let mut member = archive.by_index(i)?;
        let name = member.name().to_string();
        if !member.is_file() || !is_xml_name(&name) {
            debug!(member = %name, "skipping zip member");
            continue;
        }

        let mut bytes = Vec::new();
        member.read_to_end(&mut bytes)?;
        documents.push((name, bytes));
    }

    Ok(documents)
}

// -- Tests -------------------------------------------------------------------
