//! Fetches the rendered HTML of a page, either through a WebDriver session
//! (headless Chrome) or with a plain HTTP request.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use fantoccini::{Client, ClientBuilder, Locator};
use scraper::Html;
use serde_json::json;
use tracing::{debug, warn};

use crate::config::{BrowserConfig, RendererKind};

use super::table::selector;

const CHROME_ARGS: [&str; 3] = ["--headless=new", "--lang=es-ES", "--user-agent=Mozilla/5.0"];

/// Returns the page source once an element matching `wait_for` is present.
pub async fn render_page(browser: &BrowserConfig, url: &str, wait_for: &str) -> Result<String> {
    debug!(url, wait_for, renderer = ?browser.renderer, "rendering page");

    match browser.renderer {
        RendererKind::Webdriver => render_with_webdriver(browser, url, wait_for).await,
        RendererKind::Http => render_with_http(browser, url, wait_for).await,
    }
}

async fn render_with_webdriver(
    browser: &BrowserConfig,
    url: &str,
    wait_for: &str,
) -> Result<String> {
    let mut builder = ClientBuilder::native();
    builder.capabilities(chrome_capabilities());

    let client = builder.connect(&browser.webdriver_url).await.with_context(|| {
        format!(
            "Could not open a WebDriver session at {}",
            browser.webdriver_url
        )
    })?;

    // The session is closed whatever happened while loading.
    let page = load_rendered(&client, url, wait_for, browser.page_wait).await;

    if let Err(e) = client.close().await {
        warn!("Failed to close WebDriver session: {}", e);
    }

    page
}

async fn load_rendered(
    client: &Client,
    url: &str,
    wait_for: &str,
    wait: Duration,
) -> Result<String> {
    client
        .goto(url)
        .await
        .with_context(|| format!("Failed to load {}", url))?;

    client
        .wait()
        .at_most(wait)
        .for_element(Locator::Css(wait_for))
        .await
        .with_context(|| {
            format!(
                "`{}` did not appear on {} within {}s",
                wait_for,
                url,
                wait.as_secs()
            )
        })?;

    Ok(client.source().await?)
}

async fn render_with_http(browser: &BrowserConfig, url: &str, wait_for: &str) -> Result<String> {
    let client = reqwest::Client::builder()
        .user_agent("Mozilla/5.0")
        .timeout(browser.page_wait)
        .build()?;

    let response = client
        .get(url)
        .header(reqwest::header::ACCEPT_LANGUAGE, "es-ES,es;q=0.9")
        .send()
        .await
        .with_context(|| format!("Failed to load {}", url))?
        .error_for_status()?;
    let body = response.text().await?;

    if !contains(&body, wait_for)? {
        bail!("`{}` is not present on {}", wait_for, url);
    }

    Ok(body)
}

fn chrome_capabilities() -> serde_json::Map<String, serde_json::Value> {
    let mut caps = serde_json::Map::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({ "args": CHROME_ARGS }),
    );

    caps
}

fn contains(html: &str, css: &str) -> Result<bool> {
    let selector = selector(css)?;
    let document = Html::parse_document(html);
    let found = document.select(&selector).next().is_some();

    Ok(found)
}

// -- Tests -------------------------------------------------------------------
