//! Extracts the per-zone hourly level strip of the warnings summary page.

use anyhow::Result;
use scraper::Html;

use super::table::{cell_text, selector};

pub const ZONE_BLOCKS: &str = "#resumen-avisos .rs-dia-zona[data-zona-id]";
const ZONE_NAME: &str = ".rs-zona .rs-nombre-zona";
const HOUR_CELLS: &str = ".rs-horas .rs-hora[data-rs-fecha]";

pub const NO_LEVEL: &str = "sin-nivel";
const LEVEL_CLASS_PREFIX: &str = "rs-nivel-";

#[derive(Debug, Clone, PartialEq)]
/// One hour cell of one zone, as shown on the page.
pub struct LevelSlot {
    pub zone: String,
    /// Raw `data-rs-fecha` attribute.
    pub timestamp: String,
    /// First `rs-nivel-*` class, or [`NO_LEVEL`].
    pub level: String,
}

/// Returns every hour cell of every zone block. Blocks without a zone name are skipped.
pub fn extract_level_slots(html: &str) -> Result<Vec<LevelSlot>> {
    let document = Html::parse_document(html);
    let block_selector = selector(ZONE_BLOCKS)?;
    let name_selector = selector(ZONE_NAME)?;
    let hour_selector = selector(HOUR_CELLS)?;

    let mut slots = Vec::new();

    for block in document.select(&block_selector) {
        let Some(name) = block.select(&name_selector).next() else {
            continue;
        };
        let zone = cell_text(name);

        for hour in block.select(&hour_selector) {
            let timestamp = hour.value().attr("data-rs-fecha").unwrap_or_default().to_string();
            let level = hour
                .value()
                .classes()
                .find(|c| c.starts_with(LEVEL_CLASS_PREFIX))
                .unwrap_or(NO_LEVEL)
                .to_string();

            slots.push(LevelSlot {
                zone: zone.clone(),
                timestamp,
                level,
            });
        }
    }

    Ok(slots)
}

// -- Tests -------------------------------------------------------------------
