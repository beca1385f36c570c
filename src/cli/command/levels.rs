//! Summarise the hourly warning level strip of every zone.

use anyhow::Result;
use tracing::info;

use crate::{
    cli::create_spinner,
    config::Config,
    levels::{summarise_levels, ZoneLevels},
    output::TextTable,
    parquet,
    scrape::{extract_level_slots, levels::ZONE_BLOCKS, render_page},
};

pub const LEVELS_FILE: &str = "avisos_aemet_niveles_por_ccaa.parquet";

pub async fn levels(config: &Config, url: &str) -> Result<String> {
    let bar = create_spinner("Rendering warnings summary...".to_string());
    let html = render_page(&config.browser, url, ZONE_BLOCKS).await?;
    let slots = extract_level_slots(&html)?;
    bar.finish_with_message(format!("{} hour cells scraped", slots.len()));

    let summary = summarise_levels(&slots);
    info!(zones = summary.len(), "level ranges merged");

    let file_path = config.output_file(LEVELS_FILE);
    parquet::save_table(&levels_table(&summary), &file_path)?;

    Ok(file_path.to_string_lossy().to_string())
}

pub fn levels_table(summary: &[ZoneLevels]) -> TextTable {
    TextTable {
        headers: vec!["zona".to_string(), "nivel_y_tramos".to_string()],
        rows: summary
            .iter()
            .map(|z| vec![z.zone.clone(), z.ranges.clone()])
            .collect(),
    }
}

// -- Tests -------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_lay_out_levels_table() {
        let table = levels_table(&[ZoneLevels {
            zone: "Menorca".to_string(),
            ranges: "Nivel 2 de 10:00 a 12:00".to_string(),
        }]);

        assert_eq!(table.headers, vec!["zona", "nivel_y_tramos"]);
        assert_eq!(table.rows, vec![vec!["Menorca", "Nivel 2 de 10:00 a 12:00"]]);
    }
}
