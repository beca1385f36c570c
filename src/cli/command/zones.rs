//! Build the zone reference used to geocode warnings.

use std::path::PathBuf;

use anyhow::{bail, Result};
use tracing::info;

use crate::{
    cli::create_spinner,
    config::Config,
    zones::{build_reference, builder::COASTAL_ORIGIN},
};

const INLAND_FILE: &str = "zonas.geojson";
const COASTAL_FILE: &str = "zonas_costeras.geojson";

pub async fn zones(
    config: &Config,
    inland: Option<PathBuf>,
    coastal: Option<PathBuf>,
) -> Result<String> {
    let inland = inland.unwrap_or_else(|| config.output_file(INLAND_FILE));
    let coastal = coastal.unwrap_or_else(|| config.output_file(COASTAL_FILE));

    for path in [&inland, &coastal] {
        if !path.exists() {
            bail!("Zone file {} does not exist", path.display());
        }
    }

    let bar = create_spinner("Building zone reference...".to_string());
    let (zone_set, report) = build_reference(&inland, &coastal)?;
    zone_set.save(&config.reference)?;
    bar.finish_with_message(format!("{} zones in reference", zone_set.len()));

    let coastal = zone_set.iter().filter(|z| z.origin == COASTAL_ORIGIN).count();
    info!(
        zones = zone_set.len(),
        coastal,
        missing_geometry = report.missing_geometry,
        unrepairable = report.unrepairable,
        "zone reference built"
    );

    Ok(config.reference.to_string_lossy().to_string())
}
