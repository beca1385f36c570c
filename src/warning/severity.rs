//! Warning risk levels as shown on the AEMET warnings table.

use serde::Serialize;

use crate::format::normalize_name;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
/// Ordered risk level: `None < Riesgo < RiesgoImportante`.
///
/// Serializes as its table label, like [`Severity::label`].
pub enum Severity {
    #[default]
    #[serde(rename = "")]
    None,
    #[serde(rename = "Riesgo")]
    Riesgo,
    #[serde(rename = "Riesgo importante")]
    RiesgoImportante,
}

impl Severity {
    /// Maps a table label to a level. Unknown labels are [`Severity::None`].
    pub fn from_label(label: &str) -> Self {
        match normalize_name(label).as_str() {
            "riesgo importante" => Severity::RiesgoImportante,
            "riesgo" => Severity::Riesgo,
            _ => Severity::None,
        }
    }

    pub fn priority(self) -> u8 {
        match self {
            Severity::RiesgoImportante => 2,
            Severity::Riesgo => 1,
            Severity::None => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::RiesgoImportante => "Riesgo importante",
            Severity::Riesgo => "Riesgo",
            Severity::None => "",
        }
    }
}

// -- Tests -------------------------------------------------------------------
