//! Geoblocking zones used by the Arte catalog.

use serde::{Deserialize, Serialize};
use std::fmt;

/// EU/EEA member states plus Switzerland.
const EUROPE: &[&str] = &[
    "AT", "BE", "BG", "CH", "CY", "CZ", "DE", "DK", "EE", "ES", "FI", "FR", "GR", "HR", "HU",
    "IE", "IS", "IT", "LI", "LT", "LU", "LV", "MT", "NL", "NO", "PL", "PT", "RO", "SE", "SI",
    "SK",
];

/// Countries covered by Arte's satellite broadcast rights.
const SATELLITE: &[&str] = &["AT", "BE", "CH", "DE", "FR", "LU"];

/// Area in which a video may be streamed.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum GeoZone {
    /// Worldwide
    #[default]
    All,
    /// Germany and France only
    DeFr,
    /// Europe, including Germany and France
    EurDeFr,
    /// Satellite footprint
    Sat,
    /// A zone code this crate does not know about
    Unknown(String),
}

impl GeoZone {
    /// Parses an Arte zone code such as `DE_FR`.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "" | "ALL" => GeoZone::All,
            "DE_FR" => GeoZone::DeFr,
            "EUR_DE_FR" => GeoZone::EurDeFr,
            "SAT" => GeoZone::Sat,
            other => GeoZone::Unknown(other.to_string()),
        }
    }

    /// The Arte zone code.
    pub fn code(&self) -> &str {
        match self {
            GeoZone::All => "ALL",
            GeoZone::DeFr => "DE_FR",
            GeoZone::EurDeFr => "EUR_DE_FR",
            GeoZone::Sat => "SAT",
            GeoZone::Unknown(code) => code,
        }
    }

    /// Whether a viewer in `country` (ISO 3166 alpha-2) may stream the video.
    ///
    /// Unknown zones are allowed; the player config has the final word.
    pub fn allows(&self, country: &str) -> bool {
        let country = country.trim().to_ascii_uppercase();
        match self {
            GeoZone::All | GeoZone::Unknown(_) => true,
            GeoZone::DeFr => country == "DE" || country == "FR",
            GeoZone::EurDeFr => EUROPE.contains(&country.as_str()),
            GeoZone::Sat => SATELLITE.contains(&country.as_str()),
        }
    }
}

impl From<String> for GeoZone {
    fn from(code: String) -> Self {
        GeoZone::from_code(&code)
    }
}

impl From<GeoZone> for String {
    fn from(zone: GeoZone) -> Self {
        zone.code().to_string()
    }
}

impl fmt::Display for GeoZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
