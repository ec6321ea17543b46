/// Arte listing API response types for deserialization.
///
/// These structures mirror the JSON response format of the Arte
/// `VIDEO_LISTING` endpoint. Nearly every field is optional because the API
/// omits or nulls them freely.
use serde::Deserialize;

/// The top-level listing response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ArteListing {
    /// Programs on this page, decoded one by one so a bad entry only loses itself
    #[serde(default)]
    pub data: Vec<serde_json::Value>,
    /// URL of the next page, null on the last page
    pub next_page: Option<String>,
}

/// A single program entry of a listing.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ArteProgram {
    pub program_id: Option<String>,
    pub title: Option<String>,
    pub subtitle: Option<String>,
    /// Teaser text, may contain HTML
    pub short_description: Option<String>,
    /// Video page on arte.tv
    pub url: Option<String>,
    /// Duration in seconds
    pub duration: Option<u64>,
    pub images: Option<ArteImages>,
    pub availability: Option<ArteAvailability>,
    pub geoblocking: Option<ArteGeoblocking>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ArteImages {
    pub landscape: Option<ArteImageSet>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ArteImageSet {
    #[serde(default)]
    pub resolutions: Vec<ArteResolution>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ArteResolution {
    pub url: String,
    #[serde(default)]
    pub w: u32,
}

/// Catch-up window, RFC 3339 timestamps.
#[derive(Debug, Deserialize)]
pub(super) struct ArteAvailability {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ArteGeoblocking {
    pub code: Option<String>,
}
