/// Arte player configuration response types for deserialization.
///
/// These structures mirror the JSON returned by the player `config`
/// endpoint. Field names are the player's terse upper-case keys.
use serde::Deserialize;
use std::collections::HashMap;

/// The top-level player configuration.
#[derive(Debug, Deserialize)]
pub(super) struct PlayerConfig {
    #[serde(rename = "videoJsonPlayer")]
    pub video: Option<VideoJsonPlayer>,
}

#[derive(Debug, Deserialize)]
pub(super) struct VideoJsonPlayer {
    /// Title
    #[serde(rename = "VTI")]
    pub title: Option<String>,
    /// Description
    #[serde(rename = "V7T")]
    pub description: Option<String>,
    /// Start of rights, `dd/mm/YYYY HH:MM:SS +zzzz`
    #[serde(rename = "VRA")]
    pub rights_start: Option<String>,
    /// End of rights, same format
    #[serde(rename = "VRU")]
    pub rights_end: Option<String>,
    /// Stream renditions keyed by stream id, null when nothing is playable
    #[serde(rename = "VSR", default)]
    pub streams: Option<HashMap<String, PlayerStream>>,
    /// Message shown instead of the video (geoblocking, rights)
    #[serde(rename = "customMsg")]
    pub custom_msg: Option<CustomMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PlayerStream {
    pub id: Option<String>,
    /// `MQ`, `HQ`, `EQ`, `SQ` or `XQ`
    pub quality: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// `mp4` or `hls`
    pub media_type: Option<String>,
    pub bitrate: Option<u32>,
    pub url: Option<String>,
    pub version_code: Option<String>,
    pub version_libelle: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct CustomMessage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub msg: Option<String>,
}
