//! Stream URL resolution
//!
//! Maps an Arte program id to the playable stream variants offered by the
//! Arte player, and picks the variant that best matches the viewer's
//! language, protocol and quality preferences.
mod arte_player;
mod cached;
mod player_types;

pub use arte_player::ArtePlayerResolver;
pub use cached::CachedStreamResolver;

use crate::catalog::Language;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while resolving streams.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Request to the player API failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the player configuration
    #[error("Failed to parse player configuration: {0}")]
    ParseError(String),

    /// The program does not exist
    #[error("Program not found: {0}")]
    NotFound(String),

    /// The program cannot be streamed from the viewer's country
    #[error("Program {program_id} is not available in your country: {message}")]
    Geoblocked { program_id: String, message: String },

    /// The catch-up window has closed
    #[error("Program {program_id} expired on {until}")]
    Expired {
        program_id: String,
        until: DateTime<Utc>,
    },

    /// The catch-up window has not opened yet
    #[error("Program {program_id} will be available from {from}")]
    NotYetAvailable {
        program_id: String,
        from: DateTime<Utc>,
    },

    /// The player offers no usable stream
    #[error("No playable stream for program {0}")]
    NoStreams(String),

    /// The input is not an Arte program id or video URL
    #[error("Not an Arte program id or video URL: {0}")]
    InvalidProgramId(String),
}

/// Stream quality levels offered by the Arte player, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoQuality {
    /// `MQ`, around 384x216
    Low,
    /// `HQ`, around 640x360
    Medium,
    /// `EQ`, around 720x406
    High,
    /// `SQ`, 1280x720
    #[default]
    VeryHigh,
    /// `XQ`, 1280x720 and above
    Highest,
}

impl VideoQuality {
    /// Maps an Arte quality code (`MQ`, `HQ`, `EQ`, `SQ`, `XQ`).
    pub fn from_arte_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "MQ" => Some(VideoQuality::Low),
            "HQ" => Some(VideoQuality::Medium),
            "EQ" => Some(VideoQuality::High),
            "SQ" => Some(VideoQuality::VeryHigh),
            "XQ" => Some(VideoQuality::Highest),
            _ => None,
        }
    }

    fn level(self) -> i32 {
        self as i32
    }
}

impl FromStr for VideoQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(VideoQuality::Low),
            "medium" => Ok(VideoQuality::Medium),
            "high" => Ok(VideoQuality::High),
            "veryhigh" | "very-high" => Ok(VideoQuality::VeryHigh),
            "highest" => Ok(VideoQuality::Highest),
            other => VideoQuality::from_arte_code(other)
                .ok_or_else(|| format!("Unknown quality '{}'", other)),
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VideoQuality::Low => "low",
            VideoQuality::Medium => "medium",
            VideoQuality::High => "high",
            VideoQuality::VeryHigh => "veryhigh",
            VideoQuality::Highest => "highest",
        };
        f.write_str(name)
    }
}

/// Delivery protocol of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamProtocol {
    /// Progressive MP4 download over HTTP
    #[default]
    Http,
    /// HTTP Live Streaming playlist
    Hls,
}

impl FromStr for StreamProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "http" | "mp4" => Ok(StreamProtocol::Http),
            "hls" => Ok(StreamProtocol::Hls),
            other => Err(format!("Unknown protocol '{}'", other)),
        }
    }
}

impl fmt::Display for StreamProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamProtocol::Http => f.write_str("http"),
            StreamProtocol::Hls => f.write_str("hls"),
        }
    }
}

/// One playable rendition of a program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamVariant {
    /// Arte stream id, e.g. `HTTPS_SQ_1`
    pub id: String,
    /// Playable URL; may carry an expiring token
    pub url: String,
    pub quality: VideoQuality,
    pub protocol: StreamProtocol,
    /// Bitrate in kbit/s, 0 when unknown
    pub bitrate: u32,
    pub width: u32,
    pub height: u32,
    /// Audio/subtitle version, e.g. `VF`, `VOSTA`
    pub version_code: String,
    /// Human readable version label
    pub version_label: String,
}

/// A program with all of its stream variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedVideo {
    pub program_id: String,
    pub title: String,
    pub description: String,
    /// Variants sorted by stream id
    pub variants: Vec<StreamVariant>,
    /// End of the catch-up window, if announced
    pub available_until: Option<DateTime<Utc>>,
}

/// What the viewer would like to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamPreferences {
    pub language: Language,
    pub quality: VideoQuality,
    pub protocol: StreamProtocol,
}

/// Trait for resolvers that turn a program id into stream variants.
pub trait StreamResolver {
    /// Resolves the stream variants of a program.
    ///
    /// # Arguments
    ///
    /// * `program_id` - Arte program id
    /// * `language` - Player language, which decides the offered versions
    fn resolve(&self, program_id: &str, language: Language) -> Result<ResolvedVideo, ResolveError>;
}

/// How well an Arte version code suits a viewer of `language`.
///
/// Lower is better: 0 native audio, 1 native audio variant (subtitles for
/// the deaf, audio description), 2 original version with native subtitles,
/// 3 original version without subtitles. `None` for foreign versions.
pub fn language_rank(version_code: &str, language: Language) -> Option<u8> {
    let code = version_code.trim().to_ascii_uppercase();
    let letter = match language {
        Language::French => 'F',
        Language::German => 'A',
    };
    let dubbed = format!("V{}", letter);
    let original = format!("VO{}", letter);
    let subtitled = format!("VOST{}", letter);

    if code == dubbed || code == original {
        Some(0)
    } else if code.starts_with(&dubbed) || code.starts_with(&original) {
        Some(1)
    } else if code.starts_with(&subtitled) {
        Some(2)
    } else if code == "VO" {
        Some(3)
    } else {
        None
    }
}

/// Orders every variant from most to least preferred.
///
/// Language fit comes first, then the preferred protocol, then quality:
/// an exact match, else the closest lower quality, else the closest higher
/// one. Equal candidates are ordered by descending bitrate.
pub fn rank_streams<'a>(
    variants: &'a [StreamVariant],
    prefs: &StreamPreferences,
) -> Vec<&'a StreamVariant> {
    let wanted = prefs.quality.level();
    let mut ranked: Vec<&StreamVariant> = variants.iter().collect();

    ranked.sort_by_key(|v| {
        let language = language_rank(&v.version_code, prefs.language).unwrap_or(u8::MAX);
        let protocol_mismatch = v.protocol != prefs.protocol;
        let level = v.quality.level();
        let quality_distance = if level <= wanted {
            wanted - level
        } else {
            100 + level - wanted
        };
        (language, protocol_mismatch, quality_distance, Reverse(v.bitrate))
    });

    ranked
}

/// Picks the variant that best matches `prefs`, see [`rank_streams`].
pub fn select_stream<'a>(
    variants: &'a [StreamVariant],
    prefs: &StreamPreferences,
) -> Option<&'a StreamVariant> {
    rank_streams(variants, prefs).into_iter().next()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) fn variant(
        id: &str,
        quality: VideoQuality,
        protocol: StreamProtocol,
        version_code: &str,
        bitrate: u32,
    ) -> StreamVariant {
        StreamVariant {
            id: id.to_string(),
            url: format!("https://arte.example/{}.mp4", id),
            quality,
            protocol,
            bitrate,
            width: 1280,
            height: 720,
            version_code: version_code.to_string(),
            version_label: version_code.to_string(),
        }
    }
}
