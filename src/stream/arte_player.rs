/// Arte player API stream resolver.
use super::player_types::{PlayerConfig, PlayerStream};
use super::{ResolveError, ResolvedVideo, StreamProtocol, StreamResolver, StreamVariant, VideoQuality};
use crate::catalog::Language;
use crate::fetcher::HttpFetcher;
use chrono::{DateTime, Utc};

/// Timestamp format of the player's rights window.
const RIGHTS_FORMAT: &str = "%d/%m/%Y %H:%M:%S %z";

/// Stream resolver for the Arte player configuration API.
pub struct ArtePlayerResolver<F> {
    fetcher: F,
    player_base: String,
}

impl<F: HttpFetcher> ArtePlayerResolver<F> {
    /// Creates a resolver talking to `player_base` (e.g. `https://api.arte.tv`).
    pub fn new(fetcher: F, player_base: &str) -> Self {
        Self {
            fetcher,
            player_base: player_base.trim_end_matches('/').to_string(),
        }
    }

    /// Builds the player configuration URL of a program.
    pub fn config_url(&self, program_id: &str, language: Language) -> String {
        format!(
            "{}/api/player/v1/config/{}/{}?platform=ARTE_NEXT",
            self.player_base,
            language.code(),
            program_id
        )
    }

    /// Parses a player configuration, checking the rights window at `now`.
    pub fn parse_player_config(
        json: &str,
        program_id: &str,
        now: DateTime<Utc>,
    ) -> Result<ResolvedVideo, ResolveError> {
        let config: PlayerConfig =
            serde_json::from_str(json).map_err(|e| ResolveError::ParseError(e.to_string()))?;
        let player = config
            .video
            .ok_or_else(|| ResolveError::ParseError("missing videoJsonPlayer".to_string()))?;

        let available_until = player.rights_end.as_deref().and_then(parse_rights_time);
        if let Some(until) = available_until {
            if until <= now {
                return Err(ResolveError::Expired {
                    program_id: program_id.to_string(),
                    until,
                });
            }
        }
        if let Some(from) = player.rights_start.as_deref().and_then(parse_rights_time) {
            if from > now {
                return Err(ResolveError::NotYetAvailable {
                    program_id: program_id.to_string(),
                    from,
                });
            }
        }

        let mut variants: Vec<StreamVariant> = player
            .streams
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, stream)| Self::convert_stream(key, stream))
            .collect();
        variants.sort_by(|a, b| a.id.cmp(&b.id));

        if variants.is_empty() {
            let message = player
                .custom_msg
                .filter(|m| m.kind.as_deref() == Some("error"))
                .and_then(|m| m.msg)
                .filter(|msg| !msg.trim().is_empty());
            return Err(match message {
                Some(message) => ResolveError::Geoblocked {
                    program_id: program_id.to_string(),
                    message: message.trim().to_string(),
                },
                None => ResolveError::NoStreams(program_id.to_string()),
            });
        }

        Ok(ResolvedVideo {
            program_id: program_id.to_string(),
            title: player
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| program_id.to_string()),
            description: player
                .description
                .map(|d| nanohtml2text::html2text(&d).trim().to_string())
                .unwrap_or_default(),
            variants,
            available_until,
        })
    }

    /// Converts a player stream entry, dropping entries that cannot be played.
    fn convert_stream(key: String, stream: PlayerStream) -> Option<StreamVariant> {
        let url = stream.url.filter(|u| !u.is_empty())?;

        let protocol = match stream.media_type.as_deref() {
            Some("mp4") => StreamProtocol::Http,
            Some("hls") => StreamProtocol::Hls,
            other => {
                tracing::debug!(stream = %key, media_type = ?other, "skipping unsupported stream");
                return None;
            }
        };

        let Some(quality) = stream.quality.as_deref().and_then(VideoQuality::from_arte_code)
        else {
            tracing::debug!(stream = %key, "skipping stream with unknown quality");
            return None;
        };

        let version_code = stream.version_code.unwrap_or_default();
        Some(StreamVariant {
            id: stream.id.unwrap_or(key),
            url,
            quality,
            protocol,
            bitrate: stream.bitrate.unwrap_or(0),
            width: stream.width.unwrap_or(0),
            height: stream.height.unwrap_or(0),
            version_label: stream
                .version_libelle
                .unwrap_or_else(|| version_code.clone()),
            version_code,
        })
    }
}

fn parse_rights_time(value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_str(value.trim(), RIGHTS_FORMAT) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(value, error = %e, "ignoring unparseable rights date");
            None
        }
    }
}

impl<F: HttpFetcher> StreamResolver for ArtePlayerResolver<F> {
    fn resolve(&self, program_id: &str, language: Language) -> Result<ResolvedVideo, ResolveError> {
        let url = self.config_url(program_id, language);
        let body = self.fetcher.get_text(&url).map_err(|e| match e.status() {
            Some(404) => ResolveError::NotFound(program_id.to_string()),
            _ => ResolveError::RequestError(e.to_string()),
        })?;

        let resolved = Self::parse_player_config(&body, program_id, Utc::now())?;
        tracing::debug!(
            program_id,
            variants = resolved.variants.len(),
            "resolved player configuration"
        );
        Ok(resolved)
    }
}
