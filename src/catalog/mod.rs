/// Data structures and traits for browsing the Arte+7 catalog.
///
/// This module provides structures to represent catalog listings and the
/// videos they contain (titles, descriptions, availability windows, geo
/// restrictions), as well as traits for implementing catalog providers.
mod arte;
mod arte_types;
mod cached;

pub use arte::ArteCatalog;
pub use cached::CachedCatalogProvider;

use crate::geo::GeoZone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur while browsing the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Request to the catalog API failed
    #[error("Request failed: {0}")]
    RequestError(String),

    /// Failed to parse the catalog's JSON response
    #[error("Failed to parse catalog response: {0}")]
    ParseError(String),

    /// The requested listing does not exist
    #[error("Listing not found: {0}")]
    NotFound(String),

    /// The query or the API response is not usable
    #[error("Invalid catalog data: {0}")]
    InvalidData(String),
}

/// Catalog language. Arte+7 publishes a French and a German catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
}

impl Language {
    /// The two-letter code used in Arte URLs.
    pub fn code(self) -> &'static str {
        match self {
            Language::French => "fr",
            Language::German => "de",
        }
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fr" | "french" | "francais" | "français" => Ok(Language::French),
            "de" | "german" | "deutsch" => Ok(Language::German),
            other => Err(format!("Unsupported language '{}' (expected fr or de)", other)),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Arte catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Documentaries,
    Cinema,
    Series,
    CurrentAffairs,
    CultureAndPop,
    ArtsAndShows,
    Sciences,
    Discovery,
    History,
    Magazines,
}

impl Category {
    /// Every category, in menu order.
    pub const ALL: [Category; 10] = [
        Category::Documentaries,
        Category::Cinema,
        Category::Series,
        Category::CurrentAffairs,
        Category::CultureAndPop,
        Category::ArtsAndShows,
        Category::Sciences,
        Category::Discovery,
        Category::History,
        Category::Magazines,
    ];

    /// The Arte category code.
    pub fn code(self) -> &'static str {
        match self {
            Category::Documentaries => "DOR",
            Category::Cinema => "CIN",
            Category::Series => "SER",
            Category::CurrentAffairs => "ACT",
            Category::CultureAndPop => "CPO",
            Category::ArtsAndShows => "ARS",
            Category::Sciences => "SCI",
            Category::Discovery => "DEC",
            Category::History => "HIS",
            Category::Magazines => "EMI",
        }
    }

    /// English name of the category.
    pub fn name(self) -> &'static str {
        match self {
            Category::Documentaries => "Documentaries",
            Category::Cinema => "Cinema",
            Category::Series => "Series",
            Category::CurrentAffairs => "Current affairs",
            Category::CultureAndPop => "Culture and pop",
            Category::ArtsAndShows => "Arts and shows",
            Category::Sciences => "Sciences",
            Category::Discovery => "Discovery",
            Category::History => "History",
            Category::Magazines => "Magazines",
        }
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| {
                c.code().eq_ignore_ascii_case(wanted) || c.name().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| format!("Unknown category '{}'", wanted))
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single video of the Arte+7 catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Video {
    /// Arte program id, e.g. `074526-000-A`
    pub program_id: String,
    /// The video title
    pub title: String,
    /// Episode or subject subtitle
    pub subtitle: Option<String>,
    /// Plain-text description
    pub description: String,
    /// Web page of the video on arte.tv
    pub page_url: String,
    /// Preview image
    pub image_url: Option<String>,
    /// Duration in seconds
    pub duration: Option<u64>,
    /// Start of the catch-up window
    pub available_from: Option<DateTime<Utc>>,
    /// End of the catch-up window
    pub available_until: Option<DateTime<Utc>>,
    /// Where the video may be streamed
    pub geoblocking: GeoZone,
    /// Catalog the video was listed in
    pub language: Language,
}

impl Video {
    /// Whether the catch-up window is open at `now`.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        let started = self.available_from.is_none_or(|from| from <= now);
        let not_ended = self.available_until.is_none_or(|until| until > now);
        started && not_ended
    }

    /// Title and subtitle joined for display.
    pub fn display_title(&self) -> String {
        match &self.subtitle {
            Some(subtitle) if !subtitle.is_empty() => format!("{} - {}", self.title, subtitle),
            _ => self.title.clone(),
        }
    }
}

/// Which listing page to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    /// Catalog language
    pub language: Language,
    /// Restrict the listing to a category
    pub category: Option<Category>,
    /// 1-based page number
    pub page: u32,
    /// Videos per page
    pub limit: u32,
}

impl CatalogQuery {
    /// First page of the most recent videos in `language`.
    pub fn new(language: Language, limit: u32) -> Self {
        Self {
            language,
            category: None,
            page: 1,
            limit,
        }
    }

    pub fn with_category(mut self, category: Option<Category>) -> Self {
        self.category = category;
        self
    }

    pub fn with_page(mut self, page: u32) -> Self {
        self.page = page;
        self
    }
}

/// One page of a catalog listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogPage {
    /// Videos on this page, in catalog order
    pub videos: Vec<Video>,
    /// The page number
    pub page: u32,
    /// The next page number, if the listing continues
    pub next_page: Option<u32>,
}

/// Trait for catalog providers that can list videos.
///
/// Implementors fetch one listing page at a time; pagination is driven by
/// [`collect_all`].
pub trait CatalogProvider {
    /// Fetches a single listing page.
    ///
    /// # Arguments
    ///
    /// * `query` - Language, category, page number and page size
    ///
    /// # Returns
    ///
    /// A Result containing the CatalogPage, or a CatalogError
    fn fetch_page(&self, query: &CatalogQuery) -> Result<CatalogPage, CatalogError>;
}

/// Follows the listing pagination and gathers every available video.
///
/// Starts at `query.page` and stops when the listing ends or after
/// `max_pages` pages. Videos are de-duplicated by program id (the first
/// occurrence wins) and videos outside their catch-up window at `now` are
/// dropped. `on_page` is called after every fetched page.
pub fn collect_all<P, F>(
    provider: &P,
    query: &CatalogQuery,
    max_pages: u32,
    now: DateTime<Utc>,
    mut on_page: F,
) -> Result<Vec<Video>, CatalogError>
where
    P: CatalogProvider + ?Sized,
    F: FnMut(&CatalogPage),
{
    let mut seen = HashSet::new();
    let mut videos = Vec::new();
    let mut page_query = query.clone();

    for _ in 0..max_pages {
        let page = provider.fetch_page(&page_query)?;
        on_page(&page);

        let next = page.next_page;
        for video in page.videos {
            if !video.is_available(now) {
                tracing::debug!(program_id = %video.program_id, "skipping unavailable video");
                continue;
            }
            if seen.insert(video.program_id.clone()) {
                videos.push(video);
            }
        }

        match next {
            // Guard against listings pointing back at themselves
            Some(next) if next > page_query.page => page_query.page = next,
            _ => break,
        }
    }

    Ok(videos)
}

/// Extracts an Arte program id from a video page URL or a bare id.
///
/// Accepts `https://www.arte.tv/fr/videos/074526-000-A/some-title/` as well
/// as `074526-000-A`.
pub fn program_id_from_url(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if is_program_id(trimmed) {
        return Some(trimmed.to_string());
    }

    let without_query = trimmed.split(['?', '#']).next().unwrap_or(trimmed);
    without_query
        .split('/')
        .find(|segment| is_program_id(segment))
        .map(str::to_string)
}

/// Checks for the `NNNNNN-NNN-X` program id shape.
fn is_program_id(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() == 12
        && bytes[..6].iter().all(u8::is_ascii_digit)
        && bytes[6] == b'-'
        && bytes[7..10].iter().all(u8::is_ascii_digit)
        && bytes[10] == b'-'
        && bytes[11].is_ascii_uppercase()
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub(crate) fn video(program_id: &str) -> Video {
        Video {
            program_id: program_id.to_string(),
            title: format!("Video {}", program_id),
            subtitle: None,
            description: String::new(),
            page_url: format!("https://www.arte.tv/fr/videos/{}/", program_id),
            image_url: None,
            duration: None,
            available_from: None,
            available_until: None,
            geoblocking: GeoZone::All,
            language: Language::French,
        }
    }
}
