/// Arte listing API catalog provider.
use super::arte_types::{ArteListing, ArteProgram};
use super::{CatalogError, CatalogPage, CatalogProvider, CatalogQuery, Language, Video};
use crate::fetcher::HttpFetcher;
use crate::geo::GeoZone;
use chrono::{DateTime, Utc};

/// Catalog provider for the Arte listing API.
///
/// Fetches the most recent Arte+7 videos, optionally restricted to a
/// category, one page at a time.
pub struct ArteCatalog<F> {
    fetcher: F,
    api_base: String,
}

impl<F: HttpFetcher> ArteCatalog<F> {
    /// Creates a catalog talking to `api_base` (e.g. `https://www.arte.tv`).
    pub fn new(fetcher: F, api_base: &str) -> Self {
        Self {
            fetcher,
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    /// Builds the listing URL for a query.
    pub fn listing_url(&self, query: &CatalogQuery) -> String {
        let mut url = format!(
            "{}/api/emac/v3/{}/web/data/VIDEO_LISTING/?videoType=MOST_RECENT&page={}&limit={}",
            self.api_base,
            query.language.code(),
            query.page,
            query.limit
        );
        if let Some(category) = query.category {
            url.push_str("&category=");
            url.push_str(category.code());
        }
        url
    }

    /// Parses a listing response body into a catalog page.
    ///
    /// Entries that do not decode, or lack a program id or title, are skipped.
    pub fn parse_listing(
        json: &str,
        language: Language,
        page: u32,
    ) -> Result<CatalogPage, CatalogError> {
        let listing: ArteListing =
            serde_json::from_str(json).map_err(|e| CatalogError::ParseError(e.to_string()))?;

        let next_page = listing
            .next_page
            .filter(|next| !next.is_empty())
            .and_then(|_| page.checked_add(1));

        let videos = listing
            .data
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<ArteProgram>(item) {
                Ok(program) => Self::convert_program(program, language),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed listing entry");
                    None
                }
            })
            .collect();

        Ok(CatalogPage {
            videos,
            page,
            next_page,
        })
    }

    /// Converts an Arte program to our internal Video structure.
    fn convert_program(program: ArteProgram, language: Language) -> Option<Video> {
        let (Some(program_id), Some(title)) = (program.program_id, program.title) else {
            tracing::warn!("skipping listing entry without program id or title");
            return None;
        };

        let image_url = program
            .images
            .and_then(|images| images.landscape)
            .and_then(|set| set.resolutions.into_iter().max_by_key(|r| r.w))
            .map(|r| r.url);

        let (available_from, available_until) = match program.availability {
            Some(availability) => (
                availability.start.as_deref().and_then(parse_rfc3339),
                availability.end.as_deref().and_then(parse_rfc3339),
            ),
            None => (None, None),
        };

        let page_url = program.url.unwrap_or_else(|| {
            format!(
                "https://www.arte.tv/{}/videos/{}/",
                language.code(),
                program_id
            )
        });

        Some(Video {
            program_id,
            title: title.trim().to_string(),
            subtitle: program
                .subtitle
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            description: program
                .short_description
                .map(|s| nanohtml2text::html2text(&s).trim().to_string())
                .unwrap_or_default(),
            page_url,
            image_url,
            duration: program.duration,
            available_from,
            available_until,
            geoblocking: program
                .geoblocking
                .and_then(|g| g.code)
                .map(|code| GeoZone::from_code(&code))
                .unwrap_or_default(),
            language,
        })
    }
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(value, error = %e, "ignoring unparseable availability date");
            None
        }
    }
}

impl<F: HttpFetcher> CatalogProvider for ArteCatalog<F> {
    fn fetch_page(&self, query: &CatalogQuery) -> Result<CatalogPage, CatalogError> {
        if query.page == 0 || query.limit == 0 {
            return Err(CatalogError::InvalidData(format!(
                "page and limit must be positive (page {}, limit {})",
                query.page, query.limit
            )));
        }

        let url = self.listing_url(query);
        let body = self.fetcher.get_text(&url).map_err(|e| match e.status() {
            Some(404) => CatalogError::NotFound(url.clone()),
            _ => CatalogError::RequestError(e.to_string()),
        })?;

        let page = Self::parse_listing(&body, query.language, query.page)?;
        tracing::debug!(
            page = page.page,
            videos = page.videos.len(),
            "parsed listing page"
        );
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Category;
    use crate::fetcher::fake::FakeFetcher;
    use chrono::TimeZone;

    const LISTING: &str = r#"{
        "data": [
            {
                "programId": "074526-000-A",
                "title": " Les oiseaux migrateurs ",
                "subtitle": "Le long voyage",
                "shortDescription": "<p>Un voyage <b>fascinant</b>.</p>",
                "url": "https://www.arte.tv/fr/videos/074526-000-A/les-oiseaux-migrateurs/",
                "duration": 3120,
                "images": {
                    "landscape": {
                        "resolutions": [
                            {"url": "https://api-cdn.arte.tv/img/small.jpg", "w": 400, "h": 225},
                            {"url": "https://api-cdn.arte.tv/img/large.jpg", "w": 1920, "h": 1080},
                            {"url": "https://api-cdn.arte.tv/img/medium.jpg", "w": 940, "h": 530}
                        ]
                    }
                },
                "availability": {
                    "start": "2024-02-20T05:00:00Z",
                    "end": "2024-04-20T04:59:00Z"
                },
                "geoblocking": {"code": "DE_FR"}
            },
            {
                "programId": null,
                "title": "Trailer without id"
            },
            {
                "programId": "103442-001-A",
                "title": "Karambolage",
                "subtitle": "",
                "shortDescription": null,
                "images": null,
                "availability": {"start": "not a date", "end": null},
                "geoblocking": null
            }
        ],
        "nextPage": "https://www.arte.tv/api/emac/v3/fr/web/data/VIDEO_LISTING/?page=2"
    }"#;

    #[test]
    fn test_listing_url() {
        let catalog = ArteCatalog::new(FakeFetcher::new(), "https://www.arte.tv/");
        let query = CatalogQuery::new(Language::German, 50)
            .with_page(3)
            .with_category(Some(Category::Documentaries));
        assert_eq!(
            catalog.listing_url(&query),
            "https://www.arte.tv/api/emac/v3/de/web/data/VIDEO_LISTING/?videoType=MOST_RECENT&page=3&limit=50&category=DOR"
        );
    }

    #[test]
    fn test_parse_listing() {
        let page = ArteCatalog::<FakeFetcher>::parse_listing(LISTING, Language::French, 1).unwrap();

        assert_eq!(page.page, 1);
        assert_eq!(page.next_page, Some(2));
        assert_eq!(page.videos.len(), 2);

        let first = &page.videos[0];
        assert_eq!(first.program_id, "074526-000-A");
        assert_eq!(first.title, "Les oiseaux migrateurs");
        assert_eq!(first.subtitle.as_deref(), Some("Le long voyage"));
        assert!(first.description.contains("fascinant"));
        assert!(!first.description.contains('<'));
        assert_eq!(
            first.image_url.as_deref(),
            Some("https://api-cdn.arte.tv/img/large.jpg")
        );
        assert_eq!(first.duration, Some(3120));
        assert_eq!(
            first.available_until,
            Some(Utc.with_ymd_and_hms(2024, 4, 20, 4, 59, 0).unwrap())
        );
        assert_eq!(first.geoblocking, GeoZone::DeFr);

        let second = &page.videos[1];
        assert_eq!(second.subtitle, None);
        assert_eq!(second.description, "");
        assert_eq!(second.image_url, None);
        assert_eq!(second.available_from, None);
        assert_eq!(second.geoblocking, GeoZone::All);
        assert_eq!(
            second.page_url,
            "https://www.arte.tv/fr/videos/103442-001-A/"
        );
    }

    #[test]
    fn test_parse_last_page() {
        let page = ArteCatalog::<FakeFetcher>::parse_listing(
            r#"{"data": [], "nextPage": null}"#,
            Language::German,
            4,
        )
        .unwrap();
        assert!(page.videos.is_empty());
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn test_parse_listing_skips_malformed_entries() {
        let json = r#"{
            "data": [
                {"programId": "074526-000-A", "title": "Good", "duration": 3120},
                {"programId": "074526-001-A", "title": "No image url",
                 "images": {"landscape": {"resolutions": [{"w": 400}]}}},
                {"programId": "074526-002-A", "title": "Fractional", "duration": 3120.5},
                "not even an object"
            ],
            "nextPage": null
        }"#;

        let page = ArteCatalog::<FakeFetcher>::parse_listing(json, Language::French, 1).unwrap();
        assert_eq!(page.videos.len(), 1);
        assert_eq!(page.videos[0].program_id, "074526-000-A");
    }

    #[test]
    fn test_parse_listing_last_representable_page() {
        let page = ArteCatalog::<FakeFetcher>::parse_listing(
            r#"{"data": [], "nextPage": "https://www.arte.tv/next"}"#,
            Language::French,
            u32::MAX,
        )
        .unwrap();
        assert_eq!(page.page, u32::MAX);
        assert_eq!(page.next_page, None);
    }

    #[test]
    fn test_parse_malformed_json() {
        let result = ArteCatalog::<FakeFetcher>::parse_listing("<html>", Language::French, 1);
        assert!(matches!(result, Err(CatalogError::ParseError(_))));
    }

    #[test]
    fn test_fetch_page_uses_fetcher() {
        let query = CatalogQuery::new(Language::French, 2);
        let url = ArteCatalog::new(FakeFetcher::new(), "https://www.arte.tv").listing_url(&query);
        let catalog = ArteCatalog::new(
            FakeFetcher::new().with_text(&url, LISTING),
            "https://www.arte.tv",
        );

        let page = catalog.fetch_page(&query).unwrap();
        assert_eq!(page.videos.len(), 2);
    }

    #[test]
    fn test_fetch_page_not_found_and_invalid_query() {
        let catalog = ArteCatalog::new(FakeFetcher::new(), "https://www.arte.tv");

        let result = catalog.fetch_page(&CatalogQuery::new(Language::French, 10));
        assert!(matches!(result, Err(CatalogError::NotFound(_))));

        let result = catalog.fetch_page(&CatalogQuery::new(Language::French, 10).with_page(0));
        assert!(matches!(result, Err(CatalogError::InvalidData(_))));
    }
}
