//! Data models for the streaming front-end.
//!
//! These records mirror the upstream anime API. Field names follow the
//! upstream JSON through `serde(rename)`. Every field is lenient: an absent
//! key and an explicit `null` both read as the default, so a partially
//! populated item still deserializes.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Read an explicit `null` the same way as a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// List-item record returned by the latest and recommended listings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Anime {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    /// Canonical url-id, used as the detail key
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(rename = "judul", default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cover: String,
    #[serde(rename = "lastch", default, deserialize_with = "null_as_default")]
    pub last_chapter: String,
    #[serde(rename = "lastup", default, deserialize_with = "null_as_default")]
    pub last_update: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl Anime {
    /// Whether the status field is missing or blank
    pub fn needs_status(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s.trim().is_empty())
    }

    /// Back-fill the status field.
    ///
    /// Only fills an empty status; a present value is never overwritten.
    /// Returns true when the record changed.
    pub fn fill_status(&mut self, status: &str) -> bool {
        if !self.needs_status() || status.trim().is_empty() {
            return false;
        }
        self.status = Some(status.to_string());
        true
    }
}

/// Movies share the list-item shape but come from their own endpoint
pub type Movie = Anime;

/// Full anime detail with its chapter list
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimeDetail {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub series_id: String,
    #[serde(default)]
    pub bookmark: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cover: String,
    #[serde(rename = "judul", default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub anime_type: String,
    #[serde(default)]
    pub countdown: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rating: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub published: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub author: String,
    #[serde(rename = "genre", default, deserialize_with = "null_as_default")]
    pub genres: Vec<String>,
    #[serde(rename = "genreurl", default, deserialize_with = "null_as_default")]
    pub genre_urls: Vec<String>,
    #[serde(rename = "sinopsis", default, deserialize_with = "null_as_default")]
    pub synopsis: String,
    #[serde(rename = "chapter", default, deserialize_with = "null_as_default")]
    pub chapters: Vec<Chapter>,
}

/// Single chapter (episode entry) of an anime detail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: u64,
    #[serde(rename = "ch", default, deserialize_with = "null_as_default")]
    pub label: String,
    /// Chapter url-id, the key for a video lookup
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: String,
    #[serde(rename = "lastDurasi", default)]
    pub last_duration: Option<u64>,
    #[serde(rename = "fullDurasi", default)]
    pub full_duration: Option<u64>,
}

/// Playable episode with its stream variants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    #[serde(rename = "episode_id", default, deserialize_with = "null_as_default")]
    pub id: u64,
    #[serde(rename = "likeCount", default, deserialize_with = "null_as_default")]
    pub like_count: u64,
    #[serde(rename = "dislikeCount", default, deserialize_with = "null_as_default")]
    pub dislike_count: u64,
    #[serde(rename = "userLikeStatus", default, deserialize_with = "null_as_default")]
    pub user_like_status: i64,
    #[serde(rename = "reso", default, deserialize_with = "null_as_default")]
    pub resolutions: Vec<String>,
    #[serde(rename = "stream", default, deserialize_with = "null_as_default")]
    pub streams: Vec<StreamVariant>,
}

/// One playable URL at a given resolution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamVariant {
    #[serde(rename = "reso", default, deserialize_with = "null_as_default")]
    pub resolution: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Search hit
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(rename = "judul", default, deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub cover: String,
    #[serde(rename = "lastch", default, deserialize_with = "null_as_default")]
    pub last_chapter: String,
    #[serde(rename = "genre", default, deserialize_with = "null_as_default")]
    pub genres: Vec<String>,
    #[serde(rename = "sinopsis", default, deserialize_with = "null_as_default")]
    pub synopsis: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub studio: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub score: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(rename = "rilis", default, deserialize_with = "null_as_default")]
    pub released: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_episode: u32,
}

/// Search pagination block
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pagination {
    #[serde(default, deserialize_with = "null_as_default")]
    pub page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub per_page: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_pages: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub has_next: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub next_page: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub next_offset: String,
}

/// One normalized search page
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchPage {
    pub results: Vec<SearchResult>,
    pub pagination: Option<Pagination>,
}

impl SearchPage {
    /// Whether another page is known to exist.
    ///
    /// Without pagination metadata a non-empty page is assumed to have a
    /// successor.
    pub fn has_next(&self) -> bool {
        match &self.pagination {
            Some(p) => p.has_next,
            None => !self.results.is_empty(),
        }
    }
}

/// Video resolutions accepted by the video endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resolution {
    #[serde(rename = "360p")]
    P360,
    #[serde(rename = "480p")]
    P480,
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
}

impl Resolution {
    pub const ALL: [Resolution; 4] = [
        Resolution::P360,
        Resolution::P480,
        Resolution::P720,
        Resolution::P1080,
    ];

    /// Upstream label, including the trailing `p`
    pub fn as_str(&self) -> &'static str {
        match self {
            Resolution::P360 => "360p",
            Resolution::P480 => "480p",
            Resolution::P720 => "720p",
            Resolution::P1080 => "1080p",
        }
    }

    /// The resolution worth warming after this one was requested
    pub fn alternate(&self) -> Resolution {
        match self {
            Resolution::P720 => Resolution::P480,
            _ => Resolution::P720,
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resolution {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        let label = if s.ends_with('p') { s } else { format!("{}p", s) };
        Resolution::ALL
            .into_iter()
            .find(|r| r.as_str() == label)
            .ok_or_else(|| anyhow::anyhow!("Invalid resolution: {}", label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anime_from_upstream_json() {
        let json = r#"{
            "id": 7,
            "url": "naruto-shippuden",
            "judul": "Naruto Shippuden",
            "cover": "https://img/naruto.jpg",
            "lastch": "500",
            "lastup": "2024-01-16"
        }"#;

        let anime: Anime = serde_json::from_str(json).unwrap();
        assert_eq!(anime.id, 7);
        assert_eq!(anime.title, "Naruto Shippuden");
        assert_eq!(anime.last_chapter, "500");
        assert_eq!(anime.status, None);
        assert!(anime.needs_status());
    }

    #[test]
    fn test_null_fields_read_as_default() {
        let json = r#"[
            {"id": null, "url": "a", "judul": "A", "cover": null, "lastch": null, "lastup": "2024-01-16", "status": null},
            {"id": 2, "url": "b", "judul": "B", "cover": "https://img/b.jpg"}
        ]"#;

        let items: Vec<Anime> = serde_json::from_str(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id, 0);
        assert_eq!(items[0].cover, "");
        assert_eq!(items[0].last_chapter, "");
        assert_eq!(items[0].status, None);
        assert_eq!(items[1].url, "b");

        let result: SearchResult =
            serde_json::from_str(r#"{"url": "c", "genre": null, "total_episode": null, "score": null}"#)
                .unwrap();
        assert!(result.genres.is_empty());
        assert_eq!(result.total_episode, 0);

        let episode: Episode =
            serde_json::from_str(r#"{"episode_id": 3, "likeCount": null, "stream": null}"#).unwrap();
        assert_eq!(episode.like_count, 0);
        assert!(episode.streams.is_empty());
    }

    #[test]
    fn test_fill_status_never_overwrites() {
        let mut anime = Anime {
            url: "demon-slayer".to_string(),
            status: Some("Ongoing".to_string()),
            ..Default::default()
        };
        assert!(!anime.fill_status("Completed"));
        assert_eq!(anime.status.as_deref(), Some("Ongoing"));

        let mut blank = Anime {
            url: "blank".to_string(),
            status: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank.fill_status("Completed"));
        assert_eq!(blank.status.as_deref(), Some("Completed"));
        assert!(!blank.fill_status("Ongoing"));
    }

    #[test]
    fn test_episode_from_upstream_json() {
        let json = r#"{
            "episode_id": 42,
            "likeCount": 10,
            "dislikeCount": 1,
            "userLikeStatus": 0,
            "reso": ["480p", "720p"],
            "stream": [{"reso": "720p", "url": "https://cdn/ep42-720.m3u8", "provider": "main"}]
        }"#;

        let episode: Episode = serde_json::from_str(json).unwrap();
        assert_eq!(episode.id, 42);
        assert_eq!(episode.resolutions, vec!["480p", "720p"]);
        assert_eq!(episode.streams[0].provider.as_deref(), Some("main"));
    }

    #[test]
    fn test_detail_chapters() {
        let json = r#"{
            "id": 1,
            "judul": "Demon Slayer",
            "status": "Ongoing",
            "genre": ["Action"],
            "chapter": [
                {"id": 2, "ch": "2", "url": "demon-slayer-ep-2", "date": "2024-01-15", "history": "", "lastDurasi": null, "fullDurasi": 1420}
            ]
        }"#;

        let detail: AnimeDetail = serde_json::from_str(json).unwrap();
        assert_eq!(detail.status, "Ongoing");
        assert_eq!(detail.chapters.len(), 1);
        assert_eq!(detail.chapters[0].url, "demon-slayer-ep-2");
        assert_eq!(detail.chapters[0].full_duration, Some(1420));
    }

    #[test]
    fn test_resolution_parsing() {
        assert_eq!("720p".parse::<Resolution>().unwrap(), Resolution::P720);
        assert_eq!("480".parse::<Resolution>().unwrap(), Resolution::P480);
        assert_eq!("1080P".parse::<Resolution>().unwrap(), Resolution::P1080);
        assert!("240p".parse::<Resolution>().is_err());
        assert_eq!(Resolution::default(), Resolution::P720);
    }

    #[test]
    fn test_resolution_alternate() {
        assert_eq!(Resolution::P720.alternate(), Resolution::P480);
        assert_eq!(Resolution::P480.alternate(), Resolution::P720);
        assert_eq!(Resolution::P1080.alternate(), Resolution::P720);
    }

    #[test]
    fn test_search_page_has_next() {
        let page = SearchPage {
            results: vec![],
            pagination: Some(Pagination {
                has_next: true,
                ..Default::default()
            }),
        };
        assert!(page.has_next());
        assert!(!SearchPage::default().has_next());
    }
}
