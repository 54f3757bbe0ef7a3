use crate::core::{
    ExtractContext, Extractor, ExtractionResult, ExtractionStatus, Platform, PlaylistInfo, Song,
};
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use url::Url;

pub mod api;
pub mod types;

pub use api::TrackIdEntry;

/// Accepted playlist URL shapes, tried in order:
/// `playlist?id=123`, `playlist/123/share`, `m/playlist?id=123`.
const ID_PATTERNS: &[&str] = &[
    r"playlist\?id=(\d+)",
    r"playlist/(\d+)",
    r"m/playlist\?id=(\d+)",
];

/// Pull the numeric playlist id out of a Netease Music URL.
pub fn parse_id(url: &str) -> Option<String> {
    for pattern in ID_PATTERNS {
        let re = Regex::new(pattern).unwrap();
        if let Some(caps) = re.captures(url) {
            return Some(caps[1].to_string());
        }
    }
    None
}

/// Check if URL is a Netease Music link
pub fn is_netease_url(url: &str) -> bool {
    if let Ok(parsed_url) = Url::parse(url) {
        match parsed_url.domain() {
            Some(domain) => domain == "music.163.com" || domain.ends_with(".music.163.com"),
            None => false,
        }
    } else {
        false
    }
}

/// Netease extractor implementing the Extractor trait. Endpoints are fields
/// so tests can point the chain at an unroutable host.
#[derive(Debug, Clone)]
pub struct NeteaseExtractor {
    pub(crate) api_base: String,
    pub(crate) web_base: String,
}

impl Default for NeteaseExtractor {
    fn default() -> Self {
        Self {
            api_base: "https://music.163.com".to_string(),
            web_base: "https://music.163.com".to_string(),
        }
    }
}

impl NeteaseExtractor {
    pub fn with_endpoints(api_base: impl Into<String>, web_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            web_base: web_base.into(),
        }
    }
}

#[async_trait]
impl Extractor for NeteaseExtractor {
    fn matches(&self, url: &str) -> bool {
        is_netease_url(url)
    }

    fn parse_id(&self, url: &str) -> Option<String> {
        parse_id(url)
    }

    async fn extract(&self, url: &str, ctx: &ExtractContext) -> Result<ExtractionResult> {
        api::extract_playlist(self, url, ctx).await
    }

    fn platform(&self) -> Platform {
        Platform::Netease
    }
}

/// Fixed substitute payload returned when every extraction approach failed.
pub(crate) fn mock_result(playlist_id: &str) -> ExtractionResult {
    let songs = (1..=5)
        .map(|n| Song {
            id: n,
            title: format!("Netease Song {n}"),
            artist: format!("Netease Artist {n}"),
            album: format!("Netease Album {n}"),
            duration: crate::core::mock_duration(n),
            song_id: None,
        })
        .collect::<Vec<_>>();

    ExtractionResult {
        playlist_info: PlaylistInfo {
            title: format!("Netease Music Playlist {playlist_id}"),
            creator: "Netease User".to_string(),
            song_count: songs.len() as u32,
            extraction_status: Some(ExtractionStatus::MockData),
            note: Some("This is mock data. The actual playlist extraction failed.".to_string()),
        },
        songs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_all_formats_agree() {
        let urls = [
            "https://music.163.com/#/playlist?id=123456",
            "https://music.163.com/playlist?id=123456",
            "https://music.163.com/playlist/123456/share",
            "https://music.163.com/#/m/playlist?id=123456",
        ];
        for url in urls {
            assert_eq!(parse_id(url).as_deref(), Some("123456"), "url: {url}");
        }
    }

    #[test]
    fn test_parse_id_rejects_non_playlist_urls() {
        assert!(parse_id("https://music.163.com/song?id=123").is_none());
        assert!(parse_id("https://music.163.com/playlist?id=abc").is_none());
        assert!(parse_id("not a url at all").is_none());
        assert!(parse_id("").is_none());
    }

    #[test]
    fn test_is_netease_url() {
        assert!(is_netease_url("https://music.163.com/playlist?id=1"));
        assert!(is_netease_url("https://y.music.163.com/m/playlist?id=1"));
        assert!(!is_netease_url("https://y.qq.com/n/ryqq/playlist/1"));
        assert!(!is_netease_url("music.163.com/playlist?id=1"));
    }

    #[test]
    fn test_mock_result_shape() {
        let result = mock_result("123456");
        assert!(result.playlist_info.title.contains("123456"));
        assert_eq!(result.playlist_info.song_count, 5);
        assert_eq!(
            result.playlist_info.extraction_status,
            Some(ExtractionStatus::MockData)
        );
        assert_eq!(result.songs.len(), 5);
        assert_eq!(result.songs[0].title, "Netease Song 1");
        assert_eq!(result.songs[4].title, "Netease Song 5");
        let ids: Vec<u32> = result.songs.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }
}
