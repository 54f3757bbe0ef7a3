use crate::core::{
    ExtractContext, Extractor, ExtractionResult, ExtractionStatus, Platform, PlaylistInfo, Song,
};
use crate::error::Result;
use async_trait::async_trait;
use regex::Regex;
use url::Url;

pub mod api;
pub mod types;

/// Pull the playlist id out of a QQ Music URL. The identifier runs up to the
/// first literal dot, which also strips a trailing `.html`.
pub fn parse_id(url: &str) -> Option<String> {
    let re = Regex::new(r"playlist/([^.]+)").unwrap();
    let caps = re.captures(url)?;
    Some(caps[1].to_string())
}

/// Check if URL is a QQ Music link
pub fn is_qq_url(url: &str) -> bool {
    if let Ok(parsed_url) = Url::parse(url) {
        match parsed_url.domain() {
            Some(domain) => domain == "y.qq.com" || domain.ends_with(".y.qq.com"),
            None => false,
        }
    } else {
        false
    }
}

/// QQ Music extractor implementing the Extractor trait. Endpoints are fields
/// so tests can point the chain at an unroutable host.
#[derive(Debug, Clone)]
pub struct QqExtractor {
    pub(crate) api_base: String,
    pub(crate) web_base: String,
}

impl Default for QqExtractor {
    fn default() -> Self {
        Self {
            api_base: "https://c.y.qq.com".to_string(),
            web_base: "https://y.qq.com".to_string(),
        }
    }
}

impl QqExtractor {
    pub fn with_endpoints(api_base: impl Into<String>, web_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            web_base: web_base.into(),
        }
    }
}

#[async_trait]
impl Extractor for QqExtractor {
    fn matches(&self, url: &str) -> bool {
        is_qq_url(url)
    }

    fn parse_id(&self, url: &str) -> Option<String> {
        parse_id(url)
    }

    async fn extract(&self, url: &str, ctx: &ExtractContext) -> Result<ExtractionResult> {
        api::extract_playlist(self, url, ctx).await
    }

    fn platform(&self) -> Platform {
        Platform::Qq
    }
}

/// Fixed substitute payload returned when every extraction approach failed.
pub(crate) fn mock_result(playlist_id: &str) -> ExtractionResult {
    let songs = (1..=5)
        .map(|n| Song {
            id: n,
            title: format!("QQ Song {n}"),
            artist: format!("QQ Artist {n}"),
            album: format!("QQ Album {n}"),
            duration: crate::core::mock_duration(n),
            song_id: None,
        })
        .collect::<Vec<_>>();

    ExtractionResult {
        playlist_info: PlaylistInfo {
            title: format!("QQ Music Playlist {playlist_id}"),
            creator: "QQ Music User".to_string(),
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
    fn test_parse_id_strips_html_suffix() {
        assert_eq!(
            parse_id("https://y.qq.com/n/yqq/playlist/7654321.html").as_deref(),
            Some("7654321")
        );
    }

    #[test]
    fn test_parse_id_modern_format() {
        assert_eq!(
            parse_id("https://y.qq.com/n/ryqq/playlist/7654321").as_deref(),
            Some("7654321")
        );
    }

    #[test]
    fn test_parse_id_terminates_at_first_dot() {
        assert_eq!(
            parse_id("https://y.qq.com/playlist/abc.def.html").as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_parse_id_rejects_other_urls() {
        assert!(parse_id("https://y.qq.com/n/yqq/album/1.html").is_none());
        assert!(parse_id("").is_none());
    }

    #[test]
    fn test_is_qq_url() {
        assert!(is_qq_url("https://y.qq.com/n/ryqq/playlist/1"));
        assert!(is_qq_url("https://c.y.qq.com/qzone/fcg-bin/x.fcg"));
        assert!(!is_qq_url("https://music.163.com/playlist?id=1"));
    }

    #[test]
    fn test_mock_result_shape() {
        let result = mock_result("999");
        assert!(result.playlist_info.title.contains("999"));
        assert_eq!(result.songs.len(), 5);
        assert_eq!(result.songs[0].title, "QQ Song 1");
        assert_eq!(
            result.playlist_info.extraction_status,
            Some(ExtractionStatus::MockData)
        );
    }
}
