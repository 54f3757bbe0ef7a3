use crate::error::Result;
use crate::progress::ProgressReporter;
use serde::{Deserialize, Serialize};
pub use strum::IntoEnumIterator;
use strum_macros::{EnumIter, EnumString};

#[cfg(feature = "apple")]
use crate::apple::AppleExtractor;
#[cfg(feature = "netease")]
use crate::netease::NeteaseExtractor;
#[cfg(feature = "qq")]
use crate::qq::QqExtractor;

/// Supported platforms
#[derive(
    EnumIter, EnumString, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Copy,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Platform {
    #[cfg(feature = "netease")]
    Netease,
    #[cfg(feature = "qq")]
    Qq,
    #[cfg(feature = "apple")]
    Apple,
}

impl Platform {
    pub fn extractor(&self) -> Box<dyn Extractor> {
        match self {
            #[cfg(feature = "netease")]
            Platform::Netease => Box::new(NeteaseExtractor::default()),
            #[cfg(feature = "qq")]
            Platform::Qq => Box::new(QqExtractor::default()),
            #[cfg(feature = "apple")]
            Platform::Apple => Box::new(AppleExtractor::default()),
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            #[cfg(feature = "netease")]
            Platform::Netease => "Netease Music",
            #[cfg(feature = "qq")]
            Platform::Qq => "QQ Music",
            #[cfg(feature = "apple")]
            Platform::Apple => "Apple Music",
        }
    }
}

/// How the playlist data was obtained. Absent on a clean extraction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionStatus {
    MockData,
    PreviewData,
    AuthenticatedData,
}

/// Playlist header data, produced once per extraction call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistInfo {
    pub title: String,
    pub creator: String,
    pub song_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_status: Option<ExtractionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A single track. `id` is the 1-based position in the final list; it is
/// reassigned after the sort that follows concurrent detail fetches.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: u32,
    pub title: String,
    pub artist: String,
    pub album: String,
    pub duration: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_id: Option<i64>,
}

/// Full extraction result as returned to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionResult {
    pub playlist_info: PlaylistInfo,
    pub songs: Vec<Song>,
}

/// Per-request context handed to an extractor: where to report progress and
/// an optional platform user token.
#[derive(Clone, Default)]
pub struct ExtractContext {
    pub progress: ProgressReporter,
    pub user_token: Option<String>,
}

/// Durations of the five fixed mock songs every platform substitutes when
/// extraction fails entirely.
pub(crate) fn mock_duration(n: u32) -> String {
    match n {
        1 => "3:45",
        2 => "4:12",
        3 => "3:21",
        4 => "2:55",
        _ => "5:07",
    }
    .to_string()
}

/// Trait for extracting playlist metadata from different platforms
#[async_trait::async_trait]
pub trait Extractor: Send + Sync {
    /// Check if the URL belongs to this extractor's platform
    fn matches(&self, url: &str) -> bool;

    /// Pull the platform-native playlist identifier out of a URL
    fn parse_id(&self, url: &str) -> Option<String>;

    /// Extract playlist metadata. Upstream failures degrade to mock data;
    /// only an unparseable URL is an error.
    async fn extract(&self, url: &str, ctx: &ExtractContext) -> Result<ExtractionResult>;

    /// Get platform identifier
    fn platform(&self) -> Platform;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_tags_round_trip() {
        for platform in Platform::iter() {
            let tag = serde_json::to_string(&platform).unwrap();
            let parsed: Platform = serde_json::from_str(&tag).unwrap();
            assert_eq!(parsed, platform);
        }
    }

    #[test]
    fn test_platform_from_wire_tag() {
        assert_eq!("netease".parse::<Platform>().unwrap(), Platform::Netease);
        assert_eq!("qq".parse::<Platform>().unwrap(), Platform::Qq);
        assert_eq!("apple".parse::<Platform>().unwrap(), Platform::Apple);
        assert!("spotify".parse::<Platform>().is_err());
    }

    #[test]
    fn test_song_serialization_skips_absent_song_id() {
        let song = Song {
            id: 1,
            title: "T".into(),
            artist: "A".into(),
            album: "B".into(),
            duration: "3:45".into(),
            song_id: None,
        };
        let json = serde_json::to_string(&song).unwrap();
        assert!(!json.contains("songId"));

        let with_id = Song {
            song_id: Some(42),
            ..song
        };
        let json = serde_json::to_string(&with_id).unwrap();
        assert!(json.contains("\"songId\":42"));
    }

    #[test]
    fn test_playlist_info_camel_case() {
        let info = PlaylistInfo {
            title: "T".into(),
            creator: "C".into(),
            song_count: 3,
            extraction_status: Some(ExtractionStatus::MockData),
            note: None,
        };
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"songCount\":3"));
        assert!(json.contains("\"extractionStatus\":\"mock_data\""));
        assert!(!json.contains("note"));
    }
}
