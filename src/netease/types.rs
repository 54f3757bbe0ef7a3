use serde::Deserialize;
use serde_json::Value;

/// `/api/v6/playlist/detail` envelope.
#[derive(Debug, Deserialize)]
pub struct PlaylistDetailResponse {
    pub playlist: Option<PlaylistDetail>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistDetail {
    pub name: Option<String>,
    pub creator: Option<Creator>,
    #[serde(rename = "trackIds")]
    pub track_ids: Option<Vec<TrackIdRef>>,
    pub tracks: Option<Vec<TrackV6>>,
}

#[derive(Debug, Deserialize)]
pub struct Creator {
    pub nickname: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TrackIdRef {
    pub id: i64,
}

/// Track shape in the v6 response: artists under `ar`, album under `al`,
/// duration in millis under `dt`.
#[derive(Debug, Deserialize)]
pub struct TrackV6 {
    pub id: i64,
    pub name: Option<String>,
    pub ar: Option<Vec<ArtistRef>>,
    pub al: Option<AlbumRef>,
    pub dt: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ArtistRef {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumRef {
    pub name: Option<String>,
}

/// Legacy `/api/playlist/detail` envelope.
#[derive(Debug, Deserialize)]
pub struct LegacyDetailResponse {
    pub result: Option<LegacyResult>,
}

#[derive(Debug, Deserialize)]
pub struct LegacyResult {
    pub name: Option<String>,
    pub creator: Option<Creator>,
    #[serde(rename = "trackIds")]
    pub track_ids: Option<Vec<TrackIdRef>>,
    pub tracks: Option<Vec<TrackLegacy>>,
}

/// Legacy track shape, also returned by the song-detail APIs.
#[derive(Debug, Deserialize)]
pub struct TrackLegacy {
    pub id: i64,
    pub name: Option<String>,
    pub artists: Option<Vec<ArtistRef>>,
    pub album: Option<AlbumRef>,
    pub duration: Option<u64>,
}

/// `/api/song/detail` envelope (single and batch form).
#[derive(Debug, Deserialize)]
pub struct SongDetailResponse {
    pub songs: Option<Vec<TrackLegacy>>,
}

/// Entry of a JSON blob embedded in an inline script. Ids arrive as numbers
/// or strings depending on which global variable held the blob.
#[derive(Debug, Deserialize)]
pub struct EmbeddedTrack {
    pub id: Option<Value>,
    pub name: Option<String>,
    /// `__INITIAL_DATA__` sometimes nests the real track one level down.
    pub track: Option<Box<EmbeddedTrack>>,
}

impl EmbeddedTrack {
    pub fn id_string(&self) -> Option<String> {
        let id = self
            .id
            .as_ref()
            .or_else(|| self.track.as_ref().and_then(|t| t.id.as_ref()))?;
        match id {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn title(&self) -> Option<String> {
        self.name
            .clone()
            .or_else(|| self.track.as_ref().and_then(|t| t.name.clone()))
    }
}

/// Object-shaped script blobs carry their track array under one of these keys.
#[derive(Debug, Deserialize)]
pub struct EmbeddedContainer {
    pub tracks: Option<Vec<EmbeddedTrack>>,
    pub songlist: Option<Vec<EmbeddedTrack>>,
}

/// `window.__INITIAL_DATA__` on the main playlist page.
#[derive(Debug, Deserialize)]
pub struct InitialData {
    pub playlist: Option<InitialPlaylist>,
}

#[derive(Debug, Deserialize)]
pub struct InitialPlaylist {
    pub tracks: Option<Vec<EmbeddedTrack>>,
    #[serde(rename = "trackIds")]
    pub track_ids: Option<Vec<EmbeddedTrack>>,
}
