use serde::Deserialize;
use serde_json::Value;

/// `fcg_ucc_getcdinfo_byids_cp.fcg` envelope.
#[derive(Debug, Deserialize)]
pub struct CdInfoResponse {
    pub cdlist: Option<Vec<CdList>>,
}

/// `fcg_v8_playlist_cp.fcg` wraps the same payload one level deeper.
#[derive(Debug, Deserialize)]
pub struct AltApiResponse {
    pub data: Option<CdInfoResponse>,
}

#[derive(Debug, Deserialize)]
pub struct CdList {
    pub dissname: Option<String>,
    pub nickname: Option<String>,
    pub songnum: Option<u32>,
    pub songlist: Option<Vec<QqSong>>,
}

/// Track shape shared by both APIs; `interval` is in seconds.
#[derive(Debug, Deserialize)]
pub struct QqSong {
    pub songname: Option<String>,
    pub singer: Option<Vec<Singer>>,
    pub albumname: Option<String>,
    pub interval: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct Singer {
    pub name: Option<String>,
}

/// `window.__INITIAL_DATA__` on the playlist page. The song list hides in
/// one of three nested locations depending on the page build.
#[derive(Debug, Deserialize)]
pub struct QqInitialData {
    pub detail: Option<DetailSection>,
    pub playlist: Option<PlaylistSection>,
    pub cdlist: Option<Vec<EmbeddedCd>>,
}

#[derive(Debug, Deserialize)]
pub struct DetailSection {
    pub title: Option<String>,
    pub creator: Option<CreatorName>,
    #[serde(rename = "songList")]
    pub song_list: Option<Vec<EmbeddedSong>>,
}

#[derive(Debug, Deserialize)]
pub struct CreatorName {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PlaylistSection {
    pub title: Option<String>,
    /// Arrives as a plain string or an object depending on the page build.
    pub creator: Option<Value>,
    #[serde(rename = "songList")]
    pub song_list: Option<Vec<EmbeddedSong>>,
}

impl PlaylistSection {
    pub fn creator_name(&self) -> Option<String> {
        match self.creator.as_ref()? {
            Value::String(s) => Some(s.clone()),
            Value::Object(map) => map.get("name")?.as_str().map(str::to_string),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct EmbeddedCd {
    pub dissname: Option<String>,
    pub nickname: Option<String>,
    pub songlist: Option<Vec<EmbeddedSong>>,
}

/// Song entry in an embedded blob; field names vary across page builds, so
/// every known alias is carried and resolved in order.
#[derive(Debug, Deserialize)]
pub struct EmbeddedSong {
    pub title: Option<String>,
    pub name: Option<String>,
    pub songname: Option<String>,
    pub singer: Option<Vec<Singer>>,
    pub artist: Option<String>,
    #[serde(rename = "singerName")]
    pub singer_name: Option<String>,
    pub album: Option<AlbumField>,
    pub albumname: Option<String>,
    /// Seconds, like the API `interval`.
    pub interval: Option<u64>,
    pub duration: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct AlbumField {
    pub name: Option<String>,
}
