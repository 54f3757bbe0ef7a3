use serde::Deserialize;

/// Embedded playlist payload, sectioned schema:
/// `data.sections[].items[].attributes`.
#[derive(Debug, Deserialize)]
pub struct SectionsPayload {
    pub data: Option<SectionsData>,
}

#[derive(Debug, Deserialize)]
pub struct SectionsData {
    pub sections: Option<Vec<Section>>,
}

#[derive(Debug, Deserialize)]
pub struct Section {
    pub items: Option<Vec<SectionItem>>,
}

#[derive(Debug, Deserialize)]
pub struct SectionItem {
    pub attributes: Option<TrackAttributes>,
}

/// Embedded playlist payload, flat schema: `tracks[]`.
#[derive(Debug, Deserialize)]
pub struct TracksPayload {
    pub tracks: Option<Vec<TrackAttributes>>,
}

#[derive(Debug, Deserialize)]
pub struct TrackAttributes {
    pub name: Option<String>,
    #[serde(rename = "artistName")]
    pub artist_name: Option<String>,
    #[serde(rename = "albumName")]
    pub album_name: Option<String>,
    #[serde(rename = "durationInMillis")]
    pub duration_in_millis: Option<u64>,
}
