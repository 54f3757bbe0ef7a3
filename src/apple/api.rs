use regex::Regex;
use reqwest::header::{ACCEPT, COOKIE, HeaderMap, HeaderValue};

use crate::apple::types::{SectionsPayload, TrackAttributes, TracksPayload};
use crate::apple::{mock_result, parse_id};
use crate::core::{ExtractContext, ExtractionResult, ExtractionStatus, PlaylistInfo, Song};
use crate::download::download_text_with_headers;
use crate::error::{Result, TrackliftError};
use crate::progress::ProgressUpdate;
use crate::scrape::{self, Selector};
use crate::utils::format_duration;

const TITLE_SELECTORS: &[Selector] = &[
    Selector::MetaProperty("og:title"),
    Selector::Class("product-header__title"),
    Selector::Class("headings__title"),
];

const CREATOR_SELECTORS: &[Selector] = &[
    Selector::Class("product-creator"),
    Selector::Class("product-header__identity"),
    Selector::Class("headings__subtitles"),
];

/// Row candidates tried in sequence against the page. A selector only
/// qualifies once it yields more than [`MIN_QUALIFYING_ROWS`] plausible rows.
enum RowSelector {
    Class(&'static str),
    Tag(&'static str),
    RoleRow,
}

const ROW_SELECTORS: &[RowSelector] = &[
    RowSelector::Class("songs-list-row"),
    RowSelector::Class("tracklist-item"),
    RowSelector::Class("track"),
    RowSelector::Tag("tr"),
    RowSelector::Tag("li"),
    RowSelector::Class("song-row"),
    RowSelector::RoleRow,
];

const MIN_QUALIFYING_ROWS: usize = 5;

/// Markers that flag an inline script as a playlist payload.
const JSON_MARKERS: &[&str] = &[r#""kind":"playlist""#, r#""type":"playlist""#, r#""tracks":"#];

pub async fn extract_playlist(url: &str, ctx: &ExtractContext) -> Result<ExtractionResult> {
    let progress = &ctx.progress;
    progress.update(ProgressUpdate::step(
        5,
        "Extracting Apple Music playlist ID...",
        1,
    ));

    let playlist_id = parse_id(url).ok_or_else(|| TrackliftError::InvalidUrl(url.to_string()))?;
    tracing::info!(%playlist_id, "extracting Apple Music playlist");
    progress.update(ProgressUpdate::step(
        10,
        format!("Successfully extracted playlist ID: {playlist_id}. Fetching playlist data..."),
        2,
    ));

    if let Some(token) = ctx.user_token.as_deref() {
        progress.update(ProgressUpdate::step(
            40,
            "Fetching playlist with Apple Music user authorization...",
            4,
        ));
        if let Some(result) = try_page(url, Some(token)).await {
            progress.update(ProgressUpdate::completed(format!(
                "Successfully extracted {} songs from \"{}\" (authorized)",
                result.songs.len(),
                result.playlist_info.title
            )));
            return Ok(result);
        }
        tracing::warn!("authorized Apple Music extraction failed, falling back");
    }

    progress.update(ProgressUpdate::step(
        50,
        "Trying unauthenticated playlist extraction...",
        5,
    ));
    if let Some(result) = try_page(url, None).await {
        progress.update(ProgressUpdate::completed(format!(
            "Successfully extracted {} songs from \"{}\"",
            result.songs.len(),
            result.playlist_info.title
        )));
        return Ok(result);
    }

    tracing::warn!(%playlist_id, "all extraction approaches failed, returning mock data");
    progress.update(ProgressUpdate::failed(
        "Extraction failed. Returning mock data.",
    ));
    Ok(mock_result(&playlist_id))
}

/// One pass over the playlist page: heuristic row scraping first, then the
/// inline JSON payloads. Authenticated passes send the user token as the
/// `music_user_token` cookie, which makes private playlists render.
async fn try_page(url: &str, user_token: Option<&str>) -> Option<ExtractionResult> {
    let html = match download_text_with_headers(url, page_headers(user_token)).await {
        Ok(html) => html,
        Err(err) => {
            tracing::warn!(error = %err, authorized = user_token.is_some(), "Apple Music page fetch failed");
            return None;
        }
    };

    let title = scrape::select_first_text(&html, TITLE_SELECTORS)
        .unwrap_or_else(|| "Unknown Playlist".to_string());
    let creator = scrape::select_first_text(&html, CREATOR_SELECTORS)
        .unwrap_or_else(|| "Unknown Creator".to_string());

    let songs = scrape_song_rows(&html);
    if !songs.is_empty() {
        tracing::info!(count = songs.len(), authorized = user_token.is_some(), "extracted songs from page rows");
        return Some(build_result(title, creator, songs, user_token.is_some()));
    }

    let songs = script_json_songs(&html);
    if !songs.is_empty() {
        tracing::info!(count = songs.len(), authorized = user_token.is_some(), "extracted songs from script JSON");
        return Some(build_result(title, creator, songs, user_token.is_some()));
    }

    None
}

/// Walk the row selector table; the first selector producing more than
/// [`MIN_QUALIFYING_ROWS`] plausible song rows wins.
fn scrape_song_rows(html: &str) -> Vec<Song> {
    for selector in ROW_SELECTORS {
        let rows = match selector {
            RowSelector::Class(class) => {
                scrape::class_blocks(html, &["div", "li", "tr"], class)
            }
            RowSelector::Tag(tag) => scrape::tag_blocks(html, tag),
            RowSelector::RoleRow => role_row_blocks(html),
        };

        let mut songs = Vec::new();
        for row in rows {
            if let Some(song) = parse_row(&row, songs.len() as u32 + 1) {
                songs.push(song);
            }
        }
        if songs.len() > MIN_QUALIFYING_ROWS {
            return songs;
        }
    }
    Vec::new()
}

fn role_row_blocks(html: &str) -> Vec<String> {
    scrape::attr_blocks(html, "div", "role", "row")
}

/// Split a plausible row (text containing a `M:SS` substring) into
/// title/artist/album/duration. Cells are split by position; the duration is
/// the last cell matching the strict `^\d+:\d+$` shape.
fn parse_row(row: &str, id: u32) -> Option<Song> {
    let text = scrape::strip_tags(row);
    let duration_re = Regex::new(r"\d+:\d+").unwrap();
    if !duration_re.is_match(&text) {
        return None;
    }
    let strict_duration = Regex::new(r"^\d+:\d+$").unwrap();

    let cells = scrape::cell_texts(row);
    let (title, artist, album, duration) = if cells.len() >= 2 {
        let duration = cells
            .iter()
            .rev()
            .find(|cell| strict_duration.is_match(cell))
            .cloned();
        // Only treat the third cell as an album when it is not the duration
        let album = cells
            .get(2)
            .filter(|cell| !strict_duration.is_match(cell))
            .cloned();
        (
            cells[0].clone(),
            Some(cells[1].clone()),
            album,
            duration,
        )
    } else {
        let duration = duration_re.find(&text).map(|m| m.as_str().to_string());
        let remaining = match &duration {
            Some(d) => text.replacen(d.as_str(), "", 1),
            None => text.clone(),
        };
        let mut parts = remaining
            .split(['-', '–', '•'])
            .map(str::trim)
            .filter(|part| !part.is_empty());
        let title = parts.next().unwrap_or_default().to_string();
        let artist = parts.next().map(str::to_string);
        (title, artist, None, duration)
    };

    if title.len() <= 1 {
        return None;
    }
    Some(Song {
        id,
        title,
        artist: artist.unwrap_or_else(|| "Unknown Artist".to_string()),
        album: album.unwrap_or_else(|| "Unknown Album".to_string()),
        duration: duration.unwrap_or_else(|| "0:00".to_string()),
        song_id: None,
    })
}

/// Songs from inline JSON payloads, trying the sectioned schema first and
/// the flat `tracks` schema second.
fn script_json_songs(html: &str) -> Vec<Song> {
    for script in scrape::script_blocks(html) {
        if !JSON_MARKERS.iter().any(|marker| script.contains(marker)) {
            continue;
        }

        if let Ok(payload) = serde_json::from_str::<SectionsPayload>(&script) {
            let songs = sections_songs(payload);
            if !songs.is_empty() {
                return songs;
            }
        }
        if let Ok(payload) = serde_json::from_str::<TracksPayload>(&script) {
            let songs = attribute_songs(payload.tracks.unwrap_or_default());
            if !songs.is_empty() {
                return songs;
            }
        }
    }
    Vec::new()
}

fn sections_songs(payload: SectionsPayload) -> Vec<Song> {
    let sections = payload
        .data
        .and_then(|data| data.sections)
        .unwrap_or_default();
    let attributes = sections
        .into_iter()
        .flat_map(|section| section.items.unwrap_or_default())
        .filter_map(|item| item.attributes)
        .collect::<Vec<_>>();
    attribute_songs(attributes)
}

fn attribute_songs(attributes: Vec<TrackAttributes>) -> Vec<Song> {
    attributes
        .into_iter()
        .enumerate()
        .map(|(index, attributes)| Song {
            id: index as u32 + 1,
            title: attributes
                .name
                .unwrap_or_else(|| "Unknown Title".to_string()),
            artist: attributes
                .artist_name
                .unwrap_or_else(|| "Unknown Artist".to_string()),
            album: attributes
                .album_name
                .unwrap_or_else(|| "Unknown Album".to_string()),
            duration: format_duration(attributes.duration_in_millis.unwrap_or(0)),
            song_id: None,
        })
        .collect()
}

fn build_result(
    title: String,
    creator: String,
    songs: Vec<Song>,
    authorized: bool,
) -> ExtractionResult {
    ExtractionResult {
        playlist_info: PlaylistInfo {
            title,
            creator,
            song_count: songs.len() as u32,
            extraction_status: authorized.then_some(ExtractionStatus::AuthenticatedData),
            note: None,
        },
        songs,
    }
}

fn page_headers(user_token: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("en-US,en;q=0.9"),
    );
    if let Some(token) = user_token {
        let cookie = format!("music_user_token={token}");
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.insert(COOKIE, value);
        }
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row_html(n: usize) -> String {
        (1..=n)
            .map(|i| {
                format!(
                    r#"<div class="songs-list-row">
                        <div>Song {i}</div><div>Artist {i}</div><div>Album {i}</div><div>3:4{}</div>
                    </div>"#,
                    i % 10
                )
            })
            .collect()
    }

    #[test]
    fn test_scrape_song_rows_requires_more_than_five() {
        // Five rows do not qualify
        assert!(scrape_song_rows(&row_html(5)).is_empty());

        let songs = scrape_song_rows(&row_html(6));
        assert_eq!(songs.len(), 6);
        assert_eq!(songs[0].title, "Song 1");
        assert_eq!(songs[0].artist, "Artist 1");
        assert_eq!(songs[0].album, "Album 1");
        assert_eq!(songs[0].duration, "3:41");
    }

    #[test]
    fn test_parse_row_rejects_rows_without_duration() {
        assert!(parse_row("<div>No duration here</div>", 1).is_none());
    }

    #[test]
    fn test_parse_row_three_cells_duration_not_album() {
        let row = "<td>Title Here</td><td>Artist Here</td><td>4:20</td>";
        let song = parse_row(row, 1).unwrap();
        assert_eq!(song.title, "Title Here");
        assert_eq!(song.artist, "Artist Here");
        assert_eq!(song.album, "Unknown Album");
        assert_eq!(song.duration, "4:20");
    }

    #[test]
    fn test_parse_row_text_fallback_splits_on_separator() {
        let row = "<li>Come Together – The Beatles 4:19</li>";
        let song = parse_row(row, 1).unwrap();
        assert_eq!(song.title, "Come Together");
        assert_eq!(song.artist, "The Beatles");
        assert_eq!(song.duration, "4:19");
    }

    #[test]
    fn test_script_json_sections_schema() {
        let html = r#"<script type="application/json">{
            "data": {"sections": [{"items": [
                {"attributes": {"name": "N", "artistName": "AR", "albumName": "AL", "durationInMillis": 185000}},
                {"attributes": {"name": "M"}}
            ]}]},
            "kind":"playlist"
        }</script>"#;
        let songs = script_json_songs(html);
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[0].duration, "3:05");
        assert_eq!(songs[1].artist, "Unknown Artist");
    }

    #[test]
    fn test_script_json_tracks_schema() {
        let html = r#"<script>{"tracks": [{"name": "Flat", "artistName": "F", "durationInMillis": 60000}]}</script>"#;
        let songs = script_json_songs(html);
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "Flat");
        assert_eq!(songs[0].duration, "1:00");
    }

    #[test]
    fn test_script_json_ignores_unmarked_scripts() {
        let html = r#"<script>var x = {"songs": []};</script>"#;
        assert!(script_json_songs(html).is_empty());
    }
}
