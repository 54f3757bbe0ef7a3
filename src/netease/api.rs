use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures_util::future::join_all;
use regex::Regex;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::core::{ExtractContext, ExtractionResult, PlaylistInfo, Song};
use crate::download::{download_json_with_headers, download_text_with_headers};
use crate::error::{Result, TrackliftError};
use crate::netease::types::{
    ArtistRef, EmbeddedContainer, EmbeddedTrack, InitialData, LegacyDetailResponse,
    PlaylistDetailResponse, SongDetailResponse, TrackLegacy,
};
use crate::netease::{NeteaseExtractor, mock_result, parse_id};
use crate::progress::{BatchProgress, ProgressReporter, ProgressUpdate};
use crate::scrape::{self, Selector};
use crate::utils::format_duration;

const BATCH_SIZE: usize = 20;
/// Above this size the batch song-detail API is used instead of per-song calls.
const LARGE_PLAYLIST_THRESHOLD: usize = 50;
/// Fixed pause between detail batches to stay under upstream rate limits.
const BATCH_DELAY: Duration = Duration::from_millis(500);

pub const PLACEHOLDER_TITLE: &str = "Unknown Title";

const TITLE_SELECTORS: &[Selector] = &[
    Selector::Class("f-ff2"),
    Selector::MetaProperty("og:title"),
];

/// Global variables probed for embedded track blobs inside the iframe.
const IFRAME_SCRIPT_MARKERS: &[&str] = &[
    "window.PLAYLIST_TRACK_FULL_INFO",
    "GCollection",
    "GPlaylist",
];

/// Placeholder entry referencing a song before its details are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackIdEntry {
    pub id: String,
    pub title: String,
}

impl TrackIdEntry {
    fn placeholder(id: String) -> Self {
        Self {
            id,
            title: PLACEHOLDER_TITLE.to_string(),
        }
    }
}

/// Playlist data accumulated while walking the strategy chain.
#[derive(Default)]
struct Candidate {
    name: Option<String>,
    creator: Option<String>,
    track_ids: Vec<TrackIdEntry>,
}

impl Candidate {
    fn title(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| "Netease Music Playlist".to_string())
    }

    fn creator(&self) -> String {
        self.creator
            .clone()
            .unwrap_or_else(|| "Unknown Creator".to_string())
    }

    fn into_result(self, songs: Vec<Song>) -> ExtractionResult {
        ExtractionResult {
            playlist_info: PlaylistInfo {
                title: self.title(),
                creator: self.creator(),
                song_count: songs.len() as u32,
                extraction_status: None,
                note: None,
            },
            songs,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum FetchStrategy {
    PrimaryApi,
    LegacyApi,
    PageScrape,
}

const STRATEGIES: &[FetchStrategy] = &[
    FetchStrategy::PrimaryApi,
    FetchStrategy::LegacyApi,
    FetchStrategy::PageScrape,
];

pub async fn extract_playlist(
    extractor: &NeteaseExtractor,
    url: &str,
    ctx: &ExtractContext,
) -> Result<ExtractionResult> {
    let progress = &ctx.progress;
    progress.update(ProgressUpdate::step(
        5,
        "Extracting Netease Music playlist ID...",
        1,
    ));

    let playlist_id = parse_id(url).ok_or_else(|| TrackliftError::InvalidUrl(url.to_string()))?;
    tracing::info!(%playlist_id, "extracting Netease playlist");
    progress.update(ProgressUpdate::step(
        10,
        format!("Successfully extracted playlist ID: {playlist_id}. Fetching playlist details..."),
        2,
    ));

    match run_chain(extractor, &playlist_id, progress).await {
        Ok(Some(result)) => {
            progress.update(ProgressUpdate::completed(format!(
                "Successfully extracted {} songs from \"{}\"",
                result.songs.len(),
                result.playlist_info.title
            )));
            Ok(result)
        }
        Ok(None) => {
            tracing::warn!(%playlist_id, "all extraction approaches failed, returning mock data");
            progress.update(ProgressUpdate::failed(
                "Extraction failed. Returning mock data.",
            ));
            Ok(mock_result(&playlist_id))
        }
        Err(err) => {
            tracing::error!(%playlist_id, error = %err, "Netease extraction error, returning mock data");
            progress.update(ProgressUpdate::error(format!(
                "Error: {err}. Returning mock data."
            )));
            Ok(mock_result(&playlist_id))
        }
    }
}

async fn run_chain(
    extractor: &NeteaseExtractor,
    playlist_id: &str,
    progress: &ProgressReporter,
) -> Result<Option<ExtractionResult>> {
    let mut candidate = Candidate::default();

    for strategy in STRATEGIES {
        // Later strategies only run while no track ids have been found.
        if !candidate.track_ids.is_empty() {
            break;
        }
        let complete = match strategy {
            FetchStrategy::PrimaryApi => {
                try_primary_api(extractor, playlist_id, &mut candidate, progress).await
            }
            FetchStrategy::LegacyApi => {
                try_legacy_api(extractor, playlist_id, &mut candidate).await
            }
            FetchStrategy::PageScrape => {
                try_page_scrape(extractor, playlist_id, &mut candidate).await
            }
        };
        if let Some(songs) = complete {
            return Ok(Some(candidate.into_result(songs)));
        }
    }

    if candidate.track_ids.is_empty() {
        return Ok(None);
    }

    let entries = std::mem::take(&mut candidate.track_ids);
    let songs = resolve_details(extractor, playlist_id, &entries, progress).await;
    Ok(Some(candidate.into_result(songs)))
}

/// `/api/v6/playlist/detail`: collects track ids and, when the response also
/// carries a full `tracks` array of matching length, returns complete songs.
async fn try_primary_api(
    extractor: &NeteaseExtractor,
    playlist_id: &str,
    candidate: &mut Candidate,
    progress: &ProgressReporter,
) -> Option<Vec<Song>> {
    let api_url = format!(
        "{}/api/v6/playlist/detail?id={}",
        extractor.api_base, playlist_id
    );
    progress.update(ProgressUpdate::step(
        20,
        "Requesting playlist data from Netease API...",
        3,
    ));

    let response: PlaylistDetailResponse =
        match download_json_with_headers(&api_url, api_headers(extractor, playlist_id)).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "Netease v6 API request failed");
                progress.update(ProgressUpdate::step(
                    35,
                    "API v6 request failed. Trying alternative methods...",
                    4,
                ));
                return None;
            }
        };

    progress.update(ProgressUpdate::step(
        30,
        "API responded successfully. Parsing playlist information...",
        4,
    ));

    let playlist = response.playlist?;
    if let Some(name) = playlist.name {
        candidate.name = Some(name);
    }
    if let Some(nickname) = playlist.creator.and_then(|c| c.nickname) {
        candidate.creator = Some(nickname);
    }
    progress.update(ProgressUpdate::step(
        40,
        format!(
            "Found playlist: \"{}\" by {}. Collecting track IDs...",
            candidate.title(),
            candidate.creator()
        ),
        5,
    ));

    if let Some(track_ids) = playlist.track_ids {
        candidate.track_ids = track_ids
            .into_iter()
            .map(|track| TrackIdEntry::placeholder(track.id.to_string()))
            .collect();
        tracing::debug!(count = candidate.track_ids.len(), "collected track ids from v6 API");
        progress.update(ProgressUpdate::step(
            50,
            format!(
                "Collected {} track IDs. Processing song details...",
                candidate.track_ids.len()
            ),
            6,
        ));
    }

    if let Some(tracks) = playlist.tracks
        && !tracks.is_empty()
        && tracks.len() == candidate.track_ids.len()
    {
        progress.update(ProgressUpdate::step(
            90,
            format!("Processing {} complete songs from API response...", tracks.len()),
            9,
        ));
        let songs = tracks
            .into_iter()
            .enumerate()
            .map(|(index, track)| Song {
                id: index as u32 + 1,
                title: track.name.unwrap_or_else(|| PLACEHOLDER_TITLE.to_string()),
                artist: artist_names(track.ar.as_deref()),
                album: album_name(track.al.and_then(|a| a.name)),
                duration: format_duration(track.dt.unwrap_or(0)),
                song_id: Some(track.id),
            })
            .collect();
        return Some(songs);
    }

    None
}

/// Legacy `/api/playlist/detail`, tried only when v6 produced no track ids.
async fn try_legacy_api(
    extractor: &NeteaseExtractor,
    playlist_id: &str,
    candidate: &mut Candidate,
) -> Option<Vec<Song>> {
    let api_url = format!(
        "{}/api/playlist/detail?id={}",
        extractor.api_base, playlist_id
    );

    let response: LegacyDetailResponse =
        match download_json_with_headers(&api_url, api_headers(extractor, playlist_id)).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "Netease legacy API request failed");
                return None;
            }
        };

    let result = response.result?;
    if candidate.name.is_none() {
        candidate.name = result.name;
    }
    if candidate.creator.is_none() {
        candidate.creator = result.creator.and_then(|c| c.nickname);
    }

    if let Some(track_ids) = result.track_ids {
        candidate.track_ids = track_ids
            .into_iter()
            .map(|track| TrackIdEntry::placeholder(track.id.to_string()))
            .collect();
        tracing::debug!(count = candidate.track_ids.len(), "collected track ids from legacy API");
    }

    if let Some(tracks) = result.tracks
        && !candidate.track_ids.is_empty()
        && tracks.len() == candidate.track_ids.len()
    {
        let songs = tracks
            .into_iter()
            .enumerate()
            .map(|(index, track)| legacy_song(index as u32 + 1, track, None))
            .collect();
        return Some(songs);
    }

    None
}

/// Scrape the playlist page, probing the embedded iframe for anchor hrefs
/// and script-tag JSON blobs. Never yields complete songs, only track ids
/// and title/creator fallbacks.
async fn try_page_scrape(
    extractor: &NeteaseExtractor,
    playlist_id: &str,
    candidate: &mut Candidate,
) -> Option<Vec<Song>> {
    let web_url = format!("{}/playlist?id={}", extractor.web_base, playlist_id);
    let html = match download_text_with_headers(&web_url, page_headers()).await {
        Ok(html) => html,
        Err(err) => {
            tracing::warn!(error = %err, "Netease page scrape failed");
            return None;
        }
    };

    if candidate.name.is_none() {
        candidate.name = scrape::select_first_text(&html, TITLE_SELECTORS);
    }
    if candidate.creator.is_none() {
        candidate.creator = scrape_creator(&html);
    }

    let total_songs = scrape_song_count(&html).unwrap_or(0);

    if let Some(iframe_src) = iframe_src(&html) {
        let iframe_url = if iframe_src.starts_with("http") {
            iframe_src
        } else {
            format!("{}{}", extractor.web_base, iframe_src)
        };
        tracing::debug!(%iframe_url, "probing playlist iframe");

        match download_text_with_headers(&iframe_url, referer_headers(&web_url)).await {
            Ok(iframe_html) => {
                collect_anchor_ids(&iframe_html, &mut candidate.track_ids);
                collect_script_tracks(&iframe_html, IFRAME_SCRIPT_MARKERS, &mut candidate.track_ids);
            }
            Err(err) => tracing::warn!(error = %err, "iframe fetch failed"),
        }
    }

    // Nothing in the iframe: fall back to the main page.
    if candidate.track_ids.is_empty() {
        collect_anchor_ids(&html, &mut candidate.track_ids);

        if candidate.track_ids.len() < total_songs && total_songs > 0 {
            collect_initial_data_tracks(&html, &mut candidate.track_ids);
        }
    }

    tracing::debug!(count = candidate.track_ids.len(), "track ids after page scrape");
    None
}

/// Resolve song details for the collected track ids, in batches of
/// [`BATCH_SIZE`]. Large playlists go through the batch detail API; small
/// ones fan out individual detail calls and join them. The assembled list is
/// sorted by sequence id since concurrent fetches resolve out of order.
async fn resolve_details(
    extractor: &NeteaseExtractor,
    playlist_id: &str,
    entries: &[TrackIdEntry],
    progress: &ProgressReporter,
) -> Vec<Song> {
    progress.update(ProgressUpdate::step(
        60,
        format!("Fetching details for {} songs...", entries.len()),
        7,
    ));

    let total_batches = entries.len().div_ceil(BATCH_SIZE);
    let use_batch_api = entries.len() > LARGE_PLAYLIST_THRESHOLD;
    let mut songs = Vec::with_capacity(entries.len());

    for (batch_index, batch) in entries.chunks(BATCH_SIZE).enumerate() {
        let start = batch_index * BATCH_SIZE;
        let end = start + batch.len();
        progress.update(
            ProgressUpdate::step(
                60 + (30 * batch_index / total_batches) as u8,
                format!(
                    "Processing batch {}/{} (songs {}-{})...",
                    batch_index + 1,
                    total_batches,
                    start + 1,
                    end
                ),
                7,
            )
            .with_batch(BatchProgress {
                current: batch_index as u32 + 1,
                total: total_batches as u32,
                processed: start as u32,
                total_songs: entries.len() as u32,
            }),
        );

        if use_batch_api {
            songs.extend(fetch_batch_details(extractor, playlist_id, batch, start).await);
        } else {
            let fetches = batch.iter().enumerate().map(|(offset, entry)| {
                fetch_entry_details(extractor, entry, (start + offset) as u32 + 1)
            });
            songs.extend(join_all(fetches).await);
        }

        if batch_index + 1 < total_batches {
            tokio::time::sleep(BATCH_DELAY).await;
        }
    }

    // Concurrent fetches may have resolved out of order.
    songs.sort_by_key(|song| song.id);
    songs
}

/// One batch through `/api/song/detail?ids=[...]`. Returned details are keyed
/// by song id; entries the API did not return get placeholder fields.
async fn fetch_batch_details(
    extractor: &NeteaseExtractor,
    playlist_id: &str,
    batch: &[TrackIdEntry],
    start: usize,
) -> Vec<Song> {
    let ids: Vec<&str> = batch.iter().map(|entry| entry.id.as_str()).collect();
    let batch_url = format!(
        "{}/api/song/detail?ids=[{}]",
        extractor.api_base,
        ids.join(",")
    );

    let details: HashMap<String, TrackLegacy> =
        match download_json_with_headers::<SongDetailResponse>(
            &batch_url,
            api_headers(extractor, playlist_id),
        )
        .await
        {
            Ok(response) => response
                .songs
                .unwrap_or_default()
                .into_iter()
                .map(|song| (song.id.to_string(), song))
                .collect(),
            Err(err) => {
                tracing::warn!(error = %err, "batch song detail request failed");
                HashMap::new()
            }
        };

    batch
        .iter()
        .enumerate()
        .map(|(offset, entry)| {
            let id = (start + offset) as u32 + 1;
            match details.get(&entry.id) {
                Some(detail) => Song {
                    id,
                    title: detail
                        .name
                        .clone()
                        .filter(|name| !name.is_empty())
                        .unwrap_or_else(|| entry.title.clone()),
                    artist: artist_names(detail.artists.as_deref()),
                    album: album_name(detail.album.as_ref().and_then(|a| a.name.clone())),
                    duration: format_duration(detail.duration.unwrap_or(0)),
                    song_id: Some(detail.id),
                },
                None => placeholder_song(id, entry),
            }
        })
        .collect()
}

/// Detail fetch for a single track id; failures degrade to placeholders.
async fn fetch_entry_details(
    extractor: &NeteaseExtractor,
    entry: &TrackIdEntry,
    id: u32,
) -> Song {
    let detail_url = format!(
        "{}/api/song/detail/?id={}&ids=[{}]",
        extractor.api_base, entry.id, entry.id
    );

    let detail = match download_json_with_headers::<SongDetailResponse>(
        &detail_url,
        referer_headers(&format!("{}/song?id={}", extractor.web_base, entry.id)),
    )
    .await
    {
        Ok(response) => response.songs.unwrap_or_default().into_iter().next(),
        Err(err) => {
            tracing::warn!(song_id = %entry.id, error = %err, "song detail request failed");
            None
        }
    };

    match detail {
        Some(detail) => legacy_song(id, detail, Some(entry)),
        None => placeholder_song(id, entry),
    }
}

fn legacy_song(id: u32, track: TrackLegacy, entry: Option<&TrackIdEntry>) -> Song {
    // A scraped title beats the detail response only when it is a real one.
    let scraped_title = entry
        .map(|e| e.title.clone())
        .filter(|title| title != PLACEHOLDER_TITLE);
    Song {
        id,
        title: scraped_title
            .or(track.name)
            .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string()),
        artist: artist_names(track.artists.as_deref()),
        album: album_name(track.album.and_then(|a| a.name)),
        duration: format_duration(track.duration.unwrap_or(0)),
        song_id: Some(track.id),
    }
}

fn placeholder_song(id: u32, entry: &TrackIdEntry) -> Song {
    Song {
        id,
        title: entry.title.clone(),
        artist: "Unknown Artist".to_string(),
        album: "Unknown Album".to_string(),
        duration: "0:00".to_string(),
        song_id: entry.id.parse().ok(),
    }
}

pub(crate) fn artist_names(artists: Option<&[ArtistRef]>) -> String {
    let names: Vec<&str> = artists
        .unwrap_or_default()
        .iter()
        .filter_map(|artist| artist.name.as_deref())
        .collect();
    if names.is_empty() {
        "Unknown Artist".to_string()
    } else {
        names.join(", ")
    }
}

fn album_name(name: Option<String>) -> String {
    name.filter(|n| !n.is_empty())
        .unwrap_or_else(|| "Unknown Album".to_string())
}

fn scrape_creator(html: &str) -> Option<String> {
    // Creator name sits inside the `.user` block on the playlist page.
    let user_block = scrape::class_blocks(html, &["div", "span", "p"], "user")
        .into_iter()
        .next()?;
    scrape::class_text(&user_block, "name")
}

fn scrape_song_count(html: &str) -> Option<usize> {
    let re = Regex::new(r"共(\d+)首").unwrap();
    re.captures(html)?[1].parse().ok()
}

fn iframe_src(html: &str) -> Option<String> {
    let patterns = [
        r#"<iframe[^>]*id="g_iframe"[^>]*src="([^"]*)""#,
        r#"<iframe[^>]*src="([^"]*)"[^>]*id="g_iframe""#,
    ];
    for pattern in patterns {
        let re = Regex::new(pattern).unwrap();
        if let Some(caps) = re.captures(html) {
            return Some(caps[1].replace("&amp;", "&"));
        }
    }
    None
}

/// Track ids from anchor hrefs inside the hidden `ul.f-hide` track list.
fn collect_anchor_ids(html: &str, entries: &mut Vec<TrackIdEntry>) {
    let id_re = Regex::new(r"id=(\d+)").unwrap();
    let mut seen: HashSet<String> = entries.iter().map(|e| e.id.clone()).collect();

    for list in scrape::class_blocks(html, &["ul"], "f-hide") {
        for (href, text) in scrape::anchors(&list) {
            if let Some(caps) = id_re.captures(&href) {
                let id = caps[1].to_string();
                if seen.insert(id.clone()) {
                    entries.push(TrackIdEntry {
                        id,
                        title: if text.is_empty() {
                            PLACEHOLDER_TITLE.to_string()
                        } else {
                            text
                        },
                    });
                }
            }
        }
    }
}

/// Track ids from JSON blobs assigned to known globals in inline scripts.
fn collect_script_tracks(html: &str, markers: &[&str], entries: &mut Vec<TrackIdEntry>) {
    let mut seen: HashSet<String> = entries.iter().map(|e| e.id.clone()).collect();

    for script in scrape::script_blocks(html) {
        for marker in markers {
            if !script.contains(marker) {
                continue;
            }
            let Some(json) = scrape::extract_json_after(&script, marker) else {
                continue;
            };
            let tracks = parse_embedded_tracks(json);
            if tracks.is_empty() {
                continue;
            }
            tracing::debug!(marker, count = tracks.len(), "found songs in script tag");
            for track in tracks {
                push_embedded_track(&track, &mut seen, entries);
            }
        }
    }
}

/// A blob is either a bare track array or an object holding one.
fn parse_embedded_tracks(json: &str) -> Vec<EmbeddedTrack> {
    if let Ok(tracks) = serde_json::from_str::<Vec<EmbeddedTrack>>(json) {
        return tracks;
    }
    if let Ok(container) = serde_json::from_str::<EmbeddedContainer>(json) {
        return container
            .tracks
            .or(container.songlist)
            .unwrap_or_default();
    }
    Vec::new()
}

fn collect_initial_data_tracks(html: &str, entries: &mut Vec<TrackIdEntry>) {
    let mut seen: HashSet<String> = entries.iter().map(|e| e.id.clone()).collect();

    for script in scrape::script_blocks(html) {
        if !script.contains("window.__INITIAL_DATA__") {
            continue;
        }
        let Some(json) = scrape::extract_json_after(&script, "window.__INITIAL_DATA__") else {
            continue;
        };
        let Ok(data) = serde_json::from_str::<InitialData>(json) else {
            continue;
        };
        let Some(playlist) = data.playlist else {
            continue;
        };
        let tracks = playlist
            .tracks
            .or(playlist.track_ids)
            .unwrap_or_default();
        for track in tracks {
            push_embedded_track(&track, &mut seen, entries);
        }
    }
}

fn push_embedded_track(
    track: &EmbeddedTrack,
    seen: &mut HashSet<String>,
    entries: &mut Vec<TrackIdEntry>,
) {
    if let Some(id) = track.id_string()
        && seen.insert(id.clone())
    {
        entries.push(TrackIdEntry {
            id,
            title: track
                .title()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| PLACEHOLDER_TITLE.to_string()),
        });
    }
}

fn api_headers(extractor: &NeteaseExtractor, playlist_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    let referer = format!("{}/playlist?id={}", extractor.web_base, playlist_id);
    if let Ok(value) = HeaderValue::from_str(&referer) {
        headers.insert("Referer", value);
    }
    headers
}

fn page_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(
        "Accept-Language",
        HeaderValue::from_static("en-US,en;q=0.9,zh-CN;q=0.8,zh;q=0.7"),
    );
    headers
}

fn referer_headers(referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(referer) {
        headers.insert("Referer", value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    const V6_RESPONSE: &str = r#"{
        "playlist": {
            "name": "Evening Drive",
            "creator": {"nickname": "dj-nine"},
            "trackIds": [{"id": 101}, {"id": 202}],
            "tracks": [
                {"id": 101, "name": "First", "ar": [{"name": "A"}, {"name": "B"}], "al": {"name": "Album One"}, "dt": 185000},
                {"id": 202, "name": "Second", "ar": [{"name": "C"}], "al": {"name": "Album Two"}, "dt": 65000}
            ]
        }
    }"#;

    #[test]
    fn test_v6_response_parses() {
        let response: PlaylistDetailResponse = serde_json::from_str(V6_RESPONSE).unwrap();
        let playlist = response.playlist.unwrap();
        assert_eq!(playlist.name.as_deref(), Some("Evening Drive"));
        assert_eq!(playlist.track_ids.unwrap().len(), 2);
        let tracks = playlist.tracks.unwrap();
        assert_eq!(tracks[0].ar.as_ref().unwrap().len(), 2);
        assert_eq!(tracks[1].dt, Some(65000));
    }

    #[test]
    fn test_v6_response_tolerates_missing_fields() {
        let response: PlaylistDetailResponse =
            serde_json::from_str(r#"{"playlist": {"trackIds": [{"id": 7}]}}"#).unwrap();
        let playlist = response.playlist.unwrap();
        assert!(playlist.name.is_none());
        assert_eq!(playlist.track_ids.unwrap()[0].id, 7);

        let empty: PlaylistDetailResponse = serde_json::from_str(r#"{"code": 404}"#).unwrap();
        assert!(empty.playlist.is_none());
    }

    #[test]
    fn test_artist_names_joined_with_comma() {
        let artists = vec![
            ArtistRef {
                name: Some("A".into()),
            },
            ArtistRef {
                name: Some("B".into()),
            },
        ];
        assert_eq!(artist_names(Some(&artists)), "A, B");
        assert_eq!(artist_names(None), "Unknown Artist");
        assert_eq!(artist_names(Some(&[])), "Unknown Artist");
    }

    #[test]
    fn test_legacy_song_prefers_scraped_title_over_detail() {
        let track = TrackLegacy {
            id: 9,
            name: Some("Detail Title".into()),
            artists: None,
            album: None,
            duration: Some(125_000),
        };
        let entry = TrackIdEntry {
            id: "9".into(),
            title: "Scraped Title".into(),
        };
        let song = legacy_song(1, track, Some(&entry));
        assert_eq!(song.title, "Scraped Title");
        assert_eq!(song.duration, "2:05");
    }

    #[test]
    fn test_legacy_song_placeholder_title_is_overwritten() {
        let track = TrackLegacy {
            id: 9,
            name: Some("Detail Title".into()),
            artists: None,
            album: None,
            duration: None,
        };
        let entry = TrackIdEntry::placeholder("9".into());
        let song = legacy_song(1, track, Some(&entry));
        assert_eq!(song.title, "Detail Title");
        assert_eq!(song.duration, "0:00");
    }

    #[test]
    fn test_collect_anchor_ids_dedups() {
        let html = r#"
            <ul class="f-hide">
                <li><a href="/song?id=101">First Song</a></li>
                <li><a href="/song?id=202">Second Song</a></li>
                <li><a href="/song?id=101">First Song Again</a></li>
                <li><a href="/album?x=1">No Id</a></li>
            </ul>
        "#;
        let mut entries = Vec::new();
        collect_anchor_ids(html, &mut entries);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, "101");
        assert_eq!(entries[0].title, "First Song");
    }

    #[test]
    fn test_collect_script_tracks_array_blob() {
        let html = r#"<script>
            window.PLAYLIST_TRACK_FULL_INFO = [{"id": 11, "name": "Song A"}, {"id": 22}];
        </script>"#;
        let mut entries = vec![TrackIdEntry::placeholder("11".into())];
        collect_script_tracks(html, IFRAME_SCRIPT_MARKERS, &mut entries);
        // 11 deduped, 22 added with placeholder title
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].id, "22");
        assert_eq!(entries[1].title, PLACEHOLDER_TITLE);
    }

    #[test]
    fn test_collect_script_tracks_object_blob() {
        let html = r#"<script>var GPlaylist = {"songlist": [{"id": "33", "name": "Song C"}]};</script>"#;
        let mut entries = Vec::new();
        collect_script_tracks(html, IFRAME_SCRIPT_MARKERS, &mut entries);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "33");
        assert_eq!(entries[0].title, "Song C");
    }

    #[test]
    fn test_collect_initial_data_nested_tracks() {
        let html = r#"<script>
            window.__INITIAL_DATA__ = {"playlist": {"trackIds": [{"track": {"id": 44, "name": "Nested"}}]}};
        </script>"#;
        let mut entries = Vec::new();
        collect_initial_data_tracks(html, &mut entries);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "44");
        assert_eq!(entries[0].title, "Nested");
    }

    #[test]
    fn test_iframe_src_resolves_entities() {
        let html = r#"<iframe id="g_iframe" src="/outchain/0/123?a=1&amp;b=2"></iframe>"#;
        assert_eq!(iframe_src(html).unwrap(), "/outchain/0/123?a=1&b=2");
        assert!(iframe_src("<div></div>").is_none());
    }

    #[test]
    fn test_scrape_song_count() {
        assert_eq!(scrape_song_count(r#"<span class="sub s-fc3">共42首</span>"#), Some(42));
        assert_eq!(scrape_song_count("no count here"), None);
    }

    fn dead_extractor() -> NeteaseExtractor {
        // Nothing listens on the discard port
        NeteaseExtractor::with_endpoints("http://127.0.0.1:9", "http://127.0.0.1:9")
    }

    #[tokio::test]
    async fn test_resolve_details_contiguous_ids_on_fanout_path() {
        let extractor = dead_extractor();
        let entries: Vec<TrackIdEntry> = (0..3)
            .map(|i| TrackIdEntry::placeholder(format!("10{i}")))
            .collect();

        let songs =
            resolve_details(&extractor, "1", &entries, &ProgressReporter::disabled()).await;

        assert_eq!(songs.len(), 3);
        let ids: Vec<u32> = songs.iter().map(|song| song.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(
            songs
                .iter()
                .all(|song| song.artist == "Unknown Artist" && song.duration == "0:00")
        );
    }

    #[tokio::test]
    async fn test_resolve_details_contiguous_ids_on_batch_path() {
        let extractor = dead_extractor();
        // 60 entries crosses the batch-API threshold: 3 batches of 20
        let entries: Vec<TrackIdEntry> = (1..=60)
            .map(|i| TrackIdEntry::placeholder(i.to_string()))
            .collect();

        let songs =
            resolve_details(&extractor, "1", &entries, &ProgressReporter::disabled()).await;

        assert_eq!(songs.len(), 60);
        assert!(
            songs
                .iter()
                .enumerate()
                .all(|(index, song)| song.id as usize == index + 1)
        );
        assert_eq!(songs[0].song_id, Some(1));
    }
}
