use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};

use crate::core::{ExtractContext, ExtractionResult, PlaylistInfo, Song};
use crate::download::{download_json_with_headers, download_text_with_headers};
use crate::error::{Result, TrackliftError};
use crate::progress::{ProgressReporter, ProgressUpdate};
use crate::qq::types::{
    AltApiResponse, CdInfoResponse, CdList, EmbeddedSong, QqInitialData, Singer,
};
use crate::qq::{QqExtractor, mock_result, parse_id};
use crate::scrape::{self, Selector};
use crate::utils::format_duration;

const TITLE_SELECTORS: &[Selector] = &[
    Selector::Class("data__name_txt"),
    Selector::Class("playlist-title"),
    Selector::MetaProperty("og:title"),
];

const CREATOR_SELECTORS: &[Selector] = &[
    Selector::Class("data__author"),
    Selector::Class("playlist-author"),
];

/// Row scraping strategies, tried in order against the playlist page.
struct RowStrategy {
    source: RowSource,
    title: &'static str,
    artist: &'static str,
    album: &'static str,
    time: &'static str,
}

enum RowSource {
    /// Elements carrying this class are the rows.
    Items(&'static str),
    /// `<tr>` children of the table with this class; first row is the header.
    TableRows(&'static str),
}

const ROW_STRATEGIES: &[RowStrategy] = &[
    RowStrategy {
        source: RowSource::Items("songlist__item"),
        title: "songlist__songname_txt",
        artist: "songlist__artist",
        album: "songlist__album",
        time: "songlist__time",
    },
    RowStrategy {
        source: RowSource::Items("song_item"),
        title: "song_name",
        artist: "song_artist",
        album: "song_album",
        time: "song_time",
    },
    RowStrategy {
        source: RowSource::TableRows("playlist__list"),
        title: "playlist__song_name",
        artist: "playlist__author",
        album: "playlist__album",
        time: "playlist__time",
    },
];

/// Last-resort title classes when no row strategy matched.
const GENERIC_TITLE_CLASSES: &[&str] = &["song_title", "song-name", "songname"];

#[derive(Debug, Clone, Copy)]
enum FetchStrategy {
    PrimaryApi,
    AlternateApi,
    PageScrape,
}

const STRATEGIES: &[FetchStrategy] = &[
    FetchStrategy::PrimaryApi,
    FetchStrategy::AlternateApi,
    FetchStrategy::PageScrape,
];

pub async fn extract_playlist(
    extractor: &QqExtractor,
    url: &str,
    ctx: &ExtractContext,
) -> Result<ExtractionResult> {
    let progress = &ctx.progress;
    progress.update(ProgressUpdate::step(
        5,
        "Extracting QQ Music playlist ID...",
        1,
    ));

    let playlist_id = parse_id(url).ok_or_else(|| TrackliftError::InvalidUrl(url.to_string()))?;
    tracing::info!(%playlist_id, "extracting QQ Music playlist");
    progress.update(ProgressUpdate::step(
        10,
        format!("Successfully extracted playlist ID: {playlist_id}. Fetching playlist details..."),
        2,
    ));

    for strategy in STRATEGIES {
        let result = match strategy {
            FetchStrategy::PrimaryApi => try_primary_api(extractor, &playlist_id, progress).await,
            FetchStrategy::AlternateApi => {
                try_alternate_api(extractor, &playlist_id, progress).await
            }
            FetchStrategy::PageScrape => try_page_scrape(extractor, &playlist_id, progress).await,
        };
        if let Some(result) = result {
            progress.update(ProgressUpdate::completed(format!(
                "Successfully extracted {} songs from \"{}\"",
                result.songs.len(),
                result.playlist_info.title
            )));
            return Ok(result);
        }
    }

    tracing::warn!(%playlist_id, "all extraction approaches failed, returning mock data");
    progress.update(ProgressUpdate::failed(
        "Extraction failed. Returning mock data.",
    ));
    Ok(mock_result(&playlist_id))
}

async fn try_primary_api(
    extractor: &QqExtractor,
    playlist_id: &str,
    progress: &ProgressReporter,
) -> Option<ExtractionResult> {
    let api_url = format!(
        "{}/qzone/fcg-bin/fcg_ucc_getcdinfo_byids_cp.fcg?type=1&json=1&utf8=1&onlysong=0&disstid={}&format=json&g_tk=5381&loginUin=0&hostUin=0&inCharset=utf8&outCharset=utf-8&notice=0&platform=yqq&needNewCode=0",
        extractor.api_base, playlist_id
    );
    progress.update(ProgressUpdate::step(
        20,
        "Requesting playlist data from QQ Music API...",
        3,
    ));

    let response: CdInfoResponse =
        match download_json_with_headers(&api_url, api_headers(extractor, playlist_id)).await {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "QQ Music API request failed");
                return None;
            }
        };

    let result = cd_to_result(response.cdlist?.into_iter().next()?);
    if result.is_none() {
        tracing::debug!("no songs in QQ Music API response");
    }
    result
}

async fn try_alternate_api(
    extractor: &QqExtractor,
    playlist_id: &str,
    progress: &ProgressReporter,
) -> Option<ExtractionResult> {
    let api_url = format!(
        "{}/v8/fcg-bin/fcg_v8_playlist_cp.fcg?id={}&format=json&platform=yqq",
        extractor.api_base, playlist_id
    );
    progress.update(ProgressUpdate::step(
        40,
        "Primary API failed. Trying alternative QQ Music API...",
        4,
    ));

    let response: AltApiResponse =
        match download_json_with_headers(&api_url, referer_headers(&format!("{}/", extractor.web_base))).await
        {
            Ok(response) => response,
            Err(err) => {
                tracing::warn!(error = %err, "alternative QQ Music API request failed");
                return None;
            }
        };

    cd_to_result(response.data?.cdlist?.into_iter().next()?)
}

/// Scrape the playlist page: four row strategies, then the embedded
/// `__INITIAL_DATA__` blob.
async fn try_page_scrape(
    extractor: &QqExtractor,
    playlist_id: &str,
    progress: &ProgressReporter,
) -> Option<ExtractionResult> {
    progress.update(ProgressUpdate::step(
        60,
        "APIs unavailable. Scraping QQ Music playlist page...",
        6,
    ));

    // Both URL formats are still in the wild.
    let web_urls = [
        format!("{}/n/ryqq/playlist/{}", extractor.web_base, playlist_id),
        format!("{}/n/yqq/playlist/{}.html", extractor.web_base, playlist_id),
    ];

    let mut html = None;
    for web_url in &web_urls {
        match download_text_with_headers(web_url, page_headers()).await {
            Ok(body) => {
                html = Some(body);
                break;
            }
            Err(err) => tracing::warn!(%web_url, error = %err, "QQ Music page fetch failed"),
        }
    }
    let html = html?;

    let title = scrape::select_first_text(&html, TITLE_SELECTORS)
        .unwrap_or_else(|| "Unknown Playlist".to_string());
    let creator = scrape::select_first_text(&html, CREATOR_SELECTORS)
        .unwrap_or_else(|| "Unknown Creator".to_string());

    let songs = scrape_songs(&html);
    if !songs.is_empty() {
        tracing::info!(count = songs.len(), "extracted songs via web scraping");
        return Some(build_result(title, creator, songs));
    }

    progress.update(ProgressUpdate::step(
        80,
        "Scanning page scripts for embedded playlist data...",
        8,
    ));
    embedded_json_result(&html, title, creator)
}

fn scrape_songs(html: &str) -> Vec<Song> {
    for strategy in ROW_STRATEGIES {
        let rows = match strategy.source {
            RowSource::Items(class) => scrape::class_blocks(html, &["li", "div", "tr"], class),
            RowSource::TableRows(class) => {
                match scrape::class_blocks(html, &["table"], class).into_iter().next() {
                    // First row is the header
                    Some(table) => scrape::tag_blocks(&table, "tr").into_iter().skip(1).collect(),
                    None => Vec::new(),
                }
            }
        };

        let mut songs = Vec::new();
        for row in rows {
            let Some(title) = scrape::class_text(&row, strategy.title) else {
                continue;
            };
            songs.push(Song {
                id: songs.len() as u32 + 1,
                title,
                artist: scrape::class_text(&row, strategy.artist)
                    .unwrap_or_else(|| "Unknown Artist".to_string()),
                album: scrape::class_text(&row, strategy.album)
                    .unwrap_or_else(|| "Unknown Album".to_string()),
                duration: scrape::class_text(&row, strategy.time)
                    .unwrap_or_else(|| "0:00".to_string()),
                song_id: None,
            });
        }
        if !songs.is_empty() {
            return songs;
        }
    }

    // Generic fallback: any recognizable song-title class, artist unknown.
    let mut songs = Vec::new();
    for class in GENERIC_TITLE_CLASSES {
        for block in scrape::class_blocks(html, &["a", "span", "div", "td"], class) {
            let title = scrape::strip_tags(&block);
            if title.is_empty() || title == "Name" || title == "Title" {
                continue;
            }
            songs.push(Song {
                id: songs.len() as u32 + 1,
                title,
                artist: "Unknown Artist".to_string(),
                album: "Unknown Album".to_string(),
                duration: "0:00".to_string(),
                song_id: None,
            });
        }
        if !songs.is_empty() {
            break;
        }
    }
    songs
}

/// Try the three nested locations the page build may have left the song
/// list in, overriding title/creator when the blob carries better ones.
fn embedded_json_result(
    html: &str,
    scraped_title: String,
    scraped_creator: String,
) -> Option<ExtractionResult> {
    let json = scrape::extract_json_after(html, "window.__INITIAL_DATA__")?;
    let data: QqInitialData = match serde_json::from_str(json) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(error = %err, "failed to parse __INITIAL_DATA__");
            return None;
        }
    };

    let mut title = scraped_title;
    let mut creator = scraped_creator;
    let song_list: Option<Vec<EmbeddedSong>> = if let Some(detail) = data.detail {
        if let Some(t) = detail.title {
            title = t;
        }
        if let Some(name) = detail.creator.and_then(|c| c.name) {
            creator = name;
        }
        detail.song_list
    } else if let Some(playlist) = data.playlist {
        if let Some(name) = playlist.creator_name() {
            creator = name;
        }
        if let Some(t) = playlist.title.clone() {
            title = t;
        }
        playlist.song_list
    } else if let Some(cd) = data.cdlist.and_then(|list| list.into_iter().next()) {
        if let Some(t) = cd.dissname {
            title = t;
        }
        if let Some(name) = cd.nickname {
            creator = name;
        }
        cd.songlist
    } else {
        None
    };

    let songs: Vec<Song> = song_list?
        .into_iter()
        .enumerate()
        .map(|(index, song)| embedded_song(index as u32 + 1, song))
        .collect();
    if songs.is_empty() {
        return None;
    }

    tracing::info!(count = songs.len(), "extracted songs from embedded JSON");
    Some(build_result(title, creator, songs))
}

fn embedded_song(id: u32, song: EmbeddedSong) -> Song {
    let artist = match song.singer {
        Some(singers) if !singers.is_empty() => singer_names(&singers),
        _ => song
            .artist
            .or(song.singer_name)
            .unwrap_or_else(|| "Unknown Artist".to_string()),
    };
    let seconds = song.interval.or(song.duration).unwrap_or(0);
    Song {
        id,
        title: song
            .title
            .or(song.name)
            .or(song.songname)
            .unwrap_or_else(|| "Unknown Title".to_string()),
        artist,
        album: song
            .album
            .and_then(|a| a.name)
            .or(song.albumname)
            .unwrap_or_else(|| "Unknown Album".to_string()),
        duration: format_duration(seconds * 1000),
        song_id: None,
    }
}

/// Map an API `cdlist` payload to a result; a payload without songs advances
/// the chain instead.
fn cd_to_result(cd: CdList) -> Option<ExtractionResult> {
    let songlist = cd.songlist.filter(|songs| !songs.is_empty())?;

    let songs: Vec<Song> = songlist
        .into_iter()
        .enumerate()
        .map(|(index, song)| Song {
            id: index as u32 + 1,
            title: song
                .songname
                .unwrap_or_else(|| "Unknown Title".to_string()),
            artist: singer_names(&song.singer.unwrap_or_default()),
            album: song
                .albumname
                .unwrap_or_else(|| "Unknown Album".to_string()),
            // interval is in seconds
            duration: format_duration(song.interval.unwrap_or(0) * 1000),
            song_id: None,
        })
        .collect();

    Some(ExtractionResult {
        playlist_info: PlaylistInfo {
            title: cd.dissname.unwrap_or_else(|| "Unknown Playlist".to_string()),
            creator: cd.nickname.unwrap_or_else(|| "Unknown Creator".to_string()),
            song_count: cd.songnum.unwrap_or(songs.len() as u32),
            extraction_status: None,
            note: None,
        },
        songs,
    })
}

fn build_result(title: String, creator: String, songs: Vec<Song>) -> ExtractionResult {
    ExtractionResult {
        playlist_info: PlaylistInfo {
            title,
            creator,
            song_count: songs.len() as u32,
            extraction_status: None,
            note: None,
        },
        songs,
    }
}

fn singer_names(singers: &[Singer]) -> String {
    let names: Vec<&str> = singers
        .iter()
        .filter_map(|singer| singer.name.as_deref())
        .collect();
    if names.is_empty() {
        "Unknown Artist".to_string()
    } else {
        names.join(", ")
    }
}

fn api_headers(extractor: &QqExtractor, playlist_id: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    let referer = format!("{}/n/yqq/playlist/{}.html", extractor.web_base, playlist_id);
    if let Ok(value) = HeaderValue::from_str(&referer) {
        headers.insert("Referer", value);
    }
    headers
}

fn referer_headers(referer: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(referer) {
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
