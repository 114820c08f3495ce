//!
//! src/ytmusic.rs
//!
//! Playlist source and album catalog backed by the YouTube Music InnerTube
//! `browse` endpoint. The payloads are deeply nested renderer trees, so
//! the parsers walk them with JSON pointers and skip whatever they do not
//! recognize instead of failing the whole page.
//!

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::EnrichError;
use crate::fetch::{YtMusicClient, send_json};
use crate::services::{AlbumDetails, CatalogService, PlaylistSource};
use crate::types::{AlbumRef, ArtistRef, Playlist, ReleaseYear, Track};

/// Upper bound on continuation pages, 100 tracks each
const MAX_PAGES: usize = 200;

const SHELF_PATHS: [&str; 2] = [
    "/contents/twoColumnBrowseResultsRenderer/secondaryContents/sectionListRenderer\
     /contents/0/musicPlaylistShelfRenderer/contents",
    "/contents/singleColumnBrowseResultsRenderer/tabs/0/tabRenderer/content\
     /sectionListRenderer/contents/0/musicPlaylistShelfRenderer/contents",
];

const CONTINUATION_ITEMS: &str =
    "/onResponseReceivedActions/0/appendContinuationItemsAction/continuationItems";

const HEADER_PATHS: [&str; 3] = [
    "/contents/twoColumnBrowseResultsRenderer/tabs/0/tabRenderer/content\
     /sectionListRenderer/contents/0/musicResponsiveHeaderRenderer",
    "/header/musicDetailHeaderRenderer",
    "/header/musicEditablePlaylistDetailHeaderRenderer/header/musicDetailHeaderRenderer",
];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistPage {
    pub title: Option<String>,
    pub tracks: Vec<Track>,
    pub continuation: Option<String>
}

pub fn playlist_browse_id(playlist_id: &str) -> String {
    if playlist_id.starts_with("VL") {
        playlist_id.to_string()
    } else {
        format!("VL{playlist_id}")
    }
}

fn text(value: &Value, pointer: &str) -> Option<String> {
    value.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn header(value: &Value) -> Option<&Value> {
    HEADER_PATHS.iter().find_map(|path| value.pointer(path))
}

fn browse_id(run: &Value) -> Option<String> {
    text(run, "/navigationEndpoint/browseEndpoint/browseId")
}

/// `3:45` or `1:02:03` to seconds
pub fn parse_duration(s: &str) -> Option<u64> {
    s.trim().split(':').try_fold(0_u64, |acc, part| {
        let n = part.parse::<u64>().ok()?;
        acc.checked_mul(60)?.checked_add(n)
    })
}

fn flex_runs(renderer: &Value, column: usize) -> Option<&Vec<Value>> {
    renderer.pointer(&format!(
        "/flexColumns/{column}/musicResponsiveListItemFlexColumnRenderer/text/runs"
    )).and_then(Value::as_array)
}

fn is_explicit(renderer: &Value) -> bool {
    renderer.get("badges")
        .and_then(Value::as_array)
        .is_some_and(|badges| badges.iter().any(|badge| {
            let badge = &badge["musicInlineBadgeRenderer"];
            badge.pointer("/accessibilityData/accessibilityData/label")
                .and_then(Value::as_str) == Some("Explicit")
                || badge.pointer("/icon/iconType")
                    .and_then(Value::as_str) == Some("MUSIC_EXPLICIT_BADGE")
        }))
}

/// One `musicResponsiveListItemRenderer` row, None for anything else
pub fn parse_track(item: &Value) -> Option<Track> {
    let renderer = item.get("musicResponsiveListItemRenderer")?;

    let title = flex_runs(renderer, 0)
        .and_then(|runs| runs.first())
        .and_then(|run| text(run, "/text"));

    // separators (" & ", ", ") sit on the odd positions
    let artists = flex_runs(renderer, 1)
        .map(|runs| runs.iter()
            .step_by(2)
            .filter_map(|run| {
                let name = text(run, "/text")?;
                (!name.trim().is_empty()).then(|| ArtistRef { name, id: browse_id(run) })
            })
            .collect())
        .unwrap_or_default();

    let album = flex_runs(renderer, 2)
        .and_then(|runs| runs.first())
        .map(|run| AlbumRef { name: text(run, "/text"), id: browse_id(run) })
        .filter(|album| album.name.is_some() || album.id.is_some());

    let duration_seconds = text(
        renderer,
        "/fixedColumns/0/musicResponsiveListItemFixedColumnRenderer/text/runs/0/text"
    )
        .or_else(|| text(
            renderer,
            "/fixedColumns/0/musicResponsiveListItemFixedColumnRenderer/text/simpleText"
        ))
        .and_then(|d| parse_duration(&d))
        .unwrap_or(0);

    Some(Track {
        title,
        artists,
        is_explicit: is_explicit(renderer),
        duration_seconds,
        album
    })
}

fn parse_items(items: &[Value]) -> (Vec<Track>, Option<String>) {
    let tracks = items.iter().filter_map(parse_track).collect();
    let continuation = items.iter().find_map(|item| text(
        item, "/continuationItemRenderer/continuationEndpoint/continuationCommand/token"
    ));
    (tracks, continuation)
}

/// First page of a playlist browse, None when there is no track shelf
pub fn parse_playlist_page(value: &Value) -> Option<PlaylistPage> {
    let items = SHELF_PATHS.iter()
        .find_map(|path| value.pointer(path))
        .and_then(Value::as_array)?;
    let (tracks, continuation) = parse_items(items);
    let title = header(value).and_then(|h| text(h, "/title/runs/0/text"));
    Some(PlaylistPage { title, tracks, continuation })
}

/// Follow up page, an absent item list is an empty last page
pub fn parse_continuation_page(value: &Value) -> PlaylistPage {
    let (tracks, continuation) = value.pointer(CONTINUATION_ITEMS)
        .and_then(Value::as_array)
        .map(|items| parse_items(items))
        .unwrap_or_default();
    PlaylistPage { title: None, tracks, continuation }
}

/// Album browse; the year is the four digit run of the header subtitle
pub fn parse_album(value: &Value) -> Result<AlbumDetails, EnrichError> {
    let header = header(value)
        .ok_or_else(|| EnrichError::Parse("album header missing".to_string()))?;

    let year = header.pointer("/subtitle/runs")
        .and_then(Value::as_array)
        .and_then(|runs| runs.iter().find_map(|run| {
            run.get("text").and_then(Value::as_str).and_then(ReleaseYear::parse)
        }));

    Ok(AlbumDetails { title: text(header, "/title/runs/0/text"), year })
}

#[async_trait]
impl PlaylistSource for YtMusicClient {
    async fn playlist(&self, playlist_id: &str) -> Result<Playlist, EnrichError> {
        let first: Value = send_json(self.browse(&playlist_browse_id(playlist_id))?).await?;
        let page = parse_playlist_page(&first)
            .ok_or_else(|| EnrichError::NotFound(format!("playlist {playlist_id}")))?;

        let mut tracks = page.tracks;
        let mut token = page.continuation;
        let mut pages = 1_usize;

        while let Some(current) = token.take() {
            if pages >= MAX_PAGES {
                warn!(playlist_id, pages, "ytmusic.playlist.truncated");
                break;
            }
            let value: Value = send_json(self.browse_continuation(&current)?).await?;
            let next = parse_continuation_page(&value);
            pages += 1;
            debug!(playlist_id, pages, tracks = next.tracks.len(), "ytmusic.playlist.page");

            tracks.extend(next.tracks);
            token = next.continuation.filter(|t| *t != current);
        }

        Ok(Playlist {
            id: Some(playlist_id.to_string()),
            title: page.title,
            tracks
        })
    }
}

#[async_trait]
impl CatalogService for YtMusicClient {
    async fn album(&self, album_id: &str) -> Result<AlbumDetails, EnrichError> {
        let value: Value = send_json(self.browse(album_id)?).await?;
        parse_album(&value)
    }
}
