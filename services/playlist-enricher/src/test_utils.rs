//! In-process stand-ins for the external services. They answer from fixed
//! tables and count calls so tests can assert how often the network would
//! have been hit.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::errors::EnrichError;
use crate::services::{
    AlbumDetails, CatalogService, PlaylistSource, RecordingMatch, TagService
};
use crate::types::{AlbumRef, ArtistRef, Playlist, ReleaseYear, Track};

/// Track with one artist and, when `album_id` is set, an album named after it
pub fn track(artist: &str, title: &str, album_id: Option<&str>) -> Track {
    Track {
        title: Some(title.to_string()),
        artists: vec![ArtistRef { name: artist.to_string(), id: None }],
        is_explicit: false,
        duration_seconds: 180,
        album: album_id.map(|id| AlbumRef {
            name: Some(format!("{id} album")),
            id: Some(id.to_string())
        })
    }
}

#[derive(Default)]
pub struct FakeTagService {
    recordings: HashMap<(String, String), RecordingMatch>,
    artists: HashMap<String, Vec<String>>,
    failing: bool,
    failing_artists: bool,
    hang_at: Option<(usize, CancellationToken)>,
    search_calls: AtomicUsize,
    artist_calls: AtomicUsize
}

impl FakeTagService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recording(mut self, artist: &str, title: &str, hit: RecordingMatch) -> Self {
        self.recordings.insert((artist.to_string(), title.to_string()), hit);
        self
    }

    pub fn with_artist(mut self, artist_id: &str, tags: &[&str]) -> Self {
        self.artists.insert(
            artist_id.to_string(),
            tags.iter().map(|t| t.to_string()).collect()
        );
        self
    }

    /// Every call fails with a transport error
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Searches answer normally, artist lookups fail with a transport error
    pub fn failing_artists(mut self) -> Self {
        self.failing_artists = true;
        self
    }

    /// The `call`-th search (1-based) cancels `token` and never returns,
    /// like a request still in flight when the user hits Ctrl-C
    pub fn hang_at(mut self, call: usize, token: CancellationToken) -> Self {
        self.hang_at = Some((call, token));
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn artist_calls(&self) -> usize {
        self.artist_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagService for FakeTagService {
    async fn search_recording(&self, artist: &str, title: &str) ->
        Result<Option<RecordingMatch>, EnrichError> {
        let call = self.search_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.hang_at {
            if *at == call {
                token.cancel();
                std::future::pending::<()>().await;
            }
        }
        if self.failing {
            return Err(EnrichError::Http("connection reset".to_string()));
        }
        Ok(self.recordings.get(&(artist.to_string(), title.to_string())).cloned())
    }

    async fn artist_tags(&self, artist_id: &str) -> Result<Vec<String>, EnrichError> {
        self.artist_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing || self.failing_artists {
            return Err(EnrichError::Http("connection reset".to_string()));
        }
        Ok(self.artists.get(artist_id).cloned().unwrap_or_default())
    }
}

enum AlbumAnswer {
    Year(Option<i32>),
    Fail(fn() -> EnrichError)
}

#[derive(Default)]
pub struct FakeCatalog {
    albums: HashMap<String, AlbumAnswer>,
    calls: AtomicUsize
}

impl FakeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_year(mut self, album_id: &str, year: Option<i32>) -> Self {
        self.albums.insert(album_id.to_string(), AlbumAnswer::Year(year));
        self
    }

    pub fn with_failure(mut self, album_id: &str, error: fn() -> EnrichError) -> Self {
        self.albums.insert(album_id.to_string(), AlbumAnswer::Fail(error));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CatalogService for FakeCatalog {
    async fn album(&self, album_id: &str) -> Result<AlbumDetails, EnrichError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.albums.get(album_id) {
            Some(AlbumAnswer::Year(year)) => Ok(AlbumDetails {
                title: Some(format!("{album_id} album")),
                year: year.map(ReleaseYear)
            }),
            Some(AlbumAnswer::Fail(error)) => Err(error()),
            None => Err(EnrichError::NotFound(album_id.to_string()))
        }
    }
}

pub struct FakePlaylistSource {
    playlist: Playlist,
    calls: AtomicUsize
}

impl FakePlaylistSource {
    pub fn new(playlist: Playlist) -> Self {
        Self { playlist, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaylistSource for FakePlaylistSource {
    async fn playlist(&self, _playlist_id: &str) -> Result<Playlist, EnrichError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.playlist.clone())
    }
}
