//!
//! src/services.rs
//!
//! Boundaries to the external services the enricher talks to. The pipeline
//! and resolvers only see these traits; `fetch.rs` and friends provide the
//! http backed implementations.
//!

use async_trait::async_trait;

use crate::errors::EnrichError;
use crate::types::{Playlist, ReleaseYear};

/// Best ranked recording for an artist/title search
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RecordingMatch {
    pub id: String,
    /// Tag names attached to the recording itself, in service order
    pub tags: Vec<String>,
    pub primary_artist_id: Option<String>
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlbumDetails {
    pub title: Option<String>,
    pub year: Option<ReleaseYear>
}

#[async_trait]
pub trait PlaylistSource: Send + Sync {
    async fn playlist(&self, playlist_id: &str) -> Result<Playlist, EnrichError>;
}

#[async_trait]
pub trait TagService: Send + Sync {
    /// At most one recording; `Ok(None)` when nothing matched
    async fn search_recording(&self, artist: &str, title: &str) ->
        Result<Option<RecordingMatch>, EnrichError>;

    /// Tag names of an artist, empty when the artist has none
    async fn artist_tags(&self, artist_id: &str) -> Result<Vec<String>, EnrichError>;
}

#[async_trait]
pub trait CatalogService: Send + Sync {
    async fn album(&self, album_id: &str) -> Result<AlbumDetails, EnrichError>;
}
