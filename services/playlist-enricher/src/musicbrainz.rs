//!
//! src/musicbrainz.rs
//!
//! Tagging service backed by the MusicBrainz web service. Only the fields
//! the genre lookup needs are deserialized; everything else in the payload
//! is ignored.
//!

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::errors::EnrichError;
use crate::fetch::MusicBrainzClient;
use crate::services::{RecordingMatch, TagService};

#[derive(Debug, Clone, Deserialize)]
pub struct RecordingSearch {
    #[serde(default)]
    pub recordings: Vec<Recording>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Recording {
    pub id: String,
    #[serde(default)]
    pub artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    pub tags: Vec<Tag>
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistCredit {
    pub artist: CreditedArtist
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditedArtist {
    pub id: String
}

#[derive(Debug, Clone, Deserialize)]
pub struct Tag {
    pub name: String
}

#[derive(Debug, Clone, Deserialize)]
pub struct ArtistLookup {
    #[serde(default)]
    pub tags: Vec<Tag>
}

impl From<Recording> for RecordingMatch {
    fn from(recording: Recording) -> Self {
        RecordingMatch {
            primary_artist_id: recording.artist_credit.into_iter()
                .next()
                .map(|credit| credit.artist.id),
            tags: recording.tags.into_iter().map(|t| t.name).collect(),
            id: recording.id
        }
    }
}

const LUCENE_SPECIAL: &str = r#"+-&|!(){}[]^"~*?:\/"#;

/// Backslash-escapes Lucene syntax and lowercases, so the value is searched
/// as loose terms rather than an exact phrase
fn lucene_terms(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if LUCENE_SPECIAL.contains(c) {
            out.push('\\');
        }
        out.push(c);
    }
    out.to_lowercase()
}

/// Ranked (non-strict) search, so titles carrying "(feat. X)" or
/// "- Live" still match the plain recording
pub fn recording_query(artist: &str, title: &str) -> String {
    format!("artist:({}) recording:({})", lucene_terms(artist), lucene_terms(title))
}

#[async_trait]
impl TagService for MusicBrainzClient {
    async fn search_recording(&self, artist: &str, title: &str) ->
        Result<Option<RecordingMatch>, EnrichError> {
        let request = self.search_recordings(&recording_query(artist, title), 1)?;
        let search: RecordingSearch = self.get_json(request).await?;
        let hit = search.recordings.into_iter().next().map(RecordingMatch::from);
        debug!(artist, title, found = hit.is_some(), "musicbrainz.search");
        Ok(hit)
    }

    async fn artist_tags(&self, artist_id: &str) -> Result<Vec<String>, EnrichError> {
        let request = self.lookup_artist(artist_id, "tags")?;
        let artist: ArtistLookup = self.get_json(request).await?;
        Ok(artist.tags.into_iter().map(|t| t.name).collect())
    }
}
