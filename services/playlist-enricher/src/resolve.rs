//!
//! src/resolve.rs
//!
//! Stateless lookups for one track. Caching is the caller's business.
//!

use tracing::{debug, warn};

use crate::errors::EnrichError;
use crate::services::{CatalogService, TagService};
use crate::types::ReleaseYear;

async fn lookup_genres(tags: &dyn TagService, artist: &str, title: &str) ->
    Result<Vec<String>, EnrichError> {
    let Some(recording) = tags.search_recording(artist, title).await? else {
        return Ok(Vec::new());
    };

    if !recording.tags.is_empty() {
        return Ok(recording.tags);
    }

    // recording tags are sparse, the credited artist usually has some
    match recording.primary_artist_id {
        Some(artist_id) => {
            debug!(recording = %recording.id, artist_id = %artist_id, "genres.artist_fallback");
            tags.artist_tags(&artist_id).await
        }
        None => Ok(Vec::new())
    }
}

/// Genre tags for a track. Service failures are logged and read as
/// "no genres", so this never fails.
pub async fn resolve_genres(tags: &dyn TagService, artist: &str, title: &str) -> Vec<String> {
    match lookup_genres(tags, artist, title).await {
        Ok(genres) => genres,
        Err(e) => {
            warn!(artist, title, error = %e, "genres.lookup_failed");
            Vec::new()
        }
    }
}

/// Release year of an album; `Ok(None)` when the catalog has no year
pub async fn resolve_year(catalog: &dyn CatalogService, album_id: &str) ->
    Result<Option<ReleaseYear>, EnrichError> {
    Ok(catalog.album(album_id).await?.year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::RecordingMatch;
    use crate::test_utils::{FakeCatalog, FakeTagService};

    #[tokio::test]
    async fn direct_tags_skip_artist_lookup() {
        let tags = FakeTagService::new().with_recording(
            "Miles Davis", "So What",
            RecordingMatch {
                id: "rec-1".into(),
                tags: vec!["jazz".into()],
                primary_artist_id: Some("art-1".into())
            }
        ).with_artist("art-1", &["bebop"]);

        let genres = resolve_genres(&tags, "Miles Davis", "So What").await;

        assert_eq!(genres, vec!["jazz"]);
        assert_eq!(tags.search_calls(), 1);
        assert_eq!(tags.artist_calls(), 0);
    }

    #[tokio::test]
    async fn falls_back_to_artist_tags() {
        let tags = FakeTagService::new().with_recording(
            "Queen", "Untagged",
            RecordingMatch {
                id: "rec-2".into(),
                tags: Vec::new(),
                primary_artist_id: Some("art-queen".into())
            }
        ).with_artist("art-queen", &["rock", "pop"]);

        let genres = resolve_genres(&tags, "Queen", "Untagged").await;

        assert_eq!(genres, vec!["rock", "pop"]);
        assert_eq!(tags.artist_calls(), 1);
    }

    #[tokio::test]
    async fn nothing_found_is_empty() {
        let tags = FakeTagService::new().with_recording(
            "Nobody", "Credited",
            RecordingMatch { id: "rec-3".into(), ..Default::default() }
        );

        assert!(resolve_genres(&tags, "Nobody", "Credited").await.is_empty());
        assert!(resolve_genres(&tags, "Not", "Indexed").await.is_empty());
        assert_eq!(tags.artist_calls(), 0);
    }

    #[tokio::test]
    async fn service_errors_read_as_no_genres() {
        let tags = FakeTagService::new().failing();
        assert!(resolve_genres(&tags, "Any", "Song").await.is_empty());
        assert_eq!(tags.search_calls(), 1);
    }

    #[tokio::test]
    async fn artist_lookup_error_reads_as_no_genres() {
        let tags = FakeTagService::new().with_recording(
            "Queen", "Untagged",
            RecordingMatch {
                id: "rec-4".into(),
                tags: Vec::new(),
                primary_artist_id: Some("art-queen".into())
            }
        ).with_artist("art-queen", &["rock"]).failing_artists();

        assert!(resolve_genres(&tags, "Queen", "Untagged").await.is_empty());
        assert_eq!(tags.search_calls(), 1);
        assert_eq!(tags.artist_calls(), 1);
    }

    #[tokio::test]
    async fn year_found_missing_and_failing() {
        let catalog = FakeCatalog::new()
            .with_year("MPREb_year", Some(1975))
            .with_year("MPREb_none", None)
            .with_failure("MPREb_down", || EnrichError::Http("timeout".into()));

        assert_eq!(resolve_year(&catalog, "MPREb_year").await.unwrap(), Some(ReleaseYear(1975)));
        assert_eq!(resolve_year(&catalog, "MPREb_none").await.unwrap(), None);
        assert!(resolve_year(&catalog, "MPREb_down").await.is_err());
        assert_eq!(catalog.calls(), 3);
    }
}
