//!
//! src/enricher.rs
//!
//! Walks the playlist one track at a time, resolves genres and release
//! years through the caches and collects one record per track. The run can
//! be interrupted at any point; whatever was produced is still written out.
//!

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{PathsConfig, YearFailurePolicy};
use crate::errors::EnrichError;
use crate::persistent::{GenreCache, YearCache, genre_key};
use crate::resolve::{resolve_genres, resolve_year};
use crate::services::{CatalogService, TagService};
use crate::sink::ReportSink;
use crate::types::{EnrichedRecord, ReleaseYear, Track};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnrichStats {
    pub tracks: usize,
    pub processed: usize,
    pub genre_hits: usize,
    pub genre_lookups: usize,
    pub year_hits: usize,
    pub year_lookups: usize,
    pub year_failures: usize,
    pub interrupted: bool
}

pub struct Enricher<'a> {
    tags: &'a dyn TagService,
    catalog: &'a dyn CatalogService,
    genre_cache: &'a mut GenreCache,
    year_cache: &'a mut YearCache,
    year_failures: YearFailurePolicy,
    stats: EnrichStats
}

impl<'a> Enricher<'a> {
    pub fn new(
        tags: &'a dyn TagService,
        catalog: &'a dyn CatalogService,
        genre_cache: &'a mut GenreCache,
        year_cache: &'a mut YearCache,
        year_failures: YearFailurePolicy
    ) -> Self {
        Self {
            tags,
            catalog,
            genre_cache,
            year_cache,
            year_failures,
            stats: EnrichStats::default()
        }
    }

    pub fn stats(&self) -> &EnrichStats {
        &self.stats
    }

    pub fn into_stats(self) -> EnrichStats {
        self.stats
    }

    async fn genres_for(&mut self, artist: &str, title: &str) -> Vec<String> {
        let key = genre_key(artist, title);
        if let Some(genres) = self.genre_cache.get(&key) {
            self.stats.genre_hits += 1;
            return genres.clone();
        }

        self.stats.genre_lookups += 1;
        let genres = resolve_genres(self.tags, artist, title).await;
        self.genre_cache.insert(key, genres.clone());
        genres
    }

    async fn year_for(&mut self, album_id: &str) -> Option<ReleaseYear> {
        if let Some(year) = self.year_cache.get(album_id) {
            self.stats.year_hits += 1;
            return *year;
        }

        self.stats.year_lookups += 1;
        match resolve_year(self.catalog, album_id).await {
            Ok(year) => {
                self.year_cache.insert(album_id, year);
                year
            }
            Err(e) => {
                self.stats.year_failures += 1;
                let cached = match self.year_failures {
                    YearFailurePolicy::Cache => true,
                    YearFailurePolicy::Retry => !e.is_transient()
                };
                warn!(album_id, error = %e, cached, "year.lookup_failed");
                if cached {
                    self.year_cache.insert(album_id, None);
                }
                None
            }
        }
    }

    pub async fn enrich_track(&mut self, track: &Track) -> EnrichedRecord {
        let artist = track.primary_artist();
        let title = track.title_or_placeholder();
        let genres = self.genres_for(artist, title).await;

        let year = match track.album_id() {
            Some(album_id) => self.year_for(album_id).await,
            None => None
        };

        EnrichedRecord {
            title: title.to_string(),
            artists: track.artist_names(),
            is_explicit: track.is_explicit,
            duration: track.duration_seconds,
            genres,
            album: track.album_name().to_string(),
            year
        }
    }

    /// Enriches `tracks` in order until done or `shutdown` fires. A track
    /// whose lookups were cut short yields no record.
    pub async fn run(&mut self, tracks: &[Track], shutdown: &CancellationToken) ->
        Vec<EnrichedRecord> {
        self.stats.tracks = tracks.len();
        let mut out = Vec::with_capacity(tracks.len());

        for (index, track) in tracks.iter().enumerate() {
            let record = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                record = self.enrich_track(track) => Some(record),
            };

            let Some(record) = record else {
                self.stats.interrupted = true;
                warn!(processed = index, total = tracks.len(), "enrich.interrupted");
                break;
            };

            debug!(
                position = index + 1, total = tracks.len(),
                title = %record.title, genres = record.genres.len(),
                year = ?record.year, "enrich.track"
            );
            out.push(record);
            self.stats.processed += 1;
        }
        out
    }
}

/// Writes the report, then both caches. A failed write does not stop the
/// remaining ones; the first error is returned.
pub fn finalize(
    paths: &PathsConfig,
    records: &[EnrichedRecord],
    genre_cache: &GenreCache,
    year_cache: &YearCache
) -> Result<(), EnrichError> {
    info!(records = records.len(), "enrich.finalize");
    let results = [
        ("report", ReportSink::new(&paths.report).write(records).map(|_| ())),
        ("genre_cache", genre_cache.save(&paths.genre_cache)),
        ("year_cache", year_cache.save(&paths.year_cache)),
    ];

    let mut first_error = None;
    for (what, result) in results {
        if let Err(e) = result {
            error!(what, error = %e, "enrich.finalize.failed");
            first_error.get_or_insert(e);
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(())
    }
}

/// Loads both caches, enriches `tracks` and always finalizes, whether the
/// loop ran to the end or was interrupted
pub async fn run_session(
    paths: &PathsConfig,
    tracks: &[Track],
    tags: &dyn TagService,
    catalog: &dyn CatalogService,
    year_failures: YearFailurePolicy,
    shutdown: &CancellationToken
) -> Result<EnrichStats, EnrichError> {
    let mut genre_cache = GenreCache::load(&paths.genre_cache)?;
    let mut year_cache = YearCache::load(&paths.year_cache)?;

    let (records, stats) = {
        let mut enricher = Enricher::new(
            tags, catalog, &mut genre_cache, &mut year_cache, year_failures
        );
        let records = enricher.run(tracks, shutdown).await;
        (records, enricher.into_stats())
    };

    finalize(paths, &records, &genre_cache, &year_cache)?;

    info!(
        processed = stats.processed,
        total = stats.tracks,
        genre_hits = stats.genre_hits,
        genre_lookups = stats.genre_lookups,
        year_hits = stats.year_hits,
        year_lookups = stats.year_lookups,
        year_failures = stats.year_failures,
        interrupted = stats.interrupted,
        "enrich.done"
    );
    Ok(stats)
}
