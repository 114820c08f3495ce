//! src/persistent.rs
//!
//! JSON file backed key-value caches and the playlist snapshot. Everything
//! here is read whole at startup and rewritten whole at shutdown.
//!

use std::{collections::BTreeMap, fs, io::ErrorKind, path::Path};

use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info};

use crate::errors::EnrichError;
use crate::services::PlaylistSource;
use crate::sink::write_json_atomic;
use crate::types::{Playlist, ReleaseYear};

/// Reads and parses `path`, `Ok(None)` when the file does not exist
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, EnrichError> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(EnrichError::Io(std::io::Error::new(
            e.kind(), format!("read {}: {e}", path.display())
        )))
    };
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| EnrichError::Parse(format!("{}: {e}", path.display())))
}

/// Memoized lookup results keyed by string. A present key with an "empty"
/// value (`[]`, `null`) is a cached answer, not a miss.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonCache<V> {
    entries: BTreeMap<String, V>
}

pub type GenreCache = JsonCache<Vec<String>>;
pub type YearCache = JsonCache<Option<ReleaseYear>>;

impl<V> Default for JsonCache<V> {
    fn default() -> Self {
        Self { entries: BTreeMap::new() }
    }
}

impl<V: Serialize + DeserializeOwned> JsonCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty cache when the file is absent; a file that exists but does not
    /// parse is an error
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EnrichError> {
        let path = path.as_ref();
        let entries: BTreeMap<String, V> = read_json(path)?.unwrap_or_default();
        info!(path = %path.display(), entries = entries.len(), "cache.load");
        Ok( Self { entries } )
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), EnrichError> {
        let path = path.as_ref();
        write_json_atomic(path, &self.entries, true)?;
        info!(path = %path.display(), entries = self.entries.len(), "cache.save");
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `artist::title`, lowercased
pub fn genre_key(artist: &str, title: &str) -> String {
    format!("{artist}::{title}").to_lowercase()
}

/// Uses the snapshot at `path` when present, otherwise fetches the playlist
/// and stores the snapshot for later runs
pub async fn load_or_fetch_playlist(
    path: &Path,
    playlist_id: &str,
    source: &dyn PlaylistSource
) -> Result<Playlist, EnrichError> {
    if let Some(playlist) = read_json::<Playlist>(path)? {
        info!(path = %path.display(), tracks = playlist.tracks.len(), "playlist.snapshot.load");
        return Ok(playlist);
    }

    info!(playlist_id, "playlist.fetch");
    let playlist = source.playlist(playlist_id).await?;
    write_json_atomic(path, &playlist, false)?;
    debug!(path = %path.display(), tracks = playlist.tracks.len(), "playlist.snapshot.save");
    Ok(playlist)
}
