use serde::{Deserialize, Deserializer, Serialize};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_TITLE: &str = "Unknown Title";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ArtistRef {
    pub name: String,
    #[serde(default)]
    pub id: Option<String>
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AlbumRef {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<String>
}

// One playlist entry, field names follow the playlist service
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub artists: Vec<ArtistRef>,
    #[serde(rename = "isExplicit", default)]
    pub is_explicit: bool,
    #[serde(default)]
    pub duration_seconds: u64,
    #[serde(default)]
    pub album: Option<AlbumRef>
}

impl Track {
    pub fn primary_artist(&self) -> &str {
        self.artists.first()
            .map(|a| a.name.as_str())
            .unwrap_or(UNKNOWN_ARTIST)
    }

    pub fn title_or_placeholder(&self) -> &str {
        self.title.as_deref().unwrap_or(UNKNOWN_TITLE)
    }

    pub fn artist_names(&self) -> Vec<String> {
        self.artists.iter().map(|a| a.name.clone()).collect()
    }

    pub fn album_id(&self) -> Option<&str> {
        self.album.as_ref()
            .and_then(|a| a.id.as_deref())
            .filter(|id| !id.is_empty())
    }

    pub fn album_name(&self) -> &str {
        self.album.as_ref()
            .and_then(|a| a.name.as_deref())
            .unwrap_or(UNKNOWN_ALBUM)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Playlist {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tracks: Vec<Track>
}

/// Release year. Serialized as an integer, also read back from the numeric
/// strings the catalog service itself reports (`"1997"`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ReleaseYear(pub i32);

impl ReleaseYear {
    pub fn parse(s: &str) -> Option<ReleaseYear> {
        let s = s.trim();
        if s.len() == 4 && s.bytes().all(|b| b.is_ascii_digit()) {
            s.parse().ok().map(ReleaseYear)
        } else {
            None
        }
    }
}

impl<'de> Deserialize<'de> for ReleaseYear {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Int(i32),
            Text(String)
        }

        match Repr::deserialize(deserializer)? {
            Repr::Int(year) => Ok(ReleaseYear(year)),
            Repr::Text(text) => ReleaseYear::parse(&text).ok_or_else(|| {
                serde::de::Error::custom(format!("not a release year: {text:?}"))
            })
        }
    }
}

/// Output unit, one per track in playlist order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    pub title: String,
    pub artists: Vec<String>,
    pub is_explicit: bool,
    pub duration: u64,
    pub genres: Vec<String>,
    pub album: String,
    pub year: Option<ReleaseYear>
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
