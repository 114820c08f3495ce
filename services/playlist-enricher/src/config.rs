//!
//! src/config.rs
//!
//! Builds the enricher's configuration from the environment (and a .env
//! file when present). Every builder takes an `Env` lookup so it can be
//! exercised without touching the process environment.
//!

use std::{path::PathBuf, time};
use url::Url;

use crate::errors::EnrichError;

/// Constants for HTTP Config
pub const HTTP_TIMEOUT: u64 = 8000;
pub const HTTP_CONNECT_TIMEOUT: u64 = 2000;
pub const HTTP_POOL_MAX_IDLE: usize = 4;
pub const HTTP_POOL_IDLE_TIMEOUT: u64 = 90000;
pub const HTTP_MAX_REDIRECTS: u8 = 4;

/// MusicBrainz asks for no more than one request per second
pub const MB_MIN_INTERVAL: u64 = 1100;

pub const DEFAULT_PLAYLIST_ID: &str = "PLIgbDqfLovfQ8o5jWuQFL0p36vLxu1487";
pub const DEFAULT_YTMUSIC_CLIENT_VERSION: &str = "1.20241023.01.00";

pub const PLAYLIST_SNAPSHOT_FILE: &str = "playlist_cache.json";
pub const GENRE_CACHE_FILE: &str = "genre_cache.json";
pub const ALBUM_YEAR_CACHE_FILE: &str = "album_year_cache.json";
pub const REPORT_FILE: &str = "out.json";

/// Environment lookup, `std::env::var` in production
pub type Env<'a> = &'a dyn Fn(&str) -> Option<String>;

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Non-empty value or None
fn env_opt(env: Env, key: &str) -> Option<String> {
    env(key).filter(|v| !v.trim().is_empty())
}

fn env_or(env: Env, key: &str, default: &str) -> String {
    env_opt(env, key).unwrap_or_else(|| default.to_string())
}

fn env_to_u64(env: Env, key: &str, default: u64) -> Result<u64, EnrichError> {
    match env_opt(env, key) {
        Some(v) => v.trim().parse::<u64>()
            .map_err(|e| EnrichError::Config(format!("{key} invalid: {e}"))),
        None => Ok(default)
    }
}

/// Ensures that url is https
fn ensure_https(url: &Url) -> Result<(), String> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(format!("URL must be https: {url}"))
    }
}

fn ensure_host(url: &Url, expected_host: &str) -> Result<(), String> {
    match url.host_str() {
        Some(h) if h.eq_ignore_ascii_case(expected_host) => Ok(()),
        Some(h) => Err(
            format!("Unexpected host for {url} (got {h}, expected {expected_host})")
        ),
        None => Err(format!("URL missing host: {url}"))
    }
}

/// Parses and validates a service base url, forcing a trailing slash so
/// that `Url::join` keeps the full path
fn service_url(env: Env, key: &str, default: &str, host: &str) ->
    Result<Url, EnrichError> {
    let raw = env_or(env, key, default);
    let mut url = Url::parse(&raw)
        .map_err(|e| EnrichError::Config(format!("{key} invalid {e}")))?;

    ensure_https(&url).map_err(EnrichError::Config)?;
    ensure_host(&url, host).map_err(EnrichError::Config)?;

    if !url.path().ends_with('/') {
        let mut path = url.path().to_string();
        path.push('/');
        url.set_path(&path);
    }
    Ok(url)
}

/// Identity MusicBrainz expects in the User-Agent of every request
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    pub mb_user_agent: String,
}

fn build_identity(env: Env) -> IdentityConfig {
    let application = env_or(
        env,
        "APPLICATION",
        concat!("playlist-enricher/", env!("CARGO_PKG_VERSION"))
    );
    let header = env_or(
        env,
        "MUSIC_BRAINZ_HEADER",
        "( https://github.com/playlist-enricher )"
    );
    IdentityConfig { mb_user_agent: format!("{application} {header}") }
}

///
/// Configuration for Http timeouts, pooling, etc.
///
#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub timeout: time::Duration,
    pub connect_timeout: time::Duration,
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: time::Duration,
    pub max_redirects: u8,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: time::Duration::from_millis(HTTP_TIMEOUT),
            connect_timeout: time::Duration::from_millis(HTTP_CONNECT_TIMEOUT),
            pool_max_idle_per_host: HTTP_POOL_MAX_IDLE,
            pool_idle_timeout: time::Duration::from_millis(HTTP_POOL_IDLE_TIMEOUT),
            max_redirects: HTTP_MAX_REDIRECTS,
        }
    }
}

///
/// Configuration for musicbrainz api
///
#[derive(Debug, Clone)]
pub struct MusicBrainzConfig {
    pub base_url: Url,                 // https://musicbrainz.org/ws/2/
    pub min_interval: time::Duration,  // spacing between two requests
}

fn build_musicbrainz(env: Env) -> Result<MusicBrainzConfig, EnrichError> {
    let base_url = service_url(
        env, "MB_BASE_URL", "https://musicbrainz.org/ws/2/", "musicbrainz.org"
    )?;
    let min_interval = time::Duration::from_millis(
        env_to_u64(env, "MB_MIN_INTERVAL_MS", MB_MIN_INTERVAL)?
    );
    Ok( MusicBrainzConfig { base_url, min_interval } )
}

///
/// Configuration for the YouTube Music InnerTube api
///
#[derive(Debug, Clone)]
pub struct YtMusicConfig {
    pub base_url: Url,          // https://music.youtube.com/youtubei/v1/
    pub client_version: String,
    pub language: String,
}

fn build_ytmusic(env: Env) -> Result<YtMusicConfig, EnrichError> {
    let base_url = service_url(
        env, "YTMUSIC_BASE_URL", "https://music.youtube.com/youtubei/v1/",
        "music.youtube.com"
    )?;
    let client_version = env_or(
        env, "YTMUSIC_CLIENT_VERSION", DEFAULT_YTMUSIC_CLIENT_VERSION
    );
    let language = env_or(env, "YTMUSIC_LANGUAGE", "en");
    Ok( YtMusicConfig { base_url, client_version, language } )
}

///
/// Locations of the snapshot, both caches and the report
///
#[derive(Debug, Clone)]
pub struct PathsConfig {
    pub playlist_snapshot: PathBuf,
    pub genre_cache: PathBuf,
    pub year_cache: PathBuf,
    pub report: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            playlist_snapshot: PathBuf::from(PLAYLIST_SNAPSHOT_FILE),
            genre_cache: PathBuf::from(GENRE_CACHE_FILE),
            year_cache: PathBuf::from(ALBUM_YEAR_CACHE_FILE),
            report: PathBuf::from(REPORT_FILE),
        }
    }
}

fn build_paths(env: Env) -> PathsConfig {
    let path = |key: &str, default: &str| PathBuf::from(env_or(env, key, default));
    PathsConfig {
        playlist_snapshot: path("PLAYLIST_SNAPSHOT", PLAYLIST_SNAPSHOT_FILE),
        genre_cache: path("GENRE_CACHE", GENRE_CACHE_FILE),
        year_cache: path("ALBUM_YEAR_CACHE", ALBUM_YEAR_CACHE_FILE),
        report: path("REPORT", REPORT_FILE),
    }
}

//
// What to remember about an album lookup that failed
//
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YearFailurePolicy {
    /// cache null for any failure, never look the album up again
    #[default]
    Cache,
    /// leave transient failures uncached so the next run retries them
    Retry,
}

impl YearFailurePolicy {
    pub fn parse(s: &str) -> Option<YearFailurePolicy> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cache" => Some(YearFailurePolicy::Cache),
            "retry" => Some(YearFailurePolicy::Retry),
            _ => None
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnrichConfig {
    pub playlist_id: String,
    pub year_failures: YearFailurePolicy,
}

fn build_enrich(env: Env) -> Result<EnrichConfig, EnrichError> {
    let playlist_id = env_or(env, "PLAYLIST_ID", DEFAULT_PLAYLIST_ID);
    let year_failures = match env_opt(env, "YEAR_LOOKUP_FAILURES") {
        Some(v) => YearFailurePolicy::parse(&v).ok_or_else(|| EnrichError::Config(
            format!("YEAR_LOOKUP_FAILURES must be cache or retry, got {v}")
        ))?,
        None => YearFailurePolicy::default()
    };
    Ok( EnrichConfig { playlist_id, year_failures } )
}

///
/// Configuration for Logger
///

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub filter_directives: String,
    pub format: LogFormat,
    pub with_ansi: bool,
    pub include_file_line: bool,
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter_directives: "info,playlist_enricher=debug,reqwest=warn".to_string(),
            format: LogFormat::Pretty,
            with_ansi: true,
            include_file_line: false,
            include_target: true,
        }
    }
}

fn build_logging(env: Env) -> Result<LoggingConfig, EnrichError> {
    let mut cfg = LoggingConfig::default();
    if let Some(format) = env_opt(env, "LOG_FORMAT") {
        cfg.format = match format.trim().to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            "json" => LogFormat::Json,
            other => return Err(EnrichError::Config(
                format!("LOG_FORMAT must be pretty or json, got {other}")
            ))
        };
    }
    // json lines go to collectors, keep them free of escape codes
    cfg.with_ansi = cfg.format == LogFormat::Pretty;
    cfg.include_file_line = cfg.format == LogFormat::Json;
    Ok(cfg)
}

///
/// AppConfig which holds everything main needs to wire the run
///
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub identity: IdentityConfig,
    pub http: HttpConfig,
    pub musicbrainz: MusicBrainzConfig,
    pub ytmusic: YtMusicConfig,
    pub paths: PathsConfig,
    pub enrich: EnrichConfig,
    pub logging: LoggingConfig
}

///
/// Return all environment variables to caller at program start.
///
pub fn load_config() -> Result<AppConfig, EnrichError> {
    dotenvy::dotenv().ok();
    load_config_from(&process_env)
}

pub fn load_config_from(env: Env) -> Result<AppConfig, EnrichError> {
    let identity    = build_identity(env);
    let http        = HttpConfig::default();
    let musicbrainz = build_musicbrainz(env)?;
    let ytmusic     = build_ytmusic(env)?;
    let paths       = build_paths(env);
    let enrich      = build_enrich(env)?;
    let logging     = build_logging(env)?;

    Ok( AppConfig {
        identity, http, musicbrainz, ytmusic, paths, enrich, logging
    } )
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_environment() {
        let env = env_of(&[]);
        let cfg = load_config_from(&env).unwrap();

        assert_eq!(cfg.enrich.playlist_id, DEFAULT_PLAYLIST_ID);
        assert_eq!(cfg.enrich.year_failures, YearFailurePolicy::Cache);
        assert_eq!(cfg.paths.genre_cache, PathBuf::from("genre_cache.json"));
        assert_eq!(cfg.paths.year_cache, PathBuf::from("album_year_cache.json"));
        assert_eq!(cfg.paths.report, PathBuf::from("out.json"));
        assert_eq!(cfg.musicbrainz.base_url.as_str(), "https://musicbrainz.org/ws/2/");
        assert_eq!(cfg.musicbrainz.min_interval, time::Duration::from_millis(1100));
        assert!(cfg.identity.mb_user_agent.starts_with("playlist-enricher/"));
        assert_eq!(cfg.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn environment_overrides() {
        let env = env_of(&[
            ("PLAYLIST_ID", "PLabc"),
            ("YEAR_LOOKUP_FAILURES", "Retry"),
            ("REPORT", "reports/run.json"),
            ("MB_BASE_URL", "https://musicbrainz.org/ws/2"),
            ("MB_MIN_INTERVAL_MS", "2000"),
            ("APPLICATION", "tester/1.0"),
            ("MUSIC_BRAINZ_HEADER", "( me@example.com )"),
            ("LOG_FORMAT", "json"),
        ]);
        let cfg = load_config_from(&env).unwrap();

        assert_eq!(cfg.enrich.playlist_id, "PLabc");
        assert_eq!(cfg.enrich.year_failures, YearFailurePolicy::Retry);
        assert_eq!(cfg.paths.report, PathBuf::from("reports/run.json"));
        // trailing slash is restored
        assert_eq!(cfg.musicbrainz.base_url.as_str(), "https://musicbrainz.org/ws/2/");
        assert_eq!(cfg.musicbrainz.min_interval, time::Duration::from_millis(2000));
        assert_eq!(cfg.identity.mb_user_agent, "tester/1.0 ( me@example.com )");
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert!(!cfg.logging.with_ansi);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let env = env_of(&[("PLAYLIST_ID", "   ")]);
        let cfg = load_config_from(&env).unwrap();
        assert_eq!(cfg.enrich.playlist_id, DEFAULT_PLAYLIST_ID);
    }

    #[test]
    fn rejects_plain_http_and_foreign_hosts() {
        let env = env_of(&[("MB_BASE_URL", "http://musicbrainz.org/ws/2/")]);
        assert!(matches!(load_config_from(&env), Err(EnrichError::Config(_))));

        let env = env_of(&[("YTMUSIC_BASE_URL", "https://example.com/youtubei/v1/")]);
        assert!(matches!(load_config_from(&env), Err(EnrichError::Config(_))));
    }

    #[test]
    fn rejects_unknown_policy_and_bad_numbers() {
        let env = env_of(&[("YEAR_LOOKUP_FAILURES", "sometimes")]);
        assert!(matches!(load_config_from(&env), Err(EnrichError::Config(_))));

        let env = env_of(&[("MB_MIN_INTERVAL_MS", "soon")]);
        assert!(matches!(load_config_from(&env), Err(EnrichError::Config(_))));
    }
}
