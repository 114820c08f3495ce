//!
//! src/fetch.rs
//!
//! Defines methods for hitting the MusicBrainz and YouTube Music endpoints
//! and returning parsed JSON. Requests are issued one at a time and are
//! never retried here.
//!

use std::time::{Duration, Instant};

use reqwest::{Client, RequestBuilder, StatusCode, header, redirect};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::{sync::Mutex, time::sleep};
use tracing::{debug, warn};
use url::Url;

use crate::config::{HttpConfig, IdentityConfig, MusicBrainzConfig, YtMusicConfig};
use crate::errors::EnrichError;

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";
const YTMUSIC_ORIGIN: &str = "https://music.youtube.com";

/// Client building functionality
fn client_helper(http: &HttpConfig) -> reqwest::ClientBuilder {
    Client::builder()
        .timeout(http.timeout)
        .connect_timeout(http.connect_timeout)
        .pool_max_idle_per_host(http.pool_max_idle_per_host)
        .pool_idle_timeout(Some(http.pool_idle_timeout))
        .redirect(redirect::Policy::limited(http.max_redirects as usize))
}

fn client_with_headers(http: &HttpConfig, headers: header::HeaderMap) ->
    Result<Client, EnrichError> {
    client_helper(http)
        .default_headers(headers)
        .build()
        .map_err(|e| EnrichError::Http(format!("build client: {e}")))
}

fn header_value(value: &str, what: &str) -> Result<header::HeaderValue, EnrichError> {
    header::HeaderValue::from_str(value)
        .map_err(|e| EnrichError::Config(format!("invalid {what}: {e}")))
}

pub fn musicbrainz_client(http: &HttpConfig, id: &IdentityConfig) ->
    Result<Client, EnrichError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    h.insert(header::USER_AGENT, header_value(&id.mb_user_agent, "mb user-agent")?);
    client_with_headers(http, h)
}

pub fn ytmusic_client(http: &HttpConfig, cfg: &YtMusicConfig) ->
    Result<Client, EnrichError> {
    let mut h = header::HeaderMap::new();
    h.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
    h.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));
    h.insert(header::ORIGIN, header::HeaderValue::from_static(YTMUSIC_ORIGIN));
    h.insert(header::USER_AGENT, header::HeaderValue::from_static(BROWSER_USER_AGENT));
    h.insert(header::ACCEPT_LANGUAGE, header_value(&cfg.language, "language")?);
    client_with_headers(http, h)
}

/// Maps a non-success status onto the error taxonomy
pub fn status_error(status: StatusCode, url: &str) -> EnrichError {
    match status {
        StatusCode::NOT_FOUND => EnrichError::NotFound(url.to_string()),
        StatusCode::TOO_MANY_REQUESTS | StatusCode::SERVICE_UNAVAILABLE =>
            EnrichError::RateLimited(format!("{status} from {url}")),
        _ => EnrichError::Http(format!("{status} from {url}"))
    }
}

/// Sends once and decodes a successful body as `T`
pub async fn send_json<T: DeserializeOwned>(request: RequestBuilder) ->
    Result<T, EnrichError> {
    let response = request.send().await?;
    let status = response.status();
    let url = response.url().to_string();

    if !status.is_success() {
        warn!(status = %status, url = %url, "http.status");
        return Err(status_error(status, &url));
    }

    let bytes = response.bytes().await?;
    serde_json::from_slice::<T>(&bytes)
        .map_err(|e| EnrichError::Parse(format!("{url}: {e}")))
}

/// Keeps consecutive requests at least `min_interval` apart
#[derive(Debug)]
pub struct RateGate {
    min_interval: Duration,
    state: Mutex<Option<Instant>>
}

impl RateGate {
    pub fn new(min_interval: Duration) -> Self {
        Self { min_interval, state: Mutex::new(None) }
    }

    pub async fn wait(&self) {
        let mut last = self.state.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[derive(Debug)]
pub struct MusicBrainzClient {
    pub http: Client,
    pub base: Url,
    rate: RateGate
}

impl MusicBrainzClient {
    pub fn new(
        http_config: &HttpConfig,
        id: &IdentityConfig,
        cfg: &MusicBrainzConfig) -> Result<Self, EnrichError> {
        let http = musicbrainz_client(http_config, id)?;
        Ok( Self {
            http,
            base: cfg.base_url.clone(),
            rate: RateGate::new(cfg.min_interval)
        })
    }

    /// GET /ws/2/recording?query=...&fmt=json&limit=
    pub fn search_recordings(&self, lucene: &str, limit: u32) ->
        Result<RequestBuilder, EnrichError> {
        let url = self.base.join("recording")?;
        Ok(self.http.get(url).query(&[
            ("query", lucene),
            ("fmt", "json"),
            ("limit", &limit.to_string())
        ]))
    }

    /// GET /ws/2/artist/{MBID}?fmt=json&inc=...
    pub fn lookup_artist(&self, mbid: &str, inc: &str) ->
        Result<RequestBuilder, EnrichError> {
        let url = self.base.join(&format!("artist/{mbid}"))?;
        Ok(self.http.get(url).query(&[("fmt", "json"), ("inc", inc)]))
    }

    /// Waits for the rate gate, then sends
    pub async fn get_json<T: DeserializeOwned>(&self, request: RequestBuilder) ->
        Result<T, EnrichError> {
        self.rate.wait().await;
        send_json(request).await
    }
}

#[derive(Debug, Clone)]
pub struct YtMusicClient {
    pub http: Client,
    pub base: Url,
    context: Value
}

impl YtMusicClient {
    pub fn new(http_config: &HttpConfig, cfg: &YtMusicConfig) -> Result<Self, EnrichError> {
        let http = ytmusic_client(http_config, cfg)?;
        let context = json!({
            "client": {
                "clientName": "WEB_REMIX",
                "clientVersion": cfg.client_version,
                "hl": cfg.language
            },
            "user": {}
        });
        Ok( Self { http, base: cfg.base_url.clone(), context } )
    }

    fn browse_request(&self, body: Value) -> Result<RequestBuilder, EnrichError> {
        let url = self.base.join("browse")?;
        Ok(self.http.post(url).query(&[("prettyPrint", "false")]).json(&body))
    }

    /// POST /youtubei/v1/browse {browseId}
    pub fn browse(&self, browse_id: &str) -> Result<RequestBuilder, EnrichError> {
        debug!(browse_id, "ytmusic.browse");
        self.browse_request(json!({ "context": self.context, "browseId": browse_id }))
    }

    /// POST /youtubei/v1/browse {continuation}
    pub fn browse_continuation(&self, token: &str) -> Result<RequestBuilder, EnrichError> {
        self.browse_request(json!({ "context": self.context, "continuation": token }))
    }
}
