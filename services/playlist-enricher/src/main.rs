//!
//! src/main.rs
//!
//! Entry point: loads configuration, wires the service clients and runs one
//! enrichment session over the configured playlist. Ctrl-C stops the track
//! loop early; the report and caches are written either way.
//!
//!

mod config;
mod errors;
mod logging;

mod enricher;
mod fetch;
mod musicbrainz;
mod persistent;
mod resolve;
mod services;
mod sink;
mod types;
mod ytmusic;

#[cfg(test)]
mod test_utils;

use std::future::Future;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::errors::EnrichError;

/// Spawns a task cancelling `shutdown` once `signal` resolves. Returns only
/// after that task has been polled, so the handler is registered even if the
/// caller then runs for a while without yielding.
async fn arm_interrupt<S>(signal: S, shutdown: CancellationToken) -> JoinHandle<()>
where
    S: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let trigger = tokio::spawn(async move {
        if signal.await.is_ok() {
            warn!(msg = "interrupted, saving anyway", "enrich.signal");
            shutdown.cancel();
        }
    });
    tokio::task::yield_now().await;
    trigger
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), EnrichError> {
    let cfgs = config::load_config()?;
    let _logger = logging::init_logging(&cfgs.logging)?;

    info!(
        service = "playlist-enricher",
        version = %env!("CARGO_PKG_VERSION"),
        playlist_id = %cfgs.enrich.playlist_id,
        "starting"
    );

    let ytmusic = fetch::YtMusicClient::new(&cfgs.http, &cfgs.ytmusic)?;
    let musicbrainz = fetch::MusicBrainzClient::new(
        &cfgs.http,
        &cfgs.identity,
        &cfgs.musicbrainz
    )?;

    let playlist = persistent::load_or_fetch_playlist(
        &cfgs.paths.playlist_snapshot,
        &cfgs.enrich.playlist_id,
        &ytmusic
    ).await?;

    let shutdown = CancellationToken::new();
    let trigger = arm_interrupt(tokio::signal::ctrl_c(), shutdown.clone()).await;

    let result = enricher::run_session(
        &cfgs.paths,
        &playlist.tracks,
        &musicbrainz,
        &ytmusic,
        cfgs.enrich.year_failures,
        &shutdown
    ).await;

    trigger.abort();
    let stats = result?;
    info!(processed = stats.processed, total = stats.tracks, "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::Poll;

    use super::*;

    #[tokio::test]
    async fn interrupt_handler_is_registered_before_returning() {
        let registered = Arc::new(AtomicBool::new(false));
        let signal = {
            let registered = registered.clone();
            std::future::poll_fn(move |_| {
                registered.store(true, Ordering::SeqCst);
                Poll::<std::io::Result<()>>::Pending
            })
        };

        let trigger = arm_interrupt(signal, CancellationToken::new()).await;

        assert!(registered.load(Ordering::SeqCst));
        trigger.abort();
    }

    #[tokio::test]
    async fn signal_cancels_the_token() {
        let shutdown = CancellationToken::new();
        let trigger = arm_interrupt(async { Ok::<(), std::io::Error>(()) }, shutdown.clone()).await;

        trigger.await.unwrap();
        assert!(shutdown.is_cancelled());
    }
}
