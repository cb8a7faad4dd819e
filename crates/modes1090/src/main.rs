#![doc = include_str!("../readme.md")]

mod cli;
mod config;
mod net;
mod router;
mod sample;
mod tick;

use std::path::PathBuf;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use modes_core::prelude::{decode_message, detect, AircraftTracker, IcaoCache, MagnitudeLut, Position};
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cli::Options;
use router::Router;
use sample::SampleSource;

/// Process-wide shared state, constructed once in `main` (spec ss9's
/// redesign of the teacher's global `Modes` singleton into an explicit
/// `Context` passed to every component).
pub struct AppState {
    pub router: Arc<Router>,
    pub icao_cache: Mutex<IcaoCache>,
    pub fix_errors: bool,
    pub aggressive: bool,
    pub home: Option<Position>,
    pub web_root: PathBuf,
    pub sbs_in_lines: AtomicU64,
}

/// Runs a service to completion in the background; a bind/accept failure
/// in one service is logged but never brings down the others (spec ss4.8).
fn spawn_service(
    name: &'static str,
    fut: impl std::future::Future<Output = std::io::Result<()>> + Send + 'static,
) {
    tokio::spawn(async move {
        if let Err(e) = fut.await {
            error!("{name} service stopped: {e}");
        }
    });
}

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let options = Options::parse();

    let level = match options.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let home = config::home_position_from_env().map_err(|e| {
        error!("{e}");
        e
    })?;

    let tracker = AircraftTracker::new(Duration::from_secs(options.interactive_ttl), home);
    let router = Router::new(tracker, options.quiet);

    let state = Arc::new(AppState {
        router: router.clone(),
        icao_cache: Mutex::new(IcaoCache::default()),
        fix_errors: options.fix_errors || options.aggressive,
        aggressive: options.aggressive,
        home,
        web_root: options.web_root.clone(),
        sbs_in_lines: AtomicU64::new(0),
    });

    if !options.quiet {
        spawn_service("raw-in", net::raw::serve_in(state.clone(), options.raw_in_port));
        spawn_service("raw-out", net::raw::serve_out(state.clone(), options.raw_out_port));
        spawn_service("sbs", net::sbs::serve(state.clone(), options.sbs_port));
        tokio::spawn(net::http::serve(state.clone(), options.http_port));
    }
    tokio::spawn(tick::run(state.clone()));

    if let Some(path) = options.iq_file.clone() {
        let source = SampleSource::new();
        let reader_source = source.clone();
        let loop_file = options.r#loop;
        let reader_handle = tokio::task::spawn_blocking(move || {
            sample::read_loop(&path, loop_file, reader_source)
        });

        let lut = MagnitudeLut::new();
        let decode_state = state.clone();
        loop {
            let Some(buf) = tokio::task::block_in_place(|| source.take()) else {
                break;
            };
            let magnitude = lut.compute(&buf);
            let candidates = detect(&magnitude, decode_state.aggressive);
            for candidate in candidates {
                let cache = decode_state.icao_cache.lock().await;
                let now = unix_secs();
                let mm = decode_message(
                    &candidate.msg[..candidate.bits / 8],
                    decode_state.fix_errors,
                    decode_state.aggressive,
                    |addr| cache.contains(addr, now),
                );
                drop(cache);

                if mm.crc_ok {
                    if matches!(mm.df, 11 | 17 | 18) {
                        decode_state.icao_cache.lock().await.insert(mm.icao_address(), now);
                    }
                    decode_state.router.route(&mm).await;
                } else {
                    decode_state.router.record_bad_crc();
                }
            }
        }

        match reader_handle.await {
            Ok(Err(e)) => error!("sample reader failed: {e}"),
            Err(e) => error!("sample reader task panicked: {e}"),
            Ok(Ok(())) => {}
        }
        info!("input exhausted, exiting");
    } else {
        info!("no --iq-file given, running as a pure network relay");
        std::future::pending::<()>().await;
    }

    Ok(())
}
