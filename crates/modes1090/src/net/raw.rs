//! raw-in (port 30001) and raw-out (port 30002): the `*HEX;\n` wire form.
//!
//! Grounded on `jet1090/main.rs`'s `tokio::spawn` accept-loop-per-service
//! wiring and on `spec.md` ss4.8's read/write/close per-connection
//! contract, adapted to `tokio::io::AsyncBufReadExt::lines`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use modes_core::prelude::{decode_message, parse_raw_line};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, warn};

use crate::AppState;

fn unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Accept loop for raw-in: each connected peer sends `*HEX;\n` lines,
/// including the `*0000;\n` heartbeat (spec ss8 scenario 3), which is
/// recognized and counted but decodes to nothing.
pub async fn serve_in(state: Arc<AppState>, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    loop {
        let (socket, _peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(socket).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let Some(raw) = parse_raw_line(&line) else {
                            continue;
                        };
                        if raw.is_empty() {
                            // heartbeat: buffer consumed, no frame emitted
                            continue;
                        }
                        let cache = state.icao_cache.lock().await;
                        let now = unix_secs();
                        let mm = decode_message(&raw, state.fix_errors, state.aggressive, |addr| {
                            cache.contains(addr, now)
                        });
                        drop(cache);

                        if mm.crc_ok {
                            if matches!(mm.df, 11 | 17 | 18) {
                                state.icao_cache.lock().await.insert(mm.icao_address(), now);
                            }
                            state.router.route(&mm).await;
                        } else {
                            state.router.record_bad_crc();
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!("raw-in connection error: {e}");
                        break;
                    }
                }
            }
        });
    }
}

/// Accept loop for raw-out: each connected peer receives every routed
/// frame as a `*HEX;\n` line until it disconnects or falls behind.
pub async fn serve_out(state: Arc<AppState>, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    loop {
        let (mut socket, _peer) = listener.accept().await?;
        let mut rx = state.router.raw_out.subscribe();
        tokio::spawn(async move {
            while let Ok(line) = rx.recv().await {
                if socket.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
            }
        });
    }
}

