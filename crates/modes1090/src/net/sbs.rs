//! sbs-in/sbs-out, both on a single port (default 30003): Base-Station
//! CSV. A connected client both receives routed frames (sbs-out) and may
//! send lines of its own (sbs-in), mirroring the symmetric text protocol
//! `spec.md` ss6 describes as a single service rather than two ports.
//!
//! sbs-out fans out the lines `Router` already formats (via `modes-core`'s
//! `sbs::encode`). sbs-in is parsed only far enough to count lines for
//! statistics (spec ss6: "minimally parsed for statistics") — this
//! service never feeds decoded aircraft state back into the tracker.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tracing::debug;

use crate::AppState;

pub async fn serve(state: Arc<AppState>, port: u16) -> std::io::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    loop {
        let (socket, _peer) = listener.accept().await?;
        let state = state.clone();
        tokio::spawn(async move {
            let (read_half, mut write_half) = socket.into_split();
            let mut rx = state.router.sbs_out.subscribe();

            let writer = tokio::spawn(async move {
                while let Ok(line) = rx.recv().await {
                    if write_half.write_all(line.as_bytes()).await.is_err() {
                        break;
                    }
                }
            });

            let mut lines = BufReader::new(read_half).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if line.trim_start().starts_with("MSG,") {
                            state.sbs_in_lines.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        debug!("sbs connection read error: {e}");
                        break;
                    }
                }
            }
            writer.abort();
        });
    }
}
