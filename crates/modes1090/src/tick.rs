//! C11 — background tick: drives aircraft TTL eviction on a fixed cadence,
//! decoupled from message arrival (spec ss4.11).

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::interval;
use tracing::debug;

use crate::AppState;

const TICK_PERIOD: Duration = Duration::from_millis(250);

pub async fn run(state: Arc<AppState>) {
    let mut ticker = interval(TICK_PERIOD);
    loop {
        ticker.tick().await;
        let mut tracker = state.router.tracker.lock().await;
        let before = tracker.len();
        tracker.tick(Instant::now());
        let after = tracker.len();
        if before != after {
            debug!(evicted = before - after, remaining = after, "tracker tick");
        }
    }
}
