//! C9 — message router: the single entry point for every frame that has
//! passed CRC, fanning it out to the tracker, sbs-out and raw-out.
//!
//! Grounded on `spec.md` ss4.9's effect ordering; the fan-out mechanism
//! itself (`tokio::sync::broadcast`) follows the accept-loop/broadcast
//! pattern `jet1090/main.rs` uses for its `tokio::sync::mpsc` message bus,
//! generalized to multiple independent subscriber sets per ss9's licensed
//! redesign of the single-threaded reactor into an async multiplexer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use modes_core::prelude::{Aircraft, AircraftTracker, ModeSMessage};
use modes_core::sbs;
use tokio::sync::{broadcast, Mutex};

pub struct Stats {
    pub messages_total: AtomicU64,
    pub bad_crc: AtomicU64,
    pub fixed: AtomicU64,
}

impl Default for Stats {
    fn default() -> Self {
        Stats {
            messages_total: AtomicU64::new(0),
            bad_crc: AtomicU64::new(0),
            fixed: AtomicU64::new(0),
        }
    }
}

pub struct Router {
    pub tracker: Mutex<AircraftTracker>,
    pub stats: Stats,
    pub raw_out: broadcast::Sender<String>,
    pub sbs_out: broadcast::Sender<String>,
    pub quiet: bool,
}

impl Router {
    pub fn new(tracker: AircraftTracker, quiet: bool) -> Arc<Self> {
        let (raw_out, _) = broadcast::channel(1024);
        let (sbs_out, _) = broadcast::channel(1024);
        Arc::new(Router {
            tracker: Mutex::new(tracker),
            stats: Stats::default(),
            raw_out,
            sbs_out,
            quiet,
        })
    }

    /// Route one CRC-good frame (spec ss4.9, effects 1-5 in order).
    pub async fn route(&self, mm: &ModeSMessage) {
        self.stats.messages_total.fetch_add(1, Ordering::Relaxed);
        if mm.error_bit.is_some() {
            self.stats.fixed.fetch_add(1, Ordering::Relaxed);
        }

        let ac_snapshot: Option<Aircraft> = {
            let mut tracker = self.tracker.lock().await;
            tracker.receive(mm, Instant::now());
            tracker.get(mm.icao_address()).cloned()
        };

        if self.sbs_out.receiver_count() > 0 {
            if let Some(line) = sbs::encode(mm, ac_snapshot.as_ref()) {
                let _ = self.sbs_out.send(line);
            }
        }

        if !self.quiet {
            println!("{}", mm.to_raw_string().trim_end());
        }

        if self.raw_out.receiver_count() > 0 {
            let _ = self.raw_out.send(mm.to_raw_string());
        }
    }

    pub fn record_bad_crc(&self) {
        self.stats.bad_crc.fetch_add(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn routing_a_good_frame_bumps_messages_total_and_updates_tracker() {
        let tracker = AircraftTracker::new(Duration::from_secs(60), None);
        let router = Router::new(tracker, true);
        let mm = ModeSMessage {
            df: 17,
            crc_ok: true,
            aa: [0x4B, 0x96, 0x96],
            me_type: 1,
            flight: "TEST123".into(),
            ..Default::default()
        };
        router.route(&mm).await;
        assert_eq!(router.stats.messages_total.load(Ordering::Relaxed), 1);
        let tracker = router.tracker.lock().await;
        assert!(tracker.get(0x4B9696).is_some());
    }
}
