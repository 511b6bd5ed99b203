//! Per-peer throughput tracking for the work-stealing loop (§4.10
//! "reassigned ... to the connected peer with the highest measured speed
//! (exponential moving average of per-block throughput)").

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// Smoothing factor for the exponential moving average of per-block
/// throughput (§4.10 `[ADDED]`): `ema = alpha * sample + (1 - alpha) *
/// ema`. Chosen and recorded in `DESIGN.md` as the concrete form of the
/// spec's unspecified EMA.
pub const EMA_ALPHA: f64 = 0.3;

/// Tracks an exponential moving average of measured bytes/second for each
/// peer id a swarm download has talked to.
#[derive(Default)]
pub struct SpeedTracker {
    ema: Mutex<HashMap<String, f64>>,
}

impl SpeedTracker {
    /// Creates a tracker with no recorded samples.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one completed block's throughput sample for `peer`.
    pub fn record(&self, peer: &str, bytes: u64, elapsed: Duration) {
        if elapsed.is_zero() {
            return;
        }
        let sample = bytes as f64 / elapsed.as_secs_f64();
        let mut ema = self.ema.lock().expect("speed tracker lock is never poisoned");
        ema.entry(peer.to_owned())
            .and_modify(|current| *current = EMA_ALPHA * sample + (1.0 - EMA_ALPHA) * *current)
            .or_insert(sample);
    }

    /// Returns the peer with the highest measured EMA among `candidates`,
    /// other than `exclude`. Peers with no recorded sample yet are treated
    /// as speed `0.0` so an untested peer loses to any peer with even one
    /// completed block.
    #[must_use]
    pub fn fastest_other_than(&self, candidates: &[String], exclude: &str) -> Option<String> {
        let ema = self.ema.lock().expect("speed tracker lock is never poisoned");
        candidates
            .iter()
            .filter(|peer| peer.as_str() != exclude)
            .max_by(|a, b| {
                let speed_a = ema.get(a.as_str()).copied().unwrap_or(0.0);
                let speed_b = ema.get(b.as_str()).copied().unwrap_or(0.0);
                speed_a.total_cmp(&speed_b)
            })
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_peer_with_no_samples_reports_zero_speed() {
        let tracker = SpeedTracker::new();
        let candidates = vec!["a".to_owned(), "b".to_owned()];
        // Both untested; either is a valid "fastest" pick, but the call
        // must not panic and must return one of them.
        let fastest = tracker.fastest_other_than(&candidates, "a");
        assert_eq!(fastest.as_deref(), Some("b"));
    }

    #[test]
    fn recording_samples_favors_the_faster_peer() {
        let tracker = SpeedTracker::new();
        tracker.record("slow", 1_000, Duration::from_secs(10));
        tracker.record("fast", 10_000, Duration::from_secs(1));

        let candidates = vec!["slow".to_owned(), "fast".to_owned()];
        let fastest = tracker.fastest_other_than(&candidates, "other");
        assert_eq!(fastest.as_deref(), Some("fast"));
    }

    #[test]
    fn the_excluded_peer_is_never_returned() {
        let tracker = SpeedTracker::new();
        tracker.record("only", 10_000, Duration::from_secs(1));
        let candidates = vec!["only".to_owned()];
        assert_eq!(tracker.fastest_other_than(&candidates, "only"), None);
    }

    #[test]
    fn ema_smooths_toward_new_samples_rather_than_replacing_them() {
        let tracker = SpeedTracker::new();
        tracker.record("p", 1_000, Duration::from_secs(1));
        tracker.record("p", 5_000, Duration::from_secs(1));
        let candidates = vec!["p".to_owned(), "q".to_owned()];
        // Second sample (5000 B/s) pulls the EMA up from 1000, but the
        // 0.3 weight keeps it below 5000.
        tracker.record("q", 5_000, Duration::from_secs(1));
        let fastest = tracker.fastest_other_than(&candidates, "zzz");
        assert_eq!(fastest.as_deref(), Some("q"));
    }
}
