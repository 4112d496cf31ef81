use crate::timer::{push_bounded, CalibrationStats, Timer};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Deterministic clock for headless runs. Time only moves when someone
/// sleeps on it or calls [`VirtualTimer::advance`]; clones share one clock.
#[derive(Debug, Clone)]
pub struct VirtualTimer {
    now_ns: Arc<AtomicU64>,
    frame_times: Vec<Duration>,
    max_samples: usize,
}

impl VirtualTimer {
    pub fn new() -> Self {
        Self {
            now_ns: Arc::new(AtomicU64::new(0)),
            frame_times: Vec::new(),
            max_samples: 1000,
        }
    }

    pub fn advance(&self, d: Duration) {
        self.now_ns.fetch_add(d.as_nanos() as u64, Ordering::SeqCst);
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst) / 1_000_000
    }
}

impl Default for VirtualTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer for VirtualTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.now_ns.load(Ordering::SeqCst)
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
    fn record_frame(&mut self, d: Duration) {
        push_bounded(&mut self.frame_times, self.max_samples, d);
    }
    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_frames(&self.frame_times)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_clock() {
        let a = VirtualTimer::new();
        let b = a.clone();
        let t = b.now();
        a.sleep(Duration::from_millis(250));
        assert_eq!(b.elapsed(t), Duration::from_millis(250));
        assert_eq!(b.now_ms(), 250);
    }
}
