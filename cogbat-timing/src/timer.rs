use std::time::{Duration, Instant};

/// Monotonic clock used for stimulus holds and reaction times
pub trait Timer: Clone + Send + Sync {
    type Timestamp: Copy + Clone + Send + Sync + std::fmt::Debug;
    fn now(&self) -> Self::Timestamp;
    fn elapsed(&self, ts: Self::Timestamp) -> Duration;
    fn sleep(&self, d: Duration);
    fn record_frame(&mut self, d: Duration);
    fn calibration_stats(&self) -> CalibrationStats;
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationStats {
    pub average_frame_time_ns: f64,
    pub jitter_ns: f64,
    pub min_frame_time_ns: f64,
    pub max_frame_time_ns: f64,
    pub effective_fps: f64,
}

impl CalibrationStats {
    /// Summarises a window of frame durations.
    pub fn from_frames(frames: &[Duration]) -> Self {
        if frames.is_empty() {
            return Self::default();
        }
        let times: Vec<f64> = frames.iter().map(|d| d.as_nanos() as f64).collect();
        let avg = times.iter().sum::<f64>() / times.len() as f64;
        let var = times.iter().map(|x| (x - avg).powi(2)).sum::<f64>() / times.len() as f64;
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        CalibrationStats {
            average_frame_time_ns: avg,
            jitter_ns: var.sqrt(),
            min_frame_time_ns: min,
            max_frame_time_ns: max,
            effective_fps: if avg > 0.0 { 1e9 / avg } else { 0.0 },
        }
    }
}

pub(crate) fn push_bounded(frames: &mut Vec<Duration>, max: usize, d: Duration) {
    if frames.len() >= max {
        frames.remove(0);
    }
    frames.push(d);
}

/// Wall clock backed by `Instant`, sleeping through the platform's most
/// precise timer when `high_precision_timer` is enabled.
#[derive(Debug, Clone)]
pub struct HighPrecisionTimer {
    pub start: Instant,
    pub frame_times: Vec<Duration>,
    pub max_samples: usize,
}

impl Timer for HighPrecisionTimer {
    type Timestamp = u64;
    fn now(&self) -> u64 {
        self.start.elapsed().as_nanos() as u64
    }
    fn elapsed(&self, ts: u64) -> Duration {
        Duration::from_nanos(self.now().saturating_sub(ts))
    }
    fn sleep(&self, d: Duration) {
        self.high_precision_sleep(d)
    }
    fn record_frame(&mut self, d: Duration) {
        push_bounded(&mut self.frame_times, self.max_samples, d);
    }
    fn calibration_stats(&self) -> CalibrationStats {
        CalibrationStats::from_frames(&self.frame_times)
    }
}

impl HighPrecisionTimer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            frame_times: Vec::with_capacity(1000),
            max_samples: 1000,
        }
    }

    pub fn high_precision_sleep(&self, duration: Duration) {
        if duration.is_zero() {
            return;
        }
        #[cfg(all(feature = "high_precision_timer", target_os = "windows"))]
        self.windows_sleep(duration);
        #[cfg(all(feature = "high_precision_timer", target_os = "linux"))]
        self.linux_sleep(duration);
        #[cfg(all(feature = "high_precision_timer", target_os = "macos"))]
        self.macos_sleep(duration);
        #[cfg(not(all(
            feature = "high_precision_timer",
            any(target_os = "windows", target_os = "linux", target_os = "macos")
        )))]
        std::thread::sleep(duration);
    }

    #[cfg(all(feature = "high_precision_timer", target_os = "windows"))]
    fn windows_sleep(&self, duration: Duration) {
        use windows::Win32::Foundation::CloseHandle;
        use windows::Win32::System::Threading::{
            CreateWaitableTimerW, INFINITE, SetWaitableTimer, WaitForSingleObject,
        };

        // Relative due time in 100ns units.
        let due = -((duration.as_nanos() / 100) as i64).max(1);
        unsafe {
            let Ok(timer) = CreateWaitableTimerW(None, true, None) else {
                std::thread::sleep(duration);
                return;
            };
            if SetWaitableTimer(timer, &due, 0, None, None, false).is_ok() {
                WaitForSingleObject(timer, INFINITE);
            } else {
                std::thread::sleep(duration);
            }
            let _ = CloseHandle(timer);
        }
    }

    #[cfg(all(feature = "high_precision_timer", target_os = "linux"))]
    fn linux_sleep(&self, duration: Duration) {
        use libc::{CLOCK_MONOTONIC, clock_nanosleep, timespec};

        let req = timespec {
            tv_sec: duration.as_secs() as libc::time_t,
            tv_nsec: duration.subsec_nanos() as libc::c_long,
        };

        unsafe {
            clock_nanosleep(CLOCK_MONOTONIC, 0, &req, std::ptr::null_mut());
        }
    }

    #[cfg(all(feature = "high_precision_timer", target_os = "macos"))]
    fn macos_sleep(&self, duration: Duration) {
        use mach2::mach_time::{mach_absolute_time, mach_timebase_info, mach_timebase_info_data_t};

        // Spin for sub-100us waits, the scheduler is too coarse below that.
        if duration.as_nanos() < 100_000 {
            unsafe {
                let start = mach_absolute_time();
                let mut timebase = mach_timebase_info_data_t { numer: 0, denom: 0 };
                mach_timebase_info(&mut timebase);
                let target_ticks =
                    duration.as_nanos() as u64 * timebase.denom as u64 / timebase.numer as u64;
                while mach_absolute_time() - start < target_ticks {
                    std::hint::spin_loop();
                }
            }
        } else {
            std::thread::sleep(duration);
        }
    }
}

impl Default for HighPrecisionTimer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stats_for_empty_window_are_zero() {
        assert_eq!(CalibrationStats::from_frames(&[]), CalibrationStats::default());
    }

    #[test]
    fn stats_summarise_frames() {
        let frames = [
            Duration::from_millis(16),
            Duration::from_millis(17),
            Duration::from_millis(18),
        ];
        let stats = CalibrationStats::from_frames(&frames);
        assert_eq!(stats.min_frame_time_ns, 16e6);
        assert_eq!(stats.max_frame_time_ns, 18e6);
        assert!((stats.average_frame_time_ns - 17e6).abs() < 1.0);
        assert!((stats.effective_fps - 1e9 / 17e6).abs() < 1e-6);
    }

    #[test]
    fn frame_window_is_bounded() {
        let mut timer = HighPrecisionTimer::new();
        timer.max_samples = 2;
        for ms in [1, 2, 3] {
            timer.record_frame(Duration::from_millis(ms));
        }
        assert_eq!(
            timer.frame_times,
            vec![Duration::from_millis(2), Duration::from_millis(3)]
        );
    }

    #[test]
    fn sleep_waits_at_least_requested() {
        let timer = HighPrecisionTimer::new();
        let t = timer.now();
        timer.sleep(Duration::from_millis(5));
        assert!(timer.elapsed(t) >= Duration::from_millis(5));
    }
}
