use crate::error::{ExperimentError, Result};
use crate::input::InputSampler;
use cogbat_core::Key;
use cogbat_timing::Timer;
use std::time::Duration;

/// Interval timer for fixed-duration phases.
///
/// Every wait drains the input queue once per poll interval. Keys seen during
/// a hold are dropped; the abort key ends the wait with
/// [`ExperimentError::Aborted`] before the remaining time elapses.
#[derive(Debug, Clone)]
pub struct StimulusClock<T: Timer> {
    timer: T,
    poll_interval: Duration,
}

impl<T: Timer> StimulusClock<T> {
    pub fn new(timer: T, poll_interval: Duration) -> Self {
        Self {
            timer,
            poll_interval: poll_interval.max(Duration::from_micros(1)),
        }
    }

    pub fn now(&self) -> T::Timestamp {
        self.timer.now()
    }

    pub fn elapsed(&self, since: T::Timestamp) -> Duration {
        self.timer.elapsed(since)
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Sleeps one poll interval, or less if `remaining` is shorter.
    pub fn pause(&self, remaining: Option<Duration>) {
        let step = match remaining {
            Some(r) => r.min(self.poll_interval),
            None => self.poll_interval,
        };
        if !step.is_zero() {
            self.timer.sleep(step);
        }
    }

    pub fn hold<I: InputSampler + ?Sized>(&self, input: &mut I, duration: Duration) -> Result<()> {
        let start = self.timer.now();
        loop {
            if input.poll().contains(&Key::Abort) {
                tracing::warn!(
                    held_ms = self.timer.elapsed(start).as_millis() as u64,
                    target_ms = duration.as_millis() as u64,
                    "abort key during hold"
                );
                return Err(ExperimentError::Aborted);
            }
            let elapsed = self.timer.elapsed(start);
            if elapsed >= duration {
                return Ok(());
            }
            self.pause(Some(duration - elapsed));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogbat_timing::VirtualTimer;

    /// Emits scheduled keys once the shared virtual clock reaches them.
    struct Scheduled {
        timer: VirtualTimer,
        keys: Vec<(u64, Key)>,
    }

    impl InputSampler for Scheduled {
        fn poll(&mut self) -> Vec<Key> {
            let now = self.timer.now_ms();
            let (due, later): (Vec<_>, Vec<_>) = self.keys.drain(..).partition(|(at, _)| *at <= now);
            self.keys = later;
            due.into_iter().map(|(_, k)| k).collect()
        }

        fn clear(&mut self) {}
    }

    #[test]
    fn abort_cuts_a_long_hold_short() {
        let timer = VirtualTimer::new();
        let clock = StimulusClock::new(timer.clone(), Duration::from_millis(1));
        let mut input = Scheduled {
            timer: timer.clone(),
            keys: vec![(10, Key::Abort)],
        };
        let err = clock.hold(&mut input, Duration::from_millis(5000)).unwrap_err();
        assert!(err.is_abort());
        assert_eq!(timer.now_ms(), 10);
    }

    #[test]
    fn hold_discards_ordinary_keys_and_runs_to_the_end() {
        let timer = VirtualTimer::new();
        let clock = StimulusClock::new(timer.clone(), Duration::from_millis(1));
        let mut input = Scheduled {
            timer: timer.clone(),
            keys: vec![(3, Key::Left), (250, Key::Space)],
        };
        clock.hold(&mut input, Duration::from_millis(400)).unwrap();
        assert_eq!(timer.now_ms(), 400);
        assert!(input.keys.is_empty());
    }

    #[test]
    fn pause_never_overshoots_the_remaining_time() {
        let timer = VirtualTimer::new();
        let clock = StimulusClock::new(timer.clone(), Duration::from_millis(5));
        clock.pause(Some(Duration::from_millis(2)));
        assert_eq!(timer.now_ms(), 2);
        clock.pause(None);
        assert_eq!(timer.now_ms(), 7);
    }
}
