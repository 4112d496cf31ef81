use cogbat_core::Key;

/// Source of key-down events.
///
/// `poll` hands out everything observed since the previous call, in arrival
/// order. Repeats and key-ups never reach it. `clear` throws away queued
/// answers and is called before every response window and every manual gate,
/// so a key pressed during a fixed hold cannot count as the next answer. A
/// queued [`Key::Abort`] survives `clear`.
pub trait InputSampler {
    fn poll(&mut self) -> Vec<Key>;
    fn clear(&mut self);
}
