pub mod timer;
pub mod virtual_timer;

pub use timer::{CalibrationStats, HighPrecisionTimer, Timer};
pub use virtual_timer::VirtualTimer;
