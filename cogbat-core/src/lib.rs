pub mod phase;
pub mod stimulus;
pub mod table;
pub mod trial;

pub use phase::{Phase, TrialPhase, TrialType};
pub use stimulus::{
    ArrowDirection, BLACK, BLUE, Coord, Element, GREEN, GREY, ImageHandle, Position, RED, Rgba, Scene,
    WHITE,
};
pub use table::{Cell, SessionTable};
pub use trial::{CompletedTrial, Key, Response, Trial, TrialResult};
