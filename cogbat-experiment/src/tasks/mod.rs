//! The seven tasks of the battery. Each exposes `run`, which takes the
//! session controller through instructions, practice and main blocks and
//! returns the finished sheet.

pub mod ant;
pub mod digit_span;
pub mod flanker;
pub mod mrt;
pub mod ravens;
pub mod sart;
pub mod sternberg;

use crate::error::Result;
use crate::screen::Frontend;
use crate::session::{SessionController, instruction_page};
use cogbat_core::{Element, GREEN, RED, Rgba, Scene};
use cogbat_timing::Timer;

pub const FEEDBACK_SIZE: f32 = 30.0;

/// Green "correct" or red "incorrect", centred.
pub fn feedback_scene(background: Rgba, correct: bool, capitalised: bool) -> Scene {
    let (text, color) = match (correct, capitalised) {
        (true, false) => ("correct", GREEN),
        (false, false) => ("incorrect", RED),
        (true, true) => ("Correct", GREEN),
        (false, true) => ("Incorrect", RED),
    };
    Scene::new(background).with(Element::text(text, FEEDBACK_SIZE, color))
}

/// Single-line gate used between phases of a task.
pub(crate) fn gate<F, T>(ctl: &mut SessionController<'_, F, T>, background: Rgba, body: &str) -> Result<()>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    let (_, h) = ctl.screen_size();
    ctl.instructions(instruction_page(background, h, "", body))
}

pub(crate) fn end_of_task<F, T>(ctl: &mut SessionController<'_, F, T>, background: Rgba) -> Result<()>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    gate(ctl, background, "End of task")
}

/// Digits of a sequence string, e.g. "5301" -> [5, 3, 0, 1].
pub(crate) fn digits_of(sequence: &str) -> Vec<u8> {
    sequence
        .bytes()
        .filter(u8::is_ascii_digit)
        .map(|b| b - b'0')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cogbat_core::WHITE;

    #[test]
    fn feedback_colours() {
        let s = feedback_scene(WHITE, false, false);
        assert!(s.contains_text("incorrect"));
        assert!(matches!(&s.elements[0], Element::Text { color, .. } if *color == RED));
        assert!(feedback_scene(WHITE, true, true).contains_text("Correct"));
    }

    #[test]
    fn digits_skip_separators() {
        assert_eq!(digits_of("9 7-5"), vec![9, 7, 5]);
    }
}
