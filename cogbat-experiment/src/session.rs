use crate::block::Block;
use crate::clock::StimulusClock;
use crate::config::BatteryConfig;
use crate::error::{ExperimentError, Result};
use crate::recorder::ResultRecorder;
use crate::screen::Frontend;
use crate::sequencer::{Paradigm, run_trial};
use cogbat_core::{BLACK, Coord, Element, ImageHandle, Key, Position, Rgba, Scene, WHITE};
use cogbat_timing::Timer;
use rand::rngs::StdRng;
use std::path::Path;
use std::time::Duration;

/// Appended to every manual gate.
pub const CONTINUE_PROMPT: &str = "(press space to continue)";
pub const TITLE_SIZE: f32 = 40.0;
pub const BODY_SIZE: f32 = 28.0;

/// Black on light backgrounds, white on dark ones.
pub fn foreground_for(background: Rgba) -> Rgba {
    let [r, g, b, _] = background;
    let luma = 0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32;
    if luma >= 128.0 { BLACK } else { WHITE }
}

/// Title a quarter of the way down with the body centred below it.
pub fn instruction_page(background: Rgba, screen_h: u32, title: &str, body: &str) -> Scene {
    let fg = foreground_for(background);
    let mut scene = Scene::new(background);
    if !title.is_empty() {
        scene.push(
            Element::text(title, TITLE_SIZE, fg)
                .at(Position::new(Coord::Center, Coord::At(screen_h as f32 * 0.25))),
        );
    }
    if !body.is_empty() {
        scene.push(Element::text(body, BODY_SIZE, fg));
    }
    scene
}

/// Runs a task's blocks against one frontend.
///
/// Owns the clock and the random source for the whole battery so a seeded
/// session replays exactly.
pub struct SessionController<'a, F: ?Sized, T: Timer> {
    frontend: &'a mut F,
    clock: StimulusClock<T>,
    rng: StdRng,
    config: &'a BatteryConfig,
}

impl<'a, F, T> SessionController<'a, F, T>
where
    F: Frontend + ?Sized,
    T: Timer,
{
    pub fn new(frontend: &'a mut F, clock: StimulusClock<T>, rng: StdRng, config: &'a BatteryConfig) -> Self {
        Self {
            frontend,
            clock,
            rng,
            config,
        }
    }

    pub fn config(&self) -> &BatteryConfig {
        self.config
    }

    pub fn clock(&self) -> &StimulusClock<T> {
        &self.clock
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn screen_size(&self) -> (u32, u32) {
        self.frontend.size()
    }

    pub fn present(&mut self, scene: &Scene) -> Result<()> {
        self.frontend.present(scene)
    }

    pub fn poll_keys(&mut self) -> Vec<Key> {
        self.frontend.poll()
    }

    pub fn clear_input(&mut self) {
        self.frontend.clear();
    }

    /// Loads `relative` from the configured assets directory.
    pub fn load_image(&mut self, relative: impl AsRef<Path>) -> Result<ImageHandle> {
        let path = self.config.general.assets.join(relative);
        self.frontend.load_image(&path)
    }

    pub fn show(&mut self, scene: &Scene, duration: Duration) -> Result<()> {
        self.frontend.present(scene)?;
        self.clock.hold(self.frontend, duration)
    }

    pub fn blank(&mut self, background: Rgba, duration: Duration) -> Result<()> {
        self.show(&Scene::new(background), duration)
    }

    /// Blocks until one of `keys` is pressed. Input is not cleared first.
    pub fn wait_for(&mut self, keys: &[Key]) -> Result<Key> {
        loop {
            for key in self.frontend.poll() {
                if key == Key::Abort {
                    tracing::warn!("abort key at a manual gate");
                    return Err(ExperimentError::Aborted);
                }
                if keys.contains(&key) {
                    return Ok(key);
                }
            }
            self.clock.pause(None);
        }
    }

    /// Shows `scene` with the continue prompt and waits for Space.
    pub fn instructions(&mut self, mut scene: Scene) -> Result<()> {
        let (_, h) = self.frontend.size();
        let fg = foreground_for(scene.background);
        scene.push(
            Element::text(CONTINUE_PROMPT, BODY_SIZE, fg)
                .at(Position::new(Coord::Center, Coord::At(h as f32 * 0.85))),
        );
        self.choose(&scene, &[Key::Space]).map(|_| ())
    }

    /// Operator or participant picks one of `keys`.
    pub fn choose(&mut self, scene: &Scene, keys: &[Key]) -> Result<Key> {
        self.frontend.present(scene)?;
        self.frontend.clear();
        let key = self.wait_for(keys)?;
        tracing::debug!(%key, "gate passed");
        Ok(key)
    }

    /// Manual rest gate between blocks; nothing after the last one.
    pub fn rest_between_blocks(&mut self, block_number: usize, total: usize, background: Rgba) -> Result<()> {
        if block_number >= total {
            return Ok(());
        }
        let (_, h) = self.frontend.size();
        let page = instruction_page(
            background,
            h,
            "",
            "End of current block. Start next block when you're ready...",
        );
        self.instructions(page)
    }

    /// Runs every trial in order; only main trials reach the recorder.
    pub fn run_block<P>(&mut self, paradigm: &P, block: &Block<P::Spec>, recorder: &mut ResultRecorder<P::Spec>) -> Result<()>
    where
        P: Paradigm + ?Sized,
    {
        tracing::info!(
            sheet = paradigm.sheet_name(),
            block = block.index,
            trial_type = block.trial_type.label(),
            trials = block.len(),
            "block start"
        );
        for trial in block.trials() {
            let result = run_trial(paradigm, &trial, self.frontend, &self.clock)?;
            if !trial.is_practice() {
                recorder.record(trial, result);
            }
        }
        Ok(())
    }
}
