use crate::error::Result;
use crate::input::InputSampler;
use cogbat_core::{ImageHandle, Scene};
use std::path::Path;

/// Presentation surface. `present` replaces the whole visible frame.
pub trait Screen {
    fn size(&self) -> (u32, u32);
    fn present(&mut self, scene: &Scene) -> Result<()>;
    /// Decodes an image once so scenes can refer to it by handle.
    fn load_image(&mut self, path: &Path) -> Result<ImageHandle>;
}

/// A screen paired with the keyboard in front of it.
pub trait Frontend: Screen + InputSampler {}

impl<T: Screen + InputSampler> Frontend for T {}
