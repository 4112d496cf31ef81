pub mod error;
pub mod images;
pub mod render;
pub mod text;

pub use error::RenderError;
pub use images::ImageStore;
pub use render::{FrameStats, SkiaRenderer};
pub use text::{load_font, render_text_pixmap};
