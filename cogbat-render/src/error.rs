use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum RenderError {
    #[error("Failed to read font file {path}")]
    #[diagnostic(
        code(cogbat::render::font_read),
        help("Point general.font in the battery config at a TrueType or OpenType file")
    )]
    FontRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} is not a usable font")]
    #[diagnostic(code(cogbat::render::font_parse))]
    FontParse { path: PathBuf },

    #[error("Failed to load image {path}")]
    #[diagnostic(
        code(cogbat::render::image_load),
        help("Check general.assets in the battery config")
    )]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Cannot allocate a {width}x{height} surface")]
    #[diagnostic(code(cogbat::render::surface))]
    Surface { width: u32, height: u32 },

    #[error("Frame buffer holds {got} bytes, expected {expected}")]
    #[diagnostic(code(cogbat::render::frame_size))]
    FrameSize { expected: usize, got: usize },

    #[error("Unknown image handle {0}")]
    #[diagnostic(code(cogbat::render::unknown_image))]
    UnknownImage(usize),
}
