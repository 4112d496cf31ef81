use crate::error::RenderError;
use cogbat_core::ImageHandle;
use std::path::Path;
use tiny_skia::{IntSize, Pixmap};

/// Stimulus surfaces decoded once before a task starts.
#[derive(Default)]
pub struct ImageStore {
    surfaces: Vec<Pixmap>,
}

impl ImageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<ImageHandle, RenderError> {
        let img = image::open(path)
            .map_err(|source| RenderError::Image {
                path: path.to_path_buf(),
                source,
            })?
            .into_rgba8();
        let (width, height) = img.dimensions();
        let handle = self.insert_rgba(width, height, img.into_raw())?;
        tracing::debug!(path = %path.display(), width, height, "image loaded");
        Ok(handle)
    }

    /// Takes straight RGBA bytes and stores them premultiplied.
    pub fn insert_rgba(
        &mut self,
        width: u32,
        height: u32,
        mut rgba: Vec<u8>,
    ) -> Result<ImageHandle, RenderError> {
        let surface_err = RenderError::Surface { width, height };
        if rgba.len() != width as usize * height as usize * 4 {
            return Err(surface_err);
        }
        for px in bytemuck::cast_slice_mut::<u8, [u8; 4]>(&mut rgba) {
            let a = px[3] as u32;
            if a != 255 {
                for c in &mut px[..3] {
                    *c = ((*c as u32 * a + 127) / 255) as u8;
                }
            }
        }
        let size = IntSize::from_wh(width, height).ok_or(surface_err)?;
        let pixmap = Pixmap::from_vec(rgba, size).ok_or(RenderError::Surface { width, height })?;
        self.surfaces.push(pixmap);
        Ok(ImageHandle(self.surfaces.len() - 1))
    }

    pub fn get(&self, handle: ImageHandle) -> Option<&Pixmap> {
        self.surfaces.get(handle.0)
    }

    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_premultiplies() {
        let mut store = ImageStore::new();
        let h = store
            .insert_rgba(1, 1, vec![200, 100, 50, 128])
            .expect("insert");
        let px = store.get(h).unwrap().data().to_vec();
        assert_eq!(px, vec![100, 50, 25, 128]);
    }

    #[test]
    fn rejects_wrong_buffer_size() {
        let mut store = ImageStore::new();
        assert!(store.insert_rgba(2, 2, vec![0; 4]).is_err());
        assert!(store.is_empty());
    }

    #[test]
    fn missing_file_is_an_error() {
        let mut store = ImageStore::new();
        let err = store.load(Path::new("/nonexistent/cogbat/1.png")).unwrap_err();
        assert!(matches!(err, RenderError::Image { .. }));
    }
}
