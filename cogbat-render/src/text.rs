use crate::error::RenderError;
use ab_glyph::{Font, FontVec, Glyph, PxScale, ScaleFont, point};
use cogbat_core::Rgba;
use std::path::Path;
use tiny_skia::Pixmap;

/// Reads a TrueType/OpenType font from disk.
pub fn load_font(path: &Path) -> Result<FontVec, RenderError> {
    let bytes = std::fs::read(path).map_err(|source| RenderError::FontRead {
        path: path.to_path_buf(),
        source,
    })?;
    FontVec::try_from_vec(bytes).map_err(|_| RenderError::FontParse {
        path: path.to_path_buf(),
    })
}

/// Rasterizes `text` into a tight, premultiplied pixmap. Lines split on
/// `\n` are centred on the widest one. Returns `None` when nothing inks.
pub fn render_text_pixmap(text: &str, font_size: f32, font: &FontVec, color: Rgba) -> Option<Pixmap> {
    let scale = PxScale::from(font_size);
    let sf = font.as_scaled(scale);
    let line_height = sf.height() + sf.line_gap();

    // 1) Layout each line with its baseline at ascent
    let mut lines: Vec<(Vec<Glyph>, f32)> = Vec::new();
    for (row, line) in text.lines().enumerate() {
        let baseline = sf.ascent() + row as f32 * line_height;
        let mut pen_x = 0.0f32;
        let mut glyphs = Vec::<Glyph>::new();
        for ch in line.chars() {
            let id = font.glyph_id(ch);
            if let Some(prev) = glyphs.last() {
                pen_x += sf.kern(prev.id, id);
            }
            glyphs.push(Glyph {
                id,
                scale,
                position: point(pen_x, baseline),
            });
            pen_x += sf.h_advance(id);
        }
        lines.push((glyphs, pen_x));
    }
    let widest = lines.iter().map(|(_, w)| *w).fold(0.0f32, f32::max);
    let glyphs: Vec<Glyph> = lines
        .into_iter()
        .flat_map(|(mut glyphs, width)| {
            let shift = (widest - width) * 0.5;
            for g in &mut glyphs {
                g.position.x += shift;
            }
            glyphs
        })
        .collect();

    // 2) Union pixel bounds from outlined glyphs
    let outlines: Vec<_> = glyphs
        .into_iter()
        .filter_map(|g| font.outline_glyph(g))
        .collect();
    let mut min_x = f32::INFINITY;
    let mut min_y = f32::INFINITY;
    let mut max_x = f32::NEG_INFINITY;
    let mut max_y = f32::NEG_INFINITY;
    for out in &outlines {
        let b = out.px_bounds();
        min_x = min_x.min(b.min.x);
        min_y = min_y.min(b.min.y);
        max_x = max_x.max(b.max.x);
        max_y = max_y.max(b.max.y);
    }
    if outlines.is_empty() {
        return None;
    }

    let w = (max_x.ceil() - min_x.floor()).max(1.0) as u32;
    let h = (max_y.ceil() - min_y.floor()).max(1.0) as u32;
    let mut pm = Pixmap::new(w, h)?;

    // 3) Rasterize with premultiplied source-over
    let stride = w as usize;
    let dst: &mut [[u8; 4]] = bytemuck::cast_slice_mut(pm.data_mut());
    let alpha = color[3] as f32 / 255.0;

    for out in &outlines {
        let b = out.px_bounds();
        out.draw(|x, y, cov| {
            if cov <= f32::EPSILON {
                return;
            }
            let ix = (x as f32 + b.min.x - min_x.floor()).floor() as i32;
            let iy = (y as f32 + b.min.y - min_y.floor()).floor() as i32;
            if ix < 0 || iy < 0 || ix >= w as i32 || iy >= h as i32 {
                return;
            }
            let a = (cov * alpha).clamp(0.0, 1.0);
            let src = [
                (color[0] as f32 * a) as u8,
                (color[1] as f32 * a) as u8,
                (color[2] as f32 * a) as u8,
                (a * 255.0) as u8,
            ];
            over(&mut dst[iy as usize * stride + ix as usize], &src);
        });
    }

    Some(pm)
}

/// Porter-Duff over in premultiplied space: out = src + dst * (1 - src.a)
#[inline]
pub(crate) fn over(dst: &mut [u8; 4], src: &[u8; 4]) {
    let inv = 255 - src[3] as u32;
    for c in 0..4 {
        let blended = src[c] as u32 + (dst[c] as u32 * inv + 127) / 255;
        dst[c] = blended.min(255) as u8;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn over_keeps_opaque_source() {
        let mut dst = [10, 20, 30, 255];
        over(&mut dst, &[200, 0, 0, 255]);
        assert_eq!(dst, [200, 0, 0, 255]);
    }

    #[test]
    fn over_with_transparent_source_is_noop() {
        let mut dst = [10, 20, 30, 255];
        over(&mut dst, &[0, 0, 0, 0]);
        assert_eq!(dst, [10, 20, 30, 255]);
    }

    #[test]
    fn missing_font_file_is_reported() {
        let err = load_font(Path::new("/nonexistent/cogbat/font.ttf")).unwrap_err();
        assert!(matches!(err, RenderError::FontRead { .. }));
    }
}
