use crate::error::RenderError;
use crate::images::ImageStore;
use crate::text::{over, render_text_pixmap};
use ab_glyph::FontVec;
use cogbat_cache::TextKey;
use cogbat_core::{ArrowDirection, Element, ImageHandle, Position, Rgba, Scene};
use cogbat_timing::Timer;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tiny_skia::{
    Color, FillRule, FilterQuality, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke,
    Transform,
};

#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    pub clear: Duration,
    pub draw: Duration,
    pub copy: Duration,
    pub total: Duration,
    pub elements: usize,
}

/// Rasterized text by string, size and colour. Bounded by the battery's
/// fixed set of instruction, stimulus and feedback strings, so it lives for
/// the whole session.
struct TextCache {
    map: HashMap<TextKey, Option<Arc<Pixmap>>>,
}

impl TextCache {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    fn get_or_render(&mut self, font: &FontVec, text: &str, key: TextKey) -> Option<Arc<Pixmap>> {
        self.map
            .entry(key)
            .or_insert_with(|| {
                render_text_pixmap(text, key.size_px(), font, key.color).map(Arc::new)
            })
            .clone()
    }
}

fn paint(color: Rgba) -> Paint<'static> {
    let mut p = Paint::default();
    p.set_color(Color::from_rgba8(color[0], color[1], color[2], color[3]));
    p.anti_alias = true;
    p
}

fn place(at: Position, canvas: (u32, u32), size: (f32, f32)) -> (f32, f32) {
    (
        at.x.resolve(canvas.0 as f32, size.0),
        at.y.resolve(canvas.1 as f32, size.1),
    )
}

/// Rasterizes scenes onto an opaque canvas and copies it into the
/// presentation frame buffer.
pub struct SkiaRenderer {
    width: u32,
    height: u32,
    font: Option<FontVec>,
    text_cache: TextCache,
    images: ImageStore,
    canvas: Pixmap,
    missing_font_warned: bool,
}

impl SkiaRenderer {
    pub fn new(width: u32, height: u32, font: Option<FontVec>) -> Result<Self, RenderError> {
        let mut canvas = Pixmap::new(width, height).ok_or(RenderError::Surface { width, height })?;
        canvas.fill(Color::from_rgba8(0, 0, 0, 255));
        Ok(Self {
            width,
            height,
            font,
            text_cache: TextCache::new(),
            images: ImageStore::new(),
            canvas,
            missing_font_warned: false,
        })
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn resize(&mut self, new_width: u32, new_height: u32) -> Result<(), RenderError> {
        let mut canvas = Pixmap::new(new_width, new_height).ok_or(RenderError::Surface {
            width: new_width,
            height: new_height,
        })?;
        canvas.fill(Color::from_rgba8(0, 0, 0, 255));
        self.canvas = canvas;
        self.width = new_width;
        self.height = new_height;
        Ok(())
    }

    pub fn load_image(&mut self, path: &Path) -> Result<ImageHandle, RenderError> {
        self.images.load(path)
    }

    pub fn insert_image(
        &mut self,
        width: u32,
        height: u32,
        rgba: Vec<u8>,
    ) -> Result<ImageHandle, RenderError> {
        self.images.insert_rgba(width, height, rgba)
    }

    pub fn canvas(&self) -> &Pixmap {
        &self.canvas
    }

    /// Straight RGBA at a canvas pixel.
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        let p = self.canvas.pixel(x, y)?.demultiply();
        Some([p.red(), p.green(), p.blue(), p.alpha()])
    }

    /// Draws `scene` onto the canvas and copies it into `frame_buffer`.
    pub fn render_scene<T: Timer>(
        &mut self,
        scene: &Scene,
        frame_buffer: &mut [u8],
        timer: &mut T,
    ) -> Result<FrameStats, RenderError> {
        let expected = self.canvas.data().len();
        if frame_buffer.len() != expected {
            return Err(RenderError::FrameSize {
                expected,
                got: frame_buffer.len(),
            });
        }

        let t = timer.now();
        self.clear(scene.background);
        let clear = timer.elapsed(t);

        let t = timer.now();
        let elements = self.draw_elements(scene)?;
        let draw = timer.elapsed(t);

        // The canvas is opaque, so premultiplied and straight bytes agree.
        let t = timer.now();
        frame_buffer.copy_from_slice(self.canvas.data());
        let copy = timer.elapsed(t);

        let total = clear + draw + copy;
        timer.record_frame(total);
        Ok(FrameStats {
            clear,
            draw,
            copy,
            total,
            elements,
        })
    }

    /// Draws `scene` onto the canvas only.
    pub fn draw_scene(&mut self, scene: &Scene) -> Result<usize, RenderError> {
        self.clear(scene.background);
        self.draw_elements(scene)
    }

    fn clear(&mut self, background: Rgba) {
        self.canvas.fill(Color::from_rgba8(
            background[0],
            background[1],
            background[2],
            255,
        ));
    }

    fn draw_elements(&mut self, scene: &Scene) -> Result<usize, RenderError> {
        let mut drawn = 0;
        for element in &scene.elements {
            if self.draw_element(element)? {
                drawn += 1;
            }
        }
        Ok(drawn)
    }

    fn draw_element(&mut self, element: &Element) -> Result<bool, RenderError> {
        let canvas_size = (self.width, self.height);
        match element {
            Element::Text {
                content,
                size,
                color,
                at,
            } => {
                let Some(font) = self.font.as_ref() else {
                    if !self.missing_font_warned {
                        tracing::warn!("no font loaded, text elements are skipped");
                        self.missing_font_warned = true;
                    }
                    return Ok(false);
                };
                let key = TextKey::new(content, *size, *color);
                let Some(pm) = self.text_cache.get_or_render(font, content, key) else {
                    return Ok(false);
                };
                let (x, y) = place(
                    *at,
                    canvas_size,
                    (pm.width() as f32, pm.height() as f32),
                );
                blit(&mut self.canvas, &pm, x.round() as i32, y.round() as i32);
            }
            Element::Image { handle, scale, at } => {
                let pm = self
                    .images
                    .get(*handle)
                    .ok_or(RenderError::UnknownImage(handle.0))?;
                let size = (pm.width() as f32 * scale, pm.height() as f32 * scale);
                let (x, y) = place(*at, canvas_size, size);
                if (*scale - 1.0).abs() < f32::EPSILON {
                    blit(&mut self.canvas, pm, x.round() as i32, y.round() as i32);
                } else {
                    let paint = PixmapPaint {
                        quality: FilterQuality::Bilinear,
                        ..PixmapPaint::default()
                    };
                    self.canvas.draw_pixmap(
                        0,
                        0,
                        pm.as_ref(),
                        &paint,
                        Transform::from_row(*scale, 0.0, 0.0, *scale, x, y),
                        None,
                    );
                }
            }
            Element::Fixation { size, color, at } => {
                let (x, y) = place(*at, canvas_size, (*size, *size));
                let bar = (size / 20.0).max(2.0);
                let p = paint(*color);
                if let Some(h) = Rect::from_xywh(x, y + (size - bar) * 0.5, *size, bar) {
                    self.canvas.fill_rect(h, &p, Transform::identity(), None);
                }
                if let Some(v) = Rect::from_xywh(x + (size - bar) * 0.5, y, bar, *size) {
                    self.canvas.fill_rect(v, &p, Transform::identity(), None);
                }
            }
            Element::Arrow {
                direction,
                size,
                color,
                at,
            } => {
                let (x, y) = place(*at, canvas_size, (*size, *size * 0.6));
                self.fill_arrow(*direction, x, y, *size, *color);
            }
            Element::Rectangle {
                width,
                height,
                color,
                at,
            } => {
                let (x, y) = place(*at, canvas_size, (*width, *height));
                if let Some(r) = Rect::from_xywh(x, y, *width, *height) {
                    self.canvas
                        .fill_rect(r, &paint(*color), Transform::identity(), None);
                }
            }
            Element::Circle { radius, color, at } => {
                let (x, y) = place(*at, canvas_size, (radius * 2.0, radius * 2.0));
                let mut pb = PathBuilder::new();
                pb.push_circle(x + radius, y + radius, *radius);
                if let Some(path) = pb.finish() {
                    self.canvas.fill_path(
                        &path,
                        &paint(*color),
                        FillRule::Winding,
                        Transform::identity(),
                        None,
                    );
                }
            }
            Element::Outline {
                width,
                height,
                thickness,
                color,
                at,
            } => {
                let (x, y) = place(*at, canvas_size, (*width, *height));
                if let Some(r) = Rect::from_xywh(x, y, *width, *height) {
                    let path = PathBuilder::from_rect(r);
                    let stroke = Stroke {
                        width: *thickness,
                        ..Stroke::default()
                    };
                    self.canvas.stroke_path(
                        &path,
                        &paint(*color),
                        &stroke,
                        Transform::identity(),
                        None,
                    );
                }
            }
            Element::Mask { size, color, at } => {
                let (x, y) = place(*at, canvas_size, (*size, *size));
                let r = size * 0.5;
                let (cx, cy) = (x + r, y + r);
                let d = r * std::f32::consts::FRAC_1_SQRT_2;
                let mut pb = PathBuilder::new();
                pb.push_circle(cx, cy, r * 0.9);
                pb.move_to(cx - d, cy - d);
                pb.line_to(cx + d, cy + d);
                pb.move_to(cx + d, cy - d);
                pb.line_to(cx - d, cy + d);
                if let Some(path) = pb.finish() {
                    let stroke = Stroke {
                        width: (size / 12.0).max(2.0),
                        ..Stroke::default()
                    };
                    self.canvas.stroke_path(
                        &path,
                        &paint(*color),
                        &stroke,
                        Transform::identity(),
                        None,
                    );
                }
            }
        }
        Ok(true)
    }

    /// Arrow with a triangular head filling half its length and a shaft.
    fn fill_arrow(&mut self, direction: ArrowDirection, x: f32, y: f32, size: f32, color: Rgba) {
        let h = size * 0.6;
        let cy = y + h * 0.5;
        let shaft = h * 0.3;
        let head = size * 0.5;
        let mut pb = PathBuilder::new();
        match direction {
            ArrowDirection::Left => {
                pb.move_to(x, cy);
                pb.line_to(x + head, y);
                pb.line_to(x + head, cy - shaft * 0.5);
                pb.line_to(x + size, cy - shaft * 0.5);
                pb.line_to(x + size, cy + shaft * 0.5);
                pb.line_to(x + head, cy + shaft * 0.5);
                pb.line_to(x + head, y + h);
                pb.close();
            }
            ArrowDirection::Right => {
                pb.move_to(x + size, cy);
                pb.line_to(x + size - head, y);
                pb.line_to(x + size - head, cy - shaft * 0.5);
                pb.line_to(x, cy - shaft * 0.5);
                pb.line_to(x, cy + shaft * 0.5);
                pb.line_to(x + size - head, cy + shaft * 0.5);
                pb.line_to(x + size - head, y + h);
                pb.close();
            }
        }
        if let Some(path) = pb.finish() {
            self.canvas.fill_path(
                &path,
                &paint(color),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }
}

/// Copies a premultiplied surface onto the canvas with clipping. Fully
/// opaque rows are memcpy'd, the rest are blended.
fn blit(canvas: &mut Pixmap, src: &Pixmap, x: i32, y: i32) {
    let (cw, ch) = (canvas.width() as i32, canvas.height() as i32);
    let (w, h) = (src.width() as i32, src.height() as i32);

    // Cull fully off-screen
    if x + w <= 0 || y + h <= 0 || x >= cw || y >= ch {
        return;
    }

    let dst_x = x.max(0);
    let dst_y = y.max(0);
    let src_x = (dst_x - x) as usize;
    let src_y = (dst_y - y) as usize;
    let copy_w = (w - src_x as i32).min(cw - dst_x) as usize;
    let copy_h = (h - src_y as i32).min(ch - dst_y) as usize;

    let src_px: &[[u8; 4]] = bytemuck::cast_slice(src.data());
    let dst_px: &mut [[u8; 4]] = bytemuck::cast_slice_mut(canvas.data_mut());

    for row in 0..copy_h {
        let s0 = (src_y + row) * w as usize + src_x;
        let d0 = (dst_y as usize + row) * cw as usize + dst_x as usize;
        let s_row = &src_px[s0..s0 + copy_w];
        let d_row = &mut dst_px[d0..d0 + copy_w];
        if s_row.iter().all(|p| p[3] == 255) {
            d_row.copy_from_slice(s_row);
        } else {
            for (d, s) in d_row.iter_mut().zip(s_row) {
                over(d, s);
            }
        }
    }
}
