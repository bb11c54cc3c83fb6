use egui::{Pos2, Rect, Vec2};
use image::{Rgba, RgbaImage};

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// How painted coverage combines with what is already on a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaintMode {
    /// Regular painting over existing pixels.
    SourceOver,
    /// Removes existing pixels in proportion to the painted coverage.
    DestinationOut,
}

/// A CPU pixel buffer addressed in logical (CSS) units.
///
/// Logical coordinates are multiplied by `density` to get device pixels, so the same
/// drawing code renders at any pixel density.
#[derive(Debug, Clone)]
pub struct RasterSurface {
    pixels: RgbaImage,
    density: f32,
}

impl RasterSurface {
    pub fn new(css_size: Vec2, density: f32) -> Self {
        let density = sanitize_density(density);
        let (width, height) = device_size(css_size, density);
        Self {
            pixels: RgbaImage::new(width, height),
            density,
        }
    }

    /// Reallocates when the device size or density changes. Returns whether it did.
    pub fn resize(&mut self, css_size: Vec2, density: f32) -> bool {
        let density = sanitize_density(density);
        let (width, height) = device_size(css_size, density);
        if (width, height) == self.pixels.dimensions() && density == self.density {
            return false;
        }
        self.pixels = RgbaImage::new(width, height);
        self.density = density;
        true
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        (x < self.width() && y < self.height()).then(|| *self.pixels.get_pixel(x, y))
    }

    pub fn clear(&mut self) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = TRANSPARENT;
        }
    }

    /// Overwrites every pixel with `color`.
    pub fn fill(&mut self, color: Rgba<u8>) {
        for pixel in self.pixels.pixels_mut() {
            *pixel = color;
        }
    }

    pub fn fill_rect(&mut self, rect: Rect, color: Rgba<u8>, mode: PaintMode) {
        let Some((x0, y0, x1, y1)) = self.device_span(rect) else {
            return;
        };
        let d = self.density;
        for y in y0..y1 {
            let cy = y as f32 + 0.5;
            if cy < rect.min.y * d || cy > rect.max.y * d {
                continue;
            }
            for x in x0..x1 {
                let cx = x as f32 + 0.5;
                if cx < rect.min.x * d || cx > rect.max.x * d {
                    continue;
                }
                let pixel = self.pixels.get_pixel_mut(x, y);
                *pixel = paint_pixel(*pixel, color, 1.0, mode);
            }
        }
    }

    /// Paints a round-capped, round-joined polyline of logical `width`.
    ///
    /// Coverage is accumulated into a mask first and applied once, so overlapping
    /// segments of a translucent stroke do not darken where they meet.
    pub fn stroke_polyline(&mut self, points: &[Pos2], width: f32, color: Rgba<u8>, mode: PaintMode) {
        if points.is_empty() || !(width.is_finite() && width > 0.0) {
            return;
        }
        let d = self.density;
        let radius = (width * d * 0.5).max(0.5);
        let device: Vec<Pos2> = points.iter().map(|p| Pos2::new(p.x * d, p.y * d)).collect();

        let hull = Rect::from_points(&device).expand(radius + 1.0);
        let Some((x0, y0, x1, y1)) = self.clip_device(hull) else {
            return;
        };
        let mask_width = (x1 - x0) as usize;
        let mut mask = vec![0.0f32; mask_width * (y1 - y0) as usize];

        let segments: Vec<(Pos2, Pos2)> = if device.len() == 1 {
            vec![(device[0], device[0])]
        } else {
            device.windows(2).map(|w| (w[0], w[1])).collect()
        };
        for (a, b) in segments {
            let reach = Rect::from_two_pos(a, b).expand(radius + 1.0);
            let Some((sx0, sy0, sx1, sy1)) = self.clip_device(reach) else {
                continue;
            };
            for y in sy0..sy1 {
                for x in sx0..sx1 {
                    let center = Pos2::new(x as f32 + 0.5, y as f32 + 0.5);
                    let distance = point_segment_distance_sq(center, a, b).sqrt();
                    let coverage = (radius + 0.5 - distance).clamp(0.0, 1.0);
                    let slot = &mut mask[(y - y0) as usize * mask_width + (x - x0) as usize];
                    *slot = slot.max(coverage);
                }
            }
        }

        for y in y0..y1 {
            for x in x0..x1 {
                let coverage = mask[(y - y0) as usize * mask_width + (x - x0) as usize];
                if coverage > 0.0 {
                    let pixel = self.pixels.get_pixel_mut(x, y);
                    *pixel = paint_pixel(*pixel, color, coverage, mode);
                }
            }
        }
    }

    /// Draws `image` stretched into the logical rectangle `dest`. Parts of `dest`
    /// outside the surface are cropped.
    pub fn draw_image(&mut self, image: &RgbaImage, dest: Rect) {
        let (iw, ih) = image.dimensions();
        if iw == 0 || ih == 0 || !(dest.width() > 0.0 && dest.height() > 0.0) {
            return;
        }
        let d = self.density;
        let device_dest = Rect::from_min_max(
            Pos2::new(dest.min.x * d, dest.min.y * d),
            Pos2::new(dest.max.x * d, dest.max.y * d),
        );
        let Some((x0, y0, x1, y1)) = self.clip_device(device_dest) else {
            return;
        };
        let sx = iw as f32 / device_dest.width();
        let sy = ih as f32 / device_dest.height();
        for y in y0..y1 {
            let cy = y as f32 + 0.5;
            if cy < device_dest.min.y || cy >= device_dest.max.y {
                continue;
            }
            let v = (((cy - device_dest.min.y) * sy) as u32).min(ih - 1);
            for x in x0..x1 {
                let cx = x as f32 + 0.5;
                if cx < device_dest.min.x || cx >= device_dest.max.x {
                    continue;
                }
                let u = (((cx - device_dest.min.x) * sx) as u32).min(iw - 1);
                let source = *image.get_pixel(u, v);
                let pixel = self.pixels.get_pixel_mut(x, y);
                *pixel = blend_over(*pixel, source, 1.0);
            }
        }
    }

    /// Source-over composites `top` onto this surface. Both must share dimensions.
    pub fn composite(&mut self, top: &RasterSurface) {
        if self.pixels.dimensions() != top.pixels.dimensions() {
            log::warn!(
                "composite size mismatch: {:?} vs {:?}",
                self.pixels.dimensions(),
                top.pixels.dimensions()
            );
            return;
        }
        for (base, src) in self.pixels.pixels_mut().zip(top.pixels.pixels()) {
            *base = blend_over(*base, *src, 1.0);
        }
    }

    /// Outlines `rect` with a dashed line of logical `thickness`.
    pub fn dashed_rect(&mut self, rect: Rect, color: Rgba<u8>, thickness: f32, dash: f32) {
        if dash <= 0.0 {
            return;
        }
        let half = thickness * 0.5;
        let edges = [
            (rect.left_top(), rect.right_top()),
            (rect.right_top(), rect.right_bottom()),
            (rect.right_bottom(), rect.left_bottom()),
            (rect.left_bottom(), rect.left_top()),
        ];
        for (from, to) in edges {
            let length = from.distance(to);
            if length <= 0.0 {
                continue;
            }
            let dir = (to - from) / length;
            let mut t = 0.0;
            while t < length {
                let end = (t + dash).min(length);
                let piece = Rect::from_two_pos(from + dir * t, from + dir * end).expand(half);
                self.fill_rect(piece, color, PaintMode::SourceOver);
                t += dash * 2.0;
            }
        }
    }

    /// Device pixel span covered by a logical rect, clipped to the surface.
    fn device_span(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        let d = self.density;
        self.clip_device(Rect::from_min_max(
            Pos2::new(rect.min.x * d, rect.min.y * d),
            Pos2::new(rect.max.x * d, rect.max.y * d),
        ))
    }

    fn clip_device(&self, rect: Rect) -> Option<(u32, u32, u32, u32)> {
        if !rect.is_finite() {
            return None;
        }
        let x0 = rect.min.x.floor().max(0.0) as u32;
        let y0 = rect.min.y.floor().max(0.0) as u32;
        let x1 = (rect.max.x.ceil().max(0.0) as u32).min(self.width());
        let y1 = (rect.max.y.ceil().max(0.0) as u32).min(self.height());
        (x0 < x1 && y0 < y1).then_some((x0, y0, x1, y1))
    }
}

fn sanitize_density(density: f32) -> f32 {
    if density.is_finite() && density > 0.0 { density } else { 1.0 }
}

fn device_size(css_size: Vec2, density: f32) -> (u32, u32) {
    let dim = |v: f32| if v.is_finite() && v > 0.0 { (v * density).round() as u32 } else { 0 };
    (dim(css_size.x), dim(css_size.y))
}

fn paint_pixel(base: Rgba<u8>, color: Rgba<u8>, coverage: f32, mode: PaintMode) -> Rgba<u8> {
    match mode {
        PaintMode::SourceOver => blend_over(base, color, coverage),
        PaintMode::DestinationOut => {
            let strength = coverage * color[3] as f32 / 255.0;
            let alpha = base[3] as f32 * (1.0 - strength);
            Rgba([base[0], base[1], base[2], alpha.round() as u8])
        }
    }
}

/// Straight-alpha source-over with the top pixel scaled by `coverage`.
fn blend_over(base: Rgba<u8>, top: Rgba<u8>, coverage: f32) -> Rgba<u8> {
    let top_a = top[3] as f32 / 255.0 * coverage.clamp(0.0, 1.0);
    if top_a <= 0.0 {
        return base;
    }
    if top_a >= 1.0 {
        return top;
    }
    let base_a = base[3] as f32 / 255.0;
    let out_a = top_a + base_a * (1.0 - top_a);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }
    let channel = |i: usize| {
        let value = (top[i] as f32 * top_a + base[i] as f32 * base_a * (1.0 - top_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };
    Rgba([channel(0), channel(1), channel(2), (out_a * 255.0).round() as u8])
}

fn point_segment_distance_sq(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len_sq = ab.length_sq();
    if len_sq <= f32::EPSILON {
        return p.distance_sq(a);
    }
    let t = ((p - a).dot(ab) / len_sq).clamp(0.0, 1.0);
    p.distance_sq(a + ab * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn test_density_scales_device_size() {
        let surface = RasterSurface::new(vec2(10.0, 5.0), 2.0);
        assert_eq!((surface.width(), surface.height()), (20, 10));
        let mut surface = surface;
        assert!(!surface.resize(vec2(10.0, 5.0), 2.0));
        assert!(surface.resize(vec2(10.0, 5.0), 1.0));
        assert_eq!(surface.width(), 10);
    }

    #[test]
    fn test_stroke_covers_its_path() {
        let mut surface = RasterSurface::new(vec2(20.0, 20.0), 1.0);
        surface.stroke_polyline(&[pos2(2.0, 10.0), pos2(18.0, 10.0)], 4.0, RED, PaintMode::SourceOver);
        assert_eq!(surface.pixel(10, 9), Some(RED));
        assert_eq!(surface.pixel(10, 2).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_single_point_draws_a_dot() {
        let mut surface = RasterSurface::new(vec2(10.0, 10.0), 1.0);
        surface.stroke_polyline(&[pos2(5.0, 5.0)], 4.0, RED, PaintMode::SourceOver);
        assert_eq!(surface.pixel(5, 5), Some(RED));
    }

    #[test]
    fn test_translucent_stroke_has_no_buildup_at_joins() {
        let mut surface = RasterSurface::new(vec2(20.0, 20.0), 1.0);
        let half_red = Rgba([255, 0, 0, 128]);
        let points = [pos2(2.0, 10.0), pos2(10.0, 10.0), pos2(2.0, 10.5), pos2(10.0, 10.0)];
        surface.stroke_polyline(&points, 4.0, half_red, PaintMode::SourceOver);
        assert_eq!(surface.pixel(6, 10).map(|p| p[3]), Some(128));
    }

    #[test]
    fn test_destination_out_clears_alpha() {
        let mut surface = RasterSurface::new(vec2(10.0, 10.0), 1.0);
        surface.fill(RED);
        surface.stroke_polyline(&[pos2(0.0, 5.0), pos2(10.0, 5.0)], 4.0, RED, PaintMode::DestinationOut);
        assert_eq!(surface.pixel(5, 5).map(|p| p[3]), Some(0));
        assert_eq!(surface.pixel(5, 0), Some(RED));
    }

    #[test]
    fn test_draw_image_is_cropped_to_surface() {
        let mut surface = RasterSurface::new(vec2(4.0, 4.0), 1.0);
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, RED);
        image.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
        surface.draw_image(&image, Rect::from_min_size(pos2(-4.0, 0.0), vec2(8.0, 4.0)));
        assert_eq!(surface.pixel(0, 0), Some(Rgba([0, 0, 255, 255])));
        assert_eq!(surface.pixel(3, 3), Some(Rgba([0, 0, 255, 255])));
    }

    #[test]
    fn test_blend_over_transparent_base_keeps_color() {
        let out = blend_over(TRANSPARENT, Rgba([10, 20, 30, 255]), 0.5);
        assert_eq!(out, Rgba([10, 20, 30, 128]));
    }
}
