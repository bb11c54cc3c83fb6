use egui::{Pos2, Rect, Vec2};

use crate::stroke::StrokeRef;

/// Smallest padding added around vector content.
pub const MIN_VECTOR_PADDING: f32 = 4.0;

/// Scales `image` to fit inside `canvas`, centred, keeping its aspect ratio.
pub fn contain(canvas: Vec2, image: Vec2) -> Option<Rect> {
    place(canvas, image, f32::min)
}

/// Scales `image` to cover all of `canvas`, centred; the overflow is cropped on paint.
pub fn cover(canvas: Vec2, image: Vec2) -> Option<Rect> {
    place(canvas, image, f32::max)
}

fn place(canvas: Vec2, image: Vec2, pick: fn(f32, f32) -> f32) -> Option<Rect> {
    if !(image.x > 0.0 && image.y > 0.0 && canvas.x > 0.0 && canvas.y > 0.0) {
        return None;
    }
    let scale = pick(canvas.x / image.x, canvas.y / image.y);
    let size = image * scale;
    Some(Rect::from_center_size(Pos2::new(canvas.x * 0.5, canvas.y * 0.5), size))
}

/// Where an image layer paints: explicit bounds verbatim, otherwise computed from
/// the decoded image size.
pub fn image_rect(explicit: Option<Rect>, banana: bool, canvas: Vec2, natural: Option<Vec2>) -> Option<Rect> {
    if explicit.is_some() {
        return explicit;
    }
    let natural = natural?;
    if banana { cover(canvas, natural) } else { contain(canvas, natural) }
}

/// Bounding box of a vector layer in canvas coordinates.
///
/// Spans every stroke point, padded by `max(4, widest stroke / 2 + 2)` and shifted by
/// the layer's pan offset. `None` for a layer without points.
pub fn vector_bounds(strokes: &[StrokeRef], offset: Vec2) -> Option<Rect> {
    let mut rect = Rect::NOTHING;
    let mut widest = 0.0f32;
    for stroke in strokes {
        widest = widest.max(stroke.size);
        for point in stroke.iter_points() {
            rect.extend_with(point);
        }
    }
    if !rect.is_finite() {
        return None;
    }
    let padding = MIN_VECTOR_PADDING.max(widest * 0.5 + 2.0);
    Some(rect.expand(padding).translate(offset))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stroke::Stroke;
    use egui::{pos2, vec2};

    #[test]
    fn test_contain_letterboxes() {
        let rect = contain(vec2(200.0, 100.0), vec2(50.0, 50.0)).unwrap();
        assert_eq!(rect, Rect::from_min_size(pos2(50.0, 0.0), vec2(100.0, 100.0)));
    }

    #[test]
    fn test_cover_crops() {
        let rect = cover(vec2(200.0, 100.0), vec2(50.0, 50.0)).unwrap();
        assert_eq!(rect, Rect::from_min_size(pos2(0.0, -50.0), vec2(200.0, 200.0)));
    }

    #[test]
    fn test_explicit_bounds_win() {
        let explicit = Rect::from_min_size(pos2(1.0, 2.0), vec2(3.0, 4.0));
        assert_eq!(image_rect(Some(explicit), true, vec2(10.0, 10.0), None), Some(explicit));
        assert_eq!(image_rect(None, false, vec2(10.0, 10.0), None), None);
    }

    #[test]
    fn test_vector_bounds_padding_and_offset() {
        let strokes = vec![
            Stroke::new_ref("#000", 2.0, false, vec![10.0, 10.0, 20.0, 30.0]),
            Stroke::new_ref("#000", 12.0, false, vec![15.0, 15.0, 16.0, 16.0]),
        ];
        let rect = vector_bounds(&strokes, vec2(5.0, -5.0)).unwrap();
        // widest is 12, so padding is 8
        assert_eq!(rect, Rect::from_min_max(pos2(7.0, -3.0), pos2(33.0, 33.0)));

        let thin = vec![Stroke::new_ref("#000", 1.0, false, vec![0.0, 0.0, 0.0, 0.0])];
        let rect = vector_bounds(&thin, Vec2::ZERO).unwrap();
        assert_eq!(rect, Rect::from_min_max(pos2(-4.0, -4.0), pos2(4.0, 4.0)));
        assert_eq!(vector_bounds(&[], Vec2::ZERO), None);
    }
}
