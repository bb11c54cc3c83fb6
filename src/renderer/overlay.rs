use egui::{Rect, Vec2};
use image::Rgba;

use super::surface::{PaintMode, RasterSurface};

const HANDLE_SIZE: f32 = 8.0;
const HANDLE_COLOR: Rgba<u8> = Rgba([30, 144, 255, 255]);
const HANDLE_FILL: Rgba<u8> = Rgba([255, 255, 255, 255]);
const OUTLINE_WIDTH: f32 = 1.0;
const DASH_LENGTH: f32 = 6.0;

/// Corner handles of the move-mode selection box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::TopLeft, Corner::TopRight, Corner::BottomLeft, Corner::BottomRight];

    pub fn of(self, bounds: Rect) -> egui::Pos2 {
        match self {
            Corner::TopLeft => bounds.left_top(),
            Corner::TopRight => bounds.right_top(),
            Corner::BottomLeft => bounds.left_bottom(),
            Corner::BottomRight => bounds.right_bottom(),
        }
    }
}

/// Paints the dashed selection box with its four corner handles.
///
/// Drawn straight onto the onscreen surface after compositing, so it never ends up
/// in a layer or in an exported composite.
pub fn draw_move_overlay(surface: &mut RasterSurface, bounds: Rect) {
    if !bounds.is_finite() {
        return;
    }
    surface.dashed_rect(bounds, HANDLE_COLOR, OUTLINE_WIDTH, DASH_LENGTH);
    for corner in Corner::ALL {
        let handle = Rect::from_center_size(corner.of(bounds), Vec2::splat(HANDLE_SIZE));
        surface.fill_rect(handle, HANDLE_COLOR, PaintMode::SourceOver);
        surface.fill_rect(handle.shrink(OUTLINE_WIDTH * 1.5), HANDLE_FILL, PaintMode::SourceOver);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::{pos2, vec2};

    #[test]
    fn test_overlay_marks_corners_and_leaves_inside_alone() {
        let mut surface = RasterSurface::new(vec2(40.0, 40.0), 1.0);
        draw_move_overlay(&mut surface, Rect::from_min_max(pos2(10.0, 10.0), pos2(30.0, 30.0)));
        assert_eq!(surface.pixel(10, 10), Some(HANDLE_FILL));
        assert_eq!(surface.pixel(6, 6), Some(HANDLE_COLOR));
        assert_eq!(surface.pixel(20, 20).map(|p| p[3]), Some(0));
    }
}
