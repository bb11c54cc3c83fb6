use egui::{Pos2, Vec2};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::color::{sanitize_color, sanitize_size};

/// One freehand polyline. Points are stored flat as `[x0, y0, x1, y1, ...]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub points: Vec<f32>,
    pub color: String,
    pub size: f32,
    #[serde(default)]
    pub erase: bool,
}

// Committed strokes are shared between the live layer list and undo snapshots
pub type StrokeRef = Arc<Stroke>;

impl Stroke {
    pub fn new(color: impl Into<String>, size: f32, erase: bool, points: Vec<f32>) -> Self {
        Self {
            points,
            color: color.into(),
            size,
            erase,
        }
    }

    pub fn new_ref(color: impl Into<String>, size: f32, erase: bool, points: Vec<f32>) -> StrokeRef {
        Arc::new(Self::new(color, size, erase, points))
    }

    /// Number of complete `(x, y)` pairs. A trailing odd coordinate is ignored.
    pub fn point_count(&self) -> usize {
        self.points.len() / 2
    }

    pub fn iter_points(&self) -> impl Iterator<Item = Pos2> + '_ {
        self.points.chunks_exact(2).map(|pair| Pos2::new(pair[0], pair[1]))
    }

    pub fn last_point(&self) -> Option<Pos2> {
        self.iter_points().last()
    }

    /// Brings colour, size and point list into the form a save/load cycle preserves:
    /// trimmed colour of bounded length, brush size within the brush range, and an
    /// even number of coordinates.
    pub fn sanitized(mut self, fallback_size: f32) -> Self {
        self.color = sanitize_color(self.color);
        self.size = sanitize_size(self.size, fallback_size);
        let even = self.points.len() & !1;
        self.points.truncate(even);
        self
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        let points = self
            .iter_points()
            .flat_map(|p| [p.x + delta.x, p.y + delta.y])
            .collect();
        Self {
            points,
            color: self.color.clone(),
            size: self.size,
            erase: self.erase,
        }
    }
}

/// Stroke under construction while the pointer is down.
///
/// Points arrive in canvas (CSS pixel) coordinates and are thinned: a sample is only
/// recorded when it lies at least `min_distance` away from the previous one.
#[derive(Debug, Clone)]
pub struct MutableStroke {
    points: Vec<f32>,
    color: String,
    size: f32,
    erase: bool,
    min_distance_sq: f32,
}

impl MutableStroke {
    /// Starts a stroke with the first point duplicated, so a tap still yields a dot.
    pub fn begin(start: Pos2, color: impl Into<String>, size: f32, erase: bool, min_distance: f32) -> Self {
        Self {
            points: vec![start.x, start.y, start.x, start.y],
            color: color.into(),
            size,
            erase,
            min_distance_sq: min_distance * min_distance,
        }
    }

    /// Records `point` unless it is closer than the sampling distance to the last one.
    /// Returns whether the point was kept.
    pub fn add_point(&mut self, point: Pos2) -> bool {
        if !point.x.is_finite() || !point.y.is_finite() {
            return false;
        }
        if let Some(last) = self.last_point() {
            let dx = point.x - last.x;
            let dy = point.y - last.y;
            if dx * dx + dy * dy < self.min_distance_sq {
                return false;
            }
        }
        self.points.push(point.x);
        self.points.push(point.y);
        true
    }

    pub fn last_point(&self) -> Option<Pos2> {
        let n = self.points.len();
        (n >= 2).then(|| Pos2::new(self.points[n - 2], self.points[n - 1]))
    }

    pub fn point_count(&self) -> usize {
        self.points.len() / 2
    }

    pub fn erase(&self) -> bool {
        self.erase
    }

    /// Snapshot of the in-progress geometry for preview painting.
    pub fn to_stroke(&self) -> Stroke {
        Stroke::new(self.color.clone(), self.size, self.erase, self.points.clone())
    }

    /// Finishes the stroke, shifting points into the coordinate space of a layer
    /// that is panned by `layer_offset`.
    pub fn finish(self, layer_offset: Vec2) -> Stroke {
        let stroke = Stroke::new(self.color, self.size, self.erase, self.points);
        if layer_offset == Vec2::ZERO {
            stroke
        } else {
            stroke.translated(-layer_offset)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_duplicates_first_point() {
        let stroke = MutableStroke::begin(Pos2::new(3.0, 4.0), "#000", 2.0, false, 1.0);
        assert_eq!(stroke.point_count(), 2);
        assert_eq!(stroke.to_stroke().points, vec![3.0, 4.0, 3.0, 4.0]);
    }

    #[test]
    fn test_thinning_drops_close_samples() {
        let mut stroke = MutableStroke::begin(Pos2::new(0.0, 0.0), "#000", 2.0, false, 1.0);
        assert!(!stroke.add_point(Pos2::new(0.5, 0.5)));
        assert!(stroke.add_point(Pos2::new(1.0, 0.0)));
        assert!(!stroke.add_point(Pos2::new(1.2, 0.3)));
        assert_eq!(stroke.point_count(), 3);
    }

    #[test]
    fn test_finish_makes_points_layer_local() {
        let mut stroke = MutableStroke::begin(Pos2::new(10.0, 10.0), "#000", 2.0, false, 1.0);
        stroke.add_point(Pos2::new(20.0, 15.0));
        let done = stroke.finish(Vec2::new(5.0, -5.0));
        assert_eq!(done.points, vec![5.0, 15.0, 5.0, 15.0, 15.0, 20.0]);
    }

    #[test]
    fn test_odd_trailing_coordinate_is_ignored() {
        let stroke = Stroke::new("#000", 1.0, false, vec![1.0, 2.0, 3.0]);
        assert_eq!(stroke.point_count(), 1);
        assert_eq!(stroke.last_point(), Some(Pos2::new(1.0, 2.0)));
    }
}
