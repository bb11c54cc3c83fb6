//! Persisted wire format of the layer tree.
//!
//! ```json
//! {"layers":[{"id":"…","name":"…","visible":true,"type":"vector","strokes":[…],"offsetX":4}]}
//! ```
//!
//! Saving is a plain serde derive. Loading is lenient: every layer is rebuilt field by
//! field from untyped JSON so one bad entry never sinks the whole document, and older
//! flat stroke lists are migrated into a single vector layer.

use egui::{Rect, Vec2, pos2};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::color::{DEFAULT_STROKE_COLOR, sanitize_color};
use crate::id_generator::generate_layer_id;
use crate::layer::{
    DEFAULT_BACKGROUND_COLOR, DEFAULT_BACKGROUND_NAME, DEFAULT_IMAGE_NAME, Layer, LayerContent, LayerId,
    create_layer, next_layer_name,
};
use crate::stroke::Stroke;

const DEFAULT_LOADED_SIZE: f32 = 4.0;

/// The saved form of a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardDocument {
    pub layers: Vec<WireLayer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireLayer {
    pub id: String,
    pub name: String,
    pub visible: bool,
    #[serde(flatten)]
    pub content: WireContent,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WireContent {
    Vector {
        strokes: Vec<Stroke>,
        #[serde(rename = "offsetX", default, skip_serializing_if = "is_zero")]
        offset_x: f32,
        #[serde(rename = "offsetY", default, skip_serializing_if = "is_zero")]
        offset_y: f32,
    },
    Image {
        #[serde(rename = "imageSrc")]
        image_src: String,
        #[serde(default, skip_serializing_if = "is_false")]
        banana: bool,
        #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
        bounds: Option<WireBounds>,
    },
    Background {
        color: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WireBounds {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

fn is_zero(value: &f32) -> bool {
    *value == 0.0
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl BoardDocument {
    pub fn to_json(&self) -> String {
        // A document of strings, numbers and bools always serializes.
        serde_json::to_string(self).unwrap_or_else(|err| {
            log::warn!("failed to serialize board: {err}");
            String::from(r#"{"layers":[]}"#)
        })
    }
}

impl From<&Layer> for WireLayer {
    fn from(layer: &Layer) -> Self {
        let content = match &layer.content {
            LayerContent::Vector { strokes, offset } => WireContent::Vector {
                strokes: strokes.iter().map(|s| Stroke::clone(s)).collect(),
                offset_x: offset.x,
                offset_y: offset.y,
            },
            LayerContent::Image { src, banana, bounds } => WireContent::Image {
                image_src: src.clone(),
                banana: *banana,
                bounds: bounds.map(|r| WireBounds {
                    x: r.min.x,
                    y: r.min.y,
                    width: r.width(),
                    height: r.height(),
                }),
            },
            LayerContent::Background { color } => WireContent::Background { color: color.clone() },
        };
        Self {
            id: layer.id.to_string(),
            name: layer.name.clone(),
            visible: layer.visible,
            content,
        }
    }
}

/// Saves `layers` (bottom-most first) as a document.
pub fn save(layers: &[Layer]) -> BoardDocument {
    BoardDocument {
        layers: layers.iter().map(WireLayer::from).collect(),
    }
}

/// Loads persisted text. Never fails: unreadable input yields one blank vector layer.
pub fn load(text: &str) -> Vec<Layer> {
    match serde_json::from_str::<Value>(text) {
        Ok(value) => load_value(&value),
        Err(err) => {
            log::warn!("board data is not valid JSON ({err}), starting blank");
            fallback()
        }
    }
}

/// Loads an already parsed document, see [`load`].
pub fn load_value(value: &Value) -> Vec<Layer> {
    let layers = match value {
        Value::Array(strokes) => migrate_legacy(strokes),
        Value::Object(map) => match (map.get("layers"), map.get("strokes")) {
            (Some(Value::Array(layers)), _) => load_layers(layers),
            (_, Some(Value::Array(strokes))) => migrate_legacy(strokes),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };
    if layers.is_empty() {
        log::warn!("board data held no usable layers, starting blank");
        return fallback();
    }
    layers
}

fn fallback() -> Vec<Layer> {
    vec![create_layer("Layer 1")]
}

fn migrate_legacy(strokes: &[Value]) -> Vec<Layer> {
    let strokes = read_strokes(strokes);
    log::info!("migrating legacy stroke list ({} strokes)", strokes.len());
    let mut layer = create_layer("Layer 1");
    for stroke in strokes {
        layer.add_stroke(stroke);
    }
    vec![layer]
}

fn load_layers(entries: &[Value]) -> Vec<Layer> {
    let mut layers: Vec<Layer> = Vec::with_capacity(entries.len());
    let mut seen = HashSet::new();
    for (index, entry) in entries.iter().enumerate() {
        let Some(mut layer) = entry.as_object().and_then(|map| read_layer(map, &layers)) else {
            log::warn!("dropping unrecognised layer entry #{index}");
            continue;
        };
        if !seen.insert(layer.id.clone()) {
            let fresh = generate_layer_id();
            log::debug!("duplicate layer id {}, reassigned {}", layer.id, fresh);
            layer.id = fresh;
            seen.insert(layer.id.clone());
        }
        layers.push(layer);
    }
    layers
}

fn read_layer(map: &Map<String, Value>, loaded: &[Layer]) -> Option<Layer> {
    let kind = match map.get("type").and_then(Value::as_str) {
        Some(kind) => kind,
        // Untyped entries that carry strokes predate the type tag.
        None if map.get("strokes").is_some_and(Value::is_array) => "vector",
        None => return None,
    };
    let content = match kind {
        "background" => LayerContent::Background {
            color: read_string(map, "color")
                .map(sanitize_color)
                .unwrap_or_else(|| DEFAULT_BACKGROUND_COLOR.to_string()),
        },
        "image" => LayerContent::Image {
            src: read_string(map, "imageSrc")?,
            banana: map.get("banana").and_then(Value::as_bool).unwrap_or(false),
            bounds: read_bounds(map),
        },
        "vector" => LayerContent::Vector {
            strokes: map
                .get("strokes")
                .and_then(Value::as_array)
                .map(|strokes| read_strokes(strokes).into_iter().map(Into::into).collect())
                .unwrap_or_default(),
            offset: Vec2::new(read_f32(map, "offsetX").unwrap_or(0.0), read_f32(map, "offsetY").unwrap_or(0.0)),
        },
        _ => return None,
    };

    let id = read_string(map, "id").map(LayerId::new).unwrap_or_else(generate_layer_id);
    let name = read_string(map, "name").unwrap_or_else(|| match &content {
        LayerContent::Background { .. } => DEFAULT_BACKGROUND_NAME.to_string(),
        LayerContent::Image { .. } => DEFAULT_IMAGE_NAME.to_string(),
        LayerContent::Vector { .. } => next_layer_name(loaded),
    });
    Some(Layer {
        id,
        name,
        visible: map.get("visible").and_then(Value::as_bool).unwrap_or(true),
        content,
    })
}

fn read_string(map: &Map<String, Value>, key: &str) -> Option<String> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn read_f32(map: &Map<String, Value>, key: &str) -> Option<f32> {
    map.get(key).and_then(as_finite)
}

fn as_finite(value: &Value) -> Option<f32> {
    value.as_f64().map(|v| v as f32).filter(|v| v.is_finite())
}

fn read_bounds(map: &Map<String, Value>) -> Option<Rect> {
    let x = read_f32(map, "x")?;
    let y = read_f32(map, "y")?;
    let width = read_f32(map, "width")?;
    let height = read_f32(map, "height")?;
    (width > 0.0 && height > 0.0).then(|| Rect::from_min_size(pos2(x, y), Vec2::new(width, height)))
}

fn read_strokes(values: &[Value]) -> Vec<Stroke> {
    let strokes: Vec<Stroke> = values.iter().filter_map(read_stroke).collect();
    if strokes.len() < values.len() {
        log::warn!("dropped {} malformed stroke(s)", values.len() - strokes.len());
    }
    strokes
}

fn read_stroke(value: &Value) -> Option<Stroke> {
    let map = value.as_object()?;
    let points = read_points(map.get("points")?.as_array()?)?;
    let color = read_string(map, "color").unwrap_or_else(|| DEFAULT_STROKE_COLOR.to_string());
    let size = read_f32(map, "size").unwrap_or(DEFAULT_LOADED_SIZE);
    let erase = map.get("erase").and_then(Value::as_bool).unwrap_or(false);
    Some(Stroke::new(color, size, erase, points).sanitized(DEFAULT_LOADED_SIZE))
}

/// Accepts a flat `[x0, y0, x1, y1, …]` list or a list of `{x, y}` objects.
/// Returns `None` when fewer than two points survive.
fn read_points(values: &[Value]) -> Option<Vec<f32>> {
    let mut points = Vec::with_capacity(values.len() * 2);
    if values.first().is_some_and(Value::is_object) {
        for point in values.iter().filter_map(Value::as_object) {
            if let (Some(x), Some(y)) = (read_f32(point, "x"), read_f32(point, "y")) {
                points.extend([x, y]);
            }
        }
    } else {
        let flat: Option<Vec<f32>> = values.iter().map(as_finite).collect();
        points = flat?;
        points.truncate(points.len() & !1);
    }
    (points.len() >= 4).then_some(points)
}
