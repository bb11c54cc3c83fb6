use image::Rgba;

pub const DEFAULT_STROKE_COLOR: &str = "#000000";
pub const MIN_BRUSH_SIZE: f32 = 1.0;
pub const MAX_BRUSH_SIZE: f32 = 200.0;
const MAX_COLOR_LEN: usize = 32;

/// Parses a CSS colour into straight (non-premultiplied) RGBA.
///
/// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`, `rgba(r, g, b, a)`
/// and a few names. Anything else paints as opaque black.
pub fn parse_css_color(text: &str) -> Rgba<u8> {
    try_parse_css_color(text).unwrap_or(Rgba([0, 0, 0, 255]))
}

pub fn try_parse_css_color(text: &str) -> Option<Rgba<u8>> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix('#') {
        return parse_hex(hex);
    }
    let lower = text.to_ascii_lowercase();
    if let Some(body) = lower
        .strip_prefix("rgba(")
        .or_else(|| lower.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return parse_rgb_function(body);
    }
    named(&lower)
}

fn parse_hex(hex: &str) -> Option<Rgba<u8>> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

fn parse_rgb_function(body: &str) -> Option<Rgba<u8>> {
    let parts: Vec<&str> = body.split(',').map(str::trim).collect();
    if parts.len() != 3 && parts.len() != 4 {
        return None;
    }
    let channel = |s: &str| s.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);
    let alpha = match parts.get(3) {
        Some(a) => (a.parse::<f32>().ok()?.clamp(0.0, 1.0) * 255.0).round() as u8,
        None => 255,
    };
    Some(Rgba([channel(parts[0])?, channel(parts[1])?, channel(parts[2])?, alpha]))
}

fn named(name: &str) -> Option<Rgba<u8>> {
    let rgba = match name {
        "black" => [0, 0, 0, 255],
        "white" => [255, 255, 255, 255],
        "red" => [255, 0, 0, 255],
        "green" => [0, 128, 0, 255],
        "blue" => [0, 0, 255, 255],
        "gray" | "grey" => [128, 128, 128, 255],
        "transparent" => [0, 0, 0, 0],
        _ => return None,
    };
    Some(Rgba(rgba))
}

/// `#rrggbb`, or `#rrggbbaa` when not fully opaque.
pub fn to_hex(color: Rgba<u8>) -> String {
    let Rgba([r, g, b, a]) = color;
    if a == 255 {
        format!("#{r:02x}{g:02x}{b:02x}")
    } else {
        format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
    }
}

pub fn sanitize_color(color: String) -> String {
    let mut end = color.trim_end().len().min(MAX_COLOR_LEN);
    while !color.is_char_boundary(end) {
        end -= 1;
    }
    let trimmed = color[..end].trim();
    if trimmed.is_empty() {
        return DEFAULT_STROKE_COLOR.to_string();
    }
    if trimmed.len() == color.len() {
        color
    } else {
        trimmed.to_string()
    }
}

pub fn sanitize_size(size: f32, fallback: f32) -> f32 {
    let size = if size.is_finite() { size } else { fallback };
    size.clamp(MIN_BRUSH_SIZE, MAX_BRUSH_SIZE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_forms() {
        assert_eq!(parse_css_color("#000"), Rgba([0, 0, 0, 255]));
        assert_eq!(parse_css_color("#fff"), Rgba([255, 255, 255, 255]));
        assert_eq!(parse_css_color("#ff000080"), Rgba([255, 0, 0, 128]));
        assert_eq!(parse_css_color("#1f2a3b"), Rgba([0x1f, 0x2a, 0x3b, 255]));
    }

    #[test]
    fn test_rgb_functions_and_names() {
        assert_eq!(parse_css_color("rgb(10, 20, 30)"), Rgba([10, 20, 30, 255]));
        assert_eq!(parse_css_color("rgba(10,20,30,0.5)"), Rgba([10, 20, 30, 128]));
        assert_eq!(parse_css_color("White"), Rgba([255, 255, 255, 255]));
        assert_eq!(try_parse_css_color("not-a-colour"), None);
        assert_eq!(parse_css_color("#12"), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_to_hex() {
        assert_eq!(to_hex(Rgba([255, 0, 16, 255])), "#ff0010");
        assert_eq!(to_hex(Rgba([0, 0, 0, 128])), "#00000080");
    }

    #[test]
    fn test_sanitizers() {
        assert_eq!(sanitize_color(String::new()), DEFAULT_STROKE_COLOR);
        assert_eq!(sanitize_color(" #abc ".into()), "#abc");
        assert_eq!(sanitize_color("x".repeat(40)).len(), 32);
        let cut = sanitize_color(format!("{} rgb", "y".repeat(31)));
        assert_eq!(cut, "y".repeat(31));
        assert_eq!(sanitize_color(cut.clone()), cut);
        assert_eq!(sanitize_size(f32::NAN, 4.0), 4.0);
        assert_eq!(sanitize_size(0.0, 4.0), MIN_BRUSH_SIZE);
        assert_eq!(sanitize_size(1000.0, 4.0), MAX_BRUSH_SIZE);
    }
}
