//! Text element records consumed by the layout resolver and compositor.

use std::{fmt, str::FromStr};

use euclid::point2;

use crate::geometry::{Path, PathPoint};

/// Stable identity of a [`TextElement`] for its whole lifetime.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(pub String);

impl ElementId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Straight (non-premultiplied) sRGB colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Rejected colour string.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized color: {0:?}")]
pub struct ParseColorError(String);

impl FromStr for Color {
    type Err = ParseColorError;

    /// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa`, `rgb(r, g, b)`,
    /// `rgba(r, g, b, a)` with `a` in `0..=1`, and a handful of names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_string());
        let trimmed = s.trim();

        if let Some(hex) = trimmed.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(err);
        }

        let lower = trimmed.to_ascii_lowercase();
        if let Some(args) = lower
            .strip_prefix("rgba(")
            .or_else(|| lower.strip_prefix("rgb("))
            .and_then(|rest| rest.strip_suffix(')'))
        {
            return parse_rgb_args(args).ok_or_else(err);
        }

        match lower.as_str() {
            "white" => Ok(Self::WHITE),
            "black" => Ok(Self::BLACK),
            "red" => Ok(Self::rgb(255, 0, 0)),
            "green" => Ok(Self::rgb(0, 128, 0)),
            "blue" => Ok(Self::rgb(0, 0, 255)),
            "yellow" => Ok(Self::rgb(255, 255, 0)),
            "transparent" => Ok(Self::rgba(0, 0, 0, 0)),
            _ => Err(err()),
        }
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
        4 => Some(Color::rgba(nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?)),
        6 => Some(Color::rgb(byte(0)?, byte(2)?, byte(4)?)),
        8 => Some(Color::rgba(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

fn parse_rgb_args(args: &str) -> Option<Color> {
    let parts: Vec<&str> = args.split(',').map(str::trim).collect();
    let channel = |s: &str| s.parse::<f32>().ok().map(|v| v.clamp(0.0, 255.0).round() as u8);

    match parts.as_slice() {
        [r, g, b] => Some(Color::rgb(channel(r)?, channel(g)?, channel(b)?)),
        [r, g, b, a] => {
            let alpha = a.parse::<f32>().ok()?.clamp(0.0, 1.0);
            Some(Color::rgba(
                channel(r)?,
                channel(g)?,
                channel(b)?,
                (alpha * 255.0).round() as u8,
            ))
        }
        _ => None,
    }
}

/// CSS-style numeric font weight.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FontWeight(pub u16);

impl FontWeight {
    pub const LIGHTER: Self = Self(300);
    pub const NORMAL: Self = Self(400);
    pub const BOLD: Self = Self(700);
}

impl Default for FontWeight {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl FromStr for FontWeight {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "normal" => Ok(Self::NORMAL),
            "bold" => Ok(Self::BOLD),
            "lighter" => Ok(Self::LIGHTER),
            other => other.parse::<u16>().map(|w| Self(w.clamp(1, 1000))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
/// Horizontal justification of a text run relative to its anchor.
pub enum HorizontalAlign {
    Left,
    #[default]
    Center,
    Right,
}

/// Visual style of every instance produced from an element.
#[derive(Clone, Debug, PartialEq)]
pub struct TextStyle {
    pub font_family: String,
    pub font_weight: FontWeight,
    pub is_italic: bool,
    pub is_underlined: bool,
    /// Size in pixels.
    pub font_size: f32,
    pub color: Color,
    pub text_align: HorizontalAlign,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_family: "Inter".to_string(),
            font_weight: FontWeight::NORMAL,
            is_italic: false,
            is_underlined: false,
            font_size: 20.0,
            color: Color::WHITE,
            text_align: HorizontalAlign::Center,
        }
    }
}

impl TextStyle {
    /// Sizes below this rasterize to nothing visible.
    pub const MIN_FONT_SIZE: f32 = 0.5;
    /// Larger sizes would need glyph bitmaps far beyond any output surface.
    pub const MAX_FONT_SIZE: f32 = 4096.0;

    /// Whether the size is within `MIN_FONT_SIZE..=MAX_FONT_SIZE`.
    pub fn has_drawable_size(&self) -> bool {
        (Self::MIN_FONT_SIZE..=Self::MAX_FONT_SIZE).contains(&self.font_size)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
/// Axis along which grid repetitions are laid out.
pub enum RepetitionDirection {
    #[default]
    Horizontal,
    Vertical,
    /// Roughly square grid.
    Both,
}

/// Grid repetition parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Repetition {
    pub is_repeating: bool,
    pub count: u32,
    pub horizontal_spacing: f32,
    pub vertical_spacing: f32,
    pub direction: RepetitionDirection,
}

impl Default for Repetition {
    fn default() -> Self {
        Self {
            is_repeating: true,
            count: 3,
            horizontal_spacing: 100.0,
            vertical_spacing: 50.0,
            direction: RepetitionDirection::Horizontal,
        }
    }
}

/// The unit of placement: one piece of text with its style and placement.
#[derive(Clone, Debug, PartialEq)]
pub struct TextElement {
    pub id: ElementId,
    pub text: String,
    pub style: TextStyle,
    /// Anchor used while no path has been drawn.
    pub position: PathPoint,
    pub path: Path,
    pub repetition: Repetition,
    /// Extra spacing between words when the text follows a path.
    pub space_between: f32,
    /// Paint order, ascending back to front.
    pub z_index: i32,
}

impl TextElement {
    pub const DEFAULT_POSITION: PathPoint = PathPoint::new(50.0, 50.0);
    pub const DEFAULT_SPACE_BETWEEN: f32 = 5.0;

    /// Creates an element with the default style and placement.
    pub fn new(id: impl Into<ElementId>, text: impl Into<String>, z_index: i32) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            style: TextStyle::default(),
            position: Self::DEFAULT_POSITION,
            path: Path::default(),
            repetition: Repetition::default(),
            space_between: Self::DEFAULT_SPACE_BETWEEN,
            z_index,
        }
    }

    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.position = point2(x, y);
        self
    }

    pub fn with_path(mut self, path: Path) -> Self {
        self.path = path;
        self
    }

    pub fn with_repetition(mut self, repetition: Repetition) -> Self {
        self.repetition = repetition;
        self
    }

    /// Disables grid repetition so the element paints once at its anchor.
    pub fn single(mut self) -> Self {
        self.repetition.is_repeating = false;
        self
    }
}

impl From<String> for ElementId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hex_colors() {
        assert_eq!("#FFFFFF".parse::<Color>().unwrap(), Color::WHITE);
        assert_eq!("#f00".parse::<Color>().unwrap(), Color::rgb(255, 0, 0));
        assert_eq!(
            "#11223380".parse::<Color>().unwrap(),
            Color::rgba(0x11, 0x22, 0x33, 0x80)
        );
        assert_eq!("#0008".parse::<Color>().unwrap(), Color::rgba(0, 0, 0, 0x88));
        assert!("#12345".parse::<Color>().is_err());
        assert!("#gggggg".parse::<Color>().is_err());
    }

    #[test]
    fn parses_functional_and_named_colors() {
        assert_eq!(
            "rgb(10, 20, 30)".parse::<Color>().unwrap(),
            Color::rgb(10, 20, 30)
        );
        assert_eq!(
            "rgba(255, 0, 0, 0.5)".parse::<Color>().unwrap(),
            Color::rgba(255, 0, 0, 128)
        );
        assert_eq!("Black".parse::<Color>().unwrap(), Color::BLACK);
        assert!("rgb(1, 2)".parse::<Color>().is_err());
        assert!("chartreuse-ish".parse::<Color>().is_err());
    }

    #[test]
    fn parses_font_weights() {
        assert_eq!("bold".parse::<FontWeight>().unwrap(), FontWeight::BOLD);
        assert_eq!("lighter".parse::<FontWeight>().unwrap(), FontWeight::LIGHTER);
        assert_eq!("600".parse::<FontWeight>().unwrap(), FontWeight(600));
        assert!("heavy".parse::<FontWeight>().is_err());
    }

    #[test]
    fn new_element_uses_lifecycle_defaults() {
        let element = TextElement::new("text-1", "hello", 1);
        assert_eq!(element.position, point2(50.0, 50.0));
        assert!(element.path.points.is_empty());
        assert!(!element.path.closed);
        assert!(element.repetition.is_repeating);
        assert_eq!(element.repetition.count, 3);
        assert_eq!(element.space_between, 5.0);
        assert_eq!(element.style.font_size, 20.0);
        assert_eq!(element.style.color, Color::WHITE);
    }

    #[test]
    fn drawable_size_rejects_degenerate_values() {
        let mut style = TextStyle::default();
        assert!(style.has_drawable_size());
        style.font_size = -4.0;
        assert!(!style.has_drawable_size());
        style.font_size = f32::NAN;
        assert!(!style.has_drawable_size());
        style.font_size = 1e-6;
        assert!(!style.has_drawable_size());
        style.font_size = 1e6;
        assert!(!style.has_drawable_size());
        style.font_size = f32::INFINITY;
        assert!(!style.has_drawable_size());
        style.font_size = TextStyle::MIN_FONT_SIZE;
        assert!(style.has_drawable_size());
        style.font_size = TextStyle::MAX_FONT_SIZE;
        assert!(style.has_drawable_size());
    }
}
