//! Output encoding of the composited surface.

use std::io::Cursor;

use base64::Engine;
use image::{
    ExtendedColorType, ImageEncoder, RgbaImage,
    codecs::{jpeg::JpegEncoder, png::PngEncoder},
};

use crate::error::RenderError;

/// Encoded output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum ExportFormat {
    /// Lossless, keeps transparency.
    #[default]
    Png,
    /// Lossy, no transparency; `quality` applies.
    Jpeg,
}

impl ExportFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }
}

/// Per-render output settings.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ExportConfig {
    pub format: ExportFormat,
    /// In `(0, 1]`; only JPEG uses it.
    pub quality: f32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Png,
            quality: 0.9,
        }
    }
}

impl ExportConfig {
    pub fn png() -> Self {
        Self::default()
    }

    pub fn jpeg(quality: f32) -> Self {
        Self {
            format: ExportFormat::Jpeg,
            quality,
        }
    }

    /// JPEG encoder quality in `1..=100`; out-of-range values are clamped.
    pub fn jpeg_quality(&self) -> u8 {
        if !self.quality.is_finite() {
            return 90;
        }
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// Encodes `surface` as configured.
///
/// JPEG has no alpha channel: the surface is flattened onto black first.
pub fn encode(surface: &RgbaImage, config: &ExportConfig) -> Result<Vec<u8>, RenderError> {
    let (width, height) = surface.dimensions();
    let mut out = Cursor::new(Vec::new());

    match config.format {
        ExportFormat::Png => PngEncoder::new(&mut out)
            .write_image(surface.as_raw(), width, height, ExtendedColorType::Rgba8)
            .map_err(RenderError::Encode)?,
        ExportFormat::Jpeg => {
            let rgb = flatten_onto_black(surface);
            JpegEncoder::new_with_quality(&mut out, config.jpeg_quality())
                .write_image(&rgb, width, height, ExtendedColorType::Rgb8)
                .map_err(RenderError::Encode)?
        }
    }

    Ok(out.into_inner())
}

fn flatten_onto_black(surface: &RgbaImage) -> Vec<u8> {
    surface
        .pixels()
        .flat_map(|p| {
            let [r, g, b, a] = p.0;
            let scale = |c: u8| ((c as u16 * a as u16 + 127) / 255) as u8;
            [scale(r), scale(g), scale(b)]
        })
        .collect()
}

/// Wraps encoded bytes in a `data:` URI.
pub fn to_data_uri(bytes: &[u8], format: ExportFormat) -> String {
    format!(
        "data:{};base64,{}",
        format.mime_type(),
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

/// Splits a base64 `data:` URI into its MIME type and payload.
pub fn parse_data_uri(uri: &str) -> Option<(String, Vec<u8>)> {
    let rest = uri.trim().strip_prefix("data:")?;
    let (header, payload) = rest.split_once(',')?;
    let mime = header
        .split(';')
        .next()
        .filter(|v| !v.is_empty())
        .unwrap_or("application/octet-stream")
        .to_string();
    if !header.split(';').any(|part| part == "base64") {
        return None;
    }
    let data = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .ok()?;
    Some((mime, data))
}

/// Download name for `base`: a trailing extension is replaced by the format's.
pub fn file_name(base: &str, format: ExportFormat) -> String {
    let base = base.trim();
    let stem = base.rsplit_once('.').map_or(base, |(stem, _)| stem).trim();
    let stem = if stem.is_empty() { "text-overlay" } else { stem };
    format!("{stem}.{}", format.extension())
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn checker() -> RgbaImage {
        RgbaImage::from_fn(8, 6, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([255, 0, 0, 255])
            } else {
                Rgba([0, 0, 255, 0])
            }
        })
    }

    #[test]
    fn png_preserves_pixels_and_alpha() {
        let surface = checker();
        let bytes = encode(&surface, &ExportConfig::png()).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap().to_rgba8();
        assert_eq!(decoded, surface);
    }

    #[test]
    fn jpeg_drops_alpha_and_keeps_size() {
        let bytes = encode(&checker(), &ExportConfig::jpeg(0.8)).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (8, 6));
        assert!(!decoded.color().has_alpha());
    }

    #[test]
    fn jpeg_quality_mapping() {
        assert_eq!(ExportConfig::jpeg(0.9).jpeg_quality(), 90);
        assert_eq!(ExportConfig::jpeg(1.0).jpeg_quality(), 100);
        assert_eq!(ExportConfig::jpeg(0.0).jpeg_quality(), 1);
        assert_eq!(ExportConfig::jpeg(7.0).jpeg_quality(), 100);
        assert_eq!(ExportConfig::jpeg(f32::NAN).jpeg_quality(), 90);
    }

    #[test]
    fn flattening_multiplies_by_alpha() {
        let surface = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 128]));
        assert_eq!(flatten_onto_black(&surface), vec![100, 50, 25]);
    }

    #[test]
    fn data_uri_round_trip() {
        let uri = to_data_uri(b"Hello", ExportFormat::Png);
        assert_eq!(uri, "data:image/png;base64,SGVsbG8=");
        let (mime, data) = parse_data_uri(&uri).unwrap();
        assert_eq!(mime, "image/png");
        assert_eq!(data, b"Hello");

        assert!(parse_data_uri("data:image/png,plain").is_none());
        assert!(parse_data_uri("data:image/png;base64,@@@").is_none());
        assert!(parse_data_uri("image/png;base64,SGVsbG8=").is_none());
    }

    #[test]
    fn file_names_follow_format() {
        assert_eq!(file_name("text-overlay", ExportFormat::Png), "text-overlay.png");
        assert_eq!(file_name("poster.png", ExportFormat::Jpeg), "poster.jpeg");
        assert_eq!(file_name("", ExportFormat::Png), "text-overlay.png");
        assert_eq!(file_name("my.holiday.png", ExportFormat::Jpeg), "my.holiday.jpeg");
        assert_eq!(file_name(".png", ExportFormat::Png), "text-overlay.png");
    }
}
