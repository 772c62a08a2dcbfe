use std::collections::HashMap;

use crate::font_storage::ResolvedFont;

/// Font sizes are quantized to 1/256 px so near-identical sizes share a raster.
pub const SUB_PIXEL_QUANTIZE: f32 = 256f32;

/// Identifies one rasterized glyph.
///
/// The same glyph is not guaranteed to receive the same key across program
/// runs, since `fontdb` IDs are assigned at load time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GlyphKey {
    font_id: fontdb::ID,
    glyph_index: u16,
    font_size: u32,
}

impl GlyphKey {
    pub fn new(font_id: fontdb::ID, glyph_index: u16, font_size: f32) -> Self {
        Self {
            font_id,
            glyph_index,
            font_size: (font_size * SUB_PIXEL_QUANTIZE).round() as u32,
        }
    }

    pub fn glyph_index(&self) -> u16 {
        self.glyph_index
    }

    pub fn font_size(&self) -> f32 {
        self.font_size as f32 / SUB_PIXEL_QUANTIZE
    }
}

/// Coverage bitmap of a glyph, row-major, one byte per pixel.
#[derive(Clone, Debug)]
pub struct RasterizedGlyph {
    pub metrics: fontdue::Metrics,
    pub coverage: Vec<u8>,
}

impl RasterizedGlyph {
    pub fn is_blank(&self) -> bool {
        self.metrics.width == 0 || self.metrics.height == 0
    }
}

/// Rasterized glyphs reused within one render call.
///
/// Repeated grid instances and repeated path text hit the same handful of
/// glyphs, so each one is rasterized once.
#[derive(Default)]
pub struct GlyphCache {
    glyphs: HashMap<GlyphKey, RasterizedGlyph, fxhash::FxBuildHasher>,
}

impl GlyphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.glyphs.clear();
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Returns the raster for `glyph_index` at `font_size`, rasterizing on first use.
    pub fn get(
        &mut self,
        font: &ResolvedFont,
        glyph_index: u16,
        font_size: f32,
    ) -> &RasterizedGlyph {
        let key = GlyphKey::new(font.id, glyph_index, font_size);
        self.glyphs.entry(key).or_insert_with(|| {
            let (metrics, coverage) = font
                .font
                .rasterize_indexed(key.glyph_index(), key.font_size());
            RasterizedGlyph { metrics, coverage }
        })
    }
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{element::TextStyle, font_storage::FontStorage};

    #[test]
    fn sizes_quantize_to_sub_pixels() {
        let mut storage = FontStorage::new();
        storage.load_system_fonts();
        let Some(font) = storage.resolve(&TextStyle::default(), "sans-serif") else {
            return;
        };

        let a = GlyphKey::new(font.id, 5, 12.0);
        let b = GlyphKey::new(font.id, 5, 12.0 + 1.0 / 1024.0);
        let c = GlyphKey::new(font.id, 5, 12.5);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(c.font_size(), 12.5);
    }

    #[test]
    fn rasterizes_each_glyph_once() {
        let mut storage = FontStorage::new();
        storage.load_system_fonts();
        let Some(font) = storage.resolve(&TextStyle::default(), "sans-serif") else {
            return;
        };
        let glyph = font.font.lookup_glyph_index('H');

        let mut cache = GlyphCache::new();
        let first = cache.get(&font, glyph, 24.0).clone();
        let second = cache.get(&font, glyph, 24.0).clone();
        assert_eq!(cache.len(), 1);
        assert_eq!(first.coverage, second.coverage);
        assert!(!first.is_blank());
        assert_eq!(
            first.coverage.len(),
            first.metrics.width * first.metrics.height
        );

        cache.get(&font, glyph, 30.0);
        assert_eq!(cache.len(), 2);
        cache.clear();
        assert!(cache.is_empty());
    }
}
