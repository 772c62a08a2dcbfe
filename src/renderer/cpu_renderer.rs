pub mod glyph_cache;

use euclid::{Box2D, Point2D, Transform2D, point2};
use image::{Rgba, RgbaImage};

use crate::{
    element::{Color, HorizontalAlign},
    font_storage::ResolvedFont,
    geometry::ImageSpace,
    text::{InstanceAnchor, PlacedInstance},
};

pub use glyph_cache::{GlyphCache, GlyphKey, RasterizedGlyph, SUB_PIXEL_QUANTIZE};

/// Distance from the baseline down to the underline centre, in pixels.
pub const UNDERLINE_OFFSET: f32 = 3.0;
/// How far path glyphs are lowered below their point, in ems, so the glyph
/// body rather than its baseline sits on the path.
pub const PATH_GLYPH_DROP_EM: f32 = 0.35;
/// Horizontal shear of a synthesized oblique, `tan(12°)`.
pub const OBLIQUE_SKEW: f32 = 0.212_556_56;

/// Coordinate space of one instance: origin at its position, x along its
/// rotation, y down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InstanceSpace;

type InstanceToImage = Transform2D<f32, InstanceSpace, ImageSpace>;

/// Glyph of a shaped run; `x` is its pen position from the run start.
#[derive(Clone, Copy, Debug, PartialEq)]
struct ShapedGlyph {
    glyph_index: u16,
    x: f32,
}

/// Horizontal run of glyphs with advance and pair kerning applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ShapedRun {
    glyphs: Vec<ShapedGlyph>,
    /// Sum of advances, i.e. the measured text width.
    pub width: f32,
}

impl ShapedRun {
    pub fn shape(font: &fontdue::Font, text: &str, font_size: f32) -> Self {
        let mut glyphs = Vec::with_capacity(text.len());
        let mut pen = 0.0;
        let mut previous = None;

        for ch in text.chars() {
            let glyph_index = font.lookup_glyph_index(ch);
            if let Some(previous) = previous {
                pen += font
                    .horizontal_kern_indexed(previous, glyph_index, font_size)
                    .unwrap_or(0.0);
            }
            glyphs.push(ShapedGlyph { glyph_index, x: pen });
            pen += font.metrics_indexed(glyph_index, font_size).advance_width;
            previous = Some(glyph_index);
        }

        Self { glyphs, width: pen }
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

/// Paints placed instances onto an RGBA surface.
///
/// Glyph coverage is produced by `fontdue`, mapped through the instance's
/// rotation with bilinear sampling, and blended source-over in the
/// element's colour.
pub struct CpuRenderer {
    cache: GlyphCache,
    synthesize_oblique: bool,
}

impl CpuRenderer {
    pub fn new(synthesize_oblique: bool) -> Self {
        Self {
            cache: GlyphCache::new(),
            synthesize_oblique,
        }
    }

    /// Paints one instance with `font`.
    pub fn paint_instance(
        &mut self,
        surface: &mut RgbaImage,
        instance: &PlacedInstance<'_>,
        font: &ResolvedFont,
    ) {
        let style = instance.style;
        let font_size = style.font_size;
        let run = ShapedRun::shape(&font.font, &instance.content, font_size);
        if run.is_empty() {
            return;
        }

        // Run start and baseline in instance space.
        let (start_x, baseline) = match instance.anchor {
            InstanceAnchor::Aligned(HorizontalAlign::Left) => (0.0, 0.0),
            InstanceAnchor::Aligned(HorizontalAlign::Center) => (-run.width / 2.0, 0.0),
            InstanceAnchor::Aligned(HorizontalAlign::Right) => (-run.width, 0.0),
            InstanceAnchor::Centered => (-run.width / 2.0, PATH_GLYPH_DROP_EM * font_size),
        };

        let placement = instance_transform(instance);
        let glyph_transform = if font.needs_oblique && self.synthesize_oblique {
            oblique_shear(baseline).then(&placement)
        } else {
            placement
        };

        for glyph in &run.glyphs {
            let raster = self.cache.get(font, glyph.glyph_index, font_size);
            if raster.is_blank() {
                continue;
            }
            let metrics = raster.metrics;
            let left = start_x + glyph.x + metrics.xmin as f32;
            let top = baseline - (metrics.ymin as f32 + metrics.height as f32);
            let bounds = Box2D::new(
                point2(left, top),
                point2(left + metrics.width as f32, top + metrics.height as f32),
            );
            let coverage = &raster.coverage;

            paint_mask(surface, &glyph_transform, bounds, style.color, |p| {
                sample_bilinear(
                    coverage,
                    metrics.width,
                    metrics.height,
                    p.x - left,
                    p.y - top,
                )
            });
        }

        if style.is_underlined {
            let thickness = (font_size / 20.0).max(1.0);
            let y = baseline + UNDERLINE_OFFSET;
            let line = Box2D::new(
                point2(start_x, y - thickness / 2.0),
                point2(start_x + run.width, y + thickness / 2.0),
            );
            paint_mask(surface, &placement, line, style.color, |p| {
                rect_coverage(&line, p)
            });
        }
    }

    /// Number of distinct glyphs rasterized so far.
    pub fn cached_glyphs(&self) -> usize {
        self.cache.len()
    }
}

/// Maps instance space to image space: rotate about the origin, then move to
/// the instance position.
pub fn instance_transform(instance: &PlacedInstance<'_>) -> InstanceToImage {
    Transform2D::rotation(instance.angle).then_translate(instance.position.to_vector())
}

/// Leans glyphs right by [`OBLIQUE_SKEW`], keeping the baseline at
/// `baseline` fixed.
fn oblique_shear(baseline: f32) -> Transform2D<f32, InstanceSpace, InstanceSpace> {
    Transform2D::new(1.0, 0.0, -OBLIQUE_SKEW, 1.0, baseline * OBLIQUE_SKEW, 0.0)
}

/// Blends `color` into every surface pixel whose centre maps into `bounds`,
/// weighted by `coverage` evaluated in instance space.
fn paint_mask(
    surface: &mut RgbaImage,
    transform: &InstanceToImage,
    bounds: Box2D<f32, InstanceSpace>,
    color: Color,
    coverage: impl Fn(Point2D<f32, InstanceSpace>) -> f32,
) {
    let Some(inverse) = transform.inverse() else {
        return;
    };

    // One pixel of slack for bilinear bleed at the edges.
    let device = transform.outer_transformed_box(&bounds.inflate(1.0, 1.0));
    if !(device.min.x.is_finite()
        && device.min.y.is_finite()
        && device.max.x.is_finite()
        && device.max.y.is_finite())
    {
        return;
    }

    let (width, height) = surface.dimensions();
    let x0 = device.min.x.floor().max(0.0) as u32;
    let y0 = device.min.y.floor().max(0.0) as u32;
    let x1 = (device.max.x.ceil().max(0.0) as u32).min(width);
    let y1 = (device.max.y.ceil().max(0.0) as u32).min(height);

    for py in y0..y1 {
        for px in x0..x1 {
            let local = inverse.transform_point(point2(px as f32 + 0.5, py as f32 + 0.5));
            let amount = coverage(local);
            if amount > 0.0 {
                blend(surface.get_pixel_mut(px, py), color, amount);
            }
        }
    }
}

/// Bilinear sample of a coverage bitmap at `(u, v)` measured from its
/// top-left corner; outside texels read as empty.
fn sample_bilinear(data: &[u8], width: usize, height: usize, u: f32, v: f32) -> f32 {
    let x = u - 0.5;
    let y = v - 0.5;
    let x0 = x.floor();
    let y0 = y.floor();
    let fx = x - x0;
    let fy = y - y0;

    let texel = |ix: f32, iy: f32| -> f32 {
        if ix < 0.0 || iy < 0.0 || ix >= width as f32 || iy >= height as f32 {
            0.0
        } else {
            data[iy as usize * width + ix as usize] as f32
        }
    };

    let top = texel(x0, y0) * (1.0 - fx) + texel(x0 + 1.0, y0) * fx;
    let bottom = texel(x0, y0 + 1.0) * (1.0 - fx) + texel(x0 + 1.0, y0 + 1.0) * fx;
    (top * (1.0 - fy) + bottom * fy) / 255.0
}

/// Area coverage of a unit pixel centred at `p` by an axis-aligned box.
fn rect_coverage(rect: &Box2D<f32, InstanceSpace>, p: Point2D<f32, InstanceSpace>) -> f32 {
    let cover_x = ((p.x + 0.5).min(rect.max.x) - (p.x - 0.5).max(rect.min.x)).clamp(0.0, 1.0);
    let cover_y = ((p.y + 0.5).min(rect.max.y) - (p.y - 0.5).max(rect.min.y)).clamp(0.0, 1.0);
    cover_x * cover_y
}

/// Source-over blend of a straight-alpha colour at fractional coverage.
fn blend(pixel: &mut Rgba<u8>, color: Color, coverage: f32) {
    let src_a = coverage.clamp(0.0, 1.0) * color.a as f32 / 255.0;
    if src_a <= 0.0 {
        return;
    }

    let [dr, dg, db, da] = pixel.0;
    let dst_a = da as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);
    if out_a <= 0.0 {
        return;
    }

    let mix = |src: u8, dst: u8| -> u8 {
        let value = (src as f32 * src_a + dst as f32 * dst_a * (1.0 - src_a)) / out_a;
        value.round().clamp(0.0, 255.0) as u8
    };

    pixel.0 = [
        mix(color.r, dr),
        mix(color.g, dg),
        mix(color.b, db),
        (out_a * 255.0).round().clamp(0.0, 255.0) as u8,
    ];
}

#[allow(clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        element::{ElementId, TextStyle},
        font_storage::FontStorage,
    };
    use euclid::Angle;

    fn instance<'a>(
        id: &'a ElementId,
        style: &'a TextStyle,
        content: &str,
        anchor: InstanceAnchor,
        angle: f32,
    ) -> PlacedInstance<'a> {
        PlacedInstance {
            element_id: id,
            content: content.to_string(),
            position: point2(40.0, 40.0),
            angle: Angle::radians(angle),
            anchor,
            style,
            primary: true,
        }
    }

    fn painted(surface: &RgbaImage) -> Vec<(u32, u32)> {
        surface
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0 != [0, 0, 0, 255])
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn blend_is_source_over() {
        let mut pixel = Rgba([0, 0, 0, 255]);
        blend(&mut pixel, Color::WHITE, 1.0);
        assert_eq!(pixel.0, [255, 255, 255, 255]);

        let mut pixel = Rgba([0, 0, 0, 255]);
        blend(&mut pixel, Color::WHITE, 0.5);
        assert_eq!(pixel.0, [128, 128, 128, 255]);

        let mut clear = Rgba([0, 0, 0, 0]);
        blend(&mut clear, Color::rgba(255, 0, 0, 255), 0.5);
        assert_eq!(clear.0, [255, 0, 0, 128]);

        let mut untouched = Rgba([9, 9, 9, 9]);
        blend(&mut untouched, Color::rgba(255, 0, 0, 0), 1.0);
        assert_eq!(untouched.0, [9, 9, 9, 9]);
    }

    #[test]
    fn bilinear_sampling_hits_texel_centres() {
        let data = [0u8, 255, 255, 0];
        assert_eq!(sample_bilinear(&data, 2, 2, 1.5, 0.5), 1.0);
        assert_eq!(sample_bilinear(&data, 2, 2, 0.5, 0.5), 0.0);
        assert!((sample_bilinear(&data, 2, 2, 1.0, 0.5) - 0.5).abs() < 1e-6);
        assert_eq!(sample_bilinear(&data, 2, 2, -3.0, 0.5), 0.0);
    }

    #[test]
    fn rect_coverage_is_fractional_at_edges() {
        let rect = Box2D::new(point2(0.0, 0.0), point2(10.0, 1.5));
        assert_eq!(rect_coverage(&rect, point2(5.0, 0.5)), 1.0);
        assert!((rect_coverage(&rect, point2(5.0, 1.5)) - 0.5).abs() < 1e-6);
        assert_eq!(rect_coverage(&rect, point2(20.0, 0.5)), 0.0);
    }

    #[test]
    fn rotation_turns_x_axis_downwards() {
        let id = ElementId::from("r");
        let style = TextStyle::default();
        let inst = instance(&id, &style, "x", InstanceAnchor::Centered, std::f32::consts::FRAC_PI_2);
        let p = instance_transform(&inst).transform_point(point2(10.0, 0.0));
        assert!((p.x - 40.0).abs() < 1e-4);
        assert!((p.y - 50.0).abs() < 1e-4);
    }

    #[test]
    fn oblique_shear_pivots_on_baseline() {
        for baseline in [0.0, 14.0, -3.5] {
            let shear = oblique_shear(baseline);

            let on_baseline = shear.transform_point(point2(7.0, baseline));
            assert!((on_baseline.x - 7.0).abs() < 1e-4);
            assert!((on_baseline.y - baseline).abs() < 1e-4);

            // Ten pixels above the baseline leans right, y untouched.
            let above = shear.transform_point(point2(7.0, baseline - 10.0));
            assert!((above.x - (7.0 + 10.0 * OBLIQUE_SKEW)).abs() < 1e-4);
            assert!((above.y - (baseline - 10.0)).abs() < 1e-4);
        }
    }

    #[test]
    fn underline_spans_measured_width_by_alignment() {
        let mut storage = FontStorage::new();
        storage.load_system_fonts();
        let style = TextStyle {
            font_size: 40.0,
            is_underlined: true,
            text_align: HorizontalAlign::Left,
            ..TextStyle::default()
        };
        let Some(font) = storage.resolve(&style, "sans-serif") else {
            return;
        };
        let id = ElementId::from("u");
        let run = ShapedRun::shape(&font.font, "..", style.font_size);

        let mut renderer = CpuRenderer::new(true);
        let mut surface = RgbaImage::from_pixel(120, 80, Rgba([0, 0, 0, 255]));
        let left = instance(&id, &style, "..", InstanceAnchor::Aligned(HorizontalAlign::Left), 0.0);
        renderer.paint_instance(&mut surface, &left, &font);

        // A 2px underline centred at baseline + 3 covers rows 42 and 43 and
        // starts at the anchor.
        let row = 43;
        assert_eq!(surface.get_pixel(45, 42).0, [255, 255, 255, 255]);
        assert_eq!(surface.get_pixel(41, row).0, [255, 255, 255, 255]);
        assert_eq!(surface.get_pixel(38, row).0, [0, 0, 0, 255]);
        let end = 40.0 + run.width;
        assert_eq!(surface.get_pixel((end - 2.0) as u32, row).0, [255, 255, 255, 255]);

        let mut surface = RgbaImage::from_pixel(120, 80, Rgba([0, 0, 0, 255]));
        let right = instance(&id, &style, "..", InstanceAnchor::Aligned(HorizontalAlign::Right), 0.0);
        renderer.paint_instance(&mut surface, &right, &font);
        assert_eq!(surface.get_pixel(38, row).0, [255, 255, 255, 255]);
        assert_eq!(surface.get_pixel(42, row).0, [0, 0, 0, 255]);
    }

    #[test]
    fn glyphs_stay_near_their_anchor() {
        let mut storage = FontStorage::new();
        storage.load_system_fonts();
        let style = TextStyle {
            font_size: 16.0,
            ..TextStyle::default()
        };
        let Some(font) = storage.resolve(&style, "sans-serif") else {
            return;
        };
        let id = ElementId::from("g");

        for angle in [0.0, 0.7, std::f32::consts::PI] {
            let mut renderer = CpuRenderer::new(true);
            let mut surface = RgbaImage::from_pixel(80, 80, Rgba([0, 0, 0, 255]));
            let inst = instance(&id, &style, "W", InstanceAnchor::Centered, angle);
            renderer.paint_instance(&mut surface, &inst, &font);

            let pixels = painted(&surface);
            assert!(!pixels.is_empty(), "angle {angle} painted nothing");
            assert!(pixels.iter().all(|&(x, y)| {
                (x as f32 - 40.0).abs() <= 16.0 && (y as f32 - 40.0).abs() <= 16.0
            }));
        }
    }

    #[test]
    fn whitespace_paints_nothing() {
        let mut storage = FontStorage::new();
        storage.load_system_fonts();
        let style = TextStyle::default();
        let Some(font) = storage.resolve(&style, "sans-serif") else {
            return;
        };
        let id = ElementId::from("w");
        let mut renderer = CpuRenderer::new(true);
        let mut surface = RgbaImage::from_pixel(80, 80, Rgba([0, 0, 0, 255]));
        renderer.paint_instance(
            &mut surface,
            &instance(&id, &style, " ", InstanceAnchor::Centered, 0.0),
            &font,
        );
        assert!(painted(&surface).is_empty());
    }
}
