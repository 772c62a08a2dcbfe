use std::{io::Cursor, path::PathBuf};

use image::{
    ImageError, ImageReader, Limits, RgbaImage,
    error::{DecodingError, ImageFormatHint},
};
use parking_lot::Mutex;

use crate::{
    element::TextElement,
    error::RenderError,
    export::{self, ExportConfig},
    font_storage::FontStorage,
    renderer::CpuRenderer,
    text::{PlacedInstance, resolve},
};

/// Knobs for the compositor that stay fixed across render calls.
#[derive(Clone, Debug, PartialEq)]
pub struct CompositorConfig {
    /// Largest surface, in pixels, a render may allocate.
    pub max_surface_pixels: u64,
    /// Family tried when an element's family is not installed.
    pub fallback_family: String,
    /// Shear upright faces when italic is requested but no italic face exists.
    pub synthesize_oblique: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            max_surface_pixels: 16384 * 16384,
            fallback_family: "sans-serif".to_string(),
            synthesize_oblique: true,
        }
    }
}

/// Where the base image comes from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageSource<'a> {
    /// Encoded PNG, JPEG or WebP bytes.
    Bytes(&'a [u8]),
    /// A base64 `data:` URI wrapping encoded bytes.
    DataUri(&'a str),
}

impl<'a> From<&'a [u8]> for ImageSource<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for ImageSource<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

/// Flattens a base image and text elements into one encoded image.
///
/// The output surface always has the base image's native size. Calls share
/// nothing but the font storage, which is only locked while picking a face,
/// so independent renders may run in parallel.
pub struct Compositor {
    /// Fonts available to every render.
    pub font_storage: Mutex<FontStorage>,
    pub config: CompositorConfig,
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new()
    }
}

impl Compositor {
    /// Creates a compositor with no fonts loaded.
    pub fn new() -> Self {
        Self::with_config(CompositorConfig::default())
    }

    pub fn with_config(config: CompositorConfig) -> Self {
        Self {
            font_storage: Mutex::new(FontStorage::new()),
            config,
        }
    }
}

/// font loading
impl Compositor {
    pub fn load_system_fonts(&self) {
        self.font_storage.lock().load_system_fonts();
    }

    pub fn load_font_binary(&self, data: impl Into<Vec<u8>>) {
        self.font_storage.lock().load_font_binary(data);
    }

    pub fn load_font_file(&self, path: PathBuf) -> Result<(), std::io::Error> {
        self.font_storage.lock().load_font_file(path)
    }

    pub fn load_fonts_dir(&self, dir: PathBuf) {
        self.font_storage.lock().load_fonts_dir(dir);
    }

    /// Whether no fonts are loaded; text then paints nothing.
    pub fn has_no_fonts(&self) -> bool {
        self.font_storage.lock().is_empty()
    }
}

/// rendering
impl Compositor {
    /// Renders `elements` over the base image and encodes the result.
    pub fn render(
        &self,
        base: ImageSource<'_>,
        elements: &[TextElement],
        export: &ExportConfig,
    ) -> Result<Vec<u8>, RenderError> {
        let surface = self.compose(base, elements)?;
        export::encode(&surface, export)
    }

    /// [`render`](Self::render) for event-driven hosts. Decoding finishes
    /// before any painting starts.
    pub async fn render_async(
        &self,
        base: ImageSource<'_>,
        elements: &[TextElement],
        export: &ExportConfig,
    ) -> Result<Vec<u8>, RenderError> {
        let surface = decode_base_image(base, &self.config)?;
        let surface = self.paint(surface, elements);
        export::encode(&surface, export)
    }

    /// Like [`render`](Self::render) but returns a `data:` URI.
    pub fn render_data_uri(
        &self,
        base: ImageSource<'_>,
        elements: &[TextElement],
        export: &ExportConfig,
    ) -> Result<String, RenderError> {
        let bytes = self.render(base, elements, export)?;
        Ok(export::to_data_uri(&bytes, export.format))
    }

    /// Decodes the base image and paints every element onto it, without
    /// encoding.
    pub fn compose(
        &self,
        base: ImageSource<'_>,
        elements: &[TextElement],
    ) -> Result<RgbaImage, RenderError> {
        let surface = decode_base_image(base, &self.config)?;
        Ok(self.paint(surface, elements))
    }

    fn paint(&self, mut surface: RgbaImage, elements: &[TextElement]) -> RgbaImage {
        let mut renderer = CpuRenderer::new(self.config.synthesize_oblique);
        let mut painted = 0;

        for element in paint_order(elements) {
            let instances = resolve(element);
            if instances.is_empty() {
                continue;
            }

            let font = self
                .font_storage
                .lock()
                .resolve(&element.style, &self.config.fallback_family);
            let Some(font) = font else {
                log::warn!("No font available for element {}; skipping", element.id);
                continue;
            };

            for instance in &instances {
                renderer.paint_instance(&mut surface, instance, &font);
            }
            painted += instances.len();
        }

        log::debug!(
            "Composited {} elements ({} instances, {} glyph rasters) onto {}x{}",
            elements.len(),
            painted,
            renderer.cached_glyphs(),
            surface.width(),
            surface.height()
        );

        surface
    }
}

/// Elements back to front: ascending z-order, ties kept in input order.
pub fn paint_order(elements: &[TextElement]) -> Vec<&TextElement> {
    let mut ordered: Vec<&TextElement> = elements.iter().collect();
    ordered.sort_by_key(|element| element.z_index);
    ordered
}

/// Every instance the compositor paints, in paint order.
pub fn plan(elements: &[TextElement]) -> Vec<PlacedInstance<'_>> {
    paint_order(elements).into_iter().flat_map(resolve).collect()
}

/// Decodes the base image into the output surface, at native resolution.
fn decode_base_image(
    source: ImageSource<'_>,
    config: &CompositorConfig,
) -> Result<RgbaImage, RenderError> {
    match source {
        ImageSource::Bytes(bytes) => decode_bytes(bytes, config),
        ImageSource::DataUri(uri) => match export::parse_data_uri(uri) {
            Some((_, bytes)) => decode_bytes(&bytes, config),
            None => Err(RenderError::ImageDecode(ImageError::Decoding(
                DecodingError::new(ImageFormatHint::Unknown, "malformed base64 data URI"),
            ))),
        },
    }
}

/// Reads the header first so oversized images are refused before any pixel
/// buffer is allocated.
fn decode_bytes(bytes: &[u8], config: &CompositorConfig) -> Result<RgbaImage, RenderError> {
    let reader = || {
        ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| RenderError::ImageDecode(ImageError::IoError(e)))
    };

    let (width, height) = reader()?
        .into_dimensions()
        .map_err(RenderError::ImageDecode)?;
    let pixels = width as u64 * height as u64;
    if pixels == 0 || pixels > config.max_surface_pixels {
        return Err(RenderError::SurfaceAllocation { width, height });
    }

    let mut limits = Limits::default();
    limits.max_image_width = Some(width);
    limits.max_image_height = Some(height);

    let mut reader = reader()?;
    reader.limits(limits);
    let decoded = reader.decode().map_err(RenderError::ImageDecode)?;

    Ok(decoded.into_rgba8())
}
