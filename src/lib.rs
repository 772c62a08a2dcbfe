//! # Fude
//!
//! Text overlays on raster images: styled text placed once, repeated in a
//! grid, or flowed along a hand-drawn path, then flattened into a PNG or JPEG.
//!
//! ## Overview
//!
//! A [`TextElement`] carries its text, style, anchor, optional path and
//! repetition settings. [`text::resolve`] turns one element into the concrete
//! instances to draw, and the [`Compositor`] paints every element over a base
//! image in z-order and encodes the result.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use fude::{Compositor, ExportConfig, ImageSource, TextCanvas};
//!
//! // 1. Create a Compositor and load fonts
//! let compositor = Compositor::new();
//! compositor.load_system_fonts();
//!
//! // 2. Build the elements
//! let mut canvas = TextCanvas::new();
//! let id = canvas.add_text("Hello");
//! canvas.update(&id, |element| element.style.font_size = 32.0);
//!
//! // 3. Render over a base image
//! let base = std::fs::read("photo.png").unwrap();
//! let png = compositor
//!     .render(ImageSource::Bytes(&base), canvas.elements(), &ExportConfig::png())
//!     .unwrap();
//! ```
//!
//! ## Features
//!
//! *   **Path Text**: Text repeated to fill an open or closed polyline, each glyph rotated to the path.
//! *   **Grid Repetition**: Horizontal, vertical or square-ish grids of copies.
//! *   **Font Management**: System fonts or custom font files, with family fallback.
//! *   **Thread Safety**: Renders share only the font storage, behind a lock.

pub mod canvas;
pub mod compositor;
pub mod element;
pub mod error;
pub mod export;
pub mod font_storage;
pub mod geometry;
pub mod renderer;
pub mod text;

// common re-exports
pub use canvas::TextCanvas;
pub use compositor::{Compositor, CompositorConfig, ImageSource};
pub use element::{
    Color, ElementId, FontWeight, HorizontalAlign, Repetition, RepetitionDirection, TextElement,
    TextStyle,
};
pub use error::RenderError;
pub use export::{ExportConfig, ExportFormat};
pub use font_storage::FontStorage;
pub use geometry::{Path, PathPoint};

// re-export dependencies
pub use euclid;
pub use fontdb;
pub use fontdue;
pub use image;
pub use parking_lot;
