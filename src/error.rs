/// Image-level failures of a render call.
///
/// Each is independent of the others and safe to retry; per-element problems
/// never surface here.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// The base image could not be decoded. Nothing was painted.
    #[error("failed to decode base image: {0}")]
    ImageDecode(#[source] image::ImageError),

    /// No output surface could be created for the decoded image.
    #[error("cannot allocate a {width}x{height} output surface")]
    SurfaceAllocation { width: u32, height: u32 },

    /// Painting succeeded but encoding to the requested format failed.
    #[error("failed to encode output image: {0}")]
    Encode(#[source] image::ImageError),
}
