/// The placement resolver turning elements into placed instances.
pub mod layout;
/// Repetition of word sequences along a path.
pub mod sequence;

pub use layout::{
    InstanceAnchor, MAX_GRID_INSTANCES, PlacedInstance, PlacementMode, grid_dimensions, resolve,
};
pub use sequence::{AVERAGE_ADVANCE_RATIO, MAX_PATH_STREAM_CHARS, average_advance, repeat_for_path};
