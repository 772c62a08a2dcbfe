use euclid::{Angle, point2};

use crate::{
    element::{ElementId, HorizontalAlign, RepetitionDirection, TextElement, TextStyle},
    geometry::{Path, PathPoint},
    text::sequence::{average_advance, repeat_for_path},
};

/// Upper bound on the copies one repeating element paints.
pub const MAX_GRID_INSTANCES: u32 = 10_000;

/// How an element is placed, derived once from its fields before layout.
///
/// A path with at least two points and a non-zero length wins; otherwise
/// repetition selects the grid; otherwise the element is a single run at its
/// anchor.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PlacementMode<'a> {
    Single {
        anchor: PathPoint,
    },
    Grid {
        anchor: PathPoint,
        rows: u32,
        cols: u32,
        count: u32,
        horizontal_spacing: f32,
        vertical_spacing: f32,
    },
    Path {
        path: &'a Path,
        length: f32,
        space_between: f32,
    },
}

impl<'a> PlacementMode<'a> {
    pub fn of(element: &'a TextElement) -> Self {
        let anchor = element.position;

        if element.path.is_traversable() {
            let length = element.path.length();
            if length > 0.0 && length.is_finite() {
                return Self::Path {
                    path: &element.path,
                    length,
                    space_between: element.space_between,
                };
            }
            // Every point coincides: fall back to the anchor.
            return Self::Single { anchor };
        }

        let repetition = &element.repetition;
        if repetition.is_repeating {
            let count = repetition.count.max(1);
            let count = if count > MAX_GRID_INSTANCES {
                log::warn!(
                    "Element {} asks for {} repetitions; capping at {}",
                    element.id,
                    count,
                    MAX_GRID_INSTANCES
                );
                MAX_GRID_INSTANCES
            } else {
                count
            };
            let (rows, cols) = grid_dimensions(count, repetition.direction);
            return Self::Grid {
                anchor,
                rows,
                cols,
                count,
                horizontal_spacing: repetition.horizontal_spacing,
                vertical_spacing: repetition.vertical_spacing,
            };
        }

        Self::Single { anchor }
    }
}

/// Rows and columns of a repetition grid holding `count` cells.
pub fn grid_dimensions(count: u32, direction: RepetitionDirection) -> (u32, u32) {
    match direction {
        RepetitionDirection::Horizontal => (1, count),
        RepetitionDirection::Vertical => (count, 1),
        RepetitionDirection::Both => {
            let rows = (count as f64).sqrt().ceil().max(1.0) as u32;
            (rows, count.div_ceil(rows))
        }
    }
}

/// Where an instance's content sits relative to its position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InstanceAnchor {
    /// The position is the alignment point on the alphabetic baseline.
    Aligned(HorizontalAlign),
    /// The content is centred on the position, used for glyphs on a path.
    Centered,
}

/// One concrete copy of an element's text, ready to be painted.
///
/// **Y-axis goes down**
#[derive(Clone, Debug, PartialEq)]
pub struct PlacedInstance<'a> {
    pub element_id: &'a ElementId,
    pub content: String,
    pub position: PathPoint,
    pub angle: Angle<f32>,
    pub anchor: InstanceAnchor,
    pub style: &'a TextStyle,
    /// The first instance of an element; only hit-testing cares.
    pub primary: bool,
}

/// Places `element` according to its [`PlacementMode`].
///
/// Elements with no visible text or an unusable font size produce no
/// instances.
pub fn resolve(element: &TextElement) -> Vec<PlacedInstance<'_>> {
    if element.text.trim().is_empty() {
        return Vec::new();
    }
    if !element.style.has_drawable_size() {
        log::warn!(
            "Skipping element {} with unusable font size {}",
            element.id,
            element.style.font_size
        );
        return Vec::new();
    }

    let mode = PlacementMode::of(element);
    log::trace!("Element {} placed as {:?}", element.id, mode);

    match mode {
        PlacementMode::Single { anchor } => vec![run_instance(element, anchor, true)],
        PlacementMode::Grid {
            anchor,
            rows,
            cols,
            count,
            horizontal_spacing,
            vertical_spacing,
        } => {
            let mut instances = Vec::with_capacity(count as usize);
            for row in 0..rows {
                for col in 0..cols {
                    if row * cols + col >= count {
                        break;
                    }
                    let position = point2(
                        anchor.x + col as f32 * horizontal_spacing,
                        anchor.y + row as f32 * vertical_spacing,
                    );
                    instances.push(run_instance(element, position, row == 0 && col == 0));
                }
            }
            instances
        }
        PlacementMode::Path {
            path,
            length,
            space_between,
        } => place_along_path(element, path, length, space_between),
    }
}

fn run_instance(element: &TextElement, position: PathPoint, primary: bool) -> PlacedInstance<'_> {
    PlacedInstance {
        element_id: &element.id,
        content: element.text.clone(),
        position,
        angle: Angle::zero(),
        anchor: InstanceAnchor::Aligned(element.style.text_align),
        style: &element.style,
        primary,
    }
}

/// Walks the repeated character stream along the path, one glyph per
/// average advance.
///
/// Open paths stop once the walked distance passes the end, which can drop
/// the final character rather than clip it. Closed paths place every
/// character, wrapping past the start.
fn place_along_path<'a>(
    element: &'a TextElement,
    path: &Path,
    length: f32,
    space_between: f32,
) -> Vec<PlacedInstance<'a>> {
    let stream = repeat_for_path(&element.text, element.style.font_size, path, space_between);
    let advance = average_advance(element.style.font_size);

    let mut instances = Vec::with_capacity(stream.len());
    let mut distance_traveled = 0.0;

    for ch in stream.chars() {
        if let Some(at) = path.position_at_fraction_of(distance_traveled / length, length) {
            instances.push(PlacedInstance {
                element_id: &element.id,
                content: ch.to_string(),
                position: at.point,
                angle: at.angle,
                anchor: InstanceAnchor::Centered,
                style: &element.style,
                primary: instances.is_empty(),
            });
        }

        distance_traveled += advance;
        if distance_traveled > length && !path.closed {
            break;
        }
    }

    instances
}
