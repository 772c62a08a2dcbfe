//! Polyline geometry shared by the compositor and any interactive presenter.
//!
//! All coordinates live in the base image's native pixel space with the Y axis
//! pointing down. Traversal order of a [`Path`] is the order its points were
//! appended.

use std::fmt;

use euclid::Angle;

/// Unit marker for the base image's native pixel space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct ImageSpace;

/// A 2-D coordinate in image pixel space.
pub type PathPoint = euclid::Point2D<f32, ImageSpace>;

/// Euclidean distance between two points.
pub fn distance(p1: PathPoint, p2: PathPoint) -> f32 {
    p1.distance_to(p2)
}

/// A user-drawn polyline, optionally closed back onto its first point.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    pub points: Vec<PathPoint>,
    pub closed: bool,
}

/// A point on a path together with the direction of the segment it lies on.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PathPosition {
    pub point: PathPoint,
    /// `atan2(dy, dx)` of the traversed segment.
    pub angle: Angle<f32>,
}

impl Path {
    pub fn new(points: Vec<PathPoint>, closed: bool) -> Self {
        Self { points, closed }
    }

    pub fn open(points: Vec<PathPoint>) -> Self {
        Self::new(points, false)
    }

    pub fn closed(points: Vec<PathPoint>) -> Self {
        Self::new(points, true)
    }

    /// A path with fewer than two points has no length and cannot be walked.
    pub fn is_traversable(&self) -> bool {
        self.points.len() >= 2
    }

    /// Iterates the segments in traversal order, including the closing
    /// segment for closed paths.
    pub fn segments(&self) -> impl Iterator<Item = (PathPoint, PathPoint)> + '_ {
        let open = self.points.windows(2).map(|w| (w[0], w[1]));
        let closing = match (self.closed, self.points.first(), self.points.last()) {
            (true, Some(&first), Some(&last)) if self.is_traversable() => Some((last, first)),
            _ => None,
        };
        open.chain(closing)
    }

    /// Total arc length, `0.0` for paths with fewer than two points.
    pub fn length(&self) -> f32 {
        if !self.is_traversable() {
            return 0.0;
        }
        self.segments().map(|(a, b)| distance(a, b)).sum()
    }

    /// Maps an arc-length fraction to a point on the path and its tangent.
    ///
    /// Open paths clamp `t > 1` to the end point; closed paths wrap with
    /// `t mod 1`, so `1.0` lands back on the start. Negative fractions clamp
    /// to the start. Returns `None` when the path has fewer than two points.
    pub fn position_at_fraction(&self, t: f32) -> Option<PathPosition> {
        self.position_at_fraction_of(t, self.length())
    }

    /// [`position_at_fraction`](Self::position_at_fraction) for callers that
    /// already hold [`length`](Self::length), such as a walk placing many
    /// glyphs on the same path.
    pub fn position_at_fraction_of(&self, t: f32, length: f32) -> Option<PathPosition> {
        if !self.is_traversable() {
            return None;
        }

        let t = if !t.is_finite() || t < 0.0 {
            0.0
        } else if t >= 1.0 && self.closed {
            t % 1.0
        } else {
            t.min(1.0)
        };

        let target = length * t;
        let mut travelled = 0.0;

        for (from, to) in self.segments() {
            let segment = distance(from, to);
            if segment == 0.0 {
                continue;
            }
            if travelled + segment >= target {
                let along = (target - travelled) / segment;
                return Some(PathPosition {
                    point: from.lerp(to, along),
                    angle: (to - from).angle_from_x_axis(),
                });
            }
            travelled += segment;
        }

        // Rounding left the target past every segment: use the end of the
        // last drawn segment.
        let last = self.points[self.points.len() - 1];
        let prev = self.points[self.points.len() - 2];
        Some(PathPosition {
            point: last,
            angle: (last - prev).angle_from_x_axis(),
        })
    }

    /// Drawing commands for the path outline.
    pub fn outline(&self) -> Outline {
        let mut commands = Vec::with_capacity(self.points.len() + 1);
        let mut points = self.points.iter().copied();
        if let Some(first) = points.next() {
            commands.push(PathCommand::MoveTo(first));
            commands.extend(points.map(PathCommand::LineTo));
            if self.closed && self.is_traversable() {
                commands.push(PathCommand::Close);
            }
        }
        Outline { commands }
    }
}

/// Free-function form of [`Path::length`] for callers holding raw points.
pub fn path_length(points: &[PathPoint], closed: bool) -> f32 {
    Path::new(points.to_vec(), closed).length()
}

/// A single drawing command of an [`Outline`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(PathPoint),
    LineTo(PathPoint),
    Close,
}

/// Ordered drawing commands describing a path.
///
/// `Display` produces SVG path data (`M x y L x y Z`), which is what an
/// interactive presenter feeds to its vector layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Outline {
    pub commands: Vec<PathCommand>,
}

impl Outline {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl fmt::Display for Outline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, command) in self.commands.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match command {
                PathCommand::MoveTo(p) => write!(f, "M {} {}", p.x, p.y)?,
                PathCommand::LineTo(p) => write!(f, "L {} {}", p.x, p.y)?,
                PathCommand::Close => f.write_str("Z")?,
            }
        }
        Ok(())
    }
}
