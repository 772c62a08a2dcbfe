use crate::{
    element::{ElementId, TextElement},
    geometry::{PathPoint, distance},
};

/// Minimum distance between consecutive points appended while dragging.
pub const DRAG_POINT_THRESHOLD: f32 = 10.0;

/// Ordered collection of text elements owned by a single controller.
///
/// Edits go through this type; renderers receive an immutable
/// [`snapshot`](Self::snapshot) so no paint pass observes a half-applied
/// update. Selection is tracked here rather than on the elements since it
/// has no bearing on rendering.
#[derive(Clone, Debug, Default)]
pub struct TextCanvas {
    elements: Vec<TextElement>,
    selected: Option<ElementId>,
    next_id: u64,
}

impl TextCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an element with the default style on top of every other
    /// element and selects it.
    pub fn add_text(&mut self, text: impl Into<String>) -> ElementId {
        self.next_id += 1;
        let id = ElementId(format!("text-{}", self.next_id));
        let z_index = self.max_z().map_or(1, |z| z + 1);

        self.elements.push(TextElement::new(id.clone(), text, z_index));
        self.selected = Some(id.clone());
        id
    }

    pub fn elements(&self) -> &[TextElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn get(&self, id: &ElementId) -> Option<&TextElement> {
        self.elements.iter().find(|el| &el.id == id)
    }

    /// Applies `f` to the element with `id`. Returns `false` if it does not exist.
    pub fn update(&mut self, id: &ElementId, f: impl FnOnce(&mut TextElement)) -> bool {
        match self.elements.iter_mut().find(|el| &el.id == id) {
            Some(element) => {
                f(element);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &ElementId) -> Option<TextElement> {
        let index = self.elements.iter().position(|el| &el.id == id)?;
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        Some(self.elements.remove(index))
    }

    /// Selects `id`, or clears the selection with `None`.
    pub fn select(&mut self, id: Option<&ElementId>) {
        self.selected = id.filter(|id| self.get(id).is_some()).cloned();
    }

    pub fn selected(&self) -> Option<&TextElement> {
        self.selected.as_ref().and_then(|id| self.get(id))
    }

    /// Raises the element above every other element.
    pub fn move_forward(&mut self, id: &ElementId) -> bool {
        let Some(max) = self.max_z() else {
            return false;
        };
        self.update(id, |el| el.z_index = max + 1)
    }

    /// Lowers the element below every other element, unless it is already
    /// the lowest.
    pub fn move_backward(&mut self, id: &ElementId) -> bool {
        let Some(min) = self.min_z() else {
            return false;
        };
        self.update(id, |el| {
            if el.z_index > min {
                el.z_index = min - 1;
            }
        })
    }

    pub fn add_path_point(&mut self, id: &ElementId, point: PathPoint) -> bool {
        self.update(id, |el| el.path.points.push(point))
    }

    /// Appends a drag sample when it lies farther than `threshold` from the
    /// last path point. The first sample of a drag also records the anchor
    /// so the path starts at the text.
    ///
    /// Returns whether the sample was kept.
    pub fn append_drag_point(&mut self, id: &ElementId, point: PathPoint, threshold: f32) -> bool {
        let mut kept = false;
        self.update(id, |el| {
            if el.path.points.is_empty() {
                el.path.points.push(el.position);
            }
            let far_enough = el
                .path
                .points
                .last()
                .is_none_or(|&last| distance(point, last) > threshold);
            if far_enough {
                el.path.points.push(point);
                kept = true;
            }
        });
        kept
    }

    pub fn clear_path(&mut self, id: &ElementId) -> bool {
        self.update(id, |el| el.path.points.clear())
    }

    pub fn toggle_path_closed(&mut self, id: &ElementId) -> bool {
        self.update(id, |el| el.path.closed = !el.path.closed)
    }

    pub fn set_space_between(&mut self, id: &ElementId, value: f32) -> bool {
        self.update(id, |el| el.space_between = value)
    }

    /// Copies the visual style of `from` onto `to`, leaving content and
    /// placement alone.
    pub fn copy_style(&mut self, from: &ElementId, to: &ElementId) -> bool {
        let Some(style) = self.get(from).map(|el| el.style.clone()) else {
            return false;
        };
        self.update(to, |el| el.style = style)
    }

    /// Immutable copy of the current elements for one render call.
    pub fn snapshot(&self) -> Vec<TextElement> {
        self.elements.clone()
    }

    fn max_z(&self) -> Option<i32> {
        self.elements.iter().map(|el| el.z_index).max()
    }

    fn min_z(&self) -> Option<i32> {
        self.elements.iter().map(|el| el.z_index).min()
    }
}
