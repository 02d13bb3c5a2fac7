//! The boundary between the controllers and whatever actually draws.
//!
//! Controllers never touch a drawing API directly; they hand a [`Batch`] of attribute updates to
//! a [`RenderSurface`]. A batch is applied as one unit so that a single user action produces one
//! coherent transition across every element.

use crate::scale::Rgb;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

/// Handle of a map shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ShapeId(pub u32);

/// Handle of a scatter point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PointId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Element {
    Shape(ShapeId),
    Point(PointId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attr {
    Fill(Rgb),
    Stroke(Rgb),
    StrokeWidth(f64),
    Opacity(f64),
    Cx(f64),
    Cy(f64),
    Radius(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transition {
    #[default]
    Immediate,
    Timed(Duration),
}

impl Transition {
    /// Zero means immediate.
    pub fn from_millis(ms: u64) -> Self {
        if ms == 0 {
            Transition::Immediate
        } else {
            Transition::Timed(Duration::from_millis(ms))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Update {
    pub element: Element,
    pub attr: Attr,
    pub transition: Transition,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    updates: Vec<Update>,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: Element, attr: Attr, transition: Transition) {
        self.updates.push(Update { element, attr, transition });
    }

    pub fn updates(&self) -> &[Update] {
        &self.updates
    }

    pub fn len(&self) -> usize {
        self.updates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
    }
}

pub trait RenderSurface {
    fn apply(&mut self, batch: Batch);
}

/// Last value written for each attribute of an element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ElementState {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke: Option<Rgb>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cx: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub r: Option<f64>,
}

impl ElementState {
    fn set(&mut self, attr: Attr) {
        match attr {
            Attr::Fill(c) => self.fill = Some(c),
            Attr::Stroke(c) => self.stroke = Some(c),
            Attr::StrokeWidth(w) => self.stroke_width = Some(w),
            Attr::Opacity(o) => self.opacity = Some(o),
            Attr::Cx(x) => self.cx = Some(x),
            Attr::Cy(y) => self.cy = Some(y),
            Attr::Radius(r) => self.r = Some(r),
        }
    }
}

/// Surface that keeps the end state of every transition instead of drawing.
///
/// Used by the SVG writer and the HTTP server, both of which only care where elements end up.
#[derive(Debug, Default, Clone)]
pub struct RetainedSurface {
    elements: HashMap<Element, ElementState>,
    batches: usize,
    last_batch: Batch,
}

impl RetainedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, element: Element) -> Option<&ElementState> {
        self.elements.get(&element)
    }

    pub fn shape(&self, id: ShapeId) -> Option<&ElementState> {
        self.state(Element::Shape(id))
    }

    pub fn point(&self, id: PointId) -> Option<&ElementState> {
        self.state(Element::Point(id))
    }

    /// Batches applied so far.
    pub fn batches(&self) -> usize {
        self.batches
    }

    pub fn last_batch(&self) -> &Batch {
        &self.last_batch
    }
}

impl RenderSurface for RetainedSurface {
    fn apply(&mut self, batch: Batch) {
        for update in batch.updates() {
            self.elements.entry(update.element).or_default().set(update.attr);
        }
        self.batches += 1;
        tracing::trace!("Applied batch #{} with {} updates", self.batches, batch.len());
        self.last_batch = batch;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_updates_win_within_and_across_batches() {
        let mut surface = RetainedSurface::new();
        let shape = Element::Shape(ShapeId(0));

        let mut first = Batch::new();
        first.push(shape, Attr::Opacity(0.5), Transition::Immediate);
        first.push(shape, Attr::Opacity(0.7), Transition::Immediate);
        surface.apply(first);
        assert_eq!(surface.state(shape).unwrap().opacity, Some(0.7));

        let mut second = Batch::new();
        second.push(shape, Attr::Fill(Rgb::BLACK), Transition::from_millis(200));
        surface.apply(second);

        let state = surface.state(shape).unwrap();
        assert_eq!(state.opacity, Some(0.7));
        assert_eq!(state.fill, Some(Rgb::BLACK));
        assert_eq!(surface.batches(), 2);
        assert_eq!(
            surface.last_batch().updates()[0].transition,
            Transition::Timed(Duration::from_millis(200))
        );
    }

    #[test]
    fn zero_millis_is_immediate() {
        assert_eq!(Transition::from_millis(0), Transition::Immediate);
    }

    #[test]
    fn unset_attributes_are_omitted_from_json() {
        let mut state = ElementState::default();
        state.set(Attr::Radius(4.0));
        assert_eq!(serde_json::to_string(&state).unwrap(), r#"{"r":4.0}"#);
    }
}
