use crate::config::AnimationConfig;
use crate::surface::{Attr, Batch, Element, RenderSurface, Transition};
use crate::types::CountryCode;
use crate::views::{Views, MAP_BASE_OPACITY, POINT_BASE_OPACITY, POINT_BASE_STROKE_WIDTH};

pub const MAP_DIMMED_OPACITY: f64 = 0.5;
pub const POINT_DIMMED_OPACITY: f64 = 0.2;
pub const FOCUSED_OPACITY: f64 = 1.0;
pub const POINT_FOCUSED_STROKE_WIDTH: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HighlightState {
    #[default]
    Idle,
    Focused(CountryCode),
}

/// Pairs a hovered map shape with its scatter point and the other way round.
/// Events are applied as they arrive; the latest one decides the state.
#[derive(Debug, Clone)]
pub struct CrossHighlight {
    state: HighlightState,
    transition: Transition,
}

impl CrossHighlight {
    pub fn new(animation: &AnimationConfig) -> Self {
        Self {
            state: HighlightState::Idle,
            transition: Transition::from_millis(animation.hover_ms),
        }
    }

    pub fn state(&self) -> &HighlightState {
        &self.state
    }

    pub fn focused(&self) -> Option<&CountryCode> {
        match &self.state {
            HighlightState::Focused(code) => Some(code),
            HighlightState::Idle => None,
        }
    }

    /// Pointer entered an element of `code`. Returns false (and changes nothing) for a code
    /// that has neither a map shape nor a scatter point.
    pub fn enter<S: RenderSurface>(&mut self, code: &CountryCode, views: &Views, surface: &mut S) -> bool {
        let Some(pair) = views.handles.get(code) else {
            tracing::debug!("Ignoring hover on unknown country {}", code);
            return false;
        };

        let t = self.transition;
        let mut batch = Batch::new();

        for (id, shape_code) in views.map.iter() {
            let opacity = if shape_code == code { FOCUSED_OPACITY } else { MAP_DIMMED_OPACITY };
            batch.push(Element::Shape(id), Attr::Opacity(opacity), t);
        }

        for (id, _) in views.scatter.iter() {
            if Some(id) != pair.point {
                batch.push(Element::Point(id), Attr::Opacity(POINT_DIMMED_OPACITY), t);
            }
        }
        if let Some(id) = pair.point {
            batch.push(Element::Point(id), Attr::Opacity(FOCUSED_OPACITY), t);
            batch.push(Element::Point(id), Attr::StrokeWidth(POINT_FOCUSED_STROKE_WIDTH), t);
        }

        surface.apply(batch);
        self.state = HighlightState::Focused(code.clone());
        tracing::debug!("Focused {}", code);
        true
    }

    /// Pointer left; everything returns to its resting style.
    pub fn leave<S: RenderSurface>(&mut self, views: &Views, surface: &mut S) {
        let t = self.transition;
        let mut batch = Batch::new();

        for (id, _) in views.map.iter() {
            batch.push(Element::Shape(id), Attr::Opacity(MAP_BASE_OPACITY), t);
        }
        for (id, _) in views.scatter.iter() {
            batch.push(Element::Point(id), Attr::Opacity(POINT_BASE_OPACITY), t);
            batch.push(Element::Point(id), Attr::StrokeWidth(POINT_BASE_STROKE_WIDTH), t);
        }

        surface.apply(batch);
        self.state = HighlightState::Idle;
    }
}
