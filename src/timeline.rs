use crate::config::AnimationConfig;
use crate::data::{Dataset, YearIndex};
use crate::encoding::Encoder;
use crate::surface::{Attr, Batch, Element, RenderSurface, Transition};
use crate::views::Views;

/// Owns the current year. Every change re-encodes both views in a single batch.
#[derive(Debug, Clone)]
pub struct TimeController {
    index: YearIndex,
    year: i32,
    scatter_transition: Transition,
    map_transition: Transition,
}

impl TimeController {
    pub fn new(data: &Dataset, initial_year: i32, animation: &AnimationConfig) -> Self {
        let index = data.index_for_year(initial_year);
        Self {
            index,
            year: data.year_for_index(index),
            scatter_transition: Transition::from_millis(animation.scatter_year_ms),
            map_transition: Transition::from_millis(animation.map_year_ms),
        }
    }

    pub fn index(&self) -> YearIndex {
        self.index
    }

    /// The year actually shown, after clamping.
    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn year_range(&self, data: &Dataset) -> (i32, i32) {
        data.year_range()
    }

    /// Moves to `year` (clamped into the dataset) and pushes fresh attributes for every element.
    pub fn set_year<S: RenderSurface>(
        &mut self,
        year: i32,
        data: &Dataset,
        encoder: &Encoder,
        views: &Views,
        surface: &mut S,
    ) -> i32 {
        self.index = data.index_for_year(year);
        self.year = data.year_for_index(self.index);
        if self.year != year {
            tracing::debug!("Year {} clamped to {}", year, self.year);
        }
        self.redraw(data, encoder, views, surface);
        self.year
    }

    /// Re-encodes everything at the current index.
    pub fn redraw<S: RenderSurface>(&self, data: &Dataset, encoder: &Encoder, views: &Views, surface: &mut S) {
        surface.apply(self.encode(data, encoder, views));
    }

    pub fn encode(&self, data: &Dataset, encoder: &Encoder, views: &Views) -> Batch {
        let mut batch = Batch::new();

        for (id, code) in views.scatter.iter() {
            let point = encoder.scatter_point(data, code, self.index);
            let element = Element::Point(id);
            let t = self.scatter_transition;
            batch.push(element, Attr::Cx(point.cx), t);
            batch.push(element, Attr::Cy(point.cy), t);
            batch.push(element, Attr::Radius(point.r), t);
            batch.push(element, Attr::Fill(point.fill), t);
        }

        for (id, code) in views.map.iter() {
            let fill = encoder.working_age_color(data, code, self.index);
            batch.push(Element::Shape(id), Attr::Fill(fill), self.map_transition);
        }

        tracing::debug!("Encoded year {} ({} updates)", self.year, batch.len());
        batch
    }
}
