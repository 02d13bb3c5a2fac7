use crate::config::AppConfig;
use crate::data::Dataset;
use crate::encoding::Encoder;
use crate::highlight::CrossHighlight;
use crate::surface::RenderSurface;
use crate::timeline::TimeController;
use crate::types::{CountryCode, CountryShape};
use crate::views::Views;
use anyhow::Result;
use std::sync::Arc;

/// One running visualization: the loaded dataset, both views, both controllers and the surface
/// they draw on. Every user event goes through here and completes before the next one starts.
pub struct Session<S: RenderSurface> {
    data: Arc<Dataset>,
    encoder: Encoder,
    views: Views,
    time: TimeController,
    highlight: CrossHighlight,
    surface: S,
}

impl<S: RenderSurface> Session<S> {
    /// Builds the views, applies the resting style and draws the initial year.
    pub fn new(config: &AppConfig, data: Arc<Dataset>, boundaries: &[CountryShape], mut surface: S) -> Result<Self> {
        let encoder = Encoder::new(&config.scales, &config.layout)?;
        let views = Views::build(&data, boundaries);
        let time = TimeController::new(&data, config.timeline.initial_year, &config.animation);
        let highlight = CrossHighlight::new(&config.animation);

        views.initialize(&mut surface);
        time.redraw(&data, &encoder, &views, &mut surface);
        tracing::info!("Session ready at year {}", time.year());

        Ok(Self { data, encoder, views, time, highlight, surface })
    }

    /// Slider input. Returns the year actually shown.
    pub fn set_year(&mut self, year: i32) -> i32 {
        self.time.set_year(year, &self.data, &self.encoder, &self.views, &mut self.surface)
    }

    /// Pointer entered the map shape or scatter point of `code`.
    pub fn hover(&mut self, code: &CountryCode) -> bool {
        self.highlight.enter(code, &self.views, &mut self.surface)
    }

    pub fn leave(&mut self) {
        self.highlight.leave(&self.views, &mut self.surface);
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn views(&self) -> &Views {
        &self.views
    }

    pub fn time(&self) -> &TimeController {
        &self.time
    }

    pub fn highlight(&self) -> &CrossHighlight {
        &self.highlight
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}
