//! Maps a (country, year) pair onto the visual attributes shared by the map and the scatter plot.
//!
//! Lookups that find no record, no series, or no entry at the index count as zero. An explicit
//! no-data marker is different: on the GDP or growth axis it hides the scatter point, on the
//! working-age axis it falls back to the colour of zero.

use crate::config::{LayoutConfig, ScalesConfig};
use crate::data::{Dataset, YearIndex};
use crate::scale::{ColorScale, LinearScale, LogScale, Rgb};
use crate::types::{CountryCode, Indicator, Observation};
use anyhow::{Context, Result};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointAttrs {
    pub cx: f64,
    pub cy: f64,
    pub r: f64,
    pub fill: Rgb,
}

#[derive(Debug, Clone)]
pub struct Encoder {
    color: ColorScale,
    x: LogScale,
    y: LinearScale,
    radius: LinearScale,
    gdp_divisor: f64,
}

impl Encoder {
    pub fn new(scales: &ScalesConfig, layout: &LayoutConfig) -> Result<Self> {
        let [dark, light] = &scales.working_age_colors;
        let color = ColorScale::new(
            scales.working_age_domain,
            [
                Rgb::from_hex(dark).context("scales.working_age_colors")?,
                Rgb::from_hex(light).context("scales.working_age_colors")?,
            ],
        );
        let x = LogScale::new(scales.gdp_domain, [0.0, layout.plot_width()])
            .context("scales.gdp_domain")?;
        let y = LinearScale::new(scales.growth_domain, [layout.plot_height(), 0.0]);
        let radius = LinearScale::new(scales.population_domain, scales.radius_range);

        Ok(Self { color, x, y, radius, gdp_divisor: scales.gdp_divisor })
    }

    pub fn x_scale(&self) -> &LogScale {
        &self.x
    }

    pub fn y_scale(&self) -> &LinearScale {
        &self.y
    }

    pub fn working_age_color(&self, data: &Dataset, code: &CountryCode, index: YearIndex) -> Rgb {
        let value = lookup(data, code, Indicator::WorkingAge, index).or_zero();
        self.color.apply(value)
    }

    pub fn scatter_x(&self, data: &Dataset, code: &CountryCode, index: YearIndex) -> f64 {
        let gdp = lookup(data, code, Indicator::Gdp, index).or_zero();
        self.x.apply(gdp / self.gdp_divisor)
    }

    pub fn scatter_y(&self, data: &Dataset, code: &CountryCode, index: YearIndex) -> f64 {
        let growth = lookup(data, code, Indicator::PopulationGrowth, index).or_zero();
        self.y.apply(growth)
    }

    /// Zero (hidden) when either position axis carries the no-data marker.
    pub fn scatter_radius(&self, data: &Dataset, code: &CountryCode, index: YearIndex) -> f64 {
        let gdp = lookup(data, code, Indicator::Gdp, index);
        let growth = lookup(data, code, Indicator::PopulationGrowth, index);
        if gdp.is_missing() || growth.is_missing() {
            return 0.0;
        }
        let population = lookup(data, code, Indicator::PopulationTotal, index).or_zero();
        self.radius.apply(population)
    }

    pub fn scatter_point(&self, data: &Dataset, code: &CountryCode, index: YearIndex) -> PointAttrs {
        PointAttrs {
            cx: self.scatter_x(data, code, index),
            cy: self.scatter_y(data, code, index),
            r: self.scatter_radius(data, code, index),
            fill: self.working_age_color(data, code, index),
        }
    }
}

fn lookup(data: &Dataset, code: &CountryCode, indicator: Indicator, index: YearIndex) -> Observation {
    data.observation(code, indicator, index).unwrap_or(Observation::Value(0.0))
}
