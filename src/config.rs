use crate::types::Indicator;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub input: InputConfig,
    #[serde(default)]
    pub scales: ScalesConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub timeline: TimelineConfig,
    #[serde(default)]
    pub animation: AnimationConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Indicator dataset (JSON keyed by country code).
    pub dataset: PathBuf,
    /// Country boundaries, GeoJSON or shapefile.
    pub boundaries: PathBuf,
    /// Feature property (GeoJSON) or dbase column (shapefile) holding the country code.
    /// GeoJSON falls back to the feature `id` when unset.
    pub join_property: Option<String>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct ScalesConfig {
    pub working_age_domain: [f64; 2],
    pub working_age_colors: [String; 2], // Hex codes, dark end first
    pub gdp_divisor: f64,
    pub gdp_domain: [f64; 2],
    pub growth_domain: [f64; 2],
    pub population_domain: [f64; 2],
    pub radius_range: [f64; 2],
}

impl Default for ScalesConfig {
    fn default() -> Self {
        Self {
            working_age_domain: [50.0, 75.0],
            working_age_colors: ["#000080".to_string(), "#ffffff".to_string()],
            gdp_divisor: 1_000_000.0,
            gdp_domain: [10.0, 50_000_000.0],
            growth_domain: [-2.0, 4.5],
            population_domain: [0.0, 2_000_000_000.0],
            radius_range: [3.0, 70.0],
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct Margin {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Margin {
    fn default() -> Self {
        Self { top: 10.0, right: 30.0, bottom: 30.0, left: 30.0 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct LayoutConfig {
    pub map_width: f64,
    pub scatter_width: f64,
    pub aspect_ratio: f64,
    pub margin: Margin,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            map_width: 960.0,
            scatter_width: 640.0,
            aspect_ratio: 1.3,
            margin: Margin::default(),
        }
    }
}

impl LayoutConfig {
    pub fn map_height(&self) -> f64 {
        self.map_width / self.aspect_ratio
    }

    /// Inner width of the scatter plot (inside the margins).
    pub fn plot_width(&self) -> f64 {
        (self.scatter_width - self.margin.left - self.margin.right).max(0.0)
    }

    pub fn plot_height(&self) -> f64 {
        (self.plot_width() / self.aspect_ratio - self.margin.top - self.margin.bottom).max(0.0)
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct TimelineConfig {
    pub base_year: i32,
    pub initial_year: i32,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self { base_year: 1960, initial_year: 2020 }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct AnimationConfig {
    pub scatter_year_ms: u64,
    pub map_year_ms: u64,
    pub hover_ms: u64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self { scatter_year_ms: 1000, map_year_ms: 0, hover_ms: 200 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    pub svg: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { svg: PathBuf::from("worldvis.svg") }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000, static_dir: PathBuf::from(".") }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct IngestConfig {
    /// World Bank series code -> dataset indicator.
    pub series: BTreeMap<String, Indicator>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        let series = [
            ("SP.POP.TOTL", Indicator::PopulationTotal),
            ("SP.POP.1564.TO.ZS", Indicator::WorkingAge),
            ("SP.POP.GROW", Indicator::PopulationGrowth),
            ("SP.DYN.LE00.IN", Indicator::LifeExpectancy),
            ("NY.GDP.PCAP.CD", Indicator::GdpPerCapita),
            ("NY.GDP.MKTP.CD", Indicator::Gdp),
            ("SP.DYN.TFRT.IN", Indicator::Fertility),
        ]
        .into_iter()
        .map(|(code, indicator)| (code.to_string(), indicator))
        .collect();
        Self { series }
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(content)
            .with_context(|| "Failed to parse TOML configuration")?;
        Ok(config)
    }
}
