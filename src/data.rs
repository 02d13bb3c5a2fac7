use crate::config::AppConfig;
use crate::types::{CountryCode, CountryRecord, CountryShape, Indicator, Observation, Series};
use anyhow::{anyhow, Context, Result};
use geo::MultiPolygon;
use shapefile::Reader;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

/// Offset into every series, counted from the dataset's base year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearIndex(usize);

impl YearIndex {
    pub fn get(self) -> usize {
        self.0
    }
}

/// Indicator values for every country. Read-only once loaded.
#[derive(Debug, Clone)]
pub struct Dataset {
    base_year: i32,
    year_count: usize,
    records: BTreeMap<CountryCode, CountryRecord>,
}

impl Dataset {
    pub fn from_records<I>(base_year: i32, records: I) -> Self
    where
        I: IntoIterator<Item = (CountryCode, CountryRecord)>,
    {
        let records: BTreeMap<_, _> = records.into_iter().collect();
        let year_count = records.values().map(CountryRecord::len).max().unwrap_or(0);
        Self { base_year, year_count, records }
    }

    /// Parses the `{ code: { indicator: [values] } }` document. Unknown indicator keys are skipped.
    pub fn from_json_str(base_year: i32, json: &str) -> Result<Self> {
        let raw: HashMap<String, HashMap<String, Series>> =
            serde_json::from_str(json).context("Failed to parse indicator dataset")?;
        Ok(Self::from_raw(base_year, raw))
    }

    fn from_raw(base_year: i32, raw: HashMap<String, HashMap<String, Series>>) -> Self {
        let records = raw.into_iter().map(|(code, series_by_key)| {
            let mut record = CountryRecord::new();
            for (key, series) in series_by_key {
                match key.parse::<Indicator>() {
                    Ok(indicator) => record.insert(indicator, series),
                    Err(_) => tracing::trace!("Skipping unknown indicator '{}' for {}", key, code),
                }
            }
            (CountryCode::new(code), record)
        });
        Self::from_records(base_year, records)
    }

    pub fn base_year(&self) -> i32 {
        self.base_year
    }

    /// Number of years on the shared axis (longest series).
    pub fn year_count(&self) -> usize {
        self.year_count
    }

    /// Inclusive year span covered by the series.
    pub fn year_range(&self) -> (i32, i32) {
        let last = self.year_for_index(YearIndex(self.year_count.saturating_sub(1)));
        (self.base_year, last)
    }

    /// Maps a calendar year to a valid index, clamping into the series bounds.
    pub fn index_for_year(&self, year: i32) -> YearIndex {
        let offset = i64::from(year) - i64::from(self.base_year);
        let last = self.year_count.saturating_sub(1);
        let offset = usize::try_from(offset.max(0)).unwrap_or(usize::MAX);
        YearIndex(offset.min(last))
    }

    /// Saturates at `i32::MAX` for series that would run past the end of the calendar.
    pub fn year_for_index(&self, index: YearIndex) -> i32 {
        let offset = i32::try_from(index.0).unwrap_or(i32::MAX);
        self.base_year.saturating_add(offset)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn codes(&self) -> impl Iterator<Item = &CountryCode> {
        self.records.keys()
    }

    pub fn record(&self, code: &CountryCode) -> Option<&CountryRecord> {
        self.records.get(code)
    }

    /// `None` when the country, its series or the entry at `index` does not exist.
    /// `Some(Observation::Missing)` only for an explicit no-data marker.
    pub fn observation(&self, code: &CountryCode, indicator: Indicator, index: YearIndex) -> Option<Observation> {
        self.record(code).and_then(|r| r.observation(indicator, index.0))
    }
}

pub fn load_dataset(config: &AppConfig) -> Result<Dataset> {
    let path = &config.input.dataset;
    tracing::info!("Loading indicator dataset from {:?}", path);
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read dataset file: {:?}", path))?;
    let dataset = Dataset::from_json_str(config.timeline.base_year, &content)
        .with_context(|| format!("Invalid dataset file: {:?}", path))?;
    let (first, last) = dataset.year_range();
    tracing::info!("Loaded indicators for {} countries covering {}..={}", dataset.len(), first, last);
    Ok(dataset)
}

pub fn load_boundaries(config: &AppConfig) -> Result<Vec<CountryShape>> {
    let path = &config.input.boundaries;
    let extension = path.extension()
        .and_then(|e| e.to_str())
        .map(|s: &str| s.to_lowercase())
        .ok_or_else(|| anyhow!("Boundary file has no extension"))?;

    let shapes = match extension.as_str() {
        "shp" => {
            let column = config.input.join_property.as_deref()
                .ok_or_else(|| anyhow!("Shapefile boundaries need input.join_property"))?;
            load_shapefile(path, column)?
        }
        "json" | "geojson" => load_geojson(path, config.input.join_property.as_deref())?,
        _ => return Err(anyhow!("Unsupported boundary format: {}", extension)),
    };

    tracing::info!("Loaded {} country boundaries", shapes.len());
    Ok(shapes)
}

fn load_shapefile(path: &Path, column: &str) -> Result<Vec<CountryShape>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open Shapefile: {:?}", path))?;

    let mut shapes = Vec::new();

    for result in reader.iter_shapes_and_records() {
        let (shape, record) = result?;

        let code = match record.get(column) {
            Some(shapefile::dbase::FieldValue::Character(Some(s))) => s.trim().to_string(),
            Some(shapefile::dbase::FieldValue::Character(None)) => continue,
            Some(_) => return Err(anyhow!("Shapefile join column '{}' must be a string", column)),
            None => return Err(anyhow!("Join column '{}' not found in Shapefile", column)),
        };

        let geometry: MultiPolygon<f64> = match shape {
            shapefile::Shape::Polygon(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygon for {}: {:?}", code, e))?,
            shapefile::Shape::PolygonM(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonM for {}: {:?}", code, e))?,
            shapefile::Shape::PolygonZ(polygon) => polygon.try_into()
                .map_err(|e| anyhow!("Failed to convert polygonZ for {}: {:?}", code, e))?,
            _ => continue,
        };

        shapes.push(CountryShape { code: CountryCode::new(code), geometry });
    }

    Ok(shapes)
}

fn load_geojson(path: &Path, join_property: Option<&str>) -> Result<Vec<CountryShape>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open GeoJSON file: {:?}", path))?;
    let geojson = geojson::GeoJson::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse GeoJSON: {:?}", path))?;
    shapes_from_geojson(geojson, join_property)
}

/// Extracts one shape per polygonal feature; features without a code or polygon are skipped.
pub fn shapes_from_geojson(geojson: geojson::GeoJson, join_property: Option<&str>) -> Result<Vec<CountryShape>> {
    use geojson::feature::Id;

    let collection = match geojson {
        geojson::GeoJson::FeatureCollection(fc) => fc,
        _ => return Err(anyhow!("Boundary GeoJSON must be a FeatureCollection")),
    };

    let mut shapes = Vec::new();

    for feature in collection.features {
        let code = match join_property {
            Some(name) => match feature.properties.as_ref().and_then(|p| p.get(name)) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Number(n)) => n.to_string(),
                _ => continue,
            },
            None => match &feature.id {
                Some(Id::String(s)) => s.clone(),
                Some(Id::Number(n)) => n.to_string(),
                None => continue,
            },
        };

        let geometry = match feature.geometry {
            Some(geometry) => {
                let converted: geo::Geometry<f64> = geometry.value.try_into()
                    .map_err(|e| anyhow!("Failed to convert geometry for {}: {:?}", code, e))?;
                match converted {
                    geo::Geometry::MultiPolygon(mp) => mp,
                    geo::Geometry::Polygon(p) => MultiPolygon::new(vec![p]),
                    _ => continue,
                }
            }
            None => continue,
        };

        shapes.push(CountryShape { code: CountryCode::new(code), geometry });
    }

    Ok(shapes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use std::io::Write;

    const DATASET: &str = r#"{
        "USA": {
            "gdp": ["543300000000", "..", "20893746000000"],
            "population-growth": ["1.7", "1.6", "0.96"],
            "population-working-age": ["60.1", "60.5", "80"],
            "life-expectancy": ["69.8", "70.3", "77.3"],
            "unemployment": ["5", "6", "7"]
        },
        "NLD": {
            "population-working-age": [61.0]
        }
    }"#;

    #[test]
    fn parses_dataset_and_ignores_unknown_series() {
        let data = Dataset::from_json_str(1960, DATASET).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.year_count(), 3);
        assert_eq!(data.year_range(), (1960, 1962));

        let usa = CountryCode::from("USA");
        let idx = data.index_for_year(1961);
        assert_eq!(data.observation(&usa, Indicator::Gdp, idx), Some(Observation::Missing));
        assert_eq!(data.observation(&usa, Indicator::LifeExpectancy, idx), Some(Observation::Value(70.3)));
        assert_eq!(data.observation(&usa, Indicator::Fertility, idx), None);
        assert_eq!(data.record(&usa).and_then(|r| r.series(Indicator::Gdp)).map(Vec::len), Some(3));
    }

    #[test]
    fn short_series_and_absent_countries_yield_none() {
        let data = Dataset::from_json_str(1960, DATASET).unwrap();
        let nld = CountryCode::from("NLD");
        let idx = data.index_for_year(1962);
        assert_eq!(data.observation(&nld, Indicator::WorkingAge, idx), None);
        assert_eq!(data.observation(&CountryCode::from("ABC"), Indicator::WorkingAge, idx), None);
    }

    #[test]
    fn year_lookup_is_clamped_into_bounds() {
        let data = Dataset::from_json_str(1960, DATASET).unwrap();
        assert_eq!(data.index_for_year(1900).get(), 0);
        assert_eq!(data.index_for_year(1961).get(), 1);
        assert_eq!(data.index_for_year(2050).get(), 2);
        assert_eq!(data.year_for_index(data.index_for_year(2050)), 1962);
    }

    #[test]
    fn empty_dataset_clamps_to_zero() {
        let data = Dataset::from_records(1960, Vec::new());
        assert!(data.is_empty());
        assert_eq!(data.index_for_year(2020).get(), 0);
        assert_eq!(data.year_range(), (1960, 1960));
    }

    #[test]
    fn extreme_years_clamp_without_overflow() {
        let data = Dataset::from_json_str(1960, DATASET).unwrap();
        assert_eq!(data.index_for_year(i32::MIN).get(), 0);
        assert_eq!(data.index_for_year(i32::MAX).get(), 2);
        assert_eq!(data.year_for_index(data.index_for_year(i32::MIN)), 1960);

        let late = Dataset::from_json_str(i32::MAX - 1, DATASET).unwrap();
        assert_eq!(late.year_range(), (i32::MAX - 1, i32::MAX));
        assert_eq!(late.index_for_year(i32::MIN).get(), 0);
        assert_eq!(late.index_for_year(i32::MAX).get(), 1);

        let early = Dataset::from_json_str(i32::MIN, DATASET).unwrap();
        assert_eq!(early.index_for_year(i32::MAX).get(), 2);
        assert_eq!(early.year_range(), (i32::MIN, i32::MIN + 2));
    }

    #[test]
    fn malformed_dataset_is_an_error() {
        assert!(Dataset::from_json_str(1960, "[1, 2, 3]").is_err());
    }

    #[test]
    fn geojson_shapes_keyed_by_feature_id_or_property() {
        let doc = r#"{
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "id": "USA", "properties": {"iso": "USA"},
                 "geometry": {"type": "Polygon", "coordinates": [[[-100,30],[-90,30],[-90,40],[-100,40],[-100,30]]]}},
                {"type": "Feature", "id": "FRA", "properties": {"iso": "FRA"},
                 "geometry": {"type": "MultiPolygon", "coordinates": [[[[0,45],[5,45],[5,50],[0,50],[0,45]]]]}},
                {"type": "Feature", "properties": {},
                 "geometry": {"type": "Point", "coordinates": [0, 0]}}
            ]
        }"#;

        let by_id = shapes_from_geojson(doc.parse().unwrap(), None).unwrap();
        assert_eq!(by_id.len(), 2);
        assert_eq!(by_id[0].code, CountryCode::from("USA"));
        assert_eq!(by_id[1].geometry.0.len(), 1);

        let by_prop = shapes_from_geojson(doc.parse().unwrap(), Some("iso")).unwrap();
        assert_eq!(by_prop.iter().map(|s| s.code.as_str()).collect::<Vec<_>>(), vec!["USA", "FRA"]);
    }

    #[test]
    fn geojson_must_be_a_collection() {
        let doc = r#"{"type": "Point", "coordinates": [0, 0]}"#;
        assert!(shapes_from_geojson(doc.parse().unwrap(), None).is_err());
    }

    #[test]
    fn loads_files_named_in_config() {
        let dir = tempfile::tempdir().unwrap();
        let dataset_path = dir.path().join("data.json");
        let boundary_path = dir.path().join("world.geojson");
        File::create(&dataset_path).unwrap().write_all(DATASET.as_bytes()).unwrap();
        File::create(&boundary_path).unwrap().write_all(
            br#"{"type":"FeatureCollection","features":[{"type":"Feature","id":"USA","properties":null,
            "geometry":{"type":"Polygon","coordinates":[[[0,0],[1,0],[1,1],[0,0]]]}}]}"#,
        ).unwrap();

        let config = AppConfig::from_toml(&format!(
            "[input]\ndataset = {:?}\nboundaries = {:?}\n",
            dataset_path, boundary_path
        )).unwrap();

        assert_eq!(load_dataset(&config).unwrap().len(), 2);
        assert_eq!(load_boundaries(&config).unwrap().len(), 1);
    }

    #[test]
    fn unsupported_boundary_format_is_rejected() {
        let config = AppConfig::from_toml("[input]\ndataset = \"d.json\"\nboundaries = \"world.kml\"\n").unwrap();
        assert!(load_boundaries(&config).is_err());
    }
}
