use geo::MultiPolygon;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Stable country identifier shared by the indicator dataset and the boundary document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountryCode(String);

impl CountryCode {
    pub fn new(code: impl Into<String>) -> Self {
        CountryCode(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CountryCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CountryCode {
    fn from(code: &str) -> Self {
        CountryCode(code.to_string())
    }
}

/// Marker the World Bank exports use for "no data".
pub const MISSING_MARKER: &str = "..";

/// One entry of a time series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Observation {
    Value(f64),
    Missing,
}

impl Observation {
    /// Parses a raw cell. The missing marker, blanks and anything non-numeric are `Missing`.
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw == MISSING_MARKER {
            return Observation::Missing;
        }
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Observation::Value(v),
            _ => Observation::Missing,
        }
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Observation::Value(v) => Some(v),
            Observation::Missing => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Observation::Missing)
    }

    /// Visual fallback: missing counts as zero.
    pub fn or_zero(self) -> f64 {
        self.value().unwrap_or(0.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawObservation {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Observation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<RawObservation>::deserialize(deserializer)?;
        Ok(match raw {
            Some(RawObservation::Number(v)) => Observation::Value(v),
            Some(RawObservation::Text(s)) => Observation::parse(&s),
            None => Observation::Missing,
        })
    }
}

impl Serialize for Observation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Observation::Value(v) => serializer.serialize_f64(*v),
            Observation::Missing => serializer.serialize_str(MISSING_MARKER),
        }
    }
}

/// Named indicator series carried per country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Indicator {
    #[serde(rename = "gdp")]
    Gdp,
    #[serde(rename = "population-growth")]
    PopulationGrowth,
    #[serde(rename = "population-total")]
    PopulationTotal,
    #[serde(rename = "population-working-age")]
    WorkingAge,
    #[serde(rename = "life-expectancy")]
    LifeExpectancy,
    #[serde(rename = "gdp-per-capita")]
    GdpPerCapita,
    #[serde(rename = "fertility")]
    Fertility,
}

impl Indicator {
    pub const ALL: [Indicator; 7] = [
        Indicator::Gdp,
        Indicator::PopulationGrowth,
        Indicator::PopulationTotal,
        Indicator::WorkingAge,
        Indicator::LifeExpectancy,
        Indicator::GdpPerCapita,
        Indicator::Fertility,
    ];

    /// Key used in the dataset document.
    pub fn key(self) -> &'static str {
        match self {
            Indicator::Gdp => "gdp",
            Indicator::PopulationGrowth => "population-growth",
            Indicator::PopulationTotal => "population-total",
            Indicator::WorkingAge => "population-working-age",
            Indicator::LifeExpectancy => "life-expectancy",
            Indicator::GdpPerCapita => "gdp-per-capita",
            Indicator::Fertility => "fertility",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Indicator {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Indicator::ALL
            .into_iter()
            .find(|i| i.key() == s)
            .ok_or_else(|| anyhow::anyhow!("Unknown indicator: {}", s))
    }
}

pub type Series = Vec<Observation>;

/// All series known for one country.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CountryRecord {
    series: BTreeMap<Indicator, Series>,
}

impl CountryRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_series(mut self, indicator: Indicator, series: Series) -> Self {
        self.insert(indicator, series);
        self
    }

    pub fn insert(&mut self, indicator: Indicator, series: Series) {
        self.series.insert(indicator, series);
    }

    pub fn series(&self, indicator: Indicator) -> Option<&Series> {
        self.series.get(&indicator)
    }

    /// `None` when the series is absent or too short to reach `index`.
    pub fn observation(&self, indicator: Indicator, index: usize) -> Option<Observation> {
        self.series(indicator).and_then(|s| s.get(index).copied())
    }

    /// Length of the longest series.
    pub fn len(&self) -> usize {
        self.series.values().map(Vec::len).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Boundary geometry for one map shape.
#[derive(Debug, Clone)]
pub struct CountryShape {
    pub code: CountryCode,
    pub geometry: MultiPolygon<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_handles_world_bank_marker() {
        assert_eq!(Observation::parse(".."), Observation::Missing);
        assert_eq!(Observation::parse(""), Observation::Missing);
        assert_eq!(Observation::parse(" 63.5 "), Observation::Value(63.5));
        assert_eq!(Observation::parse("0"), Observation::Value(0.0));
        assert_eq!(Observation::parse("n/a"), Observation::Missing);
    }

    #[test]
    fn observation_deserializes_mixed_json() {
        let parsed: Vec<Observation> =
            serde_json::from_str(r#"["1.5", 2, "..", null, ""]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Observation::Value(1.5),
                Observation::Value(2.0),
                Observation::Missing,
                Observation::Missing,
                Observation::Missing,
            ]
        );
    }

    #[test]
    fn missing_serializes_as_marker() {
        let json = serde_json::to_string(&vec![Observation::Value(3.0), Observation::Missing]).unwrap();
        assert_eq!(json, r#"[3.0,".."]"#);
    }

    #[test]
    fn indicator_keys_round_trip_through_from_str() {
        for indicator in Indicator::ALL {
            assert_eq!(indicator.key().parse::<Indicator>().unwrap(), indicator);
            assert_eq!(
                serde_json::to_string(&indicator).unwrap(),
                format!("\"{}\"", indicator.key())
            );
        }
        assert!("unemployment".parse::<Indicator>().is_err());
    }

    #[test]
    fn record_lookup_distinguishes_absent_from_missing() {
        let record = CountryRecord::new()
            .with_series(Indicator::Gdp, vec![Observation::Value(1.0), Observation::Missing]);
        assert_eq!(record.observation(Indicator::Gdp, 1), Some(Observation::Missing));
        assert_eq!(record.observation(Indicator::Gdp, 2), None);
        assert_eq!(record.observation(Indicator::Fertility, 0), None);
        assert_eq!(record.len(), 2);
    }
}
