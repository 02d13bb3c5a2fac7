//! Converts a World Bank databank CSV export into the indicator dataset document.
//!
//! Expected columns: `Country Name, Country Code, Series Name, Series Code, <one column per year>`.
//! Year headers look like `1960 [YR1960]` or plain `1960`.

use crate::types::{CountryCode, CountryRecord, Indicator, Observation, Series};
use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const COUNTRY_CODE_COLUMN: usize = 1;
const SERIES_CODE_COLUMN: usize = 3;
const FIRST_YEAR_COLUMN: usize = 4;

#[derive(Debug)]
pub struct IngestResult {
    pub first_year: i32,
    pub records: BTreeMap<CountryCode, CountryRecord>,
}

impl IngestResult {
    /// The dataset document carries no years, so it is only readable against a matching
    /// `timeline.base_year`.
    pub fn ensure_base_year(&self, base_year: i32) -> Result<()> {
        if self.first_year != base_year {
            return Err(anyhow!(
                "Export starts in {} but timeline.base_year is {}; every series would be shifted by {} years",
                self.first_year, base_year, i64::from(self.first_year) - i64::from(base_year)
            ));
        }
        Ok(())
    }
}

pub fn ingest_file(path: &Path, series_map: &BTreeMap<String, Indicator>) -> Result<IngestResult> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;
    ingest_reader(file, series_map)
        .with_context(|| format!("Failed to ingest {:?}", path))
}

pub fn ingest_reader<R: Read>(reader: R, series_map: &BTreeMap<String, Indicator>) -> Result<IngestResult> {
    // Databank exports end with a few free-text footer lines, hence `flexible`.
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = rdr.headers()?.clone();

    if headers.len() <= FIRST_YEAR_COLUMN {
        return Err(anyhow!("CSV has no year columns (found {} columns)", headers.len()));
    }
    let first_year = parse_year_header(&headers[FIRST_YEAR_COLUMN])
        .ok_or_else(|| anyhow!("Cannot read a year from column header '{}'", &headers[FIRST_YEAR_COLUMN]))?;

    let mut records: BTreeMap<CountryCode, CountryRecord> = BTreeMap::new();
    let mut rows = 0usize;

    for result in rdr.records() {
        let record = result?;
        let code = record.get(COUNTRY_CODE_COLUMN).unwrap_or("").trim();
        let series_code = record.get(SERIES_CODE_COLUMN).unwrap_or("").trim();
        if code.is_empty() {
            continue;
        }
        let indicator = match series_map.get(series_code) {
            Some(indicator) => *indicator,
            None => continue,
        };

        let series: Series = record.iter().skip(FIRST_YEAR_COLUMN).map(Observation::parse).collect();
        records.entry(CountryCode::new(code)).or_default().insert(indicator, series);
        rows += 1;
    }

    tracing::info!("Ingested {} series rows for {} countries, first year {}", rows, records.len(), first_year);

    Ok(IngestResult { first_year, records })
}

pub fn write_dataset(path: &Path, records: &BTreeMap<CountryCode, CountryRecord>) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create dataset file: {:?}", path))?;
    serde_json::to_writer(file, records)
        .with_context(|| format!("Failed to write dataset file: {:?}", path))?;
    Ok(())
}

fn parse_year_header(header: &str) -> Option<i32> {
    header.trim().get(..4)?.parse().ok()
}
