use crate::data::Dataset;
use crate::scale::Rgb;
use crate::surface::{Attr, Batch, Element, PointId, RenderSurface, ShapeId, Transition};
use crate::types::{CountryCode, CountryShape};
use std::collections::BTreeMap;

pub const MAP_BASE_OPACITY: f64 = 1.0;
pub const POINT_BASE_OPACITY: f64 = 0.9;
pub const POINT_BASE_STROKE_WIDTH: f64 = 0.5;
pub const POINT_STROKE: Rgb = Rgb::BLACK;

/// The two elements drawn for one country. Either may be absent: a boundary without indicator
/// data has no scatter point, an indicator record without a boundary has no map shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HandlePair {
    pub shape: Option<ShapeId>,
    pub point: Option<PointId>,
}

#[derive(Debug, Clone, Default)]
pub struct HandleTable {
    by_code: BTreeMap<CountryCode, HandlePair>,
}

impl HandleTable {
    pub fn get(&self, code: &CountryCode) -> Option<HandlePair> {
        self.by_code.get(code).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CountryCode, &HandlePair)> {
        self.by_code.iter()
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}

/// One shape per boundary feature, in boundary document order.
#[derive(Debug, Clone, Default)]
pub struct MapView {
    shapes: Vec<CountryCode>,
}

impl MapView {
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    pub fn code(&self, id: ShapeId) -> Option<&CountryCode> {
        self.shapes.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ShapeId, &CountryCode)> {
        self.shapes.iter().enumerate().map(|(i, c)| (ShapeId(i as u32), c))
    }
}

/// One point per country in the indicator dataset.
#[derive(Debug, Clone, Default)]
pub struct ScatterView {
    points: Vec<CountryCode>,
}

impl ScatterView {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn code(&self, id: PointId) -> Option<&CountryCode> {
        self.points.get(id.0 as usize)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PointId, &CountryCode)> {
        self.points.iter().enumerate().map(|(i, c)| (PointId(i as u32), c))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Views {
    pub map: MapView,
    pub scatter: ScatterView,
    pub handles: HandleTable,
}

impl Views {
    pub fn build(data: &Dataset, boundaries: &[CountryShape]) -> Self {
        let mut handles: BTreeMap<CountryCode, HandlePair> = BTreeMap::new();

        let shapes: Vec<CountryCode> = boundaries.iter().map(|s| s.code.clone()).collect();
        for (i, code) in shapes.iter().enumerate() {
            let pair = handles.entry(code.clone()).or_default();
            // Multi-part countries split across features keep their first shape as the partner.
            if pair.shape.is_none() {
                pair.shape = Some(ShapeId(i as u32));
            }
        }

        let points: Vec<CountryCode> = data.codes().cloned().collect();
        for (i, code) in points.iter().enumerate() {
            handles.entry(code.clone()).or_default().point = Some(PointId(i as u32));
        }

        tracing::debug!("Built views: {} map shapes, {} scatter points", shapes.len(), points.len());

        Self {
            map: MapView { shapes },
            scatter: ScatterView { points },
            handles: HandleTable { by_code: handles },
        }
    }

    /// Writes the resting opacity and stroke of every element.
    pub fn initialize<S: RenderSurface>(&self, surface: &mut S) {
        let mut batch = Batch::new();
        for (id, _) in self.map.iter() {
            batch.push(Element::Shape(id), Attr::Opacity(MAP_BASE_OPACITY), Transition::Immediate);
        }
        for (id, _) in self.scatter.iter() {
            let point = Element::Point(id);
            batch.push(point, Attr::Stroke(POINT_STROKE), Transition::Immediate);
            batch.push(point, Attr::StrokeWidth(POINT_BASE_STROKE_WIDTH), Transition::Immediate);
            batch.push(point, Attr::Opacity(POINT_BASE_OPACITY), Transition::Immediate);
        }
        surface.apply(batch);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::RetainedSurface;
    use crate::types::CountryRecord;
    use geo::MultiPolygon;

    fn shape(code: &str) -> CountryShape {
        CountryShape { code: CountryCode::from(code), geometry: MultiPolygon::new(vec![]) }
    }

    fn views() -> Views {
        let data = Dataset::from_records(
            1960,
            ["FRA", "USA", "XKX"].into_iter().map(|c| (CountryCode::from(c), CountryRecord::new())),
        );
        Views::build(&data, &[shape("USA"), shape("ATA"), shape("FRA"), shape("FRA")])
    }

    #[test]
    fn handle_table_links_both_views() {
        let views = views();
        assert_eq!(views.map.len(), 4);
        assert_eq!(views.scatter.len(), 3);
        assert_eq!(views.handles.len(), 4);

        let usa = views.handles.get(&CountryCode::from("USA")).unwrap();
        assert_eq!(views.map.code(usa.shape.unwrap()).unwrap().as_str(), "USA");
        assert_eq!(views.scatter.code(usa.point.unwrap()).unwrap().as_str(), "USA");

        let ata = views.handles.get(&CountryCode::from("ATA")).unwrap();
        assert!(ata.shape.is_some() && ata.point.is_none());

        let xkx = views.handles.get(&CountryCode::from("XKX")).unwrap();
        assert!(xkx.shape.is_none() && xkx.point.is_some());
    }

    #[test]
    fn repeated_features_keep_first_shape_as_partner() {
        let views = views();
        let fra = CountryCode::from("FRA");
        assert_eq!(views.map.code(ShapeId(3)), Some(&fra));
        assert_eq!(views.handles.get(&fra).unwrap().shape, Some(ShapeId(2)));
    }

    #[test]
    fn initialize_sets_resting_style() {
        let views = views();
        let mut surface = RetainedSurface::new();
        views.initialize(&mut surface);

        assert_eq!(surface.shape(ShapeId(1)).unwrap().opacity, Some(MAP_BASE_OPACITY));
        let point = surface.point(PointId(0)).unwrap();
        assert_eq!(point.opacity, Some(POINT_BASE_OPACITY));
        assert_eq!(point.stroke_width, Some(POINT_BASE_STROKE_WIDTH));
        assert_eq!(point.stroke, Some(Rgb::BLACK));
        assert_eq!(surface.batches(), 1);
    }
}
