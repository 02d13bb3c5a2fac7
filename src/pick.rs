use crate::types::{CountryCode, CountryShape};
use geo::algorithm::bounding_rect::BoundingRect;
use geo::algorithm::contains::Contains;
use geo::{MultiPolygon, Point};
use rstar::{RTree, RTreeObject, AABB};

struct ShapeEnvelope {
    index: usize,
    aabb: AABB<[f64; 2]>,
}

impl RTreeObject for ShapeEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.aabb
    }
}

/// Resolves a lon/lat position to the country whose boundary contains it.
pub struct BoundaryIndex {
    shapes: Vec<(CountryCode, MultiPolygon<f64>)>,
    tree: RTree<ShapeEnvelope>,
}

impl BoundaryIndex {
    pub fn build(boundaries: &[CountryShape]) -> Self {
        let shapes: Vec<(CountryCode, MultiPolygon<f64>)> = boundaries
            .iter()
            .map(|s| (s.code.clone(), s.geometry.clone()))
            .collect();

        // Empty geometries have no bounding box and can never be hit.
        let items: Vec<ShapeEnvelope> = shapes
            .iter()
            .enumerate()
            .filter_map(|(index, (_, geometry))| {
                let rect = geometry.bounding_rect()?;
                Some(ShapeEnvelope {
                    index,
                    aabb: AABB::from_corners([rect.min().x, rect.min().y], [rect.max().x, rect.max().y]),
                })
            })
            .collect();

        tracing::debug!("Built boundary index over {} shapes", items.len());
        Self { shapes, tree: RTree::bulk_load(items) }
    }

    pub fn locate(&self, lon: f64, lat: f64) -> Option<&CountryCode> {
        let point = Point::new(lon, lat);
        let envelope = AABB::from_point([lon, lat]);

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter_map(|candidate| self.shapes.get(candidate.index))
            .find(|(_, geometry)| geometry.contains(&point))
            .map(|(code, _)| code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Polygon};

    fn square(code: &str, x: f64, y: f64, size: f64) -> CountryShape {
        let poly: Polygon<f64> = polygon![
            (x: x, y: y),
            (x: x + size, y: y),
            (x: x + size, y: y + size),
            (x: x, y: y + size),
            (x: x, y: y),
        ];
        CountryShape { code: CountryCode::from(code), geometry: MultiPolygon::new(vec![poly]) }
    }

    fn triangle(code: &str) -> CountryShape {
        let poly: Polygon<f64> = polygon![(x: 20.0, y: 0.0), (x: 30.0, y: 0.0), (x: 20.0, y: 10.0), (x: 20.0, y: 0.0)];
        CountryShape { code: CountryCode::from(code), geometry: MultiPolygon::new(vec![poly]) }
    }

    #[test]
    fn finds_containing_country() {
        let index = BoundaryIndex::build(&[square("AAA", 0.0, 0.0, 10.0), square("BBB", -20.0, -20.0, 5.0)]);
        assert_eq!(index.locate(5.0, 5.0).map(CountryCode::as_str), Some("AAA"));
        assert_eq!(index.locate(-18.0, -17.0).map(CountryCode::as_str), Some("BBB"));
        assert_eq!(index.locate(50.0, 50.0), None);
    }

    #[test]
    fn bounding_box_hit_outside_polygon_is_a_miss() {
        let index = BoundaryIndex::build(&[triangle("TRI")]);
        assert_eq!(index.locate(21.0, 1.0).map(CountryCode::as_str), Some("TRI"));
        assert_eq!(index.locate(29.0, 9.0), None);
    }

    #[test]
    fn empty_geometry_is_skipped() {
        let empty = CountryShape { code: CountryCode::from("NIL"), geometry: MultiPolygon::new(vec![]) };
        let index = BoundaryIndex::build(&[empty, square("AAA", 0.0, 0.0, 1.0)]);
        assert_eq!(index.locate(0.5, 0.5).map(CountryCode::as_str), Some("AAA"));
    }
}
