use geojson::{Feature, FeatureCollection, Geometry, Value};

/// A user-drawn rectangular search region in geographic coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct DrawnRegion {
    pub id: u64,
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl DrawnRegion {
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        lon >= self.min_lon && lon <= self.max_lon && lat >= self.min_lat && lat <= self.max_lat
    }

    /// Closed exterior ring, counter-clockwise starting at the SW corner.
    fn to_feature(&self) -> Feature {
        let ring = vec![
            vec![self.min_lon, self.min_lat],
            vec![self.max_lon, self.min_lat],
            vec![self.max_lon, self.max_lat],
            vec![self.min_lon, self.max_lat],
            vec![self.min_lon, self.min_lat],
        ];
        Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Polygon(vec![ring]))),
            id: None,
            properties: None,
            foreign_members: None,
        }
    }
}

/// The set of all drawn regions. The set as a whole, never an individual
/// shape, is what gets serialized into each query payload.
#[derive(Clone, Debug, Default)]
pub struct RegionSet {
    regions: Vec<DrawnRegion>,
    next_id: u64,
}

impl RegionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a region from two drag corners, normalizing their order.
    /// Returns the new region's id.
    pub fn add_rect(&mut self, a: (f64, f64), b: (f64, f64)) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.regions.push(DrawnRegion {
            id,
            min_lon: a.0.min(b.0),
            min_lat: a.1.min(b.1),
            max_lon: a.0.max(b.0),
            max_lat: a.1.max(b.1),
        });
        id
    }

    /// Move a region by a lon/lat delta (the "edited" path).
    pub fn translate(&mut self, id: u64, dlon: f64, dlat: f64) {
        if let Some(region) = self.regions.iter_mut().find(|r| r.id == id) {
            region.min_lon += dlon;
            region.max_lon += dlon;
            region.min_lat += dlat;
            region.max_lat += dlat;
        }
    }

    /// Id of the topmost region containing the point, if any.
    pub fn region_at(&self, lon: f64, lat: f64) -> Option<u64> {
        self.regions
            .iter()
            .rev()
            .find(|r| r.contains(lon, lat))
            .map(|r| r.id)
    }

    /// Delete the topmost region containing the point. Returns true if one
    /// was removed.
    pub fn remove_at(&mut self, lon: f64, lat: f64) -> bool {
        match self.region_at(lon, lat) {
            Some(id) => {
                self.regions.retain(|r| r.id != id);
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.regions.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &DrawnRegion> {
        self.regions.iter()
    }

    /// GeoJSON serialization of the whole set, as sent in `searchRegions`.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.regions.iter().map(DrawnRegion::to_feature).collect(),
            foreign_members: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_rect_normalizes_corners() {
        let mut set = RegionSet::new();
        set.add_rect((10.0, 50.0), (-5.0, 40.0));
        let region = set.iter().next().unwrap();
        assert_eq!(region.min_lon, -5.0);
        assert_eq!(region.max_lon, 10.0);
        assert_eq!(region.min_lat, 40.0);
        assert_eq!(region.max_lat, 50.0);
    }

    #[test]
    fn contains_and_remove_at() {
        let mut set = RegionSet::new();
        set.add_rect((0.0, 0.0), (10.0, 10.0));
        assert!(set.region_at(5.0, 5.0).is_some());
        assert!(set.region_at(15.0, 5.0).is_none());

        assert!(set.remove_at(5.0, 5.0));
        assert!(set.is_empty());
        assert!(!set.remove_at(5.0, 5.0));
    }

    #[test]
    fn remove_at_takes_topmost_overlap() {
        let mut set = RegionSet::new();
        let first = set.add_rect((0.0, 0.0), (10.0, 10.0));
        set.add_rect((5.0, 5.0), (20.0, 20.0));

        assert!(set.remove_at(7.0, 7.0));
        assert_eq!(set.len(), 1);
        assert_eq!(set.iter().next().unwrap().id, first);
    }

    #[test]
    fn translate_moves_bounds() {
        let mut set = RegionSet::new();
        let id = set.add_rect((0.0, 0.0), (10.0, 10.0));
        set.translate(id, 5.0, -2.0);
        let region = set.iter().next().unwrap();
        assert_eq!(region.min_lon, 5.0);
        assert_eq!(region.max_lon, 15.0);
        assert_eq!(region.min_lat, -2.0);
        assert_eq!(region.max_lat, 8.0);
    }

    #[test]
    fn feature_collection_holds_one_polygon_per_region() {
        let mut set = RegionSet::new();
        set.add_rect((0.0, 0.0), (10.0, 10.0));
        set.add_rect((20.0, 20.0), (30.0, 30.0));

        let fc = set.to_feature_collection();
        assert_eq!(fc.features.len(), 2);
        let geom = fc.features[0].geometry.as_ref().unwrap();
        match &geom.value {
            Value::Polygon(rings) => {
                assert_eq!(rings.len(), 1);
                assert_eq!(rings[0].len(), 5);
                assert_eq!(rings[0].first(), rings[0].last());
            }
            other => panic!("expected polygon, got {other:?}"),
        }
    }
}
