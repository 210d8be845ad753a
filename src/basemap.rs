use std::fs;
use std::path::Path;

use anyhow::Result;
use geojson::{GeoJson, Geometry, Value};

/// A coastline as a sequence of lon/lat vertices.
pub type CoastLine = Vec<(f64, f64)>;

/// Resolution tier for basemap data, picked from the zoom level.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Lod {
    Low,    // world view
    Medium, // continental and closer
}

impl Lod {
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 2.0 {
            Lod::Low
        } else {
            Lod::Medium
        }
    }
}

/// Background coastline geometry the markers are drawn over. Purely
/// decorative context; it plays no part in queries.
pub struct Basemap {
    coastlines_low: Vec<CoastLine>,
    coastlines_medium: Vec<CoastLine>,
}

impl Basemap {
    pub fn new() -> Self {
        Self {
            coastlines_low: Vec::new(),
            coastlines_medium: Vec::new(),
        }
    }

    /// Load Natural Earth coastline files from `data_dir`, falling back to a
    /// built-in coarse outline when nothing is available.
    pub fn load(data_dir: &Path) -> Self {
        let mut basemap = Self::new();

        for (filename, lod) in [
            ("ne_110m_coastline.json", Lod::Low),
            ("ne_50m_coastline.json", Lod::Medium),
        ] {
            let path = data_dir.join(filename);
            if !path.exists() {
                continue;
            }
            if let Err(err) = basemap.load_file(&path, lod) {
                log::warn!("failed to load {}: {err:#}", path.display());
            }
        }

        if !basemap.has_data() {
            basemap.add_fallback_world();
        }
        basemap
    }

    fn load_file(&mut self, path: &Path, lod: Lod) -> Result<()> {
        let content = fs::read_to_string(path)?;
        let geojson: GeoJson = content.parse()?;
        collect_lines(&geojson, &mut |line| self.add_coastline(line, lod));
        Ok(())
    }

    pub fn add_coastline(&mut self, line: CoastLine, lod: Lod) {
        match lod {
            Lod::Low => self.coastlines_low.push(line),
            Lod::Medium => self.coastlines_medium.push(line),
        }
    }

    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty() || !self.coastlines_medium.is_empty()
    }

    /// Coastlines for a LOD, degrading to whatever is loaded.
    pub fn coastlines(&self, lod: Lod) -> &[CoastLine] {
        match lod {
            Lod::Medium if !self.coastlines_medium.is_empty() => &self.coastlines_medium,
            _ if !self.coastlines_low.is_empty() => &self.coastlines_low,
            _ => &self.coastlines_medium,
        }
    }

    /// Very coarse continent outlines so the map is not blank without data
    /// files.
    fn add_fallback_world(&mut self) {
        // North America
        self.add_coastline(
            vec![
                (-165.0, 62.0), (-140.0, 60.0), (-124.0, 48.0), (-116.0, 32.0),
                (-97.0, 26.0), (-81.0, 25.0), (-76.0, 35.0), (-66.0, 45.0),
                (-60.0, 50.0), (-78.0, 60.0), (-95.0, 64.0), (-130.0, 69.0),
                (-165.0, 62.0),
            ],
            Lod::Low,
        );
        // South America
        self.add_coastline(
            vec![
                (-78.0, 8.0), (-60.0, 4.0), (-35.0, -8.0), (-40.0, -22.0),
                (-57.0, -36.0), (-68.0, -52.0), (-74.0, -45.0), (-70.0, -18.0),
                (-80.0, -3.0), (-78.0, 8.0),
            ],
            Lod::Low,
        );
        // Europe
        self.add_coastline(
            vec![
                (-9.0, 37.0), (3.0, 42.0), (15.0, 44.0), (24.0, 38.0),
                (36.0, 45.0), (30.0, 60.0), (18.0, 69.0), (5.0, 60.0),
                (-9.0, 52.0), (-9.0, 37.0),
            ],
            Lod::Low,
        );
        // Africa
        self.add_coastline(
            vec![
                (-16.0, 22.0), (-6.0, 35.0), (32.0, 31.0), (43.0, 11.0),
                (35.0, -22.0), (19.0, -35.0), (9.0, -2.0), (-16.0, 12.0),
                (-16.0, 22.0),
            ],
            Lod::Low,
        );
        // Asia
        self.add_coastline(
            vec![
                (36.0, 45.0), (52.0, 40.0), (60.0, 24.0), (78.0, 8.0),
                (90.0, 22.0), (105.0, 9.0), (122.0, 30.0), (135.0, 35.0),
                (142.0, 47.0), (135.0, 56.0), (100.0, 52.0), (60.0, 56.0),
                (36.0, 45.0),
            ],
            Lod::Low,
        );
        // Australia
        self.add_coastline(
            vec![
                (114.0, -22.0), (132.0, -11.0), (143.0, -12.0), (153.0, -28.0),
                (146.0, -39.0), (130.0, -32.0), (115.0, -34.0), (114.0, -22.0),
            ],
            Lod::Low,
        );
    }
}

impl Default for Basemap {
    fn default() -> Self {
        Self::new()
    }
}

/// Pull every line-like geometry out of a GeoJSON document.
fn collect_lines(geojson: &GeoJson, add_line: &mut dyn FnMut(CoastLine)) {
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(geometry) = &feature.geometry {
                    collect_geometry_lines(geometry, add_line);
                }
            }
        }
        GeoJson::Feature(feature) => {
            if let Some(geometry) = &feature.geometry {
                collect_geometry_lines(geometry, add_line);
            }
        }
        GeoJson::Geometry(geometry) => collect_geometry_lines(geometry, add_line),
    }
}

fn collect_geometry_lines(geometry: &Geometry, add_line: &mut dyn FnMut(CoastLine)) {
    let ring_to_line = |ring: &Vec<Vec<f64>>| -> CoastLine {
        ring.iter().map(|c| (c[0], c[1])).collect()
    };
    match &geometry.value {
        Value::LineString(coords) => add_line(ring_to_line(coords)),
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(ring_to_line(coords));
            }
        }
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(ring_to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    add_line(ring_to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                collect_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_world_kicks_in_when_empty() {
        let basemap = Basemap::load(Path::new("/nonexistent"));
        assert!(basemap.has_data());
        assert!(!basemap.coastlines(Lod::Low).is_empty());
    }

    #[test]
    fn medium_degrades_to_low() {
        let mut basemap = Basemap::new();
        basemap.add_coastline(vec![(0.0, 0.0), (1.0, 1.0)], Lod::Low);
        assert_eq!(basemap.coastlines(Lod::Medium).len(), 1);
    }

    #[test]
    fn collect_lines_handles_multipolygon() {
        let raw = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "MultiPolygon",
                    "coordinates": [[[[0.0,0.0],[1.0,0.0],[1.0,1.0],[0.0,0.0]]]]
                }
            }]
        }"#;
        let geojson: GeoJson = raw.parse().unwrap();
        let mut lines = Vec::new();
        collect_lines(&geojson, &mut |line| lines.push(line));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 4);
    }
}
