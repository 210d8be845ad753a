use crate::basemap::{Basemap, CoastLine, Lod};
use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_circle, draw_line, draw_rect};
use crate::map::projection::Viewport;
use crate::markers::{display_name, MarkerSet};
use crate::regions::RegionSet;

/// Everything that goes on the map for one frame.
pub struct Scene<'a> {
    pub basemap: &'a Basemap,
    pub markers: &'a MarkerSet,
    pub regions: &'a RegionSet,
    /// Rectangle being dragged out in draw mode, as two free corners.
    pub draft_rect: Option<((f64, f64), (f64, f64))>,
    pub show_labels: bool,
}

/// Rendered layers, kept separate so the widget can color them
/// independently. Labels are in character coordinates.
pub struct MapLayers {
    pub basemap: BrailleCanvas,
    pub regions: BrailleCanvas,
    pub markers: BrailleCanvas,
    pub labels: Vec<(u16, u16, String)>,
}

/// Don't label the map when it would be wallpapered with names.
const MAX_LABELED_MARKERS: usize = 120;

pub fn render_scene(scene: &Scene, width: usize, height: usize, viewport: &Viewport) -> MapLayers {
    let mut layers = MapLayers {
        basemap: BrailleCanvas::new(width, height),
        regions: BrailleCanvas::new(width, height),
        markers: BrailleCanvas::new(width, height),
        labels: Vec::new(),
    };

    let lod = Lod::from_zoom(viewport.zoom);
    for line in scene.basemap.coastlines(lod) {
        draw_coastline(&mut layers.basemap, line, viewport);
    }

    for region in scene.regions.iter() {
        draw_geo_rect(
            &mut layers.regions,
            viewport,
            (region.min_lon, region.min_lat),
            (region.max_lon, region.max_lat),
        );
    }
    if let Some((a, b)) = scene.draft_rect {
        draw_geo_rect(&mut layers.regions, viewport, a, b);
    }

    let label_markers = scene.show_labels
        && viewport.zoom >= 4.0
        && scene.markers.len() <= MAX_LABELED_MARKERS;

    let radius = if viewport.zoom > 10.0 {
        2
    } else if viewport.zoom > 4.0 {
        1
    } else {
        0
    };

    for marker in scene.markers.iter() {
        let (px, py) = viewport.project(marker.lon, marker.lat);
        if !viewport.is_visible(px, py) {
            continue;
        }
        draw_circle(&mut layers.markers, px, py, radius);

        if label_markers && px >= 0 && py >= 0 {
            let name = display_name(&marker.details);
            if !name.is_empty() {
                layers
                    .labels
                    .push(((px / 2) as u16 + 1, (py / 4) as u16, name));
            }
        }
    }

    layers
}

/// Draw a coastline with viewport culling. Segments longer than the canvas
/// are skipped; they are projection wrap-arounds, not real coastline.
fn draw_coastline(canvas: &mut BrailleCanvas, line: &CoastLine, viewport: &Viewport) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;
    for &(lon, lat) in line {
        let (px, py) = viewport.project(lon, lat);
        if let Some((prev_x, prev_y)) = prev {
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.segment_might_be_visible((prev_x, prev_y), (px, py)) {
                draw_line(canvas, prev_x, prev_y, px, py);
            }
        }
        prev = Some((px, py));
    }
}

/// Draw a rectangle given in geographic corner coordinates.
fn draw_geo_rect(canvas: &mut BrailleCanvas, viewport: &Viewport, a: (f64, f64), b: (f64, f64)) {
    let (min_lon, max_lon) = (a.0.min(b.0), a.0.max(b.0));
    let (min_lat, max_lat) = (a.1.min(b.1), a.1.max(b.1));

    let (x0, y0) = viewport.project(min_lon, max_lat); // NW corner
    let (x1, y1) = viewport.project(max_lon, min_lat); // SE corner
    if viewport.segment_might_be_visible((x0, y0), (x1, y1)) {
        draw_rect(canvas, x0, y0, x1, y1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PointDocument, PointGeometry, UserDetails};

    fn lit_cells(canvas: &BrailleCanvas) -> usize {
        canvas
            .rows()
            .map(|row| row.chars().filter(|&c| c != '\u{2800}').count())
            .sum()
    }

    fn scene_parts() -> (Basemap, MarkerSet, RegionSet) {
        let basemap = Basemap::new();
        let mut markers = MarkerSet::new();
        markers.replace_all(vec![PointDocument {
            geometry: Some(PointGeometry {
                coordinates: vec![0.0, 0.0],
            }),
            full_details: UserDetails {
                firstname: Some("Ada".into()),
                ..UserDetails::default()
            },
        }]);
        let mut regions = RegionSet::new();
        regions.add_rect((-20.0, -20.0), (20.0, 20.0));
        (basemap, markers, regions)
    }

    #[test]
    fn markers_and_regions_land_on_their_layers() {
        let (basemap, markers, regions) = scene_parts();
        let scene = Scene {
            basemap: &basemap,
            markers: &markers,
            regions: &regions,
            draft_rect: None,
            show_labels: false,
        };
        let viewport = Viewport::new(0.0, 0.0, 1.0, 160, 96);
        let layers = render_scene(&scene, 80, 24, &viewport);

        assert!(lit_cells(&layers.markers) > 0);
        assert!(lit_cells(&layers.regions) > 0);
        assert!(layers.labels.is_empty());
    }

    #[test]
    fn labels_appear_when_zoomed_in() {
        let (basemap, markers, regions) = scene_parts();
        let scene = Scene {
            basemap: &basemap,
            markers: &markers,
            regions: &regions,
            draft_rect: None,
            show_labels: true,
        };
        let viewport = Viewport::new(0.0, 0.0, 5.0, 160, 96);
        let layers = render_scene(&scene, 80, 24, &viewport);
        assert_eq!(layers.labels.len(), 1);
        assert_eq!(layers.labels[0].2, "Ada");
    }
}
