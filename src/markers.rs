use std::collections::HashMap;

use crate::protocol::{PointDocument, UserDetails};

/// A rendered point record.
#[derive(Clone, Debug)]
pub struct Marker {
    pub lon: f64,
    pub lat: f64,
    pub details: UserDetails,
}

/// All markers currently on the map, with a spatial hash grid for click
/// hit-testing. Replaced wholesale on every successful search response.
pub struct MarkerSet {
    markers: Vec<Marker>,
    /// Grid cells (degree-sized) holding indices into `markers`.
    cells: HashMap<(i32, i32), Vec<usize>>,
    cell_size: f64,
}

impl MarkerSet {
    const CELL_SIZE_DEG: f64 = 1.0;

    pub fn new() -> Self {
        Self {
            markers: Vec::new(),
            cells: HashMap::new(),
            cell_size: Self::CELL_SIZE_DEG,
        }
    }

    /// Drop the previous marker set and rebuild from a fresh response.
    /// Documents without a usable point geometry are skipped.
    pub fn replace_all(&mut self, documents: Vec<PointDocument>) {
        self.markers.clear();
        self.cells.clear();

        for doc in documents {
            let Some((lon, lat)) = doc.geometry.as_ref().and_then(|g| g.lon_lat()) else {
                continue;
            };
            let idx = self.markers.len();
            let cell = self.cell_of(lon, lat);
            self.markers.push(Marker {
                lon,
                lat,
                details: doc.full_details,
            });
            self.cells.entry(cell).or_default().push(idx);
        }
    }

    fn cell_of(&self, lon: f64, lat: f64) -> (i32, i32) {
        (
            (lon / self.cell_size).floor() as i32,
            (lat / self.cell_size).floor() as i32,
        )
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.markers.iter()
    }

    /// Nearest marker within `radius_deg` of the point, for click handling.
    pub fn nearest_within(&self, lon: f64, lat: f64, radius_deg: f64) -> Option<&Marker> {
        let cell_radius = (radius_deg / self.cell_size).ceil() as i32;
        let center = self.cell_of(lon, lat);

        let mut best: Option<(f64, usize)> = None;
        for dy in -cell_radius..=cell_radius {
            for dx in -cell_radius..=cell_radius {
                let Some(indices) = self.cells.get(&(center.0 + dx, center.1 + dy)) else {
                    continue;
                };
                for &idx in indices {
                    let marker = &self.markers[idx];
                    let dist = flat_distance_deg(lon, lat, marker.lon, marker.lat);
                    if dist <= radius_deg && best.map_or(true, |(d, _)| dist < d) {
                        best = Some((dist, idx));
                    }
                }
            }
        }
        best.map(|(_, idx)| &self.markers[idx])
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self::new()
    }
}

/// Equirectangular distance in degrees, with longitude scaled by latitude.
/// Plenty for hit-testing at click radii of a few degrees or less.
fn flat_distance_deg(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let cos_lat = ((lat1 + lat2) * 0.5).to_radians().cos();
    let dx = (lon2 - lon1) * cos_lat;
    let dy = lat2 - lat1;
    (dx * dx + dy * dy).sqrt()
}

/// Display name for a marker, used as its map label.
pub fn display_name(details: &UserDetails) -> String {
    match (&details.firstname, &details.lastname) {
        (Some(first), Some(last)) => format!("{first} {last}"),
        (Some(first), None) => first.clone(),
        (None, Some(last)) => last.clone(),
        (None, None) => details.username.clone().unwrap_or_default(),
    }
}

/// Popup lines for a marker. Absent fields omit their line entirely; an
/// explicitly empty feature list still gets a "none specified" line.
pub fn popup_lines(details: &UserDetails) -> Vec<String> {
    let mut lines = Vec::new();

    if let Some(first) = &details.firstname {
        let mut name = format!("Name: {first}");
        if let Some(last) = &details.lastname {
            name.push(' ');
            name.push_str(last);
        }
        lines.push(name);
    }
    if let Some(email) = &details.email {
        lines.push(format!("Email: {email}"));
    }
    if let Some(company) = &details.company {
        lines.push(format!("Company: {company}"));
    }
    match (&details.city, &details.state) {
        (Some(city), Some(state)) => lines.push(format!("Location: {city}, {state}")),
        (Some(city), None) => lines.push(format!("Location: {city}")),
        (None, Some(state)) => lines.push(format!("Location: {state}")),
        (None, None) => {}
    }
    if let Some(postal) = &details.postal_code {
        lines.push(format!("Postal Code: {postal}"));
    }
    if let Some(industry) = &details.industry {
        lines.push(format!("Industry: {industry}"));
    }
    match details.features.as_deref() {
        Some([]) => lines.push("Features: none specified".into()),
        Some(features) => {
            lines.push("Features:".into());
            for feature in features {
                lines.push(format!("  - {feature}"));
            }
        }
        None => {}
    }
    if let Some(username) = &details.username {
        lines.push(format!("Profile: {username}"));
    }

    lines
}
