use std::collections::BTreeMap;

use geojson::FeatureCollection;
use serde::{Deserialize, Serialize};

use crate::regions::RegionSet;
use crate::selection::SelectionState;

/// Bounding box sent as `mapWindow`: `[south, west, north, east]` in degrees.
/// Always the full allowed map extent, never the current viewport — panning
/// must not implicitly filter results; only drawn regions narrow the search.
pub const WORLD_EXTENT: [f64; 4] = [-90.0, -180.0, 90.0, 180.0];

/// Snapshot of [`SelectionState`] in wire form.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Selections {
    pub features: Vec<String>,
    pub industries: Vec<String>,
    pub companies: Vec<String>,
    pub date1: String,
    pub date2: String,
}

impl From<&SelectionState> for Selections {
    fn from(state: &SelectionState) -> Self {
        Self {
            features: state.features.iter().cloned().collect(),
            industries: state.industries.iter().cloned().collect(),
            companies: state.companies.iter().cloned().collect(),
            date1: state.date1.clone(),
            date2: state.date2.clone(),
        }
    }
}

/// POST body for the search endpoint.
#[derive(Serialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SearchRequest {
    pub selections: Selections,
    pub map_window: [f64; 4],
    pub first_load: bool,
    pub search_regions: FeatureCollection,
}

/// Build a search request from current state. Pure read; callers snapshot
/// whatever they need, nothing here mutates.
pub fn build_request(
    selections: &SelectionState,
    regions: &RegionSet,
    first_load: bool,
) -> SearchRequest {
    SearchRequest {
        selections: Selections::from(selections),
        map_window: WORLD_EXTENT,
        first_load,
        search_regions: regions.to_feature_collection(),
    }
}

/// Facet summary keyed by category, each a map from option name to the
/// number of records carrying it.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct FacetSummary {
    #[serde(rename = "Industry", default)]
    pub industry: BTreeMap<String, u64>,
    #[serde(rename = "Feature", default)]
    pub feature: BTreeMap<String, u64>,
    #[serde(rename = "Company", default)]
    pub company: BTreeMap<String, u64>,
}

/// Point geometry of a matched record.
#[derive(Deserialize, Clone, Debug)]
pub struct PointGeometry {
    pub coordinates: Vec<f64>,
}

impl PointGeometry {
    /// `(lon, lat)` when the coordinate array is well formed.
    pub fn lon_lat(&self) -> Option<(f64, f64)> {
        match self.coordinates.as_slice() {
            [lon, lat, ..] => Some((*lon, *lat)),
            _ => None,
        }
    }
}

/// Everything the backend knows about a matched user record. All fields are
/// optional; the popup simply omits lines for absent ones.
#[derive(Deserialize, Clone, Debug, Default, PartialEq)]
pub struct UserDetails {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub email: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub industry: Option<String>,
    pub company: Option<String>,
    #[serde(rename = "postalCode")]
    pub postal_code: Option<String>,
    pub features: Option<Vec<String>>,
    pub username: Option<String>,
}

/// One matched record: a GeoJSON-style point feature whose attributes ride
/// in `fullDetails`.
#[derive(Deserialize, Clone, Debug)]
pub struct PointDocument {
    #[serde(default)]
    pub geometry: Option<PointGeometry>,
    #[serde(rename = "fullDetails", default)]
    pub full_details: UserDetails,
}

/// Search endpoint response. A first-load request answers with facets; a
/// regular search answers with documents. Both fields tolerate absence.
#[derive(Deserialize, Clone, Debug, Default)]
pub struct SearchResponse {
    #[serde(default)]
    pub facets: Option<FacetSummary>,
    #[serde(default)]
    pub documents: Vec<PointDocument>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct LastUpdateResponse {
    #[serde(rename = "lastUpdated")]
    pub last_updated: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct TotalCountResponse {
    #[serde(rename = "totalCount")]
    pub total_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_state() -> SelectionState {
        let mut state = SelectionState::new();
        state.industries.insert("Finance".into());
        state.industries.insert("Tech".into());
        state.features.insert("Geospatial".into());
        state
    }

    #[test]
    fn request_uses_fixed_world_extent() {
        let state = sample_state();
        let regions = RegionSet::new();
        let request = build_request(&state, &regions, true);
        assert_eq!(request.map_window, [-90.0, -180.0, 90.0, 180.0]);
        assert!(request.first_load);
    }

    #[test]
    fn build_request_does_not_mutate_state() {
        let state = sample_state();
        let before = state.clone();
        let mut regions = RegionSet::new();
        regions.add_rect((0.0, 0.0), (10.0, 10.0));

        let _ = build_request(&state, &regions, false);
        assert_eq!(state, before);
        assert_eq!(regions.len(), 1);
    }

    #[test]
    fn regions_serialize_one_feature_each() {
        let state = sample_state();
        let mut regions = RegionSet::new();
        regions.add_rect((0.0, 0.0), (10.0, 10.0));
        regions.add_rect((-30.0, -10.0), (-20.0, 5.0));

        let request = build_request(&state, &regions, false);
        assert_eq!(request.search_regions.features.len(), 2);
    }

    #[test]
    fn wire_field_names_match_contract() {
        let state = sample_state();
        let regions = RegionSet::new();
        let value = serde_json::to_value(build_request(&state, &regions, false)).unwrap();

        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("selections"));
        assert!(obj.contains_key("mapWindow"));
        assert!(obj.contains_key("firstLoad"));
        assert!(obj.contains_key("searchRegions"));

        let selections = obj["selections"].as_object().unwrap();
        for key in ["features", "industries", "companies", "date1", "date2"] {
            assert!(selections.contains_key(key), "missing {key}");
        }
        assert_eq!(
            selections["industries"],
            serde_json::json!(["Finance", "Tech"])
        );
    }

    #[test]
    fn response_parses_facets_and_documents() {
        let raw = r#"{
            "facets": {
                "Industry": {"Finance": 3, "Tech": 5},
                "Feature": {"Geospatial": 2},
                "Company": {"Acme": 1}
            },
            "documents": [
                {
                    "type": "Feature",
                    "geometry": {"type": "Point", "coordinates": [-122.3, 47.6]},
                    "fullDetails": {
                        "firstname": "Ada",
                        "lastname": "Lovelace",
                        "company": "Acme",
                        "features": ["Geospatial"],
                        "username": "ada"
                    }
                }
            ]
        }"#;

        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        let facets = response.facets.unwrap();
        assert_eq!(facets.industry["Finance"], 3);
        assert_eq!(facets.company.len(), 1);

        assert_eq!(response.documents.len(), 1);
        let doc = &response.documents[0];
        assert_eq!(doc.geometry.as_ref().unwrap().lon_lat(), Some((-122.3, 47.6)));
        assert_eq!(doc.full_details.firstname.as_deref(), Some("Ada"));
        assert_eq!(doc.full_details.email, None);
    }

    #[test]
    fn response_tolerates_missing_sections() {
        let response: SearchResponse = serde_json::from_str("{}").unwrap();
        assert!(response.facets.is_none());
        assert!(response.documents.is_empty());
    }

    #[test]
    fn aux_responses_parse() {
        let last: LastUpdateResponse =
            serde_json::from_str(r#"{"lastUpdated": "2019-04-02"}"#).unwrap();
        assert_eq!(last.last_updated, "2019-04-02");

        let total: TotalCountResponse = serde_json::from_str(r#"{"totalCount": 412}"#).unwrap();
        assert_eq!(total.total_count, 412);
    }
}
