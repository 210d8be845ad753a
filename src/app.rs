use ratatui::layout::{Constraint, Direction, Layout, Rect};

use crate::basemap::Basemap;
use crate::client::{FetchEvent, Job, SearchClient};
use crate::map::Viewport;
use crate::markers::{display_name, popup_lines, MarkerSet};
use crate::panel::FilterPanel;
use crate::protocol::{build_request, FacetSummary};
use crate::regions::RegionSet;
use crate::selection::{FilterCategory, SelectionState};

/// Which pane receives keyboard input.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Map,
    Sidebar,
}

/// Region drawing tool state. `Ready` means the next map drag draws instead
/// of panning; a drag starting inside an existing region moves it.
pub enum DrawTool {
    Inactive,
    Ready,
    Drafting { start: (f64, f64), current: (f64, f64) },
    MovingRegion { id: u64, last: (f64, f64) },
}

/// Details popup for a clicked marker.
pub struct Popup {
    pub title: String,
    pub lines: Vec<String>,
}

pub const SIDEBAR_WIDTH: u16 = 34;

/// All mutable session state, owned here and mutated only from the event
/// loop. Created at startup, dropped on exit; nothing lives in globals.
pub struct App {
    pub viewport: Viewport,
    pub basemap: Basemap,

    pub selections: SelectionState,
    pub panels: Vec<FilterPanel>,
    pub regions: RegionSet,
    pub markers: MarkerSet,

    pub focus: Focus,
    pub sidebar_cursor: usize,
    pub draw: DrawTool,
    pub popup: Option<Popup>,
    pub show_labels: bool,

    pub total_count: Option<u64>,
    pub last_updated: Option<String>,

    client: SearchClient,
    /// Sequence of the newest submitted search; older completions are stale.
    query_seq: u64,
    panels_registered: bool,

    pub should_quit: bool,
    term_width: u16,
    term_height: u16,
    /// Mouse drag bookkeeping: last position while panning, press position
    /// and whether the press turned into a drag (for click detection).
    last_mouse: Option<(u16, u16)>,
    press: Option<(u16, u16)>,
    press_dragged: bool,
    pub mouse_pos: Option<(u16, u16)>,
}

impl App {
    pub fn new(
        client: SearchClient,
        basemap: Basemap,
        date1: Option<String>,
        date2: Option<String>,
        term_width: u16,
        term_height: u16,
    ) -> Self {
        let mut selections = SelectionState::new();
        selections.date1 = date1.unwrap_or_default();
        selections.date2 = date2.unwrap_or_default();

        let mut app = Self {
            viewport: Viewport::world(0, 0),
            basemap,
            selections,
            panels: Vec::new(),
            regions: RegionSet::new(),
            markers: MarkerSet::new(),
            focus: Focus::Map,
            sidebar_cursor: 0,
            draw: DrawTool::Inactive,
            popup: None,
            show_labels: true,
            total_count: None,
            last_updated: None,
            client,
            query_seq: 0,
            panels_registered: false,
            should_quit: false,
            term_width,
            term_height,
            last_mouse: None,
            press: None,
            press_dragged: false,
            mouse_pos: None,
        };
        app.sync_viewport_size();
        app
    }

    /// Kick off the startup sequence: a facet-discovery search plus the two
    /// metadata reads.
    pub fn start(&mut self) {
        self.submit_search(true);
        self.client.submit(Job::LastUpdate);
        self.client.submit(Job::TotalCount);
    }

    // ---- layout ----------------------------------------------------------

    /// Screen split: sidebar on the left, map filling the rest, one status
    /// line at the bottom. Used by both rendering and mouse routing.
    pub fn layout(&self, area: Rect) -> (Rect, Rect, Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(area);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(10)])
            .split(rows[0]);
        (cols[0], cols[1], rows[1])
    }

    fn screen(&self) -> Rect {
        Rect::new(0, 0, self.term_width, self.term_height)
    }

    /// Map area inside its border.
    fn map_inner(&self) -> Rect {
        let (_, map_area, _) = self.layout(self.screen());
        Rect {
            x: map_area.x.saturating_add(1),
            y: map_area.y.saturating_add(1),
            width: map_area.width.saturating_sub(2),
            height: map_area.height.saturating_sub(2),
        }
    }

    fn sync_viewport_size(&mut self) {
        let inner = self.map_inner();
        // Braille gives 2x4 pixels per character cell.
        self.viewport.width = inner.width as usize * 2;
        self.viewport.height = inner.height as usize * 4;
    }

    pub fn resize(&mut self, width: u16, height: u16) {
        self.term_width = width;
        self.term_height = height;
        self.sync_viewport_size();
    }

    /// Terminal cell -> braille pixel within the map canvas, if the cell is
    /// over the map at all.
    pub fn map_pixel(&self, col: u16, row: u16) -> Option<(i32, i32)> {
        let inner = self.map_inner();
        if col < inner.x
            || row < inner.y
            || col >= inner.x + inner.width
            || row >= inner.y + inner.height
        {
            return None;
        }
        Some((
            ((col - inner.x) as i32) * 2,
            ((row - inner.y) as i32) * 4,
        ))
    }

    fn geo_at(&self, col: u16, row: u16) -> Option<(f64, f64)> {
        self.map_pixel(col, row)
            .map(|(px, py)| self.viewport.unproject(px, py))
    }

    // ---- queries ---------------------------------------------------------

    /// Build a payload from current state and hand it to the fetch thread.
    fn submit_search(&mut self, first_load: bool) {
        self.query_seq += 1;
        let request = build_request(&self.selections, &self.regions, first_load);
        log::debug!(
            "search #{}: {} industries, {} features, {} companies, {} regions",
            self.query_seq,
            request.selections.industries.len(),
            request.selections.features.len(),
            request.selections.companies.len(),
            request.search_regions.features.len(),
        );
        self.client.submit(Job::Search {
            seq: self.query_seq,
            request,
        });
    }

    /// Drain every fetch that completed since the last tick.
    pub fn poll_fetches(&mut self) {
        while let Some(event) = self.client.poll() {
            self.on_fetch(event);
        }
    }

    /// Apply one completed fetch. Failed searches change nothing; stale
    /// searches (overtaken by a newer submission) are dropped.
    pub fn on_fetch(&mut self, event: FetchEvent) {
        match event {
            FetchEvent::Search { seq, outcome } => {
                if seq < self.query_seq {
                    log::debug!("dropping stale search response #{seq} (newest is #{})", self.query_seq);
                    return;
                }
                match outcome {
                    Ok(response) => {
                        if let Some(facets) = response.facets {
                            if !self.panels_registered {
                                self.register_panels(&facets);
                                self.submit_search(false);
                            }
                        }
                        self.markers.replace_all(response.documents);
                    }
                    Err(_) => {
                        // Already logged by the fetch thread; rendered
                        // markers stay as they are.
                    }
                }
            }
            FetchEvent::LastUpdate(stamp) => self.last_updated = Some(stamp),
            FetchEvent::TotalCount(count) => self.total_count = Some(count),
        }
    }

    /// Create one checked-by-default panel per category from the facet
    /// summary, seeding the selection sets.
    fn register_panels(&mut self, facets: &FacetSummary) {
        self.panels = FilterCategory::ALL
            .iter()
            .map(|&category| {
                let counts = match category {
                    FilterCategory::Industry => &facets.industry,
                    FilterCategory::Feature => &facets.feature,
                    FilterCategory::Company => &facets.company,
                };
                FilterPanel::register_options(category, counts, &mut self.selections)
            })
            .collect();
        self.panels_registered = true;
        self.sidebar_cursor = 0;
    }

    // ---- sidebar ---------------------------------------------------------

    /// Total cursor rows: one master row plus one per option, per panel.
    pub fn sidebar_rows(&self) -> usize {
        self.panels.iter().map(|p| p.len() + 1).sum()
    }

    /// Resolve the cursor to (panel index, row-within-panel). Row 0 is the
    /// panel's select-all master.
    pub fn sidebar_target(&self, cursor: usize) -> Option<(usize, usize)> {
        let mut remaining = cursor;
        for (idx, panel) in self.panels.iter().enumerate() {
            let rows = panel.len() + 1;
            if remaining < rows {
                return Some((idx, remaining));
            }
            remaining -= rows;
        }
        None
    }

    pub fn sidebar_up(&mut self) {
        self.sidebar_cursor = self.sidebar_cursor.saturating_sub(1);
    }

    pub fn sidebar_down(&mut self) {
        let rows = self.sidebar_rows();
        if rows > 0 && self.sidebar_cursor + 1 < rows {
            self.sidebar_cursor += 1;
        }
    }

    /// Toggle the checkbox under the sidebar cursor and re-query.
    pub fn toggle_at_cursor(&mut self) {
        let Some((panel_idx, row)) = self.sidebar_target(self.sidebar_cursor) else {
            return;
        };
        let panel = &mut self.panels[panel_idx];
        if row == 0 {
            let turn_on = !panel.select_all;
            panel.set_all(turn_on, &mut self.selections);
        } else {
            panel.toggle_option(row - 1, &mut self.selections);
        }
        self.submit_search(false);
    }

    // ---- map input -------------------------------------------------------

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Map => Focus::Sidebar,
            Focus::Sidebar => Focus::Map,
        };
    }

    pub fn toggle_draw_mode(&mut self) {
        self.draw = match self.draw {
            DrawTool::Inactive => DrawTool::Ready,
            _ => DrawTool::Inactive,
        };
    }

    pub fn toggle_labels(&mut self) {
        self.show_labels = !self.show_labels;
    }

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.map_pixel(col, row) {
            self.viewport.zoom_in_at(px, py);
        }
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if let Some((px, py)) = self.map_pixel(col, row) {
            self.viewport.zoom_out_at(px, py);
        }
    }

    /// Escape: close the popup first, then leave draw mode.
    pub fn dismiss(&mut self) {
        if self.popup.is_some() {
            self.popup = None;
        } else if !matches!(self.draw, DrawTool::Inactive) {
            self.draw = DrawTool::Inactive;
        }
    }

    /// Reset control: drop all drawn regions, restore every checkbox to
    /// checked, and re-query.
    pub fn reset(&mut self) {
        self.regions.clear();
        for panel in &mut self.panels {
            panel.set_all(true, &mut self.selections);
        }
        self.popup = None;
        self.submit_search(false);
    }

    /// Delete the drawn region under the mouse cursor, if any.
    pub fn delete_region_at_cursor(&mut self) {
        let Some((col, row)) = self.mouse_pos else {
            return;
        };
        let Some((lon, lat)) = self.geo_at(col, row) else {
            return;
        };
        if self.regions.remove_at(lon, lat) {
            self.submit_search(false);
        }
    }

    pub fn clear_regions(&mut self) {
        if !self.regions.is_empty() {
            self.regions.clear();
            self.submit_search(false);
        }
    }

    // ---- mouse -----------------------------------------------------------

    pub fn mouse_moved(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
    }

    pub fn mouse_down(&mut self, col: u16, row: u16) {
        self.press = Some((col, row));
        self.press_dragged = false;
        self.last_mouse = Some((col, row));

        if let DrawTool::Ready = self.draw {
            if let Some((lon, lat)) = self.geo_at(col, row) {
                self.draw = match self.regions.region_at(lon, lat) {
                    Some(id) => DrawTool::MovingRegion { id, last: (lon, lat) },
                    None => DrawTool::Drafting {
                        start: (lon, lat),
                        current: (lon, lat),
                    },
                };
            }
        }
    }

    pub fn mouse_drag(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));
        self.press_dragged = true;

        let geo = self.geo_at(col, row);
        match &mut self.draw {
            DrawTool::Drafting { current, .. } => {
                if let Some(point) = geo {
                    *current = point;
                }
                return;
            }
            DrawTool::MovingRegion { id, last } => {
                if let Some((lon, lat)) = geo {
                    let (dlon, dlat) = (lon - last.0, lat - last.1);
                    let id = *id;
                    *last = (lon, lat);
                    self.regions.translate(id, dlon, dlat);
                }
                return;
            }
            _ => {}
        }

        // Plain drag pans, less sensitively when zoomed out.
        if let Some((last_col, last_row)) = self.last_mouse {
            let scale = if self.viewport.zoom < 2.0 {
                2
            } else if self.viewport.zoom < 4.0 {
                3
            } else {
                4
            };
            let dx = (last_col as i32 - col as i32) * scale;
            let dy = (last_row as i32 - row as i32) * scale;
            self.pan(dx, dy);
        }
        self.last_mouse = Some((col, row));
    }

    pub fn mouse_up(&mut self, col: u16, row: u16) {
        self.last_mouse = None;
        let was_click = !self.press_dragged && self.press == Some((col, row));
        self.press = None;

        match std::mem::replace(&mut self.draw, DrawTool::Inactive) {
            DrawTool::Drafting { start, current } => {
                self.draw = DrawTool::Ready;
                // A click without movement draws nothing.
                if start != current {
                    self.regions.add_rect(start, current);
                    self.submit_search(false);
                }
            }
            DrawTool::MovingRegion { .. } => {
                self.draw = DrawTool::Ready;
                self.submit_search(false);
            }
            tool => {
                self.draw = tool;
                if was_click {
                    self.open_popup_at(col, row);
                }
            }
        }
    }

    /// Click on the map: find the nearest marker within a few cells and show
    /// its details.
    fn open_popup_at(&mut self, col: u16, row: u16) {
        let Some((lon, lat)) = self.geo_at(col, row) else {
            return;
        };
        // Click tolerance of ~8 canvas pixels, converted to degrees.
        let radius_deg = 8.0 * 360.0 / (self.viewport.zoom * self.viewport.width.max(1) as f64);
        if let Some(marker) = self.markers.nearest_within(lon, lat, radius_deg) {
            self.popup = Some(Popup {
                title: display_name(&marker.details),
                lines: popup_lines(&marker.details),
            });
        } else {
            self.popup = None;
        }
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    // ---- status ----------------------------------------------------------

    pub fn draw_mode_active(&self) -> bool {
        !matches!(self.draw, DrawTool::Inactive)
    }

    pub fn draft_rect(&self) -> Option<((f64, f64), (f64, f64))> {
        match self.draw {
            DrawTool::Drafting { start, current } => Some((start, current)),
            _ => None,
        }
    }

    pub fn count_line(&self) -> String {
        match self.total_count {
            Some(total) => format!("{} of {} users", self.markers.len(), total),
            None => format!("{} users", self.markers.len()),
        }
    }

    pub fn center_coords(&self) -> String {
        format!(
            "{:.1}°{}, {:.1}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{PointDocument, PointGeometry, SearchResponse, UserDetails};

    fn test_app() -> App {
        // Points at a closed port; jobs fail in the worker, which is fine —
        // these tests drive on_fetch directly.
        let client = SearchClient::spawn("http://127.0.0.1:9".into()).unwrap();
        App::new(client, Basemap::new(), None, None, 120, 40)
    }

    fn facet_response() -> SearchResponse {
        let mut facets = FacetSummary::default();
        facets.industry.insert("Finance".into(), 3);
        facets.industry.insert("Tech".into(), 5);
        facets.feature.insert("Geospatial".into(), 2);
        facets.company.insert("Acme".into(), 1);
        SearchResponse {
            facets: Some(facets),
            documents: Vec::new(),
        }
    }

    fn documents_response(names: &[&str]) -> SearchResponse {
        SearchResponse {
            facets: None,
            documents: names
                .iter()
                .enumerate()
                .map(|(i, name)| PointDocument {
                    geometry: Some(PointGeometry {
                        coordinates: vec![i as f64, i as f64],
                    }),
                    full_details: UserDetails {
                        firstname: Some(name.to_string()),
                        ..UserDetails::default()
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn first_load_registers_panels_and_requeries() {
        let mut app = test_app();
        app.start();
        assert_eq!(app.query_seq, 1);

        app.on_fetch(FetchEvent::Search {
            seq: 1,
            outcome: Ok(facet_response()),
        });

        assert_eq!(app.panels.len(), 3);
        assert_eq!(app.selections.industries.len(), 2);
        assert_eq!(app.selections.features.len(), 1);
        // Registration triggers the follow-up document search.
        assert_eq!(app.query_seq, 2);
    }

    #[test]
    fn stale_search_responses_are_dropped() {
        let mut app = test_app();
        app.start();
        app.on_fetch(FetchEvent::Search {
            seq: 1,
            outcome: Ok(facet_response()),
        }); // query_seq is now 2

        app.on_fetch(FetchEvent::Search {
            seq: 2,
            outcome: Ok(documents_response(&["current"])),
        });
        assert_eq!(app.markers.len(), 1);

        // A slow response from an older submission must not clobber the map.
        app.on_fetch(FetchEvent::Search {
            seq: 1,
            outcome: Ok(documents_response(&["stale", "stale2"])),
        });
        assert_eq!(app.markers.len(), 1);
    }

    #[test]
    fn failed_search_leaves_markers_untouched() {
        let mut app = test_app();
        app.start();
        app.on_fetch(FetchEvent::Search {
            seq: 1,
            outcome: Ok(documents_response(&["kept"])),
        });
        assert_eq!(app.markers.len(), 1);

        app.query_seq = 2;
        app.on_fetch(FetchEvent::Search {
            seq: 2,
            outcome: Err(anyhow::anyhow!("boom")),
        });
        assert_eq!(app.markers.len(), 1);
    }

    #[test]
    fn sidebar_cursor_maps_to_panel_rows() {
        let mut app = test_app();
        app.on_fetch(FetchEvent::Search {
            seq: 0,
            outcome: Ok(facet_response()),
        });

        // Panels are ordered Industry (2 options), Feature (1), Company (1).
        assert_eq!(app.sidebar_rows(), 3 + 2 + 2);
        assert_eq!(app.sidebar_target(0), Some((0, 0))); // Industry master
        assert_eq!(app.sidebar_target(2), Some((0, 2))); // Tech
        assert_eq!(app.sidebar_target(3), Some((1, 0))); // Feature master
        assert_eq!(app.sidebar_target(6), Some((2, 1))); // Acme
        assert_eq!(app.sidebar_target(7), None);
    }

    #[test]
    fn toggling_master_at_cursor_clears_category() {
        let mut app = test_app();
        app.on_fetch(FetchEvent::Search {
            seq: 0,
            outcome: Ok(facet_response()),
        });
        let seq_before = app.query_seq;

        app.sidebar_cursor = 0; // Industry master, currently on
        app.toggle_at_cursor();
        assert!(app.selections.industries.is_empty());
        assert_eq!(app.query_seq, seq_before + 1);

        app.toggle_at_cursor();
        assert_eq!(app.selections.industries.len(), 2);
    }

    #[test]
    fn reset_restores_all_checkboxes_and_drops_regions() {
        let mut app = test_app();
        app.on_fetch(FetchEvent::Search {
            seq: 0,
            outcome: Ok(facet_response()),
        });

        app.sidebar_cursor = 1; // Finance
        app.toggle_at_cursor();
        app.regions.add_rect((0.0, 0.0), (10.0, 10.0));

        app.reset();
        assert!(app.regions.is_empty());
        assert_eq!(app.selections.industries.len(), 2);
        assert!(app.panels.iter().all(|p| p.select_all));
    }
}
