use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Widget},
    Frame,
};

use crate::app::{App, Focus};
use crate::braille::BrailleCanvas;
use crate::map::{render_scene, MapLayers, Scene};

/// Render one frame: sidebar, map, status bar, and the popup overlay when a
/// marker is open.
pub fn render(frame: &mut Frame, app: &App) {
    let (sidebar_area, map_area, status_area) = app.layout(frame.area());

    render_sidebar(frame, app, sidebar_area);
    render_map(frame, app, map_area);
    render_status_bar(frame, app, status_area);

    if let Some(popup) = &app.popup {
        render_popup(frame, map_area, &popup.title, &popup.lines);
    }
}

fn render_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Sidebar;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(Span::styled(
            " Filters ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if app.panels.is_empty() {
        frame.render_widget(
            Paragraph::new("Loading facets…").style(Style::default().fg(Color::DarkGray)),
            inner,
        );
        return;
    }

    // Flatten panels into display rows, tracking which one the cursor is on.
    let mut lines: Vec<Line> = Vec::new();
    let mut cursor_line = 0usize;
    let mut row = 0usize;
    for panel in &app.panels {
        let on_cursor = focused && row == app.sidebar_cursor;
        if on_cursor {
            cursor_line = lines.len();
        }
        lines.push(master_row(panel.category.title(), panel.select_all, on_cursor));
        row += 1;

        for opt in &panel.options {
            let on_cursor = focused && row == app.sidebar_cursor;
            if on_cursor {
                cursor_line = lines.len();
            }
            lines.push(option_row(&opt.value, opt.count, opt.checked, on_cursor));
            row += 1;
        }
        lines.push(Line::default());
    }

    // Keep the cursor row in view.
    let visible = inner.height as usize;
    let scroll = cursor_line.saturating_sub(visible.saturating_sub(1).max(1) / 2).min(
        lines.len().saturating_sub(visible),
    );
    frame.render_widget(
        Paragraph::new(lines).scroll((scroll as u16, 0)),
        inner,
    );
}

fn checkbox(checked: bool) -> &'static str {
    if checked {
        "[x] "
    } else {
        "[ ] "
    }
}

fn master_row(title: &str, checked: bool, on_cursor: bool) -> Line<'static> {
    let style = if on_cursor {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else {
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
    };
    Line::from(Span::styled(format!("{}{}", checkbox(checked), title), style))
}

fn option_row(value: &str, count: Option<u64>, checked: bool, on_cursor: bool) -> Line<'static> {
    let style = if on_cursor {
        Style::default().fg(Color::Black).bg(Color::Cyan)
    } else if checked {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let text = match count {
        Some(count) => format!("  {}{} ({count})", checkbox(checked), value),
        None => format!("  {}{}", checkbox(checked), value),
    };
    Line::from(Span::styled(text, style))
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Map;
    let title = if app.draw_mode_active() {
        " Map — draw mode "
    } else {
        " Map "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut viewport = app.viewport.clone();
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let scene = Scene {
        basemap: &app.basemap,
        markers: &app.markers,
        regions: &app.regions,
        draft_rect: app.draft_rect(),
        show_labels: app.show_labels,
    };
    let layers = render_scene(&scene, inner.width as usize, inner.height as usize, &viewport);

    let cursor_pos = app.mouse_pos.and_then(|(col, row)| {
        app.map_pixel(col, row)
            .map(|(px, py)| ((px / 2) as u16, (py / 4) as u16))
    });

    frame.render_widget(
        MapWidget {
            layers,
            cursor_pos,
            draw_mode: app.draw_mode_active(),
        },
        inner,
    );
}

/// Layered braille widget: basemap below, regions and markers above, then
/// labels and the mouse cursor.
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
    draw_mode: bool,
}

impl MapWidget {
    fn blit(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (row_idx, row) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;
            for (col_idx, ch) in row.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Blank braille cells stay transparent.
                if ch == '\u{2800}' {
                    continue;
                }
                buf[(area.x + col_idx as u16, y)].set_char(ch).set_fg(color);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        Self::blit(&self.layers.basemap, Color::DarkGray, area, buf);
        Self::blit(&self.layers.regions, Color::Yellow, area, buf);
        Self::blit(&self.layers.markers, Color::Red, area, buf);

        let label_style = Style::default().fg(Color::White);
        for (lx, ly, text) in &self.layers.labels {
            if *lx >= area.width || *ly >= area.height {
                continue;
            }
            let y = area.y + *ly;
            let max_len = (area.width - *lx) as usize;
            for (i, ch) in text.chars().take(max_len.min(24)).enumerate() {
                buf[(area.x + *lx + i as u16, y)].set_char(ch).set_style(label_style);
            }
        }

        if let Some((cx, cy)) = self.cursor_pos {
            if cx < area.width && cy < area.height {
                let color = if self.draw_mode { Color::Yellow } else { Color::Red };
                buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(color);
            }
        }
    }
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" ", Style::default()),
        Span::styled(app.count_line(), Style::default().fg(Color::Green)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{:.1}x", app.viewport.zoom),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled(" @ ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
    ];
    if app.regions.len() > 0 {
        spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(
            format!("{} region(s)", app.regions.len()),
            Style::default().fg(Color::Yellow),
        ));
    }
    if let Some(updated) = &app.last_updated {
        spans.push(Span::styled(" | updated ", Style::default().fg(Color::DarkGray)));
        spans.push(Span::styled(updated.clone(), Style::default().fg(Color::DarkGray)));
    }
    spans.push(Span::styled(
        " | tab:focus space:toggle d:draw x:del r:reset q:quit",
        Style::default().fg(Color::DarkGray),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Centered detail popup over the map area.
fn render_popup(frame: &mut Frame, map_area: Rect, title: &str, lines: &[String]) {
    let width = lines
        .iter()
        .map(|l| l.chars().count())
        .chain([title.chars().count() + 2, 24])
        .max()
        .unwrap_or(24) as u16
        + 4;
    let height = lines.len() as u16 + 2;
    let width = width.min(map_area.width);
    let height = height.min(map_area.height);

    let popup_area = Rect {
        x: map_area.x + (map_area.width.saturating_sub(width)) / 2,
        y: map_area.y + (map_area.height.saturating_sub(height)) / 2,
        width,
        height,
    };

    let text: Vec<Line> = lines.iter().map(|l| Line::from(l.clone())).collect();
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
        ));

    frame.render_widget(Clear, popup_area);
    frame.render_widget(Paragraph::new(text).block(block), popup_area);
}
