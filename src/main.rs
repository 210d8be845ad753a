mod app;
mod basemap;
mod braille;
mod client;
mod map;
mod markers;
mod panel;
mod protocol;
mod regions;
mod selection;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use app::{App, Focus};
use basemap::Basemap;
use clap::Parser;
use client::SearchClient;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use ratatui::DefaultTerminal;

/// Terminal map client for faceted geographic search over a user-record
/// population.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// Search service root, e.g. http://localhost:8040
    #[arg(long, default_value = "http://localhost:8040")]
    server: String,

    /// Directory with Natural Earth coastline GeoJSON for the basemap
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Lower bound of the date-range filter (sent as-is to the backend)
    #[arg(long)]
    date_from: Option<String>,

    /// Upper bound of the date-range filter
    #[arg(long)]
    date_to: Option<String>,
}

fn main() -> Result<()> {
    // Log to stderr; redirect it when running interactively
    // (RUST_LOG=debug facetmap 2>facetmap.log).
    env_logger::init();
    let cli = Cli::parse();

    let basemap = Basemap::load(&cli.data_dir);
    let client = SearchClient::spawn(cli.server.clone())?;

    let mut terminal = ratatui::init();
    terminal.clear()?;
    execute!(std::io::stdout(), EnableMouseCapture)?;

    let result = run(&mut terminal, client, basemap, cli);

    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();
    result
}

fn run(
    terminal: &mut DefaultTerminal,
    client: SearchClient,
    basemap: Basemap,
    cli: Cli,
) -> Result<()> {
    let size = terminal.size()?;
    let mut app = App::new(
        client,
        basemap,
        cli.date_from,
        cli.date_to,
        size.width,
        size.height,
    );
    app.start();

    loop {
        app.poll_fetches();

        terminal.draw(|frame| ui::render(frame, &app))?;

        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(key) => handle_key(&mut app, key),
                Event::Mouse(mouse) => handle_mouse(&mut app, mouse),
                Event::Resize(width, height) => app.resize(width, height),
                _ => {}
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

/// Keyboard handler. Global keys first, then per-focus bindings.
fn handle_key(app: &mut App, key: KeyEvent) {
    if key.kind != KeyEventKind::Press {
        return;
    }
    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Esc => app.dismiss(),
        KeyCode::Tab => app.toggle_focus(),
        _ => match app.focus {
            Focus::Sidebar => handle_sidebar_key(app, key.code),
            Focus::Map => handle_map_key(app, key.code),
        },
    }
}

fn handle_sidebar_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Up | KeyCode::Char('k') => app.sidebar_up(),
        KeyCode::Down | KeyCode::Char('j') => app.sidebar_down(),
        KeyCode::Char(' ') | KeyCode::Enter => app.toggle_at_cursor(),
        _ => {}
    }
}

fn handle_map_key(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Left | KeyCode::Char('h') => app.pan(-10, 0),
        KeyCode::Right | KeyCode::Char('l') => app.pan(10, 0),
        KeyCode::Up | KeyCode::Char('k') => app.pan(0, -6),
        KeyCode::Down | KeyCode::Char('j') => app.pan(0, 6),
        KeyCode::Char('+') | KeyCode::Char('=') => app.zoom_in(),
        KeyCode::Char('-') | KeyCode::Char('_') => app.zoom_out(),
        KeyCode::Char('d') => app.toggle_draw_mode(),
        KeyCode::Char('x') => app.delete_region_at_cursor(),
        KeyCode::Char('X') => app.clear_regions(),
        KeyCode::Char('L') => app.toggle_labels(),
        KeyCode::Char('r') => app.reset(),
        _ => {}
    }
}

/// Mouse handler: scroll zooms toward the pointer, left drag pans or draws
/// depending on the active tool, a plain click opens a marker popup.
fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::Moved => app.mouse_moved(mouse.column, mouse.row),
        MouseEventKind::ScrollUp => app.zoom_in_at(mouse.column, mouse.row),
        MouseEventKind::ScrollDown => app.zoom_out_at(mouse.column, mouse.row),
        MouseEventKind::Down(MouseButton::Left) => app.mouse_down(mouse.column, mouse.row),
        MouseEventKind::Drag(MouseButton::Left) => app.mouse_drag(mouse.column, mouse.row),
        MouseEventKind::Up(MouseButton::Left) => app.mouse_up(mouse.column, mouse.row),
        _ => {}
    }
}
