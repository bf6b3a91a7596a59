pub mod components;

pub mod invoices;
pub mod invoice_wizard;
pub mod client_picker;
pub mod product_picker;
pub mod clients;
pub mod client_wizard;
pub mod catalog;

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEvent};
use tui::layout::{Constraint, Direction, Layout, Rect};

/// Wait up to one tick for a key press. A `None` return is the tick itself:
/// screens use it to expire toasts and fire debounced searches.
pub fn poll_key() -> Result<Option<KeyEvent>> {
    if event::poll(Duration::from_millis(100))? {
        if let Event::Key(key) = event::read()? {
            return Ok(Some(key));
        }
    }
    Ok(None)
}

/// Centered popup rect, sized as a percentage of the surrounding area.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
