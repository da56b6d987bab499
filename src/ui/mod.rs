//! Terminal rendering with ratatui.
//!
//! Layout, top to bottom: header, board, incidents footer, status bar.
//! Help and service detail draw as overlays on top.

pub mod board;
pub mod common;
pub mod detail;
pub mod format;
pub mod theme;

pub use theme::Theme;

use ratatui::{
    layout::{Alignment, Constraint, Layout, Rect},
    style::Style,
    widgets::Paragraph,
    Frame,
};

use crate::app::App;

/// Minimum terminal size for a usable display.
pub const MIN_WIDTH: u16 = 60;
pub const MIN_HEIGHT: u16 = 14;

/// Draw one frame of the dashboard.
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
        let msg = format!(
            "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
            area.width, area.height, MIN_WIDTH, MIN_HEIGHT
        );
        let paragraph = Paragraph::new(msg)
            .alignment(Alignment::Center)
            .style(Style::default().fg(app.theme.degraded));
        let centered = Rect::new(0, (area.height / 2).saturating_sub(2), area.width, 5u16.min(area.height));
        frame.render_widget(paragraph, centered);
        return;
    }

    let footer_height = common::FOOTER_INCIDENTS as u16 + 2;
    let chunks = Layout::vertical([
        Constraint::Length(2),             // Header and counts
        Constraint::Min(6),                // Board
        Constraint::Length(footer_height), // Incidents
        Constraint::Length(1),             // Status bar
    ])
    .split(area);

    common::render_header(frame, app, chunks[0]);
    board::render(frame, app, chunks[1]);
    common::render_footer(frame, app, chunks[2]);
    common::render_status_bar(frame, app, chunks[3]);

    if app.show_detail_overlay {
        detail::render_overlay(frame, app, area);
    }
    if app.show_help {
        common::render_help(frame, app, area);
    }
}
