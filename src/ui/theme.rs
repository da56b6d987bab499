//! Theme configuration for the TUI.
//!
//! Supports light and dark themes with automatic terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use servicedash_types::Status;

use crate::analytics::Direction;

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] for automatic theme selection based on
/// terminal background, or [`Theme::dark()`]/[`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent color for titles and active elements.
    pub highlight: Color,
    /// Operational services and rising readings.
    pub operational: Color,
    /// Degraded services and flat readings.
    pub degraded: Color,
    /// Outages and falling readings.
    pub outage: Color,
    /// Services without a usable reading.
    pub unknown: Color,
    /// Color for borders and separators.
    pub border: Color,
    /// Style for table header rows.
    pub header: Style,
    /// Style for group title rows.
    pub group: Style,
    /// Style for the selected row.
    pub selected: Style,
    /// Border style (rounded, plain, etc.).
    pub border_type: BorderType,
}

impl Theme {
    /// Create a dark theme suitable for dark terminal backgrounds.
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            operational: Color::Green,
            degraded: Color::Yellow,
            outage: Color::Red,
            unknown: Color::Gray,
            border: Color::Gray,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            group: Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Create a light theme suitable for light terminal backgrounds.
    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            operational: Color::Green,
            degraded: Color::Yellow,
            outage: Color::Red,
            unknown: Color::DarkGray,
            border: Color::DarkGray,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            group: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            border_type: BorderType::Rounded,
        }
    }

    /// Auto-detect based on terminal background
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn status_color(&self, status: Status) -> Color {
        match status {
            Status::Operational => self.operational,
            Status::Degraded => self.degraded,
            Status::Outage => self.outage,
            Status::Unknown => self.unknown,
        }
    }

    /// Get style for a service status
    pub fn status_style(&self, status: Status) -> Style {
        let style = Style::default().fg(self.status_color(status));
        match status {
            Status::Outage => style.add_modifier(Modifier::BOLD),
            Status::Unknown => style.add_modifier(Modifier::DIM),
            _ => style,
        }
    }

    /// Style for a reading moving in `direction`; `None` when unknown.
    pub fn trend_style(&self, direction: Option<Direction>) -> Style {
        match direction {
            Some(Direction::Up) => Style::default().fg(self.operational),
            Some(Direction::Down) => Style::default().fg(self.outage),
            Some(Direction::Flat) => Style::default().fg(self.degraded),
            None => Style::default().fg(self.unknown),
        }
    }
}
