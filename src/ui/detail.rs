//! Detail overlay rendering.
//!
//! Displays a modal overlay with the selected service's latest record and
//! its analytics over the history window.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::app::App;
use crate::timeutil::{iso_date, local_clock};
use crate::ui::format::{format_change, format_uptime, format_value, value_sparkline};

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 14;

/// Render the selected service as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }
    let Some(view) = app.selected_view() else {
        return;
    };
    let service = &view.service;
    let digest = &view.digest;

    let overlay_width = (area.width * 90 / 100).clamp(MIN_OVERLAY_WIDTH, 100);
    let overlay_height = (area.height * 80 / 100).clamp(MIN_OVERLAY_HEIGHT, 30);
    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([
        Constraint::Length(4), // Name, kind and status
        Constraint::Min(6),    // Record and analytics
        Constraint::Length(1), // Footer
    ])
    .split(overlay_area);

    let status = view.status();
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let header = vec![
        Line::from(Span::styled(format!(" {} ", service.name), bold)),
        Line::from(vec![
            Span::raw(format!(" {} · {} · ", service.kind.tag(), view.group)),
            Span::styled(status.key(), app.theme.status_style(status)),
        ]),
    ];
    frame.render_widget(
        Paragraph::new(header).block(
            Block::default()
                .borders(Borders::TOP | Borders::LEFT | Borders::RIGHT)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.highlight)),
        ),
        chunks[0],
    );

    let field = |label: &str, value: String| {
        Line::from(vec![Span::raw(format!(" {label:<10} ")), Span::styled(value, bold)])
    };
    let mut lines = Vec::new();
    match &digest.latest {
        Some(latest) => {
            lines.push(field("Message", latest.message.clone()));
            lines.push(field(
                "Polled",
                format!("{} {}", iso_date(latest.timestamp), local_clock(latest.timestamp)),
            ));
            if let Some(ms) = latest.latency_ms {
                lines.push(field("Latency", format!("{ms} ms")));
            }
            if let Some(value) = latest.value {
                lines.push(field("Reading", format_value(service, value, app.now)));
            }
        }
        None => lines.push(field("Message", "no polls recorded yet".to_string())),
    }

    lines.push(Line::from(""));
    lines.push(field(
        "Window",
        format!("{}h, {} samples", app.history_hours, digest.samples),
    ));
    if service.kind.is_metric() {
        if let Some(change) = digest.change {
            lines.push(field("Change", format_change(service, &change).0));
        }
        if let Some(range) = digest.range {
            lines.push(field(
                "Range",
                format!(
                    "{} .. {}",
                    format_value(service, range.low, app.now),
                    format_value(service, range.high, app.now)
                ),
            ));
        }
        lines.push(field("Trend", value_sparkline(&digest.value_trend)));
    } else {
        lines.push(field("Uptime", format_uptime(digest.uptime, digest.episodes)));
        lines.push(field("Episodes", digest.episodes.to_string()));
    }

    frame.render_widget(
        Paragraph::new(lines).wrap(Wrap { trim: false }).block(
            Block::default()
                .borders(Borders::LEFT | Borders::RIGHT | Borders::BOTTOM)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.highlight)),
        ),
        chunks[1],
    );

    frame.render_widget(
        Paragraph::new(" ↑/↓:next service  Esc:close")
            .style(Style::default().add_modifier(Modifier::DIM)),
        chunks[2],
    );
}
