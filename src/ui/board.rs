//! Board rendering: one grouped table of every service.
//!
//! Health rows show a status chip, uptime, an uptime gauge and a severity
//! sparkline. Metric rows show the formatted reading, its change over the
//! window, where it sits in the window's range and a value sparkline.

use ratatui::{
    layout::{Constraint, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::app::{App, DisplayRow, ServiceView};
use crate::ui::format::{
    format_change, format_uptime, format_value, range_gauge, severity_cell, status_chip,
    uptime_gauge, uptime_level, value_sparkline, GAUGE_WIDTH,
};

/// Render the board showing all visible services grouped.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let display_rows = app.display_rows();
    let selected_id = app.selected_view().map(|v| v.service.id.as_str());

    let mut selected_row = None;
    let rows: Vec<Row> = display_rows
        .iter()
        .enumerate()
        .map(|(i, row)| match row {
            DisplayRow::Group(group) => group_row(app, group),
            DisplayRow::Service(view) => {
                if Some(view.service.id.as_str()) == selected_id {
                    selected_row = Some(i);
                }
                if view.service.kind.is_metric() {
                    metric_row(app, view)
                } else {
                    health_row(app, view)
                }
            }
        })
        .collect();

    let header = Row::new(vec![
        Cell::from("Item"),
        Cell::from("Now"),
        Cell::from(format!("{}h", app.history_hours)),
        Cell::from("Gauge"),
        Cell::from("Trend"),
    ])
    .style(app.theme.header);

    let trend_width = u16::try_from(app.trend_buckets).unwrap_or(u16::MAX);
    let widths = [
        Constraint::Fill(1),
        Constraint::Length(14),
        Constraint::Length(9),
        Constraint::Length(GAUGE_WIDTH as u16),
        Constraint::Length(trend_width),
    ];

    let visible = app.visible().len();
    let filter_info = if app.filter_active {
        format!(" /{}_", app.filter_text)
    } else if !app.filter_text.is_empty() {
        format!(" /{}/ [c:clear]", app.filter_text)
    } else {
        String::new()
    };
    let position_info = if visible > 0 {
        format!(" [{}/{}]", app.selected_index + 1, visible)
    } else {
        String::new()
    };
    let title = format!(
        " Services ({}/{}){}{} ",
        visible,
        app.views.len(),
        filter_info,
        position_info
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(selected_row);

    frame.render_stateful_widget(table, area, &mut state);
}

fn group_row(app: &App, group: &str) -> Row<'static> {
    Row::new(vec![Cell::from(format!("╞═ {group}"))]).style(app.theme.group)
}

fn health_row(app: &App, view: &ServiceView) -> Row<'static> {
    let theme = &app.theme;
    let digest = &view.digest;
    let status = view.status();
    let latency = digest.latest.as_ref().and_then(|r| r.latency_ms);

    let uptime_style = Style::default().fg(theme.status_color(uptime_level(digest.uptime)));
    let trend: Vec<Span> = digest
        .severity_trend
        .iter()
        .map(|s| {
            let (ch, level) = severity_cell(*s);
            Span::styled(ch.to_string(), Style::default().fg(theme.status_color(level)))
        })
        .collect();

    Row::new(vec![
        Cell::from(view.service.name.clone()),
        Cell::from(status_chip(status, latency)).style(theme.status_style(status)),
        Cell::from(format_uptime(digest.uptime, digest.episodes)).style(theme.status_style(status)),
        Cell::from(uptime_gauge(digest.uptime, GAUGE_WIDTH)).style(uptime_style),
        Cell::from(Line::from(trend)),
    ])
}

fn metric_row(app: &App, view: &ServiceView) -> Row<'static> {
    let theme = &app.theme;
    let digest = &view.digest;
    let service = &view.service;

    let change = digest.change.map(|c| format_change(service, &c));
    let style = theme.trend_style(change.as_ref().map(|(_, d)| *d));
    let change_text = change.map_or_else(|| "—".to_string(), |(text, _)| text);

    let dim = Style::default().add_modifier(Modifier::DIM);
    let (now, gauge, trend) = match digest.current_value() {
        Some(value) => {
            let gauge = match digest.range {
                Some(range) if !service.kind.is_date_clock() => range_gauge(value, &range, GAUGE_WIDTH),
                _ => String::new(),
            };
            (
                Cell::from(format_value(service, value, app.now)).style(style),
                Cell::from(gauge).style(style),
                Cell::from(value_sparkline(&digest.value_trend)).style(style),
            )
        }
        None => (
            Cell::from("…").style(dim),
            Cell::from(""),
            Cell::from("·".repeat(digest.value_trend.len())).style(dim),
        ),
    };

    Row::new(vec![
        Cell::from(service.name.clone()),
        now,
        Cell::from(change_text).style(style),
        gauge,
        trend,
    ])
}
