//! Common UI components shared across views.
//!
//! This module contains the header, the incidents footer, the status bar,
//! and the help overlay.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use servicedash_types::Status;

use crate::app::App;
use crate::timeutil::local_clock;
use crate::ui::format::truncate;

/// Incidents listed in the footer.
pub const FOOTER_INCIDENTS: usize = 3;

/// Render the two header lines: title and poll time, then headline counts.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let services = app.service_counts();

    let overall = if services.outage > 0 {
        Status::Outage
    } else if services.degraded > 0 {
        Status::Degraded
    } else if services.unknown > 0 {
        Status::Unknown
    } else {
        Status::Operational
    };

    let last_poll = app.last_poll.map_or_else(|| "—".to_string(), local_clock);
    let mut title = vec![
        Span::styled(" ● ", theme.status_style(overall)),
        Span::styled("SERVICEDASH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ now "),
        Span::raw(local_clock(app.now)),
        Span::raw(" │ poll "),
        Span::styled(last_poll, Style::default().add_modifier(Modifier::BOLD)),
    ];
    if app.is_stale() {
        title.push(Span::raw(" "));
        title.push(Span::styled(
            "STALE",
            Style::default().fg(theme.outage).add_modifier(Modifier::BOLD),
        ));
    }

    let dim = Style::default().add_modifier(Modifier::DIM);
    let markets = app.market_counts();
    let mut counts = vec![
        Span::styled(" SVC ", dim),
        Span::styled(format!("OK{}", services.operational), Style::default().fg(theme.operational)),
        Span::raw(" "),
        Span::styled(format!("DG{}", services.degraded), Style::default().fg(theme.degraded)),
        Span::raw(" "),
        Span::styled(format!("DN{}", services.outage), Style::default().fg(theme.outage)),
        Span::raw(" "),
        Span::styled(format!("?{}", services.unknown), dim),
        Span::styled("  MKT ", dim),
        Span::styled(format!("▲{}", markets.up), Style::default().fg(theme.operational)),
        Span::raw(" "),
        Span::styled(format!("▼{}", markets.down), Style::default().fg(theme.outage)),
        Span::raw(" "),
        Span::styled(format!("={}", markets.flat), Style::default().fg(theme.degraded)),
    ];
    if markets.unknown > 0 {
        counts.push(Span::raw(" "));
        counts.push(Span::styled(format!("?{}", markets.unknown), dim));
    }

    frame.render_widget(Paragraph::new(vec![Line::from(title), Line::from(counts)]), area);
}

/// Render the footer: the worst non-operational services, or an all-clear.
pub fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
    let width = usize::from(area.width.saturating_sub(4));
    let mut lines = vec![Line::from(Span::styled(
        " Incidents / Notes (non-OK):",
        Style::default().add_modifier(Modifier::BOLD),
    ))];

    let incidents = app.incidents();
    if incidents.is_empty() {
        lines.push(Line::from(Span::styled(
            " - All tracked services look operational.",
            Style::default().fg(app.theme.operational),
        )));
    }
    for view in incidents.into_iter().take(FOOTER_INCIDENTS) {
        let message = view
            .digest
            .latest
            .as_ref()
            .map(|r| r.message.as_str())
            .unwrap_or_default();
        lines.push(Line::from(Span::styled(
            format!(" - {}", truncate(&format!("{}: {message}", view.service.name), width)),
            app.theme.status_style(view.status()),
        )));
    }

    let block = Block::default()
        .borders(Borders::TOP)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Render the status bar at the bottom.
///
/// Shows temporary messages first, then load errors, then the controls.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {msg} ")).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let status = if let Some(ref err) = app.load_error {
        format!(" Error: {err} | r:poll q:quit")
    } else if app.filter_active {
        format!(" Filter: {}_ | Enter:apply Esc:cancel", app.filter_text)
    } else {
        let controls = "r:poll /:search Enter:detail ?:help q:quit";
        format!(
            " {} services | every {}s | {controls}",
            app.views.len(),
            app.poll_interval.as_secs()
        )
    };

    let paragraph = Paragraph::new(status).style(Style::default().add_modifier(Modifier::DIM));
    frame.render_widget(paragraph, area);
}

/// Render the help overlay with keyboard shortcuts.
///
/// Displayed as a centered modal on top of the board.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(Span::styled(title, Style::default().add_modifier(Modifier::BOLD)))
    };
    let help_text = vec![
        Line::from(Span::styled("Keyboard Shortcuts", app.theme.header)),
        Line::from(""),
        section(" Navigation"),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  g/G         Jump to first/last"),
        Line::from("  Enter       Service detail"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        section(" Board"),
        Line::from("  /           Start filter/search"),
        Line::from("  c           Clear filter"),
        Line::from(""),
        section(" General"),
        Line::from("  r           Poll now"),
        Line::from("  e           Export to JSON"),
        Line::from("  q Ctrl-C    Quit"),
        Line::from(""),
        Line::from(Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let help_width = 42u16.min(area.width.saturating_sub(4));
    let help_height = 22u16.min(area.height.saturating_sub(2));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(Paragraph::new(help_text).block(block), help_area);
}
