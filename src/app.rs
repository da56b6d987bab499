//! Application state and navigation logic for the display.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use servicedash_types::Status;

use crate::analytics::{Digest, Direction};
use crate::config::{AppConfig, ServiceRegistry};
use crate::export::ExportDocument;
use crate::source::{Family, Service};
use crate::store::{Store, StoreError};
use crate::timeutil::now_ts;
use crate::ui::Theme;

/// How long a status bar message stays up.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// One service as the board shows it: descriptor, group and digest.
#[derive(Debug, Clone)]
pub struct ServiceView {
    pub service: Arc<Service>,
    pub group: String,
    pub digest: Digest,
}

impl ServiceView {
    /// Read a service's latest record and history window from the store.
    pub async fn load(
        store: &Store,
        service: &Arc<Service>,
        now: i64,
        hours: u32,
        buckets: usize,
    ) -> Result<Self, StoreError> {
        let latest = store.latest(&service.id).await?;
        let history = store.history(&service.id, now - i64::from(hours) * 3600).await?;
        Ok(Self {
            service: Arc::clone(service),
            group: group_for(service),
            digest: Digest::derive(latest, &history, now, hours, buckets),
        })
    }

    pub fn status(&self) -> Status {
        self.digest
            .latest
            .as_ref()
            .map_or(Status::Unknown, |r| r.status)
    }
}

/// Load every service in board order: by group, then configuration order.
pub async fn load_views(
    store: &Store,
    services: &ServiceRegistry,
    now: i64,
    hours: u32,
    buckets: usize,
) -> Result<Vec<ServiceView>, StoreError> {
    let mut views = Vec::with_capacity(services.len());
    for service in services.services() {
        views.push(ServiceView::load(store, service, now, hours, buckets).await?);
    }
    views.sort_by_cached_key(|v| (group_order(&v.group), v.group.to_lowercase()));
    Ok(views)
}

/// The `group` setting, else the label of the kind's family.
pub fn group_for(service: &Service) -> String {
    match service.group() {
        Some(group) => group.to_string(),
        None => service.kind.family().label().to_string(),
    }
}

/// Sort rank of a group: health first, custom groups, markets, clocks last.
/// `Markets / <sub>` groups keep a fixed order among themselves.
pub fn group_order(group: &str) -> u32 {
    if group == Family::Status.label() {
        return 10;
    }
    if group == Family::Market.label() {
        return 59;
    }
    if group == Family::Clock.label() {
        return 90;
    }
    match group.strip_prefix("Markets / ") {
        Some(sub) => match sub.trim() {
            "Crypto" => 50,
            "FX" => 51,
            "Indices" => 52,
            "Commodities" => 53,
            "Equities" => 54,
            _ => 58,
        },
        None => 30,
    }
}

/// A line of the board: a group title or a service.
#[derive(Debug, Clone, Copy)]
pub enum DisplayRow<'a> {
    Group(&'a str),
    Service(&'a ServiceView),
}

/// Services per status, over health-reporting services only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub operational: usize,
    pub degraded: usize,
    pub outage: usize,
    pub unknown: usize,
}

/// Market readings by direction over the history window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketCounts {
    pub up: usize,
    pub down: usize,
    pub flat: usize,
    pub unknown: usize,
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub show_help: bool,
    pub show_detail_overlay: bool,

    services: ServiceRegistry,
    pub views: Vec<ServiceView>,
    pub last_poll: Option<i64>,
    /// Time of the last reload; analytics are relative to it.
    pub now: i64,
    pub load_error: Option<String>,
    pub poll_interval: Duration,
    pub history_hours: u32,
    pub trend_buckets: usize,

    // Navigation state
    pub selected_index: usize,

    // Search/filter
    pub filter_text: String,
    pub filter_active: bool,

    // UI
    pub theme: Theme,

    // Status message (temporary feedback)
    pub status_message: Option<(String, Instant)>,

    /// Set by the `r` key; the driver starts a round and clears it.
    pub poll_requested: bool,
}

impl App {
    pub fn new(config: &AppConfig, theme: Theme) -> Self {
        Self {
            running: true,
            show_help: false,
            show_detail_overlay: false,
            services: config.services.clone(),
            views: Vec::new(),
            last_poll: None,
            now: now_ts(),
            load_error: None,
            poll_interval: config.poll_interval,
            history_hours: config.history_hours,
            trend_buckets: config.trend_buckets,
            selected_index: 0,
            filter_text: String::new(),
            filter_active: false,
            theme,
            status_message: None,
            poll_requested: false,
        }
    }

    /// Re-read every service from the store.
    ///
    /// On failure the previous views stay on screen.
    pub async fn reload(&mut self, store: &Store) -> Result<(), StoreError> {
        let now = now_ts();
        let views = load_views(store, &self.services, now, self.history_hours, self.trend_buckets).await?;
        self.last_poll = store.last_round_timestamp().await?;
        self.views = views;
        self.now = now;
        self.load_error = None;
        self.clamp_selection();
        Ok(())
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, time)) if time.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    /// Whether the newest round is older than two poll intervals.
    pub fn is_stale(&self) -> bool {
        self.last_poll.is_some_and(|last| {
            let limit = i64::try_from(self.poll_interval.as_secs().saturating_mul(2)).unwrap_or(i64::MAX);
            self.now.saturating_sub(last) > limit
        })
    }

    /// Views matching the filter, in board order.
    pub fn visible(&self) -> Vec<&ServiceView> {
        self.views
            .iter()
            .filter(|v| self.matches_filter(&v.service.name))
            .collect()
    }

    /// Board lines: each group title followed by its services.
    pub fn display_rows(&self) -> Vec<DisplayRow<'_>> {
        let mut rows = Vec::new();
        let mut last_group: Option<&str> = None;
        for view in self.visible() {
            if last_group != Some(view.group.as_str()) {
                rows.push(DisplayRow::Group(&view.group));
                last_group = Some(view.group.as_str());
            }
            rows.push(DisplayRow::Service(view));
        }
        rows
    }

    pub fn selected_view(&self) -> Option<&ServiceView> {
        self.visible().get(self.selected_index).copied()
    }

    pub fn service_counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for view in self.views.iter().filter(|v| !v.service.kind.is_metric()) {
            match view.status() {
                Status::Operational => counts.operational += 1,
                Status::Degraded => counts.degraded += 1,
                Status::Outage => counts.outage += 1,
                Status::Unknown => counts.unknown += 1,
            }
        }
        counts
    }

    pub fn market_counts(&self) -> MarketCounts {
        let mut counts = MarketCounts::default();
        let markets = self
            .views
            .iter()
            .filter(|v| v.service.kind.family() == Family::Market);
        for view in markets {
            match view.digest.change.map(|c| c.direction()) {
                Some(Direction::Up) => counts.up += 1,
                Some(Direction::Down) => counts.down += 1,
                Some(Direction::Flat) => counts.flat += 1,
                None => counts.unknown += 1,
            }
        }
        counts
    }

    /// Services whose latest status is not operational, worst and most
    /// recent first.
    pub fn incidents(&self) -> Vec<&ServiceView> {
        let mut incidents: Vec<&ServiceView> = self
            .views
            .iter()
            .filter(|v| v.digest.latest.as_ref().is_some_and(|r| !r.is_operational()))
            .collect();
        incidents.sort_by_key(|v| {
            let latest = v.digest.latest.as_ref();
            std::cmp::Reverse((
                latest.map_or(0, |r| r.severity),
                latest.map_or(0, |r| r.timestamp),
            ))
        });
        incidents
    }

    /// Move selection down by one item.
    pub fn select_next(&mut self) {
        self.select_next_n(1);
    }

    /// Move selection up by one item.
    pub fn select_prev(&mut self) {
        self.select_prev_n(1);
    }

    /// Move selection down by n items.
    pub fn select_next_n(&mut self, n: usize) {
        let max = self.visible().len().saturating_sub(1);
        self.selected_index = (self.selected_index + n).min(max);
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        self.selected_index = self.selected_index.saturating_sub(n);
    }

    /// Jump to the first item in the list.
    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    /// Jump to the last item in the list.
    pub fn select_last(&mut self) {
        self.selected_index = self.visible().len().saturating_sub(1);
    }

    fn clamp_selection(&mut self) {
        let max = self.visible().len().saturating_sub(1);
        self.selected_index = self.selected_index.min(max);
    }

    /// Open the detail overlay for the selected service.
    pub fn enter_detail(&mut self) {
        if self.selected_view().is_some() {
            self.show_detail_overlay = true;
        }
    }

    /// Navigate back: close the overlay, else drop the filter.
    pub fn go_back(&mut self) {
        if self.show_detail_overlay {
            self.show_detail_overlay = false;
        } else if !self.filter_text.is_empty() {
            self.clear_filter();
        }
    }

    /// Close the detail overlay if open.
    pub fn close_overlay(&mut self) {
        self.show_detail_overlay = false;
    }

    /// Toggle the help overlay.
    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    /// Ask the driver for an immediate poll.
    pub fn request_poll(&mut self) {
        self.poll_requested = true;
        self.set_status_message("Polling now...".to_string());
    }

    /// Take a pending poll request, clearing it.
    pub fn take_poll_request(&mut self) -> bool {
        std::mem::take(&mut self.poll_requested)
    }

    /// Enter filter input mode (starts capturing keystrokes for search).
    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    /// Exit filter input mode without clearing the filter text.
    pub fn cancel_filter(&mut self) {
        self.filter_active = false;
    }

    /// Clear the filter text and exit filter mode.
    pub fn clear_filter(&mut self) {
        self.filter_text.clear();
        self.filter_active = false;
    }

    /// Append a character to the filter text.
    pub fn filter_push(&mut self, c: char) {
        self.filter_text.push(c);
        self.clamp_selection();
    }

    /// Remove the last character from the filter text.
    pub fn filter_pop(&mut self) {
        self.filter_text.pop();
    }

    /// Check if a service name matches the current filter.
    pub fn matches_filter(&self, name: &str) -> bool {
        if self.filter_text.is_empty() {
            return true;
        }
        name.to_lowercase().contains(&self.filter_text.to_lowercase())
    }

    /// Signal the application to quit.
    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Write what is on screen as a JSON export.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        if self.views.is_empty() {
            anyhow::bail!("No data to export");
        }
        ExportDocument::new(&self.views, self.last_poll, self.now).write(path)
    }
}
