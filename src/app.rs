//! Application state and navigation logic.

use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use fleetwatch_types::{Roster, Snapshot};
use tokio::runtime::Handle;
use tokio::sync::oneshot;

use crate::data::{groups, FleetData, NodeFilter, NodeRow, PingStats, RegionRow, Thresholds};
use crate::export::write_export;
use crate::live::{HistoryView, LiveData};
use crate::ui::nodes::{sort_nodes_by, SortColumn};
use crate::ui::Theme;

/// How long a status message stays in the status bar.
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(3);

/// The current view/tab in the TUI.
///
/// Node detail is an overlay (see [`App::detail`]) rather than a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// All nodes with health and live metrics.
    Nodes,
    /// Online counts per region.
    Regions,
}

impl View {
    /// Cycle to the next view.
    pub fn next(self) -> Self {
        match self {
            View::Nodes => View::Regions,
            View::Regions => View::Nodes,
        }
    }

    /// Cycle to the previous view. With two views this is the same as `next`.
    pub fn prev(self) -> Self {
        self.next()
    }

    pub fn label(&self) -> &'static str {
        match self {
            View::Nodes => "Nodes",
            View::Regions => "Regions",
        }
    }
}

/// State of the detail overlay for one node.
///
/// The history view and ping statistics arrive asynchronously; dropping this
/// closes the history view (or discards it when it arrives).
#[derive(Debug)]
pub struct Detail {
    pub uuid: String,
    pub history: Option<HistoryView>,
    pub ping: Option<PingStats>,
    history_rx: Option<oneshot::Receiver<HistoryView>>,
    ping_rx: Option<oneshot::Receiver<PingStats>>,
}

impl Detail {
    /// Whether the history seed is still being fetched.
    pub fn is_loading(&self) -> bool {
        self.history_rx.is_some()
    }

    fn poll(&mut self) {
        if let Some(rx) = self.history_rx.as_mut() {
            match rx.try_recv() {
                Ok(view) => {
                    self.history = Some(view);
                    self.history_rx = None;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => self.history_rx = None,
            }
        }
        if let Some(rx) = self.ping_rx.as_mut() {
            match rx.try_recv() {
                Ok(stats) => {
                    self.ping = Some(stats);
                    self.ping_rx = None;
                }
                Err(oneshot::error::TryRecvError::Empty) => {}
                Err(oneshot::error::TryRecvError::Closed) => self.ping_rx = None,
            }
        }
    }
}

/// Main application state.
pub struct App {
    pub running: bool,
    pub current_view: View,
    pub show_help: bool,

    // Live data
    live: LiveData,
    runtime: Handle,
    pub thresholds: Thresholds,
    pub ping_hours: u32,
    pub data: Option<FleetData>,
    pub snapshot: Option<Arc<Snapshot>>,
    roster: Arc<Roster>,

    // Navigation state
    pub selected_node_index: usize,
    pub selected_region_index: usize,
    pub detail: Option<Detail>,

    // Sorting (Nodes view)
    pub sort_column: SortColumn,
    pub sort_ascending: bool,

    // Search/filter
    pub filter: NodeFilter,
    pub filter_active: bool,

    pub theme: Theme,
    pub status_message: Option<(String, Instant)>,
}

impl App {
    /// Create an App over `live`. Must be called inside a tokio runtime.
    pub fn new(live: LiveData, thresholds: Thresholds, ping_hours: u32) -> Self {
        Self::with_theme(live, thresholds, ping_hours, Theme::auto_detect())
    }

    pub fn with_theme(live: LiveData, thresholds: Thresholds, ping_hours: u32, theme: Theme) -> Self {
        Self {
            running: true,
            current_view: View::Nodes,
            show_help: false,
            live,
            runtime: Handle::current(),
            thresholds,
            ping_hours,
            data: None,
            snapshot: None,
            roster: Arc::new(Roster::default()),
            selected_node_index: 0,
            selected_region_index: 0,
            detail: None,
            sort_column: SortColumn::default(),
            sort_ascending: false,
            filter: NodeFilter::default(),
            filter_active: false,
            theme,
            status_message: None,
        }
    }

    pub fn live(&self) -> &LiveData {
        &self.live
    }

    pub fn source_description(&self) -> &str {
        self.live.description()
    }

    /// Set a temporary status message that will be shown for a few seconds.
    pub fn set_status_message(&mut self, message: String) {
        self.status_message = Some((message, Instant::now()));
    }

    /// Get the current status message if it hasn't expired.
    pub fn get_status_message(&self) -> Option<&str> {
        match &self.status_message {
            Some((msg, at)) if at.elapsed() < STATUS_MESSAGE_TTL => Some(msg),
            _ => None,
        }
    }

    /// Time since the hub last published, or `None` before the first publish.
    pub fn staleness(&self) -> Option<Duration> {
        self.live.hub().age()
    }

    /// Error from the most recent failed snapshot fetch, cleared on success.
    pub fn fetch_error(&self) -> Option<String> {
        self.live.scheduler().last_error()
    }

    /// Pick up a new snapshot or roster, and any async detail results.
    ///
    /// Returns true if the fleet data was rebuilt.
    pub fn reload_data(&mut self) -> bool {
        if let Some(detail) = self.detail.as_mut() {
            detail.poll();
        }

        let sequence = self.live.hub().sequence();
        let roster = self.live.roster();
        let unchanged = self
            .data
            .as_ref()
            .is_some_and(|d| d.sequence == sequence && (Arc::ptr_eq(&roster, &self.roster) || roster == self.roster));
        if unchanged {
            return false;
        }

        let snapshot = self.live.latest();
        self.data = Some(FleetData::from_snapshot(
            &roster,
            snapshot.as_deref(),
            sequence,
            &self.thresholds,
        ));
        self.snapshot = snapshot;
        self.roster = roster;
        self.clamp_selection();
        true
    }

    /// Kick the scheduler for an immediate fetch.
    pub fn request_refresh(&mut self) {
        let triggered = {
            let _runtime = self.runtime.enter();
            self.live.scheduler().trigger()
        };
        if triggered {
            self.set_status_message("Refreshing...".to_string());
        } else {
            self.set_status_message("Refresh already in progress".to_string());
        }
    }

    pub fn next_view(&mut self) {
        self.current_view = self.current_view.next();
    }

    pub fn prev_view(&mut self) {
        self.current_view = self.current_view.prev();
    }

    pub fn set_view(&mut self, view: View) {
        self.current_view = view;
    }

    /// Roster nodes that pass the filter, in display order.
    pub fn visible_nodes(&self) -> Vec<&NodeRow> {
        let Some(data) = &self.data else {
            return Vec::new();
        };
        let mut rows: Vec<&NodeRow> = data
            .nodes
            .iter()
            .filter(|row| self.filter.matches(&row.node, self.snapshot.as_deref()))
            .collect();
        sort_nodes_by(&mut rows, self.sort_column, self.sort_ascending);
        rows
    }

    pub fn regions(&self) -> &[RegionRow] {
        self.data.as_ref().map(|d| d.regions.as_slice()).unwrap_or_default()
    }

    pub fn selected_node(&self) -> Option<&NodeRow> {
        self.visible_nodes().get(self.selected_node_index).copied()
    }

    fn list_len(&self) -> usize {
        match self.current_view {
            View::Nodes => self.visible_nodes().len(),
            View::Regions => self.regions().len(),
        }
    }

    fn selection_mut(&mut self) -> &mut usize {
        match self.current_view {
            View::Nodes => &mut self.selected_node_index,
            View::Regions => &mut self.selected_region_index,
        }
    }

    fn clamp_selection(&mut self) {
        let nodes = self.visible_nodes().len();
        let regions = self.regions().len();
        self.selected_node_index = self.selected_node_index.min(nodes.saturating_sub(1));
        self.selected_region_index = self.selected_region_index.min(regions.saturating_sub(1));
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
        let max = self.list_len().saturating_sub(1);
        let selection = self.selection_mut();
        *selection = (*selection + n).min(max);
        self.follow_selection();
    }

    /// Move selection up by n items.
    pub fn select_prev_n(&mut self, n: usize) {
        let selection = self.selection_mut();
        *selection = selection.saturating_sub(n);
        self.follow_selection();
    }

    pub fn select_first(&mut self) {
        *self.selection_mut() = 0;
        self.follow_selection();
    }

    pub fn select_last(&mut self) {
        let last = self.list_len().saturating_sub(1);
        *self.selection_mut() = last;
        self.follow_selection();
    }

    /// Select the row at `index` of the current list, if it exists.
    pub fn select_index(&mut self, index: usize) {
        if index < self.list_len() {
            *self.selection_mut() = index;
            self.follow_selection();
        }
    }

    /// Keep an open detail overlay on the selected node.
    fn follow_selection(&mut self) {
        if self.detail.is_none() || self.current_view != View::Nodes {
            return;
        }
        let selected = self.selected_node().map(|n| n.uuid().to_string());
        match selected {
            Some(uuid) if self.detail.as_ref().is_some_and(|d| d.uuid != uuid) => self.open_detail(uuid),
            _ => {}
        }
    }

    /// Enter on the current selection.
    ///
    /// On Nodes this opens the detail overlay; on Regions it filters the
    /// node list down to the selected region.
    pub fn enter_detail(&mut self) {
        match self.current_view {
            View::Nodes => {
                if let Some(uuid) = self.selected_node().map(|n| n.uuid().to_string()) {
                    self.open_detail(uuid);
                }
            }
            View::Regions => {
                let Some(region) = self
                    .regions()
                    .get(self.selected_region_index)
                    .map(|r| r.region.clone())
                else {
                    return;
                };
                self.filter.region = Some(region);
                self.current_view = View::Nodes;
                self.selected_node_index = 0;
            }
        }
    }

    /// Open the detail overlay for `uuid`, replacing any open one.
    ///
    /// The history view is activated on the runtime and handed back over a
    /// oneshot; ping statistics are fetched the same way when available.
    pub fn open_detail(&mut self, uuid: String) {
        let (history_tx, history_rx) = oneshot::channel();
        let activate = self.live.open_history(uuid.clone());
        self.runtime.spawn(async move {
            let view = activate.await;
            // The overlay may have closed meanwhile; dropping the view unsubscribes it.
            let _ = history_tx.send(view);
        });

        let ping_rx = self.live.ping_fetcher().map(|fetcher| {
            let (tx, rx) = oneshot::channel();
            let id = uuid.clone();
            let hours = self.ping_hours;
            self.runtime.spawn(async move {
                let result = fetcher.fetch_ping(&id, hours).await;
                let _ = tx.send(PingStats::from_result(&result));
            });
            rx
        });

        self.detail = Some(Detail {
            uuid,
            history: None,
            ping: None,
            history_rx: Some(history_rx),
            ping_rx,
        });
    }

    pub fn show_detail_overlay(&self) -> bool {
        self.detail.is_some()
    }

    /// Close the detail overlay, releasing its history view.
    pub fn close_overlay(&mut self) {
        self.detail = None;
    }

    /// Navigate back: close overlay first, then return to Nodes.
    pub fn go_back(&mut self) {
        if self.detail.is_some() {
            self.close_overlay();
        } else if self.current_view != View::Nodes {
            self.current_view = View::Nodes;
        }
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }

    pub fn cycle_sort(&mut self) {
        self.sort_column = self.sort_column.next();
    }

    pub fn toggle_sort_direction(&mut self) {
        self.sort_ascending = !self.sort_ascending;
    }

    /// Advance the group selection: all, then each group in name order.
    pub fn cycle_group(&mut self) {
        let groups = groups(&self.roster);
        self.filter.group = self.filter.group.next(&groups);
        self.selected_node_index = 0;
        self.set_status_message(format!("Group: {}", self.filter.group.label()));
    }

    /// Enter filter input mode (starts capturing keystrokes for search).
    pub fn start_filter(&mut self) {
        self.filter_active = true;
    }

    /// Exit filter input mode without clearing the search text.
    pub fn cancel_filter(&mut self) {
        self.filter_active = false;
    }

    /// Clear search and group selection, and exit filter mode.
    pub fn clear_filter(&mut self) {
        self.filter = NodeFilter::default();
        self.filter_active = false;
        self.clamp_selection();
    }

    pub fn filter_push(&mut self, c: char) {
        self.filter.search.push(c);
        self.selected_node_index = 0;
    }

    pub fn filter_pop(&mut self) {
        self.filter.search.pop();
        self.clamp_selection();
    }

    pub fn quit(&mut self) {
        self.running = false;
    }

    /// Export current state to a file.
    pub fn export_state(&self, path: &Path) -> Result<()> {
        let Some(data) = &self.data else {
            anyhow::bail!("No data to export");
        };
        write_export(path, data, self.live.description())
    }
}
