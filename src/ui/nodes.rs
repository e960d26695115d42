//! Nodes view rendering.
//!
//! A table of every roster node with health, utilisation, network speed,
//! traffic and uptime.

use std::cmp::Ordering;

use ratatui::{
    layout::{Constraint, Rect},
    style::Style,
    text::Span,
    widgets::{Block, Borders, Cell, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::format::{format_bytes, format_percent, format_speed, format_uptime};
use crate::data::NodeRow;

/// Column to sort by in the Nodes view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    Status,
    Name,
    Region,
    Cpu,
    Ram,
    /// Download speed.
    Speed,
}

impl SortColumn {
    /// Cycle to the next sort column.
    pub fn next(self) -> Self {
        match self {
            SortColumn::Status => SortColumn::Name,
            SortColumn::Name => SortColumn::Region,
            SortColumn::Region => SortColumn::Cpu,
            SortColumn::Cpu => SortColumn::Ram,
            SortColumn::Ram => SortColumn::Speed,
            SortColumn::Speed => SortColumn::Status,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SortColumn::Status => "status",
            SortColumn::Name => "name",
            SortColumn::Region => "region",
            SortColumn::Cpu => "cpu",
            SortColumn::Ram => "ram",
            SortColumn::Speed => "speed",
        }
    }
}

/// Render the Nodes view.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(data) = &app.data else {
        return;
    };
    let nodes = app.visible_nodes();

    let header = Row::new(vec![
        Cell::from(format_header("Node", SortColumn::Name, app)),
        Cell::from(format_header("Region", SortColumn::Region, app)),
        Cell::from(format_header("CPU", SortColumn::Cpu, app)),
        Cell::from(format_header("RAM", SortColumn::Ram, app)),
        Cell::from("Disk"),
        Cell::from(format_header("↑/↓", SortColumn::Speed, app)),
        Cell::from("Traffic"),
        Cell::from("Uptime"),
        Cell::from(format_header("Status", SortColumn::Status, app)),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = nodes.iter().map(|row| node_row(app, row)).collect();

    let widths = [
        Constraint::Fill(3),
        Constraint::Fill(1),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Fill(2),
        Constraint::Fill(2),
        Constraint::Length(8),
        Constraint::Min(6),
    ];

    let selected = app.selected_node_index.min(nodes.len().saturating_sub(1));
    let sort_dir = if app.sort_ascending { "↑" } else { "↓" };

    let mut filter_info = match app.filter.region.as_deref() {
        Some("") => " [region:(none)]".to_string(),
        Some(region) => format!(" [region:{region}]"),
        None => String::new(),
    };
    if app.filter_active {
        filter_info.push_str(&format!(" /{}_", app.filter.search));
    } else if !app.filter.search.is_empty() {
        filter_info.push_str(&format!(" /{}/", app.filter.search));
    }
    if app.filter.is_active() && !app.filter_active {
        filter_info.push_str(" [c:clear]");
    }
    let position_info = if nodes.is_empty() {
        String::new()
    } else {
        format!(" [{}/{}]", selected + 1, nodes.len())
    };

    let title = format!(
        " Nodes ({}/{}) [g:{}] [s:sort {}{}]{}{} ",
        nodes.len(),
        data.nodes.len(),
        app.filter.group.label(),
        app.sort_column.label(),
        sort_dir,
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
    state.select(Some(selected));

    frame.render_stateful_widget(table, area, &mut state);
}

fn node_row<'a>(app: &App, row: &'a NodeRow) -> Row<'a> {
    let thresholds = &app.thresholds;
    let dash = || Cell::from("-").style(app.theme.muted_style());

    let percent_cell = |value: Option<f64>, level| match value {
        Some(v) => Cell::from(format_percent(v)).style(app.theme.usage_style(v, level)),
        None => dash(),
    };

    let (speed, traffic, uptime) = match row.record.as_ref().filter(|_| row.online) {
        Some(record) => (
            Cell::from(format!(
                "{}/{}",
                format_speed(record.network.up),
                format_speed(record.network.down)
            )),
            Cell::from(format!(
                "{}/{}",
                format_bytes(record.network.total_up),
                format_bytes(record.network.total_down)
            )),
            Cell::from(format_uptime(record.uptime)),
        ),
        None => (dash(), dash(), dash()),
    };

    let name_style = if row.online {
        Style::default()
    } else {
        app.theme.muted_style()
    };

    Row::new(vec![
        Cell::from(row.name()).style(name_style),
        Cell::from(row.node.region.as_str()),
        percent_cell(row.cpu(), thresholds.cpu),
        percent_cell(row.ram(), thresholds.ram),
        percent_cell(row.disk(), thresholds.disk),
        speed,
        traffic,
        uptime,
        Cell::from(row.health.status.symbol()).style(app.theme.status_style(row.health.status)),
    ])
}

fn format_header(name: &str, col: SortColumn, app: &App) -> Span<'static> {
    if app.sort_column == col {
        let arrow = if app.sort_ascending { "↑" } else { "↓" };
        Span::raw(format!("{}{}", name, arrow))
    } else {
        Span::raw(name.to_string())
    }
}

/// Sort rows by the given column and direction; ties break by name ascending.
pub fn sort_nodes_by(rows: &mut [&NodeRow], column: SortColumn, ascending: bool) {
    rows.sort_by(|a, b| {
        let primary = match column {
            SortColumn::Status => a.health.status.cmp(&b.health.status),
            SortColumn::Name => a.name().cmp(b.name()),
            SortColumn::Region => a.node.region.cmp(&b.node.region),
            SortColumn::Cpu => cmp_metric(a.cpu(), b.cpu()),
            SortColumn::Ram => cmp_metric(a.ram(), b.ram()),
            SortColumn::Speed => a.speed().map(|s| s.1).cmp(&b.speed().map(|s| s.1)),
        };

        let primary = if ascending { primary } else { primary.reverse() };

        if primary == Ordering::Equal {
            a.name().cmp(b.name())
        } else {
            primary
        }
    });
}

/// Missing values sort below every present value.
fn cmp_metric(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{FleetData, Thresholds};
    use fleetwatch_types::{NodeInfo, Roster, Snapshot};

    fn data() -> FleetData {
        let roster = Roster::new(vec![
            NodeInfo::new("a").with_name("alpha").with_region("US"),
            NodeInfo::new("b").with_name("bravo").with_region("HK"),
            NodeInfo::new("c").with_name("charlie").with_region("DE"),
        ]);
        let snapshot = Snapshot::builder()
            .online("a")
            .online("b")
            .record("a", |r| r.timestamp_secs(1).cpu(50.0).net_rate(0, 900))
            .record("b", |r| r.timestamp_secs(1).cpu(20.0).net_rate(0, 100))
            .build();
        FleetData::from_snapshot(&roster, Some(&snapshot), 1, &Thresholds::default())
    }

    fn sorted(data: &FleetData, column: SortColumn, ascending: bool) -> Vec<&str> {
        let mut rows: Vec<&NodeRow> = data.nodes.iter().collect();
        sort_nodes_by(&mut rows, column, ascending);
        rows.iter().map(|r| r.name()).collect()
    }

    #[test]
    fn sort_by_metric_puts_missing_last_when_descending() {
        let data = data();
        assert_eq!(sorted(&data, SortColumn::Cpu, false), vec!["alpha", "bravo", "charlie"]);
        assert_eq!(sorted(&data, SortColumn::Cpu, true), vec!["charlie", "bravo", "alpha"]);
        assert_eq!(sorted(&data, SortColumn::Speed, false), vec!["alpha", "bravo", "charlie"]);
    }

    #[test]
    fn sort_by_text_columns() {
        let data = data();
        assert_eq!(sorted(&data, SortColumn::Region, true), vec!["charlie", "bravo", "alpha"]);
        assert_eq!(sorted(&data, SortColumn::Name, false), vec!["charlie", "bravo", "alpha"]);
    }

    #[test]
    fn status_ties_break_by_name() {
        let data = data();
        assert_eq!(sorted(&data, SortColumn::Status, false), vec!["charlie", "alpha", "bravo"]);
    }

    #[test]
    fn sort_cycle_returns_to_start() {
        let mut col = SortColumn::default();
        for _ in 0..6 {
            col = col.next();
        }
        assert_eq!(col, SortColumn::default());
    }
}
