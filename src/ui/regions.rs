//! Regions view rendering.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::App;
use crate::data::format::{format_bytes, format_speed};
use crate::data::HealthStatus;

/// Width of the inline online-ratio bar.
const BAR_WIDTH: usize = 20;

/// Render the Regions view: fleet totals on top, one row per region below.
pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    let Some(data) = &app.data else {
        return;
    };

    let chunks = Layout::vertical([Constraint::Length(4), Constraint::Min(4)]).split(area);
    render_totals(frame, app, chunks[0]);

    let header = Row::new(vec![
        Cell::from("Region"),
        Cell::from("Online"),
        Cell::from("Nodes"),
        Cell::from("Availability"),
    ])
    .height(1)
    .style(app.theme.header);

    let rows: Vec<Row> = data
        .regions
        .iter()
        .map(|region| {
            let name = if region.region.is_empty() {
                Cell::from("(none)").style(app.theme.muted_style())
            } else {
                Cell::from(region.region.as_str())
            };
            let status = if region.online == 0 {
                HealthStatus::Critical
            } else if region.online < region.total {
                HealthStatus::Warning
            } else {
                HealthStatus::Healthy
            };
            Row::new(vec![
                name,
                Cell::from(region.online.to_string()).style(app.theme.status_style(status)),
                Cell::from(region.total.to_string()),
                Cell::from(ratio_bar(region.online, region.total)),
            ])
        })
        .collect();

    let widths = [
        Constraint::Fill(2),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Fill(3),
    ];

    let selected = app.selected_region_index.min(data.regions.len().saturating_sub(1));
    let active = data.regions.iter().filter(|r| r.online > 0).count();

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .title(format!(
                    " Regions ({} active / {}) [Enter:filter nodes] ",
                    active,
                    data.regions.len()
                ))
                .borders(Borders::ALL)
                .border_type(app.theme.border_type)
                .border_style(Style::default().fg(app.theme.border)),
        )
        .row_highlight_style(app.theme.selected)
        .highlight_symbol("▶ ");

    let mut state = TableState::default();
    state.select(Some(selected));
    frame.render_stateful_widget(table, chunks[1], &mut state);
}

/// Online gauge plus traffic and speed totals.
fn render_totals(frame: &mut Frame, app: &App, area: Rect) {
    let Some(data) = &app.data else {
        return;
    };
    let summary = &data.summary;

    let block = Block::default()
        .title(" Fleet ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let halves = Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).split(inner);

    let ratio = if summary.total == 0 {
        0.0
    } else {
        summary.online as f64 / summary.total as f64
    };
    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(app.theme.healthy))
        .ratio(ratio.clamp(0.0, 1.0))
        .label(format!("{} online", summary.online_label()));
    frame.render_widget(gauge, halves[0]);

    let lines = vec![
        Line::from(vec![
            Span::raw(" Traffic "),
            Span::styled(format!("↑{}", format_bytes(summary.traffic.up)), Style::default().fg(app.theme.upload)),
            Span::raw(" "),
            Span::styled(format!("↓{}", format_bytes(summary.traffic.down)), Style::default().fg(app.theme.highlight)),
        ]),
        Line::from(vec![
            Span::raw(" Speed   "),
            Span::styled(format!("↑{}", format_speed(summary.speed.up)), Style::default().fg(app.theme.upload)),
            Span::raw(" "),
            Span::styled(format!("↓{}", format_speed(summary.speed.down)), Style::default().fg(app.theme.highlight)),
            Span::styled(
                format!("  {} regions", summary.regions),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]),
    ];
    frame.render_widget(Paragraph::new(lines), halves[1]);
}

/// Text bar of online / total, e.g. `██████░░░░ 60%`.
fn ratio_bar(online: usize, total: usize) -> String {
    if total == 0 {
        return String::new();
    }
    let filled = (online * BAR_WIDTH + total / 2) / total;
    format!(
        "{}{} {}%",
        "█".repeat(filled),
        "░".repeat(BAR_WIDTH - filled),
        online * 100 / total
    )
}
