//! Detail overlay rendering.
//!
//! A modal for the selected node: identity and latest sample on top, then
//! sparklines from the node's history view, then ping statistics.

use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, Detail};
use crate::data::format::{format_bytes, format_percent, format_speed, format_uptime};
use crate::data::NodeRow;
use crate::live::{EntityHistoryBuffer, Metric};
use crate::ui::render_sparkline;

/// Minimum width required for the detail overlay to render properly.
const MIN_OVERLAY_WIDTH: u16 = 50;
/// Minimum height required for the detail overlay to render properly.
const MIN_OVERLAY_HEIGHT: u16 = 18;

const CHARTED: [Metric; 5] = [Metric::Cpu, Metric::Ram, Metric::Load, Metric::NetUp, Metric::NetDown];

/// Render the node detail as a modal overlay.
pub fn render_overlay(frame: &mut Frame, app: &App, area: Rect) {
    if area.width < MIN_OVERLAY_WIDTH || area.height < MIN_OVERLAY_HEIGHT {
        return;
    }
    let Some(detail) = &app.detail else {
        return;
    };
    let Some(row) = app.data.as_ref().and_then(|d| d.node(&detail.uuid)) else {
        return;
    };

    let overlay_width = (area.width * 95 / 100).clamp(MIN_OVERLAY_WIDTH, 110);
    let overlay_height = (area.height * 90 / 100).clamp(MIN_OVERLAY_HEIGHT, 30);
    let x = area.x + (area.width.saturating_sub(overlay_width)) / 2;
    let y = area.y + (area.height.saturating_sub(overlay_height)) / 2;
    let overlay_area = Rect::new(x, y, overlay_width, overlay_height);

    frame.render_widget(Clear, overlay_area);

    let chunks = Layout::vertical([
        Constraint::Length(6),
        Constraint::Min(7),
        Constraint::Length(4),
        Constraint::Length(1),
    ])
    .split(overlay_area);

    render_summary(frame, app, row, chunks[0]);
    render_history(frame, app, detail, chunks[1]);
    render_ping(frame, app, detail, chunks[2]);

    let footer = Paragraph::new(Line::from(vec![Span::styled(
        " ↑/↓ switch node · Esc close ",
        Style::default().add_modifier(Modifier::DIM),
    )]));
    frame.render_widget(footer, chunks[3]);
}

fn render_summary(frame: &mut Frame, app: &App, row: &NodeRow, area: Rect) {
    let node = &row.node;
    let health_style = app.theme.status_style(row.health.status);
    let bold = Style::default().add_modifier(Modifier::BOLD);

    let mut status = vec![
        Span::raw(" Status: "),
        Span::styled(row.health.status.symbol(), health_style.add_modifier(Modifier::BOLD)),
    ];
    if let Some(reason) = &row.health.reason {
        status.push(Span::styled(format!(" ({reason})"), health_style));
    }

    let platform = [node.os.as_str(), node.arch.as_str(), node.cpu_name.as_str()]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" · ");

    let latest = match row.record.as_ref().filter(|_| row.online) {
        Some(r) => Line::from(vec![
            Span::raw(" CPU "),
            Span::styled(format_percent(r.cpu.usage), bold),
            Span::raw("  RAM "),
            Span::styled(
                format!("{} / {}", format_bytes(r.ram.used), format_bytes(r.ram.total)),
                bold,
            ),
            Span::raw("  Disk "),
            Span::styled(format_percent(r.disk.percent()), bold),
            Span::raw("  Load "),
            Span::styled(format!("{:.2}", r.load.load1), bold),
            Span::raw("  Up "),
            Span::styled(format_uptime(r.uptime), bold),
        ]),
        None => Line::from(Span::styled(" No live sample", app.theme.muted_style())),
    };

    let network = match row.record.as_ref().filter(|_| row.online) {
        Some(r) => Line::from(vec![
            Span::raw(" Net "),
            Span::styled(format!("↑{}", format_speed(r.network.up)), Style::default().fg(app.theme.upload)),
            Span::raw(" "),
            Span::styled(format!("↓{}", format_speed(r.network.down)), Style::default().fg(app.theme.highlight)),
            Span::raw(format!(
                "  Total ↑{} ↓{}  TCP {} UDP {}  Proc {}",
                format_bytes(r.network.total_up),
                format_bytes(r.network.total_down),
                r.connections.tcp,
                r.connections.udp,
                r.process
            )),
        ]),
        None => Line::from(""),
    };

    let lines = vec![
        Line::from(status),
        Line::from(Span::raw(format!(" {}  {}", node.region, platform))),
        latest,
        network,
    ];

    let block = Block::default()
        .title(format!(" {} ", row.name()))
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_history(frame: &mut Frame, app: &App, detail: &Detail, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let Some(view) = &detail.history else {
        let message = if detail.is_loading() {
            " Loading history..."
        } else {
            " History unavailable"
        };
        let paragraph = Paragraph::new(Line::from(Span::styled(message, app.theme.muted_style())))
            .block(block.title(" History "));
        frame.render_widget(paragraph, area);
        return;
    };

    let buffer = view.buffer();
    let block = block.title(format!(" History ({}/{}) ", buffer.len(), buffer.capacity()));
    // Label and average take 24 columns; the rest is sparkline.
    let width = (block.inner(area).width as usize).saturating_sub(26).max(8);

    let lines: Vec<Line> = CHARTED
        .iter()
        .map(|&metric| history_line(app, &buffer, metric, width))
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn history_line(app: &App, buffer: &EntityHistoryBuffer, metric: Metric, width: usize) -> Line<'static> {
    let levels = buffer.sparkline(metric, width);
    let average = match (metric, buffer.average(metric)) {
        (_, None) => "-".to_string(),
        (Metric::Cpu | Metric::Ram, Some(v)) => format_percent(v),
        (Metric::NetUp | Metric::NetDown, Some(v)) => format_speed(v.max(0.0) as u64),
        (Metric::Load, Some(v)) => format!("{v:.2}"),
    };
    let color = match metric {
        Metric::NetUp => app.theme.upload,
        _ => app.theme.highlight,
    };

    Line::from(vec![
        Span::raw(format!(" {:<9}", metric.label())),
        Span::styled(render_sparkline(&levels, width), Style::default().fg(color)),
        Span::styled(format!("  avg {average}"), Style::default().add_modifier(Modifier::DIM)),
    ])
}

fn render_ping(frame: &mut Frame, app: &App, detail: &Detail, area: Rect) {
    let block = Block::default()
        .title(" Ping ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.border));

    let line = match detail.ping {
        Some(stats) if stats.has_data => Line::from(vec![
            Span::raw(" Loss "),
            Span::styled(
                format!("{:.2}%", stats.avg_loss),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("   Volatility (p99/p50) "),
            Span::styled(
                format!("{:.2}", stats.avg_volatility),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("   last {}h", app.ping_hours),
                Style::default().add_modifier(Modifier::DIM),
            ),
        ]),
        Some(_) => Line::from(Span::styled(" No ping data", app.theme.muted_style())),
        None if app.live().ping_fetcher().is_none() => {
            Line::from(Span::styled(" Not available for this source", app.theme.muted_style()))
        }
        None => Line::from(Span::styled(" Loading...", app.theme.muted_style())),
    };

    frame.render_widget(Paragraph::new(line).block(block), area);
}
