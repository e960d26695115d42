//! Common UI components shared across views.
//!
//! This module contains the header bar, tab bar, status bar, and help overlay.

use std::time::Duration;

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Tabs},
    Frame,
};

use crate::app::{App, View};
use crate::data::format::{format_bytes, format_speed};
use crate::data::HealthStatus;

/// Render the header bar with fleet health and the status-card figures.
pub fn render_header(frame: &mut Frame, app: &App, area: Rect) {
    let Some(data) = &app.data else {
        let line = Line::from(vec![
            Span::styled(" FLEETWATCH ", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("| Waiting for first snapshot..."),
        ]);
        frame.render_widget(Paragraph::new(line), area);
        return;
    };

    let (healthy, warning, critical) = data.health_counts();
    let summary = &data.summary;

    let overall = if critical > 0 {
        HealthStatus::Critical
    } else if warning > 0 {
        HealthStatus::Warning
    } else {
        HealthStatus::Healthy
    };

    let count = |n: usize, status: HealthStatus| {
        if n > 0 {
            Span::styled(n.to_string(), app.theme.status_style(status))
        } else {
            Span::styled("0", Style::default().add_modifier(Modifier::DIM))
        }
    };

    let line = Line::from(vec![
        Span::styled(" ● ", app.theme.status_style(overall)),
        Span::styled("FLEETWATCH ", Style::default().add_modifier(Modifier::BOLD)),
        Span::raw("│ "),
        Span::styled(summary.online_label(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" online │ "),
        Span::styled(summary.regions.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        Span::raw(" regions │ "),
        count(healthy, HealthStatus::Healthy),
        Span::raw(" ok "),
        count(warning, HealthStatus::Warning),
        Span::raw(" warn "),
        count(critical, HealthStatus::Critical),
        Span::raw(" crit │ "),
        Span::styled(
            format!("↑{} ↓{}", format_speed(summary.speed.up), format_speed(summary.speed.down)),
            Style::default().fg(app.theme.highlight),
        ),
        Span::raw(" │ "),
        Span::raw(format!(
            "Σ↑{} Σ↓{}",
            format_bytes(summary.traffic.up),
            format_bytes(summary.traffic.down)
        )),
    ]);

    frame.render_widget(Paragraph::new(line), area);
}

/// Render the tab bar showing available views.
pub fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
    let titles: Vec<Line> = vec![Line::from(" 1:Nodes "), Line::from(" 2:Regions ")];

    let selected = match app.current_view {
        View::Nodes => 0,
        View::Regions => 1,
    };

    let tabs = Tabs::new(titles)
        .select(selected)
        .style(app.theme.tab_inactive)
        .highlight_style(app.theme.tab_active)
        .divider("|");

    frame.render_widget(tabs, area);
}

/// Render the status bar at the bottom.
///
/// Shows the source, time since the last publish, the last fetch error and
/// the available controls. Temporary status messages take precedence.
pub fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if let Some(msg) = app.get_status_message() {
        let paragraph =
            Paragraph::new(format!(" {} ", msg)).style(Style::default().fg(app.theme.highlight));
        frame.render_widget(paragraph, area);
        return;
    }

    let controls = match app.current_view {
        View::Nodes if app.filter_active => "Type to search | Enter:apply Esc:cancel",
        View::Nodes => "/:search g:group s:sort Enter:detail ?:help q:quit",
        View::Regions => "Enter:filter nodes Tab:switch ?:help q:quit",
    };

    let freshness = match app.staleness() {
        Some(age) => format!("Updated {}", format_age(age)),
        None => "Waiting for data".to_string(),
    };

    let mut spans = vec![Span::styled(
        format!(" {} | {} ", app.source_description(), freshness),
        Style::default().add_modifier(Modifier::DIM),
    )];
    if let Some(err) = app.fetch_error() {
        spans.push(Span::styled(
            format!("| Fetch failed: {} ", err),
            app.theme.status_style(HealthStatus::Warning),
        ));
    }
    spans.push(Span::styled(
        format!("| {}", controls),
        Style::default().add_modifier(Modifier::DIM),
    ));

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn format_age(age: Duration) -> String {
    let secs = age.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s ago", secs)
    } else {
        format!("{}m {}s ago", age.as_secs() / 60, age.as_secs() % 60)
    }
}

/// Render the help overlay with keyboard shortcuts.
pub fn render_help(frame: &mut Frame, app: &App, area: Rect) {
    let section = |title: &'static str| {
        Line::from(vec![Span::styled(title, Style::default().add_modifier(Modifier::BOLD))])
    };

    let help_text = vec![
        Line::from(vec![Span::styled("Keyboard Shortcuts", app.theme.header)]),
        Line::from(""),
        section(" Navigation"),
        Line::from("  ←/→ h/l     Switch views"),
        Line::from("  ↑/↓ j/k     Navigate list"),
        Line::from("  PgUp/PgDn   Jump 10 items"),
        Line::from("  Home/End    Jump to first/last"),
        Line::from("  Enter       Node detail / filter region"),
        Line::from("  Esc         Go back"),
        Line::from(""),
        section(" Nodes"),
        Line::from("  /           Search name, os, region, price"),
        Line::from("              or online / offline"),
        Line::from("  g           Cycle group"),
        Line::from("  c           Clear search and group"),
        Line::from("  s           Cycle sort column"),
        Line::from("  S           Toggle sort direction"),
        Line::from(""),
        section(" General"),
        Line::from("  r           Refresh now"),
        Line::from("  e           Export to JSON"),
        Line::from("  q           Quit"),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Press any key to close",
            Style::default().add_modifier(Modifier::DIM),
        )]),
    ];

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_type(app.theme.border_type)
        .border_style(Style::default().fg(app.theme.highlight));

    let help_height = (help_text.len() as u16 + 2).min(area.height.saturating_sub(2));
    let help_width = 48u16.min(area.width.saturating_sub(4));
    let x = area.x + (area.width.saturating_sub(help_width)) / 2;
    let y = area.y + (area.height.saturating_sub(help_height)) / 2;
    let help_area = Rect::new(x, y, help_width, help_height);

    frame.render_widget(Clear, help_area);
    frame.render_widget(Paragraph::new(help_text).block(block), help_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_formatting() {
        assert_eq!(format_age(Duration::from_millis(2500)), "2.5s ago");
        assert_eq!(format_age(Duration::from_secs(125)), "2m 5s ago");
    }
}
