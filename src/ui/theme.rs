//! Colors and styles, with light/dark terminal detection.

use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::block::BorderType;

use crate::data::{HealthStatus, Level};

/// Color and style theme for the TUI.
///
/// Use [`Theme::auto_detect()`] to pick by terminal background, or
/// [`Theme::dark()`] / [`Theme::light()`] explicitly.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Accent for highlights, overlay borders and status messages.
    pub highlight: Color,
    pub warning: Color,
    pub critical: Color,
    pub healthy: Color,
    /// Offline nodes and empty cells.
    pub muted: Color,
    pub border: Color,
    /// Upload figures; download uses `highlight`.
    pub upload: Color,
    pub header: Style,
    pub selected: Style,
    pub tab_active: Style,
    pub tab_inactive: Style,
    pub border_type: BorderType,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            highlight: Color::Cyan,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            muted: Color::DarkGray,
            border: Color::Gray,
            upload: Color::Magenta,
            header: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::Gray),
            border_type: BorderType::Rounded,
        }
    }

    pub fn light() -> Self {
        Self {
            highlight: Color::Blue,
            warning: Color::Yellow,
            critical: Color::Red,
            healthy: Color::Green,
            muted: Color::Gray,
            border: Color::DarkGray,
            upload: Color::Magenta,
            header: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            selected: Style::default().bg(Color::LightBlue).add_modifier(Modifier::BOLD),
            tab_active: Style::default().fg(Color::Blue).add_modifier(Modifier::BOLD),
            tab_inactive: Style::default().fg(Color::DarkGray),
            border_type: BorderType::Rounded,
        }
    }

    /// Pick light or dark from the terminal's background luminance.
    pub fn auto_detect() -> Self {
        match terminal_light::luma() {
            Ok(luma) if luma > 0.5 => Self::light(),
            _ => Self::dark(),
        }
    }

    pub fn status_style(&self, status: HealthStatus) -> Style {
        match status {
            HealthStatus::Healthy => Style::default().fg(self.healthy),
            HealthStatus::Warning => Style::default().fg(self.warning),
            HealthStatus::Critical => {
                Style::default().fg(self.critical).add_modifier(Modifier::BOLD)
            }
        }
    }

    /// Style for a utilisation percentage against its thresholds.
    pub fn usage_style(&self, percent: f64, level: Level) -> Style {
        if percent >= level.critical {
            self.status_style(HealthStatus::Critical)
        } else if percent >= level.warning {
            self.status_style(HealthStatus::Warning)
        } else {
            Style::default()
        }
    }

    pub fn muted_style(&self) -> Style {
        Style::default().fg(self.muted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usage_style_follows_levels() {
        let theme = Theme::dark();
        let level = Level::new(80.0, 95.0);
        assert_eq!(theme.usage_style(10.0, level), Style::default());
        assert_eq!(theme.usage_style(80.0, level).fg, Some(Color::Yellow));
        assert_eq!(theme.usage_style(99.0, level).fg, Some(Color::Red));
    }
}
