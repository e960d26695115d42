//! Terminal rendering with ratatui.
//!
//! - [`common`]: header, tab bar, status bar and help overlay
//! - [`nodes`]: the sortable node table
//! - [`regions`]: per-region online counts
//! - [`detail`]: the node detail overlay backed by a history view
//! - [`theme`]: colors with light/dark detection

pub mod common;
pub mod detail;
pub mod nodes;
pub mod regions;
pub mod theme;

pub use theme::Theme;

/// Sparkline characters (8 levels of height).
const SPARKLINE_CHARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Render sparkline levels (0-7) as block characters, padded to `width`.
pub fn render_sparkline(levels: &[u8], width: usize) -> String {
    let shown = &levels[levels.len().saturating_sub(width)..];
    let mut line: String = shown
        .iter()
        .map(|&v| SPARKLINE_CHARS[v.min(7) as usize])
        .collect();
    for _ in shown.len()..width {
        line.insert(0, ' ');
    }
    line
}
