use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};

use crate::app::{App, View};

/// File written by the export key.
pub const EXPORT_FILE: &str = "fleetwatch_export.json";

/// Poll for events with a timeout
pub fn poll_event(timeout: Duration) -> Result<Option<Event>> {
    if event::poll(timeout)? {
        Ok(Some(event::read()?))
    } else {
        Ok(None)
    }
}

/// Handle a key event
pub fn handle_key_event(app: &mut App, key: KeyEvent) {
    // If help is shown, any key closes it
    if app.show_help {
        app.show_help = false;
        return;
    }

    if app.show_detail_overlay() {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Backspace | KeyCode::Char('q') => {
                app.close_overlay();
            }
            // The overlay follows the selection
            KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => app.select_next(),
            KeyCode::PageUp => app.select_prev_n(10),
            KeyCode::PageDown => app.select_next_n(10),
            KeyCode::Home => app.select_first(),
            KeyCode::End => app.select_last(),
            _ => {}
        }
        return;
    }

    if app.filter_active {
        handle_filter_input(app, key);
        return;
    }

    match key.code {
        KeyCode::Char('q') => app.quit(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.quit(),

        KeyCode::Tab => {
            if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.prev_view();
            } else {
                app.next_view();
            }
        }
        KeyCode::BackTab => app.prev_view(),
        KeyCode::Char('1') => app.set_view(View::Nodes),
        KeyCode::Char('2') => app.set_view(View::Regions),

        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Left | KeyCode::Char('h') => app.prev_view(),
        KeyCode::Right | KeyCode::Char('l') => app.next_view(),
        KeyCode::PageUp => app.select_prev_n(10),
        KeyCode::PageDown => app.select_next_n(10),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),

        KeyCode::Enter => app.enter_detail(),
        KeyCode::Esc | KeyCode::Backspace => app.go_back(),

        KeyCode::Char('r') => app.request_refresh(),
        KeyCode::Char('?') => app.toggle_help(),

        KeyCode::Char('s') if app.current_view == View::Nodes => app.cycle_sort(),
        KeyCode::Char('S') if app.current_view == View::Nodes => app.toggle_sort_direction(),

        KeyCode::Char('/') => {
            app.set_view(View::Nodes);
            app.start_filter();
        }
        KeyCode::Char('g') => {
            app.set_view(View::Nodes);
            app.cycle_group();
        }
        KeyCode::Char('c') => {
            if app.filter.is_active() {
                app.clear_filter();
            }
        }

        KeyCode::Char('e') => {
            let export_path = PathBuf::from(EXPORT_FILE);
            match app.export_state(&export_path) {
                Ok(()) => {
                    app.set_status_message(format!("Exported to {}", export_path.display()));
                }
                Err(e) => {
                    app.set_status_message(format!("Export failed: {}", e));
                }
            }
        }

        _ => {}
    }
}

/// Handle key input while filter is active
fn handle_filter_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Enter => app.filter_active = false,
        // Keep text but exit input mode
        KeyCode::Esc => app.cancel_filter(),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => app.clear_filter(),
        KeyCode::Backspace => {
            app.filter_pop();
            if app.filter.search.is_empty() {
                app.filter_active = false;
            }
        }
        KeyCode::Char(c) => app.filter_push(c),
        _ => {}
    }
}

/// Handle mouse events
pub fn handle_mouse_event(app: &mut App, mouse: MouseEvent, content_start_row: u16) {
    match mouse.kind {
        MouseEventKind::ScrollUp => app.select_prev(),
        MouseEventKind::ScrollDown => app.select_next(),

        MouseEventKind::Down(MouseButton::Left) => {
            let clicked_row = mouse.row;

            // Rows below the table header select an item
            if clicked_row > content_start_row {
                app.select_index((clicked_row - content_start_row - 1) as usize);
            }

            // Tab bar is row 1: " 1:Nodes " then " 2:Regions "
            if clicked_row == 1 {
                if mouse.column < 10 {
                    app.set_view(View::Nodes);
                } else if mouse.column < 22 {
                    app.set_view(View::Regions);
                }
            }
        }

        MouseEventKind::Down(MouseButton::Right) => app.go_back(),

        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Thresholds;
    use crate::live::{LiveData, LiveOptions};
    use crate::source::{FetchError, SnapshotFetcher, Sources};
    use crate::ui::Theme;
    use async_trait::async_trait;
    use fleetwatch_types::Snapshot;
    use std::sync::Arc;

    #[derive(Debug)]
    struct Fixed;

    #[async_trait]
    impl SnapshotFetcher for Fixed {
        async fn fetch_snapshot(&self) -> Result<Snapshot, FetchError> {
            Ok(Snapshot::builder()
                .online("web-1")
                .online("db-1")
                .record("web-1", |r| r.timestamp_secs(1))
                .record("db-1", |r| r.timestamp_secs(1))
                .build())
        }

        fn description(&self) -> &str {
            "fixed"
        }
    }

    async fn app() -> App {
        let live = LiveData::new(
            Sources {
                snapshot: Arc::new(Fixed),
                roster: None,
                history: None,
                ping: None,
            },
            LiveOptions::default(),
        );
        live.refresh_once().await;
        let mut app = App::with_theme(live, Thresholds::default(), 24, Theme::dark());
        app.reload_data();
        app
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_str(app: &mut App, text: &str) {
        for c in text.chars() {
            handle_key_event(app, key(KeyCode::Char(c)));
        }
    }

    #[tokio::test]
    async fn filter_mode_captures_keys() {
        let mut app = app().await;
        handle_key_event(&mut app, key(KeyCode::Char('/')));
        assert!(app.filter_active);

        // 'q' is text while filtering, not quit
        type_str(&mut app, "wq");
        assert!(app.running);
        assert_eq!(app.filter.search, "wq");

        handle_key_event(&mut app, key(KeyCode::Backspace));
        handle_key_event(&mut app, key(KeyCode::Enter));
        assert!(!app.filter_active);
        assert_eq!(app.filter.search, "w");
        assert_eq!(app.visible_nodes().len(), 1);

        handle_key_event(&mut app, key(KeyCode::Char('c')));
        assert!(!app.filter.is_active());
    }

    #[tokio::test]
    async fn help_swallows_next_key() {
        let mut app = app().await;
        handle_key_event(&mut app, key(KeyCode::Char('?')));
        assert!(app.show_help);
        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.show_help);
        assert!(app.running);

        handle_key_event(&mut app, key(KeyCode::Char('q')));
        assert!(!app.running);
    }

    #[tokio::test]
    async fn tabs_and_sort_keys() {
        let mut app = app().await;
        handle_key_event(&mut app, key(KeyCode::Tab));
        assert_eq!(app.current_view, View::Regions);

        let sort = app.sort_column;
        handle_key_event(&mut app, key(KeyCode::Char('s')));
        assert_eq!(app.sort_column, sort);

        handle_key_event(&mut app, key(KeyCode::Char('1')));
        handle_key_event(&mut app, key(KeyCode::Char('s')));
        assert_ne!(app.sort_column, sort);
    }

    #[tokio::test]
    async fn enter_and_escape_toggle_detail() {
        let mut app = app().await;
        handle_key_event(&mut app, key(KeyCode::Enter));
        assert!(app.show_detail_overlay());
        handle_key_event(&mut app, key(KeyCode::Esc));
        assert!(!app.show_detail_overlay());
    }

    #[tokio::test]
    async fn click_selects_row() {
        let mut app = app().await;
        let click = MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column: 5,
            row: 5,
            modifiers: KeyModifiers::NONE,
        };
        handle_mouse_event(&mut app, click, 3);
        assert_eq!(app.selected_node_index, 1);
    }
}
