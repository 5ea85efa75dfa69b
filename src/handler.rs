use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;

use crate::app::{App, FocusPane, InputField, InputMode};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::BackTab => app.focus = app.focus.prev(),

        // Jump straight into an input
        KeyCode::Char('a') | KeyCode::Char('/') => {
            app.focus = FocusPane::ChatInput;
            app.input_mode = InputMode::Editing;
        }
        KeyCode::Char('w') => {
            app.focus = FocusPane::WebsiteInput;
            app.input_mode = InputMode::Editing;
        }

        KeyCode::Char('r') => app.refresh_websites(),

        _ => match app.focus {
            FocusPane::Transcript => handle_transcript_normal(app, key),
            FocusPane::Directory => handle_directory_normal(app, key),
            FocusPane::ChatInput | FocusPane::WebsiteInput => {
                if matches!(key.code, KeyCode::Enter | KeyCode::Char('i')) {
                    app.input_mode = InputMode::Editing;
                }
            }
        },
    }
}

fn handle_transcript_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),
        _ => {}
    }
}

fn handle_directory_normal(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => app.directory.highlight_next(),
        KeyCode::Char('k') | KeyCode::Up => app.directory.highlight_prev(),
        KeyCode::Enter | KeyCode::Char('l') | KeyCode::Right => {
            let index = app.directory.selected_index();
            app.select_website(index);
        }
        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            app.focus = app.focus.next();
            if !app.focus.is_input() {
                app.input_mode = InputMode::Normal;
            }
        }
        _ => match app.focus {
            FocusPane::ChatInput => handle_chat_editing(app, key),
            FocusPane::WebsiteInput => handle_website_editing(app, key),
            FocusPane::Transcript | FocusPane::Directory => {
                app.input_mode = InputMode::Normal;
            }
        },
    }
}

fn handle_chat_editing(app: &mut App, key: KeyEvent) {
    // The input is disabled until the pending reply settles
    if app.chat_in_flight() {
        return;
    }
    if key.code == KeyCode::Enter {
        app.submit_chat();
        return;
    }
    edit_input(&mut app.chat_input, key);
}

fn handle_website_editing(app: &mut App, key: KeyEvent) {
    if app.registration_in_flight() {
        return;
    }
    if key.code == KeyCode::Enter {
        app.submit_website();
        return;
    }
    if edit_input(&mut app.website_input, key) {
        app.website_input_changed();
    }
}

/// Apply a cursor or editing key. Returns true when the text changed.
fn edit_input(input: &mut InputField, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => {
            input.move_left();
            false
        }
        KeyCode::Right => {
            input.move_right();
            false
        }
        KeyCode::Home => {
            input.move_home();
            false
        }
        KeyCode::End => {
            input.move_end();
            false
        }
        KeyCode::Char(c) => {
            input.insert(c);
            true
        }
        _ => false,
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    // Position-based scrolling, independent of focus
    let in_transcript = app.transcript_area.is_some_and(|r| point_in_rect(x, y, r));
    let in_directory = app.directory_area.is_some_and(|r| point_in_rect(x, y, r));

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_transcript {
                app.scroll_down(3);
            } else if in_directory {
                app.directory.highlight_next();
            }
        }
        MouseEventKind::ScrollUp => {
            if in_transcript {
                app.scroll_up(3);
            } else if in_directory {
                app.directory.highlight_prev();
            }
        }
        _ => {}
    }
}
