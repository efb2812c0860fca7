//! ---
//! pw_section: "03-cli-and-display"
//! pw_subsection: "module"
//! pw_type: "source"
//! pw_scope: "code"
//! pw_description: "Terminal status display for the running watcher."
//! pw_version: "v0.1.0"
//! pw_owner: "tbd"
//! ---
use std::io;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use proto_watch_core::StatusBoard;
use ratatui::backend::CrosstermBackend;
use ratatui::style::{Color, Style};
use ratatui::widgets::{Block, Borders, Padding, Paragraph};
use ratatui::{Frame, Terminal};

const TICK_RATE: Duration = Duration::from_millis(200);

/// Show the status display until the user quits. Blocking.
pub fn run(folder: &Path, status: &StatusBoard) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    crossterm::execute!(stdout, EnterAlternateScreen, Hide)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    let result = run_loop(&mut terminal, folder, status);
    cleanup_terminal(&mut terminal)?;
    result
}

fn cleanup_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    crossterm::execute!(terminal.backend_mut(), LeaveAlternateScreen, Show)?;
    terminal.show_cursor()?;
    Ok(())
}

fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    folder: &Path,
    status: &StatusBoard,
) -> Result<()> {
    loop {
        let text = status_text(folder, &status.get());
        terminal.draw(|frame| draw(frame, &text))?;
        if event::poll(TICK_RATE)? {
            if let Event::Key(key) = event::read()? {
                if is_quit(&key) {
                    break;
                }
            }
        }
    }
    Ok(())
}

fn is_quit(key: &KeyEvent) -> bool {
    if key.kind != KeyEventKind::Press {
        return false;
    }
    match key.code {
        KeyCode::Char('q') | KeyCode::Esc => true,
        KeyCode::Char('c') => key.modifiers.contains(KeyModifiers::CONTROL),
        _ => false,
    }
}

fn status_text(folder: &Path, status: &str) -> String {
    format!(
        "Monitoring folder: {}\nStatus: {}\n\nPress q to quit.",
        folder.display(),
        status
    )
}

fn draw(frame: &mut Frame, text: &str) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title("proto-watch")
        .padding(Padding::new(2, 2, 1, 1));
    let paragraph = Paragraph::new(text.to_owned())
        .block(block)
        .style(Style::default().fg(Color::Cyan));
    frame.render_widget(paragraph, frame.size());
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto_watch_core::INITIAL_STATUS;

    #[test]
    fn status_text_lists_folder_and_status() {
        let text = status_text(Path::new("models"), INITIAL_STATUS);
        assert_eq!(
            text,
            "Monitoring folder: models\nStatus: Watching for changes...\n\nPress q to quit."
        );
    }

    #[test]
    fn quit_keys() {
        let press = |code, modifiers| KeyEvent::new(code, modifiers);
        assert!(is_quit(&press(KeyCode::Char('q'), KeyModifiers::NONE)));
        assert!(is_quit(&press(KeyCode::Esc, KeyModifiers::NONE)));
        assert!(is_quit(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)));
        assert!(!is_quit(&press(KeyCode::Char('c'), KeyModifiers::NONE)));
        assert!(!is_quit(&press(KeyCode::Char('x'), KeyModifiers::NONE)));
    }
}
