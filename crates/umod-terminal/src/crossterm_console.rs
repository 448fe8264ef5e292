//! [`Console`] backed by crossterm on the process's stdout.

use std::io::{self, Stdout, Write};

use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{execute, queue};
use umod_types::error::{Result, UmodError};

use crate::console::Console;
use crate::markup::{ConsoleColor, Span};

/// Fallback when the terminal size cannot be queried (e.g. output piped).
const FALLBACK_SIZE: (u16, u16) = (80, 25);

/// A full-screen console on stdout.
///
/// The width is fixed at construction. The bottom row is kept free for the
/// interactive prompt, so the viewport is one row shorter than the terminal.
pub struct CrosstermConsole {
    out: Stdout,
    columns: u16,
    rows: u16,
}

impl CrosstermConsole {
    pub fn new() -> Self {
        let (columns, rows) = terminal::size().unwrap_or_else(|e| {
            log::warn!("terminal size unavailable ({e}), assuming 80x25");
            FALLBACK_SIZE
        });
        Self {
            out: io::stdout(),
            columns: columns.max(1),
            rows: rows.max(2),
        }
    }

    /// Draw the prompt on the reserved bottom row and leave the cursor
    /// after it.
    pub fn show_prompt(&mut self, spans: &[Span]) -> Result<()> {
        let y = self.rows - 1;
        queue!(self.out, MoveTo(0, y), Clear(ClearType::CurrentLine)).map_err(console_err)?;
        self.draw(0, y, spans)?;
        let end = crate::markup::visible_len(spans).min(self.columns as usize - 1) as u16;
        queue!(self.out, MoveTo(end, y)).map_err(console_err)?;
        self.flush()
    }

    /// Block until any key is pressed.
    pub fn wait_for_key(&mut self) -> Result<()> {
        terminal::enable_raw_mode().map_err(console_err)?;
        let result = loop {
            match event::read() {
                Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => break Ok(()),
                Ok(_) => continue,
                Err(e) => break Err(console_err(e)),
            }
        };
        terminal::disable_raw_mode().map_err(console_err)?;
        result
    }

    /// Move the cursor below everything drawn so far.
    pub fn park_cursor(&mut self) -> Result<()> {
        execute!(self.out, ResetColor, MoveTo(0, self.rows - 1), Print("\n")).map_err(console_err)
    }
}

impl Default for CrosstermConsole {
    fn default() -> Self {
        Self::new()
    }
}

impl Console for CrosstermConsole {
    fn size(&self) -> (u16, u16) {
        (self.columns, self.rows - 1)
    }

    fn clear(&mut self) -> Result<()> {
        queue!(self.out, ResetColor, Clear(ClearType::All)).map_err(console_err)
    }

    fn draw(&mut self, x: u16, y: u16, spans: &[Span]) -> Result<()> {
        queue!(self.out, MoveTo(x, y)).map_err(console_err)?;
        let mut left = self.columns.saturating_sub(x) as usize;
        for span in spans {
            if left == 0 {
                break;
            }
            let text: String = span.text.chars().take(left).collect();
            left -= text.chars().count();
            match span.color {
                Some(c) => queue!(self.out, SetForegroundColor(to_crossterm(c)), Print(text)),
                None => queue!(self.out, ResetColor, Print(text)),
            }
            .map_err(console_err)?;
        }
        queue!(self.out, ResetColor).map_err(console_err)
    }

    fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

fn to_crossterm(color: ConsoleColor) -> Color {
    match color {
        ConsoleColor::Black => Color::Black,
        ConsoleColor::DarkBlue => Color::DarkBlue,
        ConsoleColor::DarkGreen => Color::DarkGreen,
        ConsoleColor::DarkCyan => Color::DarkCyan,
        ConsoleColor::DarkRed => Color::DarkRed,
        ConsoleColor::DarkMagenta => Color::DarkMagenta,
        ConsoleColor::DarkYellow => Color::DarkYellow,
        ConsoleColor::Gray => Color::Grey,
        ConsoleColor::DarkGray => Color::DarkGrey,
        ConsoleColor::Blue => Color::Blue,
        ConsoleColor::Green => Color::Green,
        ConsoleColor::Cyan => Color::Cyan,
        ConsoleColor::Red => Color::Red,
        ConsoleColor::Magenta => Color::Magenta,
        ConsoleColor::Yellow => Color::Yellow,
        ConsoleColor::White => Color::White,
    }
}

fn console_err(e: io::Error) -> UmodError {
    UmodError::Console(e.to_string())
}
