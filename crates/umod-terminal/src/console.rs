//! Console backends the output device draws through.

use umod_types::error::Result;

use crate::markup::{ConsoleColor, Span};

/// Minimum drawing surface the renderer needs.
pub trait Console {
    /// `(columns, viewport rows)` available to the renderer.
    fn size(&self) -> (u16, u16);

    /// Blank the whole viewport.
    fn clear(&mut self) -> Result<()>;

    /// Draw coloured spans starting at column `x`, row `y`, clipped to the
    /// viewport width.
    fn draw(&mut self, x: u16, y: u16, spans: &[Span]) -> Result<()>;

    /// Push any queued output to the device.
    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

type Cell = (char, Option<ConsoleColor>);

/// An in-memory console grid.
///
/// Used for headless sessions and for asserting what a render pass drew.
#[derive(Debug, Clone)]
pub struct BufferConsole {
    width: u16,
    height: u16,
    cells: Vec<Vec<Cell>>,
    clears: u64,
}

impl BufferConsole {
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: blank_grid(width, height),
            clears: 0,
        }
    }

    /// Text of row `y` with trailing blanks removed.
    pub fn row_text(&self, y: u16) -> String {
        self.cells
            .get(y as usize)
            .map(|row| {
                row.iter()
                    .map(|(c, _)| *c)
                    .collect::<String>()
                    .trim_end()
                    .to_string()
            })
            .unwrap_or_default()
    }

    /// Every row, top to bottom.
    pub fn rows(&self) -> Vec<String> {
        (0..self.height).map(|y| self.row_text(y)).collect()
    }

    /// Whether any row contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.rows().iter().any(|r| r.contains(needle))
    }

    /// Colour of the cell at `(x, y)`.
    pub fn color_at(&self, x: u16, y: u16) -> Option<ConsoleColor> {
        self.cells
            .get(y as usize)
            .and_then(|row| row.get(x as usize))
            .and_then(|(_, color)| *color)
    }

    /// How many times the grid has been cleared.
    pub fn clear_count(&self) -> u64 {
        self.clears
    }
}

fn blank_grid(width: u16, height: u16) -> Vec<Vec<Cell>> {
    vec![vec![(' ', None); width as usize]; height as usize]
}

impl Console for BufferConsole {
    fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn clear(&mut self) -> Result<()> {
        self.cells = blank_grid(self.width, self.height);
        self.clears += 1;
        Ok(())
    }

    fn draw(&mut self, x: u16, y: u16, spans: &[Span]) -> Result<()> {
        let Some(row) = self.cells.get_mut(y as usize) else {
            return Ok(());
        };
        let mut col = x as usize;
        for span in spans {
            for ch in span.text.chars() {
                match row.get_mut(col) {
                    Some(cell) => *cell = (ch, span.color),
                    None => return Ok(()),
                }
                col += 1;
            }
        }
        Ok(())
    }
}
