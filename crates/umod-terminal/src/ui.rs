//! Renderable console components.

use umod_types::error::Result;

use crate::console::Console;
use crate::markup::{self, Span};

/// Identity of a component inside one output device. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(pub(crate) u64);

/// Handle to a live label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LabelHandle(pub(crate) ComponentId);

/// Handle to a live progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgressBarHandle(pub(crate) ComponentId);

impl LabelHandle {
    pub fn id(self) -> ComponentId {
        self.0
    }
}

impl ProgressBarHandle {
    pub fn id(self) -> ComponentId {
        self.0
    }
}

/// One unit of console output.
#[derive(Debug, Clone, PartialEq)]
pub enum UiComponent {
    /// Frozen text, pre-wrapped to the console width.
    StaticLine { rows: Vec<Vec<Span>> },
    /// Single-row text that may be replaced.
    Label { text: Vec<Span> },
    /// `[=====     ] 50%`
    ProgressBar { progress: f32, width: usize },
}

impl UiComponent {
    /// Wrap `text` to `columns` and freeze it.
    pub fn static_line(text: &str, columns: usize) -> Self {
        Self::StaticLine {
            rows: markup::wrap(&markup::parse(text), columns),
        }
    }

    pub fn label(text: &str) -> Self {
        Self::Label {
            text: markup::parse(text),
        }
    }

    pub fn progress_bar(width: usize) -> Self {
        Self::ProgressBar {
            progress: 0.0,
            width,
        }
    }

    /// Rows occupied on screen.
    pub fn height(&self) -> usize {
        match self {
            Self::StaticLine { rows } => rows.len(),
            Self::Label { .. } | Self::ProgressBar { .. } => 1,
        }
    }

    /// Draw at column 0, top row `y`. Rows outside the viewport are skipped,
    /// so `y` may be negative.
    pub fn render(&self, console: &mut dyn Console, y: i32) -> Result<()> {
        let (columns, viewport) = console.size();
        let visible = |row: i32| row >= 0 && row < i32::from(viewport);

        match self {
            Self::StaticLine { rows } => {
                for (i, spans) in rows.iter().enumerate() {
                    let row = y + i as i32;
                    if visible(row) {
                        console.draw(0, row as u16, spans)?;
                    }
                }
            },
            Self::Label { text } => {
                if visible(y) {
                    console.draw(0, y as u16, &markup::truncate(text, columns as usize))?;
                }
            },
            Self::ProgressBar { progress, width } => {
                if visible(y) {
                    console.draw(0, y as u16, &[Span::new(None, bar_text(*progress, *width))])?;
                }
            },
        }
        Ok(())
    }
}

/// Glyphs for a bar `width` cells wide at `progress` in [0, 1].
///
/// Fill count and percentage round half up.
pub fn bar_text(progress: f32, width: usize) -> String {
    let p = f64::from(progress.clamp(0.0, 1.0));
    let fill = ((p * width as f64 + 0.5).floor() as usize).min(width);
    let percent = (p * 100.0 + 0.5).floor() as u32;

    let mut s = String::with_capacity(width + 8);
    s.push('[');
    s.extend(std::iter::repeat_n('=', fill));
    s.extend(std::iter::repeat_n(' ', width - fill));
    s.push(']');
    s.push_str(&format!(" {percent}%"));
    s
}
