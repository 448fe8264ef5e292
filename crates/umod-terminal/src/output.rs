//! The scrollback renderer commands write through.

use std::collections::VecDeque;

use crate::console::Console;
use crate::ui::{ComponentId, LabelHandle, ProgressBarHandle, UiComponent};

/// Default gap between a progress bar and the right edge of the console.
pub const DEFAULT_PROGRESS_MARGIN: usize = 10;

/// Sink for command output.
///
/// Every write and every handle mutation repaints before it returns.
/// Mutations through a handle whose component has scrolled away return
/// `false` and change nothing.
pub trait OutputDevice {
    fn write_static_line(&mut self, text: &str);

    fn write_label(&mut self, text: &str) -> LabelHandle;

    fn write_progress_bar(&mut self) -> ProgressBarHandle;

    fn set_label_text(&mut self, label: LabelHandle, text: &str) -> bool;

    /// Set progress, clamped to [0, 1].
    fn set_progress(&mut self, bar: ProgressBarHandle, progress: f32) -> bool;

    fn set_progress_width(&mut self, bar: ProgressBarHandle, width: usize) -> bool;
}

/// Keeps the live components, oldest first, and repaints the console
/// viewport from them.
pub struct ConsoleOutputDevice<C: Console> {
    console: C,
    components: VecDeque<(ComponentId, UiComponent)>,
    total_height: usize,
    total_renders: u64,
    next_id: u64,
    progress_margin: usize,
}

impl<C: Console> ConsoleOutputDevice<C> {
    pub fn new(console: C) -> Self {
        Self::with_progress_margin(console, DEFAULT_PROGRESS_MARGIN)
    }

    pub fn with_progress_margin(console: C, progress_margin: usize) -> Self {
        Self {
            console,
            components: VecDeque::new(),
            total_height: 0,
            total_renders: 0,
            next_id: 0,
            progress_margin,
        }
    }

    /// Sum of the heights of all live components.
    pub fn total_height(&self) -> usize {
        self.total_height
    }

    /// Completed render passes.
    pub fn total_renders(&self) -> u64 {
        self.total_renders
    }

    /// Number of live components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Whether `id` still refers to a live component.
    pub fn is_live(&self, id: ComponentId) -> bool {
        self.find(id).is_some()
    }

    pub fn component(&self, id: ComponentId) -> Option<&UiComponent> {
        self.find(id)
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn console_mut(&mut self) -> &mut C {
        &mut self.console
    }

    /// Repaint the viewport, evicting components scrolled wholly above it.
    ///
    /// Console failures are logged; the component list is kept consistent
    /// either way.
    pub fn render(&mut self) {
        let cleared = self.console.clear();
        self.evict_scrolled_off();
        if let Err(e) = cleared.and_then(|()| self.draw_live()) {
            log::warn!("console render failed: {e}");
        }
        self.total_renders += 1;
    }

    fn viewport_rows(&self) -> i64 {
        i64::from(self.console.size().1)
    }

    fn evict_scrolled_off(&mut self) {
        let mut y = self.viewport_rows() - self.total_height as i64;
        let mut scrolled_off = 0;
        for (_, component) in &self.components {
            let height = component.height() as i64;
            if y + height > 0 {
                break;
            }
            y += height;
            scrolled_off += 1;
        }

        for (id, component) in self.components.drain(..scrolled_off) {
            log::trace!("evicting component {id:?}");
            self.total_height -= component.height();
        }
    }

    fn draw_live(&mut self) -> umod_types::Result<()> {
        let mut y = (self.viewport_rows() - self.total_height as i64).min(0);
        for (_, component) in &self.components {
            let top = i32::try_from(y).unwrap_or(i32::MIN);
            component.render(&mut self.console, top)?;
            y += component.height() as i64;
        }
        self.console.flush()
    }

    fn push(&mut self, component: UiComponent) -> ComponentId {
        let id = ComponentId(self.next_id);
        self.next_id += 1;
        self.total_height += component.height();
        self.components.push_back((id, component));
        self.render();
        id
    }

    fn find(&self, id: ComponentId) -> Option<&UiComponent> {
        self.components
            .iter()
            .find(|(cid, _)| *cid == id)
            .map(|(_, c)| c)
    }

    fn find_mut(&mut self, id: ComponentId) -> Option<&mut UiComponent> {
        self.components
            .iter_mut()
            .find(|(cid, _)| *cid == id)
            .map(|(_, c)| c)
    }

    fn columns(&self) -> usize {
        usize::from(self.console.size().0)
    }
}

impl<C: Console> OutputDevice for ConsoleOutputDevice<C> {
    fn write_static_line(&mut self, text: &str) {
        let columns = self.columns();
        self.push(UiComponent::static_line(text, columns));
    }

    fn write_label(&mut self, text: &str) -> LabelHandle {
        LabelHandle(self.push(UiComponent::label(text)))
    }

    fn write_progress_bar(&mut self) -> ProgressBarHandle {
        let width = self.columns().saturating_sub(self.progress_margin);
        ProgressBarHandle(self.push(UiComponent::progress_bar(width)))
    }

    fn set_label_text(&mut self, label: LabelHandle, text: &str) -> bool {
        match self.find_mut(label.0) {
            Some(UiComponent::Label { text: current }) => {
                *current = crate::markup::parse(text);
            },
            _ => return false,
        }
        self.render();
        true
    }

    fn set_progress(&mut self, bar: ProgressBarHandle, value: f32) -> bool {
        match self.find_mut(bar.0) {
            Some(UiComponent::ProgressBar { progress, .. }) => {
                *progress = if value.is_nan() {
                    0.0
                } else {
                    value.clamp(0.0, 1.0)
                };
            },
            _ => return false,
        }
        self.render();
        true
    }

    fn set_progress_width(&mut self, bar: ProgressBarHandle, value: usize) -> bool {
        match self.find_mut(bar.0) {
            Some(UiComponent::ProgressBar { width, .. }) => *width = value,
            _ => return false,
        }
        self.render();
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::BufferConsole;

    fn device(columns: u16, rows: u16) -> ConsoleOutputDevice<BufferConsole> {
        ConsoleOutputDevice::new(BufferConsole::new(columns, rows))
    }

    #[test]
    fn every_write_renders_once() {
        let mut out = device(20, 4);
        out.write_static_line("a");
        let label = out.write_label("b");
        let bar = out.write_progress_bar();
        assert_eq!(out.total_renders(), 3);
        out.set_label_text(label, "c");
        out.set_progress(bar, 0.3);
        out.set_progress_width(bar, 5);
        assert_eq!(out.total_renders(), 6);
        assert_eq!(out.console().clear_count(), 6);
    }

    #[test]
    fn short_content_is_drawn_from_the_top() {
        let mut out = device(20, 4);
        out.write_static_line("first");
        out.write_static_line("second");
        assert_eq!(out.console().rows(), vec!["first", "second", "", ""]);
    }

    #[test]
    fn scrolled_off_prefix_is_evicted() {
        let mut out = device(3, 4);
        out.write_static_line("a");
        out.write_static_line("b");
        out.write_static_line("cccdddeee");
        assert_eq!(out.len(), 2);
        assert_eq!(out.total_height(), 4);
        assert_eq!(out.console().rows(), vec!["b", "ccc", "ddd", "eee"]);
    }

    #[test]
    fn partially_visible_component_is_kept() {
        let mut out = device(3, 4);
        out.write_static_line("a");
        out.write_static_line("bbbcccdddeee");
        assert_eq!(out.len(), 1);
        out.write_static_line("f");
        assert_eq!(out.len(), 2);
        assert_eq!(out.total_height(), 5);
        assert_eq!(out.console().rows(), vec!["ccc", "ddd", "eee", "f"]);
    }

    #[test]
    fn tall_component_larger_than_viewport_shows_its_tail() {
        let mut out = device(2, 2);
        out.write_static_line("aabbccdd");
        assert_eq!(out.len(), 1);
        assert_eq!(out.total_height(), 4);
        assert_eq!(out.console().rows(), vec!["cc", "dd"]);
    }

    #[test]
    fn evicted_handle_is_a_noop_sink() {
        let mut out = device(20, 2);
        let label = out.write_label("old");
        out.write_static_line("x");
        out.write_static_line("y");
        assert!(!out.is_live(label.id()));

        let renders = out.total_renders();
        assert!(!out.set_label_text(label, "new"));
        assert_eq!(out.total_renders(), renders);
        assert!(!out.console().contains("new"));
    }

    #[test]
    fn label_mutation_repaints_in_place() {
        let mut out = device(20, 3);
        let label = out.write_label("Requesting");
        out.write_static_line("below");
        assert!(out.set_label_text(label, "$greenDownloading"));
        assert_eq!(out.console().rows(), vec!["Downloading", "below", ""]);
    }

    #[test]
    fn progress_bar_defaults_to_width_minus_margin() {
        let mut out = device(30, 3);
        let bar = out.write_progress_bar();
        assert_eq!(
            out.component(bar.id()),
            Some(&UiComponent::ProgressBar {
                progress: 0.0,
                width: 20
            })
        );
    }

    #[test]
    fn progress_bar_half_of_ten() {
        let mut out = device(30, 3);
        let bar = out.write_progress_bar();
        assert!(out.set_progress_width(bar, 10));
        assert!(out.set_progress(bar, 0.5));
        assert_eq!(out.console().row_text(0), "[=====     ] 50%");
    }

    #[test]
    fn progress_is_clamped() {
        let mut out = device(30, 3);
        let bar = out.write_progress_bar();
        out.set_progress(bar, 4.0);
        assert!(matches!(
            out.component(bar.id()),
            Some(UiComponent::ProgressBar { progress, .. }) if *progress == 1.0
        ));
        out.set_progress(bar, f32::NAN);
        assert!(matches!(
            out.component(bar.id()),
            Some(UiComponent::ProgressBar { progress, .. }) if *progress == 0.0
        ));
    }

    #[test]
    fn mutating_a_live_bar_renders() {
        let mut out = device(3, 2);
        let bar = out.write_progress_bar();
        out.write_static_line("b");
        assert!(out.is_live(bar.id()));
        let renders = out.total_renders();
        assert!(out.set_progress(bar, 1.0));
        assert_eq!(out.total_renders(), renders + 1);
    }

    #[test]
    fn y_offset_is_never_positive() {
        let mut out = device(4, 5);
        for i in 0..12 {
            out.write_static_line(&"x".repeat(i % 9));
            let viewport = 5_i64;
            let offset = (viewport - out.total_height() as i64).min(0);
            assert!(offset <= 0);
            // the oldest live component still reaches into the viewport
            let oldest = out.components.front().map_or(0, |(_, c)| c.height() as i64);
            assert!(offset + oldest > 0);
        }
    }

    #[test]
    fn colors_survive_rendering() {
        let mut out = device(10, 1);
        out.write_static_line("$redno");
        assert_eq!(
            out.console().color_at(0, 0),
            Some(crate::markup::ConsoleColor::Red)
        );
    }
}
