//! Lightbox viewer state: which gallery entry is shown, and at what zoom.

use serde::Serialize;

/// Each zoom step multiplies or divides by this factor.
pub const ZOOM_STEP: u32 = 2;
pub const MIN_ZOOM: u32 = 1;
pub const MAX_ZOOM: u32 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Lightbox {
    open: bool,
    index: usize,
    zoom: u32,
}

impl Default for Lightbox {
    fn default() -> Self {
        Self {
            open: false,
            index: 0,
            zoom: MIN_ZOOM,
        }
    }
}

impl Lightbox {
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Index of the entry being shown (meaningful only while open)
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    /// Callers guarantee `index` is in range.
    pub(crate) fn show(&mut self, index: usize) {
        self.open = true;
        self.index = index;
        self.zoom = MIN_ZOOM;
    }

    /// Advance to the next entry, wrapping to the first.
    pub(crate) fn next(&mut self, len: usize) {
        if !self.open || len == 0 {
            return;
        }
        self.show((self.index + 1) % len);
    }

    /// Step back to the previous entry, wrapping to the last.
    pub(crate) fn previous(&mut self, len: usize) {
        if !self.open || len == 0 {
            return;
        }
        self.show((self.index + len - 1) % len);
    }

    pub fn zoom_in(&mut self) {
        if self.open {
            self.zoom = (self.zoom * ZOOM_STEP).min(MAX_ZOOM);
        }
    }

    pub fn zoom_out(&mut self) {
        if self.open {
            self.zoom = (self.zoom / ZOOM_STEP).max(MIN_ZOOM);
        }
    }

    pub fn reset_zoom(&mut self) {
        self.zoom = MIN_ZOOM;
    }

    /// Close the viewer. The last index is kept.
    pub fn close(&mut self) {
        self.open = false;
        self.zoom = MIN_ZOOM;
    }
}
