//! Pointer-driven widget repositioning.
//!
//! Pure geometry: pointer events in, clamped positions out. The
//! controller persists the final position on release; intermediate
//! positions are display-only.

use pagebot_core::WidgetPosition;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

/// Where a pointer gesture originated. Gestures from buttons and inputs
/// are ignored so clicks keep their click semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragSurface {
    Header,
    PrePrompt,
    Control,
}

#[derive(Debug, Clone, Copy)]
struct ActiveDrag {
    pointer_start: Point,
    top_start: f64,
    left_start: f64,
    last: Option<(f64, f64)>,
}

pub struct DragManager {
    viewport: Size,
    widget: Size,
    active: Option<ActiveDrag>,
}

impl DragManager {
    pub fn new(viewport: Size, widget: Size) -> Self {
        Self {
            viewport,
            widget,
            active: None,
        }
    }

    pub fn set_viewport(&mut self, viewport: Size) {
        self.viewport = viewport;
    }

    fn clamp(&self, top: f64, left: f64) -> (f64, f64) {
        let max_top = (self.viewport.height - self.widget.height).max(0.0);
        let max_left = (self.viewport.width - self.widget.width).max(0.0);
        (top.clamp(0.0, max_top), left.clamp(0.0, max_left))
    }

    /// Begin a gesture. Captures the widget's current resolved offset and
    /// the pointer position. Returns false (and stays idle) for gestures
    /// originating on a control.
    pub fn press(&mut self, surface: DragSurface, position: &WidgetPosition, pointer: Point) -> bool {
        if surface == DragSurface::Control {
            return false;
        }
        let (top, left) = position.resolve(
            self.viewport.width,
            self.viewport.height,
            self.widget.width,
            self.widget.height,
        );
        self.active = Some(ActiveDrag {
            pointer_start: pointer,
            top_start: top,
            left_start: left,
            last: None,
        });
        true
    }

    /// Track pointer motion. The first motion switches the widget from
    /// corner-anchored to absolute coordinates; every returned position is
    /// clamped on-screen.
    pub fn motion(&mut self, pointer: Point) -> Option<WidgetPosition> {
        let drag = self.active.as_mut()?;
        let top = drag.top_start + (pointer.y - drag.pointer_start.y);
        let left = drag.left_start + (pointer.x - drag.pointer_start.x);
        let max_top = (self.viewport.height - self.widget.height).max(0.0);
        let max_left = (self.viewport.width - self.widget.width).max(0.0);
        let clamped = (top.clamp(0.0, max_top), left.clamp(0.0, max_left));
        drag.last = Some(clamped);
        Some(WidgetPosition::Absolute {
            top: clamped.0,
            left: clamped.1,
        })
    }

    /// End the gesture. Returns the final position to persist, or None if
    /// the pointer never moved (a plain click on the header).
    pub fn release(&mut self) -> Option<WidgetPosition> {
        let drag = self.active.take()?;
        drag.last
            .map(|(top, left)| WidgetPosition::Absolute { top, left })
    }
}
