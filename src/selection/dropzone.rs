use crate::events::{EventSink, UploaderEvent};
use crate::files::{Normalizer, RawItem};
use crate::selection::{AppendOutcome, SelectionState};

/// The area files can be dropped on.
pub trait DropRegion<P> {
    fn contains_point(&self, point: &P) -> bool;
}

impl DropRegion<egui::Pos2> for egui::Rect {
    fn contains_point(&self, point: &egui::Pos2) -> bool {
        self.contains(*point)
    }
}

/// Tracks whether files are being dragged over the drop region.
#[derive(Debug)]
pub struct DragController {
    is_dragging: bool,
    multiple: bool,
    events: EventSink,
}

impl DragController {
    pub fn new(multiple: bool, events: EventSink) -> Self {
        Self {
            is_dragging: false,
            multiple,
            events,
        }
    }

    pub fn is_dragging(&self) -> bool {
        self.is_dragging
    }

    pub fn on_drag_enter(&mut self) {
        if !self.is_dragging {
            self.is_dragging = true;
            self.events.emit(UploaderEvent::FileDragOver);
        }
    }

    /// Leaving towards something still inside the region (a child) keeps the flag set.
    pub fn on_drag_leave<P, R: DropRegion<P>>(&mut self, region: &R, related: Option<&P>) {
        if related.is_some_and(|target| region.contains_point(target)) {
            return;
        }
        if self.is_dragging {
            self.is_dragging = false;
            self.events.emit(UploaderEvent::FileDragLeave);
        }
    }

    /// Filters the dropped items, applies the single-file policy and appends to the selection.
    pub fn on_drop(
        &mut self,
        items: Vec<RawItem>,
        normalizer: &Normalizer,
        selection: &mut SelectionState,
    ) -> AppendOutcome {
        self.is_dragging = false;
        self.events.emit(UploaderEvent::FileDrop { count: items.len() });

        let mut files = normalizer.normalize_all(items, &self.events);
        if !self.multiple && files.len() > 1 {
            for extra in files.drain(1..) {
                normalizer.blobs().revoke(&extra.content_url);
            }
        }

        selection.confirm(files)
    }
}
