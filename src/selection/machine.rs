//! Drag-to-select state machine.

use thiserror::Error;

use crate::transform::{Document, ImagePixel, Point, Rect};

/// A side must be strictly longer than this (Image-Pixel units) before the
/// region may be sent for extraction.
pub const MIN_SELECTION_SIDE: f64 = 5.0;

/// Selection errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("No selection found. Please select a region first.")]
    NoPendingSelection,
    #[error("Selected region is too small ({width:.1}x{height:.1}). Please select a larger area.")]
    TooSmall { width: f64, height: f64 },
}

/// Current drag state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SelectionState {
    #[default]
    Idle,
    Dragging {
        anchor: Point<ImagePixel>,
        current: Point<ImagePixel>,
    },
    PendingExtraction(Rect<ImagePixel>),
}

/// A validated region ready to be sent to the extraction backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RegionRequest {
    pub bounds_image_pixel: Rect<ImagePixel>,
    pub bounds_document: Rect<Document>,
}

/// Captures one rectangle at a time from pointer events.
#[derive(Debug, Clone, Default)]
pub struct SelectionStateMachine {
    state: SelectionState,
}

impl SelectionStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Start a new drag. Any pending rectangle is discarded.
    pub fn pointer_down(&mut self, point: Point<ImagePixel>) {
        if let SelectionState::PendingExtraction(rect) = self.state {
            tracing::debug!("Discarding pending selection {}", rect);
        }
        self.state = SelectionState::Dragging {
            anchor: point,
            current: point,
        };
    }

    /// Move the free corner while dragging.
    pub fn pointer_move(&mut self, point: Point<ImagePixel>) {
        if let SelectionState::Dragging { current, .. } = &mut self.state {
            *current = point;
        }
    }

    /// Finish the drag and hold the normalized rectangle for extraction.
    pub fn pointer_up(&mut self) -> Option<Rect<ImagePixel>> {
        if let SelectionState::Dragging { anchor, current } = self.state {
            let rect = Rect::from_corners(anchor, current);
            self.state = SelectionState::PendingExtraction(rect);
            return Some(rect);
        }
        None
    }

    /// Rectangle being dragged or waiting for extraction.
    pub fn current_rect(&self) -> Option<Rect<ImagePixel>> {
        match self.state {
            SelectionState::Idle => None,
            SelectionState::Dragging { anchor, current } => Some(Rect::from_corners(anchor, current)),
            SelectionState::PendingExtraction(rect) => Some(rect),
        }
    }

    pub fn pending(&self) -> Option<Rect<ImagePixel>> {
        match self.state {
            SelectionState::PendingExtraction(rect) => Some(rect),
            _ => None,
        }
    }

    /// Validate the pending rectangle and convert it to Document space.
    /// Does not change state.
    pub fn request(&self, zoom: f64) -> Result<RegionRequest, SelectionError> {
        let rect = self.pending().ok_or(SelectionError::NoPendingSelection)?;
        if !rect.exceeds(MIN_SELECTION_SIDE) {
            return Err(SelectionError::TooSmall {
                width: rect.width,
                height: rect.height,
            });
        }
        Ok(RegionRequest {
            bounds_image_pixel: rect,
            bounds_document: rect.to_document(zoom),
        })
    }

    /// The pending region was extracted and recorded.
    pub fn complete(&mut self) {
        self.state = SelectionState::Idle;
    }

    pub fn cancel(&mut self) {
        self.state = SelectionState::Idle;
    }
}
