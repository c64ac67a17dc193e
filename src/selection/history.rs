//! Recorded selections, keyed by a monotonically increasing id.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::aggregate::ExtractionResult;
use crate::transform::{Document, ImagePixel, Rect};

/// Identifier of a recorded selection. Never reused within a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SelectionId(u64);

impl SelectionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SelectionId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for SelectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A region whose extraction succeeded. Immutable once recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    id: SelectionId,
    page_index: usize,
    bounds_image_pixel: Rect<ImagePixel>,
    bounds_document: Rect<Document>,
    result: ExtractionResult,
    captured_at: DateTime<Local>,
}

impl Selection {
    pub fn id(&self) -> SelectionId {
        self.id
    }

    pub fn page_index(&self) -> usize {
        self.page_index
    }

    pub fn bounds_image_pixel(&self) -> &Rect<ImagePixel> {
        &self.bounds_image_pixel
    }

    pub fn bounds_document(&self) -> &Rect<Document> {
        &self.bounds_document
    }

    pub fn result(&self) -> &ExtractionResult {
        &self.result
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.captured_at
    }
}

/// Ordered store of recorded selections.
#[derive(Debug, Clone)]
pub struct SelectionHistory {
    entries: BTreeMap<SelectionId, Selection>,
    next_id: u64,
}

impl Default for SelectionHistory {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl SelectionHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful extraction under a fresh id.
    pub fn record(
        &mut self,
        page_index: usize,
        bounds_image_pixel: Rect<ImagePixel>,
        bounds_document: Rect<Document>,
        result: ExtractionResult,
    ) -> &Selection {
        let id = SelectionId(self.next_id);
        self.next_id += 1;

        self.entries.entry(id).or_insert(Selection {
            id,
            page_index,
            bounds_image_pixel,
            bounds_document,
            result,
            captured_at: Local::now(),
        })
    }

    pub fn get(&self, id: SelectionId) -> Option<&Selection> {
        self.entries.get(&id)
    }

    pub fn remove(&mut self, id: SelectionId) -> Option<Selection> {
        self.entries.remove(&id)
    }

    /// Empty the history. Ids keep increasing afterwards.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Selections in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Selection> {
        self.entries.values()
    }

    /// Extraction results in recording order.
    pub fn results(&self) -> impl Iterator<Item = &ExtractionResult> {
        self.entries.values().map(Selection::result)
    }
}
