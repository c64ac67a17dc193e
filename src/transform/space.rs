//! Coordinate spaces and the geometry that lives in them.
//!
//! Every point and rectangle is tagged with the space it was captured in:
//! - **Image-Pixel**: pixels of the rendered page raster (already corrected
//!   for the on-screen display scale by the pointer mapping)
//! - **Document**: PDF points, i.e. Image-Pixel divided by the render zoom
//! - **Real-World**: distances in the calibrated unit (ft, m, ...)

use std::fmt;
use std::marker::PhantomData;

use serde::{Deserialize, Serialize};

/// Marker trait for a named coordinate space.
pub trait CoordinateSpace: Copy + Default + fmt::Debug + PartialEq {
    /// Human readable name used in logs.
    const NAME: &'static str;
}

/// Pixels of the rasterized page image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImagePixel;

/// PDF page coordinates (points).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Document;

/// Calibrated real-world units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RealWorld;

impl CoordinateSpace for ImagePixel {
    const NAME: &'static str = "image-pixel";
}

impl CoordinateSpace for Document {
    const NAME: &'static str = "document";
}

impl CoordinateSpace for RealWorld {
    const NAME: &'static str = "real-world";
}

/// A point in coordinate space `S`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Point<S: CoordinateSpace> {
    pub x: f64,
    pub y: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S: CoordinateSpace> Point<S> {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            space: PhantomData,
        }
    }

    /// Euclidean distance to another point in the same space.
    pub fn distance_to(&self, other: &Point<S>) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

impl Point<ImagePixel> {
    /// Divide both coordinates by the render zoom.
    pub fn to_document(&self, zoom: f64) -> Point<Document> {
        Point::new(self.x / zoom, self.y / zoom)
    }
}

impl<S: CoordinateSpace> fmt::Display for Point<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2}) [{}]", self.x, self.y, S::NAME)
    }
}

/// An axis-aligned rectangle in coordinate space `S`.
///
/// `width` and `height` are never negative: construct from two arbitrary
/// corners with [`Rect::from_corners`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Rect<S: CoordinateSpace> {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(skip)]
    space: PhantomData<S>,
}

impl<S: CoordinateSpace> Rect<S> {
    /// Create a rectangle from an origin and a size. Negative sizes are
    /// folded back so the origin becomes the min corner.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_corners(Point::new(x, y), Point::new(x + width, y + height))
    }

    /// Normalize two drag corners into min-corner and size.
    pub fn from_corners(a: Point<S>, b: Point<S>) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (b.x - a.x).abs(),
            height: (b.y - a.y).abs(),
            space: PhantomData,
        }
    }

    pub fn origin(&self) -> Point<S> {
        Point::new(self.x, self.y)
    }

    /// True when both sides are strictly larger than `min_side`.
    pub fn exceeds(&self, min_side: f64) -> bool {
        self.width > min_side && self.height > min_side
    }
}

impl Rect<ImagePixel> {
    /// Convert to Document space by dividing origin and size by the render
    /// zoom. The display scale never enters this conversion.
    pub fn to_document(&self, zoom: f64) -> Rect<Document> {
        Rect {
            x: self.x / zoom,
            y: self.y / zoom,
            width: self.width / zoom,
            height: self.height / zoom,
            space: PhantomData,
        }
    }
}

impl<S: CoordinateSpace> fmt::Display for Rect<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:.2}x{:.2} at ({:.2}, {:.2}) [{}]",
            self.width,
            self.height,
            self.x,
            self.y,
            S::NAME
        )
    }
}

/// Convert an Image-Pixel point to Document space.
pub fn to_document_space(point: Point<ImagePixel>, zoom: f64) -> Point<Document> {
    point.to_document(zoom)
}
