//! Pure conversions between coordinate spaces and unit bases.

mod space;
mod units;

pub use space::{
    to_document_space, CoordinateSpace, Document, ImagePixel, Point, RealWorld, Rect,
};
pub use units::{
    factor_from_real_value, format_display, page_unit_to_points, real_value_from_factor,
    suggest_page_unit, to_real_world, PageUnit, MAX_PRECISION_DIGITS, POINTS_PER_INCH,
    POINTS_PER_MM,
};
