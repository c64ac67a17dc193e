//! Unit bases and the scalar conversions between them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// PDF points per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// PDF points per millimeter.
pub const POINTS_PER_MM: f64 = 2.83495;

/// Highest number of decimals shown to the user.
pub const MAX_PRECISION_DIGITS: u8 = 4;

/// Physical unit a manual or preset scale ratio is expressed against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PageUnit {
    #[default]
    #[serde(rename = "in")]
    Inch,
    #[serde(rename = "mm")]
    Millimeter,
}

impl PageUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageUnit::Inch => "in",
            PageUnit::Millimeter => "mm",
        }
    }
}

impl fmt::Display for PageUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PageUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "in" | "inch" | "inches" => Ok(PageUnit::Inch),
            "mm" | "millimeter" | "millimeters" => Ok(PageUnit::Millimeter),
            other => Err(format!("Unknown page unit: {}", other)),
        }
    }
}

/// PDF points per one page unit.
pub fn page_unit_to_points(unit: PageUnit) -> f64 {
    match unit {
        PageUnit::Inch => POINTS_PER_INCH,
        PageUnit::Millimeter => POINTS_PER_MM,
    }
}

/// Real units per Document point, given the real value that one page unit
/// represents.
pub fn factor_from_real_value(real_value: f64, page_unit: PageUnit) -> f64 {
    real_value / page_unit_to_points(page_unit)
}

/// Inverse of [`factor_from_real_value`].
pub fn real_value_from_factor(factor: f64, page_unit: PageUnit) -> f64 {
    factor * page_unit_to_points(page_unit)
}

/// Divide a Document distance by a calibration factor.
pub fn to_real_world(distance_document: f64, pixels_per_unit: f64) -> f64 {
    distance_document / pixels_per_unit
}

/// Suggest a page-unit basis for a display unit label.
///
/// Metric labels suggest millimeters, everything else inches. This is only a
/// default offered when the label changes; callers may keep any combination.
pub fn suggest_page_unit(unit_label: &str) -> PageUnit {
    match unit_label.trim() {
        "m" | "mm" | "cm" => PageUnit::Millimeter,
        _ => PageUnit::Inch,
    }
}

/// Format a value for display: rounded to `precision_digits` decimals with
/// trailing zeros trimmed. Non-finite values render as an empty string.
pub fn format_display(value: f64, precision_digits: u8) -> String {
    if !value.is_finite() {
        return String::new();
    }

    let digits = usize::from(precision_digits.min(MAX_PRECISION_DIGITS));
    let mut text = format!("{:.*}", digits, value);
    if text.contains('.') {
        let trimmed = text.trim_end_matches('0').trim_end_matches('.').len();
        text.truncate(trimmed);
    }
    if text == "-0" {
        text = "0".to_string();
    }
    text
}
