//! Pixel to real-unit calibration.
//!
//! A calibration factor can be derived three ways:
//! - **Two-point**: click two points on the page and enter the real distance
//!   between them
//! - **Manual**: enter the real value that one page unit (inch or mm) stands for
//! - **Preset**: pick a standard drawing scale from [`COMMON_SCALES`]
//!
//! Every rejected input leaves the live [`CalibrationState`] untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::presets::{find_preset, ScalePreset, COMMON_SCALES};
use crate::transform::{
    factor_from_real_value, format_display, real_value_from_factor, suggest_page_unit,
    to_real_world, Document, ImagePixel, PageUnit, Point, MAX_PRECISION_DIGITS,
};

/// Default display unit.
pub const DEFAULT_UNIT_LABEL: &str = "ft";

/// Default number of decimals in user-facing values.
pub const DEFAULT_PRECISION_DIGITS: u8 = 2;

/// Calibration errors. All of them are input errors: the caller may retry
/// immediately.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("Two calibration points are required, {0} placed")]
    IncompletePoints(usize),
    #[error("Calibration points coincide, pick two distinct points")]
    ZeroLengthSegment,
    #[error("Invalid distance {0:?}: enter a positive number")]
    InvalidDistance(String),
    #[error("Invalid scale value {0:?}: enter a positive number")]
    InvalidRealValue(String),
    #[error("Calibration factor must be positive and finite, got {0}")]
    InvalidFactor(f64),
    #[error("Unknown scale preset: {0}")]
    UnknownPreset(String),
    #[error("Precision must be between 0 and {max} digits, got {0}", max = MAX_PRECISION_DIGITS)]
    InvalidPrecision(u8),
}

/// How the active factor was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CalibrationMode {
    /// Two clicked points and a known distance
    #[default]
    TwoPoint,
    /// Real value per page unit typed by the user
    Manual,
    /// Standard drawing scale from the preset table
    Preset,
}

/// Axis of a calibration factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
}

/// Per-axis calibration factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScaleFactor {
    pub x: f64,
    pub y: f64,
}

impl ScaleFactor {
    pub fn uniform(factor: f64) -> Self {
        Self {
            x: factor,
            y: factor,
        }
    }

    pub fn get(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    fn is_valid(&self) -> bool {
        [self.x, self.y].iter().all(|f| f.is_finite() && *f > 0.0)
    }
}

/// The live calibration.
///
/// Two-point factors are Document units per real unit; manual and preset
/// factors are real units per Document point. [`CalibrationState::mode`]
/// records which reading applies, and the conversion helpers honor it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationState {
    pub mode: CalibrationMode,
    pub pixels_per_unit: Option<ScaleFactor>,
    pub unit_label: String,
    pub page_unit_basis: PageUnit,
    pub separate_axes: bool,
    pub precision_digits: u8,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            mode: CalibrationMode::TwoPoint,
            pixels_per_unit: None,
            unit_label: DEFAULT_UNIT_LABEL.to_string(),
            page_unit_basis: PageUnit::Inch,
            separate_axes: false,
            precision_digits: DEFAULT_PRECISION_DIGITS,
        }
    }
}

impl CalibrationState {
    /// Set the display unit, taking the suggested page-unit basis with it.
    pub fn with_unit_label(mut self, unit_label: impl Into<String>) -> Self {
        self.unit_label = unit_label.into();
        self.page_unit_basis = suggest_page_unit(&self.unit_label);
        self
    }

    pub fn with_precision_digits(mut self, digits: u8) -> Self {
        self.precision_digits = digits.min(MAX_PRECISION_DIGITS);
        self
    }

    pub fn is_calibrated(&self) -> bool {
        self.pixels_per_unit.is_some()
    }

    /// Real units per Document point along `axis`, whatever the mode.
    pub fn real_per_point(&self, axis: Axis) -> Option<f64> {
        let factor = self.pixels_per_unit?.get(axis);
        Some(match self.mode {
            CalibrationMode::TwoPoint => 1.0 / factor,
            CalibrationMode::Manual | CalibrationMode::Preset => factor,
        })
    }

    /// Convert a Document-space distance along `axis` to real units.
    pub fn to_real_world(&self, distance_document: f64, axis: Axis) -> Option<f64> {
        let factor = self.pixels_per_unit?.get(axis);
        Some(match self.mode {
            CalibrationMode::TwoPoint => to_real_world(distance_document, factor),
            CalibrationMode::Manual | CalibrationMode::Preset => distance_document * factor,
        })
    }

    /// Real distance between two Document points, scaling each axis by its
    /// own factor.
    pub fn measure(&self, a: &Point<Document>, b: &Point<Document>) -> Option<f64> {
        let dx = self.to_real_world((b.x - a.x).abs(), Axis::X)?;
        let dy = self.to_real_world((b.y - a.y).abs(), Axis::Y)?;
        Some(dx.hypot(dy))
    }

    /// Real value represented by one page unit along `axis`.
    pub fn real_value_per_page_unit(&self, axis: Axis) -> Option<f64> {
        self.real_per_point(axis)
            .map(|factor| real_value_from_factor(factor, self.page_unit_basis))
    }

    /// Format a value with the configured precision.
    pub fn format(&self, value: f64) -> String {
        format_display(value, self.precision_digits)
    }

    /// User-facing scale echo, e.g. `1 in = 20 ft`.
    pub fn describe(&self) -> String {
        let Some(x) = self.real_value_per_page_unit(Axis::X) else {
            return "Not calibrated".to_string();
        };
        let mut text = format!(
            "1 {} = {} {}",
            self.page_unit_basis,
            self.format(x),
            self.unit_label
        );
        if let Some(y) = self.real_value_per_page_unit(Axis::Y) {
            if self.separate_axes || y != x {
                text = format!(
                    "X: {}, Y: 1 {} = {} {}",
                    text,
                    self.page_unit_basis,
                    self.format(y),
                    self.unit_label
                );
            }
        }
        text
    }
}

/// Where the two-point flow stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationPhase {
    /// No point placed
    Idle,
    /// One point placed
    AwaitingSecondPoint,
    /// Both points placed, waiting for the real distance
    AwaitingDistanceInput,
}

/// Owns the live [`CalibrationState`] and the pending two-point clicks.
#[derive(Debug, Clone, Default)]
pub struct CalibrationEngine {
    state: CalibrationState,
    pending: Vec<Point<ImagePixel>>,
}

impl CalibrationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a previously saved state. Stored factors must be positive.
    pub fn with_state(state: CalibrationState) -> Result<Self, CalibrationError> {
        if let Some(factor) = state.pixels_per_unit {
            if !factor.is_valid() {
                return Err(CalibrationError::InvalidFactor(factor.x.min(factor.y)));
            }
        }
        if state.precision_digits > MAX_PRECISION_DIGITS {
            return Err(CalibrationError::InvalidPrecision(state.precision_digits));
        }
        Ok(Self {
            state,
            pending: Vec::new(),
        })
    }

    pub fn state(&self) -> &CalibrationState {
        &self.state
    }

    pub fn pending_points(&self) -> &[Point<ImagePixel>] {
        &self.pending
    }

    pub fn phase(&self) -> CalibrationPhase {
        match self.pending.len() {
            0 => CalibrationPhase::Idle,
            1 => CalibrationPhase::AwaitingSecondPoint,
            _ => CalibrationPhase::AwaitingDistanceInput,
        }
    }

    /// Record a click. Ignored once two points are waiting for a distance.
    pub fn add_point(&mut self, point: Point<ImagePixel>) -> CalibrationPhase {
        if self.pending.len() < 2 {
            self.pending.push(point);
            tracing::debug!("Calibration point {} at {}", self.pending.len(), point);
        }
        self.phase()
    }

    /// Drop any pending points.
    pub fn reset_points(&mut self) {
        self.pending.clear();
    }

    /// Pixel distance between the two pending points.
    pub fn pending_distance_pixels(&self) -> Option<f64> {
        match self.pending.as_slice() {
            [p1, p2] => Some(p1.distance_to(p2)),
            _ => None,
        }
    }

    /// Resolve the two pending points against a user-entered real distance.
    ///
    /// On success the factor is `distance_document / distance` on both axes
    /// and the pending points are cleared. On failure nothing changes.
    pub fn apply_distance(
        &mut self,
        input: &str,
        zoom: f64,
    ) -> Result<ScaleFactor, CalibrationError> {
        let distance_pixels = self
            .pending_distance_pixels()
            .ok_or(CalibrationError::IncompletePoints(self.pending.len()))?;
        if distance_pixels == 0.0 {
            return Err(CalibrationError::ZeroLengthSegment);
        }
        let distance_real = parse_positive(input)
            .ok_or_else(|| CalibrationError::InvalidDistance(input.trim().to_string()))?;

        let distance_document = distance_pixels / zoom;
        let factor = ScaleFactor::uniform(distance_document / distance_real);
        self.replace(CalibrationMode::TwoPoint, factor, None)?;
        self.pending.clear();

        tracing::info!(
            "Calibrated from two points: {:.2}px ({:.2}pt) = {} {}",
            distance_pixels,
            distance_document,
            distance_real,
            self.state.unit_label
        );
        Ok(factor)
    }

    /// Apply a manual "one page unit equals `input` real units" figure.
    ///
    /// Without separate axes both factors follow the edit. With separate axes
    /// only the edited axis changes and the other keeps its current value
    /// (or takes the same value when nothing was calibrated yet).
    pub fn apply_manual(&mut self, input: &str, axis: Axis) -> Result<ScaleFactor, CalibrationError> {
        let real_value = parse_positive(input)
            .ok_or_else(|| CalibrationError::InvalidRealValue(input.trim().to_string()))?;
        let factor = factor_from_real_value(real_value, self.state.page_unit_basis);

        let factor = if self.state.separate_axes {
            let other = |other_axis| self.state.real_per_point(other_axis).unwrap_or(factor);
            match axis {
                Axis::X => ScaleFactor {
                    x: factor,
                    y: other(Axis::Y),
                },
                Axis::Y => ScaleFactor {
                    x: other(Axis::X),
                    y: factor,
                },
            }
        } else {
            ScaleFactor::uniform(factor)
        };

        self.replace(CalibrationMode::Manual, factor, None)?;
        tracing::info!(
            "Manual scale: 1 {} = {} {} ({:?})",
            self.state.page_unit_basis,
            real_value,
            self.state.unit_label,
            axis
        );
        Ok(factor)
    }

    /// Apply the preset at `index` in [`COMMON_SCALES`].
    pub fn apply_preset(&mut self, index: usize) -> Result<&'static ScalePreset, CalibrationError> {
        let preset = COMMON_SCALES
            .get(index)
            .ok_or_else(|| CalibrationError::UnknownPreset(index.to_string()))?;
        self.apply_scale_preset(preset)?;
        Ok(preset)
    }

    /// Apply the preset whose label matches.
    pub fn apply_preset_label(
        &mut self,
        label: &str,
    ) -> Result<&'static ScalePreset, CalibrationError> {
        let preset =
            find_preset(label).ok_or_else(|| CalibrationError::UnknownPreset(label.to_string()))?;
        self.apply_scale_preset(preset)?;
        Ok(preset)
    }

    fn apply_scale_preset(&mut self, preset: &ScalePreset) -> Result<(), CalibrationError> {
        self.replace(
            CalibrationMode::Preset,
            ScaleFactor::uniform(preset.factor()),
            Some(preset.unit),
        )?;
        tracing::info!("Applied preset scale {}", preset.label);
        Ok(())
    }

    /// Change the display unit. Returns the page-unit basis suggested for it,
    /// which becomes the current basis.
    pub fn set_unit_label(&mut self, unit_label: &str) -> PageUnit {
        let unit_label = unit_label.trim();
        self.state.unit_label = unit_label.to_string();
        self.state.page_unit_basis = suggest_page_unit(unit_label);
        self.state.page_unit_basis
    }

    pub fn set_page_unit(&mut self, page_unit: PageUnit) {
        self.state.page_unit_basis = page_unit;
    }

    /// Toggle independent Y editing. Turning it off makes Y mirror X again.
    pub fn set_separate_axes(&mut self, separate: bool) {
        self.state.separate_axes = separate;
        if !separate {
            if let Some(factor) = self.state.pixels_per_unit.as_mut() {
                factor.y = factor.x;
            }
        }
    }

    pub fn set_precision_digits(&mut self, digits: u8) -> Result<(), CalibrationError> {
        if digits > MAX_PRECISION_DIGITS {
            return Err(CalibrationError::InvalidPrecision(digits));
        }
        self.state.precision_digits = digits;
        Ok(())
    }

    /// Swap in a new state built from the current one. The factor is
    /// validated before anything is written.
    fn replace(
        &mut self,
        mode: CalibrationMode,
        factor: ScaleFactor,
        unit_label: Option<&str>,
    ) -> Result<(), CalibrationError> {
        if !factor.is_valid() {
            return Err(CalibrationError::InvalidFactor(factor.x.min(factor.y)));
        }
        let mut next = self.state.clone();
        next.mode = mode;
        next.pixels_per_unit = Some(factor);
        if let Some(label) = unit_label {
            next.unit_label = label.to_string();
        }
        self.state = next;
        Ok(())
    }
}

/// Parse user input as a strictly positive, finite number.
fn parse_positive(input: &str) -> Option<f64> {
    input
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v > 0.0)
}
