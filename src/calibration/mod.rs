//! Scale calibration: two-point, manual and preset.

mod engine;
mod presets;

pub use engine::{
    Axis, CalibrationEngine, CalibrationError, CalibrationMode, CalibrationPhase,
    CalibrationState, ScaleFactor, DEFAULT_PRECISION_DIGITS, DEFAULT_UNIT_LABEL,
};
pub use presets::{find_preset, ScalePreset, COMMON_SCALES};
