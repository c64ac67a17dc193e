//! Standard drawing scales.

/// A fixed drawing scale: `pdf_points` on the page represent `real_value`
/// units in the real world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalePreset {
    pub label: &'static str,
    pub pdf_points: f64,
    pub real_value: f64,
    pub unit: &'static str,
}

impl ScalePreset {
    /// Real units per Document point.
    pub fn factor(&self) -> f64 {
        self.real_value / self.pdf_points
    }
}

const fn preset(
    label: &'static str,
    pdf_points: f64,
    real_value: f64,
    unit: &'static str,
) -> ScalePreset {
    ScalePreset {
        label,
        pdf_points,
        real_value,
        unit,
    }
}

/// Architectural scales (fraction of an inch per foot, 72 points per inch)
/// followed by engineering scales (one inch per N feet).
pub const COMMON_SCALES: [ScalePreset; 15] = [
    preset("1/8\" = 1'-0\"", 9.0, 1.0, "ft"),
    preset("1/4\" = 1'-0\"", 18.0, 1.0, "ft"),
    preset("3/8\" = 1'-0\"", 27.0, 1.0, "ft"),
    preset("1/2\" = 1'-0\"", 36.0, 1.0, "ft"),
    preset("3/4\" = 1'-0\"", 54.0, 1.0, "ft"),
    preset("1\" = 1'-0\"", 72.0, 1.0, "ft"),
    preset("1 1/2\" = 1'-0\"", 108.0, 1.0, "ft"),
    preset("3\" = 1'-0\"", 216.0, 1.0, "ft"),
    // Engineering
    preset("1\" = 10'", 72.0, 10.0, "ft"),
    preset("1\" = 20'", 72.0, 20.0, "ft"),
    preset("1\" = 30'", 72.0, 30.0, "ft"),
    preset("1\" = 40'", 72.0, 40.0, "ft"),
    preset("1\" = 50'", 72.0, 50.0, "ft"),
    preset("1\" = 60'", 72.0, 60.0, "ft"),
    preset("1\" = 100'", 72.0, 100.0, "ft"),
];

/// Look up a preset by its label (exact match, surrounding whitespace ignored).
pub fn find_preset(label: &str) -> Option<&'static ScalePreset> {
    let label = label.trim();
    COMMON_SCALES.iter().find(|p| p.label == label)
}
