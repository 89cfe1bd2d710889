use serde::{Serialize, Deserialize};

/// Flat transform record derived from a clip's effect stack.
///
/// This is the fast-path view the live renderer composites with, and the
/// shape older project documents stored directly on clips before effect
/// stacks existed. It is always derived on demand from the canonical
/// ordered stack; nothing mutates a `Transform` in place except the
/// bridge fold itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transform {
    /// Uniform scale factor, 1.0 = native size.
    pub scale: f64,

    /// Offset from composition center, in pixels.
    pub position_x: f64,
    pub position_y: f64,

    /// Clockwise rotation in degrees.
    pub rotation: f64,

    /// 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f64,

    /// Gaussian blur sigma in pixels, 0 = off.
    pub blur: f64,

    /// Additive brightness, -1.0 to 1.0 around 0.
    pub brightness: f64,

    /// Multiplicative contrast around 1.0.
    pub contrast: f64,

    /// Multiplicative saturation around 1.0.
    pub saturation: f64,

    /// Grayscale mix amount, 0.0 to 1.0.
    pub grayscale: f64,

    /// Sepia mix amount, 0.0 to 1.0.
    pub sepia: f64,

    /// Hue rotation in degrees.
    pub hue_rotate: f64,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            scale: 1.0,
            position_x: 0.0,
            position_y: 0.0,
            rotation: 0.0,
            opacity: 1.0,
            blur: 0.0,
            brightness: 0.0,
            contrast: 1.0,
            saturation: 1.0,
            grayscale: 0.0,
            sepia: 0.0,
            hue_rotate: 0.0,
        }
    }
}

impl Transform {
    pub fn is_default(&self) -> bool {
        *self == Transform::default()
    }
}
