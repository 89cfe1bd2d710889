use std::collections::HashMap;
use once_cell::sync::Lazy;
use montage_types::AppliedEffect;

/// Tolerance used when deciding whether a parameter sits at its default.
pub const PARAM_EPSILON: f64 = 0.001;

/// Effect kinds whose external-tool syntax is not a flat key=value list
/// and therefore carry a hand-written compilation template.
///
/// Everything else goes through the data-driven generic mapping; adding a
/// generic effect means adding one descriptor, no new code branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    Scale,
    Position,
    Rotation,
    Opacity,
    Grayscale,
    Sharpen,
    Sepia,
    PlaybackSpeed,
    FadeIn,
    FadeOut,
    CrossDissolve,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectCategory {
    Transform,
    Color,
    Blur,
    Stylize,
    Transition,
    Time,
    Audio,
}

/// One parameter of an effect kind.
///
/// `min`/`max`/`step` are advisory for UI sliders; engine and compiler
/// still clamp to `[min, max]` before emitting external filter syntax.
/// `default` is always the identity value — an effect whose parameters
/// all sit at defaults compiles to nothing.
#[derive(Debug, Clone, Copy)]
pub struct ParamDef {
    pub id: &'static str,

    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub default: f64,

    /// Option name the external filter expects for this parameter.
    pub ffmpeg_name: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub enum FilterMapping {
    /// Hand-written template keyed by the closed builtin sum type.
    Custom(BuiltinKind),
    /// `filter=opt1=v1:opt2=v2…`, parameters at default skipped.
    Generic { filter: &'static str },
}

/// Immutable definition of one effect kind.
#[derive(Debug, Clone, Copy)]
pub struct EffectDescriptor {
    pub id: &'static str,

    pub name: &'static str,

    pub category: EffectCategory,

    pub params: &'static [ParamDef],

    pub mapping: FilterMapping,

    /// Whether this effect contributes to the audio chain instead of the
    /// video chain.
    pub audio: bool,
}

impl EffectDescriptor {
    pub fn param(&self, id: &str) -> Option<&ParamDef> {
        self.params.iter().find(|p| p.id == id)
    }

    /// Current value of a parameter on an applied instance, falling back
    /// to the descriptor default, clamped to the declared range.
    pub fn value_of(&self, effect: &AppliedEffect, param_id: &str) -> f64 {
        let def = match self.param(param_id) {
            Some(p) => p,
            None => return 0.0,
        };
        let raw = effect.parameter(param_id).unwrap_or(def.default);
        raw.clamp(def.min, def.max)
    }

    /// Like `value_of` but sampling keyframes at a clip-relative time.
    pub fn value_of_at(&self, effect: &AppliedEffect, param_id: &str, time: f64) -> f64 {
        let def = match self.param(param_id) {
            Some(p) => p,
            None => return 0.0,
        };
        let raw = effect.value_at(param_id, time).unwrap_or(def.default);
        raw.clamp(def.min, def.max)
    }

    /// True when every declared parameter sits at its default value, i.e.
    /// the applied effect is a no-op.
    pub fn is_default(&self, effect: &AppliedEffect) -> bool {
        self.params
            .iter()
            .all(|p| (self.value_of(effect, p.id) - p.default).abs() < PARAM_EPSILON)
    }
}

macro_rules! param {
    ($id:expr, $min:expr, $max:expr, $step:expr, $default:expr, $ffmpeg:expr) => {
        ParamDef {
            id: $id,
            min: $min,
            max: $max,
            step: $step,
            default: $default,
            ffmpeg_name: $ffmpeg,
        }
    };
}

static DESCRIPTORS: &[EffectDescriptor] = &[
    EffectDescriptor {
        id: "scale",
        name: "Scale",
        category: EffectCategory::Transform,
        params: &[param!("scale", 0.1, 10.0, 0.01, 1.0, "")],
        mapping: FilterMapping::Custom(BuiltinKind::Scale),
        audio: false,
    },
    EffectDescriptor {
        id: "position",
        name: "Position",
        category: EffectCategory::Transform,
        params: &[
            param!("positionX", -3840.0, 3840.0, 1.0, 0.0, ""),
            param!("positionY", -2160.0, 2160.0, 1.0, 0.0, ""),
        ],
        mapping: FilterMapping::Custom(BuiltinKind::Position),
        audio: false,
    },
    EffectDescriptor {
        id: "rotation",
        name: "Rotation",
        category: EffectCategory::Transform,
        params: &[param!("degrees", -360.0, 360.0, 1.0, 0.0, "")],
        mapping: FilterMapping::Custom(BuiltinKind::Rotation),
        audio: false,
    },
    EffectDescriptor {
        id: "opacity",
        name: "Opacity",
        category: EffectCategory::Transform,
        params: &[param!("opacity", 0.0, 1.0, 0.01, 1.0, "")],
        mapping: FilterMapping::Custom(BuiltinKind::Opacity),
        audio: false,
    },
    EffectDescriptor {
        id: "crop",
        name: "Crop",
        category: EffectCategory::Transform,
        params: &[
            param!("width", 0.0, 7680.0, 1.0, 0.0, "w"),
            param!("height", 0.0, 4320.0, 1.0, 0.0, "h"),
            param!("x", 0.0, 7680.0, 1.0, 0.0, "x"),
            param!("y", 0.0, 4320.0, 1.0, 0.0, "y"),
        ],
        mapping: FilterMapping::Generic { filter: "crop" },
        audio: false,
    },
    EffectDescriptor {
        id: "brightness",
        name: "Brightness",
        category: EffectCategory::Color,
        params: &[param!("brightness", -1.0, 1.0, 0.01, 0.0, "brightness")],
        mapping: FilterMapping::Generic { filter: "eq" },
        audio: false,
    },
    EffectDescriptor {
        id: "contrast",
        name: "Contrast",
        category: EffectCategory::Color,
        params: &[param!("contrast", 0.0, 4.0, 0.01, 1.0, "contrast")],
        mapping: FilterMapping::Generic { filter: "eq" },
        audio: false,
    },
    EffectDescriptor {
        id: "saturation",
        name: "Saturation",
        category: EffectCategory::Color,
        params: &[param!("saturation", 0.0, 3.0, 0.01, 1.0, "saturation")],
        mapping: FilterMapping::Generic { filter: "eq" },
        audio: false,
    },
    EffectDescriptor {
        id: "exposure",
        name: "Exposure",
        category: EffectCategory::Color,
        params: &[param!("exposure", -3.0, 3.0, 0.01, 0.0, "exposure")],
        mapping: FilterMapping::Generic { filter: "exposure" },
        audio: false,
    },
    EffectDescriptor {
        id: "color_temperature",
        name: "Color Temperature",
        category: EffectCategory::Color,
        params: &[param!("temperature", 1000.0, 40000.0, 50.0, 6500.0, "temperature")],
        mapping: FilterMapping::Generic { filter: "colortemperature" },
        audio: false,
    },
    EffectDescriptor {
        id: "hue_rotate",
        name: "Hue Rotate",
        category: EffectCategory::Color,
        params: &[param!("degrees", -360.0, 360.0, 1.0, 0.0, "h")],
        mapping: FilterMapping::Generic { filter: "hue" },
        audio: false,
    },
    EffectDescriptor {
        id: "grayscale",
        name: "Grayscale",
        category: EffectCategory::Color,
        params: &[param!("amount", 0.0, 1.0, 0.01, 0.0, "")],
        mapping: FilterMapping::Custom(BuiltinKind::Grayscale),
        audio: false,
    },
    EffectDescriptor {
        id: "gaussian_blur",
        name: "Gaussian Blur",
        category: EffectCategory::Blur,
        params: &[param!("sigma", 0.0, 100.0, 0.1, 0.0, "sigma")],
        mapping: FilterMapping::Generic { filter: "gblur" },
        audio: false,
    },
    EffectDescriptor {
        id: "sharpen",
        name: "Sharpen",
        category: EffectCategory::Stylize,
        params: &[param!("amount", 0.0, 5.0, 0.1, 0.0, "")],
        mapping: FilterMapping::Custom(BuiltinKind::Sharpen),
        audio: false,
    },
    EffectDescriptor {
        id: "sepia",
        name: "Sepia",
        category: EffectCategory::Stylize,
        params: &[param!("amount", 0.0, 1.0, 0.01, 0.0, "")],
        mapping: FilterMapping::Custom(BuiltinKind::Sepia),
        audio: false,
    },
    EffectDescriptor {
        id: "vignette",
        name: "Vignette",
        category: EffectCategory::Stylize,
        params: &[param!("angle", 0.0, 1.5707, 0.01, 0.0, "angle")],
        mapping: FilterMapping::Generic { filter: "vignette" },
        audio: false,
    },
    EffectDescriptor {
        id: "fade_in",
        name: "Fade In",
        category: EffectCategory::Transition,
        params: &[param!("duration", 0.0, 10.0, 0.1, 0.0, "")],
        mapping: FilterMapping::Custom(BuiltinKind::FadeIn),
        audio: false,
    },
    EffectDescriptor {
        id: "fade_out",
        name: "Fade Out",
        category: EffectCategory::Transition,
        params: &[
            param!("start", 0.0, 3600.0, 0.1, 0.0, ""),
            param!("duration", 0.0, 10.0, 0.1, 0.0, ""),
        ],
        mapping: FilterMapping::Custom(BuiltinKind::FadeOut),
        audio: false,
    },
    EffectDescriptor {
        id: "cross_dissolve",
        name: "Cross Dissolve",
        category: EffectCategory::Transition,
        params: &[param!("duration", 0.0, 10.0, 0.1, 0.0, "")],
        mapping: FilterMapping::Custom(BuiltinKind::CrossDissolve),
        audio: false,
    },
    EffectDescriptor {
        id: "playback_speed",
        name: "Playback Speed",
        category: EffectCategory::Time,
        params: &[param!("rate", 0.1, 100.0, 0.05, 1.0, "")],
        mapping: FilterMapping::Custom(BuiltinKind::PlaybackSpeed),
        audio: false,
    },
    EffectDescriptor {
        id: "volume",
        name: "Volume",
        category: EffectCategory::Audio,
        params: &[param!("volume", 0.0, 4.0, 0.01, 1.0, "volume")],
        mapping: FilterMapping::Generic { filter: "volume" },
        audio: true,
    },
];

pub struct EffectRegistry {
    by_id: HashMap<&'static str, &'static EffectDescriptor>,
}

impl EffectRegistry {
    fn build() -> Self {
        let mut by_id = HashMap::with_capacity(DESCRIPTORS.len());
        for descriptor in DESCRIPTORS {
            by_id.insert(descriptor.id, descriptor);
        }
        Self { by_id }
    }

    pub fn get(&self, id: &str) -> Option<&'static EffectDescriptor> {
        self.by_id.get(id).copied()
    }

    pub fn by_category(&self, category: EffectCategory) -> Vec<&'static EffectDescriptor> {
        DESCRIPTORS
            .iter()
            .filter(|d| d.category == category)
            .collect()
    }

    pub fn all_ids(&self) -> Vec<&'static str> {
        DESCRIPTORS.iter().map(|d| d.id).collect()
    }
}

static REGISTRY: Lazy<EffectRegistry> = Lazy::new(EffectRegistry::build);

/// The process-wide descriptor registry. Populated on first access and
/// immutable thereafter.
pub fn registry() -> &'static EffectRegistry {
    &REGISTRY
}

/// An applied effect seeded with the descriptor's defaults.
pub fn applied_with_defaults(instance_id: String, effect_id: &str) -> AppliedEffect {
    let mut effect = AppliedEffect::new(instance_id, effect_id);
    if let Some(descriptor) = registry().get(effect_id) {
        for p in descriptor.params {
            effect.parameters.insert(p.id.to_string(), p.default);
        }
    }
    effect
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_by_id() {
        let d = registry().get("gaussian_blur").unwrap();
        assert_eq!(d.name, "Gaussian Blur");
        assert!(matches!(d.mapping, FilterMapping::Generic { filter: "gblur" }));
        assert!(registry().get("does_not_exist").is_none());
    }

    #[test]
    fn category_listing_contains_expected_kinds() {
        let color: Vec<&str> = registry()
            .by_category(EffectCategory::Color)
            .iter()
            .map(|d| d.id)
            .collect();
        assert!(color.contains(&"brightness"));
        assert!(color.contains(&"hue_rotate"));
        assert!(!color.contains(&"scale"));
    }

    #[test]
    fn all_ids_are_unique() {
        let ids = registry().all_ids();
        let mut dedup = ids.clone();
        dedup.sort();
        dedup.dedup();
        assert_eq!(ids.len(), dedup.len());
    }

    #[test]
    fn defaults_are_identity_values() {
        for id in registry().all_ids() {
            let descriptor = registry().get(id).unwrap();
            let effect = applied_with_defaults("e".to_string(), id);
            assert!(
                descriptor.is_default(&effect),
                "freshly applied {} should be a no-op",
                id
            );
        }
    }

    #[test]
    fn values_are_clamped_to_declared_range() {
        let descriptor = registry().get("opacity").unwrap();
        let mut effect = applied_with_defaults("e".to_string(), "opacity");
        effect.parameters.insert("opacity".to_string(), 7.5);
        assert_eq!(descriptor.value_of(&effect, "opacity"), 1.0);
        effect.parameters.insert("opacity".to_string(), -2.0);
        assert_eq!(descriptor.value_of(&effect, "opacity"), 0.0);
    }
}
