use std::collections::HashMap;
use serde::{Serialize, Deserialize};

/// Interpolation mode of a keyframe segment.
///
/// The mode stored on a keyframe governs the segment from that keyframe
/// to the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpolation {
    Linear,
    Bezier,
    Hold,
    EaseIn,
    EaseOut,
}

impl Default for Interpolation {
    fn default() -> Self {
        Interpolation::Linear
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    /// Time in seconds, relative to the owning clip's start.
    pub time: f64,

    /// Parameter id this keyframe drives.
    pub parameter: String,

    pub value: f64,

    #[serde(default)]
    pub interpolation: Interpolation,
}

/// A persisted instance of an effect kind, attached to one clip.
///
/// `parameters` holds the current static value per parameter id. When
/// keyframes exist for a parameter they are the source of truth and
/// override the static value at render/export time. Keys not declared by
/// the referenced descriptor are ignored by consumers, never rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedEffect {
    pub id: String,

    pub effect_id: String,

    pub parameters: HashMap<String, f64>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keyframes: Vec<Keyframe>,

    pub enabled: bool,
}

impl AppliedEffect {
    pub fn new(id: impl Into<String>, effect_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            effect_id: effect_id.into(),
            parameters: HashMap::new(),
            keyframes: Vec::new(),
            enabled: true,
        }
    }

    /// Current static value of a parameter, if set.
    pub fn parameter(&self, id: &str) -> Option<f64> {
        self.parameters.get(id).copied()
    }

    /// Value of a parameter at a clip-relative time, honoring keyframes.
    ///
    /// With no keyframes for the parameter this is the static value.
    /// Before the first keyframe the first value holds; after the last,
    /// the last. In between, the segment is shaped by the interpolation
    /// mode of its leading keyframe.
    pub fn value_at(&self, parameter: &str, time: f64) -> Option<f64> {
        let mut frames: Vec<&Keyframe> = self
            .keyframes
            .iter()
            .filter(|k| k.parameter == parameter)
            .collect();

        if frames.is_empty() {
            return self.parameter(parameter);
        }

        frames.sort_by(|a, b| a.time.total_cmp(&b.time));

        let first = frames[0];
        if time <= first.time {
            return Some(first.value);
        }

        let last = frames[frames.len() - 1];
        if time >= last.time {
            return Some(last.value);
        }

        for pair in frames.windows(2) {
            let (k0, k1) = (pair[0], pair[1]);
            if time < k0.time || time > k1.time {
                continue;
            }

            let span = k1.time - k0.time;
            if span <= f64::EPSILON {
                return Some(k1.value);
            }

            let t = ((time - k0.time) / span).clamp(0.0, 1.0);
            let shaped = match k0.interpolation {
                Interpolation::Hold => return Some(k0.value),
                Interpolation::Linear => t,
                Interpolation::EaseIn => t * t,
                Interpolation::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
                // Smoothstep stands in for the authoring tool's default
                // bezier handles.
                Interpolation::Bezier => t * t * (3.0 - 2.0 * t),
            };
            return Some(k0.value + (k1.value - k0.value) * shaped);
        }

        Some(last.value)
    }

    /// Whether any keyframe drives the given parameter.
    pub fn is_animated(&self, parameter: &str) -> bool {
        self.keyframes.iter().any(|k| k.parameter == parameter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn effect_with_keyframes(frames: Vec<Keyframe>) -> AppliedEffect {
        let mut effect = AppliedEffect::new("e1", "opacity");
        effect.parameters.insert("opacity".to_string(), 1.0);
        effect.keyframes = frames;
        effect
    }

    fn key(time: f64, value: f64, interpolation: Interpolation) -> Keyframe {
        Keyframe {
            time,
            parameter: "opacity".to_string(),
            value,
            interpolation,
        }
    }

    #[test]
    fn static_value_without_keyframes() {
        let effect = effect_with_keyframes(Vec::new());
        assert_eq!(effect.value_at("opacity", 3.0), Some(1.0));
    }

    #[test]
    fn keyframes_override_static_value() {
        let effect = effect_with_keyframes(vec![
            key(0.0, 0.0, Interpolation::Linear),
            key(2.0, 1.0, Interpolation::Linear),
        ]);
        assert_eq!(effect.value_at("opacity", 1.0), Some(0.5));
    }

    #[test]
    fn holds_before_first_and_after_last() {
        let effect = effect_with_keyframes(vec![
            key(1.0, 0.2, Interpolation::Linear),
            key(2.0, 0.8, Interpolation::Linear),
        ]);
        assert_eq!(effect.value_at("opacity", 0.0), Some(0.2));
        assert_eq!(effect.value_at("opacity", 5.0), Some(0.8));
    }

    #[test]
    fn hold_keeps_leading_value_for_whole_segment() {
        let effect = effect_with_keyframes(vec![
            key(0.0, 0.3, Interpolation::Hold),
            key(2.0, 0.9, Interpolation::Linear),
        ]);
        assert_eq!(effect.value_at("opacity", 1.999), Some(0.3));
        assert_eq!(effect.value_at("opacity", 2.0), Some(0.9));
    }

    #[test]
    fn ease_in_is_slower_at_start() {
        let effect = effect_with_keyframes(vec![
            key(0.0, 0.0, Interpolation::EaseIn),
            key(1.0, 1.0, Interpolation::Linear),
        ]);
        let v = effect.value_at("opacity", 0.5).unwrap();
        assert!(v < 0.5, "ease-in at midpoint should sit below linear, got {}", v);
    }

    #[test]
    fn unknown_parameter_yields_none() {
        let effect = effect_with_keyframes(Vec::new());
        assert_eq!(effect.value_at("sigma", 0.0), None);
    }

    #[test]
    fn unsorted_keyframes_are_sampled_in_time_order() {
        let effect = effect_with_keyframes(vec![
            key(2.0, 1.0, Interpolation::Linear),
            key(0.0, 0.0, Interpolation::Linear),
        ]);
        assert_eq!(effect.value_at("opacity", 1.0), Some(0.5));
    }
}
