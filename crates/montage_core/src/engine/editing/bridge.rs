//! Projection between the canonical ordered effect stack and the flat
//! transform record the live renderer composites with.
//!
//! The stack is the single source of truth; a `Transform` is always
//! derived on demand. The reverse direction exists only for bootstrap
//! paths: new clips, and project documents that predate effect stacks.

use montage_types::{AppliedEffect, Transform};

use crate::engine::editing::effects::{applied_with_defaults, registry};
use crate::engine::editing::types::next_id;

/// The four kinds `transform_to_effects` always emits, even at defaults,
/// so every bootstrapped clip has a predictable structural stack.
const STRUCTURAL_KINDS: &[&str] = &["scale", "position", "rotation", "opacity"];

/// Fold the enabled built-in effects of a stack, left to right, into a
/// flat transform starting from the all-default record. Unrecognized
/// effect ids are skipped; they have no flat representation.
pub fn effects_to_transform(stack: &[AppliedEffect]) -> Transform {
    fold_transform(stack, |effect, param| {
        let descriptor = registry().get(&effect.effect_id)?;
        descriptor.param(param)?;
        Some(descriptor.value_of(effect, param))
    })
}

/// Same fold, but sampling keyframed parameters at a clip-relative time.
/// This is the projection the render loop uses each frame.
pub fn effects_to_transform_at(stack: &[AppliedEffect], time: f64) -> Transform {
    fold_transform(stack, |effect, param| {
        let descriptor = registry().get(&effect.effect_id)?;
        descriptor.param(param)?;
        Some(descriptor.value_of_at(effect, param, time))
    })
}

fn fold_transform<F>(stack: &[AppliedEffect], value: F) -> Transform
where
    F: Fn(&AppliedEffect, &str) -> Option<f64>,
{
    let mut t = Transform::default();

    for effect in stack.iter().filter(|e| e.enabled) {
        match effect.effect_id.as_str() {
            "scale" => {
                if let Some(v) = value(effect, "scale") {
                    t.scale = v;
                }
            }
            "position" => {
                if let Some(v) = value(effect, "positionX") {
                    t.position_x = v;
                }
                if let Some(v) = value(effect, "positionY") {
                    t.position_y = v;
                }
            }
            "rotation" => {
                if let Some(v) = value(effect, "degrees") {
                    t.rotation = v;
                }
            }
            "opacity" => {
                if let Some(v) = value(effect, "opacity") {
                    t.opacity = v;
                }
            }
            "gaussian_blur" => {
                if let Some(v) = value(effect, "sigma") {
                    t.blur = v;
                }
            }
            "brightness" => {
                if let Some(v) = value(effect, "brightness") {
                    t.brightness = v;
                }
            }
            "contrast" => {
                if let Some(v) = value(effect, "contrast") {
                    t.contrast = v;
                }
            }
            "saturation" => {
                if let Some(v) = value(effect, "saturation") {
                    t.saturation = v;
                }
            }
            "grayscale" => {
                if let Some(v) = value(effect, "amount") {
                    t.grayscale = v;
                }
            }
            "sepia" => {
                if let Some(v) = value(effect, "amount") {
                    t.sepia = v;
                }
            }
            "hue_rotate" => {
                if let Some(v) = value(effect, "degrees") {
                    t.hue_rotate = v;
                }
            }
            // Not representable in the flat record; export-only.
            _ => {}
        }
    }

    t
}

/// Inverse projection, used only for bootstrap: new clips, and legacy
/// project documents that stored the flat transform directly.
///
/// Always emits the four structural built-ins even at default values,
/// plus one entry per non-default filter. Round trip through
/// `effects_to_transform` is identity for transforms — but NOT for
/// stacks that already contained effects outside the flat set; those
/// are dropped by the flat view, which is the documented lossy edge.
pub fn transform_to_effects(transform: &Transform) -> Vec<AppliedEffect> {
    let mut stack = Vec::with_capacity(STRUCTURAL_KINDS.len());
    let defaults = Transform::default();

    let mut push = |effect_id: &str, values: &[(&str, f64)]| {
        let mut effect = applied_with_defaults(next_id("fx"), effect_id);
        for (param, value) in values {
            effect.parameters.insert((*param).to_string(), *value);
        }
        stack.push(effect);
    };

    push("scale", &[("scale", transform.scale)]);
    push(
        "position",
        &[
            ("positionX", transform.position_x),
            ("positionY", transform.position_y),
        ],
    );
    push("rotation", &[("degrees", transform.rotation)]);
    push("opacity", &[("opacity", transform.opacity)]);

    if (transform.blur - defaults.blur).abs() > f64::EPSILON {
        push("gaussian_blur", &[("sigma", transform.blur)]);
    }
    if (transform.brightness - defaults.brightness).abs() > f64::EPSILON {
        push("brightness", &[("brightness", transform.brightness)]);
    }
    if (transform.contrast - defaults.contrast).abs() > f64::EPSILON {
        push("contrast", &[("contrast", transform.contrast)]);
    }
    if (transform.saturation - defaults.saturation).abs() > f64::EPSILON {
        push("saturation", &[("saturation", transform.saturation)]);
    }
    if (transform.grayscale - defaults.grayscale).abs() > f64::EPSILON {
        push("grayscale", &[("amount", transform.grayscale)]);
    }
    if (transform.sepia - defaults.sepia).abs() > f64::EPSILON {
        push("sepia", &[("amount", transform.sepia)]);
    }
    if (transform.hue_rotate - defaults.hue_rotate).abs() > f64::EPSILON {
        push("hue_rotate", &[("degrees", transform.hue_rotate)]);
    }

    stack
}

/// The first stack entry for `effect_id`, created with descriptor
/// defaults if missing. This is the write path for direct manipulation
/// and animation write-back.
pub fn find_or_create_builtin<'a>(
    stack: &'a mut Vec<AppliedEffect>,
    effect_id: &str,
) -> &'a mut AppliedEffect {
    if let Some(idx) = stack.iter().position(|e| e.effect_id == effect_id) {
        return &mut stack[idx];
    }

    let idx = stack.len();
    stack.push(applied_with_defaults(next_id("fx"), effect_id));
    &mut stack[idx]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stack_projects_to_default_transform() {
        assert!(effects_to_transform(&[]).is_default());
    }

    #[test]
    fn round_trip_is_identity_for_flat_transforms() {
        let t = Transform {
            scale: 1.5,
            position_x: 120.0,
            position_y: -40.0,
            rotation: 12.0,
            opacity: 0.8,
            blur: 3.0,
            brightness: 0.2,
            contrast: 1.1,
            saturation: 0.9,
            grayscale: 0.5,
            sepia: 0.25,
            hue_rotate: 90.0,
        };
        assert_eq!(effects_to_transform(&transform_to_effects(&t)), t);
    }

    #[test]
    fn round_trip_is_identity_for_the_default_transform() {
        let t = Transform::default();
        let stack = transform_to_effects(&t);
        // Only the structural four are emitted at defaults.
        assert_eq!(stack.len(), 4);
        assert_eq!(effects_to_transform(&stack), t);
    }

    #[test]
    fn disabled_effects_are_skipped() {
        let mut stack = transform_to_effects(&Transform {
            scale: 2.0,
            ..Transform::default()
        });
        stack[0].enabled = false;
        assert_eq!(effects_to_transform(&stack).scale, 1.0);
    }

    #[test]
    fn unknown_effect_ids_are_skipped_not_rejected() {
        let mut stack = transform_to_effects(&Transform::default());
        stack.push(AppliedEffect::new("x", "chroma_key_v2"));
        let t = effects_to_transform(&stack);
        assert!(t.is_default());
    }

    #[test]
    fn later_entries_win_the_fold() {
        let mut stack = transform_to_effects(&Transform {
            scale: 2.0,
            ..Transform::default()
        });
        let mut second = applied_with_defaults("e9".to_string(), "scale");
        second.parameters.insert("scale".to_string(), 3.0);
        stack.push(second);
        assert_eq!(effects_to_transform(&stack).scale, 3.0);
    }

    #[test]
    fn find_or_create_reuses_existing_entry() {
        let mut stack = transform_to_effects(&Transform::default());
        let before = stack.len();
        find_or_create_builtin(&mut stack, "scale")
            .parameters
            .insert("scale".to_string(), 2.0);
        assert_eq!(stack.len(), before);
        find_or_create_builtin(&mut stack, "gaussian_blur")
            .parameters
            .insert("sigma".to_string(), 4.0);
        assert_eq!(stack.len(), before + 1);
    }

    #[test]
    fn keyframed_parameter_is_sampled_at_time() {
        use montage_types::{Interpolation, Keyframe};

        let mut stack = transform_to_effects(&Transform::default());
        let opacity = find_or_create_builtin(&mut stack, "opacity");
        opacity.keyframes.push(Keyframe {
            time: 0.0,
            parameter: "opacity".to_string(),
            value: 0.0,
            interpolation: Interpolation::Linear,
        });
        opacity.keyframes.push(Keyframe {
            time: 2.0,
            parameter: "opacity".to_string(),
            value: 1.0,
            interpolation: Interpolation::Linear,
        });

        assert_eq!(effects_to_transform_at(&stack, 1.0).opacity, 0.5);
        // The static fold ignores keyframes and reads the stored value.
        assert_eq!(effects_to_transform(&stack).opacity, 1.0);
    }
}
