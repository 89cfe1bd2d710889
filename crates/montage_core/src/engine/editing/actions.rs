//! Normalized edit actions.
//!
//! External collaborators (the chat/AI layer, scripting, tests) hand the
//! engine one of these records; each applies as an ordinary data-model
//! mutation through the bridge and timeline ops. Translating natural
//! language into a record happens elsewhere.

use std::collections::HashMap;

use serde::{Serialize, Deserialize};
use montage_types::{Project, Transform};

use crate::engine::editing::animation::AnimatableProperty;
use crate::engine::editing::bridge;
use crate::engine::editing::effects::{applied_with_defaults, registry};
use crate::engine::editing::timeline;
use crate::engine::editing::types::{next_id, EditingError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EditAction {
    /// Scale factor: 1.0 = native, 1.5 = zoomed in 50%.
    #[serde(rename_all = "camelCase")]
    Zoom {
        scale: f64,
        #[serde(default)]
        animated: bool,
        #[serde(default)]
        duration: Option<f64>,
    },
    /// Pixel offset from composition center.
    #[serde(rename_all = "camelCase")]
    Position {
        x: f64,
        y: f64,
        #[serde(default)]
        animated: bool,
        #[serde(default)]
        duration: Option<f64>,
    },
    /// 0.0 (invisible) to 1.0 (opaque).
    #[serde(rename_all = "camelCase")]
    Opacity {
        value: f64,
        #[serde(default)]
        animated: bool,
        #[serde(default)]
        duration: Option<f64>,
    },
    #[serde(rename_all = "camelCase")]
    Rotation {
        degrees: f64,
        #[serde(default)]
        animated: bool,
        #[serde(default)]
        duration: Option<f64>,
    },
    /// Apply a registry effect by id, optionally setting its primary
    /// (first declared) parameter.
    #[serde(rename_all = "camelCase")]
    Filter {
        effect_id: String,
        #[serde(default)]
        value: Option<f64>,
    },
    /// Gain multiplier: 1.0 = unchanged.
    #[serde(rename_all = "camelCase")]
    Volume { value: f64 },
    /// Speed multiplier: 2.0 = twice as fast.
    #[serde(rename_all = "camelCase")]
    PlaybackRate { rate: f64 },
    /// Split at `time`, or at the playhead when omitted.
    #[serde(rename_all = "camelCase")]
    Cut {
        #[serde(default)]
        time: Option<f64>,
    },
    /// New timeline start/end; either side may be omitted.
    #[serde(rename_all = "camelCase")]
    Trim {
        #[serde(default)]
        start: Option<f64>,
        #[serde(default)]
        end: Option<f64>,
    },
    DeleteClip,
    #[serde(rename_all = "camelCase")]
    ApplyEffect {
        effect_id: String,
        #[serde(default)]
        parameters: HashMap<String, f64>,
    },
    #[serde(rename_all = "camelCase")]
    RemoveEffect { effect_id: String },
    #[serde(rename_all = "camelCase")]
    UpdateEffect {
        effect_id: String,
        parameters: HashMap<String, f64>,
    },
    #[serde(rename_all = "camelCase")]
    ToggleEffect { effect_id: String },
    /// Clear transforms and effects back to defaults.
    Reset,
}

/// What an applied action asks of its caller.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Data model mutated; nothing further to do.
    Applied,
    ClipRemoved,
    ClipSplit { right_clip_id: String },
    /// The caller should start these animations on its engine instance;
    /// the record itself only names targets.
    Animations {
        targets: Vec<(AnimatableProperty, f64)>,
        duration: f64,
    },
}

const DEFAULT_ANIMATION_SECONDS: f64 = 1.0;

fn set_builtin(project: &mut Project, clip_id: &str, effect_id: &str, values: &[(&str, f64)])
    -> Result<(), EditingError>
{
    let clip = project
        .find_clip_mut(clip_id)
        .ok_or_else(|| EditingError::EffectError(format!("Clip not found: {}", clip_id)))?;
    let effect = bridge::find_or_create_builtin(&mut clip.effects, effect_id);
    for (param, value) in values {
        effect.parameters.insert((*param).to_string(), *value);
    }
    Ok(())
}

/// Apply one action to the clip. `playhead` supplies the implicit time
/// for `Cut` when the record doesn't carry one.
pub fn apply_action(
    project: &mut Project,
    clip_id: &str,
    action: &EditAction,
    playhead: f64,
) -> Result<ActionOutcome, EditingError> {
    match action {
        EditAction::Zoom {
            scale,
            animated,
            duration,
        } => {
            if *animated {
                return Ok(ActionOutcome::Animations {
                    targets: vec![(AnimatableProperty::Scale, *scale)],
                    duration: duration.unwrap_or(DEFAULT_ANIMATION_SECONDS),
                });
            }
            set_builtin(project, clip_id, "scale", &[("scale", *scale)])?;
            Ok(ActionOutcome::Applied)
        }
        EditAction::Position {
            x,
            y,
            animated,
            duration,
        } => {
            if *animated {
                return Ok(ActionOutcome::Animations {
                    targets: vec![
                        (AnimatableProperty::PositionX, *x),
                        (AnimatableProperty::PositionY, *y),
                    ],
                    duration: duration.unwrap_or(DEFAULT_ANIMATION_SECONDS),
                });
            }
            set_builtin(
                project,
                clip_id,
                "position",
                &[("positionX", *x), ("positionY", *y)],
            )?;
            Ok(ActionOutcome::Applied)
        }
        EditAction::Opacity {
            value,
            animated,
            duration,
        } => {
            if *animated {
                return Ok(ActionOutcome::Animations {
                    targets: vec![(AnimatableProperty::Opacity, *value)],
                    duration: duration.unwrap_or(DEFAULT_ANIMATION_SECONDS),
                });
            }
            set_builtin(project, clip_id, "opacity", &[("opacity", *value)])?;
            Ok(ActionOutcome::Applied)
        }
        EditAction::Rotation {
            degrees,
            animated,
            duration,
        } => {
            if *animated {
                return Ok(ActionOutcome::Animations {
                    targets: vec![(AnimatableProperty::Rotation, *degrees)],
                    duration: duration.unwrap_or(DEFAULT_ANIMATION_SECONDS),
                });
            }
            set_builtin(project, clip_id, "rotation", &[("degrees", *degrees)])?;
            Ok(ActionOutcome::Applied)
        }
        EditAction::Filter { effect_id, value } => {
            let descriptor = registry().get(effect_id).ok_or_else(|| {
                EditingError::EffectError(format!("Unknown effect: {}", effect_id))
            })?;
            let clip = project.find_clip_mut(clip_id).ok_or_else(|| {
                EditingError::EffectError(format!("Clip not found: {}", clip_id))
            })?;
            let effect = bridge::find_or_create_builtin(&mut clip.effects, effect_id);
            if let (Some(value), Some(param)) = (value, descriptor.params.first()) {
                effect.parameters.insert(param.id.to_string(), *value);
            }
            Ok(ActionOutcome::Applied)
        }
        EditAction::Volume { value } => {
            set_builtin(project, clip_id, "volume", &[("volume", *value)])?;
            Ok(ActionOutcome::Applied)
        }
        EditAction::PlaybackRate { rate } => {
            set_builtin(project, clip_id, "playback_speed", &[("rate", *rate)])?;
            Ok(ActionOutcome::Applied)
        }
        EditAction::Cut { time } => {
            let at = time.unwrap_or(playhead);
            let right_clip_id = timeline::split_clip(project, clip_id, at)?;
            Ok(ActionOutcome::ClipSplit { right_clip_id })
        }
        EditAction::Trim { start, end } => {
            timeline::trim_clip(project, clip_id, *start, *end)?;
            Ok(ActionOutcome::Applied)
        }
        EditAction::DeleteClip => {
            if timeline::delete_clip(project, clip_id) {
                Ok(ActionOutcome::ClipRemoved)
            } else {
                Err(EditingError::TimelineError(format!(
                    "Clip not found: {}",
                    clip_id
                )))
            }
        }
        EditAction::ApplyEffect {
            effect_id,
            parameters,
        } => {
            registry().get(effect_id).ok_or_else(|| {
                EditingError::EffectError(format!("Unknown effect: {}", effect_id))
            })?;
            let clip = project.find_clip_mut(clip_id).ok_or_else(|| {
                EditingError::EffectError(format!("Clip not found: {}", clip_id))
            })?;
            let mut effect = applied_with_defaults(next_id("fx"), effect_id);
            for (param, value) in parameters {
                effect.parameters.insert(param.clone(), *value);
            }
            clip.effects.push(effect);
            Ok(ActionOutcome::Applied)
        }
        EditAction::RemoveEffect { effect_id } => {
            let clip = project.find_clip_mut(clip_id).ok_or_else(|| {
                EditingError::EffectError(format!("Clip not found: {}", clip_id))
            })?;
            clip.effects.retain(|e| e.effect_id != *effect_id);
            Ok(ActionOutcome::Applied)
        }
        EditAction::UpdateEffect {
            effect_id,
            parameters,
        } => {
            let clip = project.find_clip_mut(clip_id).ok_or_else(|| {
                EditingError::EffectError(format!("Clip not found: {}", clip_id))
            })?;
            let effect = clip
                .effects
                .iter_mut()
                .find(|e| e.effect_id == *effect_id)
                .ok_or_else(|| {
                    EditingError::EffectError(format!("Effect not applied: {}", effect_id))
                })?;
            for (param, value) in parameters {
                effect.parameters.insert(param.clone(), *value);
            }
            Ok(ActionOutcome::Applied)
        }
        EditAction::ToggleEffect { effect_id } => {
            let clip = project.find_clip_mut(clip_id).ok_or_else(|| {
                EditingError::EffectError(format!("Clip not found: {}", clip_id))
            })?;
            let effect = clip
                .effects
                .iter_mut()
                .find(|e| e.effect_id == *effect_id)
                .ok_or_else(|| {
                    EditingError::EffectError(format!("Effect not applied: {}", effect_id))
                })?;
            effect.enabled = !effect.enabled;
            Ok(ActionOutcome::Applied)
        }
        EditAction::Reset => {
            let clip = project.find_clip_mut(clip_id).ok_or_else(|| {
                EditingError::EffectError(format!("Clip not found: {}", clip_id))
            })?;
            clip.effects = bridge::transform_to_effects(&Transform::default());
            Ok(ActionOutcome::Applied)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_types::{Clip, MediaFile, Track, TrackKind};

    fn project_with_clip() -> Project {
        let mut project = Project::new("p1", "test");
        project.media.push(MediaFile {
            id: "m1".to_string(),
            name: "a.mp4".to_string(),
            url: "file:///a.mp4".to_string(),
            path: None,
            duration: 30.0,
            width: None,
            height: None,
        });
        let mut track = Track::new("t1", TrackKind::Video);
        track.clips.push(Clip::new("c1", "m1", 0.0, 10.0, 0.0));
        project.tracks.push(track);
        project
    }

    #[test]
    fn action_records_deserialize_from_kebab_tags() {
        let zoom: EditAction =
            serde_json::from_str(r#"{"type": "zoom", "scale": 1.5}"#).unwrap();
        assert_eq!(
            zoom,
            EditAction::Zoom {
                scale: 1.5,
                animated: false,
                duration: None
            }
        );

        let rate: EditAction =
            serde_json::from_str(r#"{"type": "playback-rate", "rate": 0.5}"#).unwrap();
        assert_eq!(rate, EditAction::PlaybackRate { rate: 0.5 });

        let del: EditAction = serde_json::from_str(r#"{"type": "delete-clip"}"#).unwrap();
        assert_eq!(del, EditAction::DeleteClip);

        let apply: EditAction = serde_json::from_str(
            r#"{"type": "apply-effect", "effectId": "sepia", "parameters": {"amount": 0.8}}"#,
        )
        .unwrap();
        match apply {
            EditAction::ApplyEffect { effect_id, parameters } => {
                assert_eq!(effect_id, "sepia");
                assert_eq!(parameters.get("amount"), Some(&0.8));
            }
            other => panic!("unexpected action: {:?}", other),
        }
    }

    #[test]
    fn zoom_writes_through_the_bridge() {
        let mut project = project_with_clip();
        let outcome = apply_action(
            &mut project,
            "c1",
            &EditAction::Zoom {
                scale: 1.5,
                animated: false,
                duration: None,
            },
            0.0,
        )
        .unwrap();
        assert_eq!(outcome, ActionOutcome::Applied);

        let clip = project.find_clip("c1").unwrap();
        assert_eq!(bridge::effects_to_transform(&clip.effects).scale, 1.5);
    }

    #[test]
    fn animated_zoom_defers_to_the_engine() {
        let mut project = project_with_clip();
        let outcome = apply_action(
            &mut project,
            "c1",
            &EditAction::Zoom {
                scale: 2.0,
                animated: true,
                duration: Some(3.0),
            },
            0.0,
        )
        .unwrap();
        assert_eq!(
            outcome,
            ActionOutcome::Animations {
                targets: vec![(AnimatableProperty::Scale, 2.0)],
                duration: 3.0
            }
        );
        // Nothing touched the model yet.
        let clip = project.find_clip("c1").unwrap();
        assert!(clip.effects.is_empty());
    }

    #[test]
    fn cut_uses_the_playhead_when_no_time_given() {
        let mut project = project_with_clip();
        let outcome =
            apply_action(&mut project, "c1", &EditAction::Cut { time: None }, 4.0).unwrap();
        match outcome {
            ActionOutcome::ClipSplit { right_clip_id } => {
                assert_eq!(
                    project.find_clip(&right_clip_id).unwrap().timeline_start,
                    4.0
                );
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn unknown_filter_id_is_an_error_at_the_action_boundary() {
        let mut project = project_with_clip();
        let result = apply_action(
            &mut project,
            "c1",
            &EditAction::Filter {
                effect_id: "film_grain_pro".to_string(),
                value: None,
            },
            0.0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn toggle_flips_enabled_and_reset_restores_defaults() {
        let mut project = project_with_clip();
        apply_action(
            &mut project,
            "c1",
            &EditAction::Filter {
                effect_id: "sepia".to_string(),
                value: Some(0.8),
            },
            0.0,
        )
        .unwrap();

        apply_action(
            &mut project,
            "c1",
            &EditAction::ToggleEffect {
                effect_id: "sepia".to_string(),
            },
            0.0,
        )
        .unwrap();
        let clip = project.find_clip("c1").unwrap();
        assert!(!clip.effects.iter().find(|e| e.effect_id == "sepia").unwrap().enabled);

        apply_action(&mut project, "c1", &EditAction::Reset, 0.0).unwrap();
        let clip = project.find_clip("c1").unwrap();
        assert!(clip.effects.iter().all(|e| e.effect_id != "sepia"));
        assert!(bridge::effects_to_transform(&clip.effects).is_default());
    }

    #[test]
    fn delete_clip_reports_removal() {
        let mut project = project_with_clip();
        let outcome = apply_action(&mut project, "c1", &EditAction::DeleteClip, 0.0).unwrap();
        assert_eq!(outcome, ActionOutcome::ClipRemoved);
        assert!(project.find_clip("c1").is_none());
        assert!(apply_action(&mut project, "c1", &EditAction::DeleteClip, 0.0).is_err());
    }

    #[test]
    fn update_effect_requires_an_applied_instance() {
        let mut project = project_with_clip();
        let mut params = HashMap::new();
        params.insert("sigma".to_string(), 4.0);
        let result = apply_action(
            &mut project,
            "c1",
            &EditAction::UpdateEffect {
                effect_id: "gaussian_blur".to_string(),
                parameters: params,
            },
            0.0,
        );
        assert!(result.is_err());
    }
}
