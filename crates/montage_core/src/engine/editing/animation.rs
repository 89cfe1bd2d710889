//! Time-driven parameter animation for the preview engine.
//!
//! Animations are the only per-frame-allocated state in the engine; each
//! entry is removed on the frame where its progress reaches 1.0.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EaseIn => t * t,
            Self::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
        }
    }
}

/// Clip properties that can be animated through `animate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AnimatableProperty {
    Scale,
    PositionX,
    PositionY,
    Rotation,
    Opacity,
    Volume,
}

impl AnimatableProperty {
    /// The built-in effect backing this property.
    pub fn effect_id(self) -> &'static str {
        match self {
            Self::Scale => "scale",
            Self::PositionX | Self::PositionY => "position",
            Self::Rotation => "rotation",
            Self::Opacity => "opacity",
            Self::Volume => "volume",
        }
    }

    /// The parameter id inside that effect.
    pub fn parameter_id(self) -> &'static str {
        match self {
            Self::Scale => "scale",
            Self::PositionX => "positionX",
            Self::PositionY => "positionY",
            Self::Rotation => "degrees",
            Self::Opacity => "opacity",
            Self::Volume => "volume",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnimationKey {
    pub clip_id: String,
    pub property: AnimatableProperty,
}

#[derive(Debug, Clone)]
struct ActiveAnimation {
    start_value: f64,
    target_value: f64,
    started_at: f64,
    duration: f64,
    easing: Easing,
}

impl ActiveAnimation {
    fn progress(&self, now: f64) -> f64 {
        if self.duration <= 0.0 {
            return 1.0;
        }
        ((now - self.started_at) / self.duration).clamp(0.0, 1.0)
    }

    fn value_at(&self, now: f64) -> f64 {
        let eased = self.easing.apply(self.progress(now));
        self.start_value + (self.target_value - self.start_value) * eased
    }
}

/// One interpolated sample produced by `advance`.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationSample {
    pub key: AnimationKey,
    pub value: f64,
    pub finished: bool,
}

/// The set of in-flight animations, addressed by (clip, property).
#[derive(Default)]
pub struct AnimationSet {
    active: HashMap<AnimationKey, ActiveAnimation>,
}

impl AnimationSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an animation from `current_value` toward `target_value`.
    ///
    /// A second start on the same key replaces the in-flight animation,
    /// using its current interpolated value as the new start — there is
    /// no queueing. Animations on different properties of the same clip
    /// run independently.
    pub fn start(
        &mut self,
        key: AnimationKey,
        current_value: f64,
        target_value: f64,
        duration: f64,
        easing: Easing,
        now: f64,
    ) {
        let start_value = self
            .active
            .get(&key)
            .map(|a| a.value_at(now))
            .unwrap_or(current_value);

        self.active.insert(
            key,
            ActiveAnimation {
                start_value,
                target_value,
                started_at: now,
                duration,
                easing,
            },
        );
    }

    /// Advance every animation to `now`, returning one sample per entry.
    /// Completed animations are purged after producing their final sample.
    pub fn advance(&mut self, now: f64) -> Vec<AnimationSample> {
        let mut samples: Vec<AnimationSample> = self
            .active
            .iter()
            .map(|(key, anim)| AnimationSample {
                key: key.clone(),
                value: anim.value_at(now),
                finished: anim.progress(now) >= 1.0,
            })
            .collect();

        // Stable output order keeps write-back deterministic across frames.
        samples.sort_by(|a, b| a.key.clip_id.cmp(&b.key.clip_id));

        self.active.retain(|key, anim| {
            let keep = anim.progress(now) < 1.0;
            if !keep {
                log::debug!("animation complete: {:?}/{:?}", key.clip_id, key.property);
            }
            keep
        });

        samples
    }

    pub fn cancel_clip(&mut self, clip_id: &str) {
        self.active.retain(|key, _| key.clip_id != clip_id);
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }
}
