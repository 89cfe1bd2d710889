//! Real-time render and playback engine.
//!
//! One engine instance owns one media-decoding surface and one raster
//! output surface, plus the live `PlaybackState`. The host drives `tick`
//! at display refresh rate — unconditionally once initialized, playing or
//! not, so a static frame stays responsive to external edits. The decode
//! and raster backends are trait objects; the engine never assumes a
//! particular media framework.

use anyhow::Result;
use log::{debug, warn};
use montage_types::{Clip, PlaybackState, Project, TrackKind, Transform};

use crate::engine::editing::animation::{
    AnimatableProperty, AnimationKey, AnimationSet, Easing,
};
use crate::engine::editing::bridge;
use crate::engine::editing::types::EditingError;

/// Frames after a programmatic seek during which the decode surface's
/// reported time is ignored, so the playhead doesn't flash back to the
/// pre-seek position while the surface catches up.
pub const SEEK_SUPPRESSION_TICKS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Uninitialized,
    Idle,
    Loaded,
    Playing,
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// No source, or nothing decoded yet.
    Empty,
    /// Source attached, first frame not yet decodable.
    Loading,
    /// Enough decoded data to composite the current frame.
    Ready,
}

/// Contract over the media-decoding backend.
///
/// `load` begins an asynchronous decode; failures discovered later are
/// reported through `take_error` and observed by the next `tick`.
pub trait DecodeSurface {
    fn load(&mut self, source: &str) -> Result<(), EditingError>;

    fn unload(&mut self);

    fn ready_state(&self) -> ReadyState;

    /// A decode failure since the last call, if any. Taking it clears it.
    fn take_error(&mut self) -> Option<String>;

    /// Duration of the loaded source in seconds; 0.0 when unknown.
    fn duration(&self) -> f64;

    /// Current position on the source's own clock.
    fn current_time(&self) -> f64;

    fn seek(&mut self, time: f64);

    fn play(&mut self);

    fn pause(&mut self);

    fn set_rate(&mut self, rate: f64);

    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);
}

/// Contract over the 2-D raster output target, canvas-style.
pub trait RasterSurface {
    fn size(&self) -> (u32, u32);

    fn clear(&mut self);

    fn set_alpha(&mut self, alpha: f64);

    /// Combined raster filter in CSS filter grammar; "none" resets.
    fn set_filter(&mut self, filter: &str);

    fn translate(&mut self, x: f64, y: f64);

    fn rotate(&mut self, radians: f64);

    fn scale(&mut self, factor: f64);

    /// Draw the current decoded frame into the given destination rect,
    /// in the coordinate space established by the transform calls above.
    fn draw_frame(&mut self, x: f64, y: f64, width: f64, height: f64);

    /// Drop accumulated transform/alpha/filter state.
    fn reset(&mut self);
}

/// The combined raster filter for a transform, in CSS filter grammar.
/// Only non-default components are emitted; an empty string means no
/// filtering is needed this frame.
pub fn raster_filter(t: &Transform) -> String {
    let mut parts: Vec<String> = Vec::new();

    if t.brightness.abs() > 0.001 {
        parts.push(format!("brightness({})", 1.0 + t.brightness));
    }
    if (t.contrast - 1.0).abs() > 0.001 {
        parts.push(format!("contrast({})", t.contrast));
    }
    if (t.saturation - 1.0).abs() > 0.001 {
        parts.push(format!("saturate({})", t.saturation));
    }
    if t.grayscale > 0.001 {
        parts.push(format!("grayscale({})", t.grayscale));
    }
    if t.sepia > 0.001 {
        parts.push(format!("sepia({})", t.sepia));
    }
    if t.hue_rotate.abs() > 0.001 {
        parts.push(format!("hue-rotate({}deg)", t.hue_rotate));
    }
    if t.blur > 0.001 {
        parts.push(format!("blur({}px)", t.blur));
    }

    parts.join(" ")
}

/// Destination size that fits a source into a target while preserving
/// the source aspect ratio (letterboxed).
pub fn letterbox_fit(src_w: f64, src_h: f64, dst_w: f64, dst_h: f64) -> (f64, f64) {
    if src_w <= 0.0 || src_h <= 0.0 {
        return (dst_w, dst_h);
    }
    let scale = (dst_w / src_w).min(dst_h / src_h);
    (src_w * scale, src_h * scale)
}

fn active_clip<'a>(project: &'a Project, time: f64) -> Option<&'a Clip> {
    project
        .tracks
        .iter()
        .filter(|t| t.visible && t.kind == TrackKind::Video)
        .find_map(|t| t.clip_at(time))
}

pub struct PreviewEngine {
    state: EngineState,

    decode: Box<dyn DecodeSurface>,

    raster: Box<dyn RasterSurface>,

    playback: PlaybackState,

    animations: AnimationSet,

    seek_suppress: u32,

    last_error: Option<String>,
}

impl PreviewEngine {
    pub fn new(decode: Box<dyn DecodeSurface>, raster: Box<dyn RasterSurface>) -> Self {
        Self {
            state: EngineState::Idle,
            decode,
            raster,
            playback: PlaybackState::default(),
            animations: AnimationSet::new(),
            seek_suppress: 0,
            last_error: None,
        }
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn playback(&self) -> &PlaybackState {
        &self.playback
    }

    /// The most recent decode failure, if the engine fell back to Idle.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Attach a media source. Synchronous failures surface immediately
    /// and leave the engine Idle with no partial state; asynchronous
    /// decode failures are observed by a later `tick`.
    pub fn load_source(&mut self, source: &str) -> Result<(), EditingError> {
        if self.state == EngineState::Uninitialized {
            return Err(EditingError::NotInitialized);
        }
        if self.state == EngineState::Playing {
            self.pause();
        }

        match self.decode.load(source) {
            Ok(()) => {
                debug!("source loaded: {}", source);
                self.state = EngineState::Loaded;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.decode.unload();
                self.state = EngineState::Idle;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn unload_source(&mut self) {
        if self.state == EngineState::Uninitialized {
            return;
        }
        self.decode.unload();
        self.playback.playing = false;
        self.state = EngineState::Idle;
    }

    /// Start playback. A no-op when no clip occupies the current
    /// playhead time — scrubbed into a gap, play waits for the user.
    pub fn play(&mut self, project: &Project) {
        match self.state {
            EngineState::Loaded | EngineState::Paused => {}
            _ => return,
        }
        if active_clip(project, self.playback.current_time).is_none() {
            debug!(
                "play ignored: no clip at t={:.3}",
                self.playback.current_time
            );
            return;
        }

        self.decode.play();
        self.playback.playing = true;
        self.state = EngineState::Playing;
    }

    pub fn pause(&mut self) {
        if self.state != EngineState::Playing {
            return;
        }
        self.decode.pause();
        self.playback.playing = false;
        self.state = EngineState::Paused;
    }

    pub fn toggle(&mut self, project: &Project) {
        if self.state == EngineState::Playing {
            self.pause();
        } else {
            self.play(project);
        }
    }

    /// Move the playhead to a timeline time.
    ///
    /// The decode surface is clamped to `[0, decode duration]`, but the
    /// unclamped time is recorded as the authoritative playhead so the
    /// user can scrub into empty timeline regions.
    pub fn seek(&mut self, project: &Project, time: f64) -> Result<(), EditingError> {
        match self.state {
            EngineState::Uninitialized => return Err(EditingError::NotInitialized),
            EngineState::Idle => {
                return Err(EditingError::PreviewError("No source loaded".to_string()))
            }
            _ => {}
        }

        let time = time.max(0.0);
        self.playback.current_time = time;

        if let Some(clip) = active_clip(project, time) {
            let source_time = clip.source_start + (time - clip.timeline_start);
            self.decode
                .seek(source_time.clamp(0.0, self.decode.duration()));
        } else {
            // Scrubbed into a gap; park the decode surface at an edge so
            // resuming inside a clip later starts from a sane position.
            self.decode
                .seek(self.decode.current_time().clamp(0.0, self.decode.duration()));
        }
        self.seek_suppress = SEEK_SUPPRESSION_TICKS;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f64) {
        self.playback.volume = volume.clamp(0.0, 1.0);
        self.decode.set_volume(self.playback.volume);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.playback.muted = muted;
        self.decode.set_muted(muted);
    }

    pub fn set_rate(&mut self, rate: f64) {
        self.playback.rate = rate.clamp(0.25, 4.0);
        self.decode.set_rate(self.playback.rate);
    }

    pub fn set_looping(&mut self, looping: bool) {
        self.playback.looping = looping;
    }

    /// Animate a clip property toward `target` over `duration` seconds.
    ///
    /// The property's current value is captured as the start value at
    /// call time; a second call on the same property replaces the
    /// in-flight animation from its current interpolated value.
    pub fn animate(
        &mut self,
        project: &Project,
        clip_id: &str,
        property: AnimatableProperty,
        target: f64,
        duration: f64,
        easing: Easing,
        now: f64,
    ) -> Result<(), EditingError> {
        let clip = project.find_clip(clip_id).ok_or_else(|| {
            EditingError::EffectError(format!("Clip not found: {}", clip_id))
        })?;

        let t = bridge::effects_to_transform(&clip.effects);
        let current = match property {
            AnimatableProperty::Scale => t.scale,
            AnimatableProperty::PositionX => t.position_x,
            AnimatableProperty::PositionY => t.position_y,
            AnimatableProperty::Rotation => t.rotation,
            AnimatableProperty::Opacity => t.opacity,
            AnimatableProperty::Volume => clip
                .effects
                .iter()
                .find(|e| e.effect_id == "volume" && e.enabled)
                .and_then(|e| e.parameter("volume"))
                .unwrap_or(1.0),
        };

        self.animations.start(
            AnimationKey {
                clip_id: clip_id.to_string(),
                property,
            },
            current,
            target,
            duration,
            easing,
            now,
        );
        Ok(())
    }

    pub fn active_animations(&self) -> usize {
        self.animations.len()
    }

    /// Drop any in-flight animations for a clip, e.g. when it is deleted.
    pub fn cancel_animations(&mut self, clip_id: &str) {
        self.animations.cancel_clip(clip_id);
    }

    /// One frame of the continuous draw loop. `now` is wall time in
    /// seconds from any monotonic host clock.
    ///
    /// Runs regardless of play/pause so that parameter edits show up on
    /// the static frame; tolerates re-entry every frame without growth —
    /// in-flight animations are the only per-frame state and are purged
    /// on completion.
    pub fn tick(&mut self, project: &mut Project, now: f64) {
        if self.state == EngineState::Uninitialized {
            return;
        }

        // A decode failure reported since the last frame returns the
        // engine to Idle; the error is kept for the caller to read.
        if let Some(err) = self.decode.take_error() {
            warn!("decode surface failed: {}", err);
            self.decode.unload();
            self.playback.playing = false;
            self.state = EngineState::Idle;
            self.last_error = Some(err);
        }

        // (1) While playing, the decode surface's clock is the time
        // authority — except right after a seek, when its stale position
        // would flash the playhead back for a frame.
        if self.state == EngineState::Playing {
            if self.seek_suppress > 0 {
                self.seek_suppress -= 1;
            } else if let Some(clip) = active_clip(project, self.playback.current_time) {
                self.playback.current_time =
                    clip.timeline_start + (self.decode.current_time() - clip.source_start);
            }
        }

        // (2) Advance parameter animations and write the interpolated
        // values back into the data model.
        for sample in self.animations.advance(now) {
            if let Some(clip) = project.find_clip_mut(&sample.key.clip_id) {
                let effect = bridge::find_or_create_builtin(
                    &mut clip.effects,
                    sample.key.property.effect_id(),
                );
                effect
                    .parameters
                    .insert(sample.key.property.parameter_id().to_string(), sample.value);
            }
        }

        // Playback ran off the end of the active clip's span.
        if self.state == EngineState::Playing
            && active_clip(project, self.playback.current_time).is_none()
        {
            if self.playback.looping {
                let _ = self.seek(project, 0.0);
            } else {
                self.pause();
            }
        }

        // (3) Resolve the clip under the playhead; a gap paints the
        // placeholder and ends the frame.
        let clip = match active_clip(project, self.playback.current_time) {
            Some(c) => c,
            None => {
                self.raster.clear();
                return;
            }
        };

        // Source still decoding: skip compositing rather than blocking.
        if self.decode.ready_state() != ReadyState::Ready {
            return;
        }

        // (4) Project the stack to a flat transform at clip-relative
        // time and composite. The op order below is a contract: opacity,
        // combined filter, translate to center + offset, rotate, scale,
        // then draw fit-to-composition.
        let clip_time = self.playback.current_time - clip.timeline_start;
        let t = bridge::effects_to_transform_at(&clip.effects, clip_time);

        let (comp_w, comp_h) = self.raster.size();
        let (comp_w, comp_h) = (comp_w as f64, comp_h as f64);

        let (src_w, src_h) = project
            .find_media(&clip.media_id)
            .and_then(|m| m.width.zip(m.height))
            .map(|(w, h)| (w as f64, h as f64))
            .unwrap_or((comp_w, comp_h));
        let (fit_w, fit_h) = letterbox_fit(src_w, src_h, comp_w, comp_h);

        self.raster.clear();
        self.raster.set_alpha(t.opacity.clamp(0.0, 1.0));
        let filter = raster_filter(&t);
        self.raster
            .set_filter(if filter.is_empty() { "none" } else { &filter });
        self.raster
            .translate(comp_w / 2.0 + t.position_x, comp_h / 2.0 + t.position_y);
        self.raster.rotate(t.rotation.to_radians());
        self.raster.scale(t.scale.max(0.01));
        self.raster
            .draw_frame(-fit_w / 2.0, -fit_h / 2.0, fit_w, fit_h);
        self.raster.reset();
    }

    /// Tear the engine down from any state. A destroyed engine ignores
    /// every call except being dropped.
    pub fn destroy(&mut self) {
        if self.state == EngineState::Uninitialized {
            return;
        }
        self.decode.unload();
        self.playback = PlaybackState::default();
        self.animations = AnimationSet::new();
        self.state = EngineState::Uninitialized;
    }
}
