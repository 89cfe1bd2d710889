//! Compiles clips and their effect stacks into an ffmpeg filter_complex
//! program.
//!
//! Pure string building: the compiler never runs the external tool. Per
//! clip it emits a trim-and-reset-timestamps stage, one filter primitive
//! per enabled non-default effect (in stack order), and a
//! scale-to-composition letterbox stage; the per-clip chains are then
//! concatenated in ascending timeline order into one labeled video/audio
//! output pair.

use std::path::PathBuf;

use log::debug;
use montage_types::{AppliedEffect, Project, TrackKind};

use crate::engine::editing::effects::{
    registry, BuiltinKind, EffectDescriptor, FilterMapping, PARAM_EPSILON,
};
use crate::engine::editing::types::EditingError;

/// A clip with its source path resolved, ready for compilation.
#[derive(Debug, Clone)]
pub struct ExportClip {
    pub source_path: PathBuf,

    pub source_start: f64,

    pub source_end: f64,

    pub timeline_start: f64,

    pub effects: Vec<AppliedEffect>,
}

impl ExportClip {
    pub fn duration(&self) -> f64 {
        self.source_end - self.source_start
    }

    /// Gather every clip on the project's video tracks in ascending
    /// timeline order. Fails when a referenced media file has no native
    /// path — export needs real files on disk.
    pub fn from_project(project: &Project) -> Result<Vec<ExportClip>, EditingError> {
        let mut clips = Vec::new();

        for track in project.tracks.iter().filter(|t| t.kind == TrackKind::Video) {
            for clip in &track.clips {
                let media = project.find_media(&clip.media_id).ok_or_else(|| {
                    EditingError::ExportError(format!("Unknown media: {}", clip.media_id))
                })?;
                let path = media.path.clone().ok_or_else(|| {
                    EditingError::ExportError(format!(
                        "Media {} has no file path; cannot export",
                        media.name
                    ))
                })?;

                clips.push(ExportClip {
                    source_path: path,
                    source_start: clip.source_start,
                    source_end: clip.source_end,
                    timeline_start: clip.timeline_start,
                    effects: clip.effects.clone(),
                });
            }
        }

        clips.sort_by(|a, b| a.timeline_start.total_cmp(&b.timeline_start));
        Ok(clips)
    }
}

/// The compiled program plus the labels of its output pins.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterGraph {
    pub program: String,

    pub video_out: String,

    pub audio_out: String,
}

fn fmt(v: f64) -> String {
    format!("{:.6}", v)
}

/// Export-time value of a parameter: keyframes (sampled at the clip's
/// start) override the static value, and everything is clamped to the
/// descriptor range before touching filter syntax.
fn export_value(descriptor: &EffectDescriptor, effect: &AppliedEffect, param: &str) -> f64 {
    descriptor.value_of_at(effect, param, 0.0)
}

fn is_noop(descriptor: &EffectDescriptor, effect: &AppliedEffect) -> bool {
    descriptor
        .params
        .iter()
        .all(|p| (export_value(descriptor, effect, p.id) - p.default).abs() < PARAM_EPSILON)
}

/// `filter=opt1=v1:opt2=v2…` for a data-driven effect; parameters at
/// their defaults are skipped, and a fully-default effect is elided.
fn generic_filter(
    filter: &str,
    descriptor: &EffectDescriptor,
    effect: &AppliedEffect,
) -> Option<String> {
    let mut opts = Vec::new();
    for p in descriptor.params.iter().filter(|p| !p.ffmpeg_name.is_empty()) {
        let value = export_value(descriptor, effect, p.id);
        if (value - p.default).abs() < PARAM_EPSILON {
            continue;
        }
        opts.push(format!("{}={}", p.ffmpeg_name, fmt(value)));
    }

    if opts.is_empty() {
        None
    } else {
        Some(format!("{}={}", filter, opts.join(":")))
    }
}

/// Hand-written primitive for a builtin whose ffmpeg syntax is not a
/// flat option list. Returns `None` when the effect is a no-op at its
/// current values. Cross-dissolve is absent here on purpose — it spans
/// two clips and is resolved by the compile driver.
fn builtin_filter(
    kind: BuiltinKind,
    descriptor: &EffectDescriptor,
    effect: &AppliedEffect,
) -> Option<String> {
    match kind {
        BuiltinKind::Scale => {
            let scale = export_value(descriptor, effect, "scale");
            if (scale - 1.0).abs() < PARAM_EPSILON {
                return None;
            }
            Some(format!("scale=iw*{}:ih*{}", fmt(scale), fmt(scale)))
        }
        BuiltinKind::Position => {
            let x = export_value(descriptor, effect, "positionX");
            let y = export_value(descriptor, effect, "positionY");
            if x.abs() < PARAM_EPSILON && y.abs() < PARAM_EPSILON {
                return None;
            }
            // Offset by padding on one side and cropping the other; a
            // plain crop cannot move content past the frame edge.
            let abs_x = x.abs() as u32;
            let abs_y = y.abs() as u32;
            let crop_x = if x > 0.0 { 0 } else { abs_x };
            let crop_y = if y > 0.0 { 0 } else { abs_y };
            let pad_x = if x > 0.0 { abs_x } else { 0 };
            let pad_y = if y > 0.0 { abs_y } else { 0 };
            Some(format!(
                "pad=iw+{}:ih+{}:{}:{}:black,crop=iw-{}:ih-{}:{}:{}",
                abs_x, abs_y, pad_x, pad_y, abs_x, abs_y, crop_x, crop_y
            ))
        }
        BuiltinKind::Rotation => {
            let degrees = export_value(descriptor, effect, "degrees");
            if degrees.abs() < PARAM_EPSILON {
                return None;
            }
            let radians = degrees.to_radians();
            Some(format!("rotate={}:fillcolor=black", fmt(radians)))
        }
        BuiltinKind::Opacity => {
            let opacity = export_value(descriptor, effect, "opacity");
            if (opacity - 1.0).abs() < PARAM_EPSILON {
                return None;
            }
            Some(format!("format=rgba,colorchannelmixer=aa={}", fmt(opacity)))
        }
        BuiltinKind::Grayscale => {
            let amount = export_value(descriptor, effect, "amount");
            if amount < PARAM_EPSILON {
                return None;
            }
            if amount >= 1.0 {
                Some("hue=s=0".to_string())
            } else {
                Some(format!("hue=s={}", fmt(1.0 - amount)))
            }
        }
        BuiltinKind::Sharpen => {
            let amount = export_value(descriptor, effect, "amount");
            if amount < PARAM_EPSILON {
                return None;
            }
            Some(format!("unsharp=5:5:{}:5:5:{}", fmt(amount), fmt(amount / 2.0)))
        }
        BuiltinKind::Sepia => {
            let amount = export_value(descriptor, effect, "amount");
            if amount < PARAM_EPSILON {
                return None;
            }
            // 3x3 channel mix interpolated between identity and the full
            // sepia matrix by the effect's amount.
            let lerp = |identity: f64, sepia: f64| identity + (sepia - identity) * amount;
            Some(format!(
                "colorchannelmixer={}:{}:{}:0:{}:{}:{}:0:{}:{}:{}",
                fmt(lerp(1.0, 0.393)),
                fmt(lerp(0.0, 0.769)),
                fmt(lerp(0.0, 0.189)),
                fmt(lerp(0.0, 0.349)),
                fmt(lerp(1.0, 0.686)),
                fmt(lerp(0.0, 0.168)),
                fmt(lerp(0.0, 0.272)),
                fmt(lerp(0.0, 0.534)),
                fmt(lerp(1.0, 0.131))
            ))
        }
        BuiltinKind::PlaybackSpeed => {
            let rate = export_value(descriptor, effect, "rate");
            if (rate - 1.0).abs() < PARAM_EPSILON {
                return None;
            }
            Some(format!("setpts={}*PTS", fmt(1.0 / rate)))
        }
        BuiltinKind::FadeIn => {
            let duration = export_value(descriptor, effect, "duration");
            if duration < PARAM_EPSILON {
                return None;
            }
            Some(format!("fade=t=in:d={}", fmt(duration)))
        }
        BuiltinKind::FadeOut => {
            let start = export_value(descriptor, effect, "start");
            let duration = export_value(descriptor, effect, "duration");
            if duration < PARAM_EPSILON {
                return None;
            }
            Some(format!("fade=t=out:st={}:d={}", fmt(start), fmt(duration)))
        }
        BuiltinKind::CrossDissolve => None,
    }
}

/// The video filter primitives for one clip's stack, in stack order.
///
/// `carry_fade_in` is a dissolve handed over from the previous clip;
/// the returned carry is this clip's own dissolve duration for the next
/// one. Unknown effect ids are skipped, keeping forward compatibility
/// with newer registries.
fn video_filters(
    effects: &[AppliedEffect],
    clip_duration: f64,
    carry_fade_in: Option<f64>,
) -> (Vec<String>, Option<f64>) {
    let mut filters = Vec::new();
    let mut carry_out = None;

    if let Some(duration) = carry_fade_in {
        filters.push(format!("fade=t=in:d={}", fmt(duration)));
    }

    for effect in effects.iter().filter(|e| e.enabled) {
        let descriptor = match registry().get(&effect.effect_id) {
            Some(d) => d,
            None => {
                debug!("unknown effect id {}, skipping", effect.effect_id);
                continue;
            }
        };
        if descriptor.audio || is_noop(descriptor, effect) {
            continue;
        }

        match descriptor.mapping {
            FilterMapping::Custom(BuiltinKind::CrossDissolve) => {
                let duration = export_value(descriptor, effect, "duration");
                if duration < PARAM_EPSILON {
                    continue;
                }
                let duration = duration.min(clip_duration);
                // Tail of this clip fades out; the head fade-in lands on
                // the following clip via the carry.
                filters.push(format!(
                    "fade=t=out:st={}:d={}",
                    fmt((clip_duration - duration).max(0.0)),
                    fmt(duration)
                ));
                carry_out = Some(duration);
            }
            FilterMapping::Custom(kind) => {
                if let Some(filter) = builtin_filter(kind, descriptor, effect) {
                    filters.push(filter);
                }
            }
            FilterMapping::Generic { filter } => {
                if let Some(filter) = generic_filter(filter, descriptor, effect) {
                    filters.push(filter);
                }
            }
        }
    }

    (filters, carry_out)
}

/// `atempo` only accepts a bounded ratio per stage; rates below the 0.5
/// floor are decomposed into a chain whose multiplicative product equals
/// the requested rate.
fn atempo_chain(rate: f64) -> Vec<String> {
    let mut filters = Vec::new();

    if (0.5..=100.0).contains(&rate) {
        filters.push(format!("atempo={}", fmt(rate)));
    } else if rate < 0.5 {
        let mut remaining = rate;
        while remaining < 0.5 {
            filters.push("atempo=0.5".to_string());
            remaining /= 0.5;
        }
        filters.push(format!("atempo={}", fmt(remaining)));
    } else {
        filters.push("atempo=100.000000".to_string());
    }

    filters
}

/// Audio filter primitives for one clip: playback-rate adjustment and
/// gain.
fn audio_filters(effects: &[AppliedEffect]) -> Vec<String> {
    let mut filters = Vec::new();

    for effect in effects.iter().filter(|e| e.enabled) {
        let descriptor = match registry().get(&effect.effect_id) {
            Some(d) => d,
            None => continue,
        };

        match effect.effect_id.as_str() {
            "playback_speed" => {
                let rate = export_value(descriptor, effect, "rate");
                if (rate - 1.0).abs() < PARAM_EPSILON {
                    continue;
                }
                filters.extend(atempo_chain(rate));
            }
            "volume" => {
                let volume = export_value(descriptor, effect, "volume");
                if (volume - 1.0).abs() < PARAM_EPSILON {
                    continue;
                }
                filters.push(format!("volume={}", fmt(volume)));
            }
            _ => {}
        }
    }

    filters
}

/// Compile clips (already in ascending timeline order) into the full
/// filter_complex program plus the labeled output pins.
pub fn compile_filter_graph(clips: &[ExportClip], width: u32, height: u32) -> FilterGraph {
    if clips.is_empty() {
        return FilterGraph {
            program: String::new(),
            video_out: String::new(),
            audio_out: String::new(),
        };
    }

    let mut parts = Vec::new();
    let mut pairs = Vec::new();
    let mut carry_fade_in = None;

    for (i, clip) in clips.iter().enumerate() {
        let mut video = format!(
            "[{}:v]trim=start={}:end={},setpts=PTS-STARTPTS",
            i,
            fmt(clip.source_start),
            fmt(clip.source_end)
        );
        let mut audio = format!(
            "[{}:a]atrim=start={}:end={},asetpts=PTS-STARTPTS",
            i,
            fmt(clip.source_start),
            fmt(clip.source_end)
        );

        let (filters, carry_out) = video_filters(&clip.effects, clip.duration(), carry_fade_in);
        carry_fade_in = carry_out;
        for f in &filters {
            video.push(',');
            video.push_str(f);
        }

        // Conform every clip to the composition raster: fit inside,
        // letterbox the rest.
        video.push_str(&format!(
            ",scale={}:{}:force_original_aspect_ratio=decrease,pad={}:{}:(ow-iw)/2:(oh-ih)/2:black",
            width, height, width, height
        ));

        for f in &audio_filters(&clip.effects) {
            audio.push(',');
            audio.push_str(f);
        }

        parts.push(format!("{}[v{}]", video, i));
        parts.push(format!("{}[a{}]", audio, i));
        pairs.push((format!("[v{}]", i), format!("[a{}]", i)));
    }

    // A single clip passes its pins straight through; otherwise one
    // N-way concatenation stage joins everything.
    if clips.len() == 1 {
        return FilterGraph {
            program: parts.join(";"),
            video_out: "[v0]".to_string(),
            audio_out: "[a0]".to_string(),
        };
    }

    let concat_inputs: String = pairs
        .iter()
        .map(|(v, a)| format!("{}{}", v, a))
        .collect();
    parts.push(format!(
        "{}concat=n={}:v=1:a=1[vout][aout]",
        concat_inputs,
        clips.len()
    ));

    FilterGraph {
        program: parts.join(";"),
        video_out: "[vout]".to_string(),
        audio_out: "[aout]".to_string(),
    }
}
