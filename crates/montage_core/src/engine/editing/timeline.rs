//! Pointer-driven timeline editing: move, trim, split, snap.
//!
//! All mutation of the project's tracks and clips funnels through this
//! module. During a drag the model may hold transient overlap; `finish`
//! validates and either commits or reverts, so the at-rest model never
//! violates the no-overlap invariant. Degenerate results (zero or
//! negative duration, split on a boundary) are rejected with the model
//! left unchanged.

use anyhow::Result;
use log::debug;
use montage_types::{Clip, Project, TrackKind, Transform};

use crate::engine::editing::bridge;
use crate::engine::editing::types::{next_id, EditingError};

/// Width of the trim bands on each clip edge, in pixels.
pub const EDGE_BAND_PX: f64 = 6.0;

/// Pointer travel below this is a selection click, not a drag.
pub const DRAG_THRESHOLD_PX: f64 = 3.0;

/// Magnetic snap radius, in pixels.
pub const SNAP_THRESHOLD_PX: f64 = 8.0;

/// Shortest clip a trim may leave behind, in seconds.
pub const MIN_CLIP_SECONDS: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragZone {
    TrimStart,
    TrimEnd,
    Move,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragOutcome {
    /// Pointer never left the movement threshold; treat as selection.
    Click,
    /// Geometry change validated and kept.
    Committed,
    /// Drop would have produced an invalid timeline; model reverted.
    Rejected,
}

/// Which interaction zone a pointer position falls in, given the clip's
/// on-screen geometry. Edge bands are only reachable when the clip is
/// wide enough that the three zones stay unambiguous.
pub fn hit_zone(clip_left_px: f64, clip_width_px: f64, pointer_px: f64) -> DragZone {
    if clip_width_px > EDGE_BAND_PX * 3.0 {
        if pointer_px <= clip_left_px + EDGE_BAND_PX {
            return DragZone::TrimStart;
        }
        if pointer_px >= clip_left_px + clip_width_px - EDGE_BAND_PX {
            return DragZone::TrimEnd;
        }
    }
    DragZone::Move
}

/// The global snap-point set: zero, the playhead, and both edges of
/// every clip on every track except the one being dragged.
///
/// Recomputed per drag frame; fine for small projects. A sorted index
/// updated on mutation would be the scaling story, not a correctness one.
pub fn snap_points(project: &Project, exclude_clip: &str, playhead: f64) -> Vec<f64> {
    let mut points = vec![0.0, playhead];
    for clip in project.clips().filter(|c| c.id != exclude_clip) {
        points.push(clip.timeline_start);
        points.push(clip.timeline_end());
    }
    points
}

fn nearest_snap(edge: f64, points: &[f64]) -> Option<(f64, f64)> {
    points
        .iter()
        .map(|p| (p - edge, (p - edge).abs()))
        .min_by(|a, b| a.1.total_cmp(&b.1))
}

/// Correction to apply so that whichever clip edge lands closest to a
/// snap point within `threshold` aligns exactly; zero when neither edge
/// is in range. Both edges shift by the same delta, preserving length.
pub fn snap_delta(left: f64, right: f64, points: &[f64], threshold: f64) -> f64 {
    let left_hit = nearest_snap(left, points);
    let right_hit = nearest_snap(right, points);

    match (left_hit, right_hit) {
        (Some((dl, l)), Some((dr, r))) => {
            let (delta, dist) = if l <= r { (dl, l) } else { (dr, r) };
            if dist <= threshold {
                delta
            } else {
                0.0
            }
        }
        (Some((dl, l)), None) if l <= threshold => dl,
        (None, Some((dr, r))) if r <= threshold => dr,
        _ => 0.0,
    }
}

/// Correction for a single edge (trim interactions snap one edge only).
pub fn snap_delta_edge(edge: f64, points: &[f64], threshold: f64) -> f64 {
    match nearest_snap(edge, points) {
        Some((delta, dist)) if dist <= threshold => delta,
        _ => 0.0,
    }
}

/// One in-flight pointer interaction with a clip.
pub struct DragSession {
    clip_id: String,

    zone: DragZone,

    origin_px: f64,

    /// Geometry at pointer-down; restored on reject, compared on finish.
    initial: Clip,

    moved: bool,
}

impl DragSession {
    /// Begin an interaction at `pointer_px` (same horizontal scale as the
    /// timeline ruler). The zone is fixed for the whole drag.
    pub fn begin(
        project: &Project,
        clip_id: &str,
        pointer_px: f64,
        pixels_per_second: f64,
    ) -> Result<Self, EditingError> {
        let clip = project
            .find_clip(clip_id)
            .ok_or_else(|| EditingError::TimelineError(format!("Clip not found: {}", clip_id)))?;

        let left_px = clip.timeline_start * pixels_per_second;
        let width_px = clip.duration() * pixels_per_second;
        let zone = hit_zone(left_px, width_px, pointer_px);

        Ok(Self {
            clip_id: clip_id.to_string(),
            zone,
            origin_px: pointer_px,
            initial: clip.clone(),
            moved: false,
        })
    }

    pub fn zone(&self) -> DragZone {
        self.zone
    }

    pub fn clip_id(&self) -> &str {
        &self.clip_id
    }

    /// Apply the pointer position to the clip's transient geometry.
    ///
    /// Nothing happens until the pointer clears the movement threshold;
    /// after that every update rewrites the geometry from the initial
    /// snapshot, so updates are idempotent per pointer position.
    pub fn update(
        &mut self,
        project: &mut Project,
        pointer_px: f64,
        pixels_per_second: f64,
        playhead: f64,
    ) {
        if !self.moved && (pointer_px - self.origin_px).abs() <= DRAG_THRESHOLD_PX {
            return;
        }
        self.moved = true;

        let delta_seconds = (pointer_px - self.origin_px) / pixels_per_second;
        let threshold_seconds = SNAP_THRESHOLD_PX / pixels_per_second;
        let points = snap_points(project, &self.clip_id, playhead);

        match self.zone {
            DragZone::Move => {
                let duration = self.initial.duration();
                let candidate = (self.initial.timeline_start + delta_seconds).max(0.0);
                let correction = snap_delta(
                    candidate,
                    candidate + duration,
                    &points,
                    threshold_seconds,
                );
                let new_start = (candidate + correction).max(0.0);

                if let Some(clip) = project.find_clip_mut(&self.clip_id) {
                    clip.timeline_start = new_start;
                }
            }
            DragZone::TrimStart => {
                let candidate = self.initial.timeline_start + delta_seconds;
                let correction = snap_delta_edge(candidate, &points, threshold_seconds);

                // Source start and timeline start move by the same total
                // delta; the trimmed duration stays consistent and
                // source_end never changes.
                let mut total = (candidate + correction) - self.initial.timeline_start;
                total = total.max(-self.initial.source_start);
                total = total.max(-self.initial.timeline_start);
                total = total.min(self.initial.duration() - MIN_CLIP_SECONDS);

                if let Some(clip) = project.find_clip_mut(&self.clip_id) {
                    clip.timeline_start = self.initial.timeline_start + total;
                    clip.source_start = self.initial.source_start + total;
                }
            }
            DragZone::TrimEnd => {
                let candidate = self.initial.timeline_end() + delta_seconds;
                let correction = snap_delta_edge(candidate, &points, threshold_seconds);
                let delta_end = (candidate + correction) - self.initial.timeline_end();

                let media_duration = project
                    .find_media(&self.initial.media_id)
                    .map(|m| m.duration)
                    .filter(|d| *d > 0.0);

                let mut new_end = self.initial.source_end + delta_end;
                new_end = new_end.max(self.initial.source_start + MIN_CLIP_SECONDS);
                if let Some(limit) = media_duration {
                    new_end = new_end.min(limit);
                }

                if let Some(clip) = project.find_clip_mut(&self.clip_id) {
                    clip.source_end = new_end;
                }
            }
        }
    }

    /// End the interaction: validate the drop and commit or revert.
    pub fn finish(self, project: &mut Project) -> DragOutcome {
        if !self.moved {
            return DragOutcome::Click;
        }

        let track_idx = match project.track_of_clip(&self.clip_id) {
            Some(idx) => idx,
            None => return DragOutcome::Rejected,
        };

        let candidate = match project.find_clip(&self.clip_id) {
            Some(clip) => clip.clone(),
            None => return DragOutcome::Rejected,
        };

        let overlapping = project.tracks[track_idx]
            .clips
            .iter()
            .any(|other| other.id != self.clip_id && other.overlaps(&candidate));

        if overlapping || !candidate.is_valid() {
            debug!(
                "drop rejected for {}: overlap={} valid={}",
                self.clip_id,
                overlapping,
                candidate.is_valid()
            );
            if let Some(clip) = project.find_clip_mut(&self.clip_id) {
                clip.timeline_start = self.initial.timeline_start;
                clip.source_start = self.initial.source_start;
                clip.source_end = self.initial.source_end;
            }
            return DragOutcome::Rejected;
        }

        project.tracks[track_idx].sort_clips();
        DragOutcome::Committed
    }
}

/// Split the clip spanning `time` into two clips with contiguous source
/// windows. Splitting at or outside the clip's span is rejected.
///
/// Returns the id of the right-hand child.
pub fn split_clip(project: &mut Project, clip_id: &str, time: f64) -> Result<String, EditingError> {
    let track_idx = project
        .track_of_clip(clip_id)
        .ok_or_else(|| EditingError::TimelineError(format!("Clip not found: {}", clip_id)))?;

    let clip = project
        .find_clip(clip_id)
        .ok_or_else(|| EditingError::TimelineError(format!("Clip not found: {}", clip_id)))?
        .clone();

    if time <= clip.timeline_start || time >= clip.timeline_end() {
        return Err(EditingError::TimelineError(format!(
            "Split position {} is outside clip bounds",
            time
        )));
    }

    let offset = time - clip.timeline_start;

    let mut right = Clip::new(
        next_id("clip"),
        clip.media_id.clone(),
        clip.source_start + offset,
        clip.source_end,
        time,
    );
    // Deep copy of the stack; each child is independently editable from
    // here on, so every copied instance gets a fresh id.
    right.effects = clip
        .effects
        .iter()
        .map(|e| {
            let mut copy = e.clone();
            copy.id = next_id("fx");
            copy
        })
        .collect();
    let right_id = right.id.clone();

    if let Some(left) = project.find_clip_mut(clip_id) {
        left.source_end = left.source_start + offset;
    }

    project.tracks[track_idx].clips.push(right);
    project.tracks[track_idx].sort_clips();

    Ok(right_id)
}

/// Razor at a timeline position: splits the first clip spanning `time`
/// on any visible video track.
pub fn split_at(project: &mut Project, time: f64) -> Result<String, EditingError> {
    let clip_id = project
        .tracks
        .iter()
        .filter(|t| t.visible && t.kind == TrackKind::Video)
        .find_map(|t| t.clip_at(time))
        .map(|c| c.id.clone())
        .ok_or_else(|| {
            EditingError::TimelineError(format!("No clip spans t={}", time))
        })?;

    split_clip(project, &clip_id, time)
}

/// Non-drag move used by action input. Clamps to zero, rejects overlap.
pub fn move_clip(
    project: &mut Project,
    clip_id: &str,
    new_timeline_start: f64,
) -> Result<(), EditingError> {
    let track_idx = project
        .track_of_clip(clip_id)
        .ok_or_else(|| EditingError::TimelineError(format!("Clip not found: {}", clip_id)))?;

    let mut candidate = project
        .find_clip(clip_id)
        .ok_or_else(|| EditingError::TimelineError(format!("Clip not found: {}", clip_id)))?
        .clone();
    candidate.timeline_start = new_timeline_start.max(0.0);

    let overlapping = project.tracks[track_idx]
        .clips
        .iter()
        .any(|other| other.id != clip_id && other.overlaps(&candidate));
    if overlapping {
        return Err(EditingError::TimelineError(
            "Move would overlap a neighboring clip".to_string(),
        ));
    }

    if let Some(clip) = project.find_clip_mut(clip_id) {
        clip.timeline_start = candidate.timeline_start;
    }
    project.tracks[track_idx].sort_clips();
    Ok(())
}

/// Non-drag trim used by action input. `new_start`/`new_end` are
/// timeline times; either may be omitted. Degenerate windows are
/// rejected with the model unchanged.
pub fn trim_clip(
    project: &mut Project,
    clip_id: &str,
    new_start: Option<f64>,
    new_end: Option<f64>,
) -> Result<(), EditingError> {
    let clip = project
        .find_clip(clip_id)
        .ok_or_else(|| EditingError::TimelineError(format!("Clip not found: {}", clip_id)))?
        .clone();

    let mut updated = clip.clone();

    if let Some(start) = new_start {
        let delta = start - clip.timeline_start;
        updated.timeline_start = start;
        updated.source_start = clip.source_start + delta;
    }
    if let Some(end) = new_end {
        let delta = end - clip.timeline_end();
        updated.source_end = clip.source_end + delta;
    }

    if !updated.is_valid() || updated.source_start < 0.0 || updated.duration() < MIN_CLIP_SECONDS {
        return Err(EditingError::TimelineError(format!(
            "Trim would produce a degenerate clip: [{}, {})",
            updated.source_start, updated.source_end
        )));
    }

    if let Some(limit) = project
        .find_media(&clip.media_id)
        .map(|m| m.duration)
        .filter(|d| *d > 0.0)
    {
        if updated.source_end > limit + f64::EPSILON {
            return Err(EditingError::TimelineError(format!(
                "Trim past end of source media ({}s)",
                limit
            )));
        }
    }

    if let Some(target) = project.find_clip_mut(clip_id) {
        *target = updated;
    }
    Ok(())
}

pub fn delete_clip(project: &mut Project, clip_id: &str) -> bool {
    for track in &mut project.tracks {
        let before = track.clips.len();
        track.clips.retain(|c| c.id != clip_id);
        if track.clips.len() != before {
            return true;
        }
    }
    false
}

/// Create a clip covering the whole media file at `at` seconds on the
/// given track. New clips are bootstrapped with the structural builtin
/// stack so downstream code never sees an empty transform.
pub fn insert_clip(
    project: &mut Project,
    track_id: &str,
    media_id: &str,
    at: f64,
) -> Result<String, EditingError> {
    let duration = project
        .find_media(media_id)
        .map(|m| m.duration)
        .ok_or_else(|| EditingError::TimelineError(format!("Unknown media: {}", media_id)))?;
    if duration <= 0.0 {
        return Err(EditingError::TimelineError(format!(
            "Media {} has no duration",
            media_id
        )));
    }

    let track_idx = project
        .tracks
        .iter()
        .position(|t| t.id == track_id)
        .ok_or_else(|| EditingError::TimelineError(format!("Unknown track: {}", track_id)))?;

    let mut clip = Clip::new(next_id("clip"), media_id, 0.0, duration, at.max(0.0));
    clip.effects = bridge::transform_to_effects(&Transform::default());

    if project.tracks[track_idx]
        .clips
        .iter()
        .any(|other| other.overlaps(&clip))
    {
        return Err(EditingError::TimelineError(
            "Insert would overlap an existing clip".to_string(),
        ));
    }

    let clip_id = clip.id.clone();
    project.tracks[track_idx].clips.push(clip);
    project.tracks[track_idx].sort_clips();
    Ok(clip_id)
}

/// Drop media files no clip references anymore. Usage is recomputed by
/// scanning tracks on every call.
pub fn prune_unused_media(project: &mut Project) -> usize {
    let in_use: Vec<String> = project
        .media
        .iter()
        .filter(|m| project.media_in_use(&m.id))
        .map(|m| m.id.clone())
        .collect();

    let before = project.media.len();
    project.media.retain(|m| in_use.contains(&m.id));
    before - project.media.len()
}
