use serde::{Serialize, Deserialize};

use crate::effect::AppliedEffect;
use crate::media::MediaFile;
use crate::transform::Transform;

/// Output frame geometry and rate of a project.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Composition {
    pub width: u32,

    pub height: u32,

    pub frame_rate: f64,
}

impl Default for Composition {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            frame_rate: 30.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Text,
    Effect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,

    pub kind: TrackKind,

    #[serde(default)]
    pub muted: bool,

    #[serde(default)]
    pub locked: bool,

    #[serde(default = "default_true")]
    pub visible: bool,

    #[serde(default)]
    pub clips: Vec<Clip>,
}

fn default_true() -> bool {
    true
}

impl Track {
    pub fn new(id: impl Into<String>, kind: TrackKind) -> Self {
        Self {
            id: id.into(),
            kind,
            muted: false,
            locked: false,
            visible: true,
            clips: Vec::new(),
        }
    }

    /// The clip occupying `time`, if any. Clip spans are half-open:
    /// `[timeline_start, timeline_start + duration)`.
    pub fn clip_at(&self, time: f64) -> Option<&Clip> {
        self.clips.iter().find(|c| c.contains(time))
    }

    /// Keeps clips ordered by timeline position; callers mutate clips in
    /// place and re-sort rather than maintaining order incrementally.
    pub fn sort_clips(&mut self) {
        self.clips
            .sort_by(|a, b| a.timeline_start.total_cmp(&b.timeline_start));
    }
}

/// A placed reference to a time-windowed slice of a media file.
///
/// `source_start`/`source_end` are seconds on the source file's own
/// clock; `timeline_start` is seconds on the composition clock. The
/// structural invariants — `source_end > source_start` and
/// `timeline_start >= 0` — are upheld by the interaction layer; the data
/// model only asserts them through `is_valid`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Clip {
    pub id: String,

    pub media_id: String,

    pub source_start: f64,

    pub source_end: f64,

    pub timeline_start: f64,

    #[serde(default)]
    pub effects: Vec<AppliedEffect>,

    /// Flat transform from pre-effect-stack project documents. Read once
    /// at load to bootstrap `effects`, never written back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Transform>,
}

impl Clip {
    pub fn new(
        id: impl Into<String>,
        media_id: impl Into<String>,
        source_start: f64,
        source_end: f64,
        timeline_start: f64,
    ) -> Self {
        Self {
            id: id.into(),
            media_id: media_id.into(),
            source_start,
            source_end,
            timeline_start,
            effects: Vec::new(),
            transform: None,
        }
    }

    pub fn duration(&self) -> f64 {
        self.source_end - self.source_start
    }

    pub fn timeline_end(&self) -> f64 {
        self.timeline_start + self.duration()
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.timeline_start && time < self.timeline_end()
    }

    pub fn is_valid(&self) -> bool {
        self.source_end > self.source_start && self.timeline_start >= 0.0
    }

    /// Whether this clip overlaps `other` in timeline time.
    pub fn overlaps(&self, other: &Clip) -> bool {
        self.timeline_start < other.timeline_end() && other.timeline_start < self.timeline_end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,

    pub name: String,

    pub composition: Composition,

    #[serde(default)]
    pub tracks: Vec<Track>,

    /// Media pool. Entries are created on import and pruned when no clip
    /// references them; usage is recomputed by scanning tracks, never
    /// stored as a count.
    #[serde(default)]
    pub media: Vec<MediaFile>,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            composition: Composition::default(),
            tracks: Vec::new(),
            media: Vec::new(),
        }
    }

    /// Total duration: the max end time over all clips, recomputed on
    /// every call so it can never drift from the clips themselves.
    pub fn duration(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|t| t.clips.iter())
            .map(|c| c.timeline_end())
            .fold(0.0, f64::max)
    }

    pub fn clips(&self) -> impl Iterator<Item = &Clip> {
        self.tracks.iter().flat_map(|t| t.clips.iter())
    }

    pub fn find_clip(&self, clip_id: &str) -> Option<&Clip> {
        self.clips().find(|c| c.id == clip_id)
    }

    pub fn find_clip_mut(&mut self, clip_id: &str) -> Option<&mut Clip> {
        self.tracks
            .iter_mut()
            .flat_map(|t| t.clips.iter_mut())
            .find(|c| c.id == clip_id)
    }

    /// Index of the track holding `clip_id`.
    pub fn track_of_clip(&self, clip_id: &str) -> Option<usize> {
        self.tracks
            .iter()
            .position(|t| t.clips.iter().any(|c| c.id == clip_id))
    }

    pub fn find_media(&self, media_id: &str) -> Option<&MediaFile> {
        self.media.iter().find(|m| m.id == media_id)
    }

    /// Whether any clip on any track references the media file.
    pub fn media_in_use(&self, media_id: &str) -> bool {
        self.clips().any(|c| c.media_id == media_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clip(id: &str, start: f64, end: f64, at: f64) -> Clip {
        Clip::new(id, "m1", start, end, at)
    }

    #[test]
    fn duration_is_max_end_over_all_tracks() {
        let mut project = Project::new("p1", "test");
        let mut video = Track::new("t1", TrackKind::Video);
        video.clips.push(clip("c1", 0.0, 5.0, 0.0));
        let mut audio = Track::new("t2", TrackKind::Audio);
        audio.clips.push(clip("c2", 0.0, 3.0, 10.0));
        project.tracks.push(video);
        project.tracks.push(audio);

        assert_eq!(project.duration(), 13.0);
    }

    #[test]
    fn empty_project_has_zero_duration() {
        let project = Project::new("p1", "test");
        assert_eq!(project.duration(), 0.0);
    }

    #[test]
    fn clip_span_is_half_open() {
        let c = clip("c1", 2.0, 7.0, 1.0);
        assert!(c.contains(1.0));
        assert!(c.contains(5.999));
        assert!(!c.contains(6.0));
        assert!(!c.contains(0.999));
    }

    #[test]
    fn overlap_detection_excludes_touching_edges() {
        let a = clip("a", 0.0, 5.0, 0.0);
        let b = clip("b", 0.0, 5.0, 5.0);
        let c = clip("c", 0.0, 5.0, 4.0);
        assert!(!a.overlaps(&b));
        assert!(a.overlaps(&c));
        assert!(c.overlaps(&a));
    }

    #[test]
    fn media_usage_is_recomputed_from_tracks() {
        let mut project = Project::new("p1", "test");
        project.media.push(MediaFile {
            id: "m1".to_string(),
            name: "a.mp4".to_string(),
            url: "file:///a.mp4".to_string(),
            path: None,
            duration: 10.0,
            width: None,
            height: None,
        });
        assert!(!project.media_in_use("m1"));

        let mut track = Track::new("t1", TrackKind::Video);
        track.clips.push(clip("c1", 0.0, 5.0, 0.0));
        project.tracks.push(track);
        assert!(project.media_in_use("m1"));
    }

    #[test]
    fn project_document_round_trips_with_camel_case_keys() {
        let mut project = Project::new("p1", "test");
        let mut track = Track::new("t1", TrackKind::Video);
        track.clips.push(clip("c1", 1.5, 4.0, 0.5));
        project.tracks.push(track);

        let json = serde_json::to_string(&project).unwrap();
        assert!(json.contains("\"sourceStart\":1.5"));
        assert!(json.contains("\"timelineStart\":0.5"));
        assert!(json.contains("\"mediaId\":\"m1\""));

        let back: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(back, project);
    }

    #[test]
    fn legacy_transform_field_is_optional() {
        let json = r#"{
            "id": "c1",
            "mediaId": "m1",
            "sourceStart": 0.0,
            "sourceEnd": 2.0,
            "timelineStart": 0.0
        }"#;
        let c: Clip = serde_json::from_str(json).unwrap();
        assert!(c.transform.is_none());
        assert!(c.effects.is_empty());
        assert!(c.is_valid());
    }
}
