use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use anyhow::Result;
use log::{debug, info, warn};
use serde::{Serialize, Deserialize};
use montage_types::{MediaFile, Project};

use crate::engine::editing::types::{next_id, EditingError};

const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "avi", "mkv", "webm", "m4v", "flv", "wmv"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "flac", "ogg", "m4a", "wma"];

pub fn is_video_path(path: &Path) -> bool {
    matches_extension(path, VIDEO_EXTENSIONS)
}

pub fn is_audio_path(path: &Path) -> bool {
    matches_extension(path, AUDIO_EXTENSIONS)
}

fn matches_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .map(|e| extensions.contains(&e.as_str()))
        .unwrap_or(false)
}

/// Metadata extracted from a media file by the external prober.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaProbe {
    pub duration: f64,

    pub width: Option<u32>,

    pub height: Option<u32>,

    pub codec: Option<String>,

    pub fps: Option<f64>,

    pub audio_codec: Option<String>,

    pub sample_rate: Option<u32>,

    pub bit_rate: Option<u64>,
}

/// Parse the JSON document produced by
/// `ffprobe -print_format json -show_format -show_streams`.
pub fn parse_probe_output(json: &str) -> Result<MediaProbe, EditingError> {
    let doc: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| EditingError::ProbeError(format!("Failed to parse ffprobe output: {}", e)))?;

    let mut probe = MediaProbe::default();

    if let Some(format) = doc.get("format") {
        if let Some(duration) = format.get("duration").and_then(|d| d.as_str()) {
            probe.duration = duration.parse().unwrap_or(0.0);
        }
        if let Some(bit_rate) = format.get("bit_rate").and_then(|b| b.as_str()) {
            probe.bit_rate = bit_rate.parse().ok();
        }
    }

    if let Some(streams) = doc.get("streams").and_then(|s| s.as_array()) {
        for stream in streams {
            let codec_type = stream
                .get("codec_type")
                .and_then(|c| c.as_str())
                .unwrap_or("");

            match codec_type {
                "video" => {
                    probe.width = stream.get("width").and_then(|w| w.as_u64()).map(|w| w as u32);
                    probe.height = stream.get("height").and_then(|h| h.as_u64()).map(|h| h as u32);
                    probe.codec = stream
                        .get("codec_name")
                        .and_then(|c| c.as_str())
                        .map(String::from);

                    // r_frame_rate comes as a fraction, e.g. "30000/1001".
                    if let Some(rate) = stream.get("r_frame_rate").and_then(|f| f.as_str()) {
                        let parts: Vec<&str> = rate.split('/').collect();
                        if parts.len() == 2 {
                            if let (Ok(num), Ok(den)) =
                                (parts[0].parse::<f64>(), parts[1].parse::<f64>())
                            {
                                if den > 0.0 {
                                    probe.fps = Some(num / den);
                                }
                            }
                        }
                    }
                }
                "audio" => {
                    probe.audio_codec = stream
                        .get("codec_name")
                        .and_then(|c| c.as_str())
                        .map(String::from);
                    if let Some(rate) = stream.get("sample_rate").and_then(|s| s.as_str()) {
                        probe.sample_rate = rate.parse().ok();
                    }
                }
                _ => {}
            }
        }
    }

    Ok(probe)
}

/// Probe a media file with the external `ffprobe` binary.
pub fn probe_media(path: &Path) -> Result<MediaProbe, EditingError> {
    if !path.exists() {
        return Err(EditingError::ProbeError(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            EditingError::ProbeError(format!(
                "Failed to run ffprobe: {}. Make sure FFmpeg is installed.",
                e
            ))
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(EditingError::ProbeError(format!("ffprobe failed: {}", stderr)));
    }

    parse_probe_output(&String::from_utf8_lossy(&output.stdout))
}

/// Check that the external transcoder is reachable, returning its
/// version banner.
pub fn check_ffmpeg() -> Result<String, EditingError> {
    let output = Command::new("ffmpeg").arg("-version").output().map_err(|_| {
        EditingError::ProbeError(
            "FFmpeg not found. Please install FFmpeg to enable video export.".to_string(),
        )
    })?;

    if output.status.success() {
        let version = String::from_utf8_lossy(&output.stdout);
        Ok(version.lines().next().unwrap_or("FFmpeg found").to_string())
    } else {
        Err(EditingError::ProbeError(
            "FFmpeg found but returned an error.".to_string(),
        ))
    }
}

/// Imports media files into a project's media pool.
///
/// Probe results are cached by canonicalized path, and a path already in
/// the pool reuses its existing `MediaFile` id — media is shared by
/// reference across clips, never duplicated.
pub struct MediaImporter {
    probe_cache: HashMap<PathBuf, MediaProbe>,
}

impl MediaImporter {
    pub fn new() -> Self {
        Self {
            probe_cache: HashMap::new(),
        }
    }

    pub fn import_file(
        &mut self,
        project: &mut Project,
        path: &Path,
    ) -> Result<String, EditingError> {
        let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| PathBuf::from(path));

        if let Some(existing) = project
            .media
            .iter()
            .find(|m| m.path.as_deref() == Some(canonical.as_path()))
        {
            debug!("media already imported: {}", canonical.display());
            return Ok(existing.id.clone());
        }

        let probe = match self.probe_cache.get(&canonical) {
            Some(cached) => {
                debug!("probe cache hit for {}", canonical.display());
                cached.clone()
            }
            None => {
                let probe = probe_media(&canonical)?;
                self.probe_cache.insert(canonical.clone(), probe.clone());
                probe
            }
        };

        if probe.duration <= 0.0 {
            warn!("media has no usable duration: {}", canonical.display());
            return Err(EditingError::MediaLoadError(format!(
                "Media has no duration: {}",
                canonical.display()
            )));
        }

        let name = canonical
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| canonical.display().to_string());

        let media = MediaFile {
            id: next_id("media"),
            name: name.clone(),
            url: format!("file://{}", canonical.display()),
            path: Some(canonical),
            duration: probe.duration,
            width: probe.width,
            height: probe.height,
        };
        let id = media.id.clone();

        info!("imported {} ({:.2}s)", name, probe.duration);
        project.media.push(media);
        Ok(id)
    }
}

impl Default for MediaImporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_PROBE: &str = r#"{
        "format": { "duration": "12.480000", "bit_rate": "4880000" },
        "streams": [
            {
                "codec_type": "video",
                "codec_name": "h264",
                "width": 1920,
                "height": 1080,
                "r_frame_rate": "30000/1001"
            },
            {
                "codec_type": "audio",
                "codec_name": "aac",
                "sample_rate": "48000"
            }
        ]
    }"#;

    #[test]
    fn probe_output_parses_streams_and_format() {
        let probe = parse_probe_output(SAMPLE_PROBE).unwrap();
        assert_eq!(probe.duration, 12.48);
        assert_eq!(probe.width, Some(1920));
        assert_eq!(probe.height, Some(1080));
        assert_eq!(probe.codec.as_deref(), Some("h264"));
        assert!((probe.fps.unwrap() - 29.97).abs() < 0.01);
        assert_eq!(probe.audio_codec.as_deref(), Some("aac"));
        assert_eq!(probe.sample_rate, Some(48000));
        assert_eq!(probe.bit_rate, Some(4_880_000));
    }

    #[test]
    fn audio_only_probe_has_no_dimensions() {
        let json = r#"{
            "format": { "duration": "200.5" },
            "streams": [ { "codec_type": "audio", "codec_name": "mp3", "sample_rate": "44100" } ]
        }"#;
        let probe = parse_probe_output(json).unwrap();
        assert_eq!(probe.duration, 200.5);
        assert_eq!(probe.width, None);
        assert_eq!(probe.fps, None);
        assert_eq!(probe.audio_codec.as_deref(), Some("mp3"));
    }

    #[test]
    fn malformed_probe_output_is_an_error() {
        assert!(parse_probe_output("not json at all").is_err());
    }

    #[test]
    fn zero_denominator_frame_rate_is_ignored() {
        let json = r#"{
            "format": { "duration": "1.0" },
            "streams": [ { "codec_type": "video", "r_frame_rate": "30/0" } ]
        }"#;
        let probe = parse_probe_output(json).unwrap();
        assert_eq!(probe.fps, None);
    }

    #[test]
    fn extension_classification() {
        assert!(is_video_path(Path::new("/media/Clip.MP4")));
        assert!(is_video_path(Path::new("a.webm")));
        assert!(!is_video_path(Path::new("a.mp3")));
        assert!(is_audio_path(Path::new("track.flac")));
        assert!(!is_audio_path(Path::new("notes.txt")));
        assert!(!is_video_path(Path::new("no_extension")));
    }
}
