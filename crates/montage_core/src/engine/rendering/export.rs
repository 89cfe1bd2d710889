//! Out-of-process export: spawns the external `ffmpeg` binary with a
//! compiled filter graph and tracks it through its progress stream.
//!
//! The compile step is synchronous string building; the transcode is
//! long-running and polled from the UI side. Cancellation is cooperative
//! and idempotent — cancelling a job that is not running is a no-op
//! success. A failed export leaves any partial output in place for the
//! caller to clean up or retry.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;

use anyhow::Result;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::{Serialize, Deserialize};

use crate::engine::editing::types::EditingError;
use crate::engine::rendering::filter_graph::{compile_filter_graph, ExportClip, FilterGraph};
use crate::engine::rendering::formats::ExportSettings;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProgress {
    /// 0.0 to 100.0.
    pub percent: f64,

    pub frame: u64,

    pub total_frames: u64,

    /// Encoding speed as reported, e.g. "2.5x".
    pub speed: String,

    /// Estimated seconds remaining; 0.0 while unknown.
    pub eta: f64,

    pub running: bool,

    /// Terminal error, surfaced verbatim from the external tool.
    pub error: Option<String>,
}

impl Default for ExportProgress {
    fn default() -> Self {
        Self {
            percent: 0.0,
            frame: 0,
            total_frames: 0,
            speed: "0x".to_string(),
            eta: 0.0,
            running: false,
            error: None,
        }
    }
}

/// One line of ffmpeg's `-progress pipe:1` stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    OutTimeUs(f64),
    Frame(u64),
    Speed(String),
    Continue,
    End,
}

pub fn parse_progress_line(line: &str) -> Option<ProgressEvent> {
    if let Some(rest) = line.strip_prefix("out_time_us=") {
        return rest.trim().parse::<f64>().ok().map(ProgressEvent::OutTimeUs);
    }
    if let Some(rest) = line.strip_prefix("frame=") {
        return rest.trim().parse::<u64>().ok().map(ProgressEvent::Frame);
    }
    if let Some(rest) = line.strip_prefix("speed=") {
        return Some(ProgressEvent::Speed(rest.trim().to_string()));
    }
    if line.starts_with("progress=end") {
        return Some(ProgressEvent::End);
    }
    if line.starts_with("progress=continue") {
        return Some(ProgressEvent::Continue);
    }
    None
}

/// "2.5x" → 2.5. Unparseable speeds read as unknown.
pub fn parse_speed_multiplier(speed: &str) -> Option<f64> {
    speed.trim().trim_end_matches('x').parse::<f64>().ok()
}

/// The full ffmpeg argument list for an export. Pure, so the invocation
/// is testable without spawning anything.
pub fn build_ffmpeg_args(
    clips: &[ExportClip],
    graph: &FilterGraph,
    settings: &ExportSettings,
) -> Vec<String> {
    let mut args: Vec<String> = vec!["-y".to_string()];

    for clip in clips {
        args.push("-i".to_string());
        args.push(clip.source_path.to_string_lossy().to_string());
    }

    if !graph.program.is_empty() {
        args.push("-filter_complex".to_string());
        args.push(graph.program.clone());
        args.push("-map".to_string());
        args.push(graph.video_out.clone());
        args.push("-map".to_string());
        args.push(graph.audio_out.clone());
    }

    args.extend(settings.codec.codec_args(settings.quality));
    args.extend(settings.audio_codec.codec_args(&settings.audio_bitrate));

    args.push("-r".to_string());
    args.push(format!("{}", settings.fps));

    args.push("-progress".to_string());
    args.push("pipe:1".to_string());
    args.push("-stats_period".to_string());
    args.push("0.5".to_string());

    args.push(settings.output_path.to_string_lossy().to_string());
    args
}

/// A running export process plus its shared progress snapshot.
pub struct ExportJob {
    child: Arc<Mutex<Option<Child>>>,

    progress: Arc<Mutex<ExportProgress>>,

    reader: Option<thread::JoinHandle<()>>,
}

impl ExportJob {
    /// Compile the clips, spawn ffmpeg, and start following its progress
    /// stream on a reader thread.
    pub fn start(clips: &[ExportClip], settings: &ExportSettings) -> Result<Self, EditingError> {
        if clips.is_empty() {
            return Err(EditingError::ExportError("No clips to export".to_string()));
        }

        let graph = compile_filter_graph(clips, settings.width, settings.height);
        let args = build_ffmpeg_args(clips, &graph, settings);
        debug!("ffmpeg args: {:?}", args);

        let total_duration: f64 = clips.iter().map(|c| c.duration()).sum();
        let total_frames = (total_duration * settings.fps).ceil() as u64;

        let mut child = Command::new("ffmpeg")
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                EditingError::ExportError(format!(
                    "Failed to start FFmpeg: {}. Make sure FFmpeg is installed.",
                    e
                ))
            })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            EditingError::ExportError("FFmpeg stdout unavailable".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            EditingError::ExportError("FFmpeg stderr unavailable".to_string())
        })?;

        let progress = Arc::new(Mutex::new(ExportProgress {
            total_frames,
            running: true,
            ..ExportProgress::default()
        }));
        let child = Arc::new(Mutex::new(Some(child)));

        let reader = {
            let progress = progress.clone();
            let child = child.clone();
            thread::spawn(move || {
                follow_progress(stdout, stderr, child, progress, total_duration);
            })
        };

        info!(
            "export started: {} clip(s), {:.2}s total, -> {}",
            clips.len(),
            total_duration,
            settings.output_path.display()
        );

        Ok(Self {
            child,
            progress,
            reader: Some(reader),
        })
    }

    pub fn progress(&self) -> ExportProgress {
        self.progress.lock().clone()
    }

    pub fn is_running(&self) -> bool {
        self.progress.lock().running
    }

    /// Ask the external process to stop. Idempotent: cancelling a job
    /// that already finished (or was already cancelled) succeeds quietly.
    pub fn cancel(&self) -> Result<(), EditingError> {
        let mut guard = self.child.lock();
        if let Some(child) = guard.as_mut() {
            if self.progress.lock().running {
                child
                    .kill()
                    .map_err(|e| EditingError::ExportError(format!("Failed to cancel export: {}", e)))?;
                let mut p = self.progress.lock();
                p.running = false;
                p.error = Some("Export cancelled by user".to_string());
                info!("export cancelled");
            }
        }
        Ok(())
    }

    /// Block until the reader thread has drained the process.
    pub fn wait(mut self) -> ExportProgress {
        if let Some(handle) = self.reader.take() {
            let _ = handle.join();
        }
        self.progress.lock().clone()
    }
}

fn follow_progress(
    stdout: impl Read,
    stderr: impl Read,
    child: Arc<Mutex<Option<Child>>>,
    progress: Arc<Mutex<ExportProgress>>,
    total_duration: f64,
) {
    let mut current_time: Option<f64> = None;
    let mut current_speed: Option<String> = None;
    let mut current_frame: Option<u64> = None;

    for line in BufReader::new(stdout).lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };

        match parse_progress_line(&line) {
            Some(ProgressEvent::OutTimeUs(us)) => current_time = Some(us / 1_000_000.0),
            Some(ProgressEvent::Frame(f)) => current_frame = Some(f),
            Some(ProgressEvent::Speed(s)) => current_speed = Some(s),
            Some(ProgressEvent::Continue) => {
                let mut p = progress.lock();
                if let Some(time) = current_time {
                    if total_duration > 0.0 {
                        p.percent = (time / total_duration * 100.0).min(99.9);
                    }
                    if let Some(mult) = current_speed
                        .as_deref()
                        .and_then(parse_speed_multiplier)
                        .filter(|m| *m > 0.0)
                    {
                        p.eta = ((total_duration - time) / mult).max(0.0);
                    }
                }
                if let Some(speed) = &current_speed {
                    p.speed = speed.clone();
                }
                if let Some(frame) = current_frame {
                    p.frame = frame;
                }
            }
            Some(ProgressEvent::End) => {
                let mut p = progress.lock();
                p.percent = 100.0;
                p.eta = 0.0;
            }
            None => {}
        }
    }

    // stdout closed: the process is exiting. Collect the stderr tail for
    // diagnostics, then reap.
    let mut stderr_text = String::new();
    let _ = BufReader::new(stderr).read_to_string(&mut stderr_text);

    let status = {
        let mut guard = child.lock();
        guard.as_mut().and_then(|c| c.wait().ok())
    };

    let mut p = progress.lock();
    p.running = false;
    match status {
        Some(status) if status.success() => {
            p.percent = 100.0;
            p.eta = 0.0;
            info!("export finished");
        }
        Some(status) => {
            if p.error.is_none() {
                let last_line = stderr_text
                    .lines()
                    .rev()
                    .find(|l| !l.trim().is_empty())
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| format!("FFmpeg exited with {}", status));
                warn!("export failed: {}", last_line);
                p.error = Some(last_line);
            }
        }
        None => {
            if p.error.is_none() {
                p.error = Some("FFmpeg process could not be reaped".to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn clip(path: &str, start: f64, end: f64) -> ExportClip {
        ExportClip {
            source_path: PathBuf::from(path),
            source_start: start,
            source_end: end,
            timeline_start: 0.0,
            effects: Vec::new(),
        }
    }

    #[test]
    fn progress_lines_parse() {
        assert_eq!(
            parse_progress_line("out_time_us=1500000"),
            Some(ProgressEvent::OutTimeUs(1_500_000.0))
        );
        assert_eq!(parse_progress_line("frame=42"), Some(ProgressEvent::Frame(42)));
        assert_eq!(
            parse_progress_line("speed=2.5x"),
            Some(ProgressEvent::Speed("2.5x".to_string()))
        );
        assert_eq!(parse_progress_line("progress=continue"), Some(ProgressEvent::Continue));
        assert_eq!(parse_progress_line("progress=end"), Some(ProgressEvent::End));
        assert_eq!(parse_progress_line("bitrate=1024.0kbits/s"), None);
        assert_eq!(parse_progress_line("frame=not_a_number"), None);
    }

    #[test]
    fn speed_multiplier_parses() {
        assert_eq!(parse_speed_multiplier("2.5x"), Some(2.5));
        assert_eq!(parse_speed_multiplier("0x"), Some(0.0));
        assert_eq!(parse_speed_multiplier("N/A"), None);
    }

    #[test]
    fn ffmpeg_args_are_ordered() {
        let clips = vec![clip("/media/a.mp4", 0.0, 5.0), clip("/media/b.mp4", 1.0, 3.0)];
        let graph = compile_filter_graph(&clips, 1920, 1080);
        let settings = ExportSettings::default();
        let args = build_ffmpeg_args(&clips, &graph, &settings);

        assert_eq!(args[0], "-y");
        assert_eq!(args[1], "-i");
        assert_eq!(args[2], "/media/a.mp4");
        assert_eq!(args[3], "-i");
        assert_eq!(args[4], "/media/b.mp4");

        let fc = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(args[fc + 1], graph.program);

        let maps: Vec<&String> = args
            .iter()
            .zip(args.iter().skip(1))
            .filter(|(a, _)| *a == "-map")
            .map(|(_, label)| label)
            .collect();
        assert_eq!(maps, vec!["[vout]", "[aout]"]);

        assert!(args.windows(2).any(|w| w == ["-progress", "pipe:1"]));
        assert!(args.windows(2).any(|w| w == ["-r", "30"]));
        assert_eq!(args.last().unwrap(), "output.mp4");
    }

    #[test]
    fn single_clip_maps_its_own_pins() {
        let clips = vec![clip("/media/a.mp4", 0.0, 5.0)];
        let graph = compile_filter_graph(&clips, 1920, 1080);
        let args = build_ffmpeg_args(&clips, &graph, &ExportSettings::default());

        let maps: Vec<&String> = args
            .iter()
            .zip(args.iter().skip(1))
            .filter(|(a, _)| *a == "-map")
            .map(|(_, label)| label)
            .collect();
        assert_eq!(maps, vec!["[v0]", "[a0]"]);
    }

    #[test]
    fn starting_with_no_clips_is_an_error() {
        let result = ExportJob::start(&[], &ExportSettings::default());
        assert!(result.is_err());
    }
}
