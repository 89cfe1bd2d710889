use std::path::PathBuf;
use serde::{Serialize, Deserialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mp4,
    Webm,
    Mov,
    Mkv,
}

impl ContainerFormat {
    pub fn to_ffmpeg_name(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Webm => "webm",
            ContainerFormat::Mov => "mov",
            ContainerFormat::Mkv => "matroska",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Webm => "webm",
            ContainerFormat::Mov => "mov",
            ContainerFormat::Mkv => "mkv",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "MP4",
            ContainerFormat::Webm => "WebM",
            ContainerFormat::Mov => "QuickTime (MOV)",
            ContainerFormat::Mkv => "Matroska (MKV)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Quality {
    Low,
    Medium,
    High,
    Lossless,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    H265,
    Vp9,
    ProRes,
}

impl VideoCodec {
    pub fn to_ffmpeg_name(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
            VideoCodec::Vp9 => "libvpx-vp9",
            VideoCodec::ProRes => "prores_ks",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "H.264 / AVC",
            VideoCodec::H265 => "H.265 / HEVC",
            VideoCodec::Vp9 => "VP9",
            VideoCodec::ProRes => "Apple ProRes",
        }
    }

    pub fn is_compatible_with(&self, container: ContainerFormat) -> bool {
        match container {
            ContainerFormat::Mp4 => matches!(self, VideoCodec::H264 | VideoCodec::H265),
            ContainerFormat::Webm => matches!(self, VideoCodec::Vp9),
            ContainerFormat::Mov => matches!(
                self,
                VideoCodec::H264 | VideoCodec::H265 | VideoCodec::ProRes
            ),
            ContainerFormat::Mkv => true, // MKV takes everything
        }
    }

    /// Encoder arguments for this codec at a quality preset.
    pub fn codec_args(&self, quality: Quality) -> Vec<String> {
        match self {
            VideoCodec::H264 => {
                let crf = match quality {
                    Quality::Low => "28",
                    Quality::Medium => "23",
                    Quality::High => "18",
                    Quality::Lossless => "0",
                };
                args(&["-c:v", "libx264", "-crf", crf, "-preset", "medium", "-pix_fmt", "yuv420p"])
            }
            VideoCodec::H265 => {
                let crf = match quality {
                    Quality::Low => "32",
                    Quality::Medium => "28",
                    Quality::High => "22",
                    Quality::Lossless => "0",
                };
                args(&["-c:v", "libx265", "-crf", crf, "-preset", "medium", "-pix_fmt", "yuv420p"])
            }
            VideoCodec::Vp9 => {
                let crf = match quality {
                    Quality::Low => "40",
                    Quality::Medium => "33",
                    Quality::High => "25",
                    Quality::Lossless => "0",
                };
                args(&["-c:v", "libvpx-vp9", "-crf", crf, "-b:v", "0", "-pix_fmt", "yuv420p"])
            }
            VideoCodec::ProRes => {
                let profile = match quality {
                    Quality::Low => "0",      // ProRes Proxy
                    Quality::Medium => "2",   // ProRes LT
                    Quality::High => "3",     // ProRes HQ
                    Quality::Lossless => "4", // ProRes 4444
                };
                args(&["-c:v", "prores_ks", "-profile:v", profile, "-pix_fmt", "yuva444p10le"])
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Opus,
    Pcm,
}

impl AudioCodec {
    pub fn to_ffmpeg_name(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Opus => "libopus",
            AudioCodec::Pcm => "pcm_s16le",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            AudioCodec::Aac => "AAC",
            AudioCodec::Opus => "Opus",
            AudioCodec::Pcm => "PCM (Uncompressed)",
        }
    }

    pub fn is_compatible_with(&self, container: ContainerFormat) -> bool {
        match container {
            ContainerFormat::Mp4 => matches!(self, AudioCodec::Aac),
            ContainerFormat::Webm => matches!(self, AudioCodec::Opus),
            ContainerFormat::Mov => matches!(self, AudioCodec::Aac | AudioCodec::Pcm),
            ContainerFormat::Mkv => true,
        }
    }

    /// Encoder arguments for this codec; `bitrate` like "192k" is
    /// ignored for PCM.
    pub fn codec_args(&self, bitrate: &str) -> Vec<String> {
        match self {
            AudioCodec::Aac => args(&["-c:a", "aac", "-b:a", bitrate]),
            AudioCodec::Opus => args(&["-c:a", "libopus", "-b:a", bitrate]),
            AudioCodec::Pcm => args(&["-c:a", "pcm_s16le"]),
        }
    }
}

fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// Everything the export job needs to know about the output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSettings {
    pub output_path: PathBuf,

    pub format: ContainerFormat,

    pub codec: VideoCodec,

    pub width: u32,

    pub height: u32,

    pub fps: f64,

    pub quality: Quality,

    pub audio_codec: AudioCodec,

    /// e.g. "192k"
    pub audio_bitrate: String,
}

impl Default for ExportSettings {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("output.mp4"),
            format: ContainerFormat::Mp4,
            codec: VideoCodec::H264,
            width: 1920,
            height: 1080,
            fps: 30.0,
            quality: Quality::Medium,
            audio_codec: AudioCodec::Aac,
            audio_bitrate: "192k".to_string(),
        }
    }
}

impl ExportSettings {
    pub fn is_consistent(&self) -> bool {
        self.codec.is_compatible_with(self.format)
            && self.audio_codec.is_compatible_with(self.format)
    }
}
