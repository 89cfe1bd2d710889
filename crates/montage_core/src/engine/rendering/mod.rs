mod export;
mod filter_graph;
mod formats;

pub use export::{
    build_ffmpeg_args, parse_progress_line, parse_speed_multiplier, ExportJob, ExportProgress,
    ProgressEvent,
};
pub use filter_graph::{compile_filter_graph, ExportClip, FilterGraph};
pub use formats::{AudioCodec, ContainerFormat, ExportSettings, Quality, VideoCodec};
