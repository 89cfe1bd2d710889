use serde::{Serialize, Deserialize};

/// Live playback snapshot owned by one engine instance.
///
/// Written both by user input (seek, volume, rate) and by the engine's
/// own per-frame time sync while playing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    /// Authoritative playhead position in seconds. May point into empty
    /// timeline regions; it is not clamped to any clip's span.
    pub current_time: f64,

    pub playing: bool,

    pub volume: f64,

    pub muted: bool,

    pub rate: f64,

    pub looping: bool,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_time: 0.0,
            playing: false,
            volume: 1.0,
            muted: false,
            rate: 1.0,
            looping: false,
        }
    }
}
