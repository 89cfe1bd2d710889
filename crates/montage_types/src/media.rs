use std::path::PathBuf;
use serde::{Serialize, Deserialize};

/// A reference to an imported media file.
///
/// Shared by id across any number of clips and never mutated after
/// creation. The decode handle (`url`) is whatever the host's decode
/// surface accepts; `path` is the native filesystem location and is only
/// present in desktop contexts — export requires it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: String,

    pub name: String,

    /// Decode handle passed to the decode surface (file URL, blob URL, …).
    pub url: String,

    /// Native path on disk, if known. Required for export.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// Duration in seconds, on the source file's own clock.
    pub duration: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}
