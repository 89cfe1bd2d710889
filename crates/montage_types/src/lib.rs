//! Serializable data model for the montage editing engine.
//!
//! Everything in this crate is plain data: the project tree
//! (project/composition/tracks/clips), media references, applied effects
//! with their keyframes, and the playback state snapshot. Mutation policy
//! lives in `montage_core`; this crate only enforces what can be expressed
//! structurally and stays (de)serializable as the project document.

mod effect;
mod media;
mod playback;
mod project;
mod transform;

pub use effect::{AppliedEffect, Interpolation, Keyframe};
pub use media::MediaFile;
pub use playback::PlaybackState;
pub use project::{Clip, Composition, Project, Track, TrackKind};
pub use transform::Transform;
