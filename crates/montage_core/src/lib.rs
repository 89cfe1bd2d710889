//! Clip/effect compositing and export-compilation engine.
//!
//! The engine keeps three representations of an edit consistent: the
//! live preview state composited every frame, the persisted project
//! document, and the filter-graph program compiled for final-quality
//! export through the external transcoder. The data model itself lives
//! in the `montage_types` crate.

pub mod engine;

pub use engine::editing::{EditingError, EditorEngine};
