pub mod actions;
pub mod animation;
pub mod bridge;
pub mod effects;
pub mod import;
pub mod persistence;
pub mod preview;
pub mod timeline;
pub mod types;



pub use actions::{apply_action, ActionOutcome, EditAction};
pub use animation::{AnimatableProperty, AnimationKey, AnimationSet, Easing};
pub use effects::{registry, BuiltinKind, EffectCategory, EffectDescriptor, EffectRegistry};
pub use import::{MediaImporter, MediaProbe};
pub use preview::{DecodeSurface, EngineState, PreviewEngine, RasterSurface, ReadyState};
pub use timeline::{DragOutcome, DragSession, DragZone};
pub use types::EditingError;

use anyhow::Result;
use log::info;
use montage_types::{Project, Track, TrackKind};

use crate::engine::rendering::{ExportClip, ExportJob, ExportProgress, ExportSettings};

/// The editing engine: one project, one preview engine, one importer.
///
/// Explicitly constructed and torn down by its caller — there is no
/// process-wide instance, and playback state lives inside the owned
/// `PreviewEngine`, reached through it rather than through any global.
pub struct EditorEngine {
    project: Project,

    preview: PreviewEngine,

    importer: MediaImporter,

    selected_clip: Option<String>,

    export: Option<ExportJob>,
}

impl EditorEngine {
    /// A fresh engine around an empty project with one video and one
    /// audio track.
    pub fn new(decode: Box<dyn DecodeSurface>, raster: Box<dyn RasterSurface>) -> Self {
        let mut project = Project::new(types::next_id("project"), "Untitled Project");
        project
            .tracks
            .push(Track::new(types::next_id("track"), TrackKind::Video));
        project
            .tracks
            .push(Track::new(types::next_id("track"), TrackKind::Audio));

        Self::with_project(project, decode, raster)
    }

    pub fn with_project(
        project: Project,
        decode: Box<dyn DecodeSurface>,
        raster: Box<dyn RasterSurface>,
    ) -> Self {
        Self {
            project,
            preview: PreviewEngine::new(decode, raster),
            importer: MediaImporter::new(),
            selected_clip: None,
            export: None,
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn project_mut(&mut self) -> &mut Project {
        &mut self.project
    }

    pub fn preview(&self) -> &PreviewEngine {
        &self.preview
    }

    pub fn preview_mut(&mut self) -> &mut PreviewEngine {
        &mut self.preview
    }

    pub fn select_clip(&mut self, clip_id: Option<String>) {
        self.selected_clip = clip_id;
    }

    pub fn selected_clip(&self) -> Option<&str> {
        self.selected_clip.as_deref()
    }

    /// One frame of the editor's draw loop.
    pub fn tick(&mut self, now: f64) {
        self.preview.tick(&mut self.project, now);
    }

    pub fn play(&mut self) {
        self.preview.play(&self.project);
    }

    pub fn pause(&mut self) {
        self.preview.pause();
    }

    pub fn toggle_playback(&mut self) {
        self.preview.toggle(&self.project);
    }

    pub fn seek(&mut self, time: f64) -> Result<(), EditingError> {
        self.preview.seek(&self.project, time)
    }

    /// Razor: split whichever visible video clip spans the playhead.
    pub fn razor(&mut self) -> Result<String, EditingError> {
        let playhead = self.preview.playback().current_time;
        timeline::split_at(&mut self.project, playhead)
    }

    /// Import a media file into the project's pool.
    pub fn import_media(&mut self, path: &std::path::Path) -> Result<String, EditingError> {
        self.importer.import_file(&mut self.project, path)
    }

    /// Apply a normalized action to the selected clip, or failing a
    /// selection, the clip under the playhead.
    pub fn apply_action(&mut self, action: &EditAction, now: f64) -> Result<ActionOutcome, EditingError> {
        let playhead = self.preview.playback().current_time;

        let clip_id = self
            .selected_clip
            .clone()
            .or_else(|| {
                self.project
                    .clips()
                    .find(|c| c.contains(playhead))
                    .map(|c| c.id.clone())
            })
            .ok_or_else(|| {
                EditingError::InvalidParameter("No clip selected or under the playhead".to_string())
            })?;

        let outcome = actions::apply_action(&mut self.project, &clip_id, action, playhead)?;

        match &outcome {
            ActionOutcome::Animations { targets, duration } => {
                for (property, target) in targets {
                    self.preview.animate(
                        &self.project,
                        &clip_id,
                        *property,
                        *target,
                        *duration,
                        Easing::EaseInOut,
                        now,
                    )?;
                }
            }
            ActionOutcome::ClipRemoved => {
                if self.selected_clip.as_deref() == Some(clip_id.as_str()) {
                    self.selected_clip = None;
                }
                self.preview.cancel_animations(&clip_id);
                timeline::prune_unused_media(&mut self.project);
            }
            _ => {}
        }

        Ok(outcome)
    }

    /// Serialize the project document.
    pub fn save_project(&self) -> Result<String, EditingError> {
        persistence::save_project(&self.project)
    }

    /// Replace the current project from a document.
    pub fn load_project(&mut self, json: &str) -> Result<(), EditingError> {
        self.project = persistence::load_project(json)?;
        self.selected_clip = None;
        Ok(())
    }

    /// Compile the timeline and hand it to the external transcoder.
    pub fn start_export(&mut self, settings: &ExportSettings) -> Result<(), EditingError> {
        if let Some(job) = &self.export {
            if job.is_running() {
                return Err(EditingError::ExportError(
                    "An export is already running".to_string(),
                ));
            }
        }

        let clips = ExportClip::from_project(&self.project)?;
        let job = ExportJob::start(&clips, settings)?;
        self.export = Some(job);
        Ok(())
    }

    pub fn export_progress(&self) -> Option<ExportProgress> {
        self.export.as_ref().map(|job| job.progress())
    }

    pub fn cancel_export(&self) -> Result<(), EditingError> {
        match &self.export {
            Some(job) => job.cancel(),
            // Cancel with nothing running is a no-op success.
            None => Ok(()),
        }
    }

    pub fn shutdown(&mut self) {
        let _ = self.cancel_export();
        self.preview.destroy();
        info!("editor engine shut down");
    }
}

impl Drop for EditorEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
