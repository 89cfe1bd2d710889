//! Pure (de)serialization of the project document.
//!
//! The core owns neither file I/O nor autosave; hosts hand JSON in and
//! take JSON out. Loading normalizes legacy documents: a clip that
//! predates effect stacks carries only a flat `transform`, which is
//! bootstrapped into the structural stack here and never written back.

use log::{debug, info};
use montage_types::Project;

use crate::engine::editing::bridge;
use crate::engine::editing::types::EditingError;

pub fn load_project(json: &str) -> Result<Project, EditingError> {
    let mut project: Project = serde_json::from_str(json)
        .map_err(|e| EditingError::ProjectError(format!("Invalid project document: {}", e)))?;

    let mut bootstrapped = 0usize;
    for track in &mut project.tracks {
        for clip in &mut track.clips {
            if !clip.is_valid() {
                return Err(EditingError::ProjectError(format!(
                    "Clip {} has an invalid window: [{}, {}) at {}",
                    clip.id, clip.source_start, clip.source_end, clip.timeline_start
                )));
            }

            if clip.effects.is_empty() {
                let transform = clip.transform.take().unwrap_or_default();
                clip.effects = bridge::transform_to_effects(&transform);
                bootstrapped += 1;
            } else {
                // A structured stack wins over any stale flat record.
                clip.transform = None;
            }
        }
        track.sort_clips();
    }

    if bootstrapped > 0 {
        debug!("bootstrapped effect stacks for {} legacy clip(s)", bootstrapped);
    }
    info!(
        "loaded project '{}': {} track(s), {} media file(s)",
        project.name,
        project.tracks.len(),
        project.media.len()
    );
    Ok(project)
}

pub fn save_project(project: &Project) -> Result<String, EditingError> {
    serde_json::to_string_pretty(project)
        .map_err(|e| EditingError::ProjectError(format!("Failed to serialize project: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::editing::bridge::effects_to_transform;

    const LEGACY_DOC: &str = r#"{
        "id": "p1",
        "name": "legacy",
        "composition": { "width": 1280, "height": 720, "frameRate": 30.0 },
        "tracks": [
            {
                "id": "t1",
                "kind": "video",
                "clips": [
                    {
                        "id": "c1",
                        "mediaId": "m1",
                        "sourceStart": 0.0,
                        "sourceEnd": 5.0,
                        "timelineStart": 0.0,
                        "transform": { "scale": 2.0, "grayscale": 1.0 }
                    }
                ]
            }
        ],
        "media": []
    }"#;

    #[test]
    fn legacy_transform_bootstraps_an_effect_stack() {
        let project = load_project(LEGACY_DOC).unwrap();
        let clip = project.find_clip("c1").unwrap();

        assert!(clip.transform.is_none(), "flat record is consumed");
        assert!(!clip.effects.is_empty());

        let t = effects_to_transform(&clip.effects);
        assert_eq!(t.scale, 2.0);
        assert_eq!(t.grayscale, 1.0);
    }

    #[test]
    fn clip_without_transform_or_effects_gets_the_structural_stack() {
        let doc = r#"{
            "id": "p2",
            "name": "bare",
            "composition": { "width": 1920, "height": 1080, "frameRate": 30.0 },
            "tracks": [
                {
                    "id": "t1",
                    "kind": "video",
                    "clips": [
                        {
                            "id": "c1",
                            "mediaId": "m1",
                            "sourceStart": 0.0,
                            "sourceEnd": 5.0,
                            "timelineStart": 0.0
                        }
                    ]
                }
            ],
            "media": []
        }"#;
        let project = load_project(doc).unwrap();
        let clip = project.find_clip("c1").unwrap();
        assert_eq!(clip.effects.len(), 4, "the four structural builtins");
        assert!(effects_to_transform(&clip.effects).is_default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let project = load_project(LEGACY_DOC).unwrap();
        let json = save_project(&project).unwrap();
        let back = load_project(&json).unwrap();
        assert_eq!(back, project);
    }

    #[test]
    fn structured_stack_is_not_rebootstrapped() {
        let project = load_project(LEGACY_DOC).unwrap();
        let json = save_project(&project).unwrap();
        let back = load_project(&json).unwrap();

        let clip = back.find_clip("c1").unwrap();
        let t = effects_to_transform(&clip.effects);
        assert_eq!(t.scale, 2.0, "values survive a second load untouched");
    }

    #[test]
    fn invalid_clip_window_is_rejected() {
        let doc = LEGACY_DOC.replace("\"sourceEnd\": 5.0", "\"sourceEnd\": 0.0");
        assert!(load_project(&doc).is_err());
    }

    #[test]
    fn garbage_is_a_project_error() {
        let err = load_project("{]").unwrap_err();
        assert!(err.to_string().contains("Project document invalid"));
    }
}
