//! End-to-end scenarios across the facade: edit, preview, compile.

use crate::engine::editing::{
    ActionOutcome, EditAction, EditorEngine, EngineState,
};
use crate::engine::rendering::{compile_filter_graph, ExportClip};
use crate::engine::tests::test_utils::*;

use crate::engine::editing::preview::SEEK_SUPPRESSION_TICKS;

fn editor_with_clip() -> EditorEngine {
    init_test_logging();
    let project = test_project(vec![test_clip("c1", 0.0, 10.0, 0.0)]);
    let decode = MockDecode::new(60.0);
    let raster = RecordingRaster::new(1280, 720);
    let mut editor = EditorEngine::with_project(
        project,
        Box::new(SharedDecode(decode)),
        Box::new(SharedRaster(raster)),
    );
    editor
        .preview_mut()
        .load_source("file:///m1.mp4")
        .expect("mock load");
    editor
}

#[test]
fn edit_then_compile_produces_the_expected_program() {
    let mut editor = editor_with_clip();
    editor.select_clip(Some("c1".to_string()));

    // Scale 1.5 and brightness +0.2, added in that order.
    editor
        .apply_action(
            &EditAction::Zoom {
                scale: 1.5,
                animated: false,
                duration: None,
            },
            0.0,
        )
        .unwrap();
    editor
        .apply_action(
            &EditAction::Filter {
                effect_id: "brightness".to_string(),
                value: Some(0.2),
            },
            0.0,
        )
        .unwrap();

    let clips = ExportClip::from_project(editor.project()).unwrap();
    let graph = compile_filter_graph(&clips, 1920, 1080);

    let chain: &str = graph.program.split(';').next().unwrap();
    let scale_at = chain.find("scale=iw*1.500000").expect("one scale primitive");
    let brightness_at = chain.find("eq=brightness=0.200000").expect("one brightness primitive");
    assert!(scale_at < brightness_at);
    assert_eq!(chain.matches("scale=iw*").count(), 1);
    assert_eq!(chain.matches("eq=brightness").count(), 1);
}

#[test]
fn animated_action_flows_through_engine_into_the_model() {
    let mut editor = editor_with_clip();
    editor.select_clip(Some("c1".to_string()));

    let outcome = editor
        .apply_action(
            &EditAction::Zoom {
                scale: 2.0,
                animated: true,
                duration: Some(2.0),
            },
            0.0,
        )
        .unwrap();
    assert!(matches!(outcome, ActionOutcome::Animations { .. }));
    assert_eq!(editor.preview().active_animations(), 1);

    // Midpoint of an ease-in-out from 1.0 to 2.0.
    editor.tick(1.0);
    let clip = editor.project().find_clip("c1").unwrap();
    let t = crate::engine::editing::bridge::effects_to_transform(&clip.effects);
    assert!((t.scale - 1.5).abs() < 1e-9);

    editor.tick(2.5);
    let clip = editor.project().find_clip("c1").unwrap();
    let t = crate::engine::editing::bridge::effects_to_transform(&clip.effects);
    assert_eq!(t.scale, 2.0);
    assert_eq!(editor.preview().active_animations(), 0);
}

#[test]
fn razor_action_splits_at_an_explicit_time() {
    let mut editor = editor_with_clip();
    editor.select_clip(Some("c1".to_string()));

    let outcome = editor
        .apply_action(&EditAction::Cut { time: Some(4.0) }, 0.0)
        .unwrap();
    let right_id = match outcome {
        ActionOutcome::ClipSplit { right_clip_id } => right_clip_id,
        other => panic!("unexpected outcome: {:?}", other),
    };

    let left = editor.project().find_clip("c1").unwrap();
    let right = editor.project().find_clip(&right_id).unwrap();
    assert_eq!(left.source_end, right.source_start);
    assert_eq!(right.timeline_start, 4.0);

    // The razor targets whatever visible video clip spans the playhead.
    editor.seek(7.0).unwrap();
    let razored = editor.razor().unwrap();
    assert_eq!(editor.project().find_clip(&razored).unwrap().timeline_start, 7.0);
}

#[test]
fn deleting_the_last_clip_prunes_its_media() {
    let mut editor = editor_with_clip();
    editor.select_clip(Some("c1".to_string()));

    assert!(editor.project().find_media("m1").is_some());
    editor.apply_action(&EditAction::DeleteClip, 0.0).unwrap();

    assert!(editor.project().find_clip("c1").is_none());
    assert!(
        editor.project().find_media("m1").is_none(),
        "unreferenced media leaves the pool"
    );
    assert_eq!(editor.selected_clip(), None);
}

#[test]
fn actions_fall_back_to_the_clip_under_the_playhead() {
    let mut editor = editor_with_clip();
    editor.seek(3.0).unwrap();

    editor
        .apply_action(
            &EditAction::Opacity {
                value: 0.5,
                animated: false,
                duration: None,
            },
            0.0,
        )
        .unwrap();

    let clip = editor.project().find_clip("c1").unwrap();
    let t = crate::engine::editing::bridge::effects_to_transform(&clip.effects);
    assert_eq!(t.opacity, 0.5);

    // In a gap there is nothing to target.
    editor.seek(25.0).unwrap();
    assert!(editor
        .apply_action(
            &EditAction::Opacity {
                value: 0.1,
                animated: false,
                duration: None
            },
            0.0
        )
        .is_err());
}

#[test]
fn project_document_round_trips_through_the_facade() {
    let mut editor = editor_with_clip();
    editor.select_clip(Some("c1".to_string()));
    editor
        .apply_action(
            &EditAction::Filter {
                effect_id: "sepia".to_string(),
                value: Some(0.8),
            },
            0.0,
        )
        .unwrap();

    let json = editor.save_project().unwrap();
    let before = editor.project().clone();

    editor.load_project(&json).unwrap();
    assert_eq!(editor.project(), &before);
}

#[test]
fn playback_session_over_the_timeline() {
    let mut editor = editor_with_clip();

    editor.play();
    assert_eq!(editor.preview().state(), EngineState::Playing);

    editor.pause();
    assert_eq!(editor.preview().state(), EngineState::Paused);

    // Scrub into empty timeline: the playhead goes there, play refuses.
    editor.seek(30.0).unwrap();
    assert_eq!(editor.preview().playback().current_time, 30.0);
    editor.play();
    assert_ne!(editor.preview().state(), EngineState::Playing);

    // Back inside the clip, playback resumes and survives a few frames.
    editor.seek(1.0).unwrap();
    editor.play();
    for i in 0..SEEK_SUPPRESSION_TICKS + 2 {
        editor.tick(i as f64 * 0.016);
    }
    assert_eq!(editor.preview().state(), EngineState::Playing);
}

#[test]
fn export_rejects_a_project_with_pathless_media() {
    let mut project = test_project(vec![test_clip("c1", 0.0, 5.0, 0.0)]);
    project.media[0].path = None;

    let result = ExportClip::from_project(&project);
    assert!(result.is_err());
}

#[test]
fn new_editor_has_empty_video_and_audio_tracks() {
    let decode = MockDecode::new(0.0);
    let raster = RecordingRaster::new(1280, 720);
    let editor = EditorEngine::new(
        Box::new(SharedDecode(decode)),
        Box::new(SharedRaster(raster)),
    );

    assert_eq!(editor.project().tracks.len(), 2);
    assert_eq!(editor.project().duration(), 0.0);
    assert!(editor.project().media.is_empty());
}
