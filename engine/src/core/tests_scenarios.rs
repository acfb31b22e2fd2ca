//! End-to-End Editing Scenarios
//!
//! These tests drive a loaded [`Edit`] through commands, undo/redo, deferred
//! loads and the update loop, checking resolved timing and structure.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use serde_json::{json, Value};

use crate::core::{
    edit::Edit,
    events::{event_names, EditEvent},
    players::{MockLoader, Player, PlayerFactory, PlayerStatus, StandardPlayerFactory},
    scene::track_z_index,
    settings::EditSettings,
    timeline::{Asset, ClipConfig, EditDocument},
    timing::{LengthIntent, StartIntent, StaticProbe, DEFAULT_AUTO_LENGTH_MS},
    CoreError, CoreResult,
};

fn document(value: Value) -> EditDocument {
    serde_json::from_value(value).unwrap()
}

async fn load(value: Value) -> Edit {
    let mut edit = Edit::new(EditSettings::default());
    edit.load_edit(document(value)).await.unwrap();
    edit.settle_loads().await;
    edit
}

fn text_clip(text: &str, start: Value, length: Value) -> Value {
    json!({ "asset": { "type": "text", "text": text }, "start": start, "length": length })
}

fn three_auto_clips() -> Value {
    json!({
        "timeline": {
            "tracks": [{ "clips": [
                text_clip("one", json!("auto"), json!(2)),
                text_clip("two", json!("auto"), json!(3)),
                text_clip("three", json!("auto"), json!(4)),
            ]}]
        }
    })
}

fn starts(edit: &Edit, track: usize) -> Vec<f64> {
    let count = edit.track(track).map_or(0, |lane| lane.clips.len());
    (0..count)
        .map(|c| edit.clip(track, c).unwrap().start())
        .collect()
}

fn count_events(edit: &mut Edit, name: &str) -> Rc<Cell<usize>> {
    let count = Rc::new(Cell::new(0));
    let counter = count.clone();
    edit.on(name, move |_| counter.set(counter.get() + 1));
    count
}

// =============================================================================
// Timing
// =============================================================================

#[tokio::test]
async fn test_scenario_auto_chain_resolves_on_load() {
    let edit = load(three_auto_clips()).await;

    assert_eq!(starts(&edit, 0), vec![0.0, 2000.0, 5000.0]);
    let ends: Vec<f64> = (0..3).map(|c| edit.clip(0, c).unwrap().end()).collect();
    assert_eq!(ends, vec![2000.0, 5000.0, 9000.0]);
    assert_eq!(edit.total_duration(), 9000.0);
}

#[tokio::test]
async fn test_scenario_delete_middle_snaps_following_clip() {
    let mut edit = load(three_auto_clips()).await;
    let middle = edit.clip_id(0, 1).unwrap().clone();

    edit.delete_clip(0, 1).unwrap();
    assert_eq!(starts(&edit, 0), vec![0.0, 2000.0]);
    assert_eq!(edit.total_duration(), 6000.0);
    assert!(edit.is_pending_disposal(&middle));

    // Destroyed at the next flush, then recreated with the same id by undo
    edit.update(0.0);
    assert_eq!(edit.arena_len(), 2);

    assert!(edit.undo().unwrap());
    assert_eq!(edit.clip_id(0, 1), Some(&middle));
    assert_eq!(starts(&edit, 0), vec![0.0, 2000.0, 5000.0]);
    assert_eq!(edit.total_duration(), 9000.0);
}

#[tokio::test]
async fn test_scenario_undo_delete_keeps_measured_auto_length() {
    let mut edit = Edit::new(EditSettings::default())
        .with_probe(Rc::new(StaticProbe::new().with_duration("a.mp4", 6.0)));
    edit.add_track(None).unwrap();
    let video = ClipConfig::new(Asset::video("a.mp4"), StartIntent::Auto, LengthIntent::Auto);
    edit.insert_clip(0, 0, video).unwrap();
    edit.settle_loads().await;
    edit.add_clip(0, ClipConfig::auto(Asset::text("after"), 2.0)).unwrap();
    assert_eq!(edit.clip(0, 1).unwrap().start(), 6000.0);

    edit.delete_clip(0, 0).unwrap();
    edit.update(0.0);
    assert_eq!(edit.arena_len(), 1);

    // Rebuilt by the factory, measured length restored before any load
    assert!(edit.undo().unwrap());
    assert_eq!(edit.clip(0, 0).unwrap().length(), 6000.0);
    assert_eq!(edit.clip(0, 1).unwrap().start(), 6000.0);
    assert_eq!(edit.total_duration(), 8000.0);

    edit.settle_loads().await;
    assert_eq!(edit.clip(0, 0).unwrap().length(), 6000.0);
}

#[tokio::test]
async fn test_scenario_end_clip_fills_to_timeline_end() {
    let mut edit = load(json!({
        "timeline": { "tracks": [
            { "clips": [{ "asset": { "type": "image", "src": "bg.png" }, "start": 2, "length": "end" }] },
            { "clips": [{ "asset": { "type": "video", "src": "a.mp4" }, "start": 0, "length": 10 }] }
        ]}
    }))
    .await;

    let background = edit.clip_id(0, 0).unwrap().clone();
    assert!(edit.is_end_length(&background));
    assert_eq!(edit.clip(0, 0).unwrap().length(), 8000.0);

    let main = edit.clip_id(1, 0).unwrap().clone();
    let mut extended = edit.player(&main).unwrap().config().clone();
    extended.length = LengthIntent::Seconds(15.0);
    edit.update_clip(&main, extended).unwrap();

    assert_eq!(edit.timeline_end(), 15000.0);
    assert_eq!(edit.clip(0, 0).unwrap().length(), 13000.0);
    assert_eq!(edit.total_duration(), 15000.0);

    edit.undo().unwrap();
    assert_eq!(edit.clip(0, 0).unwrap().length(), 8000.0);
}

#[tokio::test]
async fn test_scenario_probed_auto_length_reflows_siblings() {
    let mut edit = Edit::new(EditSettings::default())
        .with_probe(Rc::new(StaticProbe::new().with_duration("intro.mp4", 6.0)));
    edit.load_edit(document(json!({
        "timeline": { "tracks": [{ "clips": [text_clip("after", json!("auto"), json!(2))] }] }
    })))
    .await
    .unwrap();

    let intro = ClipConfig::new(Asset::video("intro.mp4"), StartIntent::Auto, LengthIntent::Auto);
    edit.insert_clip(0, 0, intro).unwrap();

    // Placeholder length until the load measures the source
    assert_eq!(edit.clip(0, 0).unwrap().length(), DEFAULT_AUTO_LENGTH_MS);
    assert_eq!(edit.clip(0, 1).unwrap().start(), DEFAULT_AUTO_LENGTH_MS);

    edit.settle_loads().await;
    assert_eq!(edit.clip(0, 0).unwrap().length(), 6000.0);
    assert_eq!(edit.clip(0, 1).unwrap().start(), 6000.0);
    assert_eq!(edit.total_duration(), 8000.0);
}

// =============================================================================
// History
// =============================================================================

#[tokio::test]
async fn test_scenario_new_command_after_undo_discards_redo() {
    let mut edit = load(json!({ "timeline": { "tracks": [{ "clips": [] }] } })).await;

    for text in ["a", "b", "c"] {
        edit.add_clip(0, ClipConfig::auto(Asset::text(text), 1.0)).unwrap();
    }
    assert!(edit.undo().unwrap());
    edit.add_clip(0, ClipConfig::auto(Asset::text("d"), 1.0)).unwrap();

    assert!(!edit.can_redo());
    assert!(!edit.redo().unwrap());
    assert_eq!(edit.history().index(), 2);
    assert_eq!(edit.clip_count(), 3);
}

#[tokio::test]
async fn test_scenario_undo_redo_out_of_bounds_are_noops() {
    let mut edit = load(three_auto_clips()).await;
    let undos = count_events(&mut edit, event_names::EDIT_UNDO);

    assert!(!edit.undo().unwrap());
    assert!(!edit.redo().unwrap());
    assert_eq!(undos.get(), 0);
    assert_eq!(starts(&edit, 0), vec![0.0, 2000.0, 5000.0]);
}

#[tokio::test]
async fn test_scenario_update_clip_round_trip_restores_fields() {
    let mut edit = load(json!({
        "timeline": { "tracks": [{ "clips": [
            { "asset": { "type": "text", "text": "A" }, "start": "auto", "length": 2, "fit": "cover" },
            text_clip("B", json!("auto"), json!(1))
        ]}]}
    }))
    .await;

    let id = edit.clip_id(0, 0).unwrap().clone();
    let original = edit.player(&id).unwrap().config().clone();
    let original_timing = edit.player(&id).unwrap().resolved_timing();

    let mut updated = original.clone();
    updated.asset.set_text_content("changed");
    updated.start = StartIntent::Seconds(1.0);
    updated.length = LengthIntent::Seconds(5.0);
    edit.update_clip(&id, updated.clone()).unwrap();

    assert_eq!(edit.player(&id).unwrap().config(), &updated);
    assert_eq!(edit.clip(0, 1).unwrap().start(), 6000.0);

    edit.undo().unwrap();
    assert_eq!(edit.player(&id).unwrap().config(), &original);
    assert_eq!(edit.player(&id).unwrap().resolved_timing(), original_timing);
    assert_eq!(edit.clip(0, 1).unwrap().start(), 2000.0);

    edit.redo().unwrap();
    assert_eq!(edit.player(&id).unwrap().config(), &updated);
}

#[tokio::test]
async fn test_scenario_history_is_bounded_by_settings() {
    let settings = EditSettings {
        max_history: 2,
        ..EditSettings::default()
    };
    let mut edit = Edit::new(settings);
    edit.add_track(None).unwrap();
    for text in ["a", "b", "c"] {
        edit.add_clip(0, ClipConfig::auto(Asset::text(text), 1.0)).unwrap();
    }

    assert!(edit.undo().unwrap());
    assert!(edit.undo().unwrap());
    assert!(!edit.undo().unwrap());
    assert_eq!(edit.clip_count(), 1);
}

// =============================================================================
// Split
// =============================================================================

fn single_video() -> Value {
    json!({
        "timeline": { "tracks": [{ "clips": [
            { "asset": { "type": "video", "src": "a.mp4", "trim": 1 }, "start": 0, "length": 10 }
        ]}]}
    })
}

#[tokio::test]
async fn test_scenario_split_invariants() {
    let mut edit = load(single_video()).await;
    let left = edit.clip_id(0, 0).unwrap().clone();

    let right = edit.split_clip(0, 0, 4.0).unwrap();
    let left_player = edit.player(&left).unwrap();
    let right_player = edit.player(&right).unwrap();

    assert_eq!(edit.clip_id(0, 1), Some(&right));
    assert_eq!(left_player.length() + right_player.length(), 10000.0);
    assert_eq!(right_player.start(), left_player.start() + 4000.0);
    assert_eq!(right_player.config().asset.trim(), Some(5.0));
    assert_eq!(left_player.config().asset.trim(), Some(1.0));
    assert_eq!(edit.total_duration(), 10000.0);
}

#[tokio::test]
async fn test_scenario_split_undo_redo_keeps_ids() {
    let mut edit = load(single_video()).await;
    let left = edit.clip_id(0, 0).unwrap().clone();
    let original = edit.player(&left).unwrap().config().clone();

    let right = edit.split_clip(0, 0, 4.0).unwrap();
    edit.undo().unwrap();

    assert_eq!(edit.clip_count(), 1);
    assert_eq!(edit.player(&left).unwrap().config(), &original);
    assert_eq!(edit.player(&left).unwrap().length(), 10000.0);
    assert!(edit.is_pending_disposal(&right));

    edit.update(0.0);
    assert_eq!(edit.arena_len(), 1);

    edit.redo().unwrap();
    assert_eq!(edit.clip_id(0, 1), Some(&right));
    assert_eq!(edit.clip(0, 1).unwrap().start(), 4000.0);
}

#[tokio::test]
async fn test_scenario_split_rejects_points_near_boundaries() {
    let mut edit = load(single_video()).await;

    for at in [0.05, 9.95, 12.0] {
        let result = edit.split_clip(0, 0, at);
        assert!(matches!(result, Err(CoreError::InvalidSplitPoint(_))));
    }
    assert_eq!(edit.clip_count(), 1);
    assert!(!edit.can_undo());

    // Exactly at the minimum distance is allowed
    edit.split_clip(0, 0, 0.1).unwrap();
    assert_eq!(edit.clip(0, 0).unwrap().length(), 100.0);
}

// Lets a fixed number of players be built, then fails
struct LimitedFactory {
    inner: StandardPlayerFactory,
    remaining: Cell<usize>,
}

impl LimitedFactory {
    fn new(remaining: usize) -> Self {
        Self {
            inner: StandardPlayerFactory::default(),
            remaining: Cell::new(remaining),
        }
    }
}

impl PlayerFactory for LimitedFactory {
    fn create(&self, config: &ClipConfig) -> CoreResult<Box<dyn Player>> {
        match self.remaining.get() {
            0 => Err(CoreError::PlayerConstruction("factory exhausted".to_string())),
            n => {
                self.remaining.set(n - 1);
                self.inner.create(config)
            }
        }
    }
}

#[tokio::test]
async fn test_scenario_split_rolls_back_when_right_half_fails() {
    let mut edit = Edit::new(EditSettings::default()).with_factory(Rc::new(LimitedFactory::new(1)));
    edit.load_edit(document(single_video())).await.unwrap();
    edit.settle_loads().await;
    let splits = count_events(&mut edit, event_names::CLIP_SPLIT);

    let left = edit.clip_id(0, 0).unwrap().clone();
    let original = edit.player(&left).unwrap().config().clone();
    let original_timing = edit.player(&left).unwrap().resolved_timing();

    let result = edit.split_clip(0, 0, 4.0);
    assert!(matches!(result, Err(CoreError::PlayerConstruction(_))));

    assert_eq!(edit.player(&left).unwrap().config(), &original);
    assert_eq!(edit.player(&left).unwrap().resolved_timing(), original_timing);
    assert!(!edit.can_undo());
    assert_eq!(edit.history().len(), 0);
    assert_eq!(edit.arena_len(), 1);
    assert_eq!(edit.clip_count(), 1);
    assert_eq!(edit.pending_load_count(), 0);
    assert_eq!(edit.total_duration(), 10000.0);
    assert_eq!(splits.get(), 0);
}

#[tokio::test]
async fn test_scenario_split_undo_cancels_pending_right_load() {
    let mut edit =
        Edit::new(EditSettings::default()).with_loader(Rc::new(MockLoader::new().failing("a.mp4")));
    let failures = count_events(&mut edit, event_names::CLIP_LOAD_FAILED);
    edit.load_edit(document(single_video())).await.unwrap();
    edit.settle_loads().await;
    assert_eq!(failures.get(), 1);

    let right = edit.split_clip(0, 0, 5.0).unwrap();
    assert_eq!(edit.pending_load_count(), 1);

    edit.undo().unwrap();
    edit.update(16.0);

    assert_eq!(failures.get(), 1);
    assert_eq!(edit.pending_load_count(), 0);
    assert!(edit.player(&right).is_none());
    assert_eq!(edit.arena_len(), 1);
}

#[tokio::test]
async fn test_scenario_load_failure_keeps_structural_change() {
    let mut edit =
        Edit::new(EditSettings::default()).with_loader(Rc::new(MockLoader::new().failing("bad.png")));
    let failures = Rc::new(RefCell::new(Vec::new()));
    let sink = failures.clone();
    edit.on(event_names::CLIP_LOAD_FAILED, move |event| {
        sink.borrow_mut().push(event.clone())
    });

    edit.add_track(None).unwrap();
    let id = edit
        .add_clip(0, ClipConfig::fixed(Asset::image("bad.png"), 0.0, 3.0))
        .unwrap();
    edit.settle_loads().await;

    assert_eq!(edit.clip_id(0, 0), Some(&id));
    assert_eq!(edit.player(&id).unwrap().status(), PlayerStatus::Loading);
    assert!(matches!(
        failures.borrow().as_slice(),
        [EditEvent::ClipLoadFailed { player_id, .. }] if *player_id == id
    ));
}

// =============================================================================
// Tracks, Scene and Selection
// =============================================================================

#[tokio::test]
async fn test_scenario_add_clip_on_new_track_and_undo() {
    let mut edit = load(three_auto_clips()).await;

    let id = edit
        .add_clip(1, ClipConfig::fixed(Asset::text("overlay"), 1.0, 2.0))
        .unwrap();
    assert_eq!(edit.track_count(), 2);
    let track_id = edit.track(1).unwrap().id.clone();
    assert_eq!(edit.scene().z_index(&track_id), Some(track_z_index(1)));
    assert_eq!(edit.scene().children(&track_id).unwrap(), &[id.clone()]);

    edit.undo().unwrap();
    assert_eq!(edit.track_count(), 1);
    assert!(!edit.scene().has_container(&track_id));

    assert!(matches!(
        edit.add_clip(5, ClipConfig::auto(Asset::text("x"), 1.0)),
        Err(CoreError::TrackNotFound(5))
    ));
}

#[tokio::test]
async fn test_scenario_containers_restack_on_track_insert() {
    let mut edit = load(three_auto_clips()).await;
    let first = edit.track(0).unwrap().id.clone();
    assert_eq!(edit.scene().z_index(&first), Some(track_z_index(0)));

    let inserted = edit.add_track(Some(0)).unwrap();
    assert_eq!(edit.scene().z_index(&first), Some(track_z_index(1)));
    assert!(!edit.scene().has_container(&inserted));

    edit.add_clip(0, ClipConfig::auto(Asset::text("top"), 1.0)).unwrap();
    assert_eq!(edit.scene().z_index(&inserted), Some(track_z_index(0)));

    edit.undo().unwrap();
    edit.undo().unwrap();
    assert_eq!(edit.scene().z_index(&first), Some(track_z_index(0)));
}

#[tokio::test]
async fn test_scenario_move_clip_transfers_container() {
    let mut edit = load(json!({
        "timeline": { "tracks": [
            { "clips": [text_clip("a", json!(0), json!(2))] },
            { "clips": [text_clip("b", json!("auto"), json!(3))] }
        ]}
    }))
    .await;
    let a = edit.clip_id(0, 0).unwrap().clone();
    let (top, bottom) = (
        edit.track(0).unwrap().id.clone(),
        edit.track(1).unwrap().id.clone(),
    );

    edit.move_clip(0, 0, 1, Some(0)).unwrap();
    assert_eq!(edit.locate(&a), Some((1, 0)));
    assert!(edit.scene().children(&top).unwrap().is_empty());
    assert!(edit.scene().children(&bottom).unwrap().contains(&a));
    // "b" now follows "a"
    assert_eq!(edit.clip(1, 1).unwrap().start(), 2000.0);

    edit.undo().unwrap();
    assert_eq!(edit.locate(&a), Some((0, 0)));
    assert_eq!(edit.scene().children(&top).unwrap(), &[a.clone()]);
    assert_eq!(edit.clip(1, 0).unwrap().start(), 0.0);
}

#[tokio::test]
async fn test_scenario_delete_track_undo_restores_ids() {
    let mut edit = load(json!({
        "timeline": { "tracks": [
            { "clips": [text_clip("a", json!("auto"), json!(2)), text_clip("b", json!("auto"), json!(2))] },
            { "clips": [text_clip("c", json!(0), json!(1))] }
        ]}
    }))
    .await;
    let track_id = edit.track(0).unwrap().id.clone();
    let ids = edit.track(0).unwrap().clips.clone();
    edit.select_clip(&ids[1]).unwrap();

    edit.delete_track(0).unwrap();
    assert_eq!(edit.track_count(), 1);
    assert_eq!(edit.selected_clip(), None);
    assert_eq!(edit.total_duration(), 1000.0);

    edit.undo().unwrap();
    assert_eq!(edit.track(0).unwrap().id, track_id);
    assert_eq!(edit.track(0).unwrap().clips, ids);
    assert_eq!(edit.selected_clip(), Some(&ids[1]));
    assert_eq!(edit.total_duration(), 4000.0);
}

#[tokio::test]
async fn test_scenario_selection_commands() {
    let mut edit = load(three_auto_clips()).await;
    let first = edit.clip_id(0, 0).unwrap().clone();
    let second = edit.clip_id(0, 1).unwrap().clone();

    edit.select_clip(&first).unwrap();
    edit.select_clip(&second).unwrap();
    edit.clear_selection().unwrap();
    assert_eq!(edit.selected_clip(), None);

    edit.undo().unwrap();
    assert_eq!(edit.selected_clip(), Some(&second));
    edit.undo().unwrap();
    assert_eq!(edit.selected_clip(), Some(&first));

    edit.delete_clip(0, 0).unwrap();
    assert_eq!(edit.selected_clip(), None);
    edit.undo().unwrap();
    assert_eq!(edit.selected_clip(), Some(&first));

    assert!(matches!(
        edit.select_clip("missing"),
        Err(CoreError::PlayerNotFound(_))
    ));
}

// =============================================================================
// Documents, Text and Merge Fields
// =============================================================================

#[tokio::test]
async fn test_scenario_document_round_trip_preserves_intent() {
    let source = json!({
        "timeline": {
            "background": "#000000",
            "tracks": [
                { "clips": [
                    { "asset": { "type": "text", "text": "Title" }, "start": "auto", "length": 2, "position": "top" },
                    { "asset": { "type": "image", "src": "logo.png" }, "start": "auto", "length": "end" }
                ]},
                { "clips": [
                    { "asset": { "type": "video", "src": "a.mp4", "trim": 1.5 }, "start": 0, "length": 10 }
                ]}
            ]
        },
        "output": { "format": "mp4", "size": { "width": 1280, "height": 720 } }
    });

    let edit = load(source.clone()).await;
    assert_eq!(edit.clip(0, 1).unwrap().length(), 8000.0);

    let saved = serde_json::to_value(edit.to_document().unwrap()).unwrap();
    assert_eq!(saved, source);
}

#[tokio::test]
async fn test_scenario_merge_fields_restored_on_save() {
    let mut edit = load(json!({
        "timeline": { "tracks": [{ "clips": [text_clip("Hello {{ NAME }}", json!(0), json!(3))] }] },
        "merge": [{ "find": "NAME", "replace": "World" }]
    }))
    .await;
    let id = edit.clip_id(0, 0).unwrap().clone();
    assert_eq!(
        edit.player(&id).unwrap().config().asset.text_content(),
        Some("Hello World")
    );

    let right = edit.split_clip(0, 0, 1.0).unwrap();
    assert_eq!(
        edit.player(&right).unwrap().bindings(),
        edit.player(&id).unwrap().bindings()
    );

    let saved = edit.to_document().unwrap();
    assert_eq!(
        saved.timeline.tracks[0].clips[1].asset.text_content(),
        Some("Hello {{ NAME }}")
    );

    edit.update_text_content(&id, "Goodbye").unwrap();
    let saved = edit.to_document().unwrap();
    assert_eq!(saved.timeline.tracks[0].clips[0].asset.text_content(), Some("Goodbye"));
    assert_eq!(saved.merge.len(), 1);
}

#[tokio::test]
async fn test_scenario_update_text_rejects_non_text_assets() {
    let mut edit = load(single_video()).await;
    let id = edit.clip_id(0, 0).unwrap().clone();

    assert!(matches!(
        edit.update_text_content(&id, "nope"),
        Err(CoreError::UnsupportedAsset(_))
    ));
    assert!(!edit.can_undo());
}

#[tokio::test]
async fn test_scenario_text_edit_keeps_auto_length() {
    let mut edit = load(json!({
        "timeline": { "tracks": [{ "clips": [
            text_clip("Title", json!("auto"), json!("auto")),
            text_clip("next", json!("auto"), json!(2)),
        ]}]}
    }))
    .await;
    let id = edit.clip_id(0, 0).unwrap().clone();
    let assert_layout = |edit: &Edit| {
        assert_eq!(edit.clip(0, 0).unwrap().length(), DEFAULT_AUTO_LENGTH_MS);
        assert_eq!(edit.clip(0, 1).unwrap().start(), DEFAULT_AUTO_LENGTH_MS);
        assert_eq!(edit.total_duration(), DEFAULT_AUTO_LENGTH_MS + 2000.0);
    };
    assert_layout(&edit);

    edit.update_text_content(&id, "A much longer title").unwrap();
    assert_layout(&edit);
    edit.settle_loads().await;
    edit.update(0.0);
    assert_layout(&edit);

    assert!(edit.undo().unwrap());
    edit.settle_loads().await;
    assert_layout(&edit);
    assert_eq!(
        edit.player(&id).unwrap().config().asset.text_content(),
        Some("Title")
    );
}

#[tokio::test]
async fn test_scenario_source_change_remeasures_auto_length() {
    let mut edit = Edit::new(EditSettings::default()).with_probe(Rc::new(
        StaticProbe::new()
            .with_duration("a.mp4", 6.0)
            .with_duration("b.mp4", 4.0),
    ));
    edit.load_edit(document(json!({
        "timeline": { "tracks": [{ "clips": [
            { "asset": { "type": "video", "src": "a.mp4" }, "start": "auto", "length": "auto" },
            text_clip("next", json!("auto"), json!(1)),
        ]}]}
    })))
    .await
    .unwrap();
    edit.settle_loads().await;
    assert_eq!(edit.clip(0, 0).unwrap().length(), 6000.0);

    let id = edit.clip_id(0, 0).unwrap().clone();
    let mut swapped = edit.player(&id).unwrap().config().clone();
    swapped.asset = Asset::video("b.mp4");
    edit.update_clip(&id, swapped).unwrap();
    edit.settle_loads().await;
    assert_eq!(edit.clip(0, 0).unwrap().length(), 4000.0);
    assert_eq!(edit.clip(0, 1).unwrap().start(), 4000.0);

    edit.undo().unwrap();
    edit.settle_loads().await;
    assert_eq!(edit.clip(0, 0).unwrap().length(), 6000.0);
    assert_eq!(edit.clip(0, 1).unwrap().start(), 6000.0);
}

#[tokio::test]
async fn test_scenario_failed_load_keeps_current_edit() {
    let mut edit = load(three_auto_clips()).await;

    let broken = document(json!({
        "timeline": { "tracks": [{ "clips": [
            { "asset": { "type": "video", "src": "" }, "start": 0, "length": 1 }
        ]}]}
    }));
    assert!(matches!(
        edit.load_edit(broken).await,
        Err(CoreError::PlayerConstruction(_))
    ));
    assert_eq!(edit.clip_count(), 3);
    assert_eq!(edit.total_duration(), 9000.0);
}

// =============================================================================
// Events and Playback
// =============================================================================

#[tokio::test]
async fn test_scenario_duration_changed_only_when_different() {
    let mut edit = load(three_auto_clips()).await;
    let durations = count_events(&mut edit, event_names::DURATION_CHANGED);
    let updates = count_events(&mut edit, event_names::TIMELINE_UPDATED);

    edit.add_clip(1, ClipConfig::fixed(Asset::text("short"), 0.0, 1.0))
        .unwrap();
    assert_eq!(durations.get(), 0);
    assert_eq!(updates.get(), 1);

    edit.add_clip(0, ClipConfig::auto(Asset::text("tail"), 1.0))
        .unwrap();
    assert_eq!(durations.get(), 1);
    assert_eq!(edit.total_duration(), 10000.0);
}

#[tokio::test]
async fn test_scenario_playback_pauses_at_end() {
    let mut edit = load(three_auto_clips()).await;
    let pauses = count_events(&mut edit, event_names::PLAYBACK_PAUSE);

    edit.play();
    edit.update(4000.0);
    assert!(edit.is_playing());
    assert_eq!(edit.playback_time(), 4000.0);

    edit.update(10_000.0);
    assert!(!edit.is_playing());
    assert_eq!(edit.playback_time(), 9000.0);
    assert_eq!(pauses.get(), 1);

    edit.seek(-5.0);
    assert_eq!(edit.playback_time(), 0.0);
    edit.seek(50_000.0);
    assert_eq!(edit.playback_time(), 9000.0);

    edit.stop();
    assert_eq!(edit.playback_time(), 0.0);
}

#[tokio::test]
async fn test_scenario_dispose_releases_everything() {
    let mut edit = load(three_auto_clips()).await;
    edit.dispose();

    assert_eq!(edit.track_count(), 0);
    assert_eq!(edit.arena_len(), 0);
    assert!(!edit.can_undo());
    assert_eq!(edit.total_duration(), 0.0);
}
