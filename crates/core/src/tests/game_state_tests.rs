use std::cell::Cell;
use std::fmt::{self, Write as _};
use std::sync::{Arc, Mutex};

use tracing::field::{Field, Visit};
use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

use super::*;
use crate::platform::{MemorySaveFiles, NoInput};
use crate::state::TimeDate;

/// Collects the fields of every `WARN` event, one line per event.
#[derive(Clone, Default)]
struct WarningLog(Arc<Mutex<Vec<String>>>);

impl WarningLog {
    fn lines(&self) -> Vec<String> {
        self.0.lock().expect("warning log").clone()
    }
}

impl<S: tracing::Subscriber> Layer<S> for WarningLog {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() != tracing::Level::WARN {
            return;
        }
        let mut fields = FieldLine::default();
        event.record(&mut fields);
        self.0.lock().expect("warning log").push(fields.0);
    }
}

#[derive(Default)]
struct FieldLine(String);

impl Visit for FieldLine {
    fn record_str(&mut self, field: &Field, value: &str) {
        let _ = write!(self.0, "{}={} ", field.name(), value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        let _ = write!(self.0, "{}={:?} ", field.name(), value);
    }
}

fn warnings_during(run: impl FnOnce()) -> Vec<String> {
    let log = WarningLog::default();
    let subscriber = tracing_subscriber::registry().with(log.clone());
    tracing::subscriber::with_default(subscriber, run);
    log.lines()
}

struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    fn at(millis: u32) -> Self {
        Self {
            now: Cell::new(millis),
        }
    }

    fn set(&self, millis: u32) {
        self.now.set(millis);
    }
}

impl Clock for ManualClock {
    fn millis(&self) -> u32 {
        self.now.get()
    }
}

struct FixedCalendar(TimeDate);

impl Calendar for FixedCalendar {
    fn now(&self) -> TimeDate {
        self.0
    }
}

fn calendar() -> FixedCalendar {
    FixedCalendar(TimeDate {
        year: 2003,
        month: 5,
        day: 8,
        hour: 21,
        minute: 30,
    })
}

#[test]
fn fresh_state_reserves_the_first_two_slots() {
    let state = GameState::new();
    assert_eq!(state.record().vars.slot(0), 0);
    assert_eq!(state.get_var(1).expect("var 1"), 1);
    assert!(state.game_running());
    assert!(matches!(
        state.get_var(0),
        Err(StateError::VarOutOfRange { index: 0 })
    ));
}

#[test]
fn set_then_get_returns_the_value() {
    let mut state = GameState::new();
    state.set_var(61, 3).expect("set");
    assert_eq!(state.get_var(61).expect("get"), 3);
    assert_eq!(state.engine_var(EngineVar::LocationAge), 3);
    assert!(state.set_var(2048, 1).is_err());
}

#[test]
fn writes_to_unimplemented_vars_still_land() {
    let mut state = GameState::new();
    assert!(EngineVar::DragEnded.description().unknown);
    state.set_var(EngineVar::DragEnded.index(), 4).expect("write is not fatal");
    assert_eq!(state.get_var(EngineVar::DragEnded.index()).expect("get"), 4);
}

#[test]
fn unknown_var_writes_are_logged() {
    let warnings = warnings_during(|| {
        let mut state = GameState::new();
        state.set_var(EngineVar::DragEnded.index(), 4).expect("set");
    });
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("name=DragEnded"), "{warnings:?}");
    assert!(warnings[0].contains("var=57"), "{warnings:?}");
}

#[test]
fn described_var_writes_are_silent() {
    let warnings = warnings_during(|| {
        let mut state = GameState::new();
        state.set_var(EngineVar::LocationAge.index(), 3).expect("set");
        state.set_var(1500, 1).expect("set");
    });
    assert!(warnings.is_empty(), "{warnings:?}");
}

#[test]
fn unknown_write_warnings_follow_config() {
    let warnings = warnings_during(|| {
        let mut state = GameState::with_config(StateConfig {
            warn_on_unknown_writes: false,
            ..StateConfig::default()
        });
        state.set_var(EngineVar::DragEnded.index(), 4).expect("set");
        assert_eq!(state.get_var(EngineVar::DragEnded.index()).expect("get"), 4);
    });
    assert!(warnings.is_empty(), "{warnings:?}");
}

#[test]
fn engine_access_requires_a_description() {
    let mut state = GameState::new();
    state.engine_set(61, 9).expect("described");
    assert_eq!(state.engine_get(61).expect("described"), 9);
    assert!(matches!(
        state.engine_get(1500),
        Err(StateError::UndescribedVar { index: 1500 })
    ));
    assert!(state.engine_set(1500, 1).is_err());
    state.set_var(1500, 2).expect("scripts may use any slot");
}

#[test]
fn describe_var_uses_catalog_names() {
    let state = GameState::new();
    assert_eq!(state.describe_var(61), "LocationAge");
    assert_eq!(state.describe_var(1500), "v1500");
}

#[test]
fn inventory_keeps_the_first_seven_items() {
    let mut state = GameState::new();
    state.update_inventory(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);
    assert_eq!(state.inventory(), vec![1, 2, 3, 4, 5, 6, 7]);
    assert_eq!(state.record().inventory.len(), 7);

    state.update_inventory(&[42]);
    assert_eq!(state.inventory(), vec![42]);
}

#[test]
fn camera_limits_and_view() {
    let mut state = GameState::new();
    state.limit_cube_camera(-30.0, 30.0, 90.0, 270.0);
    let limits = state.camera_limits();
    assert!(limits.limited);
    assert_eq!(limits.max_heading, 270.0);

    state.free_cube_camera();
    assert!(!state.camera_limits().limited);
    assert_eq!(state.camera_limits().min_pitch, -30.0);

    state.look_at(10.0, 180.0);
    assert_eq!(state.view().lookat_pitch, 10.0);
    assert_eq!(state.view().lookat_heading, 180.0);
}

#[test]
fn zip_destinations_toggle() {
    let mut state = GameState::new();
    state.set_zip_destination(200, true);
    assert!(state.zip_destination(200));
    assert!(!state.zip_destination(199));
    state.set_zip_destination(200, false);
    assert!(!state.zip_destination(200));
}

#[test]
fn frame_counters_tick_once_per_second() {
    let mut state = GameState::new();
    let clock = ManualClock::at(500);
    state.set_engine_var(EngineVar::FrameCountdown, 2);
    state.set_engine_var(EngineVar::SecondsCountdown, 5);

    state.update_frame_counters(&clock);
    assert_eq!(state.current_frame(), 1);
    assert_eq!(state.seconds_played(), 1);
    assert_eq!(state.record().next_seconds_update, 1500);
    assert_eq!(state.engine_var(EngineVar::FrameCountdown), 1);
    assert_eq!(state.engine_var(EngineVar::SecondsCountdown), 4);

    clock.set(900);
    state.update_frame_counters(&clock);
    assert_eq!(state.current_frame(), 2);
    assert_eq!(state.seconds_played(), 1);
    assert_eq!(state.engine_var(EngineVar::FrameCountdown), 0);

    clock.set(1501);
    state.update_frame_counters(&clock);
    assert_eq!(state.seconds_played(), 2);
    assert_eq!(state.record().next_seconds_update, 2501);
    assert_eq!(state.engine_var(EngineVar::FrameCountdown), 0);
    assert_eq!(state.engine_var(EngineVar::SecondsCountdown), 3);
}

#[test]
fn clock_jumps_resync_the_seconds_counter() {
    let mut state = GameState::new();
    let clock = ManualClock::at(10_000);
    state.update_frame_counters(&clock);
    assert_eq!(state.record().next_seconds_update, 11_000);

    // Clock went backwards, far past the resync threshold.
    clock.set(50);
    state.update_frame_counters(&clock);
    assert_eq!(state.seconds_played(), 2);
    assert_eq!(state.record().next_seconds_update, 1050);

    // Small backwards drift is tolerated.
    clock.set(40);
    state.update_frame_counters(&clock);
    assert_eq!(state.seconds_played(), 2);
}

#[test]
fn drift_of_exactly_the_threshold_waits_for_the_deadline() {
    let mut state = GameState::new();
    let clock = ManualClock::at(1_000);
    state.update_frame_counters(&clock);
    assert_eq!(state.record().next_seconds_update, 2_000);
    assert_eq!(state.seconds_played(), 1);

    clock.set(2_000 - RESYNC_THRESHOLD_MS);
    state.update_frame_counters(&clock);
    assert_eq!(state.seconds_played(), 1);
    assert_eq!(state.record().next_seconds_update, 2_000);

    clock.set(2_001);
    state.update_frame_counters(&clock);
    assert_eq!(state.seconds_played(), 2);
}

#[test]
fn drift_just_past_the_threshold_resyncs() {
    let mut state = GameState::new();
    let clock = ManualClock::at(3_000);
    state.update_frame_counters(&clock);
    assert_eq!(state.record().next_seconds_update, 4_000);

    clock.set(4_000 - RESYNC_THRESHOLD_MS - 1);
    state.update_frame_counters(&clock);
    assert_eq!(state.seconds_played(), 2);
    assert_eq!(state.record().next_seconds_update, 2_999);
}

#[test]
fn paused_game_only_counts_frames() {
    let mut state = GameState::new();
    state.set_game_running(false);
    state.set_engine_var(EngineVar::FrameCountdown, 3);
    state.update_frame_counters(&ManualClock::at(5_000));
    assert_eq!(state.current_frame(), 1);
    assert_eq!(state.seconds_played(), 0);
    assert_eq!(state.engine_var(EngineVar::FrameCountdown), 3);
}

#[test]
fn save_records_a_paused_game_and_resumes() {
    let mut state = GameState::new();
    let bytes = state.save_to_bytes(&calendar()).expect("save");
    assert_eq!(&bytes[0..4], &SAVE_VERSION.to_le_bytes());
    assert_eq!(&bytes[4..8], &0u32.to_le_bytes());
    assert!(state.game_running());
    assert_eq!(state.record().metadata.year, 2003);
    assert_eq!(state.record().metadata.minute, 30);
}

#[test]
fn load_resumes_the_game() {
    let mut source = GameState::new();
    source.set_var(61, 3).expect("set");
    source.set_save_description("Amateria").expect("description");
    let bytes = source.save_to_bytes(&calendar()).expect("save");

    let mut target = GameState::new();
    target.set_game_running(false);
    target.load_bytes(&bytes).expect("load");
    assert!(target.game_running());
    assert_eq!(target.get_var(61).expect("get"), 3);
    assert_eq!(target.save_description(), "Amateria");
}

#[test]
fn failed_load_leaves_state_untouched() {
    let mut source = GameState::new();
    let bytes = source.save_to_bytes(&calendar()).expect("save");

    let mut state = GameState::new();
    state.set_var(61, 7).expect("set");
    state.set_var(400, -12).expect("set");
    let before = state.record().clone();

    let err = state.load_bytes(&bytes[..bytes.len() / 2]).expect_err("truncated");
    assert!(err.is_corruption());
    assert_eq!(state.record(), &before);

    let mut too_new = bytes.clone();
    too_new[0..4].copy_from_slice(&(SAVE_VERSION + 1).to_le_bytes());
    assert!(matches!(
        state.load_bytes(&too_new),
        Err(StateError::VersionTooRecent { .. })
    ));
    assert_eq!(state.record(), &before);
}

#[test]
fn write_rejects_future_versions() {
    let mut state = GameState::new();
    let mut output = Vec::new();
    assert!(state.write(&mut output, SAVE_VERSION + 1).is_err());
    assert!(output.is_empty());
    assert!(state.game_running());
}

#[test]
fn description_length_is_bounded() {
    let mut state = GameState::with_config(StateConfig {
        max_description_len: 8,
        ..StateConfig::default()
    });
    state.set_save_description("Edanna").expect("fits");
    assert!(matches!(
        state.set_save_description("Voltaic Island"),
        Err(StateError::DescriptionTooLong { len: 14, max: 8 })
    ));
    assert_eq!(state.save_description(), "Edanna");
}

#[test]
fn thumbnail_handles_are_shared() {
    let mut state = GameState::new();
    let previous = state.save_thumbnail();

    let mut pixels = vec![0u8; Thumbnail::BYTE_LEN];
    pixels[0] = 0xFF;
    let replacement = Rc::new(Thumbnail::from_pixels(pixels).expect("thumbnail"));
    state.set_save_thumbnail(Rc::clone(&replacement));

    assert!(Rc::ptr_eq(&state.save_thumbnail(), &replacement));
    assert_eq!(previous.pixels()[0], 0);
    assert_eq!(Rc::strong_count(&replacement), 2);

    state.set_save_thumbnail(state.save_thumbnail());
    assert_eq!(Rc::strong_count(&replacement), 2);
}

#[test]
fn new_game_discards_progress() {
    let mut state = GameState::new();
    state.set_var(61, 3).expect("set");
    state.update_inventory(&[5]);
    state.new_game();
    assert_eq!(state.get_var(61).expect("get"), 0);
    assert!(state.inventory().is_empty());
    assert!(state.game_running());
}

#[test]
fn saves_through_a_file_manager() {
    let files = MemorySaveFiles::new();
    let mut state = GameState::new();
    state.set_var(62, 11).expect("set");
    let written = state
        .save_to(&files, "quick.m3s", &calendar())
        .expect("save");
    assert_eq!(files.get("quick.m3s").map(|bytes| bytes.len()), Some(written));

    let mut restored = GameState::new();
    restored.load_from(&files, "quick.m3s").expect("load");
    assert_eq!(restored.get_var(62).expect("get"), 11);
    assert!(restored.load_from(&files, "missing.m3s").is_err());

    // Input refresh does not disturb saved values of other vars.
    assert!(!restored.evaluate(84, &NoInput));
    assert_eq!(restored.get_var(62).expect("get"), 11);
}
