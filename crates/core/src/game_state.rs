//! Owner of the live state record and the operations scripts and the engine call on it.

use std::io::{Read, Write};
use std::rc::Rc;

use crate::config::StateConfig;
use crate::error::{StateError, StateResult};
use crate::platform::{Calendar, Clock, SaveFileManager};
use crate::state::{CameraLimits, StateRecord, Thumbnail, ViewState};
use crate::vars::{check_range, EngineVar, VarCatalog};
use crate::version::SAVE_VERSION;

/// Interval between increments of the played-seconds counter.
pub const SECOND_MS: u32 = 1000;

/// Clock drift beyond which the seconds counter resynchronizes at once.
pub const RESYNC_THRESHOLD_MS: u32 = 2000;

/// Game state controller. Exactly one is live per running session.
#[derive(Clone, Debug)]
pub struct GameState {
    pub(crate) data: StateRecord,
    catalog: VarCatalog,
    config: StateConfig,
}

impl GameState {
    pub fn new() -> Self {
        Self::with_config(StateConfig::default())
    }

    pub fn with_config(config: StateConfig) -> Self {
        Self {
            data: StateRecord::new(),
            catalog: VarCatalog::builtin(),
            config,
        }
    }

    /// Replaces the whole record with a new game.
    pub fn new_game(&mut self) {
        self.data = StateRecord::new();
    }

    pub fn record(&self) -> &StateRecord {
        &self.data
    }

    pub fn catalog(&self) -> &VarCatalog {
        &self.catalog
    }

    pub fn config(&self) -> &StateConfig {
        &self.config
    }

    pub fn get_var(&self, var: u16) -> StateResult<i32> {
        self.data.vars.get(var)
    }

    /// Script write. Writes to unimplemented engine-mapped vars are allowed but logged.
    pub fn set_var(&mut self, var: u16, value: i32) -> StateResult<()> {
        check_range(var)?;
        if self.config.warn_on_unknown_writes {
            if let Some(description) = self.catalog.get(var).filter(|d| d.unknown) {
                tracing::warn!(
                    var,
                    name = description.name,
                    value,
                    "a script is writing to the unimplemented engine-mapped var"
                );
            }
        }
        self.data.vars.set(var, value)
    }

    /// Engine read, restricted to described variables.
    pub fn engine_get(&self, var: u16) -> StateResult<i32> {
        self.check_described(var)?;
        self.data.vars.get(var)
    }

    /// Engine write, restricted to described variables.
    pub fn engine_set(&mut self, var: u16, value: i32) -> StateResult<()> {
        self.check_described(var)?;
        self.data.vars.set(var, value)
    }

    fn check_described(&self, var: u16) -> StateResult<()> {
        if !self.catalog.contains(var) {
            return Err(StateError::UndescribedVar { index: var });
        }
        Ok(())
    }

    pub fn engine_var(&self, var: EngineVar) -> i32 {
        self.data.vars.slot(var.index())
    }

    pub fn set_engine_var(&mut self, var: EngineVar, value: i32) {
        self.data.vars.as_mut_slice()[usize::from(var.index())] = value;
    }

    pub fn describe_var(&self, var: u16) -> String {
        self.catalog.describe(var)
    }

    pub fn inventory(&self) -> Vec<u16> {
        self.data.inventory.items()
    }

    /// Rebuilds the inventory wholesale; items past the seventh are dropped.
    pub fn update_inventory(&mut self, items: &[u16]) {
        let dropped = self.data.inventory.replace(items);
        if dropped > 0 {
            tracing::warn!(dropped, "inventory is full, extra items were not stored");
        }
    }

    pub fn zip_destination(&self, index: u8) -> bool {
        self.data.zip_destinations.is_unlocked(index)
    }

    pub fn set_zip_destination(&mut self, index: u8, unlocked: bool) {
        self.data.zip_destinations.set_unlocked(index, unlocked);
    }

    pub fn camera_limits(&self) -> CameraLimits {
        self.data.camera_limits
    }

    pub fn limit_cube_camera(
        &mut self,
        min_pitch: f32,
        max_pitch: f32,
        min_heading: f32,
        max_heading: f32,
    ) {
        self.data.camera_limits = CameraLimits {
            limited: true,
            min_pitch,
            max_pitch,
            min_heading,
            max_heading,
        };
    }

    pub fn free_cube_camera(&mut self) {
        self.data.camera_limits.limited = false;
    }

    pub fn view(&self) -> ViewState {
        self.data.view
    }

    pub fn set_view(&mut self, view: ViewState) {
        self.data.view = view;
    }

    pub fn look_at(&mut self, pitch: f32, heading: f32) {
        self.data.view.lookat_pitch = pitch;
        self.data.view.lookat_heading = heading;
    }

    pub fn current_node_type(&self) -> u32 {
        self.data.current_node_type
    }

    pub fn set_current_node_type(&mut self, node_type: u32) {
        self.data.current_node_type = node_type;
    }

    pub fn game_running(&self) -> bool {
        self.data.game_running
    }

    pub fn set_game_running(&mut self, running: bool) {
        self.data.game_running = running;
    }

    pub fn current_frame(&self) -> u32 {
        self.data.current_frame
    }

    pub fn seconds_played(&self) -> u32 {
        self.data.seconds_played
    }

    pub fn save_description(&self) -> &str {
        &self.data.metadata.description
    }

    pub fn set_save_description(&mut self, description: &str) -> StateResult<()> {
        if description.len() > self.config.max_description_len {
            return Err(StateError::DescriptionTooLong {
                len: description.len(),
                max: self.config.max_description_len,
            });
        }
        self.data.metadata.description = description.to_string();
        Ok(())
    }

    /// Shared handle to the current save thumbnail.
    pub fn save_thumbnail(&self) -> Rc<Thumbnail> {
        Rc::clone(&self.data.thumbnail)
    }

    /// Replaces the thumbnail; the previous image lives on only in other holders.
    pub fn set_save_thumbnail(&mut self, thumbnail: Rc<Thumbnail>) {
        if Rc::ptr_eq(&self.data.thumbnail, &thumbnail) {
            return;
        }
        self.data.thumbnail = thumbnail;
    }

    /// Advances the frame counter, and the seconds counter about once a second.
    pub fn update_frame_counters(&mut self, clock: &dyn Clock) {
        self.data.current_frame = self.data.current_frame.wrapping_add(1);

        if !self.data.game_running {
            return;
        }

        let frame_countdown = self.engine_var(EngineVar::FrameCountdown);
        if frame_countdown > 0 {
            self.set_engine_var(EngineVar::FrameCountdown, frame_countdown - 1);
        }

        let now = clock.millis();
        let drift = (self.data.next_seconds_update.wrapping_sub(now) as i32).unsigned_abs();
        if now > self.data.next_seconds_update || drift > RESYNC_THRESHOLD_MS {
            self.data.seconds_played = self.data.seconds_played.wrapping_add(1);
            self.data.next_seconds_update = now.wrapping_add(SECOND_MS);

            let seconds_countdown = self.engine_var(EngineVar::SecondsCountdown);
            if seconds_countdown > 0 {
                self.set_engine_var(EngineVar::SecondsCountdown, seconds_countdown - 1);
            }
        }
    }

    /// Replaces the live record with one decoded from `reader`.
    ///
    /// Decoding happens into a fresh record; on any error the live state is untouched.
    pub fn load(&mut self, reader: &mut dyn Read) -> StateResult<()> {
        let mut record = StateRecord::decode(reader, self.config.max_description_len)?;
        record.game_running = true;
        self.data = record;
        Ok(())
    }

    pub fn load_bytes(&mut self, input: &[u8]) -> StateResult<()> {
        let mut reader = input;
        self.load(&mut reader)
    }

    /// Dates the save from `calendar` and writes it at the configured version.
    pub fn save(&mut self, writer: &mut dyn Write, calendar: &dyn Calendar) -> StateResult<usize> {
        self.data.metadata.stamp(calendar.now());
        self.write(writer, self.config.write_version)
    }

    /// Writes the record at `version` without touching its metadata.
    ///
    /// The running flag reads as false in the written record.
    pub fn write(&mut self, writer: &mut dyn Write, version: u32) -> StateResult<usize> {
        if version > SAVE_VERSION {
            return Err(StateError::VersionTooRecent {
                found: version,
                max: SAVE_VERSION,
            });
        }
        self.data.game_running = false;
        let written = self
            .data
            .encode(writer, version, self.config.max_description_len);
        self.data.game_running = true;
        written
    }

    pub fn save_to_bytes(&mut self, calendar: &dyn Calendar) -> StateResult<Vec<u8>> {
        let mut output = Vec::new();
        self.save(&mut output, calendar)?;
        Ok(output)
    }

    pub fn load_from(&mut self, files: &dyn SaveFileManager, name: &str) -> StateResult<()> {
        let mut reader = files.open_for_loading(name)?;
        self.load(&mut reader)
    }

    /// Saves through `files`; the save only becomes visible once fully written.
    pub fn save_to(
        &mut self,
        files: &dyn SaveFileManager,
        name: &str,
        calendar: &dyn Calendar,
    ) -> StateResult<usize> {
        let mut sink = files.open_for_saving(name)?;
        let written = self.save(&mut sink, calendar)?;
        sink.commit()?;
        Ok(written)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/game_state_tests.rs"]
mod tests;
