//! The serializable snapshot of a game session.

use std::rc::Rc;

use crate::error::{StateError, StateResult};
use crate::version::{
    SAVE_VERSION, THUMBNAIL_BYTES_PER_PIXEL, THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH,
};
use crate::vars::VariableTable;

pub const INVENTORY_CAPACITY: usize = 7;
pub const ZIP_DESTINATION_COUNT: usize = 256;

/// Items currently held, in pickup order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inventory {
    pub(crate) count: u32,
    pub(crate) items: [u32; INVENTORY_CAPACITY],
}

impl Inventory {
    /// Items up to the stored count.
    pub fn items(&self) -> Vec<u16> {
        self.items
            .iter()
            .take(self.count as usize)
            .map(|item| *item as u16)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Rebuilds the list from `items`, keeping at most seven entries.
    ///
    /// Returns the number of items that did not fit.
    pub fn replace(&mut self, items: &[u16]) -> usize {
        self.items = [0; INVENTORY_CAPACITY];
        let kept = items.len().min(INVENTORY_CAPACITY);
        for (slot, item) in self.items.iter_mut().zip(items) {
            *slot = u32::from(*item);
        }
        self.count = kept as u32;
        items.len() - kept
    }

    pub(crate) fn validate(&self) -> StateResult<()> {
        if self.count as usize > INVENTORY_CAPACITY {
            return Err(StateError::CorruptRecord(format!(
                "inventory count {} exceeds capacity {INVENTORY_CAPACITY}",
                self.count
            )));
        }
        if let Some(item) = self.items.iter().find(|item| **item > u32::from(u16::MAX)) {
            return Err(StateError::CorruptRecord(format!(
                "inventory item {item} is not a valid item id"
            )));
        }
        Ok(())
    }
}

/// Unlocked fast-travel nodes, one flag byte per destination.
#[derive(Clone, PartialEq, Eq)]
pub struct ZipDestinations {
    pub(crate) flags: [u8; ZIP_DESTINATION_COUNT],
}

impl ZipDestinations {
    pub fn is_unlocked(&self, index: u8) -> bool {
        self.flags[usize::from(index)] != 0
    }

    pub fn set_unlocked(&mut self, index: u8, unlocked: bool) {
        self.flags[usize::from(index)] = u8::from(unlocked);
    }

    pub fn unlocked_count(&self) -> usize {
        self.flags.iter().filter(|flag| **flag != 0).count()
    }
}

impl Default for ZipDestinations {
    fn default() -> Self {
        Self {
            flags: [0; ZIP_DESTINATION_COUNT],
        }
    }
}

impl std::fmt::Debug for ZipDestinations {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let unlocked: Vec<usize> = self
            .flags
            .iter()
            .enumerate()
            .filter(|(_, flag)| **flag != 0)
            .map(|(index, _)| index)
            .collect();
        f.debug_struct("ZipDestinations")
            .field("unlocked", &unlocked)
            .finish()
    }
}

/// Pitch and heading bounds of the cube camera.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CameraLimits {
    pub limited: bool,
    pub min_pitch: f32,
    pub max_pitch: f32,
    pub min_heading: f32,
    pub max_heading: f32,
}

/// Current orientation of the player's view.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViewState {
    pub lookat_pitch: f32,
    pub lookat_heading: f32,
    pub lookat_fov: f32,
    pub pitch_offset: f32,
    pub heading_offset: f32,
}

/// Wall-clock date and time, as reported by the platform calendar.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "arbitrary", derive(arbitrary::Arbitrary))]
pub struct TimeDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
}

/// Creation info written with every save of a recent enough version.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveMetadata {
    pub day: u8,
    pub month: u8,
    pub year: u16,
    pub hour: u8,
    pub minute: u8,
    pub description: String,
}

impl SaveMetadata {
    pub fn stamp(&mut self, now: TimeDate) {
        self.year = now.year;
        self.month = now.month;
        self.day = now.day;
        self.hour = now.hour;
        self.minute = now.minute;
    }

    pub fn date(&self) -> TimeDate {
        TimeDate {
            year: self.year,
            month: self.month,
            day: self.day,
            hour: self.hour,
            minute: self.minute,
        }
    }
}

/// Save preview image, always `THUMBNAIL_WIDTH` x `THUMBNAIL_HEIGHT` RGBA pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct Thumbnail {
    pixels: Vec<u8>,
}

impl Thumbnail {
    pub const BYTE_LEN: usize = THUMBNAIL_WIDTH * THUMBNAIL_HEIGHT * THUMBNAIL_BYTES_PER_PIXEL;

    /// A black, fully transparent image.
    pub fn new() -> Self {
        Self {
            pixels: vec![0; Self::BYTE_LEN],
        }
    }

    pub fn from_pixels(pixels: Vec<u8>) -> StateResult<Self> {
        if pixels.len() != Self::BYTE_LEN {
            return Err(StateError::InvalidThumbnail {
                expected: Self::BYTE_LEN,
                found: pixels.len(),
            });
        }
        Ok(Self { pixels })
    }

    pub fn width(&self) -> usize {
        THUMBNAIL_WIDTH
    }

    pub fn height(&self) -> usize {
        THUMBNAIL_HEIGHT
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub(crate) fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.pixels
    }
}

impl Default for Thumbnail {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Thumbnail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Thumbnail({THUMBNAIL_WIDTH}x{THUMBNAIL_HEIGHT})")
    }
}

/// Opaque fields kept only so the binary layout stays compatible.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LegacyFields {
    pub dword_4c2c44: u32,
    pub dword_4c2c48: u32,
    pub dword_4c2c4c: u32,
    pub dword_4c2c50: u32,
    pub dword_4c2c54: u32,
    pub dword_4c2c58: u32,
    pub dword_4c2c5c: u32,
    pub dword_4c2c90: u32,
}

/// Complete mutable state of a running game.
#[derive(Clone, Debug, PartialEq)]
pub struct StateRecord {
    /// Format version the record was created with or decoded from.
    pub version: u32,
    pub game_running: bool,
    pub current_frame: u32,
    pub next_seconds_update: u32,
    pub seconds_played: u32,
    pub legacy: LegacyFields,
    pub current_node_type: u32,
    pub view: ViewState,
    pub camera_limits: CameraLimits,
    pub vars: VariableTable,
    pub inventory: Inventory,
    pub zip_destinations: ZipDestinations,
    pub metadata: SaveMetadata,
    pub thumbnail: Rc<Thumbnail>,
}

impl StateRecord {
    /// State of a new game.
    pub fn new() -> Self {
        Self {
            version: SAVE_VERSION,
            game_running: true,
            current_frame: 0,
            next_seconds_update: 0,
            seconds_played: 0,
            legacy: LegacyFields::default(),
            current_node_type: 0,
            view: ViewState::default(),
            camera_limits: CameraLimits::default(),
            vars: VariableTable::new(),
            inventory: Inventory::default(),
            zip_destinations: ZipDestinations::default(),
            metadata: SaveMetadata::default(),
            thumbnail: Rc::new(Thumbnail::new()),
        }
    }
}

impl Default for StateRecord {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
