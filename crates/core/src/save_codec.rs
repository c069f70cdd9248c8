//! Bidirectional, version-aware transcoder between a [`StateRecord`] and a byte stream.
//!
//! A single field walk ([`StateRecord::sync_with_save_game`]) drives both
//! directions, so the read and write layouts cannot drift apart. All integers
//! are little-endian.

use std::io::{Read, Write};
use std::rc::Rc;

use crate::error::{StateError, StateResult};
use crate::state::{StateRecord, Thumbnail};
use crate::version::{FIXED_POINT_PRECISION, FIXED_POINT_VERSION, METADATA_VERSION, SAVE_VERSION};

pub const DEFAULT_MAX_STRING_LEN: usize = 256;

enum Direction<'a> {
    Loading(&'a mut dyn Read),
    Saving(&'a mut dyn Write),
}

/// Cursor over a save stream in one direction.
pub struct SaveSerializer<'a> {
    direction: Direction<'a>,
    version: u32,
    bytes_synced: usize,
    max_string_len: usize,
}

impl<'a> SaveSerializer<'a> {
    /// Reads a stream; the version is taken from the stream header.
    pub fn for_loading(reader: &'a mut dyn Read) -> Self {
        Self {
            direction: Direction::Loading(reader),
            version: 0,
            bytes_synced: 0,
            max_string_len: DEFAULT_MAX_STRING_LEN,
        }
    }

    /// Writes a stream at `version`.
    pub fn for_saving(writer: &'a mut dyn Write, version: u32) -> Self {
        Self {
            direction: Direction::Saving(writer),
            version,
            bytes_synced: 0,
            max_string_len: DEFAULT_MAX_STRING_LEN,
        }
    }

    pub fn with_max_string_len(mut self, max_string_len: usize) -> Self {
        self.max_string_len = max_string_len;
        self
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.direction, Direction::Loading(_))
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn bytes_synced(&self) -> usize {
        self.bytes_synced
    }

    /// Syncs the header version, rejecting anything above `max_version`.
    pub fn sync_version(&mut self, max_version: u32) -> StateResult<()> {
        let mut version = self.version;
        self.sync_u32(&mut version)?;
        if version > max_version {
            return Err(StateError::VersionTooRecent {
                found: version,
                max: max_version,
            });
        }
        self.version = version;
        Ok(())
    }

    pub fn sync_bytes(&mut self, bytes: &mut [u8]) -> StateResult<()> {
        match &mut self.direction {
            Direction::Loading(reader) => reader.read_exact(bytes)?,
            Direction::Saving(writer) => writer.write_all(bytes)?,
        }
        self.bytes_synced += bytes.len();
        Ok(())
    }

    fn sync_array<const N: usize>(&mut self, bytes: &mut [u8; N]) -> StateResult<()> {
        self.sync_bytes(bytes.as_mut_slice())
    }

    pub fn sync_u8(&mut self, value: &mut u8) -> StateResult<()> {
        let mut bytes = [*value];
        self.sync_array(&mut bytes)?;
        *value = bytes[0];
        Ok(())
    }

    pub fn sync_u16(&mut self, value: &mut u16) -> StateResult<()> {
        let mut bytes = value.to_le_bytes();
        self.sync_array(&mut bytes)?;
        *value = u16::from_le_bytes(bytes);
        Ok(())
    }

    pub fn sync_u32(&mut self, value: &mut u32) -> StateResult<()> {
        let mut bytes = value.to_le_bytes();
        self.sync_array(&mut bytes)?;
        *value = u32::from_le_bytes(bytes);
        Ok(())
    }

    pub fn sync_i32(&mut self, value: &mut i32) -> StateResult<()> {
        let mut bytes = value.to_le_bytes();
        self.sync_array(&mut bytes)?;
        *value = i32::from_le_bytes(bytes);
        Ok(())
    }

    /// Booleans are stored as a full 32-bit word.
    pub fn sync_bool(&mut self, value: &mut bool) -> StateResult<()> {
        let mut word = u32::from(*value);
        self.sync_u32(&mut word)?;
        *value = word != 0;
        Ok(())
    }

    /// Raw IEEE-754 bytes before [`FIXED_POINT_VERSION`], fixed-point afterwards.
    pub fn sync_float(&mut self, value: &mut f32) -> StateResult<()> {
        if self.version < FIXED_POINT_VERSION {
            let mut bytes = value.to_le_bytes();
            self.sync_array(&mut bytes)?;
            *value = f32::from_le_bytes(bytes);
            return Ok(());
        }
        let mut fixed = to_fixed_point(*value);
        self.sync_i32(&mut fixed)?;
        *value = from_fixed_point(fixed);
        Ok(())
    }

    /// Strings are a 32-bit byte length followed by UTF-8 data.
    pub fn sync_string(&mut self, value: &mut String) -> StateResult<()> {
        if !self.is_loading() {
            self.check_string_len(value.len())?;
        }
        let mut len = value.len() as u32;
        self.sync_u32(&mut len)?;
        self.check_string_len(len as usize)?;
        if self.is_loading() {
            let mut bytes = vec![0; len as usize];
            self.sync_bytes(&mut bytes)?;
            *value = String::from_utf8(bytes)
                .map_err(|err| StateError::CorruptRecord(format!("description: {err}")))?;
        } else {
            let mut bytes = value.clone().into_bytes();
            self.sync_bytes(&mut bytes)?;
        }
        Ok(())
    }

    fn check_string_len(&self, len: usize) -> StateResult<()> {
        if len > self.max_string_len {
            return Err(StateError::DescriptionTooLong {
                len,
                max: self.max_string_len,
            });
        }
        Ok(())
    }

    /// Loading always allocates a fresh image before reading pixels into it.
    pub fn sync_thumbnail(&mut self, thumbnail: &mut Rc<Thumbnail>) -> StateResult<()> {
        if self.is_loading() {
            let mut fresh = Thumbnail::new();
            self.sync_bytes(fresh.pixels_mut())?;
            *thumbnail = Rc::new(fresh);
            return Ok(());
        }
        let mut pixels = thumbnail.pixels().to_vec();
        self.sync_bytes(&mut pixels)
    }
}

pub fn to_fixed_point(value: f32) -> i32 {
    (value * FIXED_POINT_PRECISION).round() as i32
}

pub fn from_fixed_point(value: i32) -> f32 {
    value as f32 / FIXED_POINT_PRECISION
}

impl StateRecord {
    /// Walks every field in save order.
    pub fn sync_with_save_game(&mut self, s: &mut SaveSerializer<'_>) -> StateResult<()> {
        s.sync_version(SAVE_VERSION)?;

        s.sync_bool(&mut self.game_running)?;
        s.sync_u32(&mut self.current_frame)?;
        s.sync_u32(&mut self.next_seconds_update)?;
        s.sync_u32(&mut self.seconds_played)?;
        s.sync_u32(&mut self.legacy.dword_4c2c44)?;
        s.sync_u32(&mut self.legacy.dword_4c2c48)?;
        s.sync_u32(&mut self.legacy.dword_4c2c4c)?;
        s.sync_u32(&mut self.legacy.dword_4c2c50)?;
        s.sync_u32(&mut self.legacy.dword_4c2c54)?;
        s.sync_u32(&mut self.legacy.dword_4c2c58)?;
        s.sync_u32(&mut self.legacy.dword_4c2c5c)?;
        s.sync_u32(&mut self.current_node_type)?;

        s.sync_float(&mut self.view.lookat_pitch)?;
        s.sync_float(&mut self.view.lookat_heading)?;
        s.sync_float(&mut self.view.lookat_fov)?;
        s.sync_float(&mut self.view.pitch_offset)?;
        s.sync_float(&mut self.view.heading_offset)?;

        s.sync_bool(&mut self.camera_limits.limited)?;
        s.sync_float(&mut self.camera_limits.min_pitch)?;
        s.sync_float(&mut self.camera_limits.max_pitch)?;
        s.sync_float(&mut self.camera_limits.min_heading)?;
        s.sync_float(&mut self.camera_limits.max_heading)?;

        s.sync_u32(&mut self.legacy.dword_4c2c90)?;

        for value in self.vars.as_mut_slice() {
            s.sync_i32(value)?;
        }

        s.sync_u32(&mut self.inventory.count)?;
        for item in self.inventory.items.iter_mut() {
            s.sync_u32(item)?;
        }

        s.sync_bytes(&mut self.zip_destinations.flags)?;

        if s.version() >= METADATA_VERSION {
            s.sync_u8(&mut self.metadata.day)?;
            s.sync_u8(&mut self.metadata.month)?;
            s.sync_u16(&mut self.metadata.year)?;
            s.sync_u8(&mut self.metadata.hour)?;
            s.sync_u8(&mut self.metadata.minute)?;
            s.sync_string(&mut self.metadata.description)?;
            s.sync_thumbnail(&mut self.thumbnail)?;
        } else if s.is_loading() {
            // Older streams carry no pixels, the image still has to exist.
            self.thumbnail = Rc::new(Thumbnail::new());
        }

        Ok(())
    }

    /// Decodes a complete record from `reader` into a fresh value.
    pub fn decode(reader: &mut dyn Read, max_string_len: usize) -> StateResult<Self> {
        let mut record = StateRecord::new();
        let mut s = SaveSerializer::for_loading(reader).with_max_string_len(max_string_len);
        record.sync_with_save_game(&mut s)?;
        record.version = s.version();
        record.inventory.validate()?;
        if record.vars.slot(0) != 0 {
            tracing::warn!(value = record.vars.slot(0), "save carries a non-zero var 0, resetting");
            record.vars.as_mut_slice()[0] = 0;
        }
        tracing::debug!(
            version = record.version,
            bytes = s.bytes_synced(),
            "decoded save record"
        );
        Ok(record)
    }

    /// Encodes the record exactly as it is, at `version`.
    pub fn encode(
        &self,
        writer: &mut dyn Write,
        version: u32,
        max_string_len: usize,
    ) -> StateResult<usize> {
        if version > SAVE_VERSION {
            return Err(StateError::VersionTooRecent {
                found: version,
                max: SAVE_VERSION,
            });
        }
        let mut copy = self.clone();
        let mut s = SaveSerializer::for_saving(writer, version).with_max_string_len(max_string_len);
        copy.sync_with_save_game(&mut s)?;
        tracing::debug!(version, bytes = s.bytes_synced(), "encoded save record");
        Ok(s.bytes_synced())
    }

    pub fn to_bytes(&self, version: u32) -> StateResult<Vec<u8>> {
        let mut output = Vec::new();
        self.encode(&mut output, version, DEFAULT_MAX_STRING_LEN)?;
        Ok(output)
    }

    pub fn from_bytes(input: &[u8]) -> StateResult<Self> {
        let mut reader = input;
        Self::decode(&mut reader, DEFAULT_MAX_STRING_LEN)
    }
}

#[cfg(test)]
#[path = "tests/save_codec_tests.rs"]
mod tests;
