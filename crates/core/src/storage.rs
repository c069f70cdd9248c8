//! Save slots on disk.
//!
//! Slot files live under `slots/`, each with a JSON sidecar under `meta/`
//! carrying a preview of the save and the CRC-32 of the slot bytes. Writes go
//! through a temporary file; the previous file is kept as `<name>.bak` and is
//! used when the primary no longer decodes.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{StateError, StateResult};
use crate::game_state::GameState;
use crate::platform::{Calendar, SaveFileManager, SaveSink};
use crate::state::{StateRecord, TimeDate};
use crate::vars::EngineVar;

pub const SAVE_EXTENSION: &str = "m3s";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSlotMetadata {
    pub slot_id: u16,
    pub version: u32,
    pub description: String,
    pub saved_at: TimeDate,
    pub seconds_played: u32,
    pub location_age: i32,
    pub location_room: i32,
    pub location_node: i32,
    pub crc32: u32,
    pub byte_len: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveSlotEntry {
    pub metadata: SaveSlotMetadata,
    pub path: PathBuf,
}

/// Filesystem-backed save storage.
#[derive(Debug, Clone)]
pub struct SaveDirectory {
    root: PathBuf,
}

impl SaveDirectory {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_layout(&self) -> StateResult<()> {
        fs::create_dir_all(self.root.join("slots"))?;
        fs::create_dir_all(self.root.join("meta"))?;
        Ok(())
    }

    pub fn slot_file_name(slot_id: u16) -> String {
        format!("slot_{slot_id:03}.{SAVE_EXTENSION}")
    }

    pub fn save_slot(
        &self,
        slot_id: u16,
        state: &mut GameState,
        calendar: &dyn Calendar,
    ) -> StateResult<SaveSlotEntry> {
        self.ensure_layout()?;
        let name = Self::slot_file_name(slot_id);
        let bytes = state.save_to_bytes(calendar)?;

        let mut sink = self.open_for_saving(&name)?;
        sink.write_all(&bytes)?;
        sink.commit()?;

        let metadata = build_metadata(slot_id, state, &bytes);
        let payload = serde_json::to_vec_pretty(&metadata)
            .map_err(|err| StateError::Metadata(err.to_string()))?;
        atomic_write(&self.metadata_path(slot_id), &payload, false)?;

        Ok(SaveSlotEntry {
            metadata,
            path: self.slot_path(&name),
        })
    }

    /// Loads a slot into `state`, falling back to the backup copy if the primary is bad.
    pub fn load_slot(&self, slot_id: u16, state: &mut GameState) -> StateResult<()> {
        let primary_path = self.slot_path(&Self::slot_file_name(slot_id));
        let primary_bytes = match fs::read(&primary_path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(StateError::SlotNotFound { slot: slot_id });
            }
            Err(err) => return Err(err.into()),
        };

        let primary = self
            .verify_checksum(slot_id, &primary_bytes)
            .and_then(|()| state.load_bytes(&primary_bytes));
        let primary_err = match primary {
            Ok(()) => return Ok(()),
            Err(err) if err.is_corruption() => err,
            Err(err) => return Err(err),
        };

        let backup_path = backup_path(&primary_path);
        match fs::read(&backup_path) {
            Ok(backup_bytes) => match state.load_bytes(&backup_bytes) {
                Ok(()) => {
                    tracing::warn!(
                        slot = slot_id,
                        error = %primary_err,
                        "primary save is unreadable, loaded the backup copy"
                    );
                    Ok(())
                }
                Err(backup_err) => Err(StateError::RecoveryFailed {
                    primary: Box::new(primary_err),
                    backup: Some(Box::new(backup_err)),
                }),
            },
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StateError::RecoveryFailed {
                primary: Box::new(primary_err),
                backup: None,
            }),
            Err(err) => Err(err.into()),
        }
    }

    pub fn remove_slot(&self, slot_id: u16) -> StateResult<()> {
        let slot_path = self.slot_path(&Self::slot_file_name(slot_id));
        for path in [
            backup_path(&slot_path),
            slot_path,
            self.metadata_path(slot_id),
        ] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    /// Slots with readable metadata, most recently saved first.
    ///
    /// Unreadable sidecars are logged and skipped.
    pub fn list_slots(&self) -> StateResult<Vec<SaveSlotEntry>> {
        self.ensure_layout()?;
        let mut entries = Vec::new();

        for entry in fs::read_dir(self.root.join("meta"))? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path)?;
            let metadata: SaveSlotMetadata = match serde_json::from_slice(&bytes) {
                Ok(metadata) => metadata,
                Err(err) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %err,
                        "skipping unreadable slot metadata"
                    );
                    continue;
                }
            };
            let slot_path = self.slot_path(&Self::slot_file_name(metadata.slot_id));
            if slot_path.exists() {
                entries.push(SaveSlotEntry {
                    metadata,
                    path: slot_path,
                });
            }
        }

        entries.sort_by(|a, b| {
            sort_key(&b.metadata.saved_at).cmp(&sort_key(&a.metadata.saved_at))
        });
        Ok(entries)
    }

    fn verify_checksum(&self, slot_id: u16, bytes: &[u8]) -> StateResult<()> {
        let metadata_path = self.metadata_path(slot_id);
        let raw = match fs::read(&metadata_path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        let metadata: SaveSlotMetadata = match serde_json::from_slice(&raw) {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(slot = slot_id, error = %err, "ignoring unreadable slot metadata");
                return Ok(());
            }
        };
        let actual = crc32fast::hash(bytes);
        if actual != metadata.crc32 {
            return Err(StateError::CorruptRecord(format!(
                "slot checksum mismatch (expected {:#010x}, got {actual:#010x})",
                metadata.crc32
            )));
        }
        Ok(())
    }

    fn slot_path(&self, name: &str) -> PathBuf {
        self.root.join("slots").join(name)
    }

    fn metadata_path(&self, slot_id: u16) -> PathBuf {
        self.root
            .join("meta")
            .join(format!("slot_{slot_id:03}.json"))
    }
}

impl SaveFileManager for SaveDirectory {
    fn open_for_loading(&self, name: &str) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(fs::File::open(self.slot_path(name))?))
    }

    fn open_for_saving(&self, name: &str) -> io::Result<Box<dyn SaveSink>> {
        Ok(Box::new(PendingFile {
            path: self.slot_path(name),
            buffer: Vec::new(),
        }))
    }
}

struct PendingFile {
    path: PathBuf,
    buffer: Vec<u8>,
}

impl Write for PendingFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SaveSink for PendingFile {
    fn commit(self: Box<Self>) -> io::Result<()> {
        atomic_write(&self.path, &self.buffer, true)
    }
}

fn build_metadata(slot_id: u16, state: &GameState, bytes: &[u8]) -> SaveSlotMetadata {
    let record: &StateRecord = state.record();
    SaveSlotMetadata {
        slot_id,
        version: state.config().write_version,
        description: record.metadata.description.clone(),
        saved_at: record.metadata.date(),
        seconds_played: record.seconds_played,
        location_age: state.engine_var(EngineVar::LocationAge),
        location_room: state.engine_var(EngineVar::LocationRoom),
        location_node: state.engine_var(EngineVar::LocationNode),
        crc32: crc32fast::hash(bytes),
        byte_len: bytes.len(),
    }
}

fn sort_key(date: &TimeDate) -> (u16, u8, u8, u8, u8) {
    (date.year, date.month, date.day, date.hour, date.minute)
}

fn atomic_write(path: &Path, bytes: &[u8], keep_backup: bool) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "target path has no parent"))?;
    fs::create_dir_all(parent)?;
    if keep_backup && path.exists() {
        fs::copy(path, backup_path(path))?;
    }
    let tmp_path = path.with_extension("tmp");
    fs::write(&tmp_path, bytes)?;
    if path.exists() {
        fs::remove_file(path)?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn backup_path(path: &Path) -> PathBuf {
    let mut output = path.as_os_str().to_os_string();
    output.push(".bak");
    PathBuf::from(output)
}

#[cfg(test)]
#[path = "tests/storage_tests.rs"]
mod tests;
