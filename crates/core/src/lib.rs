//! Save-state and variable-scripting core for a 3D adventure game interpreter.
//!
//! [`GameState`] owns the live [`StateRecord`]: a flat table of 2048 signed
//! variables plus inventory, fast-travel flags, camera state, timers and save
//! metadata. Scripts branch on it through packed [`Condition`]s, and the whole
//! record round-trips through a versioned little-endian save format.

mod condition;
mod config;
mod error;
mod game_state;
mod platform;
mod save_codec;
mod state;
mod storage;
mod vars;
mod version;

pub use condition::{Comparison, Condition};
pub use config::StateConfig;
pub use error::{StateError, StateResult};
pub use game_state::{GameState, RESYNC_THRESHOLD_MS, SECOND_MS};
pub use platform::{
    Calendar, Clock, InputSource, MemorySaveFiles, NoInput, SaveFileManager, SaveSink,
    SystemCalendar, SystemClock,
};
pub use save_codec::{from_fixed_point, to_fixed_point, SaveSerializer, DEFAULT_MAX_STRING_LEN};
pub use state::{
    CameraLimits, Inventory, LegacyFields, SaveMetadata, StateRecord, Thumbnail, TimeDate,
    ViewState, ZipDestinations, INVENTORY_CAPACITY, ZIP_DESTINATION_COUNT,
};
pub use storage::{SaveDirectory, SaveSlotEntry, SaveSlotMetadata, SAVE_EXTENSION};
pub use vars::{
    EngineVar, VarCatalog, VarDescription, VariableTable, ENGINE_VAR_DESCRIPTIONS, FIRST_VAR,
    LAST_VAR, VAR_COUNT,
};
pub use version::{
    FIXED_POINT_PRECISION, FIXED_POINT_VERSION, LEGACY_SAVE_VERSION, METADATA_VERSION,
    SAVE_VERSION, THUMBNAIL_BYTES_PER_PIXEL, THUMBNAIL_HEIGHT, THUMBNAIL_WIDTH,
};
