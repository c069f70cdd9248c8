//! The flat variable table and the catalog of engine-mapped variables.

use std::collections::BTreeMap;

use crate::error::{StateError, StateResult};

/// Number of slots in the variable table, including the reserved slot 0.
pub const VAR_COUNT: usize = 2048;

/// Lowest index scripts and the engine may address.
pub const FIRST_VAR: u16 = 1;

/// Highest index scripts and the engine may address.
pub const LAST_VAR: u16 = 2047;

/// Metadata attached to an engine-mapped variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VarDescription {
    pub index: u16,
    pub name: &'static str,
    /// The variable is known to exist but its engine behavior is not implemented.
    pub unknown: bool,
}

macro_rules! engine_vars {
    ($($name:ident = $index:literal, $unknown:literal;)*) => {
        /// Variables with a known meaning to the engine.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        #[repr(u16)]
        pub enum EngineVar {
            $($name = $index,)*
        }

        impl EngineVar {
            pub const fn index(self) -> u16 {
                self as u16
            }

            pub fn description(self) -> VarDescription {
                match self {
                    $(EngineVar::$name => VarDescription {
                        index: $index,
                        name: stringify!($name),
                        unknown: $unknown,
                    },)*
                }
            }
        }

        /// Built-in descriptions, in index order.
        pub const ENGINE_VAR_DESCRIPTIONS: &[VarDescription] = &[
            $(VarDescription {
                index: $index,
                name: stringify!($name),
                unknown: $unknown,
            },)*
        ];
    };
}

engine_vars! {
    CursorTransparency = 14, false;
    ProjectorAngleX = 47, true;
    ProjectorAngleY = 48, true;
    ProjectorAngleZoom = 49, true;
    ProjectorAngleBlur = 50, true;
    DraggedWeight = 51, true;
    DragEnded = 57, true;
    DragLeverSpeed = 58, false;
    DragPositionFound = 59, true;
    DragLeverPositionChanged = 60, true;
    LocationAge = 61, false;
    LocationRoom = 62, false;
    LocationNode = 63, false;
    BookSavedAge = 64, false;
    BookSavedRoom = 65, false;
    BookSavedNode = 66, false;
    MenuSavedAge = 67, false;
    MenuSavedRoom = 68, false;
    MenuSavedNode = 69, false;
    SecondsCountdown = 70, true;
    FrameCountdown = 71, true;
    InputMousePressed = 84, false;
    InputEscapePressed = 88, false;
    InputTildePressed = 89, false;
    InputSpacePressed = 90, false;
    HotspotActiveRect = 92, false;
    SunspotIntensity = 115, false;
    SunspotColor = 116, false;
    SunspotRadius = 117, false;
    AmbientFadeOutDelay = 119, false;
    AmbientPreviousFadeOutDelay = 120, false;
    CursorLocked = 131, false;
    CursorHidden = 132, false;
    CameraPitch = 136, false;
    CameraHeading = 137, false;
    CameraMinPitch = 140, false;
    CameraMaxPitch = 141, false;
    MovieOverrideStartFrame = 142, true;
    MovieOverrideEndFrame = 143, true;
    MovieVolume1 = 144, true;
    MovieVolume2 = 145, true;
    MovieOverrideSubtitles = 146, false;
    MovieUnk147 = 147, true;
    MovieUnk148 = 148, true;
    MovieConditionBit = 149, true;
    MoviePreloadToMemory = 150, true;
    MovieScriptDriven = 151, true;
    MovieNextFrameSetVar = 152, true;
    MovieNextFrameGetVar = 153, true;
    MovieStartFrameVar = 154, true;
    MovieEndFrameVar = 155, true;
    MovieForce2d = 156, true;
    MovieVolumeVar = 157, true;
    MovieSoundHeading = 158, true;
    MoviePanningStrength = 159, true;
    MovieSynchronized = 160, true;
    MovieUnk161 = 161, true;
    MovieUnk162 = 162, true;
    MovieOverrideCondition = 163, true;
    MovieUVar = 164, true;
    MovieVVar = 165, true;
    MovieOverridePosition = 166, true;
    MovieOverridePosU = 167, true;
    MovieOverridePosV = 168, true;
    MovieScale = 169, true;
    MovieUnk170 = 170, true;
    MovieUnk171 = 171, true;
    MovieUnk172 = 172, true;
    MoviePlayingVar = 173, true;
    MovieUseBackground = 178, false;
    CameraSkipAnimation = 179, true;
    MovieAmbientScriptStartFrame = 180, false;
    MovieAmbientScript = 181, false;
    MovieScriptStartFrame = 182, false;
    MovieScript = 183, false;
    CameraMoveSpeed = 185, false;
    LocationNextNode = 189, false;
    LocationNextRoom = 190, false;
    LocationNextAge = 191, false;
    BallPosition = 195, false;
    BallFrame = 196, false;
    BallLeverLeft = 197, false;
    BallLeverRight = 198, false;
    BallDoorOpen = 228, false;
    ProjectorX = 243, false;
    ProjectorY = 244, false;
    ProjectorZoom = 245, false;
    ProjectorBlur = 246, false;
    ProjectorAngleXOffset = 247, false;
    ProjectorAngleYOffset = 248, false;
    ProjectorAngleZoomOffset = 249, false;
    ProjectorAngleBlurOffset = 250, false;
    JournalAtrusState = 277, false;
    JournalSaavedroState = 279, false;
    JournalSaavedroClosed = 280, false;
    JournalSaavedroOpen = 281, false;
    JournalSaavedroLastPage = 282, false;
    JournalSaavedroChapter = 283, false;
    JournalSaavedroPageInChapter = 284, false;
    TeslaAllAligned = 329, false;
    TeslaTopAligned = 330, false;
    TeslaMiddleAligned = 331, false;
    TeslaBottomAligned = 332, false;
    TeslaMovieStart = 333, false;
    ResonanceRingsSolved = 444, false;
    PinballRemainingPegs = 460, false;
    BookStateTomahna = 480, false;
    BookStateReleeshahn = 481, false;
    SymbolCode2Solved = 489, false;
    SymbolCode1AllSolved = 495, false;
    SymbolCode1CurrentSolved = 496, false;
    SymbolCode1TopSolved = 497, false;
    SymbolCode1LeftSolved = 502, false;
    SymbolCode1RightSolved = 507, false;
    ZipModeEnabled = 1322, false;
    SubtitlesEnabled = 1323, false;
    WaterEffects = 1324, false;
    TransitionSpeed = 1325, false;
    MouseSpeed = 1326, false;
    DialogResult = 1327, false;
    MenuEscapePressed = 1337, false;
    MenuNextAction = 1338, false;
    MenuLoadBack = 1339, false;
    MenuSaveBack = 1340, false;
    MenuSaveAction = 1341, false;
    MenuOptionsBack = 1342, false;
    MenuSaveLoadPageLeft = 1350, false;
    MenuSaveLoadPageRight = 1351, false;
    MenuSaveLoadSelectedItem = 1352, false;
    MenuSaveLoadCurrentPage = 1353, false;
    OverallVolume = 1374, false;
    MusicVolume = 1377, false;
    MusicFrequency = 1380, false;
    LanguageAudio = 1393, false;
    LanguageText = 1394, false;
    HotspotHovered = 1396, false;
    SpotSubtitle = 1397, false;
    DragLeverLimited = 1399, true;
    DragLeverLimitMin = 1400, true;
    DragLeverLimitMax = 1401, true;
}

/// Read-only lookup of variable descriptions, built once per game state.
#[derive(Clone, Debug)]
pub struct VarCatalog {
    descriptions: BTreeMap<u16, VarDescription>,
}

impl VarCatalog {
    /// Catalog of every engine-mapped variable.
    pub fn builtin() -> Self {
        Self::from_descriptions(ENGINE_VAR_DESCRIPTIONS.iter().copied())
    }

    pub fn from_descriptions(descriptions: impl IntoIterator<Item = VarDescription>) -> Self {
        Self {
            descriptions: descriptions
                .into_iter()
                .map(|description| (description.index, description))
                .collect(),
        }
    }

    pub fn get(&self, index: u16) -> Option<&VarDescription> {
        self.descriptions.get(&index)
    }

    pub fn contains(&self, index: u16) -> bool {
        self.descriptions.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.descriptions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptions.is_empty()
    }

    /// Symbolic name of a described variable, `v<index>` otherwise.
    pub fn describe(&self, index: u16) -> String {
        match self.get(index) {
            Some(description) => description.name.to_string(),
            None => format!("v{index}"),
        }
    }
}

impl Default for VarCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Fixed-size table of signed variables.
///
/// Slot 0 is reserved and always reads as zero; slot 1 is the constant-true flag.
#[derive(Clone, PartialEq, Eq)]
pub struct VariableTable {
    values: Box<[i32; VAR_COUNT]>,
}

impl VariableTable {
    pub fn new() -> Self {
        let mut values = Box::new([0; VAR_COUNT]);
        values[1] = 1;
        Self { values }
    }

    /// Range-checked read of a script-addressable variable.
    pub fn get(&self, index: u16) -> StateResult<i32> {
        check_range(index)?;
        Ok(self.values[usize::from(index)])
    }

    /// Range-checked write of a script-addressable variable.
    pub fn set(&mut self, index: u16, value: i32) -> StateResult<()> {
        check_range(index)?;
        self.values[usize::from(index)] = value;
        Ok(())
    }

    /// Unchecked read by an index already masked to the table size.
    pub(crate) fn slot(&self, index: u16) -> i32 {
        self.values[usize::from(index) % VAR_COUNT]
    }

    pub(crate) fn as_slice(&self) -> &[i32] {
        &self.values[..]
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [i32] {
        &mut self.values[..]
    }

    /// Indices and values of every non-zero script-addressable variable.
    pub fn non_zero(&self) -> impl Iterator<Item = (u16, i32)> + '_ {
        self.values
            .iter()
            .enumerate()
            .skip(usize::from(FIRST_VAR))
            .filter(|(_, value)| **value != 0)
            .map(|(index, value)| (index as u16, *value))
    }
}

impl Default for VariableTable {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VariableTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map().entries(self.non_zero()).finish()
    }
}

pub(crate) fn check_range(index: u16) -> StateResult<()> {
    if !(FIRST_VAR..=LAST_VAR).contains(&index) {
        return Err(StateError::VarOutOfRange { index });
    }
    Ok(())
}

#[cfg(test)]
#[path = "tests/vars_tests.rs"]
mod tests;
