use miette::Diagnostic;
use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error, Diagnostic)]
pub enum StateError {
    #[error("variable out of range {index}")]
    #[diagnostic(code("state.var_out_of_range"), help("valid variables are 1..=2047"))]
    VarOutOfRange { index: u16 },
    #[error("the engine is trying to access an undescribed var ({index})")]
    #[diagnostic(code("state.undescribed_var"))]
    UndescribedVar { index: u16 },
    #[error("this savegame (v{found}) is too recent (max {max})")]
    #[diagnostic(
        code("state.version_too_recent"),
        help("the save was written by a newer build")
    )]
    VersionTooRecent { found: u32, max: u32 },
    #[error("corrupt save record: {0}")]
    #[diagnostic(code("state.corrupt_record"))]
    CorruptRecord(String),
    #[error("save description is {len} bytes long (max {max})")]
    #[diagnostic(code("state.description_too_long"))]
    DescriptionTooLong { len: usize, max: usize },
    #[error("thumbnail must be {expected} bytes, got {found}")]
    #[diagnostic(code("state.invalid_thumbnail"))]
    InvalidThumbnail { expected: usize, found: usize },
    #[error("io error: {0}")]
    #[diagnostic(code("state.io"))]
    Io(#[from] std::io::Error),
    #[error("slot metadata error: {0}")]
    #[diagnostic(code("state.metadata"))]
    Metadata(String),
    #[error("invalid configuration: {0}")]
    #[diagnostic(code("state.config"))]
    Config(String),
    #[error("save slot {slot} does not exist")]
    #[diagnostic(code("state.slot_not_found"))]
    SlotNotFound { slot: u16 },
    #[error("{}", recovery_message(.primary, .backup.as_deref()))]
    #[diagnostic(code("state.recovery_failed"))]
    RecoveryFailed {
        primary: Box<StateError>,
        backup: Option<Box<StateError>>,
    },
}

fn recovery_message(primary: &StateError, backup: Option<&StateError>) -> String {
    match backup {
        Some(backup) => {
            format!("save recovery failed (primary: {primary}, backup: {backup})")
        }
        None => format!("save recovery failed (primary: {primary}, backup missing)"),
    }
}

impl StateError {
    /// True for errors caused by the bytes of a save rather than by the environment.
    pub fn is_corruption(&self) -> bool {
        match self {
            StateError::CorruptRecord(_)
            | StateError::DescriptionTooLong { .. }
            | StateError::VersionTooRecent { .. } => true,
            StateError::Io(err) => err.kind() == std::io::ErrorKind::UnexpectedEof,
            _ => false,
        }
    }
}
