//! Save format versioning constants.
//!
//! The version tag is the first field of every save stream. Field encodings
//! and presence are keyed strictly on the version the stream declares.

/// Highest save version this build can read, and the version it writes by default.
pub const SAVE_VERSION: u32 = 149;

/// Last version that stores floats as raw IEEE-754 bytes.
pub const LEGACY_SAVE_VERSION: u32 = 148;

/// First version storing floats as fixed-point integers.
pub const FIXED_POINT_VERSION: u32 = 149;

/// First version carrying save date, description and thumbnail.
pub const METADATA_VERSION: u32 = 149;

/// Scale applied to floats in the fixed-point encoding.
pub const FIXED_POINT_PRECISION: f32 = 10_000.0;

pub const THUMBNAIL_WIDTH: usize = 240;
pub const THUMBNAIL_HEIGHT: usize = 135;
pub const THUMBNAIL_BYTES_PER_PIXEL: usize = 4;
