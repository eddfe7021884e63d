//! Target `.skel` format version.

/// Major version of the binary format read and written by this crate.
pub const FORMAT_MAJOR: u32 = 3;

/// Minor version of the binary format read and written by this crate.
pub const FORMAT_MINOR: u32 = 5;

/// Version string written into headers that carry none when `EncodeOptions::makeup` is set.
pub const FORMAT_VERSION: &str = "3.5.51";
