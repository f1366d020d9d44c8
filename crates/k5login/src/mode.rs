//! Permission mode as managed on a k5login file.
//!
//! Only the permission bits (`0o7777`) are ever read or written; file-type
//! bits in `st_mode` are masked off on the way in.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Mask of the bits this crate manages
pub const PERMISSION_BITS: u32 = 0o7777;

/// Permission bits, displayed as bare octal digits (`644`, `4755`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ModeRepr", into = "String")]
pub struct Mode(u32);

impl Mode {
    /// Mode every k5login file is first written with
    pub const DEFAULT: Mode = Mode(0o644);

    /// Build a mode from raw `st_mode` bits, dropping the file-type bits.
    pub fn from_raw(raw: u32) -> Self {
        Self(raw & PERMISSION_BITS)
    }

    /// Parse an octal string, with or without a leading `0`.
    pub fn parse(value: &str) -> Result<Self> {
        let digits = value.trim();
        if digits.is_empty() {
            return Err(Error::invalid_mode(value, "empty"));
        }
        if !digits.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return Err(Error::invalid_mode(value, "not an octal number"));
        }
        let bits = u32::from_str_radix(digits, 8)
            .map_err(|_| Error::invalid_mode(value, "out of range"))?;
        if bits > PERMISSION_BITS {
            return Err(Error::invalid_mode(value, "exceeds 7777"));
        }
        Ok(Self(bits))
    }

    /// The permission bits
    pub fn bits(self) -> u32 {
        self.0
    }
}

impl Default for Mode {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:o}", self.0)
    }
}

impl FromStr for Mode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl From<Mode> for String {
    fn from(mode: Mode) -> Self {
        mode.to_string()
    }
}

/// Config files may spell the mode as `"0600"` or as a bare `600`; both are
/// read as octal digits.
#[derive(Deserialize)]
#[serde(untagged)]
enum ModeRepr {
    Text(String),
    Digits(u64),
}

impl TryFrom<ModeRepr> for Mode {
    type Error = Error;

    fn try_from(repr: ModeRepr) -> Result<Self> {
        match repr {
            ModeRepr::Text(s) => Self::parse(&s),
            ModeRepr::Digits(n) => Self::parse(&n.to_string()),
        }
    }
}

/// Whether the observed mode already equals the desired one.
///
/// Used by create to skip a redundant chmod after the initial write.
pub fn current_mode_equals_desired(current: Mode, desired: Mode) -> bool {
    current == desired
}
