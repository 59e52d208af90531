use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::DecodeError;

/// A logical register name `x<index>`, the index written without leading
/// zeros.
///
/// The index is not checked against the register file size here; the
/// interpreter rejects out-of-range indices when it executes the instruction.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LogicalRegister(pub u32);

impl LogicalRegister {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl FromStr for LogicalRegister {
    type Err = DecodeError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        token
            .strip_prefix('x')
            .filter(|digits| {
                !digits.is_empty()
                    && digits.bytes().all(|b| b.is_ascii_digit())
                    && (digits.len() == 1 || !digits.starts_with('0'))
            })
            .and_then(|digits| digits.parse::<u32>().ok())
            .map(LogicalRegister)
            .ok_or_else(|| DecodeError::UnknownRegister(token.to_string()))
    }
}

impl fmt::Display for LogicalRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "x{}", self.0)
    }
}
