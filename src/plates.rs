//! Vehicle plates

use std::fmt;

use thiserror::Error;

/// Longest plate accepted at the gate.
pub const MAX_PLATE_LEN: usize = 10;

/// Errors raised while validating a plate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlateError {
    /// The input was empty (or whitespace only).
    #[error("plate is empty")]
    Empty,

    /// The input was longer than [`MAX_PLATE_LEN`] characters.
    #[error("plate has {len} characters, maximum is {MAX_PLATE_LEN}")]
    TooLong {
        /// Number of characters in the rejected input.
        len: usize,
    },
}

/// A normalised vehicle plate.
///
/// Construction trims surrounding whitespace and upper-cases the input, so
/// two plates typed differently at the gate compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Plate {
    value: String,
}

impl Plate {
    /// Normalise and validate a raw plate.
    ///
    /// # Errors
    ///
    /// - [`PlateError::Empty`]: the input contains no characters after trimming.
    /// - [`PlateError::TooLong`]: the input exceeds [`MAX_PLATE_LEN`] characters.
    pub fn new(raw: &str) -> Result<Self, PlateError> {
        let value = raw.trim().to_uppercase();

        if value.is_empty() {
            return Err(PlateError::Empty);
        }

        let len = value.chars().count();
        if len > MAX_PLATE_LEN {
            return Err(PlateError::TooLong { len });
        }

        Ok(Plate { value })
    }

    /// The normalised plate text.
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Render the plate for display: the first character alone, the remainder
    /// grouped right-to-left in blocks of three.
    ///
    /// `P40807` becomes `P 40 807`, `P8E98` becomes `P 8 E98`.
    pub fn grouped(&self) -> String {
        let mut chars = self.value.chars();

        let Some(first) = chars.next() else {
            return String::new();
        };

        let rest: Vec<char> = chars.collect();
        let mut out = String::with_capacity(self.value.len() + self.value.len() / 3 + 1);
        out.push(first);

        for (i, ch) in rest.iter().enumerate() {
            let from_end = rest.len() - i;
            if i == 0 || from_end % 3 == 0 {
                out.push(' ');
            }
            out.push(*ch);
        }

        out
    }
}

impl fmt::Display for Plate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
