use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::LineIndex;

/// One of the four positional values the backward scan has to recover.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    E,
    Z,
    X,
    Y,
}

impl Axis {
    pub fn letter(self) -> char {
        match self {
            Axis::E => 'E',
            Axis::Z => 'Z',
            Axis::X => 'X',
            Axis::Y => 'Y',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

struct AxisList<'a>(&'a [Axis]);

impl fmt::Display for AxisList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, axis) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", axis)?;
        }
        Ok(())
    }
}

/// Everything that can end a conversion run. None of these are retried.
#[derive(Error, Debug)]
pub enum ResumeError {
    /// Source missing or unreadable (including non UTF-8 content)
    #[error("cannot read {}: {source}", .path.display())]
    FileNotReadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No `;LAYER:<n>` marker for the requested layer
    #[error("layer {layer} not found")]
    LayerNotFound { layer: u32 },

    /// The backward scan reached the header without finding every axis
    #[error("could not recover {} before the resumed layer", AxisList(.missing))]
    IncompleteStateRecovery { missing: Vec<Axis> },

    /// `line_number` is 1-based, like an editor shows it
    #[error("malformed {field} value at line {line_number}: {line:?}")]
    MalformedNumericField {
        line_number: LineIndex,
        line: String,
        field: String,
    },

    #[error("cannot write {}: {source}", .path.display())]
    OutputWriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cancelled")]
    Cancelled,
}
