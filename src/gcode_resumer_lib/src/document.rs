use std::fs;
use std::ops::Range;
use std::path::Path;
use std::time::Instant;

use tracing::debug;

use crate::error::ResumeError;
use crate::LineIndex;

/// The whole source file, read once and then indexed by line.
///
/// Each entry keeps its own terminator (`\n`, `\r\n`, or nothing for a final unterminated line)
/// so that anything copied through to the output is byte-for-byte what was read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GcodeDocument {
    raw_lines: Vec<String>,
}

impl GcodeDocument {
    pub fn load(path: &Path) -> Result<GcodeDocument, ResumeError> {
        let before_read = Instant::now();
        let text = fs::read_to_string(path).map_err(|source| ResumeError::FileNotReadable {
            path: path.to_path_buf(),
            source,
        })?;
        let document = GcodeDocument::from_text(&text);
        debug!(
            path = %path.display(),
            lines = document.len(),
            elapsed = ?before_read.elapsed(),
            "loaded gcode"
        );
        Ok(document)
    }

    pub fn from_text(text: &str) -> GcodeDocument {
        GcodeDocument {
            raw_lines: text.split_inclusive('\n').map(String::from).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.raw_lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw_lines.is_empty()
    }

    /// Line content without its terminator; this is what markers and fields are matched against.
    pub fn line(&self, index: LineIndex) -> &str {
        let raw = self.raw_lines[index].as_str();
        let raw = raw.strip_suffix('\n').unwrap_or(raw);
        raw.strip_suffix('\r').unwrap_or(raw)
    }

    pub fn raw_line(&self, index: LineIndex) -> &str {
        &self.raw_lines[index]
    }

    pub fn raw_lines(&self, range: Range<LineIndex>) -> impl Iterator<Item = &str> {
        self.raw_lines[range].iter().map(String::as_str)
    }
}
