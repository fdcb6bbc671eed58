use std::time::Instant;

use tracing::debug;

use crate::document::GcodeDocument;
use crate::error::ResumeError;
use crate::fields::Fields;
use crate::LineIndex;

/// Where the header stops and where the requested layer starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerBounds {
    // index of the last ;LAYER_COUNT line seen before the layer, or 0 if there was none
    pub header_end: LineIndex,
    pub layer_start: LineIndex,
    pub layer: u32,
}

/// Single forward pass. Stops at the first line starting with `;LAYER:<layer>`.
pub fn locate_layer(document: &GcodeDocument, layer: u32) -> Result<LayerBounds, ResumeError> {
    let before_scan = Instant::now();
    let mut header_end: LineIndex = 0;

    for index in 0..document.len() {
        let line = document.line(index);
        if Fields::is_layer_start(line, layer) {
            let bounds = LayerBounds {
                header_end,
                layer_start: index,
                layer,
            };
            debug!(
                header_end,
                layer_start = index,
                elapsed = ?before_scan.elapsed(),
                "located layer {}",
                layer
            );
            return Ok(bounds);
        }
        if Fields::is_layer_count(line) {
            header_end = index;
        }
    }

    Err(ResumeError::LayerNotFound { layer })
}
